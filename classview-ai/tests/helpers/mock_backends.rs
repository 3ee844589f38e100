//! Scripted vision backends for pipeline tests

#![allow(dead_code)]

use async_trait::async_trait;
use classview_ai::{BackendError, Concept, VisionBackend};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Concepts from `(name, confidence)` pairs
pub fn concepts(pairs: &[(&str, f32)]) -> Vec<Concept> {
    pairs.iter().map(|(n, c)| Concept::new(*n, *c)).collect()
}

/// Backend answering with a fixed concept list (after an optional delay)
pub struct FixedBackend {
    name: String,
    concepts: Vec<Concept>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FixedBackend {
    pub fn new(name: &str, concepts: Vec<Concept>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            concepts,
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn slow(name: &str, concepts: Vec<Concept>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            concepts,
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionBackend for FixedBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _image: &[u8]) -> Result<Vec<Concept>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.concepts.clone())
    }
}

/// Backend that always fails
pub struct FailingBackend {
    name: String,
    make_error: Box<dyn Fn() -> BackendError + Send + Sync>,
    calls: AtomicUsize,
}

impl FailingBackend {
    pub fn new(
        name: &str,
        make_error: impl Fn() -> BackendError + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            make_error: Box::new(make_error),
            calls: AtomicUsize::new(0),
        })
    }

    /// Fails with a network error
    pub fn network(name: &str) -> Arc<Self> {
        Self::new(name, || BackendError::Network("connection refused".to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionBackend for FailingBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, _image: &[u8]) -> Result<Vec<Concept>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err((self.make_error)())
    }
}
