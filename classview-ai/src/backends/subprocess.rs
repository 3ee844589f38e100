//! Subprocess Backend
//!
//! Runs a local scoring model as a child process per image.
//!
//! # Protocol
//! - Image bytes are written to the child's stdin, then stdin is closed
//! - The child prints one JSON document on stdout:
//!   - `{"concepts": [{"name": "person", "confidence": 0.92}, ...]}`
//!     (`value` is accepted as an alias of `confidence`)
//!   - or `{"error": "message"}`
//! - A non-zero exit status is a failure. The error carries the child's
//!   `{"error"}` message when stdout has one, stderr otherwise
//!
//! The child is killed if the call is dropped (e.g. by the pipeline timeout).

use crate::config::SubprocessConfig;
use crate::error::BackendError;
use crate::types::{Concept, VisionBackend};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Default backend name when the config does not set one
pub const SUBPROCESS_BACKEND_NAME: &str = "subprocess";

/// Longest stderr excerpt kept in error messages
const MAX_STDERR_CHARS: usize = 500;

pub struct SubprocessBackend {
    name: String,
    command: PathBuf,
    args: Vec<String>,
}

impl SubprocessBackend {
    pub fn new(command: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            name: SUBPROCESS_BACKEND_NAME.to_string(),
            command: command.into(),
            args,
        }
    }

    pub fn from_config(config: &SubprocessConfig) -> Self {
        let backend = Self::new(config.command.clone(), config.args.clone());
        match &config.name {
            Some(name) => backend.with_name(name.clone()),
            None => backend,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    async fn run(&self, image: &[u8]) -> Result<Vec<Concept>, BackendError> {
        debug!(
            backend = %self.name,
            command = ?self.command,
            image_bytes = image.len(),
            "Spawning scoring process"
        );

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                BackendError::Process(format!("Failed to start {:?}: {}", self.command, e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| BackendError::Internal("child stdin not captured".to_string()))?;

        // Feed stdin while collecting output so a chatty child cannot block
        let feed = async move {
            let result = stdin.write_all(image).await;
            drop(stdin);
            result
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|e| {
            BackendError::Process(format!("Failed to wait for scoring process: {}", e))
        })?;

        if !output.status.success() {
            let detail = match parse_output(&output.stdout) {
                Err(BackendError::Api(message)) => message,
                _ => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    stderr.trim().chars().take(MAX_STDERR_CHARS).collect()
                }
            };
            return Err(BackendError::Process(format!(
                "scoring process exited with {}: {}",
                output.status, detail
            )));
        }

        if let Err(e) = fed {
            // The child may legitimately exit before consuming all input
            debug!(backend = %self.name, error = %e, "Scoring process closed stdin early");
        }

        let concepts = parse_output(&output.stdout)?;
        debug!(backend = %self.name, concepts = concepts.len(), "Scoring process finished");
        Ok(concepts)
    }
}

#[async_trait]
impl VisionBackend for SubprocessBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, image: &[u8]) -> Result<Vec<Concept>, BackendError> {
        self.run(image).await
    }
}

#[derive(Debug, Deserialize)]
struct ProcessOutput {
    #[serde(default)]
    concepts: Option<Vec<ProcessConcept>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProcessConcept {
    name: String,
    #[serde(alias = "value")]
    confidence: f32,
}

/// Parse the child's stdout
fn parse_output(stdout: &[u8]) -> Result<Vec<Concept>, BackendError> {
    let output: ProcessOutput = serde_json::from_slice(stdout).map_err(|e| {
        BackendError::Parse(format!(
            "Invalid JSON from scoring process: {} (stdout: {:?})",
            e,
            String::from_utf8_lossy(stdout).chars().take(200).collect::<String>()
        ))
    })?;

    if let Some(message) = output.error {
        return Err(BackendError::Api(message));
    }

    let concepts = output.concepts.ok_or_else(|| {
        BackendError::Parse("scoring process output has neither concepts nor error".to_string())
    })?;

    Ok(concepts
        .into_iter()
        .map(|c| Concept::new(c.name, c.confidence))
        .collect())
}
