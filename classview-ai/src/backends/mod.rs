//! Vision Backends
//!
//! Concrete [`VisionBackend`] implementations:
//! - [`ClarifaiClient`]: hosted Clarifai model over HTTPS
//! - [`SubprocessBackend`]: local model run as a child process

pub mod clarifai_client;
pub mod subprocess;

pub use clarifai_client::ClarifaiClient;
pub use subprocess::SubprocessBackend;

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::types::VisionBackend;
use std::sync::Arc;
use std::time::Duration;

/// Instantiate the backend described by `config`
///
/// `timeout` bounds network requests of HTTP backends; the pipeline applies
/// its own per-call timeout on top.
pub fn build_backend(
    config: &BackendConfig,
    timeout: Duration,
) -> Result<Arc<dyn VisionBackend>, BackendError> {
    match config {
        BackendConfig::Clarifai(clarifai) => Ok(Arc::new(ClarifaiClient::new(clarifai, timeout)?)),
        BackendConfig::Subprocess(subprocess) => {
            Ok(Arc::new(SubprocessBackend::from_config(subprocess)))
        }
    }
}
