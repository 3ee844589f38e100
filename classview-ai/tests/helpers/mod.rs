//! Shared integration test helpers

pub mod log_capture;
pub mod mock_backends;
