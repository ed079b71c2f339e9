//! Test support for the Delve terrain engine.
//!
//! Provides synthetic worlds, a texture uploader that records what the
//! engine sends to the GPU, and end-to-end scenarios over both.

pub mod fixtures;
pub mod uploader;

#[cfg(test)]
mod scenarios;

pub use fixtures::{
    compare_fields, ground_world, solid_world, test_config, FieldTolerance,
};
pub use uploader::RecordingUploader;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TestError {
    #[error("Engine error: {0}")]
    Engine(#[from] delve_core::Error),
    #[error("Field comparison failed: {0}")]
    FieldComparison(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TestError>;
