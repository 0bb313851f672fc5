//! Error types for model training and publishing.

use crate::registry::TrainingStats;
use data_loader::DataLoadError;
use thiserror::Error;

/// Errors that can occur while rebuilding the ranking model
#[derive(Error, Debug)]
pub enum ModelError {
    /// Not enough ratings to train a meaningful model
    #[error("Insufficient training data: {0}")]
    InsufficientData(TrainingStats),

    /// Reading the rating snapshot failed
    #[error("Failed to read ratings: {0}")]
    Store(#[from] DataLoadError),

    /// The trainer rejected the data or panicked
    #[error("Training failed: {0}")]
    Training(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
