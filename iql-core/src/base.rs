//! Core traits and types.
mod batch;
mod critic;
mod dataset;
pub use batch::{BatchBase, GenericTransitionBatch, TransitionBatch};
pub use critic::{Configurable, Critic};
pub use dataset::{OfflineDataset, OfflineDatasetConfig};
