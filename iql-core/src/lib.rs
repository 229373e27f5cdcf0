#![warn(missing_docs)]
//! Backend-independent building blocks of an Implicit Q-learning (IQL) critic.
//!
//! This crate holds the pieces that do not depend on a tensor library:
//!
//! * [`record`] - key-value records returned by update steps for logging.
//! * [`TransitionBatch`] / [`BatchBase`] - the shape of the training data.
//! * [`OfflineDataset`] - a fixed set of transitions sampled into minibatches.
//! * [`Critic`] / [`Configurable`] - the interface implemented by critics.
//!
//! The critic itself lives in the `iql-candle` crate.
pub mod record;

mod base;
pub use base::{
    BatchBase, Configurable, Critic, GenericTransitionBatch, OfflineDataset, OfflineDatasetConfig,
    TransitionBatch,
};

mod error;
pub use error::CriticError;
