//! Records returned by update steps of a critic.
//!
//! Every update of the critic returns a [`Record`] holding the values worth
//! logging, typically the loss of the step:
//!
//! ```rust
//! use iql_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("Training V Loss", 0.25);
//! record.insert("Training Q Loss", RecordValue::Scalar(1.5));
//!
//! assert_eq!(record.get_scalar("Training V Loss").unwrap(), 0.25);
//! ```
//!
//! What happens with a record afterwards (console, tensorboard, mlflow) is up
//! to the training loop driving the critic.
mod base;

pub use base::{Record, RecordValue};
