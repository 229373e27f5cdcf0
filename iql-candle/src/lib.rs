//! Implicit Q-learning (IQL) critic implemented with [candle](https://crates.io/crates/candle-core).
//!
//! The critic trains a state-value network `V` with expectile regression
//! against a target action-value network, and an action-value network `Q`
//! with one-step TD targets bootstrapped from `V`. See [`iql::IqlCritic`].
pub mod iql;
pub mod mlp;
pub mod model;
pub mod opt;
mod tensor_batch;
pub mod util;
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
pub use tensor_batch::TensorBatch;

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl TryFrom<Device> for candle_core::Device {
    type Error = candle_core::Error;

    fn try_from(device: Device) -> Result<Self, Self::Error> {
        match device {
            Device::Cpu => Ok(candle_core::Device::Cpu),
            Device::Cuda(n) => candle_core::Device::new_cuda(n),
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}
