//! Implicit Q-learning (IQL) critic.
//!
//! The critic consists of three networks:
//!
//! * `V`, a state-value function trained with [`expectile_loss`] against the
//!   target action-value of the action in the batch,
//! * `Q`, an action-value function over discrete actions trained with the
//!   one-step TD target `r + gamma * V(o') * (1 - terminal)`,
//! * `Q_target`, a copy of `Q` refreshed by [`IqlCritic::update_target_network`].
//!
//! [`expectile_loss`]: crate::util::expectile_loss
mod action_value;
mod base;
mod config;
mod value;
pub use action_value::ActionValue;
pub use base::IqlCritic;
pub use config::{IqlCriticConfig, ObDim};
pub use value::Value;
