//! Critic.
use super::TransitionBatch;
use crate::record::Record;
use anyhow::Result;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// A critic trained from batches of transitions.
///
/// The training loop is responsible for the cadence of calls: it samples a
/// batch, calls [`Critic::update`], and every now and then
/// [`Critic::update_target_network`].
pub trait Critic<B: TransitionBatch> {
    /// Performs one update of all trained networks on the given batch.
    ///
    /// The returned record holds the losses of the update, for logging only.
    fn update(&mut self, batch: B) -> Result<Record>;

    /// Copies the parameters of the trained networks into their target networks.
    fn update_target_network(&mut self) -> Result<()>;

    /// Saves the parameters of the critic in the given directory.
    ///
    /// Returns the paths of the created files.
    fn save_params(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Loads the parameters of the critic from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}

/// An object constructed from a serializable configuration.
pub trait Configurable {
    /// Configuration.
    type Config: Clone + DeserializeOwned;

    /// Builds the object.
    fn build(config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Builds the object with the configuration in the YAML file of the given path.
    fn build_from_path(path: impl AsRef<Path>) -> Result<Self>
    where
        Self: Sized,
    {
        let file = std::fs::File::open(path)?;
        let rdr = std::io::BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Self::build(config)
    }
}
