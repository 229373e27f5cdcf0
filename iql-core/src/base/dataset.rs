//! Fixed dataset of transitions for offline training.
use super::{BatchBase, GenericTransitionBatch};
use crate::error::CriticError;
use anyhow::Result;
use log::info;
use rand::{rngs::StdRng, RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration of [`OfflineDataset`].
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct OfflineDatasetConfig {
    /// Seed of the random number generator used for sampling minibatches.
    pub seed: u64,
}

impl Default for OfflineDatasetConfig {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl OfflineDatasetConfig {
    /// Sets the seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl<T: Clone> BatchBase for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn sample(&self, ixs: &[usize]) -> Result<Self> {
        ixs.iter()
            .map(|&ix| {
                self.get(ix)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("Index {} out of range", ix))
            })
            .collect()
    }
}

/// A fixed set of transitions, collected beforehand.
///
/// Transitions are never added or removed after construction. Minibatches are
/// drawn uniformly with replacement.
pub struct OfflineDataset<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    obs: O,
    act: A,
    next_obs: O,
    reward: Vec<f32>,
    is_terminated: Vec<i8>,
    rng: StdRng,
}

impl<O, A> OfflineDataset<O, A>
where
    O: BatchBase,
    A: BatchBase,
{
    /// Constructs a dataset from its columns.
    ///
    /// All columns must have the same number of transitions.
    pub fn new(
        config: &OfflineDatasetConfig,
        obs: O,
        act: A,
        next_obs: O,
        reward: Vec<f32>,
        is_terminated: Vec<i8>,
    ) -> Result<Self> {
        let n = obs.len();
        let check = |name: &'static str, actual: usize| {
            if actual == n {
                Ok(())
            } else {
                Err(CriticError::InconsistentLength {
                    name,
                    expected: n,
                    actual,
                })
            }
        };
        check("act", act.len())?;
        check("next_obs", next_obs.len())?;
        check("reward", reward.len())?;
        check("is_terminated", is_terminated.len())?;
        info!("Offline dataset with {} transitions", n);

        Ok(Self {
            obs,
            act,
            next_obs,
            reward,
            is_terminated,
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    /// Returns the number of transitions.
    pub fn len(&self) -> usize {
        self.reward.len()
    }

    /// Returns `true` if the dataset has no transitions.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty()
    }

    /// Returns the number of transitions ending an episode.
    pub fn num_terminated_flags(&self) -> usize {
        self.is_terminated.iter().filter(|&&d| d != 0).count()
    }

    /// Returns the sum of all rewards.
    pub fn sum_rewards(&self) -> f32 {
        self.reward.iter().sum()
    }

    /// Samples a minibatch of `size` transitions.
    pub fn batch(&mut self, size: usize) -> Result<GenericTransitionBatch<O, A>> {
        if self.is_empty() {
            return Err(CriticError::EmptyDataset.into());
        }
        let n = self.len();
        let ixs = (0..size)
            .map(|_| (self.rng.next_u32() as usize) % n)
            .collect::<Vec<_>>();

        self.take(&ixs)
    }

    /// Returns the transitions at the given indices as a batch.
    ///
    /// Fails if an index is out of range.
    pub fn take(&self, ixs: &[usize]) -> Result<GenericTransitionBatch<O, A>> {
        if let Some(&ix) = ixs.iter().find(|&&ix| ix >= self.len()) {
            anyhow::bail!("Index {} out of range of a dataset of {}", ix, self.len());
        }
        Ok(GenericTransitionBatch {
            obs: self.obs.sample(ixs)?,
            act: self.act.sample(ixs)?,
            next_obs: self.next_obs.sample(ixs)?,
            reward: ixs.iter().map(|&ix| self.reward[ix]).collect(),
            is_terminated: ixs.iter().map(|&ix| self.is_terminated[ix]).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransitionBatch;

    fn dataset(seed: u64) -> OfflineDataset<Vec<[f32; 2]>, Vec<i64>> {
        let obs = vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let next_obs = vec![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let act = vec![0, 1, 2, 1];
        let reward = vec![0.0, 1.0, 2.0, 3.0];
        let is_terminated = vec![0, 0, 0, 1];
        let config = OfflineDatasetConfig::default().seed(seed);
        OfflineDataset::new(&config, obs, act, next_obs, reward, is_terminated).unwrap()
    }

    #[test]
    fn batch_keeps_transitions_aligned() -> Result<()> {
        let mut ds = dataset(0);
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.num_terminated_flags(), 1);
        assert_eq!(ds.sum_rewards(), 6.0);

        let batch = ds.batch(16)?;
        assert_eq!(batch.len(), 16);
        let (obs, act, next_obs, reward, is_terminated) = batch.unpack();
        for i in 0..16 {
            // Each row of the toy dataset is identified by its reward.
            let ix = reward[i] as usize;
            assert_eq!(obs[i], [ix as f32, ix as f32]);
            assert_eq!(next_obs[i], [ix as f32 + 1.0, ix as f32 + 1.0]);
            assert_eq!(act[i], [0, 1, 2, 1][ix]);
            assert_eq!(is_terminated[i], (ix == 3) as i8);
        }
        Ok(())
    }

    #[test]
    fn same_seed_same_batches() -> Result<()> {
        let mut ds1 = dataset(7);
        let mut ds2 = dataset(7);
        for _ in 0..3 {
            assert_eq!(ds1.batch(8)?.reward, ds2.batch(8)?.reward);
        }
        Ok(())
    }

    #[test]
    fn rejects_inconsistent_columns() {
        let config = OfflineDatasetConfig::default();
        let res = OfflineDataset::new(
            &config,
            vec![[0f32; 2]; 3],
            vec![0i64; 2],
            vec![[0f32; 2]; 3],
            vec![0.0; 3],
            vec![0; 3],
        );
        let err = res.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<CriticError>(),
            Some(CriticError::InconsistentLength { name: "act", .. })
        ));
    }

    #[test]
    fn empty_dataset_cannot_be_sampled() {
        let config = OfflineDatasetConfig::default();
        let mut ds = OfflineDataset::new(
            &config,
            Vec::<[f32; 2]>::new(),
            Vec::<i64>::new(),
            Vec::new(),
            vec![],
            vec![],
        )
        .unwrap();
        assert!(ds.is_empty());
        assert!(ds.batch(4).is_err());
    }
}
