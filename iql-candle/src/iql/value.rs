//! State value function.
use crate::{
    model::SubModel1,
    opt::{LrLambda, OptimizerSpec, ScheduledOptimizer},
};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use std::path::{Path, PathBuf};

/// State value function `V(o)`.
///
/// Owns the [`VarMap`] holding the parameters of the network and the
/// optimizer of those parameters.
pub struct Value<V>
where
    V: SubModel1<Output = Tensor>,
{
    varmap: VarMap,
    value: V,
    opt: ScheduledOptimizer,
}

impl<V> Value<V>
where
    V: SubModel1<Output = Tensor>,
{
    /// Constructs [`Value`].
    ///
    /// The output dimension of `config` is expected to be `1`.
    pub fn build(config: V::Config, opt_spec: &OptimizerSpec, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let value = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, device).set_prefix("value");
            V::build(vb, config)?
        };
        let opt = opt_spec.build(varmap.all_vars())?;

        Ok(Self { varmap, value, opt })
    }

    /// Returns state values of shape `[batch_size, 1]`.
    pub fn forward(&self, obs: &V::Input) -> Result<Tensor> {
        self.value.forward(obs)
    }

    /// Backward step for all variables in the value network.
    pub fn backward_step(&mut self, loss: &Tensor, clip: f64) -> Result<()> {
        self.opt.backward_step(loss, clip)
    }

    /// Replaces the learning rate schedule of the optimizer.
    pub fn set_lr_lambda(&mut self, lambda: LrLambda) {
        self.opt.set_lr_lambda(lambda);
    }

    /// Returns the current learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.opt.learning_rate()
    }

    /// Returns the parameters of the network.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Saves the parameters to `value.pt` in the given directory.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = dir.as_ref().join("value.pt");
        self.varmap.save(&path)?;
        info!("Save value network parameters to {:?}", path);

        Ok(path)
    }

    /// Loads the parameters from `value.pt` in the given directory.
    pub fn load(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let path = dir.as_ref().join("value.pt");
        self.varmap.load(&path)?;
        info!("Load value network parameters from {:?}", path);

        Ok(())
    }
}
