//! Action-value function and its target network.
use crate::{
    model::SubModel1,
    opt::{LrLambda, OptimizerSpec, ScheduledOptimizer},
    util::copy_vars,
};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::{info, trace};
use std::path::{Path, PathBuf};

/// Action-value function `Q(o, .)` over discrete actions, paired with a
/// target network `Q_target` of the same architecture.
///
/// Only the parameters of `Q` are optimized. `Q_target` changes only through
/// [`ActionValue::sync_target`].
pub struct ActionValue<Q>
where
    Q: SubModel1<Output = Tensor>,
{
    varmap: VarMap,
    varmap_tgt: VarMap,
    q: Q,
    q_tgt: Q,
    opt: ScheduledOptimizer,
}

impl<Q> ActionValue<Q>
where
    Q: SubModel1<Output = Tensor>,
    Q::Config: Clone,
{
    /// Constructs [`ActionValue`].
    ///
    /// The target network starts as an exact copy of the online network.
    pub fn build(config: Q::Config, opt_spec: &OptimizerSpec, device: &Device) -> Result<Self> {
        let varmap = VarMap::new();
        let q = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, device).set_prefix("q");
            Q::build(vb, config.clone())?
        };
        let varmap_tgt = VarMap::new();
        let q_tgt = {
            let vb = VarBuilder::from_varmap(&varmap_tgt, DType::F32, device).set_prefix("q");
            Q::build(vb, config)?
        };
        copy_vars(&varmap_tgt, &varmap)?;
        let opt = opt_spec.build(varmap.all_vars())?;

        Ok(Self {
            varmap,
            varmap_tgt,
            q,
            q_tgt,
            opt,
        })
    }
}

impl<Q> ActionValue<Q>
where
    Q: SubModel1<Output = Tensor>,
{
    /// Returns action values of shape `[batch_size, ac_dim]`.
    pub fn forward(&self, obs: &Q::Input) -> Result<Tensor> {
        self.q.forward(obs)
    }

    /// Returns action values of the target network.
    pub fn forward_tgt(&self, obs: &Q::Input) -> Result<Tensor> {
        self.q_tgt.forward(obs)
    }

    /// Overwrites the target network with the current parameters of `Q`.
    pub fn sync_target(&mut self) -> Result<()> {
        trace!("Sync target action-value network");
        copy_vars(&self.varmap_tgt, &self.varmap)
    }

    /// Backward step for all variables in the action-value network.
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

    /// Returns the parameters of `Q`.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Returns the parameters of `Q_target`.
    pub fn varmap_tgt(&self) -> &VarMap {
        &self.varmap_tgt
    }

    /// Saves the parameters to `q.pt` and `q_tgt.pt` in the given directory.
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let path = dir.as_ref().join("q.pt");
        let path_tgt = dir.as_ref().join("q_tgt.pt");
        self.varmap.save(&path)?;
        self.varmap_tgt.save(&path_tgt)?;
        info!("Save action-value network parameters to {:?}", path);
        info!("Save target action-value network parameters to {:?}", path_tgt);

        Ok(vec![path, path_tgt])
    }

    /// Loads the parameters from `q.pt` and `q_tgt.pt` in the given directory.
    pub fn load(&mut self, dir: impl AsRef<Path>) -> Result<()> {
        let path = dir.as_ref().join("q.pt");
        let path_tgt = dir.as_ref().join("q_tgt.pt");
        self.varmap.load(&path)?;
        self.varmap_tgt.load(&path_tgt)?;
        info!("Load action-value network parameters from {:?}", path);
        info!("Load target action-value network parameters from {:?}", path_tgt);

        Ok(())
    }
}
