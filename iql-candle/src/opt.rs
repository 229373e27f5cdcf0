//! Optimizers and learning rate schedules.
mod schedule;
use crate::util::clip_grad_value;
use anyhow::Result;
use candle_core::{backprop::GradStore, Tensor, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW, SGD};
use candle_optimisers::adam::{Adam, ParamsAdam};
use log::trace;
pub use schedule::{LrLambda, LrSchedule, LrScheduler};
use serde::{Deserialize, Serialize};

/// Configuration of optimizer for training neural networks in the critic.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// AdamW optimizer.
    AdamW {
        lr: f64,
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[serde(default = "default_beta2")]
        beta2: f64,
        #[serde(default = "default_eps")]
        eps: f64,
        #[serde(default = "default_weight_decay")]
        weight_decay: f64,
    },

    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
    },

    /// Stochastic gradient descent without momentum.
    Sgd {
        /// Learning rate.
        lr: f64,
    },
}

fn default_beta1() -> f64 {
    ParamsAdamW::default().beta1
}

fn default_beta2() -> f64 {
    ParamsAdamW::default().beta2
}

fn default_eps() -> f64 {
    ParamsAdamW::default().eps
}

fn default_weight_decay() -> f64 {
    ParamsAdamW::default().weight_decay
}

impl OptimizerConfig {
    /// Constructs an optimizer of the given variables.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        match &self {
            OptimizerConfig::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => {
                let params = ParamsAdamW {
                    lr: *lr,
                    beta1: *beta1,
                    beta2: *beta2,
                    eps: *eps,
                    weight_decay: *weight_decay,
                };
                let opt = AdamW::new(vars, params)?;
                Ok(Optimizer::AdamW(opt))
            }
            OptimizerConfig::Adam { lr } => {
                let params = ParamsAdam {
                    lr: *lr,
                    ..ParamsAdam::default()
                };
                let opt = Adam::new(vars, params)?;
                Ok(Optimizer::Adam(opt))
            }
            OptimizerConfig::Sgd { lr } => {
                let opt = SGD::new(vars, *lr)?;
                Ok(Optimizer::Sgd(opt))
            }
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam { lr: 1e-3 }
    }
}

/// Optimizers.
///
/// This is a thin wrapper of optimizers in `candle_nn` and `candle_optimisers`.
pub enum Optimizer {
    /// AdamW optimizer.
    AdamW(AdamW),

    /// Adam optimizer.
    Adam(Adam),

    /// Stochastic gradient descent.
    Sgd(SGD),
}

impl Optimizer {
    /// Applies one update with the given gradients.
    pub fn step(&mut self, grads: &GradStore) -> Result<()> {
        match self {
            Self::AdamW(opt) => Ok(opt.step(grads)?),
            Self::Adam(opt) => Ok(opt.step(grads)?),
            Self::Sgd(opt) => Ok(opt.step(grads)?),
        }
    }

    /// Returns the current learning rate.
    pub fn learning_rate(&self) -> f64 {
        match self {
            Self::AdamW(opt) => opt.learning_rate(),
            Self::Adam(opt) => opt.learning_rate(),
            Self::Sgd(opt) => opt.learning_rate(),
        }
    }

    /// Sets the learning rate used by the following steps.
    pub fn set_learning_rate(&mut self, lr: f64) {
        match self {
            Self::AdamW(opt) => opt.set_learning_rate(lr),
            Self::Adam(opt) => opt.set_learning_rate(lr),
            Self::Sgd(opt) => opt.set_learning_rate(lr),
        }
    }
}

/// Optimizer together with its learning rate schedule.
///
/// One such spec is shared by the value and action-value networks; each
/// network builds its own [`ScheduledOptimizer`] from it.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OptimizerSpec {
    /// Configuration of the optimizer.
    pub opt_config: OptimizerConfig,

    /// Multiplier of the base learning rate as a function of the step count.
    pub lr_schedule: LrSchedule,
}

impl Default for OptimizerSpec {
    fn default() -> Self {
        Self {
            opt_config: OptimizerConfig::default(),
            lr_schedule: LrSchedule::Constant,
        }
    }
}

impl OptimizerSpec {
    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets learning rate schedule.
    pub fn lr_schedule(mut self, v: LrSchedule) -> Self {
        self.lr_schedule = v;
        self
    }

    /// Builds an optimizer of the given variables, driven by the schedule of this spec.
    pub fn build(&self, vars: Vec<Var>) -> Result<ScheduledOptimizer> {
        let mut opt = self.opt_config.build(vars.clone())?;
        let scheduler = LrScheduler::new(&mut opt, self.lr_schedule.to_lambda());
        Ok(ScheduledOptimizer {
            vars,
            opt,
            scheduler,
        })
    }
}

/// An optimizer bound to a set of variables, with a learning rate schedule.
pub struct ScheduledOptimizer {
    vars: Vec<Var>,
    opt: Optimizer,
    scheduler: LrScheduler,
}

impl ScheduledOptimizer {
    /// Applies a full update step with the given loss.
    ///
    /// Computes gradients, clamps each gradient element into `[-clip, clip]`,
    /// updates the variables and advances the learning rate schedule.
    pub fn backward_step(&mut self, loss: &Tensor, clip: f64) -> Result<()> {
        let mut grads = loss.backward()?;
        clip_grad_value(&mut grads, &self.vars, clip)?;
        self.opt.step(&grads)?;
        self.scheduler.step(&mut self.opt);
        trace!(
            "Optimizer step {}, lr = {}",
            self.scheduler.n_steps(),
            self.opt.learning_rate()
        );
        Ok(())
    }

    /// Replaces the learning rate schedule.
    ///
    /// The step count is kept, so the new schedule takes effect from the
    /// current step on.
    pub fn set_lr_lambda(&mut self, lambda: LrLambda) {
        self.scheduler.set_lambda(lambda, &mut self.opt);
    }

    /// Returns the current learning rate.
    pub fn learning_rate(&self) -> f64 {
        self.opt.learning_rate()
    }

    /// Returns the number of steps applied so far.
    pub fn n_steps(&self) -> usize {
        self.scheduler.n_steps()
    }
}
