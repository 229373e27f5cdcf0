//! Learning rate schedules.
use super::Optimizer;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};

/// Maps the number of applied steps to a multiplier of the base learning rate.
pub type LrLambda = Arc<dyn Fn(usize) -> f64 + Send + Sync>;

/// Serializable learning rate schedules.
///
/// For schedules not covered here, pass a closure to
/// [`IqlCritic::with_lr_lambda`](crate::iql::IqlCritic::with_lr_lambda).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum LrSchedule {
    /// The base learning rate is used throughout training.
    Constant,

    /// Linear interpolation between `(step, multiplier)` endpoints.
    ///
    /// Endpoints must be sorted by step. Outside of the covered range the
    /// multiplier is `outside_value`.
    PiecewiseLinear {
        /// `(step, multiplier)` pairs.
        endpoints: Vec<(usize, f64)>,

        /// Multiplier outside the range of the endpoints.
        outside_value: f64,
    },
}

impl LrSchedule {
    /// Returns the multiplier at step `t`.
    pub fn value(&self, t: usize) -> f64 {
        match self {
            Self::Constant => 1.0,
            Self::PiecewiseLinear {
                endpoints,
                outside_value,
            } => endpoints
                .windows(2)
                .find(|w| w[0].0 <= t && t < w[1].0)
                .map(|w| {
                    let ((l_t, l), (r_t, r)) = (w[0], w[1]);
                    let alpha = (t - l_t) as f64 / (r_t - l_t) as f64;
                    l + alpha * (r - l)
                })
                .unwrap_or(*outside_value),
        }
    }

    /// Returns the schedule as a function.
    pub fn to_lambda(&self) -> LrLambda {
        let schedule = self.clone();
        Arc::new(move |t| schedule.value(t))
    }
}

/// Adjusts the learning rate of an optimizer at every step.
///
/// The learning rate after `k` calls of [`LrScheduler::step`] is
/// `base_lr * lambda(k)`, where `base_lr` is the learning rate the
/// optimizer was built with.
pub struct LrScheduler {
    base_lr: f64,
    lambda: LrLambda,
    n_steps: usize,
}

impl fmt::Debug for LrScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LrScheduler")
            .field("base_lr", &self.base_lr)
            .field("n_steps", &self.n_steps)
            .finish()
    }
}

impl LrScheduler {
    /// Creates a scheduler and applies `lambda(0)` to the optimizer.
    pub fn new(opt: &mut Optimizer, lambda: LrLambda) -> Self {
        let base_lr = opt.learning_rate();
        opt.set_learning_rate(base_lr * lambda(0));
        Self {
            base_lr,
            lambda,
            n_steps: 0,
        }
    }

    /// Advances the schedule by one step.
    pub fn step(&mut self, opt: &mut Optimizer) {
        self.n_steps += 1;
        opt.set_learning_rate(self.lr());
    }

    /// Replaces the schedule function and applies it at the current step.
    pub fn set_lambda(&mut self, lambda: LrLambda, opt: &mut Optimizer) {
        self.lambda = lambda;
        opt.set_learning_rate(self.lr());
    }

    /// Returns the learning rate at the current step.
    pub fn lr(&self) -> f64 {
        self.base_lr * (self.lambda)(self.n_steps)
    }

    /// Returns the number of steps taken.
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opt::OptimizerConfig;
    use anyhow::Result;
    use candle_core::{DType, Device, Var};

    #[test]
    fn piecewise_linear_interpolates() {
        let s = LrSchedule::PiecewiseLinear {
            endpoints: vec![(0, 1.0), (10, 0.5), (20, 0.1)],
            outside_value: 0.1,
        };
        assert_eq!(s.value(0), 1.0);
        assert!((s.value(5) - 0.75).abs() < 1e-12);
        assert_eq!(s.value(10), 0.5);
        assert!((s.value(15) - 0.3).abs() < 1e-12);
        assert_eq!(s.value(20), 0.1);
        assert_eq!(s.value(1000), 0.1);
        assert_eq!(LrSchedule::Constant.value(1000), 1.0);
    }

    #[test]
    fn scheduler_follows_lambda() -> Result<()> {
        let var = Var::zeros(3, DType::F32, &Device::Cpu)?;
        let mut opt = OptimizerConfig::Adam { lr: 0.1 }.build(vec![var])?;
        let mut scheduler = LrScheduler::new(&mut opt, Arc::new(|t| 1.0 / (t as f64 + 1.0)));
        assert!((opt.learning_rate() - 0.1).abs() < 1e-12);

        scheduler.step(&mut opt);
        assert!((opt.learning_rate() - 0.05).abs() < 1e-12);
        scheduler.step(&mut opt);
        assert!((opt.learning_rate() - 0.1 / 3.0).abs() < 1e-12);
        assert_eq!(scheduler.n_steps(), 2);

        scheduler.set_lambda(Arc::new(|_| 2.0), &mut opt);
        assert!((opt.learning_rate() - 0.2).abs() < 1e-12);
        Ok(())
    }
}
