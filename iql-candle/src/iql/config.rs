//! Configuration of IQL critic.
use crate::{
    model::SubModel1,
    opt::OptimizerSpec,
    util::{InDim, OutDim},
    Device,
};
use anyhow::Result;
use candle_core::Tensor;
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Dimension of observations.
///
/// Either the size of a flat observation vector or the shape of an
/// observation. Networks receive the product of the shape as their input
/// dimension.
#[derive(Debug, Deserialize, Serialize, PartialEq, Eq, Clone)]
#[serde(untagged)]
pub enum ObDim {
    /// Flat observation vector.
    Flat(usize),

    /// Shaped observation, e.g. `[channels, height, width]`.
    Shape(Vec<usize>),
}

impl ObDim {
    /// Returns the shape of a single observation.
    pub fn input_shape(&self) -> Vec<usize> {
        match self {
            Self::Flat(n) => vec![*n],
            Self::Shape(s) => s.clone(),
        }
    }

    /// Returns the number of elements of a single observation.
    pub fn flat_dim(&self) -> usize {
        match self {
            Self::Flat(n) => *n,
            Self::Shape(s) => s.iter().product(),
        }
    }
}

impl Default for ObDim {
    fn default() -> Self {
        Self::Flat(1)
    }
}

/// Configuration of [`IqlCritic`](super::IqlCritic).
#[derive(Deserialize, Serialize)]
pub struct IqlCriticConfig<Q, V>
where
    Q: SubModel1<Output = Tensor>,
    V: SubModel1<Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
    V::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
{
    /// Name of the environment the dataset was collected on, for logging.
    pub env_name: Option<String>,

    /// Dimension of observations.
    pub ob_dim: ObDim,

    /// Number of discrete actions.
    pub ac_dim: usize,

    /// Reserved for a double-Q variant; the updates do not use it.
    pub double_q: bool,

    /// Bound of gradient elements, applied before every optimizer step.
    pub grad_norm_clipping: f64,

    /// Discount factor.
    pub gamma: f64,

    /// Expectile of the value regression, tau in `(0, 1)`.
    pub iql_expectile: f64,

    /// Configuration of the action-value network.
    ///
    /// Input and output dimensions are overwritten with `ob_dim` and `ac_dim`.
    pub q_config: Option<Q::Config>,

    /// Configuration of the value network.
    ///
    /// Input and output dimensions are overwritten with `ob_dim` and `1`.
    pub value_config: Option<V::Config>,

    /// Optimizer and learning rate schedule, used for both networks.
    pub optimizer_spec: OptimizerSpec,

    /// Device of the networks.
    pub device: Option<Device>,
}

// Not derived, derives would put bounds on `Q` and `V` themselves.
impl<Q, V> Debug for IqlCriticConfig<Q, V>
where
    Q: SubModel1<Output = Tensor>,
    V: SubModel1<Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
    V::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IqlCriticConfig")
            .field("env_name", &self.env_name)
            .field("ob_dim", &self.ob_dim)
            .field("ac_dim", &self.ac_dim)
            .field("double_q", &self.double_q)
            .field("grad_norm_clipping", &self.grad_norm_clipping)
            .field("gamma", &self.gamma)
            .field("iql_expectile", &self.iql_expectile)
            .field("q_config", &self.q_config)
            .field("value_config", &self.value_config)
            .field("optimizer_spec", &self.optimizer_spec)
            .field("device", &self.device)
            .finish()
    }
}

impl<Q, V> PartialEq for IqlCriticConfig<Q, V>
where
    Q: SubModel1<Output = Tensor>,
    V: SubModel1<Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
    V::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
{
    fn eq(&self, other: &Self) -> bool {
        self.env_name == other.env_name
            && self.ob_dim == other.ob_dim
            && self.ac_dim == other.ac_dim
            && self.double_q == other.double_q
            && self.grad_norm_clipping == other.grad_norm_clipping
            && self.gamma == other.gamma
            && self.iql_expectile == other.iql_expectile
            && self.q_config == other.q_config
            && self.value_config == other.value_config
            && self.optimizer_spec == other.optimizer_spec
            && self.device == other.device
    }
}

impl<Q, V> Clone for IqlCriticConfig<Q, V>
where
    Q: SubModel1<Output = Tensor>,
    V: SubModel1<Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
    V::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
{
    fn clone(&self) -> Self {
        Self {
            env_name: self.env_name.clone(),
            ob_dim: self.ob_dim.clone(),
            ac_dim: self.ac_dim,
            double_q: self.double_q,
            grad_norm_clipping: self.grad_norm_clipping,
            gamma: self.gamma,
            iql_expectile: self.iql_expectile,
            q_config: self.q_config.clone(),
            value_config: self.value_config.clone(),
            optimizer_spec: self.optimizer_spec.clone(),
            device: self.device,
        }
    }
}

impl<Q, V> Default for IqlCriticConfig<Q, V>
where
    Q: SubModel1<Output = Tensor>,
    V: SubModel1<Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
    V::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
{
    fn default() -> Self {
        Self {
            env_name: None,
            ob_dim: ObDim::default(),
            ac_dim: 1,
            double_q: false,
            grad_norm_clipping: 10.0,
            gamma: 0.99,
            iql_expectile: 0.7,
            q_config: None,
            value_config: None,
            optimizer_spec: OptimizerSpec::default(),
            device: None,
        }
    }
}

impl<Q, V> IqlCriticConfig<Q, V>
where
    Q: SubModel1<Output = Tensor>,
    V: SubModel1<Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
    V::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
{
    /// Name of the environment.
    pub fn env_name(mut self, v: impl Into<String>) -> Self {
        self.env_name = Some(v.into());
        self
    }

    /// Dimension of observations.
    pub fn ob_dim(mut self, v: ObDim) -> Self {
        self.ob_dim = v;
        self
    }

    /// Number of discrete actions.
    pub fn ac_dim(mut self, v: usize) -> Self {
        self.ac_dim = v;
        self
    }

    /// Sets the double-Q flag.
    pub fn double_q(mut self, v: bool) -> Self {
        self.double_q = v;
        self
    }

    /// Bound of gradient elements.
    pub fn grad_norm_clipping(mut self, v: f64) -> Self {
        self.grad_norm_clipping = v;
        self
    }

    /// Discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// Expectile of the value regression.
    pub fn iql_expectile(mut self, v: f64) -> Self {
        self.iql_expectile = v;
        self
    }

    /// Configuration of the action-value network.
    pub fn q_config(mut self, v: Q::Config) -> Self {
        self.q_config = Some(v);
        self
    }

    /// Configuration of the value network.
    pub fn value_config(mut self, v: V::Config) -> Self {
        self.value_config = Some(v);
        self
    }

    /// Optimizer and learning rate schedule.
    pub fn optimizer_spec(mut self, v: OptimizerSpec) -> Self {
        self.optimizer_spec = v;
        self
    }

    /// Device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Saves [`IqlCriticConfig`] to YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of IQL critic into {:?}", path_);
        Ok(())
    }

    /// Constructs [`IqlCriticConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of IQL critic from {:?}", path_);
        Ok(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mlp::{Mlp, MlpConfig},
        opt::{LrSchedule, OptimizerConfig},
    };
    use tempdir::TempDir;

    type Config = IqlCriticConfig<Mlp, Mlp>;

    #[test]
    fn ob_dim_accepts_int_or_shape() -> Result<()> {
        let flat: ObDim = serde_yaml::from_str("4")?;
        assert_eq!(flat, ObDim::Flat(4));
        assert_eq!(flat.input_shape(), vec![4]);

        let shape: ObDim = serde_yaml::from_str("[3, 2, 2]")?;
        assert_eq!(shape, ObDim::Shape(vec![3, 2, 2]));
        assert_eq!(shape.flat_dim(), 12);
        Ok(())
    }

    #[test]
    fn yaml_round_trip() -> Result<()> {
        let tmp_dir = TempDir::new("iql_critic_config")?;
        let path = tmp_dir.path().join("config.yaml");

        let config = Config::default()
            .env_name("LunarLander-v3")
            .ob_dim(ObDim::Flat(8))
            .ac_dim(4)
            .double_q(true)
            .grad_norm_clipping(10.0)
            .discount_factor(0.95)
            .iql_expectile(0.8)
            .q_config(MlpConfig::new(8, vec![64, 64], 4, false))
            .value_config(MlpConfig::new(8, vec![64, 64], 1, false))
            .optimizer_spec(
                OptimizerSpec::default()
                    .opt_config(OptimizerConfig::Adam { lr: 1e-3 })
                    .lr_schedule(LrSchedule::PiecewiseLinear {
                        endpoints: vec![(0, 1.0), (20000, 0.5)],
                        outside_value: 0.5,
                    }),
            )
            .device(Device::Cpu);
        config.save(&path)?;
        let loaded = Config::load(&path)?;
        assert_eq!(config, loaded);
        Ok(())
    }
}
