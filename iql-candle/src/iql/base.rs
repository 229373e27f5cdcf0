use super::{ActionValue, IqlCriticConfig, Value};
use crate::{
    model::SubModel1,
    opt::LrLambda,
    util::{
        expectile_loss, is_terminated_to_tensor, mse, not_terminated, reward_to_tensor,
        tensor_to_arrayd, InDim, OutDim,
    },
};
use anyhow::Result;
use candle_core::{DType, Device, Tensor, D};
use candle_nn::VarMap;
use iql_core::{record::Record, Configurable, Critic, CriticError, TransitionBatch};
use log::{info, trace, warn};
use ndarray::ArrayD;
use serde::{de::DeserializeOwned, Serialize};
use std::{
    convert::TryFrom,
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Critic of implicit Q-learning (IQL) with discrete actions.
///
/// `V` is regressed on the `iql_expectile`-expectile of `Q_target(o, a)`
/// over the actions in the data, and `Q` on `r + gamma * V(o')`. Neither
/// update evaluates actions that are absent from the data.
///
/// The critic does not decide when the target network is synchronized; the
/// training loop calls [`IqlCritic::update_target_network`] at its own
/// cadence.
pub struct IqlCritic<Q, V>
where
    Q: SubModel1<Output = Tensor>,
    V: SubModel1<Input = Q::Input, Output = Tensor>,
{
    action_value: ActionValue<Q>,
    value: Value<V>,
    gamma: f64,
    iql_expectile: f64,
    grad_norm_clipping: f64,
    double_q: bool,
    env_name: Option<String>,
    device: Device,
}

impl<Q, V> IqlCritic<Q, V>
where
    Q: SubModel1<Output = Tensor>,
    V: SubModel1<Input = Q::Input, Output = Tensor>,
{
    /// Expectile regression loss of `diff` with expectile `tau`.
    ///
    /// See [`expectile_loss`](crate::util::expectile_loss).
    pub fn expectile_loss(diff: &Tensor, tau: f64) -> Result<Tensor> {
        expectile_loss(diff, tau)
    }

    /// Picks `q[i, act[i]]` for every row `i`.
    fn gather(&self, q: &Tensor, act: &Tensor) -> Result<Tensor> {
        let ixs = act
            .flatten_all()?
            .to_dtype(DType::I64)?
            .to_device(q.device())?
            .unsqueeze(1)?;
        Ok(q.gather(&ixs, D::Minus1)?.squeeze(D::Minus1)?)
    }

    /// Performs one expectile regression step of the value network.
    ///
    /// `act` holds the indices of the actions taken in the batch.
    pub fn update_v(&mut self, obs: &Q::Input, act: &Tensor) -> Result<Record> {
        trace!("IqlCritic::update_v()");
        let loss = {
            let q_tgt = self.action_value.forward_tgt(obs)?;
            let q_tgt = self.gather(&q_tgt, act)?.detach();
            let v = self.value.forward(obs)?.squeeze(D::Minus1)?;
            let diff = (q_tgt - v)?;
            expectile_loss(&diff, self.iql_expectile)?
        };
        self.value.backward_step(&loss, self.grad_norm_clipping)?;

        Ok(Record::from_scalar("Training V Loss", loss.to_scalar::<f32>()?))
    }

    /// Returns the bootstrapped target `reward + gamma * V(next_obs) * (1 - terminal)`.
    ///
    /// Any non-zero element of `terminal` marks a terminal transition. The
    /// returned tensor has shape `[batch_size]` and carries no gradient.
    pub fn td_target(
        &self,
        next_obs: &Q::Input,
        reward: &Tensor,
        terminal: &Tensor,
    ) -> Result<Tensor> {
        let v_next = self.value.forward(next_obs)?.squeeze(D::Minus1)?;
        let not_done = not_terminated(terminal)?.to_device(&self.device)?;
        let reward = reward.to_dtype(DType::F32)?.to_device(&self.device)?;
        let tgt = (reward + ((v_next * not_done)? * self.gamma)?)?;

        Ok(tgt.detach())
    }

    /// Performs one TD regression step of the action-value network.
    pub fn update_q(
        &mut self,
        obs: &Q::Input,
        act: &Tensor,
        next_obs: &Q::Input,
        reward: &Tensor,
        terminal: &Tensor,
    ) -> Result<Record> {
        trace!("IqlCritic::update_q()");
        let loss = {
            let tgt = self.td_target(next_obs, reward, terminal)?;
            let q = self.action_value.forward(obs)?;
            let pred = self.gather(&q, act)?;
            mse(&pred, &tgt)?
        };
        self.action_value.backward_step(&loss, self.grad_norm_clipping)?;

        Ok(Record::from_scalar("Training Q Loss", loss.to_scalar::<f32>()?))
    }

    /// Copies the parameters of `Q` into `Q_target`.
    pub fn update_target_network(&mut self) -> Result<()> {
        self.action_value.sync_target()
    }

    /// Saves the parameters of all networks in `dir`.
    ///
    /// Creates `q.pt`, `q_tgt.pt` and `value.pt` and returns their paths.
    pub fn save_params(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut paths = self.action_value.save(dir)?;
        paths.push(self.value.save(dir)?);

        Ok(paths)
    }

    /// Loads the parameters of all networks from `dir`.
    pub fn load_params(&mut self, dir: &Path) -> Result<()> {
        self.action_value.load(dir)?;
        self.value.load(dir)
    }

    /// Returns `Q(obs, a)` for all actions, shape `[batch_size, ac_dim]`.
    pub fn qa_values(&self, obs: &Q::Input) -> Result<Tensor> {
        Ok(self.action_value.forward(obs)?.detach())
    }

    /// Same as [`IqlCritic::qa_values`], copied to host memory.
    pub fn qa_values_array(&self, obs: &Q::Input) -> Result<ArrayD<f32>> {
        let q = self.qa_values(obs)?.to_dtype(DType::F32)?;
        tensor_to_arrayd(q, false)
    }

    /// Replaces the learning rate schedules of both networks with `lambda`.
    ///
    /// `lambda` maps the number of optimizer steps taken so far to a
    /// multiplier of the base learning rate.
    pub fn with_lr_lambda(
        mut self,
        lambda: impl Fn(usize) -> f64 + Send + Sync + 'static,
    ) -> Self {
        let lambda: LrLambda = Arc::new(lambda);
        self.value.set_lr_lambda(lambda.clone());
        self.action_value.set_lr_lambda(lambda);
        self
    }

    /// Returns the current learning rates of the value and action-value networks.
    pub fn learning_rates(&self) -> (f64, f64) {
        (self.value.learning_rate(), self.action_value.learning_rate())
    }

    /// Discount factor.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Expectile of the value regression.
    pub fn iql_expectile(&self) -> f64 {
        self.iql_expectile
    }

    /// Bound of gradient elements.
    pub fn grad_norm_clipping(&self) -> f64 {
        self.grad_norm_clipping
    }

    /// The double-Q flag of the configuration.
    pub fn double_q(&self) -> bool {
        self.double_q
    }

    /// Name of the environment, if given.
    pub fn env_name(&self) -> Option<&str> {
        self.env_name.as_deref()
    }

    /// Device of the networks.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Parameters of `Q`.
    pub fn q_varmap(&self) -> &VarMap {
        self.action_value.varmap()
    }

    /// Parameters of `Q_target`.
    pub fn q_tgt_varmap(&self) -> &VarMap {
        self.action_value.varmap_tgt()
    }

    /// Parameters of `V`.
    pub fn value_varmap(&self) -> &VarMap {
        self.value.varmap()
    }
}

impl<Q, V> Configurable for IqlCritic<Q, V>
where
    Q: SubModel1<Output = Tensor>,
    V: SubModel1<Input = Q::Input, Output = Tensor>,
    Q::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
    V::Config: DeserializeOwned + Serialize + InDim + OutDim + Debug + PartialEq + Clone,
{
    type Config = IqlCriticConfig<Q, V>;

    fn build(config: Self::Config) -> Result<Self> {
        let device = Device::try_from(config.device.unwrap_or_default())?;
        let in_dim = config.ob_dim.flat_dim() as i64;

        let mut q_config = config
            .q_config
            .ok_or(CriticError::MissingConfig("q_config"))?;
        q_config.set_in_dim(in_dim);
        q_config.set_out_dim(config.ac_dim as i64);

        let mut value_config = config
            .value_config
            .ok_or(CriticError::MissingConfig("value_config"))?;
        value_config.set_in_dim(in_dim);
        value_config.set_out_dim(1);

        let action_value = ActionValue::build(q_config, &config.optimizer_spec, &device)?;
        let value = Value::build(value_config, &config.optimizer_spec, &device)?;

        if config.double_q {
            warn!("double_q is set but has no effect on the updates");
        }
        info!(
            "IQL critic for {}: ob_dim = {:?}, ac_dim = {}, gamma = {}, expectile = {}",
            config.env_name.as_deref().unwrap_or("unnamed environment"),
            config.ob_dim.input_shape(),
            config.ac_dim,
            config.gamma,
            config.iql_expectile,
        );

        Ok(Self {
            action_value,
            value,
            gamma: config.gamma,
            iql_expectile: config.iql_expectile,
            grad_norm_clipping: config.grad_norm_clipping,
            double_q: config.double_q,
            env_name: config.env_name,
            device,
        })
    }
}

impl<Q, V, B> Critic<B> for IqlCritic<Q, V>
where
    Q: SubModel1<Output = Tensor>,
    V: SubModel1<Input = Q::Input, Output = Tensor>,
    B: TransitionBatch,
    B::ObsBatch: Into<Q::Input>,
    B::ActBatch: Into<Tensor>,
{
    /// Updates `V` and then `Q` on the same batch.
    fn update(&mut self, batch: B) -> Result<Record> {
        let (obs, act, next_obs, reward, is_terminated) = batch.unpack();
        let obs = obs.into();
        let act = act.into();
        let next_obs = next_obs.into();
        let reward = reward_to_tensor(&reward, &self.device)?;
        let terminal = is_terminated_to_tensor(&is_terminated, &self.device)?;

        let mut record = self.update_v(&obs, &act)?;
        record.merge_inplace(self.update_q(&obs, &act, &next_obs, &reward, &terminal)?);

        Ok(record)
    }

    fn update_target_network(&mut self) -> Result<()> {
        IqlCritic::update_target_network(self)
    }

    fn save_params(&self, path: &Path) -> Result<Vec<PathBuf>> {
        IqlCritic::save_params(self, path)
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        IqlCritic::load_params(self, path)
    }
}
