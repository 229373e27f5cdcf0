//! Utilities.
use anyhow::{Context, Result};
use candle_core::{backprop::GradStore, DType, Device, Tensor, Var, WithDType};
use candle_nn::VarMap;
use log::trace;
use ndarray::ArrayD;
use num_traits::AsPrimitive;
use std::convert::TryFrom;

/// Interface for handling input dimensions of a network configuration.
pub trait InDim {
    /// Returns the input dimension.
    fn get_in_dim(&self) -> i64;

    /// Sets the input dimension.
    fn set_in_dim(&mut self, v: i64);
}

/// Interface for handling output dimensions of a network configuration.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> i64;

    /// Sets the  output dimension.
    fn set_out_dim(&mut self, v: i64);
}

/// Overwrites variables in `dest` with the values of the same-named variables in `src`.
///
/// This is a hard copy, the values of `dest` before the call do not matter.
/// The storage is not shared afterwards: later updates of `src` do not leak into `dest`.
pub fn copy_vars(dest: &VarMap, src: &VarMap) -> Result<()> {
    let dest = dest
        .data()
        .lock()
        .map_err(|_| anyhow::anyhow!("Lock of destination variables is poisoned"))?;
    let src = src
        .data()
        .lock()
        .map_err(|_| anyhow::anyhow!("Lock of source variables is poisoned"))?;
    trace!("Copy {} variables", dest.len());

    for (k, v_dest) in dest.iter() {
        let v_src = src
            .get(k)
            .with_context(|| format!("Variable {} is missing in the source", k))?;
        v_dest.set(&v_src.as_tensor().detach())?;
    }

    Ok(())
}

/// Clamps every element of the gradients of `vars` into `[-clip, clip]`.
///
/// Variables without a gradient (not involved in the loss) are skipped.
pub fn clip_grad_value(grads: &mut GradStore, vars: &[Var], clip: f64) -> Result<()> {
    for var in vars {
        if let Some(g) = grads.remove(var.as_tensor()) {
            grads.insert(var.as_tensor(), g.clamp(-clip, clip)?);
        }
    }
    Ok(())
}

/// Expectile regression loss.
///
/// Returns the mean over all elements of `(1 - tau) * diff^2` where `diff <= 0`
/// and `tau * diff^2` where `diff > 0`. `tau` is not validated and should lie
/// in `(0, 1)`. At `tau = 0.5` the loss is `0.5 * mean(diff^2)`, i.e.
/// proportional to the mean squared error.
pub fn expectile_loss(diff: &Tensor, tau: f64) -> Result<Tensor> {
    let non_positive = diff.le(0f64)?.to_dtype(diff.dtype())?;
    let weight = ((non_positive * (1.0 - 2.0 * tau))? + tau)?;
    Ok((weight * diff.sqr()?)?.mean_all()?)
}

/// Mean squared error.
pub fn mse(pred: &Tensor, target: &Tensor) -> Result<Tensor> {
    Ok(candle_nn::loss::mse(pred, target)?)
}

/// Returns `1 - is_terminated` as a float tensor.
///
/// Any non-zero flag counts as terminal.
pub fn not_terminated(is_terminated: &Tensor) -> Result<Tensor> {
    let mask = is_terminated.ne(0f64)?.to_dtype(DType::F32)?;
    Ok(mask.affine(-1.0, 1.0)?)
}

/// Converts termination flags to a `[batch_size]` tensor of `0` and `1`.
pub fn is_terminated_to_tensor(is_terminated: &[i8], device: &Device) -> Result<Tensor> {
    let v = is_terminated
        .iter()
        .map(|&d| (d != 0) as u8 as f32)
        .collect::<Vec<_>>();
    Ok(Tensor::from_slice(&v[..], (v.len(),), device)?)
}

/// Converts rewards to a `[batch_size]` tensor.
pub fn reward_to_tensor(reward: &[f32], device: &Device) -> Result<Tensor> {
    Ok(Tensor::from_slice(reward, (reward.len(),), device)?)
}

/// Converts a vector into a tensor, casting the elements.
pub fn vec_to_tensor<T1, T2>(v: Vec<T1>, add_batch_dim: bool) -> Result<Tensor>
where
    T1: AsPrimitive<T2>,
    T2: WithDType,
{
    let v = v.iter().map(|e| e.as_()).collect::<Vec<_>>();
    let t: Tensor = TryFrom::<Vec<T2>>::try_from(v)?;

    match add_batch_dim {
        true => Ok(t.unsqueeze(0)?),
        false => Ok(t),
    }
}

/// Converts an array into a tensor of the same shape, casting the elements.
pub fn arrayd_to_tensor<T1, T2>(a: ArrayD<T1>, add_batch_dim: bool) -> Result<Tensor>
where
    T1: AsPrimitive<T2>,
    T2: WithDType,
{
    let shape = a.shape().to_vec();
    let v = a.iter().map(|e| e.as_()).collect::<Vec<_>>();
    let t: Tensor = TryFrom::<Vec<T2>>::try_from(v)?;
    let t = t.reshape(shape)?;

    match add_batch_dim {
        true => Ok(t.unsqueeze(0)?),
        false => Ok(t),
    }
}

/// Converts a tensor into an array of the same shape.
pub fn tensor_to_arrayd<T>(t: Tensor, delete_batch_dim: bool) -> Result<ArrayD<T>>
where
    T: WithDType,
{
    let shape = match delete_batch_dim {
        false => t.dims().to_vec(),
        true => t.dims()[1..].to_vec(),
    };
    let v: Vec<T> = t.flatten_all()?.to_vec1()?;

    Ok(ndarray::Array1::<T>::from(v).into_shape(ndarray::IxDyn(&shape))?)
}
