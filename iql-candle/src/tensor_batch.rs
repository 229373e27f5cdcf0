use crate::util::{arrayd_to_tensor, vec_to_tensor};
use anyhow::Result;
use candle_core::Tensor;
use iql_core::BatchBase;
use ndarray::ArrayD;

/// A column of a dataset stored as a single [`Tensor`].
///
/// The first dimension is the batch dimension. Used for the observations and
/// actions of an [`OfflineDataset`](iql_core::OfflineDataset).
///
/// [`Tensor`]: https://docs.rs/candle-core/0.8.4/candle_core/struct.Tensor.html
#[derive(Clone, Debug)]
pub struct TensorBatch {
    buf: Tensor,
}

impl TensorBatch {
    /// Wraps a tensor whose first dimension is the batch dimension.
    pub fn from_tensor(t: Tensor) -> Self {
        Self { buf: t }
    }

    /// Creates observations as `f32` from an array of shape `[n, ...]`.
    pub fn from_arrayd<T>(a: ArrayD<T>) -> Result<Self>
    where
        T: num_traits::AsPrimitive<f32>,
    {
        Ok(Self::from_tensor(arrayd_to_tensor::<T, f32>(a, false)?))
    }

    /// Creates discrete actions as `i64` indices of shape `[n]`.
    pub fn from_actions<T>(act: Vec<T>) -> Result<Self>
    where
        T: num_traits::AsPrimitive<i64>,
    {
        Ok(Self::from_tensor(vec_to_tensor::<T, i64>(act, false)?))
    }
}

impl BatchBase for TensorBatch {
    fn len(&self) -> usize {
        self.buf.dims().first().copied().unwrap_or(0)
    }

    fn sample(&self, ixs: &[usize]) -> Result<Self> {
        let ixs = ixs.iter().map(|&x| x as u32).collect::<Vec<_>>();
        let n = ixs.len();
        let ixs = Tensor::from_vec(ixs, (n,), self.buf.device())?;
        let buf = self.buf.index_select(&ixs, 0)?;
        Ok(Self { buf })
    }
}

impl From<TensorBatch> for Tensor {
    fn from(b: TensorBatch) -> Self {
        b.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_selects_rows() -> Result<()> {
        let a = ArrayD::from_shape_vec(ndarray::IxDyn(&[3, 2]), vec![0f32, 0., 1., 1., 2., 2.])?;
        let obs = TensorBatch::from_arrayd(a)?;
        assert_eq!(obs.len(), 3);

        let t: Tensor = obs.sample(&[2, 0, 2])?.into();
        assert_eq!(t.to_vec2::<f32>()?, vec![vec![2., 2.], vec![0., 0.], vec![2., 2.]]);

        let act = TensorBatch::from_actions(vec![0usize, 2, 1])?;
        let t: Tensor = act.sample(&[1])?.into();
        assert_eq!(t.to_vec1::<i64>()?, vec![2]);
        Ok(())
    }
}
