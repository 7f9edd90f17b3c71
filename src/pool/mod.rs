/// Max-pooling kernel implementations.
///
/// Both kernels record, for every output cell, the flat input offset of the first
/// maximal element in row-major window order. Backward routes gradient through
/// those offsets and accumulates where windows overlap.

mod naive;
mod batched;

pub use naive::NaivePool;
pub use batched::BatchedPool;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tensor::Tensor;

/// Selects which max-pooling algorithm a layer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolAlgorithm {
    /// One window at a time, four nested loops (reference implementation).
    #[default]
    Naive,
    /// One max-reduction per window position across every `(n, c)` plane.
    Batched,
}

impl PoolAlgorithm {
    pub fn kernel(self) -> Box<dyn PoolKernel> {
        match self {
            PoolAlgorithm::Naive => Box::new(NaivePool),
            PoolAlgorithm::Batched => Box::new(BatchedPool),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolGeometry {
    pub kernel_size: usize,
    pub stride: usize,
    pub out_h: usize,
    pub out_w: usize,
}

/// Result of a pooling forward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolOutput {
    pub output: Tensor,
    /// Flat input offset of each output cell's maximum, in output NCHW order.
    pub argmax: Vec<usize>,
}

/// A forward/backward pair for 2D max pooling.
pub trait PoolKernel: fmt::Debug + Send + Sync {
    fn forward(&self, input: &Tensor, geom: &PoolGeometry) -> Result<PoolOutput>;

    /// `argmax` is the record returned by the forward call that produced `top_diff`'s shape.
    fn backward(
        &self,
        input: &Tensor,
        argmax: &[usize],
        top_diff: &Tensor,
        geom: &PoolGeometry,
    ) -> Result<Tensor>;
}
