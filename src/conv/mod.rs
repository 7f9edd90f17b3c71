/// Convolution kernel implementations.
///
/// Provides two interchangeable algorithms for the forward and backward pass of a
/// 2D convolution: naive (reference) nested loops and Im2col+GEMM.

mod naive;
mod im2col;
pub(crate) mod simd;

pub use naive::NaiveConv;
pub use im2col::{gemm_at_b, gemm_tiled, Im2colConv};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tensor::{Shape, Tensor};

/// Selects which convolution algorithm a layer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvAlgorithm {
    /// Nested loops, one dot product per output cell (reference implementation).
    #[default]
    Naive,
    /// Window gather into an im2col matrix + one tiled GEMM per pass.
    Im2col,
}

impl ConvAlgorithm {
    pub fn kernel(self) -> Box<dyn ConvKernel> {
        match self {
            ConvAlgorithm::Naive => Box::new(NaiveConv),
            ConvAlgorithm::Im2col => Box::new(Im2colConv),
        }
    }
}

/// Sizes shared by the forward and backward pass of one convolution call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub channel_in: usize,
    pub channel_out: usize,
    pub kernel_size: usize,
    pub stride: usize,
    pub padding: usize,
    /// Unpadded input height.
    pub in_h: usize,
    /// Unpadded input width.
    pub in_w: usize,
    pub out_h: usize,
    pub out_w: usize,
}

impl ConvGeometry {
    pub fn padded_h(&self) -> usize {
        self.in_h + 2 * self.padding
    }

    pub fn padded_w(&self) -> usize {
        self.in_w + 2 * self.padding
    }

    pub fn output_shape(&self, batch: usize) -> Shape {
        Shape::new(batch, self.channel_out, self.out_h, self.out_w)
    }
}

/// Gradients produced by one backward call.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvGrads {
    /// `(channel_in, k, k, channel_out)`
    pub d_weight: Tensor,
    /// `(channel_out, 1, 1, 1)`
    pub d_bias: Tensor,
    /// Gradient w.r.t. the unpadded input.
    pub bottom_diff: Tensor,
}

/// A forward/backward pair for 2D convolution.
///
/// `padded` is the zero-padded input `(N, channel_in, H+2p, W+2p)`, `weight` is
/// `(channel_in, k, k, channel_out)` and `bias` is `(channel_out, 1, 1, 1)`.
/// Callers validate shapes before dispatching.
pub trait ConvKernel: fmt::Debug + Send + Sync {
    fn forward(
        &self,
        padded: &Tensor,
        weight: &Tensor,
        bias: &Tensor,
        geom: &ConvGeometry,
    ) -> Result<Tensor>;

    fn backward(
        &self,
        padded: &Tensor,
        weight: &Tensor,
        top_diff: &Tensor,
        geom: &ConvGeometry,
    ) -> Result<ConvGrads>;
}
