//! Trainable CNN building blocks: 2D convolution, 2D max pooling and flatten.
//!
//! Convolution and pooling each ship a naive reference kernel and a faster one
//! (im2col + GEMM for convolution, plane-batched reduction for pooling). Both
//! kernels of a layer produce the same outputs and gradients to floating-point
//! tolerance, and the choice is fixed at construction.
//!
//! # Example
//!
//! ```
//! use cnnlayers::conv::ConvAlgorithm;
//! use cnnlayers::init::{GaussianInitializer, DEFAULT_WEIGHT_STD};
//! use cnnlayers::network::ConvolutionalLayer;
//! use cnnlayers::tensor::Tensor;
//!
//! let mut conv = ConvolutionalLayer::new(3, 1, 4, 1, 1, ConvAlgorithm::Im2col)?;
//! conv.init_param(DEFAULT_WEIGHT_STD, &mut GaussianInitializer::seeded(0))?;
//!
//! let input = Tensor::new(2, 1, 8, 8);
//! let output = conv.forward(&input)?;
//! assert_eq!(output.shape().0, [2, 4, 8, 8]);
//!
//! let bottom_diff = conv.backward(&Tensor::zeros(output.shape()))?;
//! assert_eq!(bottom_diff.shape(), input.shape());
//! conv.update_param(0.01)?;
//! # Ok::<(), cnnlayers::LayerError>(())
//! ```

/// Error taxonomy and `Result` alias.
pub mod error;
/// Dense NCHW tensor, padding helpers and the sliding-window view.
pub mod tensor;
/// Convolution kernels (naive, im2col + GEMM).
pub mod conv;
/// Max-pooling kernels (naive, batched).
pub mod pool;
/// Layer types and the `Layer` trait.
pub mod network;
/// Parameter initialisers.
pub mod init;
/// Diagnostic observer hooks.
pub mod observer;
/// Serde-loadable layer hyper-parameters.
pub mod config;

pub use error::{LayerError, Result};
pub use network::{ConvolutionalLayer, FlattenLayer, Layer, LayerType, MaxPoolingLayer};
pub use tensor::{Shape, Tensor};
