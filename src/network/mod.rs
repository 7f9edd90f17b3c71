/// Layer implementations (Conv2d, MaxPool2d, Flatten).
mod layers;

pub use layers::*;

use std::fmt;

use crate::error::Result;
use crate::observer::LayerDescriptor;
use crate::tensor::Tensor;

/// Identifies the type of a neural network layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    Conv2d,
    MaxPool2d,
    Flatten,
}

impl fmt::Display for LayerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerType::Conv2d => write!(f, "Conv2d"),
            LayerType::MaxPool2d => write!(f, "MaxPool2d"),
            LayerType::Flatten => write!(f, "Flatten"),
        }
    }
}

/// Trait for trainable layers.
///
/// `forward` must run before `backward`, and `backward` always refers to the most
/// recent `forward`. A model assembler chains layers by feeding each forward output
/// into the next layer and walking `backward` in reverse.
pub trait Layer {
    fn layer_type(&self) -> LayerType;
    fn describe(&self) -> LayerDescriptor;
    fn forward(&mut self, input: &Tensor) -> Result<Tensor>;
    fn backward(&mut self, top_diff: &Tensor) -> Result<Tensor>;

    /// Applies one SGD step with the gradients of the last backward. No-op for
    /// layers without parameters.
    fn update_param(&mut self, _lr: f64) -> Result<()> {
        Ok(())
    }
}
