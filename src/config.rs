//! Layer hyper-parameters.
//!
//! Each config deserialises from any serde format, so an external model description
//! can build layers with `from_config`. `validate` is the single place construction
//! parameters are checked.

use serde::{Deserialize, Serialize};

use crate::conv::ConvAlgorithm;
use crate::error::{LayerError, Result};
use crate::pool::PoolAlgorithm;

fn default_stride() -> usize {
    1
}

fn positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(LayerError::InvalidParameter(format!("{} must be positive", name)));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvConfig {
    pub kernel_size: usize,
    pub channel_in: usize,
    pub channel_out: usize,
    #[serde(default)]
    pub padding: usize,
    #[serde(default = "default_stride")]
    pub stride: usize,
    #[serde(default)]
    pub algorithm: ConvAlgorithm,
}

impl ConvConfig {
    pub fn validate(&self) -> Result<()> {
        positive("kernel_size", self.kernel_size)?;
        positive("channel_in", self.channel_in)?;
        positive("channel_out", self.channel_out)?;
        positive("stride", self.stride)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub kernel_size: usize,
    pub stride: usize,
    #[serde(default)]
    pub algorithm: PoolAlgorithm,
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        positive("kernel_size", self.kernel_size)?;
        positive("stride", self.stride)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenConfig {
    /// `(channels, height, width)` of one sample.
    pub input_shape: [usize; 3],
    /// Per-sample output dims, 1 to 3 of them.
    pub output_shape: Vec<usize>,
}

impl FlattenConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_shape.is_empty() || self.output_shape.len() > 3 {
            return Err(LayerError::InvalidParameter(format!(
                "flatten output shape must have 1 to 3 dims, got {:?}",
                self.output_shape
            )));
        }
        let in_count: usize = self.input_shape.iter().product();
        let out_count: usize = self.output_shape.iter().product();
        if in_count != out_count {
            return Err(LayerError::shape(
                "FlattenConfig",
                format!("{} elements ({:?})", in_count, self.input_shape),
                format!("{} elements ({:?})", out_count, self.output_shape),
            ));
        }
        Ok(())
    }

    /// Output dims padded with trailing 1s to `(c, h, w)`.
    pub fn output_dims(&self) -> [usize; 3] {
        let mut dims = [1usize; 3];
        for (d, &v) in dims.iter_mut().zip(&self.output_shape) {
            *d = v;
        }
        dims
    }
}
