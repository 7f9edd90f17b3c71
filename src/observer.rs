//! Diagnostic hooks for layers.
//!
//! Layers stay silent unless an observer is attached with `with_observer`.
//! [`TracingObserver`] forwards every event to `tracing`.

use std::fmt;
use std::sync::Arc;

use crate::network::LayerType;
use crate::tensor::Shape;

/// Static description of a layer, emitted once at construction.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerDescriptor {
    Conv2d {
        kernel_size: usize,
        channel_in: usize,
        channel_out: usize,
        padding: usize,
        stride: usize,
        algorithm: crate::conv::ConvAlgorithm,
    },
    MaxPool2d {
        kernel_size: usize,
        stride: usize,
        algorithm: crate::pool::PoolAlgorithm,
    },
    Flatten {
        input_shape: [usize; 3],
        output_shape: Vec<usize>,
    },
}

impl LayerDescriptor {
    pub fn layer_type(&self) -> LayerType {
        match self {
            LayerDescriptor::Conv2d { .. } => LayerType::Conv2d,
            LayerDescriptor::MaxPool2d { .. } => LayerType::MaxPool2d,
            LayerDescriptor::Flatten { .. } => LayerType::Flatten,
        }
    }
}

impl fmt::Display for LayerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerDescriptor::Conv2d {
                kernel_size,
                channel_in,
                channel_out,
                ..
            } => write!(
                f,
                "Convolutional layer with kernel size {}, input channel {}, output channel {}.",
                kernel_size, channel_in, channel_out
            ),
            LayerDescriptor::MaxPool2d {
                kernel_size, stride, ..
            } => write!(
                f,
                "Max pooling layer with kernel size {}, stride {}.",
                kernel_size, stride
            ),
            LayerDescriptor::Flatten {
                input_shape,
                output_shape,
            } => write!(
                f,
                "Flatten layer with input shape {:?}, output shape {:?}.",
                input_shape, output_shape
            ),
        }
    }
}

/// Something that happened inside a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerEvent {
    Constructed(LayerDescriptor),
    Forward {
        layer: LayerType,
        input: Shape,
        output: Shape,
    },
    Backward {
        layer: LayerType,
        top_diff: Shape,
        bottom_diff: Shape,
    },
    ParamsUpdated {
        layer: LayerType,
        lr: f64,
    },
}

/// Receives [`LayerEvent`]s from the layers it is attached to.
pub trait LayerObserver: Send + Sync {
    fn on_event(&self, event: &LayerEvent);
}

/// Emits every event as a `tracing` record.
///
/// Construction is logged at `debug`, per-call events at `trace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl LayerObserver for TracingObserver {
    fn on_event(&self, event: &LayerEvent) {
        match event {
            LayerEvent::Constructed(desc) => {
                tracing::debug!(layer = %desc.layer_type(), "{}", desc);
            }
            LayerEvent::Forward { layer, input, output } => {
                tracing::trace!(layer = %layer, input = %input, output = %output, "forward");
            }
            LayerEvent::Backward {
                layer,
                top_diff,
                bottom_diff,
            } => {
                tracing::trace!(layer = %layer, top_diff = %top_diff, bottom_diff = %bottom_diff, "backward");
            }
            LayerEvent::ParamsUpdated { layer, lr } => {
                tracing::trace!(layer = %layer, lr = *lr, "update_param");
            }
        }
    }
}

/// Optional observer slot shared by every layer.
#[derive(Clone, Default)]
pub(crate) struct ObserverSlot(Option<Arc<dyn LayerObserver>>);

impl ObserverSlot {
    pub(crate) fn set(&mut self, observer: Arc<dyn LayerObserver>) {
        self.0 = Some(observer);
    }

    pub(crate) fn emit(&self, event: impl FnOnce() -> LayerEvent) {
        if let Some(observer) = &self.0 {
            observer.on_event(&event());
        }
    }
}

impl fmt::Debug for ObserverSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.0.is_some() { "Some(<observer>)" } else { "None" })
    }
}
