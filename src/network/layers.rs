use std::sync::Arc;

use crate::config::{ConvConfig, FlattenConfig, PoolConfig};
use crate::conv::{ConvAlgorithm, ConvGeometry, ConvKernel};
use crate::error::{LayerError, Result};
use crate::init::ParamInitializer;
use crate::observer::{LayerDescriptor, LayerEvent, LayerObserver, ObserverSlot};
use crate::pool::{PoolAlgorithm, PoolGeometry, PoolKernel};
use crate::tensor::{output_size, Shape, Tensor};
use super::{Layer, LayerType};

/// Intermediates kept from the last convolution forward pass.
#[derive(Debug)]
struct ConvState {
    padded: Tensor,
    geom: ConvGeometry,
    output_shape: Shape,
}

/// 2D convolution layer.
///
/// Weight is `(channel_in, k, k, channel_out)`, bias is `(channel_out, 1, 1, 1)`.
/// Both start at zero; call [`ConvolutionalLayer::init_param`] or
/// [`ConvolutionalLayer::load_param`] before training.
#[derive(Debug)]
pub struct ConvolutionalLayer {
    config: ConvConfig,
    kernel: Box<dyn ConvKernel>,
    weight: Tensor,
    bias: Tensor,
    d_weight: Option<Tensor>,
    d_bias: Option<Tensor>,
    state: Option<ConvState>,
    observer: ObserverSlot,
}

impl ConvolutionalLayer {
    pub fn new(
        kernel_size: usize,
        channel_in: usize,
        channel_out: usize,
        padding: usize,
        stride: usize,
        algorithm: ConvAlgorithm,
    ) -> Result<Self> {
        Self::from_config(ConvConfig {
            kernel_size,
            channel_in,
            channel_out,
            padding,
            stride,
            algorithm,
        })
    }

    pub fn from_config(config: ConvConfig) -> Result<Self> {
        config.validate()?;
        let k = config.kernel_size;
        Ok(ConvolutionalLayer {
            kernel: config.algorithm.kernel(),
            weight: Tensor::new(config.channel_in, k, k, config.channel_out),
            bias: Tensor::new1(config.channel_out),
            d_weight: None,
            d_bias: None,
            state: None,
            observer: ObserverSlot::default(),
            config,
        })
    }

    /// Attaches a diagnostic observer and reports this layer's construction to it.
    pub fn with_observer(mut self, observer: Arc<dyn LayerObserver>) -> Self {
        self.observer.set(observer);
        let desc = Layer::describe(&self);
        self.observer.emit(|| LayerEvent::Constructed(desc));
        self
    }

    pub fn config(&self) -> &ConvConfig {
        &self.config
    }

    pub fn algorithm(&self) -> ConvAlgorithm {
        self.config.algorithm
    }

    pub fn weight(&self) -> &Tensor {
        &self.weight
    }

    pub fn bias(&self) -> &Tensor {
        &self.bias
    }

    fn weight_shape(&self) -> Shape {
        let k = self.config.kernel_size;
        Shape::new(self.config.channel_in, k, k, self.config.channel_out)
    }

    fn bias_shape(&self) -> Shape {
        Shape::new(self.config.channel_out, 1, 1, 1)
    }

    /// Output shape for an input of shape `input`.
    pub fn output_shape(&self, input: Shape) -> Result<Shape> {
        Ok(self.geometry(input)?.output_shape(input.n()))
    }

    fn geometry(&self, input: Shape) -> Result<ConvGeometry> {
        let cfg = &self.config;
        if input.c() != cfg.channel_in {
            return Err(LayerError::shape(
                "ConvolutionalLayer::forward",
                format!("{} input channels", cfg.channel_in),
                input,
            ));
        }
        Ok(ConvGeometry {
            channel_in: cfg.channel_in,
            channel_out: cfg.channel_out,
            kernel_size: cfg.kernel_size,
            stride: cfg.stride,
            padding: cfg.padding,
            in_h: input.h(),
            in_w: input.w(),
            out_h: output_size(input.h(), cfg.kernel_size, cfg.padding, cfg.stride)?,
            out_w: output_size(input.w(), cfg.kernel_size, cfg.padding, cfg.stride)?,
        })
    }

    /// Draws weight from `N(0, std^2)` and zeroes the bias.
    pub fn init_param(&mut self, std: f64, init: &mut dyn ParamInitializer) -> Result<()> {
        if !std.is_finite() || std < 0.0 {
            return Err(LayerError::InvalidParameter(format!(
                "weight std must be finite and non-negative, got {}",
                std
            )));
        }
        let shape = self.weight_shape();
        let [n, c, h, w] = shape.0;
        self.weight = Tensor::from_vec(n, c, h, w, init.normal(0.0, std, shape.numel()))?;
        self.bias = Tensor::zeros(self.bias_shape());
        Ok(())
    }

    /// Replaces weight and bias. Shapes must match exactly.
    pub fn load_param(&mut self, weight: Tensor, bias: Tensor) -> Result<()> {
        if weight.shape() != self.weight_shape() {
            return Err(LayerError::shape(
                "ConvolutionalLayer::load_param weight",
                self.weight_shape(),
                weight.shape(),
            ));
        }
        if bias.shape() != self.bias_shape() {
            return Err(LayerError::shape(
                "ConvolutionalLayer::load_param bias",
                self.bias_shape(),
                bias.shape(),
            ));
        }
        self.weight = weight;
        self.bias = bias;
        Ok(())
    }

    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        let geom = self.geometry(input.shape())?;
        let padded = input.pad(geom.padding);
        let output = self.kernel.forward(&padded, &self.weight, &self.bias, &geom)?;

        self.state = Some(ConvState {
            padded,
            geom,
            output_shape: output.shape(),
        });
        self.observer.emit(|| LayerEvent::Forward {
            layer: LayerType::Conv2d,
            input: input.shape(),
            output: output.shape(),
        });
        Ok(output)
    }

    /// Computes parameter gradients (kept for [`get_gradient`](Self::get_gradient))
    /// and returns the gradient w.r.t. the last forward's input.
    pub fn backward(&mut self, top_diff: &Tensor) -> Result<Tensor> {
        let state = self.state.as_ref().ok_or(LayerError::UninitializedState(
            "ConvolutionalLayer::backward called before forward",
        ))?;
        if top_diff.shape() != state.output_shape {
            return Err(LayerError::shape(
                "ConvolutionalLayer::backward",
                state.output_shape,
                top_diff.shape(),
            ));
        }

        let grads = self.kernel.backward(&state.padded, &self.weight, top_diff, &state.geom)?;
        self.d_weight = Some(grads.d_weight);
        self.d_bias = Some(grads.d_bias);

        self.observer.emit(|| LayerEvent::Backward {
            layer: LayerType::Conv2d,
            top_diff: top_diff.shape(),
            bottom_diff: grads.bottom_diff.shape(),
        });
        Ok(grads.bottom_diff)
    }

    /// `(d_weight, d_bias)` from the last backward.
    pub fn get_gradient(&self) -> Result<(&Tensor, &Tensor)> {
        match (&self.d_weight, &self.d_bias) {
            (Some(dw), Some(db)) => Ok((dw, db)),
            _ => Err(LayerError::UninitializedState(
                "ConvolutionalLayer::get_gradient called before backward",
            )),
        }
    }

    /// `weight -= lr * d_weight`, `bias -= lr * d_bias`.
    pub fn update_param(&mut self, lr: f64) -> Result<()> {
        let (d_weight, d_bias) = match (&self.d_weight, &self.d_bias) {
            (Some(dw), Some(db)) => (dw, db),
            _ => {
                return Err(LayerError::UninitializedState(
                    "ConvolutionalLayer::update_param called before backward",
                ))
            }
        };
        for (w, dw) in self.weight.data_mut().iter_mut().zip(d_weight.data()) {
            *w -= lr * dw;
        }
        for (b, db) in self.bias.data_mut().iter_mut().zip(d_bias.data()) {
            *b -= lr * db;
        }
        self.observer.emit(|| LayerEvent::ParamsUpdated {
            layer: LayerType::Conv2d,
            lr,
        });
        Ok(())
    }
}

impl Layer for ConvolutionalLayer {
    fn layer_type(&self) -> LayerType {
        LayerType::Conv2d
    }

    fn describe(&self) -> LayerDescriptor {
        let cfg = &self.config;
        LayerDescriptor::Conv2d {
            kernel_size: cfg.kernel_size,
            channel_in: cfg.channel_in,
            channel_out: cfg.channel_out,
            padding: cfg.padding,
            stride: cfg.stride,
            algorithm: cfg.algorithm,
        }
    }

    fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        ConvolutionalLayer::forward(self, input)
    }

    fn backward(&mut self, top_diff: &Tensor) -> Result<Tensor> {
        ConvolutionalLayer::backward(self, top_diff)
    }

    fn update_param(&mut self, lr: f64) -> Result<()> {
        ConvolutionalLayer::update_param(self, lr)
    }
}

/// Intermediates kept from the last pooling forward pass.
#[derive(Debug)]
struct PoolState {
    input: Tensor,
    argmax: Vec<usize>,
    geom: PoolGeometry,
    output_shape: Shape,
}

/// 2D max pooling layer. Channel count is preserved.
#[derive(Debug)]
pub struct MaxPoolingLayer {
    config: PoolConfig,
    kernel: Box<dyn PoolKernel>,
    state: Option<PoolState>,
    observer: ObserverSlot,
}

impl MaxPoolingLayer {
    pub fn new(kernel_size: usize, stride: usize, algorithm: PoolAlgorithm) -> Result<Self> {
        Self::from_config(PoolConfig {
            kernel_size,
            stride,
            algorithm,
        })
    }

    pub fn from_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(MaxPoolingLayer {
            kernel: config.algorithm.kernel(),
            state: None,
            observer: ObserverSlot::default(),
            config,
        })
    }

    /// Attaches a diagnostic observer and reports this layer's construction to it.
    pub fn with_observer(mut self, observer: Arc<dyn LayerObserver>) -> Self {
        self.observer.set(observer);
        let desc = Layer::describe(&self);
        self.observer.emit(|| LayerEvent::Constructed(desc));
        self
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn algorithm(&self) -> PoolAlgorithm {
        self.config.algorithm
    }

    fn geometry(&self, input: Shape) -> Result<PoolGeometry> {
        let cfg = &self.config;
        Ok(PoolGeometry {
            kernel_size: cfg.kernel_size,
            stride: cfg.stride,
            out_h: output_size(input.h(), cfg.kernel_size, 0, cfg.stride)?,
            out_w: output_size(input.w(), cfg.kernel_size, 0, cfg.stride)?,
        })
    }

    pub fn output_shape(&self, input: Shape) -> Result<Shape> {
        let geom = self.geometry(input)?;
        Ok(Shape::new(input.n(), input.c(), geom.out_h, geom.out_w))
    }

    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        let geom = self.geometry(input.shape())?;
        let pooled = self.kernel.forward(input, &geom)?;
        let output = pooled.output;

        self.state = Some(PoolState {
            input: input.clone(),
            argmax: pooled.argmax,
            geom,
            output_shape: output.shape(),
        });
        self.observer.emit(|| LayerEvent::Forward {
            layer: LayerType::MaxPool2d,
            input: input.shape(),
            output: output.shape(),
        });
        Ok(output)
    }

    /// Routes each gradient to the argmax cell of its window in the last forward.
    pub fn backward(&mut self, top_diff: &Tensor) -> Result<Tensor> {
        let state = self.state.as_ref().ok_or(LayerError::UninitializedState(
            "MaxPoolingLayer::backward called before forward",
        ))?;
        if top_diff.shape() != state.output_shape {
            return Err(LayerError::shape(
                "MaxPoolingLayer::backward",
                state.output_shape,
                top_diff.shape(),
            ));
        }

        let bottom_diff = self
            .kernel
            .backward(&state.input, &state.argmax, top_diff, &state.geom)?;

        self.observer.emit(|| LayerEvent::Backward {
            layer: LayerType::MaxPool2d,
            top_diff: top_diff.shape(),
            bottom_diff: bottom_diff.shape(),
        });
        Ok(bottom_diff)
    }

    /// One-hot mask over the last forward's input marking every window's argmax.
    pub fn max_index_mask(&self) -> Result<Tensor> {
        let state = self.state.as_ref().ok_or(LayerError::UninitializedState(
            "MaxPoolingLayer::max_index_mask called before forward",
        ))?;
        let mut mask = Tensor::zeros(state.input.shape());
        let data = mask.data_mut();
        for &idx in &state.argmax {
            data[idx] = 1.0;
        }
        Ok(mask)
    }
}

impl Layer for MaxPoolingLayer {
    fn layer_type(&self) -> LayerType {
        LayerType::MaxPool2d
    }

    fn describe(&self) -> LayerDescriptor {
        LayerDescriptor::MaxPool2d {
            kernel_size: self.config.kernel_size,
            stride: self.config.stride,
            algorithm: self.config.algorithm,
        }
    }

    fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        MaxPoolingLayer::forward(self, input)
    }

    fn backward(&mut self, top_diff: &Tensor) -> Result<Tensor> {
        MaxPoolingLayer::backward(self, top_diff)
    }
}

/// Reshapes `(N, C, H, W)` feature maps into `(N, *output_shape)`.
///
/// The channel axis is moved last before reshaping, so the flat order is
/// `(h, w, c)` per sample. This matches weights exported from channel-last
/// toolkits.
#[derive(Debug)]
pub struct FlattenLayer {
    config: FlattenConfig,
    output_dims: [usize; 3],
    observer: ObserverSlot,
}

impl FlattenLayer {
    pub fn new(input_shape: [usize; 3], output_shape: &[usize]) -> Result<Self> {
        Self::from_config(FlattenConfig {
            input_shape,
            output_shape: output_shape.to_vec(),
        })
    }

    pub fn from_config(config: FlattenConfig) -> Result<Self> {
        config.validate()?;
        Ok(FlattenLayer {
            output_dims: config.output_dims(),
            observer: ObserverSlot::default(),
            config,
        })
    }

    /// Attaches a diagnostic observer and reports this layer's construction to it.
    pub fn with_observer(mut self, observer: Arc<dyn LayerObserver>) -> Self {
        self.observer.set(observer);
        let desc = Layer::describe(&self);
        self.observer.emit(|| LayerEvent::Constructed(desc));
        self
    }

    pub fn input_shape(&self) -> [usize; 3] {
        self.config.input_shape
    }

    pub fn output_shape(&self) -> &[usize] {
        &self.config.output_shape
    }

    pub fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        let [c, h, w] = self.config.input_shape;
        if [input.c, input.h, input.w] != [c, h, w] {
            return Err(LayerError::shape(
                "FlattenLayer::forward",
                Shape::new(input.n, c, h, w),
                input.shape(),
            ));
        }
        let [oc, oh, ow] = self.output_dims;
        let output = Tensor::from_vec(input.n, oc, oh, ow, input.to_channels_last())?;

        self.observer.emit(|| LayerEvent::Forward {
            layer: LayerType::Flatten,
            input: input.shape(),
            output: output.shape(),
        });
        Ok(output)
    }

    /// Exact inverse of [`forward`](Self::forward). Needs no forward state.
    pub fn backward(&mut self, top_diff: &Tensor) -> Result<Tensor> {
        let [oc, oh, ow] = self.output_dims;
        if [top_diff.c, top_diff.h, top_diff.w] != [oc, oh, ow] {
            return Err(LayerError::shape(
                "FlattenLayer::backward",
                Shape::new(top_diff.n, oc, oh, ow),
                top_diff.shape(),
            ));
        }
        let [c, h, w] = self.config.input_shape;
        let bottom_diff = Tensor::from_channels_last(top_diff.n, c, h, w, top_diff.data())?;

        self.observer.emit(|| LayerEvent::Backward {
            layer: LayerType::Flatten,
            top_diff: top_diff.shape(),
            bottom_diff: bottom_diff.shape(),
        });
        Ok(bottom_diff)
    }
}

impl Layer for FlattenLayer {
    fn layer_type(&self) -> LayerType {
        LayerType::Flatten
    }

    fn describe(&self) -> LayerDescriptor {
        LayerDescriptor::Flatten {
            input_shape: self.config.input_shape,
            output_shape: self.config.output_shape.clone(),
        }
    }

    fn forward(&mut self, input: &Tensor) -> Result<Tensor> {
        FlattenLayer::forward(self, input)
    }

    fn backward(&mut self, top_diff: &Tensor) -> Result<Tensor> {
        FlattenLayer::backward(self, top_diff)
    }
}
