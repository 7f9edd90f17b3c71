//! One SGD step through conv -> max pool -> flatten, with tracing output.
//!
//! Run with `RUST_LOG=trace cargo run --example conv_pool_step`.

use std::sync::Arc;

use cnnlayers::conv::ConvAlgorithm;
use cnnlayers::init::{GaussianInitializer, DEFAULT_WEIGHT_STD};
use cnnlayers::network::{ConvolutionalLayer, FlattenLayer, Layer, MaxPoolingLayer};
use cnnlayers::observer::TracingObserver;
use cnnlayers::pool::PoolAlgorithm;
use cnnlayers::tensor::Tensor;

fn main() -> cnnlayers::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let observer = Arc::new(TracingObserver);
    let mut conv = ConvolutionalLayer::new(5, 1, 6, 2, 1, ConvAlgorithm::Im2col)?
        .with_observer(observer.clone());
    conv.init_param(DEFAULT_WEIGHT_STD, &mut GaussianInitializer::seeded(7))?;

    let mut layers: Vec<Box<dyn Layer>> = vec![
        Box::new(conv),
        Box::new(MaxPoolingLayer::new(2, 2, PoolAlgorithm::Batched)?.with_observer(observer.clone())),
        Box::new(FlattenLayer::new([6, 14, 14], &[6 * 14 * 14])?.with_observer(observer)),
    ];

    let input = Tensor::from_fn(4, 1, 28, 28, |n, _, h, w| {
        ((n * 31 + h * 7 + w) as f64 * 0.05).sin()
    });

    let mut activations = input;
    for layer in layers.iter_mut() {
        activations = layer.forward(&activations)?;
    }

    // d(0.5 * ||y||^2) / dy = y
    let loss = 0.5 * activations.data().iter().map(|v| v * v).sum::<f64>();
    let mut grad = activations;
    for layer in layers.iter_mut().rev() {
        grad = layer.backward(&grad)?;
    }
    for layer in layers.iter_mut() {
        layer.update_param(0.1)?;
    }

    tracing::info!(loss, input_grad = %grad.shape(), "step done");
    Ok(())
}
