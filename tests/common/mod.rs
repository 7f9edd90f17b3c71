#![allow(dead_code)]

use cnnlayers::tensor::Tensor;

/// Fill a tensor with deterministic values based on index.
pub fn fill_deterministic(n: usize, c: usize, h: usize, w: usize, phase: f64) -> Tensor {
    let mut t = Tensor::new(n, c, h, w);
    for (i, v) in t.data_mut().iter_mut().enumerate() {
        *v = ((i as f64) * 0.1 + phase).sin();
    }
    t
}

/// Pairwise-distinct values (gaps of at least 1e-3) for up to 1000 elements,
/// so max pooling never sees ties.
pub fn fill_distinct(n: usize, c: usize, h: usize, w: usize) -> Tensor {
    let mut t = Tensor::new(n, c, h, w);
    for (i, v) in t.data_mut().iter_mut().enumerate() {
        *v = ((i * 7919) % 1000) as f64 / 1000.0 - 0.5;
    }
    t
}

/// Compare two tensors element-wise with a relative/absolute tolerance.
pub fn assert_tensor_close(a: &Tensor, b: &Tensor, tol: f64, label: &str) {
    assert_eq!(a.shape(), b.shape(), "{}: shape mismatch {} vs {}", label, a, b);
    for (i, (va, vb)) in a.data().iter().zip(b.data()).enumerate() {
        assert!(
            approx::relative_eq!(*va, *vb, epsilon = tol, max_relative = tol),
            "{}: mismatch at index {}: {} vs {} (diff={})",
            label, i, va, vb, (va - vb).abs()
        );
    }
}

/// `sum(a * b)` over matching shapes.
pub fn dot(a: &Tensor, b: &Tensor) -> f64 {
    assert_eq!(a.shape(), b.shape());
    a.data().iter().zip(b.data()).map(|(x, y)| x * y).sum()
}
