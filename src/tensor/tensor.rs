use std::fmt;

use crate::error::{LayerError, Result};

/// Dimensions of a 4D tensor in `(n, c, h, w)` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape(pub [usize; 4]);

impl Shape {
    pub fn new(n: usize, c: usize, h: usize, w: usize) -> Self {
        Shape([n, c, h, w])
    }

    pub fn numel(&self) -> usize {
        self.0.iter().product()
    }

    pub fn n(&self) -> usize {
        self.0[0]
    }

    pub fn c(&self) -> usize {
        self.0[1]
    }

    pub fn h(&self) -> usize {
        self.0[2]
    }

    pub fn w(&self) -> usize {
        self.0[3]
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}x{}", self.0[0], self.0[1], self.0[2], self.0[3])
    }
}

/// A dense 4D `f64` tensor.
///
/// Layout is NCHW (batch, channels, height, width), row-major. Lower-rank data
/// uses trailing unit dimensions, so a bias vector is `(len, 1, 1, 1)` and a
/// batch of feature vectors is `(n, features, 1, 1)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub n: usize,
    pub c: usize,
    pub h: usize,
    pub w: usize,
    data: Vec<f64>,
}

impl Tensor {
    pub fn new(n: usize, c: usize, h: usize, w: usize) -> Self {
        Tensor {
            n,
            c,
            h,
            w,
            data: vec![0.0; n * c * h * w],
        }
    }

    pub fn empty() -> Self {
        Tensor::new(0, 0, 0, 0)
    }

    pub fn new1(n: usize) -> Self {
        Tensor::new(n, 1, 1, 1)
    }

    pub fn new2(n: usize, c: usize) -> Self {
        Tensor::new(n, c, 1, 1)
    }

    pub fn new3(n: usize, c: usize, h: usize) -> Self {
        Tensor::new(n, c, h, 1)
    }

    pub fn zeros(shape: Shape) -> Self {
        let [n, c, h, w] = shape.0;
        Tensor::new(n, c, h, w)
    }

    /// Wraps an existing NCHW buffer. Fails if `data` does not hold exactly `n*c*h*w` values.
    pub fn from_vec(n: usize, c: usize, h: usize, w: usize, data: Vec<f64>) -> Result<Self> {
        let expected = n * c * h * w;
        if data.len() != expected {
            return Err(LayerError::shape(
                "Tensor::from_vec",
                format!("{} elements for {}x{}x{}x{}", expected, n, c, h, w),
                format!("{} elements", data.len()),
            ));
        }
        Ok(Tensor { n, c, h, w, data })
    }

    /// Builds a tensor by evaluating `f(n, c, h, w)` at every index.
    pub fn from_fn(
        n: usize,
        c: usize,
        h: usize,
        w: usize,
        mut f: impl FnMut(usize, usize, usize, usize) -> f64,
    ) -> Self {
        let mut data = Vec::with_capacity(n * c * h * w);
        for i in 0..n {
            for j in 0..c {
                for k in 0..h {
                    for l in 0..w {
                        data.push(f(i, j, k, l));
                    }
                }
            }
        }
        Tensor { n, c, h, w, data }
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.n, self.c, self.h, self.w)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    pub fn fill(&mut self, val: f64) {
        self.data.fill(val);
    }

    #[inline]
    pub fn index(&self, n: usize, c: usize, h: usize, w: usize) -> usize {
        ((n * self.c + c) * self.h + h) * self.w + w
    }

    #[inline]
    pub fn get(&self, n: usize, c: usize, h: usize, w: usize) -> f64 {
        self.data[self.index(n, c, h, w)]
    }

    #[inline]
    pub fn set(&mut self, n: usize, c: usize, h: usize, w: usize, val: f64) {
        let idx = self.index(n, c, h, w);
        self.data[idx] = val;
    }

    #[inline]
    pub fn add(&mut self, n: usize, c: usize, h: usize, w: usize, val: f64) {
        let idx = self.index(n, c, h, w);
        self.data[idx] += val;
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Same data, new dimensions. Element count must be preserved.
    pub fn reshape(self, n: usize, c: usize, h: usize, w: usize) -> Result<Self> {
        Tensor::from_vec(n, c, h, w, self.data)
    }

    /// Zero-pads height and width by `pad` on every side.
    pub fn pad(&self, pad: usize) -> Tensor {
        if pad == 0 {
            return self.clone();
        }
        let mut padded = Tensor::new(self.n, self.c, self.h + 2 * pad, self.w + 2 * pad);
        for n in 0..self.n {
            for c in 0..self.c {
                for h in 0..self.h {
                    let src = self.index(n, c, h, 0);
                    let dst = padded.index(n, c, h + pad, pad);
                    padded.data[dst..dst + self.w].copy_from_slice(&self.data[src..src + self.w]);
                }
            }
        }
        padded
    }

    /// Extracts the `h x w` interior starting at `(pad, pad)`; the inverse of [`Tensor::pad`].
    pub fn crop(&self, pad: usize, h: usize, w: usize) -> Tensor {
        debug_assert!(pad + h <= self.h && pad + w <= self.w);
        let mut out = Tensor::new(self.n, self.c, h, w);
        for n in 0..self.n {
            for c in 0..self.c {
                for y in 0..h {
                    let src = self.index(n, c, y + pad, pad);
                    let dst = out.index(n, c, y, 0);
                    out.data[dst..dst + w].copy_from_slice(&self.data[src..src + w]);
                }
            }
        }
        out
    }

    /// Zero-upsamples each plane into `h x w`, placing element `(i, j)` at `(i*stride, j*stride)`.
    pub fn dilate(&self, stride: usize, h: usize, w: usize) -> Tensor {
        debug_assert!(self.h == 0 || (self.h - 1) * stride < h);
        debug_assert!(self.w == 0 || (self.w - 1) * stride < w);
        let mut out = Tensor::new(self.n, self.c, h, w);
        for n in 0..self.n {
            for c in 0..self.c {
                for i in 0..self.h {
                    for j in 0..self.w {
                        out.set(n, c, i * stride, j * stride, self.get(n, c, i, j));
                    }
                }
            }
        }
        out
    }

    /// Copies the NCHW storage out in NHWC order.
    pub fn to_channels_last(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.data.len());
        for n in 0..self.n {
            for h in 0..self.h {
                for w in 0..self.w {
                    for c in 0..self.c {
                        out.push(self.get(n, c, h, w));
                    }
                }
            }
        }
        out
    }

    /// Builds an NCHW tensor from a buffer laid out as `(n, h, w, c)`.
    pub fn from_channels_last(
        n: usize,
        c: usize,
        h: usize,
        w: usize,
        nhwc: &[f64],
    ) -> Result<Tensor> {
        if nhwc.len() != n * c * h * w {
            return Err(LayerError::shape(
                "Tensor::from_channels_last",
                format!("{} elements", n * c * h * w),
                format!("{} elements", nhwc.len()),
            ));
        }
        Ok(Tensor::from_fn(n, c, h, w, |i, j, k, l| {
            nhwc[((i * h + k) * w + l) * c + j]
        }))
    }
}

impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}x{}", self.n, self.c, self.h, self.w)
    }
}

/// Spatial output size of a sliding window: `(input + 2*padding - kernel) / stride + 1`.
pub fn output_size(input: usize, kernel: usize, padding: usize, stride: usize) -> Result<usize> {
    if stride == 0 {
        return Err(LayerError::InvalidParameter("stride must be positive".into()));
    }
    let padded = input + 2 * padding;
    if padded < kernel {
        return Err(LayerError::shape(
            "output_size",
            format!("padded extent >= kernel size {}", kernel),
            format!("padded extent {}", padded),
        ));
    }
    Ok((padded - kernel) / stride + 1)
}

/// Largest absolute element-wise difference. Shapes must match.
pub fn max_abs_diff(a: &Tensor, b: &Tensor) -> Result<f64> {
    if a.shape() != b.shape() {
        return Err(LayerError::shape("max_abs_diff", a.shape(), b.shape()));
    }
    Ok(a.data
        .iter()
        .zip(b.data.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max))
}
