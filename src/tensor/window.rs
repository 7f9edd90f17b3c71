use crate::error::{LayerError, Result};
use super::Tensor;

/// Non-owning sliding-window view over a 4D tensor.
///
/// Logically a 6D array `(n, c, out_h, out_w, k, k)` where element
/// `(n, c, oh, ow, kh, kw)` reads the source at
/// `(origin + oh*stride + kh, origin + ow*stride + kw)`. Nothing is copied until
/// [`WindowView::im2col`] is called.
#[derive(Debug, Clone, Copy)]
pub struct WindowView<'a> {
    src: &'a Tensor,
    kernel: usize,
    stride: usize,
    origin: usize,
    out_h: usize,
    out_w: usize,
}

impl<'a> WindowView<'a> {
    /// All full windows of `src`, starting at `(0, 0)`.
    pub fn new(src: &'a Tensor, kernel: usize, stride: usize) -> Result<Self> {
        if kernel == 0 || stride == 0 {
            return Err(LayerError::InvalidParameter(format!(
                "window kernel {} and stride {} must be positive",
                kernel, stride
            )));
        }
        if src.h < kernel || src.w < kernel {
            return Err(LayerError::shape(
                "WindowView::new",
                format!("spatial extent >= {}", kernel),
                format!("{}x{}", src.h, src.w),
            ));
        }
        let out_h = (src.h - kernel) / stride + 1;
        let out_w = (src.w - kernel) / stride + 1;
        Self::region(src, kernel, stride, 0, out_h, out_w)
    }

    /// `out_h x out_w` windows whose first origin is `(origin, origin)`.
    pub fn region(
        src: &'a Tensor,
        kernel: usize,
        stride: usize,
        origin: usize,
        out_h: usize,
        out_w: usize,
    ) -> Result<Self> {
        let last_h = origin + out_h.saturating_sub(1) * stride + kernel;
        let last_w = origin + out_w.saturating_sub(1) * stride + kernel;
        if last_h > src.h || last_w > src.w {
            return Err(LayerError::shape(
                "WindowView::region",
                format!("source covering {}x{}", last_h, last_w),
                format!("{}x{}", src.h, src.w),
            ));
        }
        Ok(WindowView {
            src,
            kernel,
            stride,
            origin,
            out_h,
            out_w,
        })
    }

    pub fn kernel(&self) -> usize {
        self.kernel
    }

    pub fn out_h(&self) -> usize {
        self.out_h
    }

    pub fn out_w(&self) -> usize {
        self.out_w
    }

    #[inline]
    pub fn get(&self, n: usize, c: usize, oh: usize, ow: usize, kh: usize, kw: usize) -> f64 {
        self.src.get(
            n,
            c,
            self.origin + oh * self.stride + kh,
            self.origin + ow * self.stride + kw,
        )
    }

    /// Number of im2col rows: one per `(n, oh, ow)` window position.
    pub fn rows(&self) -> usize {
        self.src.n * self.out_h * self.out_w
    }

    /// Number of im2col columns: one per `(c, kh, kw)` window element.
    pub fn cols(&self) -> usize {
        self.src.c * self.kernel * self.kernel
    }

    /// Gathers every window into one row of a row-major `rows() x cols()` matrix.
    ///
    /// Row index is `(n*out_h + oh)*out_w + ow`, column index is `(c*k + kh)*k + kw`.
    pub fn im2col(&self) -> Vec<f64> {
        let k = self.kernel;
        let cols = self.cols();
        let mut col = vec![0.0; self.rows() * cols];
        let data = self.src.data();
        for n in 0..self.src.n {
            for oh in 0..self.out_h {
                for ow in 0..self.out_w {
                    let row = (n * self.out_h + oh) * self.out_w + ow;
                    let dst_row = &mut col[row * cols..(row + 1) * cols];
                    let ih0 = self.origin + oh * self.stride;
                    let iw0 = self.origin + ow * self.stride;
                    for c in 0..self.src.c {
                        for kh in 0..k {
                            let src = self.src.index(n, c, ih0 + kh, iw0);
                            let dst = (c * k + kh) * k;
                            dst_row[dst..dst + k].copy_from_slice(&data[src..src + k]);
                        }
                    }
                }
            }
        }
        col
    }
}
