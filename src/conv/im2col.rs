//! Im2col + tiled GEMM convolution.
//!
//! Unfolds input windows into a column matrix, then performs a tiled matrix multiply
//! for cache-friendly access patterns. The backward pass reuses the same two pieces:
//! parameter gradients are one `colᵀ · top` product, and the input gradient is a
//! stride-1 correlation of the zero-dilated `top_diff` with the flipped kernel.

use crate::error::Result;
use crate::tensor::{Tensor, WindowView};
use super::{simd, ConvGeometry, ConvGrads, ConvKernel};

const TILE: usize = 32;

/// Tiled matrix multiply-accumulate: C += A * B.
///
/// A: m x k, B: k x n, C: m x n, all row-major.
pub fn gemm_tiled(a: &[f64], b: &[f64], m: usize, n: usize, k: usize, c: &mut [f64]) {
    debug_assert!(a.len() >= m * k && b.len() >= k * n && c.len() >= m * n);
    let mut ii = 0;
    while ii < m {
        let i_end = (ii + TILE).min(m);
        let mut pp = 0;
        while pp < k {
            let p_end = (pp + TILE).min(k);
            let mut jj = 0;
            while jj < n {
                let j_end = (jj + TILE).min(n);
                for i in ii..i_end {
                    let c_row = i * n;
                    let a_row = i * k;
                    for p in pp..p_end {
                        let a_val = a[a_row + p];
                        let b_row = p * n;
                        simd::axpy_f64(c, c_row + jj, b, b_row + jj, a_val, j_end - jj);
                    }
                }
                jj += TILE;
            }
            pp += TILE;
        }
        ii += TILE;
    }
}

/// C = Aᵀ * B.
///
/// A: m x k, B: m x n, result: k x n, all row-major.
pub fn gemm_at_b(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    debug_assert!(a.len() >= m * k && b.len() >= m * n);
    let mut c = vec![0.0f64; k * n];
    let mut pp = 0;
    while pp < k {
        let p_end = (pp + TILE).min(k);
        for i in 0..m {
            let a_row = i * k;
            let b_row = i * n;
            for p in pp..p_end {
                let a_val = a[a_row + p];
                if a_val != 0.0 {
                    simd::axpy_f64(&mut c, p * n, b, b_row, a_val, n);
                }
            }
        }
        pp += TILE;
    }
    c
}

/// Reorders a `(cin, k, k, cout)` weight into the `(cout * k * k) x cin` matrix of the
/// kernel flipped along both spatial axes.
fn flipped_kernel_matrix(weight: &Tensor, geom: &ConvGeometry) -> Vec<f64> {
    let k = geom.kernel_size;
    let cin = geom.channel_in;
    let mut out = vec![0.0f64; geom.channel_out * k * k * cin];
    for oc in 0..geom.channel_out {
        for i in 0..k {
            for j in 0..k {
                let row = (oc * k + i) * k + j;
                for ic in 0..cin {
                    out[row * cin + ic] = weight.get(ic, k - 1 - i, k - 1 - j, oc);
                }
            }
        }
    }
    out
}

/// Im2col + GEMM convolution.
///
/// Works with any kernel size, stride and padding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Im2colConv;

impl ConvKernel for Im2colConv {
    fn forward(
        &self,
        padded: &Tensor,
        weight: &Tensor,
        bias: &Tensor,
        geom: &ConvGeometry,
    ) -> Result<Tensor> {
        let view = WindowView::region(padded, geom.kernel_size, geom.stride, 0, geom.out_h, geom.out_w)?;
        let col = view.im2col();
        let rows = view.rows();
        let cout = geom.channel_out;

        // rows are (n, oh, ow) positions, columns are output channels
        let mut out = Vec::with_capacity(rows * cout);
        for _ in 0..rows {
            out.extend_from_slice(bias.data());
        }
        gemm_tiled(&col, weight.data(), rows, cout, view.cols(), &mut out);

        Tensor::from_channels_last(padded.n, cout, geom.out_h, geom.out_w, &out)
    }

    fn backward(
        &self,
        padded: &Tensor,
        weight: &Tensor,
        top_diff: &Tensor,
        geom: &ConvGeometry,
    ) -> Result<ConvGrads> {
        let k = geom.kernel_size;
        let cin = geom.channel_in;
        let cout = geom.channel_out;

        let view = WindowView::region(padded, k, geom.stride, 0, geom.out_h, geom.out_w)?;
        let col = view.im2col();
        let rows = view.rows();
        let top = top_diff.to_channels_last();

        let d_weight = Tensor::from_vec(cin, k, k, cout, gemm_at_b(&col, &top, rows, view.cols(), cout))?;
        let d_bias = Tensor::from_vec(cout, 1, 1, 1, simd::col_sums_f64(&top, rows, cout))?;

        // Spread top_diff onto the stride-1 output grid, then pad by k-1 so every
        // padded input cell sees a full window of contributing outputs.
        let grid_h = geom.padded_h() - k + 1;
        let grid_w = geom.padded_w() - k + 1;
        let dilated = if geom.stride > 1 {
            top_diff.dilate(geom.stride, grid_h, grid_w)
        } else {
            top_diff.clone()
        };
        let full = dilated.pad(k - 1);

        // Only windows landing inside the unpadded region are needed.
        let grad_view = WindowView::region(&full, k, 1, geom.padding, geom.in_h, geom.in_w)?;
        let grad_col = grad_view.im2col();
        let kernel = flipped_kernel_matrix(weight, geom);

        let mut bottom = vec![0.0f64; grad_view.rows() * cin];
        gemm_tiled(&grad_col, &kernel, grad_view.rows(), cin, grad_view.cols(), &mut bottom);
        let bottom_diff = Tensor::from_channels_last(padded.n, cin, geom.in_h, geom.in_w, &bottom)?;

        Ok(ConvGrads {
            d_weight,
            d_bias,
            bottom_diff,
        })
    }
}
