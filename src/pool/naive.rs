use crate::error::Result;
use crate::tensor::Tensor;
use super::{PoolGeometry, PoolKernel, PoolOutput};

/// Scans one `k x k` window starting at `(h0, w0)`.
/// Returns the maximum and its flat offset in `input`; ties keep the first hit.
pub(crate) fn window_argmax(input: &Tensor, n: usize, c: usize, h0: usize, w0: usize, k: usize) -> (f64, usize) {
    let mut best = input.get(n, c, h0, w0);
    let mut best_idx = input.index(n, c, h0, w0);
    for kh in 0..k {
        for kw in 0..k {
            let val = input.get(n, c, h0 + kh, w0 + kw);
            if val > best {
                best = val;
                best_idx = input.index(n, c, h0 + kh, w0 + kw);
            }
        }
    }
    (best, best_idx)
}

/// Four nested loops over output cells (reference implementation).
#[derive(Debug, Clone, Copy, Default)]
pub struct NaivePool;

impl PoolKernel for NaivePool {
    fn forward(&self, input: &Tensor, geom: &PoolGeometry) -> Result<PoolOutput> {
        let s = geom.stride;
        let mut output = Tensor::new(input.n, input.c, geom.out_h, geom.out_w);
        let mut argmax = vec![0usize; output.len()];
        for n in 0..input.n {
            for c in 0..input.c {
                for oh in 0..geom.out_h {
                    for ow in 0..geom.out_w {
                        let (max_val, max_idx) = window_argmax(input, n, c, oh * s, ow * s, geom.kernel_size);
                        output.set(n, c, oh, ow, max_val);
                        argmax[output.index(n, c, oh, ow)] = max_idx;
                    }
                }
            }
        }
        Ok(PoolOutput { output, argmax })
    }

    /// Re-derives each window's argmax from the retained input instead of trusting the record.
    fn backward(
        &self,
        input: &Tensor,
        _argmax: &[usize],
        top_diff: &Tensor,
        geom: &PoolGeometry,
    ) -> Result<Tensor> {
        let s = geom.stride;
        let mut bottom_diff = Tensor::zeros(input.shape());
        for n in 0..top_diff.n {
            for c in 0..top_diff.c {
                for oh in 0..top_diff.h {
                    for ow in 0..top_diff.w {
                        let (_, max_idx) = window_argmax(input, n, c, oh * s, ow * s, geom.kernel_size);
                        bottom_diff.data_mut()[max_idx] += top_diff.get(n, c, oh, ow);
                    }
                }
            }
        }
        Ok(bottom_diff)
    }
}
