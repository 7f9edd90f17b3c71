use crate::error::Result;
use crate::tensor::Tensor;
use super::{PoolGeometry, PoolKernel, PoolOutput};

/// Max pooling that sweeps all `N*C` planes for each window position at once.
///
/// The comparison order (window offsets row-major, strict `>`) matches
/// [`NaivePool`](super::NaivePool), so both pick the same argmax on ties.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchedPool;

impl PoolKernel for BatchedPool {
    fn forward(&self, input: &Tensor, geom: &PoolGeometry) -> Result<PoolOutput> {
        let (k, s) = (geom.kernel_size, geom.stride);
        let planes = input.n * input.c;
        let plane = input.h * input.w;
        let out_plane = geom.out_h * geom.out_w;
        let data = input.data();

        let mut output = Tensor::new(input.n, input.c, geom.out_h, geom.out_w);
        let mut argmax = vec![0usize; output.len()];
        let mut best = vec![0.0f64; planes];
        let mut best_idx = vec![0usize; planes];

        for oh in 0..geom.out_h {
            for ow in 0..geom.out_w {
                let origin = oh * s * input.w + ow * s;
                for p in 0..planes {
                    best_idx[p] = p * plane + origin;
                    best[p] = data[best_idx[p]];
                }
                for kh in 0..k {
                    for kw in 0..k {
                        let off = origin + kh * input.w + kw;
                        for p in 0..planes {
                            let idx = p * plane + off;
                            if data[idx] > best[p] {
                                best[p] = data[idx];
                                best_idx[p] = idx;
                            }
                        }
                    }
                }
                let out_off = oh * geom.out_w + ow;
                let out = output.data_mut();
                for p in 0..planes {
                    out[p * out_plane + out_off] = best[p];
                    argmax[p * out_plane + out_off] = best_idx[p];
                }
            }
        }
        Ok(PoolOutput { output, argmax })
    }

    fn backward(
        &self,
        input: &Tensor,
        argmax: &[usize],
        top_diff: &Tensor,
        _geom: &PoolGeometry,
    ) -> Result<Tensor> {
        let mut bottom_diff = Tensor::zeros(input.shape());
        let bottom = bottom_diff.data_mut();
        for (&src, &grad) in argmax.iter().zip(top_diff.data()) {
            bottom[src] += grad;
        }
        Ok(bottom_diff)
    }
}
