use crate::error::Result;
use crate::tensor::Tensor;
use super::{ConvGeometry, ConvGrads, ConvKernel};

/// Nested-loop convolution (reference implementation).
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveConv;

impl ConvKernel for NaiveConv {
    fn forward(
        &self,
        padded: &Tensor,
        weight: &Tensor,
        bias: &Tensor,
        geom: &ConvGeometry,
    ) -> Result<Tensor> {
        let k = geom.kernel_size;
        let s = geom.stride;
        let mut output = Tensor::new(padded.n, geom.channel_out, geom.out_h, geom.out_w);
        for n in 0..padded.n {
            for oc in 0..geom.channel_out {
                for oh in 0..geom.out_h {
                    for ow in 0..geom.out_w {
                        let mut sum = 0.0f64;
                        for ic in 0..geom.channel_in {
                            for kh in 0..k {
                                for kw in 0..k {
                                    sum += padded.get(n, ic, oh * s + kh, ow * s + kw)
                                        * weight.get(ic, kh, kw, oc);
                                }
                            }
                        }
                        output.set(n, oc, oh, ow, sum + bias.get(oc, 0, 0, 0));
                    }
                }
            }
        }
        Ok(output)
    }

    fn backward(
        &self,
        padded: &Tensor,
        weight: &Tensor,
        top_diff: &Tensor,
        geom: &ConvGeometry,
    ) -> Result<ConvGrads> {
        let k = geom.kernel_size;
        let s = geom.stride;
        let mut d_weight = Tensor::new(geom.channel_in, k, k, geom.channel_out);
        let mut d_bias = Tensor::new1(geom.channel_out);
        let mut bottom_pad = Tensor::new(padded.n, padded.c, padded.h, padded.w);

        for n in 0..top_diff.n {
            for oc in 0..top_diff.c {
                for oh in 0..top_diff.h {
                    for ow in 0..top_diff.w {
                        let top = top_diff.get(n, oc, oh, ow);
                        d_bias.add(oc, 0, 0, 0, top);
                        for ic in 0..geom.channel_in {
                            for kh in 0..k {
                                for kw in 0..k {
                                    let ih = oh * s + kh;
                                    let iw = ow * s + kw;
                                    d_weight.add(ic, kh, kw, oc, top * padded.get(n, ic, ih, iw));
                                    bottom_pad.add(n, ic, ih, iw, top * weight.get(ic, kh, kw, oc));
                                }
                            }
                        }
                    }
                }
            }
        }

        Ok(ConvGrads {
            d_weight,
            d_bias,
            bottom_diff: bottom_pad.crop(geom.padding, geom.in_h, geom.in_w),
        })
    }
}
