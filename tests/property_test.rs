mod common;

use proptest::prelude::*;

use cnnlayers::conv::ConvAlgorithm;
use cnnlayers::network::{ConvolutionalLayer, MaxPoolingLayer};
use cnnlayers::pool::PoolAlgorithm;
use cnnlayers::tensor::Tensor;

use common::{assert_tensor_close, fill_deterministic};

#[derive(Debug, Clone)]
struct ConvCase {
    batch: usize,
    in_c: usize,
    out_c: usize,
    kernel: usize,
    pad: usize,
    stride: usize,
    in_h: usize,
    in_w: usize,
    phase: f64,
}

fn conv_case() -> impl Strategy<Value = ConvCase> {
    (1usize..=4, 0usize..=2, 1usize..=3)
        .prop_flat_map(|(kernel, pad, stride)| {
            (
                1usize..=2,
                1usize..=3,
                1usize..=3,
                Just(kernel),
                Just(pad),
                Just(stride),
                kernel..kernel + 6,
                kernel..kernel + 6,
                -3.0f64..3.0,
            )
        })
        .prop_map(|(batch, in_c, out_c, kernel, pad, stride, in_h, in_w, phase)| ConvCase {
            batch,
            in_c,
            out_c,
            kernel,
            pad,
            stride,
            in_h,
            in_w,
            phase,
        })
}

fn conv_layer(case: &ConvCase, algorithm: ConvAlgorithm) -> ConvolutionalLayer {
    let k = case.kernel;
    let mut layer =
        ConvolutionalLayer::new(k, case.in_c, case.out_c, case.pad, case.stride, algorithm).unwrap();
    layer
        .load_param(
            fill_deterministic(case.in_c, k, k, case.out_c, case.phase),
            fill_deterministic(case.out_c, 1, 1, 1, -case.phase),
        )
        .unwrap();
    layer
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn conv_algorithms_agree(case in conv_case()) {
        let input = fill_deterministic(case.batch, case.in_c, case.in_h, case.in_w, case.phase + 0.5);
        let mut naive = conv_layer(&case, ConvAlgorithm::Naive);
        let mut fast = conv_layer(&case, ConvAlgorithm::Im2col);

        let out = naive.forward(&input).unwrap();
        assert_tensor_close(&out, &fast.forward(&input).unwrap(), 1e-9, "forward");

        let top = fill_deterministic(out.n, out.c, out.h, out.w, case.phase - 1.0);
        let bottom = naive.backward(&top).unwrap();
        prop_assert_eq!(bottom.shape(), input.shape());
        assert_tensor_close(&bottom, &fast.backward(&top).unwrap(), 1e-9, "bottom_diff");

        let (dw, db) = naive.get_gradient().unwrap();
        let (dw_fast, db_fast) = fast.get_gradient().unwrap();
        assert_tensor_close(dw, dw_fast, 1e-9, "d_weight");
        assert_tensor_close(db, db_fast, 1e-9, "d_bias");
    }

    #[test]
    fn pool_algorithms_agree(
        (kernel, stride, h, w) in (1usize..=3, 1usize..=3)
            .prop_flat_map(|(k, s)| (Just(k), Just(s), k..k + 6, k..k + 6)),
        batch in 1usize..=2,
        channels in 1usize..=3,
        values in prop::collection::vec(-4i32..4, 2 * 3 * 8 * 8),
    ) {
        // small integer range forces plenty of ties
        let mut data = values;
        data.truncate(batch * channels * h * w);
        let input = Tensor::from_vec(
            batch,
            channels,
            h,
            w,
            data.into_iter().map(f64::from).collect(),
        )
        .unwrap();

        let mut naive = MaxPoolingLayer::new(kernel, stride, PoolAlgorithm::Naive).unwrap();
        let mut batched = MaxPoolingLayer::new(kernel, stride, PoolAlgorithm::Batched).unwrap();
        let out = naive.forward(&input).unwrap();
        prop_assert_eq!(&out, &batched.forward(&input).unwrap());
        prop_assert_eq!(naive.max_index_mask().unwrap(), batched.max_index_mask().unwrap());

        let top = fill_deterministic(out.n, out.c, out.h, out.w, 0.7);
        let bottom = naive.backward(&top).unwrap();
        assert_tensor_close(&bottom, &batched.backward(&top).unwrap(), 1e-12, "pool bottom_diff");
        // every top value lands somewhere in the input
        prop_assert!((bottom.sum() - top.sum()).abs() < 1e-9);
    }
}
