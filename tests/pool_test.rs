mod common;

use cnnlayers::network::MaxPoolingLayer;
use cnnlayers::pool::{BatchedPool, NaivePool, PoolAlgorithm, PoolGeometry, PoolKernel};
use cnnlayers::tensor::Tensor;
use cnnlayers::LayerError;

use common::{assert_tensor_close, fill_deterministic, fill_distinct};

const ALGORITHMS: [PoolAlgorithm; 2] = [PoolAlgorithm::Naive, PoolAlgorithm::Batched];

fn quadrant_input() -> Tensor {
    #[rustfmt::skip]
    let data = vec![
        1.0, 3.0, 2.0, 1.0,
        4.0, 2.0, 0.0, 1.0,
        5.0, 6.0, 1.0, 2.0,
        0.0, 1.0, 3.0, 7.0,
    ];
    Tensor::from_vec(1, 1, 4, 4, data).unwrap()
}

#[test]
fn quadrant_maxima_and_routing() {
    for algo in ALGORITHMS {
        let mut layer = MaxPoolingLayer::new(2, 2, algo).unwrap();
        let output = layer.forward(&quadrant_input()).unwrap();
        assert_eq!(output.shape().0, [1, 1, 2, 2]);
        assert_eq!(output.data(), &[4.0, 2.0, 6.0, 7.0], "{:?} forward", algo);

        let top_diff = Tensor::from_vec(1, 1, 2, 2, vec![1.0; 4]).unwrap();
        let bottom_diff = layer.backward(&top_diff).unwrap();
        let mut expected = Tensor::new(1, 1, 4, 4);
        expected.set(0, 0, 1, 0, 1.0);
        expected.set(0, 0, 0, 2, 1.0);
        expected.set(0, 0, 2, 1, 1.0);
        expected.set(0, 0, 3, 3, 1.0);
        assert_eq!(bottom_diff, expected, "{:?} backward", algo);
        assert_eq!(layer.max_index_mask().unwrap(), expected, "{:?} mask", algo);
    }
}

#[test]
fn ties_pick_first_in_row_major_order() {
    #[rustfmt::skip]
    let data = vec![
        2.0, 5.0, 5.0,
        5.0, 5.0, 1.0,
        0.0, 5.0, 5.0,
    ];
    let input = Tensor::from_vec(1, 1, 3, 3, data).unwrap();
    for algo in ALGORITHMS {
        let mut layer = MaxPoolingLayer::new(2, 1, algo).unwrap();
        layer.forward(&input).unwrap();
        let bottom_diff = layer.backward(&Tensor::from_vec(1, 1, 2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap()).unwrap();
        // windows: (0,0) -> (0,1); (0,1) -> (0,1); (1,0) -> (1,0); (1,1) -> (1,1)
        let mut expected = Tensor::new(1, 1, 3, 3);
        expected.set(0, 0, 0, 1, 3.0);
        expected.set(0, 0, 1, 0, 3.0);
        expected.set(0, 0, 1, 1, 4.0);
        assert_eq!(bottom_diff, expected, "{:?}", algo);
    }
}

#[test]
fn constant_window_routes_to_top_left() {
    let input = Tensor::from_vec(1, 2, 2, 2, vec![3.0; 8]).unwrap();
    for algo in ALGORITHMS {
        let mut layer = MaxPoolingLayer::new(2, 2, algo).unwrap();
        layer.forward(&input).unwrap();
        let mask = layer.max_index_mask().unwrap();
        assert_eq!(mask.data(), &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0], "{:?}", algo);
    }
}

#[test]
fn overlapping_windows_accumulate() {
    // centre cell wins all four 2x2 windows
    let input = Tensor::from_vec(1, 1, 3, 3, vec![1.0, 2.0, 3.0, 4.0, 9.0, 5.0, 6.0, 7.0, 8.0]).unwrap();
    for algo in ALGORITHMS {
        let mut layer = MaxPoolingLayer::new(2, 1, algo).unwrap();
        let output = layer.forward(&input).unwrap();
        assert_eq!(output.data(), &[9.0; 4]);

        let top_diff = Tensor::from_vec(1, 1, 2, 2, vec![0.5, 1.0, 1.5, 2.0]).unwrap();
        let bottom_diff = layer.backward(&top_diff).unwrap();
        assert_eq!(bottom_diff.get(0, 0, 1, 1), 5.0, "{:?}", algo);
        assert_eq!(bottom_diff.sum(), 5.0, "{:?}", algo);
    }
}

#[test]
fn gradient_mass_is_preserved_without_overlap() {
    let input = fill_deterministic(2, 3, 8, 6, 0.3);
    for algo in ALGORITHMS {
        let mut layer = MaxPoolingLayer::new(2, 2, algo).unwrap();
        let output = layer.forward(&input).unwrap();
        let top_diff = fill_deterministic(output.n, output.c, output.h, output.w, 1.9);
        let bottom_diff = layer.backward(&top_diff).unwrap();
        assert!((bottom_diff.sum() - top_diff.sum()).abs() < 1e-12, "{:?}", algo);
        // exactly one non-zero per window
        let nonzero = bottom_diff.data().iter().filter(|v| **v != 0.0).count();
        assert_eq!(nonzero, top_diff.data().iter().filter(|v| **v != 0.0).count());
    }
}

#[test]
fn naive_and_batched_agree() {
    for (k, s) in [(2, 2), (3, 1), (3, 2), (2, 3), (4, 4)] {
        for input in [fill_deterministic(2, 3, 9, 11, 0.7), fill_distinct(3, 2, 8, 8)] {
            let mut naive = MaxPoolingLayer::new(k, s, PoolAlgorithm::Naive).unwrap();
            let mut batched = MaxPoolingLayer::new(k, s, PoolAlgorithm::Batched).unwrap();
            let out_naive = naive.forward(&input).unwrap();
            let out_batched = batched.forward(&input).unwrap();
            assert_eq!(out_naive, out_batched, "k={} s={} forward", k, s);
            assert_eq!(naive.max_index_mask().unwrap(), batched.max_index_mask().unwrap());

            let top_diff = fill_deterministic(out_naive.n, out_naive.c, out_naive.h, out_naive.w, 0.1);
            let bottom_naive = naive.backward(&top_diff).unwrap();
            let bottom_batched = batched.backward(&top_diff).unwrap();
            assert_tensor_close(&bottom_naive, &bottom_batched, 1e-12, &format!("k={} s={} backward", k, s));
        }
    }
}

#[test]
fn kernels_directly() {
    let input = fill_distinct(1, 2, 5, 5);
    let geom = PoolGeometry { kernel_size: 3, stride: 2, out_h: 2, out_w: 2 };
    let a = NaivePool.forward(&input, &geom).unwrap();
    let b = BatchedPool.forward(&input, &geom).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.argmax.len(), 8);
}

#[test]
fn output_shape_formula() {
    let layer = MaxPoolingLayer::new(2, 2, PoolAlgorithm::Batched).unwrap();
    assert_eq!(layer.output_shape(Tensor::new(1, 6, 28, 28).shape()).unwrap().0, [1, 6, 14, 14]);
    let layer = MaxPoolingLayer::new(3, 2, PoolAlgorithm::Naive).unwrap();
    assert_eq!(layer.output_shape(Tensor::new(2, 4, 7, 8).shape()).unwrap().0, [2, 4, 3, 3]);
    let layer = MaxPoolingLayer::new(4, 3, PoolAlgorithm::Naive).unwrap();
    assert_eq!(layer.output_shape(Tensor::new(1, 1, 6, 10).shape()).unwrap().0, [1, 1, 1, 3]);
}

#[test]
fn error_paths() {
    assert!(matches!(
        MaxPoolingLayer::new(0, 1, PoolAlgorithm::Naive),
        Err(LayerError::InvalidParameter(_))
    ));
    assert!(matches!(
        MaxPoolingLayer::new(2, 0, PoolAlgorithm::Batched),
        Err(LayerError::InvalidParameter(_))
    ));

    let mut layer = MaxPoolingLayer::new(2, 2, PoolAlgorithm::Batched).unwrap();
    assert!(matches!(
        layer.backward(&Tensor::new(1, 1, 2, 2)),
        Err(LayerError::UninitializedState(_))
    ));
    assert!(matches!(layer.max_index_mask(), Err(LayerError::UninitializedState(_))));
    assert!(matches!(
        layer.forward(&Tensor::new(1, 1, 1, 4)),
        Err(LayerError::ShapeMismatch { .. })
    ));

    layer.forward(&Tensor::new(1, 2, 4, 4)).unwrap();
    assert!(matches!(
        layer.backward(&Tensor::new(1, 1, 2, 2)),
        Err(LayerError::ShapeMismatch { .. })
    ));
}
