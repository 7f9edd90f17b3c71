/// SIMD micro-kernels with NEON acceleration and scalar fallbacks.

// ── FP64 AXPY: c[c_off..] += a_val * b[b_off..] ──

#[cfg(all(target_arch = "aarch64", feature = "simd"))]
pub fn axpy_f64(c: &mut [f64], c_off: usize, b: &[f64], b_off: usize, a_val: f64, len: usize) {
    use core::arch::aarch64::*;
    assert!(c_off + len <= c.len() && b_off + len <= b.len());
    let mut j = 0usize;
    unsafe {
        let a_vec = vdupq_n_f64(a_val);
        while j + 2 <= len {
            let b_vec = vld1q_f64(b.as_ptr().add(b_off + j));
            let c_vec = vld1q_f64(c.as_ptr().add(c_off + j));
            let r = vfmaq_f64(c_vec, a_vec, b_vec);
            vst1q_f64(c.as_mut_ptr().add(c_off + j), r);
            j += 2;
        }
    }
    // scalar tail
    while j < len {
        c[c_off + j] += a_val * b[b_off + j];
        j += 1;
    }
}

#[cfg(not(all(target_arch = "aarch64", feature = "simd")))]
pub fn axpy_f64(c: &mut [f64], c_off: usize, b: &[f64], b_off: usize, a_val: f64, len: usize) {
    let c = &mut c[c_off..c_off + len];
    let b = &b[b_off..b_off + len];
    for (cj, bj) in c.iter_mut().zip(b) {
        *cj += a_val * bj;
    }
}

// ── FP64 column sums of a row-major rows x cols matrix ──

pub fn col_sums_f64(a: &[f64], rows: usize, cols: usize) -> Vec<f64> {
    let mut sums = vec![0.0f64; cols];
    for i in 0..rows {
        axpy_f64(&mut sums, 0, a, i * cols, 1.0, cols);
    }
    sums
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axpy_handles_offsets_and_tail() {
        let b: Vec<f64> = (0..7).map(|i| i as f64).collect();
        let mut c = vec![1.0; 8];
        axpy_f64(&mut c, 1, &b, 2, 0.5, 5);
        assert_eq!(c, vec![1.0, 2.0, 2.5, 3.0, 3.5, 4.0, 1.0, 1.0]);
    }

    #[test]
    fn col_sums() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        assert_eq!(col_sums_f64(&a, 2, 3), vec![5.0, 7.0, 9.0]);
        assert_eq!(col_sums_f64(&a, 3, 2), vec![9.0, 12.0]);
    }
}
