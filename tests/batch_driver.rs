//! Batch driver scenarios: broadcast, paired, all-pairs, threading.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use simdist::batch::{cdist, pairwise, Rows};
use simdist::{resolve, Datatype, Error, MetricKind, CAP_ANY};

fn random_matrix(rng: &mut StdRng, rows: usize, dim: usize) -> Vec<f32> {
    (0..rows * dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

#[test]
fn cdist_matches_single_pair_calls() {
    let mut rng = StdRng::seed_from_u64(42);
    let a = random_matrix(&mut rng, 10, 128);
    let b = random_matrix(&mut rng, 7, 128);
    let rows_a = Rows::new(&a, 10, 128).unwrap();
    let rows_b = Rows::new(&b, 7, 128).unwrap();

    let kernel = resolve(MetricKind::Cos, Datatype::F32, CAP_ANY).unwrap();
    let mut out = vec![0.0f64; 10 * 7];
    cdist(&kernel, &rows_a, &rows_b, &mut out, 1).unwrap();

    for i in 0..10 {
        for j in 0..7 {
            let mut single = 0.0f64;
            unsafe {
                kernel.call(
                    rows_a.row(i).as_ptr().cast(),
                    rows_b.row(j).as_ptr().cast(),
                    128,
                    &mut single,
                );
            }
            assert_eq!(out[i * 7 + j], single, "cell ({i}, {j})");
        }
    }
}

#[test]
fn paired_mode_matches_single_pair_calls() {
    let mut rng = StdRng::seed_from_u64(7);
    let a = random_matrix(&mut rng, 100, 256);
    let b = random_matrix(&mut rng, 100, 256);
    let rows_a = Rows::new(&a, 100, 256).unwrap();
    let rows_b = Rows::new(&b, 100, 256).unwrap();

    let kernel = resolve(MetricKind::L2sq, Datatype::F32, CAP_ANY).unwrap();
    let mut out = vec![0.0f64; 100];
    pairwise(&kernel, &rows_a, &rows_b, &mut out, 1).unwrap();

    for r in 0..100 {
        let mut single = 0.0f64;
        unsafe {
            kernel.call(
                rows_a.row(r).as_ptr().cast(),
                rows_b.row(r).as_ptr().cast(),
                256,
                &mut single,
            );
        }
        assert_eq!(out[r], single, "row {r}");
    }
}

#[test]
fn broadcast_mode_matches_single_pair_calls() {
    let mut rng = StdRng::seed_from_u64(99);
    let query = random_matrix(&mut rng, 1, 64);
    let base = random_matrix(&mut rng, 23, 64);
    let rows_q = Rows::new(&query, 1, 64).unwrap();
    let rows_b = Rows::new(&base, 23, 64).unwrap();

    let kernel = resolve(MetricKind::Dot, Datatype::F32, CAP_ANY).unwrap();
    let mut out = vec![0.0f64; 23];
    pairwise(&kernel, &rows_q, &rows_b, &mut out, 1).unwrap();

    for r in 0..23 {
        let mut single = 0.0f64;
        unsafe {
            kernel.call(
                rows_q.row(0).as_ptr().cast(),
                rows_b.row(r).as_ptr().cast(),
                64,
                &mut single,
            );
        }
        assert_eq!(out[r], single, "row {r}");
    }
}

#[test]
fn thread_counts_produce_identical_results() {
    let mut rng = StdRng::seed_from_u64(1234);
    let a = random_matrix(&mut rng, 37, 96);
    let b = random_matrix(&mut rng, 19, 96);
    let rows_a = Rows::new(&a, 37, 96).unwrap();
    let rows_b = Rows::new(&b, 19, 96).unwrap();

    let kernel = resolve(MetricKind::Cos, Datatype::F32, CAP_ANY).unwrap();
    let mut serial = vec![0.0f64; 37 * 19];
    let mut pooled = vec![0.0f64; 37 * 19];
    let mut default = vec![0.0f64; 37 * 19];
    cdist(&kernel, &rows_a, &rows_b, &mut serial, 1).unwrap();
    cdist(&kernel, &rows_a, &rows_b, &mut pooled, 4).unwrap();
    cdist(&kernel, &rows_a, &rows_b, &mut default, 0).unwrap();

    // Same tier, same reduction order per row pair
    assert_eq!(serial, pooled);
    assert_eq!(serial, default);
}

#[test]
fn more_threads_than_rows_is_fine() {
    let mut rng = StdRng::seed_from_u64(5);
    let a = random_matrix(&mut rng, 3, 16);
    let b = random_matrix(&mut rng, 3, 16);
    let rows_a = Rows::new(&a, 3, 16).unwrap();
    let rows_b = Rows::new(&b, 3, 16).unwrap();

    let kernel = resolve(MetricKind::L2sq, Datatype::F32, CAP_ANY).unwrap();
    let mut out = vec![0.0f64; 3];
    pairwise(&kernel, &rows_a, &rows_b, &mut out, 64).unwrap();

    let mut want = vec![0.0f64; 3];
    pairwise(&kernel, &rows_a, &rows_b, &mut want, 1).unwrap();
    assert_eq!(out, want);
}

#[test]
fn complex_batch_writes_two_slots_per_pair() {
    let kernel = resolve(MetricKind::VDot, Datatype::F64c, CAP_ANY).unwrap();
    // Two rows of two complex elements each (4 scalars per row)
    let a = [1.0f64, 2.0, 3.0, 4.0, 1.0, 0.0, 0.0, 1.0];
    let b = [5.0f64, 6.0, 7.0, 8.0, 1.0, 0.0, 0.0, 1.0];
    let rows_a = Rows::new(&a, 2, 4).unwrap();
    let rows_b = Rows::new(&b, 2, 4).unwrap();

    let mut out = vec![0.0f64; 2 * 2];
    pairwise(&kernel, &rows_a, &rows_b, &mut out, 1).unwrap();
    assert_eq!(&out[0..2], &[70.0, 8.0]);
    // (conj(1) * 1) + (conj(i) * i) = 1 + 1
    assert_eq!(&out[2..4], &[2.0, 0.0]);
}

#[test]
fn mismatched_shapes_error_before_any_kernel_runs() {
    let kernel = resolve(MetricKind::L2sq, Datatype::F32, CAP_ANY).unwrap();
    let a = vec![0.0f32; 12];
    let b = vec![0.0f32; 12];

    // Unequal inner dimension
    let rows_a = Rows::new(&a, 3, 4).unwrap();
    let rows_b = Rows::new(&b, 2, 6).unwrap();
    let mut out = vec![0.0f64; 6];
    assert!(matches!(
        cdist(&kernel, &rows_a, &rows_b, &mut out, 1),
        Err(Error::DimensionMismatch { .. })
    ));

    // Unequal outer dimension in paired mode
    let rows_b = Rows::new(&b, 2, 4).unwrap();
    let mut out = vec![0.0f64; 3];
    assert!(matches!(
        pairwise(&kernel, &rows_a, &rows_b, &mut out, 1),
        Err(Error::RowCountMismatch { left: 3, right: 2 })
    ));

    // Wrong output length
    let rows_b = Rows::new(&b, 3, 4).unwrap();
    let mut out = vec![0.0f64; 2];
    assert!(matches!(
        pairwise(&kernel, &rows_a, &rows_b, &mut out, 1),
        Err(Error::OutputLengthMismatch {
            expected: 3,
            got: 2
        })
    ));

    // Element width must match the resolved datatype
    let wide = vec![0.0f64; 12];
    let rows_wide = Rows::new(&wide, 3, 4).unwrap();
    let mut out = vec![0.0f64; 9];
    assert!(matches!(
        cdist(&kernel, &rows_wide, &rows_wide, &mut out, 1),
        Err(Error::ElementWidthMismatch { .. })
    ));
}

#[test]
fn strided_batch_rows() {
    let mut rng = StdRng::seed_from_u64(77);
    // 4 rows of 8 elements padded to stride 10
    let mut data = vec![0.0f32; 3 * 10 + 8];
    for r in 0..4 {
        for c in 0..8 {
            data[r * 10 + c] = rng.gen_range(-1.0..1.0);
        }
    }
    let strided = Rows::with_stride(&data, 4, 8, 10).unwrap();

    let dense: Vec<f32> = (0..4).flat_map(|r| data[r * 10..r * 10 + 8].to_vec()).collect();
    let packed = Rows::new(&dense, 4, 8).unwrap();

    let kernel = resolve(MetricKind::Dot, Datatype::F32, CAP_ANY).unwrap();
    let mut from_strided = vec![0.0f64; 16];
    let mut from_packed = vec![0.0f64; 16];
    cdist(&kernel, &strided, &strided, &mut from_strided, 1).unwrap();
    cdist(&kernel, &packed, &packed, &mut from_packed, 1).unwrap();
    assert_eq!(from_strided, from_packed);
}
