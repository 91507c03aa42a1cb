use csrmm::approx::RelativeEq;
use csrmm::backend::Device;
use csrmm::error::SpmmError;
use csrmm::ops::dispatch::spmm;
use csrmm::tensor;
use csrmm::tensors::Tensor;
use rand::Rng;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_tensor_shape_mismatch_panics() {
    let result = std::panic::catch_unwind(|| {
        Tensor::new(vec![2, 2], vec![1.0, 2.0, 3.0]);
    });
    assert!(result.is_err());
}

#[test]
fn test_tensor_macro() {
    let t = tensor!([[1.0, 2.0], [3.0, 4.0]]);
    assert_eq!(t.shape, vec![2, 2]);
    assert_eq!(t.data, vec![1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn test_one_edge_per_row_sum() {
    init_logging();
    let rowptr = Tensor::new(vec![3], vec![0i64, 1, 2]);
    let col = Tensor::new(vec![2], vec![0i64, 1]);
    let mat = tensor!([[3.0], [5.0]]);

    let (out, arg_out) = spmm(&rowptr, &col, None, &mat, "sum").unwrap();
    assert_eq!(out.shape, vec![2, 1]);
    assert_eq!(out.data, vec![3.0, 5.0]);
    assert!(arg_out.is_none());
}

#[test]
fn test_one_edge_per_row_mean_divides_by_one() {
    let rowptr = Tensor::new(vec![3], vec![0i64, 1, 2]);
    let col = Tensor::new(vec![2], vec![0i64, 1]);
    let mat = tensor!([[3.0], [5.0]]);

    let (out, _) = spmm(&rowptr, &col, None, &mat, "mean").unwrap();
    assert_eq!(out.data, vec![3.0, 5.0]);
}

#[test]
fn test_add_is_an_alias_for_sum() {
    let rowptr = Tensor::new(vec![2], vec![0i64, 2]);
    let col = Tensor::new(vec![2], vec![0i64, 1]);
    let mat = tensor!([[1.0], [4.0]]);

    let (sum_out, _) = spmm(&rowptr, &col, None, &mat, "sum").unwrap();
    let (add_out, _) = spmm(&rowptr, &col, None, &mat, "add").unwrap();
    assert_eq!(sum_out.data, add_out.data);
}

#[test]
fn test_max_reports_winning_edge() {
    let rowptr = Tensor::new(vec![2], vec![0i64, 2]);
    let col = Tensor::new(vec![2], vec![0i64, 1]);
    let mat = tensor!([[1.0], [4.0]]);

    let (out, arg_out) = spmm(&rowptr, &col, None, &mat, "max").unwrap();
    assert_eq!(out.data, vec![4.0]);
    assert_eq!(arg_out.unwrap().data, vec![1]);
}

#[test]
fn test_min_max_tie_keeps_first_edge() {
    let rowptr = Tensor::new(vec![2], vec![0i64, 2]);
    let col = Tensor::new(vec![2], vec![0i64, 1]);
    let mat = tensor!([[7.0], [7.0]]);

    let (out, arg_out) = spmm(&rowptr, &col, None, &mat, "max").unwrap();
    assert_eq!(out.data, vec![7.0]);
    assert_eq!(arg_out.unwrap().data, vec![0]);

    let (out, arg_out) = spmm(&rowptr, &col, None, &mat, "min").unwrap();
    assert_eq!(out.data, vec![7.0]);
    assert_eq!(arg_out.unwrap().data, vec![0]);
}

#[test]
fn test_empty_row_is_zero_for_every_reduction() {
    // row 0 has no edges, row 1 has two
    let rowptr = Tensor::new(vec![3], vec![0i64, 0, 2]);
    let col = Tensor::new(vec![2], vec![0i64, 1]);
    let mat = tensor!([[2.0], [-3.0]]);

    let (out, _) = spmm(&rowptr, &col, None, &mat, "sum").unwrap();
    assert_eq!(out.data, vec![0.0, -1.0]);

    let (out, _) = spmm(&rowptr, &col, None, &mat, "mean").unwrap();
    assert_eq!(out.data, vec![0.0, -0.5]);

    let (out, arg_out) = spmm(&rowptr, &col, None, &mat, "min").unwrap();
    assert_eq!(out.data, vec![0.0, -3.0]);
    assert_eq!(arg_out.unwrap().data, vec![2, 1]);

    let (out, arg_out) = spmm(&rowptr, &col, None, &mat, "max").unwrap();
    assert_eq!(out.data, vec![0.0, 2.0]);
    assert_eq!(arg_out.unwrap().data, vec![2, 0]);
}

#[test]
fn test_weighted_edges_scale_contributions() {
    let rowptr = Tensor::new(vec![2], vec![0i64, 2]);
    let col = Tensor::new(vec![2], vec![0i64, 1]);
    let value = Tensor::new(vec![2], vec![2.0, 10.0]);
    let mat = tensor!([[1.0], [4.0]]);

    let (out, _) = spmm(&rowptr, &col, Some(&value), &mat, "sum").unwrap();
    assert_eq!(out.data, vec![42.0]);
}

/// Builds a random CSR adjacency over `m x n` where every possible edge is
/// present with probability one half, alongside the expected dense form.
fn random_adjacency(
    rng: &mut impl Rng,
    m: usize,
    n: usize,
) -> (Vec<i64>, Vec<i64>, Vec<f64>, Vec<f64>) {
    let mut rowptr = vec![0i64];
    let mut col = Vec::new();
    let mut value = Vec::new();
    let mut dense = vec![0.0f64; m * n];

    for mi in 0..m {
        for ni in 0..n {
            if rng.random_bool(0.5) {
                let w = rng.random_range(-1.0..1.0);
                col.push(ni as i64);
                value.push(w);
                dense[mi * n + ni] = w;
            }
        }
        rowptr.push(col.len() as i64);
    }

    (rowptr, col, value, dense)
}

#[test]
fn test_sum_matches_dense_matmul_oracle() {
    let mut rng = rand::rng();
    let (m, n, k) = (6, 5, 3);
    let (rowptr, col, value, dense) = random_adjacency(&mut rng, m, n);

    let mat_data: Vec<f64> = (0..n * k).map(|_| rng.random_range(-1.0..1.0)).collect();
    let mut expect = vec![0.0f64; m * k];
    for mi in 0..m {
        for ni in 0..n {
            for kk in 0..k {
                expect[mi * k + kk] += dense[mi * n + ni] * mat_data[ni * k + kk];
            }
        }
    }

    let e = col.len();
    let rowptr = Tensor::new(vec![m + 1], rowptr);
    let col = Tensor::new(vec![e], col);
    let value = Tensor::new(vec![e], value);
    let mat = Tensor::new(vec![n, k], mat_data);

    let (out, _) = spmm(&rowptr, &col, Some(&value), &mat, "sum").unwrap();
    assert_eq!(out.shape, vec![m, k]);
    assert!(out.data.as_slice().approx_eq(expect.as_slice()).holds());
}

#[test]
fn test_mean_is_sum_scaled_by_degree() {
    let mut rng = rand::rng();
    let (m, n, k) = (7, 4, 2);
    let (rowptr_data, col, value, _) = random_adjacency(&mut rng, m, n);

    let e = col.len();
    let rowptr = Tensor::new(vec![m + 1], rowptr_data.clone());
    let col = Tensor::new(vec![e], col);
    let value = Tensor::new(vec![e], value);
    let mat = Tensor::new(
        vec![n, k],
        (0..n * k).map(|_| rng.random_range(-1.0..1.0)).collect(),
    );

    let (sum_out, _) = spmm(&rowptr, &col, Some(&value), &mat, "sum").unwrap();
    let (mean_out, _) = spmm(&rowptr, &col, Some(&value), &mat, "mean").unwrap();

    for mi in 0..m {
        let degree = (rowptr_data[mi + 1] - rowptr_data[mi]).max(1) as f64;
        for kk in 0..k {
            let rescaled = mean_out.data[mi * k + kk] * degree;
            assert!(rescaled.approx_eq(&sum_out.data[mi * k + kk]).holds());
        }
    }
}

#[test]
fn test_batched_forward_matches_per_batch_calls() {
    let rowptr = Tensor::new(vec![3], vec![0i64, 2, 3]);
    let col = Tensor::new(vec![3], vec![0i64, 1, 1]);
    let first = vec![1.0, 2.0, 3.0, 4.0];
    let second = vec![-1.0, 0.5, 2.0, -2.0];

    let mut stacked = first.clone();
    stacked.extend_from_slice(&second);
    let batched = Tensor::new(vec![2, 2, 2], stacked);

    let (out, arg_out) = spmm(&rowptr, &col, None, &batched, "max").unwrap();
    assert_eq!(out.shape, vec![2, 2, 2]);
    let arg_out = arg_out.unwrap();

    for (bi, mat_data) in [first, second].into_iter().enumerate() {
        let mat = Tensor::new(vec![2, 2], mat_data);
        let (single, single_arg) = spmm(&rowptr, &col, None, &mat, "max").unwrap();
        assert_eq!(&out.data[bi * 4..(bi + 1) * 4], single.data.as_slice());
        assert_eq!(
            &arg_out.data[bi * 4..(bi + 1) * 4],
            single_arg.unwrap().data.as_slice()
        );
    }
}

#[test]
fn test_integer_elements_sum_and_truncating_mean() {
    let rowptr = Tensor::new(vec![2], vec![0i64, 2]);
    let col = Tensor::new(vec![2], vec![0i64, 1]);
    let mat = Tensor::new(vec![2, 1], vec![3i64, 4]);

    let (out, _) = spmm(&rowptr, &col, None, &mat, "sum").unwrap();
    assert_eq!(out.data, vec![7]);

    let (out, _) = spmm(&rowptr, &col, None, &mat, "mean").unwrap();
    assert_eq!(out.data, vec![3]);
}

#[test]
fn test_unknown_reduction_is_rejected() {
    let rowptr = Tensor::new(vec![2], vec![0i64, 1]);
    let col = Tensor::new(vec![1], vec![0i64]);
    let mat = tensor!([[1.0]]);

    for name in ["avg", "Sum", "MAX", ""] {
        let err = spmm(&rowptr, &col, None, &mat, name).unwrap_err();
        assert!(matches!(err, SpmmError::UnknownReduction(_)), "{name:?}: {err}");
    }
}

#[test]
fn test_non_cpu_resident_input_is_rejected() {
    let rowptr = Tensor::new(vec![2], vec![0i64, 1]);
    let col = Tensor::new(vec![1], vec![0i64]);
    let mat = tensor!([[1.0]]).to_device(Device::Wgpu);

    let err = spmm(&rowptr, &col, None, &mat, "sum").unwrap_err();
    assert!(matches!(
        err,
        SpmmError::DeviceMismatch { tensor: "mat", found: Device::Wgpu }
    ));

    let col = col.to_device(Device::Cuda);
    let mat = tensor!([[1.0]]);
    let err = spmm(&rowptr, &col, None, &mat, "sum").unwrap_err();
    assert!(matches!(err, SpmmError::DeviceMismatch { tensor: "col", .. }));
}

#[test]
fn test_bad_shapes_are_rejected() {
    let rowptr = Tensor::new(vec![2], vec![0i64, 1]);
    let col = Tensor::new(vec![1], vec![0i64]);
    let mat = tensor!([[1.0]]);

    // rowptr must be one-dimensional
    let bad_rowptr = Tensor::new(vec![1, 2], vec![0i64, 1]);
    let err = spmm(&bad_rowptr, &col, None, &mat, "sum").unwrap_err();
    assert!(matches!(err, SpmmError::ShapeMismatch { tensor: "rowptr", .. }));

    // mat must have at least two dimensions
    let flat_mat = Tensor::new(vec![1], vec![1.0]);
    let err = spmm(&rowptr, &col, None, &flat_mat, "sum").unwrap_err();
    assert!(matches!(err, SpmmError::ShapeMismatch { tensor: "mat", .. }));

    // value must pair one weight with every edge
    let value = Tensor::new(vec![2], vec![1.0, 2.0]);
    let err = spmm(&rowptr, &col, Some(&value), &mat, "sum").unwrap_err();
    assert!(matches!(err, SpmmError::ShapeMismatch { tensor: "value", .. }));
}
