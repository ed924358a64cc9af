// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Matrix multiplication operation.

use crate::{DType, Shape, Tensor, TensorError};

/// Performs matrix multiplication: `output = lhs @ rhs`.
///
/// `lhs` is `[M, K]`, `rhs` is `[K, N]`, and `output` must be an `f32`
/// tensor of shape `[M, N]` on the same device. Inputs of either dtype
/// are accepted and accumulated in `f32`.
///
/// # Errors
/// Returns [`TensorError::ShapeMismatch`] if dimensions are incompatible and
/// [`TensorError::DeviceMismatch`] if operands are on different devices.
pub fn matmul(lhs: &Tensor, rhs: &Tensor, output: &mut Tensor) -> Result<(), TensorError> {
    lhs.ensure_same_device("matmul", rhs)?;
    lhs.ensure_same_device("matmul (output)", output)?;

    if !lhs.shape().is_matmul_compatible(rhs.shape()) {
        return Err(TensorError::ShapeMismatch {
            op: "matmul",
            lhs: lhs.shape().clone(),
            rhs: rhs.shape().clone(),
        });
    }

    let m = lhs.shape().dims()[0];
    let k = lhs.shape().dims()[1];
    let n = rhs.shape().dims()[1];

    let expected_shape = Shape::matrix(m, n);
    if output.shape() != &expected_shape || output.dtype() != DType::F32 {
        return Err(TensorError::ShapeMismatch {
            op: "matmul (output)",
            lhs: expected_shape,
            rhs: output.shape().clone(),
        });
    }

    let a = lhs.as_f32();
    let b = rhs.as_f32();
    matmul_f32(&a, &b, output.as_f32_slice_mut(), m, k, n);
    Ok(())
}

/// Portable `c = a @ b` on row-major slices.
///
/// ikj loop order keeps the inner loop a saxpy over a contiguous row of `c`.
pub(crate) fn matmul_f32(a: &[f32], b: &[f32], c: &mut [f32], m: usize, k: usize, n: usize) {
    c.iter_mut().for_each(|x| *x = 0.0);
    for i in 0..m {
        let c_row = &mut c[i * n..(i + 1) * n];
        for p in 0..k {
            let a_ip = a[i * k + p];
            if a_ip == 0.0 {
                continue;
            }
            let b_row = &b[p * n..(p + 1) * n];
            for (c_ij, &b_pj) in c_row.iter_mut().zip(b_row) {
                *c_ij += a_ip * b_pj;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Device;

    #[test]
    fn test_matmul_2x3_times_3x2() {
        // [[1, 2, 3], [4, 5, 6]] @ [[7, 8], [9, 10], [11, 12]] = [[58, 64], [139, 154]]
        let a = Tensor::from_f32(Shape::matrix(2, 3), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let b =
            Tensor::from_f32(Shape::matrix(3, 2), &[7.0, 8.0, 9.0, 10.0, 11.0, 12.0]).unwrap();
        let mut c = Tensor::zeros(Shape::matrix(2, 2), DType::F32);

        matmul(&a, &b, &mut c).unwrap();
        assert_eq!(c.as_f32_slice(), &[58.0, 64.0, 139.0, 154.0]);
    }

    #[test]
    fn test_matmul_half_inputs() {
        let a = Tensor::from_f32(Shape::matrix(1, 2), &[1.0, 2.0])
            .unwrap()
            .to_dtype(DType::F16);
        let b = Tensor::from_f32(Shape::matrix(2, 1), &[3.0, 4.0]).unwrap();
        let mut c = Tensor::zeros(Shape::matrix(1, 1), DType::F32);

        matmul(&a, &b, &mut c).unwrap();
        assert_eq!(c.as_f32_slice(), &[11.0]);
    }

    #[test]
    fn test_matmul_shape_mismatch() {
        let a = Tensor::zeros(Shape::matrix(2, 3), DType::F32);
        let b = Tensor::zeros(Shape::matrix(4, 2), DType::F32);
        let mut c = Tensor::zeros(Shape::matrix(2, 2), DType::F32);
        assert!(matmul(&a, &b, &mut c).is_err());
    }

    #[test]
    fn test_matmul_device_mismatch() {
        let a = Tensor::zeros(Shape::matrix(2, 2), DType::F32).to_device(Device::Cuda);
        let b = Tensor::zeros(Shape::matrix(2, 2), DType::F32);
        let mut c = Tensor::zeros(Shape::matrix(2, 2), DType::F32).to_device(Device::Cuda);
        assert!(matches!(
            matmul(&a, &b, &mut c),
            Err(TensorError::DeviceMismatch { .. })
        ));
    }
}
