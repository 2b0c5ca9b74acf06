//! Operator persistence: loading and saving the numpy-serialisable complex
//! tensors the surface language treats as operator files. `load` and `save`
//! are the only two entry points the rest of the crate needs.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use ndarray_npy::{ReadNpyError, ReadNpyExt, WriteNpyError, WriteNpyExt};
use num_complex::Complex64;

use nqpv_core::error::Pos;
use nqpv_core::tensor::Tensor;

use crate::DslError;

/// Given a raw array whose shape is either already `(2,)*k` or a
/// matrix/three-axis form, infers the `(2,)*k` shape: rank `2n` for an
/// operator, rank `2n+1` for a two-outcome measurement (leading axis 2).
fn infer_dyadic_shape(shape: &[usize]) -> Option<Vec<usize>> {
    if !shape.is_empty() && shape.iter().all(|&d| d == 2) {
        return Some(shape.to_vec());
    }
    if shape.len() == 2 && shape[0] == shape[1] {
        let qubitn = shape[0].trailing_zeros() as usize;
        if shape[0] == 1usize << qubitn {
            return Some(vec![2; 2 * qubitn]);
        }
    }
    if shape.len() == 3 && shape[0] == 2 && shape[1] == shape[2] {
        let qubitn = shape[1].trailing_zeros() as usize;
        if shape[1] == 1usize << qubitn {
            let mut out = vec![2usize; 2 * qubitn + 1];
            out[0] = 2;
            return Some(out);
        }
    }
    None
}

/// Loads an operator file, returning a [`Tensor`] whose rank tells the
/// caller whether it is a state operator (even) or a measurement (odd).
pub fn load(path: &Path, pos: Pos) -> Result<Tensor, DslError> {
    let file = File::open(path).map_err(|e| DslError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
        pos,
    })?;
    let raw = ArrayD::<Complex64>::read_npy(file).map_err(|e: ReadNpyError| DslError::Io {
        path: path.display().to_string(),
        message: format!("malformed numpy file: {e}"),
        pos,
    })?;
    let shape = infer_dyadic_shape(raw.shape()).ok_or_else(|| DslError::Io {
        path: path.display().to_string(),
        message: format!("tensor of shape {:?} is neither a square operator matrix nor a two-outcome measurement", raw.shape()),
        pos,
    })?;
    let reshaped = raw.into_shape_with_order(IxDyn(&shape)).map_err(|e| DslError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
        pos,
    })?;
    Tensor::from_array(reshaped).map_err(DslError::Core)
}

/// Saves `tensor` in its native `(2,)*k` shape, creating parent directories
/// is the caller's responsibility (matching the original library's plain
/// `np.save`, which does not create directories either).
pub fn save(path: &Path, tensor: &Tensor, pos: Pos) -> Result<(), DslError> {
    let file = File::create(path).map_err(|e| DslError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
        pos,
    })?;
    let writer = BufWriter::new(file);
    tensor.data().write_npy(writer).map_err(|e: WriteNpyError| DslError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
        pos,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    #[test]
    fn round_trips_a_single_qubit_operator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.npy");
        let x = Tensor::from_matrix(
            Array2::from_shape_vec(
                (2, 2),
                vec![
                    Complex64::new(0.0, 0.0),
                    Complex64::new(1.0, 0.0),
                    Complex64::new(1.0, 0.0),
                    Complex64::new(0.0, 0.0),
                ],
            )
            .unwrap(),
            1,
        )
        .unwrap();
        save(&path, &x, Pos::synthetic()).unwrap();
        let loaded = load(&path, Pos::synthetic()).unwrap();
        assert!(loaded.approx_eq(&x, 1e-12));
    }

    #[test]
    fn infers_measurement_rank_from_three_axis_matrix_form() {
        let shape = infer_dyadic_shape(&[2, 2, 2]).unwrap();
        assert_eq!(shape, vec![2, 2, 2]);
        let shape2 = infer_dyadic_shape(&[2, 4, 4]).unwrap();
        assert_eq!(shape2.len(), 5);
    }

    #[test]
    fn rejects_a_non_dyadic_shape() {
        assert!(infer_dyadic_shape(&[3, 3]).is_none());
    }
}
