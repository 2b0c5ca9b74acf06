//! Dense complex tensors of shape `(2,)*k`, representing operators over `k/2`
//! (state operator) or `(k-1)/2` (two-outcome measurement) named qubits.
//!
//! Axis `i` and axis `i + n` of a rank-`2n` tensor correspond to the row and
//! column index of the `i`-th qubit, matching the axis convention used
//! throughout this module. A rank-`2n+1` measurement tensor reserves axis
//! 0 for the two-outcome index and treats axes `1..=2n` the same way.

use nalgebra::DMatrix;
use ndarray::{Array2, ArrayD, IxDyn};
use num_complex::Complex64;

use crate::error::{CoreError, CoreResult, Pos};

/// A dense tensor of shape `(2,)*rank`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: ArrayD<Complex64>,
}

impl Tensor {
    /// Builds a tensor from raw data, checking every axis has dimension 2.
    pub fn from_array(data: ArrayD<Complex64>) -> CoreResult<Self> {
        if data.shape().iter().any(|&d| d != 2) {
            return Err(CoreError::ShapeMismatch {
                message: format!("all axes must have dimension 2, got shape {:?}", data.shape()),
                pos: Pos::synthetic(),
            });
        }
        Ok(Self { data })
    }

    /// The tensor's rank (number of axes).
    pub fn rank(&self) -> usize {
        self.data.ndim()
    }

    /// Number of qubits, for a state-operator tensor of even rank `2n`.
    pub fn qnum_state(&self) -> CoreResult<usize> {
        if self.rank() % 2 != 0 {
            return Err(CoreError::ShapeMismatch {
                message: format!("rank {} is odd, not a state operator", self.rank()),
                pos: Pos::synthetic(),
            });
        }
        Ok(self.rank() / 2)
    }

    /// Number of qubits, for a measurement tensor of odd rank `2n+1`.
    pub fn qnum_measurement(&self) -> CoreResult<usize> {
        if self.rank() % 2 != 1 {
            return Err(CoreError::ShapeMismatch {
                message: format!("rank {} is even, not a measurement", self.rank()),
                pos: Pos::synthetic(),
            });
        }
        Ok((self.rank() - 1) / 2)
    }

    pub fn data(&self) -> &ArrayD<Complex64> {
        &self.data
    }

    /// The identity tensor on `n` qubits, `eye_tensor(n)`.
    pub fn eye(n: usize) -> Self {
        let dim = 1usize << n;
        let mat = Array2::from_shape_fn((dim, dim), |(i, j)| {
            if i == j {
                Complex64::new(1.0, 0.0)
            } else {
                Complex64::new(0.0, 0.0)
            }
        });
        Self {
            data: mat.into_shape_with_order(IxDyn(&vec![2; 2 * n])).unwrap(),
        }
    }

    /// Reshape a rank-`2n` tensor to its `2^n x 2^n` matrix form.
    pub fn to_matrix(&self) -> CoreResult<Array2<Complex64>> {
        let n = self.qnum_state()?;
        let dim = 1usize << n;
        let reshaped = self
            .data
            .clone()
            .into_shape_with_order(IxDyn(&[dim, dim]))
            .map_err(|e| CoreError::ShapeMismatch {
                message: e.to_string(),
                pos: Pos::synthetic(),
            })?;
        Ok(reshaped.into_dimensionality().unwrap())
    }

    /// Build a rank-`2n` tensor from its `2^n x 2^n` matrix form.
    pub fn from_matrix(mat: Array2<Complex64>, n: usize) -> CoreResult<Self> {
        let expect = 1usize << n;
        if mat.nrows() != expect || mat.ncols() != expect {
            return Err(CoreError::ShapeMismatch {
                message: format!(
                    "matrix of shape {:?} does not match {n} qubits (expected {expect}x{expect})",
                    mat.dim()
                ),
                pos: Pos::synthetic(),
            });
        }
        let data = mat
            .into_dyn()
            .into_shape_with_order(IxDyn(&vec![2; 2 * n]))
            .unwrap();
        Ok(Self { data })
    }

    /// `dagger(M)`: conjugate and swap the row/column axis blocks.
    pub fn dagger(&self) -> CoreResult<Self> {
        let n = self.qnum_state()?;
        let mut axes: Vec<usize> = (n..2 * n).collect();
        axes.extend(0..n);
        let permuted = self.data.clone().permuted_axes(axes);
        let conjugated = permuted.mapv(|c| c.conj());
        Ok(Self {
            data: conjugated.as_standard_layout().to_owned(),
        })
    }

    /// `‖M†M − I‖_∞ ≤ EPS`: the unitary check.
    pub fn check_unitary(&self, eps: f64) -> CoreResult<bool> {
        let n = self.qnum_state()?;
        let dim = 1usize << n;
        let m = self.to_matrix()?;
        let md = conj_transpose(&m);
        let prod = m.dot(&md);
        let ident = identity(dim);
        Ok(max_abs_diff(&prod, &ident) <= eps)
    }

    /// `‖M − M†‖_∞ ≤ EPS` and all eigenvalues in `[-EPS, 1+EPS]`.
    pub fn check_hermitian_predicate(&self, eps: f64) -> CoreResult<bool> {
        let m = self.to_matrix()?;
        let md = conj_transpose(&m);
        if max_abs_diff(&m, &md) > eps {
            return Ok(false);
        }
        let eigvals = hermitian_eigenvalues(&m);
        Ok(eigvals.iter().all(|&lambda| lambda >= -eps && lambda <= 1.0 + eps))
    }

    /// Eigenvalues of this tensor's matrix form, assumed Hermitian. Used by
    /// the order decider's singleton eigen-test path.
    pub fn hermitian_eigenvalues(&self) -> CoreResult<Vec<f64>> {
        let m = self.to_matrix()?;
        Ok(hermitian_eigenvalues(&m))
    }

    /// Eigenvalues and eigenvectors (as columns) of this tensor's matrix
    /// form, assumed Hermitian. The order decider's eigen-test path uses the
    /// eigenvector of the most negative eigenvalue to build a density-matrix
    /// witness.
    pub fn hermitian_eigen(&self) -> CoreResult<(Vec<f64>, Array2<Complex64>)> {
        let m = self.to_matrix()?;
        let dim = m.nrows();
        let dm = DMatrix::<nalgebra::Complex<f64>>::from_fn(dim, dim, |i, j| {
            let c = m[(i, j)];
            nalgebra::Complex::new(c.re, c.im)
        });
        let eigen = nalgebra::linalg::SymmetricEigen::new(dm);
        let eigenvalues = eigen.eigenvalues.iter().copied().collect();
        let eigenvectors = Array2::from_shape_fn((dim, dim), |(i, j)| {
            let c = eigen.eigenvectors[(i, j)];
            Complex64::new(c.re, c.im)
        });
        Ok((eigenvalues, eigenvectors))
    }

    /// Element-wise subtraction, requiring identical shape.
    pub fn sub(&self, other: &Self) -> CoreResult<Self> {
        if self.data.shape() != other.data.shape() {
            return Err(CoreError::ShapeMismatch {
                message: format!(
                    "cannot subtract tensors of shape {:?} and {:?}",
                    self.data.shape(),
                    other.data.shape()
                ),
                pos: Pos::synthetic(),
            });
        }
        Ok(Self {
            data: &self.data - &other.data,
        })
    }

    /// Element-wise scalar multiplication.
    pub fn scale(&self, c: Complex64) -> Self {
        Self {
            data: self.data.mapv(|x| x * c),
        }
    }

    /// `M₀†M₀ + M₁†M₁ = I` within EPS: the two-outcome measurement check.
    pub fn check_measurement(&self, eps: f64) -> CoreResult<bool> {
        let n = self.qnum_measurement()?;
        let dim = 1usize << n;
        let (m0, m1) = self.measurement_outcomes()?;
        let sum = conj_transpose(&m0).dot(&m0) + conj_transpose(&m1).dot(&m1);
        let ident = identity(dim);
        Ok(max_abs_diff(&sum, &ident) <= eps)
    }

    /// Split a rank-`2n+1` measurement tensor into its `M0`, `M1` matrices.
    pub fn measurement_outcomes(&self) -> CoreResult<(Array2<Complex64>, Array2<Complex64>)> {
        let n = self.qnum_measurement()?;
        let dim = 1usize << n;
        let m0 = self.data.index_axis(ndarray::Axis(0), 0).to_owned();
        let m1 = self.data.index_axis(ndarray::Axis(0), 1).to_owned();
        let m0 = m0
            .into_shape_with_order(IxDyn(&[dim, dim]))
            .map_err(|e| CoreError::ShapeMismatch { message: e.to_string(), pos: Pos::synthetic() })?
            .into_dimensionality()
            .unwrap();
        let m1 = m1
            .into_shape_with_order(IxDyn(&[dim, dim]))
            .map_err(|e| CoreError::ShapeMismatch { message: e.to_string(), pos: Pos::synthetic() })?
            .into_dimensionality()
            .unwrap();
        Ok((m0, m1))
    }

    /// Build a rank-`2n+1` measurement tensor from its two outcome matrices.
    pub fn from_measurement_outcomes(
        m0: Array2<Complex64>,
        m1: Array2<Complex64>,
        n: usize,
    ) -> CoreResult<Self> {
        let t0 = Tensor::from_matrix(m0, n)?;
        let t1 = Tensor::from_matrix(m1, n)?;
        let mut shape = vec![2usize];
        shape.extend(vec![2usize; 2 * n]);
        let mut out = ArrayD::<Complex64>::zeros(IxDyn(&shape));
        out.index_axis_mut(ndarray::Axis(0), 0).assign(&t0.data);
        out.index_axis_mut(ndarray::Axis(0), 1).assign(&t1.data);
        Ok(Self { data: out })
    }

    /// `hermitian_contract(reg, H, act_vls, M)`: compute `M·H·M†` restricted
    /// to the axes named by `act_idx` (the positions of `act_vls` inside
    /// `reg`), leaving axes outside `act_idx` untouched. `m_act` is `M`'s
    /// matrix form, acting on `act_idx.len()` qubits.
    pub fn hermitian_contract(&self, act_idx: &[usize], m_act: &Tensor) -> CoreResult<Self> {
        let n_h = self.qnum_state()?;
        let n_m = m_act.qnum_state()?;
        if act_idx.len() != n_m {
            return Err(CoreError::ShapeMismatch {
                message: format!(
                    "acting operator on {n_m} qubits applied to {} qubit positions",
                    act_idx.len()
                ),
                pos: Pos::synthetic(),
            });
        }

        // Row axes of H to contract are act_idx; column axes are act_idx + n_h.
        let h_left: Vec<usize> = act_idx.to_vec();
        let h_right: Vec<usize> = act_idx.iter().map(|&i| i + n_h).collect();
        let m_left: Vec<usize> = (0..n_m).collect();
        let m_right: Vec<usize> = (n_m..2 * n_m).collect();

        let h = &self.data;
        let m = &m_act.data;
        let m_dagger = m_act.dagger()?.data;

        // temp1[remaining_H_left..., M_left_out...] = sum_k H[..k(left=act)..] * M[left_out, k]
        let temp1 = tensordot(h, m, &h_left, &m_right);
        // axes of temp1: (H axes with h_left removed, in original order) followed by m_left
        let remaining: Vec<usize> = (0..self.rank()).filter(|a| !h_left.contains(a)).collect();
        // temp1 axis order: remaining ++ m_left(as new axes, length n_m)
        // contract temp1's h_right positions (now shifted since h_left removed) with m_dagger's m_left
        let h_right_shifted: Vec<usize> = h_right
            .iter()
            .map(|&orig| remaining.iter().position(|&r| r == orig).unwrap())
            .collect();
        let temp2 = tensordot(&temp1, &m_dagger, &h_right_shifted, &m_left);

        // temp2 axes: (remaining with h_right_shifted removed, i.e. H's axes
        // outside act_idx/act_idx+n_h) ++ m_left(from temp1, length n_m)
        // ++ m_right(from m_dagger, length n_m). Scatter the two new blocks
        // back into act_idx (rows) and act_idx+n_h (cols).
        let remaining_axes: Vec<usize> = (0..self.rank())
            .filter(|a| !h_left.contains(a) && !h_right.contains(a))
            .collect();

        // temp2's current axis order is: remaining_axes ++ [new row block, len n_m] ++ [new col block, len n_m]
        let nr = remaining_axes.len();
        let mut perm = vec![0usize; self.rank()];
        let mut cursor = 0usize;
        for &orig_axis in &remaining_axes {
            perm[orig_axis] = cursor;
            cursor += 1;
        }
        for (k, &orig_axis) in act_idx.iter().enumerate() {
            perm[orig_axis] = nr + k;
        }
        for (k, &orig_axis) in act_idx.iter().enumerate() {
            perm[orig_axis + n_h] = nr + n_m + k;
        }
        // `perm[orig_axis] = position_in_temp2`; to get output axis `orig_axis` we need
        // the inverse permutation applied to temp2's axes.
        let axes_for_permute = perm.clone();
        let result = temp2.permuted_axes(axes_for_permute);
        let result = result.as_standard_layout().to_owned();
        Ok(Self { data: result })
    }

    /// `hermitian_init(reg, H, init_idx)`: replace `H` by `P0 H P0† + P1 H P1†`
    /// for each qubit position in `init_idx`, applied in order.
    pub fn hermitian_init(&self, init_idx: &[usize]) -> CoreResult<Self> {
        let p0 = Tensor::from_matrix(
            Array2::from_shape_vec(
                (2, 2),
                vec![
                    Complex64::new(1.0, 0.0),
                    Complex64::new(0.0, 0.0),
                    Complex64::new(0.0, 0.0),
                    Complex64::new(0.0, 0.0),
                ],
            )
            .unwrap(),
            1,
        )?;
        let p1 = Tensor::from_matrix(
            Array2::from_shape_vec(
                (2, 2),
                vec![
                    Complex64::new(0.0, 0.0),
                    Complex64::new(0.0, 0.0),
                    Complex64::new(1.0, 0.0),
                    Complex64::new(0.0, 0.0),
                ],
            )
            .unwrap(),
            1,
        )?;

        let mut cur = self.clone();
        for &idx in init_idx {
            let a = cur.hermitian_contract(&[idx], &p0)?;
            let b = cur.hermitian_contract(&[idx], &p1)?;
            cur = a.add(&b)?;
        }
        Ok(cur)
    }

    /// `hermitian_extend(all_reg, H, h_idx)`: tensor `H` with identity on the
    /// remaining qubits and permute so output axis `i` corresponds to the
    /// i-th qubit of the target register. `h_idx[k]` gives, for the k-th
    /// axis of `H`, its position in the target register.
    pub fn hermitian_extend(&self, n_all: usize, h_idx: &[usize]) -> CoreResult<Self> {
        let n_h = self.qnum_state()?;
        if h_idx.len() != n_h {
            return Err(CoreError::ShapeMismatch {
                message: "hermitian_extend index map length mismatch".into(),
                pos: Pos::synthetic(),
            });
        }
        if n_h == n_all {
            // Already full; just permute into place.
            let mut perm = vec![0usize; 2 * n_all];
            for (k, &pos) in h_idx.iter().enumerate() {
                perm[pos] = k;
                perm[pos + n_all] = k + n_h;
            }
            let result = self.data.clone().permuted_axes(perm);
            return Ok(Self {
                data: result.as_standard_layout().to_owned(),
            });
        }
        let ident = Tensor::eye(n_all - n_h);
        let extended = tensordot(&self.data, &ident.data, &[], &[]);
        // extended axes: H's n_h row axes, n_h col axes, then ident's (n_all-n_h) row axes, then col axes.
        let rest: Vec<usize> = (0..n_all).filter(|a| !h_idx.contains(a)).collect();
        let mut perm = vec![0usize; 2 * n_all];
        for (k, &pos) in h_idx.iter().enumerate() {
            perm[pos] = k;
            perm[pos + n_all] = n_h + k;
        }
        for (k, &pos) in rest.iter().enumerate() {
            perm[pos] = 2 * n_h + k;
            perm[pos + n_all] = 2 * n_h + (n_all - n_h) + k;
        }
        let result = extended.permuted_axes(perm);
        Ok(Self {
            data: result.as_standard_layout().to_owned(),
        })
    }

    /// Element-wise addition, requiring identical shape (callers are
    /// responsible for extending to a common QVL first — see
    /// [`crate::pair::OpVarPair::add`]).
    pub fn add(&self, other: &Self) -> CoreResult<Self> {
        if self.data.shape() != other.data.shape() {
            return Err(CoreError::ShapeMismatch {
                message: format!(
                    "cannot add tensors of shape {:?} and {:?}",
                    self.data.shape(),
                    other.data.shape()
                ),
                pos: Pos::synthetic(),
            });
        }
        Ok(Self {
            data: &self.data + &other.data,
        })
    }

    /// Element-wise equality within `eps` (the operator store's dedup test).
    pub fn approx_eq(&self, other: &Self, eps: f64) -> bool {
        if self.data.shape() != other.data.shape() {
            return false;
        }
        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(a, b)| (a - b).norm() <= eps)
    }
}

fn conj_transpose(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().mapv(|c| c.conj())
}

fn identity(dim: usize) -> Array2<Complex64> {
    Array2::from_shape_fn((dim, dim), |(i, j)| {
        if i == j {
            Complex64::new(1.0, 0.0)
        } else {
            Complex64::new(0.0, 0.0)
        }
    })
}

fn max_abs_diff(a: &Array2<Complex64>, b: &Array2<Complex64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).norm())
        .fold(0.0, f64::max)
}

/// Eigenvalues of a Hermitian matrix, via nalgebra's generalized symmetric
/// eigendecomposition (valid for complex Hermitian input, not just real
/// symmetric).
fn hermitian_eigenvalues(m: &Array2<Complex64>) -> Vec<f64> {
    let dim = m.nrows();
    let dm = DMatrix::<nalgebra::Complex<f64>>::from_fn(dim, dim, |i, j| {
        let c = m[(i, j)];
        nalgebra::Complex::new(c.re, c.im)
    });
    let eigen = nalgebra::linalg::SymmetricEigen::new(dm);
    eigen.eigenvalues.iter().copied().collect()
}

/// A minimal tensordot: contract `a`'s axes in `a_axes` against `b`'s axes
/// in `b_axes` (must be equal length and dimension-matched), producing a
/// tensor whose axes are `a`'s remaining axes (in order) followed by `b`'s
/// remaining axes (in order) — mirroring `numpy.tensordot`.
fn tensordot(
    a: &ArrayD<Complex64>,
    b: &ArrayD<Complex64>,
    a_axes: &[usize],
    b_axes: &[usize],
) -> ArrayD<Complex64> {
    let a_remaining: Vec<usize> = (0..a.ndim()).filter(|x| !a_axes.contains(x)).collect();
    let b_remaining: Vec<usize> = (0..b.ndim()).filter(|x| !b_axes.contains(x)).collect();

    let a_perm: Vec<usize> = a_remaining.iter().chain(a_axes.iter()).copied().collect();
    let b_perm: Vec<usize> = b_axes.iter().chain(b_remaining.iter()).copied().collect();

    let a_mat_dim_rows: usize = a_remaining.iter().map(|&ax| a.shape()[ax]).product::<usize>().max(1);
    let contract_dim: usize = a_axes.iter().map(|&ax| a.shape()[ax]).product::<usize>().max(1);
    let b_mat_dim_cols: usize = b_remaining.iter().map(|&ax| b.shape()[ax]).product::<usize>().max(1);

    let a_2d = a
        .clone()
        .permuted_axes(a_perm)
        .as_standard_layout()
        .to_owned()
        .into_shape_with_order((a_mat_dim_rows, contract_dim))
        .unwrap();
    let b_2d = b
        .clone()
        .permuted_axes(b_perm)
        .as_standard_layout()
        .to_owned()
        .into_shape_with_order((contract_dim, b_mat_dim_cols))
        .unwrap();

    let product = a_2d.dot(&b_2d);

    let mut out_shape: Vec<usize> = a_remaining.iter().map(|&ax| a.shape()[ax]).collect();
    out_shape.extend(b_remaining.iter().map(|&ax| b.shape()[ax]));
    if out_shape.is_empty() {
        out_shape.push(1);
        let arr = product.into_shape_with_order(IxDyn(&out_shape)).unwrap();
        return arr.index_axis(ndarray::Axis(0), 0).to_owned().into_dyn();
    }
    product.into_shape_with_order(IxDyn(&out_shape)).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sigma_x() -> Tensor {
        Tensor::from_matrix(
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
        .unwrap()
    }

    #[test]
    fn eye_is_unitary_and_hermitian_predicate() {
        let id = Tensor::eye(2);
        assert!(id.check_unitary(1e-9).unwrap());
        assert!(id.check_hermitian_predicate(1e-7).unwrap());
    }

    #[test]
    fn pauli_x_is_unitary_not_a_predicate() {
        let x = sigma_x();
        assert!(x.check_unitary(1e-9).unwrap());
        // eigenvalues of X are +-1, so 0<=X<=I fails (has a -1 eigenvalue).
        assert!(!x.check_hermitian_predicate(1e-7).unwrap());
    }

    #[test]
    fn dagger_of_identity_is_identity() {
        let id = Tensor::eye(1);
        let dag = id.dagger().unwrap();
        assert!(id.approx_eq(&dag, 1e-12));
    }

    #[test]
    fn hermitian_contract_identity_leaves_h_unchanged() {
        let p0 = Tensor::from_matrix(
            Array2::from_shape_vec(
                (2, 2),
                vec![
                    Complex64::new(1.0, 0.0),
                    Complex64::new(0.0, 0.0),
                    Complex64::new(0.0, 0.0),
                    Complex64::new(0.0, 0.0),
                ],
            )
            .unwrap(),
            1,
        )
        .unwrap();
        let id2 = Tensor::eye(2);
        let contracted = id2.hermitian_contract(&[0], &Tensor::eye(1)).unwrap();
        assert!(contracted.approx_eq(&id2, 1e-9));
        let _ = p0;
    }

    #[test]
    fn hermitian_extend_then_contract_is_identity_on_untouched_qubits() {
        let x = sigma_x();
        let extended = x.hermitian_extend(2, &[0]).unwrap();
        assert_eq!(extended.qnum_state().unwrap(), 2);
        assert!(extended.check_unitary(1e-9).is_ok());
    }
}
