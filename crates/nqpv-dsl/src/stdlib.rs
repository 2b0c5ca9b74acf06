//! The standard operator library injected into every module's root scope:
//! common unitary gates, Hermitian predicates (projectors and equality
//! predicates) and two-outcome measurements, hand-transcribed from the
//! reference operator library rather than loaded from disk.

use ndarray::Array2;
use num_complex::Complex64;

use nqpv_core::error::CoreResult;
use nqpv_core::operator::OperatorProperty;
use nqpv_core::tensor::Tensor;

fn re(x: f64) -> Complex64 {
    Complex64::new(x, 0.0)
}

fn mat(n: usize, entries: Vec<Complex64>) -> CoreResult<Tensor> {
    Tensor::from_matrix(Array2::from_shape_vec((n, n), entries).expect("fixed-size literal"), n.trailing_zeros() as usize)
}

fn measurement(n_qubits: usize, m0: Tensor, m1: Tensor) -> CoreResult<Tensor> {
    Tensor::from_measurement_outcomes(m0.to_matrix()?, m1.to_matrix()?, n_qubits)
}

/// `(name, tensor, property)` for every standard-library entry.
pub fn entries() -> CoreResult<Vec<(&'static str, Tensor, OperatorProperty)>> {
    let frac = std::f64::consts::FRAC_1_SQRT_2;
    let zero = re(0.0);
    let one = re(1.0);

    let i_gate = mat(2, vec![one, zero, zero, one])?;
    let x_gate = mat(2, vec![zero, one, one, zero])?;
    let y_gate = mat(2, vec![zero, Complex64::new(0.0, -1.0), Complex64::new(0.0, 1.0), zero])?;
    let z_gate = mat(2, vec![one, zero, zero, re(-1.0)])?;
    let h_gate = mat(2, vec![re(frac), re(frac), re(frac), re(-frac)])?;

    let cx = mat(
        4,
        vec![
            one, zero, zero, zero, //
            zero, one, zero, zero, //
            zero, zero, zero, one, //
            zero, zero, one, zero,
        ],
    )?;
    let ch = mat(
        4,
        vec![
            one, zero, zero, zero, //
            zero, one, zero, zero, //
            zero, zero, re(frac), re(frac), //
            zero, zero, re(frac), re(-frac),
        ],
    )?;
    let swap = mat(
        4,
        vec![
            one, zero, zero, zero, //
            zero, zero, one, zero, //
            zero, one, zero, zero, //
            zero, zero, zero, one,
        ],
    )?;
    let ccx = {
        let dim = 8;
        let mut data = vec![zero; dim * dim];
        for i in 0..dim {
            let j = if i == 6 { 7 } else if i == 7 { 6 } else { i };
            data[i * dim + j] = one;
        }
        mat(dim, data)?
    };

    let p0 = mat(2, vec![one, zero, zero, zero])?;
    let p1 = mat(2, vec![zero, zero, zero, one])?;
    let pp = mat(2, vec![re(0.5), re(0.5), re(0.5), re(0.5)])?;
    let pm = mat(2, vec![re(0.5), re(-0.5), re(-0.5), re(0.5)])?;
    let idiv2 = mat(2, vec![re(0.5), zero, zero, re(0.5)])?;
    let zero_op = mat(2, vec![zero, zero, zero, zero])?;

    let eq01_2 = mat(
        4,
        vec![
            one, zero, zero, zero, //
            zero, zero, zero, zero, //
            zero, zero, zero, zero, //
            zero, zero, zero, one,
        ],
    )?;
    let neq01_2 = mat(
        4,
        vec![
            zero, zero, zero, zero, //
            zero, one, zero, zero, //
            zero, zero, one, zero, //
            zero, zero, zero, zero,
        ],
    )?;
    let eq01_3 = {
        let dim = 8;
        let mut data = vec![zero; dim * dim];
        data[0] = one;
        data[dim * dim - 1] = one;
        mat(dim, data)?
    };

    let m01 = measurement(1, p0.clone(), p1.clone())?;
    let m10 = measurement(1, p1.clone(), p0.clone())?;
    let mpm = measurement(1, pp.clone(), pm.clone())?;
    let mmp = measurement(1, pm.clone(), pp.clone())?;
    let m_eq01_2 = measurement(2, eq01_2.clone(), neq01_2.clone())?;

    Ok(vec![
        ("I", i_gate, OperatorProperty::Unitary),
        ("X", x_gate, OperatorProperty::Unitary),
        ("Y", y_gate, OperatorProperty::Unitary),
        ("Z", z_gate, OperatorProperty::Unitary),
        ("H", h_gate, OperatorProperty::Unitary),
        ("CX", cx, OperatorProperty::Unitary),
        ("CH", ch, OperatorProperty::Unitary),
        ("SWAP", swap, OperatorProperty::Unitary),
        ("CCX", ccx, OperatorProperty::Unitary),
        ("P0", p0, OperatorProperty::HermitianPredicate),
        ("P1", p1, OperatorProperty::HermitianPredicate),
        ("Pp", pp, OperatorProperty::HermitianPredicate),
        ("Pm", pm, OperatorProperty::HermitianPredicate),
        ("Idiv2", idiv2, OperatorProperty::HermitianPredicate),
        ("Zero", zero_op, OperatorProperty::HermitianPredicate),
        ("Eq01_2", eq01_2, OperatorProperty::HermitianPredicate),
        ("Neq01_2", neq01_2, OperatorProperty::HermitianPredicate),
        ("Eq01_3", eq01_3, OperatorProperty::HermitianPredicate),
        ("M01", m01, OperatorProperty::Measurement),
        ("M10", m10, OperatorProperty::Measurement),
        ("Mpm", mpm, OperatorProperty::Measurement),
        ("Mmp", mmp, OperatorProperty::Measurement),
        ("MEq01_2", m_eq01_2, OperatorProperty::Measurement),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use nqpv_core::settings::Settings;

    #[test]
    fn every_entry_satisfies_its_declared_property() {
        let settings = Settings::default();
        for (name, tensor, property) in entries().unwrap() {
            let ok = match property {
                OperatorProperty::Unitary => tensor.check_unitary(settings.eps).unwrap(),
                OperatorProperty::HermitianPredicate => tensor.check_hermitian_predicate(settings.eps).unwrap(),
                OperatorProperty::Measurement => tensor.check_measurement(settings.eps).unwrap(),
            };
            assert!(ok, "stdlib entry '{name}' fails its declared property check");
        }
    }
}
