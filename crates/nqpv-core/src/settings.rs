//! Tunable tolerances and flags shared across a verification run.

use crate::error::{CoreError, CoreResult, Pos};

/// The verifier's tolerances and behaviour flags. Constructed via
/// [`Settings::default`] and adjusted through the checked setters, which
/// reject non-positive tolerances rather than silently clamping them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Settings {
    /// Tolerance for operator equality, Hermiticity, measurement
    /// completeness, and Löwner slack. Must be `> 0`.
    pub eps: f64,
    /// Solver tolerance passed to the SDP feasibility search. Must be `> 0`.
    pub sdp_precision: f64,
    /// Suppress the running per-command report.
    pub silent: bool,
    /// Enable EPS-dedup on `Scope::append` and `Qpre` union.
    pub identical_var_check: bool,
    /// Keep intermediate operators around for post-hoc inspection instead
    /// of discarding them once a proof statement is emitted.
    pub opt_preserving: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            eps: 1e-7,
            sdp_precision: 1e-9,
            silent: false,
            identical_var_check: true,
            opt_preserving: false,
        }
    }
}

impl Settings {
    /// Sets `eps`, rejecting non-positive values.
    pub fn set_eps(&mut self, eps: f64) -> CoreResult<()> {
        if eps <= 0.0 {
            return Err(CoreError::ShapeMismatch {
                message: format!("EPS must be > 0, got {eps}"),
                pos: Pos::synthetic(),
            });
        }
        self.eps = eps;
        Ok(())
    }

    /// Sets `sdp_precision`, rejecting non-positive values.
    pub fn set_sdp_precision(&mut self, precision: f64) -> CoreResult<()> {
        if precision <= 0.0 {
            return Err(CoreError::ShapeMismatch {
                message: format!("SDP_precision must be > 0, got {precision}"),
                pos: Pos::synthetic(),
            });
        }
        self.sdp_precision = precision;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_documented_tolerances() {
        let s = Settings::default();
        assert_eq!(s.eps, 1e-7);
        assert_eq!(s.sdp_precision, 1e-9);
        assert!(s.identical_var_check);
        assert!(!s.silent);
        assert!(!s.opt_preserving);
    }

    #[test]
    fn rejects_non_positive_tolerances() {
        let mut s = Settings::default();
        assert!(s.set_eps(0.0).is_err());
        assert!(s.set_eps(-1.0).is_err());
        assert!(s.set_sdp_precision(0.0).is_err());
        assert!(s.set_eps(1e-6).is_ok());
    }
}
