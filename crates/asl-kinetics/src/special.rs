//! Special-function primitives shared by the kinetic models.
//!
//! Thin wrappers over `statrs` adding the domain clamps the models rely on:
//! dispersion parameters are exponentiated before they reach these functions,
//! so shapes are >= 1 in normal operation, but adversarial parameter
//! combinations from the fitting engine must still evaluate to something
//! finite rather than panic.

use statrs::function::erf::erf as erf_impl;
use statrs::function::gamma::{gamma_ur, ln_gamma};

use crate::MIN_DENOM;

/// Regularized upper incomplete gamma function `Q(a, x)`.
///
/// The shape `a` is floored positive and `x` is clamped to `x >= 0`
/// (`Q(a, 0) = 1`). Stable for the shapes the dispersion models produce
/// (`a >= 1`).
#[inline]
pub fn gamma_inc_upper_reg(a: f64, x: f64) -> f64 {
    let a = a.max(MIN_DENOM);
    if x <= 0.0 {
        return 1.0;
    }
    gamma_ur(a, x)
}

/// Gamma-variate density with sharpness `s` and shape product `p`,
/// normalized to unit area:
///
/// `g(t) = s^(1+sp) / Gamma(1+sp) * t^(sp) * exp(-s*t)`
///
/// Returns 0 for `t < 0`. Evaluated in log space to avoid overflow in the
/// `s^(1+sp)` prefactor at large sharpness.
pub fn gamma_variate_pdf(t: f64, s: f64, p: f64) -> f64 {
    if t < 0.0 {
        return 0.0;
    }
    let sp = s * p;
    if t == 0.0 {
        // Degenerate at the origin unless the density is exponential.
        return if sp > 0.0 { 0.0 } else { s };
    }
    let log_pdf = (1.0 + sp) * s.ln() - ln_gamma(1.0 + sp) + sp * t.ln() - s * t;
    log_pdf.exp()
}

/// Error function.
#[inline]
pub fn erf(x: f64) -> f64 {
    erf_impl(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_igamc_at_zero_is_one() {
        assert_eq!(gamma_inc_upper_reg(2.0, 0.0), 1.0);
        assert_eq!(gamma_inc_upper_reg(2.0, -1.0), 1.0);
    }

    #[test]
    fn test_igamc_shape_one_is_exponential_tail() {
        // Q(1, x) = exp(-x)
        for x in [0.1, 0.5, 1.0, 3.0, 10.0] {
            let q = gamma_inc_upper_reg(1.0, x);
            assert!((q - (-x).exp()).abs() < 1e-12, "x={x}: {q}");
        }
    }

    #[test]
    fn test_igamc_monotone_decreasing() {
        let mut prev = gamma_inc_upper_reg(3.0, 0.0);
        for i in 1..50 {
            let q = gamma_inc_upper_reg(3.0, i as f64 * 0.2);
            assert!(q <= prev);
            prev = q;
        }
    }

    #[test]
    fn test_igamc_nonpositive_shape_is_floored() {
        let q = gamma_inc_upper_reg(0.0, 1.0);
        assert!(q.is_finite());
    }

    #[test]
    fn test_gvf_zero_before_origin() {
        assert_eq!(gamma_variate_pdf(-0.1, 2.0, 1.5), 0.0);
        assert_eq!(gamma_variate_pdf(0.0, 2.0, 1.5), 0.0);
    }

    #[test]
    fn test_gvf_unit_area() {
        // Trapezoid over a wide window; the density decays as exp(-s t).
        let (s, p) = (2.0, 1.5);
        let h = 1e-3;
        let n = 30_000;
        let mut area = 0.0;
        for i in 0..=n {
            let t = i as f64 * h;
            let w = if i == 0 || i == n { 0.5 } else { 1.0 };
            area += w * gamma_variate_pdf(t, s, p) * h;
        }
        assert!((area - 1.0).abs() < 1e-4, "area={area}");
    }

    #[test]
    fn test_gvf_no_overflow_at_large_sharpness() {
        let v = gamma_variate_pdf(0.02, 500.0, 0.02);
        assert!(v.is_finite());
    }

    #[test]
    fn test_erf_reference_points() {
        assert_eq!(erf(0.0), 0.0);
        assert!((erf(1.0) - 0.8427007929497149).abs() < 1e-9);
        assert!((erf(-1.0) + 0.8427007929497149).abs() < 1e-9);
    }
}
