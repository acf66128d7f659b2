//! # asl-kinetics
//!
//! Kinetic-curve models for Arterial Spin Labelling (ASL) perfusion
//! quantification. Each model is a closed-form (or numerically integrated)
//! solution of the compartmental tracer ODEs describing how a magnetically
//! labeled bolus evolves in the feeding vessel and in tissue:
//!
//! - [`aif`] — arterial input functions (box-car and gamma-dispersed)
//! - [`residue`] — fractional label residue in the voxel after entry
//! - [`tissue`] — observable tissue kinetic curves, one closed form per
//!   practically-used (dispersion, residue) pairing
//! - [`convolve`] — composite tissue model pairing an arbitrary AIF with an
//!   arbitrary residue function via discretized convolution
//! - [`special`] — incomplete-gamma / gamma-variate / erf primitives
//!
//! ## Architecture
//!
//! Models implement the traits in `asl-core` and are selected by the
//! external fitting engine, which calls them once per time point with a
//! validated [`KineticParams`](asl_core::KineticParams) record. Evaluation
//! never allocates except in the convolution model and never fails: numeric
//! edge cases are clamped, not rejected.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aif;
pub mod convolve;
pub mod residue;
pub mod special;
pub mod tissue;

pub use aif::{EdgeSmoothing, GammaDispersion, GammaDispersionAif, NoDispersionAif};
pub use convolve::{ConvolutionTissueModel, Quadrature, DEFAULT_STEP};
pub use residue::{
    ImpermeableResidue, SinglePassResidue, TransitImpermeableResidue, TwoCompartmentResidue,
    WellMixedResidue,
};
pub use tissue::{
    GammaWellMixedTissue, ImpermeableTissue, SinglePassTissue, TransitImpermeableTissue,
    TwoCompartmentTissue, WellMixedTissue,
};

/// Floor applied to denominators that can vanish under adversarial parameter
/// combinations.
pub(crate) const MIN_DENOM: f64 = 1e-12;

/// Floor a signed denominator away from zero, preserving its sign.
#[inline]
pub(crate) fn floor_denom(x: f64) -> f64 {
    if x.abs() >= MIN_DENOM {
        x
    } else if x.is_sign_negative() {
        -MIN_DENOM
    } else {
        MIN_DENOM
    }
}

#[cfg(test)]
mod tests {
    use super::floor_denom;

    #[test]
    fn test_floor_denom_preserves_sign() {
        assert_eq!(floor_denom(0.5), 0.5);
        assert_eq!(floor_denom(-0.5), -0.5);
        assert_eq!(floor_denom(0.0), 1e-12);
        assert_eq!(floor_denom(1e-15), 1e-12);
        assert_eq!(floor_denom(-1e-15), -1e-12);
    }
}
