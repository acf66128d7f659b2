//! Residue functions.
//!
//! A residue function gives the fraction of label still present in the voxel
//! at elapsed time `ti` after entry. All variants are normalized to 1 at
//! `ti = 0`. They are primarily consumed by the numerical tissue model in
//! [`crate::convolve`]; the closed-form tissue models bake the corresponding
//! algebra in directly.
//!
//! Compartmental assumptions, in increasing complexity:
//!
//! - [`WellMixedResidue`] — single well-mixed compartment (Buxton 1998)
//! - [`ImpermeableResidue`] — label trapped intravascularly
//! - [`TransitImpermeableResidue`] — trapped, then swept out after a transit
//!   time
//! - [`TwoCompartmentResidue`] — blood + tissue with one-way exchange
//!   (Parkes & Tofts / St. Lawrence 2000, no backflow, no venous outflow)
//! - [`SinglePassResidue`] — single-pass approximation of St. Lawrence 2000

use asl_core::traits::ResidueModel;
use asl_core::{Error, KineticParams, Result};
use serde::{Deserialize, Serialize};

use crate::{floor_denom, MIN_DENOM};

/// Single well-mixed compartment: label decays with the apparent tissue T1,
/// which combines tissue relaxation and clearance by perfusion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WellMixedResidue;

impl ResidueModel for WellMixedResidue {
    fn resid(&self, ti: f64, kin: &KineticParams) -> f64 {
        (-ti / kin.t1_apparent()).exp()
    }

    fn name(&self) -> &'static str {
        "resid_wellmix"
    }
}

/// Impermeable compartment: label never leaves the vasculature and decays
/// with blood T1 only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImpermeableResidue;

impl ResidueModel for ImpermeableResidue {
    fn resid(&self, ti: f64, kin: &KineticParams) -> f64 {
        (-ti / kin.t1_blood).exp()
    }

    fn name(&self) -> &'static str {
        "resid_imperm"
    }
}

/// Impermeable compartment with a finite residence time: blood-T1 decay,
/// forced to exactly 0 once `ti` exceeds the transit time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransitImpermeableResidue {
    transit_time: f64,
}

impl TransitImpermeableResidue {
    /// Residue with the given pre-capillary transit time.
    pub fn new(transit_time: f64) -> Result<Self> {
        if !transit_time.is_finite() || transit_time <= 0.0 {
            return Err(Error::Validation(format!(
                "transit_time must be finite and > 0, got {transit_time}"
            )));
        }
        Ok(Self { transit_time })
    }

    /// The pre-capillary transit time.
    pub fn transit_time(&self) -> f64 {
        self.transit_time
    }
}

impl ResidueModel for TransitImpermeableResidue {
    fn resid(&self, ti: f64, kin: &KineticParams) -> f64 {
        if ti > self.transit_time {
            0.0
        } else {
            (-ti / kin.t1_blood).exp()
        }
    }

    fn name(&self) -> &'static str {
        "resid_imperm_transit"
    }
}

/// Two-compartment residue without backflow or venous outflow.
///
/// Label exchanges from blood into tissue at rate `kw = PS / vb`; once in
/// tissue it decays with tissue T1, while the intravascular fraction decays
/// with blood T1 and exchange. The residue is the two-exponential mixture
/// `b*exp(-ti/T1) + (1-b)*exp(-a*ti)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TwoCompartmentResidue {
    exchange_rate: f64,
}

impl TwoCompartmentResidue {
    /// Residue with the given blood-to-tissue exchange rate `kw`.
    pub fn new(exchange_rate: f64) -> Result<Self> {
        if !exchange_rate.is_finite() || exchange_rate <= 0.0 {
            return Err(Error::Validation(format!(
                "exchange_rate must be finite and > 0, got {exchange_rate}"
            )));
        }
        Ok(Self { exchange_rate })
    }

    /// The blood-to-tissue exchange rate.
    pub fn exchange_rate(&self) -> f64 {
        self.exchange_rate
    }

    /// Mixture rate `a` and weight `b` of the two-exponential residue.
    #[inline]
    pub(crate) fn coefficients(&self, kin: &KineticParams) -> (f64, f64) {
        let kw = self.exchange_rate;
        let (t1, t1b) = (kin.t1_tissue, kin.t1_blood);
        let a = kw + 1.0 / t1b;
        let b = kw * t1 * t1b / floor_denom(kw * t1 * t1b + (t1 - t1b));
        (a, b)
    }
}

impl ResidueModel for TwoCompartmentResidue {
    fn resid(&self, ti: f64, kin: &KineticParams) -> f64 {
        let (a, b) = self.coefficients(kin);
        b * (-ti / kin.t1_tissue).exp() + (1.0 - b) * (-a * ti).exp()
    }

    fn name(&self) -> &'static str {
        "resid_twocpt"
    }
}

/// Single-pass approximation residue (St. Lawrence 2000).
///
/// Two-compartment mixture while `ti` is below the capillary transit time;
/// afterwards only the extracted fraction remains, decaying with tissue T1
/// and scaled by the extraction fraction
/// `ER = 1 - exp(-PS/f - (1/T1b - 1/T1)*tauc)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SinglePassResidue {
    ps: f64,
    vb: f64,
    capillary_transit: f64,
}

impl SinglePassResidue {
    /// Residue from the permeability-surface-area product `ps`, vascular
    /// volume fraction `vb` and capillary transit time.
    pub fn new(ps: f64, vb: f64, capillary_transit: f64) -> Result<Self> {
        for (name, v) in [("ps", ps), ("vb", vb), ("capillary_transit", capillary_transit)] {
            if !v.is_finite() || v <= 0.0 {
                return Err(Error::Validation(format!("{name} must be finite and > 0, got {v}")));
            }
        }
        Ok(Self { ps, vb, capillary_transit })
    }

    /// Permeability-surface-area product.
    pub fn ps(&self) -> f64 {
        self.ps
    }

    /// Vascular volume fraction.
    pub fn vb(&self) -> f64 {
        self.vb
    }

    /// Capillary transit time.
    pub fn capillary_transit(&self) -> f64 {
        self.capillary_transit
    }

    /// Mixture rate `a`, weight `b` and extraction factor `ER`.
    #[inline]
    pub(crate) fn coefficients(&self, kin: &KineticParams) -> (f64, f64, f64) {
        let (t1, t1b) = (kin.t1_tissue, kin.t1_blood);
        let a = self.ps / self.vb + 1.0 / t1b;
        let b = self.ps * t1 * t1b / floor_denom(self.ps * t1 * t1b + (t1 - t1b) * self.vb);
        let er = 1.0
            - (-self.ps / kin.perfusion.max(MIN_DENOM)
                - (1.0 / t1b - 1.0 / t1) * self.capillary_transit)
                .exp();
        (a, b, er)
    }
}

impl ResidueModel for SinglePassResidue {
    fn resid(&self, ti: f64, kin: &KineticParams) -> f64 {
        let (a, b, er) = self.coefficients(kin);
        if ti < self.capillary_transit {
            b * (-ti / kin.t1_tissue).exp() + (1.0 - b) * (-a * ti).exp()
        } else {
            b * er * (-ti / kin.t1_tissue).exp()
        }
    }

    fn name(&self) -> &'static str {
        "resid_spa"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asl_core::Labeling;

    fn pasl() -> KineticParams {
        KineticParams::new(0.5, 1.0, 1.3, 1.6, 0.01, 0.9, Labeling::Pulsed).unwrap()
    }

    #[test]
    fn test_all_residues_start_at_one() {
        let kin = pasl();
        let models: Vec<Box<dyn ResidueModel>> = vec![
            Box::new(WellMixedResidue),
            Box::new(ImpermeableResidue),
            Box::new(TransitImpermeableResidue::new(1.2).unwrap()),
            Box::new(TwoCompartmentResidue::new(0.8).unwrap()),
            Box::new(SinglePassResidue::new(0.8, 0.05, 1.0).unwrap()),
        ];
        for m in &models {
            assert!((m.resid(0.0, &kin) - 1.0).abs() < 1e-12, "{}", m.name());
        }
    }

    #[test]
    fn test_wellmix_uses_apparent_t1() {
        let kin = pasl();
        let r = WellMixedResidue.resid(1.0, &kin);
        assert!((r - (-1.0 / kin.t1_apparent()).exp()).abs() < 1e-15);
    }

    #[test]
    fn test_imperm_decays_with_blood_t1() {
        let kin = pasl();
        let r = ImpermeableResidue.resid(2.0, &kin);
        assert!((r - (-2.0f64 / 1.6).exp()).abs() < 1e-15);
    }

    #[test]
    fn test_transit_cutoff_exact_zero() {
        let kin = pasl();
        let m = TransitImpermeableResidue::new(1.2).unwrap();
        assert!(m.resid(1.2, &kin) > 0.0);
        assert_eq!(m.resid(1.2000001, &kin), 0.0);
        assert_eq!(m.resid(10.0, &kin), 0.0);
    }

    #[test]
    fn test_twocpt_fixture() {
        let kin = pasl();
        let m = TwoCompartmentResidue::new(0.8).unwrap();
        assert!((m.resid(1.0, &kin) - 0.5123856975353175).abs() < 1e-12);
    }

    #[test]
    fn test_spa_continuous_at_capillary_transit() {
        // Strong-extraction regime: both vanishing terms of the jump are
        // below 1e-6, so the residue is continuous to that tolerance.
        let kin = pasl();
        let m = SinglePassResidue::new(0.15, 0.01, 1.0).unwrap();
        let eps = 1e-9;
        let below = m.resid(1.0 - eps, &kin);
        let above = m.resid(1.0 + eps, &kin);
        assert!((below - above).abs() < 1e-6, "jump = {}", below - above);
    }

    #[test]
    fn test_invalid_residue_params() {
        assert!(TransitImpermeableResidue::new(0.0).is_err());
        assert!(TwoCompartmentResidue::new(-1.0).is_err());
        assert!(SinglePassResidue::new(0.8, 0.0, 1.0).is_err());
        assert!(SinglePassResidue::new(f64::NAN, 0.05, 1.0).is_err());
    }
}
