//! Shared parameter records for ASL kinetic-curve evaluation

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Labeling scheme of the acquisition.
///
/// The two schemes lead to structurally different decay branches in every
/// kinetic curve: continuous (CASL/pCASL) labeling delivers label at a fixed
/// inversion plane for the whole bolus duration, pulsed (PASL) labeling
/// inverts a slab once and the label decays with blood T1 from inversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Labeling {
    /// Continuous or pseudo-continuous labeling (CASL/pCASL).
    Continuous,
    /// Pulsed labeling (PASL).
    Pulsed,
}

impl Labeling {
    /// True for continuous labeling.
    #[inline]
    pub fn is_continuous(self) -> bool {
        matches!(self, Labeling::Continuous)
    }
}

/// Physiological scalars shared by all kinetic models for one evaluation.
///
/// Constructed once per call by the external fitting engine and immutable for
/// the call's duration. Time units are whatever the acquisition uses
/// (conventionally seconds); all fields must be expressed in consistent units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KineticParams {
    /// Arrival delay: time before labeled blood reaches the region of
    /// interest (often called bolus arrival time or transit delay).
    pub arrival_delay: f64,
    /// Bolus duration: time window during which label is delivered.
    pub bolus_duration: f64,
    /// Longitudinal relaxation time of tissue.
    pub t1_tissue: f64,
    /// Longitudinal relaxation time of arterial blood.
    pub t1_blood: f64,
    /// Perfusion rate (flow per unit tissue, same time base as the T1s).
    pub perfusion: f64,
    /// Blood-tissue partition coefficient (lambda).
    pub partition_coeff: f64,
    /// Labeling scheme.
    pub labeling: Labeling,
}

impl KineticParams {
    /// Create a validated parameter record.
    ///
    /// Rates and relaxation times must be finite and strictly positive;
    /// the arrival delay and perfusion must be finite and non-negative.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        arrival_delay: f64,
        bolus_duration: f64,
        t1_tissue: f64,
        t1_blood: f64,
        perfusion: f64,
        partition_coeff: f64,
        labeling: Labeling,
    ) -> Result<Self> {
        if !arrival_delay.is_finite() || arrival_delay < 0.0 {
            return Err(Error::Validation(format!(
                "arrival_delay must be finite and >= 0, got {arrival_delay}"
            )));
        }
        if !bolus_duration.is_finite() || bolus_duration <= 0.0 {
            return Err(Error::Validation(format!(
                "bolus_duration must be finite and > 0, got {bolus_duration}"
            )));
        }
        for (name, v) in [
            ("t1_tissue", t1_tissue),
            ("t1_blood", t1_blood),
            ("partition_coeff", partition_coeff),
        ] {
            if !v.is_finite() || v <= 0.0 {
                return Err(Error::Validation(format!("{name} must be finite and > 0, got {v}")));
            }
        }
        if !perfusion.is_finite() || perfusion < 0.0 {
            return Err(Error::Validation(format!(
                "perfusion must be finite and >= 0, got {perfusion}"
            )));
        }
        Ok(Self {
            arrival_delay,
            bolus_duration,
            t1_tissue,
            t1_blood,
            perfusion,
            partition_coeff,
            labeling,
        })
    }

    /// Apparent tissue T1: blood T1 decay plus clearance by perfusion,
    /// `1/T1app = 1/T1tissue + f/lambda`.
    #[inline]
    pub fn t1_apparent(&self) -> f64 {
        1.0 / (1.0 / self.t1_tissue + self.perfusion / self.partition_coeff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> Result<KineticParams> {
        KineticParams::new(0.5, 1.0, 1.3, 1.6, 0.01, 0.9, Labeling::Pulsed)
    }

    #[test]
    fn test_valid_params() {
        let p = standard().unwrap();
        assert_eq!(p.arrival_delay, 0.5);
        assert!(!p.labeling.is_continuous());
    }

    #[test]
    fn test_t1_apparent() {
        let p = standard().unwrap();
        let expected = 1.0 / (1.0 / 1.3 + 0.01 / 0.9);
        assert!((p.t1_apparent() - expected).abs() < 1e-15);
    }

    #[test]
    fn test_invalid_params() {
        assert!(KineticParams::new(-0.1, 1.0, 1.3, 1.6, 0.01, 0.9, Labeling::Pulsed).is_err());
        assert!(KineticParams::new(0.5, 0.0, 1.3, 1.6, 0.01, 0.9, Labeling::Pulsed).is_err());
        assert!(KineticParams::new(0.5, 1.0, 0.0, 1.6, 0.01, 0.9, Labeling::Pulsed).is_err());
        assert!(KineticParams::new(0.5, 1.0, 1.3, f64::NAN, 0.01, 0.9, Labeling::Pulsed).is_err());
        assert!(KineticParams::new(0.5, 1.0, 1.3, 1.6, -0.01, 0.9, Labeling::Pulsed).is_err());
    }
}
