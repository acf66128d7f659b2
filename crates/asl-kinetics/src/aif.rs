//! Arterial input functions.
//!
//! An AIF describes the normalized label content of the blood feeding the
//! voxel as the bolus arrives, passes and clears. Two variants:
//!
//! - [`NoDispersionAif`] — the classic box-car bolus (Buxton 1998), with
//!   optional empirical edge smoothing to help the outer optimizer
//! - [`GammaDispersionAif`] — bolus edges dispersed by a gamma transit-time
//!   kernel, expressed through the regularized upper incomplete gamma
//!   function

use asl_core::traits::AifModel;
use asl_core::{KineticParams, Labeling};
use serde::{Deserialize, Serialize};

use crate::special::gamma_inc_upper_reg;
use crate::MIN_DENOM;

/// Empirical smoothing of the box-car bolus edges.
///
/// The lead-in ramps the curve up ahead of arrival instead of holding a hard
/// zero, and the lead-out decays it smoothly past the bolus end. Neither is
/// physically derived: both are fitting aids that keep the objective surface
/// differentiable in the arrival-delay and bolus-duration directions. The
/// default constants are inherited from long-standing practice and should be
/// treated as tunable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeSmoothing {
    /// Time constant of the exponential edge ramps.
    pub ramp_scale: f64,
    /// Fraction of each edge carried by the exponential ramp; the remainder
    /// is a linear term.
    pub ramp_weight: f64,
    /// Span of the linear tail on the lead-out ramp.
    pub tail_span: f64,
}

impl Default for EdgeSmoothing {
    fn default() -> Self {
        Self { ramp_scale: 0.05, ramp_weight: 0.98, tail_span: 5.0 }
    }
}

/// Dispersion-free box-car AIF.
///
/// Three-piece split on `ti` vs arrival delay vs arrival delay + bolus
/// duration. With [`EdgeSmoothing`] enabled (the default) the curve has a
/// short exponential lead-in before arrival and a smoothed lead-out after the
/// bolus; [`NoDispersionAif::sharp`] disables both, yielding the exact
/// box-car that the closed-form tissue models integrate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NoDispersionAif {
    /// Edge smoothing, or `None` for the exact box-car.
    pub smoothing: Option<EdgeSmoothing>,
}

impl Default for NoDispersionAif {
    fn default() -> Self {
        Self::new()
    }
}

impl NoDispersionAif {
    /// AIF with the default empirical edge smoothing.
    pub fn new() -> Self {
        Self { smoothing: Some(EdgeSmoothing::default()) }
    }

    /// AIF without edge smoothing: exactly 0 outside the bolus window.
    pub fn sharp() -> Self {
        Self { smoothing: None }
    }
}

impl AifModel for NoDispersionAif {
    fn kcblood(&self, ti: f64, kin: &KineticParams) -> f64 {
        let delt = kin.arrival_delay;
        let tau = kin.bolus_duration;
        let t1b = kin.t1_blood;
        let casl = kin.labeling.is_continuous();

        if ti < delt {
            let Some(sm) = self.smoothing else { return 0.0 };
            return 2.0
                * (-delt / t1b).exp()
                * (sm.ramp_weight * ((ti - delt) / sm.ramp_scale).exp()
                    + (1.0 - sm.ramp_weight) * ti / delt.max(MIN_DENOM));
        }
        if ti <= delt + tau {
            return if casl {
                2.0 * (-ti / delt.max(MIN_DENOM)).exp()
            } else {
                2.0 * (-ti / t1b).exp()
            };
        }

        let base = if casl {
            2.0 * (-ti / delt.max(MIN_DENOM)).exp()
        } else {
            2.0 * (-(delt + tau) / t1b).exp()
        };
        let Some(sm) = self.smoothing else { return 0.0 };
        let x = ti - delt - tau;
        let lead_out =
            sm.ramp_weight * (-x / sm.ramp_scale).exp() + (1.0 - sm.ramp_weight) * (1.0 - x / sm.tail_span);
        // The linear tail goes negative past tail_span.
        (base * lead_out).max(0.0)
    }

    fn name(&self) -> &'static str {
        "aif_nodisp"
    }
}

/// Gamma-kernel dispersion parameters, both in log domain.
///
/// The kernel is a gamma density with sharpness `s = exp(log_s)` and shape
/// `k = 1 + s*p` where `s*p = exp(log_sp)`. Working in log domain guarantees
/// positivity without constraining the fitting engine; `exp(log_sp)` is
/// additionally capped at 10 to keep the incomplete-gamma shape bounded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaDispersion {
    /// Log of the sharpness `s` of the dispersion kernel.
    pub log_s: f64,
    /// Log of the product `s*p` (shape minus one).
    pub log_sp: f64,
}

/// Cap on the exponentiated `s*p` product.
const MAX_SP: f64 = 10.0;

impl GammaDispersion {
    /// Dispersion record from log-domain parameters.
    pub fn new(log_s: f64, log_sp: f64) -> Self {
        Self { log_s, log_sp }
    }

    /// Exponentiated `(s, s*p)` with the overflow cap applied.
    #[inline]
    pub(crate) fn sharpness(&self) -> (f64, f64) {
        let s = self.log_s.exp();
        let sp = self.log_sp.exp().min(MAX_SP);
        (s, sp)
    }
}

/// AIF with gamma-dispersed bolus edges.
///
/// Exactly 0 before arrival. During the bolus the box-car is convolved with
/// the gamma kernel, which turns the leading edge into the lower
/// incomplete-gamma CDF; after the bolus the value is the difference of two
/// upper incomplete-gamma evaluations at the bolus entry and exit edges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GammaDispersionAif {
    /// Dispersion kernel parameters.
    pub dispersion: GammaDispersion,
}

impl GammaDispersionAif {
    /// Gamma-dispersed AIF with the given kernel parameters.
    pub fn new(dispersion: GammaDispersion) -> Self {
        Self { dispersion }
    }
}

impl AifModel for GammaDispersionAif {
    fn kcblood(&self, ti: f64, kin: &KineticParams) -> f64 {
        let delt = kin.arrival_delay;
        let tau = kin.bolus_duration;

        if ti < delt {
            return 0.0;
        }

        let (s, sp) = self.dispersion.sharpness();
        let k = 1.0 + sp;
        let base = match kin.labeling {
            Labeling::Continuous => 2.0 * (-delt / kin.t1_blood).exp(),
            Labeling::Pulsed => 2.0 * (-ti / kin.t1_blood).exp(),
        };

        if ti <= delt + tau {
            base * (1.0 - gamma_inc_upper_reg(k, s * (ti - delt)))
        } else {
            base * (gamma_inc_upper_reg(k, s * (ti - delt - tau))
                - gamma_inc_upper_reg(k, s * (ti - delt)))
        }
    }

    fn name(&self) -> &'static str {
        "aif_gammadisp"
    }
}
