//! Closed-form tissue kinetic curves.
//!
//! Each model is the analytic convolution of one AIF shape with one residue
//! function, instantiated per practically-used pairing:
//!
//! - [`ImpermeableTissue`] — box-car AIF, label trapped (infinite residence
//!   time), blood-T1 decay
//! - [`WellMixedTissue`] — box-car AIF, well-mixed compartment: the standard
//!   single-compartment model (Buxton 1998)
//! - [`TransitImpermeableTissue`] — box-car AIF, impermeable vessel with a
//!   finite pre-capillary residence time
//! - [`TwoCompartmentTissue`] — box-car AIF, one-way blood/tissue exchange
//!   (pulsed labeling only)
//! - [`SinglePassTissue`] — box-car AIF, single-pass approximation
//!   (St. Lawrence 2000; pulsed labeling only)
//! - [`GammaWellMixedTissue`] — gamma-dispersed AIF, well-mixed compartment
//!   (pulsed labeling only)
//!
//! All forms return exactly 0 strictly before arrival. Pairings without a
//! closed form go through [`crate::convolve::ConvolutionTissueModel`].

use asl_core::traits::TissueModel;
use asl_core::{Error, KineticParams, Labeling, Result};
use serde::{Deserialize, Serialize};

use crate::aif::GammaDispersion;
use crate::residue::{SinglePassResidue, TwoCompartmentResidue};
use crate::special::gamma_inc_upper_reg;
use crate::{floor_denom, MIN_DENOM};

/// Tissue curve for an impermeable voxel with infinite residence time:
/// delivered label accumulates and decays with blood T1 only.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ImpermeableTissue;

impl TissueModel for ImpermeableTissue {
    fn kctissue(&self, ti: f64, kin: &KineticParams) -> f64 {
        let delt = kin.arrival_delay;
        let tau = kin.bolus_duration;
        let t1b = kin.t1_blood;
        let casl = kin.labeling.is_continuous();

        if ti < delt {
            return 0.0;
        }
        let core = if ti <= delt + tau {
            if casl {
                (-delt / t1b).exp() - (-ti / t1b).exp()
            } else {
                ti - delt
            }
        } else if casl {
            (-ti / t1b).exp() * ((tau / t1b).exp() - 1.0)
        } else {
            tau
        };
        let decay = if casl { t1b } else { (-ti / t1b).exp() };
        2.0 * core * decay
    }

    fn name(&self) -> &'static str {
        "tiss_nodisp_imperm"
    }
}

/// Standard single-compartment tissue curve (Buxton 1998): box-car AIF into
/// a well-mixed compartment with apparent T1.
///
/// The continuous and pulsed branches use structurally different closed
/// forms; the pulsed branch divides by `R = 1/T1app - 1/T1b`, which is
/// floored away from zero for the (artefactual) case `T1app == T1b`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WellMixedTissue;

impl TissueModel for WellMixedTissue {
    fn kctissue(&self, ti: f64, kin: &KineticParams) -> f64 {
        let delt = kin.arrival_delay;
        let tau = kin.bolus_duration;
        let t1b = kin.t1_blood;
        let t1app = kin.t1_apparent();

        if ti < delt {
            return 0.0;
        }
        match kin.labeling {
            Labeling::Continuous => {
                let lead = 2.0 * t1app * (-delt / t1b).exp();
                if ti <= delt + tau {
                    lead * (1.0 - (-(ti - delt) / t1app).exp())
                } else {
                    lead * (-(ti - tau - delt) / t1app).exp() * (1.0 - (-tau / t1app).exp())
                }
            }
            Labeling::Pulsed => {
                let r = floor_denom(1.0 / t1app - 1.0 / t1b);
                let f = 2.0 * (-ti / t1app).exp();
                let hi = if ti <= delt + tau { ti } else { delt + tau };
                f / r * ((r * hi).exp() - (r * delt).exp())
            }
        }
    }

    fn name(&self) -> &'static str {
        "tiss_nodisp_wellmix"
    }
}

/// Tissue curve for an impermeable vessel with a finite pre-capillary
/// residence time: four-way piecewise split from intersecting the bolus
/// window with the residence window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TransitImpermeableTissue {
    transit_time: f64,
}

impl TransitImpermeableTissue {
    /// Tissue model with the given pre-capillary residence time.
    pub fn new(transit_time: f64) -> Result<Self> {
        if !transit_time.is_finite() || transit_time <= 0.0 {
            return Err(Error::Validation(format!(
                "transit_time must be finite and > 0, got {transit_time}"
            )));
        }
        Ok(Self { transit_time })
    }
}

impl TissueModel for TransitImpermeableTissue {
    fn kctissue(&self, ti: f64, kin: &KineticParams) -> f64 {
        let delt = kin.arrival_delay;
        let tau = kin.bolus_duration;
        let t1b = kin.t1_blood;
        let taup = self.transit_time;
        let casl = kin.labeling.is_continuous();

        let mut core = 0.0;
        if ti > delt && ti < delt + taup + tau {
            core = if ti < delt + tau && ti < delt + taup {
                // Bolus still arriving, nothing has left yet.
                if casl {
                    (-delt / t1b).exp() - (-ti / t1b).exp()
                } else {
                    ti - delt
                }
            } else if ti < delt + tau && ti >= delt + taup {
                // Inflow balanced by outflow.
                if casl {
                    (-delt / t1b).exp() * (1.0 - (-taup / t1b).exp())
                } else {
                    taup
                }
            } else if ti >= delt + tau && ti >= delt + taup {
                // Bolus over, remaining label draining out.
                if casl {
                    (-(ti - tau) / t1b).exp() - (-(delt + taup) / t1b).exp()
                } else {
                    delt + tau + taup - ti
                }
            } else {
                // Bolus over but nothing has left yet (tau < taup).
                if casl {
                    (-ti / t1b).exp() * ((tau / t1b).exp() - 1.0)
                } else {
                    tau
                }
            };
        }
        let decay = if casl { t1b } else { (-ti / t1b).exp() };
        2.0 * core * decay
    }

    fn name(&self) -> &'static str {
        "tiss_nodisp_imperm_transit"
    }
}

/// Two-compartment tissue curve without backflow or venous outflow
/// (Parkes & Tofts / St. Lawrence 2000). Pulsed labeling only.
///
/// # Panics
///
/// Panics if evaluated with continuous labeling: that is a configuration
/// error of the calling fitting engine, not a recoverable numeric case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TwoCompartmentTissue {
    residue: TwoCompartmentResidue,
}

impl TwoCompartmentTissue {
    /// Tissue model with the given blood-to-tissue exchange rate `kw`.
    pub fn new(exchange_rate: f64) -> Result<Self> {
        Ok(Self { residue: TwoCompartmentResidue::new(exchange_rate)? })
    }
}

impl TissueModel for TwoCompartmentTissue {
    fn kctissue(&self, ti: f64, kin: &KineticParams) -> f64 {
        assert!(
            !kin.labeling.is_continuous(),
            "two-compartment tissue model supports pulsed labeling only"
        );
        let delt = kin.arrival_delay;
        let tau = kin.bolus_duration;
        let t1 = kin.t1_tissue;
        if ti < delt {
            return 0.0;
        }

        let (a, b) = self.residue.coefficients(kin);
        let s = floor_denom(1.0 / t1 - 1.0 / kin.t1_blood);
        let t = floor_denom(self.residue.exchange_rate());
        let hi = if ti <= delt + tau { ti } else { delt + tau };
        2.0 * (b / s * (-ti / t1).exp() * ((s * hi).exp() - (s * delt).exp())
            + (1.0 - b) / t * (-a * ti).exp() * ((t * hi).exp() - (t * delt).exp()))
    }

    fn name(&self) -> &'static str {
        "tiss_nodisp_twocpt"
    }
}

/// Single-pass-approximation tissue curve (St. Lawrence 2000): one-way
/// exchange during a capillary transit, extraction-scaled tissue decay after
/// it. Pulsed labeling only.
///
/// Up to five piecewise regions arise from ordering elapsed time against the
/// bolus duration and the capillary transit time; each region is a sum of
/// the early-region integral (pre-saturation, [`Self::early_integral`]) and
/// the late-region integral (post-extraction plateau,
/// [`Self::late_integral`]). When the capillary transit time equals the
/// bolus duration exactly, the transit-first branch is taken; the two
/// candidate branches agree there, so the tie-break does not introduce a
/// discontinuity.
///
/// # Panics
///
/// Panics if evaluated with continuous labeling (configuration error).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SinglePassTissue {
    residue: SinglePassResidue,
}

impl SinglePassTissue {
    /// Tissue model from the permeability-surface-area product, vascular
    /// volume fraction and capillary transit time.
    pub fn new(ps: f64, vb: f64, capillary_transit: f64) -> Result<Self> {
        Ok(Self { residue: SinglePassResidue::new(ps, vb, capillary_transit)? })
    }

    /// Integral of the box-car AIF against the pre-transit two-exponential
    /// residue, delivery window `[lo, hi]`, evaluated at time `at`.
    fn early_integral(&self, lo: f64, hi: f64, at: f64, kin: &KineticParams) -> f64 {
        let t1 = kin.t1_tissue;
        let (a, b, _) = self.residue.coefficients(kin);
        let s = floor_denom(1.0 / t1 - 1.0 / kin.t1_blood);
        let t = self.residue.ps() / self.residue.vb();
        b / s * (-at / t1).exp() * ((s * hi).exp() - (s * lo).exp())
            + (1.0 - b) / t * (-a * at).exp() * ((t * hi).exp() - (t * lo).exp())
    }

    /// Integral of the box-car AIF against the post-transit residue
    /// (extraction-scaled tissue decay), delivery window `[lo, hi]`,
    /// evaluated at time `at`.
    fn late_integral(&self, lo: f64, hi: f64, at: f64, kin: &KineticParams) -> f64 {
        let t1 = kin.t1_tissue;
        let (_, b, er) = self.residue.coefficients(kin);
        let s = floor_denom(1.0 / t1 - 1.0 / kin.t1_blood);
        b * er / s * (-at / t1).exp() * ((s * hi).exp() - (s * lo).exp())
    }
}

impl TissueModel for SinglePassTissue {
    fn kctissue(&self, ti: f64, kin: &KineticParams) -> f64 {
        assert!(
            !kin.labeling.is_continuous(),
            "single-pass tissue model supports pulsed labeling only"
        );
        let delt = kin.arrival_delay;
        let tau = kin.bolus_duration;
        let tauc = self.residue.capillary_transit();
        if ti <= delt {
            return 0.0;
        }
        let te = ti - delt;

        if te < tauc.min(tau) {
            // Bolus arriving, all label still within its capillary transit.
            return self.early_integral(delt, ti, ti, kin);
        }
        if tauc <= tau {
            if te < tau {
                // Oldest label past its transit while the bolus still arrives.
                self.early_integral(delt, delt + tauc, ti, kin)
                    + self.late_integral(delt + tauc, ti, ti, kin)
            } else if te < tau + tauc {
                // Bolus over; youngest label still within its transit.
                self.early_integral(delt, delt + tauc, ti, kin)
                    + self.late_integral(delt + tauc, delt + tau, ti, kin)
            } else {
                // Everything extracted.
                self.late_integral(delt, delt + tau, ti, kin)
            }
        } else if te < tau + tauc {
            // Bolus shorter than the transit: the whole bolus is in the
            // early regime until the last label finishes its transit.
            self.early_integral(delt, delt + tau, ti, kin)
        } else {
            self.late_integral(delt, delt + tau, ti, kin)
        }
    }

    fn name(&self) -> &'static str {
        "tiss_nodisp_spa"
    }
}

/// Well-mixed tissue curve under a gamma-dispersed AIF. Pulsed labeling only.
///
/// Combines exponentials with two incomplete-gamma evaluations per branch.
/// The denominators `A = T1app - T1b` and `B = A + s*T1app*T1b` and the
/// power base `s - 1/T1app + 1/T1b` can vanish or go negative under
/// adversarial parameter combinations (artefactual voxels); they are floored
/// before use and the fallback is logged at debug level.
///
/// # Panics
///
/// Panics if evaluated with continuous labeling (configuration error).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GammaWellMixedTissue {
    /// Dispersion kernel parameters.
    pub dispersion: GammaDispersion,
}

impl GammaWellMixedTissue {
    /// Tissue model with the given dispersion kernel parameters.
    pub fn new(dispersion: GammaDispersion) -> Self {
        Self { dispersion }
    }
}

impl TissueModel for GammaWellMixedTissue {
    fn kctissue(&self, ti: f64, kin: &KineticParams) -> f64 {
        assert!(
            !kin.labeling.is_continuous(),
            "gamma-dispersed well-mixed tissue model supports pulsed labeling only"
        );
        let delt = kin.arrival_delay;
        let tau = kin.bolus_duration;
        let t1b = kin.t1_blood;
        if ti < delt {
            return 0.0;
        }

        let (s, sp) = self.dispersion.sharpness();
        let p = sp / s;
        let k = 1.0 + sp;
        let t1app = kin.t1_apparent();

        let a = t1app - t1b;
        let mut b = a + s * t1app * t1b;
        if b < MIN_DENOM {
            log::debug!("gamma-dispersed tissue curve: flooring B={b} at {MIN_DENOM}");
            b = MIN_DENOM;
        }
        let pow_base = s - 1.0 / t1app + 1.0 / t1b;
        let c = if pow_base <= 0.0 {
            log::debug!("gamma-dispersed tissue curve: non-positive power base {pow_base}");
            MIN_DENOM
        } else {
            pow_base.powf(p * s)
        };
        let af = floor_denom(a);

        if ti <= delt + tau {
            2.0 / af
                * (-(t1app * delt + (t1app + t1b) * ti) / (t1app * t1b)).exp()
                * t1app
                * t1b
                * b.powf(-k)
                * ((delt / t1app + ti / t1b).exp()
                    * (s * t1app * t1b).powf(k)
                    * (1.0 - gamma_inc_upper_reg(k, b / (t1app * t1b) * (ti - delt)))
                    + (delt / t1b + ti / t1app).exp()
                        * b.powf(k)
                        * (-1.0 + gamma_inc_upper_reg(k, s * (ti - delt))))
        } else {
            2.0 / (af * b)
                * ((-a / (t1app * t1b) * (delt + tau) - ti / t1app).exp() * t1app * t1b / c
                    * (s.powf(k)
                        * t1app
                        * t1b
                        * (-1.0
                            + ((-1.0 / t1app + 1.0 / t1b) * tau).exp()
                                * (1.0 - gamma_inc_upper_reg(k, b / (t1app * t1b) * (ti - delt)))
                            + gamma_inc_upper_reg(k, b / (t1app * t1b) * (ti - delt - tau)))
                        - (-a / (t1app * t1b) * (ti - delt - tau)).exp()
                            * c
                            * b
                            * (gamma_inc_upper_reg(k, s * (ti - delt - tau))
                                - gamma_inc_upper_reg(k, s * (ti - delt)))))
        }
    }

    fn name(&self) -> &'static str {
        "tiss_gammadisp_wellmix"
    }
}
