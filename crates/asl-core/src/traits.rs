//! Model traits for ASL kinetic-curve evaluation
//!
//! These traits are the seam between this evaluation core and the external
//! fitting engine: the engine selects one implementation per capability and
//! calls it once per requested time point. Evaluation is a pure function of
//! its inputs — no `Result` on the hot path, no shared mutable state — so
//! every model is safely callable from independent threads.

use std::time::Duration;

use crate::types::KineticParams;

/// Arterial input function: normalized label content of the feeding vessel.
pub trait AifModel: Send + Sync {
    /// Normalized arterial kinetic curve at time `ti`.
    fn kcblood(&self, ti: f64, kinetics: &KineticParams) -> f64;

    /// Model name, for diagnostics.
    fn name(&self) -> &'static str;
}

/// Residue function: fraction of label remaining locally at elapsed time
/// after entry into the voxel.
pub trait ResidueModel: Send + Sync {
    /// Fractional label residue at elapsed time `ti` after entry.
    fn resid(&self, ti: f64, kinetics: &KineticParams) -> f64;

    /// Model name, for diagnostics.
    fn name(&self) -> &'static str;
}

/// Observable tissue kinetic curve, the quantity the fitting engine compares
/// against acquired data.
pub trait TissueModel: Send + Sync {
    /// Tissue kinetic curve at time `ti`.
    fn kctissue(&self, ti: f64, kinetics: &KineticParams) -> f64;

    /// Model name, for diagnostics.
    fn name(&self) -> &'static str;
}

/// Optional timing hook for per-call instrumentation.
///
/// Cross-cutting observability only: implementations must not influence the
/// computed values, and no model requires a timer to function.
pub trait EvalTimer: Send + Sync {
    /// Record one model evaluation of duration `elapsed`.
    fn record(&self, model: &'static str, elapsed: Duration);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Labeling;

    struct FlatAif;

    impl AifModel for FlatAif {
        fn kcblood(&self, _ti: f64, _kinetics: &KineticParams) -> f64 {
            1.0
        }

        fn name(&self) -> &'static str {
            "flat"
        }
    }

    #[test]
    fn test_trait_object_dispatch() {
        let aif: &dyn AifModel = &FlatAif;
        let kin = KineticParams::new(0.5, 1.0, 1.3, 1.6, 0.01, 0.9, Labeling::Pulsed).unwrap();
        assert_eq!(aif.kcblood(0.0, &kin), 1.0);
        assert_eq!(aif.name(), "flat");
    }
}
