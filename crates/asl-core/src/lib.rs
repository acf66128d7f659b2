//! # asl-core
//!
//! Core types for Arterial Spin Labelling (ASL) kinetic-curve evaluation:
//!
//! - [`Error`] / [`Result`] — validation and computation errors
//! - [`KineticParams`] — per-call physiological scalars
//! - model traits ([`AifModel`](traits::AifModel),
//!   [`ResidueModel`](traits::ResidueModel),
//!   [`TissueModel`](traits::TissueModel))
//!
//! ## Architecture
//!
//! Model implementations live in `asl-kinetics`; the external fitting engine
//! depends only on the traits defined here. Evaluation is pure and
//! infallible — all validation happens at construction time.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::{KineticParams, Labeling};
