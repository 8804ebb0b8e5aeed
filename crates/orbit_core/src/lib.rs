//! The `orbit_core` crate is an evolution engine for discrete-time
//! dynamical systems: bind a state vector to an update rule, then step it,
//! evolve it, or collect its trajectory.
//!
//! Key components:
//! - **Traits**: `Scalar` (numeric type abstraction), the update-rule traits
//!   (`MapRule`, `ScalarRule`, `InPlaceRule`), and `DiscreteSystem` (the
//!   single-step contract shared by the three variants).
//! - **Systems**: `DiscreteMap` (small fixed dimension), `ScalarMap`
//!   (one-dimensional), `BigDiscreteMap` (large, in-place stepping).
//! - **Engine**: `evolve`, `evolve_in_place`, and `trajectory`.
//! - **Autodiff**: Dual number implementation and the adapter that
//!   synthesizes Jacobians for rules supplied without one.

pub mod autodiff;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod system;
pub mod traits;
