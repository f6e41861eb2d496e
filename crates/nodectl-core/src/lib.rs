// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Neural ODE Controller Core
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Recurrent controllers driven step by step by a data-collection loop,
//! and the neural ODE controller in particular.
//!
//! # Invariants
//!
//! 1. **Steps are pure**: `step(&self, u)` returns a new controller and
//!    an output. The receiver is never modified, so a controller value
//!    can be stepped twice from the same point with identical results.
//!
//! 2. **State layout is fixed at construction**: a controller whose
//!    sub-networks are all time-invariant carries `x` only; otherwise it
//!    carries `(x, t)`. A state of the other layout is an error.
//!
//! 3. **State is never trained**: `grad_filter_spec()` marks `state` and
//!    `init_state` false and every network parameter true. The
//!    parameter utilities in [`train`] honour this mask.
//!
//! 4. **Dropout is refused up front**: requesting dropout on either
//!    sub-network fails with `ControlError::Config` before any parameter
//!    is allocated.

pub mod controller;
pub mod feedforward;
pub mod postprocess;
pub mod rollout;
pub mod state;
pub mod train;

pub use controller::{Controller, NeuralOdeController, DEFAULT_STEP_SEED};
pub use feedforward::FeedforwardController;
pub use postprocess::{make_postprocess, Postprocess};
pub use rollout::{rollout, rollout_observed, Rollout};
pub use state::ControlState;
pub use train::{gradient_fd, sgd_step, trainable_values, with_trainable_values};
