// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Neural ODE Integrator
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Fixed-step explicit Runge-Kutta integration used by the controller
//! to advance its continuous state across one control interval.

pub mod integrate;

pub use integrate::{integrate, integrate_by_name, IntegrationMethod, Integrator};
