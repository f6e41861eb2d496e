// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Neural ODE Controller Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy for the
//! neural ODE controller kernel.
//!
//! Everything that crosses a crate boundary lives here: the structured
//! value trees controllers consume and emit, the shape descriptors used
//! to size networks, the splittable PRNG key, and `ControlError`.

pub mod config;
pub mod error;
pub mod key;
pub mod spec;
pub mod tree;

pub use config::{Activation, ControllerConfig, NetworkConfig};
pub use error::{ControlError, ControlResult};
pub use key::PrngKey;
pub use spec::{
    batch_concat, flat_width, sample_from_tree_of_specs, spec_from_example, ArraySpec, Bounds,
};
pub use tree::{Array, Leaf, Tree};
