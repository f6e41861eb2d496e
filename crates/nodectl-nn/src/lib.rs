// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Controller Sub-Networks
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Feed-forward networks for the vector field `f` and output map `g`.

pub mod mlp;

pub use mlp::{build_network, Linear, Mlp, Network, NetworkSpec};
