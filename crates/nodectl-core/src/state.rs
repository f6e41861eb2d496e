// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Controller Recurrent State
// Mirrors: cc/examples/neural_ode_controller.py (state / (state, t))
// ─────────────────────────────────────────────────────────────────────
//! Continuous controller state, with or without elapsed time.
//!
//! Which variant a controller uses is fixed at construction (any
//! time-variant sub-network ⇒ `TimeVariant`). A variant that disagrees
//! with the controller's flag is a `StateInvariant` error, never coerced.

use serde::{Deserialize, Serialize};

use nodectl_types::{Array, ControlError, ControlResult, Leaf, Tree};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlState {
    TimeInvariant(Vec<f64>),
    TimeVariant { x: Vec<f64>, t: f64 },
}

impl ControlState {
    /// Zero state (and t = 0 when `has_time`).
    pub fn zeros(state_dim: usize, has_time: bool) -> Self {
        let x = vec![0.0; state_dim];
        if has_time {
            ControlState::TimeVariant { x, t: 0.0 }
        } else {
            ControlState::TimeInvariant(x)
        }
    }

    pub fn x(&self) -> &[f64] {
        match self {
            ControlState::TimeInvariant(x) => x,
            ControlState::TimeVariant { x, .. } => x,
        }
    }

    pub fn t(&self) -> Option<f64> {
        match self {
            ControlState::TimeInvariant(_) => None,
            ControlState::TimeVariant { t, .. } => Some(*t),
        }
    }

    pub fn has_time(&self) -> bool {
        matches!(self, ControlState::TimeVariant { .. })
    }

    /// `(x, t)`, with an implicit `t = 0` for time-invariant controllers.
    pub fn decompose(&self, has_time: bool) -> ControlResult<(&[f64], f64)> {
        match (self, has_time) {
            (ControlState::TimeVariant { x, t }, true) => Ok((x, *t)),
            (ControlState::TimeInvariant(x), false) => Ok((x, 0.0)),
            (_, expected) => Err(ControlError::StateInvariant(format!(
                "controller expects time-tracking={expected}, state has time-tracking={}",
                self.has_time()
            ))),
        }
    }

    /// Frozen leaves: `x` alone, or `[x, t]`.
    pub fn to_tree(&self) -> Tree<Leaf> {
        match self {
            ControlState::TimeInvariant(x) => Tree::Leaf(Leaf::frozen(Array::vector(x.clone()))),
            ControlState::TimeVariant { x, t } => Tree::Seq(vec![
                Tree::Leaf(Leaf::frozen(Array::vector(x.clone()))),
                Tree::Leaf(Leaf::frozen(Array::scalar(*t))),
            ]),
        }
    }

    /// Inverse of [`ControlState::to_tree`] for a controller of the given layout.
    pub fn from_tree(tree: &Tree<Leaf>, state_dim: usize, has_time: bool) -> ControlResult<Self> {
        let read_x = |leaf: &Leaf| -> ControlResult<Vec<f64>> {
            if leaf.value.size() != state_dim {
                return Err(ControlError::shape("state vector", state_dim, leaf.value.size()));
            }
            Ok(leaf.value.data.clone())
        };
        match (tree, has_time) {
            (Tree::Leaf(x), false) => Ok(ControlState::TimeInvariant(read_x(x)?)),
            (Tree::Seq(items), true) => match items.as_slice() {
                [Tree::Leaf(x), Tree::Leaf(t)] if t.value.size() == 1 => Ok(ControlState::TimeVariant {
                    x: read_x(x)?,
                    t: t.value.data[0],
                }),
                _ => Err(ControlError::StateInvariant(
                    "time-tracking state must be [x, t] with scalar t".to_string(),
                )),
            },
            _ => Err(ControlError::StateInvariant(format!(
                "state tree layout does not match time-tracking={has_time}"
            ))),
        }
    }
}
