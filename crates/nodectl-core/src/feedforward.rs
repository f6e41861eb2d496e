// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Feedforward (Open-Loop) Controller
// Mirrors: cc/env/collect/collect.py (feedforward controller)
// ─────────────────────────────────────────────────────────────────────
//! Replays a fixed sequence of outputs, ignoring its input.
//!
//! Past the end of the sequence the last output is held. The outputs
//! themselves are the trainable parameters.

use std::sync::Arc;

use nodectl_types::{Array, ControlError, ControlResult, Leaf, Tree};

use crate::controller::Controller;

#[derive(Debug, Clone)]
pub struct FeedforwardController {
    us: Arc<Vec<Tree<Array>>>,
    cursor: usize,
}

impl FeedforwardController {
    /// All entries must share one tree structure.
    pub fn new(us: Vec<Tree<Array>>) -> ControlResult<Self> {
        let first = us.first().ok_or_else(|| {
            ControlError::Config("feedforward controller needs at least one output".to_string())
        })?;
        for (i, u) in us.iter().enumerate().skip(1) {
            first
                .zip(u, |a, b| {
                    if a.shape == b.shape {
                        Ok(())
                    } else {
                        Err(ControlError::shape(
                            format!("feedforward output {i}"),
                            a.size(),
                            b.size(),
                        ))
                    }
                })
                .map_err(|e| {
                    log::warn!("FeedforwardController: output {i} rejected: {e}");
                    e
                })?;
        }
        Ok(Self {
            us: Arc::new(us),
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.us.len()
    }

    pub fn is_empty(&self) -> bool {
        self.us.is_empty()
    }

    /// Number of steps taken since the last reset.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl Controller for FeedforwardController {
    fn reset(&self) -> Self {
        Self {
            us: Arc::clone(&self.us),
            cursor: 0,
        }
    }

    fn step(&self, _input: &Tree<Array>) -> ControlResult<(Self, Tree<Array>)> {
        let idx = self.cursor.min(self.us.len() - 1);
        let out = self.us[idx].clone();
        Ok((
            Self {
                us: Arc::clone(&self.us),
                cursor: self.cursor + 1,
            },
            out,
        ))
    }

    fn parameter_tree(&self) -> Tree<Leaf> {
        Tree::map_of([(
            "us",
            Tree::Seq(
                self.us
                    .iter()
                    .map(|u| u.map(|a| Leaf::trainable(a.clone())))
                    .collect(),
            ),
        )])
    }

    fn load_parameter_tree(&self, tree: &Tree<Leaf>) -> ControlResult<Self> {
        let items = match tree.get("us") {
            Some(Tree::Seq(items)) => items,
            _ => {
                return Err(ControlError::Config(
                    "feedforward parameter tree must be {\"us\": [...]}".to_string(),
                ))
            }
        };
        if items.len() != self.us.len() {
            return Err(ControlError::shape(
                "feedforward output count",
                self.us.len(),
                items.len(),
            ));
        }
        let us = self
            .us
            .iter()
            .zip(items)
            .map(|(old, new)| {
                old.zip(new, |a, leaf| {
                    if a.shape != leaf.value.shape {
                        return Err(ControlError::shape(
                            "feedforward output",
                            a.size(),
                            leaf.value.size(),
                        ));
                    }
                    Ok(leaf.value.clone())
                })
            })
            .collect::<ControlResult<Vec<_>>>()?;
        Ok(Self {
            us: Arc::new(us),
            cursor: self.cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out(v: f64) -> Tree<Array> {
        Tree::Leaf(Array::vector(vec![v, -v]))
    }

    fn ignored() -> Tree<Array> {
        Tree::Leaf(Array::scalar(123.0))
    }

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            FeedforwardController::new(vec![]),
            Err(ControlError::Config(_))
        ));
    }

    #[test]
    fn test_mismatched_entries_rejected() {
        let err = FeedforwardController::new(vec![out(1.0), Tree::Leaf(Array::scalar(1.0))])
            .unwrap_err();
        assert!(matches!(err, ControlError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_replays_then_holds_last() {
        let c = FeedforwardController::new(vec![out(1.0), out(2.0), out(3.0)])
            .unwrap()
            .reset();
        let mut c = c;
        let mut seen = Vec::new();
        for _ in 0..5 {
            let (next, y) = c.step(&ignored()).unwrap();
            seen.push(y.leaves()[0].data[0]);
            c = next;
        }
        assert_eq!(seen, vec![1.0, 2.0, 3.0, 3.0, 3.0]);
        assert_eq!(c.cursor(), 5);
        assert_eq!(c.reset().cursor(), 0);
    }

    #[test]
    fn test_all_leaves_trainable() {
        let c = FeedforwardController::new(vec![out(1.0), out(2.0)]).unwrap();
        let mask = c.grad_filter_spec();
        assert_eq!(mask.num_leaves(), 2);
        assert!(mask.leaves().iter().all(|m| **m));
    }

    #[test]
    fn test_load_parameter_tree() {
        let c = FeedforwardController::new(vec![out(1.0), out(2.0)]).unwrap();
        let mut tree = c.parameter_tree();
        for leaf in tree.leaves_mut() {
            leaf.value.data.iter_mut().for_each(|v| *v *= 10.0);
        }
        let updated = c.load_parameter_tree(&tree).unwrap();
        let (_, y) = updated.step(&ignored()).unwrap();
        assert_eq!(y.leaves()[0].data, vec![10.0, -10.0]);
        // original untouched
        let (_, y) = c.step(&ignored()).unwrap();
        assert_eq!(y.leaves()[0].data, vec![1.0, -1.0]);
    }
}
