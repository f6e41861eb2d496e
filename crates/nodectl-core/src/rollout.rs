// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Closed-Loop Rollout
// Mirrors: cc/env/collect/collect.py
// ─────────────────────────────────────────────────────────────────────
//! Drive a controller over an input sequence.
//!
//! The controller is reset exactly once, before the first step; every
//! later step consumes the controller returned by the previous one.

use nodectl_types::{Array, ControlResult, Tree};

use crate::controller::Controller;

/// Result of a rollout: the final controller and one output per input.
#[derive(Debug, Clone)]
pub struct Rollout<C> {
    pub controller: C,
    pub outputs: Vec<Tree<Array>>,
}

pub fn rollout<C: Controller>(controller: &C, inputs: &[Tree<Array>]) -> ControlResult<Rollout<C>> {
    rollout_observed(controller, inputs, |_, _, _| {})
}

/// [`rollout`] that reports `(step index, controller after the step,
/// output)` to `observer` after every step.
pub fn rollout_observed<C, F>(
    controller: &C,
    inputs: &[Tree<Array>],
    mut observer: F,
) -> ControlResult<Rollout<C>>
where
    C: Controller,
    F: FnMut(usize, &C, &Tree<Array>),
{
    let mut current = controller.reset();
    let mut outputs = Vec::with_capacity(inputs.len());
    for (k, input) in inputs.iter().enumerate() {
        let (next, y) = current.step(input).map_err(|e| {
            log::warn!("rollout: step {k} failed: {e}");
            e
        })?;
        observer(k, &next, &y);
        outputs.push(y);
        current = next;
    }
    log::trace!("rollout: {} steps", outputs.len());
    Ok(Rollout {
        controller: current,
        outputs,
    })
}
