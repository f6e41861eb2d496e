// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Trainable Parameter Utilities
// ─────────────────────────────────────────────────────────────────────
//! Flat views of the trainable leaves of a controller, a central
//! finite-difference gradient over them, and a plain SGD update.
//!
//! Only leaves tagged trainable are ever read or written here, so the
//! recurrent state and the initial state survive every update.

use nodectl_types::{ControlError, ControlResult};

use crate::controller::Controller;

/// Concatenated values of all trainable leaves, in tree order.
pub fn trainable_values<C: Controller>(controller: &C) -> Vec<f64> {
    let tree = controller.parameter_tree();
    let mut out = Vec::new();
    for leaf in tree.leaves().into_iter().filter(|l| l.trainable) {
        out.extend_from_slice(&leaf.value.data);
    }
    out
}

/// Controller with the trainable leaves overwritten from `values`.
/// Frozen leaves are left as they are.
pub fn with_trainable_values<C: Controller>(controller: &C, values: &[f64]) -> ControlResult<C> {
    let mut tree = controller.parameter_tree();
    let mut offset = 0;
    for leaf in tree.leaves_mut().into_iter().filter(|l| l.trainable) {
        let n = leaf.value.data.len();
        let chunk = values.get(offset..offset + n).ok_or_else(|| {
            ControlError::shape("trainable parameter vector", offset + n, values.len())
        })?;
        leaf.value.data.copy_from_slice(chunk);
        offset += n;
    }
    if offset != values.len() {
        return Err(ControlError::shape(
            "trainable parameter vector",
            offset,
            values.len(),
        ));
    }
    controller.load_parameter_tree(&tree)
}

/// Central finite-difference gradient of `loss_fn` with respect to the
/// trainable values: ∂L/∂θᵢ ≈ (L(θ + ε eᵢ) − L(θ − ε eᵢ)) / 2ε.
pub fn gradient_fd<C, L>(controller: &C, mut loss_fn: L, eps: f64) -> ControlResult<Vec<f64>>
where
    C: Controller,
    L: FnMut(&C) -> ControlResult<f64>,
{
    if !(eps.is_finite() && eps > 0.0) {
        return Err(ControlError::Config(format!(
            "finite-difference eps must be finite and > 0, got {eps}"
        )));
    }
    let theta = trainable_values(controller);
    let mut grad = vec![0.0; theta.len()];
    let mut perturbed = theta.clone();

    for i in 0..theta.len() {
        perturbed[i] = theta[i] + eps;
        let loss_plus = loss_fn(&with_trainable_values(controller, &perturbed)?)?;

        perturbed[i] = theta[i] - eps;
        let loss_minus = loss_fn(&with_trainable_values(controller, &perturbed)?)?;

        grad[i] = (loss_plus - loss_minus) / (2.0 * eps);
        perturbed[i] = theta[i];
    }

    if grad.iter().any(|g| !g.is_finite()) {
        return Err(ControlError::Numerical(
            "finite-difference gradient is not finite".to_string(),
        ));
    }
    Ok(grad)
}

/// θ ← θ − lr · grad over the trainable values.
pub fn sgd_step<C: Controller>(controller: &C, grad: &[f64], lr: f64) -> ControlResult<C> {
    let theta = trainable_values(controller);
    if grad.len() != theta.len() {
        return Err(ControlError::shape("gradient", theta.len(), grad.len()));
    }
    let updated: Vec<f64> = theta
        .iter()
        .zip(grad)
        .map(|(p, g)| p - lr * g)
        .collect();
    with_trainable_values(controller, &updated)
}
