// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Fixed-Step ODE Integrator
// ─────────────────────────────────────────────────────────────────────
//! Explicit Runge-Kutta integration of
//!
//!   dx/dt = rhs(t, x)
//!
//! over one control interval. Every scheme is a Butcher tableau driven
//! by the same stage loop, so adding a scheme means adding a tableau.
//! No adaptive step control: the number of right-hand-side evaluations
//! depends only on the configuration, never on the state values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use nodectl_types::{ControlError, ControlResult};

/// Explicit Butcher tableau (strictly lower-triangular `a`).
struct Tableau {
    a: &'static [&'static [f64]],
    b: &'static [f64],
    c: &'static [f64],
}

const EULER: Tableau = Tableau {
    a: &[&[]],
    b: &[1.0],
    c: &[0.0],
};

const MIDPOINT: Tableau = Tableau {
    a: &[&[], &[0.5]],
    b: &[0.0, 1.0],
    c: &[0.0, 0.5],
};

const HEUN: Tableau = Tableau {
    a: &[&[], &[1.0]],
    b: &[0.5, 0.5],
    c: &[0.0, 1.0],
};

const RALSTON: Tableau = Tableau {
    a: &[&[], &[2.0 / 3.0]],
    b: &[0.25, 0.75],
    c: &[0.0, 2.0 / 3.0],
};

const RK4: Tableau = Tableau {
    a: &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
    b: &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
    c: &[0.0, 0.5, 0.5, 1.0],
};

/// Fixed-step integration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IntegrationMethod {
    Euler,
    Midpoint,
    Heun,
    Ralston,
    #[default]
    Rk4,
}

impl IntegrationMethod {
    pub const ALL: [IntegrationMethod; 5] = [
        IntegrationMethod::Euler,
        IntegrationMethod::Midpoint,
        IntegrationMethod::Heun,
        IntegrationMethod::Ralston,
        IntegrationMethod::Rk4,
    ];

    fn tableau(self) -> &'static Tableau {
        match self {
            IntegrationMethod::Euler => &EULER,
            IntegrationMethod::Midpoint => &MIDPOINT,
            IntegrationMethod::Heun => &HEUN,
            IntegrationMethod::Ralston => &RALSTON,
            IntegrationMethod::Rk4 => &RK4,
        }
    }

    /// Right-hand-side evaluations per step.
    pub fn stages(self) -> usize {
        self.tableau().b.len()
    }

    /// Global order of accuracy.
    pub fn order(self) -> u32 {
        match self {
            IntegrationMethod::Euler => 1,
            IntegrationMethod::Midpoint | IntegrationMethod::Heun | IntegrationMethod::Ralston => 2,
            IntegrationMethod::Rk4 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntegrationMethod::Euler => "euler",
            IntegrationMethod::Midpoint => "midpoint",
            IntegrationMethod::Heun => "heun",
            IntegrationMethod::Ralston => "ralston",
            IntegrationMethod::Rk4 => "rk4",
        }
    }
}

impl fmt::Display for IntegrationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for IntegrationMethod {
    type Err = ControlError;

    /// Case-insensitive; `"RK4"` and `"rk4"` are the same scheme.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.name() == wanted)
            .ok_or_else(|| {
                log::warn!("IntegrationMethod: rejected name '{s}'");
                ControlError::Config(format!(
                    "unknown integration method '{s}' (expected one of: euler, midpoint, heun, ralston, rk4)"
                ))
            })
    }
}

/// Advance `x0` from `t0` to `t0 + dt` with a single step of `method`.
///
/// `rhs(t, x)` must return a vector of the same length as `x`.
pub fn integrate<F>(
    mut rhs: F,
    x0: &[f64],
    t0: f64,
    dt: f64,
    method: IntegrationMethod,
) -> ControlResult<Vec<f64>>
where
    F: FnMut(f64, &[f64]) -> ControlResult<Vec<f64>>,
{
    let tab = method.tableau();
    let n = x0.len();
    let mut k: Vec<Vec<f64>> = Vec::with_capacity(tab.b.len());
    let mut x_stage = vec![0.0; n];

    for (s, row) in tab.a.iter().enumerate() {
        x_stage.copy_from_slice(x0);
        for (j, &a_sj) in row.iter().enumerate() {
            if a_sj != 0.0 {
                for (xi, kj) in x_stage.iter_mut().zip(&k[j]) {
                    *xi += dt * a_sj * kj;
                }
            }
        }
        let k_s = rhs(t0 + tab.c[s] * dt, &x_stage)?;
        if k_s.len() != n {
            return Err(ControlError::shape("integrator right-hand side", n, k_s.len()));
        }
        k.push(k_s);
    }

    let mut x1 = x0.to_vec();
    for (&b_s, k_s) in tab.b.iter().zip(&k) {
        if b_s != 0.0 {
            for (xi, ki) in x1.iter_mut().zip(k_s) {
                *xi += dt * b_s * ki;
            }
        }
    }
    Ok(x1)
}

/// [`integrate`] with the scheme selected by name.
pub fn integrate_by_name<F>(
    rhs: F,
    x0: &[f64],
    t0: f64,
    dt: f64,
    method_name: &str,
) -> ControlResult<Vec<f64>>
where
    F: FnMut(f64, &[f64]) -> ControlResult<Vec<f64>>,
{
    let method: IntegrationMethod = method_name.parse()?;
    integrate(rhs, x0, t0, dt, method)
}

/// Integrator over a fixed control interval, optionally subdivided
/// into `substeps` equal steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Integrator {
    method: IntegrationMethod,
    substeps: usize,
}

impl Integrator {
    pub fn new(method: IntegrationMethod, substeps: usize) -> ControlResult<Self> {
        if substeps < 1 {
            return Err(ControlError::Config(format!(
                "substeps must be >= 1, got {substeps}"
            )));
        }
        Ok(Self { method, substeps })
    }

    pub fn from_name(method_name: &str, substeps: usize) -> ControlResult<Self> {
        Self::new(method_name.parse()?, substeps)
    }

    pub fn method(&self) -> IntegrationMethod {
        self.method
    }

    pub fn substeps(&self) -> usize {
        self.substeps
    }

    /// Advance over one interval `[t0, t0 + dt]`.
    pub fn step<F>(&self, mut rhs: F, x0: &[f64], t0: f64, dt: f64) -> ControlResult<Vec<f64>>
    where
        F: FnMut(f64, &[f64]) -> ControlResult<Vec<f64>>,
    {
        match self.substeps {
            // reachable through deserialisation
            0 => {
                return Err(ControlError::Config(
                    "integrator has zero substeps".to_string(),
                ))
            }
            1 => return integrate(rhs, x0, t0, dt, self.method),
            _ => {}
        }
        let h = dt / self.substeps as f64;
        let mut x = x0.to_vec();
        for i in 0..self.substeps {
            x = integrate(&mut rhs, &x, t0 + i as f64 * h, h, self.method)?;
        }
        Ok(x)
    }

    /// Run `n_intervals` consecutive intervals; returns the final state.
    pub fn run<F>(
        &self,
        mut rhs: F,
        x0: &[f64],
        t0: f64,
        dt: f64,
        n_intervals: usize,
    ) -> ControlResult<Vec<f64>>
    where
        F: FnMut(f64, &[f64]) -> ControlResult<Vec<f64>>,
    {
        let mut x = x0.to_vec();
        for i in 0..n_intervals {
            x = self.step(&mut rhs, &x, t0 + i as f64 * dt, dt)?;
        }
        Ok(x)
    }
}

impl Default for Integrator {
    fn default() -> Self {
        Self {
            method: IntegrationMethod::Rk4,
            substeps: 1,
        }
    }
}
