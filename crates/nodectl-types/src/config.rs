// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Neural ODE Controller Configuration
// Mirrors: cc/examples/neural_ode_controller.py (make_neural_ode_controller kwargs)
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// Element-wise activation applied between (and after) network layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Identity,
    Relu,
    Tanh,
    Sigmoid,
    Softplus,
    Elu,
}

impl Activation {
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Identity => x,
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Softplus => {
                // log(1 + exp(x)) with overflow protection
                if x > 20.0 {
                    x
                } else if x < -20.0 {
                    x.exp()
                } else {
                    x.exp().ln_1p()
                }
            }
            Activation::Elu => {
                if x > 0.0 {
                    x
                } else {
                    x.exp_m1()
                }
            }
        }
    }
}

/// Configuration of one sub-network (`f` or `g`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Add a bias vector to every layer.
    pub use_bias: bool,
    /// When false, elapsed time is appended to the network input.
    pub time_invariant: bool,
    /// Declared but not implemented; `validate` rejects `true`.
    pub use_dropout: bool,
    pub dropout_rate: f64,
    /// Hidden layer width.
    pub width_size: usize,
    /// Number of hidden layers; 0 means a single affine map.
    pub depth: usize,
    pub activation: Activation,
    pub final_activation: Activation,
}

impl NetworkConfig {
    /// Default vector-field network: two hidden relu layers of width 10.
    pub fn vector_field() -> Self {
        Self {
            use_bias: true,
            time_invariant: true,
            use_dropout: false,
            dropout_rate: 0.4,
            width_size: 10,
            depth: 2,
            activation: Activation::Relu,
            final_activation: Activation::Identity,
        }
    }

    /// Default output network: a single affine map.
    pub fn output_map() -> Self {
        Self {
            depth: 0,
            ..Self::vector_field()
        }
    }

    fn validate(&self, which: &str) -> ControlResult<()> {
        if self.use_dropout {
            return Err(ControlError::Config(format!(
                "{which}: dropout is not implemented"
            )));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(ControlError::Config(format!(
                "{which}: dropout_rate must be in [0, 1), got {}",
                self.dropout_rate
            )));
        }
        if self.depth > 0 && self.width_size == 0 {
            return Err(ControlError::Config(format!(
                "{which}: width_size must be >= 1 when depth = {}",
                self.depth
            )));
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::vector_field()
    }
}

/// Construction-time configuration of a neural ODE controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Duration of one control interval.
    /// Default: 0.1.
    pub control_timestep: f64,

    /// Width of the continuous state x.
    /// Default: 4.
    pub state_dim: usize,

    /// Seed of the initialisation key; split into independent `f` / `g` keys.
    /// Default: 1.
    pub seed: u64,

    /// Integration scheme name (`euler`, `midpoint`, `heun`, `ralston`, `rk4`).
    /// Default: "RK4".
    pub integrate_method: String,

    /// Equal sub-steps per control interval.
    /// Default: 1.
    pub integrate_substeps: usize,

    /// Vector-field network `f`.
    pub f: NetworkConfig,

    /// Output network `g`.
    pub g: NetworkConfig,

    /// Feed the external input directly into `g` as well.
    /// Default: false.
    pub feedthrough: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            control_timestep: 0.1,
            state_dim: 4,
            seed: 1,
            integrate_method: "RK4".to_string(),
            integrate_substeps: 1,
            f: NetworkConfig::vector_field(),
            g: NetworkConfig::output_map(),
            feedthrough: false,
        }
    }
}

impl ControllerConfig {
    /// True when the state carries an elapsed-time component.
    pub fn has_time_state(&self) -> bool {
        !self.f.time_invariant || !self.g.time_invariant
    }

    /// Validate configuration parameters.
    ///
    /// Dropout is checked first so that a dropout request fails before
    /// anything else is looked at.
    pub fn validate(&self) -> ControlResult<()> {
        self.f.validate("f")?;
        self.g.validate("g")?;
        if !(self.control_timestep.is_finite() && self.control_timestep > 0.0) {
            return Err(ControlError::Config(format!(
                "control_timestep must be finite and > 0, got {}",
                self.control_timestep
            )));
        }
        if self.state_dim < 1 {
            return Err(ControlError::Config(format!(
                "state_dim must be >= 1, got {}",
                self.state_dim
            )));
        }
        if self.integrate_substeps < 1 {
            return Err(ControlError::Config(format!(
                "integrate_substeps must be >= 1, got {}",
                self.integrate_substeps
            )));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> ControlResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| ControlError::Config(format!("JSON parse error: {e}")))
    }

    pub fn to_json(&self) -> ControlResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ControlError::Config(format!("JSON encode error: {e}")))
    }
}
