// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Neural ODE Controller
// Mirrors: cc/examples/neural_ode_controller.py
// ─────────────────────────────────────────────────────────────────────
//! Controller whose control law is a learned vector field integrated
//! over each control interval:
//!
//!   dx/dt   = f(x, [t], u)
//!   x_{k+1} = integrate(f, x_k, t_k, Δt)
//!   y_{k+1} = postprocess(g(x_{k+1}, [t_k], [u]))
//!
//! `step` is a pure transition `(controller, u) → (controller', y)`:
//! the input controller is never modified, the networks are shared by
//! `Arc` between successive values, and `init_state` is carried along
//! untouched until `reset`.

use std::sync::Arc;

use nodectl_integrate::Integrator;
use nodectl_nn::{build_network, Mlp, Network, NetworkSpec};
use nodectl_types::{
    batch_concat, flat_width, Array, ArraySpec, ControlError, ControlResult, ControllerConfig,
    Leaf, PrngKey, Tree,
};

use crate::postprocess::Postprocess;
use crate::state::ControlState;

/// Seed of the key `step` uses when none is threaded through.
pub const DEFAULT_STEP_SEED: u64 = 1;

/// A stateful policy driven by a data-collection loop.
///
/// Callers `reset` once, then always feed the controller returned by
/// the previous `step` into the next one.
pub trait Controller: Clone + Send + Sync {
    /// Controller with its recurrent state restored to the initial state.
    fn reset(&self) -> Self;

    /// One control step.
    fn step(&self, input: &Tree<Array>) -> ControlResult<(Self, Tree<Array>)>;

    /// All numeric leaves (parameters and state), tagged with trainability.
    fn parameter_tree(&self) -> Tree<Leaf>;

    /// New controller with every leaf replaced from `tree`.
    fn load_parameter_tree(&self, tree: &Tree<Leaf>) -> ControlResult<Self>;

    /// Which leaves gradient-based optimisation may update. Every leaf
    /// by default.
    fn grad_filter_spec(&self) -> Tree<bool> {
        self.parameter_tree().map(|_| true)
    }
}

/// Static wiring shared by every value of one controller lineage.
#[derive(Debug, Clone)]
struct Wiring {
    control_timestep: f64,
    state_dim: usize,
    input_dim: usize,
    f_time_variant: bool,
    g_time_variant: bool,
    feedthrough: bool,
    has_time_state: bool,
    integrator: Integrator,
    input_specs: Tree<ArraySpec>,
    postprocess: Postprocess,
}

/// Neural ODE controller over sub-networks of type `N`.
#[derive(Debug, Clone)]
pub struct NeuralOdeController<N = Mlp> {
    f: Arc<N>,
    g: Arc<N>,
    state: ControlState,
    init_state: ControlState,
    wiring: Arc<Wiring>,
}

impl NeuralOdeController<Mlp> {
    /// Build `f` and `g` from `config.seed` and wire them up.
    ///
    /// The configuration (dropout first) is validated before any network
    /// parameter is allocated.
    pub fn new(
        input_specs: &Tree<ArraySpec>,
        output_specs: &Tree<ArraySpec>,
        config: &ControllerConfig,
    ) -> ControlResult<Self> {
        config.validate()?;
        let (f_spec, g_spec) = network_specs(input_specs, output_specs, config)?;

        let (f_key, g_key) = PrngKey::new(config.seed).split();
        let f = build_network(&f_spec, f_key)?;
        let g = build_network(&g_spec, g_key)?;

        Self::with_networks(f, g, input_specs, output_specs, config)
    }
}

impl<N: Network + Clone> NeuralOdeController<N> {
    /// Wire pre-built sub-networks. Their widths must match what the
    /// specs and configuration imply.
    pub fn with_networks(
        f: N,
        g: N,
        input_specs: &Tree<ArraySpec>,
        output_specs: &Tree<ArraySpec>,
        config: &ControllerConfig,
    ) -> ControlResult<Self> {
        config.validate()?;
        let integrator = Integrator::from_name(&config.integrate_method, config.integrate_substeps)?;
        let (f_spec, g_spec) = network_specs(input_specs, output_specs, config)?;

        check_dims("f", &f, &f_spec)?;
        check_dims("g", &g, &g_spec)?;

        let has_time_state = config.has_time_state();
        let init_state = ControlState::zeros(config.state_dim, has_time_state);

        log::debug!(
            "NeuralOdeController: state_dim={}, u_dim={}, y_dim={}, f {}→{}, g {}→{}, time_state={}, feedthrough={}, integrator={}x{}",
            config.state_dim,
            flat_width(input_specs),
            g_spec.out_dim,
            f_spec.in_dim,
            f_spec.out_dim,
            g_spec.in_dim,
            g_spec.out_dim,
            has_time_state,
            config.feedthrough,
            integrator.method(),
            integrator.substeps(),
        );

        let wiring = Wiring {
            control_timestep: config.control_timestep,
            state_dim: config.state_dim,
            input_dim: flat_width(input_specs),
            f_time_variant: !config.f.time_invariant,
            g_time_variant: !config.g.time_invariant,
            feedthrough: config.feedthrough,
            has_time_state,
            integrator,
            input_specs: input_specs.clone(),
            postprocess: Postprocess::from_specs(output_specs),
        };

        Ok(Self {
            f: Arc::new(f),
            g: Arc::new(g),
            state: init_state.clone(),
            init_state,
            wiring: Arc::new(wiring),
        })
    }

    /// One control step with an explicitly threaded key.
    ///
    /// The key is split once for `f` and once for `g`.
    pub fn step_with_key(
        &self,
        input: &Tree<Array>,
        key: PrngKey,
    ) -> ControlResult<(Self, Tree<Array>)> {
        let w = &*self.wiring;
        w.input_specs.conforms(input)?;
        let u = batch_concat(input);

        let (x, t) = self.state.decompose(w.has_time_state)?;

        let (key, f_key) = key.split();
        let f = &*self.f;
        let f_time = w.f_time_variant;
        // concat(x, [t], u)
        let mut f_in = Vec::with_capacity(f.in_dim());
        let rhs = |t: f64, x: &[f64]| {
            f_in.clear();
            f_in.extend_from_slice(x);
            if f_time {
                f_in.push(t);
            }
            f_in.extend_from_slice(&u);
            f.forward(&f_in, f_key)
        };
        let x_next = w.integrator.step(rhs, x, t, w.control_timestep)?;
        if !x_next.iter().all(|v| v.is_finite()) {
            log::error!("NeuralOdeController: non-finite state after integration: {x_next:?}");
            return Err(ControlError::Numerical(
                "integration produced NaN or Inf state".to_string(),
            ));
        }

        let (_, g_key) = key.split();
        // concat(x_next, [t], [u])
        let mut g_in = Vec::with_capacity(self.g.in_dim());
        g_in.extend_from_slice(&x_next);
        if w.g_time_variant {
            g_in.push(t);
        }
        if w.feedthrough {
            g_in.extend_from_slice(&u);
        }
        let y = self.g.forward(&g_in, g_key)?;
        let output = w.postprocess.apply(&y)?;

        let state = if w.has_time_state {
            ControlState::TimeVariant {
                x: x_next,
                t: t + w.control_timestep,
            }
        } else {
            ControlState::TimeInvariant(x_next)
        };

        Ok((
            Self {
                f: Arc::clone(&self.f),
                g: Arc::clone(&self.g),
                state,
                init_state: self.init_state.clone(),
                wiring: Arc::clone(&self.wiring),
            },
            output,
        ))
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    pub fn init_state(&self) -> &ControlState {
        &self.init_state
    }

    pub fn f(&self) -> &N {
        &self.f
    }

    pub fn g(&self) -> &N {
        &self.g
    }

    pub fn state_dim(&self) -> usize {
        self.wiring.state_dim
    }

    pub fn input_dim(&self) -> usize {
        self.wiring.input_dim
    }

    pub fn output_dim(&self) -> usize {
        self.wiring.postprocess.width()
    }

    pub fn control_timestep(&self) -> f64 {
        self.wiring.control_timestep
    }

    pub fn has_time_state(&self) -> bool {
        self.wiring.has_time_state
    }

    pub fn integrator(&self) -> Integrator {
        self.wiring.integrator
    }
}

impl<N: Network + Clone> Controller for NeuralOdeController<N> {
    fn reset(&self) -> Self {
        Self {
            state: self.init_state.clone(),
            ..self.clone()
        }
    }

    /// Uses a fixed key; see [`NeuralOdeController::step_with_key`] to
    /// thread one per step.
    fn step(&self, input: &Tree<Array>) -> ControlResult<(Self, Tree<Array>)> {
        self.step_with_key(input, PrngKey::new(DEFAULT_STEP_SEED))
    }

    fn parameter_tree(&self) -> Tree<Leaf> {
        Tree::map_of([
            ("f", self.f.parameter_tree()),
            ("g", self.g.parameter_tree()),
            ("state", self.state.to_tree()),
            ("init_state", self.init_state.to_tree()),
        ])
    }

    fn load_parameter_tree(&self, tree: &Tree<Leaf>) -> ControlResult<Self> {
        let sub = |key: &str| {
            tree.get(key).ok_or_else(|| {
                ControlError::Config(format!("controller parameter tree has no '{key}' entry"))
            })
        };
        let w = &*self.wiring;
        let mut next = self.clone();
        Arc::make_mut(&mut next.f).load_parameter_tree(sub("f")?)?;
        Arc::make_mut(&mut next.g).load_parameter_tree(sub("g")?)?;
        next.state = ControlState::from_tree(sub("state")?, w.state_dim, w.has_time_state)?;
        next.init_state = ControlState::from_tree(sub("init_state")?, w.state_dim, w.has_time_state)?;
        Ok(next)
    }

    /// `state` and `init_state` are excluded; network parameters are
    /// included.
    fn grad_filter_spec(&self) -> Tree<bool> {
        self.parameter_tree().trainable_mask()
    }
}

/// Network shapes implied by the specs and configuration.
fn network_specs(
    input_specs: &Tree<ArraySpec>,
    output_specs: &Tree<ArraySpec>,
    config: &ControllerConfig,
) -> ControlResult<(NetworkSpec, NetworkSpec)> {
    let input_dim = flat_width(input_specs);
    let output_dim = flat_width(output_specs);
    if output_dim == 0 {
        return Err(ControlError::Config(
            "output spec flattens to zero width".to_string(),
        ));
    }

    let mut f_in = config.state_dim + input_dim;
    if !config.f.time_invariant {
        f_in += 1;
    }
    let mut g_in = config.state_dim;
    if !config.g.time_invariant {
        g_in += 1;
    }
    if config.feedthrough {
        g_in += input_dim;
    }

    Ok((
        NetworkSpec::from_config(f_in, config.state_dim, &config.f),
        NetworkSpec::from_config(g_in, output_dim, &config.g),
    ))
}

fn check_dims<N: Network>(which: &str, net: &N, spec: &NetworkSpec) -> ControlResult<()> {
    net.check_layout().map_err(|e| {
        log::warn!("NeuralOdeController: malformed {which} network: {e}");
        e
    })?;
    if net.in_dim() != spec.in_dim {
        return Err(ControlError::shape(
            format!("{which} input width"),
            spec.in_dim,
            net.in_dim(),
        ));
    }
    if net.out_dim() != spec.out_dim {
        return Err(ControlError::shape(
            format!("{which} output width"),
            spec.out_dim,
            net.out_dim(),
        ));
    }
    Ok(())
}
