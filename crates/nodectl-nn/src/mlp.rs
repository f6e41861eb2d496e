// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Feed-Forward Sub-Networks
// Mirrors: cc/examples/neural_ode_controller.py (f / g MLPs)
// ─────────────────────────────────────────────────────────────────────
//! Multi-layer perceptron used for both the vector field `f` and the
//! output map `g`.
//!
//! Layout (`depth` hidden layers of width `w`):
//!   - depth = 0: Linear(in, out)
//!   - depth = d: Linear(in, w), (d-1) × Linear(w, w), Linear(w, out)
//!
//! The hidden activation follows every hidden layer; the final
//! activation follows the output layer. Weights and biases are drawn
//! uniformly from [-1/√fan_in, 1/√fan_in].

use rand::Rng;
use serde::{Deserialize, Serialize};

use nodectl_types::{
    Activation, Array, ControlError, ControlResult, Leaf, NetworkConfig, PrngKey, Tree,
};

/// Capability set of a controller sub-network.
///
/// `key` is reserved for stochastic layers (dropout) and is ignored by
/// deterministic implementations.
pub trait Network: Send + Sync {
    fn in_dim(&self) -> usize;
    fn out_dim(&self) -> usize;

    fn forward(&self, x: &[f64], key: PrngKey) -> ControlResult<Vec<f64>>;

    /// Parameters as a tree of trainable leaves.
    fn parameter_tree(&self) -> Tree<Leaf>;

    /// Overwrite all parameters from a tree congruent to `parameter_tree()`.
    fn load_parameter_tree(&mut self, tree: &Tree<Leaf>) -> ControlResult<()>;

    /// Internal consistency of the parameter layout. Networks that can
    /// only be built well-formed keep the default.
    fn check_layout(&self) -> ControlResult<()> {
        Ok(())
    }

    fn num_parameters(&self) -> usize {
        self.parameter_tree()
            .leaves()
            .iter()
            .map(|leaf| leaf.value.size())
            .sum()
    }
}

/// Full description of one network, as handed to [`build_network`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub in_dim: usize,
    pub out_dim: usize,
    pub width_size: usize,
    pub depth: usize,
    pub activation: Activation,
    pub final_activation: Activation,
    pub use_bias: bool,
    pub use_dropout: bool,
    pub dropout_rate: f64,
}

impl NetworkSpec {
    pub fn from_config(in_dim: usize, out_dim: usize, cfg: &NetworkConfig) -> Self {
        Self {
            in_dim,
            out_dim,
            width_size: cfg.width_size,
            depth: cfg.depth,
            activation: cfg.activation,
            final_activation: cfg.final_activation,
            use_bias: cfg.use_bias,
            use_dropout: cfg.use_dropout,
            dropout_rate: cfg.dropout_rate,
        }
    }
}

/// Affine layer `y = W x + b`, `W` row-major `out × in`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linear {
    pub in_dim: usize,
    pub out_dim: usize,
    pub weight: Vec<f64>,
    pub bias: Option<Vec<f64>>,
}

impl Linear {
    pub fn init<R: Rng>(in_dim: usize, out_dim: usize, use_bias: bool, rng: &mut R) -> Self {
        let lim = 1.0 / (in_dim.max(1) as f64).sqrt();
        let weight = (0..in_dim * out_dim)
            .map(|_| rng.gen_range(-lim..lim))
            .collect();
        let bias = use_bias.then(|| (0..out_dim).map(|_| rng.gen_range(-lim..lim)).collect());
        Self {
            in_dim,
            out_dim,
            weight,
            bias,
        }
    }

    pub fn forward(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.in_dim);
        let mut y = match &self.bias {
            Some(b) => b.clone(),
            None => vec![0.0; self.out_dim],
        };
        for (row, yi) in self.weight.chunks_exact(self.in_dim.max(1)).zip(y.iter_mut()) {
            *yi += row.iter().zip(x).map(|(w, xi)| w * xi).sum::<f64>();
        }
        y
    }

    /// Weight holds `out × in` entries and the bias, if any, `out`.
    pub fn check_layout(&self) -> ControlResult<()> {
        if self.weight.len() != self.in_dim * self.out_dim {
            return Err(ControlError::shape(
                format!("linear weight {}×{}", self.out_dim, self.in_dim),
                self.in_dim * self.out_dim,
                self.weight.len(),
            ));
        }
        if let Some(b) = &self.bias {
            if b.len() != self.out_dim {
                return Err(ControlError::shape("linear bias", self.out_dim, b.len()));
            }
        }
        Ok(())
    }

    fn parameter_tree(&self) -> Tree<Leaf> {
        let mut entries = vec![(
            "weight",
            Tree::Leaf(Leaf::trainable(Array {
                shape: vec![self.out_dim, self.in_dim],
                data: self.weight.clone(),
            })),
        )];
        if let Some(b) = &self.bias {
            entries.push(("bias", Tree::Leaf(Leaf::trainable(Array::vector(b.clone())))));
        }
        Tree::map_of(entries)
    }

    fn load_parameter_tree(&mut self, tree: &Tree<Leaf>) -> ControlResult<()> {
        let weight = leaf_at(tree, "weight")?;
        copy_checked(&mut self.weight, &weight.value.data, "linear weight")?;
        match (&mut self.bias, tree.get("bias")) {
            (Some(b), Some(Tree::Leaf(leaf))) => copy_checked(b, &leaf.value.data, "linear bias"),
            (None, None) => Ok(()),
            _ => Err(ControlError::Config(
                "bias presence differs between layer and parameter tree".to_string(),
            )),
        }
    }
}

fn leaf_at<'a>(tree: &'a Tree<Leaf>, key: &str) -> ControlResult<&'a Leaf> {
    match tree.get(key) {
        Some(Tree::Leaf(leaf)) => Ok(leaf),
        _ => Err(ControlError::Config(format!(
            "parameter tree has no leaf '{key}'"
        ))),
    }
}

fn copy_checked(dst: &mut [f64], src: &[f64], what: &str) -> ControlResult<()> {
    if dst.len() != src.len() {
        return Err(ControlError::shape(what, dst.len(), src.len()));
    }
    dst.copy_from_slice(src);
    Ok(())
}

/// Multi-layer perceptron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mlp {
    pub layers: Vec<Linear>,
    pub activation: Activation,
    pub final_activation: Activation,
}

impl Mlp {
    fn init<R: Rng>(spec: &NetworkSpec, rng: &mut R) -> Self {
        let mut dims = Vec::with_capacity(spec.depth + 2);
        dims.push(spec.in_dim);
        dims.extend(std::iter::repeat(spec.width_size).take(spec.depth));
        dims.push(spec.out_dim);

        let layers = dims
            .windows(2)
            .map(|w| Linear::init(w[0], w[1], spec.use_bias, rng))
            .collect();
        Self {
            layers,
            activation: spec.activation,
            final_activation: spec.final_activation,
        }
    }

    pub fn depth(&self) -> usize {
        self.layers.len().saturating_sub(1)
    }
}

impl Network for Mlp {
    fn in_dim(&self) -> usize {
        self.layers.first().map_or(0, |l| l.in_dim)
    }

    fn out_dim(&self) -> usize {
        self.layers.last().map_or(0, |l| l.out_dim)
    }

    fn forward(&self, x: &[f64], _key: PrngKey) -> ControlResult<Vec<f64>> {
        if x.len() != self.in_dim() {
            return Err(ControlError::shape("network input", self.in_dim(), x.len()));
        }
        let last = self.layers.len().saturating_sub(1);
        let mut h = x.to_vec();
        for (i, layer) in self.layers.iter().enumerate() {
            let act = if i == last {
                self.final_activation
            } else {
                self.activation
            };
            h = layer.forward(&h);
            h.iter_mut().for_each(|v| *v = act.apply(*v));
        }
        Ok(h)
    }

    fn parameter_tree(&self) -> Tree<Leaf> {
        Tree::Seq(self.layers.iter().map(Linear::parameter_tree).collect())
    }

    fn check_layout(&self) -> ControlResult<()> {
        if self.layers.is_empty() {
            return Err(ControlError::Config("network has no layers".to_string()));
        }
        for (i, layer) in self.layers.iter().enumerate() {
            layer.check_layout()?;
            if let Some(next) = self.layers.get(i + 1) {
                if next.in_dim != layer.out_dim {
                    return Err(ControlError::shape(
                        format!("layer {} input width", i + 1),
                        layer.out_dim,
                        next.in_dim,
                    ));
                }
            }
        }
        Ok(())
    }

    fn load_parameter_tree(&mut self, tree: &Tree<Leaf>) -> ControlResult<()> {
        let items = match tree {
            Tree::Seq(items) => items,
            _ => {
                return Err(ControlError::Config(
                    "network parameter tree must be a sequence of layers".to_string(),
                ))
            }
        };
        if items.len() != self.layers.len() {
            return Err(ControlError::shape(
                "network layer count",
                self.layers.len(),
                items.len(),
            ));
        }
        for (layer, sub) in self.layers.iter_mut().zip(items) {
            layer.load_parameter_tree(sub)?;
        }
        Ok(())
    }
}

/// Allocate and initialise a network from `key`.
///
/// Dropout is rejected before any parameter is drawn.
pub fn build_network(spec: &NetworkSpec, key: PrngKey) -> ControlResult<Mlp> {
    if spec.use_dropout {
        return Err(ControlError::Config(format!(
            "dropout (rate {}) is not implemented",
            spec.dropout_rate
        )));
    }
    if spec.in_dim == 0 || spec.out_dim == 0 {
        return Err(ControlError::Config(format!(
            "network dimensions must be >= 1, got in={} out={}",
            spec.in_dim, spec.out_dim
        )));
    }
    if spec.depth > 0 && spec.width_size == 0 {
        return Err(ControlError::Config(
            "width_size must be >= 1 for a network with hidden layers".to_string(),
        ));
    }
    let mut rng = key.rng();
    let mlp = Mlp::init(spec, &mut rng);
    log::debug!(
        "built MLP {}→{} (depth={}, width={}, params={})",
        spec.in_dim,
        spec.out_dim,
        spec.depth,
        spec.width_size,
        mlp.num_parameters()
    );
    Ok(mlp)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(in_dim: usize, out_dim: usize, depth: usize) -> NetworkSpec {
        NetworkSpec {
            in_dim,
            out_dim,
            width_size: 10,
            depth,
            activation: Activation::Relu,
            final_activation: Activation::Identity,
            use_bias: true,
            use_dropout: false,
            dropout_rate: 0.4,
        }
    }

    #[test]
    fn test_layer_layout_depth_two() {
        let net = build_network(&spec(6, 4, 2), PrngKey::new(0)).unwrap();
        let dims: Vec<(usize, usize)> = net.layers.iter().map(|l| (l.in_dim, l.out_dim)).collect();
        assert_eq!(dims, vec![(6, 10), (10, 10), (10, 4)]);
        assert_eq!(net.depth(), 2);
        assert_eq!(net.num_parameters(), 6 * 10 + 10 + 10 * 10 + 10 + 10 * 4 + 4);
    }

    #[test]
    fn test_depth_zero_is_affine() {
        let net = build_network(&spec(4, 3, 0), PrngKey::new(0)).unwrap();
        assert_eq!(net.layers.len(), 1);
        assert_eq!((net.in_dim(), net.out_dim()), (4, 3));
    }

    #[test]
    fn test_init_within_fan_in_bound() {
        let net = build_network(&spec(16, 3, 1), PrngKey::new(9)).unwrap();
        let lim = 1.0 / 16f64.sqrt();
        let first = &net.layers[0];
        assert!(first.weight.iter().all(|w| w.abs() <= lim));
        assert!(first.bias.as_ref().unwrap().iter().all(|b| b.abs() <= lim));
    }

    #[test]
    fn test_same_key_same_network() {
        let a = build_network(&spec(5, 2, 2), PrngKey::new(3)).unwrap();
        let b = build_network(&spec(5, 2, 2), PrngKey::new(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_keys_differ() {
        let a = build_network(&spec(5, 2, 2), PrngKey::new(3)).unwrap();
        let b = build_network(&spec(5, 2, 2), PrngKey::new(4)).unwrap();
        assert_ne!(a.layers[0].weight, b.layers[0].weight);
    }

    #[test]
    fn test_dropout_rejected() {
        let mut s = spec(5, 2, 2);
        s.use_dropout = true;
        let err = build_network(&s, PrngKey::new(0)).unwrap_err();
        assert!(matches!(err, ControlError::Config(_)));
    }

    #[test]
    fn test_forward_hand_computed() {
        let mut net = build_network(&spec(2, 1, 0), PrngKey::new(0)).unwrap();
        net.layers[0].weight = vec![2.0, -1.0];
        net.layers[0].bias = Some(vec![0.5]);
        let y = net.forward(&[1.0, 3.0], PrngKey::default()).unwrap();
        assert!((y[0] - (2.0 - 3.0 + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_forward_hidden_relu() {
        let mut net = build_network(&spec(1, 1, 1), PrngKey::new(0)).unwrap();
        // width 10 hidden layer; make one unit positive, rest negative
        net.layers[0].weight = (0..10).map(|i| if i == 0 { 1.0 } else { -1.0 }).collect();
        net.layers[0].bias = Some(vec![0.0; 10]);
        net.layers[1].weight = vec![1.0; 10];
        net.layers[1].bias = Some(vec![0.0]);
        let y = net.forward(&[2.0], PrngKey::default()).unwrap();
        assert!((y[0] - 2.0).abs() < 1e-12, "y={}", y[0]);
    }

    #[test]
    fn test_forward_shape_mismatch() {
        let net = build_network(&spec(3, 2, 1), PrngKey::new(0)).unwrap();
        assert!(matches!(
            net.forward(&[0.0; 2], PrngKey::default()),
            Err(ControlError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_no_bias_tree() {
        let mut s = spec(3, 2, 1);
        s.use_bias = false;
        let net = build_network(&s, PrngKey::new(0)).unwrap();
        let tree = net.parameter_tree();
        assert_eq!(tree.num_leaves(), 2);
        assert!(tree.leaves().iter().all(|l| l.trainable));
        let y = net.forward(&[0.0; 3], PrngKey::default()).unwrap();
        assert_eq!(y, vec![0.0, 0.0]);
    }

    #[test]
    fn test_parameter_tree_load_roundtrip() {
        let src = build_network(&spec(4, 2, 2), PrngKey::new(1)).unwrap();
        let mut dst = build_network(&spec(4, 2, 2), PrngKey::new(2)).unwrap();
        dst.load_parameter_tree(&src.parameter_tree()).unwrap();
        assert_eq!(src, dst);
    }

    #[test]
    fn test_built_network_layout_ok() {
        let net = build_network(&spec(4, 2, 2), PrngKey::new(1)).unwrap();
        assert!(net.check_layout().is_ok());
    }

    #[test]
    fn test_truncated_weight_detected() {
        let mut net = build_network(&spec(4, 2, 2), PrngKey::new(1)).unwrap();
        net.layers[1].weight.truncate(5);
        assert!(matches!(
            net.check_layout(),
            Err(ControlError::ShapeMismatch { expected: 100, got: 5, .. })
        ));
    }

    #[test]
    fn test_short_bias_detected() {
        let mut net = build_network(&spec(4, 2, 1), PrngKey::new(1)).unwrap();
        net.layers[0].bias = Some(vec![0.0; 3]);
        assert!(matches!(
            net.check_layout(),
            Err(ControlError::ShapeMismatch { expected: 10, got: 3, .. })
        ));
    }

    #[test]
    fn test_broken_layer_chain_detected() {
        let mut net = build_network(&spec(4, 2, 2), PrngKey::new(1)).unwrap();
        net.layers[2] = Linear::init(7, 2, true, &mut PrngKey::new(5).rng());
        assert!(net.check_layout().is_err());
        net.layers.clear();
        assert!(matches!(net.check_layout(), Err(ControlError::Config(_))));
    }

    #[test]
    fn test_load_rejects_wrong_layout() {
        let src = build_network(&spec(4, 2, 1), PrngKey::new(1)).unwrap();
        let mut dst = build_network(&spec(4, 2, 2), PrngKey::new(2)).unwrap();
        assert!(dst.load_parameter_tree(&src.parameter_tree()).is_err());
    }
}
