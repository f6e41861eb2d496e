// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Array Specs and Sampling
// Mirrors: cc/utils/sample_from_spec.py
// ─────────────────────────────────────────────────────────────────────
//! Shape descriptors for controller inputs and outputs.
//!
//! Specs size the sub-networks at construction time and validate
//! inputs at step time. Sampling from a spec produces example values
//! for smoke tests and excitation signals.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};
use crate::tree::{Array, Tree};

/// Half-width of the sampling range for unbounded specs.
pub const UNBOUNDED_SAMPLE_RANGE: f64 = 1e5;

/// Inclusive lower / exclusive upper bounds of an array. Each side holds
/// either a single value applied to every element or one value per
/// element. Infinite sides are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub minimum: Vec<f64>,
    pub maximum: Vec<f64>,
}

impl Bounds {
    /// A missing entry leaves that side open.
    fn side(values: &[f64], i: usize, open: f64) -> f64 {
        match values {
            [v] => *v,
            _ => values.get(i).copied().unwrap_or(open),
        }
    }

    /// `(minimum, maximum)` of element `i`.
    pub fn at(&self, i: usize) -> (f64, f64) {
        (
            Self::side(&self.minimum, i, f64::NEG_INFINITY),
            Self::side(&self.maximum, i, f64::INFINITY),
        )
    }
}

/// Finite interval to draw element samples from.
///
/// Open or overflowing bounds are replaced by a window of width
/// `2 * UNBOUNDED_SAMPLE_RANGE` anchored at the finite side, or by
/// ±`UNBOUNDED_SAMPLE_RANGE` when no usable side exists.
fn sample_interval(lo: f64, hi: f64) -> (f64, f64) {
    let r = UNBOUNDED_SAMPLE_RANGE;
    match (lo.is_finite(), hi.is_finite()) {
        (true, true) if (hi - lo).is_finite() => (lo, hi),
        (true, false) => (lo, lo + 2.0 * r),
        (false, true) => (hi - 2.0 * r, hi),
        _ => (-r, r),
    }
}

/// Shape (and optional bounds) of one array leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArraySpec {
    pub name: String,
    pub shape: Vec<usize>,
    #[serde(default)]
    pub bounds: Option<Bounds>,
}

impl ArraySpec {
    pub fn new(name: impl Into<String>, shape: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            shape,
            bounds: None,
        }
    }

    /// Same `[minimum, maximum)` for every element.
    pub fn bounded(name: impl Into<String>, shape: Vec<usize>, minimum: f64, maximum: f64) -> Self {
        Self {
            name: name.into(),
            shape,
            bounds: Some(Bounds {
                minimum: vec![minimum],
                maximum: vec![maximum],
            }),
        }
    }

    /// Per-element bounds. Each side has length 1 or the spec's size;
    /// NaN bounds are rejected.
    pub fn bounded_elementwise(
        name: impl Into<String>,
        shape: Vec<usize>,
        minimum: Vec<f64>,
        maximum: Vec<f64>,
    ) -> ControlResult<Self> {
        let name = name.into();
        let size: usize = shape.iter().product();
        for (side, values) in [("minimum", &minimum), ("maximum", &maximum)] {
            if values.len() != 1 && values.len() != size {
                return Err(ControlError::shape(
                    format!("'{name}' {side} bounds"),
                    size,
                    values.len(),
                ));
            }
            if values.iter().any(|v| v.is_nan()) {
                return Err(ControlError::Config(format!(
                    "'{name}' {side} bounds contain NaN"
                )));
            }
        }
        Ok(Self {
            name,
            shape,
            bounds: Some(Bounds { minimum, maximum }),
        })
    }

    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn zeros(&self) -> Array {
        Array::zeros(&self.shape)
    }

    /// Uniform sample: within `bounds`, else within ±1e5. Never panics on
    /// infinite or overflowing bounds; see [`sample_interval`].
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Array {
        let r = UNBOUNDED_SAMPLE_RANGE;
        let mut degenerate = false;
        let data = (0..self.size())
            .map(|i| {
                let (lo, hi) = match &self.bounds {
                    Some(bounds) => {
                        let (lo, hi) = bounds.at(i);
                        sample_interval(lo, hi)
                    }
                    None => (-r, r),
                };
                if lo < hi {
                    rng.gen_range(lo..hi)
                } else {
                    degenerate = true;
                    lo
                }
            })
            .collect();
        if degenerate {
            log::warn!(
                "ArraySpec '{}': degenerate bounds, sampled the lower bound",
                self.name
            );
        }
        Array {
            shape: self.shape.clone(),
            data,
        }
    }

    /// Check that `value` has exactly this spec's shape.
    pub fn validate(&self, value: &Array) -> ControlResult<()> {
        if value.shape != self.shape {
            return Err(ControlError::shape(
                format!("'{}' (shape {:?} vs {:?})", self.name, self.shape, value.shape),
                self.size(),
                value.size(),
            ));
        }
        Ok(())
    }
}

/// Sample every leaf of a spec tree.
pub fn sample_from_tree_of_specs<R: Rng>(specs: &Tree<ArraySpec>, rng: &mut R) -> Tree<Array> {
    specs.map(|spec| spec.sample(rng))
}

/// Unbounded spec tree matching an example value. Leaves are named after
/// the map key they sit under.
pub fn spec_from_example(example: &Tree<Array>) -> Tree<ArraySpec> {
    fn walk(node: &Tree<Array>, name: &str) -> Tree<ArraySpec> {
        match node {
            Tree::Leaf(a) => Tree::Leaf(ArraySpec::new(name, a.shape.clone())),
            Tree::Seq(items) => Tree::Seq(items.iter().map(|t| walk(t, name)).collect()),
            Tree::Map(entries) => Tree::Map(
                entries
                    .iter()
                    .map(|(k, t)| (k.clone(), walk(t, k)))
                    .collect(),
            ),
        }
    }
    walk(example, "")
}

/// Number of scalars a value conforming to `specs` flattens into.
pub fn flat_width(specs: &Tree<ArraySpec>) -> usize {
    specs.leaves().iter().map(|s| s.size()).sum()
}

/// Concatenate all leaves of a value tree into one flat vector.
pub fn batch_concat(values: &Tree<Array>) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.flat_size());
    for leaf in values.leaves() {
        out.extend_from_slice(&leaf.data);
    }
    out
}

impl Tree<ArraySpec> {
    /// Validate structure and every leaf shape of `value` against this spec.
    pub fn conforms(&self, value: &Tree<Array>) -> ControlResult<()> {
        if !self.same_structure(value) {
            return Err(ControlError::shape(
                "tree structure",
                self.num_leaves(),
                value.num_leaves(),
            ));
        }
        self.zip(value, |spec, array| spec.validate(array))?;
        Ok(())
    }

    pub fn zeros(&self) -> Tree<Array> {
        self.map(ArraySpec::zeros)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn obs_specs() -> Tree<ArraySpec> {
        Tree::map_of([
            ("pos", Tree::Leaf(ArraySpec::new("pos", vec![3]))),
            (
                "act",
                Tree::Leaf(ArraySpec::bounded("act", vec![2], -1.0, 1.0)),
            ),
        ])
    }

    #[test]
    fn test_flat_width() {
        assert_eq!(flat_width(&obs_specs()), 5);
    }

    #[test]
    fn test_bounded_sample_within_bounds() {
        let spec = ArraySpec::bounded("u", vec![100], -0.5, 0.5);
        let mut rng = StdRng::seed_from_u64(0);
        let a = spec.sample(&mut rng);
        assert_eq!(a.shape, vec![100]);
        assert!(a.data.iter().all(|&v| (-0.5..0.5).contains(&v)));
    }

    #[test]
    fn test_infinite_bounds_sample_finite() {
        let mut rng = StdRng::seed_from_u64(0);
        let open = ArraySpec::bounded("u", vec![2], f64::NEG_INFINITY, f64::INFINITY);
        let a = open.sample(&mut rng);
        assert!(a.data.iter().all(|v| v.abs() <= UNBOUNDED_SAMPLE_RANGE));

        let half_open = ArraySpec::bounded("u", vec![20], 3.0, f64::INFINITY);
        let a = half_open.sample(&mut rng);
        assert!(a.data.iter().all(|&v| (3.0..3.0 + 2.0 * UNBOUNDED_SAMPLE_RANGE).contains(&v)));
    }

    #[test]
    fn test_overflowing_finite_bounds_sample_finite() {
        let mut rng = StdRng::seed_from_u64(0);
        let wide = ArraySpec::bounded("u", vec![2], -f64::MAX, f64::MAX);
        let a = wide.sample(&mut rng);
        assert!(a.data.iter().all(|v| v.abs() <= UNBOUNDED_SAMPLE_RANGE));
    }

    #[test]
    fn test_reversed_bounds_sample_lower() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = ArraySpec::bounded("u", vec![3], 2.0, 1.0).sample(&mut rng);
        assert_eq!(a.data, vec![2.0; 3]);
    }

    #[test]
    fn test_elementwise_bounds() {
        let spec = ArraySpec::bounded_elementwise(
            "u",
            vec![3],
            vec![0.0, 10.0, -5.0],
            vec![1.0],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..20 {
            let a = spec.sample(&mut rng);
            assert!((0.0..1.0).contains(&a.data[0]));
            // maximum below minimum: lower bound
            assert_eq!(a.data[1], 10.0);
            assert!((-5.0..1.0).contains(&a.data[2]));
        }
    }

    #[test]
    fn test_elementwise_bounds_rejected() {
        assert!(matches!(
            ArraySpec::bounded_elementwise("u", vec![3], vec![0.0, 1.0], vec![2.0]),
            Err(ControlError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            ArraySpec::bounded_elementwise("u", vec![1], vec![f64::NAN], vec![2.0]),
            Err(ControlError::Config(_))
        ));
    }

    #[test]
    fn test_unbounded_sample_range() {
        let spec = ArraySpec::new("u", vec![50]);
        let mut rng = StdRng::seed_from_u64(0);
        let a = spec.sample(&mut rng);
        assert!(a
            .data
            .iter()
            .all(|&v| v.abs() <= UNBOUNDED_SAMPLE_RANGE));
    }

    #[test]
    fn test_sample_tree_conforms() {
        let specs = obs_specs();
        let mut rng = StdRng::seed_from_u64(1);
        let sample = sample_from_tree_of_specs(&specs, &mut rng);
        assert!(specs.conforms(&sample).is_ok());
        assert_eq!(batch_concat(&sample).len(), 5);
    }

    #[test]
    fn test_conforms_rejects_wrong_shape() {
        let specs = obs_specs();
        let bad = Tree::map_of([
            ("pos", Tree::Leaf(Array::vector(vec![0.0; 4]))),
            ("act", Tree::Leaf(Array::vector(vec![0.0; 2]))),
        ]);
        assert!(matches!(
            specs.conforms(&bad),
            Err(ControlError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_conforms_rejects_wrong_structure() {
        let specs = obs_specs();
        let bad = Tree::Leaf(Array::vector(vec![0.0; 5]));
        assert!(specs.conforms(&bad).is_err());
    }

    #[test]
    fn test_spec_from_example_names_leaves() {
        let example = Tree::map_of([
            ("theta", Tree::Leaf(Array::vector(vec![0.1, 0.2]))),
            ("omega", Tree::Leaf(Array::scalar(0.0))),
        ]);
        let specs = spec_from_example(&example);
        let theta = specs.get("theta").unwrap();
        assert_eq!(
            theta,
            &Tree::Leaf(ArraySpec::new("theta", vec![2]))
        );
        assert!(specs.conforms(&example).is_ok());
    }

    #[test]
    fn test_batch_concat_order() {
        let values = Tree::Seq(vec![
            Tree::Leaf(Array::vector(vec![1.0, 2.0])),
            Tree::Leaf(Array::scalar(3.0)),
        ]);
        assert_eq!(batch_concat(&values), vec![1.0, 2.0, 3.0]);
    }
}
