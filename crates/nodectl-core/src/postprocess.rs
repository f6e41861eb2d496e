// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Output Postprocessing
// Mirrors: cc/examples/neural_ode_controller.py (_make_postprocess)
// ─────────────────────────────────────────────────────────────────────
//! Flat network output → caller's output structure.
//!
//! The unflattening rule is captured once from a single example output
//! (or its spec) and replayed on every step.

use serde::{Deserialize, Serialize};

use nodectl_types::{Array, ArraySpec, ControlError, ControlResult, Tree};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Postprocess {
    shapes: Tree<Vec<usize>>,
    width: usize,
}

impl Postprocess {
    pub fn from_example(example: &Tree<Array>) -> Self {
        Self {
            shapes: example.map(|a| a.shape.clone()),
            width: example.flat_size(),
        }
    }

    pub fn from_specs(specs: &Tree<ArraySpec>) -> Self {
        Self::from_example(&specs.zeros())
    }

    /// Length of the flat vector `apply` expects.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn apply(&self, flat: &[f64]) -> ControlResult<Tree<Array>> {
        if flat.len() != self.width {
            return Err(ControlError::shape("postprocess input", self.width, flat.len()));
        }
        let mut offset = 0;
        Ok(self.shapes.map(|shape| {
            let n: usize = shape.iter().product();
            let data = flat[offset..offset + n].to_vec();
            offset += n;
            Array {
                shape: shape.clone(),
                data,
            }
        }))
    }
}

/// Derive the unflattening rule from one example output.
pub fn make_postprocess(example_output: &Tree<Array>) -> Postprocess {
    Postprocess::from_example(example_output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodectl_types::batch_concat;

    #[test]
    fn test_single_vector() {
        let pp = make_postprocess(&Tree::Leaf(Array::zeros(&[3])));
        let out = pp.apply(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(out, Tree::Leaf(Array::vector(vec![1.0, 2.0, 3.0])));
    }

    #[test]
    fn test_nested_structure_matches_flatten_order() {
        let example = Tree::map_of([
            ("torque", Tree::Leaf(Array::zeros(&[2, 2]))),
            ("brake", Tree::Leaf(Array::scalar(0.0))),
        ]);
        let pp = make_postprocess(&example);
        assert_eq!(pp.width(), 5);
        let flat = [1.0, 2.0, 3.0, 4.0, 5.0];
        let out = pp.apply(&flat).unwrap();
        assert!(out.same_structure(&example));
        // brake sorts before torque
        assert_eq!(out.get("brake"), Some(&Tree::Leaf(Array::scalar(1.0))));
        assert_eq!(batch_concat(&out), flat.to_vec());
        match out.get("torque") {
            Some(Tree::Leaf(a)) => assert_eq!(a.shape, vec![2, 2]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_wrong_length_rejected() {
        let pp = make_postprocess(&Tree::Leaf(Array::zeros(&[3])));
        assert!(matches!(
            pp.apply(&[1.0, 2.0]),
            Err(ControlError::ShapeMismatch {
                expected: 3,
                got: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_from_specs() {
        let specs = Tree::Seq(vec![
            Tree::Leaf(ArraySpec::new("a", vec![1])),
            Tree::Leaf(ArraySpec::new("b", vec![2])),
        ]);
        let pp = Postprocess::from_specs(&specs);
        let out = pp.apply(&[7.0, 8.0, 9.0]).unwrap();
        assert!(specs.conforms(&out).is_ok());
    }
}
