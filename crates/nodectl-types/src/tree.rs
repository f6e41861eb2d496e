// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Structured Value Trees
// ─────────────────────────────────────────────────────────────────────
//! Nested containers of leaves.
//!
//! Controller inputs, outputs, parameters and trainability masks all
//! share one shape: a tree of `Seq` / `Map` nodes over leaves.
//! Traversal order is depth-first, map keys in sorted order, sequence
//! entries in index order. Every flatten/unflatten in the workspace
//! goes through `leaves()` so the order is defined in exactly one place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};

/// A nested container of leaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tree<L> {
    Leaf(L),
    Seq(Vec<Tree<L>>),
    Map(BTreeMap<String, Tree<L>>),
}

impl<L> Tree<L> {
    /// Build a map node from `(key, subtree)` pairs.
    pub fn map_of<K: Into<String>>(entries: impl IntoIterator<Item = (K, Tree<L>)>) -> Self {
        Tree::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Leaves in traversal order.
    pub fn leaves(&self) -> Vec<&L> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a L>) {
        match self {
            Tree::Leaf(l) => out.push(l),
            Tree::Seq(items) => items.iter().for_each(|t| t.collect_leaves(out)),
            Tree::Map(entries) => entries.values().for_each(|t| t.collect_leaves(out)),
        }
    }

    /// Mutable leaves in traversal order.
    pub fn leaves_mut(&mut self) -> Vec<&mut L> {
        let mut out = Vec::new();
        self.collect_leaves_mut(&mut out);
        out
    }

    fn collect_leaves_mut<'a>(&'a mut self, out: &mut Vec<&'a mut L>) {
        match self {
            Tree::Leaf(l) => out.push(l),
            Tree::Seq(items) => items.iter_mut().for_each(|t| t.collect_leaves_mut(out)),
            Tree::Map(entries) => entries.values_mut().for_each(|t| t.collect_leaves_mut(out)),
        }
    }

    pub fn num_leaves(&self) -> usize {
        match self {
            Tree::Leaf(_) => 1,
            Tree::Seq(items) => items.iter().map(Tree::num_leaves).sum(),
            Tree::Map(entries) => entries.values().map(Tree::num_leaves).sum(),
        }
    }

    /// Same structure, leaves transformed by `f`.
    pub fn map<M, F>(&self, mut f: F) -> Tree<M>
    where
        F: FnMut(&L) -> M,
    {
        self.map_with(&mut f)
    }

    fn map_with<M, F>(&self, f: &mut F) -> Tree<M>
    where
        F: FnMut(&L) -> M,
    {
        match self {
            Tree::Leaf(l) => Tree::Leaf(f(l)),
            Tree::Seq(items) => Tree::Seq(items.iter().map(|t| t.map_with(f)).collect()),
            Tree::Map(entries) => Tree::Map(
                entries
                    .iter()
                    .map(|(k, t)| (k.clone(), t.map_with(f)))
                    .collect(),
            ),
        }
    }

    /// Fallible variant of [`Tree::map`]; stops at the first error.
    pub fn try_map<M, F>(&self, mut f: F) -> ControlResult<Tree<M>>
    where
        F: FnMut(&L) -> ControlResult<M>,
    {
        self.try_map_with(&mut f)
    }

    fn try_map_with<M, F>(&self, f: &mut F) -> ControlResult<Tree<M>>
    where
        F: FnMut(&L) -> ControlResult<M>,
    {
        Ok(match self {
            Tree::Leaf(l) => Tree::Leaf(f(l)?),
            Tree::Seq(items) => Tree::Seq(
                items
                    .iter()
                    .map(|t| t.try_map_with(f))
                    .collect::<ControlResult<_>>()?,
            ),
            Tree::Map(entries) => {
                let mut out = BTreeMap::new();
                for (k, t) in entries {
                    out.insert(k.clone(), t.try_map_with(f)?);
                }
                Tree::Map(out)
            }
        })
    }

    /// Pair leaves of two congruent trees. Errors if the structures differ.
    pub fn zip<M, R, F>(&self, other: &Tree<M>, mut f: F) -> ControlResult<Tree<R>>
    where
        F: FnMut(&L, &M) -> ControlResult<R>,
    {
        self.zip_with(other, &mut f)
    }

    fn zip_with<M, R, F>(&self, other: &Tree<M>, f: &mut F) -> ControlResult<Tree<R>>
    where
        F: FnMut(&L, &M) -> ControlResult<R>,
    {
        match (self, other) {
            (Tree::Leaf(a), Tree::Leaf(b)) => Ok(Tree::Leaf(f(a, b)?)),
            (Tree::Seq(a), Tree::Seq(b)) => {
                if a.len() != b.len() {
                    return Err(ControlError::shape("sequence length", a.len(), b.len()));
                }
                Ok(Tree::Seq(
                    a.iter()
                        .zip(b)
                        .map(|(x, y)| x.zip_with(y, f))
                        .collect::<ControlResult<_>>()?,
                ))
            }
            (Tree::Map(a), Tree::Map(b)) => {
                if a.len() != b.len() || a.keys().zip(b.keys()).any(|(x, y)| x != y) {
                    return Err(ControlError::Config(format!(
                        "map keys differ: {:?} vs {:?}",
                        a.keys().collect::<Vec<_>>(),
                        b.keys().collect::<Vec<_>>()
                    )));
                }
                let mut out = BTreeMap::new();
                for ((k, x), y) in a.iter().zip(b.values()) {
                    out.insert(k.clone(), x.zip_with(y, f)?);
                }
                Ok(Tree::Map(out))
            }
            _ => Err(ControlError::Config(
                "tree structures differ (leaf / sequence / map)".to_string(),
            )),
        }
    }

    /// Subtree under `key` if this node is a map.
    pub fn get(&self, key: &str) -> Option<&Tree<L>> {
        match self {
            Tree::Map(entries) => entries.get(key),
            _ => None,
        }
    }

    /// True when both trees have identical node layout (leaf values ignored).
    pub fn same_structure<M>(&self, other: &Tree<M>) -> bool {
        match (self, other) {
            (Tree::Leaf(_), Tree::Leaf(_)) => true,
            (Tree::Seq(a), Tree::Seq(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_structure(y))
            }
            (Tree::Map(a), Tree::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, x), (kb, y))| ka == kb && x.same_structure(y))
            }
            _ => false,
        }
    }
}

/// Dense row-major numeric array. A scalar has an empty shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Array {
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl Array {
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> ControlResult<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(ControlError::shape(
                format!("array of shape {shape:?}"),
                expected,
                data.len(),
            ));
        }
        Ok(Self { shape, data })
    }

    /// 1-D array.
    pub fn vector(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            data: vec![0.0; shape.iter().product()],
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// A parameter or state leaf tagged with its trainability.
///
/// The tag is fixed by whoever builds the leaf (network parameters are
/// trainable, recurrent state is not); masks are read off the tags
/// rather than looked up by field name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
    pub value: Array,
    pub trainable: bool,
}

impl Leaf {
    pub fn trainable(value: Array) -> Self {
        Self {
            value,
            trainable: true,
        }
    }

    pub fn frozen(value: Array) -> Self {
        Self {
            value,
            trainable: false,
        }
    }
}

impl Tree<Array> {
    /// Total number of scalars across all leaves.
    pub fn flat_size(&self) -> usize {
        self.leaves().iter().map(|a| a.size()).sum()
    }
}

impl Tree<Leaf> {
    /// Trainability mask read from the leaf tags.
    pub fn trainable_mask(&self) -> Tree<bool> {
        self.map(|leaf| leaf.trainable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> Tree<Array> {
        Tree::map_of([
            ("velocity", Tree::Leaf(Array::vector(vec![3.0, 4.0]))),
            ("angle", Tree::Leaf(Array::scalar(1.0))),
            (
                "history",
                Tree::Seq(vec![
                    Tree::Leaf(Array::vector(vec![5.0])),
                    Tree::Leaf(Array::vector(vec![6.0])),
                ]),
            ),
        ])
    }

    #[test]
    fn test_leaves_sorted_key_order() {
        let tree = sample_tree();
        let flat: Vec<f64> = tree
            .leaves()
            .iter()
            .flat_map(|a| a.data.iter().copied())
            .collect();
        // angle < history < velocity
        assert_eq!(flat, vec![1.0, 5.0, 6.0, 3.0, 4.0]);
    }

    #[test]
    fn test_num_leaves_and_flat_size() {
        let tree = sample_tree();
        assert_eq!(tree.num_leaves(), 4);
        assert_eq!(tree.flat_size(), 5);
    }

    #[test]
    fn test_map_preserves_structure() {
        let tree = sample_tree();
        let sizes = tree.map(|a| a.size());
        assert!(tree.same_structure(&sizes));
        assert_eq!(sizes.leaves(), vec![&1, &1, &1, &2]);
    }

    #[test]
    fn test_zip_rejects_different_structure() {
        let a = sample_tree();
        let b = Tree::Leaf(Array::scalar(0.0));
        assert!(a.zip(&b, |_, _| Ok(())).is_err());
    }

    #[test]
    fn test_zip_rejects_different_keys() {
        let a: Tree<u8> = Tree::map_of([("x", Tree::Leaf(1))]);
        let b: Tree<u8> = Tree::map_of([("y", Tree::Leaf(1))]);
        assert!(a.zip(&b, |_, _| Ok(())).is_err());
        assert!(!a.same_structure(&b));
    }

    #[test]
    fn test_array_new_validates_size() {
        assert!(Array::new(vec![2, 3], vec![0.0; 6]).is_ok());
        let err = Array::new(vec![2, 3], vec![0.0; 5]).unwrap_err();
        assert!(matches!(
            err,
            ControlError::ShapeMismatch {
                expected: 6,
                got: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_scalar_has_empty_shape() {
        let s = Array::scalar(2.5);
        assert!(s.shape.is_empty());
        assert_eq!(s.size(), 1);
    }

    #[test]
    fn test_trainable_mask_from_tags() {
        let tree = Tree::map_of([
            ("w", Tree::Leaf(Leaf::trainable(Array::vector(vec![1.0])))),
            ("s", Tree::Leaf(Leaf::frozen(Array::vector(vec![0.0])))),
        ]);
        let mask = tree.trainable_mask();
        assert_eq!(mask.get("w"), Some(&Tree::Leaf(true)));
        assert_eq!(mask.get("s"), Some(&Tree::Leaf(false)));
    }

    #[test]
    fn test_leaves_mut_writes_through() {
        let mut tree = sample_tree();
        for leaf in tree.leaves_mut() {
            leaf.data.iter_mut().for_each(|v| *v = 0.0);
        }
        assert!(tree.leaves().iter().all(|a| a.data.iter().all(|&v| v == 0.0)));
    }
}
