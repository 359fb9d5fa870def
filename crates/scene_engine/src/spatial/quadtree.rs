//! Quadtree spatial partitioning structure
//!
//! Divides a 2D rectangle into hierarchical quadrants for fast region
//! queries. A leaf splits into four equal children once it reaches the
//! per-node capacity, unless it already sits at the maximum depth, in which
//! case it simply overflows.
//!
//! Elements are rectangles. An element is stored in every child it overlaps;
//! on a split line a coordinate equal to the midpoint belongs to the upper
//! half, so a point never lands in more than one leaf. Each element's bound
//! is remembered at insertion and removal follows that bound, so callers may
//! move an entity before removing it.

use crate::scene::AABB2D;
use crate::foundation::math::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

/// Configuration for quadtree behavior
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadtreeConfig {
    /// Rectangle covered by the root node
    pub bounds: AABB2D,

    /// Maximum subdivision depth (root is depth 0)
    pub max_depth: u32,

    /// Elements a leaf holds before it splits
    pub elements_per_node: usize,
}

impl Default for QuadtreeConfig {
    fn default() -> Self {
        Self {
            bounds: AABB2D::default(),
            max_depth: 8,
            elements_per_node: 4,
        }
    }
}

impl QuadtreeConfig {
    /// Check that the configuration can build a tree
    pub fn validate(&self) -> Result<(), SpatialError> {
        if !self.bounds.is_valid() {
            return Err(SpatialError::InvalidBounds(self.bounds));
        }
        if self.elements_per_node == 0 {
            return Err(SpatialError::InvalidConfig(
                "elements_per_node must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Spatial index errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpatialError {
    /// Element bound is not inside the root rectangle
    #[error("bound {0:?} lies outside the quadtree root")]
    OutOfBounds(AABB2D),

    /// Element is already indexed
    #[error("element is already indexed")]
    AlreadyPresent,

    /// Rectangle has non-finite or inverted corners
    #[error("invalid bound {0:?}")]
    InvalidBounds(AABB2D),

    /// Configuration rejected
    #[error("invalid quadtree configuration: {0}")]
    InvalidConfig(String),
}

/// Single node in the quadtree hierarchy
#[derive(Debug, Clone)]
struct QuadNode<T> {
    bounds: AABB2D,
    depth: u32,
    elements: Vec<T>,
    /// Index of the first of four consecutive children
    first_child: Option<usize>,
}

impl<T> QuadNode<T> {
    fn new(bounds: AABB2D, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            elements: Vec::new(),
            first_child: None,
        }
    }
}

/// Read-only view of a node for debug drawing
#[derive(Debug, Clone, Copy)]
pub struct QuadNodeView<'a, T> {
    /// Rectangle covered by the node
    pub bounds: AABB2D,
    /// Depth below the root
    pub depth: u32,
    /// Elements held directly (empty for internal nodes)
    pub elements: &'a [T],
    /// Whether the node has been split
    pub is_leaf: bool,
}

/// Quadtree over rectangles
#[derive(Debug, Clone)]
pub struct Quadtree<T> {
    config: QuadtreeConfig,
    nodes: Vec<QuadNode<T>>,
    tracked: HashMap<T, AABB2D>,
}

/// Child quadrant index: bit 0 selects the upper x half, bit 1 the upper y half
fn child_bounds(bounds: &AABB2D, quadrant: usize) -> AABB2D {
    let mid = bounds.center();
    let (min_x, max_x) = if quadrant & 1 == 0 { (bounds.min.x, mid.x) } else { (mid.x, bounds.max.x) };
    let (min_y, max_y) = if quadrant & 2 == 0 { (bounds.min.y, mid.y) } else { (mid.y, bounds.max.y) };
    AABB2D::new(Vec2::new(min_x, min_y), Vec2::new(max_x, max_y))
}

/// Quadrants of `node` that `bound` is routed to
fn quadrants_for(node: &AABB2D, bound: &AABB2D) -> impl Iterator<Item = usize> {
    let mid = node.center();
    let lower_x = bound.min.x < mid.x;
    let upper_x = bound.max.x >= mid.x;
    let lower_y = bound.min.y < mid.y;
    let upper_y = bound.max.y >= mid.y;

    let mask = [
        lower_x && lower_y,
        upper_x && lower_y,
        lower_x && upper_y,
        upper_x && upper_y,
    ];
    (0..4).filter(move |&q| mask[q])
}

impl<T> Quadtree<T>
where
    T: Copy + Eq + Hash + Debug,
{
    /// Create an empty quadtree
    pub fn new(config: QuadtreeConfig) -> Result<Self, SpatialError> {
        config.validate()?;
        Ok(Self {
            nodes: vec![QuadNode::new(config.bounds, 0)],
            config,
            tracked: HashMap::new(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &QuadtreeConfig {
        &self.config
    }

    /// Rectangle covered by the root
    pub fn bounds(&self) -> AABB2D {
        self.config.bounds
    }

    /// Number of indexed elements
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    /// Whether nothing is indexed
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Whether `item` is indexed
    pub fn contains(&self, item: &T) -> bool {
        self.tracked.contains_key(item)
    }

    /// Bound recorded for `item` when it was inserted
    pub fn bound_of(&self, item: &T) -> Option<AABB2D> {
        self.tracked.get(item).copied()
    }

    /// Total node count, internal nodes included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Deepest node currently in the tree
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Insert an element with its bound
    pub fn insert(&mut self, item: T, bound: AABB2D) -> Result<(), SpatialError> {
        if !bound.is_valid() {
            return Err(SpatialError::InvalidBounds(bound));
        }
        if !self.config.bounds.contains(&bound) {
            return Err(SpatialError::OutOfBounds(bound));
        }
        if self.tracked.contains_key(&item) {
            return Err(SpatialError::AlreadyPresent);
        }

        self.tracked.insert(item, bound);
        self.insert_into_tree(item, &bound);
        Ok(())
    }

    fn insert_into_tree(&mut self, item: T, bound: &AABB2D) {
        let mut stack = vec![0usize];

        while let Some(index) = stack.pop() {
            if let Some(first) = self.nodes[index].first_child {
                let node_bounds = self.nodes[index].bounds;
                stack.extend(quadrants_for(&node_bounds, bound).map(|q| first + q));
                continue;
            }

            let node = &self.nodes[index];
            let has_room = node.elements.len() < self.config.elements_per_node;
            let at_max_depth = node.depth >= self.config.max_depth;

            if has_room || at_max_depth || !self.split(index) {
                self.nodes[index].elements.push(item);
            } else {
                // Now internal; route the element through the new children.
                stack.push(index);
            }
        }
    }

    /// Split a leaf and redistribute its elements. Returns false when
    /// splitting could not separate anything, leaving the leaf untouched.
    fn split(&mut self, index: usize) -> bool {
        let bounds = self.nodes[index].bounds;
        let depth = self.nodes[index].depth;

        let separable = self.nodes[index].elements.iter().any(|element| {
            self.tracked
                .get(element)
                .map_or(true, |b| quadrants_for(&bounds, b).count() < 4)
        });
        if !separable {
            return false;
        }

        let first = self.nodes.len();
        for quadrant in 0..4 {
            self.nodes.push(QuadNode::new(child_bounds(&bounds, quadrant), depth + 1));
        }

        let elements = std::mem::take(&mut self.nodes[index].elements);
        self.nodes[index].first_child = Some(first);

        for element in elements {
            let Some(bound) = self.tracked.get(&element).copied() else {
                continue;
            };
            for quadrant in quadrants_for(&bounds, &bound) {
                self.nodes[first + quadrant].elements.push(element);
            }
        }
        true
    }

    /// Remove an element, following the bound it was inserted with.
    ///
    /// Returns false if the element was not indexed.
    pub fn remove(&mut self, item: &T) -> bool {
        let Some(bound) = self.tracked.remove(item) else {
            return false;
        };

        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &mut self.nodes[index];
            if let Some(first) = node.first_child {
                let node_bounds = node.bounds;
                stack.extend(quadrants_for(&node_bounds, &bound).map(|q| first + q));
            } else {
                node.elements.retain(|e| e != item);
            }
        }
        true
    }

    /// Move an element to a new bound.
    ///
    /// On error the element is no longer indexed.
    pub fn update(&mut self, item: T, bound: AABB2D) -> Result<(), SpatialError> {
        self.remove(&item);
        self.insert(item, bound)
    }

    /// All elements whose stored bound intersects `region`, each reported once
    pub fn query(&self, region: &AABB2D) -> Vec<T> {
        let mut results = Vec::new();
        let mut seen = HashSet::new();

        if !self.nodes[0].bounds.intersects(region) {
            return results;
        }

        let mut stack = vec![0usize];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if let Some(first) = node.first_child {
                // Reverse so quadrant 0 is visited first.
                for child in (first..first + 4).rev() {
                    if self.nodes[child].bounds.intersects(region) {
                        stack.push(child);
                    }
                }
                continue;
            }

            for element in &node.elements {
                let hit = self.tracked.get(element).is_some_and(|b| b.intersects(region));
                if hit && seen.insert(*element) {
                    results.push(*element);
                }
            }
        }

        results
    }

    /// Discard the tree and reinsert every tracked element under a new
    /// configuration. Elements that no longer fit the new bounds are dropped
    /// and returned.
    pub fn rebuild(&mut self, config: QuadtreeConfig) -> Result<Vec<T>, SpatialError> {
        config.validate()?;

        let entries: Vec<(T, AABB2D)> = self.tracked.drain().collect();
        self.config = config;
        self.nodes = vec![QuadNode::new(config.bounds, 0)];

        let mut dropped = Vec::new();
        for (item, bound) in entries {
            match self.insert(item, bound) {
                Ok(()) => {}
                Err(err) => {
                    log::warn!("Dropping {item:?} from quadtree rebuild: {err}");
                    dropped.push(item);
                }
            }
        }

        log::debug!(
            "Quadtree rebuilt: {} elements, {} nodes, depth {}",
            self.len(),
            self.node_count(),
            self.depth()
        );
        Ok(dropped)
    }

    /// Discard all nodes and elements, keeping the configuration
    pub fn clear(&mut self) {
        self.nodes = vec![QuadNode::new(self.config.bounds, 0)];
        self.tracked.clear();
    }

    /// Every node in breadth-first order
    pub fn nodes(&self) -> impl Iterator<Item = QuadNodeView<'_, T>> {
        self.nodes.iter().map(|node| QuadNodeView {
            bounds: node.bounds,
            depth: node.depth,
            elements: &node.elements,
            is_leaf: node.first_child.is_none(),
        })
    }

    /// Leaf nodes only
    pub fn leaves(&self) -> impl Iterator<Item = QuadNodeView<'_, T>> {
        self.nodes().filter(|node| node.is_leaf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn point(x: f32, y: f32) -> AABB2D {
        AABB2D::from_point(Vec2::new(x, y))
    }

    fn rect(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> AABB2D {
        AABB2D::new(Vec2::new(min_x, min_y), Vec2::new(max_x, max_y))
    }

    fn small_tree() -> Quadtree<u32> {
        Quadtree::new(QuadtreeConfig {
            bounds: rect(-100.0, -100.0, 100.0, 100.0),
            max_depth: 8,
            elements_per_node: 4,
        })
        .unwrap()
    }

    #[test]
    fn test_basic_insertion_and_query() {
        let mut tree = small_tree();
        tree.insert(1, point(0.0, 0.0)).unwrap();
        tree.insert(2, point(5.0, 0.0)).unwrap();
        tree.insert(3, point(50.0, 50.0)).unwrap();

        let mut found = tree.query(&rect(-10.0, -10.0, 10.0, 10.0));
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_split_redistributes_contents() {
        let mut tree = small_tree();
        for (i, x) in [-50.0, -40.0, 40.0, 50.0, 60.0].into_iter().enumerate() {
            tree.insert(i as u32, point(x, x)).unwrap();
        }

        assert!(tree.node_count() > 1);
        let root = tree.nodes().next().unwrap();
        assert!(!root.is_leaf);
        assert!(root.elements.is_empty(), "internal nodes hold no elements");
        for leaf in tree.leaves() {
            for element in leaf.elements {
                assert!(leaf.bounds.intersects(&tree.bound_of(element).unwrap()));
            }
        }
    }

    #[test]
    fn test_rejects_out_of_bounds_and_duplicates() {
        let mut tree = small_tree();
        assert_eq!(
            tree.insert(1, point(150.0, 0.0)),
            Err(SpatialError::OutOfBounds(point(150.0, 0.0)))
        );
        tree.insert(1, point(1.0, 1.0)).unwrap();
        assert_eq!(tree.insert(1, point(2.0, 2.0)), Err(SpatialError::AlreadyPresent));
        assert!(matches!(
            tree.insert(2, rect(5.0, 5.0, 1.0, 1.0)),
            Err(SpatialError::InvalidBounds(_))
        ));
    }

    #[test]
    fn test_depth_bound_with_coincident_points() {
        let mut tree = Quadtree::new(QuadtreeConfig {
            bounds: rect(-100.0, -100.0, 100.0, 100.0),
            max_depth: 8,
            elements_per_node: 4,
        })
        .unwrap();

        for i in 0..10_000u32 {
            tree.insert(i, point(12.5, -33.0)).unwrap();
        }

        assert!(tree.depth() <= 8);
        assert_eq!(tree.len(), 10_000);
        assert_eq!(tree.query(&point(12.5, -33.0)).len(), 10_000);
    }

    #[test]
    fn test_points_on_split_lines_land_in_one_leaf() {
        let mut tree = small_tree();
        for i in 0..64u32 {
            tree.insert(i, point(0.0, 0.0)).unwrap();
        }

        let holding: usize = tree
            .leaves()
            .filter(|leaf| !leaf.elements.is_empty())
            .count();
        assert_eq!(holding, 1);
        assert!(tree.depth() <= 8);
    }

    #[test]
    fn test_covering_elements_do_not_split_forever() {
        let mut tree = small_tree();
        for i in 0..100u32 {
            tree.insert(i, rect(-90.0, -90.0, 90.0, 90.0)).unwrap();
        }
        assert_eq!(tree.node_count(), 1, "nothing can be separated, leaf overflows");
        assert_eq!(tree.query(&point(0.0, 0.0)).len(), 100);
    }

    #[test]
    fn test_remove_uses_inserted_bound() {
        let mut tree = small_tree();
        for i in 0..20u32 {
            tree.insert(i, point(-80.0 + i as f32 * 8.0, 10.0)).unwrap();
        }

        assert!(tree.remove(&7));
        assert!(!tree.remove(&7));
        assert!(!tree.contains(&7));
        assert!(tree.leaves().all(|leaf| !leaf.elements.contains(&7)));
        assert_eq!(tree.len(), 19);
    }

    #[test]
    fn test_update_moves_element() {
        let mut tree = small_tree();
        tree.insert(1, point(-50.0, -50.0)).unwrap();
        tree.update(1, point(50.0, 50.0)).unwrap();

        assert!(tree.query(&rect(-60.0, -60.0, -40.0, -40.0)).is_empty());
        assert_eq!(tree.query(&rect(40.0, 40.0, 60.0, 60.0)), vec![1]);
    }

    #[test]
    fn test_rebuild_keeps_elements_and_drops_outsiders() {
        let mut tree = small_tree();
        tree.insert(1, point(10.0, 10.0)).unwrap();
        tree.insert(2, point(90.0, 90.0)).unwrap();

        let dropped = tree
            .rebuild(QuadtreeConfig {
                bounds: rect(-50.0, -50.0, 50.0, 50.0),
                max_depth: 2,
                elements_per_node: 1,
            })
            .unwrap();

        assert_eq!(dropped, vec![2]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.query(&rect(0.0, 0.0, 20.0, 20.0)), vec![1]);
        assert_eq!(tree.config().max_depth, 2);
    }

    #[test]
    fn test_clear_resets_to_single_node() {
        let mut tree = small_tree();
        for i in 0..50u32 {
            tree.insert(i, point(i as f32, i as f32)).unwrap();
        }
        tree.clear();

        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 1);
        assert!(tree.query(&rect(-100.0, -100.0, 100.0, 100.0)).is_empty());
    }

    #[test]
    fn test_query_matches_brute_force_regardless_of_order() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut bounds = HashMap::new();

        for i in 0..400u32 {
            let x = rng.gen_range(-95.0..90.0);
            let y = rng.gen_range(-95.0..90.0);
            let w = if i % 3 == 0 { 0.0 } else { rng.gen_range(0.0..5.0) };
            bounds.insert(i, rect(x, y, x + w, y + w));
        }

        let mut forward = small_tree();
        let mut backward = small_tree();
        let mut order: Vec<u32> = bounds.keys().copied().collect();
        order.sort_unstable();
        for id in &order {
            forward.insert(*id, bounds[id]).unwrap();
        }
        for id in order.iter().rev() {
            backward.insert(*id, bounds[id]).unwrap();
        }

        for id in order.iter().filter(|id| *id % 5 == 0) {
            forward.remove(id);
            backward.remove(id);
            bounds.remove(id);
        }

        for _ in 0..100 {
            let x = rng.gen_range(-110.0..100.0);
            let y = rng.gen_range(-110.0..100.0);
            let region = rect(x, y, x + rng.gen_range(0.0..60.0), y + rng.gen_range(0.0..60.0));

            let expected: HashSet<u32> = bounds
                .iter()
                .filter(|(_, b)| b.intersects(&region))
                .map(|(id, _)| *id)
                .collect();
            let got_forward: HashSet<u32> = forward.query(&region).into_iter().collect();
            let got_backward: HashSet<u32> = backward.query(&region).into_iter().collect();

            assert_eq!(got_forward, expected);
            assert_eq!(got_backward, expected);
        }
    }
}
