#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Two-dimensional k-d tree over ground positions.
//!
//! [`KdTree`] stores arbitrary items together with the ground point they
//! occupied when they were inserted (or when the tree was last rebuilt).
//! Splits alternate between the X axis on even levels and the Z axis on odd
//! levels; a point goes left when its coordinate on the node's axis is
//! strictly smaller than the node's coordinate, and right otherwise.
//!
//! Nodes live in an arena ordered by insertion. That order is observable
//! through [`KdTree::get`] and [`KdTree::iter`], survives removals and is
//! reproduced by every rebuild. Removals rebuild the whole tree from the
//! surviving items in their original order.
//!
//! Items move while the tree keeps their cached points. Queries therefore
//! answer against the positions captured at the last rebuild until
//! [`KdTree::update_positions`] or [`KdTree::update`] refreshes them.

use std::{collections::VecDeque, ops::Index, time::Duration};

use glam::Vec2;
use thiserror::Error;

/// Failures reported by [`KdTree`] operations.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum SpatialError {
    /// Positional access beyond the number of stored items.
    #[error("index {index} is out of range for a tree holding {len} items")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Number of stored items.
        len: usize,
    },
    /// Rebuild rate that is zero, negative or not a number.
    #[error("rebuild rate must be positive, got {rate}")]
    InvalidRate {
        /// Rejected rate.
        rate: f32,
    },
}

/// Decides whether a point belongs to a queried area.
pub trait PointChecker {
    /// Returns `true` when `point` lies inside the area.
    fn contains(&self, point: Vec2) -> bool;
}

/// Inclusive axis-aligned rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InRectangle {
    /// Lower corner.
    pub min: Vec2,
    /// Upper corner.
    pub max: Vec2,
}

impl PointChecker for InRectangle {
    fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

/// Inclusive circle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InCircle {
    /// Centre of the circle.
    pub center: Vec2,
    /// Radius of the circle.
    pub radius: f32,
}

impl PointChecker for InCircle {
    fn contains(&self, point: Vec2) -> bool {
        (point - self.center).length_squared() <= self.radius * self.radius
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    X,
    Z,
}

impl Axis {
    fn for_level(level: u32) -> Self {
        if level % 2 == 0 {
            Axis::X
        } else {
            Axis::Z
        }
    }

    fn of(self, point: Vec2) -> f32 {
        match self {
            Axis::X => point.x,
            Axis::Z => point.y,
        }
    }
}

#[derive(Clone, Debug)]
struct Node<T> {
    item: T,
    point: Vec2,
    level: u32,
    left: Option<usize>,
    right: Option<usize>,
}

impl<T> Node<T> {
    fn new(item: T, point: Vec2) -> Self {
        Self {
            item,
            point,
            level: 0,
            left: None,
            right: None,
        }
    }

    fn axis(&self) -> Axis {
        Axis::for_level(self.level)
    }
}

/// Spatial index over items positioned on the ground plane.
#[derive(Clone, Debug)]
pub struct KdTree<T> {
    nodes: Vec<Node<T>>,
    last_update: Duration,
}

impl<T> Default for KdTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> KdTree<T> {
    /// Creates an empty tree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            nodes: Vec::new(),
            last_update: Duration::ZERO,
        }
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Reports whether the tree holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Inserts `item` at `point`, appending it to the insertion order.
    pub fn insert(&mut self, item: T, point: Vec2) {
        self.nodes.push(Node::new(item, point));
        self.attach(self.nodes.len() - 1);
    }

    /// Item at insertion position `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.nodes.get(index).map(|node| &node.item)
    }

    /// Items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.nodes.iter().map(|node| &node.item)
    }

    /// Items in insertion order paired with their cached points.
    pub fn entries(&self) -> impl Iterator<Item = (&T, Vec2)> + '_ {
        self.nodes.iter().map(|node| (&node.item, node.point))
    }

    /// First item in insertion order matching `predicate`.
    pub fn find(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<&T> {
        self.iter().find(|item| predicate(item))
    }

    /// Number of items matching `predicate`.
    pub fn count_matching(&self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        self.iter().filter(|item| predicate(item)).count()
    }

    /// Removes and returns the item at insertion position `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<T, SpatialError> {
        if index >= self.nodes.len() {
            return Err(SpatialError::IndexOutOfRange {
                index,
                len: self.nodes.len(),
            });
        }
        let node = self.nodes.remove(index);
        self.relink();
        Ok(node.item)
    }

    /// Removes every item matching `predicate` with a single rebuild.
    ///
    /// Returns the number of removed items.
    pub fn remove_all(&mut self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|node| !predicate(&node.item));
        let removed = before - self.nodes.len();
        if removed > 0 {
            self.relink();
        }
        removed
    }

    /// Drops every item.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Refreshes every cached point through `locate` and rebuilds the tree.
    pub fn update_positions(&mut self, mut locate: impl FnMut(&T) -> Vec2) {
        for node in &mut self.nodes {
            node.point = locate(&node.item);
        }
        self.relink();
    }

    /// Rate-limited [`KdTree::update_positions`].
    ///
    /// `now` is the session clock. The rebuild runs only when at least
    /// `1 / rate` seconds elapsed since the previous rebuild performed by this
    /// method. Returns whether a rebuild happened.
    pub fn update(
        &mut self,
        rate: f32,
        now: Duration,
        locate: impl FnMut(&T) -> Vec2,
    ) -> Result<bool, SpatialError> {
        if rate.is_nan() || rate <= 0.0 {
            return Err(SpatialError::InvalidRate { rate });
        }
        let Ok(interval) = Duration::try_from_secs_f32(1.0 / rate) else {
            return Ok(false);
        };
        if now.saturating_sub(self.last_update) < interval {
            return Ok(false);
        }
        self.last_update = now;
        self.update_positions(locate);
        Ok(true)
    }

    /// Item whose cached point is nearest to `point`.
    ///
    /// Among equally near items the one visited first wins.
    #[must_use]
    pub fn find_closest(&self, point: Vec2) -> Option<&T> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut opened = Vec::with_capacity(self.nodes.len());
        opened.push(0);
        let mut best = 0;
        let mut best_distance = f32::INFINITY;
        let mut cursor = 0;

        while let Some(&index) = opened.get(cursor) {
            cursor += 1;
            let node = &self.nodes[index];

            let distance = (point - node.point).length_squared();
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }

            let axis = node.axis();
            let split_search = axis.of(point);
            let split_node = axis.of(node.point);
            let (near, far) = if split_search < split_node {
                (node.left, node.right)
            } else {
                (node.right, node.left)
            };

            if let Some(near) = near {
                opened.push(near);
            }
            let plane = split_node - split_search;
            if plane * plane < best_distance {
                if let Some(far) = far {
                    opened.push(far);
                }
            }
        }

        Some(&self.nodes[best].item)
    }

    /// Collects items whose cached point satisfies `checker`, visiting only
    /// subtrees that can intersect the bounding box `[min, max]`.
    ///
    /// `checker` must only accept points inside the bounding box.
    pub fn range_search<'a, C: PointChecker>(
        &'a self,
        min: Vec2,
        max: Vec2,
        checker: &C,
        out: &mut Vec<&'a T>,
    ) {
        if self.nodes.is_empty() {
            return;
        }

        let mut queue = VecDeque::from([0]);
        while let Some(index) = queue.pop_front() {
            let node = &self.nodes[index];
            if checker.contains(node.point) {
                out.push(&node.item);
            }

            let axis = node.axis();
            let split = axis.of(node.point);
            if let Some(left) = node.left {
                if axis.of(min) < split {
                    queue.push_back(left);
                }
            }
            if let Some(right) = node.right {
                if axis.of(max) >= split {
                    queue.push_back(right);
                }
            }
        }
    }

    /// Items inside the inclusive rectangle `[min, max]`.
    #[must_use]
    pub fn in_region(&self, min: Vec2, max: Vec2) -> Vec<&T> {
        let mut out = Vec::new();
        self.range_search(min, max, &InRectangle { min, max }, &mut out);
        out
    }

    /// Items inside the inclusive circle.
    ///
    /// # Panics
    ///
    /// Panics when `radius` is negative.
    #[must_use]
    pub fn in_circle(&self, center: Vec2, radius: f32) -> Vec<&T> {
        assert!(radius >= 0.0, "circle radius must not be negative, got {radius}");
        let extent = Vec2::splat(radius);
        let mut out = Vec::new();
        self.range_search(
            center - extent,
            center + extent,
            &InCircle { center, radius },
            &mut out,
        );
        out
    }

    fn relink(&mut self) {
        for node in &mut self.nodes {
            node.level = 0;
            node.left = None;
            node.right = None;
        }
        for index in 1..self.nodes.len() {
            self.attach(index);
        }
    }

    fn attach(&mut self, index: usize) {
        if index == 0 {
            return;
        }

        let point = self.nodes[index].point;
        let mut parent = 0;
        loop {
            let node = &self.nodes[parent];
            let axis = node.axis();
            let goes_left = axis.of(point) < axis.of(node.point);
            let child = if goes_left { node.left } else { node.right };
            match child {
                Some(child) => parent = child,
                None => {
                    let level = node.level + 1;
                    let parent_node = &mut self.nodes[parent];
                    if goes_left {
                        parent_node.left = Some(index);
                    } else {
                        parent_node.right = Some(index);
                    }
                    self.nodes[index].level = level;
                    return;
                }
            }
        }
    }
}

impl<T: Clone> KdTree<T> {
    /// New tree holding the items matching `predicate`, in insertion order.
    #[must_use]
    pub fn filtered(&self, mut predicate: impl FnMut(&T) -> bool) -> KdTree<T> {
        self.entries()
            .filter(|(item, _)| predicate(item))
            .map(|(item, point)| (item.clone(), point))
            .collect()
    }

    /// Copies the items into a vector in insertion order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}

impl<T> Index<usize> for KdTree<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(item) => item,
            None => panic!(
                "index {index} is out of range for a tree holding {} items",
                self.len()
            ),
        }
    }
}

impl<T> Extend<(T, Vec2)> for KdTree<T> {
    fn extend<I: IntoIterator<Item = (T, Vec2)>>(&mut self, items: I) {
        for (item, point) in items {
            self.insert(item, point);
        }
    }
}

impl<T> FromIterator<(T, Vec2)> for KdTree<T> {
    fn from_iter<I: IntoIterator<Item = (T, Vec2)>>(items: I) -> Self {
        let mut tree = KdTree::new();
        tree.extend(items);
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partitioned<T>(tree: &KdTree<T>) {
        fn check<T>(
            tree: &KdTree<T>,
            index: usize,
            level: u32,
            bounds: &mut Vec<(Axis, f32, bool)>,
        ) {
            let node = &tree.nodes[index];
            assert_eq!(node.level, level, "level must equal depth");
            for &(axis, split, left) in bounds.iter() {
                let value = axis.of(node.point);
                if left {
                    assert!(value < split, "left descendant {value} must be below {split}");
                } else {
                    assert!(value >= split, "right descendant {value} must not be below {split}");
                }
            }
            let axis = node.axis();
            let split = axis.of(node.point);
            if let Some(left) = node.left {
                bounds.push((axis, split, true));
                check(tree, left, level + 1, bounds);
                let _ = bounds.pop();
            }
            if let Some(right) = node.right {
                bounds.push((axis, split, false));
                check(tree, right, level + 1, bounds);
                let _ = bounds.pop();
            }
        }

        if !tree.is_empty() {
            check(tree, 0, 0, &mut Vec::new());
        }
    }

    fn sample() -> KdTree<&'static str> {
        [
            ("a", Vec2::new(0.0, 0.0)),
            ("b", Vec2::new(10.0, 0.0)),
            ("c", Vec2::new(0.0, 10.0)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn empty_tree_answers_nothing() {
        let tree: KdTree<u32> = KdTree::new();
        assert!(tree.find_closest(Vec2::ZERO).is_none());
        assert!(tree.in_region(Vec2::splat(-5.0), Vec2::splat(5.0)).is_empty());
        assert!(tree.in_circle(Vec2::ZERO, 3.0).is_empty());
    }

    #[test]
    fn region_query_keeps_only_inclusive_hits() {
        let tree = sample();
        assert_eq!(tree.in_region(Vec2::splat(-1.0), Vec2::splat(1.0)), vec![&"a"]);

        let mut hits = tree.in_circle(Vec2::ZERO, 10.0);
        hits.sort();
        assert_eq!(hits, vec![&"a", &"b", &"c"], "boundary points are inside");
    }

    #[test]
    fn closest_prefers_smallest_distance() {
        let tree = sample();
        assert_eq!(tree.find_closest(Vec2::new(6.0, 0.0)), Some(&"b"));
        assert_eq!(tree.find_closest(Vec2::new(-3.0, 4.0)), Some(&"a"));
    }

    #[test]
    fn nodes_respect_split_rule() {
        let points = [
            (5.0, 5.0),
            (2.0, 8.0),
            (7.0, 1.0),
            (5.0, 3.0),
            (2.0, 2.0),
            (9.0, 9.0),
            (5.0, 5.0),
            (1.0, 7.0),
        ];
        let mut tree: KdTree<usize> = points
            .iter()
            .enumerate()
            .map(|(id, &(x, z))| (id, Vec2::new(x, z)))
            .collect();
        assert_partitioned(&tree);

        assert_eq!(tree.remove_all(|id| id % 3 == 0), 3);
        assert_partitioned(&tree);
        assert_eq!(tree.to_vec(), vec![1, 2, 4, 5, 7]);
    }

    #[test]
    fn removal_preserves_insertion_order() {
        let mut tree = sample();
        assert_eq!(tree.remove_at(1), Ok("b"));
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0], "a");
        assert_eq!(tree[1], "c");
        assert_eq!(
            tree.remove_at(2),
            Err(SpatialError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn indexing_past_the_end_panics() {
        let tree = sample();
        let _ = &tree[3];
    }

    #[test]
    fn predicates_scan_in_insertion_order() {
        let tree: KdTree<u32> = (1..=6).map(|n| (n, Vec2::new(n as f32, 0.0))).collect();
        assert_eq!(tree.find(|n| n % 2 == 0), Some(&2));
        assert_eq!(tree.count_matching(|n| *n > 3), 3);
        assert_eq!(tree.filtered(|n| n % 3 == 0).to_vec(), vec![3, 6]);
    }

    #[test]
    fn rebuild_reflects_moved_items() {
        let mut positions = vec![Vec2::new(0.0, 0.0), Vec2::new(20.0, 0.0)];
        let mut tree: KdTree<usize> = positions.iter().copied().enumerate().collect();

        positions[0] = Vec2::new(30.0, 0.0);
        assert_eq!(
            tree.find_closest(Vec2::new(31.0, 0.0)),
            Some(&1),
            "queries use positions from the last rebuild"
        );

        tree.update_positions(|id| positions[*id]);
        assert_eq!(tree.find_closest(Vec2::new(31.0, 0.0)), Some(&0));
    }

    #[test]
    fn update_is_rate_limited() {
        let mut tree: KdTree<u8> = [(1, Vec2::ZERO)].into_iter().collect();
        let locate = |_: &u8| Vec2::ONE;

        assert_eq!(tree.update(2.0, Duration::from_millis(300), locate), Ok(false));
        assert_eq!(tree.update(2.0, Duration::from_millis(500), locate), Ok(true));
        assert_eq!(tree.update(2.0, Duration::from_millis(700), locate), Ok(false));
        assert_eq!(tree.update(2.0, Duration::from_millis(1_000), locate), Ok(true));
    }

    #[test]
    fn update_rejects_non_positive_rates() {
        let mut tree: KdTree<u8> = KdTree::new();
        assert_eq!(
            tree.update(0.0, Duration::from_secs(1), |_| Vec2::ZERO),
            Err(SpatialError::InvalidRate { rate: 0.0 })
        );
        assert!(tree.update(-1.0, Duration::from_secs(1), |_| Vec2::ZERO).is_err());
    }

    #[test]
    #[should_panic(expected = "must not be negative")]
    fn negative_radius_panics() {
        let _ = sample().in_circle(Vec2::ZERO, -1.0);
    }
}
