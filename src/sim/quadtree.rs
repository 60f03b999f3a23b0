//! Quadtree spatial index for broad-phase blast queries
//!
//! Rebuilt from scratch every tick from the live threat bounding boxes.
//! Query results are ordered: out-of-bounds items first, then each node's
//! items in insertion order, then children top-left, top-right,
//! bottom-left, bottom-right. Multi-hit resolution depends on this order.

use crate::Rect;
use crate::consts::{QUADTREE_CAPACITY, QUADTREE_MAX_DEPTH};

/// A bounding box tagged with a payload (usually an entity ID)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Item<T> {
    pub bounds: Rect,
    pub value: T,
}

#[derive(Debug, Clone)]
struct Node<T> {
    boundary: Rect,
    depth: u32,
    items: Vec<Item<T>>,
    children: Option<Box<[Node<T>; 4]>>,
}

impl<T: Copy> Node<T> {
    fn new(boundary: Rect, depth: u32) -> Self {
        Self {
            boundary,
            depth,
            items: Vec::new(),
            children: None,
        }
    }

    fn subdivide(&mut self) {
        let [tl, tr, bl, br] = self.boundary.quadrants();
        let depth = self.depth + 1;
        self.children = Some(Box::new([
            Node::new(tl, depth),
            Node::new(tr, depth),
            Node::new(bl, depth),
            Node::new(br, depth),
        ]));
    }

    /// Insert an item already known to fit inside this node's boundary
    fn insert(&mut self, item: Item<T>, capacity: usize) {
        if self.children.is_none() {
            if self.items.len() < capacity || self.depth >= QUADTREE_MAX_DEPTH {
                self.items.push(item);
                return;
            }
            self.subdivide();
        }

        if let Some(children) = self.children.as_mut() {
            if let Some(child) = children
                .iter_mut()
                .find(|c| c.boundary.contains_rect(&item.bounds))
            {
                child.insert(item, capacity);
                return;
            }
        }

        // Straddles a quadrant edge: keep it here
        self.items.push(item);
    }

    fn query(&self, range: &Rect, found: &mut Vec<T>) {
        if !self.boundary.intersects(range) {
            return;
        }
        found.extend(
            self.items
                .iter()
                .filter(|item| item.bounds.intersects(range))
                .map(|item| item.value),
        );
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(range, found);
            }
        }
    }

    fn len(&self) -> usize {
        self.items.len()
            + self
                .children
                .as_ref()
                .map_or(0, |c| c.iter().map(Node::len).sum())
    }

    fn depth(&self) -> u32 {
        self.children
            .as_ref()
            .map_or(self.depth, |c| c.iter().map(Node::depth).max().unwrap_or(self.depth))
    }
}

/// Region quadtree over axis-aligned bounding boxes
#[derive(Debug, Clone)]
pub struct Quadtree<T> {
    root: Node<T>,
    capacity: usize,
    /// Items not fully inside the root boundary (scanned linearly)
    outside: Vec<Item<T>>,
}

impl<T: Copy> Quadtree<T> {
    pub fn new(boundary: Rect) -> Self {
        Self::with_capacity(boundary, QUADTREE_CAPACITY)
    }

    pub fn with_capacity(boundary: Rect, capacity: usize) -> Self {
        Self {
            root: Node::new(boundary, 0),
            capacity: capacity.max(1),
            outside: Vec::new(),
        }
    }

    /// Build a tree from an iterator of items, inserted in order
    pub fn build(boundary: Rect, items: impl IntoIterator<Item = (Rect, T)>) -> Self {
        let mut tree = Self::new(boundary);
        for (bounds, value) in items {
            tree.insert(bounds, value);
        }
        tree
    }

    /// Insert a bounding box. Never drops the item: boxes poking out of the
    /// field are kept in an overflow list so they stay queryable.
    ///
    /// Returns `true` if the item was placed inside the tree proper.
    pub fn insert(&mut self, bounds: Rect, value: T) -> bool {
        let item = Item { bounds, value };
        if self.root.boundary.contains_rect(&bounds) {
            self.root.insert(item, self.capacity);
            true
        } else {
            log::trace!("quadtree: item {:?} outside root boundary", bounds);
            self.outside.push(item);
            false
        }
    }

    /// All payloads whose bounding box intersects `range`
    pub fn query(&self, range: &Rect) -> Vec<T> {
        let mut found: Vec<T> = self
            .outside
            .iter()
            .filter(|item| item.bounds.intersects(range))
            .map(|item| item.value)
            .collect();
        self.root.query(range, &mut found);
        found
    }

    pub fn clear(&mut self) {
        self.root = Node::new(self.root.boundary, 0);
        self.outside.clear();
    }

    pub fn len(&self) -> usize {
        self.root.len() + self.outside.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deepest subdivision level reached
    pub fn depth(&self) -> u32 {
        self.root.depth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use proptest::prelude::*;

    fn field() -> Rect {
        Rect::from_xywh(0.0, 0.0, 1280.0, 720.0)
    }

    #[test]
    fn test_query_finds_overlapping_only() {
        let mut tree = Quadtree::new(field());
        tree.insert(Rect::around_circle(Vec2::new(100.0, 100.0), 5.0), 1u32);
        tree.insert(Rect::around_circle(Vec2::new(900.0, 600.0), 5.0), 2u32);

        let hits = tree.query(&Rect::around_circle(Vec2::new(110.0, 100.0), 10.0));
        assert_eq!(hits, vec![1]);
    }

    #[test]
    fn test_subdivides_past_capacity() {
        let mut tree = Quadtree::new(field());
        for i in 0..5u32 {
            tree.insert(Rect::around_circle(Vec2::new(50.0 + i as f32 * 10.0, 50.0), 2.0), i);
        }
        assert_eq!(tree.len(), 5);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_query_order_is_node_then_quadrants() {
        let mut tree = Quadtree::new(field());
        // Fill root to capacity
        for i in 0..4u32 {
            tree.insert(Rect::around_circle(Vec2::new(1000.0, 600.0), 2.0), i);
        }
        // These land in children: bottom-right first, then top-left
        tree.insert(Rect::around_circle(Vec2::new(1000.0, 600.0), 2.0), 10);
        tree.insert(Rect::around_circle(Vec2::new(100.0, 100.0), 2.0), 11);
        // Straddles the center lines, stays at root
        tree.insert(Rect::around_circle(Vec2::new(640.0, 360.0), 4.0), 12);

        let all = tree.query(&field());
        assert_eq!(all, vec![0, 1, 2, 3, 12, 11, 10]);
    }

    #[test]
    fn test_out_of_bounds_item_is_retained() {
        let mut tree = Quadtree::new(field());
        // Freshly spawned threat poking above the top edge
        let placed = tree.insert(Rect::around_circle(Vec2::new(300.0, 1.0), 3.0), 7u32);
        assert!(!placed);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.query(&Rect::around_circle(Vec2::new(300.0, 0.0), 10.0)), vec![7]);
    }

    #[test]
    fn test_identical_points_bounded_depth() {
        let mut tree = Quadtree::new(field());
        for i in 0..200u32 {
            tree.insert(Rect::around_circle(Vec2::new(10.0, 10.0), 1.0), i);
        }
        assert_eq!(tree.len(), 200);
        assert!(tree.depth() <= QUADTREE_MAX_DEPTH);
        assert_eq!(tree.query(&Rect::around_circle(Vec2::new(10.0, 10.0), 1.0)).len(), 200);
    }

    #[test]
    fn test_clear() {
        let mut tree = Quadtree::new(field());
        tree.insert(Rect::around_circle(Vec2::new(10.0, 10.0), 1.0), 1u32);
        tree.insert(Rect::around_circle(Vec2::new(-10.0, 10.0), 1.0), 2u32);
        tree.clear();
        assert!(tree.is_empty());
    }

    proptest! {
        #[test]
        fn prop_every_item_is_queryable(
            points in prop::collection::vec((-20.0f32..1300.0, -20.0f32..740.0, 0.5f32..20.0), 0..120)
        ) {
            let tree = Quadtree::build(
                field(),
                points
                    .iter()
                    .enumerate()
                    .map(|(i, &(x, y, r))| (Rect::around_circle(Vec2::new(x, y), r), i)),
            );
            prop_assert_eq!(tree.len(), points.len());
            for (i, &(x, y, r)) in points.iter().enumerate() {
                let hits = tree.query(&Rect::around_circle(Vec2::new(x, y), r));
                prop_assert!(hits.contains(&i));
            }
        }

        #[test]
        fn prop_query_matches_linear_scan(
            points in prop::collection::vec((0.0f32..1280.0, 0.0f32..720.0), 0..80),
            qx in 0.0f32..1280.0,
            qy in 0.0f32..720.0,
            qr in 1.0f32..300.0,
        ) {
            let boxes: Vec<Rect> = points
                .iter()
                .map(|&(x, y)| Rect::around_circle(Vec2::new(x, y), 3.0))
                .collect();
            let tree = Quadtree::build(field(), boxes.iter().copied().enumerate().map(|(i, b)| (b, i)));
            let range = Rect::around_circle(Vec2::new(qx, qy), qr);

            let mut from_tree = tree.query(&range);
            from_tree.sort_unstable();
            let expected: Vec<usize> = boxes
                .iter()
                .enumerate()
                .filter(|(_, b)| b.intersects(&range))
                .map(|(i, _)| i)
                .collect();
            prop_assert_eq!(from_tree, expected);
        }
    }
}
