use indexmap::IndexMap;

use super::geometry::{Point, Rect};
use super::item::DragItem;

/// Which test produced a collision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The pointer is inside the droppable
    PointerWithin,
    /// The dragged box overlaps the droppable
    RectIntersection,
    /// Nearest droppable by corner distance
    ClosestCorners,
}

/// A candidate drop target. Lower `value` ranks first, except for
/// rectangle intersection where it is the overlap ratio and higher wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub item: DragItem,
    pub value: f64,
    pub strategy: Strategy,
}

/// Registry of droppable regions and the layered target search over them.
///
/// Registration order is kept and breaks ties between equally ranked
/// candidates.
#[derive(Debug, Clone, Default)]
pub struct CollisionDetector {
    droppables: IndexMap<DragItem, Rect>,
}

impl CollisionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a droppable, or update its bounds if already present.
    pub fn register(&mut self, item: DragItem, rect: Rect) -> Option<Rect> {
        self.droppables.insert(item, rect)
    }

    pub fn unregister(&mut self, item: &DragItem) -> Option<Rect> {
        self.droppables.shift_remove(item)
    }

    pub fn clear(&mut self) {
        self.droppables.clear();
    }

    pub fn rect(&self, item: &DragItem) -> Option<Rect> {
        self.droppables.get(item).copied()
    }

    pub fn len(&self) -> usize {
        self.droppables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.droppables.is_empty()
    }

    /// Ranked drop candidates for a dragged box at `active` with the pointer
    /// at `pointer`. Tries pointer containment, then box overlap, then
    /// closest corners; the first non-empty result wins. Only empty when
    /// nothing is registered.
    pub fn detect(&self, active: Rect, pointer: Option<Point>) -> Vec<Collision> {
        if let Some(pointer) = pointer {
            let hits = pointer_within(&self.droppables, pointer);
            if !hits.is_empty() {
                return hits;
            }
        }
        let hits = rect_intersection(&self.droppables, active);
        if !hits.is_empty() {
            return hits;
        }
        closest_corners(&self.droppables, active)
    }

    /// The best candidate, if any.
    pub fn best(&self, active: Rect, pointer: Option<Point>) -> Option<DragItem> {
        self.detect(active, pointer)
            .into_iter()
            .next()
            .map(|c| c.item)
    }
}

/// Droppables containing the pointer, nearest corners first.
pub fn pointer_within(droppables: &IndexMap<DragItem, Rect>, pointer: Point) -> Vec<Collision> {
    let mut hits: Vec<Collision> = droppables
        .iter()
        .filter(|(_, rect)| rect.contains(pointer))
        .map(|(item, rect)| Collision {
            item: item.clone(),
            value: mean_distance(&rect.corners(), &[pointer; 4]),
            strategy: Strategy::PointerWithin,
        })
        .collect();
    hits.sort_by(|a, b| a.value.total_cmp(&b.value));
    hits
}

/// Droppables overlapping `active`, largest overlap ratio first.
pub fn rect_intersection(droppables: &IndexMap<DragItem, Rect>, active: Rect) -> Vec<Collision> {
    let mut hits: Vec<Collision> = droppables
        .iter()
        .filter_map(|(item, rect)| {
            let overlap = rect.intersection_area(&active);
            if overlap <= 0.0 {
                return None;
            }
            let union = rect.area() + active.area() - overlap;
            Some(Collision {
                item: item.clone(),
                value: overlap / union,
                strategy: Strategy::RectIntersection,
            })
        })
        .collect();
    hits.sort_by(|a, b| b.value.total_cmp(&a.value));
    hits
}

/// Every droppable, ranked by mean distance between corresponding corners.
pub fn closest_corners(droppables: &IndexMap<DragItem, Rect>, active: Rect) -> Vec<Collision> {
    let active_corners = active.corners();
    let mut hits: Vec<Collision> = droppables
        .iter()
        .map(|(item, rect)| Collision {
            item: item.clone(),
            value: mean_distance(&rect.corners(), &active_corners),
            strategy: Strategy::ClosestCorners,
        })
        .collect();
    hits.sort_by(|a, b| a.value.total_cmp(&b.value));
    hits
}

fn mean_distance(a: &[Point; 4], b: &[Point; 4]) -> f64 {
    a.iter().zip(b).map(|(p, q)| p.distance(q)).sum::<f64>() / 4.0
}
