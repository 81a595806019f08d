//! Nearest-neighbor index over (lat, lon) points.
//!
//! A static 2-d tree with planar (degree-space) distance. Built once per
//! reconciliation direction. Ties on distance resolve to the lowest point
//! index, so queries are reproducible regardless of tree shape.

use ordered_float::OrderedFloat;

use crate::error::ReconError;
use crate::model::Coordinate;

/// Result of a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest {
    pub distance: f64,
    /// Position of the neighbor in the slice the index was built from.
    pub index: usize,
}

#[derive(Debug)]
struct Node {
    point: usize,
    axis: Axis,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    fn value(self, c: &Coordinate) -> f64 {
        match self {
            Self::Latitude => c.latitude,
            Self::Longitude => c.longitude,
        }
    }

    fn next(self) -> Self {
        match self {
            Self::Latitude => Self::Longitude,
            Self::Longitude => Self::Latitude,
        }
    }
}

#[derive(Debug)]
pub struct SpatialIndex {
    points: Vec<Coordinate>,
    nodes: Vec<Node>,
    root: usize,
}

impl SpatialIndex {
    /// Build over `points`. Fails with `EmptyIndex` when there are none.
    pub fn build(points: &[Coordinate]) -> Result<Self, ReconError> {
        if points.is_empty() {
            return Err(ReconError::EmptyIndex);
        }
        let mut order: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        let root = build_subtree(points, &mut order, Axis::Latitude, &mut nodes)
            .ok_or(ReconError::EmptyIndex)?;
        Ok(Self {
            points: points.to_vec(),
            nodes,
            root,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Closest indexed point to `query`.
    pub fn query_nearest(&self, query: &Coordinate) -> Nearest {
        let mut best = Best {
            dist_sq: f64::INFINITY,
            index: usize::MAX,
        };
        self.search(self.root, query, &mut best);
        Nearest {
            distance: best.dist_sq.sqrt(),
            index: best.index,
        }
    }

    fn search(&self, node_id: usize, query: &Coordinate, best: &mut Best) {
        let node = &self.nodes[node_id];
        let point = &self.points[node.point];
        best.offer(query.planar_distance_sq(point), node.point);

        let diff = node.axis.value(query) - node.axis.value(point);
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };
        if let Some(n) = near {
            self.search(n, query, best);
        }
        // Equal splitting distance can still hide a lower-index tie.
        if let Some(f) = far {
            if diff * diff <= best.dist_sq {
                self.search(f, query, best);
            }
        }
    }
}

struct Best {
    dist_sq: f64,
    index: usize,
}

impl Best {
    fn offer(&mut self, dist_sq: f64, index: usize) {
        if dist_sq < self.dist_sq || (dist_sq == self.dist_sq && index < self.index) {
            self.dist_sq = dist_sq;
            self.index = index;
        }
    }
}

fn build_subtree(
    points: &[Coordinate],
    order: &mut [usize],
    axis: Axis,
    nodes: &mut Vec<Node>,
) -> Option<usize> {
    if order.is_empty() {
        return None;
    }
    order.sort_by_key(|&i| (OrderedFloat(axis.value(&points[i])), i));
    let mid = order.len() / 2;
    let point = order[mid];

    let id = nodes.len();
    nodes.push(Node {
        point,
        axis,
        left: None,
        right: None,
    });

    let (lower, rest) = order.split_at_mut(mid);
    let upper = &mut rest[1..];
    let left = build_subtree(points, lower, axis.next(), nodes);
    let right = build_subtree(points, upper, axis.next(), nodes);
    nodes[id].left = left;
    nodes[id].right = right;
    Some(id)
}
