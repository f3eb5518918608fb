use std::cmp::Ordering::Equal;
use std::collections::BinaryHeap;

use ndarray::ArrayView2;
use ordered_float::OrderedFloat;

use crate::error::{CatalogError, CatalogResult};

/// Static k-d tree over points of run-time dimensionality.
///
/// Coordinates are stored flat, row major. `order` holds point indices
/// arranged so that every subtree occupies a contiguous block with its
/// splitting point in the middle, so the tree needs no node structs.
pub struct KdTree {
    points: Vec<f64>,
    order: Vec<usize>,
    dim: usize,
}

impl KdTree {
    /// Builds the tree over the rows of `points`. Fails if the set is empty,
    /// the dimension is zero, or any coordinate is non-finite.
    pub fn build(points: ArrayView2<f64>) -> CatalogResult<Self> {
        let n = points.nrows();
        let dim = points.ncols();
        if n == 0 || dim == 0 {
            return Err(CatalogError::IndexBuild {
                reason: format!("cannot index a {}x{} point set", n, dim),
            });
        }
        let flat: Vec<f64> = points.iter().copied().collect();
        if let Some(bad) = flat.iter().position(|x| !x.is_finite()) {
            return Err(CatalogError::IndexBuild {
                reason: format!(
                    "non-finite coordinate at point {} component {}",
                    bad / dim,
                    bad % dim
                ),
            });
        }
        let mut order: Vec<usize> = (0..n).collect();
        build_block(&flat, dim, &mut order, 0);
        Ok(KdTree {
            points: flat,
            order,
            dim,
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The `k` nearest points to `query`, as (distance, index) sorted by
    /// increasing distance. Returns every point when `k >= len()`.
    pub fn nearest(&self, query: &[f64], k: usize) -> Vec<(f64, usize)> {
        assert_eq!(query.len(), self.dim);
        let mut heap: BinaryHeap<(OrderedFloat<f64>, usize)> = BinaryHeap::with_capacity(k + 1);
        if k > 0 {
            self.nearest_block(&self.order, 0, query, k, &mut heap);
        }
        let mut out: Vec<(f64, usize)> = heap.into_iter().map(|(d, i)| (d.0, i)).collect();
        out.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Equal).then(a.1.cmp(&b.1)));
        out
    }

    /// Every point within `radius` of `query` (boundary inclusive), as
    /// (distance, index) sorted by increasing distance.
    pub fn within_radius(&self, query: &[f64], radius: f64) -> Vec<(f64, usize)> {
        assert_eq!(query.len(), self.dim);
        let mut out = Vec::new();
        self.radius_block(&self.order, 0, query, radius, &mut out);
        out.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Equal).then(a.1.cmp(&b.1)));
        out
    }

    fn coord(&self, point: usize, axis: usize) -> f64 {
        self.points[point * self.dim + axis]
    }

    fn distance(&self, point: usize, query: &[f64]) -> f64 {
        let start = point * self.dim;
        self.points[start..start + self.dim]
            .iter()
            .zip(query.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f64>()
            .sqrt()
    }

    fn nearest_block(
        &self,
        block: &[usize],
        depth: usize,
        query: &[f64],
        k: usize,
        heap: &mut BinaryHeap<(OrderedFloat<f64>, usize)>,
    ) {
        if block.is_empty() {
            return;
        }
        let mid = block.len() / 2;
        let point = block[mid];
        let d = self.distance(point, query);
        if heap.len() < k {
            heap.push((OrderedFloat(d), point));
        } else if let Some(&(worst, _)) = heap.peek() {
            if d < worst.0 {
                heap.pop();
                heap.push((OrderedFloat(d), point));
            }
        }
        let axis = depth % self.dim;
        let gap = query[axis] - self.coord(point, axis);
        let (near, far) = if gap < 0.0 {
            (&block[..mid], &block[mid + 1..])
        } else {
            (&block[mid + 1..], &block[..mid])
        };
        self.nearest_block(near, depth + 1, query, k, heap);
        let worst = heap.peek().map(|&(d, _)| d.0).unwrap_or(f64::INFINITY);
        if heap.len() < k || gap.abs() <= worst {
            self.nearest_block(far, depth + 1, query, k, heap);
        }
    }

    fn radius_block(
        &self,
        block: &[usize],
        depth: usize,
        query: &[f64],
        radius: f64,
        out: &mut Vec<(f64, usize)>,
    ) {
        if block.is_empty() {
            return;
        }
        let mid = block.len() / 2;
        let point = block[mid];
        let d = self.distance(point, query);
        if d <= radius {
            out.push((d, point));
        }
        let axis = depth % self.dim;
        let gap = query[axis] - self.coord(point, axis);
        if gap <= radius {
            self.radius_block(&block[..mid], depth + 1, query, radius, out);
        }
        if -gap <= radius {
            self.radius_block(&block[mid + 1..], depth + 1, query, radius, out);
        }
    }
}

fn build_block(points: &[f64], dim: usize, block: &mut [usize], depth: usize) {
    if block.len() < 2 {
        return;
    }
    let axis = depth % dim;
    let mid = block.len() / 2;
    block.select_nth_unstable_by(mid, |&a, &b| {
        points[a * dim + axis]
            .partial_cmp(&points[b * dim + axis])
            .unwrap_or(Equal)
    });
    let (left, right) = block.split_at_mut(mid);
    build_block(points, dim, left, depth + 1);
    build_block(points, dim, &mut right[1..], depth + 1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(n: usize, dim: usize, seed: u64) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((n, dim), |_| rng.gen_range(-1.0..1.0))
    }

    fn brute_distances(points: &Array2<f64>, query: &[f64]) -> Vec<(f64, usize)> {
        let mut all: Vec<(f64, usize)> = points
            .outer_iter()
            .enumerate()
            .map(|(i, row)| {
                let d = row
                    .iter()
                    .zip(query.iter())
                    .map(|(a, b)| (a - b).powi(2))
                    .sum::<f64>()
                    .sqrt();
                (d, i)
            })
            .collect();
        all.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
        all
    }

    #[test]
    fn nearest_matches_brute_force() {
        let points = random_points(200, 3, 11);
        let tree = KdTree::build(points.view()).unwrap();
        let queries = random_points(20, 3, 12);
        for q in queries.outer_iter() {
            let q = q.as_slice().unwrap();
            let got = tree.nearest(q, 7);
            let want = &brute_distances(&points, q)[..7];
            assert_eq!(got.len(), 7);
            for (g, w) in got.iter().zip(want.iter()) {
                assert_eq!(g.1, w.1);
                assert_abs_diff_eq!(g.0, w.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn radius_matches_brute_force() {
        let points = random_points(200, 2, 21);
        let tree = KdTree::build(points.view()).unwrap();
        let queries = random_points(20, 2, 22);
        for q in queries.outer_iter() {
            let q = q.as_slice().unwrap();
            let got = tree.within_radius(q, 0.4);
            let want: Vec<(f64, usize)> = brute_distances(&points, q)
                .into_iter()
                .filter(|&(d, _)| d <= 0.4)
                .collect();
            assert_eq!(got.len(), want.len());
            for (g, w) in got.iter().zip(want.iter()) {
                assert_eq!(g.1, w.1);
                assert_abs_diff_eq!(g.0, w.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn self_is_its_own_nearest_neighbor() {
        let points = random_points(50, 4, 31);
        let tree = KdTree::build(points.view()).unwrap();
        for (i, row) in points.outer_iter().enumerate() {
            let got = tree.nearest(row.as_slice().unwrap(), 1);
            assert_eq!(got[0].1, i);
            assert_abs_diff_eq!(got[0].0, 0.0, epsilon = 0.0);
        }
    }

    #[test]
    fn oversized_k_returns_all_points() {
        let points = random_points(8, 2, 41);
        let tree = KdTree::build(points.view()).unwrap();
        let got = tree.nearest(&[0.0, 0.0], 100);
        assert_eq!(got.len(), 8);
    }

    #[test]
    fn duplicate_points_share_zero_distance() {
        let points =
            Array2::from_shape_vec((3, 2), vec![1.0, 1.0, 1.0, 1.0, 5.0, 5.0]).unwrap();
        let tree = KdTree::build(points.view()).unwrap();
        let got = tree.nearest(&[1.0, 1.0], 2);
        assert_abs_diff_eq!(got[0].0, 0.0, epsilon = 0.0);
        assert_abs_diff_eq!(got[1].0, 0.0, epsilon = 0.0);
    }

    #[test]
    fn rejects_empty_and_non_finite_input() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert!(matches!(
            KdTree::build(empty.view()),
            Err(CatalogError::IndexBuild { .. })
        ));

        let mut points = random_points(5, 2, 51);
        points[(2, 1)] = f64::NAN;
        assert!(matches!(
            KdTree::build(points.view()),
            Err(CatalogError::IndexBuild { .. })
        ));
    }
}
