use log::debug;
use ndarray::ArrayView2;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use rayon::ThreadPoolBuilder;

use crate::error::{CatalogError, CatalogResult};
use crate::kdtree::KdTree;

/// Default worker count: every available core but one, never less than one.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().saturating_sub(1).max(1))
        .unwrap_or(1)
}

/// Importance weights matching the local density of `target` to `reference`.
///
/// For every row of `target`, the distance to its `k_neighbors`-th nearest
/// neighbor within `target` itself (self excluded) becomes that point's
/// density radius. The raw weight is the number of `reference` rows within
/// that radius, boundary inclusive; weights are returned normalized to sum
/// to one, aligned with the rows of `target`.
///
/// The radius is always derived from `target` and probed against
/// `reference`, never the other way around.
///
/// Both sets must be non-empty and share one dimensionality, and
/// `k_neighbors` must lie in `1..target.nrows()`. `concurrency` sizes the
/// worker pool used for both query phases; `None` means
/// [`default_concurrency`]. The pool lives only for the duration of the
/// call.
pub fn compute_weights(
    reference: ArrayView2<f64>,
    target: ArrayView2<f64>,
    k_neighbors: usize,
    concurrency: Option<usize>,
) -> CatalogResult<Vec<f64>> {
    if reference.nrows() == 0 {
        return Err(CatalogError::invalid("reference point set is empty"));
    }
    if target.nrows() == 0 {
        return Err(CatalogError::invalid("target point set is empty"));
    }
    if reference.ncols() != target.ncols() {
        return Err(CatalogError::invalid(format!(
            "reference points have {} features but target points have {}",
            reference.ncols(),
            target.ncols()
        )));
    }
    if k_neighbors == 0 {
        return Err(CatalogError::invalid("k_neighbors must be positive"));
    }
    if k_neighbors >= target.nrows() {
        return Err(CatalogError::invalid(format!(
            "k_neighbors = {} but the target set only has {} points",
            k_neighbors,
            target.nrows()
        )));
    }

    let workers = concurrency.unwrap_or_else(default_concurrency).max(1);
    let pool = ThreadPoolBuilder::new().num_threads(workers).build()?;

    let queries: Vec<Vec<f64>> = target.outer_iter().map(|row| row.to_vec()).collect();

    let target_tree = KdTree::build(target)?;
    debug!(
        "density radii over {} target points, k = {}, {} workers",
        target.nrows(),
        k_neighbors,
        workers
    );
    let radii: Vec<f64> = pool.install(|| {
        queries
            .par_iter()
            .map(|q| {
                let hood = target_tree.nearest(q, k_neighbors + 1);
                hood.last().map(|&(d, _)| d).unwrap_or(0.0)
            })
            .collect()
    });

    let reference_tree = KdTree::build(reference)?;
    debug!(
        "radius counts against {} reference points",
        reference.nrows()
    );
    let counts: Vec<f64> = pool.install(|| {
        queries
            .par_iter()
            .zip(radii.par_iter())
            .map(|(q, &r)| reference_tree.within_radius(q, r).len() as f64)
            .collect()
    });

    let total: f64 = counts.iter().sum();
    if total == 0.0 {
        return Err(CatalogError::DegenerateDistribution);
    }
    debug!("{} reference neighbors over the whole target set", total);
    Ok(counts.into_iter().map(|c| c / total).collect())
}
