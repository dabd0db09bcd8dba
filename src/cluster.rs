//! Mini-batch k-means over geographic points, built on `linfa-clustering`.
//!
//! Rows are shuffled and cut into batches of [`ClusterParams::batch_size`].
//! The first batch seeds the model with a full k-means++ fit; the remaining
//! batches update it through the incremental [`FitWith`] path. All randomness
//! comes from one [`StdRng`], so a fixed [`ClusterParams::seed`] reproduces a
//! run exactly.

use std::collections::HashMap;

use linfa::DatasetBase;
use linfa::traits::{Fit, FitWith, Predict};
use linfa_clustering::{IncrKMeansError, KMeans, KMeansError};
use ndarray::{Array2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::views::LatLon;

pub const MAX_CLUSTERS: usize = 20;
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// How many independently seeded runs to make; the lowest-inertia run wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitRuns {
    /// One run, which is enough with k-means++ seeding.
    Auto,
    Fixed(usize),
}

impl InitRuns {
    fn count(self) -> usize {
        match self {
            InitRuns::Auto => 1,
            InitRuns::Fixed(n) => n.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterParams {
    pub k: usize,
    pub batch_size: usize,
    pub n_init: InitRuns,
    /// Upper bound on Lloyd iterations for the seed fit and on passes over
    /// the data for the batch updates.
    pub max_iter: usize,
    /// Stop after this many batch updates without a lower model inertia.
    pub max_no_improvement: usize,
    pub seed: Option<u64>,
}

impl ClusterParams {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            batch_size: DEFAULT_BATCH_SIZE,
            n_init: InitRuns::Auto,
            max_iter: 100,
            max_no_improvement: 10,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_runs(mut self, n_init: InitRuns) -> Self {
        self.n_init = n_init;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(1..=MAX_CLUSTERS).contains(&self.k) {
            return Err(Error::input(format!(
                "cluster count must be between 1 and {MAX_CLUSTERS}, got {}",
                self.k
            )));
        }
        if self.batch_size == 0 {
            return Err(Error::input("batch size must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterModel {
    pub centroids: Vec<LatLon>,
    /// Cluster index of each input point, in input order.
    pub labels: Vec<usize>,
    /// Sum of squared distances from each point to its centroid.
    pub inertia: f64,
}

impl ClusterModel {
    pub fn member_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.centroids.len()];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}

/// Partitions `points` into exactly `params.k` clusters.
///
/// When there are fewer distinct points than `k`, every distinct point becomes
/// a centroid and the rest repeat them; every point still gets a label in
/// `[0, k)`.
///
/// # Errors
///
/// Returns [`Error::Input`] if `points` is empty or the parameters are out of
/// range, and [`Error::Cluster`] if the k-means fit itself fails.
#[tracing::instrument(skip(points), fields(points = points.len(), k = params.k))]
pub fn fit(points: &[LatLon], params: &ClusterParams) -> Result<ClusterModel> {
    params.validate()?;
    if points.is_empty() {
        return Err(Error::input("no points to cluster"));
    }

    let (distinct, distinct_labels) = distinct_points(points);
    if distinct.len() < params.k {
        debug!(distinct = distinct.len(), "Fewer distinct points than clusters");
        return Ok(ClusterModel {
            centroids: distinct.iter().cycle().take(params.k).copied().collect(),
            labels: distinct_labels,
            inertia: 0.0,
        });
    }

    let records = Array2::from_shape_vec(
        (points.len(), 2),
        points.iter().flat_map(|p| [p.lat, p.lon]).collect(),
    )
    .map_err(|e| Error::input(format!("malformed point matrix: {e}")))?;

    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.shuffle(&mut rng);
    let batches: Vec<Array2<f64>> = order
        .chunks(params.batch_size)
        .map(|rows| records.select(Axis(0), rows))
        .collect();

    let kmeans = KMeans::params_with_rng(params.k, rng)
        .n_runs(params.n_init.count())
        .max_n_iterations(params.max_iter as u64);

    // k-means++ needs at least k distinct rows to draw from
    let seed_rows = if distinct_rows(&batches[0]) >= params.k {
        batches[0].clone()
    } else {
        records.clone()
    };
    let mut model = kmeans.fit(&DatasetBase::from(seed_rows))?;

    if batches.len() > 1 {
        let mut best = model.inertia();
        let mut stalled = 0;
        'passes: for pass in 0..params.max_iter {
            for batch in &batches {
                let data = DatasetBase::from(batch.view());
                match kmeans.fit_with(Some(model), &data) {
                    Ok(converged) => {
                        debug!(pass, "Batch centroids converged");
                        model = converged;
                        break 'passes;
                    }
                    Err(IncrKMeansError::NotConverged(updated)) => model = updated,
                    Err(IncrKMeansError::InvalidParams(e)) => {
                        return Err(KMeansError::InvalidParams(e).into());
                    }
                    Err(IncrKMeansError::LinfaError(e)) => {
                        return Err(KMeansError::LinfaError(e).into());
                    }
                }

                if model.inertia() < best {
                    best = model.inertia();
                    stalled = 0;
                } else {
                    stalled += 1;
                    if stalled >= params.max_no_improvement {
                        debug!(pass, "Batch inertia stalled, stopping early");
                        break 'passes;
                    }
                }
            }
        }
    }

    let centroids: Vec<LatLon> = model
        .centroids()
        .rows()
        .into_iter()
        .map(|row| LatLon { lat: row[0], lon: row[1] })
        .collect();
    let labels: Vec<usize> = model.predict(records).targets.into_iter().collect();
    let inertia = points
        .iter()
        .zip(&labels)
        .map(|(p, &c)| dist2(p, &centroids[c]))
        .sum();
    debug!(inertia, "Mini-batch k-means finished");

    Ok(ClusterModel {
        centroids,
        labels,
        inertia,
    })
}

fn dist2(a: &LatLon, b: &LatLon) -> f64 {
    (a.lat - b.lat).powi(2) + (a.lon - b.lon).powi(2)
}

/// Distinct points in first-seen order, plus each input point's index into them.
fn distinct_points(points: &[LatLon]) -> (Vec<LatLon>, Vec<usize>) {
    let mut index: HashMap<(u64, u64), usize> = HashMap::new();
    let mut distinct = Vec::new();
    let labels = points
        .iter()
        .map(|p| {
            *index.entry((p.lat.to_bits(), p.lon.to_bits())).or_insert_with(|| {
                distinct.push(*p);
                distinct.len() - 1
            })
        })
        .collect();
    (distinct, labels)
}

fn distinct_rows(rows: &Array2<f64>) -> usize {
    let mut seen: Vec<(u64, u64)> = rows
        .rows()
        .into_iter()
        .map(|r| (r[0].to_bits(), r[1].to_bits()))
        .collect();
    seen.sort_unstable();
    seen.dedup();
    seen.len()
}
