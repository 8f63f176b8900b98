//! 2D projection of a population for the history log.
//!
//! Projects each candidate onto the top two principal axes of the centered
//! population, the same reduction the training history uses to visualize
//! how a generation spreads through parameter space.

use nalgebra::{DMatrix, DVector, SymmetricEigen};

/// Projects a population onto its top two principal components.
///
/// Candidates are centered on the population mean before the axes are
/// computed. Populations with fewer than two candidates, or a search space
/// with a single dimension, project onto fewer meaningful axes; missing
/// components are zero. An empty population yields an empty projection.
///
/// All candidates must share one dimensionality; this is guaranteed for
/// populations produced by `CmaEs::ask`.
pub fn project_population(population: &[Vec<f64>]) -> Vec<[f64; 2]> {
    let n = population.len();
    if n == 0 {
        return Vec::new();
    }
    let dim = population[0].len();
    debug_assert!(population.iter().all(|c| c.len() == dim));
    if dim == 0 {
        return vec![[0.0, 0.0]; n];
    }

    // Center on the population mean
    let mut mean = vec![0.0; dim];
    for candidate in population {
        for (m, &x) in mean.iter_mut().zip(candidate.iter()) {
            *m += x;
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }

    let centered: Vec<DVector<f64>> = population
        .iter()
        .map(|candidate| {
            DVector::from_iterator(dim, candidate.iter().zip(mean.iter()).map(|(&x, &m)| x - m))
        })
        .collect();

    if n < 2 {
        return vec![[0.0, 0.0]; n];
    }

    // Sample covariance of the centered population
    let mut cov = DMatrix::zeros(dim, dim);
    for row in &centered {
        cov += row * row.transpose();
    }
    cov /= (n - 1) as f64;

    // Top two eigenvectors by eigenvalue
    let eigen = SymmetricEigen::new(cov);
    let mut order: Vec<usize> = (0..dim).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[b]
            .partial_cmp(&eigen.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let axes: Vec<DVector<f64>> = order
        .iter()
        .take(2)
        .map(|&i| eigen.eigenvectors.column(i).into_owned())
        .collect();

    centered
        .iter()
        .map(|row| {
            let mut point = [0.0; 2];
            for (slot, axis) in point.iter_mut().zip(axes.iter()) {
                *slot = row.dot(axis);
            }
            point
        })
        .collect()
}
