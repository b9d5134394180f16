// src/classify.rs
use eyre::{eyre, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::GraphError;

/// A pre-trained k-means model, loaded once at startup and read-only after.
///
/// The file carries the cluster centroids and, optionally, per-feature
/// standardization parameters applied before the distance computation.
#[derive(Debug, Clone, Deserialize)]
pub struct KMeansModel {
    centroids: Vec<Vec<f64>>,
    #[serde(default)]
    means: Option<Vec<f64>>,
    #[serde(default)]
    stds: Option<Vec<f64>>,
}

impl KMeansModel {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| eyre!("could not read model file {}: {}", path.display(), e))?;
        let model: KMeansModel = serde_json::from_str(&text)
            .map_err(|e| eyre!("could not parse model file {}: {}", path.display(), e))?;
        let dim = model.n_features();
        if dim == 0 || model.centroids.is_empty() {
            return Err(eyre!("model has no centroids"));
        }
        if model.centroids.iter().any(|c| c.len() != dim) {
            return Err(eyre!("model centroids have inconsistent dimensions"));
        }
        for scaler in [&model.means, &model.stds] {
            if let Some(v) = scaler {
                if v.len() != dim {
                    return Err(eyre!("model scaler length does not match centroids"));
                }
            }
        }
        info!(
            "loaded k-means model: {} clusters, {} features",
            model.centroids.len(),
            dim
        );
        Ok(model)
    }

    pub fn n_features(&self) -> usize {
        self.centroids.first().map(|c| c.len()).unwrap_or(0)
    }

    /// Nearest-centroid lookup. The only failure mode is a feature vector
    /// whose length does not match the model.
    pub fn predict(&self, features: &[f64]) -> Result<usize, GraphError> {
        let want = self.n_features();
        if features.len() != want {
            return Err(GraphError::Classification {
                got: features.len(),
                want,
            });
        }
        let scaled = self.scale(features);
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (i, centroid) in self.centroids.iter().enumerate() {
            let dist: f64 = centroid
                .iter()
                .zip(&scaled)
                .map(|(c, x)| (c - x) * (c - x))
                .sum();
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        Ok(best)
    }

    fn scale(&self, features: &[f64]) -> Vec<f64> {
        match (&self.means, &self.stds) {
            (Some(means), Some(stds)) => features
                .iter()
                .zip(means.iter().zip(stds))
                .map(|(x, (m, s))| if *s != 0.0 { (x - m) / s } else { x - m })
                .collect(),
            _ => features.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn model(centroids: Vec<Vec<f64>>) -> KMeansModel {
        KMeansModel {
            centroids,
            means: None,
            stds: None,
        }
    }

    #[test]
    fn predicts_nearest_centroid() {
        let m = model(vec![vec![0.0; 8], vec![10.0; 8]]);
        let mut near_second = vec![9.0; 8];
        near_second[0] = 11.0;
        assert_eq!(m.predict(&vec![1.0; 8]).unwrap(), 0);
        assert_eq!(m.predict(&near_second).unwrap(), 1);
    }

    #[test]
    fn mismatched_vector_length_is_a_classification_error() {
        let m = model(vec![vec![0.0; 8]]);
        let err = m.predict(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            GraphError::Classification { got: 2, want: 8 }
        ));
    }

    #[test]
    fn scaler_parameters_shift_the_decision() {
        // Unscaled, 100 is nearer to centroid 1. With mean 100 / std 10 the
        // standardized value 0 lands on centroid 0.
        let m = KMeansModel {
            centroids: vec![vec![0.0], vec![50.0]],
            means: Some(vec![100.0]),
            stds: Some(vec![10.0]),
        };
        assert_eq!(m.predict(&[100.0]).unwrap(), 0);
    }

    #[test]
    fn loads_from_json_file() {
        let mut f = NamedTempFile::new().unwrap();
        write!(
            f,
            r#"{{"centroids": [[0,0,0,0,0,0,0,0],[1,1,1,1,1,1,1,1]]}}"#
        )
        .unwrap();
        let m = KMeansModel::load(f.path()).unwrap();
        assert_eq!(m.n_features(), 8);
        assert_eq!(m.predict(&vec![0.9; 8]).unwrap(), 1);
    }

    #[test]
    fn rejects_ragged_centroids() {
        let mut f = NamedTempFile::new().unwrap();
        write!(f, r#"{{"centroids": [[0,0],[1,1,1]]}}"#).unwrap();
        assert!(KMeansModel::load(f.path()).is_err());
    }
}
