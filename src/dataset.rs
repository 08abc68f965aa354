// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Dataset assembly from a `root/<class_name>/*` image tree.

use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::catalog::ClassCatalog;
use crate::detector::PoseDetector;
use crate::error::{Result, SignError};
use crate::extractor::LandmarkExtractor;
use crate::landmarks::{FEATURE_DIM, FeatureVector};
use crate::{verbose, warn};

/// Index-aligned feature matrix and label list.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    features: Array2<f32>,
    labels: Vec<usize>,
}

/// Per-class outcome of a dataset build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassTally {
    /// Class name.
    pub name: String,
    /// Whether `root/<name>` existed.
    pub present: bool,
    /// Samples added.
    pub samples: usize,
    /// Files the image decoder rejected.
    pub unreadable: usize,
    /// Images where no hand was found.
    pub no_hand: usize,
}

impl Dataset {
    /// Create a dataset from a feature matrix and aligned labels.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the row count and label count differ
    /// or the matrix is not 63 columns wide.
    pub fn new(features: Array2<f32>, labels: Vec<usize>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(SignError::ConfigError(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }
        if features.ncols() != FEATURE_DIM {
            return Err(SignError::ConfigError(format!(
                "feature matrix has {} columns, expected {FEATURE_DIM}",
                features.ncols()
            )));
        }
        Ok(Self { features, labels })
    }

    /// Stack `(features, label)` samples into a dataset.
    #[must_use]
    pub fn from_samples(samples: &[(FeatureVector, usize)]) -> Self {
        let mut features = Array2::zeros((samples.len(), FEATURE_DIM));
        for (mut row, (vector, _)) in features.rows_mut().into_iter().zip(samples) {
            row.assign(&ArrayView1::from(&vector.as_slice()[..]));
        }
        let labels = samples.iter().map(|(_, label)| *label).collect();
        Self { features, labels }
    }

    /// Build a dataset from `root/<class_name>/*`.
    ///
    /// Missing class directories, undecodable files and images without a
    /// detected hand are skipped. Files are visited in sorted path order.
    ///
    /// # Errors
    ///
    /// Returns a dataset error if `root` is not a readable directory.
    pub fn build<D: PoseDetector>(
        root: &Path,
        catalog: &ClassCatalog,
        extractor: &mut LandmarkExtractor<D>,
    ) -> Result<Self> {
        Self::build_with_tally(root, catalog, extractor).map(|(dataset, _)| dataset)
    }

    /// Like [`build`](Self::build), also returning per-class counts.
    ///
    /// # Errors
    ///
    /// Returns a dataset error if `root` is not a readable directory.
    pub fn build_with_tally<D: PoseDetector>(
        root: &Path,
        catalog: &ClassCatalog,
        extractor: &mut LandmarkExtractor<D>,
    ) -> Result<(Self, Vec<ClassTally>)> {
        if !root.is_dir() {
            return Err(SignError::DatasetError(format!(
                "dataset root is not a directory: {}",
                root.display()
            )));
        }

        let mut samples = Vec::new();
        let mut tallies = Vec::with_capacity(catalog.len());

        for (label, name) in catalog.names().iter().enumerate() {
            let mut tally = ClassTally {
                name: name.clone(),
                ..ClassTally::default()
            };
            let dir = root.join(name);
            if !dir.is_dir() {
                warn!("No directory for class '{name}' under {}, skipping", root.display());
                tallies.push(tally);
                continue;
            }
            tally.present = true;

            for path in list_files(&dir)? {
                let Ok(image) = image::open(&path) else {
                    tally.unreadable += 1;
                    continue;
                };
                match extractor.extract(&image) {
                    Some(features) => {
                        samples.push((features, label));
                        tally.samples += 1;
                    }
                    None => tally.no_hand += 1,
                }
            }

            verbose!(
                "{name}: {} samples ({} without hand, {} unreadable)",
                tally.samples,
                tally.no_hand,
                tally.unreadable
            );
            tallies.push(tally);
        }

        Ok((Self::from_samples(&samples), tallies))
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when there are no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Raw feature matrix, one sample per row.
    #[must_use]
    pub fn features(&self) -> ArrayView2<'_, f32> {
        self.features.view()
    }

    /// Labels aligned with the feature rows.
    #[must_use]
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Sample count per label for a catalog of `num_classes`.
    #[must_use]
    pub fn class_counts(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0; num_classes];
        for &label in &self.labels {
            if let Some(count) = counts.get_mut(label) {
                *count += 1;
            }
        }
        counts
    }

    /// Check that every label is below `num_classes`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first bad label.
    pub fn check_labels(&self, num_classes: usize) -> Result<()> {
        match self.labels.iter().position(|&l| l >= num_classes) {
            Some(i) => Err(SignError::ConfigError(format!(
                "sample {i} has label {} outside the {num_classes}-class catalog",
                self.labels[i]
            ))),
            None => Ok(()),
        }
    }
}

/// Regular files in `dir`, sorted by path.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| SignError::DatasetError(format!("Failed to read {}: {e}", dir.display())))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();

    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_alignment() {
        assert!(Dataset::new(Array2::zeros((2, FEATURE_DIM)), vec![0]).is_err());
        assert!(Dataset::new(Array2::zeros((1, 3)), vec![0]).is_err());
        assert!(Dataset::new(Array2::zeros((1, FEATURE_DIM)), vec![0]).is_ok());
    }

    #[test]
    fn test_from_samples_keeps_order() {
        let a = FeatureVector::from_slice(&[0.1; FEATURE_DIM]).unwrap();
        let b = FeatureVector::from_slice(&[0.2; FEATURE_DIM]).unwrap();
        let dataset = Dataset::from_samples(&[(a, 1), (b, 0)]);

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.labels(), &[1, 0]);
        assert!((dataset.features()[[1, 5]] - 0.2).abs() < 1e-6);
        assert_eq!(dataset.class_counts(3), vec![1, 1, 0]);
    }

    #[test]
    fn test_empty_samples() {
        let dataset = Dataset::from_samples(&[]);
        assert!(dataset.is_empty());
        assert_eq!(dataset.features().dim(), (0, FEATURE_DIM));
    }

    #[test]
    fn test_check_labels() {
        let dataset = Dataset::new(Array2::zeros((1, FEATURE_DIM)), vec![3]).unwrap();
        assert!(dataset.check_labels(3).is_err());
        assert!(dataset.check_labels(4).is_ok());
    }
}
