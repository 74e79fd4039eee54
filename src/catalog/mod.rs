//! Label catalog for the classifier output
//!
//! The catalog is the ordered list of class names the model was trained on.
//! A label's position is its class id everywhere else in the crate, so the
//! file order must match the order of the model's output vector.
//!
//! Labels follow the PlantVillage "Plant___Condition" naming, e.g.
//! `Potato___Early_blight` or `Apple___healthy`.

pub mod filter;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::utils::error::{InferenceError, Result};

pub use filter::{filter, CropQuery};

/// Immutable, ordered list of class names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelCatalog {
    labels: Vec<String>,
}

impl LabelCatalog {
    /// Load the catalog from a newline-delimited text file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| InferenceError::CatalogLoad(path.to_path_buf(), e.to_string()))?;
        let catalog = Self::read_from(BufReader::new(file), path.to_path_buf())?;

        info!(
            "Loaded {} labels from {:?}",
            catalog.len(),
            path
        );

        Ok(catalog)
    }

    /// Load the catalog from any buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::read_from(reader, PathBuf::from("<reader>"))
    }

    /// Build a catalog from in-memory names, one per index
    pub fn from_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels
            .into_iter()
            .map(|s| s.into().trim().to_string())
            .collect();
        Self::validated(labels, PathBuf::from("<memory>"))
    }

    fn read_from<R: BufRead>(reader: R, origin: PathBuf) -> Result<Self> {
        // Every line keeps its position, blank ones included, so indices stay
        // aligned with the model output.
        let mut labels = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|e| InferenceError::CatalogLoad(origin.clone(), e.to_string()))?;
            labels.push(line.trim().to_string());
        }

        Self::validated(labels, origin)
    }

    fn validated(labels: Vec<String>, origin: PathBuf) -> Result<Self> {
        if labels.iter().all(|l| l.is_empty()) {
            return Err(InferenceError::CatalogLoad(
                origin,
                "catalog contains no labels".to_string(),
            ));
        }

        Ok(Self { labels })
    }

    /// Label at the given class index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// All labels with their class index, in index order
    pub fn items(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.labels.iter().map(String::as_str).enumerate()
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Distinct plant names (the part before `___`), in first-seen order
    pub fn crops(&self) -> Vec<&str> {
        let mut crops: Vec<&str> = Vec::new();
        for (_, label) in self.items() {
            let plant = label.split("___").next().unwrap_or(label);
            if !plant.is_empty() && !crops.contains(&plant) {
                crops.push(plant);
            }
        }
        crops
    }
}
