//! Crop-scoped label filtering
//!
//! A label belongs to a crop when its lower-cased name starts with the
//! normalized crop query. This is a literal prefix test: "pot" matches
//! `Potato___Early_blight`, and callers rely on that.

use std::fmt;

use super::LabelCatalog;

/// A crop name as supplied by the caller, trimmed and lower-cased
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CropQuery(String);

impl CropQuery {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `label` belongs to this crop
    pub fn matches(&self, label: &str) -> bool {
        label.to_lowercase().starts_with(&self.0)
    }
}

impl fmt::Display for CropQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CropQuery {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Class indices whose label belongs to the crop, ascending
///
/// An empty result is not an error here.
pub fn filter(query: &CropQuery, catalog: &LabelCatalog) -> Vec<usize> {
    catalog
        .items()
        .filter(|(_, label)| query.matches(label))
        .map(|(index, _)| index)
        .collect()
}
