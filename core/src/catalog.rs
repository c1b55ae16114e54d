use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::CATEGORIES;

/// Category name → ordered ingredient choices.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IngredientCatalog {
    categories: BTreeMap<String, Vec<String>>,
}

impl IngredientCatalog {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Catalog(format!("failed to read {}: {e}", path.display()))
        })?;
        let catalog = Self::from_json(&text)?;
        tracing::info!(
            path = %path.display(),
            categories = catalog.categories.len(),
            "loaded ingredient catalog"
        );
        Ok(catalog)
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let categories: BTreeMap<String, Vec<String>> =
            serde_json::from_str(text).map_err(|e| Error::Catalog(e.to_string()))?;
        Self::new(categories)
    }

    pub fn new(categories: BTreeMap<String, Vec<String>>) -> Result<Self> {
        for required in CATEGORIES {
            if !categories.contains_key(required) {
                return Err(Error::Catalog(format!("missing category '{required}'")));
            }
        }
        if let Some((name, _)) = categories.iter().find(|(_, choices)| choices.is_empty()) {
            return Err(Error::Catalog(format!("category '{name}' has no ingredients")));
        }
        Ok(Self { categories })
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn choices(&self, category: &str) -> Result<&[String]> {
        self.categories
            .get(category)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::not_found(format!("category '{category}'")))
    }
}
