//! Initial catalog data.
//!
//! Seeding is idempotent: records whose id already exists are left untouched,
//! so running it against a live store never overwrites edits.

use serde::Deserialize;
use tracing::instrument;

use super::{RepositoryError, Store};
use crate::models::{Category, Product, Testimonial};

const BUNDLED_CATALOG: &str = include_str!("../../seed/catalog.yaml");

/// Error loading seed data.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("invalid seed document: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Records to insert into an empty store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub testimonials: Vec<Testimonial>,
}

/// How many records a seeding run inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub products: usize,
    pub testimonials: usize,
}

impl SeedData {
    /// The catalog shipped with the crate.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Parse` if the bundled YAML is malformed.
    pub fn bundled() -> Result<Self, SeedError> {
        Self::from_yaml(BUNDLED_CATALOG)
    }

    /// Parse a seed document.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Parse` if `source` is not a valid seed document.
    pub fn from_yaml(source: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Insert every record that is not already present.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Repository` if any insert fails.
    #[instrument(skip_all)]
    pub async fn apply(&self, store: &dyn Store) -> Result<SeedReport, SeedError> {
        let mut report = SeedReport::default();

        for category in &self.categories {
            if store.insert_category_if_absent(category).await? {
                report.categories += 1;
            }
        }
        for product in &self.products {
            if store.insert_product_if_absent(product).await? {
                report.products += 1;
            }
        }
        for testimonial in &self.testimonials {
            if store.insert_testimonial_if_absent(testimonial).await? {
                report.testimonials += 1;
            }
        }

        tracing::info!(
            categories = report.categories,
            products = report.products,
            testimonials = report.testimonials,
            "Seed data applied"
        );
        Ok(report)
    }
}
