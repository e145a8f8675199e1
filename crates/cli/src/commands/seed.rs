//! Catalog seeding command.
//!
//! Inserts categories, products and testimonials that are not already
//! present. Running it twice is harmless.

use std::path::Path;

use tracing::info;

use bazaar_api::db::seed::SeedData;
use bazaar_api::db::{self, PgStore, Store};

use super::{CommandError, database_url};

/// Seed the database from `file`, or from the bundled catalog.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if database
/// operations fail.
pub async fn run(file: Option<&Path>) -> Result<(), CommandError> {
    // Parse before connecting so a bad file fails fast.
    let data = match file {
        Some(path) => {
            info!(path = %path.display(), "Loading catalog from file");
            let content =
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| CommandError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
            SeedData::from_yaml(&content)?
        }
        None => SeedData::bundled()?,
    };
    info!(
        categories = data.categories.len(),
        products = data.products.len(),
        testimonials = data.testimonials.len(),
        "Parsed catalog"
    );

    let pool = db::create_pool(&database_url()?).await?;
    let store = PgStore::new(pool);
    store.ping().await?;
    info!("Connected to database");

    let report = data.apply(&store).await?;

    info!("Seeding complete!");
    info!("  Categories inserted: {}", report.categories);
    info!("  Products inserted: {}", report.products);
    info!("  Testimonials inserted: {}", report.testimonials);
    Ok(())
}
