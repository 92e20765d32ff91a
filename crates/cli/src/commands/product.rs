//! Catalog import.
//!
//! The file is a YAML list of products in the same shape the API uses:
//!
//! ```yaml
//! - id: 0b9a4f6e-2f6c-4a55-9d27-6f0f4c1f1a01
//!   name: Teapot
//!   price: "30.00"
//!   stock: 12
//!   variants:
//!     - name: Color
//!       options:
//!         - id: 5d0c1d1e-8a55-4a0f-bb42-2b2a5e7c9c11
//!           name: Blue
//!           additionalPrice: "2.50"
//! ```
//!
//! Every product is validated before anything is written.

use std::path::Path;

use cartwright_core::Product;
use cartwright_storefront::db::{PgStore, ProductStore};

use super::{CommandError, connect};

/// Parse a catalog and check every product.
fn parse_catalog(content: &str) -> Result<Vec<Product>, CommandError> {
    let products: Vec<Product> = serde_yaml::from_str(content)?;

    let mut invalid = 0_usize;
    for product in &products {
        if let Err(reason) = product.validate() {
            tracing::error!(product_id = %product.id, name = %product.name, "{reason}");
            invalid += 1;
        }
    }

    if invalid > 0 {
        return Err(CommandError::InvalidProducts(invalid));
    }
    Ok(products)
}

/// Insert or update every product in `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any product is
/// invalid, or a database write fails.
pub async fn import(path: &Path) -> Result<(), CommandError> {
    tracing::info!(path = %path.display(), "Loading catalog");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CommandError::Io {
            path: path.display().to_string(),
            source,
        })?;
    let products = parse_catalog(&content)?;
    tracing::info!(products = products.len(), "Catalog validated");

    let store = PgStore::new(connect().await?);
    for product in &products {
        store.upsert_product(product).await?;
        tracing::debug!(product_id = %product.id, "Upserted product");
    }

    tracing::info!("Imported {} products", products.len());
    Ok(())
}
