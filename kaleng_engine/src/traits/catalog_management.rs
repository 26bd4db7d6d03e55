use thiserror::Error;

use crate::db_types::{NewProduct, ProductUpdate, ProductWithVariants};

/// Read and administer the product catalog.
///
/// This trait is the only legal writer of product and variant *rows*. The stock *counters* on those rows are owned
/// by the reservation protocol once orders start flowing; catalog writes set initial counts and may correct them,
/// but routine decrements and restorations only ever happen through [`super::StorefrontDatabase`].
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    /// Fetches a product and its variants. `None` if the product does not exist.
    async fn fetch_product(&self, product_id: &str) -> Result<Option<ProductWithVariants>, CatalogApiError>;

    /// Fetches the whole catalog, ordered by name.
    async fn fetch_products(&self) -> Result<Vec<ProductWithVariants>, CatalogApiError>;

    /// Creates a product together with its variants, returning the stored rows.
    async fn create_product(&self, product: NewProduct) -> Result<ProductWithVariants, CatalogApiError>;

    /// Applies a partial update to a product. A `variants` entry in the update replaces the variant set: variants
    /// are matched by name, new names are inserted, and names missing from the update are deleted.
    async fn update_product(
        &self,
        product_id: &str,
        update: ProductUpdate,
    ) -> Result<ProductWithVariants, CatalogApiError>;

    /// Deletes a product and its variants.
    async fn delete_product(&self, product_id: &str) -> Result<(), CatalogApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum CatalogApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(String),
    #[error("Nothing to update")]
    EmptyUpdate,
}

impl From<sqlx::Error> for CatalogApiError {
    fn from(e: sqlx::Error) -> Self {
        CatalogApiError::DatabaseError(e.to_string())
    }
}
