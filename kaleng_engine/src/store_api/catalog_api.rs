//! Unified API for reading and administering the product catalog.
use std::fmt::Debug;

use log::debug;

use crate::{
    db_types::{NewProduct, ProductUpdate, ProductWithVariants},
    traits::{CatalogApiError, CatalogManagement},
};

pub struct CatalogApi<B> {
    db: B,
}

impl<B: Debug> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi ({:?})", self.db)
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// Fetches a product and its variants. `None` if no such product exists.
    pub async fn product(&self, product_id: &str) -> Result<Option<ProductWithVariants>, CatalogApiError> {
        self.db.fetch_product(product_id).await
    }

    /// Fetches the whole catalog.
    pub async fn products(&self) -> Result<Vec<ProductWithVariants>, CatalogApiError> {
        self.db.fetch_products().await
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<ProductWithVariants, CatalogApiError> {
        let stored = self.db.create_product(product).await?;
        debug!("🗂️ Created product {} ({})", stored.product.name, stored.product.id);
        Ok(stored)
    }

    pub async fn update_product(
        &self,
        product_id: &str,
        update: ProductUpdate,
    ) -> Result<ProductWithVariants, CatalogApiError> {
        self.db.update_product(product_id, update).await
    }

    pub async fn delete_product(&self, product_id: &str) -> Result<(), CatalogApiError> {
        self.db.delete_product(product_id).await
    }
}
