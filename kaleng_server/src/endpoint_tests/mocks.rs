use chrono::Duration;
use kaleng_engine::{
    db_types::{NewOrder, NewProduct, NewUser, Order, OrderId, OrderItem, OrderStatusType, ProductUpdate, ProductWithVariants, User},
    order_objects::{OrderQueryFilter, SweepResult},
    traits::{AccountApiError, AccountManagement, CatalogApiError, CatalogManagement, StorefrontDatabase, StorefrontError},
};
use mockall::mock;

mock! {
    pub AccountManager {}
    impl AccountManagement for AccountManager {
        async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, AccountApiError>;
        async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, AccountApiError>;
        async fn ensure_user(&self, user: NewUser) -> Result<User, AccountApiError>;
        async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, AccountApiError>;
        async fn fetch_order_items(&self, order: &Order) -> Result<Vec<OrderItem>, AccountApiError>;
        async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, AccountApiError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError>;
    }
}

mock! {
    pub Storefront {}
    impl Clone for Storefront {
        fn clone(&self) -> Self;
    }
    impl AccountManagement for Storefront {
        async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, AccountApiError>;
        async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, AccountApiError>;
        async fn ensure_user(&self, user: NewUser) -> Result<User, AccountApiError>;
        async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, AccountApiError>;
        async fn fetch_order_items(&self, order: &Order) -> Result<Vec<OrderItem>, AccountApiError>;
        async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, AccountApiError>;
        async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError>;
    }
    impl CatalogManagement for Storefront {
        async fn fetch_product(&self, product_id: &str) -> Result<Option<ProductWithVariants>, CatalogApiError>;
        async fn fetch_products(&self) -> Result<Vec<ProductWithVariants>, CatalogApiError>;
        async fn create_product(&self, product: NewProduct) -> Result<ProductWithVariants, CatalogApiError>;
        async fn update_product(&self, product_id: &str, update: ProductUpdate) -> Result<ProductWithVariants, CatalogApiError>;
        async fn delete_product(&self, product_id: &str) -> Result<(), CatalogApiError>;
    }
    impl StorefrontDatabase for Storefront {
        fn url(&self) -> &str;
        async fn place_order(&self, order: NewOrder) -> Result<Order, StorefrontError>;
        async fn mark_order_paid(&self, order_id: &OrderId) -> Result<(Order, bool), StorefrontError>;
        async fn cancel_order_with_restore(&self, order_id: &OrderId) -> Result<Order, StorefrontError>;
        async fn advance_order_status(&self, order_id: &OrderId, new_status: OrderStatusType) -> Result<Order, StorefrontError>;
        async fn expire_unpaid_orders(&self, limit: Duration) -> Result<SweepResult, StorefrontError>;
        async fn close(&mut self) -> Result<(), StorefrontError>;
    }
}
