mod accounts_api;
mod catalog_api;
mod order_flow_api;

pub use accounts_api::AccountApi;
pub use catalog_api::CatalogApi;
pub use order_flow_api::OrderFlowApi;
