mod shipping;

pub use shipping::{CourierRate, CourierRatesApi, RateItem, RateRequest, ShippingConfig};
