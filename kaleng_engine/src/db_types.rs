use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use kls_common::Rupiah;
use rand::distributions::{Alphanumeric, DistString};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------        Role        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "User"),
            Role::Admin => write!(f, "Admin"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(pub String);

impl FromStr for Role {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(Self::User),
            "Admin" => Ok(Self::Admin),
            s => Err(ConversionError(format!("Invalid role: {s}"))),
        }
    }
}

//--------------------------------------        User        ---------------------------------------------------------
/// A storefront account holder. Authentication lives in an external service; this row exists so that orders have an
/// owner and so the back office can tell admins from customers.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub id: String,
    pub name: Option<String>,
    pub email: String,
}

//--------------------------------------      Product        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Rupiah,
    /// Only authoritative while the product has no variants; see [`ProductWithVariants::tracks_variant_stock`].
    pub stock: i64,
    /// A label for what the variants of this product represent, e.g. "Color" or "Nozzle size".
    pub variant_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      Variant        ---------------------------------------------------------
/// A stock-tracked sub-option of a product. Each variant carries its own counter; the parent product's `stock`
/// column stops being authoritative the moment the first variant exists.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Variant {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub stock: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product together with its variants, as returned by catalog lookups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductWithVariants {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<Variant>,
}

impl ProductWithVariants {
    /// True when saleability is decided per variant rather than on the product row.
    pub fn tracks_variant_stock(&self) -> bool {
        !self.variants.is_empty()
    }
}

//--------------------------------------   New catalog rows  ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Rupiah,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub variant_type: Option<String>,
    #[serde(default)]
    pub variants: Vec<NewVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVariant {
    pub name: String,
    #[serde(default)]
    pub stock: i64,
}

/// A partial update to a product, applied through product administration. Absent fields are left unchanged.
/// When `variants` is present it replaces the variant set wholesale (matched by name, new names inserted,
/// missing names removed).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Rupiah>,
    pub stock: Option<i64>,
    pub variant_type: Option<String>,
    pub variants: Option<Vec<NewVariant>>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock.is_none()
            && self.variant_type.is_none()
            && self.variants.is_none()
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order is placed and stock is reserved, but payment has not been confirmed.
    Unpaid,
    /// Payment confirmed by the gateway (or manually by an admin).
    Paid,
    /// Packed for shipment by the back office.
    Packed,
    /// Handed to the courier.
    Shipped,
    /// Delivered and closed. Terminal.
    Completed,
    /// Annulled by the customer, the gateway, an admin, or the expiry sweep. Reserved stock has been returned.
    /// Terminal.
    Cancelled,
}

impl OrderStatusType {
    /// True for states no transition may leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Completed | OrderStatusType::Cancelled)
    }

    /// The set of states a transition into `self` may start from. Encodes the lifecycle graph:
    /// Unpaid → Paid → Packed → Shipped → Completed, with Cancelled reachable from Unpaid and Paid only.
    /// Admin moves may skip forward along the chain, but nothing ever moves backwards.
    pub fn allowed_sources(&self) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match self {
            Unpaid => &[],
            Paid => &[Unpaid],
            Packed => &[Paid],
            Shipped => &[Paid, Packed],
            Completed => &[Paid, Packed, Shipped],
            Cancelled => &[Unpaid, Paid],
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Unpaid => write!(f, "Unpaid"),
            OrderStatusType::Paid => write!(f, "Paid"),
            OrderStatusType::Packed => write!(f, "Packed"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Completed => write!(f, "Completed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unpaid" => Ok(Self::Unpaid),
            "Paid" => Ok(Self::Paid),
            "Packed" => Ok(Self::Packed),
            "Shipped" => Ok(Self::Shipped),
            "Completed" => Ok(Self::Completed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------       OrderId       ---------------------------------------------------------
/// The public identifier of an order. This is the value shared with the customer and used as the correlation id at
/// the payment gateway; the row's integer primary key stays internal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh order id, e.g. "KLS-T8WQNRB0F2ZJ".
    pub fn random() -> Self {
        let suffix = Alphanumeric.sample_string(&mut rand::thread_rng(), 12).to_uppercase();
        Self(format!("KLS-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub user_id: String,
    pub status: OrderStatusType,
    /// Free-text shipping address as entered at checkout.
    pub address: String,
    pub total: Rupiah,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      OrderItem      ---------------------------------------------------------
/// A line of an order. `price` is the unit price copied from the product row at order time, so later catalog edits
/// never rewrite order history. Immutable once written.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: String,
    pub variant_id: Option<String>,
    pub variant_name: Option<String>,
    pub quantity: i64,
    pub price: Rupiah,
}

//--------------------------------------       NewOrder      ---------------------------------------------------------
/// A checkout request as submitted by a customer. Prices are deliberately absent: the engine snapshots them from
/// the catalog during reservation and never trusts the client for them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub user_id: String,
    pub address: String,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn new(user_id: String, address: String, items: Vec<NewOrderItem>) -> Self {
        Self { order_id: OrderId::random(), user_id, address, items }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub product_id: String,
    #[serde(default)]
    pub variant_id: Option<String>,
    pub quantity: i64,
}

/// An order line after the validation pass: the stock counter it draws from is resolved and the unit price is
/// snapshotted. This is what the reservation and insert steps operate on.
#[derive(Debug, Clone)]
pub struct ResolvedOrderLine {
    pub product_id: String,
    pub product_name: String,
    pub variant_id: Option<String>,
    pub variant_name: Option<String>,
    pub quantity: i64,
    pub unit_price: Rupiah,
}

impl ResolvedOrderLine {
    pub fn line_total(&self) -> Rupiah {
        self.unit_price * self.quantity
    }
}
