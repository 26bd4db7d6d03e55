//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause
//! the current worker to stop processing new requests. Any long, non-cpu-bound operation (I/O, database calls,
//! gateway calls) must therefore be expressed as futures or asynchronous functions; async handlers get executed
//! concurrently by worker threads and don't block execution.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use kaleng_engine::{
    db_types::{NewOrder, NewProduct, NewUser, OrderId, ProductUpdate, Role},
    AccountApi,
    AccountManagement,
    CatalogApi,
    CatalogManagement,
    OrderFlowApi,
    StorefrontDatabase,
};
use log::*;
use midtrans_tools::{data_objects::SnapTransactionRequest, MidtransApi};

use crate::{
    auth::JwtClaims,
    config::ServerConfig,
    data_objects::{CheckoutRequest, CheckoutResponse, OrderSearchParams, SweepResponse, UpdateStatusRequest},
    errors::ServerError,
    integrations::{CourierRatesApi, RateRequest},
};

// Actix cannot register generic handlers directly, so each route is wrapped in a concrete struct via the `route!`
// macro and instantiated with the backend type at server construction.
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal requires [$($roles:expr),*]) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name)
                        .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+ where requires [$($roles:expr),*])  => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds)++ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>)
                    .wrap($crate::middleware::AclMiddlewareFactory::new(&[$($roles),+]));
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

//----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Catalog  ----------------------------------------------------
route!(products => Get "/products" impl CatalogManagement);
pub async fn products<B: CatalogManagement>(api: web::Data<CatalogApi<B>>) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET products");
    let catalog = api.products().await?;
    Ok(HttpResponse::Ok().json(catalog))
}

route!(product_by_id => Get "/products/{id}" impl CatalogManagement);
pub async fn product_by_id<B: CatalogManagement>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET product {id}");
    let product = api.product(&id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Product {id}")))?;
    Ok(HttpResponse::Ok().json(product))
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl StorefrontDatabase);
/// Places an order and opens a payment transaction for it.
///
/// The order is reserved and persisted first; only then is the gateway asked for a Snap token. If the gateway is
/// unreachable the client gets a retryable 502 and the order stays `Unpaid` — either the customer retries payment
/// from their order list, or the expiry sweep returns the stock to the shelves.
pub async fn checkout<B: StorefrontDatabase>(
    claims: JwtClaims,
    body: web::Json<CheckoutRequest>,
    api: web::Data<OrderFlowApi<B>>,
    accounts: web::Data<AccountApi<B>>,
    gateway: web::Data<MidtransApi>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    debug!("💻️ POST checkout for {} with {} lines", claims.sub, request.items.len());
    let user = accounts
        .ensure_user(NewUser { id: claims.sub.clone(), name: None, email: claims.email.clone() })
        .await?;
    let order = api.place_order(NewOrder::new(user.id, request.address, request.items)).await?;
    let snap_request =
        SnapTransactionRequest::new(order.order_id.as_str().to_string(), order.total).with_customer_email(claims.email);
    let payment = gateway.create_transaction(snap_request).await.map_err(|e| {
        warn!("💻️ Order {} is placed but the payment gateway is unreachable. {e}", order.order_id);
        ServerError::PaymentGatewayUnavailable(e.to_string())
    })?;
    info!("💻️ Order {} checked out and awaiting payment", order.order_id);
    Ok(HttpResponse::Ok().json(CheckoutResponse { order, payment }))
}

//----------------------------------------------   My orders  ----------------------------------------------------
route!(my_orders => Get "/orders" impl AccountManagement);
pub async fn my_orders<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for {}", claims.sub);
    let result = api.orders_for_user(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(result))
}

route!(order_by_id => Get "/orders/{id}" impl AccountManagement);
pub async fn order_by_id<B: AccountManagement>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ GET order {order_id} for {}", claims.sub);
    // A non-owner gets the same 404 as a nonexistent order; the id itself must not leak order existence.
    let order = api
        .order_with_items(&order_id)
        .await?
        .filter(|o| claims.is_admin() || o.order.user_id == claims.sub)
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id}")))?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Cancellation  ----------------------------------------------------
route!(cancel_order => Post "/orders/{id}/cancel" impl StorefrontDatabase);
pub async fn cancel_order<B: StorefrontDatabase>(
    claims: JwtClaims,
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    debug!("💻️ POST cancel order {order_id} by {}", claims.sub);
    let order = api.cancel_order(&order_id, &claims.sub, claims.is_admin()).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Shipping  ----------------------------------------------------
#[actix_web::post("/shipping/rates")]
pub async fn shipping_rates(
    body: web::Json<RateRequest>,
    courier_api: web::Data<CourierRatesApi>,
) -> Result<HttpResponse, ServerError> {
    let request = body.into_inner();
    if !request.has_destination() {
        return Err(ServerError::InvalidRequestBody(
            "Destination information required: area_id, postal_code, or coordinates".to_string(),
        ));
    }
    if request.items.is_empty() {
        return Err(ServerError::InvalidRequestBody("Items are required".to_string()));
    }
    let rates = courier_api.fetch_rates(&request).await?;
    Ok(HttpResponse::Ok().json(rates))
}

//----------------------------------------------   Back office  ----------------------------------------------------
route!(admin_search_orders => Get "/admin/orders" impl AccountManagement where requires [Role::Admin]);
pub async fn admin_search_orders<B: AccountManagement>(
    query: web::Query<OrderSearchParams>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let filter = query.into_inner().into_filter();
    debug!("💻️ GET admin order search: {filter}");
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(admin_update_order => Patch "/admin/orders/{id}" impl StorefrontDatabase where requires [Role::Admin]);
pub async fn admin_update_order<A: StorefrontDatabase>(
    path: web::Path<String>,
    body: web::Json<UpdateStatusRequest>,
    api: web::Data<OrderFlowApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId(path.into_inner());
    let new_status = body.into_inner().status;
    debug!("💻️ PATCH order {order_id} to {new_status}");
    let order = api.update_order_status(&order_id, new_status).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(admin_create_product => Post "/admin/products" impl CatalogManagement where requires [Role::Admin]);
pub async fn admin_create_product<A: CatalogManagement>(
    body: web::Json<NewProduct>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let product = body.into_inner();
    debug!("💻️ POST create product {}", product.name);
    let stored = api.create_product(product).await?;
    Ok(HttpResponse::Ok().json(stored))
}

route!(admin_update_product => Patch "/admin/products/{id}" impl CatalogManagement where requires [Role::Admin]);
pub async fn admin_update_product<A: CatalogManagement>(
    path: web::Path<String>,
    body: web::Json<ProductUpdate>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ PATCH product {id}");
    let stored = api.update_product(&id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(stored))
}

route!(admin_delete_product => Delete "/admin/products/{id}" impl CatalogManagement where requires [Role::Admin]);
pub async fn admin_delete_product<A: CatalogManagement>(
    path: web::Path<String>,
    api: web::Data<CatalogApi<A>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ DELETE product {id}");
    api.delete_product(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

//----------------------------------------------   Expiry sweep  ----------------------------------------------------
route!(expire_orders => Post "/orders/expire" impl StorefrontDatabase);
/// On-demand sweep trigger for an external cron caller, authorised by the configured bearer secret rather than a
/// session token. Safe to call repeatedly and concurrently with the background worker.
pub async fn expire_orders<B: StorefrontDatabase>(
    req: HttpRequest,
    api: web::Data<OrderFlowApi<B>>,
    config: web::Data<ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let authorized = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|token| !config.cron_secret.reveal().is_empty() && token == config.cron_secret.reveal().as_str())
        .unwrap_or(false);
    if !authorized {
        return Err(ServerError::InsufficientPermissions("Invalid cron secret".to_string()));
    }
    let result = api.expire_unpaid_orders(config.unpaid_order_timeout).await?;
    info!("💻️ On-demand sweep cancelled {} orders", result.cancelled_count());
    Ok(HttpResponse::Ok()
        .json(SweepResponse { cancelled_count: result.cancelled_count(), cancelled_ids: result.cancelled_ids() }))
}
