use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use kaleng_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    AccountApi,
    CatalogApi,
    OrderFlowApi,
    SqliteDatabase,
};
use log::info;
use midtrans_tools::MidtransApi;

use crate::{
    auth::JwtVerifier,
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::CourierRatesApi,
    routes::{
        health,
        AdminCreateProductRoute,
        AdminDeleteProductRoute,
        AdminSearchOrdersRoute,
        AdminUpdateOrderRoute,
        AdminUpdateProductRoute,
        CancelOrderRoute,
        CheckoutRoute,
        ExpireOrdersRoute,
        MyOrdersRoute,
        OrderByIdRoute,
        ProductByIdRoute,
        ProductsRoute,
        shipping_rates,
    },
    webhook_routes::{payment_webhook_probe, PaymentWebhookRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(16, default_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let _expiry_handle = start_expiry_worker(db.clone(), producers.clone(), config.unpaid_order_timeout);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The default deployment hooks. Fulfilment and customer mail are driven by downstream consumers; out of the box
/// the lifecycle milestones are just made visible in the log.
fn default_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|ev| {
        Box::pin(async move {
            info!("📧️ Order {} is paid ({}). Ready for packing", ev.order.order_id, ev.order.total);
        })
    });
    hooks.on_order_annulled(|ev| {
        Box::pin(async move {
            info!("📧️ Order {} was annulled and its stock returned", ev.order.order_id);
        })
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let bind_address = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let accounts_api = AccountApi::new(db.clone());
        let catalog_api = CatalogApi::new(db.clone());
        let jwt_verifier = JwtVerifier::new(&config.auth);
        let midtrans_api = MidtransApi::new(config.midtrans.clone()).expect("Invalid Midtrans configuration");
        let courier_api = CourierRatesApi::new(config.shipping.clone()).expect("Invalid shipping configuration");
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("kls::access_log"))
            .app_data(web::Data::new(config.clone()))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(jwt_verifier))
            .app_data(web::Data::new(midtrans_api))
            .app_data(web::Data::new(courier_api));
        let api_scope = web::scope("/api")
            .service(ProductsRoute::<SqliteDatabase>::new())
            .service(ProductByIdRoute::<SqliteDatabase>::new())
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
            .service(shipping_rates)
            .service(AdminSearchOrdersRoute::<SqliteDatabase>::new())
            .service(AdminUpdateOrderRoute::<SqliteDatabase>::new())
            .service(AdminCreateProductRoute::<SqliteDatabase>::new())
            .service(AdminUpdateProductRoute::<SqliteDatabase>::new())
            .service(AdminDeleteProductRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/webhook")
            .service(PaymentWebhookRoute::<SqliteDatabase>::new())
            .service(payment_webhook_probe);
        app.service(health)
            .service(api_scope)
            .service(webhook_scope)
            .service(ExpireOrdersRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind(bind_address)?
    .run();
    Ok(srv)
}
