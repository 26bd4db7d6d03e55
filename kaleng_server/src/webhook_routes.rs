//----------------------------------------------   Payment webhook  ----------------------------------------------------
//! The payment gateway's asynchronous notification endpoint.
//!
//! The gateway treats anything outside the 200 range as a delivery failure and retries aggressively, so every
//! structurally valid request — including ones that fail signature verification or reference unknown orders — is
//! acknowledged with HTTP 200 and a `{success, message}` body. Failures are logged, never surfaced to the caller.
use actix_web::{get, web, HttpRequest, HttpResponse};
use kaleng_engine::{db_types::OrderId, order_objects::PaymentUpdate, OrderFlowApi, StorefrontDatabase, StorefrontError};
use log::{debug, info, trace, warn};
use midtrans_tools::{helpers::verify_notification_signature, FraudStatus, PaymentNotification, TransactionStatus};
use serde_json::Value;

use crate::{config::ServerConfig, data_objects::JsonResponse, helpers::get_remote_ip, route};

route!(payment_webhook => Post "/payment" impl StorefrontDatabase);
pub async fn payment_webhook<B>(
    req: HttpRequest,
    body: web::Json<Value>,
    api: web::Data<OrderFlowApi<B>>,
    config: web::Data<ServerConfig>,
) -> HttpResponse
where B: StorefrontDatabase
{
    let peer = get_remote_ip(&req, config.use_x_forwarded_for, config.use_forwarded);
    trace!("💳️ Received payment notification from {peer:?}");
    let payload = body.into_inner();

    // The gateway probes the endpoint with bodies that carry no correlation fields. Acknowledge and do nothing.
    if payload.get("order_id").is_none() || payload.get("transaction_status").is_none() {
        debug!("💳️ Test notification, or required fields are missing. Acknowledged without action");
        return HttpResponse::Ok().json(JsonResponse::success("Notification received."));
    }

    let notification: PaymentNotification = match serde_json::from_value(payload) {
        Ok(n) => n,
        Err(e) => {
            warn!("💳️ Could not parse payment notification. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure("Malformed notification."));
        },
    };

    if !verify_notification_signature(&notification, config.midtrans.server_key.reveal()) {
        warn!(
            "💳️ Invalid signature on payment notification for order {} from {peer:?}. No action taken",
            notification.order_id
        );
        return HttpResponse::Ok().json(JsonResponse::failure("Invalid signature."));
    }

    let update = match payment_update_for(&notification) {
        Some(update) => update,
        None => {
            info!(
                "💳️ Unrecognised transaction status '{}' for order {}. No transition applied",
                notification.transaction_status, notification.order_id
            );
            return HttpResponse::Ok().json(JsonResponse::success("Notification received."));
        },
    };

    let order_id = OrderId(notification.order_id.clone());
    let result = match api.apply_payment_update(&order_id, update).await {
        Ok(Some(order)) => {
            info!("💳️ Order {} is now {}", order.order_id, order.status);
            JsonResponse::success(format!("Order updated to {}", order.status))
        },
        Ok(None) => {
            debug!("💳️ Notification for {order_id} required no transition");
            JsonResponse::success("Notification processed.")
        },
        Err(StorefrontError::OrderNotFound(_)) => {
            // Unknown correlation id. Possibly an order from another environment sharing the gateway account.
            warn!("💳️ Payment notification for unknown order {order_id}. Acknowledged without action");
            JsonResponse::success("Order not found.")
        },
        Err(e) => {
            warn!("💳️ Could not apply payment update for {order_id}. {e}");
            JsonResponse::failure("Could not process notification.")
        },
    };
    HttpResponse::Ok().json(result)
}

/// Maps the gateway's transaction vocabulary onto a lifecycle update. Fails closed: anything unrecognised maps to
/// `None` and no transition is attempted.
fn payment_update_for(notification: &PaymentNotification) -> Option<PaymentUpdate> {
    match notification.transaction_status {
        TransactionStatus::Capture => match notification.fraud_status {
            Some(FraudStatus::Accept) => Some(PaymentUpdate::Settled),
            // A challenged capture stays pending until the gateway reports the final verdict.
            Some(FraudStatus::Challenge) => Some(PaymentUpdate::Pending),
            Some(FraudStatus::Deny) => Some(PaymentUpdate::Annulled),
            _ => None,
        },
        TransactionStatus::Settlement => Some(PaymentUpdate::Settled),
        TransactionStatus::Cancel | TransactionStatus::Deny | TransactionStatus::Expire => {
            Some(PaymentUpdate::Annulled)
        },
        TransactionStatus::Pending => Some(PaymentUpdate::Pending),
        TransactionStatus::Other => None,
    }
}

/// Liveness probe; the gateway dashboard pings the notification URL with a GET when it is configured.
#[get("/payment")]
pub async fn payment_webhook_probe() -> HttpResponse {
    trace!("💳️ Webhook liveness probe");
    HttpResponse::Ok().json(JsonResponse::success("Webhook endpoint is active."))
}
