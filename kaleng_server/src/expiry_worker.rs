use chrono::Duration;
use kaleng_engine::{db_types::Order, events::EventProducers, OrderFlowApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The worker re-evaluates the deadline against each order's stored creation time on every tick, so restarts and
/// overlap with the on-demand sweep endpoint are harmless.
pub fn start_expiry_worker(db: SqliteDatabase, producers: EventProducers, unpaid_expiry: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let api = OrderFlowApi::new(db, producers);
        info!("🕰️ Unpaid order expiry worker started ({} min deadline)", unpaid_expiry.num_minutes());
        loop {
            timer.tick().await;
            trace!("🕰️ Running unpaid order expiry job");
            match api.expire_unpaid_orders(unpaid_expiry).await {
                Ok(result) => {
                    if result.cancelled_count() > 0 {
                        info!("🕰️ {} unpaid orders expired", result.cancelled_count());
                        debug!("🕰️ Expired orders: {}", order_list(&result.cancelled));
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running unpaid order expiry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] order_id: {} user_id: {}", o.id, o.order_id, o.user_id))
        .collect::<Vec<String>>()
        .join(", ")
}
