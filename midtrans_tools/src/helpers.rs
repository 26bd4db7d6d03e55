use sha2::{Digest, Sha512};

use crate::PaymentNotification;

/// Computes the signature the gateway attaches to payment notifications:
/// `sha512(order_id + status_code + gross_amount + server_key)`, hex encoded.
pub fn notification_signature(order_id: &str, status_code: &str, gross_amount: &str, server_key: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(order_id.as_bytes());
    hasher.update(status_code.as_bytes());
    hasher.update(gross_amount.as_bytes());
    hasher.update(server_key.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Checks a notification's `signature_key` against the recomputed signature.
///
/// The gateway renders `gross_amount` either as a bare integer ("490000") or with two decimals ("490000.00"),
/// and which rendering went into the signature is not guaranteed to match the one in the payload. Both renderings
/// are therefore tried; a match on any of them authenticates the notification.
pub fn verify_notification_signature(notification: &PaymentNotification, server_key: &str) -> bool {
    amount_renderings(&notification.gross_amount).iter().any(|amount| {
        let expected = notification_signature(&notification.order_id, &notification.status_code, amount, server_key);
        expected == notification.signature_key
    })
}

/// The candidate renderings of a gross amount: the value as sent, plus its integer and two-decimal forms.
fn amount_renderings(gross_amount: &str) -> Vec<String> {
    let mut candidates = vec![gross_amount.to_string()];
    match gross_amount.split_once('.') {
        Some((whole, _fraction)) => candidates.push(whole.to_string()),
        None => candidates.push(format!("{gross_amount}.00")),
    }
    candidates.dedup();
    candidates
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::data_objects::TransactionStatus;

    const SERVER_KEY: &str = "SB-Mid-server-abc123";

    fn notification(gross_amount: &str, signature_key: String) -> PaymentNotification {
        PaymentNotification {
            order_id: "KLS-TEST-01".to_string(),
            status_code: "200".to_string(),
            gross_amount: gross_amount.to_string(),
            signature_key,
            transaction_status: TransactionStatus::Settlement,
            fraud_status: None,
            transaction_id: None,
        }
    }

    #[test]
    fn accepts_signature_over_the_rendering_as_sent() {
        let sig = notification_signature("KLS-TEST-01", "200", "490000.00", SERVER_KEY);
        assert!(verify_notification_signature(&notification("490000.00", sig), SERVER_KEY));
    }

    #[test]
    fn accepts_signature_over_the_alternate_rendering() {
        // Signed over the integer form, delivered with two decimals.
        let sig = notification_signature("KLS-TEST-01", "200", "490000", SERVER_KEY);
        assert!(verify_notification_signature(&notification("490000.00", sig), SERVER_KEY));
        // And the other way around.
        let sig = notification_signature("KLS-TEST-01", "200", "490000.00", SERVER_KEY);
        assert!(verify_notification_signature(&notification("490000", sig), SERVER_KEY));
    }

    #[test]
    fn rejects_wrong_key_and_tampered_fields() {
        let sig = notification_signature("KLS-TEST-01", "200", "490000.00", SERVER_KEY);
        assert!(!verify_notification_signature(&notification("490000.00", sig.clone()), "some-other-key"));
        let mut tampered = notification("490000.00", sig);
        tampered.order_id = "KLS-TEST-02".to_string();
        assert!(!verify_notification_signature(&tampered, SERVER_KEY));
    }

    #[test]
    fn signature_is_hex_encoded_sha512() {
        let sig = notification_signature("a", "b", "c", "d");
        assert_eq!(sig.len(), 128);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
