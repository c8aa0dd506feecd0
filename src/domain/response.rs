//! Results returned by the remote confirm and push endpoints.

use serde::{Deserialize, Serialize};

/// Result of a single confirm call.
///
/// `order_id` is present exactly when `success` is true. The fields are
/// private so the only way to build one is through [`OrderResponse::confirmed`]
/// or [`OrderResponse::rejected`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderResponse {
    success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<String>,
}

impl OrderResponse {
    /// The endpoint accepted the order
    pub fn confirmed(order_id: impl Into<String>) -> Self {
        Self {
            success: true,
            error_code: None,
            order_id: Some(order_id.into()),
        }
    }

    /// The endpoint rejected the order
    pub fn rejected(error_code: Option<String>) -> Self {
        Self {
            success: false,
            error_code,
            order_id: None,
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref()
    }

    pub fn order_id(&self) -> Option<&str> {
        self.order_id.as_deref()
    }

    /// The confirmed identifier, if this response confirms `order_id`
    pub fn confirms(&self, order_id: &str) -> Option<&str> {
        self.order_id().filter(|id| *id == order_id)
    }
}

/// Outcome of delivering a push notification, after retries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessageResult {
    /// Order the notification was about
    pub order_id: String,

    /// Outcome of the last attempt made
    pub success: bool,

    /// Number of push calls made
    pub attempts: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmed_carries_order_id() {
        let response = OrderResponse::confirmed("OD-7");

        assert!(response.success());
        assert_eq!(response.order_id(), Some("OD-7"));
        assert_eq!(response.confirms("OD-7"), Some("OD-7"));
        assert_eq!(response.confirms("OD-8"), None);
    }

    #[test]
    fn test_rejected_has_no_order_id() {
        let response = OrderResponse::rejected(Some("E42".to_string()));

        assert!(!response.success());
        assert_eq!(response.order_id(), None);
        assert_eq!(response.error_code(), Some("E42"));
    }

    #[test]
    fn test_rejected_serializes_without_order_id() {
        let json = serde_json::to_value(OrderResponse::rejected(None)).unwrap();

        assert_eq!(json, serde_json::json!({ "success": false }));
    }
}
