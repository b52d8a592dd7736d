//! Shared building blocks for the CRM crates: logging setup and wire types.

pub mod types;
pub mod utils;

#[cfg(test)]
mod tests {
    use super::types::{ApiResponse, Health};

    #[test]
    fn health_type_ok() {
        let h = Health { status: "ok" };
        assert_eq!(h.status, "ok");
    }

    #[test]
    fn ok_envelope_omits_error_fields() {
        let body = serde_json::to_value(ApiResponse::ok(42)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], 42);
        assert!(body.get("error").is_none());
        assert!(body.get("message").is_none());
    }

    #[test]
    fn error_envelope_has_no_data() {
        let body = serde_json::to_value(ApiResponse::<()>::error("Contact not found")).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Contact not found");
        assert!(body.get("data").is_none());
    }
}
