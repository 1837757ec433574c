use axum::Json;
use serde_json::{json, Value};

/// GET /
pub async fn service_description() -> Json<Value> {
    Json(json!({
        "name": "reconcile-server",
        "description": "Links contact fragments that share an email or phone number into one identity",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "identify": {
                "method": "POST",
                "path": "/identify",
                "body": { "email": "string | null", "phoneNumber": "string | number | null" }
            },
            "health": { "method": "GET", "path": "/health" }
        }
    }))
}
