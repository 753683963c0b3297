//! Phone number normalization.

use axum::{Json, extract::Query};
use serde::{Deserialize, Serialize};

use soko_core::{is_valid_phone, normalize_phone};

/// Query parameters.
#[derive(Debug, Deserialize)]
pub struct PhoneQuery {
    pub phone: String,
}

/// Normalization result.
#[derive(Debug, Serialize)]
pub struct NormalizedPhone {
    pub input: String,
    pub normalized: String,
    pub valid: bool,
}

/// Normalize a phone number the way payment initiation does.
///
/// GET /api/phone/normalize?phone=0712345678
pub async fn normalize(Query(query): Query<PhoneQuery>) -> Json<NormalizedPhone> {
    let normalized = normalize_phone(&query.phone);
    let valid = is_valid_phone(&normalized);
    Json(NormalizedPhone {
        input: query.phone,
        normalized,
        valid,
    })
}
