//! Fare and errand price previews.

use axum::{Json, extract::Query};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use soko_core::{FareSchedule, Money, Urgency, errand_price};

use crate::error::AppError;

/// Query parameters for a fare preview.
#[derive(Debug, Deserialize)]
pub struct FareQuery {
    pub base_fare: Decimal,
    pub per_km: Decimal,
    pub distance_km: Decimal,
}

/// Fare preview response.
#[derive(Debug, Serialize)]
pub struct FarePreview {
    pub base_fare: Money,
    pub per_km: Money,
    pub distance_km: Decimal,
    pub fare: Money,
}

/// Query parameters for an errand price.
#[derive(Debug, Deserialize)]
pub struct ErrandQuery {
    pub base_price: Decimal,
    #[serde(default)]
    pub urgency: Urgency,
}

/// Errand price response.
#[derive(Debug, Serialize)]
pub struct ErrandPrice {
    pub base_price: Money,
    pub urgency: Urgency,
    pub multiplier: Decimal,
    pub price: Money,
}

/// Preview a fare.
///
/// GET /api/pricing/fare-preview?base_fare=200&per_km=50&distance_km=5
pub async fn fare_preview(Query(query): Query<FareQuery>) -> Result<Json<FarePreview>, AppError> {
    let schedule = FareSchedule::new(Money::new(query.base_fare), Money::new(query.per_km))
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let fare = schedule
        .preview(query.distance_km)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(FarePreview {
        base_fare: schedule.base_fare,
        per_km: schedule.per_km,
        distance_km: query.distance_km,
        fare,
    }))
}

/// Price an errand.
///
/// GET /api/pricing/errand?base_price=300&urgency=urgent
pub async fn errand(Query(query): Query<ErrandQuery>) -> Result<Json<ErrandPrice>, AppError> {
    let base = Money::new(query.base_price);
    let price =
        errand_price(base, query.urgency).map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(ErrandPrice {
        base_price: base,
        urgency: query.urgency,
        multiplier: query.urgency.multiplier(),
        price,
    }))
}
