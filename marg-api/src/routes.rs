use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use marg_shared::models::Route;

use crate::error::AppError;
use crate::state::AppState;

// --- DTOs ---

#[derive(Debug, Deserialize)]
struct CreateRouteRequest {
    name: String,
    origin: String,
    destination: String,
    total_seats: u16,
    price: i64,
}

#[derive(Debug, Deserialize)]
struct UpdatePriceRequest {
    price: i64,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    origin: String,
    destination: String,
}

#[derive(Debug, Deserialize)]
struct SeatMapQuery {
    date: NaiveDate,
}

#[derive(Debug, Serialize)]
struct SeatMapResponse {
    route_id: Uuid,
    travel_date: NaiveDate,
    total_seats: u16,
    occupied: Vec<u16>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/routes", post(create_route).get(list_routes))
        .route("/v1/routes/search", get(search_routes))
        .route("/v1/routes/{id}/price", put(update_price))
        .route("/v1/routes/{id}", delete(delete_route))
        .route("/v1/routes/{id}/seats", get(seat_map))
}

/// POST /v1/routes
async fn create_route(
    State(state): State<AppState>,
    Json(req): Json<CreateRouteRequest>,
) -> Result<Json<Route>, AppError> {
    let route = marg_catalog::new_route(
        &req.name,
        &req.origin,
        &req.destination,
        req.total_seats,
        req.price,
    )?;

    state
        .routes
        .create(&route)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    info!(route_id = %route.id, name = %route.name, "route created");
    Ok(Json(route))
}

/// GET /v1/routes
async fn list_routes(State(state): State<AppState>) -> Result<Json<Vec<Route>>, AppError> {
    let routes = state
        .routes
        .list()
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    Ok(Json(routes))
}

/// GET /v1/routes/search?origin=&destination=
async fn search_routes(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Route>, AppError> {
    let route = state
        .routes
        .find_by_endpoints(&query.origin, &query.destination)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| {
            AppError::NotFoundError(format!(
                "no route from {} to {}",
                query.origin, query.destination
            ))
        })?;
    Ok(Json(route))
}

/// PUT /v1/routes/{id}/price
async fn update_price(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePriceRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if req.price < 0 {
        return Err(AppError::ValidationError(
            "price must not be negative".to_string(),
        ));
    }

    let updated = state
        .routes
        .update_price(id, req.price)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if !updated {
        return Err(AppError::NotFoundError(format!("route {}", id)));
    }

    info!(route_id = %id, price = req.price, "route price updated");
    Ok(Json(serde_json::json!({ "route_id": id, "price": req.price })))
}

/// DELETE /v1/routes/{id}
async fn delete_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = state
        .routes
        .delete(id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    if !deleted {
        return Err(AppError::NotFoundError(format!("route {}", id)));
    }

    info!(route_id = %id, "route deleted");
    Ok(Json(serde_json::json!({ "deleted": id })))
}

/// GET /v1/routes/{id}/seats?date=
async fn seat_map(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SeatMapQuery>,
) -> Result<Json<SeatMapResponse>, AppError> {
    let route = state
        .routes
        .get(id)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .ok_or_else(|| AppError::NotFoundError(format!("route {}", id)))?;

    let occupied = state
        .ledger
        .occupied(id, query.date)
        .await
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    Ok(Json(SeatMapResponse {
        route_id: id,
        travel_date: query.date,
        total_seats: route.total_seats,
        occupied,
    }))
}
