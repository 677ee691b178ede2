use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;

use marg_api::{app, AppState};
use marg_booking::{BookingService, MemoryBookingStore, MockPaymentAdapter};
use marg_catalog::RouteCatalog;
use marg_core::payment::PaymentAdapter;
use marg_core::repository::RouteRepository;
use marg_ledger::{MemorySeatLedger, SeatLedger};
use marg_store::app_config::BusinessRules;
use marg_store::EventBus;

fn test_app() -> Router {
    let catalog = Arc::new(RouteCatalog::new());
    let ledger = Arc::new(MemorySeatLedger::new());
    let bookings = Arc::new(MemoryBookingStore::new());
    let payments: Arc<dyn PaymentAdapter> = Arc::new(MockPaymentAdapter::new());

    let routes: Arc<dyn RouteRepository> = catalog;
    let ledger: Arc<dyn SeatLedger> = ledger;

    let booking = Arc::new(BookingService::new(
        routes.clone(),
        ledger.clone(),
        bookings,
        payments,
        300,
    ));

    app(AppState {
        routes,
        booking,
        ledger,
        events: EventBus::default(),
        business_rules: BusinessRules {
            seat_hold_seconds: 300,
            sweep_interval_seconds: 30,
        },
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, value)
}

async fn create_route(app: &Router) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/v1/routes",
        Some(json!({
            "name": "Morning Express",
            "origin": "Patna",
            "destination": "Motihari",
            "total_seats": 30,
            "price": 450
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn test_route_crud_and_search() {
    let app = test_app();
    let route = create_route(&app).await;
    let route_id = route["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", "/v1/routes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "GET",
        "/v1/routes/search?origin=patna&destination=MOTIHARI",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"].as_str().unwrap(), route_id);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/v1/routes/{}/price", route_id),
        Some(json!({ "price": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/v1/routes/{}/price", route_id),
        Some(json!({ "price": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "DELETE", &format!("/v1/routes/{}", route_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", &format!("/v1/routes/{}", route_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_flow_end_to_end() {
    let app = test_app();
    let route = create_route(&app).await;
    let route_id = route["id"].as_str().unwrap().to_string();

    // Hold a seat.
    let (status, hold) = send(
        &app,
        "POST",
        "/v1/bookings/hold",
        Some(json!({
            "route_id": route_id,
            "travel_date": "2026-09-14",
            "seat_number": 12,
            "passenger_name": "Asha",
            "passenger_contact": "asha@example.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hold["status"], "SEAT_HELD");
    assert_eq!(hold["price"], 450);
    let attempt_id = hold["attempt_id"].as_str().unwrap().to_string();

    // No booking exists yet.
    let (_, bookings) = send(&app, "GET", "/v1/bookings", None).await;
    assert!(bookings.as_array().unwrap().is_empty());

    // Confirm payment.
    let (status, booking) = send(
        &app,
        "POST",
        &format!("/v1/bookings/{}/confirm", attempt_id),
        Some(json!({ "payment_method": "upi" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["payment_status"], "PAID");
    let ticket_code = booking["ticket_code"].as_str().unwrap().to_string();
    assert!(ticket_code.starts_with("TKT"));

    // Lookup by ticket code.
    let (status, found) = send(&app, "GET", &format!("/v1/tickets/{}", ticket_code), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["passenger_name"], "Asha");

    // Validate once, then conflict.
    let (status, validated) = send(
        &app,
        "POST",
        &format!("/v1/tickets/{}/validate", ticket_code),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["validation_status"], "VALIDATED");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/tickets/{}/validate", ticket_code),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Issue the physical ticket.
    let (status, issued) = send(
        &app,
        "POST",
        &format!("/v1/tickets/{}/issue", ticket_code),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(issued["ticket_issued"], true);

    // Export the printable ticket.
    let (status, exported) = send(
        &app,
        "GET",
        &format!("/v1/tickets/{}/export", ticket_code),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let text = exported.as_str().unwrap();
    assert!(text.contains("BUS TICKET"));
    assert!(text.contains("Asha"));
    assert!(text.contains(&ticket_code));
}

#[tokio::test]
async fn test_double_booking_is_conflict() {
    let app = test_app();
    let route = create_route(&app).await;
    let route_id = route["id"].as_str().unwrap().to_string();

    let hold_body = json!({
        "route_id": route_id,
        "travel_date": "2026-09-14",
        "seat_number": 5,
        "passenger_name": "Asha",
        "passenger_contact": "asha@example.com"
    });

    let (status, _) = send(&app, "POST", "/v1/bookings/hold", Some(hold_body.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let mut second = hold_body;
    second["passenger_name"] = json!("Ravi");
    second["passenger_contact"] = json!("ravi@example.com");
    let (status, body) = send(&app, "POST", "/v1/bookings/hold", Some(second)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("unavailable")
        || body["error"].as_str().unwrap().contains("taken"));
}

#[tokio::test]
async fn test_cancel_frees_the_seat() {
    let app = test_app();
    let route = create_route(&app).await;
    let route_id = route["id"].as_str().unwrap().to_string();

    let hold_body = json!({
        "route_id": route_id,
        "travel_date": "2026-09-14",
        "seat_number": 7,
        "passenger_name": "Asha",
        "passenger_contact": "asha@example.com"
    });
    let (_, hold) = send(&app, "POST", "/v1/bookings/hold", Some(hold_body.clone())).await;
    let attempt_id = hold["attempt_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "DELETE", &format!("/v1/bookings/{}", attempt_id), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/v1/bookings/hold", Some(hold_body)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_seat_map_reflects_holds() {
    let app = test_app();
    let route = create_route(&app).await;
    let route_id = route["id"].as_str().unwrap().to_string();

    for seat in [3, 9] {
        let (status, _) = send(
            &app,
            "POST",
            "/v1/bookings/hold",
            Some(json!({
                "route_id": route_id,
                "travel_date": "2026-09-14",
                "seat_number": seat,
                "passenger_name": "Asha",
                "passenger_contact": "asha@example.com"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        "GET",
        &format!("/v1/routes/{}/seats?date=2026-09-14", route_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_seats"], 30);
    assert_eq!(body["occupied"], json!([3, 9]));

    // Another travel date is untouched.
    let (_, body) = send(
        &app,
        "GET",
        &format!("/v1/routes/{}/seats?date=2026-09-15", route_id),
        None,
    )
    .await;
    assert_eq!(body["occupied"], json!([]));
}

#[tokio::test]
async fn test_counter_sale_books_in_one_call() {
    let app = test_app();
    let route = create_route(&app).await;
    let route_id = route["id"].as_str().unwrap().to_string();

    let (status, booking) = send(
        &app,
        "POST",
        "/v1/counter/bookings",
        Some(json!({
            "route_id": route_id,
            "travel_date": "2026-09-14",
            "seat_number": 1,
            "passenger_name": "Meera",
            "passenger_contact": "98700 00000",
            "payment_method": "cash"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(booking["payment_status"], "PAID");
    assert_eq!(booking["payment_method"], "cash");
}

#[tokio::test]
async fn test_bad_requests_map_to_statuses() {
    let app = test_app();
    let route = create_route(&app).await;
    let route_id = route["id"].as_str().unwrap().to_string();

    // Unknown payment method.
    let (_, hold) = send(
        &app,
        "POST",
        "/v1/bookings/hold",
        Some(json!({
            "route_id": route_id,
            "travel_date": "2026-09-14",
            "seat_number": 2,
            "passenger_name": "Asha",
            "passenger_contact": "asha@example.com"
        })),
    )
    .await;
    let attempt_id = hold["attempt_id"].as_str().unwrap().to_string();
    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/bookings/{}/confirm", attempt_id),
        Some(json!({ "payment_method": "cheque" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown attempt.
    let (status, _) = send(
        &app,
        "POST",
        &format!("/v1/bookings/{}/confirm", uuid::Uuid::new_v4()),
        Some(json!({ "payment_method": "upi" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Seat out of range is a validation error.
    let (status, _) = send(
        &app,
        "POST",
        "/v1/bookings/hold",
        Some(json!({
            "route_id": route_id,
            "travel_date": "2026-09-14",
            "seat_number": 31,
            "passenger_name": "Asha",
            "passenger_contact": "asha@example.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Unknown ticket token.
    let (status, _) = send(&app, "GET", "/v1/tickets/TKT99999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
