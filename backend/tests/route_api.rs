use std::sync::Arc;

use axum::{
    body::{Body, to_bytes},
    http::Request,
};
use hyper::StatusCode;
use saferoute::{
    AppState, create_router,
    engine::RoadGraph,
    graph::GraphConfig,
    models::{ApiError, RouteRequest, RouteResponse},
    risk::{RiskClassifier, RiskConfig},
    visibility::FixedVisibility,
};
use serde_json::json;
use tower::ServiceExt;

const SAMPLE_GRAPH: &str = include_str!("../data/sample_graph.json");

fn test_app_with(risk: RiskConfig, visibility: u32) -> axum::Router {
    let graph = RoadGraph::from_reader(SAMPLE_GRAPH.as_bytes(), GraphConfig::default()).expect("graph");
    let state = AppState {
        graph: Arc::new(graph),
        classifier: Arc::new(RiskClassifier::new(risk)),
        visibility: Arc::new(FixedVisibility(visibility)),
        geocoder: None,
        risk_seed: Some(7),
    };
    create_router(state)
}

fn test_app() -> axum::Router {
    test_app_with(RiskConfig::deterministic(), 0)
}

fn route_request(start: &str, end: &str) -> Request<Body> {
    let req = RouteRequest {
        start: start.to_string(),
        end: end.to_string(),
    };
    Request::builder()
        .method("POST")
        .uri("/api/get-route")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&req).unwrap()))
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    to_bytes(response.into_body(), 1024 * 1024).await.unwrap().to_vec()
}

#[tokio::test]
async fn annotated_route_between_coordinates() {
    let app = test_app();
    let response = app
        .oneshot(route_request("30.34,76.38", "30.345,76.39"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: RouteResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.segments.len(), 3);
    assert_eq!(body.stats.total(), body.segments.len());
    assert_eq!(body.stats.high, 1);
    assert_eq!(body.stats.moderate, 0);
    assert_eq!(body.stats.low, 2);
    assert_eq!(body.distance, 1.52);

    assert_eq!(body.hazards.len(), 8);
    assert_eq!(body.hazards["Sharp Curve"], 1);
    assert_eq!(body.hazards["Narrow Road"], 1);
    assert_eq!(body.hazards["Poor Lighting"], 1);
    assert_eq!(body.hazards["High Speed Zone"], 1);
    assert_eq!(body.hazards["Known Blackspot"], 0);
    assert_eq!(body.hazards["Traffic Congestion"], 0);

    let curvy = &body.segments[1];
    assert_eq!(curvy.risk, "High");
    assert_eq!(curvy.color, "#E11B23");
    assert_eq!(curvy.positions.len(), 4);
    assert_eq!(curvy.positions[0], [30.34, 76.385]);
    assert!(curvy.info.contains("Sharp Curve"));

    assert_eq!(body.segments[0].info, "High Speed Zone");
    assert_eq!(body.segments[2].info, "Safe Route");
    assert_eq!(body.segments[2].color, "#20BD5F");
    assert_eq!(body.segments[0].positions.first(), Some(&[30.34, 76.38]));
}

#[tokio::test]
async fn visibility_is_added_to_every_segment() {
    let app = test_app_with(RiskConfig::deterministic(), 20);
    let response = app
        .oneshot(route_request("30.34,76.38", "30.345,76.39"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: RouteResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.hazards["Bad Visibility"], 3);
    assert_eq!(body.stats.low, 1);
    assert_eq!(body.stats.moderate, 1);
    assert_eq!(body.stats.high, 1);
    assert_eq!(body.segments[2].info, "Bad Visibility");
}

#[tokio::test]
async fn seeded_requests_are_repeatable() {
    let app = test_app_with(RiskConfig::default(), 0);

    let mut bodies = Vec::new();
    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(route_request("30.34,76.38", "30.345,76.39"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: RouteResponse = serde_json::from_slice(&body_bytes(response).await).unwrap();
        bodies.push((body.stats, body.hazards));
    }
    assert_eq!(bodies[0], bodies[1]);
}

#[tokio::test]
async fn isolated_destination_is_not_found() {
    let app = test_app();
    let response = app
        .oneshot(route_request("30.34,76.38", "30.36,76.41"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(body.error, "No route found between these points.");
}

#[tokio::test]
async fn identical_endpoints_are_not_found() {
    let app = test_app();
    let response = app
        .oneshot(route_request("30.34,76.38", "30.34,76.38"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn far_away_endpoint_is_not_found() {
    let app = test_app();
    let response = app
        .oneshot(route_request("48.8566,2.3522", "30.345,76.39"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn free_text_without_geocoder_fails() {
    let app = test_app();
    let response = app
        .oneshot(route_request("Thapar University, Patiala", "30.345,76.39"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: ApiError = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert!(body.error.contains("geocoding is disabled"));
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let app = test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/get-route")
        .header("content-type", "application/json")
        .body(Body::from(json!({ "start": 30.34 }).to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn health_check() {
    let app = test_app();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_bytes(response).await, b"OK");
}
