//! HTTP routes and router assembly

pub mod health;
pub mod predict;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::state::{AllowedOrigins, SharedState};

/// CORS layer for the configured origins
pub fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let allow_origin = match origins {
        AllowedOrigins::Any => AllowOrigin::any(),
        AllowedOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!("Ignoring invalid CORS origin {:?}", origin);
                        None
                    }
                })
                .collect();
            AllowOrigin::list(values)
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the application router
pub fn router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        // Health check
        .route("/", get(health::health_check))
        .route("/health", get(health::health_check))
        // Inference
        .route("/predict", post(predict::predict))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use plantvillage_infer::inference::ProbabilityVector;
    use plantvillage_infer::{
        Classifier, ImageDecoder, LabelCatalog, NormalizedImage, RequestHandler, Result,
    };

    use super::*;
    use crate::state::{AppState, ServerConfig};

    const BOUNDARY: &str = "leafboundary";

    struct StubClassifier {
        calls: AtomicUsize,
    }

    impl Classifier for StubClassifier {
        fn predict(&self, _image: &NormalizedImage) -> Result<ProbabilityVector> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0.2, 0.7, 0.1])
        }

        fn num_classes(&self) -> usize {
            3
        }
    }

    fn app() -> (Router, Arc<StubClassifier>) {
        app_with_config(ServerConfig::default())
    }

    fn app_with_config(config: ServerConfig) -> (Router, Arc<StubClassifier>) {
        let stub = Arc::new(StubClassifier {
            calls: AtomicUsize::new(0),
        });
        let catalog = Arc::new(
            LabelCatalog::from_labels(["Apple__healthy", "Apple__scab", "Potato__blight"]).unwrap(),
        );
        let handler =
            RequestHandler::new(ImageDecoder::new(8).unwrap(), catalog, stub.clone()).unwrap();
        let state = Arc::new(AppState::new(config, handler));
        (router(state), stub)
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(12, 12, Rgb([30, 120, 40]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    fn multipart_request(crop: Option<&str>, file: Option<&[u8]>) -> Request<Body> {
        let mut body = Vec::new();
        if let Some(crop) = crop {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"crop\"\r\n\r\n{crop}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(file) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"leaf.png\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(file);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/predict")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        for uri in ["/", "/health"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let (status, body) = send(app.clone(), request).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({ "status": "ML Server Running" }));
        }
    }

    #[tokio::test]
    async fn test_predict_success() {
        let (app, stub) = app();
        let png = png_bytes();

        let (status, body) = send(app, multipart_request(Some(" Apple"), Some(&png))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "selected_crop": "apple",
                "predicted_class": "Apple__scab",
                "confidence": 70.0
            })
        );
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_predict_unknown_crop() {
        let (app, stub) = app();
        let png = png_bytes();

        let (status, body) = send(app, multipart_request(Some("tomato"), Some(&png))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": false,
                "error": "No matching classes found for crop 'tomato'."
            })
        );
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_predict_bad_image_then_good_image() {
        let (app, _) = app();

        let (status, body) =
            send(app.clone(), multipart_request(Some("apple"), Some(b"not an image"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(false));
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("Failed to decode image"));

        let png = png_bytes();
        let (_, body) = send(app, multipart_request(Some("apple"), Some(&png))).await;
        assert_eq!(body["success"], json!(true));
    }

    #[tokio::test]
    async fn test_predict_missing_fields() {
        let (app, _) = app();

        let (status, body) = send(app.clone(), multipart_request(Some("apple"), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "success": false, "error": "Missing form field 'file'" })
        );

        let png = png_bytes();
        let (_, body) = send(app, multipart_request(None, Some(&png))).await;
        assert_eq!(body["error"], json!("Missing form field 'crop'"));
    }

    #[tokio::test]
    async fn test_predict_upload_over_limit() {
        let (app, stub) = app_with_config(ServerConfig {
            max_upload_bytes: 1024,
            ..ServerConfig::default()
        });
        let oversized = vec![0u8; 4096];

        let (status, body) = send(app, multipart_request(Some("apple"), Some(&oversized))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(false));
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_predict_without_multipart_body() {
        let (app, _) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let (status, body) = send(app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], json!(false));
    }
}
