//! Request extractors whose rejections render as `AppError`
//!
//! Drop-in replacements for axum's `Json`, `Query` and `Path`.

use axum::{
    extract::{FromRequest, FromRequestParts},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct Query<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct Path<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        routing::{get, post},
        Router,
    };
    use serde::Deserialize;
    use serde_json::Value;
    use tower::ServiceExt;

    use shared::types::Pagination;

    #[derive(Debug, Deserialize, Serialize)]
    struct Count {
        product_id: i32,
        beginning: i32,
    }

    async fn echo(Json(count): Json<Count>) -> Json<Count> {
        Json(count)
    }

    async fn page(Query(page): Query<Pagination>) -> Json<Pagination> {
        Json(page)
    }

    async fn report(Path(report_id): Path<i32>) -> Json<i32> {
        Json(report_id)
    }

    fn app() -> Router {
        Router::new()
            .route("/counts", post(echo))
            .route("/reports", get(page))
            .route("/reports/:report_id", get(report))
    }

    async fn send(request: Request<Body>) -> (StatusCode, Value) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(body: &'static str) -> Request<Body> {
        Request::post("/counts")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn accepted_body_passes_through() {
        let (status, body) = send(post_json(r#"{"product_id": 3, "beginning": 10}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["beginning"], 10);
    }

    #[tokio::test]
    async fn missing_field_uses_error_envelope() {
        let (status, body) = send(post_json(r#"{"product_id": 3}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("beginning"));
    }

    #[tokio::test]
    async fn malformed_json_uses_error_envelope() {
        let (status, body) = send(post_json("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn non_numeric_skip_uses_error_envelope() {
        let request = Request::get("/reports?skip=abc").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    }

    #[tokio::test]
    async fn non_numeric_path_id_uses_error_envelope() {
        let request = Request::get("/reports/latest").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_REQUEST");
    }
}
