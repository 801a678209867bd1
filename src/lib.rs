use crate::domain::todo::TodoService;
use crate::identity::JwtTokenVerifier;
use crate::page_cache::PageCache;
use axum::Router;
use axum::extract::State;
use std::sync::Arc;

pub mod api;
pub mod app_env;
pub mod client;
pub mod db;
pub mod domain;
pub mod dto;
pub mod external_connections;
pub mod identity;
pub mod logging;
pub mod page_cache;
pub mod persistence;
pub mod routing_utils;


/// Everything a request handler needs, shared across the whole server
pub struct SharedData {
    pub ext_cxn: persistence::ExternalConnectivity,
    pub todo_service: TodoService,
    /// Absent in single-user mode, where nobody signs in
    pub token_verifier: Option<JwtTokenVerifier>,
    pub page_cache: PageCache,
}

impl SharedData {
    pub fn new(
        ext_cxn: persistence::ExternalConnectivity,
        todo_service: TodoService,
        token_verifier: Option<JwtTokenVerifier>,
    ) -> Self {
        SharedData {
            ext_cxn,
            todo_service,
            token_verifier,
            page_cache: PageCache::new(),
        }
    }
}

pub type AppState = State<Arc<SharedData>>;

/// Assembles the JSON API, the server-rendered pages, and the API docs into one router
pub fn build_router(shared_data: Arc<SharedData>) -> Router {
    let router = Router::new()
        .nest("/api/todos", api::todo::todo_routes())
        .merge(api::todo_page::todo_page_routes())
        .with_state(shared_data)
        .merge(api::swagger_main::build_documentation());

    logging::attach_tracing_http(router)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_util::{ErrorBody, deserialize_body};
    use crate::domain::todo::Ownership;
    use crate::identity::test_util::{TEST_SECRET, issue_token};
    use axum::body::Body;
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
    use axum::http::{Method, Request, StatusCode};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    /// Router whose pool never connects. Only requests rejected before touching the store
    /// can be sent through it.
    fn offline_router(ownership: Ownership, token_verifier: Option<JwtTokenVerifier>) -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/nowhere")
            .expect("lazy pool should not need a live database");
        let shared_data = SharedData::new(
            persistence::ExternalConnectivity::new(pool),
            TodoService::new(ownership),
            token_verifier,
        );

        build_router(Arc::new(shared_data))
    }

    #[tokio::test]
    async fn rejects_forged_access_token() {
        let router = offline_router(
            Ownership::MultiUser,
            Some(JwtTokenVerifier::new(TEST_SECRET)),
        );
        let forged_token = issue_token("not-the-real-secret", "alice");

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/todos")
                    .header(AUTHORIZATION, format!("Bearer {forged_token}"))
                    .body(Body::empty())
                    .expect("Could not build request"),
            )
            .await
            .expect("Router should always respond");

        assert_eq!(StatusCode::UNAUTHORIZED, response.status());
        let body: ErrorBody = deserialize_body(response.into_body()).await;
        assert_eq!("unauthorized", body.error_code);
    }

    #[tokio::test]
    async fn anonymous_listing_never_reads_the_store() {
        let router = offline_router(
            Ownership::MultiUser,
            Some(JwtTokenVerifier::new(TEST_SECRET)),
        );

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/todos")
                    .body(Body::empty())
                    .expect("Could not build request"),
            )
            .await
            .expect("Router should always respond");

        assert_eq!(StatusCode::OK, response.status());
        let todos: Vec<dto::TodoItem> = deserialize_body(response.into_body()).await;
        assert!(todos.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_a_400() {
        let router = offline_router(
            Ownership::MultiUser,
            Some(JwtTokenVerifier::new(TEST_SECRET)),
        );
        let token = issue_token(TEST_SECRET, "alice");

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/todos")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title": "Buy milk""#))
                    .expect("Could not build request"),
            )
            .await
            .expect("Router should always respond");

        assert_eq!(StatusCode::BAD_REQUEST, response.status());
        let body: ErrorBody = deserialize_body(response.into_body()).await;
        assert_eq!("invalid_json", body.error_code);
    }

    #[tokio::test]
    async fn serves_openapi_document() {
        let router = offline_router(Ownership::SingleUser, None);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .expect("Could not build request"),
            )
            .await
            .expect("Router should always respond");

        assert_eq!(StatusCode::OK, response.status());
        let document: serde_json::Value = deserialize_body(response.into_body()).await;
        assert!(document["paths"]["/api/todos"].is_object());
    }
}
