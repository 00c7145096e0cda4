use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::{
    routing::{delete, get, post},
    Json, Router,
};

pub mod attachments;
pub mod conversations;
pub mod messages;

use attachments::upload_attachment;
use conversations::{create_conversation, list_conversations, mark_read};
use messages::{delete_message, get_message_history, send_message};

// Largest allowed upload is a 50 MiB video; leave room for multipart framing.
const MAX_UPLOAD_BODY_BYTES: usize = 52 * 1024 * 1024;

// OpenAPI endpoint handler
async fn openapi_json() -> Json<serde_json::Value> {
    use utoipa::OpenApi;
    Json(serde_json::to_value(crate::openapi::ApiDoc::openapi()).unwrap_or_default())
}

async fn metrics() -> String {
    crate::metrics::render()
}

// Swagger UI handler
async fn swagger_ui() -> axum::response::Html<&'static str> {
    axum::response::Html(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Marketplace Messaging API</title>
    <link rel="stylesheet" type="text/css" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js"></script>
    <script>
        window.onload = function() {
            SwaggerUIBundle({
                url: "/openapi.json",
                dom_id: '#swagger-ui',
                deepLinking: true,
                presets: [SwaggerUIBundle.presets.apis],
            });
        };
    </script>
</body>
</html>"#,
    )
}

// Documentation entry point
async fn docs() -> axum::response::Html<&'static str> {
    axum::response::Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Marketplace Messaging API</title>
</head>
<body>
    <h1>Marketplace Messaging API</h1>
    <p><a href="/swagger-ui">Swagger UI (interactive)</a></p>
    <p><a href="/openapi.json">OpenAPI JSON (raw)</a></p>
</body>
</html>"#,
    )
}

pub fn build_router() -> Router<AppState> {
    // Service introspection endpoints (no identity required)
    let introspection = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(metrics))
        .route("/openapi.json", get(openapi_json))
        .route("/swagger-ui", get(swagger_ui))
        .route("/docs", get(docs));

    // API v1 endpoints; every route requires a resolved caller identity
    let api_v1 = Router::new()
        .route(
            "/conversations",
            post(create_conversation).get(list_conversations),
        )
        .route(
            "/conversations/:id/messages",
            post(send_message).get(get_message_history),
        )
        .route("/conversations/:id/read", post(mark_read))
        .route("/attachments", post(upload_attachment))
        .route("/messages/:id", delete(delete_message))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BODY_BYTES))
        .layer(middleware::from_fn(
            crate::middleware::auth::identity_middleware,
        ));

    let router = introspection
        .merge(Router::new().nest("/api/v1", api_v1))
        .layer(middleware::from_fn(crate::metrics::track_http_metrics));

    crate::middleware::with_defaults(router)
}
