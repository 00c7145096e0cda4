/// OpenAPI documentation for the messaging core
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Marketplace Messaging API",
        version = "1.0.0",
        description = "Two-party conversations, messages with attachments, delivery status and poll-based sync",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:3000", description = "Development server"),
    ),
    tags(
        (name = "Health", description = "Service health checks"),
        (name = "Conversations", description = "Conversation registry and unread counters"),
        (name = "Messages", description = "Message history and append"),
        (name = "Attachments", description = "Validated binary uploads"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    pub fn title() -> &'static str {
        "Marketplace Messaging API"
    }

    pub fn version() -> &'static str {
        "1.0.0"
    }
}
