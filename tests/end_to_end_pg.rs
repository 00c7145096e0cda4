//! Full-stack tests against a real Postgres and the real HTTP surface,
//! driven through the sync client. They need a database:
//!
//!   DATABASE_URL=postgres://... cargo test -- --ignored
//!
//! and are ignored by default so the standard suite stays hermetic.

mod common;

use chat_service::config::Config;
use chat_service::models::{DeliveryStatus, MessageKind};
use chat_service::routes;
use chat_service::routes::messages::SendMessageRequest;
use chat_service::state::AppState;
use chat_service::storage::{MemoryStore, StorageConfig};
use chat_service::sync::{ChatClient, HttpChatApi};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::sync::Arc;
use uuid::Uuid;

async fn start_app() -> (String, Pool<Postgres>) {
    let database_url = common::test_database_url();
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("postgres reachable");
    chat_service::db::MIGRATOR.run(&pool).await.expect("migrations apply");

    let config = Config {
        database_url,
        port: 0,
        history_page_size: 20,
        history_page_size_max: 100,
        storage: StorageConfig {
            bucket: "chat-attachments-test".into(),
            region: "us-east-1".into(),
            base_url: "https://cdn.test".into(),
            path_style: true,
        },
    };

    let state = AppState {
        db: pool.clone(),
        attachments: Arc::new(MemoryStore::new()),
        config: Arc::new(config),
    };

    let app = routes::build_router().with_state(state);
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0))
        .await
        .expect("ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server runs");
    });

    (format!("http://{addr}"), pool)
}

fn text(content: &str) -> SendMessageRequest {
    SendMessageRequest {
        kind: MessageKind::Text,
        content: Some(content.to_string()),
        attachments: Vec::new(),
        idempotency_key: None,
    }
}

#[tokio::test]
#[ignore]
async fn two_clients_converge_on_one_history() {
    let (base_url, _pool) = start_app().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let mut alice_client = ChatClient::new(HttpChatApi::new(base_url.clone(), alice), alice, 20);
    let mut bob_client = ChatClient::new(HttpChatApi::new(base_url.clone(), bob), bob, 20);

    // Alice starts the conversation and sends a message.
    let conversation = alice_client.start_conversation(bob).await.unwrap();
    alice_client.open(conversation.id).await.unwrap();
    alice_client.send(text("hello")).await.unwrap();

    let entry = &alice_client.timeline().unwrap().entries()[0];
    assert_eq!(entry.status, DeliveryStatus::Delivered);

    // Bob's next poll sees the conversation with one unread message.
    bob_client.poll_once().await.unwrap();
    let summary = &bob_client.summaries()[0];
    assert_eq!(summary.id, conversation.id);
    assert_eq!(summary.unread_count, 1);
    assert_eq!(
        summary.last_message.as_ref().map(|m| m.preview.as_str()),
        Some("hello")
    );

    // Opening marks it read; the counter drops on the next poll.
    bob_client.open(conversation.id).await.unwrap();
    bob_client.poll_once().await.unwrap();
    assert_eq!(bob_client.summaries()[0].unread_count, 0);
    assert_eq!(
        bob_client.timeline().unwrap().entries()[0]
            .content
            .as_deref(),
        Some("hello")
    );

    // Alice observes the read status on her next poll.
    alice_client.poll_once().await.unwrap();
    assert_eq!(
        alice_client.timeline().unwrap().entries()[0].status,
        DeliveryStatus::Read
    );
}

#[tokio::test]
#[ignore]
async fn starting_the_same_pair_twice_reuses_one_conversation() {
    let (base_url, _pool) = start_app().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let mut alice_client = ChatClient::new(HttpChatApi::new(base_url.clone(), alice), alice, 20);
    let mut bob_client = ChatClient::new(HttpChatApi::new(base_url.clone(), bob), bob, 20);

    let first = alice_client.start_conversation(bob).await.unwrap();
    let second = bob_client.start_conversation(alice).await.unwrap();
    assert_eq!(first.id, second.id);

    // A conversation with yourself is rejected outright.
    let err = alice_client.start_conversation(alice).await.unwrap_err();
    assert!(err.to_string().contains("distinct participants"));
}

#[tokio::test]
#[ignore]
async fn upload_then_send_image_message_with_attachment() {
    let (base_url, _pool) = start_app().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    // Upload the binary first; the response echoes the validated metadata.
    let form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(vec![0u8; 2048])
            .file_name("pic.png")
            .mime_str("image/png")
            .expect("valid mime"),
    );
    let response = reqwest::Client::new()
        .post(format!("{base_url}/api/v1/attachments"))
        .header("x-user-id", alice.to_string())
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
    let upload: chat_service::routes::attachments::UploadResponse =
        response.json().await.unwrap();
    assert_eq!(upload.file_size, 2048);
    assert_eq!(upload.kind, MessageKind::Image);

    // Then append a message referencing it.
    let mut client = ChatClient::new(HttpChatApi::new(base_url.clone(), alice), alice, 20);
    let conversation = client.start_conversation(bob).await.unwrap();
    client.open(conversation.id).await.unwrap();

    client
        .send(SendMessageRequest {
            kind: MessageKind::Image,
            content: Some("look at this".into()),
            attachments: vec![chat_service::services::message_service::NewAttachment {
                file_url: upload.url,
                file_name: upload.file_name,
                file_type: upload.file_type,
                file_size: upload.file_size,
                storage_key: upload.storage_key,
                thumbnail_url: None,
                duration_secs: None,
            }],
            idempotency_key: None,
        })
        .await
        .unwrap();

    let entry = &client.timeline().unwrap().entries()[0];
    assert_eq!(entry.attachments.len(), 1);
    assert_eq!(entry.attachments[0].file_name, "pic.png");

    // An oversized upload is rejected before it reaches the store.
    let oversized = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(vec![0u8; 6 * 1024 * 1024])
            .file_name("big.png")
            .mime_str("image/png")
            .expect("valid mime"),
    );
    let response = reqwest::Client::new()
        .post(format!("{base_url}/api/v1/attachments"))
        .header("x-user-id", alice.to_string())
        .multipart(oversized)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 413);
}

#[tokio::test]
#[ignore]
async fn repeated_idempotency_key_returns_the_original_message() {
    let (base_url, _pool) = start_app().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let api = HttpChatApi::new(base_url, alice);
    let mut client = ChatClient::new(api, alice, 20);
    let conversation = client.start_conversation(bob).await.unwrap();
    client.open(conversation.id).await.unwrap();

    let mut request = text("once");
    request.idempotency_key = Some("retry-token-1".into());
    let first = client.send(request.clone()).await.unwrap();
    let second = client.send(request).await.unwrap();
    assert_eq!(first, second);

    client.poll_once().await.unwrap();
    let matching = client
        .timeline()
        .unwrap()
        .entries()
        .iter()
        .filter(|e| e.content.as_deref() == Some("once"))
        .count();
    assert_eq!(matching, 1);
}
