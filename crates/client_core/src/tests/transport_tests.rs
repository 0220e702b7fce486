use super::*;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
struct ReceivedPart {
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Clone)]
struct ServerState {
    reply: Arc<(StatusCode, String)>,
    received: Arc<Mutex<Vec<(&'static str, Vec<ReceivedPart>)>>>,
}

async fn read_parts(mut multipart: Multipart) -> Vec<ReceivedPart> {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.expect("field bytes").to_vec();
        parts.push(ReceivedPart {
            field: name,
            file_name,
            content_type,
            bytes,
        });
    }
    parts
}

async fn handle_register(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> (StatusCode, String) {
    let parts = read_parts(multipart).await;
    state.received.lock().await.push(("register", parts));
    (state.reply.0, state.reply.1.clone())
}

async fn handle_search(
    State(state): State<ServerState>,
    multipart: Multipart,
) -> (StatusCode, String) {
    let parts = read_parts(multipart).await;
    state.received.lock().await.push(("search", parts));
    (state.reply.0, state.reply.1.clone())
}

async fn spawn_identity_server(status: StatusCode, body: String) -> (String, ServerState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = ServerState {
        reply: Arc::new((status, body)),
        received: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/register", post(handle_register))
        .route("/search", post(handle_search))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

fn upload(name: &str, media_type: Option<&str>, bytes: &[u8]) -> UploadPayload {
    UploadPayload {
        file_name: name.to_string(),
        media_type: media_type.map(str::to_string),
        bytes: Arc::from(bytes.to_vec()),
    }
}

#[tokio::test]
async fn register_posts_single_image_part_and_returns_body() {
    let (server_url, state) =
        spawn_identity_server(StatusCode::OK, json!({ "animal_id": "7f3a" }).to_string()).await;
    let service = HttpIdentityService::new(&server_url).expect("service");

    let body = service
        .submit(
            WorkflowKind::Register,
            upload("cat.png", Some("image/png"), b"png-bytes"),
        )
        .await
        .expect("submit");
    assert_eq!(body, json!({ "animal_id": "7f3a" }));

    let received = state.received.lock().await.clone();
    assert_eq!(received.len(), 1);
    let (endpoint, parts) = &received[0];
    assert_eq!(*endpoint, "register");
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].field, "image");
    assert_eq!(parts[0].file_name.as_deref(), Some("cat.png"));
    assert_eq!(parts[0].content_type.as_deref(), Some("image/png"));
    assert_eq!(parts[0].bytes, b"png-bytes");
}

#[tokio::test]
async fn search_posts_to_search_endpoint() {
    let (server_url, state) =
        spawn_identity_server(StatusCode::OK, json!({ "matches": [] }).to_string()).await;
    let service = HttpIdentityService::new(&server_url).expect("service");

    let body = service
        .submit(WorkflowKind::Search, upload("cat2.jpg", None, b"jpg"))
        .await
        .expect("submit");
    assert_eq!(body, json!({ "matches": [] }));
    assert_eq!(state.received.lock().await[0].0, "search");
}

#[tokio::test]
async fn error_status_carries_body_error_message() {
    let (server_url, _state) = spawn_identity_server(
        StatusCode::UNPROCESSABLE_ENTITY,
        json!({ "error": "no face detected" }).to_string(),
    )
    .await;
    let service = HttpIdentityService::new(&server_url).expect("service");

    let err = service
        .submit(WorkflowKind::Register, upload("cat.png", None, b"x"))
        .await
        .expect_err("must fail");
    assert_eq!(
        err,
        TransportError::Status {
            status: 422,
            message: Some("no face detected".to_string())
        }
    );
}

#[tokio::test]
async fn error_status_without_json_body_has_no_message() {
    let (server_url, _state) =
        spawn_identity_server(StatusCode::BAD_GATEWAY, "upstream down".to_string()).await;
    let service = HttpIdentityService::new(&server_url).expect("service");

    let err = service
        .submit(WorkflowKind::Search, upload("cat.png", None, b"x"))
        .await
        .expect_err("must fail");
    assert_eq!(
        err,
        TransportError::Status {
            status: 502,
            message: None
        }
    );
}

#[tokio::test]
async fn success_with_non_json_body_is_invalid() {
    let (server_url, _state) = spawn_identity_server(StatusCode::OK, "<html>".to_string()).await;
    let service = HttpIdentityService::new(&server_url).expect("service");

    let err = service
        .submit(WorkflowKind::Register, upload("cat.png", None, b"x"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, TransportError::InvalidBody(_)), "{err:?}");
}

#[tokio::test]
async fn success_with_empty_body_is_null() {
    let (server_url, _state) = spawn_identity_server(StatusCode::OK, String::new()).await;
    let service = HttpIdentityService::new(&server_url).expect("service");

    let body = service
        .submit(WorkflowKind::Search, upload("cat.png", None, b"x"))
        .await
        .expect("submit");
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let service = HttpIdentityService::new(&format!("http://{addr}")).expect("service");
    let err = service
        .submit(WorkflowKind::Register, upload("cat.png", None, b"x"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, TransportError::Network(_)), "{err:?}");
}

/// Answers one request with a 200 whose body stops short of its declared length.
async fn spawn_truncating_server() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let read = socket.read(&mut chunk).await.expect("read request");
            request.extend_from_slice(&chunk[..read]);
            if read == 0 || request.ends_with(b"--\r\n") || request.ends_with(b"0\r\n\r\n") {
                break;
            }
        }
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 64\r\n\r\n{\"animal_id\"",
            )
            .await
            .expect("write partial response");
        socket.shutdown().await.ok();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn connection_lost_while_reading_success_body_is_a_network_error() {
    let server_url = spawn_truncating_server().await;
    let service = HttpIdentityService::new(&server_url).expect("service");

    let err = service
        .submit(WorkflowKind::Register, upload("cat.png", Some("image/png"), b"x"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, TransportError::Network(_)), "{err:?}");
}

#[tokio::test]
async fn invalid_media_type_is_a_client_error() {
    let service = HttpIdentityService::new("http://127.0.0.1:9").expect("service");
    let err = service
        .submit(
            WorkflowKind::Search,
            upload("cat.png", Some("not a mime type"), b"x"),
        )
        .await
        .expect_err("must fail");
    assert!(matches!(err, TransportError::Client(_)), "{err:?}");
}

#[test]
fn endpoints_join_onto_base_path() {
    let service = HttpIdentityService::new("https://faces.example/api").expect("service");
    assert_eq!(
        service.endpoint(WorkflowKind::Register).expect("url").as_str(),
        "https://faces.example/api/register"
    );
    assert_eq!(
        service.endpoint(WorkflowKind::Search).expect("url").as_str(),
        "https://faces.example/api/search"
    );
}

#[test]
fn rejects_unparseable_base_url() {
    assert!(HttpIdentityService::new("not a url").is_err());
    assert!(HttpIdentityService::new("mailto:someone@example.com").is_err());
}
