//! HTTP transport.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use lobby_core::{
    model::{Message, Participant},
    traits::ChatStore,
};
use lobby_service::{ChatError, ChatService};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::protocol::{JoinRequest, MessagesQuery, SendRequest, USER_HEADER};

/// Shared handler state.
pub type ChatState<S> = Arc<ChatService<S>>;

/// Error returned by handlers, rendered as a status code plus a short
/// plain-text reason.
#[derive(Debug)]
pub struct ApiError(pub ChatError);

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ChatError::InvalidArgument(rejection.body_text()))
    }
}

impl ApiError {
    /// Status code for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ChatError::InvalidArgument(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ChatError::Conflict(_) | ChatError::UnknownSender(_) => StatusCode::CONFLICT,
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
            ChatError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        } else {
            tracing::debug!("Request rejected: {}", self.0);
        }
        (status, self.0.to_string()).into_response()
    }
}

/// Acting participant, as named by the `User` header.
fn acting_user(headers: &HeaderMap) -> Option<&str> {
    headers.get(USER_HEADER).and_then(|v| v.to_str().ok())
}

async fn join<S: ChatStore>(
    State(chat): State<ChatState<S>>,
    body: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = body?;
    chat.join(req.name.as_deref().unwrap_or_default()).await?;
    Ok(StatusCode::CREATED)
}

async fn list_participants<S: ChatStore>(
    State(chat): State<ChatState<S>>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    Ok(Json(chat.participants().await?))
}

async fn send<S: ChatStore>(
    State(chat): State<ChatState<S>>,
    headers: HeaderMap,
    body: Result<Json<SendRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(req) = body?;
    chat.send(
        acting_user(&headers).unwrap_or_default(),
        req.to.as_deref().unwrap_or_default(),
        req.text.as_deref().unwrap_or_default(),
        req.kind.as_deref().unwrap_or_default(),
    )
    .await?;
    Ok(StatusCode::CREATED)
}

async fn list_messages<S: ChatStore>(
    State(chat): State<ChatState<S>>,
    headers: HeaderMap,
    query: Result<Query<MessagesQuery>, QueryRejection>,
) -> Result<Json<Vec<Message>>, ApiError> {
    // An unreadable query string (e.g. a repeated `limit`) means no limit.
    let limit = query.ok().and_then(|Query(q)| q.limit());
    let messages = chat.messages(acting_user(&headers), limit).await?;
    Ok(Json(messages))
}

async fn heartbeat<S: ChatStore>(
    State(chat): State<ChatState<S>>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    chat.heartbeat(acting_user(&headers).unwrap_or_default()).await?;
    Ok(StatusCode::OK)
}

/// Create the chat router.
///
/// # Example
/// ```ignore
/// let chat = Arc::new(ChatService::new(MemoryStore::new(), ChatConfig::default()));
/// let app = create_router(chat);
/// ```
#[must_use]
pub fn create_router<S>(chat: ChatState<S>) -> Router
where
    S: ChatStore + 'static,
{
    Router::new()
        .route("/participants", post(join::<S>).get(list_participants::<S>))
        .route("/messages", post(send::<S>).get(list_messages::<S>))
        .route("/status", post(heartbeat::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(chat)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use lobby_core::{BROADCAST, ChatConfig, ManualClock};
    use lobby_service::storage::MemoryStore;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    struct Harness {
        app: Router,
        chat: ChatState<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn harness() -> Harness {
        let clock = Arc::new(ManualClock::default());
        let chat = Arc::new(ChatService::with_clock(
            MemoryStore::new(),
            ChatConfig::default(),
            clock.clone(),
        ));
        Harness {
            app: create_router(Arc::clone(&chat)),
            chat,
            clock,
        }
    }

    fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(USER_HEADER, user);
        }
        match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn join_as(app: &Router, name: &str) -> StatusCode {
        call(
            app,
            request("POST", "/participants", None, Some(json!({ "name": name }))),
        )
        .await
        .0
    }

    async fn messages_for(app: &Router, uri: &str, user: Option<&str>) -> Vec<Value> {
        let (status, body) = call(app, request("GET", uri, user, None)).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn join_list_send_scenario() {
        let h = harness();
        assert_eq!(join_as(&h.app, "Ana").await, StatusCode::CREATED);

        let (status, body) = call(&h.app, request("GET", "/participants", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        let participants: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0]["name"], "Ana");
        assert!(participants[0]["lastStatus"].is_i64());

        let (status, _) = call(
            &h.app,
            request(
                "POST",
                "/messages",
                Some("Ana"),
                Some(json!({ "to": BROADCAST, "text": "hi", "type": "message" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let seen = messages_for(&h.app, "/messages", Some("Bob")).await;
        let last = seen.last().unwrap();
        assert_eq!(last["from"], "Ana");
        assert_eq!(last["to"], BROADCAST);
        assert_eq!(last["text"], "hi");
        assert_eq!(last["type"], "message");
        assert!(last["time"].is_string());
    }

    #[tokio::test]
    async fn duplicate_join_conflicts() {
        let h = harness();
        assert_eq!(join_as(&h.app, "Ana").await, StatusCode::CREATED);
        assert_eq!(join_as(&h.app, "Ana").await, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn malformed_join_is_unprocessable() {
        let h = harness();
        for body in [json!({}), json!({ "name": "" }), json!({ "name": 5 })] {
            let (status, _) = call(&h.app, request("POST", "/participants", None, Some(body))).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        }

        let raw = Request::builder()
            .method("POST")
            .uri("/participants")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        assert_eq!(call(&h.app, raw).await.0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn whitespace_name_and_text_are_accepted() {
        let h = harness();
        assert_eq!(join_as(&h.app, "  ").await, StatusCode::CREATED);
        assert_eq!(join_as(&h.app, "Ana").await, StatusCode::CREATED);

        let (status, _) = call(
            &h.app,
            request(
                "POST",
                "/messages",
                Some("Ana"),
                Some(json!({ "to": BROADCAST, "text": "  ", "type": "message" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let last = messages_for(&h.app, "/messages?limit=1", Some("Ana")).await;
        assert_eq!(last[0]["text"], "  ");
    }

    #[tokio::test]
    async fn unknown_body_keys_are_unprocessable() {
        let h = harness();
        let (status, _) = call(
            &h.app,
            request(
                "POST",
                "/participants",
                None,
                Some(json!({ "name": "Bob", "admin": true })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(h.chat.participants().await.unwrap().is_empty());

        join_as(&h.app, "Ana").await;
        let forged = json!({ "from": "Bob", "to": BROADCAST, "text": "hi", "type": "message" });
        let (status, _) = call(&h.app, request("POST", "/messages", Some("Ana"), Some(forged))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn send_status_codes() {
        let h = harness();
        join_as(&h.app, "Ana").await;

        let invalid = json!({ "to": BROADCAST, "text": "hi", "type": "status" });
        let (status, _) = call(&h.app, request("POST", "/messages", Some("Ana"), Some(invalid))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let valid = json!({ "to": BROADCAST, "text": "hi", "type": "message" });
        let (status, _) = call(
            &h.app,
            request("POST", "/messages", Some("Ghost"), Some(valid.clone())),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = call(&h.app, request("POST", "/messages", None, Some(valid))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn private_messages_hidden_from_third_parties() {
        let h = harness();
        for name in ["Ana", "Bob", "Carl"] {
            join_as(&h.app, name).await;
        }
        let (status, _) = call(
            &h.app,
            request(
                "POST",
                "/messages",
                Some("Ana"),
                Some(json!({ "to": "Bob", "text": "psst", "type": "private_message" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let has_secret = |log: Vec<Value>| log.iter().any(|m| m["text"] == "psst");
        assert!(has_secret(messages_for(&h.app, "/messages", Some("Bob")).await));
        assert!(has_secret(messages_for(&h.app, "/messages", Some("Ana")).await));
        assert!(!has_secret(messages_for(&h.app, "/messages", Some("Carl")).await));
        assert!(!has_secret(messages_for(&h.app, "/messages", None).await));
    }

    #[tokio::test]
    async fn limit_query() {
        let h = harness();
        join_as(&h.app, "Ana").await;
        for i in 0..5 {
            h.chat
                .send("Ana", BROADCAST, &format!("m{i}"), "message")
                .await
                .unwrap();
        }

        let tail = messages_for(&h.app, "/messages?limit=2", Some("Ana")).await;
        let texts: Vec<&str> = tail.iter().map(|m| m["text"].as_str().unwrap()).collect();
        assert_eq!(texts, ["m3", "m4"]);

        for uri in [
            "/messages",
            "/messages?limit=0",
            "/messages?limit=-1",
            "/messages?limit=x",
            "/messages?limit=1&limit=2",
        ] {
            assert_eq!(messages_for(&h.app, uri, Some("Ana")).await.len(), 6, "{uri}");
        }
    }

    #[tokio::test]
    async fn heartbeat_status_codes() {
        let h = harness();
        join_as(&h.app, "Ana").await;

        assert_eq!(
            call(&h.app, request("POST", "/status", Some("Ana"), None)).await.0,
            StatusCode::OK
        );
        assert_eq!(
            call(&h.app, request("POST", "/status", Some("Ghost"), None)).await.0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            call(&h.app, request("POST", "/status", None, None)).await.0,
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn idle_participant_leaves() {
        let h = harness();
        join_as(&h.app, "Ana").await;
        h.clock.advance(chrono::Duration::seconds(11));

        let report = h.chat.sweep().await.unwrap();
        assert_eq!(report.evicted, ["Ana"]);

        let (_, body) = call(&h.app, request("GET", "/participants", None, None)).await;
        let participants: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert!(participants.is_empty());

        let seen = messages_for(&h.app, "/messages", Some("Zoe")).await;
        let last = seen.last().unwrap();
        assert_eq!(last["from"], "Ana");
        assert_eq!(last["type"], "status");
        assert_eq!(last["text"], lobby_core::model::LEAVE_NOTICE);
    }

    #[test]
    fn store_errors_are_server_errors() {
        let err = ApiError(ChatError::Store(lobby_core::StoreError::Unavailable(
            "down".into(),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
