//! Version 1 REST API.
//!
//! - `POST /v1/ask`: answer a question within a conversation
//! - `GET /v1/config`, `POST /v1/set_config`: domain instructions
//! - `GET /v1/conversations/{id}`: remembered exchanges of one conversation

use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use ragdesk_agent::AnswerResponse;
use ragdesk_core::message::{ConversationId, Exchange};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::SharedState;

/// Build the `/v1` router.
pub fn v1_router(state: SharedState) -> Router {
    Router::new()
        .route("/ask", post(ask_handler))
        .route("/config", get(get_config_handler))
        .route("/set_config", post(set_config_handler))
        .route("/conversations/{id}", get(get_conversation_handler))
        .with_state(state)
}

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DomainConfigBody {
    pub domain_instructions: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub conversation_id: ConversationId,
    pub exchanges: Vec<Exchange>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ── Handlers ──────────────────────────────────────────────────────────────

/// 200 for any body within the size limit: failures come back as an
/// apologetic answer and unreadable JSON is answered as an empty question.
/// Oversized bodies keep their 413.
async fn ask_handler(
    State(state): State<SharedState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, JsonRejection> {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection @ JsonRejection::BytesRejection(_)) => return Err(rejection),
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable ask request, treating as empty question");
            AskRequest::default()
        }
    };

    let response = state
        .desk
        .answer_question(&payload.question, payload.conversation_id.as_deref())
        .await;
    Ok(Json(response))
}

async fn get_config_handler(State(state): State<SharedState>) -> Json<DomainConfigBody> {
    Json(DomainConfigBody {
        domain_instructions: state.desk.domain().current(),
    })
}

async fn set_config_handler(
    State(state): State<SharedState>,
    Json(payload): Json<DomainConfigBody>,
) -> Json<DomainConfigBody> {
    state.desk.domain().set(payload.domain_instructions);
    info!("Domain instructions updated via API");
    Json(DomainConfigBody {
        domain_instructions: state.desk.domain().current(),
    })
}

async fn get_conversation_handler(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, (StatusCode, Json<ErrorResponse>)> {
    let id = ConversationId::from(id);

    let lookup = state
        .desk
        .sessions()
        .get(&id)
        .and_then(|session| session.map(|s| s.exchanges()).transpose());

    match lookup {
        Ok(Some(exchanges)) => Ok(Json(ConversationResponse {
            conversation_id: id,
            count: exchanges.len(),
            exchanges,
        })),
        Ok(None) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("conversation {id} not found"),
            }),
        )),
        Err(e) => {
            error!(conversation_id = %id, error = %e, "Failed to read conversation");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "conversation history unavailable".into(),
                }),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn malformed_ask_body_is_answered_not_rejected() {
        let app = v1_router(test_state());

        let request = Request::builder()
            .method("POST")
            .uri("/ask")
            .header("content-type", "application/json")
            .body(Body::from("{\"question\": "))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: AnswerResponse = json_body(response).await;
        assert_eq!(json.answer, ragdesk_agent::ASK_FOR_QUESTION_REPLY);
        assert!(!json.conversation_id.as_str().is_empty());
    }

    #[tokio::test]
    async fn ask_without_content_type_is_answered() {
        let app = v1_router(test_state());

        let request = Request::builder()
            .method("POST")
            .uri("/ask")
            .body(Body::from("question=Hours"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: AnswerResponse = json_body(response).await;
        assert_eq!(json.answer, ragdesk_agent::ASK_FOR_QUESTION_REPLY);
    }

    #[tokio::test]
    async fn ask_without_id_returns_fresh_id() {
        let app = v1_router(test_state());

        let response = app
            .oneshot(post_json("/ask", serde_json::json!({ "question": "Hours?" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: AnswerResponse = json_body(response).await;
        assert_eq!(json.answer, "echo Hours?");
        assert!(!json.conversation_id.as_str().is_empty());
    }

    #[tokio::test]
    async fn ask_then_read_conversation() {
        let state = test_state();

        let response = v1_router(state.clone())
            .oneshot(post_json(
                "/ask",
                serde_json::json!({ "question": "Hours?", "conversation_id": "c1" }),
            ))
            .await
            .unwrap();
        let json: AnswerResponse = json_body(response).await;
        assert_eq!(json.conversation_id.as_str(), "c1");

        let response = v1_router(state).oneshot(get("/conversations/c1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: ConversationResponse = json_body(response).await;
        assert_eq!(json.count, 1);
        assert_eq!(json.exchanges[0].question, "Hours?");
        assert_eq!(json.exchanges[0].answer, "echo Hours?");
    }

    #[tokio::test]
    async fn empty_question_is_still_200() {
        let state = test_state();
        let response = v1_router(state.clone())
            .oneshot(post_json("/ask", serde_json::json!({ "conversation_id": "c5" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json: AnswerResponse = json_body(response).await;
        assert_eq!(json.answer, ragdesk_agent::ASK_FOR_QUESTION_REPLY);
        assert_eq!(json.conversation_id.as_str(), "c5");
        assert!(!state.desk.sessions().contains(&"c5".into()));
    }

    #[tokio::test]
    async fn unknown_conversation_is_404() {
        let response = v1_router(test_state())
            .oneshot(get("/conversations/missing"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let json: ErrorResponse = json_body(response).await;
        assert!(json.error.contains("missing"));
    }

    #[tokio::test]
    async fn config_roundtrip_updates_domain() {
        let state = test_state();

        let response = v1_router(state.clone()).oneshot(get("/config")).await.unwrap();
        let json: DomainConfigBody = json_body(response).await;
        assert_eq!(json.domain_instructions, "You support a bakery.");

        let response = v1_router(state.clone())
            .oneshot(post_json(
                "/set_config",
                serde_json::json!({ "domain_instructions": "You support a bike shop." }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(state.desk.domain().current(), "You support a bike shop.");
    }

    #[tokio::test]
    async fn set_config_requires_field() {
        let response = v1_router(test_state())
            .oneshot(post_json("/set_config", serde_json::json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
