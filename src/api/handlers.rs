// src/api/handlers.rs

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::{types::*, ApiState};
use crate::conversation::ConversationSession;
use crate::infra::errors::ParlayError;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(e: &ParlayError) -> ApiError {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        tracing::warn!("Request failed: {}", e);
    }
    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
            detail: e.detail().map(str::to_string),
        }),
    )
}

fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
            detail: None,
        }),
    )
}

fn speech_unavailable() -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "Speech is not configured".into(),
            detail: None,
        }),
    )
}

fn welcome(session: &ConversationSession) -> Result<WelcomeResponse, ParlayError> {
    let scenario = session.sequencer.scenario()?;
    Ok(WelcomeResponse {
        session_id: session.session_id.clone(),
        message: scenario.welcome.clone(),
        step: StepView::from(session.sequencer.current_step()?),
        scenario: scenario.scenario_code.clone(),
        meta: None,
        expressions: Vec::new(),
    })
}

/// POST /api/v1/conversation — Start, reset or continue a role-play session.
pub async fn conversation(
    State(state): State<ApiState>,
    Json(body): Json<ConversationRequest>,
) -> Result<Response, ApiError> {
    let session_id = body
        .session_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&state.sessions_config.default_session_id)
        .to_string();
    let message = body
        .message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty());

    let (handle, created) = state.registry.get_or_create(&session_id, &body.scenario);
    let mut session = handle.lock().await;

    match body.action {
        Some(ConversationAction::Reset) => {
            if !created {
                session.sequencer.reset().map_err(|e| error_response(&e))?;
                tracing::info!("Session '{}' reset", session_id);
            }
            let resp = welcome(&session).map_err(|e| error_response(&e))?;
            return Ok(Json(resp).into_response());
        }
        Some(ConversationAction::Start) => {
            if !created {
                session.sequencer.reset().map_err(|e| error_response(&e))?;
            }
            let reply = session
                .sequencer
                .open(&state.gateway)
                .await
                .map_err(|e| error_response(&e))?;
            let mut resp = welcome(&session).map_err(|e| error_response(&e))?;
            resp.message = reply.text;
            resp.meta = reply.meta;
            resp.expressions = reply.expressions;
            return Ok(Json(resp).into_response());
        }
        None => {}
    }

    let Some(message) = message.filter(|_| !created) else {
        let resp = welcome(&session).map_err(|e| error_response(&e))?;
        return Ok(Json(resp).into_response());
    };

    let outcome = session
        .sequencer
        .take_turn(&state.gateway, message)
        .await
        .map_err(|e| error_response(&e))?;
    let scenario = session
        .scenario_code()
        .unwrap_or_default()
        .to_string();

    Ok(Json(TurnResponse {
        session_id,
        user_message: message.to_string(),
        ai_response: outcome.reply.text,
        meta: outcome.reply.meta,
        expressions: outcome.reply.expressions,
        current_step: StepView::from(&outcome.current_step),
        is_complete: outcome.is_complete,
        scenario,
        progress: outcome.progress,
    })
    .into_response())
}

/// GET /api/v1/scenarios — Known scenario codes.
pub async fn list_scenarios(State(state): State<ApiState>) -> Json<ScenarioList> {
    let catalog = &state.catalog;
    Json(ScenarioList {
        default: catalog.default_scenario().scenario_code.clone(),
        scenarios: catalog
            .all()
            .iter()
            .map(|s| ScenarioSummary {
                code: s.scenario_code.clone(),
                title: s.title.clone(),
                aliases: s.aliases.clone(),
                language: s.language.clone(),
                steps: s.step_count(),
            })
            .collect(),
    })
}

/// DELETE /api/v1/sessions/{id} — Drop a session.
pub async fn delete_session(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.registry.remove(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error_response(&ParlayError::SessionNotFound { session_id: id }))
    }
}

/// POST /api/v1/speech/transcribe — Raw audio body to text.
pub async fn transcribe(
    State(state): State<ApiState>,
    Query(query): Query<TranscribeQuery>,
    body: Bytes,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let Some(speech) = state.speech.as_ref() else {
        return Err(speech_unavailable());
    };
    if body.is_empty() {
        return Err(bad_request("Audio body cannot be empty"));
    }

    let filename = query.filename.unwrap_or_else(|| "audio.webm".into());
    let language = query.language.or_else(|| state.speech_config.language.clone());

    let text = speech
        .transcribe(body.to_vec(), &filename, language.as_deref())
        .await
        .map_err(|e| error_response(&e))?;
    Ok(Json(TranscribeResponse { text }))
}

/// POST /api/v1/speech/synthesize — Text to MP3 audio.
pub async fn synthesize(
    State(state): State<ApiState>,
    Json(body): Json<SynthesizeRequest>,
) -> Result<Response, ApiError> {
    let Some(speech) = state.speech.as_ref() else {
        return Err(speech_unavailable());
    };
    if body.text.trim().is_empty() {
        return Err(bad_request("Text cannot be empty"));
    }

    let voice = body.voice.unwrap_or_else(|| state.speech_config.voice.clone());
    let audio = speech
        .synthesize(&body.text, &voice)
        .await
        .map_err(|e| error_response(&e))?;
    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

/// GET /api/v1/health — Simple health check.
pub async fn health(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.registry.len(),
    }))
}
