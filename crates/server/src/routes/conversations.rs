// crates/server/src/routes/conversations.rs
//! Conversation listing, message pages, state and cache endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use convo_live_core::{ActivityLevel, CacheStats, Conversation, ConversationState, PaginatedMessages};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_PAGE_LIMIT: usize = 100;
const MAX_PAGE_LIMIT: usize = 1000;

/// A listed conversation with its computed state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub state: ConversationState,
    pub activity: ActivityLevel,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<ActivityLevel>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResponse {
    pub conversation_id: String,
    pub state: ConversationState,
    pub activity: ActivityLevel,
}

#[derive(Debug, Serialize)]
pub struct CacheClearResponse {
    pub cleared: usize,
}

/// GET /api/conversations - All known conversations, newest first.
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<ConversationSummary>> {
    let orchestrator = &state.orchestrator;
    let conversations = orchestrator.conversations();

    let mut summaries = Vec::with_capacity(conversations.len());
    for conversation in conversations.iter() {
        let conv_state = match orchestrator.conversation_state(conversation).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(conversation_id = %conversation.id, error = %e, "State unavailable");
                continue;
            }
        };
        let activity = ActivityLevel::from_state(conv_state);
        if query.status.is_some_and(|wanted| wanted != activity) {
            continue;
        }
        summaries.push(ConversationSummary {
            conversation: conversation.clone(),
            state: conv_state,
            activity,
        });
    }

    Json(summaries)
}

/// GET /api/conversations/{id}/messages - Messages sorted by timestamp, then sliced.
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<PaginatedMessages>> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if limit == 0 {
        return Err(ApiError::BadRequest("limit must be greater than zero".to_string()));
    }
    let limit = limit.min(MAX_PAGE_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let conversation = state
        .orchestrator
        .conversation(&id)
        .ok_or_else(|| ApiError::ConversationNotFound(id.clone()))?;
    let messages = state
        .orchestrator
        .parsed_conversation(&conversation.file_path)
        .await?;

    Ok(Json(PaginatedMessages::from_messages(
        (*messages).clone(),
        offset,
        limit,
    )))
}

/// GET /api/conversations/{id}/state
pub async fn get_state(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<StateResponse>> {
    let conversation = state
        .orchestrator
        .conversation(&id)
        .ok_or_else(|| ApiError::ConversationNotFound(id.clone()))?;
    let conv_state = state.orchestrator.conversation_state(&conversation).await?;

    Ok(Json(StateResponse {
        conversation_id: id,
        state: conv_state,
        activity: ActivityLevel::from_state(conv_state),
    }))
}

/// POST /api/cache/clear
pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<CacheClearResponse> {
    Json(CacheClearResponse {
        cleared: state.orchestrator.reset_cache(),
    })
}

/// GET /api/cache/stats
pub async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.orchestrator.cache_stats())
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", get(list_conversations))
        .route("/conversations/{id}/messages", get(get_messages))
        .route("/conversations/{id}/state", get(get_state))
        .route("/cache/clear", post(clear_cache))
        .route("/cache/stats", get(cache_stats))
}
