//! Question answering handler

use super::Status;
use crate::extract::ValidatedJson;
use crate::AppState;
use axum::{extract::State, Json};
use docqa_common::errors::Result;
use docqa_common::Citation;
use docqa_context::QueryRequest;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct QueryBody {
    #[validate(length(min = 1, max = 4000))]
    pub query: String,

    #[validate(length(min = 1))]
    pub document_id: String,

    /// Continue an existing conversation
    #[serde(default)]
    pub conversation_id: Option<String>,

    #[serde(default = "default_require_citations")]
    pub require_citations: bool,
}

fn default_require_citations() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct AnswerBody {
    pub answer: String,
    pub citations: Vec<Citation>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub status: Status,
    pub response: AnswerBody,
    pub conversation_id: String,
}

/// POST /api/query - answer a question about an indexed document
pub async fn query(
    State(state): State<AppState>,
    ValidatedJson(body): ValidatedJson<QueryBody>,
) -> Result<Json<QueryResponse>> {
    let request = QueryRequest {
        query: body.query,
        document_id: body.document_id,
        conversation_id: body.conversation_id,
        require_citations: body.require_citations,
    };

    let result = state.engine.orchestrator().answer(request).await?;

    Ok(Json(QueryResponse {
        status: Status::Success,
        response: AnswerBody {
            answer: result.answer,
            citations: result.citations,
        },
        conversation_id: result.conversation_id,
    }))
}
