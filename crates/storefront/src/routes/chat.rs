//! AI coach chat handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use ringside_core::ChatTurn;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::filters;
use crate::middleware::PageContext;
use crate::services::chat::{self, MAX_MESSAGE_CHARS};
use crate::services::{ChatError, Flash, flash};
use crate::state::AppState;

#[derive(Template, WebTemplate)]
#[template(path = "chat/index.html")]
pub struct ChatTemplate {
    pub page: PageContext,
    pub turns: Vec<ChatTurn>,
    pub max_chars: usize,
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub message: String,
}

/// Show the conversation.
#[instrument(skip(session, page))]
pub async fn index(session: Session, page: PageContext) -> ChatTemplate {
    ChatTemplate {
        page,
        turns: chat::history(&session).await,
        max_chars: MAX_MESSAGE_CHARS,
    }
}

/// Send a message to the coach.
#[instrument(skip(state, session, form), fields(chars = form.message.chars().count()))]
pub async fn send(State(state): State<AppState>, session: Session, Form(form): Form<ChatForm>) -> Result<Redirect> {
    match chat::send(state.api(), &session, &form.message).await {
        Ok(_) => {}
        Err(ChatError::Empty) => flash::set(&session, Flash::error("Type a message first.")).await?,
        Err(e @ ChatError::TooLong { .. }) => flash::set(&session, Flash::error(format!("Your {e}."))).await?,
        Err(ChatError::Session(e)) => return Err(e.into()),
    }
    Ok(Redirect::to("/chat"))
}

/// Start a new conversation.
#[instrument(skip(session))]
pub async fn reset(session: Session) -> Result<Redirect> {
    match chat::reset(&session).await {
        Ok(()) => Ok(Redirect::to("/chat")),
        Err(ChatError::Session(e)) => Err(e.into()),
        Err(_) => Ok(Redirect::to("/chat")),
    }
}
