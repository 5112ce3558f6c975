//! AI coach conversation.

use ringside_core::ChatTurn;
use tower_sessions::Session;
use tracing::warn;

use crate::api::ApiClient;
use crate::api::types::ChatRequest;
use crate::models::session_keys;

/// Turns kept in the session and sent to the coach.
pub const HISTORY_LIMIT: usize = 20;

/// Longest message accepted, in characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Shown when the coach cannot be reached.
const APOLOGY: &str = "Sorry, the coach is unavailable right now. Please try again in a moment.";

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message is empty")]
    Empty,

    #[error("message is longer than {max} characters")]
    TooLong { max: usize },

    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

/// The stored conversation, oldest first.
pub async fn history(session: &Session) -> Vec<ChatTurn> {
    match session.get::<Vec<ChatTurn>>(session_keys::CHAT_HISTORY).await {
        Ok(turns) => turns.unwrap_or_default(),
        Err(e) => {
            warn!(error = %e, "Discarding unreadable chat history");
            Vec::new()
        }
    }
}

/// Append a visitor message, ask the coach, append the reply.
///
/// A coach failure is answered with an apology turn rather than an error.
///
/// # Errors
///
/// Returns [`ChatError::Empty`] or [`ChatError::TooLong`] for a bad message,
/// or [`ChatError::Session`] if the session cannot be written.
pub async fn send(api: &ApiClient, session: &Session, message: &str) -> Result<Vec<ChatTurn>, ChatError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ChatError::Empty);
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ChatError::TooLong { max: MAX_MESSAGE_CHARS });
    }

    let mut turns = history(session).await;
    turns.push(ChatTurn::user(message));
    truncate(&mut turns);

    let reply = match api.chat(&ChatRequest { messages: &turns }).await {
        Ok(reply) if !reply.reply.trim().is_empty() => ChatTurn::assistant(reply.reply),
        Ok(_) => {
            warn!("Coach returned an empty reply");
            ChatTurn::assistant(APOLOGY)
        }
        Err(e) => {
            warn!(error = %e, "Coach unavailable");
            ChatTurn::assistant(APOLOGY)
        }
    };
    turns.push(reply);
    truncate(&mut turns);

    session.insert(session_keys::CHAT_HISTORY, &turns).await?;
    Ok(turns)
}

/// Forget the conversation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn reset(session: &Session) -> Result<(), ChatError> {
    session.remove_value(session_keys::CHAT_HISTORY).await?;
    Ok(())
}

fn truncate(turns: &mut Vec<ChatTurn>) {
    if turns.len() > HISTORY_LIMIT {
        turns.drain(..turns.len() - HISTORY_LIMIT);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;
    use crate::config::ApiConfig;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn offline_api() -> ApiClient {
        ApiClient::new(&ApiConfig::new("http://127.0.0.1:9".parse().unwrap())).unwrap()
    }

    #[test]
    fn test_truncate_keeps_latest_turns() {
        let mut turns: Vec<_> = (0..25).map(|i| ChatTurn::user(i.to_string())).collect();
        truncate(&mut turns);
        assert_eq!(turns.len(), HISTORY_LIMIT);
        assert_eq!(turns[0].content, "5");
    }

    #[tokio::test]
    async fn test_blank_and_oversized_messages_are_rejected() {
        let api = offline_api();
        let session = session();

        assert!(matches!(send(&api, &session, "   ").await, Err(ChatError::Empty)));
        let long = "a".repeat(MAX_MESSAGE_CHARS + 1);
        assert!(matches!(
            send(&api, &session, &long).await,
            Err(ChatError::TooLong { .. })
        ));
        assert!(history(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_coach_gets_apology() {
        let api = offline_api();
        let session = session();

        let turns = send(&api, &session, "How do I slip a jab?").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert!(turns[0].is_user());
        assert_eq!(turns[1].content, APOLOGY);

        reset(&session).await.unwrap();
        assert!(history(&session).await.is_empty());
    }
}
