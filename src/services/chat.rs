use std::collections::HashMap;
use std::sync::Arc;

use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::ChatMessage,
    services::http::ensure_success,
};

/// Prompt every conversation starts with
pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";

/// Reply used when no chat backend produced an answer
pub const UNAVAILABLE_REPLY: &str =
    "I'm sorry, I'm currently unable to process your request. Please try again later.";

const MAX_TOKENS: u32 = 300;
const TEMPERATURE: f32 = 0.7;

/// A language model that continues a conversation
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the assistant's next message for `messages`
    async fn complete(&self, messages: &[ChatMessage]) -> AppResult<String>;

    /// Backend name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint
///
/// Used for both the hosted model and a local fallback server; the latter
/// typically has no API key.
pub struct OpenAiChatModel {
    http_client: ClientWithMiddleware,
    api_url: String,
    api_key: Option<String>,
    model: String,
    label: &'static str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiChatModel {
    pub fn new(
        http_client: ClientWithMiddleware,
        api_url: String,
        api_key: Option<String>,
        model: String,
        label: &'static str,
    ) -> Self {
        Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            label,
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, messages: &[ChatMessage]) -> AppResult<String> {
        let url = format!("{}/v1/chat/completions", self.api_url);
        let body = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let mut request = self.http_client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = ensure_success(self.label, request.send().await?).await?;
        let completion: CompletionResponse = response.json().await?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| AppError::ExternalApi(format!("{} returned an empty completion", self.label)))
    }

    fn name(&self) -> &'static str {
        self.label
    }
}

/// Per-user conversations backed by an ordered list of chat models
///
/// Models are tried in order; the first one to answer wins.
pub struct ChatService {
    models: Vec<Arc<dyn ChatModel>>,
    conversations: RwLock<HashMap<String, Vec<ChatMessage>>>,
}

impl ChatService {
    pub fn new(models: Vec<Arc<dyn ChatModel>>) -> Self {
        Self {
            models,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Records `input` in the user's history and returns the assistant reply
    pub async fn reply(&self, user_id: &str, input: &str) -> String {
        let history = {
            let mut conversations = self.conversations.write().await;
            let history = conversations
                .entry(user_id.to_string())
                .or_insert_with(|| vec![ChatMessage::system(SYSTEM_PROMPT)]);
            history.push(ChatMessage::user(input));
            history.clone()
        };

        let reply = self
            .complete(&history)
            .await
            .unwrap_or_else(|| UNAVAILABLE_REPLY.to_string());

        let mut conversations = self.conversations.write().await;
        if let Some(history) = conversations.get_mut(user_id) {
            history.push(ChatMessage::assistant(reply.clone()));
        }

        reply
    }

    /// Runs `messages` through the models in order
    async fn complete(&self, messages: &[ChatMessage]) -> Option<String> {
        for model in &self.models {
            match model.complete(messages).await {
                Ok(reply) => return Some(reply),
                Err(e) => {
                    tracing::warn!(model = model.name(), error = %e, "Chat model failed, trying next");
                }
            }
        }

        tracing::error!(models = self.models.len(), "No chat model produced a reply");
        None
    }

    /// Conversation so far for `user_id`
    pub async fn history(&self, user_id: &str) -> Vec<ChatMessage> {
        self.conversations
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn failing_model() -> MockChatModel {
        let mut model = MockChatModel::new();
        model
            .expect_complete()
            .returning(|_| Err(AppError::ExternalApi("rate limited".to_string())));
        model.expect_name().return_const("hosted");
        model
    }

    #[tokio::test]
    async fn test_reply_uses_first_model() {
        let mut hosted = MockChatModel::new();
        hosted
            .expect_complete()
            .withf(|messages| {
                messages.len() == 2
                    && messages[0].role == Role::System
                    && messages[1].content == "Find me a run"
            })
            .times(1)
            .returning(|_| Ok("Try the river loop.".to_string()));

        let service = ChatService::new(vec![Arc::new(hosted)]);
        let reply = service.reply("alice", "Find me a run").await;

        assert_eq!(reply, "Try the river loop.");
        let history = service.history("alice").await;
        assert_eq!(history.len(), 3);
        assert_eq!(history[2], ChatMessage::assistant("Try the river loop."));
    }

    #[tokio::test]
    async fn test_reply_falls_back_to_local_model() {
        let mut local = MockChatModel::new();
        local
            .expect_complete()
            .times(1)
            .returning(|_| Ok("Local answer".to_string()));

        let service = ChatService::new(vec![Arc::new(failing_model()), Arc::new(local)]);
        assert_eq!(service.reply("bob", "hello").await, "Local answer");
    }

    #[tokio::test]
    async fn test_reply_when_every_model_fails() {
        let service = ChatService::new(vec![Arc::new(failing_model())]);
        assert_eq!(service.reply("carol", "hello").await, UNAVAILABLE_REPLY);

        let history = service.history("carol").await;
        assert_eq!(history.last().unwrap().content, UNAVAILABLE_REPLY);
    }

    #[tokio::test]
    async fn test_history_is_per_user_and_accumulates() {
        let mut model = MockChatModel::new();
        model.expect_complete().returning(|_| Ok("ok".to_string()));
        let service = ChatService::new(vec![Arc::new(model)]);

        service.reply("dave", "first").await;
        service.reply("dave", "second").await;
        service.reply("erin", "only").await;

        assert_eq!(service.history("dave").await.len(), 5);
        assert_eq!(service.history("erin").await.len(), 3);
        assert!(service.history("nobody").await.is_empty());
    }
}
