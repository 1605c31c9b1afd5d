//! The think step: conversation memory plus one model call per utterance.

use std::sync::Arc;

use nexus_providers::ChatModel;
use nexus_types::{Action, ChatHistory, parse_model_reply};

pub const MISSING_MODEL_REPLY: &str = "Brain missing. Check API Key.";
pub const FORMAT_ERROR_REPLY: &str = "I understood, but I had trouble formatting my response.";

pub struct Brain {
    model: Option<Arc<dyn ChatModel>>,
    history: ChatHistory,
}

impl Brain {
    /// `model` is `None` when no API key is configured; every turn then
    /// answers with [`MISSING_MODEL_REPLY`].
    #[must_use]
    pub fn new(model: Option<Arc<dyn ChatModel>>, history: ChatHistory) -> Self {
        Self { model, history }
    }

    #[must_use]
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    #[must_use]
    pub fn history(&self) -> &ChatHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Turn an utterance into actions. Never fails: problems come back as a
    /// single `response` action.
    pub async fn think(&mut self, user_text: &str) -> Vec<Action> {
        let Some(model) = self.model.clone() else {
            return vec![Action::response(MISSING_MODEL_REPLY)];
        };

        self.history.push_user(user_text);
        let reply = match model.complete(self.history.messages()).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(model = model.model_name(), "Model call failed: {e}");
                return vec![Action::response(format!("Error: {e}"))];
            }
        };
        self.history.push_assistant(reply.clone());

        match parse_model_reply(&reply) {
            Ok(actions) if actions.is_empty() => vec![Action::response(reply)],
            Ok(actions) => {
                tracing::debug!(count = actions.len(), "Model chose actions");
                actions
            }
            Err(e) => {
                tracing::warn!("{e}");
                vec![Action::response(FORMAT_ERROR_REPLY)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedModel;
    use nexus_providers::ProviderError;
    use nexus_types::Role;
    use serde_json::json;

    fn brain(model: ScriptedModel) -> Brain {
        Brain::new(Some(Arc::new(model)), ChatHistory::new("system"))
    }

    #[tokio::test]
    async fn missing_model_answers_without_touching_history() {
        let mut brain = Brain::new(None, ChatHistory::new("system"));
        let actions = brain.think("hello").await;
        assert_eq!(actions, vec![Action::response(MISSING_MODEL_REPLY)]);
        assert_eq!(brain.history().len(), 1);
    }

    #[tokio::test]
    async fn reply_is_normalized_and_remembered() {
        let model = ScriptedModel::replies([r#"{"actions":[{"tool":"get_time"},{"tool":"get_date"}]}"#]);
        let mut brain = brain(model.clone());

        let actions = brain.think("time and date").await;
        assert_eq!(
            actions,
            vec![Action::new("get_time", json!({})), Action::new("get_date", json!({}))]
        );
        let roles: Vec<Role> = brain.history().messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(model.requests()[0].len(), 2);
    }

    #[tokio::test]
    async fn invalid_json_gets_the_formatting_apology() {
        let mut brain = brain(ScriptedModel::replies(["Sure thing!"]));
        let actions = brain.think("hi").await;
        assert_eq!(actions, vec![Action::response(FORMAT_ERROR_REPLY)]);
        assert_eq!(brain.history().len(), 3);
    }

    #[tokio::test]
    async fn empty_envelope_speaks_raw_text() {
        let mut brain = brain(ScriptedModel::replies(["{\"actions\": []}"]));
        let actions = brain.think("hi").await;
        assert_eq!(actions, vec![Action::response("{\"actions\": []}")]);
    }

    #[tokio::test]
    async fn model_error_keeps_user_turn() {
        let model = ScriptedModel::failing(ProviderError::Http {
            status: 401,
            message: "Invalid API Key".to_string(),
        });
        let mut brain = brain(model);
        let actions = brain.think("hi").await;
        assert_eq!(
            actions,
            vec![Action::response("Error: API error 401: Invalid API Key")]
        );
        assert_eq!(brain.history().len(), 2);
    }

    #[tokio::test]
    async fn clear_keeps_system_prompt() {
        let mut brain = brain(ScriptedModel::replies(["{\"tool\":\"get_time\"}"]));
        brain.think("time").await;
        brain.clear_history();
        assert_eq!(brain.history().len(), 1);
        assert_eq!(brain.history().system_prompt(), "system");
    }
}
