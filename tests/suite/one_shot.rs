//! Single turns and direct skill runs, as `ask` and `tool` use them.

use std::sync::Arc;

use nexus_config::NexusConfig;
use nexus_engine::{ActionStatus, MISSING_MODEL_REPLY, UNKNOWN_TOOL_REPLY};
use nexus_providers::ChatModel;
use nexus_types::Action;
use serde_json::json;
use wiremock::MockServer;

use crate::common::{groq, harness, mount_chat_reply};

#[tokio::test]
async fn ask_runs_one_turn() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_chat_reply(
        &server,
        r#"[{"tool": "set_clipboard", "text": "hello"}, {"tool": "get_clipboard"}]"#,
    )
    .await;

    let model: Arc<dyn ChatModel> = groq(&server);
    let mut h = harness(dir.path(), &NexusConfig::default(), Some(model));
    let outcomes = h.agent.turn("copy hello then read it back").await;

    let results: Vec<&str> = outcomes.iter().map(|o| o.result.as_str()).collect();
    assert_eq!(results, vec!["Text copied to clipboard.", "Clipboard content: hello"]);
    assert!(outcomes.iter().all(|o| o.status == ActionStatus::Succeeded));
}

#[tokio::test]
async fn no_model_still_answers() {
    let dir = tempfile::tempdir().unwrap();
    let mut h = harness(dir.path(), &NexusConfig::default(), None);
    let outcomes = h.agent.turn("hello").await;
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].result, MISSING_MODEL_REPLY);
    assert_eq!(h.speaker.spoken(), vec![MISSING_MODEL_REPLY.to_string()]);
}

#[tokio::test]
async fn direct_tool_runs_bypass_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let h = harness(dir.path(), &NexusConfig::default(), None);

    let outcome = h
        .agent
        .dispatcher()
        .execute(&Action::new("set_reminder", json!({ "message": "stretch", "time": "in 10 minutes" })))
        .await;
    assert_eq!(outcome.status, ActionStatus::Succeeded);
    assert_eq!(outcome.result, "Reminder set for 10 minutes: stretch");
    assert_eq!(h.ctx.reminders.list().len(), 1);

    let unknown = h
        .agent
        .dispatcher()
        .execute(&Action::new("fly_to_moon", json!({})))
        .await;
    assert_eq!(unknown.status, ActionStatus::UnknownTool);
    assert_eq!(unknown.result, "Unknown tool: fly_to_moon");
    assert!(h.speaker.spoken().contains(&UNKNOWN_TOOL_REPLY.to_string()));
}
