//! The full listen, think, act loop against a mocked Groq server.

use std::sync::Arc;

use nexus_config::NexusConfig;
use nexus_engine::{ActionStatus, AgentCommand, AgentEvent, GOODBYE, SHUTDOWN};
use nexus_providers::ChatModel;
use nexus_voice::QueueListener;
use wiremock::MockServer;

use crate::common::{drain, groq, harness, mount_chat_sequence};

#[tokio::test]
async fn spoken_commands_run_skills_until_exit() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_chat_sequence(
        &server,
        &[r#"{"actions": [
            {"tool": "create_note", "title": "Ideas", "content": "Build a robot"},
            {"tool": "response", "text": "Saved your note."}
        ]}"#],
    )
    .await;

    let model: Arc<dyn ChatModel> = groq(&server);
    let mut h = harness(dir.path(), &NexusConfig::default(), Some(model));
    let agent = h
        .agent
        .with_listener(Box::new(QueueListener::new(["take a note about robots", "exit"])));
    agent.run().await;

    let note = h.ctx.paths.notes_dir().join("Ideas.txt");
    assert!(std::fs::read_to_string(note).unwrap().ends_with("Build a robot"));

    let spoken = h.speaker.spoken();
    assert_eq!(spoken.first().map(String::as_str), Some("System online. All features loaded. I am listening."));
    assert!(spoken.contains(&"Note 'Ideas' created successfully.".to_string()));
    assert!(spoken.contains(&"Saved your note.".to_string()));
    assert_eq!(spoken.last().map(String::as_str), Some(GOODBYE));

    let events = drain(&mut h.events);
    let results: Vec<ActionStatus> = events
        .iter()
        .filter_map(|e| match e {
            AgentEvent::ActionResult(outcome) => Some(outcome.status),
            _ => None,
        })
        .collect();
    assert_eq!(results, vec![ActionStatus::Succeeded, ActionStatus::Replied]);
    assert_eq!(events.last(), Some(&AgentEvent::Stopped));

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "exit must not reach the model");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages.last().unwrap()["content"], "take a note about robots");
}

#[tokio::test]
async fn conversation_history_carries_between_turns() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_chat_sequence(
        &server,
        &[
            r#"{"tool": "response", "text": "Hello Ana."}"#,
            r#"{"tool": "response", "text": "Your name is Ana."}"#,
        ],
    )
    .await;

    let model: Arc<dyn ChatModel> = groq(&server);
    let h = harness(dir.path(), &NexusConfig::default(), Some(model));
    let agent = h
        .agent
        .with_listener(Box::new(QueueListener::new(["my name is Ana", "what is my name"])));
    agent.run().await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let body: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let contents: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .skip(1)
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(
        contents,
        vec![
            "my name is Ana",
            r#"{"tool": "response", "text": "Hello Ana."}"#,
            "what is my name"
        ]
    );
    assert!(h.speaker.spoken().contains(&"Your name is Ana.".to_string()));
}

#[tokio::test]
async fn typed_commands_and_shutdown_from_a_front_end() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    mount_chat_sequence(
        &server,
        &[r#"{"actions": [{"tool": "open_app", "app_name": "firefox"}]}"#],
    )
    .await;

    let model: Arc<dyn ChatModel> = groq(&server);
    let h = harness(dir.path(), &NexusConfig::default(), Some(model));
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    let task = tokio::spawn(h.agent.with_commands(rx).run());

    tx.send(AgentCommand::Submit("open firefox".to_string())).unwrap();
    tx.send(AgentCommand::Shutdown).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(10), task)
        .await
        .expect("agent stops")
        .unwrap();

    assert_eq!(h.platform.rendered().first().map(String::as_str), Some("gtk-launch firefox"));
    assert_eq!(h.speaker.spoken().last().map(String::as_str), Some(SHUTDOWN));
}

#[tokio::test]
async fn model_outage_is_spoken_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    wiremock::Mock::given(wiremock::matchers::method("POST"))
        .respond_with(
            wiremock::ResponseTemplate::new(401)
                .set_body_json(serde_json::json!({ "error": { "message": "Invalid API Key" } })),
        )
        .mount(&server)
        .await;

    let model: Arc<dyn ChatModel> = groq(&server);
    let h = harness(dir.path(), &NexusConfig::default(), Some(model));
    let agent = h
        .agent
        .with_listener(Box::new(QueueListener::new(["what time is it"])));
    agent.run().await;

    let spoken = h.speaker.spoken();
    let error = spoken.iter().find(|s| s.starts_with("Error: ")).expect("error is spoken");
    assert!(error.contains("Invalid API Key"));
}
