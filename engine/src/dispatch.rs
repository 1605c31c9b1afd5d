//! The act step: run one action and decide what to say about it.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use nexus_tools::{RESPONSE_TOOL, ResultSpeech, ToolCtx, ToolError, ToolRegistry};
use nexus_types::Action;

use crate::events::{ActionOutcome, ActionStatus};
use crate::narrator::Narrator;

pub const UNKNOWN_TOOL_REPLY: &str = "I'm not sure how to do that yet.";
pub const TOOL_ERROR_REPLY: &str = "I encountered an error while doing that.";

pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    ctx: ToolCtx,
    narrator: Narrator,
    default_timeout: Duration,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        registry: Arc<ToolRegistry>,
        ctx: ToolCtx,
        narrator: Narrator,
        default_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            ctx,
            narrator,
            default_timeout,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    #[must_use]
    pub fn ctx(&self) -> &ToolCtx {
        &self.ctx
    }

    pub async fn execute(&self, action: &Action) -> ActionOutcome {
        let tool = action.tool.as_str();
        tracing::info!(tool, "Executing action");

        if tool == RESPONSE_TOOL {
            let text = action.str_arg("text").unwrap_or_default();
            self.narrator.say(text).await;
            return outcome(tool, text, ActionStatus::Replied);
        }

        let Ok(executor) = self.registry.lookup(tool) else {
            tracing::warn!(tool, "Unknown tool requested");
            self.narrator.say(UNKNOWN_TOOL_REPLY).await;
            return outcome(tool, format!("Unknown tool: {tool}"), ActionStatus::UnknownTool);
        };

        let args = action.args_value();
        tracing::debug!(tool, side_effecting = executor.is_side_effecting(), "Running skill");
        if let Some(announcement) = executor.announcement(&args) {
            self.narrator.say(&announcement).await;
        }

        let timeout = executor.timeout().unwrap_or(self.default_timeout);
        let run = AssertUnwindSafe(executor.execute(args, &self.ctx)).catch_unwind();
        let result = match tokio::time::timeout(timeout, run).await {
            Err(_) => Err(ToolError::Timeout {
                tool: tool.to_string(),
                elapsed: timeout,
            }),
            Ok(Err(panic)) => Err(ToolError::Internal(format!(
                "Tool panicked: {}",
                panic_message(panic.as_ref())
            ))),
            Ok(Ok(result)) => result,
        };

        match result {
            Ok(text) => {
                match executor.result_speech() {
                    ResultSpeech::Full => self.narrator.say(&text).await,
                    ResultSpeech::Phrase(phrase) => self.narrator.say(phrase).await,
                    ResultSpeech::Silent => {}
                }
                outcome(tool, text, ActionStatus::Succeeded)
            }
            Err(err) if err.is_user_facing() => {
                let text = err.to_string();
                tracing::info!(tool, "{text}");
                self.narrator.say(&text).await;
                outcome(tool, text, ActionStatus::Failed)
            }
            Err(err) => {
                tracing::warn!(tool, "Tool error: {err}");
                self.narrator.say(TOOL_ERROR_REPLY).await;
                outcome(tool, format!("Error executing {tool}: {err}"), ActionStatus::Errored)
            }
        }
    }
}

fn outcome(tool: &str, result: impl Into<String>, status: ActionStatus) -> ActionOutcome {
    ActionOutcome {
        tool: tool.to_string(),
        result: result.into(),
        status,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dispatcher_with, linux_ctx};
    use nexus_tools::{ToolExecutor, ToolFut, builtin_registry};
    use nexus_types::ToolCategory;
    use serde_json::{Value, json};

    struct Sleepy;

    impl ToolExecutor for Sleepy {
        fn name(&self) -> &'static str {
            "sleepy"
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::Hardware
        }
        fn description(&self) -> &'static str {
            "Never finishes"
        }
        fn is_side_effecting(&self) -> bool {
            false
        }
        fn timeout(&self) -> Option<Duration> {
            Some(Duration::from_millis(20))
        }
        fn execute<'a>(&'a self, _args: Value, _ctx: &'a ToolCtx) -> ToolFut<'a> {
            Box::pin(async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(String::new())
            })
        }
    }

    struct Exploding;

    impl ToolExecutor for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::Hardware
        }
        fn description(&self) -> &'static str {
            "Panics"
        }
        fn is_side_effecting(&self) -> bool {
            false
        }
        fn execute<'a>(&'a self, _args: Value, _ctx: &'a ToolCtx) -> ToolFut<'a> {
            Box::pin(async { panic!("kaboom") })
        }
    }

    #[tokio::test]
    async fn response_is_spoken_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, speaker) = dispatcher_with(builtin_registry(&[]).unwrap(), linux_ctx(dir.path()).0);

        let outcome = dispatcher.execute(&Action::response("Hello there")).await;
        assert_eq!(outcome.status, ActionStatus::Replied);
        assert_eq!(outcome.result, "Hello there");
        assert_eq!(speaker.spoken(), vec!["Hello there"]);
    }

    #[tokio::test]
    async fn unknown_tool_apologizes() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, speaker) = dispatcher_with(builtin_registry(&[]).unwrap(), linux_ctx(dir.path()).0);

        let outcome = dispatcher.execute(&Action::new("fly", json!({}))).await;
        assert_eq!(outcome.status, ActionStatus::UnknownTool);
        assert_eq!(outcome.result, "Unknown tool: fly");
        assert_eq!(speaker.spoken(), vec![UNKNOWN_TOOL_REPLY]);
    }

    #[tokio::test]
    async fn open_app_speaks_only_its_announcement() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, platform) = linux_ctx(dir.path());
        let (dispatcher, speaker) = dispatcher_with(builtin_registry(&[]).unwrap(), ctx);

        let outcome = dispatcher
            .execute(&Action::new("open_app", json!({ "app_name": "firefox" })))
            .await;
        assert_eq!(outcome.status, ActionStatus::Succeeded);
        assert_eq!(outcome.result, "firefox opened");
        assert_eq!(speaker.spoken(), vec!["Opening firefox"]);
        assert!(!platform.calls().is_empty());
    }

    #[tokio::test]
    async fn full_results_are_spoken() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, speaker) = dispatcher_with(builtin_registry(&[]).unwrap(), linux_ctx(dir.path()).0);

        let outcome = dispatcher
            .execute(&Action::new("control_volume", json!({ "action": "sideways" })))
            .await;
        assert_eq!(outcome.result, "Unknown volume command.");
        assert_eq!(speaker.spoken(), vec!["Unknown volume command."]);
    }

    #[tokio::test]
    async fn user_facing_failures_are_spoken() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, platform) = linux_ctx(dir.path());
        platform.fail("gtk-launch");
        platform.fail("nothing");
        let (dispatcher, speaker) = dispatcher_with(builtin_registry(&[]).unwrap(), ctx);

        let outcome = dispatcher
            .execute(&Action::new("open_app", json!({ "app_name": "nothing" })))
            .await;
        assert_eq!(outcome.status, ActionStatus::Failed);
        assert_eq!(outcome.result, "Could not find nothing");
        assert_eq!(speaker.spoken(), vec!["Opening nothing", "Could not find nothing"]);
    }

    #[tokio::test]
    async fn timeouts_and_panics_get_the_generic_apology() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = builtin_registry(&[]).unwrap();
        registry.register(Box::new(Sleepy)).unwrap();
        registry.register(Box::new(Exploding)).unwrap();
        let (dispatcher, speaker) = dispatcher_with(registry, linux_ctx(dir.path()).0);

        let slow = dispatcher.execute(&Action::new("sleepy", json!({}))).await;
        assert_eq!(slow.status, ActionStatus::Errored);
        assert_eq!(slow.result, "Error executing sleepy: Tool timed out: sleepy");

        let boom = dispatcher.execute(&Action::new("exploding", json!({}))).await;
        assert_eq!(
            boom.result,
            "Error executing exploding: Internal error: Tool panicked: kaboom"
        );
        assert_eq!(speaker.spoken(), vec![TOOL_ERROR_REPLY, TOOL_ERROR_REPLY]);
    }

    #[tokio::test]
    async fn bad_arguments_are_internal_errors() {
        let dir = tempfile::tempdir().unwrap();
        let (dispatcher, _speaker) = dispatcher_with(builtin_registry(&[]).unwrap(), linux_ctx(dir.path()).0);

        let outcome = dispatcher
            .execute(&Action::new("whatsapp_send", json!({ "contact": 5 })))
            .await;
        assert_eq!(outcome.status, ActionStatus::Errored);
        assert!(outcome.result.starts_with("Error executing whatsapp_send: Bad tool args:"));
    }
}
