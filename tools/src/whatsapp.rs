//! WhatsApp Desktop messaging through keyboard automation.
//!
//! The desktop app has no API, so the skill drives it the way a person would:
//! open the app, focus search, type the contact, open the chat, type the
//! message and press Enter. Each step waits for the UI to catch up.

use std::time::Duration;

use nexus_types::ToolCategory;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::platform::{CommandSpec, DesktopPlatform, Os, open_target, run_first_success};
use crate::system::{applescript_escape, launch_commands};
use crate::{ResultSpeech, ToolCtx, ToolError, ToolExecutor, ToolFut, parse_args, str_field};

pub(crate) fn skills() -> Vec<Box<dyn ToolExecutor>> {
    vec![Box::new(WhatsappTool::new(StepDelays::default()))]
}

/// Pauses between automation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepDelays {
    pub app_launch: Duration,
    pub search_focus: Duration,
    pub search_results: Duration,
    pub chat_open: Duration,
    pub before_send: Duration,
}

impl Default for StepDelays {
    fn default() -> Self {
        Self {
            app_launch: Duration::from_secs(3),
            search_focus: Duration::from_millis(500),
            search_results: Duration::from_secs(1),
            chat_open: Duration::from_millis(500),
            before_send: Duration::from_millis(500),
        }
    }
}

impl StepDelays {
    #[must_use]
    pub const fn none() -> Self {
        Self {
            app_launch: Duration::ZERO,
            search_focus: Duration::ZERO,
            search_results: Duration::ZERO,
            chat_open: Duration::ZERO,
            before_send: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keystroke {
    /// Focus the chat search box.
    Find,
    Type(String),
    Enter,
}

/// Escape text for `WScript.Shell.SendKeys`, where `+^%~(){}[]` are syntax.
#[must_use]
pub fn sendkeys_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '+' | '^' | '%' | '~' | '(' | ')' | '{' | '}' | '[' | ']') {
            out.push('{');
            out.push(c);
            out.push('}');
        } else {
            out.push(c);
        }
    }
    out
}

#[must_use]
pub fn keystroke_command(os: Os, key: &Keystroke) -> CommandSpec {
    match os {
        Os::Windows => {
            let keys = match key {
                Keystroke::Find => "^f".to_string(),
                Keystroke::Type(text) => sendkeys_escape(text),
                Keystroke::Enter => "{ENTER}".to_string(),
            };
            CommandSpec::powershell(format!(
                "(New-Object -ComObject WScript.Shell).SendKeys('{}')",
                keys.replace('\'', "''")
            ))
        }
        Os::MacOs => CommandSpec::osascript(match key {
            Keystroke::Find => {
                "tell application \"System Events\" to keystroke \"f\" using command down"
                    .to_string()
            }
            Keystroke::Type(text) => format!(
                "tell application \"System Events\" to keystroke \"{}\"",
                applescript_escape(text)
            ),
            Keystroke::Enter => "tell application \"System Events\" to key code 36".to_string(),
        }),
        Os::Linux => match key {
            Keystroke::Find => CommandSpec::new("xdotool", ["key", "ctrl+f"]),
            Keystroke::Type(text) => {
                CommandSpec::new("xdotool", ["type", "--delay", "20", "--", text.as_str()])
            }
            Keystroke::Enter => CommandSpec::new("xdotool", ["key", "Return"]),
        },
    }
}

fn open_commands(os: Os) -> Vec<CommandSpec> {
    let mut commands = launch_commands(os, "WhatsApp");
    commands.push(open_target(os, "whatsapp:"));
    commands
}

async fn press(platform: &dyn DesktopPlatform, key: &Keystroke) -> Result<(), ToolError> {
    let command = keystroke_command(platform.os(), key);
    let output = platform
        .run(&command)
        .await
        .map_err(|e| ToolError::failed("sending message", e))?;
    if !output.success {
        return Err(ToolError::failed("sending message", output.error_text()));
    }
    Ok(())
}

pub struct WhatsappTool {
    delays: StepDelays,
}

impl WhatsappTool {
    #[must_use]
    pub fn new(delays: StepDelays) -> Self {
        Self { delays }
    }

    async fn send(&self, platform: &dyn DesktopPlatform, contact: &str, message: &str) -> Result<(), ToolError> {
        let d = self.delays;
        run_first_success(platform, &open_commands(platform.os()))
            .await
            .map_err(|e| ToolError::Unavailable(format!("Could not open WhatsApp: {e}")))?;
        tokio::time::sleep(d.app_launch).await;

        press(platform, &Keystroke::Find).await?;
        tokio::time::sleep(d.search_focus).await;
        press(platform, &Keystroke::Type(contact.to_string())).await?;
        tokio::time::sleep(d.search_results).await;
        press(platform, &Keystroke::Enter).await?;
        tokio::time::sleep(d.chat_open).await;
        press(platform, &Keystroke::Type(message.to_string())).await?;
        tokio::time::sleep(d.before_send).await;
        press(platform, &Keystroke::Enter).await
    }
}

#[derive(Debug, Deserialize)]
struct MessageArgs {
    #[serde(default)]
    contact: String,
    #[serde(default)]
    message: String,
}

impl ToolExecutor for WhatsappTool {
    fn name(&self) -> &'static str {
        "whatsapp_send"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Communication
    }

    fn description(&self) -> &'static str {
        "Send a WhatsApp message to a contact through the desktop app"
    }

    fn arguments(&self) -> Value {
        json!({ "contact": "Name", "message": "Text" })
    }

    fn announcement(&self, args: &Value) -> Option<String> {
        Some(format!("Sending message to {}", str_field(args, "contact")))
    }

    fn result_speech(&self) -> ResultSpeech {
        ResultSpeech::Phrase("Sent")
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let typed: MessageArgs = parse_args(&args)?;
            tracing::info!(contact = %typed.contact, "Sending WhatsApp message");
            self.send(ctx.platform.as_ref(), &typed.contact, &typed.message)
                .await?;
            Ok("Message sent".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RecordingPlatform;
    use crate::testing::ctx_with;
    use std::sync::Arc;

    #[test]
    fn sendkeys_special_characters_are_braced() {
        assert_eq!(sendkeys_escape("50% off (today)"), "50{%} off {(}today{)}");
        assert_eq!(sendkeys_escape("plain"), "plain");
    }

    #[test]
    fn windows_keystrokes_quote_for_powershell() {
        let spec = keystroke_command(Os::Windows, &Keystroke::Type("it's".to_string()));
        assert_eq!(
            spec.args.last().unwrap(),
            "(New-Object -ComObject WScript.Shell).SendKeys('it''s')"
        );
    }

    #[test]
    fn mac_typing_escapes_quotes() {
        let spec = keystroke_command(Os::MacOs, &Keystroke::Type("say \"hi\"".to_string()));
        assert_eq!(
            spec.args,
            vec![
                "-e",
                "tell application \"System Events\" to keystroke \"say \\\"hi\\\"\""
            ]
        );
    }

    #[tokio::test]
    async fn linux_sequence_matches_manual_steps() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(RecordingPlatform::new(Os::Linux));
        let (ctx, _) = ctx_with(dir.path(), platform.clone());
        let tool = WhatsappTool::new(StepDelays::none());

        let result = tool
            .execute(json!({ "contact": "Ali", "message": "On my way" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result, "Message sent");
        assert_eq!(
            platform.rendered(),
            vec![
                "gtk-launch whatsapp",
                "xdotool key ctrl+f",
                "xdotool type --delay 20 -- Ali",
                "xdotool key Return",
                "xdotool type --delay 20 -- \"On my way\"",
                "xdotool key Return",
            ]
        );
    }

    #[tokio::test]
    async fn missing_app_falls_back_to_url_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(RecordingPlatform::new(Os::MacOs));
        let (ctx, _) = ctx_with(dir.path(), platform.clone());
        let tool = WhatsappTool::new(StepDelays::none());
        platform.fail("open");

        let err = tool
            .execute(json!({ "contact": "Ali", "message": "hi" }), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Could not open WhatsApp: open failed");
        assert_eq!(
            platform.rendered(),
            vec!["open -a WhatsApp", "open whatsapp:"]
        );
    }

    #[tokio::test]
    async fn failed_keystroke_stops_the_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(RecordingPlatform::new(Os::Linux));
        platform.fail("xdotool");
        let (ctx, _) = ctx_with(dir.path(), platform.clone());
        let tool = WhatsappTool::new(StepDelays::none());

        let err = tool
            .execute(json!({ "contact": "Ali", "message": "hi" }), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Error sending message: xdotool failed");
        assert_eq!(platform.calls().len(), 2);
    }
}
