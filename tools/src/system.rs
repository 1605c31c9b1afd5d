//! Applications, special folders, power management and the clock.

use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};
use nexus_types::ToolCategory;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::platform::{CommandSpec, Os, open_target, run_first_success};
use crate::{
    ResultSpeech, ToolCtx, ToolError, ToolExecutor, ToolFut, lenient_int, parse_args, str_field,
};

pub(crate) fn app_skills() -> Vec<Box<dyn ToolExecutor>> {
    vec![Box::new(OpenAppTool), Box::new(CloseAppTool)]
}

pub(crate) fn clock_skills() -> Vec<Box<dyn ToolExecutor>> {
    vec![Box::new(TimeTool), Box::new(DateTool)]
}

pub(crate) fn power_skills() -> Vec<Box<dyn ToolExecutor>> {
    vec![
        Box::new(PowerTool {
            action: PowerAction::Shutdown,
        }),
        Box::new(PowerTool {
            action: PowerAction::Restart,
        }),
        Box::new(CancelShutdownTool),
    ]
}

// ============================================================================
// Special locations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialLocation {
    ThisPc,
    RecycleBin,
    Downloads,
    Documents,
    Pictures,
    Videos,
    Music,
    Desktop,
    Network,
    ControlPanel,
    Settings,
}

/// Checked in order; the first phrase contained in the request wins.
const SPECIAL_PHRASES: &[(&str, SpecialLocation)] = &[
    ("this pc", SpecialLocation::ThisPc),
    ("my computer", SpecialLocation::ThisPc),
    ("computer", SpecialLocation::ThisPc),
    ("recycle bin", SpecialLocation::RecycleBin),
    ("trash", SpecialLocation::RecycleBin),
    ("downloads", SpecialLocation::Downloads),
    ("documents", SpecialLocation::Documents),
    ("pictures", SpecialLocation::Pictures),
    ("videos", SpecialLocation::Videos),
    ("music", SpecialLocation::Music),
    ("desktop", SpecialLocation::Desktop),
    ("network", SpecialLocation::Network),
    ("control panel", SpecialLocation::ControlPanel),
    ("settings", SpecialLocation::Settings),
];

impl SpecialLocation {
    #[must_use]
    pub fn find(request: &str) -> Option<Self> {
        let lower = request.to_lowercase();
        SPECIAL_PHRASES
            .iter()
            .find(|(phrase, _)| lower.contains(phrase))
            .map(|&(_, location)| location)
    }

    fn user_folder(self) -> Option<PathBuf> {
        let (dir, fallback) = match self {
            SpecialLocation::Downloads => (dirs::download_dir(), "Downloads"),
            SpecialLocation::Documents => (dirs::document_dir(), "Documents"),
            SpecialLocation::Pictures => (dirs::picture_dir(), "Pictures"),
            SpecialLocation::Videos => (dirs::video_dir(), "Videos"),
            SpecialLocation::Music => (dirs::audio_dir(), "Music"),
            SpecialLocation::Desktop => (dirs::desktop_dir(), "Desktop"),
            _ => return None,
        };
        dir.or_else(|| dirs::home_dir().map(|home| home.join(fallback)))
    }

    #[must_use]
    pub fn command(self, os: Os) -> CommandSpec {
        match os {
            Os::Windows => {
                let target = match self {
                    SpecialLocation::ThisPc => "::{20D04FE0-3AEA-1069-A2D8-08002B30309D}",
                    SpecialLocation::RecycleBin => "::{645FF040-5081-101B-9F08-00AA002F954E}",
                    SpecialLocation::Downloads => "shell:Downloads",
                    SpecialLocation::Documents => "shell:Personal",
                    SpecialLocation::Pictures => "shell:My Pictures",
                    SpecialLocation::Videos => "shell:My Video",
                    SpecialLocation::Music => "shell:My Music",
                    SpecialLocation::Desktop => "shell:Desktop",
                    SpecialLocation::Network => "::{F02C1A0D-BE21-4350-88B0-7367FC96EF3C}",
                    SpecialLocation::ControlPanel => {
                        return CommandSpec::new("control", Vec::<String>::new());
                    }
                    SpecialLocation::Settings => return open_target(os, "ms-settings:"),
                };
                CommandSpec::new("explorer.exe", [target])
            }
            Os::MacOs => match self {
                SpecialLocation::ThisPc => open_target(os, "/"),
                SpecialLocation::RecycleBin => {
                    let trash = dirs::home_dir().unwrap_or_default().join(".Trash");
                    open_target(os, &trash.to_string_lossy())
                }
                SpecialLocation::Network => open_target(os, "/Network"),
                SpecialLocation::ControlPanel | SpecialLocation::Settings => {
                    CommandSpec::new("open", ["-b", "com.apple.systempreferences"])
                }
                folder => open_folder(os, folder),
            },
            Os::Linux => match self {
                SpecialLocation::ThisPc => open_target(os, "/"),
                SpecialLocation::RecycleBin => open_target(os, "trash:///"),
                SpecialLocation::Network => open_target(os, "network:///"),
                SpecialLocation::ControlPanel | SpecialLocation::Settings => {
                    CommandSpec::new("gnome-control-center", Vec::<String>::new())
                }
                folder => open_folder(os, folder),
            },
        }
    }
}

fn open_folder(os: Os, folder: SpecialLocation) -> CommandSpec {
    let path = folder.user_folder().unwrap_or_default();
    open_target(os, &path.to_string_lossy())
}

// ============================================================================
// open_app / close_app
// ============================================================================

#[derive(Debug, Deserialize)]
struct AppArgs {
    #[serde(default)]
    app_name: String,
}

fn slug(app: &str) -> String {
    app.trim().to_lowercase().replace(' ', "")
}

/// Commands that launch `app` and exit with a meaningful status.
#[must_use]
pub fn launch_commands(os: Os, app: &str) -> Vec<CommandSpec> {
    let app = app.trim();
    match os {
        Os::Windows => vec![open_target(os, app)],
        Os::MacOs => vec![CommandSpec::new("open", ["-a", app])],
        Os::Linux => vec![CommandSpec::new("gtk-launch", [app.to_lowercase().replace(' ', "-")])],
    }
}

/// Commands that terminate `app` by process name.
#[must_use]
pub fn close_commands(os: Os, app: &str) -> Vec<CommandSpec> {
    let app = app.trim();
    match os {
        Os::Windows => {
            let mut commands = vec![CommandSpec::new(
                "taskkill",
                ["/f".to_string(), "/im".to_string(), format!("{}.exe", slug(app))],
            )];
            if app.to_lowercase().contains("chrome") && slug(app) != "chrome" {
                commands.push(CommandSpec::new("taskkill", ["/f", "/im", "chrome.exe"]));
            }
            commands
        }
        Os::MacOs => vec![CommandSpec::osascript(format!(
            "tell application \"{}\" to quit",
            applescript_escape(app)
        ))],
        Os::Linux => vec![CommandSpec::new("pkill", ["-i", "-f", app])],
    }
}

pub(crate) fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

struct OpenAppTool;

impl ToolExecutor for OpenAppTool {
    fn name(&self) -> &'static str {
        "open_app"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Applications
    }

    fn description(&self) -> &'static str {
        "Open an application or a special location such as Downloads or the recycle bin"
    }

    fn arguments(&self) -> Value {
        json!({ "app_name": "Name" })
    }

    fn announcement(&self, args: &Value) -> Option<String> {
        Some(format!("Opening {}", str_field(args, "app_name")))
    }

    fn result_speech(&self) -> ResultSpeech {
        ResultSpeech::Silent
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let typed: AppArgs = parse_args(&args)?;
            let app = typed.app_name.trim();
            let not_found = || ToolError::Unavailable(format!("Could not find {app}"));
            if app.is_empty() {
                return Err(not_found());
            }
            let os = ctx.platform.os();

            if let Some(location) = SpecialLocation::find(app) {
                tracing::info!(?location, "Opening special location");
                return match ctx.platform.spawn(&location.command(os)) {
                    Ok(()) => Ok(format!("{app} opened")),
                    Err(e) => {
                        tracing::warn!("Failed to open {app}: {e}");
                        Err(not_found())
                    }
                };
            }

            if run_first_success(ctx.platform.as_ref(), &launch_commands(os, app))
                .await
                .is_ok()
            {
                return Ok(format!("{app} opened"));
            }
            // Plain executables without a desktop entry.
            if os == Os::Linux {
                let binary = CommandSpec::new(slug(app), Vec::<String>::new());
                if ctx.platform.spawn(&binary).is_ok() {
                    return Ok(format!("{app} opened"));
                }
            }
            Err(not_found())
        })
    }
}

struct CloseAppTool;

impl ToolExecutor for CloseAppTool {
    fn name(&self) -> &'static str {
        "close_app"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Applications
    }

    fn description(&self) -> &'static str {
        "Close a running application"
    }

    fn arguments(&self) -> Value {
        json!({ "app_name": "Name" })
    }

    fn announcement(&self, args: &Value) -> Option<String> {
        Some(format!("Closing {}", str_field(args, "app_name")))
    }

    fn result_speech(&self) -> ResultSpeech {
        ResultSpeech::Silent
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let typed: AppArgs = parse_args(&args)?;
            let app = typed.app_name.trim();
            let mut closed = false;
            for command in close_commands(ctx.platform.os(), app) {
                match ctx.platform.run(&command).await {
                    Ok(output) if output.success => closed = true,
                    Ok(output) => tracing::debug!(command = %command, "{}", output.error_text()),
                    Err(e) => tracing::debug!(command = %command, "{e}"),
                }
            }
            if closed && !app.is_empty() {
                Ok(format!("{app} closed"))
            } else {
                Err(ToolError::Unavailable(format!("Could not close {app}")))
            }
        })
    }
}

// ============================================================================
// Power
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Shutdown,
    Restart,
}

/// Render the shutdown/restart command. Unix `shutdown` takes whole minutes.
#[must_use]
pub fn power_command(os: Os, action: PowerAction, delay_secs: u64) -> CommandSpec {
    match os {
        Os::Windows => {
            let flag = match action {
                PowerAction::Shutdown => "/s",
                PowerAction::Restart => "/r",
            };
            CommandSpec::new(
                "shutdown",
                [flag.to_string(), "/t".to_string(), delay_secs.to_string()],
            )
        }
        Os::MacOs | Os::Linux => {
            let flag = match action {
                PowerAction::Shutdown => "-h",
                PowerAction::Restart => "-r",
            };
            let when = if delay_secs == 0 {
                "now".to_string()
            } else {
                format!("+{}", delay_secs.div_ceil(60))
            };
            CommandSpec::new("shutdown", [flag.to_string(), when])
        }
    }
}

#[must_use]
pub fn cancel_shutdown_command(os: Os) -> CommandSpec {
    match os {
        Os::Windows => CommandSpec::new("shutdown", ["/a"]),
        Os::MacOs => CommandSpec::new("killall", ["shutdown"]),
        Os::Linux => CommandSpec::new("shutdown", ["-c"]),
    }
}

struct PowerTool {
    action: PowerAction,
}

impl ToolExecutor for PowerTool {
    fn name(&self) -> &'static str {
        match self.action {
            PowerAction::Shutdown => "shutdown_system",
            PowerAction::Restart => "restart_system",
        }
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Hardware
    }

    fn description(&self) -> &'static str {
        match self.action {
            PowerAction::Shutdown => "Shut the computer down after a delay in seconds",
            PowerAction::Restart => "Restart the computer after a delay in seconds",
        }
    }

    fn arguments(&self) -> Value {
        json!({ "delay": "int" })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let delay = args
                .get("delay")
                .and_then(lenient_int)
                .unwrap_or(0)
                .max(0) as u64;
            let command = power_command(ctx.platform.os(), self.action, delay);
            let context = match self.action {
                PowerAction::Shutdown => "shutting down",
                PowerAction::Restart => "restarting",
            };
            let output = ctx
                .platform
                .run(&command)
                .await
                .map_err(|e| ToolError::failed(context, e))?;
            if !output.success {
                return Err(ToolError::failed(context, output.error_text()));
            }
            tracing::warn!(command = %command, "Power action scheduled");

            Ok(match (self.action, delay) {
                (PowerAction::Shutdown, 0) => "Shutting down now.".to_string(),
                (PowerAction::Shutdown, d) => format!("System will shutdown in {d} seconds."),
                (PowerAction::Restart, 0) => "Restarting now.".to_string(),
                (PowerAction::Restart, d) => format!("System will restart in {d} seconds."),
            })
        })
    }
}

struct CancelShutdownTool;

impl ToolExecutor for CancelShutdownTool {
    fn name(&self) -> &'static str {
        "cancel_shutdown"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Hardware
    }

    fn description(&self) -> &'static str {
        "Cancel a pending shutdown or restart"
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let output = ctx
                .platform
                .run(&cancel_shutdown_command(ctx.platform.os()))
                .await
                .map_err(|e| ToolError::failed("cancelling", e))?;
            if !output.success {
                return Err(ToolError::failed("cancelling", output.error_text()));
            }
            Ok("Shutdown or restart cancelled.".to_string())
        })
    }
}

// ============================================================================
// Clock
// ============================================================================

#[must_use]
pub fn describe_time(now: NaiveDateTime) -> String {
    now.format("It is %I:%M %p").to_string()
}

#[must_use]
pub fn describe_date(now: NaiveDateTime) -> String {
    now.format("Today is %A, %B %d, %Y").to_string()
}

struct TimeTool;

impl ToolExecutor for TimeTool {
    fn name(&self) -> &'static str {
        "get_time"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Hardware
    }

    fn description(&self) -> &'static str {
        "Current local time"
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, _args: Value, _ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move { Ok(describe_time(Local::now().naive_local())) })
    }
}

struct DateTool;

impl ToolExecutor for DateTool {
    fn name(&self) -> &'static str {
        "get_date"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Hardware
    }

    fn description(&self) -> &'static str {
        "Today's date"
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, _args: Value, _ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move { Ok(describe_date(Local::now().naive_local())) })
    }
}
