//! Desktop platform seam.
//!
//! Skills never spawn processes directly. They render a [`CommandSpec`] for
//! the current [`Os`] and hand it to a [`DesktopPlatform`]. Production uses
//! [`SystemPlatform`]; tests use [`RecordingPlatform`], which records every
//! command and answers with scripted output.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Mutex;

use crate::hardware::{BatteryStatus, read_battery};
use crate::process::{run_captured, spawn_detached};

pub type PlatformFut<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Windows,
    MacOs,
    Linux,
}

impl Os {
    #[must_use]
    pub const fn current() -> Self {
        if cfg!(windows) {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::MacOs
        } else {
            Os::Linux
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Os::Windows => "Windows",
            Os::MacOs => "macOS",
            Os::Linux => "Linux",
        })
    }
}

/// A program plus its arguments. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn powershell(script: impl Into<String>) -> Self {
        Self::new(
            "powershell",
            [
                "-NoProfile".to_string(),
                "-NonInteractive".to_string(),
                "-Command".to_string(),
                script.into(),
            ],
        )
    }

    #[must_use]
    pub fn osascript(script: impl Into<String>) -> Self {
        Self::new("osascript", ["-e".to_string(), script.into()])
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Best description of a failure: stderr, else stdout, else a generic note.
    #[must_use]
    pub fn error_text(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if stdout.is_empty() {
            "command exited with an error".to_string()
        } else {
            stdout.to_string()
        }
    }
}

pub trait DesktopPlatform: Send + Sync {
    fn os(&self) -> Os;
    /// Run a command to completion.
    fn run<'a>(&'a self, command: &'a CommandSpec) -> PlatformFut<'a, io::Result<CommandOutput>>;
    /// Launch a program without waiting for it to exit.
    fn spawn(&self, command: &CommandSpec) -> io::Result<()>;
    fn battery(&self) -> PlatformFut<'_, Option<BatteryStatus>>;
}

/// Run each candidate until one exits successfully.
///
/// Returns the last failure description when none succeed.
pub async fn run_first_success(
    platform: &dyn DesktopPlatform,
    candidates: &[CommandSpec],
) -> Result<CommandOutput, String> {
    let mut last_error = "no command available".to_string();
    for command in candidates {
        match platform.run(command).await {
            Ok(output) if output.success => return Ok(output),
            Ok(output) => last_error = output.error_text(),
            Err(e) => last_error = format!("{}: {e}", command.program),
        }
        tracing::debug!(command = %command, error = %last_error, "Candidate command failed");
    }
    Err(last_error)
}

/// Command that opens a file, folder or URL with the desktop's default handler.
#[must_use]
pub fn open_target(os: Os, target: &str) -> CommandSpec {
    match os {
        Os::Windows => CommandSpec::new("cmd", ["/C", "start", "", target]),
        Os::MacOs => CommandSpec::new("open", [target]),
        Os::Linux => CommandSpec::new("xdg-open", [target]),
    }
}

/// The real desktop.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPlatform;

impl DesktopPlatform for SystemPlatform {
    fn os(&self) -> Os {
        Os::current()
    }

    fn run<'a>(&'a self, command: &'a CommandSpec) -> PlatformFut<'a, io::Result<CommandOutput>> {
        Box::pin(run_captured(command))
    }

    fn spawn(&self, command: &CommandSpec) -> io::Result<()> {
        spawn_detached(command)
    }

    fn battery(&self) -> PlatformFut<'_, Option<BatteryStatus>> {
        Box::pin(read_battery(self))
    }
}

/// Test double that records commands instead of running them.
///
/// Every command succeeds with empty output unless scripted with
/// [`RecordingPlatform::respond`] or [`RecordingPlatform::fail`].
#[derive(Debug)]
pub struct RecordingPlatform {
    os: Os,
    calls: Mutex<Vec<CommandSpec>>,
    responses: Mutex<HashMap<String, CommandOutput>>,
    failing: Mutex<HashSet<String>>,
    battery: Mutex<Option<BatteryStatus>>,
}

impl RecordingPlatform {
    #[must_use]
    pub fn new(os: Os) -> Self {
        Self {
            os,
            calls: Mutex::new(Vec::new()),
            responses: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            battery: Mutex::new(None),
        }
    }

    /// Script the output of every invocation of `program`.
    pub fn respond(&self, program: &str, output: CommandOutput) {
        if let Ok(mut responses) = self.responses.lock() {
            responses.insert(program.to_string(), output);
        }
    }

    /// Make every invocation of `program` fail.
    pub fn fail(&self, program: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(program.to_string());
        }
    }

    pub fn set_battery(&self, status: Option<BatteryStatus>) {
        if let Ok(mut battery) = self.battery.lock() {
            *battery = status;
        }
    }

    /// Every command run or spawned so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// [`RecordingPlatform::calls`] rendered as display strings.
    #[must_use]
    pub fn rendered(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    fn record(&self, command: &CommandSpec) -> bool {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.clone());
        }
        self.failing
            .lock()
            .map(|f| f.contains(&command.program))
            .unwrap_or(false)
    }
}

impl DesktopPlatform for RecordingPlatform {
    fn os(&self) -> Os {
        self.os
    }

    fn run<'a>(&'a self, command: &'a CommandSpec) -> PlatformFut<'a, io::Result<CommandOutput>> {
        let fails = self.record(command);
        let scripted = self
            .responses
            .lock()
            .ok()
            .and_then(|r| r.get(&command.program).cloned());
        Box::pin(async move {
            if fails {
                return Ok(CommandOutput::failed(format!("{} failed", command.program)));
            }
            Ok(scripted.unwrap_or_else(|| CommandOutput::ok("")))
        })
    }

    fn spawn(&self, command: &CommandSpec) -> io::Result<()> {
        if self.record(command) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", command.program),
            ));
        }
        Ok(())
    }

    fn battery(&self) -> PlatformFut<'_, Option<BatteryStatus>> {
        let status = self.battery.lock().ok().and_then(|b| *b);
        Box::pin(async move { status })
    }
}
