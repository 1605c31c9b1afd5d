//! Subprocess helpers for desktop commands.

use std::io;
use std::process::Stdio;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use crate::platform::{CommandOutput, CommandSpec};

const MAX_CAPTURE_BYTES: usize = 64 * 1024;

/// Kills a child process (and its process group on Unix) on drop.
///
/// Wrap a spawned child immediately after `spawn()` so a cancelled or
/// timed-out skill does not leave the helper running. Call `disarm()` after
/// the process exits normally.
pub struct ChildGuard {
    child: Option<Child>,
}

impl ChildGuard {
    #[must_use]
    pub fn new(child: Child) -> Self {
        Self { child: Some(child) }
    }

    pub async fn wait(&mut self) -> io::Result<std::process::ExitStatus> {
        match self.child.as_mut() {
            Some(child) => child.wait().await,
            None => Err(io::Error::other("child already released")),
        }
    }

    pub fn disarm(&mut self) {
        self.child = None;
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return;
        };
        #[cfg(unix)]
        {
            if let Some(pid) = child.id() {
                unsafe {
                    if libc::killpg(pid as i32, libc::SIGKILL) == -1 {
                        let _ = child.start_kill();
                    }
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = child.start_kill();
        }
        let _ = child.try_wait();
    }
}

/// Run a command to completion, capturing stdout and stderr.
pub async fn run_captured(spec: &CommandSpec) -> io::Result<CommandOutput> {
    let mut command = Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(unix)]
    set_new_session(&mut command);
    #[cfg(windows)]
    hide_console(&mut command);

    let mut child = command.spawn()?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let mut guard = ChildGuard::new(child);

    let (stdout, stderr, status) =
        tokio::join!(read_pipe(stdout), read_pipe(stderr), guard.wait());
    let status = status?;
    guard.disarm();

    tracing::debug!(command = %spec, status = ?status.code(), "Command finished");
    Ok(CommandOutput {
        success: status.success(),
        stdout,
        stderr,
    })
}

/// Start a program and return immediately. The child outlives the assistant.
pub fn spawn_detached(spec: &CommandSpec) -> io::Result<()> {
    let mut command = std::process::Command::new(&spec.program);
    command
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        unsafe {
            command.pre_exec(|| {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }
    }
    command.spawn()?;
    tracing::debug!(command = %spec, "Spawned detached process");
    Ok(())
}

async fn read_pipe<R>(pipe: Option<R>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return String::new();
    };
    let mut buf = Vec::new();
    let _ = pipe
        .take(MAX_CAPTURE_BYTES as u64)
        .read_to_end(&mut buf)
        .await;
    String::from_utf8_lossy(&buf).into_owned()
}

/// Put the child in its own session so the guard can kill the whole group.
#[cfg(unix)]
fn set_new_session(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    unsafe {
        cmd.as_std_mut().pre_exec(|| {
            if libc::setsid() == -1 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(windows)]
fn hide_console(cmd: &mut Command) {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}
