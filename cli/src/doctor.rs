//! `nexus doctor`: environment checks with a pass or fail per line.

use std::fs;
use std::path::Path;

use nexus_config::NexusConfig;
use nexus_tools::Os;
use nexus_voice::{input_device_name, output_available};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

impl Check {
    fn pass(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: true,
            detail: detail.into(),
        }
    }

    fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ok: false,
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mark = if self.ok { "ok  " } else { "FAIL" };
        format!("[{mark}] {:<18} {}", self.name, self.detail)
    }
}

const WINDOWS_HELPERS: &[&[&str]] = &[&["powershell"], &["cmd"], &["taskkill"]];
const MACOS_HELPERS: &[&[&str]] = &[&["osascript"], &["open"], &["screencapture"], &["pmset"]];
const LINUX_HELPERS: &[&[&str]] = &[
    &["xdg-open"],
    &["gtk-launch"],
    &["xdotool"],
    &["pactl", "amixer"],
    &["brightnessctl"],
    &["gnome-screenshot", "grim", "spectacle", "scrot", "import"],
];

/// Programs the desktop skills shell out to. Each group is satisfied by any
/// one of its members.
#[must_use]
pub fn helper_programs(os: Os) -> &'static [&'static [&'static str]] {
    match os {
        Os::Windows => WINDOWS_HELPERS,
        Os::MacOs => MACOS_HELPERS,
        Os::Linux => LINUX_HELPERS,
    }
}

fn check_helpers(os: Os, found: impl Fn(&str) -> bool) -> Vec<Check> {
    helper_programs(os)
        .iter()
        .map(|group| {
            let name = group.join(" | ");
            match group.iter().find(|program| found(program)) {
                Some(program) => Check::pass(name, format!("found {program}")),
                None => Check::fail(name, "not found on PATH"),
            }
        })
        .collect()
}

fn check_data_dir(dir: &Path) -> Check {
    let probe = dir.join(".doctor");
    let result = fs::create_dir_all(dir)
        .and_then(|()| fs::write(&probe, b"ok"))
        .and_then(|()| fs::remove_file(&probe));
    match result {
        Ok(()) => Check::pass("data directory", dir.display().to_string()),
        Err(e) => Check::fail("data directory", format!("{}: {e}", dir.display())),
    }
}

pub fn run_checks() -> Vec<Check> {
    let mut checks = Vec::new();

    let config = match NexusConfig::load() {
        Ok(Some(config)) => {
            checks.push(Check::pass("config", "loaded"));
            config
        }
        Ok(None) => {
            checks.push(Check::pass("config", "not found, using defaults"));
            NexusConfig::default()
        }
        Err(e) => {
            checks.push(Check::fail("config", e.to_string()));
            NexusConfig::default()
        }
    };

    checks.push(if config.groq_api_key().is_some() {
        Check::pass("groq api key", "present")
    } else {
        Check::fail("groq api key", "set GROQ_API_KEY or [api_keys] groq")
    });

    checks.push(check_data_dir(&config.data_dir()));

    checks.push(match input_device_name() {
        Ok(name) => Check::pass("audio input", name),
        Err(e) => Check::fail("audio input", e.to_string()),
    });
    checks.push(match output_available() {
        Ok(()) => Check::pass("audio output", "default device"),
        Err(e) => Check::fail("audio output", e.to_string()),
    });

    checks.extend(check_helpers(Os::current(), |program| which::which(program).is_ok()));
    checks
}

/// Print every check; `false` when any failed.
pub fn run() -> bool {
    let checks = run_checks();
    for check in &checks {
        println!("{}", check.render());
    }
    let failed = checks.iter().filter(|c| !c.ok).count();
    if failed == 0 {
        println!("\nAll checks passed.");
    } else {
        println!("\n{failed} check(s) failed.");
    }
    failed == 0
}
