//! Launch-at-login entries for `nexus install-startup`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nexus_tools::Os;

const LAUNCH_AGENT_LABEL: &str = "com.nexus.assistant";

/// Where the autostart entry lives. `home` and `config` are the user's home
/// and configuration directories (`%APPDATA%` on Windows).
#[must_use]
pub fn entry_path(os: Os, home: &Path, config: &Path) -> PathBuf {
    match os {
        Os::Linux => config.join("autostart").join("nexus.desktop"),
        Os::MacOs => home
            .join("Library")
            .join("LaunchAgents")
            .join(format!("{LAUNCH_AGENT_LABEL}.plist")),
        Os::Windows => config
            .join("Microsoft")
            .join("Windows")
            .join("Start Menu")
            .join("Programs")
            .join("Startup")
            .join("NexusAssistant.bat"),
    }
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[must_use]
pub fn entry_contents(os: Os, exe: &Path) -> String {
    let exe = exe.display();
    match os {
        Os::Linux => format!(
            "[Desktop Entry]\nType=Application\nName=Nexus Assistant\nComment=Voice desktop assistant\nExec=\"{exe}\" run\nTerminal=true\nX-GNOME-Autostart-enabled=true\n"
        ),
        Os::MacOs => format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{LAUNCH_AGENT_LABEL}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{}</string>
        <string>run</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
</dict>
</plist>
"#,
            xml_escape(&exe.to_string())
        ),
        Os::Windows => format!("@echo off\r\nstart \"Nexus\" \"{exe}\" run\r\n"),
    }
}

/// Write or remove the entry at `path`. Returns a line for the user.
pub fn apply(path: &Path, contents: &str, remove: bool) -> Result<String> {
    if remove {
        if !path.exists() {
            return Ok(format!("No startup entry at {}", path.display()));
        }
        fs::remove_file(path).with_context(|| format!("failed to remove {}", path.display()))?;
        tracing::info!(path = %path.display(), "Removed startup entry");
        return Ok(format!("Removed startup entry {}", path.display()));
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "Installed startup entry");
    Ok(format!(
        "Installed startup entry {}\nNexus will now launch automatically when you log in.",
        path.display()
    ))
}

pub fn run(remove: bool) -> Result<()> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let config = dirs::config_dir().unwrap_or_else(|| home.join(".config"));
    let os = Os::current();
    let path = entry_path(os, &home, &config);
    let exe = std::env::current_exe().context("could not locate the nexus executable")?;
    println!("{}", apply(&path, &entry_contents(os, &exe), remove)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_locations() {
        let home = Path::new("/home/ana");
        let config = Path::new("/home/ana/.config");
        assert_eq!(
            entry_path(Os::Linux, home, config),
            Path::new("/home/ana/.config/autostart/nexus.desktop")
        );
        assert_eq!(
            entry_path(Os::MacOs, home, config),
            Path::new("/home/ana/Library/LaunchAgents/com.nexus.assistant.plist")
        );
        assert!(
            entry_path(Os::Windows, home, config)
                .ends_with("Start Menu/Programs/Startup/NexusAssistant.bat")
        );
    }

    #[test]
    fn contents_launch_run() {
        let exe = Path::new("/opt/nexus & co/nexus");
        assert!(entry_contents(Os::Linux, exe).contains("Exec=\"/opt/nexus & co/nexus\" run"));
        assert!(entry_contents(Os::MacOs, exe).contains("<string>/opt/nexus &amp; co/nexus</string>"));
        assert!(entry_contents(Os::Windows, exe).ends_with("\"/opt/nexus & co/nexus\" run\r\n"));
    }

    #[test]
    fn install_then_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("autostart").join("nexus.desktop");

        let message = apply(&path, "entry", false).unwrap();
        assert!(message.starts_with("Installed startup entry"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "entry");

        apply(&path, "", true).unwrap();
        assert!(!path.exists());
        assert!(apply(&path, "", true).unwrap().starts_with("No startup entry"));
    }
}
