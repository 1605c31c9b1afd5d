//! Configuration flowing into the assembled agent.

use nexus_engine::registry_from_config;

use crate::common::{config_from, harness};

#[test]
fn disabled_tools_leave_the_registry_and_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_from(
        dir.path(),
        r#"
[app]
name = "Jarvis"

[tools]
disabled = ["shutdown_system", "restart_system"]
"#,
    );

    let full = registry_from_config(&nexus_config::NexusConfig::default()).unwrap();
    let trimmed = registry_from_config(&config).unwrap();
    assert_eq!(trimmed.len(), full.len() - 2);
    assert!(trimmed.lookup("shutdown_system").is_err());

    let h = harness(dir.path(), &config, None);
    let prompt = h.agent.brain().history().system_prompt().to_string();
    assert!(prompt.contains("Jarvis"));
    assert!(!prompt.contains("shutdown_system"));
    assert!(!prompt.contains("restart_system"));
    assert!(prompt.contains("cancel_shutdown"));
}

#[test]
fn unknown_disabled_tool_is_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_from(dir.path(), "[tools]\ndisabled = [\"no_such_tool\"]\n");
    let registry = registry_from_config(&config).unwrap();
    assert!(registry.lookup("get_time").is_ok());
}

#[test]
fn malformed_config_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[brain\nmodel = ").unwrap();
    let err = nexus_config::NexusConfig::load_from(&path).unwrap_err();
    assert_eq!(err.path(), path.as_path());
}
