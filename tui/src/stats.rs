//! Sidebar statistics refreshed in the background.

use std::time::Duration;

use chrono::{DateTime, Local};
use nexus_tools::hardware::{BatteryStatus, SystemSnapshot, sample_system};
use nexus_tools::{DesktopPlatform, SystemPlatform};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const REFRESH_INTERVAL: Duration = Duration::from_secs(2);
const CPU_SAMPLE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Stats {
    pub battery: Option<BatteryStatus>,
    pub system: Option<SystemSnapshot>,
}

/// Text for one sidebar card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub title: &'static str,
    pub value: String,
    pub detail: Option<String>,
}

#[must_use]
pub fn time_card(now: DateTime<Local>) -> Card {
    Card {
        title: "TIME",
        value: now.format("%I:%M %p").to_string(),
        detail: None,
    }
}

#[must_use]
pub fn date_card(now: DateTime<Local>) -> Card {
    Card {
        title: "DATE",
        value: now.format("%A, %B %d").to_string(),
        detail: None,
    }
}

#[must_use]
pub fn battery_card(battery: Option<BatteryStatus>) -> Card {
    match battery {
        Some(status) => Card {
            title: "BATTERY",
            value: format!("{}%", status.percent),
            detail: Some(if status.plugged { "Charging" } else { "On Battery" }.to_string()),
        },
        None => Card {
            title: "BATTERY",
            value: "--".to_string(),
            detail: Some("Not available".to_string()),
        },
    }
}

#[must_use]
pub fn cpu_card(system: Option<SystemSnapshot>) -> Card {
    Card {
        title: "CPU",
        value: system.map_or_else(|| "--".to_string(), |s| format!("{:.1}%", s.cpu_percent)),
        detail: None,
    }
}

#[must_use]
pub fn ram_card(system: Option<SystemSnapshot>) -> Card {
    Card {
        title: "RAM",
        value: system.map_or_else(|| "--".to_string(), |s| format!("{:.1}%", s.ram_percent)),
        detail: system.map(|s| format!("{:.1} / {:.1} GB", s.ram_used_gb, s.ram_total_gb)),
    }
}

/// Spawn the sampler; the latest reading is always available from the
/// returned receiver.
pub fn spawn_sampler() -> (watch::Receiver<Stats>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(Stats::default());
    let handle = tokio::spawn(async move {
        let platform = SystemPlatform;
        let mut ticker = tokio::time::interval(REFRESH_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let system = match tokio::task::spawn_blocking(|| sample_system(CPU_SAMPLE)).await {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    tracing::warn!("System sampling failed: {e}");
                    None
                }
            };
            let battery = platform.battery().await;
            if tx.send(Stats { battery, system }).is_err() {
                break;
            }
        }
    });
    (rx, handle)
}
