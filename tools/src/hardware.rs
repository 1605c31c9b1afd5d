//! Battery, volume, brightness, CPU/RAM statistics and wallpaper.

use std::path::Path;
use std::time::Duration;

use nexus_types::ToolCategory;
use nexus_utils::expand_home;
use serde_json::{Value, json};
use sysinfo::System;

use crate::platform::{CommandSpec, DesktopPlatform, Os, SystemPlatform, run_first_success};
use crate::system::applescript_escape;
use crate::{ToolCtx, ToolError, ToolExecutor, ToolFut, lenient_int, str_field};

const SYSFS_POWER_SUPPLY: &str = "/sys/class/power_supply";
/// Win32_Battery reports this when the runtime is unknown or on AC power.
const WIN32_RUNTIME_UNKNOWN: u64 = 71_582_788;
const BRIGHTNESS_STEP: u8 = 10;

pub(crate) fn skills() -> Vec<Box<dyn ToolExecutor>> {
    vec![
        Box::new(BatteryTool),
        Box::new(VolumeTool),
        Box::new(BrightnessTool),
    ]
}

pub(crate) fn info_skills() -> Vec<Box<dyn ToolExecutor>> {
    vec![Box::new(SystemInfoTool), Box::new(WallpaperTool)]
}

// ============================================================================
// Battery
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    pub percent: u8,
    /// On external power (charging or full).
    pub plugged: bool,
    pub secs_left: Option<u64>,
}

#[must_use]
pub fn describe_battery(status: Option<BatteryStatus>) -> String {
    let Some(status) = status else {
        return "Battery information not available.".to_string();
    };
    if status.plugged {
        return format!("Battery is at {}% and charging.", status.percent);
    }
    let mut text = format!("Battery is at {}%.", status.percent);
    if let Some(secs) = status.secs_left {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        if hours > 0 {
            text.push_str(&format!(
                " Approximately {hours} hours and {minutes} minutes remaining."
            ));
        } else {
            text.push_str(&format!(" Approximately {minutes} minutes remaining."));
        }
    }
    text
}

/// Parse `pmset -g batt`.
///
/// ```text
/// Now drawing from 'Battery Power'
///  -InternalBattery-0 (id=1234)	85%; discharging; 3:12 remaining present: true
/// ```
#[must_use]
pub fn parse_pmset(output: &str) -> Option<BatteryStatus> {
    let on_ac = output.contains("'AC Power'");
    let line = output.lines().find(|l| l.contains('%'))?;
    let mut fields = line.split(';').map(str::trim);

    let first = fields.next()?;
    let pct_end = first.rfind('%')?;
    let digits: String = first[..pct_end]
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let percent: u8 = digits.parse().ok()?;

    let state = fields.next().unwrap_or_default();
    let plugged = on_ac || matches!(state, "charging" | "charged" | "finishing charge" | "AC attached");

    let secs_left = fields.next().and_then(|rest| {
        let clock = rest.split_whitespace().next()?;
        let (h, m) = clock.split_once(':')?;
        Some(h.parse::<u64>().ok()? * 3600 + m.parse::<u64>().ok()? * 60)
    });

    Some(BatteryStatus {
        percent,
        plugged,
        secs_left: if plugged { None } else { secs_left },
    })
}

/// Parse `Get-CimInstance Win32_Battery | ConvertTo-Json` (object or array).
#[must_use]
pub fn parse_win32_battery(json_text: &str) -> Option<BatteryStatus> {
    let value: Value = serde_json::from_str(json_text.trim()).ok()?;
    let battery = match &value {
        Value::Array(items) => items.first()?,
        other => other,
    };
    let percent = battery.get("EstimatedChargeRemaining")?.as_u64()?.min(100) as u8;
    // 1 = discharging; 2 = on AC; 6..=9 = charging states.
    let status = battery.get("BatteryStatus").and_then(Value::as_u64).unwrap_or(1);
    let plugged = matches!(status, 2 | 6..=9);
    let secs_left = battery
        .get("EstimatedRunTime")
        .and_then(Value::as_u64)
        .filter(|&minutes| minutes < WIN32_RUNTIME_UNKNOWN)
        .map(|minutes| minutes * 60);
    Some(BatteryStatus {
        percent,
        plugged,
        secs_left: if plugged { None } else { secs_left },
    })
}

/// Combine the sysfs attribute files of one battery.
#[must_use]
pub fn parse_sysfs_battery(
    capacity: &str,
    status: &str,
    energy_now: Option<&str>,
    power_now: Option<&str>,
) -> Option<BatteryStatus> {
    let percent: u8 = capacity.trim().parse::<u16>().ok()?.min(100) as u8;
    let plugged = status.trim() != "Discharging";
    let secs_left = if plugged {
        None
    } else {
        let energy: u64 = energy_now?.trim().parse().ok()?;
        let power: u64 = power_now?.trim().parse().ok()?;
        (power > 0).then(|| energy * 3600 / power)
    };
    Some(BatteryStatus {
        percent,
        plugged,
        secs_left,
    })
}

async fn read_sysfs_battery(root: &Path) -> Option<BatteryStatus> {
    let mut entries = tokio::fs::read_dir(root).await.ok()?;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let dir = entry.path();
        let kind = tokio::fs::read_to_string(dir.join("type")).await.unwrap_or_default();
        if kind.trim() != "Battery" {
            continue;
        }
        let read = |name: &'static str| {
            let path = dir.join(name);
            async move { tokio::fs::read_to_string(path).await.ok() }
        };
        let capacity = read("capacity").await?;
        let status = read("status").await.unwrap_or_default();
        let energy = match read("energy_now").await {
            Some(e) => Some(e),
            None => read("charge_now").await,
        };
        let power = match read("power_now").await {
            Some(p) => Some(p),
            None => read("current_now").await,
        };
        return parse_sysfs_battery(&capacity, &status, energy.as_deref(), power.as_deref());
    }
    None
}

pub(crate) async fn read_battery(platform: &SystemPlatform) -> Option<BatteryStatus> {
    match platform.os() {
        Os::Linux => read_sysfs_battery(Path::new(SYSFS_POWER_SUPPLY)).await,
        Os::MacOs => {
            let output = platform.run(&CommandSpec::new("pmset", ["-g", "batt"])).await.ok()?;
            parse_pmset(&output.stdout)
        }
        Os::Windows => {
            let output = platform
                .run(&CommandSpec::powershell(
                    "Get-CimInstance Win32_Battery | Select-Object EstimatedChargeRemaining,BatteryStatus,EstimatedRunTime | ConvertTo-Json",
                ))
                .await
                .ok()?;
            parse_win32_battery(&output.stdout)
        }
    }
}

struct BatteryTool;

impl ToolExecutor for BatteryTool {
    fn name(&self) -> &'static str {
        "get_battery"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Hardware
    }

    fn description(&self) -> &'static str {
        "Battery level, charging state and time remaining"
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move { Ok(describe_battery(ctx.platform.battery().await)) })
    }
}

// ============================================================================
// Volume
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeAction {
    Up,
    Down,
    Mute,
}

impl VolumeAction {
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "up" => Some(VolumeAction::Up),
            "down" => Some(VolumeAction::Down),
            "mute" => Some(VolumeAction::Mute),
            _ => None,
        }
    }

    fn result(self) -> &'static str {
        match self {
            VolumeAction::Up => "Volume increased.",
            VolumeAction::Down => "Volume decreased.",
            VolumeAction::Mute => "Volume toggled mute.",
        }
    }
}

/// Candidate commands, tried in order.
#[must_use]
pub fn volume_commands(os: Os, action: VolumeAction) -> Vec<CommandSpec> {
    match os {
        Os::Windows => {
            // Media key codes: 175 up, 174 down, 173 mute. Five presses per step.
            let script = match action {
                VolumeAction::Up => "$w = New-Object -ComObject WScript.Shell; 1..5 | ForEach-Object { $w.SendKeys([char]175) }",
                VolumeAction::Down => "$w = New-Object -ComObject WScript.Shell; 1..5 | ForEach-Object { $w.SendKeys([char]174) }",
                VolumeAction::Mute => "$w = New-Object -ComObject WScript.Shell; $w.SendKeys([char]173)",
            };
            vec![CommandSpec::powershell(script)]
        }
        Os::MacOs => {
            let script = match action {
                VolumeAction::Up => {
                    "set volume output volume ((output volume of (get volume settings)) + 10)"
                }
                VolumeAction::Down => {
                    "set volume output volume ((output volume of (get volume settings)) - 10)"
                }
                VolumeAction::Mute => {
                    "set volume output muted (not (output muted of (get volume settings)))"
                }
            };
            vec![CommandSpec::osascript(script)]
        }
        Os::Linux => match action {
            VolumeAction::Up => vec![
                CommandSpec::new("pactl", ["set-sink-volume", "@DEFAULT_SINK@", "+10%"]),
                CommandSpec::new("amixer", ["-q", "sset", "Master", "10%+"]),
            ],
            VolumeAction::Down => vec![
                CommandSpec::new("pactl", ["set-sink-volume", "@DEFAULT_SINK@", "-10%"]),
                CommandSpec::new("amixer", ["-q", "sset", "Master", "10%-"]),
            ],
            VolumeAction::Mute => vec![
                CommandSpec::new("pactl", ["set-sink-mute", "@DEFAULT_SINK@", "toggle"]),
                CommandSpec::new("amixer", ["-q", "sset", "Master", "toggle"]),
            ],
        },
    }
}

struct VolumeTool;

impl ToolExecutor for VolumeTool {
    fn name(&self) -> &'static str {
        "control_volume"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Hardware
    }

    fn description(&self) -> &'static str {
        "Raise, lower or mute the system volume"
    }

    fn arguments(&self) -> Value {
        json!({ "action": "up | down | mute" })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let Some(action) = VolumeAction::parse(str_field(&args, "action")) else {
                return Ok("Unknown volume command.".to_string());
            };
            let commands = volume_commands(ctx.platform.os(), action);
            run_first_success(ctx.platform.as_ref(), &commands)
                .await
                .map_err(|e| ToolError::failed("adjusting volume", e))?;
            Ok(action.result().to_string())
        })
    }
}

// ============================================================================
// Brightness
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrightnessRequest {
    Up,
    Down,
    Set(u8),
}

impl BrightnessRequest {
    /// `"up"`, `"down"` or a whole number in 0..=100.
    #[must_use]
    pub fn parse(value: &Value) -> Option<Self> {
        if let Some(text) = value.as_str() {
            match text.trim().to_lowercase().as_str() {
                "up" => return Some(BrightnessRequest::Up),
                "down" => return Some(BrightnessRequest::Down),
                _ => {}
            }
        }
        let level = lenient_int(value)?;
        (0..=100)
            .contains(&level)
            .then(|| BrightnessRequest::Set(level as u8))
    }
}

/// Target level for a request, clamped to 0..=100.
#[must_use]
pub fn next_brightness(current: u8, request: BrightnessRequest) -> u8 {
    match request {
        BrightnessRequest::Up => current.saturating_add(BRIGHTNESS_STEP).min(100),
        BrightnessRequest::Down => current.saturating_sub(BRIGHTNESS_STEP),
        BrightnessRequest::Set(level) => level.min(100),
    }
}

#[must_use]
pub fn brightness_query(os: Os) -> CommandSpec {
    match os {
        Os::Windows => CommandSpec::powershell(
            "(Get-CimInstance -Namespace root/WMI -ClassName WmiMonitorBrightness).CurrentBrightness",
        ),
        Os::MacOs => CommandSpec::new("brightness", ["-l"]),
        Os::Linux => CommandSpec::new("brightnessctl", ["-m"]),
    }
}

#[must_use]
pub fn brightness_set(os: Os, level: u8) -> CommandSpec {
    match os {
        Os::Windows => CommandSpec::powershell(format!(
            "(Get-CimInstance -Namespace root/WMI -ClassName WmiMonitorBrightnessMethods) | Invoke-CimMethod -MethodName WmiSetBrightness -Arguments @{{Timeout=0; Brightness={level}}} | Out-Null"
        )),
        Os::MacOs => CommandSpec::new("brightness", [format!("{:.2}", f32::from(level) / 100.0)]),
        Os::Linux => CommandSpec::new("brightnessctl", ["set".to_string(), format!("{level}%")]),
    }
}

/// Parse the current level from [`brightness_query`] output.
#[must_use]
pub fn parse_brightness(os: Os, output: &str) -> Option<u8> {
    let level = match os {
        Os::Windows => output.lines().next()?.trim().parse::<u16>().ok()?,
        // "display 0: brightness 0.750000"
        Os::MacOs => {
            let line = output.lines().find(|l| l.contains("brightness"))?;
            let value: f32 = line.rsplit(' ').next()?.trim().parse().ok()?;
            (value * 100.0).round() as u16
        }
        // "intel_backlight,backlight,120000,50%,240000"
        Os::Linux => output
            .lines()
            .next()?
            .split(',')
            .nth(3)?
            .trim()
            .trim_end_matches('%')
            .parse::<u16>()
            .ok()?,
    };
    Some(level.min(100) as u8)
}

struct BrightnessTool;

impl BrightnessTool {
    async fn current(ctx: &ToolCtx, os: Os) -> Result<u8, String> {
        let output = ctx
            .platform
            .run(&brightness_query(os))
            .await
            .map_err(|e| e.to_string())?;
        if !output.success {
            return Err(output.error_text());
        }
        parse_brightness(os, &output.stdout)
            .ok_or_else(|| "could not read the current brightness".to_string())
    }
}

impl ToolExecutor for BrightnessTool {
    fn name(&self) -> &'static str {
        "adjust_brightness"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Hardware
    }

    fn description(&self) -> &'static str {
        "Raise or lower screen brightness by 10%, or set it to a percentage"
    }

    fn arguments(&self) -> Value {
        json!({ "action": "up | down | int" })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let request = args.get("action").and_then(BrightnessRequest::parse);
            let Some(request) = request else {
                return Ok(
                    "Unknown brightness command. Use 'up', 'down', or a number 0-100."
                        .to_string(),
                );
            };
            let os = ctx.platform.os();
            let unavailable = |e: String| ToolError::Unavailable(format!("Could not adjust brightness: {e}"));

            let current = match request {
                BrightnessRequest::Set(_) => 0,
                _ => Self::current(ctx, os).await.map_err(unavailable)?,
            };
            let level = next_brightness(current, request);

            let output = ctx
                .platform
                .run(&brightness_set(os, level))
                .await
                .map_err(|e| unavailable(e.to_string()))?;
            if !output.success {
                return Err(unavailable(output.error_text()));
            }

            Ok(match request {
                BrightnessRequest::Up => format!("Brightness increased to {level}%."),
                BrightnessRequest::Down => format!("Brightness decreased to {level}%."),
                BrightnessRequest::Set(_) => format!("Brightness set to {level}%."),
            })
        })
    }
}

// ============================================================================
// CPU / RAM
// ============================================================================

/// One reading of system load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemSnapshot {
    pub cpu_percent: f32,
    pub ram_percent: f32,
    pub ram_used_gb: f64,
    pub ram_total_gb: f64,
}

impl SystemSnapshot {
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "CPU usage is at {:.1}%. RAM usage is {:.1}%, using {:.1} GB of {:.1} GB.",
            self.cpu_percent, self.ram_percent, self.ram_used_gb, self.ram_total_gb
        )
    }
}

/// Sample CPU usage over `interval` and read memory.
///
/// Blocks for `interval`; call from a blocking context.
#[must_use]
pub fn sample_system(interval: Duration) -> SystemSnapshot {
    const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

    let mut sys = System::new();
    sys.refresh_cpu_usage();
    std::thread::sleep(interval.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
    sys.refresh_cpu_usage();
    sys.refresh_memory();

    let total = sys.total_memory();
    let used = sys.used_memory();
    let ram_percent = if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64 * 100.0) as f32
    };
    SystemSnapshot {
        cpu_percent: sys.global_cpu_usage(),
        ram_percent,
        ram_used_gb: used as f64 / GIB,
        ram_total_gb: total as f64 / GIB,
    }
}

struct SystemInfoTool;

impl ToolExecutor for SystemInfoTool {
    fn name(&self) -> &'static str {
        "get_system_info"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Hardware
    }

    fn description(&self) -> &'static str {
        "CPU and RAM usage"
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, _args: Value, _ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let snapshot = tokio::task::spawn_blocking(|| sample_system(Duration::from_millis(500)))
                .await
                .map_err(|e| ToolError::failed("getting system info", e))?;
            Ok(snapshot.describe())
        })
    }
}

// ============================================================================
// Wallpaper
// ============================================================================

#[must_use]
pub fn wallpaper_commands(os: Os, image: &Path) -> Vec<CommandSpec> {
    let path = image.to_string_lossy();
    match os {
        Os::Windows => vec![CommandSpec::powershell(format!(
            "Add-Type -TypeDefinition 'using System.Runtime.InteropServices; public class NexusWallpaper {{ [DllImport(\"user32.dll\", CharSet = CharSet.Unicode)] public static extern int SystemParametersInfo(int a, int b, string c, int d); }}'; [NexusWallpaper]::SystemParametersInfo(20, 0, '{}', 3) | Out-Null",
            path.replace('\'', "''")
        ))],
        Os::MacOs => vec![CommandSpec::osascript(format!(
            "tell application \"System Events\" to tell every desktop to set picture to \"{}\"",
            applescript_escape(&path)
        ))],
        Os::Linux => {
            let uri = format!("file://{path}");
            vec![
                CommandSpec::new(
                    "gsettings",
                    ["set", "org.gnome.desktop.background", "picture-uri", uri.as_str()],
                ),
                CommandSpec::new(
                    "gsettings",
                    ["set", "org.gnome.desktop.background", "picture-uri-dark", uri.as_str()],
                ),
            ]
        }
    }
}

struct WallpaperTool;

impl ToolExecutor for WallpaperTool {
    fn name(&self) -> &'static str {
        "set_wallpaper"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Hardware
    }

    fn description(&self) -> &'static str {
        "Set the desktop wallpaper to an image file"
    }

    fn arguments(&self) -> Value {
        json!({ "path": "~/Pictures/image.jpg" })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let raw = str_field(&args, "path").trim();
            if raw.is_empty() {
                return Ok("Please provide a path to an image.".to_string());
            }
            let path = expand_home(raw);
            if !path.exists() {
                return Ok(format!("Image not found at {}", path.display()));
            }
            let path = std::fs::canonicalize(&path).unwrap_or(path);

            let commands = wallpaper_commands(ctx.platform.os(), &path);
            let (first, rest) = commands
                .split_first()
                .ok_or_else(|| ToolError::Internal("no wallpaper command".to_string()))?;
            let output = ctx
                .platform
                .run(first)
                .await
                .map_err(|e| ToolError::failed("setting wallpaper", e))?;
            if !output.success {
                return Err(ToolError::failed("setting wallpaper", output.error_text()));
            }
            for command in rest {
                let _ = ctx.platform.run(command).await;
            }
            Ok("Wallpaper updated.".to_string())
        })
    }
}
