//! Screenshots and clipboard.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use nexus_types::ToolCategory;
use nexus_utils::expand_home;
use serde_json::{Value, json};

use crate::clipboard::RgbaImage;
use crate::platform::{CommandSpec, Os, open_target, run_first_success};
use crate::{ToolCtx, ToolError, ToolExecutor, ToolFut, str_field};

const LISTED_SCREENSHOTS: usize = 10;
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub(crate) fn skills() -> Vec<Box<dyn ToolExecutor>> {
    vec![
        Box::new(ScreenshotTool),
        Box::new(ScreenshotToClipboardTool),
        Box::new(GetClipboardTool),
        Box::new(SetClipboardTool),
        Box::new(ClearClipboardTool),
        Box::new(ListScreenshotsTool),
        Box::new(OpenScreenshotFolderTool),
    ]
}

#[must_use]
pub fn screenshot_file_name(now: DateTime<Local>) -> String {
    now.format("screenshot_%Y%m%d_%H%M%S.png").to_string()
}

/// Full-screen capture commands, tried in order.
#[must_use]
pub fn screenshot_commands(os: Os, target: &Path) -> Vec<CommandSpec> {
    let path = target.to_string_lossy().into_owned();
    match os {
        Os::Windows => vec![CommandSpec::powershell(format!(
            "Add-Type -AssemblyName System.Windows.Forms,System.Drawing; \
             $b = [System.Windows.Forms.SystemInformation]::VirtualScreen; \
             $bmp = New-Object System.Drawing.Bitmap $b.Width, $b.Height; \
             $g = [System.Drawing.Graphics]::FromImage($bmp); \
             $g.CopyFromScreen($b.Left, $b.Top, 0, 0, $bmp.Size); \
             $bmp.Save('{}', [System.Drawing.Imaging.ImageFormat]::Png); \
             $g.Dispose(); $bmp.Dispose()",
            path.replace('\'', "''")
        ))],
        Os::MacOs => vec![CommandSpec::new("screencapture", ["-x", path.as_str()])],
        Os::Linux => vec![
            CommandSpec::new("gnome-screenshot", ["-f", path.as_str()]),
            CommandSpec::new("grim", [path.as_str()]),
            CommandSpec::new("spectacle", ["-b", "-n", "-o", path.as_str()]),
            CommandSpec::new("scrot", ["-o", path.as_str()]),
            CommandSpec::new("import", ["-window", "root", path.as_str()]),
        ],
    }
}

async fn capture(ctx: &ToolCtx, target: &Path) -> Result<(), String> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| e.to_string())?;
    }
    run_first_success(ctx.platform.as_ref(), &screenshot_commands(ctx.platform.os(), target))
        .await?;
    Ok(())
}

/// Decode an image file into RGBA8 pixels for the clipboard.
pub fn decode_image(path: &Path) -> Result<RgbaImage, String> {
    let decoded = image::open(path).map_err(|e| e.to_string())?.to_rgba8();
    let (width, height) = decoded.dimensions();
    Ok(RgbaImage {
        width: width as usize,
        height: height as usize,
        bytes: decoded.into_raw(),
    })
}

struct ScreenshotTool;

impl ToolExecutor for ScreenshotTool {
    fn name(&self) -> &'static str {
        "take_screenshot"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Screen
    }

    fn description(&self) -> &'static str {
        "Capture the whole screen to a PNG file"
    }

    fn arguments(&self) -> Value {
        json!({ "save_path": "optional" })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let requested = str_field(&args, "save_path").trim();
            let target = if requested.is_empty() {
                ctx.paths
                    .screenshots_dir()
                    .join(screenshot_file_name(Local::now()))
            } else {
                expand_home(requested)
            };
            capture(ctx, &target)
                .await
                .map_err(|e| ToolError::failed("taking screenshot", e))?;
            tracing::info!(path = %target.display(), "Screenshot saved");
            Ok(format!("Screenshot saved to {}", target.display()))
        })
    }
}

struct ScreenshotToClipboardTool;

impl ToolExecutor for ScreenshotToClipboardTool {
    fn name(&self) -> &'static str {
        "screenshot_to_clipboard"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Screen
    }

    fn description(&self) -> &'static str {
        "Capture the screen straight to the clipboard"
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let fail = |e: String| ToolError::failed("taking screenshot to clipboard", e);
            let target = std::env::temp_dir().join(format!(
                "nexus-clipboard-{}-{}",
                std::process::id(),
                screenshot_file_name(Local::now())
            ));
            capture(ctx, &target).await.map_err(fail)?;

            let path = target.clone();
            let decoded = tokio::task::spawn_blocking(move || decode_image(&path))
                .await
                .map_err(|e| fail(e.to_string()))?;
            let _ = tokio::fs::remove_file(&target).await;

            ctx.clipboard.set_image(decoded.map_err(fail)?).await.map_err(fail)?;
            Ok("Screenshot copied to clipboard.".to_string())
        })
    }
}

struct GetClipboardTool;

impl ToolExecutor for GetClipboardTool {
    fn name(&self) -> &'static str {
        "get_clipboard"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Screen
    }

    fn description(&self) -> &'static str {
        "Read text from the clipboard"
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let text = ctx
                .clipboard
                .get_text()
                .await
                .map_err(|e| ToolError::failed("reading clipboard", e))?;
            Ok(match text {
                Some(text) => format!("Clipboard content: {text}"),
                None => "Clipboard is empty or contains non-text data.".to_string(),
            })
        })
    }
}

struct SetClipboardTool;

impl ToolExecutor for SetClipboardTool {
    fn name(&self) -> &'static str {
        "set_clipboard"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Screen
    }

    fn description(&self) -> &'static str {
        "Copy text to the clipboard"
    }

    fn arguments(&self) -> Value {
        json!({ "text": "..." })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            ctx.clipboard
                .set_text(str_field(&args, "text").to_string())
                .await
                .map_err(|e| ToolError::failed("setting clipboard", e))?;
            Ok("Text copied to clipboard.".to_string())
        })
    }
}

struct ClearClipboardTool;

impl ToolExecutor for ClearClipboardTool {
    fn name(&self) -> &'static str {
        "clear_clipboard"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Screen
    }

    fn description(&self) -> &'static str {
        "Empty the clipboard"
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            ctx.clipboard
                .clear()
                .await
                .map_err(|e| ToolError::failed("clearing clipboard", e))?;
            Ok("Clipboard cleared.".to_string())
        })
    }
}

/// `(file name, modified)` pairs, newest first.
pub async fn screenshots_newest_first(dir: &Path) -> std::io::Result<Vec<(String, SystemTime)>> {
    let mut found = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
        Err(e) => return Err(e),
    };
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_image = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()));
        if !is_image {
            continue;
        }
        let modified = entry.metadata().await?.modified()?;
        found.push((entry.file_name().to_string_lossy().into_owned(), modified));
    }
    found.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
    Ok(found)
}

#[must_use]
pub fn format_screenshots(shots: &[(String, SystemTime)]) -> String {
    if shots.is_empty() {
        return "No screenshots found.".to_string();
    }
    let mut text = format!("Screenshots ({}):\n\n", shots.len());
    for (i, (name, modified)) in shots.iter().take(LISTED_SCREENSHOTS).enumerate() {
        text.push_str(&format!(
            "{}. {name} - {}\n",
            i + 1,
            DateTime::<Local>::from(*modified).format("%Y-%m-%d %H:%M:%S")
        ));
    }
    if shots.len() > LISTED_SCREENSHOTS {
        text.push_str(&format!("\n... and {} more.", shots.len() - LISTED_SCREENSHOTS));
    }
    text
}

struct ListScreenshotsTool;

impl ToolExecutor for ListScreenshotsTool {
    fn name(&self) -> &'static str {
        "list_screenshots"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Screen
    }

    fn description(&self) -> &'static str {
        "List saved screenshots, newest first"
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let shots = screenshots_newest_first(&ctx.paths.screenshots_dir())
                .await
                .map_err(|e| ToolError::failed("listing screenshots", e))?;
            Ok(format_screenshots(&shots))
        })
    }
}

struct OpenScreenshotFolderTool;

impl ToolExecutor for OpenScreenshotFolderTool {
    fn name(&self) -> &'static str {
        "open_screenshot_folder"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Screen
    }

    fn description(&self) -> &'static str {
        "Open the screenshot folder in the file manager"
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let dir: PathBuf = ctx.paths.screenshots_dir();
            let fail = |e: std::io::Error| ToolError::failed("opening screenshot folder", e);
            tokio::fs::create_dir_all(&dir).await.map_err(fail)?;
            ctx.platform
                .spawn(&open_target(ctx.platform.os(), &dir.to_string_lossy()))
                .map_err(fail)?;
            Ok(format!("Opened screenshot folder: {}", dir.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::RecordingPlatform;
    use crate::testing::ctx_with;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn file_names_are_timestamped() {
        let at = Local.with_ymd_and_hms(2024, 2, 29, 13, 5, 9).unwrap();
        assert_eq!(screenshot_file_name(at), "screenshot_20240229_130509.png");
    }

    #[tokio::test]
    async fn take_screenshot_falls_back_between_tools() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(RecordingPlatform::new(Os::Linux));
        platform.fail("gnome-screenshot");
        let (ctx, _) = ctx_with(dir.path(), platform.clone());
        let target = dir.path().join("shot.png");

        let result = ScreenshotTool
            .execute(json!({ "save_path": target.to_string_lossy() }), &ctx)
            .await
            .unwrap();
        assert_eq!(result, format!("Screenshot saved to {}", target.display()));
        let programs: Vec<String> = platform.calls().into_iter().map(|c| c.program).collect();
        assert_eq!(programs, vec!["gnome-screenshot", "grim"]);
    }

    #[tokio::test]
    async fn default_screenshot_goes_to_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(RecordingPlatform::new(Os::MacOs));
        let (ctx, _) = ctx_with(dir.path(), platform.clone());

        let result = ScreenshotTool.execute(json!({}), &ctx).await.unwrap();
        let saved = result.trim_start_matches("Screenshot saved to ");
        assert!(saved.starts_with(&ctx.paths.screenshots_dir().display().to_string()));
        assert!(ctx.paths.screenshots_dir().is_dir());
        assert_eq!(platform.calls()[0].program, "screencapture");
    }

    #[test]
    fn decodes_png_to_rgba() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixel.png");
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(1, 0, image::Rgba([10, 20, 30, 255]));
        img.save(&path).unwrap();

        let decoded = decode_image(&path).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 1));
        assert_eq!(&decoded.bytes[4..8], &[10, 20, 30, 255]);
    }

    #[tokio::test]
    async fn clipboard_screenshot_reports_missing_capture() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(RecordingPlatform::new(Os::MacOs));
        let (ctx, clipboard) = ctx_with(dir.path(), platform);

        // The recording platform never writes the file.
        let err = ScreenshotToClipboardTool
            .execute(json!({}), &ctx)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Error taking screenshot to clipboard:"));
        assert!(clipboard.image().is_none());
    }

    #[tokio::test]
    async fn clipboard_text_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx_with(dir.path(), Arc::new(RecordingPlatform::new(Os::Linux)));

        let empty = GetClipboardTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(empty, "Clipboard is empty or contains non-text data.");
        let set = SetClipboardTool
            .execute(json!({ "text": "hello" }), &ctx)
            .await
            .unwrap();
        assert_eq!(set, "Text copied to clipboard.");
        let got = GetClipboardTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(got, "Clipboard content: hello");
        let cleared = ClearClipboardTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(cleared, "Clipboard cleared.");
        let empty = GetClipboardTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(empty, "Clipboard is empty or contains non-text data.");
    }

    #[test]
    fn listing_caps_at_ten() {
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let shots: Vec<(String, SystemTime)> = (0..12)
            .map(|i| (format!("s{i}.png"), base))
            .collect();
        let text = format_screenshots(&shots);
        assert!(text.starts_with("Screenshots (12):\n\n1. s0.png - "));
        assert!(text.ends_with("\n... and 2 more."));
        assert_eq!(text.matches(".png - ").count(), 10);
        assert_eq!(format_screenshots(&[]), "No screenshots found.");
    }

    #[tokio::test]
    async fn newest_screenshots_come_first() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.png");
        let new = dir.path().join("new.jpg");
        std::fs::write(&old, "").unwrap();
        std::fs::write(&new, "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        let past = SystemTime::now() - Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&old)
            .unwrap()
            .set_modified(past)
            .unwrap();

        let shots = screenshots_newest_first(dir.path()).await.unwrap();
        let names: Vec<&str> = shots.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["new.jpg", "old.png"]);
    }

    #[tokio::test]
    async fn open_folder_creates_and_opens() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(RecordingPlatform::new(Os::Linux));
        let (ctx, _) = ctx_with(dir.path(), platform.clone());

        let result = OpenScreenshotFolderTool.execute(json!({}), &ctx).await.unwrap();
        let folder = ctx.paths.screenshots_dir();
        assert_eq!(result, format!("Opened screenshot folder: {}", folder.display()));
        assert!(folder.is_dir());
        assert_eq!(platform.rendered(), vec![format!("xdg-open {}", folder.display())]);
    }
}
