//! File management skills.
//!
//! Every path argument accepts a leading `~`. Missing items are reported as
//! ordinary results ("Item not found: ..."); I/O failures become
//! [`ToolError::Failed`] so the engine speaks them as "Error <doing>: ...".

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use ignore::WalkBuilder;
use nexus_types::ToolCategory;
use nexus_utils::expand_home;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::platform::open_target;
use crate::{ToolCtx, ToolError, ToolExecutor, ToolFut, parse_args};

/// Paths shown in a search result.
const SEARCH_LISTED: usize = 10;

pub(crate) fn skills() -> Vec<Box<dyn ToolExecutor>> {
    vec![
        Box::new(CreateFileTool),
        Box::new(CreateFolderTool),
        Box::new(DeleteItemTool),
        Box::new(RenameItemTool),
        Box::new(CopyItemTool),
        Box::new(SearchFilesTool),
        Box::new(FileInfoTool),
        Box::new(OpenLocationTool),
        Box::new(ListDirectoryTool),
    ]
}

#[derive(Debug, Deserialize)]
struct PathArgs {
    #[serde(default)]
    path: String,
}

fn resolve(raw: &str) -> PathBuf {
    expand_home(raw.trim())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn modified_local(time: SystemTime) -> DateTime<Local> {
    DateTime::<Local>::from(time)
}

/// Human-readable size with two decimals: `512.00 B`, `1.50 KB`, ...
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    for unit in &UNITS[..UNITS.len() - 1] {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} {}", UNITS[UNITS.len() - 1])
}

fn copy_tree(source: &Path, destination: &Path) -> io::Result<()> {
    if destination.exists() {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", destination.display()),
        ));
    }
    std::fs::create_dir_all(destination)?;
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let target = destination.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Case-insensitive substring search over file names under `roots`.
///
/// Files are matched inside directories at most `max_depth` levels below a
/// root. Hidden entries are skipped.
#[must_use]
pub fn find_files(
    roots: &[PathBuf],
    query: &str,
    extension: Option<&str>,
    max_depth: usize,
    max_results: usize,
) -> Vec<PathBuf> {
    let query = query.to_lowercase();
    let mut results = Vec::new();
    for root in roots.iter().filter(|r| r.is_dir()) {
        let mut builder = WalkBuilder::new(root);
        builder
            .standard_filters(false)
            .hidden(true)
            .max_depth(Some(max_depth + 1))
            .sort_by_file_path(|a, b| a.cmp(b));
        for entry in builder.build().flatten() {
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if extension.is_some_and(|ext| !name.ends_with(ext)) {
                continue;
            }
            if name.to_lowercase().contains(&query) {
                results.push(entry.into_path());
                if results.len() >= max_results {
                    return results;
                }
            }
        }
    }
    results
}

struct CreateFileTool;

impl ToolExecutor for CreateFileTool {
    fn name(&self) -> &'static str {
        "create_file"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn description(&self) -> &'static str {
        "Create a file with optional content, creating parent folders"
    }

    fn arguments(&self) -> Value {
        json!({ "path": "~/Desktop/file.txt", "content": "optional" })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, _ctx: &'a ToolCtx) -> ToolFut<'a> {
        #[derive(Deserialize)]
        struct Args {
            #[serde(default)]
            path: String,
            #[serde(default)]
            content: String,
        }

        Box::pin(async move {
            let typed: Args = parse_args(&args)?;
            let path = resolve(&typed.path);
            let fail = |e: io::Error| ToolError::failed("creating file", e);
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(fail)?;
            }
            tokio::fs::write(&path, typed.content).await.map_err(fail)?;
            Ok(format!("File created successfully at {}", path.display()))
        })
    }
}

struct CreateFolderTool;

impl ToolExecutor for CreateFolderTool {
    fn name(&self) -> &'static str {
        "create_folder"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn description(&self) -> &'static str {
        "Create a folder and any missing parents"
    }

    fn arguments(&self) -> Value {
        json!({ "path": "~/Desktop/NewFolder" })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, _ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let typed: PathArgs = parse_args(&args)?;
            let path = resolve(&typed.path);
            tokio::fs::create_dir_all(&path)
                .await
                .map_err(|e| ToolError::failed("creating folder", e))?;
            Ok(format!("Folder created successfully at {}", path.display()))
        })
    }
}

struct DeleteItemTool;

impl ToolExecutor for DeleteItemTool {
    fn name(&self) -> &'static str {
        "delete_item"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn description(&self) -> &'static str {
        "Delete a file, or a folder with everything in it"
    }

    fn arguments(&self) -> Value {
        json!({ "path": "~/Desktop/file.txt" })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, _ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let typed: PathArgs = parse_args(&args)?;
            let path = resolve(&typed.path);
            let Ok(meta) = tokio::fs::symlink_metadata(&path).await else {
                return Ok(format!("Item not found: {}", path.display()));
            };
            let fail = |e: io::Error| ToolError::failed("deleting item", e);
            if meta.is_dir() {
                tokio::fs::remove_dir_all(&path).await.map_err(fail)?;
                tracing::info!(path = %path.display(), "Deleted folder");
                Ok(format!("Folder deleted: {}", path.display()))
            } else {
                tokio::fs::remove_file(&path).await.map_err(fail)?;
                tracing::info!(path = %path.display(), "Deleted file");
                Ok(format!("File deleted: {}", path.display()))
            }
        })
    }
}

struct RenameItemTool;

impl ToolExecutor for RenameItemTool {
    fn name(&self) -> &'static str {
        "rename_item"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn description(&self) -> &'static str {
        "Rename or move a file or folder"
    }

    fn arguments(&self) -> Value {
        json!({ "old_path": "~/a.txt", "new_path": "~/b.txt" })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, _ctx: &'a ToolCtx) -> ToolFut<'a> {
        #[derive(Deserialize)]
        struct Args {
            #[serde(default)]
            old_path: String,
            #[serde(default)]
            new_path: String,
        }

        Box::pin(async move {
            let typed: Args = parse_args(&args)?;
            let old_path = resolve(&typed.old_path);
            let new_path = resolve(&typed.new_path);
            if tokio::fs::symlink_metadata(&old_path).await.is_err() {
                return Ok(format!("Item not found: {}", old_path.display()));
            }
            tokio::fs::rename(&old_path, &new_path)
                .await
                .map_err(|e| ToolError::failed("renaming item", e))?;
            Ok(format!(
                "Item renamed/moved from {} to {}",
                old_path.display(),
                new_path.display()
            ))
        })
    }
}

struct CopyItemTool;

impl ToolExecutor for CopyItemTool {
    fn name(&self) -> &'static str {
        "copy_item"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn description(&self) -> &'static str {
        "Copy a file, or a folder recursively"
    }

    fn arguments(&self) -> Value {
        json!({ "source": "~/a.txt", "destination": "~/Backup/" })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, _ctx: &'a ToolCtx) -> ToolFut<'a> {
        #[derive(Deserialize)]
        struct Args {
            #[serde(default)]
            source: String,
            #[serde(default)]
            destination: String,
        }

        Box::pin(async move {
            let typed: Args = parse_args(&args)?;
            let source = resolve(&typed.source);
            let destination = resolve(&typed.destination);
            let Ok(meta) = tokio::fs::metadata(&source).await else {
                return Ok(format!("Source not found: {}", source.display()));
            };
            let fail = |e: io::Error| ToolError::failed("copying item", e);

            if meta.is_dir() {
                let (from, to) = (source.clone(), destination.clone());
                tokio::task::spawn_blocking(move || copy_tree(&from, &to))
                    .await
                    .map_err(|e| ToolError::failed("copying item", e))?
                    .map_err(fail)?;
                return Ok(format!(
                    "Folder copied from {} to {}",
                    source.display(),
                    destination.display()
                ));
            }

            // Copying onto a directory keeps the file name.
            let target = if destination.is_dir() {
                destination.join(file_name(&source))
            } else {
                destination.clone()
            };
            tokio::fs::copy(&source, &target).await.map_err(fail)?;
            Ok(format!(
                "File copied from {} to {}",
                source.display(),
                destination.display()
            ))
        })
    }
}

struct SearchFilesTool;

impl ToolExecutor for SearchFilesTool {
    fn name(&self) -> &'static str {
        "search_files"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn description(&self) -> &'static str {
        "Find files by name in Documents, Desktop and Downloads, or in a given folder"
    }

    fn arguments(&self) -> Value {
        json!({ "query": "report", "location": "optional", "extension": ".pdf" })
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        #[derive(Deserialize)]
        struct Args {
            #[serde(default)]
            query: String,
            location: Option<String>,
            extension: Option<String>,
        }

        Box::pin(async move {
            let typed: Args = parse_args(&args)?;
            let roots = match typed.location.as_deref().map(str::trim) {
                Some(location) if !location.is_empty() => vec![resolve(location)],
                _ => ctx.files.resolved_roots(),
            };
            let extension = typed.extension.filter(|e| !e.trim().is_empty());
            let (max_depth, max_results) = (ctx.files.max_depth, ctx.files.max_results.max(1));
            let query = typed.query.clone();

            let found = tokio::task::spawn_blocking(move || {
                find_files(&roots, &query, extension.as_deref(), max_depth, max_results)
            })
            .await
            .map_err(|e| ToolError::failed("searching files", e))?;

            if found.is_empty() {
                return Ok(format!("No files found matching '{}'", typed.query));
            }
            let listed: Vec<String> = found
                .iter()
                .take(SEARCH_LISTED)
                .map(|p| p.display().to_string())
                .collect();
            Ok(format!("Found {} file(s):\n{}", found.len(), listed.join("\n")))
        })
    }
}

struct FileInfoTool;

impl ToolExecutor for FileInfoTool {
    fn name(&self) -> &'static str {
        "get_file_info"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn description(&self) -> &'static str {
        "Size, modification time and location of a file or folder"
    }

    fn arguments(&self) -> Value {
        json!({ "path": "~/file.txt" })
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, args: Value, _ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let typed: PathArgs = parse_args(&args)?;
            let path = resolve(&typed.path);
            let Ok(meta) = tokio::fs::metadata(&path).await else {
                return Ok(format!("Item not found: {}", path.display()));
            };
            let modified = meta
                .modified()
                .map_err(|e| ToolError::failed("getting file info", e))?;
            let kind = if meta.is_dir() { "Folder" } else { "File" };
            let location = path.parent().map(Path::to_path_buf).unwrap_or_default();
            Ok(format!(
                "{kind}: {}\nSize: {}\nModified: {}\nLocation: {}",
                file_name(&path),
                format_size(meta.len()),
                modified_local(modified).format("%Y-%m-%d %H:%M:%S"),
                location.display()
            ))
        })
    }
}

struct OpenLocationTool;

impl ToolExecutor for OpenLocationTool {
    fn name(&self) -> &'static str {
        "open_location"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn description(&self) -> &'static str {
        "Open a folder, or the folder containing a file, in the file manager"
    }

    fn arguments(&self) -> Value {
        json!({ "path": "~/Documents" })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let typed: PathArgs = parse_args(&args)?;
            let path = resolve(&typed.path);
            let Ok(meta) = tokio::fs::metadata(&path).await else {
                return Ok(format!("Location not found: {}", path.display()));
            };
            let (folder, result) = if meta.is_file() {
                let parent = path.parent().map(Path::to_path_buf).unwrap_or_default();
                (parent, format!("Opened folder containing {}", file_name(&path)))
            } else {
                (path.clone(), format!("Opened folder: {}", path.display()))
            };
            let command = open_target(ctx.platform.os(), &folder.to_string_lossy());
            ctx.platform
                .spawn(&command)
                .map_err(|e| ToolError::failed("opening location", e))?;
            Ok(result)
        })
    }
}

struct ListDirectoryTool;

impl ToolExecutor for ListDirectoryTool {
    fn name(&self) -> &'static str {
        "list_directory"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Files
    }

    fn description(&self) -> &'static str {
        "List the folders and files in a directory"
    }

    fn arguments(&self) -> Value {
        json!({ "path": "~/Documents" })
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, args: Value, _ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let typed: PathArgs = parse_args(&args)?;
            let raw = if typed.path.trim().is_empty() { "." } else { typed.path.as_str() };
            let path = resolve(raw);
            let Ok(meta) = tokio::fs::metadata(&path).await else {
                return Ok(format!("Directory not found: {}", path.display()));
            };
            if !meta.is_dir() {
                return Ok(format!("Not a directory: {}", path.display()));
            }

            let fail = |e: io::Error| ToolError::failed("listing directory", e);
            let mut folders = Vec::new();
            let mut files = Vec::new();
            let mut entries = tokio::fs::read_dir(&path).await.map_err(fail)?;
            while let Some(entry) = entries.next_entry().await.map_err(fail)? {
                let name = entry.file_name().to_string_lossy().into_owned();
                match entry.file_type().await {
                    Ok(t) if t.is_dir() => folders.push(name),
                    _ => files.push(name),
                }
            }
            if folders.is_empty() && files.is_empty() {
                return Ok(format!("Directory is empty: {}", path.display()));
            }
            folders.sort();
            files.sort();

            let lines: Vec<String> = folders
                .iter()
                .map(|f| format!("[folder] {f}"))
                .chain(files.iter().map(|f| format!("[file] {f}")))
                .collect();
            Ok(format!("Contents of {}:\n{}", path.display(), lines.join("\n")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Os, RecordingPlatform};
    use crate::testing::ctx_with;
    use std::sync::Arc;

    fn ctx(dir: &Path) -> (ToolCtx, Arc<RecordingPlatform>) {
        let platform = Arc::new(RecordingPlatform::new(Os::Linux));
        let (ctx, _) = ctx_with(dir, platform.clone());
        (ctx, platform)
    }

    fn path_arg(path: &Path) -> Value {
        json!({ "path": path.to_string_lossy() })
    }

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(1536), "1.50 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024_u64.pow(4)), "3.00 TB");
        assert_eq!(format_size(2048 * 1024_u64.pow(4)), "2048.00 TB");
    }

    #[tokio::test]
    async fn create_file_makes_parents() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx(dir.path());
        let target = dir.path().join("a/b/notes.txt");

        let result = CreateFileTool
            .execute(json!({ "path": target.to_string_lossy(), "content": "hi" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result, format!("File created successfully at {}", target.display()));
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "hi");
    }

    #[tokio::test]
    async fn delete_reports_kind_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx(dir.path());
        let file = dir.path().join("x.txt");
        let folder = dir.path().join("sub");
        std::fs::write(&file, "x").unwrap();
        std::fs::create_dir_all(folder.join("deep")).unwrap();

        let result = DeleteItemTool.execute(path_arg(&file), &ctx).await.unwrap();
        assert_eq!(result, format!("File deleted: {}", file.display()));
        let result = DeleteItemTool.execute(path_arg(&folder), &ctx).await.unwrap();
        assert_eq!(result, format!("Folder deleted: {}", folder.display()));
        assert!(!folder.exists());
        let result = DeleteItemTool.execute(path_arg(&file), &ctx).await.unwrap();
        assert_eq!(result, format!("Item not found: {}", file.display()));
    }

    #[tokio::test]
    async fn rename_moves_items() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx(dir.path());
        let old = dir.path().join("old.txt");
        let new = dir.path().join("new.txt");
        std::fs::write(&old, "x").unwrap();

        let args = json!({ "old_path": old.to_string_lossy(), "new_path": new.to_string_lossy() });
        let result = RenameItemTool.execute(args.clone(), &ctx).await.unwrap();
        assert_eq!(
            result,
            format!("Item renamed/moved from {} to {}", old.display(), new.display())
        );
        assert!(new.exists());
        let result = RenameItemTool.execute(args, &ctx).await.unwrap();
        assert_eq!(result, format!("Item not found: {}", old.display()));
    }

    #[tokio::test]
    async fn copy_handles_files_and_folders() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx(dir.path());
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("inner")).unwrap();
        std::fs::write(src.join("inner/a.txt"), "a").unwrap();
        let dest = dir.path().join("dest");

        let args = json!({ "source": src.to_string_lossy(), "destination": dest.to_string_lossy() });
        let result = CopyItemTool.execute(args, &ctx).await.unwrap();
        assert_eq!(
            result,
            format!("Folder copied from {} to {}", src.display(), dest.display())
        );
        assert_eq!(std::fs::read_to_string(dest.join("inner/a.txt")).unwrap(), "a");

        let file = src.join("inner/a.txt");
        let into = dir.path().join("dest");
        let args = json!({ "source": file.to_string_lossy(), "destination": into.to_string_lossy() });
        CopyItemTool.execute(args, &ctx).await.unwrap();
        assert!(into.join("a.txt").exists());

        let missing = dir.path().join("nope");
        let args = json!({ "source": missing.to_string_lossy(), "destination": "x" });
        let result = CopyItemTool.execute(args, &ctx).await.unwrap();
        assert_eq!(result, format!("Source not found: {}", missing.display()));
    }

    #[tokio::test]
    async fn copying_a_folder_onto_an_existing_one_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx(dir.path());
        let src = dir.path().join("src");
        let dest = dir.path().join("dest");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dest).unwrap();

        let args = json!({ "source": src.to_string_lossy(), "destination": dest.to_string_lossy() });
        let err = CopyItemTool.execute(args, &ctx).await.unwrap_err();
        assert!(err.to_string().starts_with("Error copying item:"));
    }

    #[test]
    fn search_respects_depth_extension_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("a/b/c/d")).unwrap();
        std::fs::write(root.join("Report.pdf"), "").unwrap();
        std::fs::write(root.join("a/report.txt"), "").unwrap();
        std::fs::write(root.join("a/b/c/report-deep.pdf"), "").unwrap();
        std::fs::write(root.join("a/b/c/d/report-too-deep.pdf"), "").unwrap();
        std::fs::write(root.join("a/other.pdf"), "").unwrap();

        let roots = vec![root.to_path_buf()];
        let found = find_files(&roots, "REPORT", None, 3, 20);
        let names: Vec<String> = found.iter().map(|p| file_name(p)).collect();
        assert!(names.contains(&"Report.pdf".to_string()));
        assert!(names.contains(&"report-deep.pdf".to_string()));
        assert!(!names.contains(&"report-too-deep.pdf".to_string()));
        assert!(!names.contains(&"other.pdf".to_string()));

        let pdfs = find_files(&roots, "report", Some(".pdf"), 3, 20);
        assert!(pdfs.iter().all(|p| p.extension().is_some_and(|e| e == "pdf")));

        assert_eq!(find_files(&roots, "report", None, 3, 1).len(), 1);
    }

    #[tokio::test]
    async fn search_tool_formats_results() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx(dir.path());
        std::fs::write(dir.path().join("budget.xlsx"), "").unwrap();

        let args = json!({ "query": "budget", "location": dir.path().to_string_lossy() });
        let result = SearchFilesTool.execute(args, &ctx).await.unwrap();
        assert_eq!(
            result,
            format!("Found 1 file(s):\n{}", dir.path().join("budget.xlsx").display())
        );

        let args = json!({ "query": "missing", "location": dir.path().to_string_lossy() });
        let result = SearchFilesTool.execute(args, &ctx).await.unwrap();
        assert_eq!(result, "No files found matching 'missing'");
    }

    #[tokio::test]
    async fn file_info_lists_fields() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx(dir.path());
        let file = dir.path().join("data.bin");
        std::fs::write(&file, vec![0_u8; 2048]).unwrap();

        let result = FileInfoTool.execute(path_arg(&file), &ctx).await.unwrap();
        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(lines[0], "File: data.bin");
        assert_eq!(lines[1], "Size: 2.00 KB");
        assert!(lines[2].starts_with("Modified: "));
        assert_eq!(lines[3], format!("Location: {}", dir.path().display()));
    }

    #[tokio::test]
    async fn open_location_opens_parent_of_file() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, platform) = ctx(dir.path());
        let file = dir.path().join("doc.txt");
        std::fs::write(&file, "").unwrap();

        let result = OpenLocationTool.execute(path_arg(&file), &ctx).await.unwrap();
        assert_eq!(result, "Opened folder containing doc.txt");
        assert_eq!(
            platform.rendered(),
            vec![format!("xdg-open {}", dir.path().display())]
        );

        let missing = dir.path().join("gone");
        let result = OpenLocationTool.execute(path_arg(&missing), &ctx).await.unwrap();
        assert_eq!(result, format!("Location not found: {}", missing.display()));
    }

    #[tokio::test]
    async fn list_directory_puts_folders_first() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx(dir.path());
        let root = dir.path().join("list");
        std::fs::create_dir_all(root.join("zeta")).unwrap();
        std::fs::write(root.join("alpha.txt"), "").unwrap();

        let result = ListDirectoryTool.execute(path_arg(&root), &ctx).await.unwrap();
        assert_eq!(
            result,
            format!("Contents of {}:\n[folder] zeta\n[file] alpha.txt", root.display())
        );

        let empty = dir.path().join("empty");
        std::fs::create_dir_all(&empty).unwrap();
        let result = ListDirectoryTool.execute(path_arg(&empty), &ctx).await.unwrap();
        assert_eq!(result, format!("Directory is empty: {}", empty.display()));

        let result = ListDirectoryTool
            .execute(path_arg(&root.join("alpha.txt")), &ctx)
            .await
            .unwrap();
        assert!(result.starts_with("Not a directory: "));
    }
}
