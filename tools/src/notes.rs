//! Plain-text notes under `<data_dir>/notes`.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use nexus_types::ToolCategory;
use serde_json::{Value, json};

use crate::{ToolCtx, ToolError, ToolExecutor, ToolFut, str_field};

const NOTE_EXTENSION: &str = "txt";

pub(crate) fn skills() -> Vec<Box<dyn ToolExecutor>> {
    vec![
        Box::new(CreateNoteTool),
        Box::new(ReadNoteTool),
        Box::new(ListNotesTool),
        Box::new(DeleteNoteTool),
    ]
}

/// Keep alphanumerics, space, `-` and `_`; trim the ends.
#[must_use]
pub fn safe_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect::<String>()
        .trim()
        .to_string()
}

#[must_use]
pub fn render_note(title: &str, content: &str, created: NaiveDateTime) -> String {
    format!(
        "Title: {title}\nCreated: {}\n{}\n\n{content}",
        created.format("%Y-%m-%d %H:%M:%S"),
        "=".repeat(50)
    )
}

async fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(paths),
        Err(e) => return Err(e),
    };
    while let Some(entry) = entries.next_entry().await? {
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

/// Exact safe-title file, else the first file whose name contains `title`
/// (case-insensitive).
async fn find_note(dir: &Path, title: &str) -> io::Result<Option<PathBuf>> {
    let exact = dir.join(format!("{}.{NOTE_EXTENSION}", safe_title(title)));
    if tokio::fs::try_exists(&exact).await? {
        return Ok(Some(exact));
    }
    let needle = title.to_lowercase();
    Ok(sorted_entries(dir).await?.into_iter().find(|path| {
        path.file_name()
            .is_some_and(|n| n.to_string_lossy().to_lowercase().contains(&needle))
    }))
}

struct CreateNoteTool;

impl ToolExecutor for CreateNoteTool {
    fn name(&self) -> &'static str {
        "create_note"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Reminders
    }

    fn description(&self) -> &'static str {
        "Save a note"
    }

    fn arguments(&self) -> Value {
        json!({ "title": "...", "content": "..." })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let title = str_field(&args, "title");
            let content = str_field(&args, "content");
            let dir = ctx.paths.notes_dir();
            let fail = |e: io::Error| ToolError::failed("creating note", e);
            tokio::fs::create_dir_all(&dir).await.map_err(fail)?;
            let path = dir.join(format!("{}.{NOTE_EXTENSION}", safe_title(title)));
            let body = render_note(title, content, Local::now().naive_local());
            tokio::fs::write(&path, body).await.map_err(fail)?;
            Ok(format!("Note '{title}' created successfully."))
        })
    }
}

struct ReadNoteTool;

impl ToolExecutor for ReadNoteTool {
    fn name(&self) -> &'static str {
        "read_note"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Reminders
    }

    fn description(&self) -> &'static str {
        "Read a saved note by title"
    }

    fn arguments(&self) -> Value {
        json!({ "title": "..." })
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let title = str_field(&args, "title");
            let fail = |e: io::Error| ToolError::failed("reading note", e);
            let Some(path) = find_note(&ctx.paths.notes_dir(), title).await.map_err(fail)? else {
                return Ok(format!("Note '{title}' not found."));
            };
            tokio::fs::read_to_string(&path).await.map_err(fail)
        })
    }
}

struct ListNotesTool;

impl ToolExecutor for ListNotesTool {
    fn name(&self) -> &'static str {
        "list_notes"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Reminders
    }

    fn description(&self) -> &'static str {
        "List saved notes"
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let fail = |e: io::Error| ToolError::failed("listing notes", e);
            let notes: Vec<PathBuf> = sorted_entries(&ctx.paths.notes_dir())
                .await
                .map_err(fail)?
                .into_iter()
                .filter(|p| p.extension().is_some_and(|e| e == NOTE_EXTENSION))
                .collect();
            if notes.is_empty() {
                return Ok("You have no saved notes.".to_string());
            }

            let mut text = format!("Saved Notes ({}):\n\n", notes.len());
            for (i, path) in notes.iter().enumerate() {
                let title = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let modified = tokio::fs::metadata(path)
                    .await
                    .and_then(|m| m.modified())
                    .map_err(fail)?;
                text.push_str(&format!(
                    "{}. {title} (modified: {})\n",
                    i + 1,
                    DateTime::<Local>::from(modified).format("%Y-%m-%d %H:%M")
                ));
            }
            Ok(text)
        })
    }
}

struct DeleteNoteTool;

impl ToolExecutor for DeleteNoteTool {
    fn name(&self) -> &'static str {
        "delete_note"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Reminders
    }

    fn description(&self) -> &'static str {
        "Delete a saved note by title"
    }

    fn arguments(&self) -> Value {
        json!({ "title": "..." })
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let title = str_field(&args, "title");
            let fail = |e: io::Error| ToolError::failed("deleting note", e);
            let Some(path) = find_note(&ctx.paths.notes_dir(), title).await.map_err(fail)? else {
                return Ok(format!("Note '{title}' not found."));
            };
            tokio::fs::remove_file(&path).await.map_err(fail)?;
            tracing::info!(path = %path.display(), "Deleted note");
            Ok(format!("Note '{title}' deleted."))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Os, RecordingPlatform};
    use crate::testing::ctx_with;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn ctx(dir: &Path) -> ToolCtx {
        ctx_with(dir, Arc::new(RecordingPlatform::new(Os::Linux))).0
    }

    #[test]
    fn titles_are_sanitized() {
        assert_eq!(safe_title("  Shopping: list!  "), "Shopping list");
        assert_eq!(safe_title("a/b\\c"), "abc");
        assert_eq!(safe_title("to-do_2"), "to-do_2");
    }

    #[test]
    fn note_layout() {
        let created = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        assert_eq!(
            render_note("Ideas", "Build a robot", created),
            format!(
                "Title: Ideas\nCreated: 2024-01-02 03:04:05\n{}\n\nBuild a robot",
                "=".repeat(50)
            )
        );
    }

    #[tokio::test]
    async fn create_then_read_exact_and_partial() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path());

        let result = CreateNoteTool
            .execute(json!({ "title": "Grocery List", "content": "milk" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result, "Note 'Grocery List' created successfully.");
        assert!(ctx.paths.notes_dir().join("Grocery List.txt").exists());

        let exact = ReadNoteTool
            .execute(json!({ "title": "Grocery List" }), &ctx)
            .await
            .unwrap();
        assert!(exact.starts_with("Title: Grocery List\n"));
        assert!(exact.ends_with("\n\nmilk"));

        let partial = ReadNoteTool
            .execute(json!({ "title": "grocery" }), &ctx)
            .await
            .unwrap();
        assert_eq!(partial, exact);

        let missing = ReadNoteTool
            .execute(json!({ "title": "recipes" }), &ctx)
            .await
            .unwrap();
        assert_eq!(missing, "Note 'recipes' not found.");
    }

    #[tokio::test]
    async fn partial_match_picks_first_sorted_file() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path());
        let notes = ctx.paths.notes_dir();
        std::fs::create_dir_all(&notes).unwrap();
        std::fs::write(notes.join("work b.txt"), "B").unwrap();
        std::fs::write(notes.join("work a.txt"), "A").unwrap();

        let result = ReadNoteTool
            .execute(json!({ "title": "work" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result, "A");
    }

    #[tokio::test]
    async fn list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx(dir.path());

        let empty = ListNotesTool.execute(json!({}), &ctx).await.unwrap();
        assert_eq!(empty, "You have no saved notes.");

        for title in ["beta", "alpha"] {
            CreateNoteTool
                .execute(json!({ "title": title, "content": "" }), &ctx)
                .await
                .unwrap();
        }
        let listed = ListNotesTool.execute(json!({}), &ctx).await.unwrap();
        let lines: Vec<&str> = listed.lines().collect();
        assert_eq!(lines[0], "Saved Notes (2):");
        assert!(lines[2].starts_with("1. alpha (modified: "));
        assert!(lines[3].starts_with("2. beta (modified: "));

        let result = DeleteNoteTool
            .execute(json!({ "title": "ALPHA" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result, "Note 'ALPHA' deleted.");
        assert!(!ctx.paths.notes_dir().join("alpha.txt").exists());
    }
}
