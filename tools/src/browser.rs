//! Default-browser skills.

use nexus_types::ToolCategory;
use serde_json::{Value, json};
use url::Url;

use crate::platform::open_target;
use crate::{ResultSpeech, ToolCtx, ToolError, ToolExecutor, ToolFut, str_field};

const YOUTUBE_HOME: &str = "https://www.youtube.com";
const YOUTUBE_SEARCH: &str = "https://www.youtube.com/results";

pub(crate) fn skills() -> Vec<Box<dyn ToolExecutor>> {
    vec![Box::new(OpenUrlTool), Box::new(YoutubeTool)]
}

/// Prefix `https://` unless the text already starts with an http scheme.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with("http") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    }
}

#[must_use]
pub fn youtube_url(query: Option<&str>) -> String {
    match query.map(str::trim).filter(|q| !q.is_empty()) {
        Some(query) => match Url::parse(YOUTUBE_SEARCH) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("search_query", query);
                url.to_string()
            }
            Err(_) => YOUTUBE_HOME.to_string(),
        },
        None => YOUTUBE_HOME.to_string(),
    }
}

fn open_in_browser(ctx: &ToolCtx, url: &str) -> Result<(), ToolError> {
    let command = open_target(ctx.platform.os(), url);
    ctx.platform
        .spawn(&command)
        .map_err(|e| ToolError::failed("opening browser", e))?;
    tracing::info!(url, "Opened browser");
    Ok(())
}

struct OpenUrlTool;

impl ToolExecutor for OpenUrlTool {
    fn name(&self) -> &'static str {
        "open_url"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Applications
    }

    fn description(&self) -> &'static str {
        "Open a website in the default browser"
    }

    fn arguments(&self) -> Value {
        json!({ "url": "https://..." })
    }

    fn announcement(&self, _args: &Value) -> Option<String> {
        Some("Opening browser".to_string())
    }

    fn result_speech(&self) -> ResultSpeech {
        ResultSpeech::Silent
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let requested = str_field(&args, "url");
            open_in_browser(ctx, &normalize_url(requested))?;
            Ok(format!("Opened {requested}"))
        })
    }
}

struct YoutubeTool;

impl ToolExecutor for YoutubeTool {
    fn name(&self) -> &'static str {
        "open_youtube"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Applications
    }

    fn description(&self) -> &'static str {
        "Open YouTube, optionally searching for a video"
    }

    fn arguments(&self) -> Value {
        json!({ "query": "optional search" })
    }

    fn announcement(&self, _args: &Value) -> Option<String> {
        Some("Opening YouTube".to_string())
    }

    fn result_speech(&self) -> ResultSpeech {
        ResultSpeech::Silent
    }

    fn is_side_effecting(&self) -> bool {
        true
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let query = args.get("query").and_then(Value::as_str);
            open_in_browser(ctx, &youtube_url(query))?;
            Ok(match query.map(str::trim).filter(|q| !q.is_empty()) {
                Some(query) => format!("Opened YouTube search for {query}"),
                None => "Opened YouTube".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Os, RecordingPlatform};
    use crate::testing::ctx_with;
    use std::sync::Arc;

    #[test]
    fn urls_get_a_scheme() {
        assert_eq!(normalize_url("github.com"), "https://github.com");
        assert_eq!(normalize_url("http://localhost:8080"), "http://localhost:8080");
    }

    #[test]
    fn youtube_search_is_encoded() {
        assert_eq!(
            youtube_url(Some("lofi hip hop")),
            "https://www.youtube.com/results?search_query=lofi+hip+hop"
        );
        assert_eq!(youtube_url(None), "https://www.youtube.com");
        assert_eq!(youtube_url(Some("  ")), "https://www.youtube.com");
    }

    #[tokio::test]
    async fn open_url_spawns_default_handler() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(RecordingPlatform::new(Os::Linux));
        let (ctx, _) = ctx_with(dir.path(), platform.clone());

        let result = OpenUrlTool
            .execute(json!({ "url": "rust-lang.org" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result, "Opened rust-lang.org");
        assert_eq!(platform.rendered(), vec!["xdg-open https://rust-lang.org"]);
    }

    #[tokio::test]
    async fn missing_browser_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Arc::new(RecordingPlatform::new(Os::MacOs));
        platform.fail("open");
        let (ctx, _) = ctx_with(dir.path(), platform);

        let err = YoutubeTool.execute(json!({}), &ctx).await.unwrap_err();
        assert!(err.is_user_facing());
        assert!(err.to_string().starts_with("Error opening browser:"));
    }
}
