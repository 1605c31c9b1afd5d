//! Public information endpoints: DuckDuckGo instant answers, Wikipedia
//! summaries, wttr.in weather, GNews headlines and the Free Dictionary API.
//!
//! Base URLs come from [`nexus_config::WebConfig`] so tests can point them at
//! a mock server.

use nexus_types::ToolCategory;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;

use crate::{ToolCtx, ToolError, ToolExecutor, ToolFut, lenient_int, str_field};

const SUMMARY_LIMIT: usize = 500;
const NEWS_ARTICLES: u32 = 5;

pub(crate) fn skills() -> Vec<Box<dyn ToolExecutor>> {
    vec![
        Box::new(SearchTool),
        Box::new(QuickFactTool),
        Box::new(WikipediaTool),
        Box::new(WeatherTool),
        Box::new(NewsTool),
        Box::new(DefineTool),
    ]
}

/// `base` with one extra path segment (percent-encoded).
fn endpoint(base: &str, segment: Option<&str>, context: &'static str) -> Result<Url, ToolError> {
    let mut url = Url::parse(base).map_err(|e| ToolError::failed(context, e))?;
    if let Some(segment) = segment {
        url.path_segments_mut()
            .map_err(|()| ToolError::failed(context, format!("{base} cannot take a path")))?
            .pop_if_empty()
            .push(segment);
    }
    Ok(url)
}

/// GET `url`; `Ok(None)` for a non-success status.
async fn fetch_json<T: DeserializeOwned>(
    ctx: &ToolCtx,
    url: Url,
    context: &'static str,
) -> Result<Option<T>, ToolError> {
    let response = ctx
        .http
        .get(url)
        .send()
        .await
        .map_err(|e| ToolError::failed(context, e))?;
    if !response.status().is_success() {
        tracing::debug!(status = %response.status(), "{context} returned an error status");
        return Ok(None);
    }
    let body = response
        .json::<T>()
        .await
        .map_err(|e| ToolError::failed(context, e))?;
    Ok(Some(body))
}

// ============================================================================
// DuckDuckGo
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct InstantAnswer {
    /// Usually text; calculator and conversion widgets put an object here.
    pub answer: Value,
    #[serde(rename = "Abstract")]
    pub abstract_: String,
    pub abstract_text: String,
    pub definition: String,
    pub related_topics: Vec<Value>,
}

async fn instant_answer(ctx: &ToolCtx, query: &str, context: &'static str) -> Result<InstantAnswer, ToolError> {
    let mut url = endpoint(&ctx.web.duckduckgo_url, None, context)?;
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("format", "json");
    // DuckDuckGo answers 200 even for empty results; any other status is a failure.
    fetch_json(ctx, url, context)
        .await?
        .ok_or_else(|| ToolError::failed(context, "search service unavailable"))
}

#[must_use]
pub fn format_search(query: &str, answer: &InstantAnswer, num_results: usize) -> String {
    if answer.abstract_.is_empty() && answer.related_topics.is_empty() {
        return format!(
            "Search completed for '{query}'. Try asking me to search Wikipedia for more detailed information."
        );
    }
    let mut text = format!("Search results for '{query}':\n\n");
    if !answer.abstract_.is_empty() {
        text.push_str(&answer.abstract_);
        text.push_str("\n\n");
    }
    if !answer.related_topics.is_empty() {
        text.push_str("Related information:\n");
        for (i, topic) in answer.related_topics.iter().take(num_results).enumerate() {
            if let Some(line) = topic.get("Text").and_then(Value::as_str) {
                text.push_str(&format!("{}. {line}\n", i + 1));
            }
        }
    }
    text
}

#[must_use]
pub fn format_quick_fact(query: &str, answer: &InstantAnswer) -> String {
    [
        answer.answer.as_str().unwrap_or_default(),
        answer.abstract_text.as_str(),
        answer.definition.as_str(),
    ]
    .into_iter()
    .find(|field| !field.is_empty())
    .map(str::to_string)
    .unwrap_or_else(|| {
        format!("No quick answer found. Try searching Wikipedia for '{query}' instead.")
    })
}

struct SearchTool;

impl ToolExecutor for SearchTool {
    fn name(&self) -> &'static str {
        "google_search"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Web
    }

    fn description(&self) -> &'static str {
        "Search the web for a topic"
    }

    fn arguments(&self) -> Value {
        json!({ "query": "...", "num_results": 3 })
    }

    fn announcement(&self, args: &Value) -> Option<String> {
        Some(format!("Searching for {}", str_field(args, "query")))
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let query = str_field(&args, "query");
            let num_results = args
                .get("num_results")
                .and_then(lenient_int)
                .unwrap_or(3)
                .max(0) as usize;
            let answer = instant_answer(ctx, query, "searching").await?;
            Ok(format_search(query, &answer, num_results))
        })
    }
}

struct QuickFactTool;

impl ToolExecutor for QuickFactTool {
    fn name(&self) -> &'static str {
        "quick_fact"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Web
    }

    fn description(&self) -> &'static str {
        "Short instant answer to a factual question"
    }

    fn arguments(&self) -> Value {
        json!({ "query": "..." })
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            let query = str_field(&args, "query");
            let answer = instant_answer(ctx, query, "getting fact").await?;
            Ok(format_quick_fact(query, &answer))
        })
    }
}

// ============================================================================
// Wikipedia
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WikiSummary {
    title: Option<String>,
    extract: Option<String>,
}

/// `title\n\nextract`, cut to 500 characters for speech.
#[must_use]
pub fn format_summary(title: &str, extract: &str) -> String {
    let text = format!("{title}\n\n{extract}");
    if text.chars().count() <= SUMMARY_LIMIT {
        return text;
    }
    let cut: String = text.chars().take(SUMMARY_LIMIT).collect();
    format!("{cut}... (summary truncated)")
}

struct WikipediaTool;

impl ToolExecutor for WikipediaTool {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Web
    }

    fn description(&self) -> &'static str {
        "Summary of a Wikipedia article"
    }

    fn arguments(&self) -> Value {
        json!({ "topic": "..." })
    }

    fn announcement(&self, args: &Value) -> Option<String> {
        Some(format!("Looking up {} on Wikipedia", str_field(args, "topic")))
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            const CONTEXT: &str = "querying Wikipedia";
            let topic = str_field(&args, "topic");
            let title = topic.trim().replace(' ', "_");
            let url = endpoint(&ctx.web.wikipedia_url, Some(&title), CONTEXT)?;
            let Some(summary) = fetch_json::<WikiSummary>(ctx, url, CONTEXT).await? else {
                return Ok(format!("Could not find Wikipedia article for '{topic}'"));
            };
            Ok(format_summary(
                summary.title.as_deref().unwrap_or(topic),
                summary.extract.as_deref().unwrap_or("No summary available."),
            ))
        })
    }
}

// ============================================================================
// Weather
// ============================================================================

#[derive(Debug, Deserialize)]
struct WttrReport {
    current_condition: Vec<WttrCondition>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WttrCondition {
    #[serde(rename = "temp_C")]
    temp_c: String,
    #[serde(rename = "temp_F")]
    temp_f: String,
    weather_desc: Vec<WttrText>,
    humidity: String,
    windspeed_kmph: String,
}

#[derive(Debug, Deserialize)]
struct WttrText {
    value: String,
}

struct WeatherTool;

impl ToolExecutor for WeatherTool {
    fn name(&self) -> &'static str {
        "get_weather"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Web
    }

    fn description(&self) -> &'static str {
        "Current weather for a city"
    }

    fn arguments(&self) -> Value {
        json!({ "city": "London" })
    }

    fn announcement(&self, args: &Value) -> Option<String> {
        Some(format!("Getting weather for {}", str_field(args, "city")))
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            const CONTEXT: &str = "getting weather";
            let city = str_field(&args, "city");
            let mut url = endpoint(&ctx.web.weather_url, Some(city.trim()), CONTEXT)?;
            url.query_pairs_mut().append_pair("format", "j1");

            let Some(report) = fetch_json::<WttrReport>(ctx, url, CONTEXT).await? else {
                return Ok(format!("Could not get weather for '{city}'"));
            };
            let current = report
                .current_condition
                .first()
                .ok_or_else(|| ToolError::failed(CONTEXT, "no current conditions"))?;
            let condition = current
                .weather_desc
                .first()
                .map(|d| d.value.as_str())
                .unwrap_or_default();
            Ok(format!(
                "Weather in {city}:\nTemperature: {}°C ({}°F)\nCondition: {condition}\nHumidity: {}%\nWind Speed: {} km/h",
                current.temp_c, current.temp_f, current.humidity, current.windspeed_kmph
            ))
        })
    }
}

// ============================================================================
// News
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Headlines {
    articles: Vec<Article>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Article {
    title: Option<String>,
}

struct NewsTool;

impl ToolExecutor for NewsTool {
    fn name(&self) -> &'static str {
        "get_news"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Web
    }

    fn description(&self) -> &'static str {
        "Latest headlines for a category (general, technology, sports, business, ...)"
    }

    fn arguments(&self) -> Value {
        json!({ "category": "general" })
    }

    fn announcement(&self, args: &Value) -> Option<String> {
        Some(format!("Fetching {} news", news_category(args)))
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            const CONTEXT: &str = "getting news";
            let category = news_category(&args);
            let mut url = endpoint(&ctx.web.news_url, None, CONTEXT)?;
            url.query_pairs_mut()
                .append_pair("category", category)
                .append_pair("lang", "en")
                .append_pair("country", "us")
                .append_pair("max", &NEWS_ARTICLES.to_string())
                .append_pair("apikey", &ctx.web.news_api_key);

            let Some(headlines) = fetch_json::<Headlines>(ctx, url, CONTEXT).await? else {
                return Ok(
                    "News service temporarily unavailable. Please try again later or visit a news website."
                        .to_string(),
                );
            };
            if headlines.articles.is_empty() {
                return Ok("No news articles found.".to_string());
            }
            let mut text = format!("Latest {category} news:\n\n");
            for (i, article) in headlines.articles.iter().enumerate() {
                let title = article.title.as_deref().unwrap_or("No title");
                text.push_str(&format!("{}. {title}\n", i + 1));
            }
            Ok(text)
        })
    }
}

fn news_category(args: &Value) -> &str {
    let category = str_field(args, "category").trim();
    if category.is_empty() { "general" } else { category }
}

// ============================================================================
// Dictionary
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct DictionaryEntry {
    word: Option<String>,
    meanings: Vec<Meaning>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Meaning {
    part_of_speech: String,
    definitions: Vec<Definition>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Definition {
    definition: String,
    example: String,
}

fn format_definition(word: &str, entries: &[DictionaryEntry]) -> Option<String> {
    let entry = entries.first()?;
    let meaning = entry.meanings.first()?;
    let definition = meaning.definitions.first()?;

    let mut text = entry.word.clone().unwrap_or_else(|| word.to_string());
    if !meaning.part_of_speech.is_empty() {
        text.push_str(&format!(" ({})", meaning.part_of_speech));
    }
    text.push_str(&format!("\n\n{}", definition.definition));
    if !definition.example.is_empty() {
        text.push_str(&format!("\n\nExample: {}", definition.example));
    }
    Some(text)
}

struct DefineTool;

impl ToolExecutor for DefineTool {
    fn name(&self) -> &'static str {
        "define_word"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Web
    }

    fn description(&self) -> &'static str {
        "Dictionary definition of a word"
    }

    fn arguments(&self) -> Value {
        json!({ "word": "..." })
    }

    fn announcement(&self, args: &Value) -> Option<String> {
        Some(format!("Looking up definition of {}", str_field(args, "word")))
    }

    fn is_side_effecting(&self) -> bool {
        false
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolCtx) -> ToolFut<'a> {
        Box::pin(async move {
            const CONTEXT: &str = "looking up definition";
            let word = str_field(&args, "word");
            let url = endpoint(&ctx.web.dictionary_url, Some(word.trim()), CONTEXT)?;
            let Some(entries) = fetch_json::<Vec<DictionaryEntry>>(ctx, url, CONTEXT).await?
            else {
                return Ok(format!("Word '{word}' not found in dictionary"));
            };
            Ok(format_definition(word, &entries)
                .unwrap_or_else(|| format!("No definition found for '{word}'")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Os, RecordingPlatform};
    use crate::testing::ctx_with;
    use nexus_config::WebConfig;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn web_ctx(dir: &std::path::Path, server: &MockServer) -> ToolCtx {
        let base = server.uri();
        let (ctx, _) = ctx_with(dir, Arc::new(RecordingPlatform::new(Os::Linux)));
        ctx.with_web(WebConfig {
            timeout_seconds: 5,
            news_api_key: "test-key".to_string(),
            duckduckgo_url: format!("{base}/ddg/"),
            wikipedia_url: format!("{base}/wiki/summary/"),
            weather_url: format!("{base}/wttr/"),
            news_url: format!("{base}/news/top-headlines"),
            dictionary_url: format!("{base}/dict/"),
        })
    }

    #[test]
    fn search_falls_back_when_empty() {
        let empty = InstantAnswer::default();
        assert_eq!(
            format_search("rust", &empty, 3),
            "Search completed for 'rust'. Try asking me to search Wikipedia for more detailed information."
        );
    }

    #[test]
    fn search_numbers_related_topics_by_position() {
        let answer = InstantAnswer {
            abstract_: "A language.".to_string(),
            related_topics: vec![
                json!({ "Text": "First" }),
                json!({ "Name": "group", "Topics": [] }),
                json!({ "Text": "Third" }),
                json!({ "Text": "Fourth" }),
            ],
            ..InstantAnswer::default()
        };
        assert_eq!(
            format_search("rust", &answer, 3),
            "Search results for 'rust':\n\nA language.\n\nRelated information:\n1. First\n3. Third\n"
        );
    }

    #[test]
    fn quick_fact_prefers_answer_then_abstract_then_definition() {
        let answer = InstantAnswer {
            abstract_text: "abstract".to_string(),
            definition: "definition".to_string(),
            ..InstantAnswer::default()
        };
        assert_eq!(format_quick_fact("q", &answer), "abstract");
        let answer = InstantAnswer {
            answer: json!("42"),
            abstract_text: "abstract".to_string(),
            ..InstantAnswer::default()
        };
        assert_eq!(format_quick_fact("q", &answer), "42");
        assert_eq!(
            format_quick_fact("q", &InstantAnswer::default()),
            "No quick answer found. Try searching Wikipedia for 'q' instead."
        );
    }

    #[test]
    fn long_summaries_are_truncated() {
        let extract = "x".repeat(600);
        let text = format_summary("Title", &extract);
        assert!(text.ends_with("... (summary truncated)"));
        assert_eq!(text.chars().count(), 500 + "... (summary truncated)".len());
        assert_eq!(format_summary("T", "short"), "T\n\nshort");
    }

    #[tokio::test]
    async fn quick_fact_skips_widget_answers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ddg/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Answer": { "from": "calculator", "result": "" },
                "AbstractText": "Two plus two is four."
            })))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let ctx = web_ctx(dir.path(), &server).await;

        let result = QuickFactTool
            .execute(json!({ "query": "2 + 2" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result, "Two plus two is four.");
    }

    #[tokio::test]
    async fn search_hits_duckduckgo() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ddg/"))
            .and(query_param("q", "rust lang"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Abstract": "Rust is a language.",
                "RelatedTopics": [{ "Text": "Cargo" }]
            })))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let ctx = web_ctx(dir.path(), &server).await;

        let result = SearchTool
            .execute(json!({ "query": "rust lang" }), &ctx)
            .await
            .unwrap();
        assert_eq!(
            result,
            "Search results for 'rust lang':\n\nRust is a language.\n\nRelated information:\n1. Cargo\n"
        );
    }

    #[tokio::test]
    async fn wikipedia_underscores_spaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/summary/Alan_Turing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "Alan Turing",
                "extract": "English mathematician."
            })))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let ctx = web_ctx(dir.path(), &server).await;

        let result = WikipediaTool
            .execute(json!({ "topic": "Alan Turing" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result, "Alan Turing\n\nEnglish mathematician.");

        let missing = WikipediaTool
            .execute(json!({ "topic": "Nothing Here" }), &ctx)
            .await
            .unwrap();
        assert_eq!(missing, "Could not find Wikipedia article for 'Nothing Here'");
    }

    #[tokio::test]
    async fn weather_formats_current_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wttr/Paris"))
            .and(query_param("format", "j1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current_condition": [{
                    "temp_C": "18",
                    "temp_F": "64",
                    "weatherDesc": [{ "value": "Partly cloudy" }],
                    "humidity": "72",
                    "windspeedKmph": "11"
                }]
            })))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let ctx = web_ctx(dir.path(), &server).await;

        let result = WeatherTool
            .execute(json!({ "city": "Paris" }), &ctx)
            .await
            .unwrap();
        assert_eq!(
            result,
            "Weather in Paris:\nTemperature: 18°C (64°F)\nCondition: Partly cloudy\nHumidity: 72%\nWind Speed: 11 km/h"
        );
    }

    #[tokio::test]
    async fn news_sends_api_key_and_handles_outage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/news/top-headlines"))
            .and(query_param("category", "technology"))
            .and(query_param("apikey", "test-key"))
            .and(query_param("max", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "articles": [{ "title": "Chips" }, {}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/news/top-headlines"))
            .and(query_param("category", "sports"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let ctx = web_ctx(dir.path(), &server).await;

        let result = NewsTool
            .execute(json!({ "category": "technology" }), &ctx)
            .await
            .unwrap();
        assert_eq!(result, "Latest technology news:\n\n1. Chips\n2. No title\n");

        let outage = NewsTool
            .execute(json!({ "category": "sports" }), &ctx)
            .await
            .unwrap();
        assert_eq!(
            outage,
            "News service temporarily unavailable. Please try again later or visit a news website."
        );
    }

    #[tokio::test]
    async fn definitions_include_part_of_speech_and_example() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dict/serendipity"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "word": "serendipity",
                "meanings": [{
                    "partOfSpeech": "noun",
                    "definitions": [{
                        "definition": "Happy accident.",
                        "example": "Pure serendipity."
                    }]
                }]
            }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dict/blorf"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let ctx = web_ctx(dir.path(), &server).await;

        let result = DefineTool
            .execute(json!({ "word": "serendipity" }), &ctx)
            .await
            .unwrap();
        assert_eq!(
            result,
            "serendipity (noun)\n\nHappy accident.\n\nExample: Pure serendipity."
        );

        let missing = DefineTool
            .execute(json!({ "word": "blorf" }), &ctx)
            .await
            .unwrap();
        assert_eq!(missing, "Word 'blorf' not found in dictionary");
    }

    #[tokio::test]
    async fn unreachable_service_is_a_spoken_error() {
        let dir = tempfile::tempdir().unwrap();
        let (ctx, _) = ctx_with(dir.path(), Arc::new(RecordingPlatform::new(Os::Linux)));
        let ctx = ctx.with_web(WebConfig {
            duckduckgo_url: "http://127.0.0.1:9/".to_string(),
            ..WebConfig::default()
        });

        let err = QuickFactTool
            .execute(json!({ "query": "x" }), &ctx)
            .await
            .unwrap_err();
        assert!(err.is_user_facing());
        assert!(err.to_string().starts_with("Error getting fact:"));
    }
}
