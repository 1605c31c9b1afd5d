//! System prompt generated from the tool registry.

use nexus_tools::{Os, ToolRegistry};

struct Example {
    user: &'static str,
    reply: &'static str,
    tools: &'static [&'static str],
}

const EXAMPLES: &[Example] = &[
    Example {
        user: "Search for Python files in my documents",
        reply: r#"{ "actions": [{ "tool": "search_files", "query": "python", "location": "~/Documents", "extension": ".py" }] }"#,
        tools: &["search_files"],
    },
    Example {
        user: "What's the weather in New York and remind me to call John in 10 minutes",
        reply: r#"{ "actions": [
  { "tool": "get_weather", "city": "New York" },
  { "tool": "set_reminder", "message": "Call John", "time": "in 10 minutes" }
] }"#,
        tools: &["get_weather", "set_reminder"],
    },
    Example {
        user: "Take a screenshot and create a note with its location",
        reply: r#"{ "actions": [
  { "tool": "take_screenshot" },
  { "tool": "create_note", "title": "Screenshot Location", "content": "Screenshot saved to the screenshots folder" }
] }"#,
        tools: &["take_screenshot", "create_note"],
    },
    Example {
        user: "Tell me about Albert Einstein",
        reply: r#"{ "actions": [{ "tool": "wikipedia", "topic": "Albert Einstein" }] }"#,
        tools: &["wikipedia"],
    },
    Example {
        user: "How are you?",
        reply: r#"{ "actions": [{ "tool": "response", "text": "All systems running. How can I help?" }] }"#,
        tools: &["response"],
    },
];

const RULES: &str = "IMPORTANT:
- Respond with a single valid JSON object of the form {\"actions\": [...]}.
- If multiple actions are needed, put them all in the list, in order.
- For file paths, use full paths or ~ for the home directory.
- For search queries, extract the key terms.
- Be smart about time parsing: \"in 5 minutes\", \"at 3 PM\", etc.
- For shutdown/restart, ALWAYS use a delay unless told \"now\".";

/// Build the system prompt: persona, capabilities, the numbered tool catalog
/// grouped by category, examples that only use registered tools, and rules.
#[must_use]
pub fn system_prompt(name: &str, os: Os, registry: &ToolRegistry) -> String {
    let mut prompt = format!(
        "You are '{name}', a highly advanced AI Personal Assistant.\n\
         You are running on {os}. You are helpful, precise, and authoritative.\n\n\
         CAPABILITIES:\n\
         - You have MEMORY. You recall previous commands.\n\
         - You can execute MULTIPLE actions at once.\n\
         - You can manage files, search the web, set reminders, take notes, and control your system.\n\n\
         AVAILABLE TOOLS:\n"
    );

    let mut number = 0;
    for (category, tools) in registry.by_category() {
        prompt.push_str(&format!("\n=== {} ===\n", category.label()));
        for tool in tools {
            number += 1;
            prompt.push_str(&format!("{number}. {}\n", tool.call_shape()));
            prompt.push_str(&format!("   - {}\n", tool.description));
        }
    }

    let examples: Vec<&Example> = EXAMPLES
        .iter()
        .filter(|example| {
            example
                .tools
                .iter()
                .all(|tool| registry.lookup(tool).is_ok() || registry.is_schema_only(tool))
        })
        .collect();
    if !examples.is_empty() {
        prompt.push_str("\nEXAMPLES:\n");
        for example in examples {
            prompt.push_str(&format!("\nUser: \"{}\"\nAI: {}\n", example.user, example.reply));
        }
    }

    prompt.push('\n');
    prompt.push_str(RULES);
    prompt.push('\n');
    prompt
}
