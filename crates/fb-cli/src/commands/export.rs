use std::path::Path;

use fb_core::Session;

pub fn run(store_path: &Path, id: &str, format: &str, output: Option<&Path>) -> Result<(), String> {
    let session = super::find_session(store_path, id)?;

    let content = match format {
        "json" => export_json(&session)?,
        "markdown" | "md" => export_markdown(&session),
        _ => {
            return Err(format!(
                "unsupported format: \"{format}\". Use: markdown, json"
            ));
        }
    };

    if let Some(path) = output {
        std::fs::write(path, &content)
            .map_err(|e| format!("cannot write to {}: {e}", path.display()))?;
        println!("  Exported to {}", path.display());
    } else {
        print!("{content}");
    }

    Ok(())
}

fn export_json(session: &Session) -> Result<String, String> {
    serde_json::to_string_pretty(session)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|e| format!("JSON serialization error: {e}"))
}

fn export_markdown(session: &Session) -> String {
    let meta = &session.metadata;
    let mut out = String::new();

    let title = if meta.character.is_empty() {
        format!("Story {}", session.session_id)
    } else {
        format!("The Story of {}", meta.character)
    };
    out.push_str(&format!("# {title}\n\n"));

    if !meta.setting.is_empty() {
        out.push_str(&format!("**Setting:** {}\n\n", meta.setting));
    }
    if !meta.object.is_empty() {
        out.push_str(&format!("**Object:** {}\n\n", meta.object));
    }
    if let Some(age) = meta.age {
        out.push_str(&format!("**Reader age:** {age}\n\n"));
    }

    out.push_str("---\n\n");

    for (index, segment) in session.segments.iter().enumerate() {
        out.push_str(&format!("## Part {}\n\n", index + 1));
        if let Some(choice) = &segment.choice_made {
            out.push_str(&format!("*You chose: {choice}*\n\n"));
        }
        out.push_str(&format!("{}\n\n", segment.story_text.trim()));

        if !segment.comprehension_questions.is_empty() {
            out.push_str("**Questions:**\n\n");
            for (n, question) in segment.comprehension_questions.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", n + 1, question.prompt));
                for (i, option) in question.options.iter().enumerate() {
                    let mark = if question.is_correct(i) { "x" } else { " " };
                    out.push_str(&format!("   - [{mark}] {option}\n"));
                }
            }
            out.push('\n');
        }
    }

    if session.completed {
        out.push_str("**The End.**\n");
    } else {
        out.push_str("*To be continued.*\n");
    }

    out
}
