//! Renders styling fields into the instruction string sent to the provider.
//!
//! Clause order is fixed: room/style, layout directive, dimensions, budget,
//! wishes, output directive. Absent fields drop their clause entirely.

use crate::models::StyleParameters;

const LAYOUT_DIRECTIVE: &str = "Keep the layout and structure of the room; change finishes, furniture and lighting to match the style.";
const OUTPUT_DIRECTIVE: &str = "Output a photorealistic interior render.";

/// Builds the provider prompt. A caller-supplied `prompt` is used verbatim.
pub fn build_prompt(params: &StyleParameters) -> String {
    if let Some(prompt) = params.prompt.as_deref() {
        return prompt.to_string();
    }

    let mut clauses: Vec<String> = Vec::with_capacity(6);

    clauses.push(match (params.room_type.as_deref(), params.style.as_deref()) {
        (Some(room), Some(style)) => format!("Redesign this {} in {} style.", room, style),
        (Some(room), None) => format!("Redesign this {}.", room),
        (None, Some(style)) => format!("Redesign this room in {} style.", style),
        (None, None) => "Redesign this room.".to_string(),
    });

    clauses.push(LAYOUT_DIRECTIVE.to_string());

    if let (Some(length), Some(width), Some(height)) = (
        params.length.as_deref(),
        params.width.as_deref(),
        params.height.as_deref(),
    ) {
        clauses.push(format!(
            "The room measures {} x {} x {} m (length x width x height).",
            length, width, height
        ));
    }

    if let Some(budget) = params.budget.as_deref() {
        clauses.push(format!("Target a {} budget.", budget));
    }

    if let Some(wishes) = params.wishes.as_deref() {
        clauses.push(sentence(&format!("Client wishes: {}", wishes)));
    }

    clauses.push(OUTPUT_DIRECTIVE.to_string());
    clauses.join(" ")
}

fn sentence(text: &str) -> String {
    let text = text.trim_end();
    if text.ends_with(&['.', '!', '?'][..]) {
        text.to_string()
    } else {
        format!("{}.", text)
    }
}
