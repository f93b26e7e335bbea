use serde::Deserialize;

/// The three fields extracted from one model reply, or the failure that
/// prevented extraction. `error` marks a load/remote failure, `parse_error`
/// a reply that was not valid JSON (the verbatim reply is kept as the
/// description so nothing the model said is lost).
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub title: String,
    pub description: String,
    pub date: String,
    pub error: Option<String>,
    pub parse_error: Option<String>,
}

impl Extraction {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// The keys the model is asked to return. Missing keys default to empty,
/// unknown extras are ignored. "EADScope+Content" is the literal key
/// spelling in the prompt; it maps to EADScopeAndContent in the record.
#[derive(Deserialize)]
struct ModelFields {
    #[serde(default, rename = "EADUnitTitle")]
    title: String,
    #[serde(default, rename = "EADScope+Content")]
    scope_and_content: String,
    #[serde(default, rename = "EADUnitDate")]
    date: String,
}

/// Strip exactly one layer of markdown code fencing. Models routinely wrap
/// JSON in ```json fences; removing a single layer tolerates that without
/// eating legitimate triple-backtick content nested inside.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Parse a raw model reply into an [`Extraction`]. Never fails: a reply
/// that does not decode as a JSON object degrades to empty title/date, the
/// original unmodified text as the description, and the decoder's message
/// in `parse_error`.
pub fn parse_model_response(raw: &str) -> Extraction {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<ModelFields>(cleaned) {
        Ok(fields) => Extraction {
            title: fields.title,
            description: fields.scope_and_content,
            date: fields.date,
            error: None,
            parse_error: None,
        },
        Err(e) => Extraction {
            title: String::new(),
            description: raw.to_string(),
            date: String::new(),
            error: None,
            parse_error: Some(e.to_string()),
        },
    }
}

// ── Tests ──
