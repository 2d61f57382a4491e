//! Prompt construction and model-output handling.

use pipeline::{DraftRequest, GeneratedText};

use crate::error::LlmError;

/// Builds the instruction prompt for one article.
pub fn build_prompt(request: &DraftRequest) -> String {
    let intent = request
        .intent
        .as_deref()
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .unwrap_or("not specified");

    let mut lines = vec![
        "You are an SEO writer. Write one article under these conditions.".to_string(),
        format!("- Keyword: {}", request.keyword.trim()),
        format!("- Search intent: {intent}"),
    ];
    for rec in &request.recommendations {
        lines.push(format!("- Recommend {} with CTA URL {}", rec.name, rec.url));
    }
    lines.extend([
        format!("- Minimum length: {} characters", request.min_chars),
        "- No definitive medical or investment advice".to_string(),
        "- No exaggerated claims".to_string(),
        format!(
            "- Open the article with this disclosure: {}",
            request.disclosure_text
        ),
        "- Include every CTA as an HTML link with rel=\"sponsored nofollow\"".to_string(),
        String::new(),
        "Output format:".to_string(),
        "Line 1: title".to_string(),
        "Line 2 onwards: body".to_string(),
    ]);
    lines.join("\n")
}

/// Splits model output into title and body: the first non-empty line is the
/// title (leading `#` removed), the rest is the body. The disclosure is
/// prepended when the model left it out.
pub fn split_output(raw: &str, disclosure_text: &str) -> Result<GeneratedText, LlmError> {
    let mut lines = raw.lines();
    let title = lines
        .by_ref()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| l.trim_start_matches('#').trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(LlmError::EmptyOutput)?;

    let rest = lines.collect::<Vec<_>>().join("\n");
    let rest = rest.trim();
    if rest.is_empty() {
        return Err(LlmError::EmptyOutput);
    }

    let body = if disclosure_text.is_empty() || rest.contains(disclosure_text) {
        rest.to_string()
    } else {
        format!("{disclosure_text}\n\n{rest}")
    };

    Ok(GeneratedText {
        title,
        body,
        used_model: true,
    })
}
