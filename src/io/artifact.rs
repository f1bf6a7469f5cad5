use std::path::Path;

use anyhow::Context;
use tracing::debug;

use super::escape::{
    escape_html, escape_template_literal, script_json, unescape_html, unescape_template_literal,
    EscapeError,
};
use crate::models::{ItemError, QuizArtifactData};
use crate::session::{FAILURE_MESSAGES, PASS_THRESHOLD, SUCCESS_MESSAGES};

const RUNTIME_JS: &str = include_str!("assets/runtime.js");
const STYLE_CSS: &str = include_str!("assets/style.css");

/// Start of the embedded data literal; the escaped JSON follows directly
pub const DATA_MARKER: &str = "const QUIZ_DATA = JSON.parse(`";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("document has no embedded quiz data")]
    MissingData,
    #[error("embedded quiz data is malformed: {0}")]
    Escape(#[from] EscapeError),
    #[error("embedded quiz data is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("embedded item {index} is invalid: {reason}")]
    InvalidItem { index: usize, reason: ItemError },
    #[error("embedded item {index} refers to missing image {image}")]
    MissingImage { index: usize, image: usize },
}

/// Presentation options for a rendered artifact
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title: String,
    /// Part number for quizzes split across several documents
    pub part_index: u32,
    /// Makes the entry point name unique when several artifacts share a page
    pub run_id: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: "Quiz".to_string(),
            part_index: 1,
            run_id: uuid::Uuid::new_v4().simple().to_string(),
        }
    }
}

impl RenderOptions {
    pub fn display_title(&self) -> String {
        format!("{} (Part {})", self.title, self.part_index)
    }

    fn entry_point(&self) -> String {
        let suffix: String = self
            .run_id
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        format!("quizApp_{}", suffix)
    }
}

/// Render quiz data into one self-contained HTML document.
///
/// The data travels as an escaped template literal parsed at load time;
/// the runtime and stylesheet are inlined so the file opens offline.
pub fn render_artifact(
    data: &QuizArtifactData,
    options: &RenderOptions,
) -> Result<String, ArtifactError> {
    let blob = escape_template_literal(&serde_json::to_string(data)?);
    let messages = script_json(&serde_json::json!({
        "success": SUCCESS_MESSAGES,
        "failure": FAILURE_MESSAGES,
    }))?;
    let title = escape_html(&options.display_title());
    let entry = options.entry_point();

    let mut html = String::with_capacity(blob.len() + RUNTIME_JS.len() + STYLE_CSS.len() + 1024);
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    html.push_str(&format!("<title>{}</title>\n", title));
    html.push_str("<style>\n");
    html.push_str(STYLE_CSS);
    html.push_str("</style>\n</head>\n<body>\n");
    html.push_str("<main id=\"app\"></main>\n");
    html.push_str("<script>\n");
    html.push_str(&format!("function {}() {{\n", entry));
    html.push_str(DATA_MARKER);
    html.push_str(&blob);
    html.push_str("`);\n");
    html.push_str(&format!("const QUIZ_MESSAGES = {};\n", messages));
    html.push_str(RUNTIME_JS);
    html.push_str(&format!(
        "startQuiz(QUIZ_DATA, QUIZ_MESSAGES, {:.1}, document.getElementById(\"app\"));\n",
        PASS_THRESHOLD
    ));
    html.push_str(&format!("}}\n{}();\n", entry));
    html.push_str("</script>\n</body>\n</html>\n");

    debug!(
        "Rendered artifact: {} items, {} images, {} bytes",
        data.items.len(),
        data.images.len(),
        html.len()
    );
    Ok(html)
}

/// Recover the embedded quiz data from a rendered artifact
pub fn parse_artifact(html: &str) -> Result<QuizArtifactData, ArtifactError> {
    let start = html.find(DATA_MARKER).ok_or(ArtifactError::MissingData)? + DATA_MARKER.len();
    let (json, _) = unescape_template_literal(&html[start..])?;
    let data: QuizArtifactData = serde_json::from_str(&json)?;

    for (index, item) in data.items.iter().enumerate() {
        item.validate()
            .map_err(|reason| ArtifactError::InvalidItem { index, reason })?;
        if let Some(image) = item.image_ref.filter(|&i| i >= data.images.len()) {
            return Err(ArtifactError::MissingImage { index, image });
        }
    }
    Ok(data)
}

/// Title of a rendered artifact, if it has one
pub fn extract_title(html: &str) -> Option<String> {
    let start = html.find("<title>")? + "<title>".len();
    let end = start + html[start..].find("</title>")?;
    Some(unescape_html(&html[start..end]))
}

/// Read and parse an artifact file
pub fn read_artifact(path: &Path) -> anyhow::Result<(String, QuizArtifactData)> {
    let html = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read artifact: {:?}", path))?;
    let data = parse_artifact(&html)
        .with_context(|| format!("Failed to parse artifact: {:?}", path))?;
    let title = extract_title(&html).unwrap_or_else(|| "Quiz".to_string());
    Ok((title, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ImagePayload, QuizItem};

    fn tricky_data() -> QuizArtifactData {
        let items = vec![
            QuizItem::new(
                r#"Which path is "C:\temp\new"?"#,
                vec!["`backtick`".into(), "$5 and ${price}".into(), "</script><b>".into()],
                2,
                r"Escapes: \n \\ \` \$ \x3C",
            )
            .unwrap()
            .with_case("Case with 'quotes' and \"doubles\"")
            .with_image(0),
            QuizItem::new("Plain", vec!["a".into(), "b".into()], 0, "")
                .unwrap()
                .flagged(),
        ];
        QuizArtifactData::new(items, vec![ImagePayload::from_bytes("image/png", b"\x89PNG")])
    }

    #[test]
    fn test_round_trip_preserves_data() {
        let data = tricky_data();
        let html = render_artifact(&data, &RenderOptions::default()).unwrap();
        assert_eq!(parse_artifact(&html).unwrap(), data);
    }

    #[test]
    fn test_round_trip_empty_quiz() {
        let data = QuizArtifactData::default();
        let html = render_artifact(&data, &RenderOptions::default()).unwrap();
        assert_eq!(parse_artifact(&html).unwrap(), data);
    }

    #[test]
    fn test_document_is_self_contained() {
        let html = render_artifact(&tricky_data(), &RenderOptions::default()).unwrap();

        assert_eq!(html.matches("</script>").count(), 1);
        assert!(!html.contains("http://"));
        assert!(!html.contains("https://"));
        assert!(html.contains("function startQuiz("));
        assert!(html.contains("<style>"));
    }

    #[test]
    fn test_title_and_entry_point() {
        let options = RenderOptions {
            title: "Cardiology <Basics> & `More`".to_string(),
            part_index: 3,
            run_id: "ab12-cd34".to_string(),
        };
        let html = render_artifact(&tricky_data(), &options).unwrap();

        assert_eq!(
            extract_title(&html).as_deref(),
            Some("Cardiology <Basics> & `More` (Part 3)")
        );
        assert!(html.contains("function quizApp_ab12cd34() {"));
        assert!(html.contains("quizApp_ab12cd34();"));
    }

    #[test]
    fn test_parse_rejects_foreign_documents() {
        assert!(matches!(
            parse_artifact("<html></html>"),
            Err(ArtifactError::MissingData)
        ));
        let truncated = format!("{}{{\"items\":[]", DATA_MARKER);
        assert!(matches!(
            parse_artifact(&truncated),
            Err(ArtifactError::Escape(EscapeError::Unterminated))
        ));
        let not_json = format!("{}not json`", DATA_MARKER);
        assert!(matches!(parse_artifact(&not_json), Err(ArtifactError::Json(_))));
    }

    fn embed(json: &str) -> String {
        format!("{}{}`);", DATA_MARKER, escape_template_literal(json))
    }

    #[test]
    fn test_parse_rejects_invalid_items() {
        let no_options =
            embed(r#"{"items": [{"prompt": "Q", "options": [], "correct_index": 0, "explanation": ""}]}"#);
        assert!(matches!(
            parse_artifact(&no_options),
            Err(ArtifactError::InvalidItem {
                index: 0,
                reason: ItemError::TooFewOptions(0)
            })
        ));

        let bad_index = embed(
            r#"{"items": [
                {"prompt": "Q", "options": ["a", "b"], "correct_index": 1, "explanation": ""},
                {"prompt": "Q", "options": ["a", "b"], "correct_index": 7, "explanation": ""}
            ]}"#,
        );
        assert!(matches!(
            parse_artifact(&bad_index),
            Err(ArtifactError::InvalidItem { index: 1, .. })
        ));

        let dangling_image = embed(
            r#"{"items": [{"prompt": "Q", "options": ["a", "b"], "correct_index": 0, "explanation": "", "image_ref": 3}]}"#,
        );
        assert!(matches!(
            parse_artifact(&dangling_image),
            Err(ArtifactError::MissingImage { index: 0, image: 3 })
        ));
    }

    #[test]
    fn test_read_artifact_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz.html");
        let html = render_artifact(&tricky_data(), &RenderOptions::default()).unwrap();
        std::fs::write(&path, html).unwrap();

        let (title, data) = read_artifact(&path).unwrap();
        assert_eq!(title, "Quiz (Part 1)");
        assert_eq!(data, tricky_data());
    }
}
