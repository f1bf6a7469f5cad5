use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::QuizItem;

/// An inline image, kept as base64 so it can travel to the model and into
/// the artifact unchanged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub mime_type: String,
    /// Base64 (standard alphabet) encoded bytes
    pub data: String,
}

impl ImagePayload {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Guess the mime type from a file extension
    pub fn mime_for_path(path: &Path) -> Option<&'static str> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "png" => Some("image/png"),
            "jpg" | "jpeg" => Some("image/jpeg"),
            "gif" => Some("image/gif"),
            "webp" => Some("image/webp"),
            _ => None,
        }
    }
}

/// Everything the artifact needs at runtime: final items plus the images
/// they reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizArtifactData {
    pub items: Vec<QuizItem>,
    #[serde(default)]
    pub images: Vec<ImagePayload>,
}

impl QuizArtifactData {
    pub fn new(items: Vec<QuizItem>, images: Vec<ImagePayload>) -> Self {
        Self { items, images }
    }

    /// Indices of items that take part in scored quiz-taking
    pub fn eligible_indices(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| !item.flawed)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn flawed_count(&self) -> usize {
        self.items.iter().filter(|i| i.flawed).count()
    }

    /// Number of distinct case narratives
    pub fn case_count(&self) -> usize {
        let mut cases: Vec<&str> = self
            .items
            .iter()
            .filter_map(|i| i.case_text.as_deref())
            .collect();
        cases.sort_unstable();
        cases.dedup();
        cases.len()
    }

    pub fn image_for(&self, item: &QuizItem) -> Option<&ImagePayload> {
        item.image_ref.and_then(|i| self.images.get(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(prompt: &str) -> QuizItem {
        QuizItem::new(prompt, vec!["a".into(), "b".into()], 0, "").unwrap()
    }

    #[test]
    fn test_image_payload_encodes_base64() {
        let image = ImagePayload::from_bytes("image/png", b"abc");
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "YWJj");
    }

    #[test]
    fn test_mime_for_path() {
        assert_eq!(ImagePayload::mime_for_path(Path::new("x.JPG")), Some("image/jpeg"));
        assert_eq!(ImagePayload::mime_for_path(Path::new("x.png")), Some("image/png"));
        assert_eq!(ImagePayload::mime_for_path(Path::new("x.bmp")), None);
        assert_eq!(ImagePayload::mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn test_eligible_and_case_counts() {
        let data = QuizArtifactData::new(
            vec![
                item("1"),
                item("2").with_case("case A"),
                item("3").with_case("case A").flagged(),
                item("4").with_case("case B"),
            ],
            vec![],
        );
        assert_eq!(data.eligible_indices(), vec![0, 1, 3]);
        assert_eq!(data.flawed_count(), 1);
        assert_eq!(data.case_count(), 2);
    }
}
