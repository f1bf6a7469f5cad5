use super::ImagePayload;

/// Source material every model request is grounded on
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDocument {
    pub text: String,
    pub images: Vec<ImagePayload>,
}

impl SourceDocument {
    pub fn new(text: impl Into<String>, images: Vec<ImagePayload>) -> Self {
        Self {
            text: text.into(),
            images,
        }
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}
