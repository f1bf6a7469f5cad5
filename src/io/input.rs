use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::models::{ImagePayload, SourceDocument};

/// Read a plain-text source document
pub fn read_source_text(path: &Path) -> Result<String> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        bail!(
            "PDF input is not supported: extract the text to a .txt file first ({:?})",
            path
        );
    }

    let text =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    Ok(text)
}

/// Load one image file as an inline payload
pub fn load_image(path: &Path) -> Result<ImagePayload> {
    let mime = ImagePayload::mime_for_path(path)
        .with_context(|| format!("Unsupported image type (expected png, jpg, gif or webp): {:?}", path))?;
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read image: {:?}", path))?;
    Ok(ImagePayload::from_bytes(mime, &bytes))
}

/// Load images in the given order; item image references index this list
pub fn load_images(paths: &[impl AsRef<Path>]) -> Result<Vec<ImagePayload>> {
    paths.iter().map(|p| load_image(p.as_ref())).collect()
}

/// Assemble a source document from a text file and image files
pub fn load_source(text_path: &Path, image_paths: &[impl AsRef<Path>]) -> Result<SourceDocument> {
    let text = read_source_text(text_path)?;
    let images = load_images(image_paths)?;
    Ok(SourceDocument::new(text, images))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_read_text_and_images() {
        let dir = tempfile::tempdir().unwrap();
        let text_path = dir.path().join("notes.txt");
        std::fs::write(&text_path, "Mitral valve notes").unwrap();
        let image_path = dir.path().join("scan.JPG");
        std::fs::write(&image_path, b"abc").unwrap();

        let source = load_source(&text_path, &[image_path]).unwrap();

        assert_eq!(source.text, "Mitral valve notes");
        assert_eq!(source.images.len(), 1);
        assert_eq!(source.images[0].mime_type, "image/jpeg");
        assert_eq!(source.images[0].data, "YWJj");
    }

    #[test]
    fn test_pdf_is_rejected() {
        let err = read_source_text(Path::new("lecture.PDF")).unwrap_err();
        assert!(err.to_string().contains("extract the text"));
    }

    #[test]
    fn test_unknown_image_type_is_rejected() {
        let err = load_image(Path::new("diagram.bmp")).unwrap_err();
        assert!(err.to_string().contains("Unsupported image type"));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = read_source_text(&PathBuf::from("/no/such/file.txt")).unwrap_err();
        assert!(err.to_string().contains("file.txt"));
    }
}
