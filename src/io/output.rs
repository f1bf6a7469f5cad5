use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Write a rendered artifact to disk, creating parent directories
pub fn write_artifact(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;
    file.write_all(html.as_bytes())
        .with_context(|| format!("Failed to write artifact: {:?}", path))?;
    Ok(())
}

/// Default output path for a quiz part, e.g. `quiz_part_2.html`
pub fn default_artifact_path(dir: &Path, part_index: u32) -> PathBuf {
    dir.join(format!("quiz_part_{}.html", part_index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_artifact_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("quiz.html");

        write_artifact(&path, "<html></html>").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html></html>");
    }

    #[test]
    fn test_default_artifact_path() {
        assert_eq!(
            default_artifact_path(Path::new("dist"), 2),
            PathBuf::from("dist/quiz_part_2.html")
        );
    }
}
