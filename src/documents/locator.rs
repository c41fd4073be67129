//! Template path resolution.

use std::path::{Component, Path, PathBuf};

use log::debug;

use super::GenerateError;

/// Resolves `(category, name, extension)` to `<root>/<category>/<name>.<extension>`.
///
/// Existence is checked on every call so templates edited on disk are picked
/// up without a restart.
#[derive(Debug, Clone)]
pub struct TemplateLocator {
    root: PathBuf,
}

impl TemplateLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn locate(
        &self,
        category: &str,
        name: &str,
        extension: &str,
    ) -> Result<PathBuf, GenerateError> {
        let path = self
            .root
            .join(category)
            .join(format!("{name}.{extension}"));

        if !is_plain_segment(category) || !is_plain_segment(name) {
            return Err(GenerateError::template_not_found(path));
        }

        if !path.is_file() {
            debug!("template lookup missed {}", path.display());
            return Err(GenerateError::template_not_found(path));
        }

        Ok(path)
    }
}

/// A single normal path component: no separators, no `..`, not empty.
fn is_plain_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !segment.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_locate_existing_template() {
        let root = tempdir().unwrap();
        fs::create_dir(root.path().join("certificates")).unwrap();
        fs::write(root.path().join("certificates/enrollment.html"), "<p></p>").unwrap();

        let locator = TemplateLocator::new(root.path());
        let path = locator.locate("certificates", "enrollment", "html").unwrap();
        assert_eq!(path, root.path().join("certificates").join("enrollment.html"));
    }

    #[test]
    fn test_missing_template_reports_resolved_path() {
        let root = tempdir().unwrap();
        let locator = TemplateLocator::new(root.path());

        match locator.locate("certificates", "enrollment", "odt") {
            Err(GenerateError::TemplateNotFound { path }) => {
                assert!(path.ends_with("certificates/enrollment.odt"));
            }
            other => panic!("expected TemplateNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_directory_is_not_a_template() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("certificates/enrollment.docx")).unwrap();

        let locator = TemplateLocator::new(root.path());
        assert!(matches!(
            locator.locate("certificates", "enrollment", "docx"),
            Err(GenerateError::TemplateNotFound { .. })
        ));
    }

    #[test]
    fn test_segments_cannot_escape_root() {
        let root = tempdir().unwrap();
        let inner = root.path().join("templates");
        fs::create_dir_all(inner.join("certificates")).unwrap();
        fs::write(root.path().join("secret.html"), "x").unwrap();

        let locator = TemplateLocator::new(&inner);
        assert!(locator.locate("..", "secret", "html").is_err());
        assert!(locator.locate("certificates", "../../secret", "html").is_err());
        assert!(locator.locate("", "secret", "html").is_err());
    }
}
