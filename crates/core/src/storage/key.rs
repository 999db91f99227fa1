//! Storage key resolution.

use std::fmt;

use super::error::StorageError;

/// Location of one stored file: container plus filename.
///
/// Both parts have redundant `/` separators collapsed. The filename is
/// otherwise taken verbatim, so the same filename always resolves to the same
/// key and a second upload overwrites the first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    container: String,
    name: String,
}

impl ObjectKey {
    /// Resolve `filename` inside `container`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidKey` if the filename has no content
    /// besides separators.
    pub fn resolve(container: &str, filename: &str) -> Result<Self, StorageError> {
        let name = collapse_separators(filename);
        if name.is_empty() {
            return Err(StorageError::InvalidKey(format!(
                "filename '{filename}' does not name a file"
            )));
        }

        Ok(Self {
            container: collapse_separators(container),
            name,
        })
    }

    /// Container part (bucket or base directory).
    #[must_use]
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Filename part, relative to the container.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full `{container}/{name}` path.
    #[must_use]
    pub fn location(&self) -> String {
        if self.container.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.container, self.name)
        }
    }

    /// Directory part of `location`, with a trailing `/`, if any.
    #[must_use]
    pub fn parent_directory(&self) -> Option<String> {
        let location = self.location();
        location
            .rfind('/')
            .map(|idx| location[..=idx].to_string())
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location())
    }
}

/// Join non-empty `/`-separated segments.
pub(crate) fn collapse_separators(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("files", "report.pdf", "files/report.pdf")]
    #[case("/uploads/", "report.pdf", "uploads/report.pdf")]
    #[case("//uploads//inbox/", "//report.pdf", "uploads/inbox/report.pdf")]
    #[case("", "report.pdf", "report.pdf")]
    #[case("files", "2024/q1/report.pdf", "files/2024/q1/report.pdf")]
    fn test_resolve_collapses_separators(
        #[case] container: &str,
        #[case] filename: &str,
        #[case] location: &str,
    ) {
        let key = ObjectKey::resolve(container, filename).expect("valid key");
        assert_eq!(key.location(), location);
        assert_eq!(key.to_string(), location);
    }

    #[test]
    fn test_resolve_keeps_filename_verbatim() {
        let key = ObjectKey::resolve("files", "my report (final).pdf").expect("valid key");
        assert_eq!(key.name(), "my report (final).pdf");
        assert_eq!(key.container(), "files");
    }

    #[rstest]
    #[case("")]
    #[case("/")]
    #[case("///")]
    fn test_resolve_rejects_empty_filename(#[case] filename: &str) {
        let err = ObjectKey::resolve("files", filename).unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[test]
    fn test_parent_directory() {
        let key = ObjectKey::resolve("/uploads", "report.pdf").expect("valid key");
        assert_eq!(key.parent_directory().as_deref(), Some("uploads/"));

        let key = ObjectKey::resolve("", "report.pdf").expect("valid key");
        assert_eq!(key.parent_directory(), None);

        let key = ObjectKey::resolve("uploads", "a/b.txt").expect("valid key");
        assert_eq!(key.parent_directory().as_deref(), Some("uploads/a/"));
    }
}
