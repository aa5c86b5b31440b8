use std::fmt::Display;
use std::path::{Path, PathBuf};

pub mod chapter_number;

/// Shortcut for: Path::new($path).try_exists().is_ok_and(|is_true| is_true)
#[macro_export]
macro_rules! exists {
    ($path:expr) => {
        ::std::path::Path::new($path).try_exists().is_ok_and(|is_true| is_true)
    };
}

/// Remove special characteres that may cause errors when creating directories or files
fn remove_conflicting_characteres<T: AsRef<Path>>(title: T) -> PathBuf {
    let invalid_chars = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

    let title = title.as_ref().to_string_lossy();

    let sanitized_title: String = title.trim().chars().map(|c| if invalid_chars.contains(&c) { '_' } else { c }).collect();

    sanitized_title.into()
}

/// This type ensures that a filename will not contain characteres that may throw errors
/// like ":" or "/", the manga title and chapter labels are used as directory names
#[derive(Debug, Default, PartialEq, Clone)]
pub struct SanitizedFilename(PathBuf);

impl Display for SanitizedFilename {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl SanitizedFilename {
    pub fn new<T: AsRef<Path>>(name: T) -> Self {
        Self(remove_conflicting_characteres(name))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl<T: AsRef<Path>> From<T> for SanitizedFilename {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}
