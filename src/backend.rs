use std::path::{Path, PathBuf};

use manga_scraper::{SanitizedFilename, exists};
use strum_macros::{Display, EnumIter};

pub mod chapter_range;
pub mod fetch;
pub mod html_parser;
pub mod manga_downloader;
pub mod scrape;
pub mod volume;

/// Directories produced and read by the tool:
/// `<downloads>/<title>/chapter_<number>`, `<root>/volumes`, `<root>/covers`
#[derive(Display, EnumIter, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppDirectories {
    #[strum(to_string = "manga_downloads")]
    MangaDownloads,
    #[strum(to_string = "volumes")]
    Volumes,
    #[strum(to_string = "covers")]
    Covers,
}

impl AppDirectories {
    pub fn get_full_path(self, base_directory: &Path) -> PathBuf {
        base_directory.join(self.to_string())
    }

    /// Directory holding every chapter of one manga
    pub fn manga_directory(download_directory: &Path, title: &str) -> PathBuf {
        download_directory.join(SanitizedFilename::new(title).as_path())
    }
}

pub fn create_dir_if_not_exists(directory: &Path) -> Result<(), std::io::Error> {
    if !exists!(directory) {
        std::fs::create_dir_all(directory)?;
    }
    Ok(())
}
