use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use manga_scraper::exists;

/// `00.jpg`, `01.jpg` ... `10.jpg`, indexes below 10 are zero padded so that sorting by filename
/// keeps the order of the pages
pub fn page_file_name(index: usize) -> String {
    format!("{index:02}.jpg")
}

pub fn page_path(directory: &Path, index: usize) -> PathBuf {
    directory.join(page_file_name(index))
}

/// Checks both the padded and the unpadded name, older downloads may have used either
pub fn page_exists(directory: &Path, index: usize) -> bool {
    exists!(&page_path(directory, index)) || exists!(&directory.join(format!("{index}.jpg")))
}

pub fn save_page(directory: &Path, index: usize, bytes: &[u8]) -> Result<PathBuf, std::io::Error> {
    let path = page_path(directory, index);

    let mut file = File::create(&path)?;
    file.write_all(bytes)?;

    Ok(path)
}
