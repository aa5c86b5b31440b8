use manga_scraper::chapter_number::ChapterNumber;

use crate::logger::ILogger;

/// A link to a chapter found on the chapter listing page
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRef {
    raw_label: String,
    href: String,
    parsed_number: Option<ChapterNumber>,
}

impl ChapterRef {
    /// The chapter number is taken from the url first since link texts tend to contain noise like
    /// the volume number or the title of the chapter
    pub fn new(raw_label: impl Into<String>, href: impl Into<String>) -> Self {
        let raw_label: String = raw_label.into();
        let href: String = href.into();
        let parsed_number = ChapterNumber::parse(&href).or_else(|| ChapterNumber::parse(&raw_label));

        Self {
            raw_label,
            href,
            parsed_number,
        }
    }

    pub fn raw_label(&self) -> &str {
        &self.raw_label
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn number(&self) -> Option<ChapterNumber> {
        self.parsed_number
    }

    /// `start_chapter` or `end_chapter` as typed by the user matches this chapter
    fn matches_label(&self, label: &str) -> bool {
        let Some(number) = self.parsed_number else {
            return false;
        };

        let label = label.trim();

        match label.parse::<f64>() {
            Ok(value) => number.as_f64() == value,
            Err(_) => number.to_string() == label,
        }
    }
}

/// Resolves which chapters to process given the chapters ordered from oldest to newest and the
/// optional first and last chapters requested, both inclusive.
/// A bound that matches no chapter is reported and replaced by the start or the end of the list
pub fn select_range<'a>(
    chapters: &'a [ChapterRef],
    start_label: Option<&str>,
    end_label: Option<&str>,
    logger: &impl ILogger,
) -> &'a [ChapterRef] {
    let mut lower = 0;
    let mut upper = chapters.len();

    if let Some(start) = start_label {
        match chapters.iter().position(|chapter| chapter.matches_label(start)) {
            Some(index) => lower = index,
            None => logger.warn(format!("Chapter {start} not found. Starting from the beginning.")),
        }
    }

    if let Some(end) = end_label {
        match chapters.iter().position(|chapter| chapter.matches_label(end)) {
            Some(index) => upper = index + 1,
            None => logger.warn(format!("Chapter {end} not found. Downloading up to the last available chapter.")),
        }
    }

    if chapters.is_empty() {
        return chapters;
    }

    if lower >= upper {
        logger.warn(format!(
            "Chapter {} comes after chapter {}, nothing to download",
            start_label.unwrap_or_default(),
            end_label.unwrap_or_default()
        ));
        return &[];
    }

    &chapters[lower..upper]
}
