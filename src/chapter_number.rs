use std::cmp::Ordering;
use std::fmt::Display;

use once_cell::sync::Lazy;
use regex::Regex;

/// A marker or separator followed by the digits of a chapter, optionally with a sub-chapter part
/// separated by `.` or `-`, for example: `chapter 147.2`, `-139-5`, `_3`, `/129`
static CHAPTER_NUMBER_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:chapter|ch|issue|/|\s|-|_)\s*(\d+(?:[.\-]\d+)?)").unwrap());

/// Words that, when written right before a number, identify it as the chapter index
const MARKER_WORDS: [&str; 3] = ["chapter", "ch", "issue"];

/// The index of a chapter, either a whole chapter like `30` or a sub-chapter like `139.5`.
/// Equality and ordering are numeric, so `Whole(30)` equals `Fractional(30.0)`
#[derive(Debug, Clone, Copy)]
pub enum ChapterNumber {
    Whole(u64),
    Fractional(f64),
}

impl ChapterNumber {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Whole(number) => number as f64,
            Self::Fractional(number) => number,
        }
    }

    /// Extracts the chapter index from free text such as an url, the text of a link or the name
    /// of a directory, returns `None` if the text does not contain any number preceded by a marker
    /// or separator
    pub fn parse(text: &str) -> Option<Self> {
        let candidates = find_candidates(text);

        let marked = candidates.iter().rev().find(|candidate| candidate.is_marked(text));

        let selected = marked.or(candidates.last())?;

        Self::from_digits(selected.digits)
    }

    fn from_digits(digits: &str) -> Option<Self> {
        if digits.contains(['.', '-']) {
            return digits.replace('-', ".").parse().ok().map(Self::Fractional);
        }

        match digits.parse() {
            Ok(number) => Some(Self::Whole(number)),
            Err(_) => digits.parse().ok().map(Self::Fractional),
        }
    }
}

impl Display for ChapterNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Whole(number) => write!(f, "{number}"),
            Self::Fractional(number) if number.fract() == 0.0 => write!(f, "{number:.1}"),
            Self::Fractional(number) => write!(f, "{number}"),
        }
    }
}

impl PartialEq for ChapterNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ChapterNumber {}

impl PartialOrd for ChapterNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ChapterNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_f64().total_cmp(&other.as_f64())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate<'a> {
    digits: &'a str,
    /// byte offset of `digits` inside the parsed text
    start: usize,
}

impl Candidate<'_> {
    /// A candidate is marked when the word right before it, ignoring separators, is one of
    /// [`MARKER_WORDS`]: `chapter-30` and `Ch 12` are marked, `vol-4` and `read/1` are not
    fn is_marked(&self, text: &str) -> bool {
        let before = text[..self.start].trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '/' | '-' | '_'));

        let word = before.rsplit(|c: char| !c.is_alphabetic()).next().unwrap_or_default();

        MARKER_WORDS.iter().any(|marker| word.eq_ignore_ascii_case(marker))
    }
}

fn find_candidates(text: &str) -> Vec<Candidate<'_>> {
    CHAPTER_NUMBER_REGEX
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|digits| Candidate {
            digits: digits.as_str(),
            start: digits.start(),
        })
        .collect()
}
