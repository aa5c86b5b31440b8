use std::collections::HashSet;
use std::path::Path;

use reqwest::Url;

use super::create_dir_if_not_exists;
use super::fetch::Fetch;
use super::html_parser::{HtmlElement, HtmlParser, QueriedElement};
use crate::logger::ILogger;

pub mod pdf_merger;
pub mod raw_images;

/// Checked in order when the `src` of an image is not an absolute url, sites that lazy load
/// images put a placeholder in `src`
const LAZY_SOURCE_ATTRIBUTES: [&str; 2] = ["data-lazy-src", "data-src"];

/// Selectors locating the images of a chapter page, the fallbacks are tried in order only when
/// the primary selector matches nothing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageSelectors {
    pub primary: String,
    pub fallbacks: Vec<String>,
}

impl PageSelectors {
    pub fn new(primary: impl Into<String>, fallbacks: Vec<String>) -> Self {
        Self {
            primary: primary.into(),
            fallbacks,
        }
    }
}

/// An image of a chapter, `local_index` is its position on the page and decides its filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub source_url: String,
    pub local_index: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    pub found: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

fn is_absolute_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn non_empty_attr<'a>(element: &'a QueriedElement, name: &str) -> Option<&'a str> {
    element.attr(name).map(str::trim).filter(|value| !value.is_empty())
}

fn image_source(element: &QueriedElement) -> Option<&str> {
    let src = non_empty_attr(element, "src");

    if src.is_some_and(is_absolute_url) {
        return src;
    }

    LAZY_SOURCE_ATTRIBUTES.iter().find_map(|name| non_empty_attr(element, name)).or(src)
}

fn query_or_empty(parser: &impl HtmlParser, document: &HtmlElement, selector: &str, logger: &impl ILogger) -> Vec<QueriedElement> {
    parser.query(document, selector).unwrap_or_else(|e| {
        logger.error(Box::new(e));
        vec![]
    })
}

/// Finds the images of a chapter page in the order they appear, without duplicates, relative urls
/// are resolved against `page_url`
pub fn extract_page_images(
    parser: &impl HtmlParser,
    document: &HtmlElement,
    page_url: &str,
    selectors: &PageSelectors,
    logger: &impl ILogger,
) -> Vec<PageImage> {
    let mut elements = query_or_empty(parser, document, &selectors.primary, logger);

    if elements.is_empty() {
        for fallback in &selectors.fallbacks {
            logger.inform(format!("Trying alternative selector {fallback} from {:?}", selectors.fallbacks));
            elements = query_or_empty(parser, document, fallback, logger);
            if !elements.is_empty() {
                break;
            }
        }
    }

    let base_url = Url::parse(page_url).ok();
    let mut seen = HashSet::new();

    elements
        .iter()
        .filter_map(image_source)
        .map(|source| match &base_url {
            Some(base) => base.join(source).map(String::from).unwrap_or_else(|_| source.to_string()),
            None => source.to_string(),
        })
        .filter(|url| seen.insert(url.clone()))
        .enumerate()
        .map(|(local_index, source_url)| PageImage { source_url, local_index })
        .collect()
}

/// Downloads the images of one chapter into a directory, pages already on disk are not requested
/// again so an interrupted run can be resumed. Failures are logged and never returned, one broken
/// chapter must not stop the rest
#[derive(Debug, Clone)]
pub struct ChapterDownloader<F: Fetch, P: HtmlParser, L: ILogger> {
    fetcher: F,
    parser: P,
    logger: L,
}

impl<F: Fetch, P: HtmlParser, L: ILogger> ChapterDownloader<F, P, L> {
    pub fn new(fetcher: F, parser: P, logger: L) -> Self {
        Self { fetcher, parser, logger }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    pub async fn download(&self, url: &str, chapter_id: &str, directory: &Path, selectors: &PageSelectors) -> DownloadSummary {
        let mut summary = DownloadSummary::default();

        let Some(page_content) = self.fetcher.fetch_text(url).await else {
            return summary;
        };

        self.logger.inform(format!("Downloading Chapter {chapter_id} from {url}..."));

        let images = extract_page_images(&self.parser, &HtmlElement::new(page_content), url, selectors, &self.logger);

        if let Err(e) = create_dir_if_not_exists(directory) {
            self.logger
                .error(format!("Could not create directory {} for Chapter {chapter_id}: {e}", directory.display()).into());
            return summary;
        }

        if images.is_empty() {
            self.logger.warn(format!("No pages found for Chapter {chapter_id}"));
            return summary;
        }

        summary.found = images.len();
        self.logger.inform(format!("Found {} pages for Chapter {chapter_id}", images.len()));

        for image in images {
            if raw_images::page_exists(directory, image.local_index) {
                self.logger.inform(format!(
                    "Image {} already found. Skipping...",
                    raw_images::page_path(directory, image.local_index).display()
                ));
                summary.skipped += 1;
                continue;
            }

            let Some(bytes) = self.fetcher.fetch_bytes(&image.source_url).await else {
                self.logger.error(
                    format!("Error while downloading image {} / {} - Chapter {chapter_id}", image.local_index + 1, summary.found).into(),
                );
                summary.failed += 1;
                continue;
            };

            match raw_images::save_page(directory, image.local_index, &bytes) {
                Ok(_) => summary.downloaded += 1,
                Err(e) => {
                    self.logger.error(
                        format!("Error while saving image {} / {} - Chapter {chapter_id}: {e}", image.local_index + 1, summary.found)
                            .into(),
                    );
                    summary.failed += 1;
                },
            }
        }

        summary
    }
}
