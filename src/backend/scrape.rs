use std::error::Error;
use std::fmt::Display;
use std::path::PathBuf;

use manga_scraper::SanitizedFilename;
use reqwest::Url;
use tokio_util::sync::CancellationToken;

use super::AppDirectories;
use super::chapter_range::{ChapterRef, select_range};
use super::fetch::Fetch;
use super::html_parser::{HtmlElement, HtmlParser};
use super::manga_downloader::pdf_merger::ChapterPdfMerger;
use super::manga_downloader::{ChapterDownloader, PageSelectors};
use crate::config::ScrapeSection;
use crate::global::DEFAULT_MANGA_TITLE;
use crate::logger::ILogger;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingParameter(&'static str);

impl Display for MissingParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "missing `{}`, set it in the config file or pass it as a flag", self.0)
    }
}

impl Error for MissingParameter {}

/// Everything a scrape needs, collected from the config file and the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeParameters {
    pub title: String,
    pub main_url: String,
    pub chapter_link_selector: String,
    pub page_selectors: PageSelectors,
    pub start_chapter: Option<String>,
    pub end_chapter: Option<String>,
    pub merge_into_pdf: bool,
    pub download_directory: PathBuf,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

impl TryFrom<&ScrapeSection> for ScrapeParameters {
    type Error = MissingParameter;

    fn try_from(section: &ScrapeSection) -> Result<Self, Self::Error> {
        Ok(Self {
            title: non_empty(section.title.as_ref()).unwrap_or_else(|| DEFAULT_MANGA_TITLE.to_string()),
            main_url: non_empty(section.main_url.as_ref()).ok_or(MissingParameter("main_url"))?,
            chapter_link_selector: non_empty(section.chapter_link_selector.as_ref()).ok_or(MissingParameter("chapter_link_selector"))?,
            page_selectors: PageSelectors::new(
                non_empty(section.page_selector.as_ref()).ok_or(MissingParameter("page_selector"))?,
                section.fallback_page_selectors.iter().filter_map(|selector| non_empty(Some(selector))).collect(),
            ),
            start_chapter: non_empty(section.start_chapter.as_ref()),
            end_chapter: non_empty(section.end_chapter.as_ref()),
            merge_into_pdf: section.merge_into_pdf,
            download_directory: section.download_directory.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeOutcome {
    /// The chapter list could not be fetched, nothing was done
    ListingUnavailable,
    Completed { chapters: usize },
    Cancelled { completed: usize },
}

/// `chapter_<number>`, or `chapter_<label>` for chapters without a number
fn chapter_directory_name(chapter: &ChapterRef) -> String {
    match chapter.number() {
        Some(number) => format!("chapter_{number}"),
        None => format!("chapter_{}", SanitizedFilename::new(chapter.raw_label())),
    }
}

fn chapter_label(chapter: &ChapterRef) -> String {
    chapter.number().map(|number| number.to_string()).unwrap_or_else(|| chapter.raw_label().to_string())
}

/// Downloads the chapters of one manga one after another: fetches the chapter list, picks the
/// requested range and downloads each chapter, merging it into a pdf when asked to
#[derive(Debug)]
pub struct ScrapeRunner<F: Fetch, P: HtmlParser, L: ILogger> {
    downloader: ChapterDownloader<F, P, L>,
    logger: L,
}

impl<F: Fetch, P: HtmlParser, L: ILogger + Clone> ScrapeRunner<F, P, L> {
    pub fn new(fetcher: F, parser: P, logger: L) -> Self {
        Self {
            downloader: ChapterDownloader::new(fetcher, parser, logger.clone()),
            logger,
        }
    }

    /// Chapters found on the listing page from oldest to newest, sites list the newest first
    fn chapter_list(&self, listing: String, parameters: &ScrapeParameters) -> Vec<ChapterRef> {
        let elements = match self.downloader.parser().query(&HtmlElement::new(listing), &parameters.chapter_link_selector) {
            Ok(elements) => elements,
            Err(e) => {
                self.logger.error(Box::new(e));
                return vec![];
            },
        };

        let base_url = Url::parse(&parameters.main_url).ok();

        let mut chapters: Vec<ChapterRef> = elements
            .iter()
            .filter_map(|element| {
                let Some(href) = element.attr("href").map(str::trim).filter(|href| !href.is_empty()) else {
                    self.logger.warn(format!("Skipping chapter link without href: {}", element.text()));
                    return None;
                };

                let href = match &base_url {
                    Some(base) => base.join(href).map(String::from).unwrap_or_else(|_| href.to_string()),
                    None => href.to_string(),
                };

                Some(ChapterRef::new(element.text(), href))
            })
            .collect();

        chapters.reverse();
        chapters
    }

    pub async fn run(&self, parameters: &ScrapeParameters, cancellation: CancellationToken) -> ScrapeOutcome {
        self.logger.inform(format!("Manga title: {}", parameters.title));
        self.logger.inform(format!("Main url: {}", parameters.main_url));
        self.logger.inform(format!("Chapter link selector: {}", parameters.chapter_link_selector));
        self.logger.inform(format!("Page selector: {}", parameters.page_selectors.primary));
        self.logger.inform(format!("Fallback page selectors: {:?}", parameters.page_selectors.fallbacks));
        self.logger.inform(format!(
            "Start chapter: {}, end chapter: {}",
            parameters.start_chapter.as_deref().unwrap_or("first"),
            parameters.end_chapter.as_deref().unwrap_or("last")
        ));

        let Some(listing) = self.downloader.fetcher().fetch_text(&parameters.main_url).await else {
            self.logger.error(
                format!(
                    "Could not retrieve the chapter list from {} using selector `{}`, check the url and your connection",
                    parameters.main_url, parameters.chapter_link_selector
                )
                .into(),
            );
            return ScrapeOutcome::ListingUnavailable;
        };

        let chapters = self.chapter_list(listing, parameters);
        self.logger.inform(format!("Found {} chapters", chapters.len()));

        let selected =
            select_range(&chapters, parameters.start_chapter.as_deref(), parameters.end_chapter.as_deref(), &self.logger);

        let manga_directory = AppDirectories::manga_directory(&parameters.download_directory, &parameters.title);
        let merger = ChapterPdfMerger::new(self.logger.clone());

        for (completed, chapter) in selected.iter().enumerate() {
            if cancellation.is_cancelled() {
                self.logger.warn(format!("Stopped after {completed} of {} chapters", selected.len()));
                return ScrapeOutcome::Cancelled { completed };
            }

            let directory_name = chapter_directory_name(chapter);
            let chapter_id = chapter_label(chapter);
            let directory = manga_directory.join(&directory_name);

            self.downloader
                .download(chapter.href(), &chapter_id, &directory, &parameters.page_selectors)
                .await;

            if parameters.merge_into_pdf {
                let merged = merger.merge(&directory, &directory_name).map_err(|e| e.to_string());

                if let Err(e) = merged {
                    self.logger.error(format!("Could not merge Chapter {chapter_id} into a pdf: {e}").into());
                }
            }
        }

        self.logger.inform("All done!");

        ScrapeOutcome::Completed {
            chapters: selected.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use fake::Fake;
    use fake::faker::name::en::Name;
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use image::{ImageFormat, Rgb, RgbImage};
    use manga_scraper::exists;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::backend::fetch::HttpFetcher;
    use crate::backend::fetch::mock::MockFetcher;
    use crate::backend::html_parser::scraper::ScraperParser;
    use crate::backend::manga_downloader::pdf_merger::test_utils::{page_count, test_directory};
    use crate::config::FetchConfig;
    use crate::logger::mock::{Level, RecordingLogger};

    static LISTING_URL: &str = "https://site.com/manga/";

    static LISTING_PAGE: &str = r#"
        <html>
          <body>
            <ul class="chapters">
              <li><a href="https://site.com/manga/chapter-3/">Chapter 3</a></li>
              <li><a href="/manga/chapter-2-5/">Chapter 2.5</a></li>
              <li><a href="https://site.com/manga/chapter-2/">Chapter 2</a></li>
              <li><a>Chapter 1</a></li>
            </ul>
          </body>
        </html>
    "#;

    fn jpeg_bytes() -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        RgbImage::from_pixel(8, 12, Rgb([10, 120, 200])).write_to(&mut cursor, ImageFormat::Jpeg).unwrap();
        cursor.into_inner()
    }

    fn chapter_page(chapter: &str) -> String {
        format!(r#"<div class="reader"><img src="https://cdn.site.com/{chapter}/01.jpg"></div>"#)
    }

    fn mock_site() -> MockFetcher {
        let mut fetcher = MockFetcher::new().with_page(LISTING_URL, LISTING_PAGE);

        for chapter in ["3", "2-5", "2"] {
            fetcher = fetcher
                .with_page(&format!("https://site.com/manga/chapter-{chapter}/"), &chapter_page(chapter))
                .with_file(&format!("https://cdn.site.com/{chapter}/01.jpg"), jpeg_bytes());
        }

        fetcher
    }

    fn parameters(download_directory: PathBuf) -> ScrapeParameters {
        ScrapeParameters {
            title: "Some manga".to_string(),
            main_url: LISTING_URL.to_string(),
            chapter_link_selector: "ul.chapters a".to_string(),
            page_selectors: PageSelectors::new("div.reader img", vec![]),
            start_chapter: None,
            end_chapter: None,
            merge_into_pdf: false,
            download_directory,
        }
    }

    #[tokio::test]
    async fn it_downloads_every_chapter_from_oldest_to_newest() {
        let download_directory = test_directory("scrape_all");
        let logger = RecordingLogger::new();

        let runner = ScrapeRunner::new(mock_site(), ScraperParser, logger.clone());

        let outcome = runner.run(&parameters(download_directory.clone()), CancellationToken::new()).await;

        assert_eq!(ScrapeOutcome::Completed { chapters: 3 }, outcome);

        let manga_directory = download_directory.join("Some manga");
        for chapter in ["chapter_2", "chapter_2.5", "chapter_3"] {
            assert!(exists!(&manga_directory.join(chapter).join("00.jpg")), "{chapter} was not downloaded");
        }

        assert!(logger.has_message(Level::Warn, "Skipping chapter link without href: Chapter 1"));
        assert!(logger.has_message(Level::Info, "All done!"));

        let downloads: Vec<String> = logger
            .messages(Level::Info)
            .into_iter()
            .filter(|message| message.starts_with("Downloading Chapter"))
            .collect();
        assert_eq!(
            vec![
                "Downloading Chapter 2 from https://site.com/manga/chapter-2/...",
                "Downloading Chapter 2.5 from https://site.com/manga/chapter-2-5/...",
                "Downloading Chapter 3 from https://site.com/manga/chapter-3/...",
            ],
            downloads
        );
    }

    #[tokio::test]
    async fn it_downloads_only_the_requested_range_and_merges_it() {
        let download_directory = test_directory("scrape_range");

        let parameters = ScrapeParameters {
            start_chapter: Some("2.5".to_string()),
            end_chapter: Some("3".to_string()),
            merge_into_pdf: true,
            ..parameters(download_directory.clone())
        };

        let runner = ScrapeRunner::new(mock_site(), ScraperParser, RecordingLogger::new());

        let outcome = runner.run(&parameters, CancellationToken::new()).await;

        assert_eq!(ScrapeOutcome::Completed { chapters: 2 }, outcome);

        let manga_directory = download_directory.join("Some manga");
        assert!(!exists!(&manga_directory.join("chapter_2")));
        assert_eq!(1, page_count(&manga_directory.join("chapter_2.5").join("chapter_2.5.pdf")));
        assert_eq!(1, page_count(&manga_directory.join("chapter_3").join("chapter_3.pdf")));
    }

    #[tokio::test]
    async fn unreachable_listing_aborts_the_run() {
        let download_directory = test_directory("scrape_no_listing");
        let logger = RecordingLogger::new();

        let runner = ScrapeRunner::new(MockFetcher::new(), ScraperParser, logger.clone());

        let outcome = runner.run(&parameters(download_directory.clone()), CancellationToken::new()).await;

        assert_eq!(ScrapeOutcome::ListingUnavailable, outcome);
        assert!(logger.has_message(Level::Error, LISTING_URL));
        assert!(!exists!(&download_directory.join("Some manga")));
    }

    #[tokio::test]
    async fn cancelled_run_stops_before_the_next_chapter() {
        let download_directory = test_directory("scrape_cancelled");
        let fetcher = mock_site();

        let runner = ScrapeRunner::new(fetcher.clone(), ScraperParser, RecordingLogger::new());

        let token = CancellationToken::new();
        token.cancel();

        let outcome = runner.run(&parameters(download_directory.clone()), token).await;

        assert_eq!(ScrapeOutcome::Cancelled { completed: 0 }, outcome);
        // only the chapter list was requested
        assert_eq!(1, fetcher.requests_made());
        assert!(!exists!(&download_directory.join("Some manga")));
    }

    #[tokio::test]
    async fn invalid_chapter_link_selector_finds_no_chapters() {
        let download_directory = test_directory("scrape_bad_selector");
        let logger = RecordingLogger::new();

        let parameters = ScrapeParameters {
            chapter_link_selector: "ul[".to_string(),
            ..parameters(download_directory)
        };

        let runner = ScrapeRunner::new(mock_site(), ScraperParser, logger.clone());

        let outcome = runner.run(&parameters, CancellationToken::new()).await;

        assert_eq!(ScrapeOutcome::Completed { chapters: 0 }, outcome);
        assert!(logger.has_message(Level::Error, "Invalid selector `ul[`"));
    }

    #[tokio::test]
    async fn title_is_sanitized_before_becoming_a_directory() {
        let download_directory = test_directory("scrape_title");
        let name: String = Name().fake();

        let parameters = ScrapeParameters {
            title: format!("{name}: part 1/2?"),
            end_chapter: Some("2".to_string()),
            ..parameters(download_directory.clone())
        };

        let runner = ScrapeRunner::new(mock_site(), ScraperParser, RecordingLogger::new());

        runner.run(&parameters, CancellationToken::new()).await;

        let manga_directory = download_directory.join(format!("{name}_ part 1_2_"));
        assert!(exists!(&manga_directory.join("chapter_2").join("00.jpg")));
    }

    #[tokio::test]
    async fn it_scrapes_a_site_over_http() {
        let server = MockServer::start_async().await;
        let download_directory = test_directory("scrape_http");

        let listing = r#"
            <div id="list">
              <a class="chapter" href="/read/chapter-2/">Chapter 2</a>
              <a class="chapter" href="/read/chapter-1/">Chapter 1</a>
            </div>
        "#;

        let listing_mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/manga");
                then.status(200).body(listing);
            })
            .await;

        for chapter in ["1", "2"] {
            let page = format!(r#"<main><img class="page" data-src="/images/{chapter}/01.jpg" src="placeholder.gif"></main>"#);

            server
                .mock_async(|when, then| {
                    when.method(GET).path(format!("/read/chapter-{chapter}/"));
                    then.status(200).body(page);
                })
                .await;

            server
                .mock_async(|when, then| {
                    when.method(GET).path(format!("/images/{chapter}/01.jpg"));
                    then.status(200).body(jpeg_bytes());
                })
                .await;
        }

        let fetcher = HttpFetcher::new(FetchConfig::without_delays(), RecordingLogger::new()).unwrap();
        let runner = ScrapeRunner::new(fetcher, ScraperParser, RecordingLogger::new());

        let parameters = ScrapeParameters {
            title: "Http manga".to_string(),
            main_url: server.url("/manga"),
            chapter_link_selector: "a.chapter".to_string(),
            page_selectors: PageSelectors::new("div.reader img", vec!["img.page".to_string()]),
            start_chapter: None,
            end_chapter: None,
            merge_into_pdf: true,
            download_directory: download_directory.clone(),
        };

        let outcome = runner.run(&parameters, CancellationToken::new()).await;

        listing_mock.assert_async().await;
        assert_eq!(ScrapeOutcome::Completed { chapters: 2 }, outcome);

        let manga_directory = download_directory.join("Http manga");
        assert_eq!(1, page_count(&manga_directory.join("chapter_1").join("chapter_1.pdf")));
        assert_eq!(1, page_count(&manga_directory.join("chapter_2").join("chapter_2.pdf")));
    }

    #[test]
    fn parameters_require_url_and_selectors() {
        let section = ScrapeSection {
            main_url: Some("https://site.com/manga/".to_string()),
            chapter_link_selector: Some("ul.chapters a".to_string()),
            page_selector: None,
            ..Default::default()
        };

        assert_eq!(Err(MissingParameter("page_selector")), ScrapeParameters::try_from(&section));

        let section = ScrapeSection {
            main_url: Some("   ".to_string()),
            ..section
        };

        assert_eq!(Err(MissingParameter("main_url")), ScrapeParameters::try_from(&section));
    }

    #[test]
    fn parameters_default_the_title_and_drop_blank_values() -> Result<(), MissingParameter> {
        let section = ScrapeSection {
            title: Some(" ".to_string()),
            main_url: Some("https://site.com/manga/".to_string()),
            chapter_link_selector: Some("ul.chapters a".to_string()),
            page_selector: Some("div.reader img".to_string()),
            fallback_page_selectors: vec!["".to_string(), "img".to_string()],
            start_chapter: Some("".to_string()),
            end_chapter: Some("12".to_string()),
            ..Default::default()
        };

        let parameters = ScrapeParameters::try_from(&section)?;

        assert_eq!(DEFAULT_MANGA_TITLE, parameters.title);
        assert_eq!(PageSelectors::new("div.reader img", vec!["img".to_string()]), parameters.page_selectors);
        assert_eq!(None, parameters.start_chapter);
        assert_eq!(Some("12".to_string()), parameters.end_chapter);
        assert_eq!(PathBuf::from("./manga_downloads"), parameters.download_directory);

        Ok(())
    }
}
