use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, crate_version};

use crate::backend::AppDirectories;
use crate::config::{ScrapeSection, VolumesConfig};

/// Flags of `scrape`, each one overrides the same value read from the config file
#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct ScrapeArgs {
    /// Config file, `scraper-config.toml` is used when it exists
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// First chapter to download, inclusive
    #[arg(short, long)]
    pub start: Option<String>,
    /// Last chapter to download, inclusive
    #[arg(short, long)]
    pub end: Option<String>,
    #[arg(short, long)]
    pub title: Option<String>,
    /// Page listing every chapter
    #[arg(short, long)]
    pub url: Option<String>,
    /// Selector of the chapter links in the chapter list
    #[arg(long)]
    pub chapter_link_selector: Option<String>,
    /// Selector of the images in a chapter page
    #[arg(long)]
    pub page_selector: Option<String>,
    /// Tried in order when the page selector finds no images, can be repeated
    #[arg(long = "fallback-selector")]
    pub fallback_selectors: Vec<String>,
    /// Merge the images of each chapter into `chapter_<number>.pdf` after downloading it
    #[arg(long)]
    pub merge_pdf: bool,
}

impl ScrapeArgs {
    pub fn apply_to(&self, section: &mut ScrapeSection) {
        let overrides = [
            (&self.start, &mut section.start_chapter),
            (&self.end, &mut section.end_chapter),
            (&self.title, &mut section.title),
            (&self.url, &mut section.main_url),
            (&self.chapter_link_selector, &mut section.chapter_link_selector),
            (&self.page_selector, &mut section.page_selector),
        ];

        for (flag, value) in overrides {
            if flag.is_some() {
                value.clone_from(flag);
            }
        }

        if !self.fallback_selectors.is_empty() {
            section.fallback_page_selectors.clone_from(&self.fallback_selectors);
        }

        if self.merge_pdf {
            section.merge_into_pdf = true;
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct VolumesArgs {
    /// Directory containing the `chapter_<number>` directories
    pub root: PathBuf,
    /// Directory with the covers named `<volume number>.jpg`, defaults to `<ROOT>/covers`
    #[arg(long)]
    pub covers: Option<PathBuf>,
    /// Where volumes are written, defaults to `<ROOT>/volumes`
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[arg(short = 'n', long)]
    pub chapters_per_volume: Option<u32>,
    #[arg(long)]
    pub start_volume: Option<u32>,
    /// Config file to read the `[volumes]` section from
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl VolumesArgs {
    pub fn covers_directory(&self) -> PathBuf {
        self.covers.clone().unwrap_or_else(|| AppDirectories::Covers.get_full_path(&self.root))
    }

    pub fn output_directory(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| AppDirectories::Volumes.get_full_path(&self.root))
    }

    pub fn apply_to(&self, config: VolumesConfig) -> VolumesConfig {
        VolumesConfig {
            chapters_per_volume: self.chapters_per_volume.unwrap_or(config.chapters_per_volume),
            start_volume_number: self.start_volume.unwrap_or(config.start_volume_number),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download the chapters of a manga from its chapter list
    Scrape(ScrapeArgs),
    /// Merge the images of every directory inside DIRECTORY into a pdf named after the directory
    Merge { directory: PathBuf },
    /// Group chapter pdfs into volumes, each one starting with its cover
    Volumes(VolumesArgs),
    /// Write the config template
    Init { path: Option<PathBuf> },
}

#[derive(Parser, Debug)]
#[command(version = crate_version!(), about = "Download manga chapters and bundle them into pdf volumes")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn scrape_flags_override_the_config_file() {
        let args = CliArgs::parse_from([
            "manga-scraper",
            "scrape",
            "--url",
            "https://site.com/manga/",
            "--start",
            "10",
            "--fallback-selector",
            "img.page",
            "--fallback-selector",
            "img",
            "--merge-pdf",
        ]);

        let Commands::Scrape(scrape_args) = args.command else {
            panic!("expected the scrape command");
        };

        let mut section = ScrapeSection {
            title: Some("From file".to_string()),
            main_url: Some("https://other.com".to_string()),
            end_chapter: Some("20".to_string()),
            fallback_page_selectors: vec!["div img".to_string()],
            ..Default::default()
        };

        scrape_args.apply_to(&mut section);

        assert_eq!(Some("From file".to_string()), section.title);
        assert_eq!(Some("https://site.com/manga/".to_string()), section.main_url);
        assert_eq!(Some("10".to_string()), section.start_chapter);
        assert_eq!(Some("20".to_string()), section.end_chapter);
        assert_eq!(vec!["img.page".to_string(), "img".to_string()], section.fallback_page_selectors);
        assert!(section.merge_into_pdf);
    }

    #[test]
    fn volumes_directories_default_to_the_root() {
        let args = CliArgs::parse_from(["manga-scraper", "volumes", "./downloads/manga", "-n", "7"]);

        let Commands::Volumes(volumes_args) = args.command else {
            panic!("expected the volumes command");
        };

        assert_eq!(Path::new("./downloads/manga/covers"), volumes_args.covers_directory());
        assert_eq!(Path::new("./downloads/manga/volumes"), volumes_args.output_directory());

        let config = volumes_args.apply_to(VolumesConfig {
            chapters_per_volume: 12,
            start_volume_number: 3,
        });

        assert_eq!(
            VolumesConfig {
                chapters_per_volume: 7,
                start_volume_number: 3
            },
            config
        );
    }

    #[test]
    fn init_path_is_optional() {
        let args = CliArgs::parse_from(["manga-scraper", "init"]);

        assert!(matches!(args.command, Commands::Init { path: None }));
    }
}
