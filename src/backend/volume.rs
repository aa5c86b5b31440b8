use std::error::Error;
use std::fmt::Display;
use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use lopdf::{Document, Object, ObjectId, dictionary};
use manga_scraper::chapter_number::ChapterNumber;
use manga_scraper::exists;

use super::create_dir_if_not_exists;
use super::manga_downloader::pdf_merger::{ImagePdfBuilder, read_image, save_document};
use crate::config::VolumesConfig;
use crate::logger::ILogger;

/// Attributes a page can take from its ancestors in the page tree, they are copied onto the page
/// before it is moved into another document
const INHERITABLE_PAGE_ATTRIBUTES: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

const CHAPTER_DIRECTORY_PREFIX: &str = "chapter_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidVolumeSize;

impl Display for InvalidVolumeSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chapters per volume must be greater than 0")
    }
}

impl Error for InvalidVolumeSize {}

/// A `chapter_<number>` directory with its chapter pdfs sorted by filename
#[derive(Debug, Clone, PartialEq)]
struct ChapterDirectory {
    path: PathBuf,
    number: Option<ChapterNumber>,
    pdfs: Vec<PathBuf>,
}

fn is_chapter_pdf(path: &Path) -> bool {
    let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };

    path.is_file() && file_name.starts_with("chapter") && file_name.ends_with(".pdf")
}

fn chapter_pdfs(directory: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut pdfs: Vec<PathBuf> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok().map(|entry| entry.path()))
        .filter(|path| is_chapter_pdf(path))
        .collect();

    pdfs.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(pdfs)
}

/// Chapter directories that contain at least one chapter pdf, sorted by chapter number, the ones
/// whose number can not be parsed go last
fn chapter_directories(root: &Path) -> Result<Vec<ChapterDirectory>, std::io::Error> {
    let mut directories = Vec::new();

    for entry in fs::read_dir(root)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()).map(str::to_string) else {
            continue;
        };

        if !path.is_dir() || !name.starts_with(CHAPTER_DIRECTORY_PREFIX) {
            continue;
        }

        let pdfs = chapter_pdfs(&path)?;
        if pdfs.is_empty() {
            continue;
        }

        directories.push(ChapterDirectory {
            number: ChapterNumber::parse(&name),
            path,
            pdfs,
        });
    }

    directories.sort_by(|a, b| match (a.number, b.number) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.path.cmp(&b.path)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.path.cmp(&b.path),
    });

    Ok(directories)
}

fn is_page_tree_node(object: &Object) -> bool {
    match object.as_dict().and_then(|dict| dict.get(b"Type")) {
        Ok(Object::Name(name)) => name.as_slice() == b"Catalog" || name.as_slice() == b"Pages",
        _ => false,
    }
}

fn copy_inherited_attributes(doc: &mut Document, page_id: ObjectId) -> Result<(), lopdf::Error> {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();

    let page = doc.get_dictionary(page_id)?;
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut visited = Vec::new();

    while let Some(parent_id) = parent {
        if visited.contains(&parent_id) {
            break;
        }
        visited.push(parent_id);

        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };

        for key in INHERITABLE_PAGE_ATTRIBUTES {
            if page.has(key) || inherited.iter().any(|(inherited_key, _)| *inherited_key == key) {
                continue;
            }
            if let Ok(value) = node.get(key) {
                inherited.push((key, value.clone()));
            }
        }

        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    for (key, value) in inherited {
        page.set(key, value);
    }

    Ok(())
}

/// Puts the pages of every document, in order, under a single page tree
pub fn concat_documents(documents: Vec<Document>) -> Result<Document, Box<dyn Error>> {
    let mut merged = Document::with_version("1.7");
    let pages_id = merged.new_object_id();
    let mut kids: Vec<Object> = Vec::new();

    for mut doc in documents {
        doc.renumber_objects_with(merged.max_id + 1);

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();

        for &page_id in &page_ids {
            copy_inherited_attributes(&mut doc, page_id)?;
            doc.get_object_mut(page_id)?.as_dict_mut()?.set("Parent", pages_id);
        }

        merged.max_id = merged.max_id.max(doc.max_id);
        merged
            .objects
            .extend(mem::take(&mut doc.objects).into_iter().filter(|(_, object)| !is_page_tree_node(object)));
        kids.extend(page_ids.into_iter().map(Object::from));
    }

    let count = kids.len() as i64;
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);

    Ok(merged)
}

/// Pages collected from consecutive chapters until the next volume is written
#[derive(Default)]
struct VolumeAccumulator {
    documents: Vec<Document>,
    chapters: Vec<PathBuf>,
}

impl VolumeAccumulator {
    fn page_count(&self) -> usize {
        self.documents.iter().map(|doc| doc.get_pages().len()).sum()
    }

    fn take(&mut self) -> Self {
        mem::take(self)
    }
}

/// A volume written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub number: u32,
    pub cover_path: PathBuf,
    pub chapter_pdfs: Vec<PathBuf>,
    pub path: PathBuf,
}

/// Groups chapter pdfs into `volume_<number>.pdf` files, each one starting with its cover
/// `<covers>/<number>.jpg`
#[derive(Debug, Clone)]
pub struct VolumeAssembler<L: ILogger> {
    logger: L,
}

impl<L: ILogger> VolumeAssembler<L> {
    pub fn new(logger: L) -> Self {
        Self { logger }
    }

    /// Walks the chapter directories of `root` in chapter order, a volume is written every
    /// `chapters_per_volume` chapters and after the last chapter.
    /// A volume whose cover is missing is not written and its chapters are dropped, the next
    /// volume keeps its own number so volume numbers always match the same chapters and covers
    pub fn assemble(&self, root: &Path, covers: &Path, output: &Path, config: VolumesConfig) -> Result<Vec<Volume>, Box<dyn Error>> {
        if config.chapters_per_volume == 0 {
            return Err(Box::new(InvalidVolumeSize));
        }

        if !exists!(root) {
            self.logger.warn(format!("Directory does not exist: {}", root.display()));
            return Ok(vec![]);
        }

        create_dir_if_not_exists(output)?;

        let chapters = chapter_directories(root)?;
        let total_chapters = chapters.len();
        let chapters_per_volume = config.chapters_per_volume as usize;

        self.logger.inform(format!("Found {total_chapters} chapters in {}", root.display()));

        let mut volume_number = config.start_volume_number;
        let mut accumulator = VolumeAccumulator::default();
        let mut volumes = Vec::new();

        for (index, chapter) in chapters.into_iter().enumerate() {
            let chapter_count = index + 1;

            self.logger.inform(format!(
                "Processing {}, Chapter Count: {chapter_count}, Volume: {volume_number}",
                chapter.path.display()
            ));

            for pdf in chapter.pdfs {
                match Document::load(&pdf) {
                    Ok(doc) => {
                        accumulator.documents.push(doc);
                        accumulator.chapters.push(pdf);
                    },
                    Err(e) => self.logger.warn(format!("Skipping {}: {e}", pdf.display())),
                }
            }

            let is_last_chapter = chapter_count == total_chapters;
            if chapter_count % chapters_per_volume != 0 && !is_last_chapter {
                continue;
            }

            let pending = accumulator.take();

            if let Some(volume) = self.write_volume(volume_number, covers, output, pending)? {
                volumes.push(volume);
            }

            volume_number += 1;
        }

        Ok(volumes)
    }

    fn write_volume(
        &self,
        volume_number: u32,
        covers: &Path,
        output: &Path,
        pending: VolumeAccumulator,
    ) -> Result<Option<Volume>, Box<dyn Error>> {
        let cover_path = covers.join(format!("{volume_number}.jpg"));

        if !exists!(&cover_path) {
            self.logger.warn(format!(
                "Cover image for volume {volume_number} not found. Skipping this volume and its {} chapter pdfs.",
                pending.chapters.len()
            ));
            return Ok(None);
        }

        let cover = match self.cover_document(&cover_path) {
            Ok(cover) => cover,
            Err(e) => {
                self.logger.warn(format!("Could not read cover {}: {e}. Skipping this volume.", cover_path.display()));
                return Ok(None);
            },
        };

        let page_count = pending.page_count() + 1;

        let mut documents = vec![cover];
        documents.extend(pending.documents);

        let path = output.join(format!("volume_{volume_number}.pdf"));
        save_document(concat_documents(documents)?, &path)?;

        self.logger.inform(format!("Created {} with {page_count} pages", path.display()));

        Ok(Some(Volume {
            number: volume_number,
            cover_path,
            chapter_pdfs: pending.chapters,
            path,
        }))
    }

    fn cover_document(&self, cover_path: &Path) -> Result<Document, Box<dyn Error>> {
        let (image, format) = read_image(cover_path)?;

        let mut builder = ImagePdfBuilder::new();
        builder.add_image(&image, format)?;

        Ok(builder.build())
    }
}
