use std::error::Error;
use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use manga_scraper::exists;

use crate::logger::ILogger;

/// Every page is this wide in points (A4 width), its height follows the aspect ratio of its image
pub const PAGE_WIDTH: f32 = 595.0;

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Builds a pdf document where each page is one image
pub struct ImagePdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    pages: Vec<ObjectId>,
}

impl Default for ImagePdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImagePdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        Self {
            doc,
            pages_id,
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// The image is converted to rgb, jpegs are embedded as jpeg and everything else as
    /// compressed raw pixels
    pub fn add_image(&mut self, img: &DynamicImage, format: Option<ImageFormat>) -> Result<(), Box<dyn Error>> {
        let (img_width, img_height) = img.dimensions();
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());

        let (img_data, filter) = match format {
            Some(ImageFormat::Jpeg) => {
                let mut cursor = Cursor::new(Vec::new());
                rgb.write_to(&mut cursor, ImageFormat::Jpeg)?;
                (cursor.into_inner(), "DCTDecode")
            },
            _ => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::fast());
                encoder.write_all(rgb.as_bytes())?;
                (encoder.finish()?, "FlateDecode")
            },
        };

        let img_obj = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => img_width as i64,
                "Height" => img_height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => filter,
                "Length" => img_data.len() as i64
            },
            img_data,
        );
        let img_id = self.doc.add_object(img_obj);

        let scale_factor = PAGE_WIDTH / img_width as f32;
        let scaled_w = PAGE_WIDTH;
        let scaled_h = img_height as f32 * scale_factor;

        let contents = Stream::new(dictionary! {}, format!("q {scaled_w} 0 0 {scaled_h} 0 0 cm /Im Do Q\n").into_bytes());

        let contents_id = self.doc.add_object(contents);

        let page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), scaled_w.into(), scaled_h.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im" => img_id }
            },
            "Contents" => contents_id,
        };

        let page_id = self.doc.add_object(page_dict);
        self.pages.push(page_id);

        Ok(())
    }

    pub fn build(mut self) -> Document {
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => self.pages.iter().map(|&p| p.into()).collect::<Vec<Object>>(),
            "Count" => self.pages.len() as i32,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });

        self.doc.trailer.set("Root", catalog_id);

        self.doc
    }
}

/// Decodes an image file guessing its format from its contents
pub fn read_image(path: &Path) -> Result<(DynamicImage, Option<ImageFormat>), Box<dyn Error>> {
    let reader = ImageReader::new(Cursor::new(fs::read(path)?)).with_guessed_format()?;
    let format = reader.format();

    Ok((reader.decode()?, format))
}

pub fn save_document(mut doc: Document, path: &Path) -> Result<(), Box<dyn Error>> {
    let file = File::create(path)?;

    doc.save_to(&mut BufWriter::new(file))?;

    Ok(())
}

fn is_image_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| IMAGE_EXTENSIONS.iter().any(|image_ext| extension.eq_ignore_ascii_case(image_ext)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Created { path: PathBuf, pages: usize },
    AlreadyExists(PathBuf),
    MissingDirectory,
    NoImages,
}

/// Joins the images of a chapter directory into `<output_name>.pdf` inside that same directory
#[derive(Debug, Clone)]
pub struct ChapterPdfMerger<L: ILogger> {
    logger: L,
}

impl<L: ILogger> ChapterPdfMerger<L> {
    pub fn new(logger: L) -> Self {
        Self { logger }
    }

    /// Images are sorted by filename, which matches page order because page files are named with
    /// zero padded indexes. Images that cannot be decoded are skipped
    pub fn merge(&self, chapter_directory: &Path, output_name: &str) -> Result<MergeOutcome, Box<dyn Error>> {
        if !exists!(chapter_directory) {
            self.logger.warn(format!("Directory does not exist: {}", chapter_directory.display()));
            return Ok(MergeOutcome::MissingDirectory);
        }

        let pdf_path = chapter_directory.join(format!("{output_name}.pdf"));

        if exists!(&pdf_path) {
            self.logger.inform(format!("{output_name}.pdf already exists"));
            return Ok(MergeOutcome::AlreadyExists(pdf_path));
        }

        let mut image_files: Vec<PathBuf> = fs::read_dir(chapter_directory)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| is_image_file(path))
            .collect();

        image_files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        if image_files.is_empty() {
            self.logger.inform(format!("No image files to merge in {}", chapter_directory.display()));
            return Ok(MergeOutcome::NoImages);
        }

        let mut builder = ImagePdfBuilder::new();

        for image_file in image_files {
            let added = read_image(&image_file).and_then(|(img, format)| builder.add_image(&img, format));

            if let Err(e) = added {
                self.logger.warn(format!("Skipping {}: {e}", image_file.display()));
            }
        }

        if builder.page_count() == 0 {
            self.logger.inform(format!("No valid image files to merge in {}", chapter_directory.display()));
            return Ok(MergeOutcome::NoImages);
        }

        let pages = builder.page_count();
        save_document(builder.build(), &pdf_path)?;

        self.logger.inform(format!("Created {} with {pages} pages", pdf_path.display()));

        Ok(MergeOutcome::Created { path: pdf_path, pages })
    }

    /// Merges every directory directly inside `directory`, each pdf is named after its directory
    pub fn merge_all(&self, directory: &Path) -> Result<Vec<MergeOutcome>, Box<dyn Error>> {
        let mut chapter_directories: Vec<PathBuf> = fs::read_dir(directory)?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_dir())
            .collect();

        chapter_directories.sort();

        let mut outcomes = Vec::with_capacity(chapter_directories.len());

        for chapter_directory in chapter_directories {
            let Some(name) = chapter_directory.file_name().map(|name| name.to_string_lossy().into_owned()) else {
                continue;
            };

            match self.merge(&chapter_directory, &name) {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => self.logger.error(format!("Could not merge {} : {e}", chapter_directory.display()).into()),
            }
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
pub mod test_utils {
    use std::path::{Path, PathBuf};

    use image::{Rgb, RgbImage};
    use uuid::Uuid;

    /// Creates an empty directory under `./test_results` unique to the calling test
    pub fn test_directory(name: &str) -> PathBuf {
        let directory = Path::new("./test_results").join(name).join(Uuid::new_v4().to_string());
        std::fs::create_dir_all(&directory).expect("could not create test directory");
        directory
    }

    /// Writes a solid color image, the format is taken from the extension of `path`
    pub fn write_image(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([200, 30, 90])).save(path).expect("could not write test image");
    }

    pub fn page_count(pdf: &Path) -> usize {
        lopdf::Document::load(pdf).expect("could not load pdf").get_pages().len()
    }
}
