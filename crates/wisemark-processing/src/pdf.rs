//! Image-to-PDF assembly.
//!
//! Submissions photographed page by page arrive as loose raster files; the
//! marker needs one document per submission. Each image becomes one page,
//! in input order. Images with an alpha channel are flattened onto an
//! opaque white background using the alpha value as the compositing mask;
//! everything else converts to plain 8-bit RGB.

use std::path::Path;

use image::{DynamicImage, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use thiserror::Error;

/// Every error this module can produce.
#[derive(Debug, Error)]
pub enum PdfError {
    /// A filesystem I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An input image could not be opened or decoded.
    #[error("failed to decode image '{path}': {source}")]
    ImageDecode {
        path: String,
        #[source]
        source: image::ImageError,
    },

    /// The assembled document could not be encoded or written.
    #[error("failed to write PDF: {0}")]
    PdfWrite(#[from] lopdf::Error),
}

pub type Result<T> = std::result::Result<T, PdfError>;

/// Flatten to 8-bit RGB. Alpha is composited over white so transparent
/// regions print as paper, not black.
fn flatten_to_rgb(img: DynamicImage) -> RgbImage {
    if img.color().has_alpha() {
        let rgba = img.to_rgba8();
        let mut rgb = RgbImage::new(rgba.width(), rgba.height());
        for (src, dst) in rgba.pixels().zip(rgb.pixels_mut()) {
            let alpha = src[3] as u32;
            for c in 0..3 {
                dst[c] = ((src[c] as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
            }
        }
        rgb
    } else {
        img.to_rgb8()
    }
}

/// Merge an ordered sequence of raster images into one multi-page PDF at
/// `out_pdf`, one page per image. Pages are sized one point per pixel so
/// the image fills its page exactly. An empty input is a no-op: nothing is
/// written and no error is raised. Parent directories are created as
/// needed.
pub fn images_to_pdf<P: AsRef<Path>>(image_paths: &[P], out_pdf: &Path) -> Result<()> {
    if image_paths.is_empty() {
        return Ok(());
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(image_paths.len());

    for path in image_paths {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| PdfError::ImageDecode {
            path: path.display().to_string(),
            source,
        })?;
        let rgb = flatten_to_rgb(img);
        let (width, height) = (rgb.width() as i64, rgb.height() as i64);

        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb.into_raw(),
        ));

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        width.into(),
                        0.into(),
                        0.into(),
                        height.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    if let Some(parent) = out_pdf.parent() {
        std::fs::create_dir_all(parent)?;
    }
    doc.save(out_pdf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, Rgba, RgbaImage};
    use std::path::PathBuf;

    fn write_rgb_png(dir: &Path, name: &str, w: u32, h: u32, px: [u8; 3]) -> PathBuf {
        let path = dir.join(name);
        let img = RgbImage::from_pixel(w, h, Rgb(px));
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    fn write_rgba_png(dir: &Path, name: &str, w: u32, h: u32, px: [u8; 4]) -> PathBuf {
        let path = dir.join(name);
        let img = RgbaImage::from_pixel(w, h, Rgba(px));
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    #[test]
    fn page_count_matches_image_count() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_rgb_png(dir.path(), "p1.png", 40, 60, [255, 0, 0]),
            write_rgba_png(dir.path(), "p2.png", 30, 30, [0, 255, 0, 128]),
            write_rgb_png(dir.path(), "p3.png", 80, 20, [0, 0, 255]),
        ];

        let out = dir.path().join("merged.pdf");
        images_to_pdf(&paths, &out).unwrap();

        let doc = Document::load(&out).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn output_lands_in_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let img = write_rgb_png(dir.path(), "only.png", 10, 10, [1, 2, 3]);

        let out = dir.path().join("nested").join("deep").join("out.pdf");
        images_to_pdf(&[img], &out).unwrap();
        assert!(out.exists());
    }

    #[test]
    fn empty_input_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never.pdf");
        let no_paths: [&Path; 0] = [];
        images_to_pdf(&no_paths, &out).unwrap();
        assert!(!out.exists());
    }

    #[test]
    fn unreadable_image_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.png");
        std::fs::write(&bogus, b"not an image").unwrap();

        let out = dir.path().join("out.pdf");
        let err = images_to_pdf(&[bogus], &out).unwrap_err();
        assert!(matches!(err, PdfError::ImageDecode { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn transparency_flattens_to_white() {
        let transparent = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 0])));
        let rgb = flatten_to_rgb(transparent);
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));

        // 50% black over white lands mid-gray.
        let half = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let rgb = flatten_to_rgb(half);
        let px = rgb.get_pixel(0, 0);
        assert!(px[0] > 120 && px[0] < 135, "got {:?}", px);
    }

    #[test]
    fn opaque_images_convert_unchanged() {
        let opaque = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([10, 20, 30])));
        let rgb = flatten_to_rgb(opaque);
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }
}
