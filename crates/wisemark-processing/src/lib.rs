//! Media processing for wisemark: merging downloaded raster images into a
//! single multi-page PDF.

pub mod pdf;

pub use pdf::{images_to_pdf, PdfError};
