//! Wisemark Core Library
//!
//! This crate provides the domain logic shared by the wisemark pipelines:
//! the filename identity codec, attachment normalization, structural
//! scanning of vendor JSON documents, timestamp extraction, configuration,
//! and the download-folder filesystem layout. Everything here is pure with
//! respect to the network; the HTTP side lives in `wisemark-api-client`.

pub mod attachments;
pub mod config;
pub mod error;
pub mod filename;
pub mod models;
pub mod paths;
pub mod scan;
pub mod timestamp;

// Re-export commonly used types
pub use config::WiseConfig;
pub use error::ConfigError;
pub use models::{Attachment, AttachmentKind, DownloadReport, MarkedIdentity, UploadReport};
