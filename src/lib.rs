#![deny(rustdoc::broken_intra_doc_links, rustdoc::bare_urls, rust_2018_idioms)]

//! Extracts container image references from Kubernetes manifests and Helm charts,
//! without pulling or contacting any registry.

use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Error reading {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Error loading chart {path}: {reason}")]
    ChartLoad { path: PathBuf, reason: String },

    #[error("Error decoding Chart.yaml in {path}: {source}")]
    DecodeChartMetadata {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Error decoding values file {path}: {source}")]
    DecodeValues {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Values file {0} does not contain a YAML mapping")]
    ValuesNotAMapping(PathBuf),

    #[error("Chart render failed: {0}")]
    Render(String),

    #[error("Error encoding YAML: {0}")]
    EncodeYaml(#[from] serde_yaml::Error),

    #[error("Invalid YAML document #{index}: {source}")]
    InvalidDocument {
        index: usize,
        source: serde_yaml::Error,
    },

    #[error("Document #{0} is not valid UTF-8")]
    InvalidUtf8(usize),

    #[error("Cannot convert document: {0}")]
    Convert(String),

    #[error("IO Error: {0}")]
    IOError(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Orchestrates the three extraction modes.
pub mod extractor;

/// KOTS and Troubleshoot custom resource type definitions.
pub mod resources;

pub mod chart;
pub mod cli;
pub mod dedup;
pub mod image;
pub mod manifest;
pub mod render;
pub mod scanner;
pub mod scheme;
pub mod values;
pub mod warnings;

pub use extractor::{Extraction, Extractor, Options};
pub use image::{parse_image_ref, ContainerType, ImageRef, Source};
pub use warnings::{Warning, WarningType};
