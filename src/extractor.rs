use std::path::{Path, PathBuf};

use serde_yaml::Mapping;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    chart::Chart,
    dedup::deduplicate_and_exclude,
    image::{parse_image_ref, ImageRef},
    render::{ChartRenderer, HelmTemplate, DEFAULT_NAMESPACE},
    scanner::{Scan, Scanner},
    scheme::Scheme,
    values::load_values,
    warnings::{generate_warnings, Warning},
    Error, Result,
};

/// Extraction settings shared by every mode.
#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Inline values, applied over the values files.
    pub helm_values: Mapping,
    pub helm_values_files: Vec<PathBuf>,
    /// Namespace charts are rendered into. Empty means `default`.
    pub namespace: String,
    /// Keep every occurrence instead of unique images. Exclusions are not applied either.
    pub include_duplicates: bool,
    pub no_warnings: bool,
    /// Fail on the first document that cannot be decoded instead of skipping it.
    pub strict: bool,
}

/// The outcome of one extraction call.
#[derive(Debug, Default)]
pub struct Extraction {
    pub images: Vec<ImageRef>,
    pub warnings: Vec<Warning>,
    /// Files that could not be read. They are skipped, the rest of the scan completes.
    pub errors: Vec<Error>,
}

impl Extraction {
    fn finish(mut self, excluded: &[String], opts: &Options) -> Self {
        if !opts.include_duplicates {
            self.images = deduplicate_and_exclude(std::mem::take(&mut self.images), excluded);
        }
        if !opts.no_warnings {
            self.warnings = self.images.iter().flat_map(generate_warnings).collect();
        }
        info!(
            images = self.images.len(),
            warnings = self.warnings.len(),
            errors = self.errors.len(),
            "extraction finished"
        );
        self
    }

    fn add_scan(&mut self, scan: Scan, file: Option<&str>) {
        self.images.extend(scan.images.into_iter().map(|found| {
            let mut image = parse_image_ref(&found.image);
            image.sources = vec![found.source(file)];
            image
        }));
    }
}

/// Extracts image references from manifests on disk, rendered charts or raw bytes.
pub struct Extractor<R = HelmTemplate> {
    renderer: R,
    scheme: fn() -> Scheme,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    pub fn new() -> Self {
        Self::with_renderer(HelmTemplate::default())
    }
}

impl<R: ChartRenderer> Extractor<R> {
    pub fn with_renderer(renderer: R) -> Self {
        Self {
            renderer,
            scheme: Scheme::default,
        }
    }

    /// Replaces the custom resource kinds recognized while scanning.
    pub fn with_scheme(mut self, scheme: fn() -> Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    fn scanner(&self, opts: &Options) -> Scanner {
        Scanner::new((self.scheme)()).strict(opts.strict)
    }

    /// Scans every `.yaml` and `.yml` file below `dir`, in file name order.
    ///
    /// An unreadable root is fatal. Unreadable files and subdirectories are recorded in
    /// [`Extraction::errors`] and skipped.
    pub fn extract_from_directory(&self, dir: impl AsRef<Path>, opts: &Options) -> Result<Extraction> {
        let scanner = self.scanner(opts);
        let mut result = Extraction::default();
        let mut excluded = vec![];

        for entry in WalkDir::new(dir.as_ref()).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) if error.depth() == 0 => return Err(error.into()),
                Err(error) => {
                    warn!(%error, "skipping unreadable path");
                    result.errors.push(error.into());
                    continue;
                }
            };
            if entry.file_type().is_dir() || !is_yaml_file(entry.path()) {
                continue;
            }

            let path = entry.path();
            let data = match std::fs::read(path) {
                Ok(data) => data,
                Err(source) => {
                    warn!(path = %path.display(), %source, "skipping unreadable file");
                    result.errors.push(Error::ReadFile {
                        path: path.to_path_buf(),
                        source,
                    });
                    continue;
                }
            };

            let scan = scanner.scan(&data)?;
            debug!(path = %path.display(), images = scan.images.len(), "scanned file");
            excluded.extend(scan.excluded.iter().cloned());
            result.add_scan(scan, Some(path.display().to_string().as_str()));
        }

        Ok(result.finish(&excluded, opts))
    }

    /// Renders a chart with the merged values and scans the manifests and hooks.
    pub fn extract_from_chart(&self, chart_path: impl AsRef<Path>, opts: &Options) -> Result<Extraction> {
        let chart = Chart::load(chart_path)?;
        let values = load_values(&opts.helm_values_files, &opts.helm_values)?;
        let namespace = if opts.namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            &opts.namespace
        };

        let rendered = self.renderer.render(&chart, &values, namespace)?;
        self.extract_from_manifests(&rendered.into_manifests(), opts)
    }

    /// Scans a document stream. Images carry no file in their source.
    pub fn extract_from_manifests(&self, manifests: &[u8], opts: &Options) -> Result<Extraction> {
        let scan = self.scanner(opts).scan(manifests)?;
        let excluded = scan.excluded.clone();

        let mut result = Extraction::default();
        result.add_scan(scan, None);
        Ok(result.finish(&excluded, opts))
    }
}

pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}
