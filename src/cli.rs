use anyhow::{Context, Result};
use itertools::Itertools;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use crate::{
    render::{HelmTemplate, DEFAULT_NAMESPACE},
    values::parse_set_values,
    Extraction, Extractor, ImageRef, Options, Warning,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    List,
}

/// Extract container image references from manifests or a Helm chart.
#[derive(Clone, Debug, clap::Args)]
#[clap(group(clap::ArgGroup::new("input").required(true).args(["yaml_dir", "chart"])))]
pub struct ExtractImages {
    /// Directory of Kubernetes manifests, scanned recursively
    #[clap(long)]
    pub yaml_dir: Option<PathBuf>,

    /// Helm chart directory or packaged .tgz
    #[clap(long)]
    pub chart: Option<PathBuf>,

    /// Values file for the chart (can be repeated)
    #[clap(long = "values", value_name = "FILE")]
    pub values_files: Vec<PathBuf>,

    /// Set a chart value, key.path=value (can be repeated)
    #[clap(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Namespace the chart is rendered into
    #[clap(long, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// List every occurrence instead of unique images
    #[clap(long)]
    pub show_duplicates: bool,

    /// Do not report warnings
    #[clap(long)]
    pub no_warnings: bool,

    /// Fail on the first manifest document that cannot be decoded
    #[clap(long)]
    pub strict: bool,

    /// Path to the helm binary used to render charts
    #[clap(long, env = "HELM_BIN", default_value = "helm")]
    pub helm: PathBuf,

    #[clap(short, long, value_enum, default_value_t)]
    pub output: OutputFormat,
}

impl ExtractImages {
    pub fn options(&self) -> Options {
        Options {
            helm_values: parse_set_values(&self.set),
            helm_values_files: self.values_files.clone(),
            namespace: self.namespace.clone(),
            include_duplicates: self.show_duplicates,
            no_warnings: self.no_warnings,
            strict: self.strict,
        }
    }

    /// Runs the extraction and writes the results to `output` and warnings to `errors`.
    pub fn run(&self, output: &mut impl Write, errors: &mut impl Write) -> Result<()> {
        let extractor = Extractor::with_renderer(HelmTemplate::new(&self.helm));
        let opts = self.options();

        let result = match (&self.yaml_dir, &self.chart) {
            (Some(dir), _) => extractor
                .extract_from_directory(dir, &opts)
                .with_context(|| format!("extraction failed: {}", dir.display()))?,
            (None, Some(chart)) => extractor
                .extract_from_chart(chart, &opts)
                .with_context(|| format!("extraction failed: {}", chart.display()))?,
            (None, None) => anyhow::bail!("either --yaml-dir or --chart is required"),
        };

        for error in &result.errors {
            writeln!(errors, "error: {error}")?;
        }

        match self.output {
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *output, &Report::new(&result))?;
                writeln!(output)?;
            }
            OutputFormat::List => {
                for image in &result.images {
                    writeln!(output, "{}", image.raw)?;
                }
                for warning in &result.warnings {
                    writeln!(errors, "warning: {}: {}", warning.image, warning.message)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Summary {
    /// Every occurrence, duplicates included.
    pub total: usize,
    pub unique: usize,
}

#[derive(Serialize)]
struct Report<'a> {
    images: &'a [ImageRef],
    warnings: &'a [Warning],
    summary: Summary,
}

impl<'a> Report<'a> {
    fn new(result: &'a Extraction) -> Self {
        Self {
            images: &result.images,
            warnings: &result.warnings,
            summary: summarize(&result.images),
        }
    }
}

pub fn summarize(images: &[ImageRef]) -> Summary {
    Summary {
        total: images.iter().map(|i| i.sources.len().max(1)).sum(),
        unique: images.iter().map(|i| &i.raw).unique().count(),
    }
}
