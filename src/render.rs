use std::{
    io::Write,
    path::{Path, PathBuf},
    process::Command,
};

use serde_yaml::Mapping;
use tracing::{debug, info};

use crate::{chart::Chart, manifest::DOCUMENT_SEPARATOR, Error, Result};

/// Release name used for every render.
pub const RELEASE_NAME: &str = "release";

pub const DEFAULT_NAMESPACE: &str = "default";

/// The output of rendering a chart: the main manifest and one manifest per hook.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderedChart {
    pub manifest: String,
    pub hooks: Vec<String>,
}

impl RenderedChart {
    /// Joins the manifest and every hook into one document stream.
    pub fn into_manifests(self) -> Vec<u8> {
        let mut buf = self.manifest.into_bytes();
        for hook in self.hooks {
            buf.extend_from_slice(DOCUMENT_SEPARATOR);
            buf.extend_from_slice(hook.as_bytes());
        }
        buf
    }
}

/// Renders a chart into Kubernetes manifests without touching a cluster.
pub trait ChartRenderer {
    fn render(&self, chart: &Chart, values: &Mapping, namespace: &str) -> Result<RenderedChart>;
}

/// Renders with `helm template`, which includes hooks in its output.
#[derive(Clone, Debug)]
pub struct HelmTemplate {
    pub helm: PathBuf,
}

impl Default for HelmTemplate {
    fn default() -> Self {
        Self {
            helm: PathBuf::from("helm"),
        }
    }
}

impl HelmTemplate {
    pub fn new(helm: impl Into<PathBuf>) -> Self {
        Self { helm: helm.into() }
    }
}

impl ChartRenderer for HelmTemplate {
    fn render(&self, chart: &Chart, values: &Mapping, namespace: &str) -> Result<RenderedChart> {
        let mut values_file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
        serde_yaml::to_writer(&mut values_file, values)?;
        values_file.flush()?;

        let tokens = emit_commandline(&self.helm, &chart.path, values_file.path(), namespace);
        debug!(command = %quoted(&tokens), "rendering chart");

        let output = Command::new(&tokens[0])
            .args(&tokens[1..])
            .output()
            .map_err(|e| Error::Render(format!("unable to run {}: {e}", self.helm.display())))?;
        if !output.status.success() {
            return Err(Error::Render(format!(
                "{} exited with {}: {}",
                self.helm.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        info!(chart = %chart.metadata.name, namespace, "rendered chart");
        Ok(RenderedChart {
            manifest: String::from_utf8_lossy(&output.stdout).into_owned(),
            hooks: vec![],
        })
    }
}

/// Generates the `helm template` command line for a chart.
pub fn emit_commandline(
    helm: &Path,
    chart: &Path,
    values_file: &Path,
    namespace: &str,
) -> Vec<String> {
    let mut cli: Vec<String> = vec![helm.display().to_string()];
    cli.extend(
        [
            "template",
            RELEASE_NAME,
            &chart.display().to_string(),
            "--namespace",
            namespace,
            "--values",
            &values_file.display().to_string(),
        ]
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>(),
    );
    cli
}

fn quoted(tokens: &[String]) -> String {
    tokens
        .iter()
        .map(|t| yash_quote::quoted(t).to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
