//! Loading Helm charts from a directory or a packaged `.tgz` archive.

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use flate2::read::GzDecoder;
use serde::Deserialize;
use tar::Archive;

use crate::{Error, Result};

pub const CHART_FILE: &str = "Chart.yaml";

/// The `Chart.yaml` fields needed to identify a chart.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// A chart on disk that parsed successfully.
#[derive(Clone, Debug)]
pub struct Chart {
    pub path: PathBuf,
    pub metadata: ChartMetadata,
}

impl Chart {
    /// Loads a chart directory, or a gzipped tarball containing `<name>/Chart.yaml`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let load_error = |reason: &str| Error::ChartLoad {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        };

        let data = if path.is_dir() {
            let chart_file = path.join(CHART_FILE);
            if !chart_file.is_file() {
                return Err(load_error("Chart.yaml file is missing"));
            }
            std::fs::read_to_string(&chart_file).map_err(|source| Error::ReadFile {
                path: chart_file,
                source,
            })?
        } else if path.is_file() {
            read_archived_chart_file(path)?.ok_or_else(|| load_error("Chart.yaml file is missing"))?
        } else {
            return Err(load_error("no such file or directory"));
        };

        let metadata: ChartMetadata =
            serde_yaml::from_str(&data).map_err(|source| Error::DecodeChartMetadata {
                path: path.to_path_buf(),
                source,
            })?;
        if metadata.name.is_empty() {
            return Err(load_error("chart name is required"));
        }

        Ok(Self {
            path: path.to_path_buf(),
            metadata,
        })
    }
}

/// Finds the top-level `Chart.yaml` of a packaged chart. Subchart files under
/// `<name>/charts/` are not considered.
fn read_archived_chart_file(path: &Path) -> Result<Option<String>> {
    let archive_error = |e: std::io::Error| Error::ChartLoad {
        path: path.to_path_buf(),
        reason: format!("unable to read chart archive: {e}"),
    };

    let file = File::open(path).map_err(|source| Error::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = Archive::new(GzDecoder::new(file));

    for entry in archive.entries().map_err(archive_error)? {
        let mut entry = entry.map_err(archive_error)?;
        let entry_path = entry.path().map_err(archive_error)?.into_owned();
        let components: Vec<_> = entry_path.components().collect();
        if components.len() == 2 && components[1].as_os_str() == CHART_FILE {
            let mut data = String::new();
            entry.read_to_string(&mut data).map_err(archive_error)?;
            return Ok(Some(data));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use flate2::{write::GzEncoder, Compression};

    const CHART: &str = "apiVersion: v2\nname: test\nversion: 1.0.0\n";

    fn package(dir: &Path, files: &[(&str, &str)]) -> PathBuf {
        let path = dir.join("test-1.0.0.tgz");
        let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    #[test]
    fn load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CHART_FILE), CHART).unwrap();

        let chart = Chart::load(dir.path()).unwrap();
        assert_eq!(chart.metadata.api_version, "v2");
        assert_eq!(chart.metadata.name, "test");
        assert_eq!(chart.metadata.version, "1.0.0");
        assert_eq!(chart.path, dir.path());
    }

    #[test]
    fn load_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = package(
            dir.path(),
            &[
                ("test/charts/sub/Chart.yaml", "apiVersion: v2\nname: sub\n"),
                ("test/Chart.yaml", CHART),
                ("test/values.yaml", "replicas: 1\n"),
            ],
        );

        let chart = Chart::load(&path).unwrap();
        assert_eq!(chart.metadata.name, "test");
    }

    #[test]
    fn load_failures() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(
            Chart::load(dir.path()),
            Err(Error::ChartLoad { .. })
        );
        assert_matches!(
            Chart::load(dir.path().join("missing")),
            Err(Error::ChartLoad { .. })
        );

        let not_gzip = dir.path().join("chart.tgz");
        std::fs::write(&not_gzip, "not an archive").unwrap();
        assert_matches!(Chart::load(&not_gzip), Err(Error::ChartLoad { .. }));

        let no_chart_file = package(dir.path(), &[("test/values.yaml", "a: 1\n")]);
        assert_matches!(Chart::load(&no_chart_file), Err(Error::ChartLoad { .. }));

        std::fs::write(dir.path().join(CHART_FILE), "name: [unclosed\n").unwrap();
        assert_matches!(
            Chart::load(dir.path()),
            Err(Error::DecodeChartMetadata { .. })
        );

        std::fs::write(dir.path().join(CHART_FILE), "apiVersion: v2\nversion: 1.0.0\n").unwrap();
        assert_matches!(Chart::load(dir.path()), Err(Error::ChartLoad { .. }));
    }
}
