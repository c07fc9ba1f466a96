//! Locates image references in a stream of YAML documents.
//!
//! Every document is read as a workload (or a bare Pod) and, independently, as one of
//! the custom resources registered in the [`Scheme`]. Documents that are neither simply
//! contribute nothing.

use k8s_openapi::{api::core::v1::Pod, Resource};
use tracing::debug;

use crate::{
    image::{ContainerType, Source},
    manifest::{self, decode_first, PodDoc, WorkloadDoc},
    scheme::Scheme,
    Error, Result,
};

/// An image reference together with the object and container that declared it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FoundImage {
    pub image: String,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub namespace: Option<String>,
    pub container: Option<String>,
    pub container_type: Option<ContainerType>,
}

impl FoundImage {
    pub fn source(&self, file: Option<&str>) -> Source {
        Source {
            file: file.map(str::to_string),
            kind: self.kind.clone(),
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            container: self.container.clone(),
            container_type: self.container_type,
        }
    }
}

/// Everything found in one manifest stream.
#[derive(Clone, Debug, Default)]
pub struct Scan {
    /// Images in document order, duplicates included.
    pub images: Vec<FoundImage>,
    /// Images listed under `excludedImages` of a KOTS Application.
    pub excluded: Vec<String>,
}

impl Scan {
    pub fn image_names(&self) -> Vec<&str> {
        self.images.iter().map(|i| i.image.as_str()).collect()
    }
}

#[derive(Default)]
pub struct Scanner {
    scheme: Scheme,
    strict: bool,
}

impl Scanner {
    pub fn new(scheme: Scheme) -> Self {
        Self {
            scheme,
            strict: false,
        }
    }

    /// In strict mode the first document that is not valid YAML aborts the scan.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Scans documents separated by `"\n---\n"`.
    pub fn scan(&self, data: &[u8]) -> Result<Scan> {
        let mut scan = Scan::default();

        for (index, doc) in manifest::split_documents(data).into_iter().enumerate() {
            let Ok(doc) = std::str::from_utf8(doc) else {
                self.reject(Error::InvalidUtf8(index))?;
                continue;
            };
            if manifest::is_blank(doc) {
                continue;
            }

            let parsed: WorkloadDoc = match decode_first(doc) {
                Ok(parsed) => parsed,
                Err(source) => {
                    self.reject(Error::InvalidDocument { index, source })?;
                    continue;
                }
            };

            let found = if parsed.kind == Pod::KIND {
                match decode_first::<PodDoc>(doc) {
                    Ok(pod) => pod.images(),
                    Err(source) => {
                        self.reject(Error::InvalidDocument { index, source })?;
                        continue;
                    }
                }
            } else {
                parsed.images()
            };

            let object = |image: String| FoundImage {
                image,
                kind: non_empty(&parsed.kind),
                name: parsed.metadata.name.clone(),
                namespace: parsed.metadata.namespace.clone(),
                ..Default::default()
            };

            scan.images.extend(found.into_iter().map(|c| FoundImage {
                container: c.container,
                container_type: Some(c.container_type),
                ..object(c.image)
            }));

            if let Some(resource) = self.scheme.custom_resource(doc) {
                scan.images
                    .extend(resource.images().into_iter().map(object));
                scan.excluded.extend(resource.excluded_images());
            }
        }

        Ok(scan)
    }

    fn reject(&self, error: Error) -> Result<()> {
        if self.strict {
            return Err(error);
        }
        debug!(%error, "skipping document");
        Ok(())
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Returns every image in the stream and the images excluded by KOTS Applications,
/// skipping documents that cannot be read.
pub fn extract_images(data: &[u8]) -> (Vec<String>, Vec<String>) {
    match Scanner::default().scan(data) {
        Ok(scan) => (
            scan.images.into_iter().map(|i| i.image).collect(),
            scan.excluded,
        ),
        // a lenient scanner never rejects a document
        Err(_) => (vec![], vec![]),
    }
}
