//! Minimal Kubernetes object shapes, just enough to locate container images.
//!
//! Every field defaults when absent and unknown fields are ignored, so any document with
//! a mapping at the top level decodes into these shapes.

use serde::{de::DeserializeOwned, Deserialize, Deserializer};

use crate::image::ContainerType;

/// Separator between documents in a manifest stream. Only this exact byte sequence splits
/// documents; a `---` that is not surrounded by newlines stays part of the document.
pub const DOCUMENT_SEPARATOR: &[u8] = b"\n---\n";

/// Splits a manifest stream on [`DOCUMENT_SEPARATOR`].
pub fn split_documents(data: &[u8]) -> Vec<&[u8]> {
    let mut docs = vec![];
    let mut rest = data;
    while let Some(pos) = rest
        .windows(DOCUMENT_SEPARATOR.len())
        .position(|w| w == DOCUMENT_SEPARATOR)
    {
        docs.push(&rest[..pos]);
        rest = &rest[pos + DOCUMENT_SEPARATOR.len()..];
    }
    docs.push(rest);
    docs
}

/// True when the document holds nothing but whitespace, comments and document markers.
pub fn is_blank(doc: &str) -> bool {
    doc.lines().map(str::trim).all(|line| {
        line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
    })
}

/// Decodes the first YAML document in `doc`. Any further documents in the same
/// chunk are ignored.
pub fn decode_first<T: DeserializeOwned>(doc: &str) -> Result<T, serde_yaml::Error> {
    match serde_yaml::Deserializer::from_str(doc).next() {
        Some(de) => T::deserialize(de),
        None => serde_yaml::from_str(""),
    }
}

/// Treats an explicit `null` like an absent key. Templated manifests often render
/// `initContainers:` or `spec:` with nothing after them.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct ObjectMeta {
    pub name: Option<String>,
    pub namespace: Option<String>,
}

/// Any workload that wraps its pod spec in a template: Deployment, StatefulSet,
/// DaemonSet, ReplicaSet, Job, and CronJob through `jobTemplate`.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkloadDoc {
    #[serde(deserialize_with = "nullable")]
    pub api_version: String,
    #[serde(deserialize_with = "nullable")]
    pub kind: String,
    #[serde(deserialize_with = "nullable")]
    pub metadata: ObjectMeta,
    #[serde(deserialize_with = "nullable")]
    pub spec: WorkloadSpec,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct WorkloadSpec {
    #[serde(deserialize_with = "nullable")]
    pub template: PodTemplate,
    #[serde(deserialize_with = "nullable")]
    pub job_template: JobTemplate,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct JobTemplate {
    #[serde(deserialize_with = "nullable")]
    pub spec: JobSpec,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct JobSpec {
    #[serde(deserialize_with = "nullable")]
    pub template: PodTemplate,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct PodTemplate {
    #[serde(deserialize_with = "nullable")]
    pub spec: PodSpec,
}

/// A bare Pod has no template layer.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct PodDoc {
    #[serde(deserialize_with = "nullable")]
    pub kind: String,
    #[serde(deserialize_with = "nullable")]
    pub metadata: ObjectMeta,
    #[serde(deserialize_with = "nullable")]
    pub spec: PodSpec,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(deserialize_with = "nullable")]
    pub containers: Vec<Container>,
    #[serde(deserialize_with = "nullable")]
    pub init_containers: Vec<Container>,
    #[serde(deserialize_with = "nullable")]
    pub ephemeral_containers: Vec<Container>,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Container {
    pub name: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub image: String,
}

/// An image field found in a pod spec, with the container it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerImage {
    pub image: String,
    pub container: Option<String>,
    pub container_type: ContainerType,
}

impl PodSpec {
    /// Lists non-empty images from containers, then init containers, then ephemeral containers.
    pub fn images(&self) -> Vec<ContainerImage> {
        [
            (&self.containers, ContainerType::Container),
            (&self.init_containers, ContainerType::InitContainer),
            (&self.ephemeral_containers, ContainerType::EphemeralContainer),
        ]
        .into_iter()
        .flat_map(|(containers, container_type)| {
            containers
                .iter()
                .filter(|c| !c.image.is_empty())
                .map(move |c| ContainerImage {
                    image: c.image.clone(),
                    container: c.name.clone(),
                    container_type,
                })
        })
        .collect()
    }
}

impl WorkloadDoc {
    /// Images in `spec.template`, followed by those in `spec.jobTemplate.spec.template`.
    ///
    /// Ephemeral containers cannot be part of a pod template and are not reported here.
    pub fn images(&self) -> Vec<ContainerImage> {
        [
            &self.spec.template.spec,
            &self.spec.job_template.spec.template.spec,
        ]
        .into_iter()
        .flat_map(|spec| {
            spec.images()
                .into_iter()
                .filter(|c| c.container_type != ContainerType::EphemeralContainer)
        })
        .collect()
    }
}

impl PodDoc {
    pub fn images(&self) -> Vec<ContainerImage> {
        self.spec.images()
    }
}
