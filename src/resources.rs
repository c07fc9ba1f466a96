use kube::core::GroupVersionKind;
use serde::Deserialize;

pub const KOTS_GROUP: &str = "kots.io";
pub const KOTS_VERSION: &str = "v1beta1";

pub const TROUBLESHOOT_GROUP: &str = "troubleshoot.sh";
pub const TROUBLESHOOT_VERSION: &str = "v1beta2";

/// The pre-`troubleshoot.sh` API group and version of Troubleshoot specs.
pub const LEGACY_TROUBLESHOOT_API_VERSION: &str = "troubleshoot.replicated.com/v1beta1";

/// A KOTS `Application` manifest. Only the image lists are modelled.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(default)]
    pub spec: ApplicationSpec,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSpec {
    /// Images shipped with the application that no workload references directly.
    #[serde(default)]
    pub additional_images: Vec<String>,

    /// Images that must not be shipped, even when a workload references them.
    #[serde(default)]
    pub excluded_images: Vec<String>,
}

/// The shared shape of `Collector`, `SupportBundle` and `Preflight` specs.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct TroubleshootSpec {
    #[serde(default)]
    pub spec: CollectorsSpec,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct CollectorsSpec {
    #[serde(default)]
    pub collectors: Vec<Collect>,
}

/// One entry of `spec.collectors`. Only the `run` collector references an image.
#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Collect {
    pub run: Option<Run>,
}

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub collector_name: Option<String>,
    #[serde(default)]
    pub image: String,
}

/// The custom resources the scanner knows how to read images from.
#[derive(Clone, Debug)]
pub enum CustomResource {
    Application(Application),
    Collector(TroubleshootSpec),
    SupportBundle(TroubleshootSpec),
    Preflight(TroubleshootSpec),
}

impl CustomResource {
    /// Images contributed to the image set.
    pub fn images(&self) -> Vec<String> {
        let images: Vec<String> = match self {
            CustomResource::Application(app) => app.spec.additional_images.clone(),
            CustomResource::Collector(spec)
            | CustomResource::SupportBundle(spec)
            | CustomResource::Preflight(spec) => spec
                .spec
                .collectors
                .iter()
                .filter_map(|collect| collect.run.as_ref())
                .map(|run| run.image.clone())
                .collect(),
        };
        images.into_iter().filter(|image| !image.is_empty()).collect()
    }

    /// Images to remove from the final image set.
    pub fn excluded_images(&self) -> Vec<String> {
        match self {
            CustomResource::Application(app) => app
                .spec
                .excluded_images
                .iter()
                .filter(|image| !image.is_empty())
                .cloned()
                .collect(),
            _ => vec![],
        }
    }
}

pub fn application_gvk() -> GroupVersionKind {
    GroupVersionKind::gvk(KOTS_GROUP, KOTS_VERSION, "Application")
}

pub fn troubleshoot_gvk(kind: &str) -> GroupVersionKind {
    GroupVersionKind::gvk(TROUBLESHOOT_GROUP, TROUBLESHOOT_VERSION, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_images() {
        let app = CustomResource::Application(Application {
            spec: ApplicationSpec {
                additional_images: vec!["postgres:14".into(), "".into()],
                excluded_images: vec!["".into(), "redis:6".into()],
            },
        });
        assert_eq!(app.images(), ["postgres:14"]);
        assert_eq!(app.excluded_images(), ["redis:6"]);
    }

    #[test]
    fn collector_images() {
        let spec: TroubleshootSpec = serde_yaml::from_str(
            r#"
apiVersion: troubleshoot.sh/v1beta2
kind: SupportBundle
metadata:
  name: bundle
spec:
  collectors:
  - clusterInfo: {}
  - run:
      collectorName: ping
      image: busybox:1.36
  - run:
      collectorName: no-image
"#,
        )
        .unwrap();

        let resource = CustomResource::SupportBundle(spec);
        assert_eq!(resource.images(), ["busybox:1.36"]);
        assert!(resource.excluded_images().is_empty());
    }

    #[test]
    fn gvks() {
        let gvk = application_gvk();
        assert_eq!(gvk.group, "kots.io");
        assert_eq!(gvk.version, "v1beta1");
        assert_eq!(gvk.kind, "Application");
        assert_eq!(troubleshoot_gvk("Preflight").group, "troubleshoot.sh");
    }
}
