use serde::Serialize;

use crate::image::{parse_reference, ImageRef, Source};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WarningType {
    LatestTag,
    NoTag,
    #[serde(rename = "insecure-registry")]
    Insecure,
    #[serde(rename = "unqualified-name")]
    Unqualified,
    InvalidSyntax,
}

impl WarningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningType::LatestTag => "latest-tag",
            WarningType::NoTag => "no-tag",
            WarningType::Insecure => "insecure-registry",
            WarningType::Unqualified => "unqualified-name",
            WarningType::InvalidSyntax => "invalid-syntax",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            WarningType::LatestTag => {
                "Image uses 'latest' tag which is not recommended for production"
            }
            WarningType::NoTag => "Image has no tag specified",
            WarningType::Insecure => "Image uses insecure HTTP registry",
            WarningType::Unqualified => "Image reference is unqualified (no registry specified)",
            WarningType::InvalidSyntax => "Image reference is not a valid image name",
        }
    }
}

impl std::fmt::Display for WarningType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A problem with one image reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    pub image: String,
    #[serde(rename = "type")]
    pub type_: WarningType,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
}

/// Checks an image against every rule. Rules are independent, one image can yield
/// several warnings. Each warning carries the first source of the image, if any.
pub fn generate_warnings(image: &ImageRef) -> Vec<Warning> {
    let raw = image.raw.as_str();
    let unqualified = !raw.contains('.') && !raw.contains('/');

    let checks = [
        (WarningType::LatestTag, image.tag == "latest"),
        (
            WarningType::NoTag,
            image.tag.is_empty() || (!raw.contains(':') && !raw.contains('@')),
        ),
        (WarningType::Insecure, raw.starts_with("http://")),
        (
            WarningType::Unqualified,
            image.registry == "docker.io" && unqualified,
        ),
        (WarningType::InvalidSyntax, parse_reference(raw).is_none()),
    ];

    checks
        .into_iter()
        .filter(|(_, fires)| *fires)
        .map(|(type_, _)| Warning {
            image: image.raw.clone(),
            type_,
            message: type_.message().to_string(),
            source: image.sources.first().cloned(),
        })
        .collect()
}
