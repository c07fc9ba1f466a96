use oci_distribution::Reference;
use serde::Serialize;

const DEFAULT_TAG: &str = "latest";

/// A parsed container image reference.
///
/// `raw` is the string exactly as it appeared in the manifest and is the identity
/// used for deduplication. When the reference cannot be parsed only `raw` is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub raw: String,
    pub registry: String,
    pub repository: String,
    pub tag: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub digest: String,
    pub sources: Vec<Source>,
}

/// Where an image reference was found.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_type: Option<ContainerType>,
}

/// The pod spec slot a container was declared in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ContainerType {
    Container,
    InitContainer,
    EphemeralContainer,
}

impl std::fmt::Display for ContainerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContainerType::Container => "container",
            ContainerType::InitContainer => "initContainer",
            ContainerType::EphemeralContainer => "ephemeralContainer",
        };
        f.write_str(name)
    }
}

impl ImageRef {
    /// True when the parser could not split the reference into its components.
    pub fn is_unparsed(&self) -> bool {
        self.registry.is_empty() && self.repository.is_empty()
    }
}

/// Removes a leading `http://` or `https://`. Such prefixes are a misconfiguration,
/// image names have no scheme.
fn strip_scheme(raw: &str) -> &str {
    let raw = raw.strip_prefix("http://").unwrap_or(raw);
    raw.strip_prefix("https://").unwrap_or(raw)
}

/// Splits off a first path segment that Docker would treat as a registry host although
/// `Reference` does not: one with uppercase letters and no `.` or `:`.
fn uppercase_host(name: &str) -> Option<(&str, &str)> {
    let (host, rest) = name.split_once('/')?;
    let is_host = host.chars().any(|c| c.is_ascii_uppercase())
        && !host.contains(['.', ':'])
        && host != "localhost";
    is_host.then_some((host, rest))
}

/// Parses a scheme-stripped reference into its registry and the parsed reference.
///
/// Repository paths must be lowercase; a reference that only parses with uppercase left
/// in its repository is rejected.
pub(crate) fn parse_reference(raw: &str) -> Option<(String, Reference)> {
    let name = strip_scheme(raw);
    let parsed = match uppercase_host(name) {
        // parse the remainder under a stand-in host so no docker.io defaults apply
        Some((host, rest)) => format!("localhost/{rest}")
            .parse::<Reference>()
            .map(|reference| (host.to_string(), reference)),
        None => name
            .parse::<Reference>()
            .map(|reference| (reference.registry().to_string(), reference)),
    };

    match parsed {
        Ok((_, reference)) if reference.repository().chars().any(|c| c.is_ascii_uppercase()) => {
            tracing::debug!(image = raw, "repository name must be lowercase");
            None
        }
        Ok(parsed) => Some(parsed),
        Err(error) => {
            tracing::debug!(image = raw, %error, "unable to parse image reference");
            None
        }
    }
}

/// Parses an image reference, applying the Docker Hub defaults
/// (`docker.io` registry, `library/` prefix for single segment names).
///
/// Never fails: a malformed reference comes back with only `raw` populated.
pub fn parse_image_ref(raw: &str) -> ImageRef {
    let mut image = ImageRef {
        raw: raw.to_string(),
        ..Default::default()
    };

    let Some((registry, reference)) = parse_reference(raw) else {
        return image;
    };

    image.registry = registry;
    image.repository = reference.repository().to_string();
    image.digest = reference.digest().unwrap_or_default().to_string();
    image.tag = match (reference.tag(), reference.digest()) {
        (Some(tag), _) => tag.to_string(),
        (None, None) => DEFAULT_TAG.to_string(),
        (None, Some(_)) => String::new(),
    };

    image
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIGEST: &str = "sha256:d5229eb7ad4fa8e8cb9004e63b6b257fe5c925de4bde9c6fcbee5e758c08cc13";

    #[test]
    fn test_parse_image_ref() {
        let tests = [
            ("nginx:1.19", "docker.io", "library/nginx", "1.19"),
            ("redis", "docker.io", "library/redis", "latest"),
            ("gcr.io/proj/app:v1", "gcr.io", "proj/app", "v1"),
            ("localhost:5000/app:dev", "localhost:5000", "app", "dev"),
            ("user/app:v2", "docker.io", "user/app", "v2"),
        ];

        for (input, registry, repository, tag) in tests {
            let image = parse_image_ref(input);
            assert_eq!(image.raw, input);
            assert_eq!(image.registry, registry, "registry of {input}");
            assert_eq!(image.repository, repository, "repository of {input}");
            assert_eq!(image.tag, tag, "tag of {input}");
            assert!(image.digest.is_empty());
        }
    }

    #[test]
    fn test_digest_without_tag() {
        let raw = format!("bitnami/kubectl@{DIGEST}");
        let image = parse_image_ref(&raw);
        assert_eq!(image.registry, "docker.io");
        assert_eq!(image.repository, "bitnami/kubectl");
        assert_eq!(image.tag, "");
        assert_eq!(image.digest, DIGEST);
    }

    #[test]
    fn test_tag_and_digest() {
        let raw = format!("quay.io/org/app:v3@{DIGEST}");
        let image = parse_image_ref(&raw);
        assert_eq!(image.registry, "quay.io");
        assert_eq!(image.repository, "org/app");
        assert_eq!(image.tag, "v3");
        assert_eq!(image.digest, DIGEST);
    }

    #[test]
    fn test_scheme_is_stripped() {
        let image = parse_image_ref("http://reg.com/app:v1");
        assert_eq!(image.raw, "http://reg.com/app:v1");
        assert_eq!(image.registry, "reg.com");
        assert_eq!(image.repository, "app");
        assert_eq!(image.tag, "v1");

        let image = parse_image_ref("https://reg.com/app");
        assert_eq!(image.registry, "reg.com");
        assert_eq!(image.tag, "latest");
    }

    #[test]
    fn test_malformed_keeps_raw_only() {
        for raw in ["Not A Valid Image", "myorg/App:v1", "UPPER/Case:v1", "app:"] {
            let image = parse_image_ref(raw);
            assert_eq!(image.raw, raw);
            assert!(image.is_unparsed(), "{raw} should not parse");
            assert_eq!(image.tag, "");
            assert!(image.sources.is_empty());
        }
    }

    #[test]
    fn test_uppercase_first_segment_is_registry() {
        let tests = [
            ("UPPER/case:v1", "UPPER", "case", "v1"),
            ("MyOrg/app:v1", "MyOrg", "app", "v1"),
            ("MyOrg/team/app", "MyOrg", "team/app", "latest"),
        ];

        for (input, registry, repository, tag) in tests {
            let image = parse_image_ref(input);
            assert_eq!(image.registry, registry, "registry of {input}");
            assert_eq!(image.repository, repository, "repository of {input}");
            assert_eq!(image.tag, tag, "tag of {input}");
        }

        let image = parse_image_ref(&format!("MyOrg/app@{DIGEST}"));
        assert_eq!(image.registry, "MyOrg");
        assert_eq!(image.tag, "");
        assert_eq!(image.digest, DIGEST);
    }

    #[test]
    fn test_container_type_display() {
        assert_eq!(ContainerType::Container.to_string(), "container");
        assert_eq!(ContainerType::InitContainer.to_string(), "initContainer");
        assert_eq!(
            ContainerType::EphemeralContainer.to_string(),
            "ephemeralContainer"
        );
    }
}
