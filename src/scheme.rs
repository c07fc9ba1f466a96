//! A registry of the custom resource kinds the scanner decodes, keyed by group, version and kind.

use kube::core::{GroupVersionKind, TypeMeta};
use serde_yaml::Value;
use tracing::debug;

use crate::{
    manifest::decode_first,
    resources::{
        application_gvk, troubleshoot_gvk, CustomResource, LEGACY_TROUBLESHOOT_API_VERSION,
        TROUBLESHOOT_GROUP, TROUBLESHOOT_VERSION,
    },
    Error, Result,
};

type DecodeFn = fn(&str) -> Result<CustomResource, serde_yaml::Error>;

/// Upgrades a document to the API version the scheme has types registered for.
pub trait SpecConverter {
    fn convert(&self, doc: &[u8]) -> Result<Vec<u8>>;
}

/// Rewrites `troubleshoot.replicated.com/v1beta1` specs as `troubleshoot.sh/v1beta2`.
/// Specs already at v1beta2 pass through untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct TroubleshootV1Beta2;

impl SpecConverter for TroubleshootV1Beta2 {
    fn convert(&self, doc: &[u8]) -> Result<Vec<u8>> {
        let text = std::str::from_utf8(doc).map_err(|e| Error::Convert(e.to_string()))?;
        let mut value: Value = decode_first(text).map_err(|e| Error::Convert(e.to_string()))?;

        let current = format!("{TROUBLESHOOT_GROUP}/{TROUBLESHOOT_VERSION}");
        let api_version = value
            .get("apiVersion")
            .and_then(Value::as_str)
            .map(str::to_string);

        match api_version.as_deref() {
            Some(v) if v == current => Ok(doc.to_vec()),
            Some(LEGACY_TROUBLESHOOT_API_VERSION) => {
                if let Some(mapping) = value.as_mapping_mut() {
                    mapping.insert("apiVersion".into(), current.into());
                }
                Ok(serde_yaml::to_string(&value)?.into_bytes())
            }
            Some(other) => Err(Error::Convert(format!("cannot convert {other}"))),
            None => Err(Error::Convert("no apiVersion in document".to_string())),
        }
    }
}

/// Decoders for custom resources, plus the converter applied to documents that are
/// not directly recognized.
///
/// Build one with [`Scheme::default`] (KOTS and Troubleshoot kinds registered) or start
/// from [`Scheme::new`] and [`Scheme::register`] kinds explicitly.
pub struct Scheme {
    kinds: Vec<(GroupVersionKind, DecodeFn)>,
    converter: Box<dyn SpecConverter>,
}

impl Default for Scheme {
    fn default() -> Self {
        Self::new().with_kots_kinds().with_troubleshoot_kinds()
    }
}

impl Scheme {
    /// An empty scheme that converts with [`TroubleshootV1Beta2`].
    pub fn new() -> Self {
        Self {
            kinds: vec![],
            converter: Box::new(TroubleshootV1Beta2),
        }
    }

    pub fn register(&mut self, gvk: GroupVersionKind, decode: DecodeFn) {
        self.kinds.retain(|(known, _)| known != &gvk);
        self.kinds.push((gvk, decode));
    }

    pub fn with_kots_kinds(mut self) -> Self {
        self.register(application_gvk(), |doc| {
            decode_first(doc).map(CustomResource::Application)
        });
        self
    }

    pub fn with_troubleshoot_kinds(mut self) -> Self {
        self.register(troubleshoot_gvk("Collector"), |doc| {
            decode_first(doc).map(CustomResource::Collector)
        });
        self.register(troubleshoot_gvk("SupportBundle"), |doc| {
            decode_first(doc).map(CustomResource::SupportBundle)
        });
        self.register(troubleshoot_gvk("Preflight"), |doc| {
            decode_first(doc).map(CustomResource::Preflight)
        });
        self
    }

    pub fn with_converter(mut self, converter: impl SpecConverter + 'static) -> Self {
        self.converter = Box::new(converter);
        self
    }

    pub fn is_registered(&self, gvk: &GroupVersionKind) -> bool {
        self.kinds.iter().any(|(known, _)| known == gvk)
    }

    /// Decodes a document whose `apiVersion` and `kind` match a registered kind.
    pub fn decode(&self, doc: &str) -> Option<CustomResource> {
        let gvk = type_of(doc)?;
        let (_, decode) = self.kinds.iter().find(|(known, _)| known == &gvk)?;
        match decode(doc) {
            Ok(resource) => Some(resource),
            Err(error) => {
                debug!(kind = %gvk.kind, %error, "unable to decode custom resource");
                None
            }
        }
    }

    /// Finds the custom resource in a document, upgrading Troubleshoot specs through the
    /// converter when they are not readable as is.
    ///
    /// Documents that are not custom resources, or cannot be decoded, yield `None`.
    pub fn custom_resource(&self, doc: &str) -> Option<CustomResource> {
        let gvk = type_of(doc)?;
        if gvk == application_gvk() {
            return self.decode(doc);
        }

        let converted = match self.converter.convert(doc.as_bytes()) {
            Ok(converted) => converted,
            Err(error) => {
                debug!(kind = %gvk.kind, %error, "not a convertible spec");
                return None;
            }
        };
        let converted = String::from_utf8(converted).ok()?;

        let gvk = type_of(&converted)?;
        if gvk.group != TROUBLESHOOT_GROUP || gvk.version != TROUBLESHOOT_VERSION {
            return None;
        }
        self.decode(&converted)
    }
}

/// Reads `apiVersion` and `kind`. Both must be present.
fn type_of(doc: &str) -> Option<GroupVersionKind> {
    let meta: TypeMeta = decode_first(doc).ok()?;
    let (group, version) = meta
        .api_version
        .split_once('/')
        .unwrap_or(("", meta.api_version.as_str()));
    Some(GroupVersionKind::gvk(group, version, &meta.kind))
}
