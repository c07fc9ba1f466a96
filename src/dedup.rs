use std::collections::{BTreeSet, HashMap, HashSet};

use crate::image::{parse_image_ref, ImageRef, Source};

/// Collapses duplicate image strings and drops every excluded one.
///
/// The result is sorted so that output is stable regardless of discovery order.
/// Empty strings never survive.
pub fn deduplicate_images<S: AsRef<str>>(all: &[S], excluded: &[S]) -> Vec<String> {
    let excluded: HashSet<&str> = excluded.iter().map(|s| s.as_ref()).collect();
    all.iter()
        .map(|s| s.as_ref())
        .filter(|image| !image.is_empty() && !excluded.contains(image))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Deduplicates parsed images by their raw string, concatenating the sources of every
/// occurrence onto the surviving entry.
pub fn deduplicate_and_exclude(images: Vec<ImageRef>, excluded: &[String]) -> Vec<ImageRef> {
    let raws: Vec<&str> = images.iter().map(|i| i.raw.as_str()).collect();
    let excluded: Vec<&str> = excluded.iter().map(String::as_str).collect();
    let unique = deduplicate_images(&raws, &excluded);

    let mut sources: HashMap<String, Vec<Source>> = HashMap::new();
    for image in images {
        sources.entry(image.raw).or_default().extend(image.sources);
    }

    unique
        .into_iter()
        .map(|raw| {
            let mut image = parse_image_ref(&raw);
            image.sources = sources.remove(&raw).unwrap_or_default();
            image
        })
        .collect()
}
