//! Helm values: `--set` parsing, values files and deep merging.

use std::path::PathBuf;

use serde_yaml::{Mapping, Value};

use crate::{Error, Result};

/// Parses `key.path=value` entries into nested mappings with string leaves.
///
/// Entries without `=` are ignored. When a path runs through an existing non-mapping
/// value, that value is replaced by a mapping.
pub fn parse_set_values<S: AsRef<str>>(entries: &[S]) -> Mapping {
    let mut result = Mapping::new();

    for entry in entries {
        let Some((key, value)) = entry.as_ref().split_once('=') else {
            continue;
        };
        let keys: Vec<&str> = key.split('.').collect();
        set_path(&mut result, &keys, value);
    }

    result
}

fn set_path(values: &mut Mapping, keys: &[&str], value: &str) {
    match keys {
        [] => {}
        [last] => {
            values.insert(Value::from(*last), Value::from(value));
        }
        [first, rest @ ..] => {
            if let Some(Value::Mapping(nested)) = values.get_mut(*first) {
                return set_path(nested, rest, value);
            }
            let mut nested = Mapping::new();
            set_path(&mut nested, rest, value);
            values.insert(Value::from(*first), Value::Mapping(nested));
        }
    }
}

/// Deep merges `overrides` onto `base`. Nested mappings combine, any other value in
/// `overrides` replaces the one in `base`.
pub fn merge_values(base: Mapping, overrides: &Mapping) -> Mapping {
    let mut result = base;
    for (key, value) in overrides {
        let merged = match (result.remove(key), value) {
            (Some(Value::Mapping(existing)), Value::Mapping(nested)) => {
                Value::Mapping(merge_values(existing, nested))
            }
            (_, value) => value.clone(),
        };
        result.insert(key.clone(), merged);
    }
    result
}

/// Reads values files in order, later files overriding earlier ones. An empty file
/// contributes nothing.
pub fn read_values_files(files: &[PathBuf]) -> Result<Mapping> {
    let mut result = Mapping::new();
    for path in files {
        let data = std::fs::read_to_string(path).map_err(|source| Error::ReadFile {
            path: path.clone(),
            source,
        })?;
        let value: Value = serde_yaml::from_str(&data).map_err(|source| Error::DecodeValues {
            path: path.clone(),
            source,
        })?;
        let values = match value {
            Value::Null => Mapping::new(),
            Value::Mapping(values) => values,
            _ => return Err(Error::ValuesNotAMapping(path.clone())),
        };
        result = merge_values(result, &values);
    }
    Ok(result)
}

/// Values files first, then inline values on top.
pub fn load_values(files: &[PathBuf], inline: &Mapping) -> Result<Mapping> {
    Ok(merge_values(read_values_files(files)?, inline))
}
