// src/preset.rs
//
// Preset snapshots and preset collections.
//
// A collection is a JSON array of `{ "name": ..., "preset": { ... } }`
// records. Inside a preset, each key is a parameter id mapped either to a
// bare number or to `{ "value": number }`; any other entry is opaque state
// passed through to the patcher untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PresetError;

/// One entry of a preset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PresetEntry {
    Value(f64),

    Parameter { value: f64 },

    /// Anything the patcher stores beyond plain parameter values
    State(serde_json::Value),
}

impl PresetEntry {
    #[inline]
    pub fn value(&self) -> Option<f64> {
        match *self {
            PresetEntry::Value(value) | PresetEntry::Parameter { value } => Some(value),
            PresetEntry::State(_) => None,
        }
    }
}

/// A snapshot of an engine's configuration.
///
/// Presets are plain owned values: extracting one from a [`PresetList`]
/// copies it, and applying one consumes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preset {
    entries: BTreeMap<String, PresetEntry>,
}

impl Preset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_value(&mut self, id: impl Into<String>, value: f64) {
        self.entries.insert(id.into(), PresetEntry::Parameter { value });
    }

    pub fn set_state(&mut self, id: impl Into<String>, state: serde_json::Value) {
        self.entries.insert(id.into(), PresetEntry::State(state));
    }

    pub fn value(&self, id: &str) -> Option<f64> {
        self.entries.get(id).and_then(PresetEntry::value)
    }

    pub fn state(&self, id: &str) -> Option<&serde_json::Value> {
        match self.entries.get(id) {
            Some(PresetEntry::State(state)) => Some(state),
            _ => None,
        }
    }

    /// Parameter values captured by this preset.
    pub fn values(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries
            .iter()
            .filter_map(|(id, entry)| entry.value().map(|value| (id.as_str(), value)))
    }

    /// Opaque state entries captured by this preset.
    pub fn states(&self) -> impl Iterator<Item = (&str, &serde_json::Value)> {
        self.entries.iter().filter_map(|(id, entry)| match entry {
            PresetEntry::State(state) => Some((id.as_str(), state)),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, PresetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> String {
        // A map of strings to numbers and JSON values always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamedPreset {
    name: String,
    preset: Preset,
}

/// Immutable, in-memory collection of named presets.
#[derive(Debug, Clone, Default)]
pub struct PresetList {
    presets: Vec<NamedPreset>,
}

impl PresetList {
    /// Parse a serialized collection.
    ///
    /// Trailing NUL bytes (C strings) are ignored. Malformed input never
    /// yields a partial list.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PresetError> {
        let end = bytes
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1);
        let json = std::str::from_utf8(&bytes[..end])?;
        Self::from_json(json)
    }

    pub fn from_json(json: &str) -> Result<Self, PresetError> {
        let presets: Vec<NamedPreset> = serde_json::from_str(json)?;
        log::debug!("loaded preset collection with {} presets", presets.len());
        Ok(Self { presets })
    }

    /// Copy of the preset called `name`; the first match wins.
    pub fn preset_with_name(&self, name: &str) -> Option<Preset> {
        self.presets
            .iter()
            .find(|named| named.name == name)
            .map(|named| named.preset.clone())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.presets.iter().map(|named| named.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    /// Append or replace the preset called `name`.
    pub fn insert(&mut self, name: impl Into<String>, preset: Preset) {
        let name = name.into();
        match self.presets.iter_mut().find(|named| named.name == name) {
            Some(named) => named.preset = preset,
            None => self.presets.push(NamedPreset { name, preset }),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.presets).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLLECTION: &str = r#"[
        { "name": "init", "preset": { "gain": { "value": 0.5 }, "attack": 10 } },
        { "name": "pad", "preset": {
            "gain": { "value": 0.8, "normalized": 0.8 },
            "attack": 900,
            "__wavetable": { "frames": [1, 2, 3] }
        } },
        { "name": "init", "preset": { "gain": 0.1 } }
    ]"#;

    #[test]
    fn test_parse_collection() {
        let list = PresetList::from_json(COLLECTION).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.names().collect::<Vec<_>>(), vec!["init", "pad", "init"]);

        let pad = list.preset_with_name("pad").unwrap();
        assert_eq!(pad.value("gain"), Some(0.8));
        assert_eq!(pad.value("attack"), Some(900.0));
        assert_eq!(pad.value("__wavetable"), None);
        assert!(pad.state("__wavetable").is_some());
        assert_eq!(pad.values().count(), 2);
    }

    #[test]
    fn test_first_name_wins_and_unknown_is_absent() {
        let list = PresetList::from_json(COLLECTION).unwrap();
        assert_eq!(list.preset_with_name("init").unwrap().value("gain"), Some(0.5));
        assert!(list.preset_with_name("missing").is_none());
    }

    #[test]
    fn test_extracted_presets_outlive_the_list() {
        let list = PresetList::from_json(COLLECTION).unwrap();
        let mut pad = list.preset_with_name("pad").unwrap();
        drop(list);

        pad.set_value("gain", 0.2);
        assert_eq!(pad.value("gain"), Some(0.2));
    }

    #[test]
    fn test_malformed_input_is_rejected() {
        assert!(PresetList::from_json("").is_err());
        assert!(PresetList::from_json("{\"name\": \"x\"}").is_err());
        assert!(PresetList::from_json("[{\"name\": \"x\"}]").is_err());
        assert!(PresetList::from_bytes(&[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn test_from_bytes_ignores_trailing_nul() {
        let bytes = b"[{\"name\":\"a\",\"preset\":{\"gain\":1}}]\0";
        let list = PresetList::from_bytes(bytes).unwrap();
        assert_eq!(list.preset_with_name("a").unwrap().value("gain"), Some(1.0));
    }

    #[test]
    fn test_json_round_trip_keeps_state() {
        let mut preset = Preset::new();
        preset.set_value("gain", 0.25);
        preset.set_state("__notes", serde_json::json!([60, 64]));

        let mut list = PresetList::default();
        list.insert("mine", preset.clone());
        let parsed = PresetList::from_json(&list.to_json()).unwrap();

        assert_eq!(parsed.preset_with_name("mine"), Some(preset));
    }
}
