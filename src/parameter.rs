// src/parameter.rs
//
// Parameter metadata and the id -> index table of an engine instance.

use std::collections::HashMap;
use std::ffi::CString;
use std::sync::atomic::{AtomicU64, Ordering};

/// Sentinel returned across the C boundary for unknown parameter ids.
pub const INVALID_PARAMETER_INDEX: i32 = -1;

/// Metadata describing one patcher parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    /// Stable string id used by hosts and presets
    pub id: String,

    /// Human-readable name
    pub name: String,

    pub min: f64,

    pub max: f64,

    pub default: f64,

    /// Number of discrete values (0 or 1 = continuous)
    pub steps: u32,

    /// Unit for display
    pub unit: String,
}

impl ParameterInfo {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            min: 0.0,
            max: 1.0,
            default: 0.0,
            steps: 0,
            unit: String::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    pub fn default(mut self, value: f64) -> Self {
        self.default = value;
        self
    }

    pub fn steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Clamp a value to the valid range and snap it to the nearest step.
    #[inline]
    pub fn constrain(&self, value: f64) -> f64 {
        let clamped = value.clamp(self.min, self.max);
        if self.steps > 1 && self.max > self.min && (self.max - self.min).is_finite() {
            let step = (self.max - self.min) / (self.steps - 1) as f64;
            self.min + ((clamped - self.min) / step).round() * step
        } else {
            clamped
        }
    }

    /// Repair a range `constrain` cannot use: NaN bounds fall back to 0..1,
    /// reversed bounds are swapped, and a non-finite default becomes `min`.
    fn sanitized(mut self) -> Self {
        if self.min.is_nan() || self.max.is_nan() {
            log::warn!(
                "parameter '{}' has an undefined range ({}, {}), using 0..1",
                self.id,
                self.min,
                self.max
            );
            self.min = 0.0;
            self.max = 1.0;
        } else if self.min > self.max {
            log::warn!(
                "parameter '{}' has reversed range ({}, {}), swapping",
                self.id,
                self.min,
                self.max
            );
            std::mem::swap(&mut self.min, &mut self.max);
        }
        if !self.default.is_finite() {
            log::warn!("parameter '{}' has non-finite default, using {}", self.id, self.min);
            self.default = self.min;
        }
        self
    }
}

/// Immutable parameter directory of one instance.
///
/// Built once at creation; lookups never allocate.
#[derive(Debug)]
pub struct ParameterTable {
    infos: Vec<ParameterInfo>,
    by_id: HashMap<String, usize>,
    /// NUL-terminated strings handed out across the C boundary
    c_strings: Vec<ParameterCStrings>,
}

#[derive(Debug)]
pub(crate) struct ParameterCStrings {
    pub id: CString,
    pub name: CString,
    pub unit: CString,
}

fn c_string(s: &str) -> CString {
    CString::new(s.replace('\0', "")).unwrap_or_default()
}

impl ParameterTable {
    pub fn new(infos: Vec<ParameterInfo>) -> Self {
        let infos: Vec<ParameterInfo> = infos.into_iter().map(ParameterInfo::sanitized).collect();
        let mut by_id = HashMap::with_capacity(infos.len());
        for (index, info) in infos.iter().enumerate() {
            if by_id.insert(info.id.clone(), index).is_some() {
                log::warn!("duplicate parameter id '{}', keeping index {}", info.id, index);
            }
        }
        let c_strings = infos
            .iter()
            .map(|info| ParameterCStrings {
                id: c_string(&info.id),
                name: c_string(&info.name),
                unit: c_string(&info.unit),
            })
            .collect();

        Self {
            infos,
            by_id,
            c_strings,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    #[inline]
    pub fn index_for_id(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    #[inline]
    pub fn info(&self, index: usize) -> Option<&ParameterInfo> {
        self.infos.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterInfo> {
        self.infos.iter()
    }

    #[inline]
    pub(crate) fn c_strings(&self, index: usize) -> Option<&ParameterCStrings> {
        self.c_strings.get(index)
    }
}

/// Applied parameter values, written by the audio thread and read anywhere.
///
/// Values are stored as f64 bits (there is no AtomicF64 in std).
#[derive(Debug)]
pub(crate) struct ParameterValues {
    bits: Box<[AtomicU64]>,
}

impl ParameterValues {
    pub fn new(table: &ParameterTable) -> Self {
        let bits = table
            .iter()
            .map(|info| AtomicU64::new(info.default.to_bits()))
            .collect();
        Self { bits }
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.bits
            .get(index)
            .map(|bits| f64::from_bits(bits.load(Ordering::Acquire)))
    }

    #[inline]
    pub fn store(&self, index: usize, value: f64) {
        if let Some(bits) = self.bits.get(index) {
            bits.store(value.to_bits(), Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ParameterTable {
        ParameterTable::new(vec![
            ParameterInfo::new("gain").range(0.0, 1.0).default(0.5),
            ParameterInfo::new("mode").range(0.0, 2.0).steps(3),
            ParameterInfo::new("cutoff").range(20.0, 20_000.0).default(1000.0).unit("Hz"),
        ])
    }

    #[test]
    fn test_index_lookup_is_stable() {
        let table = table();
        assert_eq!(table.index_for_id("mode"), Some(1));
        assert_eq!(table.index_for_id("mode"), Some(1));
        assert_eq!(table.index_for_id("cutoff"), Some(2));
        assert_eq!(table.index_for_id("missing"), None);
        assert_eq!(table.c_strings(0).unwrap().id.to_str().unwrap(), "gain");
        assert_eq!(table.c_strings(2).unwrap().unit.to_str().unwrap(), "Hz");
    }

    #[test]
    fn test_constrain_clamps_and_quantizes() {
        let table = table();
        let gain = table.info(0).unwrap();
        assert_eq!(gain.constrain(1.5), 1.0);
        assert_eq!(gain.constrain(-3.0), 0.0);
        assert_eq!(gain.constrain(0.25), 0.25);

        let mode = table.info(1).unwrap();
        assert_eq!(mode.constrain(1.4), 1.0);
        assert_eq!(mode.constrain(1.6), 2.0);
    }

    #[test]
    fn test_bad_ranges_are_repaired() {
        let table = ParameterTable::new(vec![
            ParameterInfo::new("reversed").range(10.0, -10.0).default(2.0),
            ParameterInfo::new("undefined").range(f64::NAN, 4.0).default(f64::NAN),
            ParameterInfo::new("open").range(f64::NEG_INFINITY, f64::INFINITY).steps(4),
        ]);

        let reversed = table.info(0).unwrap();
        assert_eq!((reversed.min, reversed.max), (-10.0, 10.0));
        assert_eq!(reversed.constrain(50.0), 10.0);

        let undefined = table.info(1).unwrap();
        assert_eq!((undefined.min, undefined.max, undefined.default), (0.0, 1.0, 0.0));
        assert_eq!(undefined.constrain(3.0), 1.0);

        assert_eq!(table.info(2).unwrap().constrain(7.5), 7.5);
    }

    #[test]
    fn test_values_start_at_defaults() {
        let table = table();
        let values = ParameterValues::new(&table);
        assert_eq!(values.get(0), Some(0.5));
        assert_eq!(values.get(2), Some(1000.0));
        assert_eq!(values.get(3), None);

        values.store(0, 0.75);
        assert_eq!(values.get(0), Some(0.75));
    }
}
