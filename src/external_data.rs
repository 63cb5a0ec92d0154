// src/external_data.rs
//
// Host-owned memory lent to the engine.
//
// The host keeps allocation responsibility. The engine holds a view plus a
// one-shot release obligation: the release callback fires exactly once per
// registration, after which the host may reclaim the memory.

use std::collections::HashMap;
use std::fmt;

/// Interpretation of an external buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataType {
    /// Interleaved 32-bit float audio
    Float32 { channels: u32, sample_rate: f64 },

    /// Interleaved 64-bit float audio
    Float64 { channels: u32, sample_rate: f64 },

    /// Raw bytes with no channel or rate semantics
    Untyped,
}

impl DataType {
    #[inline]
    pub fn channels(&self) -> usize {
        match *self {
            DataType::Float32 { channels, .. } | DataType::Float64 { channels, .. } => {
                channels as usize
            }
            DataType::Untyped => 0,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> Option<f64> {
        match *self {
            DataType::Float32 { sample_rate, .. } | DataType::Float64 { sample_rate, .. } => {
                Some(sample_rate)
            }
            DataType::Untyped => None,
        }
    }
}

/// Callback invoked with the buffer id and its original address.
pub type ReleaseFn = Box<dyn FnMut(&str, *mut u8) + Send>;

/// One registration of host memory.
pub struct ExternalData {
    id: String,
    address: *mut u8,
    size: usize,
    data_type: DataType,
    release: ReleaseFn,
    released: bool,
}

// The host guarantees the memory stays valid and unmutated until the
// release callback fires, from whichever thread the engine runs on.
unsafe impl Send for ExternalData {}

impl ExternalData {
    /// Wrap host memory.
    ///
    /// # Safety
    /// `address` must be null or valid for reads of `size` bytes until
    /// `release` is called, and the host must not write to it meanwhile.
    /// For typed audio, the memory must hold native-endian floats.
    pub unsafe fn from_raw_parts(
        id: impl Into<String>,
        address: *mut u8,
        size: usize,
        data_type: DataType,
        release: impl FnMut(&str, *mut u8) + Send + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            address,
            size,
            data_type,
            release: Box::new(release),
            released: false,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn address(&self) -> *mut u8 {
        self.address
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        if self.address.is_null() || self.size == 0 {
            return &[];
        }
        // SAFETY: guaranteed by the `from_raw_parts` contract.
        unsafe { std::slice::from_raw_parts(self.address, self.size) }
    }

    /// Samples of a `Float32` buffer, interleaved.
    pub fn samples_f32(&self) -> Option<&[f32]> {
        match self.data_type {
            DataType::Float32 { .. } => self.typed::<f32>(),
            _ => None,
        }
    }

    /// Samples of a `Float64` buffer, interleaved.
    pub fn samples_f64(&self) -> Option<&[f64]> {
        match self.data_type {
            DataType::Float64 { .. } => self.typed::<f64>(),
            _ => None,
        }
    }

    /// Frames of typed audio (0 for untyped data).
    pub fn frames(&self) -> usize {
        let channels = self.data_type.channels();
        let width = match self.data_type {
            DataType::Float32 { .. } => std::mem::size_of::<f32>(),
            DataType::Float64 { .. } => std::mem::size_of::<f64>(),
            DataType::Untyped => return 0,
        };
        if channels == 0 {
            return 0;
        }
        self.size / width / channels
    }

    fn typed<T>(&self) -> Option<&[T]> {
        let width = std::mem::size_of::<T>();
        if self.address.is_null() || self.size < width {
            return Some(&[]);
        }
        if (self.address as usize) % std::mem::align_of::<T>() != 0 {
            return None;
        }
        // SAFETY: aligned, in bounds, valid per the `from_raw_parts` contract.
        Some(unsafe { std::slice::from_raw_parts(self.address as *const T, self.size / width) })
    }

    /// Fire the release callback if it has not fired yet.
    ///
    /// Does not allocate or free; safe to call on the audio thread as long
    /// as the host callback is.
    #[inline]
    pub(crate) fn release(&mut self) {
        if !self.released {
            self.released = true;
            (self.release)(&self.id, self.address);
        }
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl Drop for ExternalData {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ExternalData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalData")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("size", &self.size)
            .field("data_type", &self.data_type)
            .field("released", &self.released)
            .finish()
    }
}

/// Audio-side slots of registered buffers.
///
/// Slot indices are assigned by [`SlotAllocator`] on the control side.
pub struct ExternalDataRegistry {
    slots: Vec<Option<Box<ExternalData>>>,
}

impl ExternalDataRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    /// Look up a registered buffer by id.
    #[inline]
    pub fn get(&self, id: &str) -> Option<&ExternalData> {
        self.slots
            .iter()
            .flatten()
            .find(|data| data.id() == id)
            .map(|data| &**data)
    }

    /// Install `data` in `slot`, returning the previous occupant.
    #[inline]
    pub(crate) fn install(
        &mut self,
        slot: usize,
        data: Box<ExternalData>,
    ) -> Result<Option<Box<ExternalData>>, Box<ExternalData>> {
        match self.slots.get_mut(slot) {
            Some(entry) => Ok(entry.replace(data)),
            None => Err(data),
        }
    }

    #[inline]
    pub(crate) fn id_at(&self, slot: usize) -> Option<&str> {
        self.slots.get(slot)?.as_deref().map(ExternalData::id)
    }

    #[inline]
    pub(crate) fn remove(&mut self, slot: usize) -> Option<Box<ExternalData>> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Control-side id -> slot assignment.
#[derive(Debug)]
pub(crate) struct SlotAllocator {
    by_id: HashMap<String, usize>,
    free: Vec<usize>,
}

impl SlotAllocator {
    pub fn new(capacity: usize) -> Self {
        Self {
            by_id: HashMap::with_capacity(capacity),
            free: (0..capacity).rev().collect(),
        }
    }

    /// Slot for `id`, reusing the current one when the id is registered.
    pub fn assign(&mut self, id: &str) -> Option<usize> {
        if let Some(&slot) = self.by_id.get(id) {
            return Some(slot);
        }
        let slot = self.free.pop()?;
        self.by_id.insert(id.to_owned(), slot);
        Some(slot)
    }

    /// Forget an assignment made by `assign` that never reached the audio
    /// thread.
    pub fn unassign(&mut self, id: &str, was_registered: bool) {
        if !was_registered {
            self.remove(id);
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<usize> {
        let slot = self.by_id.remove(id)?;
        self.free.push(slot);
        Some(slot)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<(String, usize)>>>;

    fn make(id: &str, samples: &mut [f32], log: &Log) -> ExternalData {
        let log = Arc::clone(log);
        unsafe {
            ExternalData::from_raw_parts(
                id,
                samples.as_mut_ptr().cast(),
                std::mem::size_of_val(samples),
                DataType::Float32 {
                    channels: 2,
                    sample_rate: 44_100.0,
                },
                move |id: &str, address: *mut u8| {
                    log.lock().unwrap().push((id.to_owned(), address as usize));
                },
            )
        }
    }

    #[test]
    fn test_typed_view() {
        let log = Log::default();
        let mut samples = vec![0.25f32; 8];
        let data = make("sample", &mut samples, &log);

        assert_eq!(data.samples_f32().map(<[f32]>::len), Some(8));
        assert!(data.samples_f64().is_none());
        assert_eq!(data.frames(), 4);
        assert_eq!(data.data_type().sample_rate(), Some(44_100.0));
        assert_eq!(data.bytes().len(), 32);
    }

    #[test]
    fn test_release_fires_once() {
        let log = Log::default();
        let mut samples = vec![0.0f32; 4];
        let address = samples.as_mut_ptr() as usize;

        let mut data = make("a", &mut samples, &log);
        data.release();
        data.release();
        assert!(data.is_released());
        drop(data);

        assert_eq!(*log.lock().unwrap(), vec![("a".to_owned(), address)]);
    }

    #[test]
    fn test_drop_releases_unreleased_data() {
        let log = Log::default();
        let mut samples = vec![0.0f32; 4];
        drop(make("b", &mut samples, &log));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_registry_install_returns_previous() {
        let log = Log::default();
        let mut first = vec![1.0f32; 4];
        let mut second = vec![2.0f32; 4];
        let mut registry = ExternalDataRegistry::new(2);

        let old = registry.install(0, Box::new(make("x", &mut first, &log))).unwrap();
        assert!(old.is_none());

        let old = registry.install(0, Box::new(make("x", &mut second, &log))).unwrap();
        assert_eq!(old.as_ref().map(|d| d.address()), Some(first.as_mut_ptr() as *mut u8));
        assert_eq!(registry.get("x").and_then(|d| d.samples_f32()).map(|s| s[0]), Some(2.0));

        assert!(registry.install(5, Box::new(make("y", &mut first, &log))).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_slot_allocator_reuses_slots() {
        let mut slots = SlotAllocator::new(2);
        let a = slots.assign("a").unwrap();
        assert_eq!(slots.assign("a"), Some(a));
        let b = slots.assign("b").unwrap();
        assert_ne!(a, b);
        assert_eq!(slots.assign("c"), None);

        assert_eq!(slots.remove("a"), Some(a));
        assert!(!slots.contains("a"));
        assert_eq!(slots.assign("c"), Some(a));
    }
}
