//! Sample slots and the upload queue
//!
//! [`SampleRegistry`] owns a fixed table of slots and an ordered queue of slot
//! indices waiting to be sent. Slot lifecycle:
//!
//! ```text
//! Empty --assign--> Loaded --upload--> Uploaded
//!   ^                 |                   |
//!   +------clear------+-------------------+
//! ```
//!
//! The queue holds indices only. It is drained completely by every upload
//! pass whether or not the individual uploads succeed; a slot's `status` is
//! the only record of what reached the device.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::sysex::MAX_SLOTS;
use std::collections::VecDeque;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Anything that can send one sample to one slot
pub trait SampleUploader {
    fn upload_sample(&mut self, slot: usize, data: &[u8]) -> Result<()>;
}

/// Source of raw sample file contents
pub trait SampleStorage {
    /// Read the complete contents of a sample file.
    ///
    /// An implementation may refuse paths it does not serve with an error
    /// instead of returning partial data. [`FsSampleStorage`] refuses files
    /// whose extension is not in its supported list (`InvalidInput`).
    fn read_sample(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Sample files on a local filesystem, filtered by extension
#[derive(Debug, Clone)]
pub struct FsSampleStorage {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FsSampleStorage {
    /// Relative paths resolve against `root`. Files must carry one of the
    /// given extensions (case-insensitive, without the dot).
    pub fn new(root: impl Into<PathBuf>, extensions: &[String]) -> Self {
        Self {
            root: root.into(),
            extensions: extensions.iter().map(|e| e.trim_start_matches('.').to_lowercase()).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.storage.samples_dir, &config.storage.supported_extensions)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the file name has a supported extension
    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl SampleStorage for FsSampleStorage {
    fn read_sample(&self, path: &Path) -> io::Result<Vec<u8>> {
        if !self.is_supported(path) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported sample format: {}", path.display()),
            ));
        }
        fs::read(self.resolve(path))
    }
}

/// Lifecycle state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotStatus {
    #[default]
    Empty,
    Loaded,
    Uploaded,
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Empty => write!(f, "empty"),
            SlotStatus::Loaded => write!(f, "loaded"),
            SlotStatus::Uploaded => write!(f, "uploaded"),
        }
    }
}

/// One sample slot.
///
/// `Empty` slots hold no data and report size 0. `Loaded` and `Uploaded`
/// slots always hold data and report its length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSlot {
    name: Option<String>,
    data: Option<Vec<u8>>,
    status: SlotStatus,
}

impl SampleSlot {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    pub fn size(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    pub fn status(&self) -> SlotStatus {
        self.status
    }
}

/// Outcome of one upload pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    /// Slots that reached the device, in queue order
    pub uploaded: Vec<usize>,
    /// Slots whose upload failed, in queue order
    pub failed: Vec<usize>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Slot table plus upload queue
#[derive(Debug, Clone)]
pub struct SampleRegistry {
    slots: Vec<SampleSlot>,
    queue: VecDeque<usize>,
    max_sample_size: Option<usize>,
}

impl SampleRegistry {
    /// Create a registry with `num_slots` empty slots and no size limit.
    ///
    /// Slot numbers are sent as one data byte, so `num_slots` must not exceed
    /// [`MAX_SLOTS`]. Debug builds panic otherwise.
    pub fn new(num_slots: usize) -> Self {
        debug_assert!(num_slots <= MAX_SLOTS, "{} slots exceed the {} addressable", num_slots, MAX_SLOTS);
        Self {
            slots: vec![SampleSlot::default(); num_slots],
            queue: VecDeque::new(),
            max_sample_size: None,
        }
    }

    /// Create a registry sized and limited by the device settings
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.device.num_slots).with_max_sample_size(config.device.max_sample_size)
    }

    /// Reject sample files larger than `max` bytes
    pub fn with_max_sample_size(mut self, max: usize) -> Self {
        self.max_sample_size = Some(max);
        self
    }

    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, slot: usize) -> Option<&SampleSlot> {
        self.slots.get(slot)
    }

    pub fn slots(&self) -> impl Iterator<Item = (usize, &SampleSlot)> {
        self.slots.iter().enumerate()
    }

    /// Slot indices waiting for upload, in transmission order
    pub fn pending(&self) -> impl Iterator<Item = usize> + '_ {
        self.queue.iter().copied()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// Load a sample file into a slot and queue the slot for upload.
    ///
    /// On any failure the slot and the queue are left unchanged. A slot that
    /// is already queued is not queued a second time.
    pub fn assign<S: SampleStorage + ?Sized>(&mut self, slot: usize, path: &Path, storage: &S) -> Result<()> {
        self.check_range(slot)?;

        let data = storage.read_sample(path).map_err(|e| {
            log::warn!("Failed to read {}: {}", path.display(), e);
            Error::Io(e)
        })?;
        if data.is_empty() {
            return Err(Error::EmptySample(path.to_path_buf()));
        }
        if let Some(max) = self.max_sample_size {
            if data.len() > max {
                return Err(Error::SampleTooLarge {
                    path: path.to_path_buf(),
                    size: data.len(),
                    max,
                });
            }
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        log::info!("Slot {}: loaded '{}' ({} bytes)", slot, name, data.len());

        self.slots[slot] = SampleSlot {
            name: Some(name),
            data: Some(data),
            status: SlotStatus::Loaded,
        };
        if !self.queue.contains(&slot) {
            self.queue.push_back(slot);
        }
        Ok(())
    }

    /// Upload one slot's data.
    ///
    /// Requires the slot to hold data. Uploading an already uploaded slot
    /// sends it again. On failure the status is unchanged.
    pub fn upload_one<U: SampleUploader + ?Sized>(&mut self, slot: usize, uploader: &mut U) -> Result<()> {
        self.check_range(slot)?;
        let entry = &mut self.slots[slot];

        let data = match (&entry.status, entry.data.as_deref()) {
            (SlotStatus::Loaded | SlotStatus::Uploaded, Some(data)) if !data.is_empty() => data,
            _ => return Err(Error::EmptySlot(slot)),
        };

        uploader.upload_sample(slot, data)?;
        entry.status = SlotStatus::Uploaded;
        log::info!("Slot {}: uploaded", slot);
        Ok(())
    }

    /// Upload every queued slot in FIFO order and empty the queue.
    ///
    /// Failed slots are not re-queued.
    pub fn upload_all_pending<U: SampleUploader + ?Sized>(&mut self, uploader: &mut U) -> UploadReport {
        let mut report = UploadReport::default();

        while let Some(slot) = self.queue.pop_front() {
            match self.upload_one(slot, uploader) {
                Ok(()) => report.uploaded.push(slot),
                Err(e) => {
                    log::warn!("Slot {}: upload failed: {}", slot, e);
                    report.failed.push(slot);
                }
            }
        }

        log::info!(
            "Upload pass finished: {} uploaded, {} failed",
            report.uploaded.len(),
            report.failed.len()
        );
        report
    }

    /// Empty a slot. The queue is not touched.
    pub fn clear(&mut self, slot: usize) -> Result<()> {
        self.check_range(slot)?;
        self.slots[slot] = SampleSlot::default();
        Ok(())
    }

    fn check_range(&self, slot: usize) -> Result<()> {
        if slot < self.slots.len() {
            Ok(())
        } else {
            Err(Error::SlotOutOfRange {
                slot,
                num_slots: self.slots.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStorage {
        files: HashMap<PathBuf, Vec<u8>>,
    }

    impl MapStorage {
        fn with(mut self, path: &str, data: &[u8]) -> Self {
            self.files.insert(PathBuf::from(path), data.to_vec());
            self
        }
    }

    impl SampleStorage for MapStorage {
        fn read_sample(&self, path: &Path) -> io::Result<Vec<u8>> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
        }
    }

    #[derive(Default)]
    struct RecordingUploader {
        sent: Vec<(usize, Vec<u8>)>,
        fail_slots: Vec<usize>,
    }

    impl SampleUploader for RecordingUploader {
        fn upload_sample(&mut self, slot: usize, data: &[u8]) -> Result<()> {
            if self.fail_slots.contains(&slot) {
                return Err(Error::Transport("link down".to_string()));
            }
            self.sent.push((slot, data.to_vec()));
            Ok(())
        }
    }

    fn storage() -> MapStorage {
        MapStorage::default()
            .with("/sd/samples/kick.wav", &[0x41, 0x42, 0x43])
            .with("/sd/samples/snare.wav", &[1, 2, 3, 4])
            .with("/sd/samples/empty.wav", &[])
    }

    #[test]
    fn test_assign_loads_and_queues() {
        let mut registry = SampleRegistry::new(64);
        registry.assign(5, Path::new("/sd/samples/kick.wav"), &storage()).unwrap();

        let slot = registry.slot(5).unwrap();
        assert_eq!(slot.status(), SlotStatus::Loaded);
        assert_eq!(slot.size(), 3);
        assert_eq!(slot.data(), Some(&[0x41, 0x42, 0x43][..]));
        assert_eq!(slot.name(), Some("kick.wav"));
        assert_eq!(registry.pending().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn test_reassign_does_not_duplicate_queue_entry() {
        let mut registry = SampleRegistry::new(8);
        let storage = storage();
        registry.assign(2, Path::new("/sd/samples/kick.wav"), &storage).unwrap();
        registry.assign(3, Path::new("/sd/samples/kick.wav"), &storage).unwrap();
        registry.assign(2, Path::new("/sd/samples/snare.wav"), &storage).unwrap();

        assert_eq!(registry.pending().collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(registry.slot(2).unwrap().size(), 4);
    }

    #[test]
    fn test_assign_failures_leave_slot_unchanged() {
        let mut registry = SampleRegistry::new(8).with_max_sample_size(3);
        let storage = storage();

        assert!(matches!(
            registry.assign(8, Path::new("/sd/samples/kick.wav"), &storage),
            Err(Error::SlotOutOfRange { slot: 8, num_slots: 8 })
        ));
        assert!(matches!(
            registry.assign(1, Path::new("/sd/samples/missing.wav"), &storage),
            Err(Error::Io(_))
        ));
        assert!(matches!(
            registry.assign(1, Path::new("/sd/samples/empty.wav"), &storage),
            Err(Error::EmptySample(_))
        ));
        assert!(matches!(
            registry.assign(1, Path::new("/sd/samples/snare.wav"), &storage),
            Err(Error::SampleTooLarge { size: 4, max: 3, .. })
        ));

        assert_eq!(registry.slot(1), Some(&SampleSlot::default()));
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_upload_all_pending_drains_queue_despite_failures() {
        let mut registry = SampleRegistry::new(64);
        registry.assign(5, Path::new("/sd/samples/kick.wav"), &storage()).unwrap();
        // Slot 7 queued but never given data
        registry.queue.push_back(7);

        let mut uploader = RecordingUploader::default();
        let report = registry.upload_all_pending(&mut uploader);

        assert_eq!(report.uploaded, vec![5]);
        assert_eq!(report.failed, vec![7]);
        assert!(!report.is_complete());
        assert_eq!(registry.slot(5).unwrap().status(), SlotStatus::Uploaded);
        assert_eq!(registry.slot(7).unwrap().status(), SlotStatus::Empty);
        assert_eq!(registry.pending_count(), 0);
        assert_eq!(uploader.sent, vec![(5, vec![0x41, 0x42, 0x43])]);
    }

    #[test]
    fn test_upload_pass_respects_fifo_order() {
        let mut registry = SampleRegistry::new(16);
        let storage = storage();
        for slot in [9, 1, 4] {
            registry.assign(slot, Path::new("/sd/samples/snare.wav"), &storage).unwrap();
        }
        let mut uploader = RecordingUploader::default();
        registry.upload_all_pending(&mut uploader);
        let order: Vec<usize> = uploader.sent.iter().map(|(slot, _)| *slot).collect();
        assert_eq!(order, vec![9, 1, 4]);
    }

    #[test]
    fn test_failed_upload_keeps_status_and_is_not_requeued() {
        let mut registry = SampleRegistry::new(8);
        registry.assign(3, Path::new("/sd/samples/kick.wav"), &storage()).unwrap();

        let mut uploader = RecordingUploader {
            fail_slots: vec![3],
            ..Default::default()
        };
        let report = registry.upload_all_pending(&mut uploader);

        assert_eq!(report.failed, vec![3]);
        assert_eq!(registry.slot(3).unwrap().status(), SlotStatus::Loaded);
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_upload_one_is_repeatable() {
        let mut registry = SampleRegistry::new(8);
        registry.assign(0, Path::new("/sd/samples/kick.wav"), &storage()).unwrap();

        let mut uploader = RecordingUploader::default();
        registry.upload_one(0, &mut uploader).unwrap();
        registry.upload_one(0, &mut uploader).unwrap();

        assert_eq!(registry.slot(0).unwrap().status(), SlotStatus::Uploaded);
        assert_eq!(uploader.sent.len(), 2);
        assert_eq!(uploader.sent[0], uploader.sent[1]);
        // Direct uploads do not touch the queue
        assert_eq!(registry.pending().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_clear_keeps_queue_and_upload_then_fails() {
        let mut registry = SampleRegistry::new(8);
        registry.assign(6, Path::new("/sd/samples/kick.wav"), &storage()).unwrap();
        registry.clear(6).unwrap();

        let slot = registry.slot(6).unwrap();
        assert_eq!(slot.status(), SlotStatus::Empty);
        assert_eq!(slot.size(), 0);
        assert_eq!(slot.data(), None);
        assert_eq!(registry.pending().collect::<Vec<_>>(), vec![6]);

        let mut uploader = RecordingUploader::default();
        let report = registry.upload_all_pending(&mut uploader);
        assert_eq!(report.failed, vec![6]);
        assert!(uploader.sent.is_empty());
        assert!(matches!(registry.clear(8), Err(Error::SlotOutOfRange { .. })));
    }

    #[test]
    fn test_fs_storage_resolves_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("loop.WAV"), [9u8, 8, 7]).unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let storage = FsSampleStorage::new(dir.path(), &["wav".to_string(), ".raw".to_string()]);
        assert_eq!(storage.read_sample(Path::new("loop.WAV")).unwrap(), vec![9, 8, 7]);
        assert_eq!(
            storage.read_sample(&dir.path().join("loop.WAV")).unwrap(),
            vec![9, 8, 7]
        );

        let err = storage.read_sample(Path::new("notes.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(storage.read_sample(Path::new("missing.raw")).is_err());
        assert!(storage.is_supported(Path::new("x.raw")));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "exceed the 128 addressable")]
    fn test_registry_larger_than_slot_byte_panics_in_debug() {
        SampleRegistry::new(200);
    }
}
