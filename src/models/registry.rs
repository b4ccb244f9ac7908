//! Lazily-loaded, process-lifetime cache of the three model artifacts.
//!
//! Each artifact key owns a slot that moves through
//! `Uninitialized -> Loading -> Ready | Absent`. The first caller for a key performs the
//! load while concurrent callers for the same key block on it and then reuse the result.
//! A missing file is a valid, cached outcome ([`Artifact::Absent`]). A corrupt file is
//! returned as an error and is not cached, so every later access reports it again.
//!
//! There is no reload: once a slot is `Ready` or `Absent` it stays that way for the
//! life of the registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;

use crate::error::AppError;
use crate::models::booster::GradientBoostedRegressor;
use crate::models::fusion::FusionHead;
use crate::models::sequence::SequenceModel;

/// A loaded artifact, or the cached fact that none exists on disk.
#[derive(Debug)]
pub enum Artifact<T> {
    Present(Arc<T>),
    Absent,
}

// Manual impl: cloning only bumps the `Arc`, so `T: Clone` is not required.
impl<T> Clone for Artifact<T> {
    fn clone(&self) -> Self {
        match self {
            Artifact::Present(model) => Artifact::Present(Arc::clone(model)),
            Artifact::Absent => Artifact::Absent,
        }
    }
}

impl<T> Artifact<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            Artifact::Present(model) => Some(model.as_ref()),
            Artifact::Absent => None,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Artifact::Present(_))
    }
}

impl<T> From<Option<T>> for Artifact<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Artifact::Absent, |m| Artifact::Present(Arc::new(m)))
    }
}

/// Stable storage keys for the three artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    PointRegressor,
    SequenceModel,
    FusionHead,
}

impl ArtifactKey {
    pub const ALL: [ArtifactKey; 3] = [
        ArtifactKey::PointRegressor,
        ArtifactKey::SequenceModel,
        ArtifactKey::FusionHead,
    ];

    /// File name inside the model directory.
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKey::PointRegressor => "xgb_model.json",
            ArtifactKey::SequenceModel => "lstm_model.json",
            ArtifactKey::FusionHead => "fusion_model.json",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ArtifactKey::PointRegressor => "point regressor",
            ArtifactKey::SequenceModel => "sequence model",
            ArtifactKey::FusionHead => "fusion head",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Uninitialized,
    Loading,
    Ready,
    Absent,
}

/// Implemented by every type the registry can load.
pub trait ModelArtifact: Sized {
    const KEY: ArtifactKey;

    fn load(path: &Path) -> Result<Self, AppError>;

    /// Short shape summary for the load log line.
    fn describe(&self) -> String;
}

impl ModelArtifact for GradientBoostedRegressor {
    const KEY: ArtifactKey = ArtifactKey::PointRegressor;

    fn load(path: &Path) -> Result<Self, AppError> {
        GradientBoostedRegressor::load(path)
    }

    fn describe(&self) -> String {
        format!("{} trees", self.tree_count())
    }
}

impl ModelArtifact for SequenceModel {
    const KEY: ArtifactKey = ArtifactKey::SequenceModel;

    fn load(path: &Path) -> Result<Self, AppError> {
        SequenceModel::load(path)
    }

    fn describe(&self) -> String {
        format!("{} lstm units", self.units())
    }
}

impl ModelArtifact for FusionHead {
    const KEY: ArtifactKey = ArtifactKey::FusionHead;

    fn load(path: &Path) -> Result<Self, AppError> {
        FusionHead::load(path)
    }

    fn describe(&self) -> String {
        format!("{} dense layers", self.depth())
    }
}

struct Slot<T> {
    cell: OnceCell<Artifact<T>>,
    loading: AtomicBool,
}

impl<T: ModelArtifact> Slot<T> {
    fn empty() -> Self {
        Self {
            cell: OnceCell::new(),
            loading: AtomicBool::new(false),
        }
    }

    fn preloaded(artifact: Artifact<T>) -> Self {
        Self {
            cell: OnceCell::with_value(artifact),
            loading: AtomicBool::new(false),
        }
    }

    fn get_or_load(&self, path: &Path) -> Result<Artifact<T>, AppError> {
        let loaded = self.cell.get_or_try_init(|| {
            self.loading.store(true, Ordering::SeqCst);
            load_slot::<T>(path)
        });
        // Cleared only after the cell holds the value (or the load failed).
        self.loading.store(false, Ordering::SeqCst);
        loaded.cloned()
    }

    fn state(&self) -> SlotState {
        // Flag first: a cleared flag means the cell is already settled.
        let loading = self.loading.load(Ordering::SeqCst);
        match self.cell.get() {
            Some(Artifact::Present(_)) => SlotState::Ready,
            Some(Artifact::Absent) => SlotState::Absent,
            None if loading => SlotState::Loading,
            None => SlotState::Uninitialized,
        }
    }
}

fn load_slot<T: ModelArtifact>(path: &Path) -> Result<Artifact<T>, AppError> {
    let key = T::KEY;
    if !path.exists() {
        log::info!("{} not found at {}; continuing without it", key.label(), path.display());
        return Ok(Artifact::Absent);
    }
    let model = T::load(path)?;
    log::info!("loaded {} from {} ({})", key.label(), path.display(), model.describe());
    Ok(Artifact::Present(Arc::new(model)))
}

/// Explicit registry object owned by the serving process and shared by handle.
pub struct ModelRegistry {
    model_dir: PathBuf,
    point: Slot<GradientBoostedRegressor>,
    sequence: Slot<SequenceModel>,
    fusion: Slot<FusionHead>,
}

impl ModelRegistry {
    /// Registry reading artifacts from `model_dir` on first use. Nothing is touched on disk here.
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            point: Slot::empty(),
            sequence: Slot::empty(),
            fusion: Slot::empty(),
        }
    }

    /// Registry with every slot already settled (for embedding and tests).
    pub fn from_parts(
        point: Option<GradientBoostedRegressor>,
        sequence: Option<SequenceModel>,
        fusion: Option<FusionHead>,
    ) -> Self {
        Self {
            model_dir: PathBuf::new(),
            point: Slot::preloaded(point.into()),
            sequence: Slot::preloaded(sequence.into()),
            fusion: Slot::preloaded(fusion.into()),
        }
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    pub fn artifact_path(&self, key: ArtifactKey) -> PathBuf {
        self.model_dir.join(key.file_name())
    }

    pub fn point_regressor(&self) -> Result<Artifact<GradientBoostedRegressor>, AppError> {
        self.point.get_or_load(&self.artifact_path(ArtifactKey::PointRegressor))
    }

    pub fn sequence_model(&self) -> Result<Artifact<SequenceModel>, AppError> {
        self.sequence.get_or_load(&self.artifact_path(ArtifactKey::SequenceModel))
    }

    pub fn fusion_head(&self) -> Result<Artifact<FusionHead>, AppError> {
        self.fusion.get_or_load(&self.artifact_path(ArtifactKey::FusionHead))
    }

    /// Load every artifact up front so that corrupt files surface at startup.
    pub fn warm_up(&self) -> Result<(), AppError> {
        self.point_regressor()?;
        self.sequence_model()?;
        self.fusion_head()?;
        Ok(())
    }

    pub fn state(&self, key: ArtifactKey) -> SlotState {
        match key {
            ArtifactKey::PointRegressor => self.point.state(),
            ArtifactKey::SequenceModel => self.sequence.state(),
            ArtifactKey::FusionHead => self.fusion.state(),
        }
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("model_dir", &self.model_dir)
            .field("point_regressor", &self.point.state())
            .field("sequence_model", &self.sequence.state())
            .field("fusion_head", &self.fusion.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_MODEL;
    use crate::models::booster::tests::TWO_STUMPS;
    use crate::models::fusion::tests::WEIGHTED_AVERAGE;
    use std::fs;
    use std::time::{Duration, Instant};

    static GATE_OPEN: AtomicBool = AtomicBool::new(false);

    /// Artifact whose load blocks until [`GATE_OPEN`] is set.
    struct Gated;

    impl ModelArtifact for Gated {
        const KEY: ArtifactKey = ArtifactKey::FusionHead;

        fn load(_path: &Path) -> Result<Self, AppError> {
            while !GATE_OPEN.load(Ordering::SeqCst) {
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(Gated)
        }

        fn describe(&self) -> String {
            "gated".to_string()
        }
    }

    #[test]
    fn slot_reports_loading_then_ready_without_a_gap() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fusion_model.json");
        fs::write(&path, "{}").unwrap();
        let slot = Slot::<Gated>::empty();
        assert_eq!(slot.state(), SlotState::Uninitialized);

        std::thread::scope(|scope| {
            let loader = scope.spawn(|| slot.get_or_load(&path).map(|a| a.is_present()));

            let deadline = Instant::now() + Duration::from_secs(5);
            while slot.state() != SlotState::Loading {
                assert!(Instant::now() < deadline, "slot never reported Loading");
                std::thread::sleep(Duration::from_millis(1));
            }
            GATE_OPEN.store(true, Ordering::SeqCst);

            // Once the loader can observe the value, the state must never fall back.
            while !loader.is_finished() {
                assert_ne!(slot.state(), SlotState::Uninitialized);
            }
            assert!(loader.join().unwrap().unwrap());
        });
        assert_eq!(slot.state(), SlotState::Ready);
    }

    #[test]
    fn slots_start_uninitialized_and_settle() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("xgb_model.json"), TWO_STUMPS).unwrap();
        let registry = ModelRegistry::new(dir.path());

        for key in ArtifactKey::ALL {
            assert_eq!(registry.state(key), SlotState::Uninitialized);
        }

        assert!(registry.point_regressor().unwrap().is_present());
        assert!(!registry.sequence_model().unwrap().is_present());
        assert_eq!(registry.state(ArtifactKey::PointRegressor), SlotState::Ready);
        assert_eq!(registry.state(ArtifactKey::SequenceModel), SlotState::Absent);
        assert_eq!(registry.state(ArtifactKey::FusionHead), SlotState::Uninitialized);
    }

    #[test]
    fn loaded_artifact_is_shared_not_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fusion_model.json");
        fs::write(&path, WEIGHTED_AVERAGE).unwrap();
        let registry = ModelRegistry::new(dir.path());

        let first = registry.fusion_head().unwrap();
        // Removing the file afterwards has no effect: the result is cached.
        fs::remove_file(&path).unwrap();
        let second = registry.fusion_head().unwrap();

        match (first, second) {
            (Artifact::Present(a), Artifact::Present(b)) => assert!(Arc::ptr_eq(&a, &b)),
            _ => panic!("fusion head should stay present"),
        }
    }

    #[test]
    fn absent_is_cached_until_restart() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::new(dir.path());
        assert!(!registry.fusion_head().unwrap().is_present());

        fs::write(dir.path().join("fusion_model.json"), WEIGHTED_AVERAGE).unwrap();
        assert!(!registry.fusion_head().unwrap().is_present());
    }

    #[test]
    fn corrupt_artifact_fails_loudly_every_time() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("lstm_model.json"), "{not json").unwrap();
        let registry = ModelRegistry::new(dir.path());

        let err = registry.sequence_model().unwrap_err();
        assert_eq!(err.exit_code(), EXIT_MODEL);
        assert!(err.message().contains("lstm_model.json"));
        assert!(registry.sequence_model().is_err());
        assert_eq!(registry.state(ArtifactKey::SequenceModel), SlotState::Uninitialized);
        assert!(registry.warm_up().is_err());
    }

    #[test]
    fn concurrent_first_access_sees_one_instance() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("xgb_model.json"), TWO_STUMPS).unwrap();
        let registry = Arc::new(ModelRegistry::new(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || match registry.point_regressor().unwrap() {
                    Artifact::Present(model) => model,
                    Artifact::Absent => panic!("regressor should load"),
                })
            })
            .collect();
        let models: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(models.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn from_parts_settles_every_slot() {
        let registry = ModelRegistry::from_parts(None, None, None);
        for key in ArtifactKey::ALL {
            assert_eq!(registry.state(key), SlotState::Absent);
        }
        assert!(registry.warm_up().is_ok());
    }
}
