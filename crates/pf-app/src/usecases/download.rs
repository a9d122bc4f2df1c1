//! Download center.
//!
//! Keeps the current model and the download history for this session. The
//! catalogue is seeded with sample models; finished processing runs are
//! added on top.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::info;

use pf_core::download::{format_file_size, CompletedRun, DownloadTicket, GeneratedModel};
use pf_core::ids::ModelId;
use pf_core::ports::ClockPort;

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("model not found: {0}")]
    NotFound(ModelId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareText {
    pub title: String,
    pub text: String,
}

const PREVIEW_FALLBACK: &str = "/assets/images/no_image.png";

pub struct DownloadCenter {
    clock: Arc<dyn ClockPort>,
    current: Option<GeneratedModel>,
    history: Vec<GeneratedModel>,
}

impl DownloadCenter {
    pub fn new(clock: Arc<dyn ClockPort>) -> Self {
        Self {
            clock,
            current: None,
            history: Vec::new(),
        }
    }

    /// Download center pre-filled with the sample catalogue.
    pub fn with_samples(clock: Arc<dyn ClockPort>) -> Self {
        let mut center = Self::new(clock);
        let mut samples = sample_catalogue().into_iter();
        center.current = samples.next();
        center.history = samples.collect();
        center
    }

    pub fn current(&self) -> Option<&GeneratedModel> {
        self.current.as_ref()
    }

    /// Newest first.
    pub fn history(&self) -> &[GeneratedModel] {
        &self.history
    }

    pub fn find(&self, id: &ModelId) -> Option<&GeneratedModel> {
        self.current
            .iter()
            .chain(self.history.iter())
            .find(|model| &model.id == id)
    }

    /// Turns a finished run into the current model; the previous current
    /// model moves to the top of the history.
    pub fn record_completed_run(&mut self, run: &CompletedRun) -> &GeneratedModel {
        let now = self.now();
        let name = model_name(&run.file_name);
        let id = ModelId::from(format!("model_{}", now.timestamp_millis()));
        let model = GeneratedModel {
            id,
            download_url: Some(format!("/downloads/{}.stl", slug(&name))),
            preview_image: PREVIEW_FALLBACK.to_string(),
            preview_image_alt: format!("3D model generated from {}", run.file_name),
            name,
            file_size: estimated_model_size(run.file_size),
            created_at: now,
        };
        info!(model_id = %model.id, processing_time_secs = run.processing_time_secs, "completed run recorded");
        if let Some(previous) = self.current.take() {
            self.history.insert(0, previous);
        }
        self.current.insert(model)
    }

    #[tracing::instrument(name = "usecase.download_center.prepare_download", skip(self))]
    pub fn prepare_download(&self, id: &ModelId) -> Result<DownloadTicket, DownloadError> {
        let model = self
            .find(id)
            .ok_or_else(|| DownloadError::NotFound(id.clone()))?;
        let url = model
            .download_url
            .clone()
            .unwrap_or_else(|| format!("/downloads/{}.stl", slug(&model.name)));
        info!(model_id = %model.id, size = %format_file_size(model.file_size), "download prepared");
        Ok(DownloadTicket {
            model_id: model.id.clone(),
            file_name: model.download_file_name(),
            url,
        })
    }

    pub fn share_text(&self, id: &ModelId) -> Result<ShareText, DownloadError> {
        let model = self
            .find(id)
            .ok_or_else(|| DownloadError::NotFound(id.clone()))?;
        Ok(ShareText {
            title: format!("PrintForge AI - {}", model.name),
            text: format!("Check out this AI-generated 3D model: {}", model.name),
        })
    }

    /// Removes a model from the current slot or the history.
    pub fn delete(&mut self, id: &ModelId) -> Result<GeneratedModel, DownloadError> {
        if self.current.as_ref().is_some_and(|m| &m.id == id) {
            if let Some(removed) = self.current.take() {
                info!(model_id = %id, "model deleted");
                return Ok(removed);
            }
        }
        let index = self
            .history
            .iter()
            .position(|m| &m.id == id)
            .ok_or_else(|| DownloadError::NotFound(id.clone()))?;
        info!(model_id = %id, "model deleted");
        Ok(self.history.remove(index))
    }

    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.clock.now_ms()).unwrap_or_default()
    }
}

fn model_name(file_name: &str) -> String {
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(file_name);
    format!("{stem} model")
}

fn slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Meshes come out several times larger than the source image.
fn estimated_model_size(source_bytes: u64) -> u64 {
    source_bytes.saturating_mul(6).max(1024 * 1024)
}

fn sample(
    id: &str,
    name: &str,
    image: &str,
    alt: &str,
    file_size: u64,
    created_at: (i32, u32, u32, u32, u32),
    download_url: Option<&str>,
) -> GeneratedModel {
    let (y, mo, d, h, mi) = created_at;
    GeneratedModel {
        id: ModelId::from(id),
        name: name.to_string(),
        preview_image: image.to_string(),
        preview_image_alt: alt.to_string(),
        file_size,
        created_at: Utc
            .with_ymd_and_hms(y, mo, d, h, mi, 0)
            .single()
            .unwrap_or_default(),
        download_url: download_url.map(str::to_string),
    }
}

fn sample_catalogue() -> Vec<GeneratedModel> {
    vec![
        sample(
            "model_2024_001",
            "Custom figurine model",
            "https://images.unsplash.com/photo-1733483363627-fcbd13ae1ebd",
            "3D printed figurine model with detailed surface texture and geometric patterns",
            15_728_640,
            (2024, 11, 9, 8, 45),
            Some("/downloads/custom-figurine-model.stl"),
        ),
        sample(
            "model_2024_002",
            "Miniature house",
            "https://images.unsplash.com/photo-1578999803415-318fb718973e",
            "Miniature house model with detailed architectural features and windows",
            8_945_120,
            (2024, 11, 8, 14, 20),
            None,
        ),
        sample(
            "model_2024_003",
            "Mechanical part prototype",
            "https://images.unsplash.com/photo-1625464659809-ec3a3f878f59",
            "Mechanical gear component with precise engineering details and metallic finish",
            12_582_912,
            (2024, 11, 7, 16, 45),
            None,
        ),
        sample(
            "model_2024_004",
            "Decorative planter",
            "https://images.unsplash.com/photo-1663888672535-956677e08412",
            "Decorative ceramic planter with geometric patterns and smooth curved surfaces",
            6_291_456,
            (2024, 11, 6, 10, 15),
            None,
        ),
        sample(
            "model_2024_005",
            "Smartphone case",
            "https://images.unsplash.com/photo-1640808653098-18d14a5b9b27",
            "Custom smartphone case with textured grip surface and precise camera cutouts",
            4_194_304,
            (2024, 11, 5, 9, 30),
            None,
        ),
        sample(
            "model_2024_006",
            "Art sculpture",
            "https://images.unsplash.com/photo-1678972903677-b3399c2f9844",
            "Abstract art sculpture with flowing organic curves and artistic surface details",
            18_874_368,
            (2024, 11, 4, 13, 22),
            None,
        ),
        sample(
            "model_2024_007",
            "Educational model",
            "https://images.unsplash.com/photo-1707863080685-177f4f6e850d",
            "Educational molecular model showing atomic structure with color-coded elements",
            7_340_032,
            (2024, 11, 3, 11, 18),
            None,
        ),
    ]
}
