use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ModelId;

/// Summary handed from the processing dashboard to the download center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedRun {
    pub file_name: String,
    pub file_size: u64,
    pub processing_time_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedModel {
    pub id: ModelId,
    pub name: String,
    pub preview_image: String,
    pub preview_image_alt: String,
    /// Size in bytes.
    pub file_size: u64,
    pub created_at: DateTime<Utc>,
    pub download_url: Option<String>,
}

impl GeneratedModel {
    /// Downloads are always delivered as STL.
    pub fn download_file_name(&self) -> String {
        format!("{}.stl", self.name)
    }
}

/// What the browser needs to start a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadTicket {
    pub model_id: ModelId,
    pub file_name: String,
    pub url: String,
}

/// Formats a byte count as `"<value> <unit>"` with up to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_common_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(15_728_640), "15 MB");
        assert_eq!(format_file_size(2_457_600), "2.34 MB");
    }

    #[test]
    fn download_name_uses_stl_extension() {
        let model = GeneratedModel {
            id: ModelId::from("model_2024_001"),
            name: "Custom figurine".to_string(),
            preview_image: String::new(),
            preview_image_alt: String::new(),
            file_size: 1,
            created_at: Utc::now(),
            download_url: None,
        };
        assert_eq!(model.download_file_name(), "Custom figurine.stl");
    }
}
