//! Failure taxonomy shown by the processing dashboard.
//!
//! Every kind maps to a fixed title, message and list of remediation
//! suggestions. `QuotaExceeded` is the only kind that cannot be retried.

use serde::{Deserialize, Serialize};

use crate::processing::ProcessingStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    FileFormat,
    FileSize,
    ProcessingFailed,
    NetworkError,
    ServerError,
    QuotaExceeded,
    Unknown,
}

/// Presentation details for a [`FailureKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FailureDetails {
    pub title: &'static str,
    pub message: &'static str,
    pub suggestions: &'static [&'static str],
    pub retryable: bool,
}

impl FailureKind {
    /// Kinds the fault injector may raise during a run.
    pub const INJECTABLE: [FailureKind; 3] = [
        FailureKind::ProcessingFailed,
        FailureKind::NetworkError,
        FailureKind::ServerError,
    ];

    pub fn as_code(self) -> &'static str {
        match self {
            FailureKind::FileFormat => "file_format",
            FailureKind::FileSize => "file_size",
            FailureKind::ProcessingFailed => "processing_failed",
            FailureKind::NetworkError => "network_error",
            FailureKind::ServerError => "server_error",
            FailureKind::QuotaExceeded => "quota_exceeded",
            FailureKind::Unknown => "unknown",
        }
    }

    /// Unrecognised codes map to `Unknown`.
    pub fn from_code(code: &str) -> Self {
        match code {
            "file_format" => FailureKind::FileFormat,
            "file_size" => FailureKind::FileSize,
            "processing_failed" => FailureKind::ProcessingFailed,
            "network_error" => FailureKind::NetworkError,
            "server_error" => FailureKind::ServerError,
            "quota_exceeded" => FailureKind::QuotaExceeded,
            _ => FailureKind::Unknown,
        }
    }

    pub fn is_retryable(self) -> bool {
        self.details().retryable
    }

    pub fn details(self) -> FailureDetails {
        match self {
            FailureKind::FileFormat => FailureDetails {
                title: "Unsupported file format",
                message: "The uploaded file is in an unsupported format. Only JPG, PNG and SVG files are supported.",
                suggestions: &[
                    "Convert the file to JPG, PNG or SVG",
                    "Make sure the file is not corrupted",
                    "Try again with a different file",
                ],
                retryable: true,
            },
            FailureKind::FileSize => FailureDetails {
                title: "File too large",
                message: "The uploaded file exceeds the maximum allowed size (10MB).",
                suggestions: &[
                    "Reduce the image dimensions",
                    "Lower the image quality",
                    "Try again with a different file",
                ],
                retryable: true,
            },
            FailureKind::ProcessingFailed => FailureDetails {
                title: "AI processing failed",
                message: "An error occurred while the AI was converting the image into a 3D model.",
                suggestions: &[
                    "Make sure the image is clear and sharp",
                    "Use an image with a simple background",
                    "Try again in a moment",
                ],
                retryable: true,
            },
            FailureKind::NetworkError => FailureDetails {
                title: "Network connection error",
                message: "There was a problem connecting to the server.",
                suggestions: &[
                    "Check your internet connection",
                    "Try again in a moment",
                    "Check your firewall settings",
                ],
                retryable: true,
            },
            FailureKind::ServerError => FailureDetails {
                title: "Server error",
                message: "The server ran into a temporary problem.",
                suggestions: &[
                    "Try again in a moment",
                    "Contact support if the problem persists",
                ],
                retryable: true,
            },
            FailureKind::QuotaExceeded => FailureDetails {
                title: "Processing limit reached",
                message: "You have used up today's free processing quota.",
                suggestions: &[
                    "Upgrade to the Pro plan for unlimited processing",
                    "Try again tomorrow",
                ],
                retryable: false,
            },
            FailureKind::Unknown => FailureDetails {
                title: "Unknown error",
                message: "An unexpected error occurred.",
                suggestions: &[
                    "Refresh the page",
                    "Try again in a moment",
                    "Contact support if the problem persists",
                ],
                retryable: true,
            },
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Error descriptor raised by fault injection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingFault {
    pub kind: FailureKind,
    pub stage: ProcessingStage,
    /// Diagnostic code, `ERR_<KIND>_<epoch ms>`.
    pub code: String,
    pub details: String,
}

impl ProcessingFault {
    pub fn new(kind: FailureKind, stage: ProcessingStage, raised_at_ms: i64) -> Self {
        Self {
            kind,
            stage,
            code: format!("ERR_{}_{}", kind.as_code().to_uppercase(), raised_at_ms),
            details: format!("Processing failed at stage: {}", stage),
        }
    }

    /// Support mail link carrying the diagnostic code.
    pub fn support_contact(&self, support_address: &str) -> String {
        format!(
            "mailto:{}?subject=Processing%20Error&body=Error%20Code:%20{}",
            support_address, self.code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_quota_exceeded_is_not_retryable() {
        let all = [
            FailureKind::FileFormat,
            FailureKind::FileSize,
            FailureKind::ProcessingFailed,
            FailureKind::NetworkError,
            FailureKind::ServerError,
            FailureKind::QuotaExceeded,
            FailureKind::Unknown,
        ];
        for kind in all {
            let details = kind.details();
            assert!(!details.title.is_empty());
            assert!(!details.message.is_empty());
            assert!(!details.suggestions.is_empty());
            assert_eq!(details.retryable, kind != FailureKind::QuotaExceeded, "{kind}");
            assert_eq!(kind.is_retryable(), details.retryable);
        }
    }

    #[test]
    fn codes_round_trip_and_unknown_falls_back() {
        for kind in FailureKind::INJECTABLE {
            assert_eq!(FailureKind::from_code(kind.as_code()), kind);
        }
        assert_eq!(FailureKind::from_code("gpu_melted"), FailureKind::Unknown);
    }

    #[test]
    fn fault_code_embeds_kind_and_timestamp() {
        let fault = ProcessingFault::new(
            FailureKind::NetworkError,
            ProcessingStage::Generating,
            1_731_141_900_000,
        );
        assert_eq!(fault.code, "ERR_NETWORK_ERROR_1731141900000");
        assert_eq!(fault.details, "Processing failed at stage: generating");
        assert!(fault
            .support_contact("support@printforge.ai")
            .ends_with("ERR_NETWORK_ERROR_1731141900000"));
    }
}
