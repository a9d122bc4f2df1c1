use serde::{Deserialize, Serialize};

/// Ordered phases of the simulated processing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Analyzing,
    Generating,
    Optimizing,
    Finalizing,
}

impl ProcessingStage {
    pub const ALL: [ProcessingStage; 4] = [
        ProcessingStage::Analyzing,
        ProcessingStage::Generating,
        ProcessingStage::Optimizing,
        ProcessingStage::Finalizing,
    ];

    pub fn index(self) -> usize {
        match self {
            ProcessingStage::Analyzing => 0,
            ProcessingStage::Generating => 1,
            ProcessingStage::Optimizing => 2,
            ProcessingStage::Finalizing => 3,
        }
    }

    pub fn next(self) -> Option<ProcessingStage> {
        Self::ALL.get(self.index() + 1).copied()
    }

    /// Progress at which this stage becomes current.
    pub fn entry_threshold(self) -> f64 {
        match self {
            ProcessingStage::Analyzing => 0.0,
            ProcessingStage::Generating => 25.0,
            ProcessingStage::Optimizing => 60.0,
            ProcessingStage::Finalizing => 85.0,
        }
    }

    /// Returns the stage after applying `progress`.
    ///
    /// Moves at most one step forward per call.
    pub fn advance_for(self, progress: f64) -> ProcessingStage {
        match self.next() {
            Some(next) if progress >= next.entry_threshold() => next,
            _ => self,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStage::Analyzing => "analyzing",
            ProcessingStage::Generating => "generating",
            ProcessingStage::Optimizing => "optimizing",
            ProcessingStage::Finalizing => "finalizing",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProcessingStage::Analyzing => "Image analysis",
            ProcessingStage::Generating => "3D model generation",
            ProcessingStage::Optimizing => "Model optimization",
            ProcessingStage::Finalizing => "Finalizing",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ProcessingStage::Analyzing => "The AI is analyzing the uploaded image",
            ProcessingStage::Generating => "Generating OpenSCAD code",
            ProcessingStage::Optimizing => "Optimizing the 3D model",
            ProcessingStage::Finalizing => "Preparing the STL file",
        }
    }
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_strictly_ordered() {
        for pair in ProcessingStage::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].entry_threshold() < pair[1].entry_threshold());
            assert_eq!(pair[0].next(), Some(pair[1]));
        }
        assert_eq!(ProcessingStage::Finalizing.next(), None);
    }

    #[test]
    fn advance_moves_one_step_at_most() {
        assert_eq!(
            ProcessingStage::Analyzing.advance_for(24.9),
            ProcessingStage::Analyzing
        );
        assert_eq!(
            ProcessingStage::Analyzing.advance_for(25.0),
            ProcessingStage::Generating
        );
        assert_eq!(
            ProcessingStage::Analyzing.advance_for(99.0),
            ProcessingStage::Generating
        );
        assert_eq!(
            ProcessingStage::Optimizing.advance_for(85.0),
            ProcessingStage::Finalizing
        );
        assert_eq!(
            ProcessingStage::Finalizing.advance_for(100.0),
            ProcessingStage::Finalizing
        );
    }
}
