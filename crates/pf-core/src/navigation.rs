//! Logical pages and navigation requests.

use serde::{Deserialize, Serialize};

use crate::download::CompletedRun;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Landing,
    Authentication,
    UploadWorkspace,
    ProcessingDashboard,
    DownloadCenter,
    AuthCallback,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Authentication => "/user-authentication",
            Route::UploadWorkspace => "/file-upload-workspace",
            Route::ProcessingDashboard => "/ai-processing-dashboard",
            Route::DownloadCenter => "/model-download-center",
            Route::AuthCallback => "/auth/callback",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        match path {
            "/" => Some(Route::Landing),
            "/user-authentication" => Some(Route::Authentication),
            "/file-upload-workspace" => Some(Route::UploadWorkspace),
            "/ai-processing-dashboard" => Some(Route::ProcessingDashboard),
            "/model-download-center" => Some(Route::DownloadCenter),
            "/auth/callback" => Some(Route::AuthCallback),
            _ => None,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Steps of the upload -> processing -> download journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    Upload,
    Processing,
    Download,
}

impl WorkflowStep {
    pub const ALL: [WorkflowStep; 3] = [
        WorkflowStep::Upload,
        WorkflowStep::Processing,
        WorkflowStep::Download,
    ];

    pub fn route(self) -> Route {
        match self {
            WorkflowStep::Upload => Route::UploadWorkspace,
            WorkflowStep::Processing => Route::ProcessingDashboard,
            WorkflowStep::Download => Route::DownloadCenter,
        }
    }

    pub fn for_route(route: Route) -> Option<WorkflowStep> {
        Self::ALL.into_iter().find(|step| step.route() == route)
    }

    /// Only completed steps and the current one can be revisited.
    pub fn is_reachable_from(self, current: WorkflowStep) -> bool {
        self <= current
    }
}

/// A navigation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Navigation {
    pub route: Route,
    /// Replace the current history entry instead of pushing.
    pub replace: bool,
    pub completed_run: Option<CompletedRun>,
}

impl Navigation {
    pub fn to(route: Route) -> Self {
        Self {
            route,
            replace: false,
            completed_run: None,
        }
    }

    pub fn replacing(mut self) -> Self {
        self.replace = true;
        self
    }

    pub fn with_completed_run(mut self, run: CompletedRun) -> Self {
        self.completed_run = Some(run);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_round_trip() {
        for route in [
            Route::Landing,
            Route::Authentication,
            Route::UploadWorkspace,
            Route::ProcessingDashboard,
            Route::DownloadCenter,
            Route::AuthCallback,
        ] {
            assert_eq!(Route::from_path(route.path()), Some(route));
        }
        assert_eq!(Route::from_path("/nope"), None);
    }

    #[test]
    fn workflow_steps_only_reach_backwards() {
        assert!(WorkflowStep::Upload.is_reachable_from(WorkflowStep::Processing));
        assert!(!WorkflowStep::Download.is_reachable_from(WorkflowStep::Processing));
        assert_eq!(
            WorkflowStep::for_route(Route::DownloadCenter),
            Some(WorkflowStep::Download)
        );
        assert_eq!(WorkflowStep::for_route(Route::Landing), None);
    }
}
