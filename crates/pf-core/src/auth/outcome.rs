use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{AuthUser, CallbackDebugInfo, OAuthErrorKind};
use crate::navigation::Route;

/// Step the callback reconciler is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackPhase {
    Initializing,
    ProviderError,
    CheckingSession,
    ExchangingCode,
    CheckingToken,
    NoData,
}

impl CallbackPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            CallbackPhase::Initializing => "initializing",
            CallbackPhase::ProviderError => "provider_error",
            CallbackPhase::CheckingSession => "checking_session",
            CallbackPhase::ExchangingCode => "exchanging_code",
            CallbackPhase::CheckingToken => "checking_token",
            CallbackPhase::NoData => "no_data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackErrorKind {
    Provider(OAuthErrorKind),
    SessionQuery,
    CodeExchange,
    TokenSet,
    /// The URL itself could not be parsed.
    Unexpected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AuthCallbackOutcome {
    Error {
        kind: CallbackErrorKind,
        message: String,
    },
    SessionFound {
        user: AuthUser,
    },
    CodeExchanged {
        user: AuthUser,
    },
    TokenSet {
        user: AuthUser,
    },
    NoDataFound {
        message: String,
    },
}

impl AuthCallbackOutcome {
    pub const NO_DATA_MESSAGE: &'static str = "No authentication data was found.\n\n\
         Possible causes:\n\
         1. The OAuth flow did not complete\n\
         2. Supabase configuration problem\n\
         3. Network connectivity problem\n\n\
         Please try signing in again.";

    pub fn no_data() -> Self {
        AuthCallbackOutcome::NoDataFound {
            message: Self::NO_DATA_MESSAGE.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.user().is_some()
    }

    pub fn user(&self) -> Option<&AuthUser> {
        match self {
            AuthCallbackOutcome::SessionFound { user }
            | AuthCallbackOutcome::CodeExchanged { user }
            | AuthCallbackOutcome::TokenSet { user } => Some(user),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            AuthCallbackOutcome::Error { message, .. }
            | AuthCallbackOutcome::NoDataFound { message } => Some(message),
            _ => None,
        }
    }
}

/// The single delayed navigation every callback outcome ends with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRedirect {
    pub route: Route,
    pub delay: Duration,
    pub replace: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCallbackResult {
    pub outcome: AuthCallbackOutcome,
    pub debug: CallbackDebugInfo,
    pub redirect: ScheduledRedirect,
}
