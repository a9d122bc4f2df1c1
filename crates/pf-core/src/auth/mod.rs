//! Authentication domain: session model, OAuth callback parameters and
//! callback outcomes.

mod oauth_error;
mod outcome;
mod profile;
mod redirect;
mod session;

pub use oauth_error::{describe_oauth_start_error, OAuthErrorKind, ProviderError};
pub use outcome::{
    AuthCallbackOutcome, AuthCallbackResult, CallbackErrorKind, CallbackPhase, ScheduledRedirect,
};
pub use profile::{ProfileError, ProfileUpdate, UserProfile};
pub use redirect::{CallbackDebugInfo, CallbackParams};
pub use session::{
    AuthEvent, AuthStateChange, AuthUser, OAuthProvider, OAuthRequest, Session, SessionError,
    SignUpMetadata,
};
