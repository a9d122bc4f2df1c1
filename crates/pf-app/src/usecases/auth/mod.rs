mod callback;
mod session;

pub use callback::ReconcileAuthCallback;
pub use session::{AuthSession, AuthSessionError};
