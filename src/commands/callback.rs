//! `printforge callback`: reconcile an OAuth redirect URL and follow the
//! scheduled redirect.

use std::time::Duration;

use pf_core::auth::{AuthCallbackOutcome, AuthCallbackResult};
use pf_core::navigation::Navigation;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::warn;

use crate::bootstrap::AppDeps;

/// Slack on top of the scheduled delay before giving up on the redirect.
const REDIRECT_GRACE: Duration = Duration::from_secs(1);

pub fn describe(outcome: &AuthCallbackOutcome) -> String {
    match outcome {
        AuthCallbackOutcome::Error { message, .. } => format!("error: {message}"),
        AuthCallbackOutcome::SessionFound { user } => {
            format!("signed in (existing session) as {}", display_user(user))
        }
        AuthCallbackOutcome::CodeExchanged { user } => {
            format!("signed in (code exchange) as {}", display_user(user))
        }
        AuthCallbackOutcome::TokenSet { user } => {
            format!("signed in (redirect tokens) as {}", display_user(user))
        }
        AuthCallbackOutcome::NoDataFound { message } => format!("error: {message}"),
    }
}

fn display_user(user: &pf_core::auth::AuthUser) -> String {
    user.email.clone().unwrap_or_else(|| user.id.to_string())
}

/// Runs the reconciler and waits for the one redirect it schedules.
pub async fn run(
    deps: &AppDeps,
    navigations: &mut UnboundedReceiver<Navigation>,
    callback_url: &str,
    json: bool,
) -> anyhow::Result<(AuthCallbackResult, Option<Navigation>)> {
    let reconciler = deps.auth_callback();
    let result = reconciler.execute(callback_url).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", describe(&result.outcome));
        println!(
            "redirect  {} in {}ms",
            result.redirect.route,
            result.redirect.delay.as_millis()
        );
    }

    let wait = result.redirect.delay + REDIRECT_GRACE;
    let navigation = match tokio::time::timeout(wait, navigations.recv()).await {
        Ok(navigation) => navigation,
        Err(_) => {
            warn!(route = %result.redirect.route, "scheduled redirect did not fire");
            reconciler.cancel_pending_redirect();
            None
        }
    };
    if let Some(navigation) = &navigation {
        println!("navigated {}", navigation.route.path());
    }
    Ok((result, navigation))
}
