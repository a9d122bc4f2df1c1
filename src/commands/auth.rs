//! `printforge auth ...`: account commands against the configured backend.

use clap::Subcommand;
use pf_core::auth::ProfileUpdate;
use pf_core::navigation::Navigation;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::bootstrap::{AppDeps, BackendKind};
use crate::commands::callback;

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in with email and password
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    SignUp {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Start Google sign-in and print the provider URL
    Google,
    /// Send a password reset email
    ResetPassword {
        #[arg(long)]
        email: String,
    },
    /// Sign in, then show (and optionally update) the profile row
    Profile {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
}

pub async fn run(
    deps: &AppDeps,
    navigations: &mut UnboundedReceiver<Navigation>,
    command: AuthCommand,
) -> anyhow::Result<()> {
    let auth = deps.auth_session();
    let watcher = auth.spawn_watch();

    match command {
        AuthCommand::SignIn { email, password } => {
            let user = auth.sign_in(&email, &password).await?;
            println!("signed in as {} ({})", email, user.provider_or_email());
        }
        AuthCommand::SignUp {
            email,
            password,
            full_name,
            avatar_url,
        } => match auth
            .sign_up(&email, &password, &full_name, avatar_url.as_deref())
            .await?
        {
            Some(user) => println!("account created, signed in as {}", user.id),
            None => println!("account created, check {email} to confirm it"),
        },
        AuthCommand::Google => {
            let provider_url = auth.sign_in_with_google().await?;
            println!("open      {provider_url}");
            // The offline provider answers immediately. The hosted one needs the
            // redirect pasted back into this process, which holds the PKCE
            // verifier.
            let redirect = match deps.backend {
                BackendKind::InMemory => Some(provider_url),
                BackendKind::Supabase => {
                    println!("paste the URL you were redirected to:");
                    BufReader::new(tokio::io::stdin())
                        .lines()
                        .next_line()
                        .await?
                        .map(|line| line.trim().to_string())
                        .filter(|line| !line.is_empty())
                }
            };
            if let Some(redirect) = redirect {
                callback::run(deps, navigations, &redirect, false).await?;
            }
        }
        AuthCommand::ResetPassword { email } => {
            auth.reset_password(&email).await?;
            println!("password reset sent to {email}");
        }
        AuthCommand::Profile {
            email,
            password,
            full_name,
            avatar_url,
        } => {
            auth.sign_in(&email, &password).await?;
            let update = ProfileUpdate {
                full_name,
                avatar_url,
            };
            let profile = deps.update_profile().execute(&update).await?;
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }

    watcher.abort();
    Ok(())
}
