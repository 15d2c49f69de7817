//! API token resolution and first-run onboarding.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::ConfigError;
use crate::output::OutputContext;

/// Environment variable holding the Linode API token.
pub const TOKEN_ENV: &str = "LINODE_TOKEN";

/// Resolve the API token: environment first, interactive onboarding second.
///
/// # Errors
///
/// Returns [`ConfigError::TokenMissing`] when no token is set and the
/// session is non-interactive, or if the prompt fails.
pub fn resolve_token(ctx: &OutputContext) -> Result<String> {
    if let Ok(token) = std::env::var(TOKEN_ENV) {
        let token = token.trim().to_string();
        if !token.is_empty() {
            return Ok(token);
        }
    }
    if !ctx.is_tty {
        return Err(ConfigError::TokenMissing.into());
    }
    onboard(ctx)
}

/// First-run onboarding: prompt for a token and persist it in the shell
/// profile so future runs pick it up from the environment.
fn onboard(ctx: &OutputContext) -> Result<String> {
    ctx.header("Linode API token required");
    ctx.info("Create one at https://cloud.linode.com/profile/tokens (scopes: Linodes and Images, read/write)");
    let token = dialoguer::Password::new()
        .with_prompt("Paste your token")
        .interact()
        .context("reading token")?;
    let token = token.trim().to_string();
    anyhow::ensure!(!token.is_empty(), "no token provided");

    // A failed profile write is not fatal; the token still works for this run.
    match persist_token(&token) {
        Ok(path) => {
            ctx.success(&format!("token saved to {}", path.display()));
            ctx.info(&format!(
                "run 'source {}' or open a new terminal to pick it up",
                path.display()
            ));
        }
        Err(err) => ctx.warn(&format!(
            "could not save the token: {err:#}. Export {TOKEN_ENV} manually to avoid this prompt."
        )),
    }
    Ok(token)
}

/// Append an export line to the user's shell profile. Returns the path
/// written to.
fn persist_token(token: &str) -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    let shell = std::env::var("SHELL").unwrap_or_default();
    let path = profile_path(&home, &shell);
    append_export(&path, token)?;
    Ok(path)
}

/// Profile file for the login shell: `.zshrc` for zsh, `.bashrc` for bash,
/// `.profile` for anything else.
fn profile_path(home: &Path, shell: &str) -> PathBuf {
    if shell.ends_with("zsh") {
        home.join(".zshrc")
    } else if shell.ends_with("bash") {
        home.join(".bashrc")
    } else {
        home.join(".profile")
    }
}

fn append_export(path: &Path, token: &str) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    writeln!(file, "\n# agentvm\nexport {TOKEN_ENV}=\"{token}\"")
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
