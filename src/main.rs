//! forgedeck CLI - a small command-line client for self-hosted code forges.
//!
//! Thin wiring over the library: session bootstrap, login/logout, and a
//! few read commands that exercise the authenticated/public endpoint
//! routing.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use forgedeck::api::AccessResolver;
use forgedeck::{ApiClient, Config, SessionController, SessionStore};

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn usage() {
    eprintln!("Usage: forgedeck <command>");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  login <username> [--session-only]   Log in (--session-only skips persistence)");
    eprintln!("  logout                              Log out and clear stored credentials");
    eprintln!("  whoami                              Show the current session");
    eprintln!("  repo <owner>/<name>                 Show a repository");
    eprintln!("  issues <owner>/<name>               List a repository's issues");
    eprintln!("  keys                                List your SSH keys");
    eprintln!("  sync                                Fetch profile, repositories and keys");
}

/// Everything a command needs: config, API client, and an initialized
/// session.
struct AppContext {
    config: Config,
    client: ApiClient,
    store: SessionStore,
    controller: SessionController,
}

impl AppContext {
    async fn build() -> Result<Self> {
        let config = Config::load()?;
        let server_url = config.server_url()?;
        let store = SessionStore::new(Config::session_dir(&server_url)?)?;
        let client = ApiClient::new(&server_url)?;
        let mut controller = SessionController::new(store.clone(), client.clone());
        controller.init().await;

        Ok(Self {
            config,
            client,
            store,
            controller,
        })
    }

    fn resolver(&self) -> AccessResolver {
        AccessResolver::new(self.client.clone(), self.controller.handle())
    }

    /// Client carrying the current bearer token, for the
    /// authenticated-only surface.
    fn authenticated_client(&self) -> Result<ApiClient> {
        match self.controller.handle().bearer_token() {
            Some(token) => Ok(self.client.with_token(token)),
            None => bail!("Not logged in. Run `forgedeck login <username>` first"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("help");

    match command {
        "login" => {
            let Some(username) = args.get(2).filter(|a| !a.starts_with("--")) else {
                bail!("Usage: forgedeck login <username> [--session-only]");
            };
            let session_only = args.iter().any(|a| a == "--session-only");
            cmd_login(username, session_only).await
        }
        "logout" => cmd_logout().await,
        "whoami" => cmd_whoami().await,
        "repo" => cmd_repo(&require_repo_arg(&args)?).await,
        "issues" => cmd_issues(&require_repo_arg(&args)?).await,
        "keys" => cmd_keys().await,
        "sync" => cmd_sync().await,
        _ => {
            usage();
            Ok(())
        }
    }
}

fn require_repo_arg(args: &[String]) -> Result<(String, String)> {
    let target = args
        .get(2)
        .context("Expected a repository as <owner>/<name>")?;
    match target.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => bail!("Expected a repository as <owner>/<name>, got '{}'", target),
    }
}

fn prompt_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut password = String::new();
    io::stdin()
        .lock()
        .read_line(&mut password)
        .context("Failed to read password")?;
    Ok(password.trim_end_matches(['\r', '\n']).to_string())
}

async fn cmd_login(username: &str, session_only: bool) -> Result<()> {
    let mut ctx = AppContext::build().await?;
    let password = prompt_password()?;

    let response = ctx
        .client
        .login(username, &password)
        .await
        .map_err(|e| anyhow::anyhow!("Login failed: {}", e))?;

    if !session_only {
        // Keep the full profile from the login response; the session
        // controller prefers it over the partial token-derived one.
        ctx.store.set_profile(&response.user);
    }

    if !ctx.controller.login(
        &response.token,
        response.refresh_token.as_deref(),
        !session_only,
    ) {
        bail!("Server returned an unusable token");
    }

    ctx.config.last_username = Some(username.to_string());
    ctx.config.save()?;

    info!(username = username, "login complete");
    println!("Logged in as {}", response.user.display());
    ctx.controller.shutdown();
    Ok(())
}

async fn cmd_logout() -> Result<()> {
    let mut ctx = AppContext::build().await?;
    ctx.controller.logout();
    println!("Logged out");
    ctx.controller.shutdown();
    Ok(())
}

async fn cmd_whoami() -> Result<()> {
    let mut ctx = AppContext::build().await?;
    let session = ctx.controller.session();

    match session.user {
        Some(ref user) if session.is_authenticated => {
            println!("Logged in as {}", user.display())
        }
        _ => match session.auth_error {
            Some(ref message) => println!("Not logged in: {}", message),
            None => println!("Not logged in"),
        },
    }
    ctx.controller.shutdown();
    Ok(())
}

async fn cmd_repo((owner, name): &(String, String)) -> Result<()> {
    let mut ctx = AppContext::build().await?;
    let repo = ctx
        .resolver()
        .repository(owner, name)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("{} ({})", repo.full_name(), repo.visibility_label());
    if let Some(ref description) = repo.description {
        println!("  {}", description);
    }
    if let Some(ref branch) = repo.default_branch {
        println!("  default branch: {}", branch);
    }
    if let Some(stars) = repo.stars_count {
        println!("  stars: {}", stars);
    }
    ctx.controller.shutdown();
    Ok(())
}

async fn cmd_issues((owner, name): &(String, String)) -> Result<()> {
    let mut ctx = AppContext::build().await?;
    let issues = ctx
        .resolver()
        .issues(owner, name)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if issues.is_empty() {
        println!("No issues");
    }
    for issue in &issues {
        println!("{}", issue.summary_line());
    }
    ctx.controller.shutdown();
    Ok(())
}

async fn cmd_keys() -> Result<()> {
    let mut ctx = AppContext::build().await?;
    let client = ctx.authenticated_client()?;
    let keys = client
        .ssh_keys()
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    if keys.is_empty() {
        println!("No SSH keys registered");
    }
    for key in &keys {
        println!("{}", key.summary_line());
    }
    ctx.controller.shutdown();
    Ok(())
}

async fn cmd_sync() -> Result<()> {
    let mut ctx = AppContext::build().await?;
    let client = ctx.authenticated_client()?;

    let (user_res, repos_res, keys_res) = tokio::join!(
        client.current_user(),
        client.own_repositories(),
        client.ssh_keys(),
    );

    match user_res {
        Ok(user) => println!("Profile: {}", user.display()),
        Err(e) => eprintln!("Failed to fetch profile: {}", e),
    }
    match repos_res {
        Ok(repos) => {
            println!("Repositories: {}", repos.len());
            for repo in &repos {
                println!("  {} ({})", repo.full_name(), repo.visibility_label());
            }
        }
        Err(e) => eprintln!("Failed to fetch repositories: {}", e),
    }
    match keys_res {
        Ok(keys) => println!("SSH keys: {}", keys.len()),
        Err(e) => eprintln!("Failed to fetch SSH keys: {}", e),
    }

    ctx.controller.shutdown();
    Ok(())
}
