//! Shared command context for CLI commands
//!
//! Extracts the setup shared by `watch` and `classify`.

use pr_phase_monitor::auth::get_github_auth;
use pr_phase_monitor::config::{Config, ConfigWatcher, default_config_path};
use pr_phase_monitor::error::Result;
use pr_phase_monitor::platform::{GitHubService, LiveDispatcher, NtfyNotifier};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Login GitHub uses for the coding agent when assigning issues
const AGENT_ASSIGNEE: &str = "Copilot";

/// Load the configuration, falling back to the default path
pub fn load_config(path: Option<&Path>) -> Result<(ConfigWatcher, Config)> {
    let path = path.map_or_else(default_config_path, Path::to_path_buf);
    debug!(path = %path.display(), "loading configuration");
    let mut watcher = ConfigWatcher::new(path);
    let config = watcher.load_initial()?;
    Ok((watcher, config))
}

/// Shared context for CLI commands that talk to GitHub
///
/// Authenticates up front so credential problems surface before any
/// polling starts.
pub struct CommandContext {
    /// Active configuration
    pub config: Config,
    /// Watches the configuration file
    pub watcher: ConfigWatcher,
    /// GitHub service, shared by the snapshot source and the dispatcher
    pub github: Arc<GitHubService>,
    /// Authenticated login
    pub login: String,
}

impl CommandContext {
    /// Create a new command context
    ///
    /// - Load configuration
    /// - Discover the token (env, then gh CLI)
    /// - Check the token against the API
    /// - Resolve the owners to watch (the viewer when none are configured)
    pub async fn new(config_path: Option<&Path>) -> Result<Self> {
        let (watcher, config) = load_config(config_path)?;

        let auth = get_github_auth().await?;
        debug!(source = ?auth.source, host = ?auth.host, "found GitHub token");

        let probe = GitHubService::new(&auth.token, auth.host.as_deref(), Vec::new())?;
        let login = probe.viewer_login().await?;
        info!(%login, "authenticated with GitHub");

        let owners = if config.owners.is_empty() {
            vec![login.clone()]
        } else {
            config.owners.clone()
        };
        let github = Arc::new(GitHubService::new(
            &auth.token,
            auth.host.as_deref(),
            owners,
        )?);

        Ok(Self {
            config,
            watcher,
            github,
            login,
        })
    }

    /// Dispatcher wired to this context's GitHub service
    pub fn dispatcher(&self) -> Result<LiveDispatcher> {
        let notifier = self.config.ntfy.as_ref().map(NtfyNotifier::new).transpose()?;
        Ok(LiveDispatcher::new(
            Arc::clone(&self.github),
            notifier,
            AGENT_ASSIGNEE,
        ))
    }
}
