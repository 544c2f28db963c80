//! Session configuration
//!
//! A [`Config`] describes the fake machine a session lands on (hostname,
//! account, initial environment) and where redirect staging copies go. It is
//! deserializable so deployments can keep it in a JSON file next to the
//! transport configuration.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::limits::Limits;
use crate::logging::LogConfig;

/// Default hostname shown in prompts and `uname -n`.
pub const DEFAULT_HOSTNAME: &str = "svr04";

/// Default login account.
pub const DEFAULT_USERNAME: &str = "root";

/// Default command search path.
pub const DEFAULT_PATH: &str = "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin";

/// Session configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hostname of the emulated machine.
    pub hostname: String,

    /// Account the client logged in as. `root` gets a `#` prompt.
    pub username: String,

    /// Home directory; derived from the username when absent.
    pub home: Option<String>,

    /// Identifier stamped on events and staging file names.
    pub session_id: String,

    /// Directory receiving on-disk staging copies of redirect targets.
    /// Staging is disabled when unset.
    pub download_path: Option<PathBuf>,

    /// Initial `PATH`.
    pub path: String,

    /// Extra initial environment variables.
    pub env: HashMap<String, String>,

    /// Resource limits.
    pub limits: Limits,

    /// Logging behavior.
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            home: None,
            session_id: chrono::Utc::now().format("%Y%m%d%H%M%S%6f").to_string(),
            download_path: None,
            path: DEFAULT_PATH.to_string(),
            env: HashMap::new(),
            limits: Limits::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hostname
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Set the login account
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the session identifier
    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = id.into();
        self
    }

    /// Enable on-disk staging copies of redirect targets
    pub fn download_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_path = Some(dir.into());
        self
    }

    /// Set resource limits
    pub fn limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Parse a JSON configuration document.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Home directory of the configured account.
    pub fn home_dir(&self) -> String {
        match &self.home {
            Some(home) => home.clone(),
            None if self.username == "root" => "/root".to_string(),
            None => format!("/home/{}", self.username),
        }
    }

    /// Whether the account is the superuser.
    pub fn is_root(&self) -> bool {
        self.username == "root"
    }

    /// The environment a fresh login shell starts with.
    pub fn initial_env(&self) -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("PATH".to_string(), self.path.clone());
        env.insert("HOME".to_string(), self.home_dir());
        env.insert("USER".to_string(), self.username.clone());
        env.insert("LOGNAME".to_string(), self.username.clone());
        env.insert("SHELL".to_string(), "/bin/bash".to_string());
        env.insert("HOSTNAME".to_string(), self.hostname.clone());
        env.insert("TERM".to_string(), "xterm-256color".to_string());
        for (key, value) in &self.env {
            env.insert(key.clone(), value.clone());
        }
        env
    }
}
