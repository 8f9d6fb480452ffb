//! Startup configuration for the execution service
//!
//! Tool locations and fixed invocation options are deployment constants,
//! resolved once from the environment at process start. Nothing here is
//! ever derived from request input.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

/// Locations and fixed options of the external conformance tool
#[derive(Debug, Clone)]
pub struct ToolConfig {
    /// Conformance runner executable
    pub runner: PathBuf,
    /// Plugin binary handed to the runner
    pub plugin: PathBuf,
    /// Include directory passed through the plugin options
    pub include_dir: PathBuf,
    /// CPU/feature version the runner targets
    pub cpu_version: String,
    /// Regex of test names the runner skips
    pub exclude_regex: String,
}

impl ToolConfig {
    /// Check that the configured binaries exist. Called once at startup;
    /// fails fast so a misconfigured deployment never serves requests.
    pub fn ensure_tools_available(&self) -> Result<()> {
        if !self.runner.exists() {
            bail!("Conformance runner not found at {}", self.runner.display());
        }
        if !self.plugin.exists() {
            bail!("Conformance plugin not found at {}", self.plugin.display());
        }
        Ok(())
    }
}

/// Service configuration loaded from the environment
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Address the HTTP listener binds to
    pub listen_addr: SocketAddr,
    /// Deadline applied when a request does not name one, in seconds
    pub default_timeout_secs: u64,
    /// External tool configuration
    pub tools: ToolConfig,
}

impl BridgeConfig {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Result<Self> {
        let listen_addr = std::env::var("BRIDGE_LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:5000".into())
            .parse()
            .context("Invalid BRIDGE_LISTEN_ADDR")?;

        let default_timeout_secs = match std::env::var("BRIDGE_DEFAULT_TIMEOUT_SECS") {
            Ok(raw) => raw
                .parse()
                .context("Invalid BRIDGE_DEFAULT_TIMEOUT_SECS")?,
            Err(_) => crate::protocol::DEFAULT_TIMEOUT_SECS,
        };
        if default_timeout_secs == 0 {
            bail!("BRIDGE_DEFAULT_TIMEOUT_SECS must be positive");
        }

        let runner = std::env::var("CONFORMANCE_RUNNER")
            .unwrap_or_else(|_| "/usr/local/bin/bpf_conformance_runner".into())
            .into();
        let plugin = std::env::var("CONFORMANCE_PLUGIN")
            .unwrap_or_else(|_| "/usr/local/bin/bpf2c_plugin".into())
            .into();
        let include_dir = std::env::var("CONFORMANCE_INCLUDE_DIR")
            .unwrap_or_else(|_| "/usr/local/include/bpf_conformance".into())
            .into();
        let cpu_version =
            std::env::var("CONFORMANCE_CPU_VERSION").unwrap_or_else(|_| "v4".into());
        let exclude_regex =
            std::env::var("CONFORMANCE_EXCLUDE_REGEX").unwrap_or_else(|_| "lock".into());

        Ok(Self {
            listen_addr,
            default_timeout_secs,
            tools: ToolConfig {
                runner,
                plugin,
                include_dir,
                cpu_version,
                exclude_regex,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tools_in(dir: &std::path::Path) -> ToolConfig {
        ToolConfig {
            runner: dir.join("runner"),
            plugin: dir.join("plugin"),
            include_dir: dir.join("include"),
            cpu_version: "v4".into(),
            exclude_regex: "lock".into(),
        }
    }

    #[test]
    fn missing_runner_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools_in(dir.path());
        let err = tools.ensure_tools_available().unwrap_err();
        assert!(err.to_string().contains("Conformance runner not found"));
    }

    #[test]
    fn missing_plugin_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools_in(dir.path());
        std::fs::write(&tools.runner, "").unwrap();
        let err = tools.ensure_tools_available().unwrap_err();
        assert!(err.to_string().contains("Conformance plugin not found"));
    }

    #[test]
    fn present_tools_pass_validation() {
        let dir = tempfile::tempdir().unwrap();
        let tools = tools_in(dir.path());
        std::fs::write(&tools.runner, "").unwrap();
        std::fs::write(&tools.plugin, "").unwrap();
        tools.ensure_tools_available().unwrap();
    }
}
