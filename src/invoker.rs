//! Conformance tool invocation
//!
//! Launches the external conformance runner against a staged program file
//! and observes its outcome under a wall-clock deadline. Every outcome is
//! a value; launch failures and timeouts never propagate as errors.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::ToolConfig;
use crate::protocol::RunResult;

/// Runs the conformance tool against a staged program
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Invoke the tool on `program_path`, waiting at most `timeout_secs`.
    async fn invoke(&self, program_path: &Path, timeout_secs: u64) -> RunResult;
}

/// Invoker backed by the real conformance runner binary
pub struct ConformanceInvoker {
    tools: ToolConfig,
}

impl ConformanceInvoker {
    pub fn new(tools: ToolConfig) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Invoker for ConformanceInvoker {
    async fn invoke(&self, program_path: &Path, timeout_secs: u64) -> RunResult {
        debug!(
            "Running conformance tool {} against {}",
            self.tools.runner.display(),
            program_path.display()
        );

        // Fixed argument template; the staged file path is the only
        // request-derived value reaching the argument vector.
        let mut cmd = Command::new(&self.tools.runner);
        cmd.arg("--test_file_path")
            .arg(program_path)
            .arg("--cpu_version")
            .arg(&self.tools.cpu_version)
            .arg("--exclude_regex")
            .arg(&self.tools.exclude_regex)
            .arg("--plugin_path")
            .arg(&self.tools.plugin)
            .arg("--debug")
            .arg("true")
            .arg("--plugin_options")
            .arg(format!("--include {}", self.tools.include_dir.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn conformance runner: {}", e);
                return RunResult::launch_failure(e);
            }
        };

        // kill_on_drop terminates the child when the deadline branch drops
        // the in-flight wait future.
        match tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            child.wait_with_output(),
        )
        .await
        {
            Ok(Ok(output)) => {
                let return_code = output.status.code().unwrap_or(-1);
                let stdout = String::from_utf8_lossy(&output.stdout).to_string();
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                debug!("Conformance runner exited with code {}", return_code);
                RunResult::completed(return_code, stdout, stderr)
            }
            Ok(Err(e)) => {
                warn!("Failed to wait for conformance runner: {}", e);
                RunResult::launch_failure(e)
            }
            Err(_) => {
                warn!("Conformance runner timed out after {}s", timeout_secs);
                RunResult::timed_out(timeout_secs)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::RunResult;
    use std::os::unix::fs::PermissionsExt;

    /// Stand in a shell script for the conformance runner binary
    fn stub_tools(dir: &Path, script: &str) -> ToolConfig {
        let runner = dir.join("stub_runner.sh");
        std::fs::write(&runner, format!("#!/bin/sh\n{}\n", script)).unwrap();
        let mut perms = std::fs::metadata(&runner).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&runner, perms).unwrap();

        ToolConfig {
            runner,
            plugin: dir.join("plugin"),
            include_dir: dir.join("include"),
            cpu_version: "v4".into(),
            exclude_regex: "lock".into(),
        }
    }

    #[tokio::test]
    async fn zero_exit_is_a_successful_completion() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = ConformanceInvoker::new(stub_tools(dir.path(), "echo all tests passed"));

        let result = invoker.invoke(&dir.path().join("prog.data"), 5).await;
        match result {
            RunResult::Completed {
                success,
                return_code,
                ref stdout,
                ..
            } => {
                assert!(success);
                assert_eq!(return_code, 0);
                assert_eq!(stdout, "all tests passed\n");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn nonzero_exit_completes_with_captured_output() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = ConformanceInvoker::new(stub_tools(
            dir.path(),
            "echo failing test 1>&2\nexit 7",
        ));

        let result = invoker.invoke(&dir.path().join("prog.data"), 5).await;
        match result {
            RunResult::Completed {
                success,
                return_code,
                ref stderr,
                ..
            } => {
                assert!(!success);
                assert_eq!(return_code, 7);
                assert_eq!(stderr, "failing test\n");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn staged_path_is_passed_to_the_runner() {
        let dir = tempfile::tempdir().unwrap();
        // The test-file path is the second argument of the fixed template.
        let invoker = ConformanceInvoker::new(stub_tools(dir.path(), "echo \"$2\""));

        let program_path = dir.path().join("prog.data");
        let result = invoker.invoke(&program_path, 5).await;
        match result {
            RunResult::Completed { ref stdout, .. } => {
                assert_eq!(stdout.trim_end(), program_path.to_str().unwrap());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn deadline_expiry_is_a_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let invoker = ConformanceInvoker::new(stub_tools(dir.path(), "sleep 10"));

        let result = invoker.invoke(&dir.path().join("prog.data"), 1).await;
        assert_eq!(result, RunResult::timed_out(1));
    }

    #[tokio::test]
    async fn missing_runner_is_a_launch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut tools = stub_tools(dir.path(), "exit 0");
        tools.runner = dir.path().join("no_such_runner");
        let invoker = ConformanceInvoker::new(tools);

        let result = invoker.invoke(&dir.path().join("prog.data"), 5).await;
        match result {
            RunResult::LaunchFailure { ref error, .. } => {
                assert!(error.starts_with("Failed to run conformance test:"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
