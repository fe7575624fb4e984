//! Remote path syntax and the remote command channel.
//!
//! Paths on remote hosts are written `/<method>:<host>:/abs/path`, e.g.
//! `/ssh:build-box:/srv/data/locate.db` (the host part may carry `user@`).
//! [`RemotePath::parse`] classifies a path; [`to_local_form`] strips the
//! connection prefix, yielding the path as the remote host itself sees it.
//!
//! The transport is behind the [`RemoteShell`] trait so the pipeline never
//! talks to ssh directly. The default [`SshShell`] wraps every command in an
//! OpenSSH invocation with a shared control connection, so one persistent
//! channel per host is opened and reused serially.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::process::{spawn_streaming, RunningProcess};

/// A parsed remote path: method, host, and the path on that host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    pub method: String,
    pub host: String,
    pub path: String,
}

impl RemotePath {
    /// Parse `/<method>:<host>:/abs/path`. Returns `None` for local paths.
    pub fn parse(raw: &str) -> Option<RemotePath> {
        let rest = raw.strip_prefix('/')?;
        let (method, rest) = rest.split_once(':')?;
        let (host, path) = rest.split_once(':')?;
        if method.is_empty() || host.is_empty() || !path.starts_with('/') {
            return None;
        }
        if method.contains('/') || host.contains('/') {
            return None;
        }
        Some(RemotePath {
            method: method.to_string(),
            host: host.to_string(),
            path: path.to_string(),
        })
    }
}

pub fn is_remote(path: &str) -> bool {
    RemotePath::parse(path).is_some()
}

/// Strip the connection prefix from a remote path; identity for local paths.
pub fn to_local_form(path: &str) -> String {
    match RemotePath::parse(path) {
        Some(remote) => remote.path,
        None => path.to_string(),
    }
}

/// Captured result of a short remote command.
#[derive(Debug)]
pub struct ShellOutput {
    pub stdout: String,
    pub exit_code: i32,
}

/// Command channel to one remote host.
///
/// `output` runs a short command and captures it; `stream` runs a staged
/// process whose output is consumed incrementally. Implementations own the
/// connection lifecycle; callers issue commands serially.
#[async_trait]
pub trait RemoteShell: Send + Sync {
    fn host(&self) -> &str;
    async fn output(&self, command: &str) -> Result<ShellOutput>;
    async fn stream(&self, command: &str) -> Result<RunningProcess>;
}

/// OpenSSH-backed [`RemoteShell`]. A ControlMaster socket keeps one
/// connection per host alive across the resolver calls and both pipeline
/// stages; each command is still issued serially over it.
pub struct SshShell {
    host: String,
    control_path: PathBuf,
}

impl SshShell {
    pub fn new(remote: &RemotePath) -> SshShell {
        let socket_name = format!(
            "dblocate-{}.sock",
            remote.host.replace(['@', ':'], "-")
        );
        SshShell {
            host: remote.host.clone(),
            control_path: std::env::temp_dir().join(socket_name),
        }
    }

    fn command(&self, remote_command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg("ControlMaster=auto")
            .arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()))
            .arg("-o")
            .arg("ControlPersist=60")
            .arg(&self.host)
            .arg(remote_command);
        cmd
    }
}

#[async_trait]
impl RemoteShell for SshShell {
    fn host(&self) -> &str {
        &self.host
    }

    async fn output(&self, command: &str) -> Result<ShellOutput> {
        debug!(host = self.host.as_str(), command, "remote command");
        let out = self
            .command(command)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run `{}` on {}", command, self.host))?;
        Ok(ShellOutput {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            exit_code: out.status.code().unwrap_or(-1),
        })
    }

    async fn stream(&self, command: &str) -> Result<RunningProcess> {
        debug!(host = self.host.as_str(), command, "remote stream");
        spawn_streaming(self.command(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_path() {
        let remote = RemotePath::parse("/ssh:builder:/data/locate.db").unwrap();
        assert_eq!(remote.method, "ssh");
        assert_eq!(remote.host, "builder");
        assert_eq!(remote.path, "/data/locate.db");
    }

    #[test]
    fn host_may_carry_user() {
        let remote = RemotePath::parse("/scp:deploy@web1:/var/www").unwrap();
        assert_eq!(remote.host, "deploy@web1");
        assert_eq!(remote.path, "/var/www");
    }

    #[test]
    fn local_paths_are_not_remote() {
        assert!(RemotePath::parse("/data/locate.db").is_none());
        assert!(RemotePath::parse("relative/path").is_none());
        assert!(RemotePath::parse("/ssh:host:relative").is_none());
        assert!(!is_remote("/home/user"));
    }

    #[test]
    fn to_local_form_strips_prefix() {
        assert_eq!(to_local_form("/ssh:host:/data/locate.db"), "/data/locate.db");
        assert_eq!(to_local_form("/data/locate.db"), "/data/locate.db");
    }
}
