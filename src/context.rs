//! Execution contexts: where executables resolve and processes run.
//!
//! A context is selected once per request from the database path —
//! [`LocalContext`] for plain paths, [`RemoteContext`] for
//! `/<method>:<host>:` tagged ones — and every resolver call and spawn for
//! that request goes through it.

use anyhow::Result;
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

use crate::process::{spawn_streaming, RunningProcess};
use crate::remote::{to_local_form, RemotePath, RemoteShell, SshShell};

/// The environment in which commands are resolved and run: the local
/// machine or a specific remote host.
#[async_trait]
pub trait ExecutionContext: Send + Sync {
    /// `"local"` or the remote host name; used for banners and surface tags.
    fn label(&self) -> &str;

    fn is_remote(&self) -> bool;

    /// Locate `name` in this context. Absence is not an error.
    async fn find_executable(&self, name: &str) -> Option<String>;

    /// Existence check for a path, tagged or plain.
    async fn file_exists(&self, path: &str) -> bool;

    /// Run a program with an argument vector.
    async fn spawn_program(&self, program: &str, args: &[String]) -> Result<RunningProcess>;

    /// Run a full shell command line.
    async fn spawn_shell(&self, command: &str) -> Result<RunningProcess>;
}

/// Pick the execution context for a database path.
pub fn context_for(database_path: &str) -> Arc<dyn ExecutionContext> {
    match RemotePath::parse(database_path) {
        Some(remote) => Arc::new(RemoteContext::new(Arc::new(SshShell::new(&remote)))),
        None => Arc::new(LocalContext),
    }
}

pub struct LocalContext;

#[async_trait]
impl ExecutionContext for LocalContext {
    fn label(&self) -> &str {
        "local"
    }

    fn is_remote(&self) -> bool {
        false
    }

    async fn find_executable(&self, name: &str) -> Option<String> {
        let path_var = std::env::var_os("PATH")?;
        find_in_path(name, &path_var)
    }

    async fn file_exists(&self, path: &str) -> bool {
        tokio::fs::metadata(path).await.is_ok()
    }

    async fn spawn_program(&self, program: &str, args: &[String]) -> Result<RunningProcess> {
        debug!(program, "spawning local process");
        let mut cmd = Command::new(program);
        cmd.args(args);
        spawn_streaming(cmd)
    }

    async fn spawn_shell(&self, command: &str) -> Result<RunningProcess> {
        debug!(command, "spawning local shell pipeline");
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        spawn_streaming(cmd)
    }
}

fn find_in_path(name: &str, path_var: &OsStr) -> Option<String> {
    for dir in std::env::split_paths(path_var) {
        let candidate = dir.join(name);
        if is_executable(&candidate) {
            return Some(candidate.to_string_lossy().to_string());
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Context bound to one remote host through a [`RemoteShell`] channel.
pub struct RemoteContext {
    shell: Arc<dyn RemoteShell>,
    label: String,
}

impl RemoteContext {
    pub fn new(shell: Arc<dyn RemoteShell>) -> RemoteContext {
        let label = shell.host().to_string();
        RemoteContext { shell, label }
    }
}

#[async_trait]
impl ExecutionContext for RemoteContext {
    fn label(&self) -> &str {
        &self.label
    }

    fn is_remote(&self) -> bool {
        true
    }

    async fn find_executable(&self, name: &str) -> Option<String> {
        let out = self.shell.output(&format!("which {}", name)).await.ok()?;
        if out.exit_code != 0 {
            return None;
        }
        out.stdout
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }

    async fn file_exists(&self, path: &str) -> bool {
        let probe = format!("test -e {}", to_local_form(path));
        matches!(self.shell.output(&probe).await, Ok(out) if out.exit_code == 0)
    }

    async fn spawn_program(&self, program: &str, args: &[String]) -> Result<RunningProcess> {
        // Verbatim join; argument values are not escaped (see the command
        // module on the injection surface).
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        debug!(host = self.label.as_str(), command = line.as_str(), "spawning remote process");
        self.shell.stream(&line).await
    }

    async fn spawn_shell(&self, command: &str) -> Result<RunningProcess> {
        debug!(host = self.label.as_str(), command, "spawning remote shell pipeline");
        self.shell.stream(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::ProcessEvent;
    use crate::remote::ShellOutput;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct FakeShell {
        which_reply: Option<(String, i32)>,
        commands: Mutex<Vec<String>>,
    }

    impl FakeShell {
        fn new(which_reply: Option<(String, i32)>) -> FakeShell {
            FakeShell {
                which_reply,
                commands: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl RemoteShell for FakeShell {
        fn host(&self) -> &str {
            "fakehost"
        }

        async fn output(&self, command: &str) -> Result<ShellOutput> {
            self.commands.lock().unwrap().push(command.to_string());
            let (stdout, exit_code) = self
                .which_reply
                .clone()
                .unwrap_or((String::new(), 1));
            Ok(ShellOutput { stdout, exit_code })
        }

        async fn stream(&self, command: &str) -> Result<RunningProcess> {
            self.commands.lock().unwrap().push(command.to_string());
            let (tx, rx) = mpsc::channel(4);
            tx.send(ProcessEvent::Exited(0)).await.unwrap();
            Ok(RunningProcess::from_receiver(rx))
        }
    }

    #[tokio::test]
    async fn remote_which_takes_first_nonempty_line() {
        let shell = FakeShell::new(Some(("\n/usr/bin/locate\n/opt/locate\n".to_string(), 0)));
        let ctx = RemoteContext::new(Arc::new(shell));
        assert_eq!(
            ctx.find_executable("locate").await,
            Some("/usr/bin/locate".to_string())
        );
    }

    #[tokio::test]
    async fn remote_which_failure_is_absent() {
        let shell = FakeShell::new(Some((String::new(), 1)));
        let ctx = RemoteContext::new(Arc::new(shell));
        assert_eq!(ctx.find_executable("locate").await, None);
    }

    #[tokio::test]
    async fn remote_exists_probe_uses_local_form() {
        let shell = Arc::new(FakeShell::new(Some((String::new(), 0))));
        let ctx = RemoteContext::new(shell.clone());
        assert!(ctx.file_exists("/ssh:fakehost:/data/locate.db").await);
        let commands = shell.commands.lock().unwrap();
        assert_eq!(commands.as_slice(), ["test -e /data/locate.db"]);
    }

    #[test]
    fn find_in_path_picks_first_executable() {
        use std::os::unix::fs::PermissionsExt;
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        // Only the copy in dir_b is executable.
        std::fs::write(dir_a.path().join("mytool"), "plain file").unwrap();
        let exe = dir_b.path().join("mytool");
        std::fs::write(&exe, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let path_var =
            std::env::join_paths([dir_a.path(), dir_b.path()]).unwrap();
        assert_eq!(
            find_in_path("mytool", &path_var),
            Some(exe.to_string_lossy().to_string())
        );
        assert_eq!(find_in_path("missing", &path_var), None);
    }

    #[test]
    fn context_selection_follows_path_tag() {
        assert!(!context_for("/data/locate.db").is_remote());
        assert!(context_for("/ssh:host:/data/locate.db").is_remote());
    }
}
