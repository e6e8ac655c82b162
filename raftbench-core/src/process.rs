//! Worker process lifecycle: build, spawn, terminate.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;

use thiserror::Error;
use tokio::process::{Child, Command};

use crate::topology::NodeDescriptor;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("worker binary {path} is missing and no build command was configured")]
    MissingBinary { path: String },
    #[error("failed to run build command `{command}`: {source}")]
    BuildSpawn { command: String, source: std::io::Error },
    #[error("build command `{command}` exited with {status}")]
    BuildFailed { command: String, status: std::process::ExitStatus },
    #[error("failed to spawn node {id}: {source}")]
    Spawn { id: u64, source: std::io::Error },
}

/// Location of the worker executable, plus the command that produces it when
/// it is not there yet. The build command is `[program, arg, arg, ...]`.
#[derive(Debug, Clone)]
pub struct WorkerBinary {
    pub path: PathBuf,
    pub build_command: Option<Vec<String>>,
}

impl WorkerBinary {
    pub fn new(path: impl Into<PathBuf>, build_command: Option<Vec<String>>) -> Self {
        Self { path: path.into(), build_command }
    }

    /// Make sure the binary exists, building it if we know how. A failure
    /// here is the one fatal error of a bootstrap run.
    pub async fn ensure_available(&self) -> Result<(), ProcessError> {
        if self.path.exists() {
            return Ok(());
        }

        let command = self
            .build_command
            .as_deref()
            .filter(|cmd| !cmd.is_empty())
            .ok_or_else(|| ProcessError::MissingBinary { path: self.path.display().to_string() })?;
        let rendered = command.join(" ");

        log::info!("worker binary missing, building: {}", rendered);
        let status = Command::new(&command[0])
            .args(&command[1..])
            .status()
            .await
            .map_err(|source| ProcessError::BuildSpawn { command: rendered.clone(), source })?;
        if !status.success() {
            return Err(ProcessError::BuildFailed { command: rendered, status });
        }

        if self.path.exists() {
            Ok(())
        } else {
            Err(ProcessError::MissingBinary { path: self.path.display().to_string() })
        }
    }

    /// Pattern for best-effort kills of stale workers. Anchored on the
    /// worker invocation shape so it cannot match the harness's own command
    /// line, which carries the binary path as an argument.
    pub fn kill_pattern(&self) -> String {
        let name = self.path.file_name().and_then(|n| n.to_str()).unwrap_or("raft-node");
        format!("{} --node-id", name)
    }
}

/// Spawns worker processes and keeps their handles addressable by node id,
/// so termination and crash detection are explicit operations rather than
/// pattern kills alone.
pub struct NodeProcessManager {
    binary: WorkerBinary,
    children: HashMap<u64, Child>,
}

impl NodeProcessManager {
    pub fn new(binary: WorkerBinary) -> Self {
        Self { binary, children: HashMap::new() }
    }

    pub fn binary(&self) -> &WorkerBinary {
        &self.binary
    }

    pub fn running(&self) -> usize {
        self.children.len()
    }

    /// Launch one worker process. Fire-and-forget: readiness is the address
    /// resolver's job, not ours.
    pub fn spawn(&mut self, node: &NodeDescriptor) -> Result<(), ProcessError> {
        let mut command = Command::new(&self.binary.path);
        command
            .arg("--node-id")
            .arg(node.id.to_string())
            .arg("--port")
            .arg(node.port.to_string());
        if !node.peer_ids.is_empty() {
            let peers: Vec<String> = node.peer_ids.iter().map(|p| p.to_string()).collect();
            command.arg("--peers").arg(peers.join(","));
        }

        let child = command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ProcessError::Spawn { id: node.id, source })?;

        log::info!("spawned node {} (control port {})", node.id, node.port);
        self.children.insert(node.id, child);
        Ok(())
    }

    /// Drop registry entries whose process has already exited and return
    /// their node ids.
    pub fn reap_exited(&mut self) -> Vec<u64> {
        let mut gone = Vec::new();
        for (id, child) in self.children.iter_mut() {
            if let Ok(Some(status)) = child.try_wait() {
                log::warn!("node {} exited with {}", id, status);
                gone.push(*id);
            }
        }
        for id in &gone {
            self.children.remove(id);
        }
        gone
    }

    /// Best-effort teardown: pattern-kill stale workers, then signal every
    /// registered child without waiting for it to exit. Processes that are
    /// already gone are not an error, and nothing here ever fails the
    /// caller.
    pub async fn terminate_all(&mut self, pattern: &str) {
        kill_by_pattern(pattern).await;

        for (id, child) in self.children.iter_mut() {
            if let Err(err) = child.start_kill() {
                log::warn!("could not kill node {}: {}", id, err);
            }
        }
        self.children.clear();
    }
}

/// Best-effort `pkill -f` of anything matching `pattern`. No match and no
/// pkill at all are both fine; the caller never sees a failure.
pub async fn kill_by_pattern(pattern: &str) {
    let result = Command::new("pkill").args(["-f", pattern]).output().await;
    if let Err(err) = result {
        log::warn!("pkill -f {} failed: {}", pattern, err);
    }
}

impl std::fmt::Debug for NodeProcessManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeProcessManager")
            .field("binary", &self.binary.path)
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .finish()
    }
}
