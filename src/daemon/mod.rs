//! Single-instance daemon lifecycle: start/stop/status for the background
//! `agentdx watch --daemon` process, guarded by a PID file under
//! `.agentdx/`.

pub mod pidfile;

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{LOG_DIR_NAME, LOG_FILE_NAME, PID_FILE_NAME};
use crate::error::{AgentdxError, Result};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state")]
pub enum DaemonStatus {
    Running {
        pid: i32,
        start_time: String,
        log_path: PathBuf,
    },
    Stopped,
}

pub struct DaemonManager {
    root: PathBuf,
    state_dir: PathBuf,
}

impl DaemonManager {
    pub fn new(root: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state_dir: state_dir.into(),
        }
    }

    fn pid_path(&self) -> PathBuf {
        self.state_dir.join(PID_FILE_NAME)
    }

    fn log_path(&self) -> PathBuf {
        self.state_dir.join(LOG_DIR_NAME).join(LOG_FILE_NAME)
    }

    /// Current daemon status, reconciling a stale PID file (process no
    /// longer alive) by removing it and reporting `Stopped`.
    pub fn status(&self) -> Result<DaemonStatus> {
        let pid_path = self.pid_path();
        match pidfile::read_pid(&pid_path)? {
            Some(pid) if pidfile::is_process_alive(pid) => {
                let start_time = std::fs::metadata(&pid_path)
                    .and_then(|m| m.modified())
                    .map(|mtime| DateTime::<Utc>::from(mtime).to_rfc3339())
                    .unwrap_or_else(|_| "unknown".to_string());
                Ok(DaemonStatus::Running {
                    pid,
                    start_time,
                    log_path: self.log_path(),
                })
            }
            Some(_stale) => {
                pidfile::remove_pid(&pid_path)?;
                Ok(DaemonStatus::Stopped)
            }
            None => Ok(DaemonStatus::Stopped),
        }
    }

    /// Spawn `agentdx watch --daemon` detached into its own process
    /// group, record its PID, and return it. Errors if a live daemon is
    /// already running for this project.
    pub fn start(&self, extra_args: &[String]) -> Result<u32> {
        if let DaemonStatus::Running { pid, .. } = self.status()? {
            return Err(AgentdxError::daemon(format!(
                "daemon already running (pid {pid})"
            )));
        }

        let exe = std::env::current_exe().map_err(|e| AgentdxError::daemon(e.to_string()))?;
        let mut command = Command::new(exe);
        command
            .arg("watch")
            .arg("--daemon")
            .arg(&self.root)
            .args(extra_args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command
            .spawn()
            .map_err(|e| AgentdxError::daemon(format!("spawning watch process: {e}")))?;

        let pid = child.id();
        pidfile::write_pid(&self.pid_path(), pid)?;
        // The spawned process outlives this handle; explicitly forget it
        // rather than letting Child::drop implicitly detach.
        std::mem::forget(child);
        Ok(pid)
    }

    /// Stop the running daemon: SIGTERM, wait briefly for exit, then
    /// SIGKILL if `force` or the process is still alive after the grace
    /// period.
    pub fn stop(&self, force: bool) -> Result<()> {
        let pid_path = self.pid_path();
        let Some(pid) = pidfile::read_pid(&pid_path)? else {
            return Err(AgentdxError::daemon(
                "no daemon is running for this project".to_string(),
            ));
        };

        if !pidfile::is_process_alive(pid) {
            pidfile::remove_pid(&pid_path)?;
            return Ok(());
        }

        if force {
            pidfile::send_signal(pid, libc::SIGKILL)?;
        } else {
            pidfile::send_signal(pid, libc::SIGTERM)?;
            let deadline = std::time::Instant::now() + Duration::from_secs(5);
            while std::time::Instant::now() < deadline {
                if !pidfile::is_process_alive(pid) {
                    break;
                }
                std::thread::sleep(Duration::from_millis(100));
            }
            if pidfile::is_process_alive(pid) {
                pidfile::send_signal(pid, libc::SIGKILL)?;
            }
        }

        pidfile::remove_pid(&pid_path)?;
        Ok(())
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_status_stopped_when_no_pid_file() {
        let dir = tempdir().unwrap();
        let manager = DaemonManager::new(dir.path(), dir.path());
        assert!(matches!(manager.status().unwrap(), DaemonStatus::Stopped));
    }

    #[test]
    fn test_status_reports_running_for_current_process() {
        let dir = tempdir().unwrap();
        let manager = DaemonManager::new(dir.path(), dir.path());
        pidfile::write_pid(&manager.pid_path(), std::process::id()).unwrap();
        assert!(matches!(
            manager.status().unwrap(),
            DaemonStatus::Running { .. }
        ));
    }

    #[test]
    fn test_status_clears_stale_pid_file() {
        let dir = tempdir().unwrap();
        let manager = DaemonManager::new(dir.path(), dir.path());
        pidfile::write_pid(&manager.pid_path(), 1 << 30).unwrap();
        assert!(matches!(manager.status().unwrap(), DaemonStatus::Stopped));
        assert!(!manager.pid_path().exists());
    }

    #[test]
    fn test_stop_without_running_daemon_errors() {
        let dir = tempdir().unwrap();
        let manager = DaemonManager::new(dir.path(), dir.path());
        assert!(manager.stop(false).is_err());
    }
}
