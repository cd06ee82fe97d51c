//! PID file read/write/liveness helpers.
//!
//! Writes are atomic (temp file + rename) so a crash mid-write never
//! leaves a half-written PID file for the next `status`/`start` call to
//! misread.

use std::path::{Path, PathBuf};

use crate::error::{AgentdxError, Result};

pub fn read_pid(path: &Path) -> Result<Option<i32>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = std::fs::read_to_string(path).map_err(|e| AgentdxError::daemon(e.to_string()))?;
    let pid = raw
        .trim()
        .parse::<i32>()
        .map_err(|e| AgentdxError::daemon(format!("corrupt PID file: {e}")))?;
    Ok(Some(pid))
}

pub fn write_pid(path: &Path, pid: u32) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| AgentdxError::daemon(e.to_string()))?;
    }
    let tmp = tmp_path_for(path);
    std::fs::write(&tmp, pid.to_string()).map_err(|e| AgentdxError::daemon(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| AgentdxError::daemon(e.to_string()))?;
    Ok(())
}

pub fn remove_pid(path: &Path) -> Result<()> {
    if path.exists() {
        std::fs::remove_file(path).map_err(|e| AgentdxError::daemon(e.to_string()))?;
    }
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Signal-0 liveness check: `kill(pid, 0)` succeeds if the process exists
/// and we have permission to signal it. `EPERM` also means alive — the
/// process exists but is owned by another user. Non-positive PIDs are
/// always stale; `kill(0, _)`/`kill(-1, _)` target process groups or every
/// process, not the single PID this function is asked about.
#[cfg(unix)]
pub fn is_process_alive(pid: i32) -> bool {
    if pid <= 0 {
        return false;
    }
    let rc = unsafe { libc::kill(pid, 0) };
    if rc == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
pub fn is_process_alive(_pid: i32) -> bool {
    // Windows liveness would need OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION);
    // not implemented since this workspace targets POSIX hosts.
    false
}

#[cfg(unix)]
pub fn send_signal(pid: i32, signal: i32) -> Result<()> {
    let rc = unsafe { libc::kill(pid, signal) };
    if rc == 0 {
        Ok(())
    } else {
        Err(AgentdxError::daemon(format!(
            "kill({pid}, {signal}) failed: {}",
            std::io::Error::last_os_error()
        )))
    }
}

#[cfg(not(unix))]
pub fn send_signal(_pid: i32, _signal: i32) -> Result<()> {
    Err(AgentdxError::daemon("signaling processes is not implemented on this platform".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_read_pid_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agentdx.pid");
        write_pid(&path, 12345).unwrap();
        assert_eq!(read_pid(&path).unwrap(), Some(12345));
    }

    #[test]
    fn test_read_missing_pid_file_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.pid");
        assert_eq!(read_pid(&path).unwrap(), None);
    }

    #[test]
    fn test_remove_pid_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("agentdx.pid");
        write_pid(&path, 1).unwrap();
        remove_pid(&path).unwrap();
        remove_pid(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    #[cfg(unix)]
    fn test_current_process_is_alive() {
        let pid = std::process::id() as i32;
        assert!(is_process_alive(pid));
    }

    #[test]
    #[cfg(unix)]
    fn test_unlikely_pid_is_not_alive() {
        // PID 2^30 is outside any real process table on any host we target.
        assert!(!is_process_alive(1 << 30));
    }

    #[test]
    #[cfg(unix)]
    fn test_non_positive_pid_is_not_alive() {
        assert!(!is_process_alive(0));
        assert!(!is_process_alive(-1));
    }

    #[test]
    #[cfg(unix)]
    fn test_pid_one_is_alive_even_if_owned_by_another_user() {
        // init/systemd always exists; kill(1, 0) returns EPERM rather than
        // ESRCH when we lack permission, and that must still count as alive.
        assert!(is_process_alive(1));
    }
}
