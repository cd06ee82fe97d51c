//! `agentdx doctor`: real environment checks replacing the teacher's stub.

use std::path::Path;

use serde::Serialize;

use crate::config::Config;
use crate::container::ContainerSupervisor;
use crate::daemon::{pidfile, DaemonManager};

#[derive(Debug, Clone, Serialize)]
struct CheckResult {
    name: String,
    ok: bool,
    detail: String,
}

#[derive(Debug, Clone, Serialize)]
struct DoctorReport {
    checks: Vec<CheckResult>,
    healthy: bool,
}

pub async fn run(root: &Path, json: bool) -> crate::error::Result<()> {
    let mut checks = Vec::new();

    match ContainerSupervisor::ensure_docker_available() {
        Ok(()) => checks.push(CheckResult {
            name: "docker".into(),
            ok: true,
            detail: "docker CLI is reachable".into(),
        }),
        Err(e) => checks.push(CheckResult {
            name: "docker".into(),
            ok: false,
            detail: e.to_string(),
        }),
    }

    let config_result = Config::load(root);
    match &config_result {
        Ok(config) => {
            checks.push(CheckResult {
                name: "config".into(),
                ok: true,
                detail: format!("project '{}' (slug {})", config.project_name, config.slug),
            });

            let supervisor = ContainerSupervisor::new(config.container.clone(), &config.slug);
            match supervisor.ensure_running().await {
                Ok(()) => checks.push(CheckResult {
                    name: "postgres".into(),
                    ok: true,
                    detail: format!("reachable at {}", supervisor.database_url()),
                }),
                Err(e) => checks.push(CheckResult {
                    name: "postgres".into(),
                    ok: false,
                    detail: e.to_string(),
                }),
            }
        }
        Err(e) => checks.push(CheckResult {
            name: "config".into(),
            ok: false,
            detail: format!("project not initialized ({e}); run `agentdx init`"),
        }),
    }

    let state_dir = Config::state_dir(root);
    let pid_path = state_dir.join(crate::constants::PID_FILE_NAME);
    match pidfile::read_pid(&pid_path) {
        Ok(Some(pid)) if pidfile::is_process_alive(pid) => checks.push(CheckResult {
            name: "daemon".into(),
            ok: true,
            detail: format!("running (pid {pid})"),
        }),
        Ok(Some(pid)) => checks.push(CheckResult {
            name: "daemon".into(),
            ok: true,
            detail: format!("stale PID file for pid {pid} will be cleared on next status check"),
        }),
        Ok(None) => checks.push(CheckResult {
            name: "daemon".into(),
            ok: true,
            detail: "not running".into(),
        }),
        Err(e) => checks.push(CheckResult {
            name: "daemon".into(),
            ok: false,
            detail: e.to_string(),
        }),
    }
    let _ = DaemonManager::new(root, &state_dir);

    let healthy = checks.iter().all(|c| c.ok);
    let report = DoctorReport { checks, healthy };

    if json {
        println!("{}", serde_json::to_string(&report).unwrap_or_default());
    } else {
        for check in &report.checks {
            let marker = if check.ok { "ok" } else { "FAIL" };
            crate::info_print!("[{marker}] {}: {}", check.name, check.detail);
        }
        if report.healthy {
            crate::info_print!("All checks passed.");
        } else {
            crate::warn_print!("Some checks failed.");
        }
    }

    Ok(())
}
