//! Service status queries
//!
//! Privileged, request-triggered lookups against the host's process-control
//! utility (`systemctl`). Every external invocation runs under its own
//! bounded timeout and shares no state with the sampling loops. A missing
//! utility or a per-service failure is reported as text, never fatal.

use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Upper bound for one `systemctl` invocation
pub const STATUS_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Rejected before anything reaches the shell
    #[error("invalid service name: {0:?}")]
    InvalidName(String),

    /// Caller lacks the privilege the command requires
    #[error("this command is restricted to administrators")]
    Unauthorized,
}

/// Explicit authorization check performed before privileged command
/// dispatch.
pub fn ensure_authorized(admin_only: bool, caller_is_admin: bool) -> Result<(), ServiceError> {
    if admin_only && !caller_is_admin {
        return Err(ServiceError::Unauthorized);
    }
    Ok(())
}

/// Validate a service name and strip an optional `.service` suffix.
///
/// Only alphanumerics, underscores, and hyphens are accepted; anything else
/// is rejected before it can reach the process-control utility.
pub fn validate_service_name(raw: &str) -> Result<String, ServiceError> {
    let name = raw.strip_suffix(".service").unwrap_or(raw);
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(ServiceError::InvalidName(raw.to_string()));
    }
    Ok(name.to_string())
}

/// Query one service's status, folding every failure mode into the returned
/// text.
pub async fn service_status(raw_name: &str) -> String {
    let name = match validate_service_name(raw_name) {
        Ok(name) => name,
        Err(e) => return e.to_string(),
    };

    let mut command = Command::new("systemctl");
    command
        .args(["status", &name, "--no-pager", "--lines=3"])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = match tokio::time::timeout(STATUS_TIMEOUT, command.output()).await {
        Err(_) => return format!("{name}: status query timed out"),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return "systemctl is not available on this host".to_string();
        }
        Ok(Err(e)) => return format!("{name}: failed to query status: {e}"),
        Ok(Ok(output)) => output,
    };

    debug!(service = %name, code = ?output.status.code(), "systemctl status finished");

    // systemctl exits non-zero for inactive/failed units but still prints a
    // useful report; prefer stdout, fall back to stderr.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = stdout.trim();
    if text.is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            return format!("{name}: no status output");
        }
        return format!("{name}: {stderr}");
    }
    text.to_string()
}

/// Query a list of services; one text block per service, failures included
/// in place so one bad service never aborts the rest.
pub async fn services_status(names: &[String]) -> Vec<String> {
    let mut blocks = Vec::with_capacity(names.len());
    for name in names {
        blocks.push(service_status(name).await);
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names_accepted() {
        assert_eq!(validate_service_name("nginx").unwrap(), "nginx");
        assert_eq!(validate_service_name("my-app_1").unwrap(), "my-app_1");
        assert_eq!(validate_service_name("sshd.service").unwrap(), "sshd");
    }

    #[test]
    fn test_hostile_names_rejected() {
        assert!(validate_service_name("../etc/passwd").is_err());
        assert!(validate_service_name("rm -rf").is_err());
        assert!(validate_service_name("a;b").is_err());
        assert!(validate_service_name("").is_err());
        assert!(validate_service_name(".service").is_err());
    }

    #[test]
    fn test_authorization_gate() {
        assert!(ensure_authorized(true, true).is_ok());
        assert!(ensure_authorized(false, false).is_ok());
        assert_eq!(
            ensure_authorized(true, false),
            Err(ServiceError::Unauthorized)
        );
    }

    #[tokio::test]
    async fn test_invalid_name_is_reported_as_text() {
        let text = service_status("rm -rf").await;
        assert!(text.contains("invalid service name"));
    }

    #[tokio::test]
    async fn test_bad_service_does_not_abort_the_rest() {
        let names = vec!["../etc/passwd".to_string(), "rm -rf".to_string()];
        let blocks = services_status(&names).await;
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.contains("invalid service name")));
    }
}
