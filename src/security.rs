use serde::Serialize;
use tracing::debug;

use crate::config::AppConfig;
use crate::executor::{CommandRunner, Invocation};
use crate::services;

const AUTH_FAILURE_MARKER: &str = "authentication failure";
const AUTH_FAILURE_LIMIT: usize = 5;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Fail2banStatus {
    pub active: bool,
    /// Raw `fail2ban-client status` output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jails: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UfwStatus {
    pub active: bool,
    pub rules: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SecurityStatus {
    pub fail2ban: Fail2banStatus,
    pub ufw: UfwStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_auth_failures: Option<Vec<String>>,
}

/// Last `limit` lines mentioning an authentication failure, oldest first.
pub fn recent_auth_failures(auth_log: &str, limit: usize) -> Vec<String> {
    let matches: Vec<&str> = auth_log
        .lines()
        .filter(|l| l.contains(AUTH_FAILURE_MARKER))
        .collect();
    let skip = matches.len().saturating_sub(limit);
    matches[skip..].iter().map(|l| l.to_string()).collect()
}

pub async fn collect(runner: &dyn CommandRunner, config: &AppConfig) -> SecurityStatus {
    let (fail2ban, ufw, auth_log) = tokio::join!(
        fail2ban_status(runner, &config.services.fail2ban),
        ufw_status(runner),
        tokio::fs::read_to_string(&config.paths.auth_log),
    );

    let recent_auth_failures = match auth_log {
        Ok(text) => Some(recent_auth_failures(&text, AUTH_FAILURE_LIMIT)),
        Err(e) => {
            debug!(path = %config.paths.auth_log.display(), error = %e, "auth log unavailable");
            None
        }
    };

    SecurityStatus {
        fail2ban,
        ufw,
        recent_auth_failures,
    }
}

async fn fail2ban_status(runner: &dyn CommandRunner, unit: &str) -> Fail2banStatus {
    let active = services::probe_unit(runner, unit).await.active;
    let jails = if active {
        let res = runner
            .run(&Invocation::argv(["fail2ban-client", "status"]))
            .await;
        res.succeeded.then_some(res.stdout)
    } else {
        None
    };
    Fail2banStatus { active, jails }
}

async fn ufw_status(runner: &dyn CommandRunner) -> UfwStatus {
    let res = runner.run(&Invocation::argv(["ufw", "status"])).await;
    if !res.succeeded {
        return UfwStatus {
            active: false,
            rules: String::new(),
        };
    }
    UfwStatus {
        active: res.stdout.contains("Status: active"),
        rules: res.stdout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_last_five_failures() {
        let log: String = (1..=8)
            .map(|i| {
                format!("Jan 1 sshd[{i}]: pam_unix(sshd:auth): authentication failure; rhost=x\n")
            })
            .chain(std::iter::once("Jan 1 sshd: Accepted publickey\n".to_string()))
            .collect();
        let failures = recent_auth_failures(&log, 5);
        assert_eq!(failures.len(), 5);
        assert!(failures[0].contains("sshd[4]"));
        assert!(failures[4].contains("sshd[8]"));
    }

    #[test]
    fn no_failures_is_empty() {
        assert!(recent_auth_failures("all quiet\n", 5).is_empty());
    }
}
