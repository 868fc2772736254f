use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AppConfig;
use crate::executor::{CommandRunner, Invocation};

pub const DEFAULT_LINES: usize = 50;

/// Which log `/logs` tails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    WireGuard,
    OpenVpn,
    #[default]
    System,
    Security,
}

impl FromStr for LogKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "wireguard" => Ok(LogKind::WireGuard),
            "openvpn" => Ok(LogKind::OpenVpn),
            "system" => Ok(LogKind::System),
            "security" => Ok(LogKind::Security),
            _ => Err(format!("unknown log type: {s}")),
        }
    }
}

/// Last `lines` lines of the selected log with blank lines removed.
///
/// File-backed logs are only tailed if the file exists; a missing file or a
/// failing command yields an empty list.
pub async fn fetch(
    runner: &dyn CommandRunner,
    config: &AppConfig,
    kind: LogKind,
    lines: usize,
) -> Vec<String> {
    let n = lines.to_string();
    let invocation = match kind {
        LogKind::WireGuard => Invocation::argv([
            "journalctl",
            "-u",
            config.services.wireguard.as_str(),
            "--no-pager",
            "-n",
            n.as_str(),
        ]),
        LogKind::System => Invocation::argv(["journalctl", "--no-pager", "-n", n.as_str()]),
        LogKind::OpenVpn => match tail_invocation(&config.paths.openvpn_log, &n).await {
            Some(inv) => inv,
            None => return Vec::new(),
        },
        LogKind::Security => match tail_invocation(&config.paths.security_log, &n).await {
            Some(inv) => inv,
            None => return Vec::new(),
        },
    };

    let res = runner.run(&invocation).await;
    if !res.succeeded {
        debug!(?kind, stderr = %res.stderr.trim(), "log probe failed");
        return Vec::new();
    }
    non_blank_lines(&res.stdout)
}

async fn tail_invocation(path: &Path, n: &str) -> Option<Invocation> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        debug!(path = %path.display(), "log file not present");
        return None;
    }
    Some(Invocation::argv([
        "tail".to_string(),
        "-n".to_string(),
        n.to_string(),
        path.to_string_lossy().into_owned(),
    ]))
}

pub fn non_blank_lines(text: &str) -> Vec<String> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect()
}
