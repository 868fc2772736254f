use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::executor::{CommandRunner, Invocation};

/// Transfer counters as printed by `wg show`, units kept as text (e.g. `1.23 KiB`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub received: String,
    pub sent: String,
}

impl Default for Transfer {
    fn default() -> Self {
        Self {
            received: "0".to_string(),
            sent: "0".to_string(),
        }
    }
}

/// One `peer:` block of a `wg show` dump.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PeerRecord {
    pub public_key: String,
    pub endpoint: Option<String>,
    pub allowed_ips: Option<String>,
    pub latest_handshake: Option<String>,
    pub transfer: Transfer,
}

impl PeerRecord {
    fn new(public_key: &str) -> Self {
        Self {
            public_key: public_key.to_string(),
            endpoint: None,
            allowed_ips: None,
            latest_handshake: None,
            transfer: Transfer::default(),
        }
    }
}

/// Parse the human-readable output of `wg show <iface>` into peer records.
///
/// - `peer: <key>` opens a record, sealing the previous one.
/// - `endpoint:`, `allowed ips:`, `latest handshake:` and `transfer:` fill the open record.
/// - Anything before the first `peer:` line (the interface section) is ignored.
pub fn parse_peers(dump: &str) -> Vec<PeerRecord> {
    let mut peers = Vec::new();
    let mut current: Option<PeerRecord> = None;

    for raw_line in dump.lines() {
        let line = raw_line.trim();

        if let Some(key) = line.strip_prefix("peer:") {
            if let Some(done) = current.take() {
                peers.push(done);
            }
            current = Some(PeerRecord::new(key.trim_start()));
            continue;
        }

        let Some(peer) = current.as_mut() else {
            continue;
        };

        if let Some(v) = line.strip_prefix("endpoint:") {
            peer.endpoint = Some(v.trim_start().to_string());
        } else if let Some(v) = line.strip_prefix("allowed ips:") {
            peer.allowed_ips = Some(v.trim_start().to_string());
        } else if let Some(v) = line.strip_prefix("latest handshake:") {
            peer.latest_handshake = Some(v.trim_start().to_string());
        } else if let Some(v) = line.strip_prefix("transfer:") {
            if let Some(t) = parse_transfer(v.trim_start()) {
                peer.transfer = t;
            }
        }
    }

    peers.extend(current);
    peers
}

/// `"1.23 KiB received, 2.34 KiB sent"` -> `("1.23 KiB", "2.34 KiB")`.
fn parse_transfer(s: &str) -> Option<Transfer> {
    let (received, sent) = s.split_once(", ")?;
    let received = received.split(" received").next().unwrap_or(received);
    let sent = sent.split(" sent").next().unwrap_or(sent);
    Some(Transfer {
        received: received.to_string(),
        sent: sent.to_string(),
    })
}

/// Run `wg show <interface>` and parse its peers.
pub async fn dump_peers(runner: &dyn CommandRunner, interface: &str) -> Result<Vec<PeerRecord>> {
    let res = runner.run(&Invocation::argv(["wg", "show", interface])).await;
    if !res.succeeded {
        bail!("wg show {interface} failed: {}", res.stderr.trim());
    }
    Ok(parse_peers(&res.stdout))
}
