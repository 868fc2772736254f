use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One `CLIENT_LIST` row of an OpenVPN status log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub name: String,
    pub real_address: String,
    pub virtual_address: String,
    pub bytes_received: String,
    pub bytes_sent: String,
    pub connected_since: String,
}

/// Parse the `CLIENT_LIST` rows of a status log.
///
/// Rows with fewer than six comma-separated fields are skipped; other lines
/// (headers, `ROUTING_TABLE`, `GLOBAL_STATS`, ...) are ignored.
pub fn parse_clients(status_log: &str) -> Vec<ClientRecord> {
    status_log
        .lines()
        .filter(|line| line.starts_with("CLIENT_LIST"))
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(',').collect();
            if parts.len() < 6 {
                return None;
            }
            Some(ClientRecord {
                name: parts[1].to_string(),
                real_address: parts[2].to_string(),
                virtual_address: parts[3].to_string(),
                bytes_received: parts[4].to_string(),
                bytes_sent: parts[5].to_string(),
                connected_since: parts.get(6).copied().unwrap_or("N/A").to_string(),
            })
        })
        .collect()
}

/// Read the status log. `Ok(None)` means the file does not exist, which is
/// the normal state while no server has written one yet.
pub async fn read_status_log(path: &Path) -> io::Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Read and parse the status log; a missing file yields an empty list.
pub async fn load_clients(path: &Path) -> Result<Vec<ClientRecord>> {
    let text = read_status_log(path)
        .await
        .with_context(|| format!("failed to read OpenVPN status log: {}", path.display()))?;
    Ok(text.as_deref().map(parse_clients).unwrap_or_default())
}
