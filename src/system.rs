use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::executor::{CommandRunner, Invocation};

/// One row of `ip -br addr show`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InterfaceInfo {
    pub name: String,
    pub status: String,
    pub ip: String,
}

/// Byte counters for one interface from `/proc/net/dev`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetDevCounters {
    pub bytes_received: u64,
    pub bytes_transmitted: u64,
}

/// Text after `load average:` in `uptime` output, e.g. `0.15, 0.10, 0.05`.
pub fn parse_load_average(uptime: &str) -> Option<String> {
    let (_, rest) = uptime.split_once("load average:")?;
    let rest = rest.trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

/// Used memory in percent from the `Mem:` row of `free`, rounded to one decimal.
pub fn parse_memory_percent(free: &str) -> Option<f64> {
    let row = free.lines().nth(1)?;
    let fields: Vec<&str> = row.split_whitespace().collect();
    let total: f64 = fields.get(1)?.parse().ok()?;
    let used: f64 = fields.get(2)?.parse().ok()?;
    if total <= 0.0 {
        return None;
    }
    Some((used * 1000.0 / total).round() / 10.0)
}

/// User CPU share token from `top -bn1`, as printed (not yet parsed as a number).
///
/// Handles both `%Cpu(s):  3.1 us, ...` and the older `Cpu(s):  3.1%us, ...`.
pub fn parse_cpu_usage(top: &str) -> Option<String> {
    let line = top.lines().find(|l| l.contains("Cpu(s)"))?;
    let token = line.split_whitespace().nth(1)?;
    Some(token.trim_end_matches("%us,").to_string())
}

/// Usage token of the first filesystem row of `df`, without the `%`.
pub fn parse_disk_usage(df: &str) -> Option<String> {
    let row = df.lines().nth(1)?;
    let token = row.split_whitespace().nth(4)?;
    Some(token.trim_end_matches('%').to_string())
}

/// Parse `ip -br addr show`, skipping `lo` and rows with fewer than three fields.
pub fn parse_interfaces(ip_output: &str) -> Vec<InterfaceInfo> {
    ip_output
        .lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 || parts[0] == "lo" {
                return None;
            }
            Some(InterfaceInfo {
                name: parts[0].to_string(),
                status: parts[1].to_string(),
                ip: parts[2].to_string(),
            })
        })
        .collect()
}

/// Receive/transmit byte counters for the named interfaces in `/proc/net/dev`.
pub fn parse_net_dev(proc_net_dev: &str, names: &[String]) -> BTreeMap<String, NetDevCounters> {
    let mut out = BTreeMap::new();
    for line in proc_net_dev.lines() {
        // `wg0: 123 ...` and, with large counters, `wg0:123 ...`
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };
        let name = name.trim();
        if !names.iter().any(|n| n == name) {
            continue;
        }
        let fields: Vec<&str> = counters.split_whitespace().collect();
        if fields.len() < 9 {
            continue;
        }
        let (Ok(rx), Ok(tx)) = (fields[0].parse::<u64>(), fields[8].parse::<u64>()) else {
            continue;
        };
        out.insert(
            name.to_string(),
            NetDevCounters {
                bytes_received: rx,
                bytes_transmitted: tx,
            },
        );
    }
    out
}

async fn probe_output(runner: &dyn CommandRunner, args: &[&str]) -> Option<String> {
    let res = runner.run(&Invocation::argv(args.iter().copied())).await;
    res.success_output().map(str::to_string)
}

/// `uptime -p`, e.g. `up 3 days, 2 hours`.
pub async fn probe_uptime(runner: &dyn CommandRunner) -> Option<String> {
    probe_output(runner, &["uptime", "-p"])
        .await
        .filter(|s| !s.is_empty())
}

pub async fn probe_load_average(runner: &dyn CommandRunner) -> Option<String> {
    let out = probe_output(runner, &["uptime"]).await?;
    parse_load_average(&out)
}

pub async fn probe_memory(runner: &dyn CommandRunner) -> Option<f64> {
    let out = probe_output(runner, &["free"]).await?;
    parse_memory_percent(&out)
}

pub async fn probe_cpu(runner: &dyn CommandRunner) -> Option<String> {
    let out = probe_output(runner, &["top", "-bn1"]).await?;
    parse_cpu_usage(&out)
}

pub async fn probe_disk(runner: &dyn CommandRunner) -> Option<String> {
    let out = probe_output(runner, &["df", "-h", "/"]).await?;
    parse_disk_usage(&out)
}

/// Non-loopback interfaces; empty when `ip` is unavailable.
pub async fn probe_interfaces(runner: &dyn CommandRunner) -> Vec<InterfaceInfo> {
    probe_output(runner, &["ip", "-br", "addr", "show"])
        .await
        .map(|out| parse_interfaces(&out))
        .unwrap_or_default()
}
