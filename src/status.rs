use std::collections::BTreeMap;

use serde::Serialize;
use time::{format_description::well_known, OffsetDateTime};
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::executor::CommandRunner;
use crate::services::{self, Service, ServiceState};
use crate::system::{self, InterfaceInfo};
use crate::{openvpn, wireguard};

#[derive(Serialize, Debug, Clone, PartialEq, Default)]
pub struct NetworkSummary {
    pub interfaces: Vec<InterfaceInfo>,
}

/// Aggregated server state for one `/status` request.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct StatusSnapshot {
    pub timestamp: String,
    pub services: BTreeMap<Service, ServiceState>,
    pub system: BTreeMap<String, String>,
    pub network: NetworkSummary,
}

/// Probe every service, system metric and interface and merge the results.
///
/// Probes run concurrently. A failed probe leaves its field out; this never fails.
pub async fn build_snapshot(runner: &dyn CommandRunner, config: &AppConfig) -> StatusSnapshot {
    let (wg, ovpn, haproxy, fail2ban, system, interfaces) = tokio::join!(
        probe_service(runner, config, Service::WireGuard),
        probe_service(runner, config, Service::OpenVpn),
        probe_service(runner, config, Service::HaProxy),
        probe_service(runner, config, Service::Fail2ban),
        probe_system(runner),
        system::probe_interfaces(runner),
    );

    let services = BTreeMap::from([
        (Service::WireGuard, wg),
        (Service::OpenVpn, ovpn),
        (Service::HaProxy, haproxy),
        (Service::Fail2ban, fail2ban),
    ]);

    StatusSnapshot {
        timestamp: now_rfc3339(),
        services,
        system,
        network: NetworkSummary { interfaces },
    }
}

async fn probe_service(
    runner: &dyn CommandRunner,
    config: &AppConfig,
    service: Service,
) -> ServiceState {
    let mut state = services::probe_unit(runner, config.services.unit(service)).await;
    if !state.active {
        return state;
    }

    match service {
        Service::WireGuard => {
            match wireguard::dump_peers(runner, &config.services.wireguard_interface).await {
                Ok(peers) => state.peers = Some(peers.len()),
                Err(e) => debug!(error = %e, "peer dump unavailable"),
            }
        }
        Service::OpenVpn => {
            let path = &config.paths.openvpn_status_log;
            match openvpn::read_status_log(path).await {
                Ok(Some(text)) => state.clients = Some(openvpn::parse_clients(&text).len()),
                Ok(None) => debug!(path = %path.display(), "no OpenVPN status log"),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read OpenVPN status log");
                    state.clients = Some(0);
                }
            }
        }
        Service::HaProxy | Service::Fail2ban => {}
    }
    state
}

async fn probe_system(runner: &dyn CommandRunner) -> BTreeMap<String, String> {
    let (uptime, load, memory, cpu) = tokio::join!(
        system::probe_uptime(runner),
        system::probe_load_average(runner),
        system::probe_memory(runner),
        system::probe_cpu(runner),
    );

    let mut metrics = BTreeMap::new();
    if let Some(v) = uptime {
        metrics.insert("uptime".to_string(), v);
    }
    if let Some(v) = load {
        metrics.insert("load_average".to_string(), v);
    }
    if let Some(v) = memory {
        metrics.insert("memory_usage".to_string(), format!("{v:.1}%"));
    }
    if let Some(v) = cpu {
        metrics.insert("cpu_usage".to_string(), format!("{v}%"));
    }
    metrics
}

pub(crate) fn now_rfc3339() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
