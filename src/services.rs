use serde::{Deserialize, Serialize};

use crate::executor::{CommandRunner, Invocation};

/// Services whose systemd unit state is reported.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    WireGuard,
    OpenVpn,
    HaProxy,
    Fail2ban,
}

impl Service {
    pub const ALL: [Service; 4] = [
        Service::WireGuard,
        Service::OpenVpn,
        Service::HaProxy,
        Service::Fail2ban,
    ];
}

/// Activity of one service at snapshot time. `peers` / `clients` are only
/// filled for an active WireGuard / OpenVPN service.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceState {
    pub active: bool,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clients: Option<usize>,
}

/// `systemctl is-active <unit>`. A unit is active only if the command
/// succeeds and prints exactly `active`.
pub async fn probe_unit(runner: &dyn CommandRunner, unit: &str) -> ServiceState {
    let res = runner
        .run(&Invocation::argv(["systemctl", "is-active", unit]))
        .await;
    let status = res.stdout.trim().to_string();
    ServiceState {
        active: res.succeeded && status == "active",
        status,
        ..ServiceState::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_names_serialize_lowercase() {
        let names: Vec<String> = Service::ALL
            .iter()
            .map(|s| serde_json::to_string(s).unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["\"wireguard\"", "\"openvpn\"", "\"haproxy\"", "\"fail2ban\""]
        );
    }

    #[test]
    fn counts_are_omitted_when_absent() {
        let state = ServiceState {
            active: false,
            status: "inactive".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json, serde_json::json!({"active": false, "status": "inactive"}));
    }
}
