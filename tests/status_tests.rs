use vpn_dash::config::AppConfig;
use vpn_dash::services::Service;
use vpn_dash::status::build_snapshot;

mod common;
use common::CannedRunner;

fn config_with_status_log(path: &std::path::Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.paths.openvpn_status_log = path.to_path_buf();
    config
}

#[tokio::test]
async fn every_probe_failing_still_yields_all_sections() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_status_log(&dir.path().join("missing.log"));
    let snapshot = build_snapshot(&CannedRunner::new(), &config).await;

    assert_eq!(snapshot.services.len(), 4);
    assert!(snapshot.services.values().all(|s| !s.active));
    assert!(snapshot.system.is_empty());
    assert!(snapshot.network.interfaces.is_empty());

    let json = serde_json::to_value(&snapshot).unwrap();
    for key in ["timestamp", "services", "system", "network"] {
        assert!(json.get(key).is_some(), "missing {key}");
    }
    assert_eq!(json["network"]["interfaces"], serde_json::json!([]));
}

#[tokio::test]
async fn healthy_host_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("openvpn-status.log");
    std::fs::write(&log, common::OPENVPN_STATUS).unwrap();
    let config = config_with_status_log(&log);

    let runner = CannedRunner::new()
        .ok(&["systemctl", "is-active", "wg-quick@wg0"], "active\n")
        .ok(&["wg", "show", "wg0"], common::WG_SHOW)
        .ok(&["systemctl", "is-active", "openvpn@server"], "active\n")
        .exit(&["systemctl", "is-active", "haproxy"], 3, "inactive\n")
        .ok(&["uptime", "-p"], "up 2 days, 3 hours\n")
        .ok(
            &["uptime"],
            " 10:00:00 up 2 days,  3:00,  1 user,  load average: 0.00, 0.01, 0.05\n",
        )
        .ok(&["free"], common::FREE)
        .ok(&["top", "-bn1"], common::TOP)
        .ok(&["ip", "-br", "addr", "show"], common::IP_BR);

    let snapshot = build_snapshot(&runner, &config).await;

    let wg = &snapshot.services[&Service::WireGuard];
    assert!(wg.active);
    assert_eq!(wg.peers, Some(2));

    let ovpn = &snapshot.services[&Service::OpenVpn];
    assert!(ovpn.active);
    assert_eq!(ovpn.clients, Some(2));

    let haproxy = &snapshot.services[&Service::HaProxy];
    assert!(!haproxy.active);
    assert_eq!(haproxy.status, "inactive");

    assert_eq!(snapshot.system["uptime"], "up 2 days, 3 hours");
    assert_eq!(snapshot.system["load_average"], "0.00, 0.01, 0.05");
    assert_eq!(snapshot.system["memory_usage"], "25.0%");
    assert_eq!(snapshot.system["cpu_usage"], "4.2%");

    let names: Vec<&str> = snapshot
        .network
        .interfaces
        .iter()
        .map(|i| i.name.as_str())
        .collect();
    assert_eq!(names, vec!["eth0", "wg0"]);
}

#[tokio::test]
async fn inactive_services_get_no_counts() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("openvpn-status.log");
    std::fs::write(&log, common::OPENVPN_STATUS).unwrap();
    let config = config_with_status_log(&log);

    let runner = CannedRunner::new()
        .exit(&["systemctl", "is-active", "wg-quick@wg0"], 3, "inactive\n")
        .ok(&["wg", "show", "wg0"], common::WG_SHOW)
        .ok(&["systemctl", "is-active", "openvpn@server"], "activating\n");

    let snapshot = build_snapshot(&runner, &config).await;
    assert_eq!(snapshot.services[&Service::WireGuard].peers, None);
    let ovpn = &snapshot.services[&Service::OpenVpn];
    assert!(!ovpn.active);
    assert_eq!(ovpn.status, "activating");
    assert_eq!(ovpn.clients, None);
}

#[tokio::test]
async fn active_openvpn_without_status_log_has_no_client_count() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_with_status_log(&dir.path().join("absent.log"));
    let runner = CannedRunner::new().ok(&["systemctl", "is-active", "openvpn@server"], "active\n");

    let snapshot = build_snapshot(&runner, &config).await;
    let ovpn = &snapshot.services[&Service::OpenVpn];
    assert!(ovpn.active);
    assert_eq!(ovpn.clients, None);
}

#[tokio::test]
async fn unreadable_status_log_counts_zero_clients() {
    let dir = tempfile::tempdir().unwrap();
    // A directory in place of the log makes the read fail with something other than NotFound.
    let config = config_with_status_log(dir.path());
    let runner = CannedRunner::new()
        .ok(&["systemctl", "is-active", "wg-quick@wg0"], "active\n")
        .ok(&["wg", "show", "wg0"], common::WG_SHOW)
        .ok(&["systemctl", "is-active", "openvpn@server"], "active\n");

    let snapshot = build_snapshot(&runner, &config).await;
    assert_eq!(snapshot.services[&Service::WireGuard].peers, Some(2));
    let ovpn = &snapshot.services[&Service::OpenVpn];
    assert!(ovpn.active);
    assert_eq!(ovpn.clients, Some(0));
}

#[tokio::test]
async fn failed_peer_dump_leaves_count_absent() {
    let config = AppConfig::default();
    let runner = CannedRunner::new().ok(&["systemctl", "is-active", "wg-quick@wg0"], "active\n");

    let snapshot = build_snapshot(&runner, &config).await;
    let wg = &snapshot.services[&Service::WireGuard];
    assert!(wg.active);
    assert_eq!(wg.peers, None);
}
