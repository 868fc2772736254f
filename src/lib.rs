//! Library crate for vpn-dash-rs: host probes, text parsers and the HTTP facade.
pub mod backup;
pub mod config;
pub mod error;
pub mod executor;
pub mod logs;
pub mod openvpn;
pub mod performance;
pub mod security;
pub mod server;
pub mod services;
pub mod status;
pub mod system;
pub mod wireguard;
