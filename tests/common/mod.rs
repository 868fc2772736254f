#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use vpn_dash::executor::{CommandResult, CommandRunner, Invocation};

/// Replays fixed output per argv; anything unknown fails like a missing binary.
#[derive(Default)]
pub struct CannedRunner {
    responses: HashMap<Vec<String>, CommandResult>,
}

impl CannedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(mut self, argv: &[&str], stdout: &str) -> Self {
        self.responses.insert(
            argv.iter().map(|s| s.to_string()).collect(),
            CommandResult {
                succeeded: true,
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code: 0,
            },
        );
        self
    }

    pub fn exit(mut self, argv: &[&str], code: i32, stdout: &str) -> Self {
        self.responses.insert(
            argv.iter().map(|s| s.to_string()).collect(),
            CommandResult {
                succeeded: code == 0,
                stdout: stdout.to_string(),
                stderr: String::new(),
                exit_code: code,
            },
        );
        self
    }
}

#[async_trait]
impl CommandRunner for CannedRunner {
    async fn run(&self, invocation: &Invocation) -> CommandResult {
        match invocation {
            Invocation::Argv(args) => self.responses.get(args).cloned().unwrap_or_else(|| {
                CommandResult::failure("No such file or directory (os error 2)")
            }),
            Invocation::Shell(_) => CommandResult::failure("shell not available"),
        }
    }
}

pub const WG_SHOW: &str = "interface: wg0
  public key: SERVER=
  listening port: 51820

peer: PEER1=
  endpoint: 198.51.100.1:40000
  allowed ips: 10.0.0.2/32
  latest handshake: 12 seconds ago
  transfer: 1.23 KiB received, 2.34 KiB sent

peer: PEER2=
  allowed ips: 10.0.0.3/32
";

pub const OPENVPN_STATUS: &str = "OpenVPN CLIENT LIST
Updated,2024-01-01 00:00:00
CLIENT_LIST,alice,1.2.3.4:5,10.8.0.2,100,200,2024-01-01
CLIENT_LIST,bob,5.6.7.8:9,10.8.0.3,300,400
CLIENT_LIST,broken,1.1.1.1
ROUTING_TABLE,10.8.0.2,alice,1.2.3.4:5,2024-01-01
";

pub const IP_BR: &str = "lo               UNKNOWN        127.0.0.1/8 ::1/128
eth0             UP             192.0.2.10/24
wg0              UNKNOWN        10.0.0.1/24
";

pub const FREE: &str = "               total        used        free
Mem:         4000000     1000000     3000000
Swap:              0           0           0
";

pub const TOP: &str = "top - 10:00:00 up 1 day,  1 user,  load average: 0.00, 0.01, 0.05
Tasks: 100 total,   1 running
%Cpu(s):  4.2 us,  1.0 sy,  0.0 ni, 94.8 id
";

pub const DF: &str = "Filesystem      Size  Used Avail Use% Mounted on
/dev/vda1        40G   10G   30G  25% /
";
