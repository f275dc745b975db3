//! Typed model of the appliance configuration document.
//!
//! This mirrors the fixed shape of a pfSense `config.xml`: a `system`
//! block, the LAN interface, the LAN DHCP range, and the repeated
//! `user`/`group`/`staticmap` entries. Instances are ephemeral — decoded
//! from the wire or a local snapshot, optionally validated or mutated, and
//! either dropped or re-encoded and pushed. They own no external resources.

use serde::Serialize;

/// Root of the typed configuration tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigDocument {
    pub system: System,
    pub interfaces: Interfaces,
    pub dhcpd: Dhcpd,
    /// Always a sequence, even when the wire document holds one `<user>`.
    pub users: Vec<User>,
    /// Always a sequence, even when the wire document holds one `<group>`.
    pub groups: Vec<Group>,
    /// Always a sequence, even when the wire document holds one `<staticmap>`.
    pub static_maps: Vec<StaticMap>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct System {
    pub hostname: String,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interfaces {
    pub lan: LanInterface,
}

/// The LAN interface assignment.
///
/// `ipaddr` is usually a dotted-quad IPv4 address but may be a sentinel
/// such as `dhcp` when the address is managed dynamically by the appliance;
/// sentinels are exempt from strict address parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanInterface {
    pub ipaddr: String,
    /// CIDR prefix length of the LAN network.
    pub subnet: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dhcpd {
    pub lan: DhcpdLan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DhcpdLan {
    pub range: DhcpRange,
}

/// DHCP pool endpoints. Both ends are optional; when present and parseable
/// they are IPv4 addresses inside the LAN subnet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DhcpRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// A local account on the appliance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct User {
    pub name: String,
    pub uid: Option<String>,
    pub scope: Option<String>,
    pub descr: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Group {
    pub name: String,
    pub gid: Option<String>,
    pub description: Option<String>,
}

/// A static DHCP lease binding a MAC address to a fixed IP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StaticMap {
    pub mac: String,
    pub ipaddr: String,
    pub hostname: Option<String>,
    pub descr: Option<String>,
}
