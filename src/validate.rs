//! Semantic validation of a [`ConfigDocument`].
//!
//! Validation is pure: it takes a decoded document and returns the list of
//! violated invariants, each naming the offending field, so callers and
//! tests can assert on *which* rule failed. An empty list means the
//! document is valid.
//!
//! Values that do not parse as IPv4 addresses (sentinels such as `dhcp` or
//! `static`) mean the address is managed dynamically by the appliance;
//! checks over them are skipped, not failed. Rule groups run
//! independently so a single pass reports every violation, except that
//! subnet containment is skipped when the range inputs are absent.

use std::net::Ipv4Addr;

use colored::Colorize;
use serde::Serialize;

use crate::schema::ConfigDocument;

/// A single violated invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Dotted path of the field the rule applies to.
    pub field: String,
    /// Human-readable reason.
    pub reason: String,
}

/// Check every semantic invariant and collect the violations.
pub fn validate(config: &ConfigDocument) -> Vec<Violation> {
    let mut out = Vec::new();
    out.extend(required_field_violations(config));
    out.extend(dhcp_range_violations(config));
    out.extend(subnet_containment_violations(config));
    out
}

/// Render violations for terminal output.
pub fn render_violations(violations: &[Violation]) -> String {
    if violations.is_empty() {
        return "configuration is valid".green().to_string();
    }
    let mut out = Vec::new();
    out.push(
        format!("configuration has {} violation(s)", violations.len())
            .red()
            .to_string(),
    );
    for violation in violations {
        out.push(format!("- {}: {}", violation.field.yellow(), violation.reason));
    }
    out.join("\n")
}

fn required_field_violations(config: &ConfigDocument) -> Vec<Violation> {
    let mut out = Vec::new();
    if config.system.hostname.trim().is_empty() {
        out.push(violation("system.hostname", "hostname is required"));
    }
    if config.interfaces.lan.ipaddr.trim().is_empty() {
        out.push(violation(
            "interfaces.lan.ipaddr",
            "LAN interface IP address is required",
        ));
    }
    out
}

/// DHCP pool ordering: `from` must be strictly below `to` when both
/// endpoints are present and parseable.
fn dhcp_range_violations(config: &ConfigDocument) -> Vec<Violation> {
    let range = &config.dhcpd.lan.range;
    let (Some(from), Some(to)) = (range.from.as_deref(), range.to.as_deref()) else {
        return Vec::new();
    };
    let (Some(from_ip), Some(to_ip)) = (parse_ipv4(from), parse_ipv4(to)) else {
        // Sentinel endpoint; the appliance manages the pool dynamically.
        return Vec::new();
    };

    if from_ip >= to_ip {
        return vec![violation(
            "dhcpd.lan.range",
            &format!("range start {from_ip} must be below range end {to_ip}"),
        )];
    }
    Vec::new()
}

/// Both DHCP pool endpoints must fall inside the LAN network. Skipped when
/// the range inputs are absent or when the LAN address itself is a
/// sentinel.
fn subnet_containment_violations(config: &ConfigDocument) -> Vec<Violation> {
    let lan = &config.interfaces.lan;
    let range = &config.dhcpd.lan.range;

    let (Some(from), Some(to)) = (range.from.as_deref(), range.to.as_deref()) else {
        return Vec::new();
    };
    let Some(lan_ip) = parse_ipv4(&lan.ipaddr) else {
        return Vec::new();
    };
    let Some(net) = network(lan_ip, lan.subnet) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for (end, value) in [("from", from), ("to", to)] {
        let Some(addr) = parse_ipv4(value) else {
            continue;
        };
        if !contains(net, lan.subnet, addr) {
            out.push(violation(
                &format!("dhcpd.lan.range.{end}"),
                &format!(
                    "{addr} is outside the LAN subnet {}/{}",
                    Ipv4Addr::from(net),
                    lan.subnet
                ),
            ));
        }
    }
    out
}

fn violation(field: &str, reason: &str) -> Violation {
    Violation {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_ipv4(value: &str) -> Option<Ipv4Addr> {
    value.trim().parse().ok()
}

/// Network address (host bits zeroed) for the given IP and prefix.
fn network(ip: Ipv4Addr, prefix: u8) -> Option<u32> {
    Some(u32::from(ip) & mask(prefix)?)
}

fn contains(net: u32, prefix: u8, addr: Ipv4Addr) -> bool {
    match mask(prefix) {
        Some(mask) => (u32::from(addr) & mask) == net,
        None => false,
    }
}

/// Subnet mask as a `u32` for a CIDR prefix length (0..=32).
fn mask(prefix: u8) -> Option<u32> {
    if prefix > 32 {
        return None;
    }
    if prefix == 0 {
        return Some(0);
    }
    Some(u32::MAX << (32 - prefix))
}
