//! Conversion between the XML wire format and [`ConfigDocument`].
//!
//! Decoding is a strict two-stage pipeline: the raw document is first
//! parsed into a generic [`Element`] tree, then projected onto the typed
//! schema. All structural violations are reported here as [`SchemaError`]
//! instead of surfacing later as missing-field surprises inside validation
//! or push logic.
//!
//! The `user`, `group` and `staticmap` element names always decode to
//! sequences. A document carrying a single `<user>` yields a one-element
//! `Vec`; downstream consumers rely on sequence semantics regardless of
//! cardinality on the wire.

use std::path::Path;

use thiserror::Error;

use crate::markup::{self, MarkupError};
use crate::schema::{
    ConfigDocument, Dhcpd, DhcpdLan, DhcpRange, Group, Interfaces, LanInterface, StaticMap,
    System, User,
};
use crate::tree::Element;

/// Wire root element of an appliance configuration document.
pub const ROOT_TAG: &str = "pfsense";

/// Errors raised while projecting a wire document onto the schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Underlying document was not well-formed XML.
    #[error(transparent)]
    Markup(#[from] MarkupError),
    /// Root element was not the expected appliance root.
    #[error("expected root element <{ROOT_TAG}>, found <{0}>")]
    UnexpectedRoot(String),
    /// A structurally required element is absent.
    #[error("required field missing: {0}")]
    MissingField(String),
    /// A field is present but cannot be parsed as its declared type.
    #[error("field {field} has invalid value `{value}`")]
    InvalidField { field: String, value: String },
}

/// Decode an XML configuration document into the typed schema.
pub fn decode(xml: &str) -> Result<ConfigDocument, SchemaError> {
    let root = markup::parse(xml.as_bytes())?;
    decode_tree(&root)
}

/// Decode a configuration document from a local file.
pub fn decode_file(path: &Path) -> Result<ConfigDocument, SchemaError> {
    let root = markup::parse_file(path)?;
    decode_tree(&root)
}

/// Project a parsed [`Element`] tree onto the schema.
pub fn decode_tree(root: &Element) -> Result<ConfigDocument, SchemaError> {
    if root.tag != ROOT_TAG {
        return Err(SchemaError::UnexpectedRoot(root.tag.clone()));
    }

    let system = decode_system(root)?;
    let interfaces = decode_interfaces(root)?;
    let dhcpd = decode_dhcpd(root);

    let users = root
        .children_named("user")
        .map(decode_user)
        .collect::<Result<Vec<_>, _>>()?;
    let groups = root
        .children_named("group")
        .map(decode_group)
        .collect::<Result<Vec<_>, _>>()?;
    let static_maps = root
        .children_named("staticmap")
        .map(decode_static_map)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ConfigDocument {
        system,
        interfaces,
        dhcpd,
        users,
        groups,
        static_maps,
    })
}

/// Encode a [`ConfigDocument`] as an XML string consumable by the
/// appliance. Deterministic and structurally mirroring [`decode`], so
/// `decode(encode(d))` is field-equal to `d` for any schema value.
pub fn encode(config: &ConfigDocument) -> Result<String, MarkupError> {
    markup::write(&encode_tree(config))
}

/// Build the wire [`Element`] tree for a [`ConfigDocument`].
pub fn encode_tree(config: &ConfigDocument) -> Element {
    let system = Element::new("system")
        .with_leaf("hostname", &config.system.hostname)
        .with_optional_leaf("domain", config.system.domain.as_deref());

    let lan = Element::new("lan")
        .with_leaf("ipaddr", &config.interfaces.lan.ipaddr)
        .with_leaf("subnet", config.interfaces.lan.subnet.to_string());

    let range = Element::new("range")
        .with_optional_leaf("from", config.dhcpd.lan.range.from.as_deref())
        .with_optional_leaf("to", config.dhcpd.lan.range.to.as_deref());

    let mut root = Element::new(ROOT_TAG)
        .with_child(system)
        .with_child(Element::new("interfaces").with_child(lan))
        .with_child(
            Element::new("dhcpd").with_child(Element::new("lan").with_child(range)),
        );

    for user in &config.users {
        root.children.push(
            Element::new("user")
                .with_leaf("name", &user.name)
                .with_optional_leaf("uid", user.uid.as_deref())
                .with_optional_leaf("scope", user.scope.as_deref())
                .with_optional_leaf("descr", user.descr.as_deref()),
        );
    }
    for group in &config.groups {
        root.children.push(
            Element::new("group")
                .with_leaf("name", &group.name)
                .with_optional_leaf("gid", group.gid.as_deref())
                .with_optional_leaf("description", group.description.as_deref()),
        );
    }
    for map in &config.static_maps {
        root.children.push(
            Element::new("staticmap")
                .with_leaf("mac", &map.mac)
                .with_leaf("ipaddr", &map.ipaddr)
                .with_optional_leaf("hostname", map.hostname.as_deref())
                .with_optional_leaf("descr", map.descr.as_deref()),
        );
    }

    root
}

fn decode_system(root: &Element) -> Result<System, SchemaError> {
    let system = require_child(root, "system", "system")?;
    Ok(System {
        // Presence of the text is a semantic concern: an empty hostname
        // decodes fine and is rejected by validation instead.
        hostname: text_or_empty(system, "hostname"),
        domain: optional_text(system, "domain"),
    })
}

fn decode_interfaces(root: &Element) -> Result<Interfaces, SchemaError> {
    let interfaces = require_child(root, "interfaces", "interfaces")?;
    let lan = require_child(interfaces, "lan", "interfaces.lan")?;

    let subnet_raw = lan
        .text_at(&["subnet"])
        .ok_or_else(|| SchemaError::MissingField("interfaces.lan.subnet".to_string()))?
        .trim()
        .to_string();
    let subnet = subnet_raw
        .parse::<u8>()
        .map_err(|_| SchemaError::InvalidField {
            field: "interfaces.lan.subnet".to_string(),
            value: subnet_raw,
        })?;

    Ok(Interfaces {
        lan: LanInterface {
            ipaddr: text_or_empty(lan, "ipaddr"),
            subnet,
        },
    })
}

/// `dhcpd`, `dhcpd.lan` and the range element are all optional on the
/// wire; absence decodes to an empty range.
fn decode_dhcpd(root: &Element) -> Dhcpd {
    let range = root
        .child("dhcpd")
        .and_then(|d| d.child("lan"))
        .and_then(|lan| lan.child("range"))
        .map(|range| DhcpRange {
            from: optional_text(range, "from"),
            to: optional_text(range, "to"),
        })
        .unwrap_or_default();

    Dhcpd {
        lan: DhcpdLan { range },
    }
}

fn decode_user(node: &Element) -> Result<User, SchemaError> {
    Ok(User {
        name: require_text(node, "name", "user.name")?,
        uid: optional_text(node, "uid"),
        scope: optional_text(node, "scope"),
        descr: optional_text(node, "descr"),
    })
}

fn decode_group(node: &Element) -> Result<Group, SchemaError> {
    Ok(Group {
        name: require_text(node, "name", "group.name")?,
        gid: optional_text(node, "gid"),
        description: optional_text(node, "description"),
    })
}

fn decode_static_map(node: &Element) -> Result<StaticMap, SchemaError> {
    Ok(StaticMap {
        mac: require_text(node, "mac", "staticmap.mac")?,
        ipaddr: require_text(node, "ipaddr", "staticmap.ipaddr")?,
        hostname: optional_text(node, "hostname"),
        descr: optional_text(node, "descr"),
    })
}

fn require_child<'a>(
    node: &'a Element,
    tag: &str,
    path: &str,
) -> Result<&'a Element, SchemaError> {
    node.child(tag)
        .ok_or_else(|| SchemaError::MissingField(path.to_string()))
}

fn require_text(node: &Element, tag: &str, path: &str) -> Result<String, SchemaError> {
    node.text_at(&[tag])
        .map(|t| t.trim().to_string())
        .ok_or_else(|| SchemaError::MissingField(path.to_string()))
}

fn optional_text(node: &Element, tag: &str) -> Option<String> {
    node.text_at(&[tag]).map(|t| t.trim().to_string())
}

fn text_or_empty(node: &Element, tag: &str) -> String {
    node.text_at(&[tag])
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}
