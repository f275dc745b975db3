use std::path::PathBuf;

use pfsync::codec::{decode, decode_file, encode};
use pretty_assertions::assert_eq;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

#[test]
fn decode_encode_decode_is_field_equal() {
    let first = decode_file(&fixture("config-valid.xml")).expect("initial decode");

    let xml = encode(&first).expect("encode");
    let second = decode(&xml).expect("re-decode");

    assert_eq!(first, second);
}

#[test]
fn fixture_decodes_forced_sequences() {
    let doc = decode_file(&fixture("config-valid.xml")).expect("decode");

    assert_eq!(doc.users.len(), 1);
    assert_eq!(doc.users[0].name, "admin");
    assert_eq!(doc.groups.len(), 1);
    assert_eq!(doc.static_maps.len(), 1);
    assert_eq!(doc.static_maps[0].ipaddr, "192.168.1.10");
}
