//! Test utilities and fixtures for device parser testing
//!
//! These helpers are shared with the coordinator and pipeline tests so all of
//! them build XML the same way.

use std::path::{Path, PathBuf};

use crate::constants::GUDID_NAMESPACE;


/// Build a namespaced GUDID document with one device per id
///
/// Each device carries every field, with values derived from its id.
pub fn gudid_document(device_ids: &[&str]) -> String {
    let devices: String = device_ids.iter().map(|id| gudid_device(id)).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gudid xmlns="{ns}" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
{devices}</gudid>
"#,
        ns = GUDID_NAMESPACE,
        devices = devices
    )
}

/// One complete namespaced `<device>` element
pub fn gudid_device(id: &str) -> String {
    format!(
        r#"  <device>
    <publishDate>2024-01-15</publishDate>
    <identifiers>
      <identifier>
        <deviceId>{id}</deviceId>
        <deviceIdType>Primary</deviceIdType>
      </identifier>
    </identifiers>
    <versionModelNumber>VM-{id}</versionModelNumber>
    <catalogNumber>CAT-{id}</catalogNumber>
    <dunsNumber>00{id}</dunsNumber>
    <companyName>Company {id}</companyName>
    <deviceDescription>Description of {id}</deviceDescription>
    <singleUse>true</singleUse>
    <lotBatch>false</lotBatch>
    <serialNumber>true</serialNumber>
  </device>
"#,
        id = id
    )
}

/// Build an unqualified document with `Element`-wrapped fields
pub fn unqualified_document(device_ids: &[&str]) -> String {
    let devices: String = device_ids
        .iter()
        .map(|id| {
            format!(
                r#"  <device>
    <identifiers><identifier><deviceId>{id}</deviceId></identifier></identifiers>
    <versionModelNumber>VM-{id}</versionModelNumber>
    <catalogNumber><Element>CAT-{id}</Element></catalogNumber>
    <dunsNumber>00{id}</dunsNumber>
    <companyNumber>{id}-CO</companyNumber>
    <deviceDescription><Element>Description of {id}</Element></deviceDescription>
    <singleUse>false</singleUse>
    <lotBatch>true</lotBatch>
    <serialNumber>false</serialNumber>
  </device>
"#,
                id = id
            )
        })
        .collect();
    format!("<devices>\n{}</devices>\n", devices)
}

/// A document that fails well-formedness checks
pub fn malformed_document() -> String {
    format!(
        r#"<gudid xmlns="{}"><device><deviceId>broken</device></gudid>"#,
        GUDID_NAMESPACE
    )
}

/// Write content to `dir/name` and return the path
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}
