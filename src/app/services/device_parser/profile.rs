//! Parse profiles for the two GUDID export schema shapes
//!
//! A profile is a declarative table mapping each output column to the path of
//! the element holding its text, relative to a `<device>` element. Both schema
//! variants are expressed as tables and evaluated by the same parser.

use crate::app::models::DeviceField;
use crate::constants::{DEVICE_ELEMENT, GUDID_NAMESPACE};
use quick_xml::name::{Namespace, ResolveResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of a field-path table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPath {
    /// Row field receiving the text
    pub field: DeviceField,
    /// CSV column header
    pub column: &'static str,
    /// Local element names from the device element down to the text element
    pub path: &'static [&'static str],
}

const GUDID_FIELDS: [FieldPath; 9] = [
    FieldPath {
        field: DeviceField::DeviceId,
        column: "deviceId",
        path: &["identifiers", "identifier", "deviceId"],
    },
    FieldPath {
        field: DeviceField::VersionModelNumber,
        column: "versionModelNumber",
        path: &["versionModelNumber"],
    },
    FieldPath {
        field: DeviceField::CatalogNumber,
        column: "catalogNumber",
        path: &["catalogNumber"],
    },
    FieldPath {
        field: DeviceField::DunsNumber,
        column: "dunsNumber",
        path: &["dunsNumber"],
    },
    FieldPath {
        field: DeviceField::Company,
        column: "companyName",
        path: &["companyName"],
    },
    FieldPath {
        field: DeviceField::DeviceDescription,
        column: "deviceDescription",
        path: &["deviceDescription"],
    },
    FieldPath {
        field: DeviceField::SingleUse,
        column: "singleUse",
        path: &["singleUse"],
    },
    FieldPath {
        field: DeviceField::LotBatch,
        column: "lotBatch",
        path: &["lotBatch"],
    },
    FieldPath {
        field: DeviceField::SerialNumber,
        column: "serialNumber",
        path: &["serialNumber"],
    },
];

const UNQUALIFIED_FIELDS: [FieldPath; 9] = [
    FieldPath {
        field: DeviceField::DeviceId,
        column: "deviceId",
        path: &["identifiers", "identifier", "deviceId"],
    },
    FieldPath {
        field: DeviceField::VersionModelNumber,
        column: "versionModelNumber",
        path: &["versionModelNumber"],
    },
    FieldPath {
        field: DeviceField::CatalogNumber,
        column: "catalogNumber",
        path: &["catalogNumber", "Element"],
    },
    FieldPath {
        field: DeviceField::DunsNumber,
        column: "dunsNumber",
        path: &["dunsNumber"],
    },
    FieldPath {
        field: DeviceField::Company,
        column: "companyNumber",
        path: &["companyNumber"],
    },
    FieldPath {
        field: DeviceField::DeviceDescription,
        column: "deviceDescription",
        path: &["deviceDescription", "Element"],
    },
    FieldPath {
        field: DeviceField::SingleUse,
        column: "singleUse",
        path: &["singleUse"],
    },
    FieldPath {
        field: DeviceField::LotBatch,
        column: "lotBatch",
        path: &["lotBatch"],
    },
    FieldPath {
        field: DeviceField::SerialNumber,
        column: "serialNumber",
        path: &["serialNumber"],
    },
];

/// Schema variant used to read device records
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ParseProfile {
    /// Elements qualified under the GUDID namespace, flat text fields
    #[default]
    Gudid,
    /// Unqualified elements, `Element`-wrapped catalog number and description
    Unqualified,
}

impl ParseProfile {
    /// Namespace URI every matched element must be bound to, `None` for unqualified
    pub fn namespace(self) -> Option<&'static str> {
        match self {
            ParseProfile::Gudid => Some(GUDID_NAMESPACE),
            ParseProfile::Unqualified => None,
        }
    }

    /// Local name of the record element
    pub fn device_element(self) -> &'static str {
        DEVICE_ELEMENT
    }

    /// Field-path table in column order
    pub fn field_paths(self) -> &'static [FieldPath; 9] {
        match self {
            ParseProfile::Gudid => &GUDID_FIELDS,
            ParseProfile::Unqualified => &UNQUALIFIED_FIELDS,
        }
    }

    /// CSV header row
    pub fn column_names(self) -> [&'static str; 9] {
        let table = *self.field_paths();
        table.map(|entry| entry.column)
    }

    /// Whether a resolved element name belongs to this profile's namespace
    pub fn matches_namespace(self, resolved: &ResolveResult<'_>) -> bool {
        match (self.namespace(), resolved) {
            (Some(uri), ResolveResult::Bound(Namespace(ns))) => *ns == uri.as_bytes(),
            (None, ResolveResult::Unbound) => true,
            _ => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ParseProfile::Gudid => "gudid",
            ParseProfile::Unqualified => "unqualified",
        }
    }
}

impl fmt::Display for ParseProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
