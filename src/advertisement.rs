//! Advertisement events delivered by a scanner backend.

use crate::mac_address::MacAddress;
use std::fmt;
use std::fmt::Write;

/// AD type of a Complete Local Name structure.
pub const AD_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;

/// AD type of a Manufacturer Specific Data structure.
pub const AD_TYPE_MANUFACTURER_DATA: u8 = 0xFF;

/// The kind of an advertisement field, keyed by its AD type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    CompleteLocalName,
    ManufacturerData,
    Other(u8),
}

impl FieldKind {
    pub fn from_ad_type(ad_type: u8) -> Self {
        match ad_type {
            AD_TYPE_COMPLETE_LOCAL_NAME => FieldKind::CompleteLocalName,
            AD_TYPE_MANUFACTURER_DATA => FieldKind::ManufacturerData,
            other => FieldKind::Other(other),
        }
    }

    pub fn ad_type(self) -> u8 {
        match self {
            FieldKind::CompleteLocalName => AD_TYPE_COMPLETE_LOCAL_NAME,
            FieldKind::ManufacturerData => AD_TYPE_MANUFACTURER_DATA,
            FieldKind::Other(ad_type) => ad_type,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::CompleteLocalName => write!(f, "Complete Local Name"),
            FieldKind::ManufacturerData => write!(f, "Manufacturer"),
            FieldKind::Other(ad_type) => write!(f, "AD type 0x{ad_type:02x}"),
        }
    }
}

/// One (kind, value) structure from an advertisement or scan response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementField {
    pub kind: FieldKind,
    /// Raw AD payload, without the length and type octets.
    pub value: Vec<u8>,
}

impl AdvertisementField {
    pub fn new(kind: FieldKind, value: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Complete Local Name field carrying `name`.
    pub fn local_name(name: &str) -> Self {
        Self::new(FieldKind::CompleteLocalName, name.as_bytes())
    }

    /// Manufacturer field as it appears on the air: company identifier
    /// (little-endian) followed by the vendor payload.
    pub fn manufacturer(company_id: u16, data: &[u8]) -> Self {
        let mut value = Vec::with_capacity(2 + data.len());
        value.extend_from_slice(&company_id.to_le_bytes());
        value.extend_from_slice(data);
        Self::new(FieldKind::ManufacturerData, value)
    }

    /// The value read as text. Invalid UTF-8 is replaced, trailing NULs are dropped.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.value)
            .trim_end_matches('\0')
            .to_string()
    }

    /// The value rendered as lowercase hex, two characters per byte.
    pub fn hex(&self) -> String {
        self.value
            .iter()
            .fold(String::with_capacity(self.value.len() * 2), |mut s, b| {
                let _ = write!(s, "{b:02x}");
                s
            })
    }

    /// Human-readable value, used for debug logging.
    pub fn describe(&self) -> String {
        match self.kind {
            FieldKind::CompleteLocalName => self.text(),
            _ => self.hex(),
        }
    }
}

/// One advertisement burst observed from one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEvent {
    pub address: MacAddress,
    pub fields: Vec<AdvertisementField>,
}

impl DiscoveryEvent {
    pub fn new(address: MacAddress, fields: Vec<AdvertisementField>) -> Self {
        Self { address, fields }
    }
}

/// Split raw advertising data into its AD structures.
///
/// Parsing stops at the first zero-length or truncated structure; everything
/// before it is returned.
pub fn parse_ad_structures(data: &[u8]) -> Vec<AdvertisementField> {
    let mut fields = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let len = data[offset] as usize;
        if len == 0 || offset + 1 + len > data.len() {
            break;
        }

        let ad_type = data[offset + 1];
        let value = &data[offset + 2..offset + 1 + len];
        fields.push(AdvertisementField::new(FieldKind::from_ad_type(ad_type), value));

        offset += 1 + len;
    }

    fields
}
