//! Device and transfer type definitions
//!
//! Two turret families exist in the wild. They share the HID class request
//! used to deliver commands but disagree on payload shape, and only one of
//! them has a light.

use crate::command::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// USB vendor/product pair read from the device descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceIdentity {
    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}:0x{:04x}", self.vendor_id, self.product_id)
    }
}

/// Turret hardware family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceFamily {
    /// Dream Cheeky Thunder: motion, fire and light, 8-byte payloads
    Thunder,
    /// Classic launcher: motion and fire only, 1-byte payloads
    Classic,
    /// A device we were told to open but cannot drive
    Unknown,
}

/// Identity of the Dream Cheeky Thunder
pub const THUNDER_IDENTITY: DeviceIdentity = DeviceIdentity::new(0x2123, 0x1010);
/// Identity of the classic launcher
pub const CLASSIC_IDENTITY: DeviceIdentity = DeviceIdentity::new(0x0a81, 0x0701);

/// Built-in table of recognised turrets
pub const KNOWN_DEVICES: [(DeviceIdentity, DeviceFamily); 2] = [
    (THUNDER_IDENTITY, DeviceFamily::Thunder),
    (CLASSIC_IDENTITY, DeviceFamily::Classic),
];

impl DeviceFamily {
    /// Look an identity up in the built-in table
    pub fn from_identity(identity: DeviceIdentity) -> Self {
        KNOWN_DEVICES
            .iter()
            .find(|(known, _)| *known == identity)
            .map(|(_, family)| *family)
            .unwrap_or(DeviceFamily::Unknown)
    }

    /// Whether commands of this category can be encoded for this family
    pub const fn supports(self, category: Category) -> bool {
        match (self, category) {
            (_, Category::Shutdown) => false,
            (DeviceFamily::Thunder, _) => true,
            (DeviceFamily::Classic, Category::Motion) => true,
            (DeviceFamily::Classic, Category::Light) => false,
            (DeviceFamily::Unknown, _) => false,
        }
    }

    pub const fn has_light(self) -> bool {
        self.supports(Category::Light)
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceFamily::Thunder => f.write_str("Thunder"),
            DeviceFamily::Classic => f.write_str("Classic"),
            DeviceFamily::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Host-to-device class request, interface recipient
pub const REQUEST_TYPE_CLASS_OUT: u8 = 0x21;
/// HID SET_REPORT
pub const REQUEST_SET_REPORT: u8 = 0x09;

/// A fully encoded control transfer, ready for the transport
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlRequest {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_lookup() {
        assert_eq!(
            DeviceFamily::from_identity(DeviceIdentity::new(0x2123, 0x1010)),
            DeviceFamily::Thunder
        );
        assert_eq!(
            DeviceFamily::from_identity(DeviceIdentity::new(0x0a81, 0x0701)),
            DeviceFamily::Classic
        );
        assert_eq!(
            DeviceFamily::from_identity(DeviceIdentity::new(0x1234, 0x5678)),
            DeviceFamily::Unknown
        );
    }

    #[test]
    fn test_capabilities() {
        assert!(DeviceFamily::Thunder.supports(Category::Motion));
        assert!(DeviceFamily::Thunder.supports(Category::Light));
        assert!(DeviceFamily::Classic.supports(Category::Motion));
        assert!(!DeviceFamily::Classic.supports(Category::Light));
        assert!(!DeviceFamily::Unknown.supports(Category::Motion));
        assert!(!DeviceFamily::Thunder.supports(Category::Shutdown));
        assert!(DeviceFamily::Thunder.has_light());
        assert!(!DeviceFamily::Classic.has_light());
    }

    #[test]
    fn test_identity_display() {
        assert_eq!(
            DeviceIdentity::new(0x0a81, 0x0701).to_string(),
            "0x0a81:0x0701"
        );
    }
}
