//! Chip detection information.

use serde::{Deserialize, Serialize};

use crate::serialize::hex_u_int;

/// Vendor-specific chip detection information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub enum ChipDetectionMethod {
    /// Detection through a single memory mapped identification register.
    IdRegister(IdRegisterDetection),
}

impl ChipDetectionMethod {
    /// Returns the identification register detection information if available.
    pub fn as_id_register(&self) -> Option<&IdRegisterDetection> {
        match self {
            Self::IdRegister(v) => Some(v),
        }
    }
}

/// A device identity signature.
///
/// A raw identification register value matches if `(value & id_mask) == id_value`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdSignature {
    /// Expected value after masking.
    #[serde(serialize_with = "hex_u_int")]
    pub id_value: u32,
    /// Mask applied to the raw register value before comparing.
    #[serde(serialize_with = "hex_u_int")]
    pub id_mask: u32,
}

impl IdSignature {
    /// Returns `true` if the raw register value carries this signature.
    pub fn matches(&self, raw: u32) -> bool {
        raw & self.id_mask == self.id_value
    }
}

/// Identification register based chip detection information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdRegisterDetection {
    /// Absolute address of the 32 bit identification register.
    #[serde(serialize_with = "hex_u_int")]
    pub register: u64,
    /// Known signatures, checked in order.
    pub variants: Vec<IdVariant>,
}

/// A signature and the chip it identifies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdVariant {
    /// Expected identification value after masking.
    #[serde(serialize_with = "hex_u_int")]
    pub id_value: u32,
    /// Mask applied to the raw register value.
    #[serde(serialize_with = "hex_u_int")]
    pub id_mask: u32,
    /// Name of the chip variant, as listed in the family.
    pub target: String,
}

impl IdVariant {
    /// The signature to compare the register against.
    pub fn signature(&self) -> IdSignature {
        IdSignature {
            id_value: self.id_value,
            id_mask: self.id_mask,
        }
    }
}

impl IdRegisterDetection {
    /// Returns the name of the first variant whose signature matches `raw`.
    pub fn find_variant(&self, raw: u32) -> Option<&str> {
        self.variants
            .iter()
            .find(|variant| variant.signature().matches(raw))
            .map(|variant| variant.target.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    const PAC5223: IdSignature = IdSignature {
        id_value: 0xff00_5223,
        id_mask: 0xff00_ffff,
    };

    #[test_case(0xff00_5223, true; "exact value")]
    #[test_case(0xff42_5223, true; "revision bits are masked")]
    #[test_case(0xff00_5224, false; "different part number")]
    #[test_case(0x0000_5223, false; "family byte missing")]
    #[test_case(0x0000_0000, false; "unpowered bus")]
    fn signature_matches(raw: u32, expected: bool) {
        assert_eq!(PAC5223.matches(raw), expected);
    }

    #[test]
    fn first_matching_variant_wins() {
        let detection = IdRegisterDetection {
            register: 0x0010_0044,
            variants: vec![
                IdVariant {
                    id_value: PAC5223.id_value,
                    id_mask: PAC5223.id_mask,
                    target: "PAC5223".into(),
                },
                IdVariant {
                    id_value: 0x0000_5223,
                    id_mask: 0x0000_ffff,
                    target: "PAC5223-any".into(),
                },
            ],
        };

        assert_eq!(detection.find_variant(0xff00_5223), Some("PAC5223"));
        assert_eq!(detection.find_variant(0x1200_5223), Some("PAC5223-any"));
        assert_eq!(detection.find_variant(0xff00_5224), None);
    }
}
