//! validated mac address type.
//!
//! devices identify themselves by their hardware mac address. firmware,
//! setup uis and humans disagree on formatting (colons, dashes, dots,
//! case), so every inbound identifier is normalised before validation.
//!
//! canonical form: `AA:BB:CC:DD:EE:FF` - 6 groups of 2 uppercase hex
//! digits, colon-separated, 17 characters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// length of the canonical string form (12 hex digits + 5 colons).
pub const MAC_CANONICAL_LEN: usize = 17;

/// normalise an arbitrary device-id string towards canonical mac form.
///
/// strips every character that is not a hex digit and upper-cases the
/// remainder. if exactly 12 hex digits remain, they are re-joined with
/// colons into `AA:BB:CC:DD:EE:FF`. anything else is returned trimmed but
/// otherwise unchanged - normalisation is deliberately permissive so that
/// validation stays a separate, explicit step.
pub fn normalize_mac(input: &str) -> String {
    let hex: String = input
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if hex.len() != 12 {
        return input.trim().to_string();
    }

    let mut out = String::with_capacity(MAC_CANONICAL_LEN);
    for (i, c) in hex.chars().enumerate() {
        if i > 0 && i % 2 == 0 {
            out.push(':');
        }
        out.push(c);
    }
    out
}

/// a validated, canonical mac address.
///
/// `MacAddr` values are guaranteed to be in the strict canonical form.
/// use [`MacAddr::parse`] to accept loosely formatted input, or
/// [`MacAddr::new`] when the input must already be canonical.
///
/// # Example
/// ```
/// use aerolog_types::MacAddr;
///
/// let mac = MacAddr::parse("aa-bb-cc-dd-ee-ff").unwrap();
/// assert_eq!(mac.as_str(), "AA:BB:CC:DD:EE:FF");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr(String);

impl MacAddr {
    /// create a mac address from an already-canonical string.
    pub fn new(s: impl Into<String>) -> Result<Self, MacAddrError> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// normalise arbitrary input, then validate.
    ///
    /// this is the entry point every endpoint accepting a device
    /// identifier must go through: a malformed identifier is rejected
    /// rather than silently treated as a distinct device.
    pub fn parse(input: &str) -> Result<Self, MacAddrError> {
        Self::new(normalize_mac(input))
    }

    /// get the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// consume the mac and return the inner string.
    pub fn into_inner(self) -> String {
        self.0
    }

    fn validate(s: &str) -> Result<(), MacAddrError> {
        if s.len() != MAC_CANONICAL_LEN {
            return Err(MacAddrError::InvalidLength(s.len()));
        }

        for (i, c) in s.chars().enumerate() {
            if i % 3 == 2 {
                if c != ':' {
                    return Err(MacAddrError::InvalidFormat);
                }
            } else if !(c.is_ascii_digit() || ('A'..='F').contains(&c)) {
                return Err(MacAddrError::InvalidFormat);
            }
        }

        Ok(())
    }
}

impl AsRef<str> for MacAddr {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for MacAddr {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for MacAddr {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MacAddr {
    type Err = MacAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// serde: deserialize normalises and validates
impl<'de> Deserialize<'de> for MacAddr {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MacAddr::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl Serialize for MacAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// error type for invalid mac addresses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MacAddrError {
    /// wrong canonical length.
    #[error("mac address must be {MAC_CANONICAL_LEN} characters, got {0}")]
    InvalidLength(usize),

    /// wrong characters or separator positions.
    #[error("mac address must be 6 colon-separated pairs of uppercase hex digits")]
    InvalidFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_colon_separated() {
        assert_eq!(normalize_mac("aa:bb:cc:dd:ee:ff"), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_normalize_dash_separated() {
        assert_eq!(normalize_mac("AA-BB-CC-DD-EE-FF"), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_normalize_bare_hex() {
        assert_eq!(normalize_mac("aabbccddeeff"), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_normalize_dotted() {
        assert_eq!(normalize_mac("aabb.ccdd.eeff"), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_normalize_passthrough_on_wrong_digit_count() {
        // too few hex digits: trimmed original comes back unchanged
        assert_eq!(normalize_mac("  not-a-mac  "), "not-a-mac");
        assert_eq!(normalize_mac("aabbcc"), "aabbcc");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_mac("aa-bb-cc-dd-ee-ff");
        assert_eq!(normalize_mac(&once), once);
    }

    #[test]
    fn test_parse_valid() {
        let mac = MacAddr::parse("a1:b2:c3:d4:e5:f6").unwrap();
        assert_eq!(mac.as_str(), "A1:B2:C3:D4:E5:F6");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(MacAddr::parse("").is_err());
        assert!(MacAddr::parse("zz:bb:cc:dd:ee:ff").is_err());
        assert!(MacAddr::parse("aa:bb:cc:dd:ee").is_err());
        assert!(MacAddr::parse("aa:bb:cc:dd:ee:ff:00").is_err());
    }

    #[test]
    fn test_new_requires_canonical() {
        // new() does not normalise
        assert!(MacAddr::new("aa:bb:cc:dd:ee:ff").is_err());
        assert!(MacAddr::new("AA:BB:CC:DD:EE:FF").is_ok());
        assert!(MacAddr::new("AA-BB-CC-DD-EE-FF").is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let mac = MacAddr::parse("AA:BB:CC:DD:EE:FF").unwrap();
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"AA:BB:CC:DD:EE:FF\"");

        let parsed: MacAddr = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, mac);
    }

    #[test]
    fn test_serde_normalises_on_deserialize() {
        let parsed: MacAddr = serde_json::from_str("\"aa-bb-cc-dd-ee-ff\"").unwrap();
        assert_eq!(parsed.as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_serde_invalid_rejected() {
        let result: Result<MacAddr, _> = serde_json::from_str("\"hello\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        let mac = MacAddr::parse("aabbccddeeff").unwrap();
        assert_eq!(format!("{}", mac), "AA:BB:CC:DD:EE:FF");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // strategy for 12 hex digits in mixed case
    fn hex12_strategy() -> impl Strategy<Value = String> {
        "[0-9a-fA-F]{12}"
    }

    // separators firmware and humans actually produce
    fn separator_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            Just(":".to_string()),
            Just("-".to_string()),
            Just(".".to_string()),
            Just(" ".to_string()),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(1000))]

        #[test]
        fn any_12_hex_digits_normalise_to_valid(hex in hex12_strategy(), sep in separator_strategy()) {
            // interleave the separator every 2 digits
            let mut input = String::new();
            for (i, c) in hex.chars().enumerate() {
                if i > 0 && i % 2 == 0 {
                    input.push_str(&sep);
                }
                input.push(c);
            }

            let normalised = normalize_mac(&input);
            let mac = MacAddr::new(&normalised);
            prop_assert!(mac.is_ok(), "normalised form should validate: {}", normalised);
            prop_assert_eq!(normalised.len(), MAC_CANONICAL_LEN);
        }

        #[test]
        fn normalize_is_idempotent(s in ".*") {
            let once = normalize_mac(&s);
            let twice = normalize_mac(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn arbitrary_input_never_panics(s in ".*") {
            let _ = normalize_mac(&s);
            let _ = MacAddr::parse(&s);
        }

        #[test]
        fn valid_mac_roundtrips_through_serde(hex in hex12_strategy()) {
            let mac = MacAddr::parse(&hex).unwrap();
            let json = serde_json::to_string(&mac).unwrap();
            let parsed: MacAddr = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(mac, parsed);
        }
    }
}
