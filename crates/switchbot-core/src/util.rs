//! Utility functions for switchbot-core.

use btleplug::platform::PeripheralId;

/// Lowercase an address so lookups and config keys compare equal.
///
/// ```
/// use switchbot_core::util::normalize_address;
///
/// assert_eq!(normalize_address(" AA:BB:CC:DD:EE:FF "), "aa:bb:cc:dd:ee:ff");
/// ```
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms, they may be
/// MAC addresses or other formats.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Create an identifier string from an address and peripheral ID.
///
/// On macOS where addresses are 00:00:00:00:00:00, uses the peripheral ID.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if is_unknown_address(address) {
        format_peripheral_id(peripheral_id)
    } else {
        normalize_address(address)
    }
}

/// Whether the platform hid the real address (CoreBluetooth reports zeros).
pub fn is_unknown_address(address: &str) -> bool {
    address == "00:00:00:00:00:00"
}

/// Whether `address` matches `identifier`, ignoring case and separators.
pub fn address_matches(address: &str, identifier: &str) -> bool {
    if is_unknown_address(address) {
        return false;
    }
    let strip = |s: &str| s.replace([':', '-'], "").to_lowercase();
    strip(address) == strip(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("AA:BB:CC:DD:EE:FF"), "aa:bb:cc:dd:ee:ff");
        assert_eq!(normalize_address("aa:bb"), "aa:bb");
    }

    #[test]
    fn test_address_matches() {
        assert!(address_matches("AA:BB:CC:DD:EE:FF", "aa:bb:cc:dd:ee:ff"));
        assert!(address_matches("AA:BB:CC:DD:EE:FF", "aabbccddeeff"));
        assert!(address_matches("AA:BB:CC:DD:EE:FF", "AA-BB-CC-DD-EE-FF"));
        assert!(!address_matches("AA:BB:CC:DD:EE:FF", "aa:bb:cc:dd:ee:00"));
    }

    #[test]
    fn test_unknown_address_never_matches() {
        assert!(is_unknown_address("00:00:00:00:00:00"));
        assert!(!address_matches("00:00:00:00:00:00", "00:00:00:00:00:00"));
    }
}
