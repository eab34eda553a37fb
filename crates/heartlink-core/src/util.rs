//! Utility functions for heartlink-core.

use btleplug::platform::PeripheralId;

/// Address reported by CoreBluetooth, which hides real MAC addresses.
const HIDDEN_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms, they wrap the
/// Bluetooth address.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Create an identifier string from an address and peripheral ID.
///
/// On macOS where addresses are 00:00:00:00:00:00, uses the peripheral ID.
/// On other platforms, uses the Bluetooth address.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    pick_identifier(address, || format_peripheral_id(peripheral_id))
}

fn pick_identifier(address: &str, fallback: impl FnOnce() -> String) -> String {
    if address == HIDDEN_ADDRESS {
        fallback()
    } else {
        address.to_string()
    }
}

/// Whether a peripheral matches a user-supplied identifier.
///
/// The comparison is case-insensitive. Names match on substring so that
/// `"polar"` finds `"Polar H10 A1B2C3D4"`; addresses and ids must match
/// exactly.
pub fn matches_identifier(
    query: &str,
    name: Option<&str>,
    address: &str,
    peripheral_id: &str,
) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return false;
    }

    if let Some(name) = name
        && name.to_lowercase().contains(&query)
    {
        return true;
    }

    address.to_lowercase() == query || peripheral_id.to_lowercase() == query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pick_identifier_uses_address() {
        let id = pick_identifier("AA:BB:CC:DD:EE:FF", || "unused".to_string());
        assert_eq!(id, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn test_pick_identifier_falls_back_on_hidden_address() {
        let id = pick_identifier(HIDDEN_ADDRESS, || "4f2c-peripheral".to_string());
        assert_eq!(id, "4f2c-peripheral");
    }

    #[test]
    fn test_matches_name_substring() {
        assert!(matches_identifier(
            "polar",
            Some("Polar H10 A1B2C3D4"),
            "AA:BB:CC:DD:EE:FF",
            "hci0/dev_AA_BB"
        ));
        assert!(!matches_identifier(
            "wahoo",
            Some("Polar H10 A1B2C3D4"),
            "AA:BB:CC:DD:EE:FF",
            "hci0/dev_AA_BB"
        ));
    }

    #[test]
    fn test_matches_address_case_insensitive() {
        assert!(matches_identifier(
            "aa:bb:cc:dd:ee:ff",
            None,
            "AA:BB:CC:DD:EE:FF",
            "x"
        ));
        assert!(!matches_identifier("aa:bb", None, "AA:BB:CC:DD:EE:FF", "x"));
    }

    #[test]
    fn test_matches_peripheral_id() {
        let id = "5e1b3c2a-0000-4000-8000-123456789abc";
        assert!(matches_identifier(id, None, HIDDEN_ADDRESS, id));
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        assert!(!matches_identifier("  ", Some("Polar"), "AA", "BB"));
    }
}
