//! Bluetooth UUIDs for SwitchBot devices.
//!
//! This module contains the UUIDs needed to talk to a SwitchBot Bot over
//! Bluetooth Low Energy.

use uuid::{Uuid, uuid};

// --- SwitchBot Service UUIDs ---

/// SwitchBot custom GATT service, also advertised by every Bot.
pub const SWITCHBOT_SERVICE: Uuid = uuid!("cba20d00-224d-11e6-9fb8-0002a5d5c51b");

// --- SwitchBot Characteristic UUIDs ---

/// Command characteristic (write without response).
pub const COMMAND: Uuid = uuid!("cba20002-224d-11e6-9fb8-0002a5d5c51b");

/// Response characteristic (notify).
pub const NOTIFY: Uuid = uuid!("cba20003-224d-11e6-9fb8-0002a5d5c51b");

/// Local name advertised by the Bot (push-button actuator).
pub const BOT_LOCAL_NAME: &str = "WoHand";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_uuid() {
        assert_eq!(
            SWITCHBOT_SERVICE.to_string(),
            "cba20d00-224d-11e6-9fb8-0002a5d5c51b"
        );
    }

    #[test]
    fn test_characteristic_uuids() {
        assert_eq!(COMMAND.to_string(), "cba20002-224d-11e6-9fb8-0002a5d5c51b");
        assert_eq!(NOTIFY.to_string(), "cba20003-224d-11e6-9fb8-0002a5d5c51b");
        assert_ne!(COMMAND, NOTIFY);
    }

    #[test]
    fn test_uuids_share_base() {
        // All SwitchBot UUIDs only differ in the first group
        let suffix = "-224d-11e6-9fb8-0002a5d5c51b";
        for id in [SWITCHBOT_SERVICE, COMMAND, NOTIFY] {
            assert!(id.to_string().ends_with(suffix));
        }
    }
}
