//! Password authentication for protected Bots.
//!
//! A password-protected Bot only accepts the encrypted command variants,
//! which carry a 4-byte tag derived from the password.

use std::fmt;

/// Length of an authentication tag in bytes.
pub const AUTH_TAG_LEN: usize = 4;

/// A 4-byte tag derived from a Bot password.
///
/// The tag is the CRC-32 (IEEE) checksum of the password's UTF-8 bytes,
/// most-significant byte first.
///
/// `Debug` redacts the value so it never ends up in logs.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AuthTag([u8; AUTH_TAG_LEN]);

impl AuthTag {
    /// Derive the tag for `password`. The empty string is valid input.
    ///
    /// # Example
    ///
    /// ```
    /// use switchbot_core::AuthTag;
    ///
    /// let tag = AuthTag::derive("password");
    /// assert_eq!(tag.as_bytes(), &[0x35, 0xc2, 0x46, 0xd5]);
    /// ```
    #[must_use]
    pub fn derive(password: &str) -> Self {
        Self(crc32fast::hash(password.as_bytes()).to_be_bytes())
    }

    /// Wrap an already-derived tag.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; AUTH_TAG_LEN]) -> Self {
        Self(bytes)
    }

    /// The tag bytes in wire order.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; AUTH_TAG_LEN] {
        &self.0
    }
}

impl fmt::Debug for AuthTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthTag(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derive_known_password() {
        assert_eq!(
            AuthTag::derive("password").as_bytes(),
            &[0x35, 0xc2, 0x46, 0xd5]
        );
    }

    #[test]
    fn test_derive_empty_password() {
        // CRC-32 of the empty input is zero
        assert_eq!(AuthTag::derive("").as_bytes(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_derive_is_big_endian() {
        // CRC-32("123456789") is the standard check value 0xCBF43926
        assert_eq!(
            AuthTag::derive("123456789").as_bytes(),
            &[0xcb, 0xf4, 0x39, 0x26]
        );
    }

    #[test]
    fn test_debug_is_redacted() {
        let tag = AuthTag::derive("secret");
        assert_eq!(format!("{:?}", tag), "AuthTag(<redacted>)");
    }

    #[test]
    fn test_from_bytes() {
        let tag = AuthTag::from_bytes([1, 2, 3, 4]);
        assert_eq!(tag.as_bytes(), &[1, 2, 3, 4]);
    }

    proptest! {
        #[test]
        fn prop_derive_is_deterministic(password in ".*") {
            prop_assert_eq!(AuthTag::derive(&password), AuthTag::derive(&password));
        }
    }
}
