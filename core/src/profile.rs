//! Static device-profile table (C3). A small, immutable, process-wide
//! lookup from signature to flash geometry; safe to read from anywhere.

use crate::signature::Signature;

/// Default page size assumed when a signature has no table entry.
pub const DEFAULT_PAGE_BYTES: u16 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub signature: Signature,
    pub name: &'static str,
    pub flash_bytes: u32,
    pub page_bytes: u16,
}

/// The profile table. Entries must be distinct by signature; linear scan
/// is plenty for a table this small.
static DEVICE_PROFILES: &[DeviceProfile] = &[
    DeviceProfile {
        signature: Signature::new(0x1E, 0x95, 0x0F),
        name: "ATmega328P",
        flash_bytes: 32768,
        page_bytes: 128,
    },
    DeviceProfile {
        signature: Signature::new(0x1E, 0x93, 0x0B),
        name: "ATtiny85",
        flash_bytes: 8192,
        page_bytes: 64,
    },
];

/// Looks up a profile by exact signature match. `None` means "use
/// [`DEFAULT_PAGE_BYTES`] and proceed" — callers must not treat a miss as
/// fatal.
pub fn lookup(sig: &Signature) -> Option<&'static DeviceProfile> {
    DEVICE_PROFILES.iter().find(|p| &p.signature == sig)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_signatures_resolve() {
        let atmega328p = lookup(&Signature::new(0x1E, 0x95, 0x0F)).unwrap();
        assert_eq!(atmega328p.name, "ATmega328P");
        assert_eq!(atmega328p.flash_bytes, 32768);
        assert_eq!(atmega328p.page_bytes, 128);

        let attiny85 = lookup(&Signature::new(0x1E, 0x93, 0x0B)).unwrap();
        assert_eq!(attiny85.name, "ATtiny85");
        assert_eq!(attiny85.page_bytes, 64);
    }

    #[test]
    fn unknown_signature_is_none() {
        assert!(lookup(&Signature::new(0x1E, 0xFF, 0xFF)).is_none());
    }

    #[test]
    fn table_entries_are_distinct() {
        for (i, a) in DEVICE_PROFILES.iter().enumerate() {
            for b in &DEVICE_PROFILES[i + 1..] {
                assert_ne!(a.signature, b.signature);
            }
        }
    }

    #[test]
    fn page_bytes_are_even() {
        for p in DEVICE_PROFILES {
            assert_eq!(p.page_bytes % 2, 0);
        }
    }
}
