// SPDX-License-Identifier: Apache-2.0
// Copyright © 2021 Will Ross

/// Create a stand-in autofocus firmware image of the given length.
///
/// The real firmware is a vendor blob, and the driver treats it as an opaque byte stream. The
/// pattern here is chosen so that neighboring chunks never share the same leading bytes, which
/// makes misplaced or reordered chunks show up in comparisons.
pub fn sample_firmware(length: usize) -> Vec<u8> {
    (0..length)
        .map(|index| (index.wrapping_mul(31).wrapping_add(index / 254) ^ 0x5A) as u8)
        .collect()
}

#[cfg(test)]
mod test {
    #[test]
    fn sample_firmware_length() {
        assert!(super::sample_firmware(0).is_empty());
        assert_eq!(super::sample_firmware(600).len(), 600);
    }

    #[test]
    fn sample_firmware_is_stable() {
        assert_eq!(super::sample_firmware(300), super::sample_firmware(300));
    }
}
