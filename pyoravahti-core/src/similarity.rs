//! Fingerprint comparison.
//!
//! Fingerprints are compared symbol by symbol: the distance between two
//! fingerprints is the number of positions at which they differ. Callers
//! must supply consistently encoded fingerprints, no case folding or other
//! normalization is performed here.

/// Largest distance at which two fingerprints are considered similar.
pub const MAX_PHASH_DISTANCE: u32 = 10;

/// Confidence lost per differing position.
const CONFIDENCE_PER_SYMBOL: u32 = 10;

/// Compute the Hamming distance between two fingerprints.
///
/// # Returns
///
/// The number of differing positions, or `None` when the fingerprints have
/// different lengths and cannot be compared.
pub fn hamming_distance(a: &str, b: &str) -> Option<u32> {
    if a.chars().count() != b.chars().count() {
        return None;
    }

    let distance = a.chars().zip(b.chars()).filter(|(x, y)| x != y).count();
    Some(distance as u32)
}

/// Confidence (0-100) for a given fingerprint distance.
///
/// Decays linearly from 100 at distance 0 and bottoms out at 0 from
/// distance 10 onwards.
pub fn confidence_from_distance(distance: u32) -> u8 {
    100u32.saturating_sub(distance.saturating_mul(CONFIDENCE_PER_SYMBOL)) as u8
}

/// Distance between two fingerprints if it is within [`MAX_PHASH_DISTANCE`].
pub fn similar_distance(a: &str, b: &str) -> Option<u32> {
    hamming_distance(a, b).filter(|d| *d <= MAX_PHASH_DISTANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_distance_identical() {
        assert_eq!(hamming_distance("deadbeefcafebabe", "deadbeefcafebabe"), Some(0));
        assert_eq!(hamming_distance("", ""), Some(0));
    }

    #[test]
    fn test_hamming_distance_counts_positions() {
        assert_eq!(hamming_distance("abcd", "abcf"), Some(1));
        assert_eq!(hamming_distance("0000", "1111"), Some(4));
        assert_eq!(hamming_distance("1010", "0101"), Some(4));
    }

    #[test]
    fn test_hamming_distance_symmetric() {
        let pairs = [
            ("ffff0000", "ff00ff00"),
            ("a1b2c3d4", "a1b2c3d5"),
            ("0123456789abcdef", "fedcba9876543210"),
        ];
        for (a, b) in pairs {
            assert_eq!(hamming_distance(a, b), hamming_distance(b, a));
        }
    }

    #[test]
    fn test_hamming_distance_length_mismatch() {
        assert_eq!(hamming_distance("abc", "abcd"), None);
        assert_eq!(hamming_distance("", "a"), None);
        assert_eq!(hamming_distance("deadbeef", "dead"), None);
    }

    #[test]
    fn test_hamming_distance_is_case_sensitive() {
        assert_eq!(hamming_distance("ABCD", "abcd"), Some(4));
    }

    #[test]
    fn test_hamming_distance_multibyte_symbols() {
        assert_eq!(hamming_distance("äöå", "äoå"), Some(1));
        assert_eq!(hamming_distance("ä", "ab"), None);
    }

    #[test]
    fn test_confidence_from_distance() {
        assert_eq!(confidence_from_distance(0), 100);
        assert_eq!(confidence_from_distance(1), 90);
        assert_eq!(confidence_from_distance(5), 50);
        assert_eq!(confidence_from_distance(6), 40);
        assert_eq!(confidence_from_distance(10), 0);
        assert_eq!(confidence_from_distance(11), 0);
        assert_eq!(confidence_from_distance(u32::MAX), 0);
    }

    #[test]
    fn test_similar_distance_threshold() {
        assert_eq!(similar_distance("0000000000", "1111111111"), Some(10));
        assert_eq!(similar_distance("00000000000", "11111111111"), None);
        assert_eq!(similar_distance("00", "000"), None);
    }
}
