use crate::Hash;

/// A 12-character base32 (RFC4648, no padding) rendering of a hash's first 8
/// bytes, wrapped in angle brackets for log/dump readability. Collision
/// resistant up to roughly 10^9 units considered simultaneously.
pub fn short_name(hash: &Hash) -> String {
    let encoded = base32::encode(base32::Alphabet::Rfc4648 { padding: false }, &hash.as_bytes()[..8]);
    format!("<{}>", &encoded[..12.min(encoded.len())])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_in_angle_brackets_and_is_twelve_chars() {
        let h = Hash::from_bytes([0xAB; 32]);
        let name = short_name(&h);
        assert!(name.starts_with('<') && name.ends_with('>'));
        assert_eq!(name.len(), 14);
    }

    #[test]
    fn is_deterministic() {
        let h = Hash::from_bytes([1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(short_name(&h), short_name(&h));
    }
}
