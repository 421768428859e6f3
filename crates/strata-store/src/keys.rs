use strata_types::Hash;

/// Reserved key holding the head commit hash as raw 32 bytes.
pub const HEAD_KEY: &str = "head";

/// Reserved key holding the user schema source as UTF-8.
pub const SCHEMA_KEY: &str = "schema";

/// Storage key for a content-addressed object: 64 chars of lowercase hex.
pub fn object_key(hash: &Hash) -> String {
    hash.to_hex()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_key_is_hex() {
        let key = object_key(&Hash::digest(b"x"));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn reserved_keys_cannot_collide_with_object_keys() {
        // Object keys are always 64 chars; the reserved names are shorter.
        assert!(HEAD_KEY.len() < 64);
        assert!(SCHEMA_KEY.len() < 64);
    }
}
