//! crates/koala_core/src/content_address.rs
//!
//! Derives deterministic storage keys from the fields that define an artifact,
//! so identical requests land on the same stored object.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Bumping this moves every key into a fresh namespace without deleting old objects.
pub const KEY_VERSION: &str = "v1";

/// Separator between key fields. It is not escaped, so a field containing `|`
/// can collide with a different split of the same characters.
pub const FIELD_DELIMITER: &str = "|";

/// Hashes the joined fields and returns the versioned, URL-safe digest.
pub fn hash_fields<S: AsRef<str>>(fields: &[S]) -> String {
    let joined = fields
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(FIELD_DELIMITER);
    let digest = md5::compute(joined.as_bytes());
    format!("{}{}", KEY_VERSION, URL_SAFE_NO_PAD.encode(digest.0))
}

/// Returns `"{namespace}/{version}{hash}.{ext}"` for the given fields.
pub fn derive_key<S: AsRef<str>>(namespace: &str, fields: &[S], ext: &str) -> String {
    format!("{}/{}.{}", namespace, hash_fields(fields), ext)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn lesson_audio_key_matches_the_documented_layout() {
        let key = derive_key("lesson-audio", &["hello", "en", "F"], "mp3");

        let digest = md5::compute(b"hello|en|F");
        let expected_hash = STANDARD
            .encode(digest.0)
            .replace('+', "-")
            .replace('/', "_")
            .trim_end_matches('=')
            .to_string();
        assert_eq!(key, format!("lesson-audio/v1{}.mp3", expected_hash));
    }

    #[test]
    fn equal_inputs_give_equal_keys() {
        let a = derive_key("lesson-audio", &["안녕하세요", "ko", "M"], "mp3");
        let b = derive_key("lesson-audio", &["안녕하세요", "ko", "M"], "mp3");
        assert_eq!(a, b);
    }

    #[test]
    fn any_differing_field_changes_the_key() {
        let base = derive_key("lesson-audio", &["hello", "en", "F"], "mp3");
        assert_ne!(base, derive_key("lesson-audio", &["hello!", "en", "F"], "mp3"));
        assert_ne!(base, derive_key("lesson-audio", &["hello", "es", "F"], "mp3"));
        assert_ne!(base, derive_key("lesson-audio", &["hello", "en", "M"], "mp3"));
    }

    #[test]
    fn hash_is_url_safe_and_unpadded() {
        for text in ["a", "ab", "abc", "??>>", "\u{1F428}"] {
            let hash = hash_fields(&[text]);
            assert!(hash.starts_with(KEY_VERSION));
            assert!(!hash.contains('='));
            assert!(!hash.contains('+'));
            assert!(!hash.contains('/'));
            // 16-byte digest without padding is 22 characters.
            assert_eq!(hash.len(), KEY_VERSION.len() + 22);
        }
    }

    #[test]
    fn delimiter_collisions_are_a_known_limitation() {
        let a = hash_fields(&["a|b", "c"]);
        let b = hash_fields(&["a", "b|c"]);
        assert_eq!(a, b);
    }
}
