//! Postal code and block extraction from free-text location fields.
//!
//! No format validation happens here: a malformed location still yields a
//! plausible-looking code as long as it is long enough.

pub const POSTAL_CODE_LEN: usize = 6;
pub const BLOCK_LEN: usize = 4;

/// Trailing six characters of the location.
pub fn extract_postal_code(location: &str) -> Option<String> {
    let len = location.chars().count();
    if len < POSTAL_CODE_LEN {
        return None;
    }
    Some(location.chars().skip(len - POSTAL_CODE_LEN).collect())
}

/// Leading four characters of the location.
pub fn extract_block(location: &str) -> Option<String> {
    if location.chars().count() < BLOCK_LEN {
        return None;
    }
    Some(location.chars().take(BLOCK_LEN).collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocation {
    pub postal_code: Option<String>,
    pub block: Option<String>,
}

impl ParsedLocation {
    pub fn from_location(location: &str) -> Self {
        Self {
            postal_code: extract_postal_code(location),
            block: extract_block(location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postal_code_is_trailing_six_characters() {
        assert_eq!(extract_postal_code("BLK123456001").as_deref(), Some("456001"));
        assert_eq!(extract_postal_code("123456").as_deref(), Some("123456"));
        assert_eq!(extract_postal_code("12345"), None);
        assert_eq!(extract_postal_code(""), None);
    }

    #[test]
    fn test_block_is_leading_four_characters() {
        assert_eq!(extract_block("BLK123456001").as_deref(), Some("BLK1"));
        assert_eq!(extract_block("ABCD").as_deref(), Some("ABCD"));
        assert_eq!(extract_block("ABC"), None);
    }

    #[test]
    fn test_length_properties_hold_for_every_prefix() {
        let source = "Blk 221 Yishun St 21 #05-12 760221";
        let chars: Vec<char> = source.chars().collect();

        for end in 0..=chars.len() {
            let location: String = chars[..end].iter().collect();

            match extract_postal_code(&location) {
                None => assert!(end < POSTAL_CODE_LEN),
                Some(code) => {
                    let expected: String = chars[end - POSTAL_CODE_LEN..end].iter().collect();
                    assert_eq!(code, expected);
                }
            }

            match extract_block(&location) {
                None => assert!(end < BLOCK_LEN),
                Some(block) => {
                    let expected: String = chars[..BLOCK_LEN].iter().collect();
                    assert_eq!(block, expected);
                }
            }
        }
    }

    #[test]
    fn test_latin1_characters_count_as_one() {
        // "é" is a single character after Latin-1 decoding
        assert_eq!(extract_postal_code("café12").as_deref(), Some("café12"));
        assert_eq!(extract_block("éééé9").as_deref(), Some("éééé"));
    }

    #[test]
    fn test_parsed_location_combines_both() {
        let parsed = ParsedLocation::from_location("BLK456789002");
        assert_eq!(parsed.postal_code.as_deref(), Some("789002"));
        assert_eq!(parsed.block.as_deref(), Some("BLK4"));

        let short = ParsedLocation::from_location("nan");
        assert_eq!(short.postal_code, None);
        assert_eq!(short.block, None);
    }
}
