/// A vocabulary index produced by an ASR model's decoder.
pub type Token = u32;

/// Tokens at or above this index are special (header/task/language) per the
/// Whisper-style vocabulary convention §6 assumes as the default.
pub const TOKEN_HEADER_THRESHOLD: Token = 50_257;

/// Tokens at or above this index are timestamp tokens. Timestamp tokens are
/// content, not header, even though they fall above [`TOKEN_HEADER_THRESHOLD`].
pub const TIMESTAMP_TOKEN_THRESHOLD: Token = 50_364;

/// `true` for any non-content token: header or timestamp.
pub fn is_special(token: Token) -> bool {
    token >= TOKEN_HEADER_THRESHOLD
}

/// `true` for timestamp tokens specifically. Timestamp tokens are special
/// but are never stripped by the header-stripping logic in `mtste-draft`.
pub fn is_timestamp(token: Token) -> bool {
    token >= TIMESTAMP_TOKEN_THRESHOLD
}

/// `true` for header tokens: special but not a timestamp.
pub fn is_header(token: Token) -> bool {
    token >= TOKEN_HEADER_THRESHOLD && token < TIMESTAMP_TOKEN_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ordinary_tokens() {
        assert!(!is_special(0));
        assert!(!is_special(50_256));
    }

    #[test]
    fn classifies_header_tokens() {
        assert!(is_special(50_257));
        assert!(is_header(50_257));
        assert!(!is_timestamp(50_257));
        assert!(is_header(50_363));
    }

    #[test]
    fn classifies_timestamp_tokens() {
        assert!(is_special(50_364));
        assert!(is_timestamp(50_364));
        assert!(!is_header(50_364));
    }
}
