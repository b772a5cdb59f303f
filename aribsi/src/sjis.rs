//! Shift_JIS to UTF-8 for display.

use aribsi_core::SjisString;
use encoding_rs::SHIFT_JIS;
use log::trace;

/// Convert decoded ARIB text to a `String`.
///
/// Sequences Shift_JIS cannot map are replaced with U+FFFD.
pub fn to_utf8(text: &SjisString) -> String {
    let (decoded, _, had_errors) = SHIFT_JIS.decode(text.as_bytes());
    if had_errors {
        trace!("Unmappable Shift_JIS in {:02X?}", text.as_bytes());
    }
    decoded.into_owned()
}

/// Convert an optional text field; absent text becomes empty.
pub fn opt_to_utf8(text: Option<&SjisString>) -> String {
    text.map(to_utf8).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii() {
        assert_eq!(to_utf8(&SjisString::from(b"NHK".to_vec())), "NHK");
    }

    #[test]
    fn test_kana_and_kanji() {
        // あ 日本
        let sjis = SjisString::from(vec![0x82, 0xA0, 0x93, 0xFA, 0x96, 0x7B]);
        assert_eq!(to_utf8(&sjis), "あ日本");
    }

    #[test]
    fn test_placeholder_and_space() {
        let sjis = SjisString::from(vec![0x81, 0x48, 0x81, 0x40]);
        assert_eq!(to_utf8(&sjis), "？\u{3000}");
    }

    #[test]
    fn test_decoded_arib_text() {
        // ESC $ B then kanji 0x467C 0x4B5C
        let text = aribsi_core::decode(&[0x1B, 0x24, 0x42, 0x46, 0x7C, 0x4B, 0x5C]).unwrap();
        assert_eq!(to_utf8(&text), "日本");
    }

    #[test]
    fn test_missing() {
        assert_eq!(opt_to_utf8(None), "");
    }
}
