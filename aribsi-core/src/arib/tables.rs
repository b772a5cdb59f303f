//! Fixed code tables for converting ARIB graphic sets to Shift_JIS.
//!
//! The kana tables are indexed by `code_point - 0x20` and cover 0x20..=0x7F.

/// Full-width space (`　`).
pub const FULLWIDTH_SPACE: [u8; 2] = [0x81, 0x40];

/// Emitted for code points with no Shift_JIS equivalent (full-width `？`).
pub const PLACEHOLDER: [u8; 2] = [0x81, 0x48];

/// Hiragana set.
pub const HIRAGANA: [[u8; 2]; 96] = build_hiragana();

/// Katakana set. Also used for the proportional and JIS X 0201 katakana sets.
pub const KATAKANA: [[u8; 2]; 96] = build_katakana();

const fn build_hiragana() -> [[u8; 2]; 96] {
    let mut table = [FULLWIDTH_SPACE; 96];
    // ぁ..ん
    let mut cp = 0x21;
    while cp <= 0x73 {
        table[cp - 0x20] = [0x82, 0x9F + (cp - 0x21) as u8];
        cp += 1;
    }
    // 0x74..=0x76 are unassigned and stay as full-width space.
    table[0x77 - 0x20] = [0x81, 0x54]; // ゝ
    table[0x78 - 0x20] = [0x81, 0x55]; // ゞ
    fill_common_symbols(table)
}

const fn build_katakana() -> [[u8; 2]; 96] {
    let mut table = [FULLWIDTH_SPACE; 96];
    // ァ..ミ
    let mut cp = 0x21;
    while cp <= 0x5F {
        table[cp - 0x20] = [0x83, 0x40 + (cp - 0x21) as u8];
        cp += 1;
    }
    // ム..ヶ, Shift_JIS has no trail byte 0x7F
    while cp <= 0x76 {
        table[cp - 0x20] = [0x83, 0x80 + (cp - 0x60) as u8];
        cp += 1;
    }
    table[0x77 - 0x20] = [0x81, 0x52]; // ヽ
    table[0x78 - 0x20] = [0x81, 0x53]; // ヾ
    fill_common_symbols(table)
}

/// Symbols shared by both kana sets at 0x79..=0x7E.
const fn fill_common_symbols(mut table: [[u8; 2]; 96]) -> [[u8; 2]; 96] {
    table[0x79 - 0x20] = [0x81, 0x5B]; // ー
    table[0x7A - 0x20] = [0x81, 0x42]; // 。
    table[0x7B - 0x20] = [0x81, 0x75]; // 「
    table[0x7C - 0x20] = [0x81, 0x76]; // 」
    table[0x7D - 0x20] = [0x81, 0x41]; // 、
    table[0x7E - 0x20] = [0x81, 0x45]; // ・
    table
}

/// Look up a 7-bit code point in a kana table.
///
/// Code points below 0x20 have no entry and map to [`PLACEHOLDER`].
pub fn kana_lookup(table: &[[u8; 2]; 96], code_point: u8) -> [u8; 2] {
    match (code_point as usize).checked_sub(0x20) {
        Some(index) if index < table.len() => table[index],
        _ => PLACEHOLDER,
    }
}

/// Convert a JIS X 0208 row/cell pair (both 0x21..=0x7E) to Shift_JIS.
pub const fn kanji_to_sjis(c1: u8, c2: u8) -> [u8; 2] {
    let lead = (c1.wrapping_sub(0x21) / 2).wrapping_add(if c1 <= 0x5E { 0x81 } else { 0xC1 });
    let trail = if c1 & 0x01 == 1 {
        c2.wrapping_add(if c2 <= 0x5F { 0x1F } else { 0x20 })
    } else {
        c2.wrapping_add(0x7E)
    };
    [lead, trail]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hiragana_table() {
        assert_eq!(HIRAGANA[0], FULLWIDTH_SPACE);
        assert_eq!(HIRAGANA[0x21 - 0x20], [0x82, 0x9F]); // ぁ
        assert_eq!(HIRAGANA[0x22 - 0x20], [0x82, 0xA0]); // あ
        assert_eq!(HIRAGANA[0x73 - 0x20], [0x82, 0xF1]); // ん
        for cp in 0x74..=0x76 {
            assert_eq!(HIRAGANA[cp - 0x20], FULLWIDTH_SPACE);
        }
        assert_eq!(HIRAGANA[0x77 - 0x20], [0x81, 0x54]);
        assert_eq!(HIRAGANA[0x7E - 0x20], [0x81, 0x45]);
        assert_eq!(HIRAGANA[0x7F - 0x20], FULLWIDTH_SPACE);
    }

    #[test]
    fn test_katakana_table() {
        assert_eq!(KATAKANA[0], FULLWIDTH_SPACE);
        assert_eq!(KATAKANA[0x22 - 0x20], [0x83, 0x41]); // ア
        assert_eq!(KATAKANA[0x5F - 0x20], [0x83, 0x7E]); // ミ
        assert_eq!(KATAKANA[0x60 - 0x20], [0x83, 0x80]); // ム
        assert_eq!(KATAKANA[0x76 - 0x20], [0x83, 0x96]); // ヶ
        assert_eq!(KATAKANA[0x77 - 0x20], [0x81, 0x52]);
        assert_eq!(KATAKANA[0x78 - 0x20], [0x81, 0x53]);
        assert_eq!(KATAKANA[0x79 - 0x20], [0x81, 0x5B]);
        assert_eq!(KATAKANA[0x7F - 0x20], FULLWIDTH_SPACE);
    }

    #[test]
    fn test_kana_tables_are_valid_sjis() {
        for entry in HIRAGANA.iter().chain(KATAKANA.iter()) {
            assert!((0x81..=0x9F).contains(&entry[0]));
            assert!((0x40..=0xFC).contains(&entry[1]) && entry[1] != 0x7F);
        }
    }

    #[test]
    fn test_kana_lookup_out_of_range() {
        assert_eq!(kana_lookup(&HIRAGANA, 0x22), [0x82, 0xA0]);
        assert_eq!(kana_lookup(&HIRAGANA, 0x1F), PLACEHOLDER);
        assert_eq!(kana_lookup(&KATAKANA, 0x80), PLACEHOLDER);
    }

    #[test]
    fn test_kanji_to_sjis() {
        assert_eq!(kanji_to_sjis(0x21, 0x21), [0x81, 0x40]);
        assert_eq!(kanji_to_sjis(0x30, 0x21), [0x88, 0x9F]); // 亜
        assert_eq!(kanji_to_sjis(0x46, 0x7C), [0x93, 0xFA]); // 日
        assert_eq!(kanji_to_sjis(0x4B, 0x5C), [0x96, 0x7B]); // 本
        assert_eq!(kanji_to_sjis(0x5F, 0x21), [0xE0, 0x40]); // row 63 uses the upper lead range
        assert_eq!(kanji_to_sjis(0x7E, 0x7E), [0xEF, 0xFC]);
    }
}
