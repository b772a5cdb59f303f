//! ARIB STD-B24 8-unit character code.
//!
//! Text fields in SI descriptors are coded with four graphic set registers
//! (G0..G3) invoked into GL (0x21..=0x7E) and GR (0xA1..=0xFE) by locking and
//! single shifts, and re-designated with escape sequences. [`decode`] converts
//! such a field to Shift_JIS. Sets without a Shift_JIS counterpart (additional
//! symbols and DRCS) come out as [`tables::PLACEHOLDER`].

mod decoder;
pub mod tables;

pub use decoder::{decode, decode_with};

/// Graphic sets that can be designated into a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharSet {
    /// Kanji (JIS X 0208), 2 bytes.
    Kanji,
    /// Alphanumeric, 1 byte.
    Ascii,
    /// Hiragana, 1 byte.
    Hiragana,
    /// Katakana, 1 byte.
    Katakana,
    /// Proportional alphanumeric, 1 byte.
    PropAscii,
    /// Proportional hiragana, 1 byte.
    PropHiragana,
    /// Proportional katakana, 1 byte.
    PropKatakana,
    /// JIS X 0201 katakana, 1 byte.
    JisX0201Katakana,
    /// JIS compatible kanji plane 1, 2 bytes.
    JisKanjiPlane1,
    /// JIS compatible kanji plane 2, 2 bytes.
    JisKanjiPlane2,
    /// Additional symbols, 2 bytes.
    AdditionalSymbols,
    /// DRCS-0, 2 bytes.
    Drcs0,
    /// DRCS-1 to DRCS-15, 1 byte.
    Drcs(u8),
}

impl CharSet {
    /// Map the final byte of a G set designation.
    ///
    /// Mosaic sets (0x32..=0x35) are not recognised.
    pub fn from_final_byte(final_byte: u8) -> Option<Self> {
        let set = match final_byte {
            0x42 => CharSet::Kanji,
            0x4A => CharSet::Ascii,
            0x30 => CharSet::Hiragana,
            0x31 => CharSet::Katakana,
            0x36 => CharSet::PropAscii,
            0x37 => CharSet::PropHiragana,
            0x38 => CharSet::PropKatakana,
            0x49 => CharSet::JisX0201Katakana,
            0x39 => CharSet::JisKanjiPlane1,
            0x3A => CharSet::JisKanjiPlane2,
            0x3B => CharSet::AdditionalSymbols,
            _ => return None,
        };
        Some(set)
    }

    /// Map the final byte of a 1-byte DRCS designation (0x41..=0x4F).
    pub fn from_drcs_final_byte(final_byte: u8) -> Option<Self> {
        match final_byte {
            0x41..=0x4F => Some(CharSet::Drcs(final_byte - 0x40)),
            _ => None,
        }
    }

    /// Number of bytes per code point.
    pub fn bytes_per_char(self) -> usize {
        match self {
            CharSet::Kanji
            | CharSet::JisKanjiPlane1
            | CharSet::JisKanjiPlane2
            | CharSet::AdditionalSymbols
            | CharSet::Drcs0 => 2,
            _ => 1,
        }
    }

    /// True for sets that give 0x20 a glyph (a space).
    ///
    /// For all other sets 0x20 is a control and produces no output.
    pub fn renders_space(self) -> bool {
        matches!(
            self,
            CharSet::Ascii
                | CharSet::PropAscii
                | CharSet::Hiragana
                | CharSet::PropHiragana
                | CharSet::Katakana
                | CharSet::PropKatakana
                | CharSet::JisX0201Katakana
        )
    }
}

/// Graphic set register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    G0 = 0,
    G1 = 1,
    G2 = 2,
    G3 = 3,
}

impl Register {
    /// Register selected by the intermediate byte of a designation (0x28..=0x2B).
    pub fn from_intermediate(byte: u8) -> Option<Self> {
        match byte {
            0x28 => Some(Register::G0),
            0x29 => Some(Register::G1),
            0x2A => Some(Register::G2),
            0x2B => Some(Register::G3),
            _ => None,
        }
    }
}

/// Register contents and invocations for one decode call.
///
/// GL and GR refer to registers, so re-designating the register currently
/// invoked changes what GL or GR render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderState {
    registers: [CharSet; 4],
    gl: Register,
    gr: Register,
    /// GL to restore after the next rendered character (SS2/SS3).
    saved_gl: Option<Register>,
}

impl Default for DecoderState {
    fn default() -> Self {
        Self {
            registers: [
                CharSet::Kanji,
                CharSet::Ascii,
                CharSet::Hiragana,
                CharSet::Katakana,
            ],
            gl: Register::G0,
            gr: Register::G2,
            saved_gl: None,
        }
    }
}

impl DecoderState {
    /// Broadcast default: G0 Kanji, G1 ASCII, G2 Hiragana, G3 Katakana,
    /// GL = G0, GR = G2.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_designation(mut self, register: Register, set: CharSet) -> Self {
        self.designate(register, set);
        self
    }

    pub fn with_gl(mut self, register: Register) -> Self {
        self.gl = register;
        self
    }

    pub fn with_gr(mut self, register: Register) -> Self {
        self.gr = register;
        self
    }

    /// Set designated in `register`.
    pub fn designation(&self, register: Register) -> CharSet {
        self.registers[register as usize]
    }

    pub fn gl(&self) -> Register {
        self.gl
    }

    pub fn gr(&self) -> Register {
        self.gr
    }

    /// True while an SS2/SS3 is waiting for its character.
    pub fn single_shift_pending(&self) -> bool {
        self.saved_gl.is_some()
    }

    pub(crate) fn designate(&mut self, register: Register, set: CharSet) {
        self.registers[register as usize] = set;
    }

    pub(crate) fn lock_gl(&mut self, register: Register) {
        self.gl = register;
    }

    pub(crate) fn lock_gr(&mut self, register: Register) {
        self.gr = register;
    }

    /// Invoke `register` into GL for one character.
    ///
    /// A second single shift before that character keeps the first saved GL.
    pub(crate) fn single_shift(&mut self, register: Register) {
        if self.saved_gl.is_none() {
            self.saved_gl = Some(self.gl);
        }
        self.gl = register;
    }

    /// Called after every rendered character.
    pub(crate) fn end_single_shift(&mut self) {
        if let Some(gl) = self.saved_gl.take() {
            self.gl = gl;
        }
    }
}

/// Shift_JIS bytes produced by [`decode`].
///
/// Always valid Shift_JIS; re-encode with a Shift_JIS decoder to get text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SjisString(Vec<u8>);

impl SjisString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for SjisString {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<SjisString> for Vec<u8> {
    fn from(s: SjisString) -> Self {
        s.0
    }
}

impl From<Vec<u8>> for SjisString {
    fn from(bytes: Vec<u8>) -> Self {
        SjisString(bytes)
    }
}
