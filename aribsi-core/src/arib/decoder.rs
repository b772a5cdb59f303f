use log::trace;

use super::tables::{self, PLACEHOLDER};
use super::{CharSet, DecoderState, Register, SjisString};
use crate::error::AribError;

const LS0: u8 = 0x0F;
const LS1: u8 = 0x0E;
const SS2: u8 = 0x19;
const SS3: u8 = 0x1D;
const ESC: u8 = 0x1B;
const SP: u8 = 0x20;

/// Decode an ARIB text field to Shift_JIS, starting from the broadcast
/// default register state.
pub fn decode(bytes: &[u8]) -> Result<SjisString, AribError> {
    decode_with(DecoderState::default(), bytes)
}

/// Decode an ARIB text field to Shift_JIS, starting from `state`.
///
/// Never fails on malformed input: unknown controls and escape sequences are
/// skipped, unmappable characters become [`PLACEHOLDER`].
pub fn decode_with(state: DecoderState, bytes: &[u8]) -> Result<SjisString, AribError> {
    // No code point produces more than two output bytes per input byte.
    let capacity = bytes.len() * 2 + 1;
    let mut out = Vec::new();
    out.try_reserve_exact(capacity)
        .map_err(|_| AribError::OutOfMemory(capacity))?;

    let mut decoder = Decoder {
        rest: bytes,
        state,
        out,
    };
    decoder.run();
    Ok(SjisString(decoder.out))
}

struct Decoder<'a> {
    rest: &'a [u8],
    state: DecoderState,
    out: Vec<u8>,
}

impl<'a> Decoder<'a> {
    fn next_byte(&mut self) -> Option<u8> {
        let (&b, tail) = self.rest.split_first()?;
        self.rest = tail;
        Some(b)
    }

    fn run(&mut self) {
        while let Some(b) = self.next_byte() {
            match b {
                LS0 => self.state.lock_gl(Register::G0),
                LS1 => self.state.lock_gl(Register::G1),
                SS2 => self.state.single_shift(Register::G2),
                SS3 => self.state.single_shift(Register::G3),
                ESC => self.read_escape(),
                SP => {
                    let set = self.state.designation(self.state.gl());
                    if set.renders_space() {
                        self.render(set, SP);
                    }
                }
                0x21..=0x7E => {
                    let set = self.state.designation(self.state.gl());
                    self.render(set, b);
                }
                0xA1..=0xFE => {
                    let set = self.state.designation(self.state.gr());
                    self.render(set, b & 0x7F);
                }
                // C0/C1 controls, DEL, 0xA0 and 0xFF
                _ => {}
            }
        }
    }

    /// Interpret the bytes after ESC. Only the ESC is consumed when nothing matches.
    fn read_escape(&mut self) {
        let consumed = match *self.rest {
            // LS2, LS3
            [0x6E, ..] => {
                self.state.lock_gl(Register::G2);
                1
            }
            [0x6F, ..] => {
                self.state.lock_gl(Register::G3);
                1
            }
            // LS1R, LS2R, LS3R
            [0x7E, ..] => {
                self.state.lock_gr(Register::G1);
                1
            }
            [0x7D, ..] => {
                self.state.lock_gr(Register::G2);
                1
            }
            [0x7C, ..] => {
                self.state.lock_gr(Register::G3);
                1
            }

            // 2-byte DRCS
            [0x24, i @ 0x28..=0x2B, SP, f, ..] => {
                let set = (f == 0x40).then_some(CharSet::Drcs0);
                self.designate(i, set, f);
                4
            }
            // 2-byte G set into G1..G3, then G0
            [0x24, i @ 0x29..=0x2B, f, ..] => {
                self.designate(i, CharSet::from_final_byte(f), f);
                3
            }
            [0x24, f, ..] => {
                self.designate(0x28, CharSet::from_final_byte(f), f);
                2
            }

            // 1-byte DRCS; the macro set (0x70) is not kept
            [i @ 0x28..=0x2B, SP, f, ..] => {
                self.designate(i, CharSet::from_drcs_final_byte(f), f);
                3
            }
            // 1-byte G set
            [i @ 0x28..=0x2B, f, ..] => {
                self.designate(i, CharSet::from_final_byte(f), f);
                2
            }

            _ => {
                trace!("Unknown escape sequence {:02X?}", self.rest.first());
                0
            }
        };
        self.rest = &self.rest[consumed..];
    }

    fn designate(&mut self, intermediate: u8, set: Option<CharSet>, final_byte: u8) {
        match (Register::from_intermediate(intermediate), set) {
            (Some(register), Some(set)) => self.state.designate(register, set),
            _ => trace!(
                "Ignoring designation 0x{:02X} 0x{:02X}",
                intermediate,
                final_byte
            ),
        }
    }

    /// Render the code point `c1` (7-bit) of `set`, reading a second byte for
    /// 2-byte sets.
    fn render(&mut self, set: CharSet, c1: u8) {
        let glyph = match set {
            CharSet::Ascii | CharSet::PropAscii => {
                self.out.push(c1);
                None
            }
            CharSet::Hiragana | CharSet::PropHiragana => {
                Some(tables::kana_lookup(&tables::HIRAGANA, c1))
            }
            CharSet::Katakana | CharSet::PropKatakana | CharSet::JisX0201Katakana => {
                Some(tables::kana_lookup(&tables::KATAKANA, c1))
            }
            CharSet::Kanji | CharSet::JisKanjiPlane1 | CharSet::JisKanjiPlane2 => {
                let Some(c2) = self.next_byte() else {
                    trace!("Truncated 2-byte code point 0x{:02X}", c1);
                    return;
                };
                let c2 = c2 & 0x7F;
                if (0x21..=0x7E).contains(&c2) {
                    Some(tables::kanji_to_sjis(c1, c2))
                } else {
                    Some(PLACEHOLDER)
                }
            }
            CharSet::AdditionalSymbols | CharSet::Drcs0 => {
                if self.next_byte().is_none() {
                    trace!("Truncated 2-byte code point 0x{:02X}", c1);
                    return;
                }
                Some(PLACEHOLDER)
            }
            CharSet::Drcs(_) => Some(PLACEHOLDER),
        };

        if let Some(glyph) = glyph {
            self.out.extend_from_slice(&glyph);
        }
        self.state.end_single_shift();
    }
}
