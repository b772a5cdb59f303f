//! PSI/SI section header parsing and CRC validation.
//!
//! A reassembled buffer may carry several sections back to back followed by
//! 0xFF stuffing; [`sections`] walks them.

use crate::error::SiError;

/// Table id used for stuffing after the last section.
pub const STUFFING_TABLE_ID: u8 = 0xFF;

/// Section header (common to all PSI/SI tables).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsiHeader {
    /// Table ID.
    pub table_id: u8,
    /// Section syntax indicator.
    pub section_syntax_indicator: bool,
    /// Section length (12 bits).
    pub section_length: u16,
    /// Table ID extension (long sections only).
    pub table_id_extension: u16,
    /// Version number (5 bits).
    pub version_number: u8,
    /// Current/next indicator.
    pub current_next_indicator: bool,
    /// Section number.
    pub section_number: u8,
    /// Last section number.
    pub last_section_number: u8,
}

/// A parsed section borrowing from the reassembled buffer.
#[derive(Debug, Clone)]
pub struct PsiSection<'a> {
    /// Section header.
    pub header: PsiHeader,
    /// Body after the header, before the CRC.
    pub data: &'a [u8],
    /// CRC32 field. Short-form sections carry none.
    pub crc32: Option<u32>,
    /// The whole section, header to CRC.
    raw: &'a [u8],
}

impl<'a> PsiSection<'a> {
    /// Parse the section at the start of `data`.
    ///
    /// Bytes after `3 + section_length` are ignored.
    pub fn parse(data: &'a [u8]) -> Result<Self, SiError> {
        if data.len() < 3 {
            return Err(SiError::TooShort {
                what: "section header",
                need: 3,
                got: data.len(),
            });
        }

        let table_id = data[0];
        let section_syntax_indicator = data[1] & 0x80 != 0;
        let section_length = ((data[1] as u16 & 0x0F) << 8) | data[2] as u16;

        let total_length = 3 + section_length as usize;
        if data.len() < total_length {
            return Err(SiError::LengthOverrun {
                what: "section",
                length: section_length as usize,
                remaining: data.len() - 3,
            });
        }
        let raw = &data[..total_length];

        if !section_syntax_indicator {
            return Ok(PsiSection {
                header: PsiHeader {
                    table_id,
                    section_syntax_indicator,
                    section_length,
                    table_id_extension: 0,
                    version_number: 0,
                    current_next_indicator: true,
                    section_number: 0,
                    last_section_number: 0,
                },
                data: &raw[3..],
                crc32: None,
                raw,
            });
        }

        // 5 bytes of extended header plus the CRC.
        if section_length < 9 {
            return Err(SiError::TooShort {
                what: "long section",
                need: 12,
                got: total_length,
            });
        }

        let header = PsiHeader {
            table_id,
            section_syntax_indicator,
            section_length,
            table_id_extension: ((data[3] as u16) << 8) | data[4] as u16,
            version_number: (data[5] >> 1) & 0x1F,
            current_next_indicator: data[5] & 0x01 != 0,
            section_number: data[6],
            last_section_number: data[7],
        };

        let crc_offset = total_length - 4;
        let crc32 = u32::from_be_bytes([
            data[crc_offset],
            data[crc_offset + 1],
            data[crc_offset + 2],
            data[crc_offset + 3],
        ]);

        Ok(PsiSection {
            header,
            data: &raw[8..crc_offset],
            crc32: Some(crc32),
            raw,
        })
    }

    /// Check the CRC32 field. Short-form sections have nothing to check.
    pub fn verify_crc(&self) -> bool {
        match self.crc32 {
            Some(expected) => crc32_mpeg2(&self.raw[..self.raw.len() - 4]) == expected,
            None => true,
        }
    }

    /// Total section length including header and CRC.
    pub fn total_length(&self) -> usize {
        self.raw.len()
    }

    /// The raw section bytes.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }
}

/// Iterator over the sections in one reassembled buffer.
#[derive(Debug, Clone)]
pub struct Sections<'a> {
    rest: &'a [u8],
}

/// Walk the sections packed in `buffer`.
///
/// Stops at stuffing. A section that does not fit is yielded as an error and
/// ends the iteration.
pub fn sections(buffer: &[u8]) -> Sections<'_> {
    Sections { rest: buffer }
}

impl<'a> Iterator for Sections<'a> {
    type Item = Result<PsiSection<'a>, SiError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.rest.first() {
            None | Some(&STUFFING_TABLE_ID) => return None,
            Some(_) => {}
        }
        match PsiSection::parse(self.rest) {
            Ok(section) => {
                self.rest = &self.rest[section.total_length()..];
                Some(Ok(section))
            }
            Err(e) => {
                self.rest = &[];
                Some(Err(e))
            }
        }
    }
}

/// Calculate CRC32 for MPEG-2 (polynomial 0x04C11DB7).
pub fn crc32_mpeg2(data: &[u8]) -> u32 {
    static CRC_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = (i as u32) << 24;
            let mut j = 0;
            while j < 8 {
                if crc & 0x80000000 != 0 {
                    crc = (crc << 1) ^ 0x04C11DB7;
                } else {
                    crc <<= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFFFFFFu32;
    for &byte in data {
        let index = ((crc >> 24) ^ byte as u32) as usize;
        crc = (crc << 8) ^ CRC_TABLE[index];
    }
    crc
}
