//! MPEG-TS packet reading.
//!
//! This module reads 188-byte Transport Stream packets from a seekable byte
//! stream and exposes the header fields through shift/mask accessors.

use std::io::{self, Read, Seek, SeekFrom};

use crate::error::TsError;

/// TS packet size in bytes.
pub const TS_PACKET_SIZE: usize = 188;

/// TS sync byte (0x47).
pub const SYNC_BYTE: u8 = 0x47;

/// Size of the fixed TS header.
pub const TS_HEADER_SIZE: usize = 4;

/// Adaptation field control: payload only.
pub const AFC_PAYLOAD_ONLY: u8 = 0b01;
/// Adaptation field control: adaptation field only, no payload.
pub const AFC_ADAPTATION_ONLY: u8 = 0b10;
/// Adaptation field control: adaptation field followed by payload.
pub const AFC_ADAPTATION_AND_PAYLOAD: u8 = 0b11;

/// Parsed TS packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TsHeader {
    /// Transport error indicator.
    pub transport_error: bool,
    /// Payload unit start indicator.
    pub payload_unit_start: bool,
    /// Transport priority.
    pub transport_priority: bool,
    /// Packet Identifier (13 bits).
    pub pid: u16,
    /// Transport scrambling control (2 bits).
    pub scrambling_control: u8,
    /// Adaptation field control (2 bits).
    pub adaptation_field_control: u8,
    /// Continuity counter (4 bits).
    pub continuity_counter: u8,
}

impl TsHeader {
    /// Check if packet has adaptation field.
    pub fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control & 0x02 != 0
    }

    /// Check if packet has payload.
    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control & 0x01 != 0
    }
}

/// A single 188-byte TS packet.
#[derive(Clone, PartialEq, Eq)]
pub struct TsPacket {
    data: [u8; TS_PACKET_SIZE],
}

impl std::fmt::Debug for TsPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsPacket")
            .field("header", &self.header())
            .finish_non_exhaustive()
    }
}

impl TsPacket {
    /// Build a packet from the first 188 bytes of `data`.
    ///
    /// Returns `None` if the slice is short or does not start with the sync byte.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let bytes: [u8; TS_PACKET_SIZE] = data.get(..TS_PACKET_SIZE)?.try_into().ok()?;
        if bytes[0] != SYNC_BYTE {
            return None;
        }
        Some(TsPacket { data: bytes })
    }

    /// Raw packet bytes, header included.
    pub fn as_bytes(&self) -> &[u8; TS_PACKET_SIZE] {
        &self.data
    }

    /// Decode the 4-byte header.
    pub fn header(&self) -> TsHeader {
        let data = &self.data;
        TsHeader {
            transport_error: data[1] & 0x80 != 0,
            payload_unit_start: data[1] & 0x40 != 0,
            transport_priority: data[1] & 0x20 != 0,
            pid: ((data[1] as u16 & 0x1F) << 8) | data[2] as u16,
            scrambling_control: (data[3] >> 6) & 0x03,
            adaptation_field_control: (data[3] >> 4) & 0x03,
            continuity_counter: data[3] & 0x0F,
        }
    }

    /// Packet Identifier.
    pub fn pid(&self) -> u16 {
        ((self.data[1] as u16 & 0x1F) << 8) | self.data[2] as u16
    }

    /// Adaptation field body (after its length byte), if present and in bounds.
    pub fn adaptation_field(&self) -> Option<&[u8]> {
        if !self.header().has_adaptation_field() {
            return None;
        }
        let length = self.data[TS_HEADER_SIZE] as usize;
        self.data.get(TS_HEADER_SIZE + 1..TS_HEADER_SIZE + 1 + length)
    }

    /// Offset of the first payload byte, past the header and any adaptation field.
    ///
    /// Returns `None` when the packet carries no payload or when the adaptation
    /// field length points past the end of the packet.
    pub fn payload_offset(&self) -> Option<usize> {
        let header = self.header();
        if !header.has_payload() {
            return None;
        }

        let offset = if header.has_adaptation_field() {
            TS_HEADER_SIZE + 1 + self.data[TS_HEADER_SIZE] as usize
        } else {
            TS_HEADER_SIZE
        };

        (offset <= TS_PACKET_SIZE).then_some(offset)
    }

    /// Payload bytes (empty if there is none).
    pub fn payload(&self) -> &[u8] {
        match self.payload_offset() {
            Some(offset) => &self.data[offset..],
            None => &[],
        }
    }
}

/// Reads aligned TS packets from a seekable stream.
///
/// A packet that does not start with the sync byte halts the source: the
/// error is returned once and every later call reports end of stream.
#[derive(Debug)]
pub struct PacketSource<R> {
    reader: R,
    halted: bool,
}

impl<R: Read + Seek> PacketSource<R> {
    /// Create a new packet source over `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            halted: false,
        }
    }

    /// Read the next packet.
    ///
    /// Returns `Ok(None)` when fewer than 188 bytes remain.
    pub fn next_packet(&mut self) -> Result<Option<TsPacket>, TsError> {
        if self.halted {
            return Ok(None);
        }

        let mut data = [0u8; TS_PACKET_SIZE];
        match self.reader.read_exact(&mut data) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        if data[0] != SYNC_BYTE {
            self.halted = true;
            let offset = self
                .reader
                .stream_position()?
                .saturating_sub(TS_PACKET_SIZE as u64);
            return Err(TsError::SyncByte {
                offset,
                found: data[0],
            });
        }

        Ok(Some(TsPacket { data }))
    }

    /// Step back exactly one packet so the last packet is read again.
    pub fn rewind_one_packet(&mut self) -> Result<(), TsError> {
        self.reader
            .seek(SeekFrom::Current(-(TS_PACKET_SIZE as i64)))?;
        Ok(())
    }

    /// True once a framing error stopped this source.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Give back the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> Iterator for PacketSource<R> {
    type Item = Result<TsPacket, TsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_packet().transpose()
    }
}
