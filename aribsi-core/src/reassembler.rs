//! PSI/SI section reassembly.
//!
//! Sections are rebuilt from the payloads of consecutive packets on one PID.
//! A section is complete when the next payload unit start is seen on that
//! PID; the stream is then rewound by one packet so the same packet starts
//! the following section on the next call.
//!
//! Continuity counter gaps (including one right before the next payload unit
//! start), adaptation-only packets and oversized sections discard the section
//! in progress. No partial section is ever returned.
//! CRC is not checked here, see [`crate::psi::PsiSection::verify_crc`].

use std::io::{Read, Seek};

use log::{debug, warn};

use crate::error::TsError;
use crate::packet::{
    PacketSource, TsPacket, AFC_ADAPTATION_ONLY, AFC_PAYLOAD_ONLY, TS_PACKET_SIZE,
};

/// Largest payload accumulated for one section (23 packets).
///
/// Covers a 4096-byte EIT section plus stuffing.
pub const MAX_SECTION_PAYLOAD: usize = TS_PACKET_SIZE * 23;

/// Payload bytes collected so far for one PID.
#[derive(Debug)]
pub struct ReassemblyState {
    buffer: Vec<u8>,
    next_counter: Option<u8>,
}

impl Default for ReassemblyState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReassemblyState {
    /// Create an empty state with the buffer pre-sized to capacity.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_SECTION_PAYLOAD),
            next_counter: None,
        }
    }

    /// True when no section is in progress.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of bytes collected.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes collected so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Continuity counter expected on the next continuation packet.
    pub fn next_counter(&self) -> Option<u8> {
        self.next_counter
    }

    /// Drop the section in progress.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.next_counter = None;
    }

    /// Append payload bytes.
    ///
    /// If the result would exceed [`MAX_SECTION_PAYLOAD`] the state is reset
    /// instead and `false` is returned.
    pub fn append(&mut self, bytes: &[u8]) -> bool {
        if self.buffer.len() + bytes.len() > MAX_SECTION_PAYLOAD {
            debug!(
                "Section overflow: {} + {} bytes exceeds {}, discarding",
                self.buffer.len(),
                bytes.len(),
                MAX_SECTION_PAYLOAD
            );
            self.reset();
            return false;
        }
        self.buffer.extend_from_slice(bytes);
        true
    }

    /// Record `counter` as the last accepted continuity counter.
    pub fn accept_counter(&mut self, counter: u8) {
        self.next_counter = Some((counter + 1) & 0x0F);
    }

    /// Hand the collected bytes out and leave the state empty.
    pub fn take(&mut self) -> Vec<u8> {
        self.next_counter = None;
        std::mem::replace(&mut self.buffer, Vec::with_capacity(MAX_SECTION_PAYLOAD))
    }
}

/// Pulls complete sections for one PID out of a packet stream.
#[derive(Debug)]
pub struct SectionReassembler<R> {
    source: PacketSource<R>,
    pid: u16,
    state: ReassemblyState,
}

impl<R: Read + Seek> SectionReassembler<R> {
    /// Reassemble sections of `pid` from `reader`.
    pub fn new(reader: R, pid: u16) -> Self {
        Self::from_source(PacketSource::new(reader), pid)
    }

    /// Reassemble sections of `pid` from an existing packet source.
    pub fn from_source(source: PacketSource<R>, pid: u16) -> Self {
        Self {
            source,
            pid,
            state: ReassemblyState::new(),
        }
    }

    /// Target PID.
    pub fn pid(&self) -> u16 {
        self.pid
    }

    /// Current reassembly state.
    pub fn state(&self) -> &ReassemblyState {
        &self.state
    }

    /// Give back the packet source.
    pub fn into_source(self) -> PacketSource<R> {
        self.source
    }

    /// Scan forward until a section completes.
    ///
    /// Returns `Ok(None)` at end of stream. A framing error ends the scan and
    /// is reported as end of stream; only I/O failures are returned as errors.
    pub fn pull_section(&mut self) -> Result<Option<Vec<u8>>, TsError> {
        loop {
            let packet = match self.source.next_packet() {
                Ok(Some(packet)) => packet,
                Ok(None) => {
                    if !self.state.is_empty() {
                        debug!(
                            "PID 0x{:04X}: end of stream with {} bytes pending, discarding",
                            self.pid,
                            self.state.len()
                        );
                        self.state.reset();
                    }
                    return Ok(None);
                }
                Err(TsError::SyncByte { offset, found }) => {
                    warn!(
                        "PID 0x{:04X}: invalid sync byte 0x{:02X} at offset {}, stopping scan",
                        self.pid, found, offset
                    );
                    self.state.reset();
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };

            if self.process_packet(&packet) {
                self.source.rewind_one_packet()?;
                return Ok(Some(self.state.take()));
            }
        }
    }

    /// Feed one packet into the state.
    ///
    /// Returns true when the in-progress section is complete. The packet that
    /// completed it has to be read again as the start of the next section.
    fn process_packet(&mut self, packet: &TsPacket) -> bool {
        let header = packet.header();
        if header.pid != self.pid {
            return false;
        }

        if header.adaptation_field_control == AFC_ADAPTATION_ONLY {
            if !self.state.is_empty() {
                debug!(
                    "PID 0x{:04X}: adaptation-only packet, discarding {} bytes",
                    self.pid,
                    self.state.len()
                );
            }
            self.state.reset();
            return false;
        }

        if !header.has_payload() {
            return false;
        }

        let Some(offset) = packet.payload_offset() else {
            debug!(
                "PID 0x{:04X}: adaptation field overruns packet, discarding",
                self.pid
            );
            self.state.reset();
            return false;
        };
        let data = packet.as_bytes();
        let counter = header.continuity_counter;

        if header.payload_unit_start {
            if offset >= TS_PACKET_SIZE {
                self.state.reset();
                return false;
            }
            let pointer = data[offset] as usize;

            // The completing packet must continue the counter sequence too.
            if !self.state.is_empty() && self.state.next_counter() != Some(counter) {
                debug!(
                    "PID 0x{:04X}: continuity counter {} at section start (expected {:?}), discarding {} bytes",
                    self.pid,
                    counter,
                    self.state.next_counter(),
                    self.state.len()
                );
                self.state.reset();
            }

            if self.state.is_empty() {
                let start = offset + 1 + pointer;
                if start >= TS_PACKET_SIZE {
                    debug!(
                        "PID 0x{:04X}: pointer field {} points past the packet",
                        self.pid, pointer
                    );
                    return false;
                }
                if self.state.append(&data[start..]) {
                    self.state.accept_counter(counter);
                }
                return false;
            }

            // Leading bytes before the new section finish the previous one.
            if pointer != 0 && header.adaptation_field_control == AFC_PAYLOAD_ONLY {
                let tail_start = offset + 1;
                let tail_end = tail_start + pointer;
                if tail_end > TS_PACKET_SIZE {
                    debug!(
                        "PID 0x{:04X}: pointer field {} points past the packet, discarding",
                        self.pid, pointer
                    );
                    self.state.reset();
                    return false;
                }
                if !self.state.append(&data[tail_start..tail_end]) {
                    return false;
                }
            }
            return true;
        }

        if self.state.is_empty() {
            return false;
        }

        if self.state.next_counter() != Some(counter) {
            debug!(
                "PID 0x{:04X}: continuity counter {} (expected {:?}), discarding {} bytes",
                self.pid,
                counter,
                self.state.next_counter(),
                self.state.len()
            );
            self.state.reset();
            return false;
        }

        if self.state.append(&data[offset..]) {
            self.state.accept_counter(counter);
        }
        false
    }
}

impl<R: Read + Seek> Iterator for SectionReassembler<R> {
    type Item = Result<Vec<u8>, TsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pull_section().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::tests::make_packet;
    use crate::packet::{AFC_ADAPTATION_AND_PAYLOAD, SYNC_BYTE};
    use std::io::Cursor;

    const PID: u16 = 0x0012;

    /// Payload-unit-start packet with the given pointer field and body.
    fn start_packet(cc: u8, pointer: u8, body: &[u8]) -> Vec<u8> {
        let mut payload = vec![pointer];
        payload.extend_from_slice(body);
        make_packet(PID, true, AFC_PAYLOAD_ONLY, cc, &payload)
    }

    fn continuation(cc: u8, body: &[u8]) -> Vec<u8> {
        make_packet(PID, false, AFC_PAYLOAD_ONLY, cc, body)
    }

    fn pattern(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(7).wrapping_add(seed)).collect()
    }

    fn reassembler(packets: &[Vec<u8>]) -> SectionReassembler<Cursor<Vec<u8>>> {
        SectionReassembler::new(Cursor::new(packets.concat()), PID)
    }

    #[test]
    fn test_reassemble_across_packets() {
        let p1 = start_packet(0, 0, &pattern(183, 1));
        let p2 = continuation(1, &pattern(184, 2));
        let p3 = continuation(2, &pattern(40, 3));
        let p4 = start_packet(3, 0, &pattern(30, 4));
        let p5 = start_packet(4, 0, &[]);

        let mut expected = p1[5..].to_vec();
        expected.extend_from_slice(&p2[4..]);
        expected.extend_from_slice(&p3[4..]);

        let mut r = reassembler(&[p1, p2, p3, p4.clone(), p5]);
        let section = r.pull_section().unwrap().unwrap();
        assert_eq!(section, expected);
        assert_eq!(section.len(), 183 + 184 + 184);

        // The completing packet is read again as the next section start.
        let next = r.pull_section().unwrap().unwrap();
        assert_eq!(next, p4[5..].to_vec());

        // The last start never completes.
        assert!(r.pull_section().unwrap().is_none());
    }

    #[test]
    fn test_continuity_gap_discards_section() {
        let p1 = start_packet(0, 0, &pattern(183, 1));
        let p2 = continuation(2, &pattern(184, 2)); // counter 1 dropped
        let p3 = continuation(3, &pattern(184, 3));
        let p4 = start_packet(4, 0, &pattern(183, 4));
        let p5 = continuation(5, &pattern(184, 5));
        let p6 = start_packet(6, 0, &[]);

        let mut expected = p4[5..].to_vec();
        expected.extend_from_slice(&p5[4..]);

        let mut r = reassembler(&[p1, p2, p3, p4, p5, p6]);
        assert_eq!(r.pull_section().unwrap().unwrap(), expected);
        assert!(r.pull_section().unwrap().is_none());
    }

    #[test]
    fn test_gap_before_next_start_discards_section() {
        let p1 = start_packet(0, 0, &pattern(183, 1));
        let p2 = continuation(1, &pattern(184, 2));
        // counter 2 dropped
        let p4 = start_packet(3, 0, &pattern(183, 4));
        let p5 = start_packet(4, 0, &[]);

        let mut r = reassembler(&[p1, p2, p4.clone(), p5]);
        // The truncated section is dropped and the start packet begins a new one.
        assert_eq!(r.pull_section().unwrap().unwrap(), p4[5..].to_vec());
        assert!(r.pull_section().unwrap().is_none());
    }

    #[test]
    fn test_pointer_field_tail_goes_to_previous_section() {
        let p1 = start_packet(0, 0, &pattern(183, 1));
        let p2 = start_packet(1, 10, &pattern(183, 2));
        let p3 = start_packet(2, 0, &[]);

        let mut first = p1[5..].to_vec();
        first.extend_from_slice(&p2[5..15]);

        let mut r = reassembler(&[p1, p2.clone(), p3]);
        assert_eq!(r.pull_section().unwrap().unwrap(), first);
        assert_eq!(r.pull_section().unwrap().unwrap(), p2[15..].to_vec());
        assert!(r.pull_section().unwrap().is_none());
    }

    #[test]
    fn test_pointer_field_ignored_with_adaptation_field() {
        let p1 = start_packet(0, 0, &pattern(183, 1));
        // adaptation_field_length = 2, then pointer field = 4
        let mut body = vec![2, 0x00, 0x00, 4];
        body.extend(pattern(179, 2));
        let p2 = make_packet(PID, true, AFC_ADAPTATION_AND_PAYLOAD, 1, &body);
        let p3 = start_packet(2, 0, &[]);

        let mut r = reassembler(&[p1.clone(), p2.clone(), p3]);
        assert_eq!(r.pull_section().unwrap().unwrap(), p1[5..].to_vec());
        // Second section starts after header, adaptation field, pointer and 4 skipped bytes.
        assert_eq!(r.pull_section().unwrap().unwrap(), p2[4 + 3 + 1 + 4..].to_vec());
    }

    #[test]
    fn test_continuation_skips_adaptation_field() {
        let p1 = start_packet(0, 0, &pattern(183, 1));
        let mut body = vec![5, 0, 0, 0, 0, 0];
        body.extend(pattern(178, 2));
        let p2 = make_packet(PID, false, AFC_ADAPTATION_AND_PAYLOAD, 1, &body);
        let p3 = start_packet(2, 0, &[]);

        let mut expected = p1[5..].to_vec();
        expected.extend_from_slice(&p2[10..]);

        let mut r = reassembler(&[p1, p2, p3]);
        assert_eq!(r.pull_section().unwrap().unwrap(), expected);
    }

    #[test]
    fn test_adaptation_only_packet_resets() {
        let p1 = start_packet(0, 0, &pattern(183, 1));
        let p2 = make_packet(PID, false, AFC_ADAPTATION_ONLY, 1, &[183]);
        let p3 = continuation(1, &pattern(184, 3));
        let p4 = start_packet(2, 0, &pattern(183, 4));
        let p5 = start_packet(3, 0, &[]);

        let mut r = reassembler(&[p1, p2, p3, p4.clone(), p5]);
        assert_eq!(r.pull_section().unwrap().unwrap(), p4[5..].to_vec());
    }

    #[test]
    fn test_other_pids_are_ignored() {
        let p1 = start_packet(0, 0, &pattern(183, 1));
        let other = make_packet(0x0011, false, AFC_PAYLOAD_ONLY, 9, &pattern(184, 9));
        let p2 = continuation(1, &pattern(184, 2));
        let p3 = start_packet(2, 0, &[]);

        let mut expected = p1[5..].to_vec();
        expected.extend_from_slice(&p2[4..]);

        let mut r = reassembler(&[p1, other, p2, p3]);
        assert_eq!(r.pid(), PID);
        assert_eq!(r.pull_section().unwrap().unwrap(), expected);
    }

    #[test]
    fn test_continuation_without_start_is_ignored() {
        let p1 = continuation(5, &pattern(184, 1));
        let p2 = start_packet(6, 0, &pattern(183, 2));
        let p3 = start_packet(7, 0, &[]);

        let mut r = reassembler(&[p1, p2.clone(), p3]);
        assert_eq!(r.pull_section().unwrap().unwrap(), p2[5..].to_vec());
    }

    #[test]
    fn test_continuity_counter_wraps() {
        let p1 = start_packet(15, 0, &pattern(183, 1));
        let p2 = continuation(0, &pattern(184, 2));
        let p3 = start_packet(1, 0, &[]);

        let mut r = reassembler(&[p1, p2, p3]);
        assert_eq!(r.pull_section().unwrap().unwrap().len(), 183 + 184);
    }

    #[test]
    fn test_overflow_discards_section() {
        let mut packets = vec![start_packet(0, 0, &pattern(183, 1))];
        for i in 1..=23u8 {
            packets.push(continuation(i & 0x0F, &pattern(184, i)));
        }
        let fresh = start_packet(8, 0, &pattern(183, 50));
        packets.push(fresh.clone());
        packets.push(start_packet(9, 0, &[]));

        let mut r = reassembler(&packets);
        let section = r.pull_section().unwrap().unwrap();
        assert_eq!(section, fresh[5..].to_vec());
    }

    #[test]
    fn test_state_overflow_resets() {
        let mut state = ReassemblyState::new();
        assert!(state.append(&vec![0xAA; MAX_SECTION_PAYLOAD - 1]));
        assert!(state.append(&[0xBB]));
        assert_eq!(state.len(), MAX_SECTION_PAYLOAD);

        assert!(!state.append(&[0xCC]));
        assert!(state.is_empty());
        assert_eq!(state.next_counter(), None);
    }

    #[test]
    fn test_state_take_leaves_empty() {
        let mut state = ReassemblyState::new();
        state.append(&[1, 2, 3]);
        state.accept_counter(15);
        assert_eq!(state.next_counter(), Some(0));

        assert_eq!(state.take(), vec![1, 2, 3]);
        assert!(state.is_empty());
        assert_eq!(state.next_counter(), None);
    }

    #[test]
    fn test_sync_error_reported_as_end_of_stream() {
        let p1 = start_packet(0, 0, &pattern(183, 1));
        let mut broken = start_packet(1, 0, &[]);
        broken[0] = 0x00;
        let p3 = start_packet(2, 0, &[]);
        assert_ne!(p3[0], 0x00);
        assert_eq!(p3[0], SYNC_BYTE);

        let mut r = reassembler(&[p1, broken, p3]);
        assert!(r.pull_section().unwrap().is_none());
        assert!(r.pull_section().unwrap().is_none());
        assert!(r.into_source().is_halted());
    }

    #[test]
    fn test_iterator_yields_all_sections() {
        let packets = vec![
            start_packet(0, 0, &pattern(10, 1)),
            start_packet(1, 0, &pattern(10, 2)),
            start_packet(2, 0, &pattern(10, 3)),
            start_packet(3, 0, &[]),
        ];
        let sections: Vec<Vec<u8>> = reassembler(&packets).map(|s| s.unwrap()).collect();
        assert_eq!(sections.len(), 3);
        assert_eq!(&sections[1][..10], &pattern(10, 2)[..]);
    }
}
