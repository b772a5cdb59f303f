//! ARIB SI reader for MPEG-2 transport streams.
//!
//! This crate reassembles PSI/SI sections from 188-byte TS packets and
//! decodes ARIB STD-B24 8-bit character strings to Shift_JIS.
//!
//! # Supported Tables
//! - SDT (Service Description Table) - PID 0x0011
//! - EIT (Event Information Table) - PID 0x0012
//!
//! # Usage
//! ```ignore
//! use aribsi_core::{pid, psi, SdtTable, SectionReassembler};
//!
//! let mut reassembler = SectionReassembler::new(file, pid::SDT);
//! while let Some(buffer) = reassembler.pull_section()? {
//!     for section in psi::sections(&buffer).flatten() {
//!         let sdt = SdtTable::parse(&section)?;
//!     }
//! }
//! ```

pub mod arib;
pub mod descriptors;
pub mod eit;
mod error;
pub mod packet;
pub mod psi;
pub mod reassembler;
pub mod sdt;
pub mod time;

pub use arib::{decode, decode_with, DecoderState, SjisString};
pub use eit::{EitEvent, EitTable};
pub use error::{AribError, SiError, TsError};
pub use packet::{PacketSource, TsHeader, TsPacket, SYNC_BYTE, TS_PACKET_SIZE};
pub use psi::{PsiHeader, PsiSection};
pub use reassembler::{ReassemblyState, SectionReassembler, MAX_SECTION_PAYLOAD};
pub use sdt::{SdtService, SdtTable};

/// Well-known PIDs in MPEG-TS.
pub mod pid {
    /// Service Description Table PID.
    pub const SDT: u16 = 0x0011;
    /// Event Information Table PID.
    pub const EIT: u16 = 0x0012;
    /// EIT PID carrying the basic schedule on BS/CS (H-EIT).
    pub const EIT_BASIC: u16 = 0x0026;
    /// EIT PID carrying the extended schedule on BS/CS.
    pub const EIT_EXTENDED: u16 = 0x0027;
}

/// Table IDs for PSI/SI tables.
pub mod table_id {
    /// Service Description Section - actual.
    pub const SDT_ACTUAL: u8 = 0x42;
    /// Service Description Section - other.
    pub const SDT_OTHER: u8 = 0x46;
    /// Event Information Section - present/following, actual.
    pub const EIT_PF_ACTUAL: u8 = 0x4E;
    /// Event Information Section - present/following, other.
    pub const EIT_PF_OTHER: u8 = 0x4F;
    /// First Event Information Section - schedule, actual.
    pub const EIT_SCHEDULE_ACTUAL_FIRST: u8 = 0x50;
    /// Last Event Information Section - schedule, actual.
    pub const EIT_SCHEDULE_ACTUAL_LAST: u8 = 0x5F;
    /// First Event Information Section - schedule, other.
    pub const EIT_SCHEDULE_OTHER_FIRST: u8 = 0x60;
    /// Last Event Information Section - schedule, other.
    pub const EIT_SCHEDULE_OTHER_LAST: u8 = 0x6F;
}

/// Descriptor tags used in PSI/SI tables.
pub mod descriptor_tag {
    /// Service descriptor.
    pub const SERVICE: u8 = 0x48;
    /// Short event descriptor.
    pub const SHORT_EVENT: u8 = 0x4D;
    /// Extended event descriptor.
    pub const EXTENDED_EVENT: u8 = 0x4E;
    /// Component descriptor.
    pub const COMPONENT: u8 = 0x50;
    /// Content descriptor.
    pub const CONTENT: u8 = 0x54;
    /// Parental rating descriptor.
    pub const PARENTAL_RATING: u8 = 0x55;
    /// Digital copy control descriptor.
    pub const DIGITAL_COPY_CONTROL: u8 = 0xC1;
    /// Audio component descriptor.
    pub const AUDIO_COMPONENT: u8 = 0xC4;
    /// Hyperlink descriptor.
    pub const HYPERLINK: u8 = 0xC5;
    /// Data content descriptor.
    pub const DATA_CONTENT: u8 = 0xC7;
    /// CA contract info descriptor.
    pub const CA_CONTRACT_INFO: u8 = 0xCB;
    /// Series descriptor.
    pub const SERIES: u8 = 0xD5;
    /// Event group descriptor.
    pub const EVENT_GROUP: u8 = 0xD6;
    /// Component group descriptor.
    pub const COMPONENT_GROUP: u8 = 0xD9;
    /// LDT linkage descriptor.
    pub const LDT_LINKAGE: u8 = 0xDC;
}
