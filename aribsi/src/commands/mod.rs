//! Subcommand handlers.
//!
//! Each handler returns the process exit code.

mod eit;
mod sdt;

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use aribsi_core::psi::{self, PsiSection};
use aribsi_core::{SectionReassembler, TsError};
use log::{debug, info};

pub(crate) use eit::cmd_eit;
pub(crate) use sdt::cmd_sdt;

/// Counters for one scanned file.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ScanStats {
    pub buffers: usize,
    pub sections: usize,
    pub crc_errors: usize,
    pub malformed: usize,
}

/// Reassemble every section on `pid` in `path` and hand each one to `on_section`.
///
/// Sections failing the CRC check are dropped unless `check_crc` is false.
pub(crate) fn scan_sections<F>(
    path: &Path,
    pid: u16,
    check_crc: bool,
    mut on_section: F,
) -> Result<ScanStats, TsError>
where
    F: FnMut(&PsiSection),
{
    let file = File::open(path)?;
    info!("Scanning {} (PID 0x{:04X})", path.display(), pid);

    let mut reassembler = SectionReassembler::new(BufReader::new(file), pid);
    let mut stats = ScanStats::default();

    while let Some(buffer) = reassembler.pull_section()? {
        stats.buffers += 1;
        for section in psi::sections(&buffer) {
            let section = match section {
                Ok(section) => section,
                Err(e) => {
                    debug!("Malformed section on PID 0x{:04X}: {}", pid, e);
                    stats.malformed += 1;
                    break;
                }
            };
            if check_crc && !section.verify_crc() {
                debug!(
                    "CRC mismatch: table 0x{:02X} ext 0x{:04X}",
                    section.header.table_id, section.header.table_id_extension
                );
                stats.crc_errors += 1;
                continue;
            }
            stats.sections += 1;
            on_section(&section);
        }
    }

    info!(
        "{}: {} sections ({} CRC errors, {} malformed)",
        path.display(),
        stats.sections,
        stats.crc_errors,
        stats.malformed
    );
    Ok(stats)
}
