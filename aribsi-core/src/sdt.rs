//! SDT (Service Description Table) parsing.
//!
//! The SDT is transmitted on PID 0x0011 and describes the services
//! (channels) of a transport stream, including their CA contract info.

use log::debug;

use crate::arib::SjisString;
use crate::descriptors::{descriptor_loop, CaContractInfoDescriptor, ServiceDescriptor};
use crate::error::SiError;
use crate::psi::PsiSection;
use crate::{descriptor_tag, table_id};

/// Service entry in the SDT.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdtService {
    /// Service ID (program number).
    pub service_id: u16,
    /// EIT user defined flags (3 bits).
    pub eit_user_defined_flags: u8,
    /// EIT schedule flag.
    pub eit_schedule_flag: bool,
    /// EIT present/following flag.
    pub eit_present_following_flag: bool,
    /// Running status.
    pub running_status: u8,
    /// Free CA mode (scrambled when set).
    pub free_ca_mode: bool,
    /// Descriptor loop (raw).
    pub descriptors: Vec<u8>,
    /// Parsed service descriptor.
    pub service_descriptor: Option<ServiceDescriptor>,
    /// Parsed CA contract info descriptors.
    pub ca_contracts: Vec<CaContractInfoDescriptor>,
}

impl SdtService {
    /// Parse descriptors and extract known types.
    ///
    /// Malformed descriptors are skipped.
    pub fn parse_descriptors(&mut self) {
        for descriptor in descriptor_loop(&self.descriptors) {
            match descriptor.tag {
                descriptor_tag::SERVICE => match ServiceDescriptor::parse(descriptor.data) {
                    Ok(desc) => self.service_descriptor = Some(desc),
                    Err(e) => debug!("Service 0x{:04X}: bad service descriptor: {}", self.service_id, e),
                },
                descriptor_tag::CA_CONTRACT_INFO => {
                    match CaContractInfoDescriptor::parse(descriptor.data) {
                        Ok(desc) => self.ca_contracts.push(desc),
                        Err(e) => debug!(
                            "Service 0x{:04X}: bad CA contract info descriptor: {}",
                            self.service_id, e
                        ),
                    }
                }
                _ => {}
            }
        }
    }

    /// Get service name (from service descriptor).
    pub fn service_name(&self) -> Option<&SjisString> {
        self.service_descriptor.as_ref().map(|d| &d.service_name)
    }

    /// Get provider name (from service descriptor).
    pub fn provider_name(&self) -> Option<&SjisString> {
        self.service_descriptor.as_ref().map(|d| &d.provider_name)
    }

    /// Get service type (from service descriptor).
    pub fn service_type(&self) -> Option<u8> {
        self.service_descriptor.as_ref().map(|d| d.service_type)
    }

    /// Get running status name.
    pub fn running_status_name(&self) -> &'static str {
        running_status_name(self.running_status)
    }
}

/// Running status values shared by SDT and EIT.
pub fn running_status_name(status: u8) -> &'static str {
    match status {
        0 => "Undefined",
        1 => "Not running",
        2 => "Starts in a few seconds",
        3 => "Pausing",
        4 => "Running",
        5..=7 => "Reserved",
        _ => "Unknown",
    }
}

/// Parsed SDT section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SdtTable {
    /// Table ID (actual or other).
    pub table_id: u8,
    /// Transport stream ID.
    pub transport_stream_id: u16,
    /// Original network ID.
    pub original_network_id: u16,
    /// Version number.
    pub version_number: u8,
    /// Section number.
    pub section_number: u8,
    /// Last section number.
    pub last_section_number: u8,
    /// Services.
    pub services: Vec<SdtService>,
}

impl SdtTable {
    /// Parse a SDT from a PSI section.
    pub fn parse(section: &PsiSection) -> Result<Self, SiError> {
        let header = &section.header;
        if header.table_id != table_id::SDT_ACTUAL && header.table_id != table_id::SDT_OTHER {
            return Err(SiError::UnexpectedTable(header.table_id));
        }

        let data = section.data;
        if data.len() < 3 {
            return Err(SiError::TooShort {
                what: "SDT",
                need: 3,
                got: data.len(),
            });
        }

        let original_network_id = u16::from_be_bytes([data[0], data[1]]);
        // data[2] is reserved

        let mut sdt = SdtTable {
            table_id: header.table_id,
            transport_stream_id: header.table_id_extension,
            original_network_id,
            version_number: header.version_number,
            section_number: header.section_number,
            last_section_number: header.last_section_number,
            services: Vec::new(),
        };

        // Parse service loop
        let mut offset = 3;
        while offset + 5 <= data.len() {
            let service_id = u16::from_be_bytes([data[offset], data[offset + 1]]);
            let eit_user_defined_flags = (data[offset + 2] >> 2) & 0x07;
            let eit_schedule_flag = data[offset + 2] & 0x02 != 0;
            let eit_present_following_flag = data[offset + 2] & 0x01 != 0;
            let running_status = (data[offset + 3] >> 5) & 0x07;
            let free_ca_mode = data[offset + 3] & 0x10 != 0;
            let descriptors_length =
                ((data[offset + 3] as usize & 0x0F) << 8) | data[offset + 4] as usize;

            offset += 5;

            if offset + descriptors_length > data.len() {
                debug!(
                    "SDT TSID 0x{:04X}: service 0x{:04X} descriptors overrun the section",
                    sdt.transport_stream_id, service_id
                );
                break;
            }

            let descriptors = data[offset..offset + descriptors_length].to_vec();
            offset += descriptors_length;

            let mut service = SdtService {
                service_id,
                eit_user_defined_flags,
                eit_schedule_flag,
                eit_present_following_flag,
                running_status,
                free_ca_mode,
                descriptors,
                ..Default::default()
            };
            service.parse_descriptors();

            sdt.services.push(service);
        }

        Ok(sdt)
    }

    /// Find service by service ID.
    pub fn find_service(&self, service_id: u16) -> Option<&SdtService> {
        self.services.iter().find(|s| s.service_id == service_id)
    }

    /// Get all service IDs.
    pub fn service_ids(&self) -> Vec<u16> {
        self.services.iter().map(|s| s.service_id).collect()
    }

    /// True for SDT actual (describing the current TS).
    pub fn is_actual(&self) -> bool {
        self.table_id == table_id::SDT_ACTUAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::tests::build_section;

    const LS1: u8 = 0x0E;

    fn sdt_body() -> Vec<u8> {
        vec![
            // Original network ID = 0x0004 (BS)
            0x00, 0x04,
            // Reserved byte
            0xFF,
            // Service entry: service_id=0x0065
            0x00, 0x65,
            // user defined flags=0b101, EIT schedule=1, EIT p/f=1
            0xF7,
            // running_status=4 (running), free_ca=1, descriptors_length=24
            0x90, 0x18,
            // Service descriptor: tag=0x48, length=11
            0x48, 0x0B,
            0x01,
            0x04, LS1, b'A', b'B', b'C',
            0x04, LS1, b'B', b'S', b'1',
            // CA contract info: tag=0xCB, length=9
            0xCB, 0x09,
            0x00, 0x05, 0x10,
            0x02, 0x12, 0x34,
            0x02, LS1, b'X',
            // Service entry: service_id=0x0066, no descriptors
            0x00, 0x66, 0xFD, 0x80, 0x00,
        ]
    }

    #[test]
    fn test_parse_sdt() {
        let raw = build_section(table_id::SDT_ACTUAL, 0x4010, 1, &sdt_body());
        let section = PsiSection::parse(&raw).unwrap();
        assert!(section.verify_crc());
        let sdt = SdtTable::parse(&section).unwrap();

        assert!(sdt.is_actual());
        assert_eq!(sdt.transport_stream_id, 0x4010);
        assert_eq!(sdt.original_network_id, 0x0004);
        assert_eq!(sdt.version_number, 1);
        assert_eq!(sdt.services.len(), 2);
        assert_eq!(sdt.service_ids(), vec![0x0065, 0x0066]);

        let service = &sdt.services[0];
        assert_eq!(service.eit_user_defined_flags, 0b101);
        assert!(service.eit_schedule_flag);
        assert!(service.eit_present_following_flag);
        assert_eq!(service.running_status, 4);
        assert_eq!(service.running_status_name(), "Running");
        assert!(service.free_ca_mode);
        assert_eq!(service.service_type(), Some(0x01));
        assert_eq!(service.provider_name().unwrap().as_bytes(), b"ABC");
        assert_eq!(service.service_name().unwrap().as_bytes(), b"BS1");

        assert_eq!(service.ca_contracts.len(), 1);
        let contract = &service.ca_contracts[0];
        assert_eq!(contract.ca_system_id, 0x0005);
        assert_eq!(contract.verification_info_hex(), "1234");
        assert_eq!(contract.fee_name.as_bytes(), b"X");

        let second = sdt.find_service(0x0066).unwrap();
        assert!(!second.free_ca_mode);
        assert!(second.service_descriptor.is_none());
        assert!(second.ca_contracts.is_empty());
        assert!(sdt.find_service(0x0067).is_none());
    }

    #[test]
    fn test_sdt_other() {
        let raw = build_section(table_id::SDT_OTHER, 0x4011, 0, &[0x00, 0x06, 0xFF]);
        let section = PsiSection::parse(&raw).unwrap();
        let sdt = SdtTable::parse(&section).unwrap();
        assert!(!sdt.is_actual());
        assert!(sdt.services.is_empty());
    }

    #[test]
    fn test_sdt_rejects_other_tables() {
        let raw = build_section(0x4E, 1, 0, &[0; 8]);
        let section = PsiSection::parse(&raw).unwrap();
        assert_eq!(SdtTable::parse(&section), Err(SiError::UnexpectedTable(0x4E)));
    }

    #[test]
    fn test_service_loop_stops_on_overrun() {
        let body = [
            0x00, 0x04, 0xFF, //
            0x00, 0x65, 0xFD, 0x80, 0x00, // fine
            0x00, 0x66, 0xFD, 0x80, 0x40, // 64 bytes of descriptors missing
            0x48, 0x00,
        ];
        let raw = build_section(table_id::SDT_ACTUAL, 1, 0, &body);
        let section = PsiSection::parse(&raw).unwrap();
        let sdt = SdtTable::parse(&section).unwrap();
        assert_eq!(sdt.service_ids(), vec![0x0065]);
    }

    #[test]
    fn test_bad_descriptor_is_skipped() {
        let body = [
            0x00, 0x04, 0xFF, //
            0x00, 0x65, 0xFD, 0x80, 0x04, //
            0x48, 0x02, 0x01, 0x09, // provider name overruns
        ];
        let raw = build_section(table_id::SDT_ACTUAL, 1, 0, &body);
        let section = PsiSection::parse(&raw).unwrap();
        let sdt = SdtTable::parse(&section).unwrap();
        assert_eq!(sdt.services.len(), 1);
        assert!(sdt.services[0].service_descriptor.is_none());
    }
}
