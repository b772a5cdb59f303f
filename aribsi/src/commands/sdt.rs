//! `sdt` command: service and CA contract listing.

use std::collections::BTreeMap;
use std::path::PathBuf;

use aribsi_core::SdtTable;
use log::{debug, error, warn};
use serde::Serialize;

use crate::context::OutputFormat;
use crate::sjis::{opt_to_utf8, to_utf8};

/// Broadcast network inferred from the original network ID.
fn network_name(original_network_id: u16) -> &'static str {
    match original_network_id {
        0x0004 => "BS",
        0x0006 | 0x0007 => "CS",
        _ => "Other",
    }
}

/// Listing order: BS, CS, everything else.
fn network_rank(original_network_id: u16) -> u8 {
    match original_network_id {
        0x0004 => 0,
        0x0006 | 0x0007 => 1,
        _ => 2,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct ContractReport {
    ca_system_id: u16,
    ca_unit_id: u8,
    component_tags: Vec<u8>,
    /// Contract verification info as hex.
    verification_info: String,
    fee_name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct ServiceReport {
    network: &'static str,
    original_network_id: u16,
    transport_stream_id: u16,
    service_id: u16,
    service_type: Option<u8>,
    service_type_name: Option<&'static str>,
    service_name: String,
    provider_name: String,
    running_status: &'static str,
    free_ca_mode: bool,
    eit_schedule: bool,
    eit_present_following: bool,
    contracts: Vec<ContractReport>,
}

type ServiceKey = (u8, u16, u16, u16);

/// Services keyed by (network rank, onid, tsid, sid), which is also the
/// output order.
#[derive(Debug, Default)]
struct ServiceCollector {
    services: BTreeMap<ServiceKey, ServiceReport>,
    actual_only: bool,
}

impl ServiceCollector {
    fn new(actual_only: bool) -> Self {
        ServiceCollector {
            services: BTreeMap::new(),
            actual_only,
        }
    }

    /// Merge one SDT section. The first sighting of a service wins; later
    /// sightings only fill in a missing name or contracts.
    fn add(&mut self, sdt: &SdtTable) {
        if self.actual_only && !sdt.is_actual() {
            return;
        }

        for service in &sdt.services {
            let key = (
                network_rank(sdt.original_network_id),
                sdt.original_network_id,
                sdt.transport_stream_id,
                service.service_id,
            );

            let contracts: Vec<ContractReport> = service
                .ca_contracts
                .iter()
                .map(|c| ContractReport {
                    ca_system_id: c.ca_system_id,
                    ca_unit_id: c.ca_unit_id,
                    component_tags: c.component_tags.clone(),
                    verification_info: c.verification_info_hex(),
                    fee_name: to_utf8(&c.fee_name),
                })
                .collect();

            if let Some(existing) = self.services.get_mut(&key) {
                if existing.service_name.is_empty() {
                    if let Some(name) = service.service_name() {
                        existing.service_name = to_utf8(name);
                    }
                }
                if existing.contracts.is_empty() {
                    existing.contracts = contracts;
                }
                continue;
            }

            self.services.insert(
                key,
                ServiceReport {
                    network: network_name(sdt.original_network_id),
                    original_network_id: sdt.original_network_id,
                    transport_stream_id: sdt.transport_stream_id,
                    service_id: service.service_id,
                    service_type: service.service_type(),
                    service_type_name: service
                        .service_descriptor
                        .as_ref()
                        .map(|d| d.service_type_name()),
                    service_name: opt_to_utf8(service.service_name()),
                    provider_name: opt_to_utf8(service.provider_name()),
                    running_status: service.running_status_name(),
                    free_ca_mode: service.free_ca_mode,
                    eit_schedule: service.eit_schedule_flag,
                    eit_present_following: service.eit_present_following_flag,
                    contracts,
                },
            );
        }
    }

    fn into_reports(self) -> Vec<ServiceReport> {
        self.services.into_values().collect()
    }
}

/// SDT command implementation.
pub fn cmd_sdt(
    input: Vec<PathBuf>,
    pid: u16,
    actual_only: bool,
    no_crc: bool,
    format: OutputFormat,
) -> i32 {
    let mut collector = ServiceCollector::new(actual_only);
    let mut failed = 0;

    for path in &input {
        let result = super::scan_sections(path, pid, !no_crc, |section| {
            match SdtTable::parse(section) {
                Ok(sdt) => collector.add(&sdt),
                Err(e) => debug!("Skipping section: {}", e),
            }
        });
        if let Err(e) = result {
            error!("Failed to scan {}: {}", path.display(), e);
            failed += 1;
        }
    }

    if failed == input.len() {
        return 1;
    }

    let reports = collector.into_reports();
    if reports.is_empty() {
        warn!("No SDT found on PID 0x{:04X}", pid);
    }

    match format {
        OutputFormat::Table => print_services_table(&reports),
        OutputFormat::Json => match serde_json::to_string_pretty(&reports) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize services: {}", e);
                return 1;
            }
        },
    }

    0
}

fn print_services_table(services: &[ServiceReport]) {
    if services.is_empty() {
        println!("No services found.");
        return;
    }

    println!(
        "{:<6} {:<6} {:<6} {:<6} {:<4} {:<24} {:<20} {}",
        "Net", "ONID", "TSID", "SID", "Type", "Name", "Provider", "Scrambled"
    );
    println!("{}", "-".repeat(90));

    for s in services {
        println!(
            "{:<6} {:<6} {:<6} {:<6} {:<4} {:<24} {:<20} {}",
            s.network,
            format!("0x{:04X}", s.original_network_id),
            format!("0x{:04X}", s.transport_stream_id),
            format!("0x{:04X}", s.service_id),
            s.service_type.map(|t| format!("{:02X}", t)).unwrap_or_default(),
            s.service_name.chars().take(24).collect::<String>(),
            s.provider_name.chars().take(20).collect::<String>(),
            if s.free_ca_mode { "Yes" } else { "No" }
        );
        for c in &s.contracts {
            println!(
                "       CA 0x{:04X} unit {:<2} fee {:<20} cvi {}",
                c.ca_system_id, c.ca_unit_id, c.fee_name, c.verification_info
            );
        }
    }

    println!("\nTotal: {} services", services.len());
}
