//! EIT (Event Information Table) parsing.
//!
//! Transmitted on PID 0x0012 (0x0026 and 0x0027 carry the same tables on
//! satellite). Table ids 0x4E/0x4F carry present/following, 0x50..=0x6F the
//! schedule, split into 3-hour segments of 8 sections each.

use chrono::{Duration, NaiveDateTime};
use log::debug;

use crate::arib::SjisString;
use crate::descriptors::{
    descriptor_loop, merge_extended_items, AudioComponentDescriptor, ComponentDescriptor,
    ComponentGroupDescriptor, ContentDescriptor, DataContentDescriptor,
    DigitalCopyControlDescriptor, EventGroupDescriptor, ExtendedEventDescriptor,
    HyperlinkDescriptor, LdtLinkageDescriptor, ParentalRatingDescriptor, SeriesDescriptor,
    ShortEventDescriptor,
};
use crate::error::SiError;
use crate::psi::PsiSection;
use crate::time::{decode_duration, decode_start_time};
use crate::{descriptor_tag, table_id};

/// Size of the fixed part of an event entry.
const EVENT_HEADER_SIZE: usize = 12;

/// One event of an EIT section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EitEvent {
    pub event_id: u16,
    /// JST start time; `None` when undefined.
    pub start_time: Option<NaiveDateTime>,
    /// `None` when undefined.
    pub duration: Option<Duration>,
    pub running_status: u8,
    pub free_ca_mode: bool,
    /// Descriptor loop (raw).
    pub descriptors: Vec<u8>,
    pub short_event: Option<ShortEventDescriptor>,
    pub extended_events: Vec<ExtendedEventDescriptor>,
    pub component: Option<ComponentDescriptor>,
    pub content: Option<ContentDescriptor>,
    pub audio_components: Vec<AudioComponentDescriptor>,
    pub data_contents: Vec<DataContentDescriptor>,
    pub series: Option<SeriesDescriptor>,
    pub event_groups: Vec<EventGroupDescriptor>,
    pub parental_rating: Option<ParentalRatingDescriptor>,
    pub copy_control: Option<DigitalCopyControlDescriptor>,
    pub component_group: Option<ComponentGroupDescriptor>,
    pub ldt_linkages: Vec<LdtLinkageDescriptor>,
    pub hyperlinks: Vec<HyperlinkDescriptor>,
    /// Descriptors with no parser, as (tag, body).
    pub unknown_descriptors: Vec<(u8, Vec<u8>)>,
}

impl EitEvent {
    /// Parse descriptors and extract known types. Malformed ones are skipped;
    /// unrecognised tags are kept raw in `unknown_descriptors`.
    pub fn parse_descriptors(&mut self) {
        for descriptor in descriptor_loop(&self.descriptors) {
            let result = match descriptor.tag {
                descriptor_tag::SHORT_EVENT => ShortEventDescriptor::parse(descriptor.data)
                    .map(|d| self.short_event = Some(d)),
                descriptor_tag::EXTENDED_EVENT => ExtendedEventDescriptor::parse(descriptor.data)
                    .map(|d| self.extended_events.push(d)),
                descriptor_tag::COMPONENT => ComponentDescriptor::parse(descriptor.data)
                    .map(|d| self.component = Some(d)),
                descriptor_tag::CONTENT => {
                    ContentDescriptor::parse(descriptor.data).map(|d| self.content = Some(d))
                }
                descriptor_tag::AUDIO_COMPONENT => AudioComponentDescriptor::parse(descriptor.data)
                    .map(|d| self.audio_components.push(d)),
                descriptor_tag::DATA_CONTENT => DataContentDescriptor::parse(descriptor.data)
                    .map(|d| self.data_contents.push(d)),
                descriptor_tag::SERIES => {
                    SeriesDescriptor::parse(descriptor.data).map(|d| self.series = Some(d))
                }
                descriptor_tag::EVENT_GROUP => EventGroupDescriptor::parse(descriptor.data)
                    .map(|d| self.event_groups.push(d)),
                descriptor_tag::PARENTAL_RATING => ParentalRatingDescriptor::parse(descriptor.data)
                    .map(|d| self.parental_rating = Some(d)),
                descriptor_tag::DIGITAL_COPY_CONTROL => {
                    DigitalCopyControlDescriptor::parse(descriptor.data)
                        .map(|d| self.copy_control = Some(d))
                }
                descriptor_tag::COMPONENT_GROUP => ComponentGroupDescriptor::parse(descriptor.data)
                    .map(|d| self.component_group = Some(d)),
                descriptor_tag::LDT_LINKAGE => LdtLinkageDescriptor::parse(descriptor.data)
                    .map(|d| self.ldt_linkages.push(d)),
                descriptor_tag::HYPERLINK => HyperlinkDescriptor::parse(descriptor.data)
                    .map(|d| self.hyperlinks.push(d)),
                tag => {
                    self.unknown_descriptors.push((tag, descriptor.data.to_vec()));
                    Ok(())
                }
            };
            if let Err(e) = result {
                debug!(
                    "Event 0x{:04X}: bad descriptor 0x{:02X}: {}",
                    self.event_id, descriptor.tag, e
                );
            }
        }
    }

    /// Event name from the short event descriptor.
    pub fn title(&self) -> Option<&SjisString> {
        self.short_event.as_ref().map(|d| &d.event_name)
    }

    /// Description from the short event descriptor.
    pub fn text(&self) -> Option<&SjisString> {
        self.short_event.as_ref().map(|d| &d.text)
    }

    /// End time when both start and duration are defined.
    pub fn end_time(&self) -> Option<NaiveDateTime> {
        Some(self.start_time? + self.duration?)
    }

    /// Extended event items joined across descriptors.
    pub fn extended_items(&self) -> Result<Vec<(SjisString, SjisString)>, SiError> {
        merge_extended_items(&self.extended_events)
    }
}

/// Parsed EIT section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EitTable {
    pub table_id: u8,
    /// Service ID (table id extension).
    pub service_id: u16,
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub version_number: u8,
    pub current_next_indicator: bool,
    pub section_number: u8,
    pub last_section_number: u8,
    pub segment_last_section_number: u8,
    pub last_table_id: u8,
    pub events: Vec<EitEvent>,
}

impl EitTable {
    /// Parse an EIT from a PSI section.
    pub fn parse(section: &PsiSection) -> Result<Self, SiError> {
        let header = &section.header;
        if !is_eit_table_id(header.table_id) {
            return Err(SiError::UnexpectedTable(header.table_id));
        }

        let data = section.data;
        if data.len() < 6 {
            return Err(SiError::TooShort {
                what: "EIT",
                need: 6,
                got: data.len(),
            });
        }

        let mut eit = EitTable {
            table_id: header.table_id,
            service_id: header.table_id_extension,
            transport_stream_id: u16::from_be_bytes([data[0], data[1]]),
            original_network_id: u16::from_be_bytes([data[2], data[3]]),
            version_number: header.version_number,
            current_next_indicator: header.current_next_indicator,
            section_number: header.section_number,
            last_section_number: header.last_section_number,
            segment_last_section_number: data[4],
            last_table_id: data[5],
            events: Vec::new(),
        };

        let mut offset = 6;
        while offset + EVENT_HEADER_SIZE <= data.len() {
            let entry = &data[offset..offset + EVENT_HEADER_SIZE];
            let event_id = u16::from_be_bytes([entry[0], entry[1]]);
            let start_time = decode_start_time(&[entry[2], entry[3], entry[4], entry[5], entry[6]]);
            let duration = decode_duration(&[entry[7], entry[8], entry[9]]);
            let running_status = (entry[10] >> 5) & 0x07;
            let free_ca_mode = entry[10] & 0x10 != 0;
            let descriptors_length = ((entry[10] as usize & 0x0F) << 8) | entry[11] as usize;

            offset += EVENT_HEADER_SIZE;

            if offset + descriptors_length > data.len() {
                debug!(
                    "EIT SID 0x{:04X}: event 0x{:04X} descriptors overrun the section",
                    eit.service_id, event_id
                );
                break;
            }

            let mut event = EitEvent {
                event_id,
                start_time,
                duration,
                running_status,
                free_ca_mode,
                descriptors: data[offset..offset + descriptors_length].to_vec(),
                ..Default::default()
            };
            offset += descriptors_length;

            event.parse_descriptors();
            eit.events.push(event);
        }

        Ok(eit)
    }

    /// True for the present/following tables (0x4E, 0x4F).
    pub fn is_present_following(&self) -> bool {
        matches!(
            self.table_id,
            table_id::EIT_PF_ACTUAL | table_id::EIT_PF_OTHER
        )
    }

    /// True for tables describing the current TS.
    pub fn is_actual(&self) -> bool {
        matches!(
            self.table_id,
            table_id::EIT_PF_ACTUAL | table_id::EIT_SCHEDULE_ACTUAL_FIRST..=table_id::EIT_SCHEDULE_ACTUAL_LAST
        )
    }

    /// Day offset (0-based) and first hour of the 3-hour segment a
    /// schedule section covers.
    pub fn schedule_segment(&self) -> Option<(u8, u8)> {
        if self.is_present_following() {
            return None;
        }
        let segment = self.section_number / 8;
        let day = (self.table_id & 0x07) * 4 + segment / 8;
        Some((day, (segment % 8) * 3))
    }

    /// Short label for the table kind.
    pub fn kind_name(&self) -> &'static str {
        match (self.is_present_following(), self.is_actual()) {
            (true, true) => "p/f actual",
            (true, false) => "p/f other",
            (false, true) => "schedule actual",
            (false, false) => "schedule other",
        }
    }
}

/// True for EIT table ids (0x4E..=0x6F).
pub fn is_eit_table_id(id: u8) -> bool {
    (table_id::EIT_PF_ACTUAL..=table_id::EIT_SCHEDULE_OTHER_LAST).contains(&id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::psi::tests::build_section;
    use chrono::NaiveDate;

    const LS1: u8 = 0x0E;

    fn eit_body() -> Vec<u8> {
        let mut body = vec![
            0x7F, 0xE1, // transport_stream_id
            0x7F, 0xE0, // original_network_id
            0x01, // segment_last_section_number
            0x4F, // last_table_id
        ];
        // Event 0x1234, 2025-01-01 21:00:00, 00:54:00, running, 2 descriptors
        body.extend_from_slice(&[
            0x12, 0x34, //
            0xED, 0x04, 0x21, 0x00, 0x00, //
            0x00, 0x54, 0x00, //
            0x80, 0x16,
        ]);
        // short event: jpn, "News", "Today"
        body.extend_from_slice(&[
            0x4D, 0x10, b'j', b'p', b'n', 0x05, LS1, b'N', b'e', b'w', b's', 0x06, LS1, b'T',
            b'o', b'd', b'a', b'y',
        ]);
        // content: news
        body.extend_from_slice(&[0x54, 0x02, 0x00, 0xFF]);
        // Following event, start and duration undefined, no descriptors
        body.extend_from_slice(&[
            0x12, 0x35, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x20, 0x00,
        ]);
        body
    }

    #[test]
    fn test_parse_eit() {
        let raw = build_section(table_id::EIT_PF_ACTUAL, 0x0400, 7, &eit_body());
        let section = PsiSection::parse(&raw).unwrap();
        assert!(section.verify_crc());
        let eit = EitTable::parse(&section).unwrap();

        assert_eq!(eit.service_id, 0x0400);
        assert_eq!(eit.transport_stream_id, 0x7FE1);
        assert_eq!(eit.original_network_id, 0x7FE0);
        assert_eq!(eit.version_number, 7);
        assert_eq!(eit.segment_last_section_number, 1);
        assert_eq!(eit.last_table_id, 0x4F);
        assert!(eit.is_present_following());
        assert!(eit.is_actual());
        assert_eq!(eit.kind_name(), "p/f actual");
        assert_eq!(eit.schedule_segment(), None);
        assert_eq!(eit.events.len(), 2);

        let present = &eit.events[0];
        assert_eq!(present.event_id, 0x1234);
        let start = NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap();
        assert_eq!(present.start_time, Some(start));
        assert_eq!(present.duration, Some(Duration::minutes(54)));
        assert_eq!(present.end_time(), Some(start + Duration::minutes(54)));
        assert_eq!(present.running_status, 4);
        assert!(!present.free_ca_mode);
        assert_eq!(present.title().unwrap().as_bytes(), b"News");
        assert_eq!(present.text().unwrap().as_bytes(), b"Today");
        assert_eq!(present.content.as_ref().unwrap().genres[0].level1_name(), "News");

        let following = &eit.events[1];
        assert_eq!(following.start_time, None);
        assert_eq!(following.duration, None);
        assert_eq!(following.end_time(), None);
        assert_eq!(following.running_status, 1);
        assert!(following.title().is_none());
    }

    #[test]
    fn test_schedule_segment() {
        let body = [0x7F, 0xE1, 0x7F, 0xE0, 0x00, 0x50];
        let raw = build_section(0x61, 0x0400, 0, &body);
        let mut section = PsiSection::parse(&raw).unwrap();
        section.header.section_number = 0x48;
        let eit = EitTable::parse(&section).unwrap();
        assert!(!eit.is_actual());
        assert_eq!(eit.kind_name(), "schedule other");
        // table 0x61 starts at day 4; section 0x48 is segment 9 = day +1, 03:00
        assert_eq!(eit.schedule_segment(), Some((5, 3)));
    }

    #[test]
    fn test_eit_rejects_other_tables() {
        let raw = build_section(table_id::SDT_ACTUAL, 1, 0, &[0; 8]);
        let section = PsiSection::parse(&raw).unwrap();
        assert_eq!(EitTable::parse(&section), Err(SiError::UnexpectedTable(0x42)));
        assert!(is_eit_table_id(0x4E));
        assert!(is_eit_table_id(0x6F));
        assert!(!is_eit_table_id(0x70));
    }

    #[test]
    fn test_eit_too_short() {
        let raw = build_section(table_id::EIT_PF_ACTUAL, 1, 0, &[0x7F, 0xE1]);
        let section = PsiSection::parse(&raw).unwrap();
        assert!(matches!(
            EitTable::parse(&section),
            Err(SiError::TooShort { what: "EIT", .. })
        ));
    }

    #[test]
    fn test_extended_items_from_event() {
        let mut body = vec![0x7F, 0xE1, 0x7F, 0xE0, 0x00, 0x4E];
        let extended = [
            0x4E, 0x0D, 0x00, b'j', b'p', b'n', 0x07, 0x02, LS1, b'K', 0x03, LS1, b'V', b'V',
            0x00,
        ];
        body.extend_from_slice(&[
            0x00, 0x01, 0xED, 0x04, 0x00, 0x00, 0x00, 0x00, 0x30, 0x00, 0x80,
            extended.len() as u8,
        ]);
        body.extend_from_slice(&extended);
        let raw = build_section(table_id::EIT_PF_ACTUAL, 1, 0, &body);
        let section = PsiSection::parse(&raw).unwrap();
        let eit = EitTable::parse(&section).unwrap();

        let items = eit.events[0].extended_items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].0.as_bytes(), b"K");
        assert_eq!(items[0].1.as_bytes(), b"VV");
    }

    #[test]
    fn test_event_descriptors_collected() {
        let descriptors = [
            0xD5, 0x08, 0x12, 0x34, 0x12, 0xFF, 0xFF, 0x00, 0x30, 0x05, // series, ep 3/5
            0x55, 0x04, b'J', b'P', b'N', 0x0C, // parental rating, 15+
            0xC4, 0x09, 0xF2, 0x03, 0x10, 0x0F, 0xFF, 0x5F, b'j', b'p', b'n', // stereo
            0xC1, 0x01, 0x88, // copy once
            0xC9, 0x02, 0x01, 0x02, // no parser
        ];
        let mut body = vec![0x7F, 0xE1, 0x7F, 0xE0, 0x00, 0x4E];
        body.extend_from_slice(&[
            0x00, 0x01, 0xED, 0x04, 0x00, 0x00, 0x00, 0x00, 0x30, 0x00, 0x80,
            descriptors.len() as u8,
        ]);
        body.extend_from_slice(&descriptors);
        let raw = build_section(table_id::EIT_PF_ACTUAL, 1, 0, &body);
        let section = PsiSection::parse(&raw).unwrap();
        let eit = EitTable::parse(&section).unwrap();
        let event = &eit.events[0];

        let series = event.series.as_ref().unwrap();
        assert_eq!(series.series_id, 0x1234);
        assert_eq!(series.episode_number, 3);
        assert_eq!(series.last_episode_number, 5);
        assert_eq!(series.expire_date, None);
        assert_eq!(event.parental_rating.as_ref().unwrap().minimum_age(), Some(15));
        assert_eq!(event.audio_components.len(), 1);
        assert_eq!(event.audio_components[0].mode_name(), "Stereo");
        assert_eq!(
            event.copy_control.as_ref().unwrap().recording_control_name(),
            "Copy once"
        );
        assert_eq!(event.unknown_descriptors, vec![(0xC9, vec![0x01, 0x02])]);
        assert!(event.short_event.is_none());
    }
}
