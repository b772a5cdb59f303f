//! `eit` command: event listing.

use std::collections::BTreeSet;
use std::path::PathBuf;

use aribsi_core::descriptors::language_str;
use aribsi_core::eit::{EitEvent, EitTable};
use aribsi_core::sdt::running_status_name;
use chrono::NaiveDateTime;
use log::{debug, error, warn};
use serde::Serialize;

use crate::context::OutputFormat;
use crate::sjis::{opt_to_utf8, to_utf8};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn format_time(time: NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02X}", b)).collect()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct ExtendedItemReport {
    description: String,
    item: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct AudioReport {
    component_tag: u8,
    mode: &'static str,
    sampling_rate_hz: Option<u32>,
    language: String,
    language2: Option<String>,
    main_component: bool,
    text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct SeriesReport {
    series_id: u16,
    repeat_label: u8,
    program_pattern: &'static str,
    expire_date: Option<String>,
    episode_number: u16,
    last_episode_number: u16,
    name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct DataContentReport {
    data_component_id: u16,
    text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct EventGroupReport {
    group_type: &'static str,
    /// (service id, event id) pairs.
    events: Vec<(u16, u16)>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct EventReport {
    original_network_id: u16,
    transport_stream_id: u16,
    service_id: u16,
    event_id: u16,
    table: &'static str,
    version: u8,
    start: Option<String>,
    end: Option<String>,
    duration_seconds: Option<i64>,
    running_status: &'static str,
    free_ca_mode: bool,
    title: String,
    text: String,
    genre: Option<&'static str>,
    video: Option<&'static str>,
    extended: Vec<ExtendedItemReport>,
    audio: Vec<AudioReport>,
    data_contents: Vec<DataContentReport>,
    series: Option<SeriesReport>,
    event_groups: Vec<EventGroupReport>,
    minimum_age: Option<u8>,
    copy_control: Option<&'static str>,
    /// Unparsed descriptors as `0xTT:hex`.
    other_descriptors: Vec<String>,
}

impl EventReport {
    fn new(eit: &EitTable, event: &EitEvent) -> Self {
        let extended = match event.extended_items() {
            Ok(items) => items
                .iter()
                .map(|(description, item)| ExtendedItemReport {
                    description: to_utf8(description),
                    item: to_utf8(item),
                })
                .collect(),
            Err(e) => {
                debug!("Event 0x{:04X}: extended items: {}", event.event_id, e);
                Vec::new()
            }
        };

        EventReport {
            original_network_id: eit.original_network_id,
            transport_stream_id: eit.transport_stream_id,
            service_id: eit.service_id,
            event_id: event.event_id,
            table: eit.kind_name(),
            version: eit.version_number,
            start: event.start_time.map(format_time),
            end: event.end_time().map(format_time),
            duration_seconds: event.duration.map(|d| d.num_seconds()),
            running_status: running_status_name(event.running_status),
            free_ca_mode: event.free_ca_mode,
            title: opt_to_utf8(event.title()),
            text: opt_to_utf8(event.text()),
            genre: event
                .content
                .as_ref()
                .and_then(|c| c.genres.first())
                .map(|g| g.level1_name()),
            video: event.component.as_ref().and_then(|c| c.video_format()),
            extended,
            audio: event
                .audio_components
                .iter()
                .map(|a| AudioReport {
                    component_tag: a.component_tag,
                    mode: a.mode_name(),
                    sampling_rate_hz: a.sampling_rate_hz(),
                    language: language_str(&a.language),
                    language2: a.language2.as_ref().map(language_str),
                    main_component: a.main_component,
                    text: to_utf8(&a.text),
                })
                .collect(),
            data_contents: event
                .data_contents
                .iter()
                .map(|d| DataContentReport {
                    data_component_id: d.data_component_id,
                    text: to_utf8(&d.text),
                })
                .collect(),
            series: event.series.as_ref().map(|s| SeriesReport {
                series_id: s.series_id,
                repeat_label: s.repeat_label,
                program_pattern: s.program_pattern_name(),
                expire_date: s.expire_date.map(|d| d.format("%Y-%m-%d").to_string()),
                episode_number: s.episode_number,
                last_episode_number: s.last_episode_number,
                name: to_utf8(&s.series_name),
            }),
            event_groups: event
                .event_groups
                .iter()
                .map(|g| EventGroupReport {
                    group_type: g.group_type_name(),
                    events: g.events.iter().map(|e| (e.service_id, e.event_id)).collect(),
                })
                .collect(),
            minimum_age: event.parental_rating.as_ref().and_then(|r| r.minimum_age()),
            copy_control: event.copy_control.as_ref().map(|c| c.recording_control_name()),
            other_descriptors: event
                .unknown_descriptors
                .iter()
                .map(|(tag, data)| format!("0x{:02X}:{}", tag, hex(data)))
                .collect(),
        }
    }
}

/// Filters and de-duplicates events across sections. An event repeated
/// in both the p/f and a schedule table is listed once per table.
#[derive(Debug, Default)]
struct EventCollector {
    sid: Option<u16>,
    present_following: bool,
    seen: BTreeSet<(u8, u16, u16, u8)>,
    events: Vec<EventReport>,
}

impl EventCollector {
    fn new(sid: Option<u16>, present_following: bool) -> Self {
        EventCollector {
            sid,
            present_following,
            ..Default::default()
        }
    }

    fn add(&mut self, eit: &EitTable) {
        if self.sid.is_some_and(|sid| sid != eit.service_id) {
            return;
        }
        if self.present_following && !eit.is_present_following() {
            return;
        }
        if let Some((day, hour)) = eit.schedule_segment() {
            debug!(
                "SID 0x{:04X} schedule table 0x{:02X}: day {} from {:02}:00",
                eit.service_id, eit.table_id, day, hour
            );
        }

        for event in &eit.events {
            if self.seen.insert((
                eit.table_id,
                eit.service_id,
                event.event_id,
                eit.version_number,
            )) {
                self.events.push(EventReport::new(eit, event));
            }
        }
    }
}

/// EIT command implementation.
pub fn cmd_eit(
    input: Vec<PathBuf>,
    pid: u16,
    sid: Option<u16>,
    present_following: bool,
    no_crc: bool,
    format: OutputFormat,
) -> i32 {
    let mut collector = EventCollector::new(sid, present_following);
    let mut failed = 0;

    for path in &input {
        let result = super::scan_sections(path, pid, !no_crc, |section| {
            match EitTable::parse(section) {
                Ok(eit) => collector.add(&eit),
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

    if collector.events.is_empty() {
        warn!("No events found on PID 0x{:04X}", pid);
    }

    match format {
        OutputFormat::Table => print_events_table(&collector.events),
        OutputFormat::Json => match serde_json::to_string_pretty(&collector.events) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize events: {}", e);
                return 1;
            }
        },
    }

    0
}

fn print_events_table(events: &[EventReport]) {
    if events.is_empty() {
        println!("No events found.");
        return;
    }

    println!(
        "{:<6} {:<6} {:<19} {:<8} {:<15} {}",
        "SID", "EID", "Start", "Duration", "Table", "Title"
    );
    println!("{}", "-".repeat(90));

    for e in events {
        let duration = e
            .duration_seconds
            .map(|s| format!("{:02}:{:02}:{:02}", s / 3600, s / 60 % 60, s % 60))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<6} {:<6} {:<19} {:<8} {:<15} {}",
            format!("0x{:04X}", e.service_id),
            format!("0x{:04X}", e.event_id),
            e.start.as_deref().unwrap_or("-"),
            duration,
            e.table,
            e.title
        );
        if !e.text.is_empty() {
            println!("       {}", e.text);
        }
        for item in &e.extended {
            println!("       [{}] {}", item.description, item.item);
        }
        if let Some(series) = &e.series {
            println!(
                "       Series 0x{:04X} ep {}/{} {} {}",
                series.series_id,
                series.episode_number,
                series.last_episode_number,
                series.program_pattern,
                series.name
            );
        }
        for audio in &e.audio {
            println!(
                "       Audio {:02X} {} {} Hz {}",
                audio.component_tag,
                audio.mode,
                audio
                    .sampling_rate_hz
                    .map(|hz| hz.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                audio.language
            );
        }
        for data in &e.data_contents {
            println!("       Data 0x{:04X} {}", data.data_component_id, data.text);
        }
        for group in &e.event_groups {
            println!("       Group {} {:?}", group.group_type, group.events);
        }
        if let Some(age) = e.minimum_age {
            println!("       Rating {}+", age);
        }
        if let Some(copy) = e.copy_control {
            println!("       Copy {}", copy);
        }
        if !e.other_descriptors.is_empty() {
            println!("       Other {}", e.other_descriptors.join(" "));
        }
    }

    println!("\nTotal: {} events", events.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{build_section, packetize, write_temp};
    use aribsi_core::{pid, psi::PsiSection};

    const LS1: u8 = 0x0E;

    fn eit(table_id: u8, sid: u16, section_number: u8, events: &[(u16, &[u8])]) -> Vec<u8> {
        let mut body = vec![0x40, 0x10, 0x00, 0x04, 0x00, table_id];
        for (event_id, title) in events {
            let mut short = vec![0x4D, 0x00, b'j', b'p', b'n', title.len() as u8 + 1, LS1];
            short.extend_from_slice(title);
            short.push(0x00);
            short[1] = (short.len() - 2) as u8;

            body.extend_from_slice(&[
                (event_id >> 8) as u8,
                *event_id as u8,
                0xED, 0x04, 0x21, 0x00, 0x00, // 2025-01-01 21:00:00
                0x01, 0x30, 0x00, // 1h30m
                0x80,
                short.len() as u8,
            ]);
            body.extend(short);
        }
        build_section(table_id, sid, section_number, &body)
    }

    fn collect(sections: &[Vec<u8>], sid: Option<u16>, pf: bool) -> Vec<EventReport> {
        let mut collector = EventCollector::new(sid, pf);
        for raw in sections {
            let section = PsiSection::parse(raw).unwrap();
            collector.add(&EitTable::parse(&section).unwrap());
        }
        collector.events
    }

    #[test]
    fn test_event_report() {
        let events = collect(&[eit(0x4E, 0x0101, 0, &[(0x0001, b"News")])], None, false);
        assert_eq!(events.len(), 1);
        let e = &events[0];
        assert_eq!(e.service_id, 0x0101);
        assert_eq!(e.transport_stream_id, 0x4010);
        assert_eq!(e.original_network_id, 0x0004);
        assert_eq!(e.table, "p/f actual");
        assert_eq!(e.title, "News");
        assert_eq!(e.start.as_deref(), Some("2025-01-01 21:00:00"));
        assert_eq!(e.end.as_deref(), Some("2025-01-01 22:30:00"));
        assert_eq!(e.duration_seconds, Some(5400));
        assert_eq!(e.running_status, "Running");
        assert!(e.extended.is_empty());
    }

    #[test]
    fn test_filters_and_dedup() {
        let sections = [
            eit(0x4E, 0x0101, 0, &[(0x0001, b"A")]),
            eit(0x4E, 0x0102, 0, &[(0x0002, b"B")]),
            eit(0x50, 0x0101, 8, &[(0x0001, b"A"), (0x0003, b"C")]),
        ];

        let all = collect(&sections, None, false);
        let ids: Vec<_> = all.iter().map(|e| e.event_id).collect();
        assert_eq!(ids, vec![1, 2, 1, 3]);

        let by_sid = collect(&sections, Some(0x0102), false);
        assert_eq!(by_sid.len(), 1);
        assert_eq!(by_sid[0].title, "B");

        let pf = collect(&sections, None, true);
        assert_eq!(pf.len(), 2);
        assert!(pf.iter().all(|e| e.table == "p/f actual"));
    }

    #[test]
    fn test_same_event_listed_per_table() {
        let present = eit(0x4E, 0x0101, 0, &[(0x0001, b"A")]);
        let schedule = eit(0x50, 0x0101, 0, &[(0x0001, b"A")]);

        let events = collect(&[present.clone(), schedule, present], None, false);
        let tables: Vec<_> = events.iter().map(|e| e.table).collect();
        assert_eq!(tables, vec!["p/f actual", "schedule actual"]);
    }

    #[test]
    fn test_event_report_descriptors() {
        let descriptors = [
            0xD5, 0x0A, 0x00, 0x07, 0x13, 0xED, 0x04, 0x00, 0x20, 0x0C, LS1, b'S', // series, ep 2/12
            0x55, 0x04, b'J', b'P', b'N', 0x09, // 12+
            0xC1, 0x01, 0xC0, // copy never
            0xC4, 0x09, 0xF2, 0x03, 0x10, 0x0F, 0xFF, 0x5F, b'j', b'p', b'n', //
            0xD6, 0x05, 0x11, 0x01, 0x02, 0x00, 0x09, // shared with 0x0102/0x0009
            0xC9, 0x02, 0xAB, 0xCD,
        ];
        let mut body = vec![0x40, 0x10, 0x00, 0x04, 0x00, 0x4E];
        body.extend_from_slice(&[
            0x00, 0x01, 0xED, 0x04, 0x21, 0x00, 0x00, 0x01, 0x00, 0x00, 0x80,
            descriptors.len() as u8,
        ]);
        body.extend_from_slice(&descriptors);
        let events = collect(&[build_section(0x4E, 0x0101, 0, &body)], None, false);
        let e = &events[0];

        let series = e.series.as_ref().unwrap();
        assert_eq!(series.series_id, 0x0007);
        assert_eq!(series.program_pattern, "Weekly");
        assert_eq!(series.expire_date.as_deref(), Some("2025-01-01"));
        assert_eq!(series.episode_number, 2);
        assert_eq!(series.last_episode_number, 12);
        assert_eq!(e.minimum_age, Some(12));
        assert_eq!(e.copy_control, Some("Copy never"));
        assert_eq!(e.audio.len(), 1);
        assert_eq!(e.audio[0].mode, "Stereo");
        assert_eq!(e.audio[0].sampling_rate_hz, Some(48_000));
        assert_eq!(e.audio[0].language, "jpn");
        assert_eq!(e.event_groups[0].group_type, "Share");
        assert_eq!(e.event_groups[0].events, vec![(0x0102, 0x0009)]);
        assert_eq!(e.other_descriptors, vec!["0xC9:ABCD".to_string()]);

        let json = serde_json::to_value(&events).unwrap();
        assert_eq!(json[0]["series"]["name"], "S");
        assert_eq!(json[0]["minimum_age"], 12);
        assert_eq!(json[0]["other_descriptors"][0], "0xC9:ABCD");
    }

    #[test]
    fn test_cmd_eit_end_to_end() {
        let stream = packetize(
            pid::EIT,
            &[
                eit(0x4E, 0x0101, 0, &[(0x0001, b"A")]),
                eit(0x4F, 0x0102, 0, &[(0x0002, b"B")]),
            ],
        );
        let path = write_temp("eit", &stream);
        assert_eq!(
            cmd_eit(vec![path.clone()], pid::EIT, Some(0x0101), false, false, OutputFormat::Table),
            0
        );
        std::fs::remove_file(path).unwrap();
    }
}
