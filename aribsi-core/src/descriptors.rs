//! Descriptor parsing for SDT and EIT.
//!
//! Text fields are decoded to Shift_JIS with [`crate::arib::decode`].

use chrono::NaiveDate;
use log::debug;

use crate::arib::{self, SjisString};
use crate::descriptor_tag;
use crate::error::SiError;
use crate::time::mjd_to_date;

/// One descriptor from a descriptor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor<'a> {
    pub tag: u8,
    pub data: &'a [u8],
}

/// Iterator over a descriptor loop.
///
/// Stops at the first descriptor whose length runs past the loop.
#[derive(Debug, Clone)]
pub struct DescriptorLoop<'a> {
    rest: &'a [u8],
}

/// Walk the descriptors in `data`.
pub fn descriptor_loop(data: &[u8]) -> DescriptorLoop<'_> {
    DescriptorLoop { rest: data }
}

impl<'a> Iterator for DescriptorLoop<'a> {
    type Item = Descriptor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let [tag, length, rest @ ..] = self.rest else {
            return None;
        };
        let length = *length as usize;
        if length > rest.len() {
            debug!(
                "Descriptor 0x{:02X} length {} overruns the loop ({} bytes left)",
                tag,
                length,
                rest.len()
            );
            self.rest = &[];
            return None;
        }
        let descriptor = Descriptor {
            tag: *tag,
            data: &rest[..length],
        };
        self.rest = &rest[length..];
        Some(descriptor)
    }
}

/// Find the first descriptor with `tag` in a descriptor loop.
pub fn find_descriptor(data: &[u8], tag: u8) -> Option<&[u8]> {
    descriptor_loop(data).find(|d| d.tag == tag).map(|d| d.data)
}

/// Slice `len` bytes at `offset`, or report which field overran.
fn field<'a>(
    data: &'a [u8],
    offset: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8], SiError> {
    data.get(offset..offset + len)
        .ok_or(SiError::LengthOverrun {
            what,
            length: len,
            remaining: data.len().saturating_sub(offset),
        })
}

fn byte(data: &[u8], offset: usize, what: &'static str) -> Result<u8, SiError> {
    data.get(offset).copied().ok_or(SiError::TooShort {
        what,
        need: offset + 1,
        got: data.len(),
    })
}

fn language(data: &[u8], offset: usize) -> Result<[u8; 3], SiError> {
    let code = field(data, offset, 3, "ISO 639 language code")?;
    Ok([code[0], code[1], code[2]])
}

/// Render an ISO 639-2 code for display.
pub fn language_str(code: &[u8; 3]) -> String {
    String::from_utf8_lossy(code).into_owned()
}

/// Service descriptor (0x48).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// Service type.
    pub service_type: u8,
    /// Service provider name.
    pub provider_name: SjisString,
    /// Service name.
    pub service_name: SjisString,
}

impl ServiceDescriptor {
    pub const TAG: u8 = descriptor_tag::SERVICE;

    /// Parse a service descriptor body.
    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let service_type = byte(data, 0, "service descriptor")?;
        let provider_name_length = byte(data, 1, "service descriptor")? as usize;
        let provider_name = arib::decode(field(data, 2, provider_name_length, "provider name")?)?;

        let service_name_offset = 2 + provider_name_length;
        let service_name_length = byte(data, service_name_offset, "service descriptor")? as usize;
        let service_name = arib::decode(field(
            data,
            service_name_offset + 1,
            service_name_length,
            "service name",
        )?)?;

        Ok(ServiceDescriptor {
            service_type,
            provider_name,
            service_name,
        })
    }

    /// Get human-readable service type name.
    pub fn service_type_name(&self) -> &'static str {
        match self.service_type {
            0x01 => "Digital TV",
            0x02 => "Digital Audio",
            0x0C => "Data Service",
            0xA1 => "Special Video",
            0xA2 => "Special Audio",
            0xA3 => "Special Data",
            0xA4 => "Engineering",
            0xA5 => "Promotional Video",
            0xA6 => "Promotional Audio",
            0xA7 => "Promotional Data",
            0xA8 => "For Advance Storage",
            0xA9 => "For Exclusive Storage",
            0xAA => "Bookmark List",
            0xAB => "Server Type Simultaneous",
            0xAC => "Independent File",
            0xC0 => "Data (1seg)",
            _ => "Unknown",
        }
    }
}

/// Short event descriptor (0x4D).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortEventDescriptor {
    pub language: [u8; 3],
    pub event_name: SjisString,
    pub text: SjisString,
}

impl ShortEventDescriptor {
    pub const TAG: u8 = descriptor_tag::SHORT_EVENT;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let language = language(data, 0)?;
        let name_length = byte(data, 3, "short event descriptor")? as usize;
        let event_name = arib::decode(field(data, 4, name_length, "event name")?)?;

        let text_offset = 4 + name_length;
        let text_length = byte(data, text_offset, "short event descriptor")? as usize;
        let text = arib::decode(field(data, text_offset + 1, text_length, "event text")?)?;

        Ok(ShortEventDescriptor {
            language,
            event_name,
            text,
        })
    }
}

/// One item of an extended event descriptor, still ARIB coded.
///
/// An item may continue in the next descriptor with an empty description,
/// so the bytes are kept raw until [`merge_extended_items`] joins them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedEventItem {
    pub description: Vec<u8>,
    pub item: Vec<u8>,
}

/// Extended event descriptor (0x4E).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtendedEventDescriptor {
    pub descriptor_number: u8,
    pub last_descriptor_number: u8,
    pub language: [u8; 3],
    pub items: Vec<ExtendedEventItem>,
    pub text: SjisString,
}

impl ExtendedEventDescriptor {
    pub const TAG: u8 = descriptor_tag::EXTENDED_EVENT;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let numbers = byte(data, 0, "extended event descriptor")?;
        let language = language(data, 1)?;
        let length_of_items = byte(data, 4, "extended event descriptor")? as usize;
        let item_data = field(data, 5, length_of_items, "extended event items")?;

        let mut items = Vec::new();
        let mut offset = 0;
        while offset < item_data.len() {
            let description_length = byte(item_data, offset, "item description")? as usize;
            let description = field(item_data, offset + 1, description_length, "item description")?;
            offset += 1 + description_length;

            let item_length = byte(item_data, offset, "item")? as usize;
            let item = field(item_data, offset + 1, item_length, "item")?;
            offset += 1 + item_length;

            items.push(ExtendedEventItem {
                description: description.to_vec(),
                item: item.to_vec(),
            });
        }

        let text_offset = 5 + length_of_items;
        let text_length = byte(data, text_offset, "extended event descriptor")? as usize;
        let text = arib::decode(field(data, text_offset + 1, text_length, "extended event text")?)?;

        Ok(ExtendedEventDescriptor {
            descriptor_number: numbers >> 4,
            last_descriptor_number: numbers & 0x0F,
            language,
            items,
            text,
        })
    }
}

/// Join items across extended event descriptors and decode them.
///
/// Descriptors are taken in `descriptor_number` order. An item with an
/// empty description continues the previous item.
pub fn merge_extended_items(
    descriptors: &[ExtendedEventDescriptor],
) -> Result<Vec<(SjisString, SjisString)>, SiError> {
    let mut ordered: Vec<&ExtendedEventDescriptor> = descriptors.iter().collect();
    ordered.sort_by_key(|d| d.descriptor_number);

    let mut raw: Vec<(Vec<u8>, Vec<u8>)> = Vec::new();
    for item in ordered.iter().flat_map(|d| d.items.iter()) {
        if item.description.is_empty() {
            if let Some((_, text)) = raw.last_mut() {
                text.extend_from_slice(&item.item);
                continue;
            }
        }
        raw.push((item.description.clone(), item.item.clone()));
    }

    raw.iter()
        .map(|(description, item)| Ok((arib::decode(description)?, arib::decode(item)?)))
        .collect()
}

/// Component descriptor (0x50).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentDescriptor {
    pub stream_content: u8,
    pub component_type: u8,
    pub component_tag: u8,
    pub language: [u8; 3],
    pub text: SjisString,
}

impl ComponentDescriptor {
    pub const TAG: u8 = descriptor_tag::COMPONENT;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        if data.len() < 6 {
            return Err(SiError::TooShort {
                what: "component descriptor",
                need: 6,
                got: data.len(),
            });
        }
        Ok(ComponentDescriptor {
            stream_content: data[0] & 0x0F,
            component_type: data[1],
            component_tag: data[2],
            language: language(data, 3)?,
            text: arib::decode(&data[6..])?,
        })
    }

    /// Video resolution label for `stream_content` 0x01 (MPEG-2 video).
    pub fn video_format(&self) -> Option<&'static str> {
        if self.stream_content != 0x01 {
            return None;
        }
        let format = match self.component_type >> 4 {
            0x0 => "480i",
            0x9 => "2160p",
            0xA => "480p",
            0xB => "1080i",
            0xC => "720p",
            0xD => "240p",
            0xE => "1080p",
            0xF => "180p",
            _ => return None,
        };
        Some(format)
    }
}

/// One genre entry of a content descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentGenre {
    pub level1: u8,
    pub level2: u8,
    pub user1: u8,
    pub user2: u8,
}

impl ContentGenre {
    /// Major genre name.
    pub fn level1_name(&self) -> &'static str {
        match self.level1 {
            0x0 => "News",
            0x1 => "Sports",
            0x2 => "Information",
            0x3 => "Drama",
            0x4 => "Music",
            0x5 => "Variety",
            0x6 => "Movies",
            0x7 => "Animation",
            0x8 => "Documentary",
            0x9 => "Theatre",
            0xA => "Hobby/Education",
            0xB => "Welfare",
            0xE => "Extension",
            0xF => "Other",
            _ => "Reserved",
        }
    }
}

/// Content descriptor (0x54).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentDescriptor {
    pub genres: Vec<ContentGenre>,
}

impl ContentDescriptor {
    pub const TAG: u8 = descriptor_tag::CONTENT;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let genres = data
            .chunks_exact(2)
            .map(|pair| ContentGenre {
                level1: pair[0] >> 4,
                level2: pair[0] & 0x0F,
                user1: pair[1] >> 4,
                user2: pair[1] & 0x0F,
            })
            .collect();
        Ok(ContentDescriptor { genres })
    }
}

/// CA contract info descriptor (0xCB).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaContractInfoDescriptor {
    pub ca_system_id: u16,
    pub ca_unit_id: u8,
    pub component_tags: Vec<u8>,
    pub contract_verification_info: Vec<u8>,
    pub fee_name: SjisString,
}

impl CaContractInfoDescriptor {
    pub const TAG: u8 = descriptor_tag::CA_CONTRACT_INFO;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        if data.len() < 3 {
            return Err(SiError::TooShort {
                what: "CA contract info descriptor",
                need: 3,
                got: data.len(),
            });
        }
        let ca_system_id = u16::from_be_bytes([data[0], data[1]]);
        let ca_unit_id = data[2] >> 4;
        let num_of_component = (data[2] & 0x0F) as usize;
        let component_tags = field(data, 3, num_of_component, "component tags")?.to_vec();

        let info_offset = 3 + num_of_component;
        let info_length = byte(data, info_offset, "CA contract info descriptor")? as usize;
        let contract_verification_info =
            field(data, info_offset + 1, info_length, "contract verification info")?.to_vec();

        let fee_offset = info_offset + 1 + info_length;
        let fee_name_length = byte(data, fee_offset, "CA contract info descriptor")? as usize;
        let fee_name = arib::decode(field(data, fee_offset + 1, fee_name_length, "fee name")?)?;

        Ok(CaContractInfoDescriptor {
            ca_system_id,
            ca_unit_id,
            component_tags,
            contract_verification_info,
            fee_name,
        })
    }

    /// Contract verification info as upper-case hex.
    pub fn verification_info_hex(&self) -> String {
        self.contract_verification_info
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect()
    }
}

fn be16(data: &[u8], offset: usize, what: &'static str) -> Result<u16, SiError> {
    let bytes = field(data, offset, 2, what)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// One country entry of a parental rating descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentalRating {
    pub country: [u8; 3],
    pub rating: u8,
}

impl ParentalRating {
    /// Minimum viewer age. `None` for undefined and broadcaster-defined ratings.
    pub fn minimum_age(&self) -> Option<u8> {
        match self.rating {
            0x01..=0x11 => Some(self.rating + 3),
            _ => None,
        }
    }
}

/// Parental rating descriptor (0x55).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParentalRatingDescriptor {
    pub ratings: Vec<ParentalRating>,
}

impl ParentalRatingDescriptor {
    pub const TAG: u8 = descriptor_tag::PARENTAL_RATING;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let ratings = data
            .chunks_exact(4)
            .map(|entry| ParentalRating {
                country: [entry[0], entry[1], entry[2]],
                rating: entry[3],
            })
            .collect();
        Ok(ParentalRatingDescriptor { ratings })
    }

    /// Strictest minimum age over all countries.
    pub fn minimum_age(&self) -> Option<u8> {
        self.ratings.iter().filter_map(|r| r.minimum_age()).max()
    }
}

/// Copy control override for one component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComponentCopyControl {
    pub component_tag: u8,
    pub digital_recording_control: u8,
    pub copy_control_type: u8,
    pub aps_control: u8,
    pub maximum_bit_rate: Option<u8>,
}

/// Digital copy control descriptor (0xC1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigitalCopyControlDescriptor {
    pub digital_recording_control: u8,
    pub copy_control_type: u8,
    pub aps_control: u8,
    /// Maximum bit rate in 1/4 Mbit/s units.
    pub maximum_bit_rate: Option<u8>,
    pub components: Vec<ComponentCopyControl>,
}

impl DigitalCopyControlDescriptor {
    pub const TAG: u8 = descriptor_tag::DIGITAL_COPY_CONTROL;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let flags = byte(data, 0, "digital copy control descriptor")?;
        let mut offset = 1;

        let maximum_bit_rate = if flags & 0x20 != 0 {
            offset += 1;
            Some(byte(data, 1, "maximum bit rate")?)
        } else {
            None
        };

        let mut components = Vec::new();
        if flags & 0x10 != 0 {
            let length = byte(data, offset, "component control")? as usize;
            let control = field(data, offset + 1, length, "component control")?;
            let mut pos = 0;
            while pos + 2 <= control.len() {
                let component_tag = control[pos];
                let bits = control[pos + 1];
                pos += 2;
                let maximum_bit_rate = if bits & 0x20 != 0 {
                    pos += 1;
                    Some(byte(control, pos - 1, "component maximum bit rate")?)
                } else {
                    None
                };
                components.push(ComponentCopyControl {
                    component_tag,
                    digital_recording_control: bits >> 6,
                    copy_control_type: (bits >> 2) & 0x03,
                    aps_control: bits & 0x03,
                    maximum_bit_rate,
                });
            }
        }

        Ok(DigitalCopyControlDescriptor {
            digital_recording_control: flags >> 6,
            copy_control_type: (flags >> 2) & 0x03,
            aps_control: flags & 0x03,
            maximum_bit_rate,
            components,
        })
    }

    /// Recording permission for the whole event.
    pub fn recording_control_name(&self) -> &'static str {
        match self.digital_recording_control {
            0 => "Copy free",
            1 => "Operator defined",
            2 => "Copy once",
            _ => "Copy never",
        }
    }
}

/// Audio component descriptor (0xC4).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioComponentDescriptor {
    pub stream_content: u8,
    pub component_type: u8,
    pub component_tag: u8,
    pub stream_type: u8,
    pub simulcast_group_tag: u8,
    pub main_component: bool,
    pub quality_indicator: u8,
    /// Raw 3-bit sampling rate code.
    pub sampling_rate: u8,
    pub language: [u8; 3],
    /// Second language of a multilingual (dual mono) stream.
    pub language2: Option<[u8; 3]>,
    pub text: SjisString,
}

impl AudioComponentDescriptor {
    pub const TAG: u8 = descriptor_tag::AUDIO_COMPONENT;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        if data.len() < 9 {
            return Err(SiError::TooShort {
                what: "audio component descriptor",
                need: 9,
                got: data.len(),
            });
        }
        let flags = data[5];
        let first_language = language(data, 6)?;
        let (language2, text_offset) = if flags & 0x80 != 0 {
            (Some(language(data, 9)?), 12)
        } else {
            (None, 9)
        };

        Ok(AudioComponentDescriptor {
            stream_content: data[0] & 0x0F,
            component_type: data[1],
            component_tag: data[2],
            stream_type: data[3],
            simulcast_group_tag: data[4],
            main_component: flags & 0x40 != 0,
            quality_indicator: (flags >> 4) & 0x03,
            sampling_rate: (flags >> 1) & 0x07,
            language: first_language,
            language2,
            text: arib::decode(&data[text_offset..])?,
        })
    }

    pub fn sampling_rate_hz(&self) -> Option<u32> {
        match self.sampling_rate {
            0b001 => Some(16_000),
            0b010 => Some(22_050),
            0b011 => Some(24_000),
            0b101 => Some(32_000),
            0b110 => Some(44_100),
            0b111 => Some(48_000),
            _ => None,
        }
    }

    /// Channel layout.
    pub fn mode_name(&self) -> &'static str {
        match self.component_type {
            0x01 => "Mono",
            0x02 => "Dual mono",
            0x03 => "Stereo",
            0x04 => "2/1",
            0x05 => "3/0",
            0x06 => "2/2",
            0x07 => "3/1",
            0x08 => "3/2",
            0x09 => "3/2+LFE",
            _ => "Unknown",
        }
    }
}

/// Target of a hyperlink with a well-known selector layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDestination {
    Service {
        original_network_id: u16,
        transport_stream_id: u16,
        service_id: u16,
    },
    Event {
        original_network_id: u16,
        transport_stream_id: u16,
        service_id: u16,
        event_id: u16,
    },
}

/// Hyperlink descriptor (0xC5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HyperlinkDescriptor {
    pub hyper_linkage_type: u8,
    pub link_destination_type: u8,
    pub selector: Vec<u8>,
    pub private_data: Vec<u8>,
}

impl HyperlinkDescriptor {
    pub const TAG: u8 = descriptor_tag::HYPERLINK;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let hyper_linkage_type = byte(data, 0, "hyperlink descriptor")?;
        let link_destination_type = byte(data, 1, "hyperlink descriptor")?;
        let selector_length = byte(data, 2, "hyperlink descriptor")? as usize;
        let selector = field(data, 3, selector_length, "link selector")?.to_vec();
        Ok(HyperlinkDescriptor {
            hyper_linkage_type,
            link_destination_type,
            selector,
            private_data: data[3 + selector_length..].to_vec(),
        })
    }

    /// Decode the selector for service (0x01) and event (0x02) links.
    pub fn destination(&self) -> Option<LinkDestination> {
        let s = &self.selector;
        let word = |i: usize| u16::from_be_bytes([s[i], s[i + 1]]);
        match (self.link_destination_type, s.len()) {
            (0x01, 6) => Some(LinkDestination::Service {
                original_network_id: word(0),
                transport_stream_id: word(2),
                service_id: word(4),
            }),
            (0x02, 8) => Some(LinkDestination::Event {
                original_network_id: word(0),
                transport_stream_id: word(2),
                service_id: word(4),
                event_id: word(6),
            }),
            _ => None,
        }
    }
}

/// Data content descriptor (0xC7).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataContentDescriptor {
    pub data_component_id: u16,
    pub entry_component: u8,
    pub selector: Vec<u8>,
    pub component_refs: Vec<u8>,
    pub language: [u8; 3],
    pub text: SjisString,
}

impl DataContentDescriptor {
    pub const TAG: u8 = descriptor_tag::DATA_CONTENT;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let data_component_id = be16(data, 0, "data content descriptor")?;
        let entry_component = byte(data, 2, "data content descriptor")?;
        let selector_length = byte(data, 3, "data content descriptor")? as usize;
        let selector = field(data, 4, selector_length, "data content selector")?.to_vec();

        let refs_offset = 4 + selector_length;
        let num_of_component_ref = byte(data, refs_offset, "data content descriptor")? as usize;
        let component_refs =
            field(data, refs_offset + 1, num_of_component_ref, "component refs")?.to_vec();

        let language_offset = refs_offset + 1 + num_of_component_ref;
        let code = language(data, language_offset)?;
        let text_length = byte(data, language_offset + 3, "data content descriptor")? as usize;
        let text = arib::decode(field(data, language_offset + 4, text_length, "data content text")?)?;

        Ok(DataContentDescriptor {
            data_component_id,
            entry_component,
            selector,
            component_refs,
            language: code,
            text,
        })
    }
}

/// Series descriptor (0xD5).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesDescriptor {
    pub series_id: u16,
    pub repeat_label: u8,
    pub program_pattern: u8,
    /// Last date the series id stays valid, when signalled.
    pub expire_date: Option<NaiveDate>,
    pub episode_number: u16,
    pub last_episode_number: u16,
    pub series_name: SjisString,
}

impl SeriesDescriptor {
    pub const TAG: u8 = descriptor_tag::SERIES;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        if data.len() < 8 {
            return Err(SiError::TooShort {
                what: "series descriptor",
                need: 8,
                got: data.len(),
            });
        }
        let expire_date = if data[2] & 0x01 != 0 {
            mjd_to_date(u16::from_be_bytes([data[3], data[4]]))
        } else {
            None
        };

        Ok(SeriesDescriptor {
            series_id: u16::from_be_bytes([data[0], data[1]]),
            repeat_label: data[2] >> 4,
            program_pattern: (data[2] >> 1) & 0x07,
            expire_date,
            episode_number: ((data[5] as u16) << 4) | (data[6] >> 4) as u16,
            last_episode_number: (((data[6] & 0x0F) as u16) << 8) | data[7] as u16,
            series_name: arib::decode(&data[8..])?,
        })
    }

    pub fn program_pattern_name(&self) -> &'static str {
        match self.program_pattern {
            0 => "Irregular",
            1 => "Weekly",
            2 => "Monthly",
            3 => "Several episodes a day",
            4 => "Split",
            5 => "Regular",
            _ => "Undefined",
        }
    }
}

/// Event listed in an event group descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupEvent {
    pub service_id: u16,
    pub event_id: u16,
}

/// Event on another network, for relay and move groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtherNetworkEvent {
    pub original_network_id: u16,
    pub transport_stream_id: u16,
    pub service_id: u16,
    pub event_id: u16,
}

/// Event group descriptor (0xD6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventGroupDescriptor {
    pub group_type: u8,
    pub events: Vec<GroupEvent>,
    pub other_network_events: Vec<OtherNetworkEvent>,
    /// Trailing bytes of group types without a defined layout.
    pub private_data: Vec<u8>,
}

impl EventGroupDescriptor {
    pub const TAG: u8 = descriptor_tag::EVENT_GROUP;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let head = byte(data, 0, "event group descriptor")?;
        let group_type = head >> 4;
        let event_count = (head & 0x0F) as usize;

        let events = field(data, 1, event_count * 4, "event group events")?
            .chunks_exact(4)
            .map(|e| GroupEvent {
                service_id: u16::from_be_bytes([e[0], e[1]]),
                event_id: u16::from_be_bytes([e[2], e[3]]),
            })
            .collect();

        let rest = &data[1 + event_count * 4..];
        let (other_network_events, private_data) = if matches!(group_type, 4 | 5) {
            let others = rest
                .chunks_exact(8)
                .map(|e| OtherNetworkEvent {
                    original_network_id: u16::from_be_bytes([e[0], e[1]]),
                    transport_stream_id: u16::from_be_bytes([e[2], e[3]]),
                    service_id: u16::from_be_bytes([e[4], e[5]]),
                    event_id: u16::from_be_bytes([e[6], e[7]]),
                })
                .collect();
            (others, Vec::new())
        } else {
            (Vec::new(), rest.to_vec())
        };

        Ok(EventGroupDescriptor {
            group_type,
            events,
            other_network_events,
            private_data,
        })
    }

    pub fn group_type_name(&self) -> &'static str {
        match self.group_type {
            1 => "Share",
            2 => "Relay",
            3 => "Move",
            4 => "Relay to other networks",
            5 => "Move from other networks",
            _ => "Undefined",
        }
    }
}

/// Components billed together under one CA unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaUnit {
    pub ca_unit_id: u8,
    pub component_tags: Vec<u8>,
}

/// One group of a component group descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentGroup {
    pub component_group_id: u8,
    pub ca_units: Vec<CaUnit>,
    pub total_bit_rate: Option<u8>,
    pub text: SjisString,
}

/// Component group descriptor (0xD9).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentGroupDescriptor {
    /// 0 for multi-view TV.
    pub component_group_type: u8,
    pub groups: Vec<ComponentGroup>,
}

impl ComponentGroupDescriptor {
    pub const TAG: u8 = descriptor_tag::COMPONENT_GROUP;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let head = byte(data, 0, "component group descriptor")?;
        let has_total_bit_rate = head & 0x10 != 0;
        let num_of_group = head & 0x0F;

        let mut offset = 1;
        let mut groups = Vec::with_capacity(num_of_group as usize);
        for _ in 0..num_of_group {
            let group_head = byte(data, offset, "component group")?;
            offset += 1;

            let mut ca_units = Vec::new();
            for _ in 0..group_head & 0x0F {
                let unit_head = byte(data, offset, "CA unit")?;
                let num_of_component = (unit_head & 0x0F) as usize;
                let component_tags =
                    field(data, offset + 1, num_of_component, "CA unit components")?.to_vec();
                offset += 1 + num_of_component;
                ca_units.push(CaUnit {
                    ca_unit_id: unit_head >> 4,
                    component_tags,
                });
            }

            let total_bit_rate = if has_total_bit_rate {
                offset += 1;
                Some(byte(data, offset - 1, "total bit rate")?)
            } else {
                None
            };

            let text_length = byte(data, offset, "component group")? as usize;
            let text = arib::decode(field(data, offset + 1, text_length, "component group text")?)?;
            offset += 1 + text_length;

            groups.push(ComponentGroup {
                component_group_id: group_head >> 4,
                ca_units,
                total_bit_rate,
                text,
            });
        }

        Ok(ComponentGroupDescriptor {
            component_group_type: head >> 5,
            groups,
        })
    }
}

/// One linked LDT description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LdtDescription {
    pub description_id: u16,
    pub description_type: u8,
    pub user_defined: u8,
}

/// LDT linkage descriptor (0xDC).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdtLinkageDescriptor {
    pub original_service_id: u16,
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub descriptions: Vec<LdtDescription>,
}

impl LdtLinkageDescriptor {
    pub const TAG: u8 = descriptor_tag::LDT_LINKAGE;

    pub fn parse(data: &[u8]) -> Result<Self, SiError> {
        let original_service_id = be16(data, 0, "LDT linkage descriptor")?;
        let transport_stream_id = be16(data, 2, "LDT linkage descriptor")?;
        let original_network_id = be16(data, 4, "LDT linkage descriptor")?;
        let descriptions = data[6..]
            .chunks_exact(4)
            .map(|d| LdtDescription {
                description_id: u16::from_be_bytes([d[0], d[1]]),
                description_type: d[2] & 0x0F,
                user_defined: d[3],
            })
            .collect();

        Ok(LdtLinkageDescriptor {
            original_service_id,
            transport_stream_id,
            original_network_id,
            descriptions,
        })
    }
}
