//! MJD dates and BCD times used by EIT and TOT.
//!
//! Broadcast times are JST wall-clock values and are returned as naive
//! `chrono` types without a zone.

use chrono::{Days, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Day zero of the Modified Julian Date.
fn mjd_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1858, 11, 17)
}

/// Convert a 16-bit Modified Julian Date.
pub fn mjd_to_date(mjd: u16) -> Option<NaiveDate> {
    mjd_epoch()?.checked_add_days(Days::new(mjd as u64))
}

/// Decode one packed BCD byte (two decimal digits).
pub fn bcd_to_u8(byte: u8) -> Option<u8> {
    let high = byte >> 4;
    let low = byte & 0x0F;
    if high > 9 || low > 9 {
        return None;
    }
    Some(high * 10 + low)
}

/// Decode `hh mm ss` as packed BCD into seconds.
fn bcd_hms_seconds(bytes: &[u8; 3]) -> Option<u32> {
    let hours = bcd_to_u8(bytes[0])? as u32;
    let minutes = bcd_to_u8(bytes[1])? as u32;
    let seconds = bcd_to_u8(bytes[2])? as u32;
    if minutes > 59 || seconds > 59 {
        return None;
    }
    Some(hours * 3600 + minutes * 60 + seconds)
}

/// Decode a 40-bit `start_time` field (MJD + BCD hhmmss).
///
/// All bits set means undefined (e.g. a following event not yet scheduled).
pub fn decode_start_time(bytes: &[u8; 5]) -> Option<NaiveDateTime> {
    if bytes.iter().all(|&b| b == 0xFF) {
        return None;
    }
    let mjd = u16::from_be_bytes([bytes[0], bytes[1]]);
    let date = mjd_to_date(mjd)?;
    let hour = bcd_to_u8(bytes[2])?;
    let minute = bcd_to_u8(bytes[3])?;
    let second = bcd_to_u8(bytes[4])?;
    let time = NaiveTime::from_hms_opt(hour as u32, minute as u32, second as u32)?;
    Some(date.and_time(time))
}

/// Decode a 24-bit BCD `duration` field. All bits set means undefined.
pub fn decode_duration(bytes: &[u8; 3]) -> Option<Duration> {
    if bytes.iter().all(|&b| b == 0xFF) {
        return None;
    }
    bcd_hms_seconds(bytes).map(|s| Duration::seconds(s as i64))
}
