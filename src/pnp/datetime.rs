//! Conversion of OS timestamps to UTC
//!
//! Device properties expose time either as a WMI `CIM_DATETIME` string
//! (`yyyymmddHHMMSS.mmmmmmsUUU`, offset in minutes) or as a `FILETIME` tick count.

use crate::error::{AppError, Result};
use crate::pnp::property::PropertyData;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

/// 100ns intervals between 1601-01-01 and 1970-01-01
const FILETIME_UNIX_EPOCH: u64 = 116_444_736_000_000_000;

const TICKS_PER_SECOND: u64 = 10_000_000;

/// Length of a full `CIM_DATETIME` value
const CIM_DATETIME_LEN: usize = 25;

/// Parse a `CIM_DATETIME` string such as `20240117093015.000000+060`
pub fn parse_cim_datetime(value: &str) -> Result<DateTime<Utc>> {
    let invalid = || AppError::InvalidTimestamp(format!("'{}' is not a CIM datetime", value));

    let value = value.trim();
    if value.len() != CIM_DATETIME_LEN || !value.is_ascii() || &value[14..15] != "." {
        return Err(invalid());
    }

    let field = |range: std::ops::Range<usize>| -> Result<u32> {
        value[range].parse::<u32>().map_err(|_| invalid())
    };

    let year = field(0..4)? as i32;
    let month = field(4..6)?;
    let day = field(6..8)?;
    let hour = field(8..10)?;
    let minute = field(10..12)?;
    let second = field(12..14)?;
    let micros = field(15..21)?;

    let sign = match &value[21..22] {
        "+" => 1,
        "-" => -1,
        _ => return Err(invalid()),
    };
    let offset_minutes = sign * field(22..25)? as i64;

    let local = NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_micro_opt(hour, minute, second, micros))
        .ok_or_else(invalid)?;

    let utc = local - Duration::minutes(offset_minutes);
    Ok(Utc.from_utc_datetime(&utc))
}

/// Convert a `FILETIME` tick count to UTC
pub fn from_filetime(ticks: u64) -> Result<DateTime<Utc>> {
    let since_unix = ticks.checked_sub(FILETIME_UNIX_EPOCH).ok_or_else(|| {
        AppError::InvalidTimestamp(format!("FILETIME {} predates the Unix epoch", ticks))
    })?;

    let secs = (since_unix / TICKS_PER_SECOND) as i64;
    let nanos = ((since_unix % TICKS_PER_SECOND) * 100) as u32;

    Utc.timestamp_opt(secs, nanos)
        .single()
        .ok_or_else(|| AppError::InvalidTimestamp(format!("FILETIME {} out of range", ticks)))
}

/// Convert a timestamp-typed property payload to UTC
pub fn to_utc(data: &PropertyData) -> Result<DateTime<Utc>> {
    match data {
        PropertyData::String(s) => parse_cim_datetime(s),
        PropertyData::FileTime(ticks) => from_filetime(*ticks),
        other => Err(AppError::InvalidTimestamp(format!(
            "{:?} is not a timestamp",
            other
        ))),
    }
}
