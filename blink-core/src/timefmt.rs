//! 时间/日期值与 ISO-8601 文本的互转。
//!
//! # 教案定位（Why）
//! - Tag/JSON/XML 三种文本格式都以 ISO-8601 字符串呈现时间族类型，
//!   而二进制格式保存的是纪元整数，这里是两种表示的唯一换算点。
//! - 公历换算采用标准的纪元日算术（以 400 年为周期），避免引入
//!   日历库依赖。
//!
//! # 契约说明（What）
//! - `millitime`/`nanotime`：UTC 纪元毫秒/纳秒，文本形如
//!   `1970-01-02T03:04:05.006Z`（纳秒精度为九位小数）。
//! - `date`：纪元日，文本形如 `1970-01-02`。
//! - `timeOfDayMilli`/`timeOfDayNano`：自午夜起的毫秒/纳秒，
//!   文本形如 `03:04:05.006`。
//! - 解析接受缺省的小数部分与可选的 `Z` 后缀；其余偏差是强错误。

use alloc::format;
use alloc::string::String;

use crate::error::{BlinkError, Result};

const MILLIS_PER_DAY: i64 = 86_400_000;
const NANOS_PER_DAY: i64 = 86_400_000_000_000;

/// 纪元日转公历 `(年, 月, 日)`。
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = (z - era * 146_097) as i64;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if month <= 2 { year + 1 } else { year }, month, day)
}

/// 公历转纪元日。
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let adjusted = if month <= 2 { year - 1 } else { year };
    let era = if adjusted >= 0 { adjusted } else { adjusted - 399 } / 400;
    let yoe = adjusted - era * 400;
    let mp = if month > 2 { month - 3 } else { month + 9 } as i64;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// 渲染 `date` 值。
pub fn format_date(days: i64) -> String {
    let (year, month, day) = civil_from_days(days);
    format!("{year:04}-{month:02}-{day:02}")
}

/// 渲染 `timeOfDayMilli` 值。
pub fn format_time_of_day_milli(millis: u32) -> String {
    let seconds = millis / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        seconds / 3600,
        seconds / 60 % 60,
        seconds % 60,
        millis % 1000
    )
}

/// 渲染 `timeOfDayNano` 值。
pub fn format_time_of_day_nano(nanos: u64) -> String {
    let seconds = nanos / 1_000_000_000;
    format!(
        "{:02}:{:02}:{:02}.{:09}",
        seconds / 3600,
        seconds / 60 % 60,
        seconds % 60,
        nanos % 1_000_000_000
    )
}

/// 渲染 `millitime` 值。
pub fn format_millitime(epoch_millis: i64) -> String {
    let days = epoch_millis.div_euclid(MILLIS_PER_DAY);
    let of_day = epoch_millis.rem_euclid(MILLIS_PER_DAY) as u32;
    format!(
        "{}T{}Z",
        format_date(days),
        format_time_of_day_milli(of_day)
    )
}

/// 渲染 `nanotime` 值。
pub fn format_nanotime(epoch_nanos: i64) -> String {
    let days = epoch_nanos.div_euclid(NANOS_PER_DAY);
    let of_day = epoch_nanos.rem_euclid(NANOS_PER_DAY) as u64;
    format!("{}T{}Z", format_date(days), format_time_of_day_nano(of_day))
}

fn parse_error(text: &str) -> BlinkError {
    BlinkError::value(format!("invalid time/date literal {text:?}"))
}

fn parse_int(text: &str, full: &str) -> Result<i64> {
    text.parse::<i64>().map_err(|_| parse_error(full))
}

/// 解析 `date` 文本为纪元日。
pub fn parse_date(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    let mut parts = trimmed.splitn(3, '-');
    // 负年份以前导 '-' 开头，这里只支持公元纪年的常规写法。
    let year = parse_int(parts.next().ok_or_else(|| parse_error(text))?, text)?;
    let month = parse_int(parts.next().ok_or_else(|| parse_error(text))?, text)?;
    let day = parse_int(parts.next().ok_or_else(|| parse_error(text))?, text)?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(parse_error(text));
    }
    Ok(days_from_civil(year, month as u32, day as u32))
}

/// 解析 `HH:MM:SS(.frac)?` 为 `(总秒数, 小数部分纳秒)`。
fn parse_time_of_day(text: &str) -> Result<(u64, u64)> {
    let trimmed = text.trim().trim_end_matches('Z');
    let (clock, fraction) = match trimmed.split_once('.') {
        Some((clock, frac)) => (clock, Some(frac)),
        None => (trimmed, None),
    };
    let mut parts = clock.splitn(3, ':');
    let hours = parse_int(parts.next().ok_or_else(|| parse_error(text))?, text)?;
    let minutes = parse_int(parts.next().ok_or_else(|| parse_error(text))?, text)?;
    let seconds = parse_int(parts.next().ok_or_else(|| parse_error(text))?, text)?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) || !(0..60).contains(&seconds) {
        return Err(parse_error(text));
    }
    let total_seconds = (hours * 3600 + minutes * 60 + seconds) as u64;
    let nanos = match fraction {
        None => 0,
        Some(digits) => {
            if digits.is_empty() || digits.len() > 9 || !digits.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(parse_error(text));
            }
            let value = parse_int(digits, text)? as u64;
            value * 10u64.pow(9 - digits.len() as u32)
        }
    };
    Ok((total_seconds, nanos))
}

/// 解析 `timeOfDayMilli` 文本。
pub fn parse_time_of_day_milli(text: &str) -> Result<u32> {
    let (seconds, nanos) = parse_time_of_day(text)?;
    Ok((seconds * 1000 + nanos / 1_000_000) as u32)
}

/// 解析 `timeOfDayNano` 文本。
pub fn parse_time_of_day_nano(text: &str) -> Result<u64> {
    let (seconds, nanos) = parse_time_of_day(text)?;
    Ok(seconds * 1_000_000_000 + nanos)
}

/// 解析 `millitime` 文本为纪元毫秒。
pub fn parse_millitime(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    let (date_part, time_part) = trimmed.split_once('T').ok_or_else(|| parse_error(text))?;
    let days = parse_date(date_part)?;
    let of_day = parse_time_of_day_milli(time_part)? as i64;
    Ok(days * MILLIS_PER_DAY + of_day)
}

/// 解析 `nanotime` 文本为纪元纳秒。
pub fn parse_nanotime(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    let (date_part, time_part) = trimmed.split_once('T').ok_or_else(|| parse_error(text))?;
    let days = parse_date(date_part)?;
    let of_day = parse_time_of_day_nano(time_part)? as i64;
    Ok(days * NANOS_PER_DAY + of_day)
}
