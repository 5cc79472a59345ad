use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

static SINK: OnceLock<Mutex<File>> = OnceLock::new();

/// Opens `path` for appending and installs it as the shared log sink.
/// Every line emitted after this also lands in the file, without colors.
pub fn init<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = SINK.set(Mutex::new(file));
    Ok(())
}

pub fn format_time(now: SystemTime) -> String {
    let total_secs = now
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let clock = total_secs % 86_400;
    let (year, month, day) = gregorian_date((total_secs / 86_400) as i64);

    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
        year,
        month,
        day,
        clock / 3_600,
        clock % 3_600 / 60,
        clock % 60
    )
}

/// Calendar date for a day count since 1970-01-01, exact over the
/// Gregorian 400-year cycle (146097 days).
fn gregorian_date(days_since_epoch: i64) -> (i64, u32, u32) {
    // Rebase day 0 to 0000-03-01; with March first, the leap day is the
    // last day of the year and the arithmetic below stays branch-free.
    let rebased = days_since_epoch + 719_468;
    let cycle = rebased.div_euclid(146_097);
    let day_of_cycle = rebased.rem_euclid(146_097);
    let year_of_cycle = (day_of_cycle - day_of_cycle / 1_460 + day_of_cycle / 36_524
        - day_of_cycle / 146_096)
        / 365;
    let day_of_year =
        day_of_cycle - (365 * year_of_cycle + year_of_cycle / 4 - year_of_cycle / 100);
    let month_index = (5 * day_of_year + 2) / 153;
    let day = (day_of_year - (153 * month_index + 2) / 5 + 1) as u32;
    let month = (if month_index < 10 {
        month_index + 3
    } else {
        month_index - 9
    }) as u32;
    let year = year_of_cycle + cycle * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[doc(hidden)]
pub fn emit(level: &str, colour: &str, message: &str) {
    let ts = format_time(SystemTime::now());
    println!("[{}] \x1b[{}m{}\x1b[0m {}", ts, colour, level, message);
    if let Some(sink) = SINK.get() {
        if let Ok(mut file) = sink.lock() {
            let _ = writeln!(file, "[{}] {} {}", ts, level, message);
        }
    }
}

#[macro_export]
macro_rules! log {
    ($level:expr, $colour:expr, $($arg:tt)*) => {
        $crate::emit($level, $colour, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! debug { ($($arg:tt)*) => { $crate::log!("[DEBUG]", "36", $($arg)*); }; } // Cyan
#[macro_export]
macro_rules! info { ($($arg:tt)*) => { $crate::log!("[INFO] ", "32", $($arg)*); }; } // Green
#[macro_export]
macro_rules! warn { ($($arg:tt)*) => { $crate::log!("[WARN] ", "33", $($arg)*); }; } // Yellow
#[macro_export]
macro_rules! error { ($($arg:tt)*) => { $crate::log!("[ERROR]", "31", $($arg)*); }; } // Red

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn format_time_is_zero_padded() {
        let ts = format_time(UNIX_EPOCH + Duration::from_secs(61));
        assert_eq!(ts, "1970-01-01 00:01:01");
    }

    #[test]
    fn format_time_handles_leap_days() {
        let ts = format_time(UNIX_EPOCH + Duration::from_secs(951_825_600));
        assert_eq!(ts, "2000-02-29 12:00:00");
    }

    #[test]
    fn format_time_at_year_boundary() {
        let ts = format_time(UNIX_EPOCH + Duration::from_secs(1_704_067_199));
        assert_eq!(ts, "2023-12-31 23:59:59");
    }
}
