//! Time formatting and target-pace parsing.

const HOUR_MS: u64 = 3_600_000;

/// `MM:SS.CC` below one hour, `H:MM:SS.CC` from there on. Centiseconds are
/// truncated, never rounded.
pub fn format_time(ms: u64) -> String {
    let centis = (ms % 1000) / 10;
    let secs = (ms / 1000) % 60;
    let mins = (ms / 60_000) % 60;
    let hours = ms / HOUR_MS;

    if hours > 0 {
        format!("{hours}:{mins:02}:{secs:02}.{centis:02}")
    } else {
        format!("{mins:02}:{secs:02}.{centis:02}")
    }
}

/// Compact `M:SS` label for chart axes.
pub fn format_axis(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{}:{:02}", total_secs / 60, total_secs % 60)
}

/// Parses a `MM:SS` target pace into milliseconds.
///
/// Anything that is not exactly two `:`-separated segments yields 0. Each
/// segment contributes its leading digits (after leading whitespace); a
/// segment without digits counts as 0.
pub fn parse_target_pace(text: &str) -> u64 {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 2 {
        return 0;
    }
    let mins = leading_number(parts[0]);
    let secs = leading_number(parts[1]);
    mins.saturating_mul(60_000)
        .saturating_add(secs.saturating_mul(1000))
}

fn leading_number(segment: &str) -> u64 {
    segment
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .fold(0u64, |acc, c| {
            acc.saturating_mul(10)
                .saturating_add(u64::from(c as u8 - b'0'))
        })
}
