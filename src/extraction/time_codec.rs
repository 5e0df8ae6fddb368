//! # Time Codec
//!
//! Converts millisecond offsets into the `HH:MM:SS.mmm` strings shown to API clients.

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

/// Render a millisecond offset as `HH:MM:SS.mmm`.
///
/// Hours are padded to two digits and widen past 99 instead of wrapping,
/// so the conversion is total over `u64`.
///
/// ## Example:
/// ```text
/// to_display(120_350) == "00:02:00.350"
/// ```
pub fn to_display(ms: u64) -> String {
    let millis = ms % MS_PER_SECOND;
    let seconds = (ms / MS_PER_SECOND) % 60;
    let minutes = (ms / MS_PER_MINUTE) % 60;
    let hours = ms / MS_PER_HOUR;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
