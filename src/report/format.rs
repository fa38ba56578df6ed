//! Human-readable numbers for the text report.

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Placeholder for values that were never measured.
pub const MISSING: &str = "—";

#[must_use]
pub fn format_ms(ms: u64) -> String {
    format!("{} ms", ms)
}

/// Seconds with two decimals, rounded half up.
#[must_use]
pub fn format_sec(ms: u64) -> String {
    let hundredths = ms.saturating_add(5).checked_div(10).unwrap_or(0);
    format!(
        "{}.{:02} s",
        hundredths.checked_div(100).unwrap_or(0),
        hundredths.checked_rem(100).unwrap_or(0)
    )
}

/// `B` below 1 KiB, `KB` with one decimal below 1 MiB, else `MB` with two.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    if bytes < KIB {
        return format!("{} B", bytes);
    }
    if bytes < MIB {
        let tenths = scaled(bytes, 10, KIB);
        return format!(
            "{}.{} KB",
            tenths.checked_div(10).unwrap_or(0),
            tenths.checked_rem(10).unwrap_or(0)
        );
    }
    let hundredths = scaled(bytes, 100, MIB);
    format!(
        "{}.{:02} MB",
        hundredths.checked_div(100).unwrap_or(0),
        hundredths.checked_rem(100).unwrap_or(0)
    )
}

#[must_use]
pub fn format_optional_ms(ms: Option<u64>) -> String {
    ms.map_or_else(|| MISSING.to_owned(), format_ms)
}

#[must_use]
pub fn format_optional_sec(ms: Option<u64>) -> String {
    ms.map_or_else(|| MISSING.to_owned(), format_sec)
}

/// `value * factor / unit`, rounded half up, in 128-bit to avoid overflow.
fn scaled(value: u64, factor: u64, unit: u64) -> u64 {
    let numerator = u128::from(value)
        .saturating_mul(u128::from(factor))
        .saturating_add(u128::from(unit / 2));
    let result = numerator.checked_div(u128::from(unit)).unwrap_or(0);
    u64::try_from(result).unwrap_or(u64::MAX)
}
