//! Satoshi Amount Formatting
//!
//! All balances and deltas are carried internally as `i64` satoshis and only
//! converted to a decimal BTC string at the notification boundary. No float
//! arithmetic anywhere on the money path.

/// Satoshis per BTC (10^8).
pub const SATS_PER_BTC: i64 = 100_000_000;

/// Format a satoshi amount as a BTC string with exactly 8 decimal places.
///
/// ```text
/// format_btc(150_000_000) == "1.50000000"
/// format_btc(-24_551)     == "-0.00024551"
/// ```
pub fn format_btc(sats: i64) -> String {
    let sign = if sats < 0 { "-" } else { "" };
    let abs = sats.unsigned_abs();
    let whole = abs / SATS_PER_BTC as u64;
    let frac = abs % SATS_PER_BTC as u64;
    format!("{sign}{whole}.{frac:08}")
}

/// Format a transaction amount with an explicit leading sign.
///
/// The sign is derived from the value itself; a zero-delta self-transfer is
/// rendered with a `-` because zero-net activity is reported as Outbound.
pub fn format_btc_signed(sats: i64) -> String {
    if sats > 0 {
        format!("+{}", format_btc(sats))
    } else if sats < 0 {
        format_btc(sats)
    } else {
        format!("-{}", format_btc(0))
    }
}
