//! Display helpers for amounts and addresses.

use rust_decimal::{Decimal, RoundingStrategy};

const BILLION: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);
const MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
const THOUSAND: Decimal = Decimal::ONE_THOUSAND;

/// Compact an amount with a K/M/B suffix and two decimals. Values under a
/// thousand keep up to `fix` decimals with trailing zeros removed.
pub fn format_number(value: Decimal, fix: usize) -> String {
    let scaled = |unit: Decimal, suffix: &str| {
        let v = (value / unit).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("{v:.2}{suffix}")
    };
    if value >= BILLION {
        scaled(BILLION, "B")
    } else if value >= MILLION {
        scaled(MILLION, "M")
    } else if value >= THOUSAND {
        scaled(THOUSAND, "K")
    } else {
        fix_number(&value.to_string(), fix)
    }
}

/// Cut the fraction of a decimal string to `fix` digits and drop trailing
/// zeros. Truncates rather than rounds.
pub fn fix_number(raw: &str, fix: usize) -> String {
    let (int, frac) = raw.split_once('.').unwrap_or((raw, ""));
    let frac: String = frac.chars().take(fix).collect();
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int.to_string()
    } else {
        format!("{int}.{frac}")
    }
}

/// Insert thousands separators into the integer part.
pub fn to_thousands(raw: &str) -> String {
    let (int, frac) = match raw.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (raw, None),
    };
    let (sign, digits) = match int.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", int),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac {
        Some(frac) if !frac.is_empty() => format!("{sign}{grouped}.{frac}"),
        _ => format!("{sign}{grouped}"),
    }
}

/// Shorten long strings (addresses, hashes) to `head....tail`.
pub fn super_long(s: &str, keep: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 10 || keep * 2 >= chars.len() {
        return s.to_string();
    }
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{head}....{tail}")
}

/// `format_number` for optional fields, `-` when absent.
pub fn format_opt(value: Option<Decimal>, fix: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format_number(v, fix))
}
