// src/core/numbers.rs
// Locale-tolerant number reading for table cells.

/// Strip spacing/sign decorations and unify the minus sign.
/// Returns (negative, digits-and-separators).
fn split_sign(cell: &str) -> Option<(bool, String)> {
    let mut body: String = cell
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{202f}' && *c != '\'')
        .collect();
    if body.ends_with('%') { body.pop(); }
    let mut chars = body.chars();
    let negative = match chars.next()? {
        '-' | '\u{2212}' | '–' => true,
        '+' => false,
        _ => return Some((false, body)),
    };
    Some((negative, chars.collect()))
}

/// Decimal cell: "78.5", "78,5", "+2.1", "−3,25", "1 234,5", "1,234.5", "12 %".
/// NaN and infinities are rejected.
pub fn parse_decimal(cell: &str) -> Option<f64> {
    let (negative, body) = split_sign(cell)?;
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ',') {
        return None;
    }
    if !body.starts_with(|c: char| c.is_ascii_digit()) { return None; }

    let last_dot = body.rfind('.');
    let last_comma = body.rfind(',');
    let normalized = match (last_dot, last_comma) {
        // both present: the later one is the decimal mark
        (Some(d), Some(c)) if d > c => body.replace(',', ""),
        (Some(_), Some(_)) => body.replace('.', "").replace(',', "."),
        (None, Some(_)) if body.matches(',').count() == 1 => body.replace(',', "."),
        (None, Some(_)) => body.replace(',', ""),
        (Some(_), None) if body.matches('.').count() > 1 => body.replace('.', ""),
        _ => body,
    };

    let value: f64 = normalized.parse().ok()?;
    if !value.is_finite() { return None; }
    Some(if negative { -value } else { value })
}

/// Signed whole number: "-3", "+3", "−12", "0".
pub fn parse_signed(cell: &str) -> Option<i32> {
    let (negative, body) = split_sign(cell)?;
    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit()) { return None; }
    let value: i32 = body.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Rank cell: "12", "#12", "12.", "12e"; must be positive.
pub fn parse_rank(cell: &str) -> Option<u32> {
    let t = cell.trim();
    let t = t.strip_prefix('#').unwrap_or(t);
    let t = t.trim_end_matches(['.', 'e', 'è', 'º', '°']);
    if t.is_empty() || !t.chars().all(|c| c.is_ascii_digit()) { return None; }
    t.parse::<u32>().ok().filter(|&r| r > 0)
}

/// True when the cell reads as any kind of number; used to tell data rows from decoration.
pub fn looks_numeric(cell: &str) -> bool {
    parse_decimal(cell).is_some() || parse_rank(cell).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_in_several_locales() {
        assert_eq!(parse_decimal("78.5"), Some(78.5));
        assert_eq!(parse_decimal("78,5"), Some(78.5));
        assert_eq!(parse_decimal("+2.1"), Some(2.1));
        assert_eq!(parse_decimal("−3,25"), Some(-3.25));
        assert_eq!(parse_decimal("- 0.4"), Some(-0.4));
        assert_eq!(parse_decimal("1 234,5"), Some(1234.5));
        assert_eq!(parse_decimal("1,234.5"), Some(1234.5));
        assert_eq!(parse_decimal("1.234,5"), Some(1234.5));
        assert_eq!(parse_decimal("12 %"), Some(12.0));
    }

    #[test]
    fn decimals_reject_junk() {
        for junk in ["", "NaN", "inf", "-inf", "abc", "12a", ".5x", "+", "--1", ",5"] {
            assert_eq!(parse_decimal(junk), None, "{junk:?}");
        }
    }

    #[test]
    fn signed_and_rank() {
        assert_eq!(parse_signed("-3"), Some(-3));
        assert_eq!(parse_signed("+3"), Some(3));
        assert_eq!(parse_signed("−12"), Some(-12));
        assert_eq!(parse_signed("1.5"), None);

        assert_eq!(parse_rank("12"), Some(12));
        assert_eq!(parse_rank("#12"), Some(12));
        assert_eq!(parse_rank("12."), Some(12));
        assert_eq!(parse_rank("0"), None);
        assert_eq!(parse_rank("-1"), None);
    }
}
