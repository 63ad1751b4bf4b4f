//! CSV-injection guard.
//!
//! Spreadsheet applications evaluate cells that start with `=`, `+`, `@`, or
//! a hyphen followed by something arithmetic. Such values get a leading
//! apostrophe before they are written.

/// Characters that may follow a leading `-` and make the cell a formula.
const FORMULA_AFTER_HYPHEN: &[char] = &['=', '+', '-', '@', '(', '.'];

/// True if a spreadsheet would treat `value` as a formula or control sequence.
pub fn is_formula_like(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some('=' | '+' | '@') => true,
        Some(c) if c.is_control() => true,
        Some('-') => match chars.next() {
            Some(next) => next.is_ascii_digit() || FORMULA_AFTER_HYPHEN.contains(&next),
            None => false,
        },
        _ => false,
    }
}

/// Prefix formula-like values with `'`. Already-escaped values pass through.
pub fn sanitize_cell(value: &str) -> String {
    if is_formula_like(value) {
        format!("'{value}")
    } else {
        value.to_string()
    }
}
