//! MICR string grammar parser (spec §6): tokens are the control symbols
//! `T` (Transit), `U` (On-Us), `A` (Amount), `D` (Dash) and runs of
//! decimal digits. Pure function of the (legacy-remapped) input string.

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMicr {
    pub routing_number: String,
    pub account_number: String,
    pub check_number: String,
    pub amount: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    T,
    U,
    A,
    D,
}

/// Parse a MICR line into its constituent fields. `raw` is used
/// unchanged as the returned `micrLine` by the caller (spec §6); this
/// function only computes the structured fields.
pub fn parse(raw: &str) -> ParsedMicr {
    let normalized = apply_legacy_mapping(raw);
    let tokens = tokenize(&normalized);

    let mut result = ParsedMicr::default();
    let mut last_control: Option<Control> = None;
    let (mut tc, mut uc, mut ac, mut dc) = (0u32, 0u32, 0u32, 0u32);

    for token in tokens {
        match token {
            Token::Control(c) => {
                match c {
                    Control::T => tc += 1,
                    Control::U => uc += 1,
                    Control::A => ac += 1,
                    Control::D => dc += 1,
                }
                last_control = Some(c);
            }
            Token::Digits(digits) => {
                apply_digit_run(&mut result, &digits, last_control, tc, uc, ac, dc);
            }
        }
    }

    result.check_number = strip_leading_zeros(&result.check_number);
    result
}

fn apply_digit_run(
    result: &mut ParsedMicr,
    digits: &str,
    last_control: Option<Control>,
    tc: u32,
    uc: u32,
    ac: u32,
    dc: u32,
) {
    match last_control {
        Some(Control::T) => {
            if result.routing_number.is_empty() && tc == 1 {
                result.routing_number = digits.to_string();
                return;
            }
            if tc == 2 {
                result.account_number = digits.to_string();
                return;
            }
        }
        Some(Control::A) => {
            if ac == 1 {
                result.amount = digits.to_string();
                return;
            }
        }
        Some(Control::D) => {
            if dc == 1 {
                return; // skipped
            }
        }
        Some(Control::U) => {
            if tc == 0 {
                result.check_number = digits.to_string();
                return;
            }
        }
        None => {}
    }

    if !result.routing_number.is_empty() {
        if result.account_number.is_empty() {
            result.account_number = digits.to_string();
        } else {
            result.check_number = digits.to_string();
        }
    }
}

enum Token {
    Control(Control),
    Digits(String),
}

fn tokenize(s: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut digits = String::new();

    for ch in s.chars() {
        match ch {
            'T' => {
                flush_digits(&mut tokens, &mut digits);
                tokens.push(Token::Control(Control::T));
            }
            'U' => {
                flush_digits(&mut tokens, &mut digits);
                tokens.push(Token::Control(Control::U));
            }
            'A' => {
                flush_digits(&mut tokens, &mut digits);
                tokens.push(Token::Control(Control::A));
            }
            'D' => {
                flush_digits(&mut tokens, &mut digits);
                tokens.push(Token::Control(Control::D));
            }
            c if c.is_ascii_digit() => digits.push(c),
            _ => flush_digits(&mut tokens, &mut digits),
        }
    }
    flush_digits(&mut tokens, &mut digits);
    tokens
}

fn flush_digits(tokens: &mut Vec<Token>, digits: &mut String) {
    if !digits.is_empty() {
        tokens.push(Token::Digits(std::mem::take(digits)));
    }
}

/// Legacy `A->T, B->A, C->U` remap, applied globally whenever a literal
/// `C` token is present in the raw input (spec §6).
fn apply_legacy_mapping(raw: &str) -> String {
    if !raw.contains('C') {
        return raw.to_string();
    }
    raw.chars()
        .map(|c| match c {
            'A' => 'T',
            'B' => 'A',
            'C' => 'U',
            other => other,
        })
        .collect()
}

fn strip_leading_zeros(s: &str) -> String {
    let trimmed = s.trim_start_matches('0');
    if trimmed.is_empty() && !s.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_line() {
        let p = parse("T123T456U789");
        assert_eq!(p.routing_number, "123");
        assert_eq!(p.account_number, "456");
        assert_eq!(p.check_number, "789");
    }

    #[test]
    fn legacy_mapping_is_a_noop_without_c() {
        let p = parse("U12U T34T 56");
        assert_eq!(p.check_number, "12");
        assert_eq!(p.routing_number, "34");
        assert_eq!(p.account_number, "56");
    }

    #[test]
    fn legacy_mapping_applied_with_c_present() {
        let p = parse("C12C A34A 56");
        assert_eq!(p.check_number, "12");
        assert_eq!(p.routing_number, "34");
        assert_eq!(p.account_number, "56");
    }

    #[test]
    fn leading_zeros_stripped_from_check_number_only() {
        let p = parse("T012T034U056");
        assert_eq!(p.check_number, "56");
        assert_eq!(p.account_number, "034");
        assert_eq!(p.routing_number, "012");
    }

    #[test]
    fn empty_input_yields_empty_fields() {
        let p = parse("");
        assert_eq!(p, ParsedMicr::default());
    }
}
