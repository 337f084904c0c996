use crate::range::{OperatorType, Token, TokenType};
use crate::version::VersionRc;
use crate::Version;

const MAX_SAFE_COMPONENT_LENGTH: usize = 16;
const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Consumes a run of decimal digits. Rejects a leading zero in a
/// multi-digit run (`01`) — strict semver has no such thing, callers that
/// want npm's lenient leading-zero tolerance delint the source string
/// before parsing instead (see [`crate::version::delint_leading_zeros`]).
pub fn extract_number(str: &mut std::iter::Peekable<std::str::Chars>) -> Option<u32> {
    let mut num: u64 = 0;
    let mut valid = false;
    let mut digits = 0usize;
    let mut leading_zero = false;

    while let Some(&c) = str.peek() {
        if c.is_ascii_digit() {
            if digits == 0 && c == '0' {
                leading_zero = true;
            }

            digits += 1;
            if digits > MAX_SAFE_COMPONENT_LENGTH {
                return None;
            }

            let digit = c.to_digit(10)? as u64;
            num = num.checked_mul(10)?.checked_add(digit)?;
            if num > MAX_SAFE_INTEGER {
                return None;
            }
            valid = true;

            str.next();
        } else {
            break;
        }
    }

    if !valid || num > u32::MAX as u64 || (leading_zero && digits > 1) {
        return None;
    }

    Some(num as u32)
}

pub fn extract_alnum_hyphen(str: &mut std::iter::Peekable<std::str::Chars>) -> Option<String> {
    let mut res = String::new();
    let mut valid = false;

    while let Some(&c) = str.peek() {
        if c.is_alphanumeric() || c == '-' {
            res.push(c);
            valid = true;
            str.next();
        } else {
            break;
        }
    }

    valid.then_some(res)
}

pub fn extract_rc_segment(str: &mut std::iter::Peekable<std::str::Chars>) -> Option<VersionRc> {
    let curr = str.clone();

    if let Some(n) = extract_number(str) {
        if matches!(str.peek(), Some('.') | Some('+') | None) {
            return Some(VersionRc::Number(n));
        }
    }

    *str = curr;

    Some(VersionRc::String(extract_alnum_hyphen(str)?))
}

pub fn extract_rc(str: &mut std::iter::Peekable<std::str::Chars>) -> Option<Vec<VersionRc>> {
    let mut segments = vec![extract_rc_segment(str)?];

    while str.next_if_eq(&'.').is_some() {
        segments.push(extract_rc_segment(str)?);
    }

    Some(segments)
}

/// Parses a `major[.minor[.patch]][-rc][+build]` core, returning how many of
/// the three numeric components were left unspecified (used by range
/// operators like `^`/`~` to decide how wide the implied bound is).
pub fn extract_version(str: &mut std::iter::Peekable<std::str::Chars>) -> Option<(Version, u8)> {
    let mut major = 0;
    let mut minor = 0;
    let mut patch = 0;
    let mut rc = None;
    let mut missing = 3;

    if let Some('v') = str.peek() {
        str.next();
    }

    if let Some('*' | 'x' | 'X') = str.peek() {
        str.next();
    } else if let Some(n) = extract_number(str) {
        major = n;
        missing -= 1;
    } else {
        return None;
    }

    if str.next_if_eq(&'.').is_some() {
        if let Some('*' | 'x' | 'X') = str.peek() {
            str.next();
        } else if let Some(n) = extract_number(str) {
            if missing == 2 {
                minor = n;
                missing -= 1;
            }
        } else {
            return None;
        }

        if str.next_if_eq(&'.').is_some() {
            if let Some('*' | 'x' | 'X') = str.peek() {
                str.next();
            } else if let Some(n) = extract_number(str) {
                if missing == 1 {
                    patch = n;
                    missing -= 1;
                }
            } else {
                return None;
            }
        }
    }

    if str.next_if_eq(&'-').is_some() {
        rc = extract_rc(str);
    }

    if str.next_if_eq(&'+').is_some() {
        extract_rc(str)?;
    }

    Some((Version::new_from_components(major, minor, patch, rc), missing))
}

fn skip_whitespace(str: &mut std::iter::Peekable<std::str::Chars>) {
    while str.next_if_eq(&' ').is_some() {}
}

/// Expands a single comparator (`^1.2.3`, `~1.2`, `>=1.0.0`, a bare version,
/// ...) into the flat `>=`/`<` token pairs the evaluator understands.
pub fn extract_comparator(str: &mut std::iter::Peekable<std::str::Chars>) -> Option<Vec<Token>> {
    skip_whitespace(str);

    match str.peek()? {
        '^' => {
            str.next();
            skip_whitespace(str);

            let (version, missing) = extract_version(str)?;
            let upper_bound = match (missing, version.major, version.minor) {
                (0, 0, 0) => version.next_patch_rc(),
                (_, 0, _) => version.next_minor_rc(),
                _ => version.next_major_rc(),
            };

            Some(vec![
                Token::Operation(OperatorType::GreaterThanOrEqual, version),
                Token::Syntax(TokenType::SAnd),
                Token::Operation(OperatorType::LessThan, upper_bound),
            ])
        }

        '~' => {
            str.next();
            skip_whitespace(str);

            let (version, missing) = extract_version(str)?;
            let upper_bound = if missing >= 2 { version.next_major_rc() } else { version.next_minor_rc() };

            Some(vec![
                Token::Operation(OperatorType::GreaterThanOrEqual, version),
                Token::Syntax(TokenType::SAnd),
                Token::Operation(OperatorType::LessThan, upper_bound),
            ])
        }

        '>' | '<' | '=' => {
            let mut op = String::new();
            while matches!(str.peek(), Some('>' | '<' | '=')) {
                op.push(str.next().unwrap());
            }

            skip_whitespace(str);
            let (version, _) = extract_version(str)?;

            let operator = match op.as_str() {
                ">" => OperatorType::GreaterThan,
                ">=" => OperatorType::GreaterThanOrEqual,
                "<" => OperatorType::LessThan,
                "<=" => OperatorType::LessThanOrEqual,
                "=" => OperatorType::Equal,
                _ => return None,
            };

            Some(vec![Token::Operation(operator, version)])
        }

        '*' | 'x' | 'X' => {
            str.next();
            Some(vec![Token::Operation(OperatorType::GreaterThanOrEqual, Version::new())])
        }

        _ => {
            let (version, missing) = extract_version(str)?;

            if missing == 0 {
                Some(vec![Token::Operation(OperatorType::Equal, version)])
            } else {
                let upper_bound = match missing {
                    1 => version.next_minor_rc(),
                    _ => version.next_major_rc(),
                };

                Some(vec![
                    Token::Operation(OperatorType::GreaterThanOrEqual, version),
                    Token::Syntax(TokenType::SAnd),
                    Token::Operation(OperatorType::LessThan, upper_bound),
                ])
            }
        }
    }
}

/// Tries to read a hyphen range (`1.0.0 - 2.0.0`) starting at the current
/// position, which must already sit just after a bare lower-bound version.
/// Returns the replacement comparator tokens on success, leaving `str`
/// advanced past the upper bound; leaves `str` untouched on failure.
fn extract_hyphen_upper_bound(
    str: &mut std::iter::Peekable<std::str::Chars>,
    lower: Version,
) -> Option<Vec<Token>> {
    let mut probe = str.clone();
    skip_whitespace(&mut probe);

    probe.next_if_eq(&'-')?;
    skip_whitespace(&mut probe);

    let (upper, _) = extract_version(&mut probe)?;

    *str = probe;

    Some(vec![
        Token::Operation(OperatorType::GreaterThanOrEqual, lower),
        Token::Syntax(TokenType::SAnd),
        Token::Operation(OperatorType::LessThanOrEqual, upper),
    ])
}

/// Tokenizes a full range expression, joining hyphen ranges (`1.0.0 - 2.0.0`),
/// whitespace-implied `&&` (space-separated comparator sets) and `||`.
pub fn extract_tokens(str: &mut std::iter::Peekable<std::str::Chars>) -> Option<Vec<Token>> {
    let mut tokens = vec![];

    loop {
        skip_whitespace(str);

        if str.peek().is_none() {
            break;
        }

        let mut comparator = extract_comparator(str)?;

        if let [Token::Operation(OperatorType::Equal, lower)] = comparator.as_slice() {
            let lower = lower.clone();
            let mut retry = str.clone();

            if let Some(hyphen_tokens) = extract_hyphen_upper_bound(&mut retry, lower) {
                *str = retry;
                comparator = hyphen_tokens;
            }
        }

        if !tokens.is_empty() {
            tokens.push(Token::Syntax(TokenType::SAnd));
        }

        tokens.append(&mut comparator);

        skip_whitespace(str);

        if str.next_if_eq(&'|').is_some() {
            str.next_if_eq(&'|');
            skip_whitespace(str);

            tokens.push(Token::Syntax(TokenType::Or));
        }
    }

    if tokens.is_empty() {
        return None;
    }

    Some(tokens)
}

/// The flat, left-to-right token list produced by `extract_tokens` mixes
/// implicit `&&` between comparator groups with explicit `||`; this rewrites
/// it into the prefix form the range evaluator walks recursively, binding
/// `&&` tighter than `||`.
pub fn infix_to_prefix(tokens: &[Token]) -> Option<Vec<Token>> {
    // Split on top-level Or first (there is no parenthesization in this
    // grammar, so "top-level" just means "at all").
    let or_groups: Vec<&[Token]> = {
        let mut groups = vec![];
        let mut start = 0;

        for (index, token) in tokens.iter().enumerate() {
            if matches!(token, Token::Syntax(TokenType::Or)) {
                groups.push(&tokens[start..index]);
                start = index + 1;
            }
        }

        groups.push(&tokens[start..]);
        groups
    };

    fn build_and_chain(group: &[Token]) -> Option<Vec<Token>> {
        let operations: Vec<Token> = group.iter()
            .filter(|t| matches!(t, Token::Operation(..)))
            .cloned()
            .collect();

        if operations.is_empty() {
            return None;
        }

        if operations.len() == 1 {
            return Some(operations);
        }

        // Nest right-associatively: SAnd a (SAnd b c), which is what the
        // evaluator's pre-order walk over the token stream expects.
        Some(nest_and_chain(&operations))
    }

    fn nest_and_chain(operations: &[Token]) -> Vec<Token> {
        if operations.len() == 1 {
            return vec![operations[0].clone()];
        }

        let mut prefix = vec![Token::Syntax(TokenType::SAnd), operations[0].clone()];
        prefix.extend(nest_and_chain(&operations[1..]));
        prefix
    }

    let mut built_groups: Vec<Vec<Token>> = or_groups.into_iter()
        .filter_map(build_and_chain)
        .collect();

    if built_groups.is_empty() {
        return None;
    }

    if built_groups.len() == 1 {
        return Some(built_groups.remove(0));
    }

    // Nest the Or groups the same way: Or a (Or b c)
    fn nest_or_chain(groups: &mut Vec<Vec<Token>>) -> Vec<Token> {
        if groups.len() == 1 {
            return groups.remove(0);
        }

        let head = groups.remove(0);
        let mut prefix = vec![Token::Syntax(TokenType::Or)];
        prefix.extend(head);
        prefix.extend(nest_or_chain(groups));
        prefix
    }

    Some(nest_or_chain(&mut built_groups))
}
