//! Ordered extraction strategies for markup and loosely structured text.
//!
//! Upstream pages change without notice, so every source carries a short
//! list of strategies from most to least specific. Each strategy is a pure
//! `&str -> Option<f64>`; the first one that yields a number wins. No I/O
//! happens here, which keeps the policy testable against captured pages.

/// How a strategy locates its number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternKind {
    /// `data-field="<label>" ... value="<number>"` within a single tag.
    LabeledAttribute { label: String },

    /// `"<key>":"<number>"` or `"<key>": <number>`.
    QuotedKey { key: String },

    /// First number starting within `window` bytes after `keyword`
    /// (ASCII case-insensitive).
    NearKeyword { keyword: String, window: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionStrategy {
    pub name: &'static str,
    pub kind: PatternKind,
}

impl ExtractionStrategy {
    pub fn labeled_attribute(name: &'static str, label: impl Into<String>) -> Self {
        Self {
            name,
            kind: PatternKind::LabeledAttribute {
                label: label.into(),
            },
        }
    }

    pub fn quoted_key(name: &'static str, key: impl Into<String>) -> Self {
        Self {
            name,
            kind: PatternKind::QuotedKey { key: key.into() },
        }
    }

    pub fn near_keyword(name: &'static str, keyword: impl Into<String>, window: usize) -> Self {
        Self {
            name,
            kind: PatternKind::NearKeyword {
                keyword: keyword.into(),
                window,
            },
        }
    }

    pub fn extract(&self, text: &str) -> Option<f64> {
        match &self.kind {
            PatternKind::LabeledAttribute { label } => labeled_attribute(text, label),
            PatternKind::QuotedKey { key } => quoted_key(text, key),
            PatternKind::NearKeyword { keyword, window } => near_keyword(text, keyword, *window),
        }
    }
}

/// Runs `strategies` in order; returns the winning strategy and its number.
pub fn first_match<'a>(
    text: &str,
    strategies: &'a [ExtractionStrategy],
) -> Option<(&'a ExtractionStrategy, f64)> {
    strategies
        .iter()
        .find_map(|s| s.extract(text).map(|v| (s, v)))
}

fn labeled_attribute(text: &str, label: &str) -> Option<f64> {
    let needle = format!(r#"data-field="{label}""#);

    for (pos, _) in text.match_indices(&needle) {
        // The label must sit inside one tag: no `>` between the opening `<`
        // and the label, no `<` between the label and the closing `>`.
        let before = &text[..pos];
        let Some(open) = before.rfind(['<', '>']) else {
            continue;
        };
        if before.as_bytes()[open] != b'<' {
            continue;
        }
        let Some(close) = text[pos..].find(['<', '>']).map(|i| pos + i) else {
            continue;
        };
        if text.as_bytes()[close] != b'>' {
            continue;
        }
        let tag = &text[open + 1..close];

        let Some(v_pos) = tag.find(r#"value=""#) else {
            continue;
        };
        let rest = &tag[v_pos + r#"value=""#.len()..];
        let Some(close) = rest.find('"') else {
            continue;
        };
        if let Some(v) = parse_number(rest[..close].trim()) {
            return Some(v);
        }
    }

    None
}

fn quoted_key(text: &str, key: &str) -> Option<f64> {
    let needle = format!(r#""{key}""#);

    for (pos, _) in text.match_indices(&needle) {
        let rest = text[pos + needle.len()..].trim_start();
        let Some(rest) = rest.strip_prefix(':') else {
            continue;
        };
        let rest = rest.trim_start();
        let rest = rest.strip_prefix('"').unwrap_or(rest);

        if let Some((v, _)) = leading_number(rest) {
            return Some(v);
        }
    }

    None
}

fn near_keyword(text: &str, keyword: &str, window: usize) -> Option<f64> {
    if keyword.is_empty() {
        return None;
    }

    // ASCII lowercasing keeps byte offsets aligned with `text`.
    let haystack = text.to_ascii_lowercase();
    let needle = keyword.to_ascii_lowercase();

    for (pos, _) in haystack.match_indices(&needle) {
        let after = pos + needle.len();
        let Some(tail) = text.get(after..) else {
            continue;
        };

        let start = tail
            .char_indices()
            .take_while(|(i, _)| *i < window)
            .find(|(_, c)| c.is_ascii_digit())
            .map(|(i, _)| i);

        if let Some(i) = start {
            // Keep a sign that directly precedes the digits.
            let from = if i > 0 && tail.as_bytes()[i - 1] == b'-' { i - 1 } else { i };
            if let Some((v, _)) = leading_number(&tail[from..]) {
                return Some(v);
            }
        }
    }

    None
}

/// Parses the number at the very start of `s` (optional `-`, digits, `,`
/// thousands separators, one `.`, optional `e[+-]digits` exponent). Returns
/// the value and its byte length.
fn leading_number(s: &str) -> Option<(f64, usize)> {
    let bytes = s.as_bytes();
    let mut end = 0;
    if bytes.first() == Some(&b'-') {
        end = 1;
    }

    let digits_start = end;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' | b',' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }

    if !bytes[digits_start..end].iter().any(u8::is_ascii_digit) {
        return None;
    }

    let mantissa_end = end;
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = bytes[exp..].iter().take_while(|b| b.is_ascii_digit()).count();
        // `24.10 EUR` is a number followed by text, not an exponent.
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    let mantissa = s[..mantissa_end].trim_end_matches(['.', ',']);
    let token = format!("{mantissa}{}", &s[mantissa_end..end]);
    parse_number(&token).map(|v| (v, end))
}

/// Strict parse of a whole token, tolerating thousands separators.
pub(crate) fn parse_number(token: &str) -> Option<f64> {
    let cleaned: String = token.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}
