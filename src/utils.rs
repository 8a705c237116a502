//! Utility functions for identifiers, markup and key generation

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique key then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

pub fn is_machine_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Join the parts into a lowercase CSS identifier. Anything outside
/// `[a-z0-9-]` becomes a dash, runs of dashes collapse.
pub fn css_identifier<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for part in parts {
        if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
        for c in part.chars() {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                out.push(c);
            } else if !out.ends_with('-') {
                out.push('-');
            }
        }
    }
    let trimmed = out.trim_matches('-');
    // identifiers may not start with a digit
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("id-{trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// CSS identifier that stays distinct for distinct part lists. The cleaned
/// parts keep it readable; a digest of the length prefixed raw parts
/// separates lists that clean to the same text.
pub fn unique_css_identifier<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let parts: Vec<&str> = parts.into_iter().collect();
    let mut encoded = Vec::new();
    for part in &parts {
        encoded.extend_from_slice(&(part.len() as u64).to_be_bytes());
        encoded.extend_from_slice(part.as_bytes());
    }
    let digest = sha256::digest(&encoded);
    let readable = css_identifier(parts);
    if readable.is_empty() {
        format!("id-{}", &digest[..FINGERPRINT_LEN])
    } else {
        format!("{readable}-{}", &digest[..FINGERPRINT_LEN])
    }
}

// hex characters of the digest kept in identifiers
const FINGERPRINT_LEN: usize = 32;

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
