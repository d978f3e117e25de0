//! Filesystem-safe name components.
//!
//! Plasmid names come straight out of vendor markup and routinely contain
//! path separators, shell-hostile punctuation, and non-ASCII symbols
//! (µg/mL dosages, Greek strain suffixes like DH5α). When a record is
//! materialized to disk its name becomes a directory component, so the
//! mapping has to be collision-free: a name containing `/` must never land
//! on the same path as an otherwise-identical name already spelling out
//! the substitute.
//!
//! Rules, per character:
//! - `%` escapes to `%25` first, which makes the percent-encoding below
//!   injective
//! - path-disallowed ASCII (`/ \ : * ? " < > |`) and control characters
//!   are percent-encoded byte-wise (`/` -> `%2F`)
//! - a documented set of non-ASCII symbols maps to ASCII words:
//!   `µ`/`μ` -> `u`, `°` -> `deg`, `α` -> `alpha`, `β` -> `beta`,
//!   `γ` -> `gamma`, `δ`/`Δ` -> `delta`, `λ` -> `lambda`,
//!   `–`/`—` -> `-`, `′` -> `prime`
//! - everything else passes through unchanged

/// Turn an arbitrary record name into a safe path component.
///
/// Surrounding whitespace is trimmed; an empty result falls back to
/// `"unnamed"` so callers always get a usable component.
pub fn sanitize_component(name: &str) -> String {
    let mut out = String::with_capacity(name.len());

    for ch in name.trim().chars() {
        match ch {
            '%' => out.push_str("%25"),
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => push_encoded(&mut out, ch),
            c if c.is_control() => push_encoded(&mut out, c),
            'µ' | 'μ' => out.push('u'),
            '°' => out.push_str("deg"),
            'α' => out.push_str("alpha"),
            'β' => out.push_str("beta"),
            'γ' => out.push_str("gamma"),
            'δ' | 'Δ' => out.push_str("delta"),
            'λ' => out.push_str("lambda"),
            '–' | '—' => out.push('-'),
            '′' => out.push_str("prime"),
            c => out.push(c),
        }
    }

    if out.is_empty() {
        "unnamed".to_string()
    } else {
        out
    }
}

fn push_encoded(out: &mut String, ch: char) {
    let mut buf = [0u8; 4];
    for byte in ch.encode_utf8(&mut buf).bytes() {
        out.push_str(&format!("%{:02X}", byte));
    }
}
