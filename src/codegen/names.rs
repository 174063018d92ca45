//! Identifier Rendering
//!
//! Turns wire names (field names, enum values, type names) into Rust
//! identifiers. Wire names are kept verbatim on the wire through
//! `#[serde(rename)]` whenever the identifier differs.

/// Convert to PascalCase.
///
/// Words are split on any non-alphanumeric character. Letters after the
/// first of each word are kept as written, so `TenantID` stays `TenantID`.
pub fn to_pascal_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut capitalize_next = true;

    for c in s.chars() {
        if !c.is_ascii_alphanumeric() {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }

    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, 'V');
    }
    if result.is_empty() {
        result.push_str("Empty");
    }
    result
}

/// Convert to snake_case
pub fn to_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;

    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else if c.is_ascii_alphanumeric() {
            result.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            if !result.ends_with('_') {
                result.push('_');
            }
            prev_lower = false;
        }
    }

    if result.starts_with(|c: char| c.is_ascii_digit()) {
        result.insert(0, '_');
    }
    if result.is_empty() {
        result.push('_');
    }
    result
}

/// Escape a Rust keyword with `r#`.
///
/// `self`, `Self`, `super` and `crate` cannot be raw identifiers and get a
/// trailing underscore instead.
pub fn escape_keyword(name: &str) -> String {
    if NON_RAW_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else if RUST_KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

/// Field identifier for a wire name
pub fn field_ident(wire_name: &str) -> String {
    escape_keyword(&to_snake_case(wire_name))
}

/// Type or variant identifier for a wire name
pub fn type_ident(wire_name: &str) -> String {
    escape_keyword(&to_pascal_case(wire_name))
}

/// Identifier with any `r#` prefix removed, for comparing with the wire name
pub fn unraw(ident: &str) -> &str {
    ident.strip_prefix("r#").unwrap_or(ident)
}

const NON_RAW_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

const RUST_KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
    "move", "mut", "pub", "ref", "return", "static", "struct",
    "trait", "true", "type", "unsafe", "use", "where", "while",
    "async", "await", "dyn", "abstract", "become", "box", "do", "final",
    "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
];
