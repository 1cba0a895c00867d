// Async Surreal for Rust
// SPDX-License-Identifier: MPL-2.0

//! Identifier validation, applied before any identifier is composed into
//! query text. Rejected identifiers are never sent to the server.

use crate::{Error, Result};

/// Reserved words that cannot be used as bare identifiers, matched
/// case-insensitively. Covers statement keywords, schema terms, primitive
/// type names, control flow, logical operators and literal constants.
const RESERVED_KEYWORDS: &[&str] = &[
    // statements
    "select", "create", "update", "delete", "insert", "upsert", "relate", "define", "remove",
    "alter", "info", "use", "let", "return", "live", "kill", "show", "sleep", "begin", "cancel",
    "commit", "option",
    // clauses
    "from", "where", "group", "order", "by", "limit", "start", "fetch", "split", "with", "set",
    "unset", "value", "values", "as", "omit", "only", "parallel", "timeout", "explain", "assert",
    "permissions", "full",
    // schema terms
    "namespace", "database", "table", "field", "index", "event", "function", "param", "scope",
    "token", "user", "analyzer", "schemafull", "schemaless",
    // control flow
    "if", "else", "then", "end", "for",
    // logical operators
    "and", "or", "not", "in", "is", "contains",
    // literal constants and primitive type names
    "true", "false", "null", "none", "bool", "int", "float", "string", "datetime", "duration",
    "decimal", "number", "object", "array", "record", "geometry", "uuid", "bytes", "any", "future",
];

/// True when `s` matches the bare identifier grammar
/// (`[A-Za-z_][A-Za-z0-9_]*`), regardless of the reserved keyword set.
pub fn is_bare_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_reserved(s: &str) -> bool {
    RESERVED_KEYWORDS
        .iter()
        .any(|kw| kw.eq_ignore_ascii_case(s))
}

/// True when `s` is a backtick-quoted identifier with no unescaped
/// backticks in its body.
fn is_quoted_ident(s: &str) -> bool {
    let Some(body) = s.strip_prefix('`').and_then(|s| s.strip_suffix('`')) else {
        return false;
    };
    if body.is_empty() {
        return false;
    }
    let mut escaped = false;
    for c in body.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '`' {
            return false;
        }
    }
    !escaped
}

/// Validate an identifier per the grammar: non-empty, either a bare
/// identifier that is not a reserved keyword, or backtick-quoted.
pub fn validate_ident(s: &str) -> Result<()> {
    if s.is_empty() {
        return Err(Error::Validation("identifier must not be empty".into()));
    }
    if is_quoted_ident(s) {
        return Ok(());
    }
    if !is_bare_ident(s) {
        return Err(Error::Validation(format!(
            "`{s}` is not a valid identifier; quote it with backticks to use it verbatim"
        )));
    }
    if is_reserved(s) {
        return Err(Error::Validation(format!(
            "`{s}` is a reserved keyword; quote it with backticks to use it as an identifier"
        )));
    }
    Ok(())
}

/// Validate a table name. Same rules as [`validate_ident`]; commas can
/// never appear, which the CSV matching in the SQL cache store relies on.
pub fn validate_table_name(s: &str) -> Result<()> {
    validate_ident(s).map_err(|_| {
        Error::Validation(format!(
            "`{s}` is not a valid table name; table names are identifiers"
        ))
    })
}

/// Escape an identifier for use in query text: bare identifiers pass
/// through, anything else is backtick-quoted with backticks and
/// backslashes escaped.
pub fn escape_ident(s: &str) -> String {
    if is_bare_ident(s) && !is_reserved(s) {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('`');
    for c in s.chars() {
        if c == '`' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('`');
    out
}
