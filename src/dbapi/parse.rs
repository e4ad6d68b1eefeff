//! Statement scanning for the DB-API shim: column names of simple selects
//! and `format` style parameter substitution.

use crate::types::Value;

use super::error::{DbApiError, DbResult};

/// Column names derived from a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    /// Names taken from the field list.
    Named(Vec<String>),
    /// `SELECT *`: the names have to be asked from the server.
    Star { table: String },
    /// Not a select, or nothing could be derived.
    Unknown,
}

#[inline]
fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Byte offsets of the top level positions of `s`: outside single quotes and
/// parentheses.
fn top_level(s: &str) -> impl Iterator<Item = usize> + '_ {
    let mut depth = 0usize;
    let mut quoted = false;
    s.bytes().enumerate().filter_map(move |(i, b)| {
        match b {
            b'\'' => {
                quoted = !quoted;
                return None;
            }
            b'(' if !quoted => {
                depth += 1;
                return None;
            }
            b')' if !quoted => {
                depth = depth.saturating_sub(1);
                return None;
            }
            _ => {}
        }
        (!quoted && depth == 0).then_some(i)
    })
}

/// Find the keyword `kw` as a whole word at top level.
fn find_keyword(s: &str, kw: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let kw = kw.as_bytes();
    top_level(s).find(|&i| {
        let end = i + kw.len();
        end <= bytes.len()
            && bytes[i..end].eq_ignore_ascii_case(kw)
            && (i == 0 || !is_word_byte(bytes[i - 1]))
            && (end == bytes.len() || !is_word_byte(bytes[end]))
    })
}

/// Split on top level commas and trim the parts.
pub fn split_fields(s: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut start = 0;
    for i in top_level(s) {
        if s.as_bytes()[i] == b',' {
            fields.push(s[start..i].trim().to_string());
            start = i + 1;
        }
    }
    fields.push(s[start..].trim().to_string());
    fields
}

/// Column name of one select field: the alias if there is one.
pub fn field_name(field: &str) -> String {
    let field = field.trim();
    let mut alias_at = None;
    let mut from = 0;
    while let Some(i) = find_keyword(&field[from..], "as") {
        alias_at = Some(from + i);
        from += i + 2;
    }
    match alias_at {
        Some(i) => {
            let alias = field[i + 2..].trim();
            if alias.is_empty() {
                field.to_string()
            } else {
                alias.to_string()
            }
        }
        None => field.to_string(),
    }
}

/// Derive column names from `SELECT <fields> FROM <table> ...`.
pub fn select_columns(op: &str) -> Columns {
    let op = op.trim().trim_end_matches(';').trim_end();
    if find_keyword(op, "select") != Some(0) {
        return Columns::Unknown;
    }
    let rest = &op[6..];
    let (fields, table) = match find_keyword(rest, "from") {
        Some(i) => {
            let table = rest[i + 4..]
                .split_whitespace()
                .next()
                .unwrap_or("")
                .to_string();
            (&rest[..i], table)
        }
        None => (rest, String::new()),
    };
    let fields = fields.trim();
    if fields.is_empty() {
        return Columns::Unknown;
    }
    if fields.starts_with('*') {
        if table.is_empty() {
            return Columns::Unknown;
        }
        return Columns::Star { table };
    }
    Columns::Named(split_fields(fields).iter().map(|f| field_name(f)).collect())
}

/// Text a parameter is substituted with.
fn param_text(conv: char, value: &Value) -> DbResult<String> {
    match conv {
        'd' => match value {
            Value::Int(_) | Value::Bool(_) | Value::Date(_) | Value::Time(_) => {
                Ok(value.as_i64().unwrap_or_default().to_string())
            }
            Value::UInt(u) => Ok(u.to_string()),
            Value::Float(f) => Ok((f.trunc() as i64).to_string()),
            other => Err(DbApiError::Programming(format!(
                "%d format: a number is required, not {}",
                other.value_type().name()
            ))),
        },
        'f' => value.as_f64().map(|f| format!("{f:.6}")).ok_or_else(|| {
            DbApiError::Programming(format!(
                "%f format: a number is required, not {}",
                value.value_type().name()
            ))
        }),
        _ => Ok(value.to_string()),
    }
}

/// Replace `%s`, `%d` and `%f` placeholders in order. `%%` is a literal
/// percent sign. Values are inserted as they are, without quoting.
pub fn substitute(op: &str, params: &[Value]) -> DbResult<String> {
    let mut out = String::with_capacity(op.len());
    let mut params = params.iter();
    let mut used = 0usize;
    let mut chars = op.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(conv @ ('s' | 'd' | 'f')) => {
                chars.next();
                let value = params.next().ok_or_else(|| {
                    DbApiError::Programming(format!(
                        "not enough parameters for the statement ({used} given)"
                    ))
                })?;
                out.push_str(&param_text(conv, value)?);
                used += 1;
            }
            _ => out.push('%'),
        }
    }

    let left = params.count();
    if left > 0 {
        return Err(DbApiError::Programming(format!(
            "not all parameters were used ({left} left)"
        )));
    }
    Ok(out)
}
