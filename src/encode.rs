//! Encode SNUG values back to text.
//!
//! The encoder walks the tree emitting keys at 2-space indents, choosing
//! between inline and multi-line array layouts, emitting block strings for
//! multi-line scalars, and quoting any string whose unquoted form would
//! decode to something else. Layout choices are not preserved from a prior
//! decode; the guarantee is that re-decoding the output reproduces an equal
//! tree, modulo the two documented lossy cases (inline vs multi-line array
//! layout, and arrays of objects becoming repeated-key runs).
//!
//! Objects can be spelled only at key position: as a key's value, or as
//! immediate elements of a key's array (repeated-key lines). An object any
//! deeper inside an array — a shape the decoder reaches through imports —
//! has no text form, and such trees fail with [`EncodeError`] rather than
//! encoding lossily.

use crate::error::EncodeError;
use crate::parser::{is_date_shaped, is_number_shaped};
use crate::value::{iso_timestamp, Value};
use indexmap::IndexMap;

/// Encode a value as SNUG text.
///
/// `Null` and `Undefined` yield empty text. Objects and arrays yield their
/// multi-line encodings with a trailing newline; bare scalars yield a single
/// encoded token without one. Fails with [`EncodeError`] when the tree
/// carries an object nested inside an array below key position.
pub fn encode(value: &Value) -> Result<String, EncodeError> {
    match value {
        Value::Null | Value::Undefined => Ok(String::new()),
        Value::Object(map) => {
            let mut out = String::new();
            write_object(&mut out, map, 0)?;
            Ok(out)
        }
        Value::Array(items) => {
            let mut out = String::new();
            if can_inline(items) {
                out.push_str(&inline_array(items)?);
                out.push('\n');
            } else {
                out.push_str("[\n");
                write_array_items(&mut out, items, 2)?;
                out.push_str("]\n");
            }
            Ok(out)
        }
        scalar => encode_scalar(scalar),
    }
}

// ============================================================================
// Objects
// ============================================================================

fn write_object(
    out: &mut String,
    map: &IndexMap<String, Value>,
    indent: usize,
) -> Result<(), EncodeError> {
    for (key, value) in map {
        match value {
            // Arrays holding objects have no inline or bracketed form; they
            // are emitted as consecutive repeated-key lines that merge back
            // into the same sequence on decode.
            Value::Array(items) if !items.is_empty() && items.iter().any(Value::is_object) => {
                write_repeated_key(out, key, items, indent)?;
            }
            Value::Array(items) if items.len() == 1 => {
                let forced = format!("[]{}", key);
                write_keyed_value(out, &forced, &items[0], indent)?;
            }
            other => write_keyed_value(out, key, other, indent)?,
        }
    }
    Ok(())
}

/// Emit one line (or block) per array element, all under the same key, so
/// repeated-key merging rebuilds the sequence in order. An array element in
/// the first position takes the `[]` marker: without it the decoder would
/// splice later elements into that array instead of alongside it.
fn write_repeated_key(
    out: &mut String,
    key: &str,
    items: &[Value],
    indent: usize,
) -> Result<(), EncodeError> {
    let pad = " ".repeat(indent);
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::Object(map) => {
                out.push_str(&pad);
                out.push_str(key);
                out.push('\n');
                write_object(out, map, indent + 2)?;
            }
            Value::Array(_) if i == 0 => {
                let forced = format!("[]{}", key);
                write_keyed_value(out, &forced, item, indent)?;
            }
            other => write_keyed_value(out, key, other, indent)?,
        }
    }
    Ok(())
}

/// Emit `key value` for a scalar, `key [...]` for an array, `key """` for a
/// block string, or `key` plus a nested block for an object. `key` may
/// already carry the `[]` force-array marker.
fn write_keyed_value(
    out: &mut String,
    key: &str,
    value: &Value,
    indent: usize,
) -> Result<(), EncodeError> {
    let pad = " ".repeat(indent);
    match value {
        Value::String(s) if s.contains('\n') && block_eligible(s) => {
            out.push_str(&pad);
            out.push_str(key);
            out.push_str(" \"\"\"\n");
            write_block_lines(out, s, indent + 2);
            out.push_str(&pad);
            out.push_str("\"\"\"\n");
        }
        Value::Array(items) => {
            if can_inline(items) {
                out.push_str(&format!("{}{} {}\n", pad, key, inline_array(items)?));
            } else {
                out.push_str(&format!("{}{} [\n", pad, key));
                write_array_items(out, items, indent + 2)?;
                out.push_str(&format!("{}]\n", pad));
            }
        }
        Value::Object(map) => {
            out.push_str(&pad);
            out.push_str(key);
            out.push('\n');
            write_object(out, map, indent + 2)?;
        }
        other => {
            out.push_str(&format!("{}{} {}\n", pad, key, encode_scalar(other)?));
        }
    }
    Ok(())
}

// ============================================================================
// Arrays
// ============================================================================

/// An array can be written inline when it is short, holds no objects or
/// multi-line strings, and every nested array is itself inline-eligible.
fn can_inline(items: &[Value]) -> bool {
    items.len() <= 3
        && items.iter().all(|item| match item {
            Value::Object(_) => false,
            Value::String(s) => !s.contains('\n'),
            Value::Array(inner) => can_inline(inner),
            _ => true,
        })
}

fn inline_array(items: &[Value]) -> Result<String, EncodeError> {
    let parts = items
        .iter()
        .map(inline_element)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(format!("[{}]", parts.join(", ")))
}

fn inline_element(value: &Value) -> Result<String, EncodeError> {
    match value {
        Value::Array(inner) => inline_array(inner),
        Value::String(s) => Ok(if element_needs_quoting(s) {
            quote(s)
        } else {
            s.clone()
        }),
        // No inline object syntax; can_inline keeps objects out of this
        // path, but a direct caller still gets a refusal, not wrong text.
        Value::Object(_) => Err(EncodeError),
        other => encode_scalar(other),
    }
}

/// Emit the body of a multi-line array, one element per line at `indent`.
fn write_array_items(
    out: &mut String,
    items: &[Value],
    indent: usize,
) -> Result<(), EncodeError> {
    let pad = " ".repeat(indent);
    for item in items {
        match item {
            Value::String(s) if s.contains('\n') && block_eligible(s) => {
                out.push_str(&pad);
                out.push_str("\"\"\"\n");
                write_block_lines(out, s, indent + 2);
                out.push_str(&pad);
                out.push_str("\"\"\"\n");
            }
            Value::String(s) => {
                let text = if element_needs_quoting(s) {
                    quote(s)
                } else {
                    s.clone()
                };
                out.push_str(&format!("{}{}\n", pad, text));
            }
            Value::Array(inner) => {
                if can_inline(inner) {
                    out.push_str(&format!("{}{}\n", pad, inline_array(inner)?));
                } else {
                    out.push_str(&format!("{}[\n", pad));
                    write_array_items(out, inner, indent + 2)?;
                    out.push_str(&format!("{}]\n", pad));
                }
            }
            // Objects are spelled by repeated keys, which exist only at key
            // position. This deep there is no wire form for one.
            Value::Object(_) => return Err(EncodeError),
            other => {
                out.push_str(&format!("{}{}\n", pad, encode_scalar(other)?));
            }
        }
    }
    Ok(())
}

// ============================================================================
// Block Strings
// ============================================================================

/// A multi-line string can take block form only when that form re-decodes
/// to the same string: the first line anchors the block indent, so it must
/// be non-empty and start with a non-space; whitespace-only lines collapse
/// to empty on decode; `\r` never survives line framing.
fn block_eligible(s: &str) -> bool {
    if s.contains('\r') {
        return false;
    }
    let mut lines = s.split('\n');
    match lines.next() {
        Some(first) if !first.is_empty() && !first.starts_with(' ') => {}
        _ => return false,
    }
    s.split('\n')
        .all(|line| line.is_empty() || !line.trim().is_empty())
}

fn write_block_lines(out: &mut String, s: &str, indent: usize) {
    let pad = " ".repeat(indent);
    for line in s.split('\n') {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&pad);
            out.push_str(line);
            out.push('\n');
        }
    }
}

// ============================================================================
// Scalars
// ============================================================================

fn encode_scalar(value: &Value) -> Result<String, EncodeError> {
    match value {
        Value::Null => Ok("null".to_string()),
        Value::Undefined => Ok("undefined".to_string()),
        Value::Bool(true) => Ok("true".to_string()),
        Value::Bool(false) => Ok("false".to_string()),
        Value::Number(n) => Ok(number_text(*n)),
        Value::Date(d) => Ok(iso_timestamp(d)),
        Value::String(s) => Ok(if needs_quoting(s) { quote(s) } else { s.clone() }),
        // Compound values are dispatched by their containers; an array in
        // scalar position still has its inline form, an object does not.
        Value::Array(items) => inline_array(items),
        Value::Object(_) => Err(EncodeError),
    }
}

fn number_text(n: f64) -> String {
    if n.is_finite() {
        format!("{}", n)
    } else {
        "null".to_string()
    }
}

/// A string must be quoted in value position when its unquoted form would
/// decode to something else: whitespace is trimmed, keywords and number- or
/// date-shaped tokens classify as other types, and a leading quote, `[`, or
/// `@` changes the dispatch.
fn needs_quoting(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if s.contains(' ') || s.contains('\t') || s.contains('\n') || s.contains('\r') {
        return true;
    }
    if matches!(s, "true" | "false" | "null" | "undefined") {
        return true;
    }
    let first = s.as_bytes()[0];
    if first.is_ascii_digit() || matches!(first, b'"' | b'\'' | b'[' | b'@') {
        return true;
    }
    is_number_shaped(s) || is_date_shaped(s)
}

/// Array-element position adds its own hazards: commas split items,
/// brackets nest, quotes open strings, and a trailing comma is stripped
/// from multi-line items.
fn element_needs_quoting(s: &str) -> bool {
    needs_quoting(s)
        || s.contains(',')
        || s.contains('[')
        || s.contains(']')
        || s.contains('"')
        || s.contains('\'')
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
