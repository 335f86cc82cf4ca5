//! Phase 2: Line Decoder
//!
//! The decoder makes a single forward pass over the scanned line table,
//! maintaining an indent-keyed stack of open objects. Every non-skipped
//! line attaches exactly one (key, value) pair to the innermost object
//! whose indent is smaller than the line's. It handles:
//! - Scalars: null, undefined, booleans, numbers, dates, strings
//! - Inline arrays (nested brackets, quoted items)
//! - Multi-line arrays (`[` at end of line, `]` on a later line)
//! - Block strings (`"""` ... `"""` with common-indent stripping)
//! - Repeated-key merging and the `[]key` force-array marker
//! - Import directives (`@"path"`, `@@"path"`)

use crate::error::{DecodeError, ErrorKind, Result};
use crate::import::Importer;
use crate::scanner::Line;
use crate::value::Value;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use indexmap::IndexMap;
use std::path::PathBuf;

/// One open object on the indent-keyed stack.
struct Frame {
    /// Indent of the line that opened this object; the root sentinel is -1.
    indent: i64,
    /// Key under which the object attaches to its parent on pop.
    key: String,
    /// Whether the opening line carried the `[]` force-array marker.
    force_array: bool,
    map: IndexMap<String, Value>,
}

impl Frame {
    fn root() -> Self {
        Frame {
            indent: -1,
            key: String::new(),
            force_array: false,
            map: IndexMap::new(),
        }
    }
}

pub(crate) struct Parser<'a, 's> {
    lines: &'a [Line],
    pos: usize,
    base_dir: PathBuf,
    importer: &'a mut Importer<'s>,
}

impl<'a, 's> Parser<'a, 's> {
    pub fn new(lines: &'a [Line], base_dir: PathBuf, importer: &'a mut Importer<'s>) -> Self {
        Parser {
            lines,
            pos: 0,
            base_dir,
            importer,
        }
    }

    /// Decode the line table into the root object.
    pub fn parse(mut self) -> Result<Value> {
        let lines = self.lines;
        let mut stack = vec![Frame::root()];

        while self.pos < lines.len() {
            let line = &lines[self.pos];
            if is_skippable(line.content()) {
                self.pos += 1;
                continue;
            }

            let indent = line.indent as i64;
            while stack.len() > 1 && indent <= stack[stack.len() - 1].indent {
                pop_frame(&mut stack);
            }

            let (force_array, key, rest) = split_key(line)?;

            if rest.is_empty() {
                // Empty value opens a fresh object; deeper lines attach into
                // it, and it joins its parent when the indent closes.
                stack.push(Frame {
                    indent,
                    key: key.to_string(),
                    force_array,
                    map: IndexMap::new(),
                });
                self.pos += 1;
                continue;
            }

            let value = if let Some(after) = rest.strip_prefix('[') {
                match after.rfind(']') {
                    Some(close) => {
                        let body = &after[..close];
                        let items = if body.trim().is_empty() {
                            Vec::new()
                        } else {
                            self.parse_inline_body(body, line)?
                        };
                        self.pos += 1;
                        Value::Array(items)
                    }
                    None => Value::Array(self.parse_multiline_array(indent)?),
                }
            } else if rest.trim() == "\"\"\"" {
                self.pos += 1;
                Value::String(self.collect_block(indent, self.pos - 1)?)
            } else {
                let scalar = classify(rest.trim());
                self.pos += 1;
                self.resolve_scalar(scalar, line)?
            };

            if let Some(top) = stack.last_mut() {
                attach(&mut top.map, key, value, force_array);
            }
        }

        while stack.len() > 1 {
            pop_frame(&mut stack);
        }
        let root = stack.pop().map(|frame| frame.map).unwrap_or_default();
        Ok(Value::Object(root))
    }

    /// Convert a classified scalar into a value, resolving import directives
    /// with the position of the line that carried them.
    fn resolve_scalar(&mut self, scalar: Scalar, line: &Line) -> Result<Value> {
        match scalar {
            Scalar::Value(value) => Ok(value),
            Scalar::Import { path, unwrap } => self
                .importer
                .resolve(&path, unwrap, &self.base_dir)
                .map_err(|kind| DecodeError::at(kind, line.line_num + 1, &line.text)),
        }
    }

    // ========================================================================
    // Multi-line Arrays
    // ========================================================================

    /// Parse a multi-line array opened at `array_indent`. The cursor sits on
    /// the opening line; on success it has consumed the closing `]` line.
    fn parse_multiline_array(&mut self, array_indent: i64) -> Result<Vec<Value>> {
        let lines = self.lines;
        let open_idx = self.pos;
        self.pos += 1;
        let mut items = Vec::new();

        while self.pos < lines.len() {
            let line = &lines[self.pos];
            if is_skippable(line.content()) {
                self.pos += 1;
                continue;
            }

            let indent = line.indent as i64;
            let trimmed = line.content().trim();

            if trimmed.starts_with(']') && indent <= array_indent {
                self.pos += 1;
                return Ok(items);
            }
            if indent <= array_indent {
                // Dedented out of the array without closing it.
                return Err(DecodeError::at(
                    ErrorKind::UnclosedArray,
                    line.line_num + 1,
                    &line.text,
                ));
            }

            if trimmed == "\"\"\"" {
                self.pos += 1;
                let text = self.collect_block(indent, self.pos - 1)?;
                items.push(Value::String(text));
                continue;
            }

            let item = trimmed.strip_suffix(',').unwrap_or(trimmed);
            if let Some(after) = item.strip_prefix('[') {
                match after.rfind(']') {
                    Some(close) => {
                        let body = &after[..close];
                        let nested = if body.trim().is_empty() {
                            Vec::new()
                        } else {
                            self.parse_inline_body(body, line)?
                        };
                        items.push(Value::Array(nested));
                        self.pos += 1;
                    }
                    None => {
                        items.push(Value::Array(self.parse_multiline_array(indent)?));
                    }
                }
                continue;
            }

            let scalar = classify(item);
            let value = self.resolve_scalar(scalar, line)?;
            items.push(value);
            self.pos += 1;
        }

        let open = &lines[open_idx];
        Err(DecodeError::at(
            ErrorKind::UnclosedArray,
            open.line_num + 1,
            &open.text,
        ))
    }

    // ========================================================================
    // Block Strings
    // ========================================================================

    /// Collect a block string whose opening `"""` sat at `header_indent`.
    /// The cursor sits on the first body line; on success it has consumed
    /// the closing `"""` line.
    ///
    /// The block indent is the indent of the first non-blank body line and
    /// is stripped from every subsequent line. A `"""` line deeper than the
    /// header is content, not a terminator.
    fn collect_block(&mut self, header_indent: i64, header_idx: usize) -> Result<String> {
        let lines = self.lines;
        let mut block_indent: Option<usize> = None;
        let mut collected: Vec<String> = Vec::new();

        while self.pos < lines.len() {
            let line = &lines[self.pos];

            if line.text.trim() == "\"\"\"" && (line.indent as i64) <= header_indent {
                self.pos += 1;
                return Ok(collected.join("\n"));
            }

            if line.content().is_empty() {
                // Blank lines before the first content line are dropped.
                if block_indent.is_some() {
                    collected.push(String::new());
                }
                self.pos += 1;
                continue;
            }

            let b = *block_indent.get_or_insert(line.indent);
            if line.indent >= b {
                collected.push(line.text[b..].to_string());
            } else {
                collected.push(line.content().to_string());
            }
            self.pos += 1;
        }

        let header = &lines[header_idx];
        Err(DecodeError::at(
            ErrorKind::UnclosedBlockString,
            header.line_num + 1,
            &header.text,
        ))
    }

    // ========================================================================
    // Inline Arrays
    // ========================================================================

    fn parse_inline_body(&mut self, body: &str, line: &Line) -> Result<Vec<Value>> {
        let items = lex_inline(body)
            .map_err(|kind| DecodeError::at(kind, line.line_num + 1, &line.text))?;
        self.convert_items(items, line)
    }

    fn convert_items(&mut self, items: Vec<InlineItem>, line: &Line) -> Result<Vec<Value>> {
        items
            .into_iter()
            .map(|item| match item {
                InlineItem::Token(token) => self.resolve_scalar(classify(&token), line),
                InlineItem::Array(inner) => Ok(Value::Array(self.convert_items(inner, line)?)),
            })
            .collect()
    }
}

// ============================================================================
// Line Skipping and Keys
// ============================================================================

/// A line is skipped when it has no content, or when it is a comment: `#`
/// followed by a space or end of line. `#foo` is not a comment — as a key
/// it fails validation. Inline `# tail` after a value is content.
fn is_skippable(content: &str) -> bool {
    if content.is_empty() {
        return true;
    }
    if let Some(after) = content.strip_prefix('#') {
        return after.is_empty() || after.starts_with(' ');
    }
    false
}

/// Keys match `[A-Za-z0-9_-]+`.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Split a line into its force-array marker, validated key, and the value
/// text after the key (leading spaces skipped).
fn split_key(line: &Line) -> Result<(bool, &str, &str)> {
    let content = line.content();
    let (head, rest) = match content.split_once(' ') {
        Some((head, rest)) => (head, rest),
        None => (content, ""),
    };
    let (force_array, key) = match head.strip_prefix("[]") {
        Some(stripped) => (true, stripped),
        None => (false, head),
    };
    if !is_valid_key(key) {
        return Err(DecodeError::at(
            ErrorKind::InvalidKey,
            line.line_num + 1,
            &line.text,
        ));
    }
    Ok((force_array, key, rest.trim_start_matches(' ')))
}

// ============================================================================
// Tree Attachment
// ============================================================================

/// Attach a value under a key, applying repeated-key merging: a fresh key
/// stores the value (wrapped in a singleton array when forced), an existing
/// array takes an append, and anything else is promoted to a two-element
/// array in source order.
fn attach(parent: &mut IndexMap<String, Value>, key: &str, value: Value, force_array: bool) {
    match parent.get_mut(key) {
        None => {
            let stored = if force_array {
                Value::Array(vec![value])
            } else {
                value
            };
            parent.insert(key.to_string(), stored);
        }
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = std::mem::replace(existing, Value::Null);
            *existing = Value::Array(vec![first, value]);
        }
    }
}

fn pop_frame(stack: &mut Vec<Frame>) {
    if let Some(frame) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            attach(
                &mut parent.map,
                &frame.key,
                Value::Object(frame.map),
                frame.force_array,
            );
        }
    }
}

// ============================================================================
// Inline Array Lexer
// ============================================================================

/// A lexed inline-array element: a raw token awaiting classification, or a
/// nested array of elements.
enum InlineItem {
    Token(String),
    Array(Vec<InlineItem>),
}

/// Split an inline array body into items, honoring nested brackets and
/// quoted strings. Returns raw tokens; classification happens in the parser
/// so import directives resolve with source positions attached.
fn lex_inline(body: &str) -> std::result::Result<Vec<InlineItem>, ErrorKind> {
    let mut stack: Vec<Vec<InlineItem>> = Vec::new();
    let mut current: Vec<InlineItem> = Vec::new();
    let mut pending = String::new();
    let mut in_string = false;
    let mut quote = '\0';
    let mut escaped = false;

    for c in body.chars() {
        if in_string {
            pending.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                in_string = false;
            }
            continue;
        }
        match c {
            '[' => {
                flush_pending(&mut pending, &mut current);
                stack.push(std::mem::take(&mut current));
            }
            ']' => {
                flush_pending(&mut pending, &mut current);
                let child = std::mem::take(&mut current);
                match stack.pop() {
                    Some(parent) => {
                        current = parent;
                        current.push(InlineItem::Array(child));
                    }
                    None => return Err(ErrorKind::UnexpectedCloseBracket),
                }
            }
            ',' => flush_pending(&mut pending, &mut current),
            '"' | '\'' => {
                in_string = true;
                quote = c;
                pending.push(c);
            }
            _ => pending.push(c),
        }
    }

    if in_string {
        return Err(ErrorKind::UnclosedString);
    }
    if !stack.is_empty() {
        return Err(ErrorKind::UnclosedArray);
    }
    flush_pending(&mut pending, &mut current);
    Ok(current)
}

fn flush_pending(pending: &mut String, current: &mut Vec<InlineItem>) {
    let token = pending.trim();
    if !token.is_empty() {
        current.push(InlineItem::Token(token.to_string()));
    }
    pending.clear();
}

// ============================================================================
// Scalar Classification
// ============================================================================

/// A classified scalar token. Import directives stay symbolic until the
/// parser resolves them with a base directory and source position.
enum Scalar {
    Value(Value),
    Import { path: String, unwrap: bool },
}

/// Map a trimmed token to a typed value.
///
/// Classification order is strict: keywords, import directives, numbers
/// (only when number-shaped), dates (only when date-shaped and naming a
/// valid instant), quoted strings, then plain strings. A number-shaped
/// token that does not yield a finite double falls through to a plain
/// string, as does a date-shaped token naming an invalid instant.
fn classify(token: &str) -> Scalar {
    match token {
        "null" => return Scalar::Value(Value::Null),
        "undefined" => return Scalar::Value(Value::Undefined),
        "true" => return Scalar::Value(Value::Bool(true)),
        "false" => return Scalar::Value(Value::Bool(false)),
        _ => {}
    }
    if let Some(directive) = token.strip_prefix('@') {
        let (path, unwrap) = match directive.strip_prefix('@') {
            Some(inner) => (inner, true),
            None => (directive, false),
        };
        return Scalar::Import {
            path: strip_path_quotes(path).to_string(),
            unwrap,
        };
    }
    if is_number_shaped(token) {
        if let Ok(n) = token.parse::<f64>() {
            if n.is_finite() {
                return Scalar::Value(Value::Number(n));
            }
        }
    }
    if is_date_shaped(token) {
        if let Some(instant) = parse_date(token) {
            return Scalar::Value(Value::Date(instant));
        }
    }
    if let Some(inner) = quoted_inner(token) {
        return Scalar::Value(Value::String(unescape(inner)));
    }
    Scalar::Value(Value::String(token.to_string()))
}

/// Return the content between matching outer quotes, if any.
fn quoted_inner(token: &str) -> Option<&str> {
    let b = token.as_bytes();
    if b.len() >= 2 && (b[0] == b'"' || b[0] == b'\'') && b[b.len() - 1] == b[0] {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

/// Strip matching outer quotes from an import path; unquoted paths are
/// taken verbatim, with no escape processing either way.
fn strip_path_quotes(path: &str) -> &str {
    quoted_inner(path).unwrap_or(path)
}

/// Decode string escapes: `\n \r \t` become their characters; `\` followed
/// by any other character yields that character literally.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

// ============================================================================
// Number Shape
// ============================================================================

/// Check a token against the number grammar
/// `[+-]?digits(.digits)?([eE][+-]?digits)?`.
pub(crate) fn is_number_shaped(token: &str) -> bool {
    let b = token.as_bytes();
    let mut i = 0;
    if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
        i += 1;
    }
    let integer_digits = digit_run(b, i);
    if integer_digits == 0 {
        return false;
    }
    i += integer_digits;
    if i < b.len() && b[i] == b'.' {
        i += 1;
        let fraction_digits = digit_run(b, i);
        if fraction_digits == 0 {
            return false;
        }
        i += fraction_digits;
    }
    if i < b.len() && (b[i] == b'e' || b[i] == b'E') {
        i += 1;
        if i < b.len() && (b[i] == b'+' || b[i] == b'-') {
            i += 1;
        }
        let exponent_digits = digit_run(b, i);
        if exponent_digits == 0 {
            return false;
        }
        i += exponent_digits;
    }
    i == b.len()
}

fn digit_run(b: &[u8], start: usize) -> usize {
    b[start..].iter().take_while(|c| c.is_ascii_digit()).count()
}

// ============================================================================
// Date Parsing
// ============================================================================

/// Check whether a token has the leading shape of a date: at least
/// `YYYY-MM-DD`, digit first, dashes at positions 4 and 7.
pub(crate) fn is_date_shaped(token: &str) -> bool {
    let b = token.as_bytes();
    b.len() >= 10 && b[0].is_ascii_digit() && b[4] == b'-' && b[7] == b'-'
}

/// Parse a date token into a UTC instant.
///
/// Accepts `YYYY-MM-DD`, optionally followed by `[T ]HH:MM(:SS(.fff)?)?`
/// and a `Z` or `±HH:MM` zone designator. Without a designator the time is
/// taken as UTC. Returns `None` for grammar mismatches and invalid instants
/// so the token decodes as a plain string.
fn parse_date(token: &str) -> Option<DateTime<Utc>> {
    if !token.is_ascii() {
        return None;
    }
    if token.len() == 10 {
        let date = NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()?;
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
    }
    let b = token.as_bytes();
    if b.len() < 16 || (b[10] != b'T' && b[10] != b' ') {
        return None;
    }

    let (timed, offset) = split_zone(token)?;
    let mut naive_text = timed.to_string();
    naive_text.replace_range(10..11, "T");

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&naive_text, format) {
            return match offset {
                Some(zone) => zone
                    .from_local_datetime(&naive)
                    .single()
                    .map(|d| d.with_timezone(&Utc)),
                None => Some(Utc.from_utc_datetime(&naive)),
            };
        }
    }
    None
}

/// Split a trailing `Z` or `±HH:MM` zone designator off a date-time token.
/// A `None` zone means UTC. Returns `None` overall for a malformed offset.
fn split_zone(token: &str) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(stripped) = token.strip_suffix('Z') {
        return Some((stripped, None));
    }
    let b = token.as_bytes();
    if let Some(i) = b.len().checked_sub(6) {
        if i >= 11 && (b[i] == b'+' || b[i] == b'-') && b[b.len() - 3] == b':' {
            let hours: i32 = token[i + 1..i + 3].parse().ok()?;
            let minutes: i32 = token[b.len() - 2..].parse().ok()?;
            let magnitude = hours * 3600 + minutes * 60;
            let seconds = if b[i] == b'-' { -magnitude } else { magnitude };
            let zone = FixedOffset::east_opt(seconds)?;
            return Some((&token[..i], Some(zone)));
        }
    }
    Some((token, None))
}
