//! Single-line field splitting.
//!
//! Lenient by policy: a quote that is never closed (or that shows up in the
//! middle of a field) is kept as a literal character instead of failing the
//! row.

use crate::{DsvError, DsvResult};

/// Splits one logical line into fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokenizer {
    delimiter: String,
    strip: bool,
    quote: Option<char>,
}

impl Tokenizer {
    /// Builds a tokenizer with stripping on and no quote character.
    pub fn new(delimiter: impl Into<String>) -> DsvResult<Self> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(DsvError::Config("delimiter must not be empty".into()));
        }
        Ok(Self {
            delimiter,
            strip: true,
            quote: None,
        })
    }

    pub fn strip(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }

    pub fn quote(mut self, quote: Option<char>) -> Self {
        self.quote = quote;
        self
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Splits `line`. Empty fields are preserved, so an empty line is one
    /// empty field.
    pub fn tokenize(&self, line: &str) -> Vec<String> {
        let delim = self.delimiter.as_str();
        let mut fields = Vec::new();
        let mut rest = line;
        loop {
            if let Some((value, remaining)) = self.quoted_field(rest) {
                fields.push(value);
                match remaining {
                    Some(r) => rest = r,
                    None => break,
                }
                continue;
            }
            match rest.find(delim) {
                Some(pos) => {
                    fields.push(self.finish(&rest[..pos]));
                    rest = &rest[pos + delim.len()..];
                }
                None => {
                    fields.push(self.finish(rest));
                    break;
                }
            }
        }
        fields
    }

    /// Tokenizes every line in order.
    pub fn tokenize_all<'a, I>(&self, lines: I) -> Vec<Vec<String>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        lines.into_iter().map(|l| self.tokenize(l)).collect()
    }

    /// Tries to read a quoted field at the start of `input`.
    ///
    /// Returns the unquoted value and the input after the following delimiter
    /// (`None` when the field ran to the end of the line). Returns `None` when
    /// the field is not quoted or the quote is never properly closed.
    fn quoted_field<'a>(&self, input: &'a str) -> Option<(String, Option<&'a str>)> {
        let quote = self.quote?;
        let lead = if self.strip {
            input.len() - input.trim_start().len()
        } else {
            0
        };
        let body = input[lead..].strip_prefix(quote)?;

        let delim = self.delimiter.as_str();
        let mut value = String::new();
        let mut chars = body.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            if ch != quote {
                value.push(ch);
                continue;
            }
            if let Some(&(_, next)) = chars.peek() {
                if next == quote {
                    value.push(quote);
                    chars.next();
                    continue;
                }
            }
            // Closing quote: only valid if followed by (optional whitespace and)
            // the delimiter or end of line.
            let after = &body[i + ch.len_utf8()..];
            let tail = if self.strip { after.trim_start() } else { after };
            if tail.is_empty() {
                return Some((self.finish(&value), None));
            }
            if let Some(r) = tail.strip_prefix(delim) {
                return Some((self.finish(&value), Some(r)));
            }
            return None;
        }
        None
    }

    fn finish(&self, field: &str) -> String {
        if self.strip {
            field.trim().to_string()
        } else {
            field.to_string()
        }
    }
}

/// One-shot helper around [`Tokenizer`].
pub fn parse(line: &str, delimiter: &str, strip: bool, quote: Option<char>) -> DsvResult<Vec<String>> {
    Ok(Tokenizer::new(delimiter)?
        .strip(strip)
        .quote(quote)
        .tokenize(line))
}
