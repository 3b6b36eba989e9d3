//! HTTP header collection shared by requests and responses.
//!
//! Entries are kept in an ordered map keyed by the lowercased, trimmed
//! header name, so lookups are case-insensitive and iteration follows
//! insertion order. Each entry also keeps the name as it was inserted:
//! parsed request headers are stored lowercase, while headers set by the
//! response side keep their canonical casing on the wire.
//!
//! [`Headers::parse_line`] is the incremental, line-oriented parse step used
//! by the [`parser`](crate::http::parser) while it is in the header phase.

use indexmap::IndexMap;

use crate::http::CRLF;
use crate::http::parser::ParseError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: IndexMap<String, (String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Parses at most one header line from the start of `data`.
    ///
    /// Returns the number of bytes consumed and whether the blank line
    /// terminating the header section was reached. `(0, false)` means no
    /// full line is available yet. On error nothing is consumed and the
    /// collection is left untouched.
    pub fn parse_line(&mut self, data: &[u8]) -> Result<(usize, bool), ParseError> {
        let Some(end) = find_crlf(data) else {
            return Ok((0, false));
        };

        let line = &data[..end];
        if line.is_empty() {
            return Ok((CRLF.len(), true));
        }

        let colon = line
            .iter()
            .position(|&b| b == b':')
            .ok_or(ParseError::MalformedHeader("missing colon"))?;

        let (raw_name, raw_value) = (&line[..colon], &line[colon + 1..]);
        match raw_name.last() {
            None => return Err(ParseError::MalformedHeader("empty header name")),
            Some(b' ') | Some(b'\t') => {
                return Err(ParseError::MalformedHeader("space before colon"));
            }
            Some(_) => {}
        }

        // Non-ASCII name bytes decode to U+FFFD and fail the token check;
        // values may carry obs-text, which is kept lossily.
        let name = String::from_utf8_lossy(raw_name).trim().to_ascii_lowercase();
        if !name.bytes().all(is_token_char) {
            return Err(ParseError::MalformedHeader("invalid character in key"));
        }
        let value = String::from_utf8_lossy(raw_value);

        self.append(&name, value.trim());

        Ok((end + CRLF.len(), false))
    }

    /// Adds a value, merging with an existing entry as `"<old>, <new>"`.
    pub fn append(&mut self, name: &str, value: &str) {
        let key = normalize(name);
        match self.entries.get_mut(&key) {
            Some((_, existing)) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => {
                self.entries
                    .insert(key, (name.trim().to_string(), value.to_string()));
            }
        }
    }

    /// Sets a header, replacing any previous value for the same name.
    pub fn set(&mut self, name: &str, value: &str) {
        self.entries
            .insert(normalize(name), (name.trim().to_string(), value.to_string()));
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries
            .shift_remove(&normalize(name))
            .map(|(_, value)| value)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&normalize(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// Index of the first `\r\n` in `data`, if any.
pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(CRLF.len()).position(|w| w == CRLF)
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'$'
                | b'%'
                | b'&'
                | b'\''
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'^'
                | b'_'
                | b'`'
                | b'|'
                | b'~'
        )
}
