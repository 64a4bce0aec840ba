//! Streaming JSON parser and generator.
//!
//! [`JsonParser`] and [`JsonGenerator`] bind a borrowed byte stream to
//! `serde_json` without buffering the whole payload. Marshalers receive them
//! already opened; the provider owns the underlying stream and releases it
//! when the exchange completes.
//!
//! # Example
//!
//! ```
//! use hermes_core::json::{JsonGenerator, JsonParser, JsonToken};
//!
//! let mut out = Vec::new();
//! let mut generator = JsonGenerator::new(&mut out);
//! generator.write_value(&vec![1, 2, 3]).unwrap();
//! generator.finish().unwrap();
//!
//! let mut input = &b"  [1, 2, 3]"[..];
//! let mut parser = JsonParser::new(&mut input);
//! assert_eq!(parser.next_token().unwrap(), Some(JsonToken::StartArray));
//! let numbers: Vec<u32> = parser.read_value().unwrap();
//! assert_eq!(numbers, vec![1, 2, 3]);
//! ```

use crate::error::{MarshalError, MarshalResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};

/// Kind of token a JSON value starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonToken {
    /// `{`
    StartObject,
    /// `[`
    StartArray,
    /// A string literal.
    String,
    /// A number literal.
    Number,
    /// `true`
    True,
    /// `false`
    False,
    /// `null`
    Null,
}

impl JsonToken {
    fn from_lead_byte(byte: u8) -> Option<Self> {
        match byte {
            b'{' => Some(Self::StartObject),
            b'[' => Some(Self::StartArray),
            b'"' => Some(Self::String),
            b'-' | b'0'..=b'9' => Some(Self::Number),
            b't' => Some(Self::True),
            b'f' => Some(Self::False),
            b'n' => Some(Self::Null),
            _ => None,
        }
    }

    /// Returns `true` for tokens that open a structure.
    #[must_use]
    pub fn is_structure_start(self) -> bool {
        matches!(self, Self::StartObject | Self::StartArray)
    }
}

impl fmt::Display for JsonToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StartObject => "START_OBJECT",
            Self::StartArray => "START_ARRAY",
            Self::String => "VALUE_STRING",
            Self::Number => "VALUE_NUMBER",
            Self::True => "VALUE_TRUE",
            Self::False => "VALUE_FALSE",
            Self::Null => "VALUE_NULL",
        };
        f.write_str(name)
    }
}

const fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}

/// Pull parser over a borrowed input stream.
///
/// [`next_token`](Self::next_token) skips insignificant whitespace and peeks
/// at the token that starts the next value without consuming it, so the value
/// can then be read in full with [`read_value`](Self::read_value).
pub struct JsonParser<'a> {
    reader: BufReader<&'a mut (dyn Read + 'a)>,
    current: Option<JsonToken>,
    exhausted: bool,
    values_read: usize,
    bom_checked: bool,
    bom_len: usize,
}

/// UTF-8 byte order mark, skipped once at the start of the input.
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

impl<'a> JsonParser<'a> {
    /// Opens a parser over `reader`.
    pub fn new<R: Read + 'a>(reader: &'a mut R) -> Self {
        let reader: &'a mut (dyn Read + 'a) = reader;
        Self {
            reader: BufReader::new(reader),
            current: None,
            exhausted: false,
            values_read: 0,
            bom_checked: false,
            bom_len: 0,
        }
    }

    /// Advances to the first token of the next value.
    ///
    /// A single leading UTF-8 byte order mark is skipped. Returns `None` when
    /// the input is exhausted. Calling this again before reading the value
    /// returns the same token.
    pub fn next_token(&mut self) -> MarshalResult<Option<JsonToken>> {
        if let Some(token) = self.current {
            return Ok(Some(token));
        }

        loop {
            let buf = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if buf.is_empty() {
                self.exhausted = true;
                return Ok(None);
            }

            if !self.bom_checked {
                let matched = buf
                    .iter()
                    .zip(&UTF8_BOM[self.bom_len..])
                    .take_while(|(a, b)| a == b)
                    .count();
                let whole_buffer = matched == buf.len();
                self.reader.consume(matched);
                self.bom_len += matched;

                if self.bom_len == UTF8_BOM.len() || self.bom_len == 0 {
                    self.bom_checked = true;
                } else if !whole_buffer {
                    // A truncated mark is not a value.
                    return Err(MarshalError::UnexpectedByte { byte: UTF8_BOM[0] });
                }
                continue;
            }

            match buf.iter().position(|b| !is_whitespace(*b)) {
                Some(skip) => {
                    let lead = buf[skip];
                    self.reader.consume(skip);
                    let token = JsonToken::from_lead_byte(lead)
                        .ok_or(MarshalError::UnexpectedByte { byte: lead })?;
                    self.current = Some(token);
                    return Ok(Some(token));
                }
                None => {
                    let len = buf.len();
                    self.reader.consume(len);
                }
            }
        }
    }

    /// Returns the token the parser is positioned at, if any.
    #[must_use]
    pub fn current_token(&self) -> Option<JsonToken> {
        self.current
    }

    /// Reads the value the parser is positioned at.
    ///
    /// Trailing content after the value is left unread.
    pub fn read_value<T: DeserializeOwned>(&mut self) -> MarshalResult<T> {
        if self.current.take().is_none() {
            return Err(if self.exhausted {
                MarshalError::UnexpectedEof
            } else {
                MarshalError::NotPositioned
            });
        }

        let mut de = serde_json::Deserializer::from_reader(&mut self.reader);
        let value = T::deserialize(&mut de)?;
        self.values_read += 1;
        Ok(value)
    }

    /// Reads the value the parser is positioned at as an untyped tree.
    pub fn read_tree(&mut self) -> MarshalResult<serde_json::Value> {
        self.read_value()
    }

    /// Number of values read so far.
    #[must_use]
    pub fn values_read(&self) -> usize {
        self.values_read
    }
}

impl fmt::Debug for JsonParser<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonParser")
            .field("current", &self.current)
            .field("exhausted", &self.exhausted)
            .field("values_read", &self.values_read)
            .finish_non_exhaustive()
    }
}

/// Compact JSON generator over a borrowed output stream.
///
/// Output is buffered. [`finish`](Self::finish) flushes and reports errors;
/// dropping the generator without finishing still flushes, but ignores
/// errors. That includes drops during unwinding.
pub struct JsonGenerator<'a> {
    writer: BufWriter<&'a mut (dyn Write + 'a)>,
    values_written: usize,
}

impl<'a> JsonGenerator<'a> {
    /// Opens a generator over `writer`.
    pub fn new<W: Write + 'a>(writer: &'a mut W) -> Self {
        let writer: &'a mut (dyn Write + 'a) = writer;
        Self {
            writer: BufWriter::new(writer),
            values_written: 0,
        }
    }

    /// Writes one value.
    pub fn write_value<T: Serialize + ?Sized>(&mut self, value: &T) -> MarshalResult<()> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.values_written += 1;
        Ok(())
    }

    /// Writes an untyped tree.
    pub fn write_tree(&mut self, value: &serde_json::Value) -> MarshalResult<()> {
        self.write_value(value)
    }

    /// Flushes buffered output to the underlying stream.
    pub fn flush(&mut self) -> MarshalResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Flushes and closes the generator.
    pub fn finish(mut self) -> MarshalResult<()> {
        self.flush()
    }

    /// Number of values written so far.
    #[must_use]
    pub fn values_written(&self) -> usize {
        self.values_written
    }
}

impl fmt::Debug for JsonGenerator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonGenerator")
            .field("values_written", &self.values_written)
            .finish_non_exhaustive()
    }
}

/// Helper for marshalers that want to name the token they expected.
pub fn expect_token(parser: &JsonParser<'_>, expected: JsonToken) -> MarshalResult<()> {
    match parser.current_token() {
        Some(token) if token == expected => Ok(()),
        Some(token) => Err(MarshalError::custom(format!(
            "expected {expected}, found {token}"
        ))),
        None => Err(MarshalError::NotPositioned),
    }
}
