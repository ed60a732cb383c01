//! Element-stack XML writer used to serialize package parts
//!
//! Start tags stay open for attributes until content or a child follows; an
//! element ended with no content is written self-closing. Output is batched in
//! a buffer and handed to the sink in chunks.

use crate::error::{ExcelError, Result};
use std::io::Write;

pub const DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

const FLUSH_THRESHOLD: usize = 8192;
const HEX: &[u8; 16] = b"0123456789ABCDEF";

pub struct XmlWriter<W: Write> {
    writer: W,
    buffer: Vec<u8>,
    numbers: itoa::Buffer,
    /// Open elements, innermost last
    open: Vec<&'static str>,
    /// The innermost start tag has not been closed with `>` yet
    in_start_tag: bool,
}

impl<W: Write> XmlWriter<W> {
    pub fn new(writer: W) -> Self {
        XmlWriter {
            writer,
            buffer: Vec::with_capacity(FLUSH_THRESHOLD * 2),
            numbers: itoa::Buffer::new(),
            open: Vec::new(),
            in_start_tag: false,
        }
    }

    pub fn declaration(&mut self) -> Result<()> {
        self.raw(DECLARATION)
    }

    /// Open an element; attributes may follow until content or a child is written
    pub fn start(&mut self, name: &'static str) -> Result<()> {
        self.close_start_tag();
        self.buffer.push(b'<');
        self.buffer.extend_from_slice(name.as_bytes());
        self.open.push(name);
        self.in_start_tag = true;
        Ok(())
    }

    /// Close the innermost open element
    pub fn end(&mut self) -> Result<()> {
        let name = self
            .open
            .pop()
            .ok_or_else(|| ExcelError::WriteError("XML end tag without a start tag".to_string()))?;

        if self.in_start_tag {
            self.buffer.extend_from_slice(b"/>");
            self.in_start_tag = false;
        } else {
            self.buffer.extend_from_slice(b"</");
            self.buffer.extend_from_slice(name.as_bytes());
            self.buffer.push(b'>');
        }
        self.maybe_flush()
    }

    /// Write an escaped attribute.
    ///
    /// Attribute values have no `_xHHHH_` convention, so control characters
    /// other than tab, newline and carriage return are refused.
    pub fn attr(&mut self, name: &str, value: &str) -> Result<()> {
        if let Some(ch) = value
            .chars()
            .find(|c| matches!(*c, '\0'..='\u{8}' | '\u{b}' | '\u{c}' | '\u{e}'..='\u{1f}'))
        {
            return Err(ExcelError::WriteError(format!(
                "attribute '{}' contains control character U+{:04X}",
                name, ch as u32
            )));
        }
        self.attr_name(name)?;
        for byte in value.bytes() {
            match byte {
                b'&' => self.buffer.extend_from_slice(b"&amp;"),
                b'<' => self.buffer.extend_from_slice(b"&lt;"),
                b'"' => self.buffer.extend_from_slice(b"&quot;"),
                b'\n' => self.buffer.extend_from_slice(b"&#10;"),
                b'\r' => self.buffer.extend_from_slice(b"&#13;"),
                b'\t' => self.buffer.extend_from_slice(b"&#9;"),
                _ => self.buffer.push(byte),
            }
        }
        self.buffer.push(b'"');
        Ok(())
    }

    pub fn attr_uint(&mut self, name: &str, value: u64) -> Result<()> {
        self.attr_name(name)?;
        let digits = self.numbers.format(value);
        self.buffer.extend_from_slice(digits.as_bytes());
        self.buffer.push(b'"');
        Ok(())
    }

    pub fn attr_f64(&mut self, name: &str, value: f64) -> Result<()> {
        self.attr_name(name)?;
        self.buffer.extend_from_slice(value.to_string().as_bytes());
        self.buffer.push(b'"');
        Ok(())
    }

    /// Write escaped character content.
    ///
    /// Control characters XML cannot carry are written as `_xHHHH_`, and an
    /// underscore that would read back as such an escape is itself escaped.
    pub fn text(&mut self, text: &str) -> Result<()> {
        self.close_start_tag();
        let bytes = text.as_bytes();
        for (i, &byte) in bytes.iter().enumerate() {
            match byte {
                b'&' => self.buffer.extend_from_slice(b"&amp;"),
                b'<' => self.buffer.extend_from_slice(b"&lt;"),
                b'>' => self.buffer.extend_from_slice(b"&gt;"),
                b'\t' | b'\n' | b'\r' => self.buffer.push(byte),
                0x00..=0x1F => {
                    self.buffer.extend_from_slice(b"_x00");
                    self.buffer.push(HEX[(byte >> 4) as usize]);
                    self.buffer.push(HEX[(byte & 0x0F) as usize]);
                    self.buffer.push(b'_');
                }
                b'_' if looks_like_escape(&bytes[i..]) => {
                    self.buffer.extend_from_slice(b"_x005F_")
                }
                _ => self.buffer.push(byte),
            }
        }
        self.maybe_flush()
    }

    /// Write `<name>text</name>`, marking edge whitespace as significant
    pub fn text_element(&mut self, name: &'static str, text: &str) -> Result<()> {
        self.start(name)?;
        if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
            self.attr("xml:space", "preserve")?;
        }
        self.text(text)?;
        self.end()
    }

    /// Write a fixed markup fragment as is
    pub fn raw(&mut self, markup: &str) -> Result<()> {
        self.close_start_tag();
        self.buffer.extend_from_slice(markup.as_bytes());
        self.maybe_flush()
    }

    /// Close every open element, flush and hand back the sink
    pub fn finish(mut self) -> Result<W> {
        while !self.open.is_empty() {
            self.end()?;
        }
        self.flush_buffer()?;
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn attr_name(&mut self, name: &str) -> Result<()> {
        if !self.in_start_tag {
            return Err(ExcelError::WriteError(format!(
                "attribute '{}' written outside a start tag",
                name
            )));
        }
        self.buffer.push(b' ');
        self.buffer.extend_from_slice(name.as_bytes());
        self.buffer.extend_from_slice(b"=\"");
        Ok(())
    }

    #[inline]
    fn close_start_tag(&mut self) {
        if self.in_start_tag {
            self.buffer.push(b'>');
            self.in_start_tag = false;
        }
    }

    #[inline]
    fn maybe_flush(&mut self) -> Result<()> {
        if self.buffer.len() > FLUSH_THRESHOLD {
            self.flush_buffer()?;
        }
        Ok(())
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer)?;
            self.buffer.clear();
        }
        Ok(())
    }
}

/// `_xHHHH_` at the start of `s`
fn looks_like_escape(s: &[u8]) -> bool {
    s.len() >= 7 && s[1] == b'x' && s[2..6].iter().all(u8::is_ascii_hexdigit) && s[6] == b'_'
}
