//! Shared strings table for string deduplication

use super::xml_writer::XmlWriter;
use crate::error::Result;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::io::Write;

/// Workbook-wide table of unique strings referenced by index from cells
///
/// Indices are stable for the life of the table: nothing is ever removed.
/// The table is single-writer; callers own it through `&mut`.
#[derive(Debug, Clone, Default)]
pub struct SharedStrings {
    strings: Vec<String>,
    string_map: HashMap<String, u32>,
}

impl SharedStrings {
    pub fn new() -> Self {
        SharedStrings {
            strings: Vec::with_capacity(1000),
            string_map: HashMap::with_capacity(1000),
        }
    }

    /// Intern a string and get its index
    pub fn intern(&mut self, s: &str) -> u32 {
        if let Some(&index) = self.string_map.get(s) {
            return index;
        }

        let index = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.string_map.insert(s.to_string(), index);
        index
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.strings.get(index).map(String::as_str)
    }

    /// Get number of unique strings
    pub fn count(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Build a table from an existing `xl/sharedStrings.xml` part.
    ///
    /// Entries are kept positionally, so duplicated entries written by other
    /// producers still resolve to their own index; lookups map to the first one.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut table = SharedStrings::new();
        let mut reader = Reader::from_reader(xml);

        let mut current = String::new();
        let mut in_si = false;
        let mut in_t = false;
        let mut in_phonetic = false;

        loop {
            match reader.read_event()? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"si" => {
                        in_si = true;
                        current.clear();
                    }
                    b"rPh" => in_phonetic = true,
                    b"t" if in_si && !in_phonetic => in_t = true,
                    _ => {}
                },
                Event::Empty(e) if e.local_name().as_ref() == b"si" => {
                    table.push_parsed(String::new());
                }
                Event::End(e) => match e.local_name().as_ref() {
                    b"si" => {
                        in_si = false;
                        table.push_parsed(decode_excel_escapes(&current));
                        current.clear();
                    }
                    b"rPh" => in_phonetic = false,
                    b"t" => in_t = false,
                    _ => {}
                },
                Event::Text(e) if in_t => current.push_str(&e.unescape()?),
                Event::CData(e) if in_t => {
                    current.push_str(&String::from_utf8_lossy(&e.into_inner()))
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(table)
    }

    fn push_parsed(&mut self, s: String) {
        let index = self.strings.len() as u32;
        self.string_map.entry(s.clone()).or_insert(index);
        self.strings.push(s);
    }

    /// Write shared strings XML
    pub fn write_xml<W: Write>(&self, writer: &mut XmlWriter<W>) -> Result<()> {
        let count = self.strings.len() as u64;
        writer.declaration()?;
        writer.start("sst")?;
        writer.attr("xmlns", "http://schemas.openxmlformats.org/spreadsheetml/2006/main")?;
        writer.attr_uint("count", count)?;
        writer.attr_uint("uniqueCount", count)?;

        for s in &self.strings {
            writer.start("si")?;
            writer.text_element("t", s)?;
            writer.end()?;
        }

        writer.end()
    }
}

/// Decode `_xHHHH_` escapes used for control characters in shared strings
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") {
        return s.to_string();
    }

    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find("_x") {
        result.push_str(&rest[..pos]);
        let candidate = &rest[pos..];
        let decoded = candidate
            .get(2..6)
            .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(ch) => {
                result.push(ch);
                rest = &candidate[7..];
            }
            None => {
                result.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }
    result.push_str(rest);
    result
}
