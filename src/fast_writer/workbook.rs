//! In-memory workbook and its serialization to package parts

use std::io::Write;

use super::shared_strings::SharedStrings;
use super::xml_writer::XmlWriter;
use crate::error::Result;
use crate::package::{self, Package};
use crate::sheet_xml;
use crate::styles::CellStyle;
use crate::types::{Cell, CellDataType, Row, Sheet};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CORE_PROPS: &str = "docProps/core.xml";
const APP_PROPS: &str = "docProps/app.xml";

const WORKBOOK_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const WORKSHEET_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const STYLES_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
const SHARED_STRINGS_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
const CORE_PROPS_TYPE: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const APP_PROPS_TYPE: &str = "application/vnd.openxmlformats-officedocument.extended-properties+xml";

/// Workbook document: sheets plus the workbook-wide string table
///
/// The whole grid is kept in memory; [`Workbook::to_package`] rebuilds every
/// part from it on each save.
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    shared_strings: SharedStrings,
    next_sheet_id: u32,
}

impl Workbook {
    pub fn new() -> Self {
        Workbook {
            sheets: Vec::new(),
            shared_strings: SharedStrings::new(),
            next_sheet_id: 1,
        }
    }

    /// Load sheets, column widths and shared strings of an existing package.
    ///
    /// Saving always writes the fixed stylesheet, so style ids of a package
    /// carrying any other stylesheet are dropped from the loaded cells.
    pub fn from_package(package: &Package) -> Result<Self> {
        let shared_strings = match package.part(package::SHARED_STRINGS) {
            Some(xml) => SharedStrings::parse(xml)?,
            None => SharedStrings::new(),
        };

        let mut sheets = Vec::new();
        for entry in sheet_xml::read_sheet_entries(package)? {
            let content = sheet_xml::load_sheet(package.require_part(&entry.part)?)?;
            let mut sheet = Sheet::new(entry.name, entry.sheet_id);
            sheet.columns = content.columns;
            sheet.rows = content.rows;
            sheets.push(sheet);
        }

        let stylesheet = CellStyle::stylesheet_xml()?;
        if package.part(package::STYLES) != Some(stylesheet.as_slice()) {
            let mut cleared = 0usize;
            let cells = sheets
                .iter_mut()
                .flat_map(|s| s.rows.iter_mut())
                .flat_map(|r| r.cells.iter_mut());
            for cell in cells {
                cleared += usize::from(cell.style.take().is_some());
            }
            if cleared > 0 {
                log::warn!(
                    "workbook has its own stylesheet; dropped the style of {} cells",
                    cleared
                );
            }
        }

        let next_sheet_id = sheets.iter().map(|s| s.sheet_id).max().unwrap_or(0) + 1;
        log::debug!(
            "loaded workbook with {} sheets and {} shared strings",
            sheets.len(),
            shared_strings.count()
        );

        Ok(Workbook {
            sheets,
            shared_strings,
            next_sheet_id,
        })
    }

    /// Add an empty sheet and return its position.
    ///
    /// A name already taken gets the new sheet id appended (`Data` → `Data3`).
    pub fn add_sheet(&mut self, name: &str) -> usize {
        let sheet_id = self.next_sheet_id;
        self.next_sheet_id += 1;

        let mut unique = name.to_string();
        let mut suffix = sheet_id;
        while self.sheet_index(&unique).is_some() {
            unique = format!("{}{}", name, suffix);
            suffix += 1;
        }

        log::debug!("adding sheet '{}' (id {})", unique, sheet_id);
        self.sheets.push(Sheet::new(unique, sheet_id));
        self.sheets.len() - 1
    }

    /// Position of the sheet with this exact name
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name == name)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(index)
    }

    pub fn shared_strings(&self) -> &SharedStrings {
        &self.shared_strings
    }

    /// Mutable access to one sheet together with the string table
    pub fn sheet_and_strings_mut(&mut self, index: usize) -> Option<(&mut Sheet, &mut SharedStrings)> {
        let sheet = self.sheets.get_mut(index)?;
        Some((sheet, &mut self.shared_strings))
    }

    /// Serialize every part of the workbook into a fresh package
    pub fn to_package(&self) -> Result<Package> {
        let mut package = Package::new();

        package.put_part(package::CONTENT_TYPES, self.content_types_xml()?);
        package.put_part(package::ROOT_RELS, ROOT_RELS_XML.as_bytes().to_vec());
        package.put_part(CORE_PROPS, CORE_PROPS_XML.as_bytes().to_vec());
        package.put_part(APP_PROPS, APP_PROPS_XML.as_bytes().to_vec());
        package.put_part(package::WORKBOOK, self.workbook_xml()?);
        package.put_part(package::WORKBOOK_RELS, self.workbook_rels_xml()?);

        package.put_part(package::STYLES, CellStyle::stylesheet_xml()?);

        let mut sst = XmlWriter::new(Vec::new());
        self.shared_strings.write_xml(&mut sst)?;
        package.put_part(package::SHARED_STRINGS, sst.finish()?);

        for sheet in &self.sheets {
            let mut xml = XmlWriter::new(Vec::new());
            write_worksheet(sheet, &mut xml)?;
            package.put_part(worksheet_part(sheet), xml.finish()?);
        }

        Ok(package)
    }

    /// Serialize the workbook into zip bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self
            .to_package()?
            .save(std::io::Cursor::new(Vec::new()))?
            .into_inner())
    }

    fn content_types_xml(&self) -> Result<Vec<u8>> {
        let mut xml = XmlWriter::new(Vec::new());
        xml.declaration()?;
        xml.start("Types")?;
        xml.attr("xmlns", "http://schemas.openxmlformats.org/package/2006/content-types")?;
        xml.raw(
            "<Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Default Extension=\"xml\" ContentType=\"application/xml\"/>",
        )?;

        let mut overrides = vec![(format!("/{}", package::WORKBOOK), WORKBOOK_TYPE)];
        overrides.extend(
            self.sheets
                .iter()
                .map(|sheet| (format!("/{}", worksheet_part(sheet)), WORKSHEET_TYPE)),
        );
        overrides.extend([
            (format!("/{}", package::STYLES), STYLES_TYPE),
            (format!("/{}", package::SHARED_STRINGS), SHARED_STRINGS_TYPE),
            (format!("/{}", CORE_PROPS), CORE_PROPS_TYPE),
            (format!("/{}", APP_PROPS), APP_PROPS_TYPE),
        ]);

        for (part, content_type) in &overrides {
            xml.start("Override")?;
            xml.attr("PartName", part)?;
            xml.attr("ContentType", content_type)?;
            xml.end()?;
        }
        xml.finish()
    }

    fn workbook_xml(&self) -> Result<Vec<u8>> {
        let mut xml = XmlWriter::new(Vec::new());
        xml.declaration()?;
        xml.start("workbook")?;
        xml.attr("xmlns", MAIN_NS)?;
        xml.attr("xmlns:r", REL_NS)?;

        xml.start("sheets")?;
        for (i, sheet) in self.sheets.iter().enumerate() {
            xml.start("sheet")?;
            xml.attr("name", &sheet.name)?;
            xml.attr_uint("sheetId", sheet.sheet_id as u64)?;
            xml.attr("r:id", &format!("rId{}", i + 1))?;
            xml.end()?;
        }
        xml.finish()
    }

    fn workbook_rels_xml(&self) -> Result<Vec<u8>> {
        let mut xml = XmlWriter::new(Vec::new());
        xml.declaration()?;
        xml.start("Relationships")?;
        xml.attr("xmlns", "http://schemas.openxmlformats.org/package/2006/relationships")?;

        for (i, sheet) in self.sheets.iter().enumerate() {
            write_relationship(
                &mut xml,
                i + 1,
                "worksheet",
                &format!("worksheets/sheet{}.xml", sheet.sheet_id),
            )?;
        }
        write_relationship(&mut xml, self.sheets.len() + 1, "styles", "styles.xml")?;
        write_relationship(
            &mut xml,
            self.sheets.len() + 2,
            "sharedStrings",
            "sharedStrings.xml",
        )?;
        xml.finish()
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

fn worksheet_part(sheet: &Sheet) -> String {
    format!("xl/worksheets/sheet{}.xml", sheet.sheet_id)
}

fn write_relationship<W: Write>(
    xml: &mut XmlWriter<W>,
    id: usize,
    kind: &str,
    target: &str,
) -> Result<()> {
    xml.start("Relationship")?;
    xml.attr("Id", &format!("rId{}", id))?;
    xml.attr("Type", &format!("{}/{}", REL_NS, kind))?;
    xml.attr("Target", target)?;
    xml.end()
}

/// Write one worksheet part: `<cols>` first, then `<sheetData>`
pub fn write_worksheet<W: Write>(sheet: &Sheet, xml: &mut XmlWriter<W>) -> Result<()> {
    xml.declaration()?;
    xml.start("worksheet")?;
    xml.attr("xmlns", MAIN_NS)?;
    xml.attr("xmlns:r", REL_NS)?;

    if !sheet.columns.is_empty() {
        xml.start("cols")?;
        for column in &sheet.columns {
            xml.start("col")?;
            xml.attr_uint("min", column.min as u64)?;
            xml.attr_uint("max", column.max as u64)?;
            xml.attr_f64("width", column.width)?;
            xml.attr("customWidth", "1")?;
            xml.end()?;
        }
        xml.end()?;
    }

    xml.start("sheetData")?;
    for row in &sheet.rows {
        write_row(row, xml)?;
    }
    xml.end()?;

    xml.end()
}

fn write_row<W: Write>(row: &Row, xml: &mut XmlWriter<W>) -> Result<()> {
    xml.start("row")?;
    xml.attr_uint("r", row.index as u64)?;
    for cell in &row.cells {
        write_cell(cell, xml)?;
    }
    xml.end()
}

fn write_cell<W: Write>(cell: &Cell, xml: &mut XmlWriter<W>) -> Result<()> {
    xml.start("c")?;
    if let Some(reference) = &cell.reference {
        xml.attr("r", reference)?;
    }
    if let Some(style) = cell.style {
        xml.attr_uint("s", style as u64)?;
    }
    if let Some(t) = cell.data_type.as_attr() {
        xml.attr("t", t)?;
    }

    if let Some(value) = &cell.value {
        if cell.data_type == CellDataType::InlineString {
            xml.start("is")?;
            xml.text_element("t", value)?;
            xml.end()?;
        } else {
            xml.text_element("v", value)?;
        }
    }
    xml.end()
}

const ROOT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/>
<Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/>
</Relationships>"#;

const CORE_PROPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
<dc:creator>excelbind</dc:creator>
<cp:lastModifiedBy>excelbind</cp:lastModifiedBy>
</cp:coreProperties>"#;

const APP_PROPS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties">
<Application>excelbind</Application>
<DocSecurity>0</DocSecurity>
<ScaleCrop>false</ScaleCrop>
<LinksUpToDate>false</LinksUpToDate>
<SharedDoc>false</SharedDoc>
<HyperlinksChanged>false</HyperlinksChanged>
</Properties>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnWidth;
    use std::io::Cursor;

    fn sample() -> Workbook {
        let mut workbook = Workbook::new();
        let index = workbook.add_sheet("People");
        let (sheet, strings) = workbook.sheet_and_strings_mut(index).unwrap();
        let name = strings.intern("Name");
        sheet.columns.push(ColumnWidth { min: 1, max: 1, width: 12.0 });
        sheet.rows.push(Row::new(
            1,
            vec![Cell::new("A1", name.to_string(), CellDataType::SharedString)
                .with_style(Some(CellStyle::HeaderBoldCentered))],
        ));
        sheet.rows.push(Row::new(2, vec![Cell::new("A2", "42", CellDataType::Plain)]));
        workbook
    }

    #[test]
    fn test_unique_sheet_names() {
        let mut workbook = Workbook::new();
        workbook.add_sheet("Data");
        workbook.add_sheet("Other");
        let third = workbook.add_sheet("Data");
        assert_eq!(workbook.sheets()[third].name, "Data3");
        assert_eq!(workbook.sheets()[third].sheet_id, 3);
    }

    #[test]
    fn test_worksheet_xml_layout() {
        let workbook = sample();
        let mut writer = XmlWriter::new(Vec::new());
        write_worksheet(&workbook.sheets()[0], &mut writer).unwrap();
        let xml = String::from_utf8(writer.finish().unwrap()).unwrap();

        let cols = xml.find("<cols>").unwrap();
        let data = xml.find("<sheetData>").unwrap();
        assert!(cols < data);
        assert!(xml.contains("<c r=\"A1\" s=\"1\" t=\"s\"><v>0</v></c>"));
        assert!(xml.contains("<row r=\"2\"><c r=\"A2\"><v>42</v></c></row>"));
    }

    #[test]
    fn test_package_round_trip() {
        let workbook = sample();
        let bytes = workbook
            .to_package()
            .unwrap()
            .save(Cursor::new(Vec::new()))
            .unwrap()
            .into_inner();

        let package = Package::open(Cursor::new(bytes)).unwrap();
        let loaded = Workbook::from_package(&package).unwrap();

        assert_eq!(loaded.sheets().len(), 1);
        let sheet = &loaded.sheets()[0];
        assert_eq!(sheet.name, "People");
        assert_eq!(sheet.columns, workbook.sheets()[0].columns);
        assert_eq!(sheet.rows, workbook.sheets()[0].rows);
        assert_eq!(loaded.shared_strings().get(0), Some("Name"));
        assert_eq!(loaded.next_sheet_id, 2);
    }

    #[test]
    fn test_foreign_stylesheet_drops_style_ids() {
        let mut package = sample().to_package().unwrap();
        package.put_part(
            package::STYLES,
            format!("<styleSheet xmlns=\"{}\"><cellXfs count=\"41\"/></styleSheet>", MAIN_NS)
                .into_bytes(),
        );
        let mut cell = Cell::new("A1", "7", CellDataType::Plain);
        cell.style = Some(40);
        let mut sheet = Sheet::new("People", 1);
        sheet.rows.push(Row::new(1, vec![cell]));
        let mut xml = XmlWriter::new(Vec::new());
        write_worksheet(&sheet, &mut xml).unwrap();
        package.put_part("xl/worksheets/sheet1.xml", xml.finish().unwrap());

        let loaded = Workbook::from_package(&package).unwrap();
        let cell = &loaded.sheets()[0].rows[0].cells[0];
        assert_eq!(cell.value.as_deref(), Some("7"));
        assert_eq!(cell.style, None);

        // the rewritten package only references styles it defines
        let saved = loaded.to_package().unwrap();
        let part = saved.part("xl/worksheets/sheet1.xml").unwrap();
        assert!(!String::from_utf8_lossy(part).contains(" s=\""));
    }
}
