//! XML codec: a root element whose children are the rows

use std::path::Path;

use indexmap::IndexMap;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use tracing::debug;

use crate::coerce::coerce_markup;
use crate::config::{Config, XmlOptions};
use crate::error::{Error, Result};
use crate::model::{CellValue, Row, Table};

use super::{read_text, write_text, Decoder, Encoder};

type WriteResult<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Codec for `<root><row>...</row>...</root>` documents
#[derive(Debug, Clone)]
pub struct XmlCodec {
    options: XmlOptions,
}

impl XmlCodec {
    pub fn new(config: &Config) -> Self {
        Self {
            options: config.xml.clone(),
        }
    }
}

/// Parsed element; only what the row mapping needs
#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> std::result::Result<Self, String> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            attributes.push((key, value.into_owned()));
        }
        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }

    /// Attributes first, then one entry per child element
    fn to_record(&self) -> IndexMap<String, CellValue> {
        let mut record = IndexMap::new();
        for (key, value) in &self.attributes {
            record.insert(key.clone(), coerce_markup(value));
        }
        for child in &self.children {
            record.insert(child.name.clone(), child.to_cell());
        }
        record
    }

    fn to_cell(&self) -> CellValue {
        if !self.children.is_empty() {
            return CellValue::Map(self.to_record());
        }
        let text = self.text.trim();
        if text.is_empty() {
            CellValue::Null
        } else {
            coerce_markup(text)
        }
    }
}

impl Decoder for XmlCodec {
    fn decode(&self, source: &Path) -> Result<Table> {
        let text = read_text(source, "xml")?;
        let root = parse_document(&text)?;

        let records: Vec<Row> = match root {
            Some(root) => root.children.iter().map(Element::to_record).collect(),
            None => Vec::new(),
        };

        let table = Table::from_records(records)?;
        debug!(path = %source.display(), rows = table.row_count(), "decoded xml");
        Ok(table)
    }
}

fn parse_document(text: &str) -> Result<Option<Element>> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let fail = |reader: &Reader<&[u8]>, message: String| {
        let offset = (reader.buffer_position() as usize).min(text.len());
        let line = text.as_bytes()[..offset].iter().filter(|&&b| b == b'\n').count() + 1;
        Error::decode_at("xml", line, message)
    };

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(fail(&reader, e.to_string())),
        };

        match event {
            Event::Start(start) => {
                let element = Element::from_start(&start).map_err(|m| fail(&reader, m))?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = Element::from_start(&start).map_err(|m| fail(&reader, m))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Event::End(_) => {
                if let Some(element) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(element),
                        None => root = Some(element),
                    }
                }
            }
            Event::Text(t) => {
                if let Some(current) = stack.last_mut() {
                    let unescaped = t.unescape().map_err(|e| fail(&reader, e.to_string()))?;
                    current.text.push_str(&unescaped);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(fail(&reader, "unexpected end of document".to_string()));
    }
    Ok(root)
}

impl Encoder for XmlCodec {
    fn encode(&self, table: &Table, destination: &Path) -> Result<()> {
        let bytes = self
            .render(table)
            .map_err(|e| Error::encode("xml", destination, e))?;
        let mut text = String::from_utf8_lossy(&bytes).into_owned();
        text.push('\n');

        write_text(destination, "xml", &text)?;
        debug!(path = %destination.display(), rows = table.row_count(), "encoded xml");
        Ok(())
    }
}

impl XmlCodec {
    fn render(&self, table: &Table) -> WriteResult<Vec<u8>> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

        let root_tag = sanitize_tag(&self.options.root_tag);
        let row_tag = sanitize_tag(&self.options.row_tag);

        if table.rows().is_empty() {
            writer.write_event(Event::Empty(BytesStart::new(root_tag.as_str())))?;
            return Ok(writer.into_inner());
        }

        writer.write_event(Event::Start(BytesStart::new(root_tag.as_str())))?;
        for row in table.rows() {
            writer.write_event(Event::Start(BytesStart::new(row_tag.as_str())))?;
            for (name, cell) in table.columns().iter().zip(table.row_cells(row)) {
                write_cell(&mut writer, &sanitize_tag(name), cell)?;
            }
            writer.write_event(Event::End(BytesEnd::new(row_tag.as_str())))?;
        }
        writer.write_event(Event::End(BytesEnd::new(root_tag.as_str())))?;

        Ok(writer.into_inner())
    }
}

fn write_cell(writer: &mut Writer<Vec<u8>>, tag: &str, cell: &CellValue) -> WriteResult<()> {
    match cell {
        CellValue::Null => writer.write_event(Event::Empty(BytesStart::new(tag)))?,
        CellValue::Map(map) => {
            writer.write_event(Event::Start(BytesStart::new(tag)))?;
            for (key, value) in map {
                write_cell(writer, &sanitize_tag(key), value)?;
            }
            writer.write_event(Event::End(BytesEnd::new(tag)))?;
        }
        other => {
            let text = other.display();
            writer.write_event(Event::Start(BytesStart::new(tag)))?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new(tag)))?;
        }
    }
    Ok(())
}

/// Make a string usable as an element name
fn sanitize_tag(name: &str) -> String {
    let mut tag: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let starts_ok = tag
        .chars()
        .next()
        .map(|c| c.is_alphabetic() || c == '_')
        .unwrap_or(false);
    if !starts_ok {
        tag.insert(0, '_');
    }
    tag
}
