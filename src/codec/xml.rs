//! XML definitions.
//!
//! ```xml
//! <report>
//!   <config orientation="portrait" pageSize="A4" fontFamily="Helvetica" fontSize="10">
//!     <margins top="12" right="10" bottom="12" left="10"/>
//!     <metadata title="Sales"/>
//!   </config>
//!   <header>
//!     <row height="8"><cell value="labels.title" font-style="B"/></row>
//!   </header>
//!   <details>...</details>
//!   <footer/>
//!   <data>
//!     <text key="title">Sales</text>
//!     <map key="labels"><entry key="title" value="Sales"/></map>
//!     <list key="items"><row><entry key="sku" value="A-1"/></row></list>
//!   </data>
//! </report>
//! ```
//!
//! Elements are tags named after their type; properties are attributes.

use std::fmt::Display;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::Value;

use super::Definition;
use crate::data::{DataStore, DataValue, Record};
use crate::error::ReportError;
use crate::model::{
    ElementId, ElementKind, ElementTree, Margins, Metadata, Orientation, PageSize, Parent,
    ReportConfig, Section,
};
use crate::style::loose;

fn xml_error(e: impl Display) -> ReportError {
    ReportError::Xml(e.to_string())
}

// ── Writing ─────────────────────────────────────────────────────────

/// Serialize a definition as indented XML.
pub fn write(
    config: &ReportConfig,
    tree: &ElementTree,
    data: &DataStore,
) -> Result<String, ReportError> {
    let mut out = XmlOut {
        writer: Writer::new_with_indent(Vec::new(), b' ', 2),
    };
    out.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    out.emit(Event::Start(BytesStart::new("report")))?;

    write_config(&mut out, config)?;
    for section in Section::ALL {
        let ids = tree.section(section);
        if ids.is_empty() {
            out.emit(Event::Empty(BytesStart::new(section.name())))?;
            continue;
        }
        out.emit(Event::Start(BytesStart::new(section.name())))?;
        for &id in ids {
            write_element(&mut out, tree, id)?;
        }
        out.emit(Event::End(BytesEnd::new(section.name())))?;
    }
    write_data(&mut out, data)?;

    out.emit(Event::End(BytesEnd::new("report")))?;
    String::from_utf8(out.writer.into_inner()).map_err(xml_error)
}

struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn emit(&mut self, event: Event<'_>) -> Result<(), ReportError> {
        self.writer.write_event(event).map_err(xml_error)
    }

    /// `<name a="..."/>`, skipped when there are no attributes and `always`
    /// is false.
    fn empty(&mut self, name: &str, attrs: &[(&str, String)], always: bool) -> Result<(), ReportError> {
        if attrs.is_empty() && !always {
            return Ok(());
        }
        let mut start = BytesStart::new(name);
        for (key, value) in attrs {
            start.push_attribute((*key, value.as_str()));
        }
        self.emit(Event::Empty(start))
    }
}

fn write_config(out: &mut XmlOut, config: &ReportConfig) -> Result<(), ReportError> {
    let mut start = BytesStart::new("config");
    start.push_attribute(("orientation", config.orientation.as_str()));
    start.push_attribute(("pageSize", config.page_size.to_string().as_str()));
    start.push_attribute(("fontFamily", config.font_family.as_str()));
    start.push_attribute(("fontSize", config.font_size.to_string().as_str()));
    out.emit(Event::Start(start))?;

    let m = config.margins;
    out.empty(
        "margins",
        &[
            ("top", m.top.to_string()),
            ("right", m.right.to_string()),
            ("bottom", m.bottom.to_string()),
            ("left", m.left.to_string()),
        ],
        true,
    )?;

    let meta = &config.metadata;
    let attrs: Vec<(&str, String)> = [
        ("title", &meta.title),
        ("author", &meta.author),
        ("subject", &meta.subject),
        ("creator", &meta.creator),
        ("keywords", &meta.keywords),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
    .collect();
    out.empty("metadata", &attrs, false)?;

    out.emit(Event::End(BytesEnd::new("config")))
}

fn write_element(out: &mut XmlOut, tree: &ElementTree, id: ElementId) -> Result<(), ReportError> {
    let Some(element) = tree.get(id) else {
        return Ok(());
    };
    let name = element.kind().name();
    let mut start = BytesStart::new(name);
    for (key, value) in element.props.to_map() {
        start.push_attribute((key.as_str(), loose::to_string(&value).as_str()));
    }
    if element.children.is_empty() {
        return out.emit(Event::Empty(start));
    }
    out.emit(Event::Start(start))?;
    for &child in &element.children {
        write_element(out, tree, child)?;
    }
    out.emit(Event::End(BytesEnd::new(name)))
}

fn write_data(out: &mut XmlOut, data: &DataStore) -> Result<(), ReportError> {
    if data.is_empty() {
        return out.emit(Event::Empty(BytesStart::new("data")));
    }
    out.emit(Event::Start(BytesStart::new("data")))?;
    for (key, value) in data.iter() {
        match value {
            DataValue::Text(text) if text.is_empty() => {
                out.empty("text", &[("key", key.clone())], true)?;
            }
            DataValue::Text(text) => {
                out.emit(Event::Start(
                    BytesStart::new("text").with_attributes([("key", key.as_str())]),
                ))?;
                out.emit(Event::Text(BytesText::new(text)))?;
                out.emit(Event::End(BytesEnd::new("text")))?;
            }
            DataValue::Map(map) => write_record(out, "map", Some(key), map)?,
            DataValue::List(rows) => {
                let start = BytesStart::new("list").with_attributes([("key", key.as_str())]);
                if rows.is_empty() {
                    out.emit(Event::Empty(start))?;
                    continue;
                }
                out.emit(Event::Start(start))?;
                for row in rows {
                    write_record(out, "row", None, row)?;
                }
                out.emit(Event::End(BytesEnd::new("list")))?;
            }
        }
    }
    out.emit(Event::End(BytesEnd::new("data")))
}

fn write_record(
    out: &mut XmlOut,
    tag: &str,
    key: Option<&str>,
    record: &Record,
) -> Result<(), ReportError> {
    let mut start = BytesStart::new(tag);
    if let Some(key) = key {
        start.push_attribute(("key", key));
    }
    if record.is_empty() {
        return out.emit(Event::Empty(start));
    }
    out.emit(Event::Start(start))?;
    for (k, v) in record {
        out.empty("entry", &[("key", k.clone()), ("value", v.clone())], true)?;
    }
    out.emit(Event::End(BytesEnd::new(tag)))
}

// ── Reading ─────────────────────────────────────────────────────────

/// Parse an XML definition.
pub fn read(input: &str) -> Result<Definition, ReportError> {
    let mut parser = Parser {
        reader: Reader::from_str(input),
    };

    let root = loop {
        match parser.next()? {
            Event::Text(t) => parser.whitespace_only(&t, "document")?,
            event => break event,
        }
    };
    match root {
        Event::Start(e) if tag_name(&e) == "report" => {}
        Event::Empty(e) if tag_name(&e) == "report" => {
            return Err(ReportError::InvalidDefinition(
                "`report` has no sections".to_string(),
            ))
        }
        _ => {
            return Err(ReportError::InvalidDefinition(
                "the root element must be `report`".to_string(),
            ))
        }
    }

    let mut def = Definition::default();
    let mut seen = [false; 3];
    loop {
        let (start, empty) = match parser.next()? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(_) => break,
            Event::Eof => return Err(xml_error("unexpected end of document")),
            Event::Text(t) => {
                parser.whitespace_only(&t, "report")?;
                continue;
            }
            _ => continue,
        };
        let name = tag_name(&start);
        match name.as_str() {
            "config" => def.config = parser.config(&start, empty)?,
            "data" if !empty => parser.data(&mut def.data)?,
            "data" => {}
            other => {
                let section = Section::parse(other).ok_or_else(|| {
                    ReportError::InvalidDefinition(format!("unknown tag `{other}` in `report`"))
                })?;
                seen[section as usize] = true;
                if !empty {
                    parser.children(&mut def.tree, section.into(), other)?;
                }
            }
        }
    }

    if let Some(missing) = Section::ALL.into_iter().find(|s| !seen[*s as usize]) {
        return Err(ReportError::InvalidDefinition(format!(
            "missing section `{}`",
            missing.name()
        )));
    }
    Ok(def)
}

fn tag_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.name().as_ref()).into_owned()
}

struct Parser<'a> {
    reader: Reader<&'a [u8]>,
}

impl<'a> Parser<'a> {
    /// The next event that carries content.
    fn next(&mut self) -> Result<Event<'a>, ReportError> {
        loop {
            match self.reader.read_event().map_err(xml_error)? {
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
                event => return Ok(event),
            }
        }
    }

    fn attributes(&self, start: &BytesStart<'_>) -> Result<Vec<(String, String)>, ReportError> {
        start
            .attributes()
            .map(|attr| {
                let attr = attr.map_err(xml_error)?;
                let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                let value = attr
                    .decode_and_unescape_value(self.reader.decoder())
                    .map_err(xml_error)?
                    .into_owned();
                Ok((key, value))
            })
            .collect()
    }

    fn attribute(&self, start: &BytesStart<'_>, name: &str) -> Result<Option<String>, ReportError> {
        Ok(self
            .attributes(start)?
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value))
    }

    fn whitespace_only(&self, text: &BytesText<'_>, parent: &str) -> Result<(), ReportError> {
        let text = text.unescape().map_err(xml_error)?;
        if text.trim().is_empty() {
            Ok(())
        } else {
            Err(ReportError::InvalidDefinition(format!(
                "unexpected text `{}` in `{parent}`",
                text.trim()
            )))
        }
    }

    /// Child elements up to the closing tag of `parent_tag`.
    fn children(
        &mut self,
        tree: &mut ElementTree,
        parent: Parent,
        parent_tag: &str,
    ) -> Result<(), ReportError> {
        loop {
            match self.next()? {
                Event::Start(e) => self.element(tree, parent, &e, false)?,
                Event::Empty(e) => self.element(tree, parent, &e, true)?,
                Event::End(_) => return Ok(()),
                Event::Text(t) => self.whitespace_only(&t, parent_tag)?,
                Event::Eof => {
                    return Err(xml_error(format!("unexpected end of document in `{parent_tag}`")))
                }
                _ => {}
            }
        }
    }

    fn element(
        &mut self,
        tree: &mut ElementTree,
        parent: Parent,
        start: &BytesStart<'_>,
        empty: bool,
    ) -> Result<(), ReportError> {
        let name = tag_name(start);
        let kind = ElementKind::parse(&name).ok_or_else(|| {
            ReportError::InvalidDefinition(format!("unknown element type `{name}`"))
        })?;
        let properties = self
            .attributes(start)?
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        let id = tree.append(parent, kind, &properties)?;
        if !empty {
            self.children(tree, id.into(), &name)?;
        }
        Ok(())
    }

    fn config(&mut self, start: &BytesStart<'_>, empty: bool) -> Result<ReportConfig, ReportError> {
        let mut config = ReportConfig::default();
        for (key, value) in self.attributes(start)? {
            match key.as_str() {
                "orientation" => {
                    config.orientation = Orientation::parse(&value)
                        .ok_or_else(|| invalid_config("orientation", &value))?
                }
                "pageSize" => {
                    config.page_size =
                        PageSize::parse(&value).ok_or_else(|| invalid_config("pageSize", &value))?
                }
                "fontFamily" => config.font_family = value,
                "fontSize" => config.font_size = number(&key, &value)?,
                _ => log::debug!("ignoring config attribute `{key}`"),
            }
        }
        if empty {
            return Ok(config);
        }

        loop {
            let (child, child_empty) = match self.next()? {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(_) => return Ok(config),
                Event::Text(t) => {
                    self.whitespace_only(&t, "config")?;
                    continue;
                }
                Event::Eof => return Err(xml_error("unexpected end of document in `config`")),
                _ => continue,
            };
            match tag_name(&child).as_str() {
                "margins" => config.margins = self.margins(&child)?,
                "metadata" => config.metadata = self.metadata(&child)?,
                other => {
                    return Err(ReportError::InvalidDefinition(format!(
                        "unknown tag `{other}` in `config`"
                    )))
                }
            }
            if !child_empty {
                self.skip_to_end()?;
            }
        }
    }

    fn margins(&self, start: &BytesStart<'_>) -> Result<Margins, ReportError> {
        let mut margins = Margins::default();
        for (key, value) in self.attributes(start)? {
            let v = number(&key, &value)?;
            match key.as_str() {
                "top" => margins.top = v,
                "right" => margins.right = v,
                "bottom" => margins.bottom = v,
                "left" => margins.left = v,
                _ => log::debug!("ignoring margin `{key}`"),
            }
        }
        Ok(margins)
    }

    fn metadata(&self, start: &BytesStart<'_>) -> Result<Metadata, ReportError> {
        let mut meta = Metadata::default();
        for (key, value) in self.attributes(start)? {
            let slot = match key.as_str() {
                "title" => &mut meta.title,
                "author" => &mut meta.author,
                "subject" => &mut meta.subject,
                "creator" => &mut meta.creator,
                "keywords" => &mut meta.keywords,
                _ => {
                    log::debug!("ignoring metadata `{key}`");
                    continue;
                }
            };
            *slot = Some(value);
        }
        Ok(meta)
    }

    fn skip_to_end(&mut self) -> Result<(), ReportError> {
        let mut depth = 0usize;
        loop {
            match self.next()? {
                Event::Start(_) => depth += 1,
                Event::End(_) if depth == 0 => return Ok(()),
                Event::End(_) => depth -= 1,
                Event::Eof => return Err(xml_error("unexpected end of document")),
                _ => {}
            }
        }
    }

    fn data(&mut self, store: &mut DataStore) -> Result<(), ReportError> {
        loop {
            let (start, empty) = match self.next()? {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(_) => return Ok(()),
                Event::Text(t) => {
                    self.whitespace_only(&t, "data")?;
                    continue;
                }
                Event::Eof => return Err(xml_error("unexpected end of document in `data`")),
                _ => continue,
            };
            let tag = tag_name(&start);
            let key = self.attribute(&start, "key")?.ok_or_else(|| {
                ReportError::InvalidDefinition(format!("`{tag}` in `data` needs a `key`"))
            })?;
            match tag.as_str() {
                "text" => {
                    let text = if empty { String::new() } else { self.text_content()? };
                    store.set_text(&key, text)?;
                }
                "map" => {
                    let map = if empty { Record::new() } else { self.record("map")? };
                    store.set_map(&key, map)?;
                }
                "list" => {
                    let rows = if empty { Vec::new() } else { self.rows()? };
                    store.set_list(&key, rows)?;
                }
                other => {
                    return Err(ReportError::InvalidDefinition(format!(
                        "unknown tag `{other}` in `data`"
                    )))
                }
            }
        }
    }

    /// Text up to the closing tag, kept exactly as written.
    fn text_content(&mut self) -> Result<String, ReportError> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Event::Text(t) => text.push_str(&t.unescape().map_err(xml_error)?),
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
                Event::End(_) => return Ok(text),
                Event::Eof => return Err(xml_error("unexpected end of document in `text`")),
                _ => {
                    return Err(ReportError::InvalidDefinition(
                        "`text` values cannot contain markup".to_string(),
                    ))
                }
            }
        }
    }

    /// `<entry key value/>` children up to the closing tag.
    fn record(&mut self, tag: &str) -> Result<Record, ReportError> {
        let mut record = Record::new();
        loop {
            let (entry, empty) = match self.next()? {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(_) => return Ok(record),
                Event::Text(t) => {
                    self.whitespace_only(&t, tag)?;
                    continue;
                }
                Event::Eof => return Err(xml_error(format!("unexpected end of document in `{tag}`"))),
                _ => continue,
            };
            if tag_name(&entry) != "entry" {
                return Err(ReportError::InvalidDefinition(format!(
                    "expected `entry` in `{tag}`, found `{}`",
                    tag_name(&entry)
                )));
            }
            let key = self
                .attribute(&entry, "key")?
                .ok_or_else(|| ReportError::InvalidDefinition("`entry` needs a `key`".to_string()))?;
            let value = self.attribute(&entry, "value")?.unwrap_or_default();
            record.insert(key, value);
            if !empty {
                self.skip_to_end()?;
            }
        }
    }

    fn rows(&mut self) -> Result<Vec<Record>, ReportError> {
        let mut rows = Vec::new();
        loop {
            match self.next()? {
                Event::Start(e) if tag_name(&e) == "row" => rows.push(self.record("row")?),
                Event::Empty(e) if tag_name(&e) == "row" => rows.push(Record::new()),
                Event::End(_) => return Ok(rows),
                Event::Text(t) => self.whitespace_only(&t, "list")?,
                Event::Eof => return Err(xml_error("unexpected end of document in `list`")),
                Event::Start(e) | Event::Empty(e) => {
                    return Err(ReportError::InvalidDefinition(format!(
                        "expected `row` in `list`, found `{}`",
                        tag_name(&e)
                    )))
                }
                _ => {}
            }
        }
    }
}

fn number(key: &str, value: &str) -> Result<f64, ReportError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid_config(key, value))
}

fn invalid_config(key: &str, value: &str) -> ReportError {
    ReportError::InvalidDefinition(format!("config `{key}` has an invalid value `{value}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::props::Properties;
    use serde_json::json;

    fn sample() -> Definition {
        let mut def = Definition::default();
        def.config.metadata.title = Some("Q1 & Q2".to_string());
        def.config.page_size = PageSize::Custom {
            width: 100.0,
            height: 50.5,
        };
        let map = |v: Value| match v {
            Value::Object(m) => m,
            _ => serde_json::Map::new(),
        };
        let row = def
            .tree
            .append(Section::Header, ElementKind::Row, &map(json!({"height": 8})))
            .unwrap();
        def.tree
            .append(
                row,
                ElementKind::Cell,
                &map(json!({"value": "<b>\"quoted\"</b>", "width": "50%", "font-style": "BU",
                            "data-id": "x1"})),
            )
            .unwrap();
        def.tree
            .append(Section::Details, ElementKind::Vgap, &map(json!({"height": 3})))
            .unwrap();
        def.data.set_text("title", "  padded\nline  ").unwrap();
        def.data.set_text("empty", "").unwrap();
        def.data.set("labels", &json!({"a": "1", "b": ""})).unwrap();
        def.data.set("items", &json!([{"sku": "A"}, {}])).unwrap();
        def.data.set_list("none", Vec::new()).unwrap();
        def
    }

    #[test]
    fn test_round_trip() {
        let def = sample();
        let xml = write(&def.config, &def.tree, &def.data).unwrap();
        let again = read(&xml).unwrap();
        pretty_assertions::assert_eq!(again.config, def.config);
        assert_eq!(again.tree, def.tree);
        pretty_assertions::assert_eq!(again.data, def.data);
    }

    #[test]
    fn test_written_shape() {
        let def = sample();
        let xml = write(&def.config, &def.tree, &def.data).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<footer/>"));
        assert!(xml.contains("title=\"Q1 &amp; Q2\""));
        assert!(xml.contains("pageSize=\"100x50.5\""));
        assert!(xml.contains("<list key=\"none\"/>"));
    }

    #[test]
    fn test_read_handwritten() {
        let xml = r#"<?xml version="1.0"?>
            <report>
              <!-- a comment -->
              <config orientation="L" pageSize="letter"/>
              <header/>
              <details>
                <row><cell value="x" align="C"/><barcode code-type="QR" value="hi"/></row>
              </details>
              <footer></footer>
            </report>"#;
        let def = read(xml).unwrap();
        assert_eq!(def.config.orientation, Orientation::Landscape);
        assert_eq!(def.config.page_size, PageSize::Letter);
        let rows = def.tree.section(Section::Details);
        assert_eq!(def.tree.children(rows[0]).len(), 2);
        let cell = def.tree.get(def.tree.children(rows[0])[0]).unwrap();
        assert!(matches!(&cell.props, Properties::Cell(c) if c.value == "x"));
    }

    #[test]
    fn test_missing_section_and_unknown_tag() {
        let err = read("<report><header/><details/></report>").unwrap_err();
        assert!(matches!(err, ReportError::InvalidDefinition(m) if m.contains("footer")));

        let err = read("<report><header/><details><chart/></details><footer/></report>")
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidDefinition(m) if m.contains("chart")));
    }

    #[test]
    fn test_malformed_xml() {
        let err = read("<report><header></details></report>").unwrap_err();
        assert!(matches!(err, ReportError::Xml(_)));
    }
}
