use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::{self, Write};

use crate::{LocationRecord, RecordSet};

pub const GPX_VERSION: &str = "1.1";
pub const GPX_CREATOR: &str = "polarsteps-gpx";
pub const GPX_NAME: &str = "Export Gpx from Polarsteps Data";

/// A minimal in-memory XML element: name, ordered attributes, optional text
/// and ordered children.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: &'static str,
    pub attributes: Vec<(&'static str, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, key: &'static str, value: impl ToString) -> Self {
        self.attributes.push((key, value.to_string()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> io::Result<()> {
        let mut start = BytesStart::new(self.name);
        for (key, value) in &self.attributes {
            start.push_attribute((*key, value.as_str()));
        }

        if self.text.is_none() && self.children.is_empty() {
            return writer.write_event(Event::Empty(start));
        }

        writer.write_event(Event::Start(start))?;
        if let Some(text) = &self.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name)))
    }

    /// Serializes the element as a complete UTF-8 document.
    pub fn to_document(&self) -> io::Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_to(&mut writer)?;

        let mut bytes = writer.into_inner();
        bytes.push(b'\n');
        String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Builds the GPX tree: document name, one track with every record as a
/// track point, then a waypoint for each labelled record.
///
/// Points follow the string order of the timestamp keys.
pub fn build_gpx(records: &RecordSet) -> Element {
    let mut segment = Element::new("trkseg");
    let mut waypoints = Vec::new();

    for (time, record) in records {
        segment.push(point("trkpt", time, record));

        if let Some(label) = non_empty(&record.label) {
            let mut waypoint = point("wpt", time, record).child(Element::new("name").text(label));
            if let Some(description) = non_empty(&record.description) {
                waypoint.push(Element::new("desc").text(description));
            }
            waypoints.push(waypoint);
        }
    }

    let mut gpx = Element::new("gpx")
        .attr("version", GPX_VERSION)
        .attr("creator", GPX_CREATOR)
        .child(Element::new("name").text(GPX_NAME))
        .child(Element::new("trk").child(segment));
    gpx.children.extend(waypoints);
    gpx
}

pub fn write_gpx(records: &RecordSet) -> io::Result<String> {
    build_gpx(records).to_document()
}

fn point(name: &'static str, time: &str, record: &LocationRecord) -> Element {
    // f64 Display is the shortest text that reads back to the same value
    Element::new(name)
        .attr("lat", record.lat)
        .attr("lon", record.lon)
        .child(Element::new("time").text(time))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
