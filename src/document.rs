use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use crate::error::GpxError;

/// XML element in the text/tail layout: `text` is the character data before
/// the first child, `tail` the character data after this element's closing
/// tag. Tails are what carry indentation, so keeping them intact preserves
/// the document's formatting across a round trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
    pub tail: String,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Element {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Element name with any namespace prefix removed.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: String) {
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.attrs.push((key.to_string(), value));
        }
    }

    /// First direct child whose local name matches.
    pub fn find_child(&self, local: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.local_name() == local)
    }

    pub fn find_child_mut(&mut self, local: &str) -> Option<&mut Element> {
        self.children.iter_mut().find(|c| c.local_name() == local)
    }

    pub fn position_of(&self, local: &str) -> Option<usize> {
        self.children.iter().position(|c| c.local_name() == local)
    }

    /// Insert just before the last child (before the element's closing
    /// position). On an empty child list this is a plain append.
    pub fn insert_before_last(&mut self, el: Element) {
        let idx = self.children.len().saturating_sub(1);
        self.children.insert(idx, el);
    }
}

pub fn local_part(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Parse an XML document into its root element. Character data, CDATA and
/// entity references all land in `text`/`tail`; the declaration, comments
/// and processing instructions are not part of this tool's documents and
/// are skipped.
pub fn parse(xml: &str) -> Result<Element, GpxError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(element_from_start(&e)),
            Event::Empty(e) => {
                let el = element_from_start(&e);
                attach(&mut stack, &mut root, el);
            }
            Event::End(_) => {
                if let Some(el) = stack.pop() {
                    attach(&mut stack, &mut root, el);
                }
            }
            Event::Text(e) => {
                let raw = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                append_text(&mut stack, &mut root, raw);
            }
            Event::CData(e) => {
                let raw = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                append_text(&mut stack, &mut root, raw);
            }
            Event::GeneralRef(e) => {
                // Character references (&#60; &#x3C;) and predefined entities
                if let Ok(Some(ch)) = e.resolve_char_ref() {
                    append_text(&mut stack, &mut root, ch.encode_utf8(&mut [0u8; 4]));
                } else {
                    let name = std::str::from_utf8(e.as_ref()).unwrap_or_default();
                    let resolved = match name {
                        "amp" => "&",
                        "lt" => "<",
                        "gt" => ">",
                        "quot" => "\"",
                        "apos" => "'",
                        _ => "",
                    };
                    append_text(&mut stack, &mut root, resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or(GpxError::EmptyDocument)
}

/// Serialize an element tree back to text. Deterministic: two calls over
/// the same tree produce identical strings, which is what makes the saved
/// baseline a reliable change detector. Attribute values are emitted in
/// their original wire form; text and tails are re-escaped.
pub fn serialize(root: &Element) -> String {
    let mut out = String::new();
    write_element(root, &mut out);
    out
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.name);
    for (k, v) in &el.attrs {
        out.push(' ');
        out.push_str(k);
        out.push_str("=\"");
        out.push_str(v);
        out.push('"');
    }
    if el.text.is_empty() && el.children.is_empty() {
        out.push_str("/>");
    } else {
        out.push('>');
        out.push_str(&escape(el.text.as_str()));
        for child in &el.children {
            write_element(child, out);
        }
        out.push_str("</");
        out.push_str(&el.name);
        out.push('>');
    }
    out.push_str(&escape(el.tail.as_str()));
}

fn element_from_start(e: &BytesStart<'_>) -> Element {
    let name = String::from_utf8_lossy(e.name().0).into_owned();
    let mut el = Element::new(&name);
    for attr in e.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.0).into_owned();
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        el.attrs.push((key, value));
    }
    el
}

fn attach(stack: &mut Vec<Element>, root: &mut Option<Element>, el: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None => *root = Some(el),
    }
}

fn append_text(stack: &mut Vec<Element>, root: &mut Option<Element>, s: &str) {
    if s.is_empty() {
        return;
    }
    match stack.last_mut() {
        Some(parent) => {
            if let Some(last) = parent.children.last_mut() {
                last.tail.push_str(s);
            } else {
                parent.text.push_str(s);
            }
        }
        // after the root closed: trailing whitespace belongs to its tail
        None => {
            if let Some(r) = root.as_mut() {
                r.tail.push_str(s);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1">
 <metadata>
  <time>2023-06-01T08:40:16Z</time>
  <bounds minlat="54.953477" minlon="37.769822" maxlat="54.955547" maxlon="37.820205"/>
 </metadata>
 <wpt lat="54.9555470" lon="37.8181450">
  <time>2023-05-23T00:00:00.000Z</time>
  <name>WPT1</name>
  <cmt>ЛАПИНО CMT</cmt>
  <sym>Airport</sym>
 </wpt>
</gpx>
"#;

    #[test]
    fn parse_keeps_structure_and_whitespace() {
        let root = parse(SAMPLE).unwrap();
        assert_eq!(root.local_name(), "gpx");
        assert_eq!(root.children.len(), 2);
        let wpt = root.find_child("wpt").unwrap();
        assert_eq!(wpt.attr("lat"), Some("54.9555470"));
        assert_eq!(wpt.find_child("name").unwrap().text, "WPT1");
        // the first child's tail carries the indentation convention
        assert_eq!(wpt.children[0].tail, "\n  ");
        assert_eq!(root.tail, "\n");
    }

    #[test]
    fn serialize_is_a_fixed_point() {
        let once = serialize(&parse(SAMPLE).unwrap());
        let twice = serialize(&parse(&once).unwrap());
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_elements_collapse() {
        let root = parse("<gpx><cmt></cmt></gpx>").unwrap();
        assert_eq!(serialize(&root), "<gpx><cmt/></gpx>");
    }

    #[test]
    fn text_is_escaped_on_output() {
        let mut root = parse("<gpx><cmt>x</cmt></gpx>").unwrap();
        root.find_child_mut("cmt").unwrap().text = "a < b & c".to_string();
        assert_eq!(serialize(&root), "<gpx><cmt>a &lt; b &amp; c</cmt></gpx>");
    }

    #[test]
    fn entities_and_cdata_become_text() {
        let root = parse("<gpx><cmt>a &amp; b</cmt><name><![CDATA[x & y]]></name></gpx>").unwrap();
        assert_eq!(root.find_child("cmt").unwrap().text, "a & b");
        assert_eq!(root.find_child("name").unwrap().text, "x & y");
    }

    #[test]
    fn insert_before_last_lands_before_closing_child() {
        let mut root = parse("<wpt><time>t</time><sym>Airport</sym></wpt>").unwrap();
        root.insert_before_last(Element::new("cmt"));
        let names: Vec<&str> = root.children.iter().map(|c| c.local_name()).collect();
        assert_eq!(names, ["time", "cmt", "sym"]);
    }

    #[test]
    fn malformed_input_is_a_parse_error() {
        assert!(matches!(
            parse("<gpx><wpt></gpx>"),
            Err(GpxError::XmlParse(_))
        ));
    }
}
