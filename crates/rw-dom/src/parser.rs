//! XHTML loader for [`Document`].
//!
//! Rendered RW pages are well-formed enough for an XML reader once void
//! elements (`<br>`, `<img>`) and stray end tags are tolerated, which is what
//! this loader does. Content of `<script>` and `<style>` must not contain
//! unescaped markup characters.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::document::{Document, NodeId};

/// Elements that never have content, even when written as `<br>`.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Error while loading a page.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ParseError {
    /// XML parsing error.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Encoding error while decoding names or text.
    #[error("encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}

impl Document {
    /// Load a document from (X)HTML markup.
    ///
    /// Unknown entities are preserved literally, mismatched end tags close the
    /// nearest open element with the same name and are otherwise ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the markup cannot be tokenized.
    pub fn parse(html: &str) -> Result<Self, ParseError> {
        let mut doc = Document::new();
        let mut stack: Vec<(NodeId, String)> = vec![(doc.root(), String::new())];

        let mut reader = Reader::from_str(html);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        loop {
            let current = stack.last().map_or(doc.root(), |(id, _)| *id);
            match reader.read_event()? {
                Event::Start(e) => {
                    let (tag, attributes) = decode_start(&reader, &e);
                    let node = append(&mut doc, current, &tag, &attributes);
                    if !VOID_ELEMENTS.contains(&tag.as_str()) {
                        stack.push((node, tag));
                    }
                }
                Event::Empty(e) => {
                    let (tag, attributes) = decode_start(&reader, &e);
                    append(&mut doc, current, &tag, &attributes);
                }
                Event::End(e) => {
                    let tag = decode_name(&reader, e.name().as_ref());
                    if let Some(pos) = stack.iter().rposition(|(_, t)| *t == tag)
                        && pos > 0
                    {
                        stack.truncate(pos);
                    } else {
                        tracing::debug!(tag = %tag, "Ignoring unmatched end tag");
                    }
                }
                Event::Text(e) => {
                    let text = reader.decoder().decode(&e)?;
                    doc.append_text(current, &text);
                }
                Event::GeneralRef(e) => {
                    let entity = reader.decoder().decode(&e)?;
                    doc.append_text(current, &decode_entity(&entity));
                }
                Event::CData(e) => {
                    doc.append_text(current, &String::from_utf8_lossy(&e));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if stack.len() > 1 {
            tracing::debug!(open = stack.len() - 1, "Unclosed elements at end of input");
        }

        Ok(doc)
    }
}

fn append(doc: &mut Document, parent: NodeId, tag: &str, attributes: &[(String, String)]) -> NodeId {
    let borrowed: Vec<(&str, &str)> = attributes
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    doc.append_element(parent, tag, &borrowed)
}

fn decode_start(reader: &Reader<&[u8]>, e: &BytesStart) -> (String, Vec<(String, String)>) {
    let tag = decode_name(reader, e.name().as_ref());
    let mut attributes = Vec::new();
    for attr in e.html_attributes().flatten() {
        let key = decode_name(reader, attr.key.as_ref());
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            std::borrow::Cow::into_owned,
        );
        attributes.push((key, value));
    }
    (tag, attributes)
}

fn decode_name(reader: &Reader<&[u8]>, name: &[u8]) -> String {
    reader
        .decoder()
        .decode(name)
        .map_or_else(
            |_| String::from_utf8_lossy(name).into_owned(),
            std::borrow::Cow::into_owned,
        )
        .to_ascii_lowercase()
}

/// Decode an entity reference (without `&` and `;`).
fn decode_entity(entity: &str) -> String {
    let named = match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        "nbsp" => Some('\u{00a0}'),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        "hellip" => Some('\u{2026}'),
        "copy" => Some('\u{00a9}'),
        "larr" => Some('\u{2190}'),
        "rarr" => Some('\u{2192}'),
        _ => None,
    };
    if let Some(c) = named {
        return c.to_string();
    }

    let code = if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        u32::from_str_radix(hex, 16).ok()
    } else {
        entity.strip_prefix('#').and_then(|d| d.parse::<u32>().ok())
    };
    code.and_then(char::from_u32)
        .map_or_else(|| format!("&{entity};"), |c| c.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dom, Selector};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_nested_elements() {
        let doc = Document::parse(r#"<div class="tabs"><button data-tab="npm">npm</button></div>"#)
            .unwrap();
        let root = doc.root();

        let div = doc.children(root).next().unwrap();
        assert_eq!(doc.tag(div), "div");
        assert_eq!(doc.attribute(&div, "class").as_deref(), Some("tabs"));

        let button = doc.children(div).next().unwrap();
        assert_eq!(doc.tag(button), "button");
        assert_eq!(doc.attribute(&button, "data-tab").as_deref(), Some("npm"));
        assert_eq!(doc.text_content(&button), "npm");
    }

    #[test]
    fn test_parse_full_page_with_doctype() {
        let html = r#"<!DOCTYPE html>
<html>
  <head><meta charset="utf-8"><title>Guide</title></head>
  <body><section id="intro"><p>Hi</p></section></body>
</html>"#;
        let doc = Document::parse(html).unwrap();

        let sections = doc.query_all(&doc.root(), &Selector::parse("section[id]").unwrap());
        assert_eq!(sections.len(), 1);
        let meta = doc.query_first(&doc.root(), &Selector::parse("meta").unwrap()).unwrap();
        assert_eq!(doc.children(meta).count(), 0);
        let title = doc.query_first(&doc.root(), &Selector::parse("title").unwrap()).unwrap();
        assert_eq!(doc.text_content(&title), "Guide");
    }

    #[test]
    fn test_parse_void_elements_without_slash() {
        let doc = Document::parse("<p>Before<br>After</p>").unwrap();
        let p = doc.children(doc.root()).next().unwrap();

        assert_eq!(doc.children(p).count(), 1);
        assert_eq!(doc.text_content(&p), "BeforeAfter");
    }

    #[test]
    fn test_parse_entities() {
        let doc = Document::parse("<code>a &lt; b&nbsp;&amp;&#x41;&#66;&unknown;</code>").unwrap();
        let code = doc.children(doc.root()).next().unwrap();

        assert_eq!(doc.text_content(&code), "a < b\u{a0}&AB&unknown;");
    }

    #[test]
    fn test_parse_mismatched_end_tag() {
        let doc = Document::parse("<div><span>x</div><p>y</p>").unwrap();
        let top: Vec<_> = doc.children(doc.root()).collect();

        assert_eq!(top.len(), 2);
        assert_eq!(doc.tag(top[1]), "p");
    }

    #[test]
    fn test_parse_stray_end_tag_ignored() {
        let doc = Document::parse("<div>x</span></div>").unwrap();
        let div = doc.children(doc.root()).next().unwrap();
        assert_eq!(doc.text_content(&div), "x");
    }

    #[test]
    fn test_parse_end_tags_past_void_elements() {
        let doc = Document::parse("<section><p>a<br>b</p></section></div></body><p>c</p>").unwrap();
        let top: Vec<_> = doc.children(doc.root()).collect();

        assert_eq!(top.len(), 2);
        assert_eq!(doc.tag(top[0]), "section");
        assert_eq!(doc.text_content(&top[0]), "ab");
        assert_eq!(doc.text_content(&top[1]), "c");
    }

    #[test]
    fn test_parse_boolean_attribute() {
        let doc = Document::parse(r#"<span class="check-icon" hidden>ok</span>"#).unwrap();
        let span = doc.children(doc.root()).next().unwrap();
        assert!(doc.is_hidden(&span));
    }

    #[test]
    fn test_decode_entity() {
        assert_eq!(decode_entity("mdash"), "\u{2014}");
        assert_eq!(decode_entity("#X2014"), "\u{2014}");
        assert_eq!(decode_entity("#xZZ"), "&#xZZ;");
    }
}
