//! Small `quick-xml` writer wrapper shared by the XML-based formats.

use crate::{Error, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

pub(super) struct XmlDocument {
    writer: Writer<Vec<u8>>,
    context: &'static str,
}

impl XmlDocument {
    /// Starts a UTF-8 document. `context` names the output in error messages.
    pub(super) fn new(context: &'static str) -> Result<Self> {
        let mut doc = Self {
            writer: Writer::new(Vec::new()),
            context,
        };
        doc.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        Ok(doc)
    }

    /// Writes a processing instruction verbatim.
    pub(super) fn raw(&mut self, markup: &str) -> Result<()> {
        self.writer
            .get_mut()
            .write_all(markup.as_bytes())
            .map_err(|e| Error::internal(self.context, e))
    }

    pub(super) fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.event(Event::Start(
            BytesStart::new(name).with_attributes(attrs.iter().copied()),
        ))
    }

    pub(super) fn end(&mut self, name: &str) -> Result<()> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    pub(super) fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.event(Event::Empty(
            BytesStart::new(name).with_attributes(attrs.iter().copied()),
        ))
    }

    /// Writes `<name attrs>text</name>` with the text escaped.
    pub(super) fn text_element(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> Result<()> {
        self.start(name, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    pub(super) fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::internal(self.context, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_escaped() {
        let mut doc = XmlDocument::new("test").expect("start");
        doc.text_element("a", &[("k", "v")], "x < y & z").expect("element");
        let xml = String::from_utf8(doc.finish()).expect("utf8");
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.ends_with("<a k=\"v\">x &lt; y &amp; z</a>"));
    }
}
