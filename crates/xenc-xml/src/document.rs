#![forbid(unsafe_code)]

//! Owned XML document with element lookup and in-place splicing.

use std::collections::HashMap;
use std::ops::Range;

use xenc_core::Error;

/// An owned XML document.  Stores the source text; the parsed tree is
/// produced on demand by [`XmlDocument::parse_doc`] and borrows from it.
///
/// Mutation happens only through [`XmlDocument::splice`] and
/// [`XmlDocument::replace_range`], which validate the candidate text before
/// committing it, so the document is always well-formed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    text: String,
}

/// A located element, identified by its byte range in the document text.
///
/// The reference is only meaningful for the document revision it was taken
/// from; any splice invalidates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementRef {
    range: Range<usize>,
    local_name: String,
}

impl ElementRef {
    /// Byte range of the element (start tag through end tag).
    pub fn range(&self) -> Range<usize> {
        self.range.clone()
    }

    /// Local name of the element.
    pub fn local_name(&self) -> &str {
        &self.local_name
    }
}

impl XmlDocument {
    /// Parse and validate XML from a string, taking ownership.
    pub fn parse(text: String) -> Result<Self, Error> {
        check_well_formed(&text)?;
        Ok(Self { text })
    }

    /// Parse and validate XML from bytes.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, Error> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?
            .to_owned();
        Self::parse(text)
    }

    /// Get the raw XML text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the document and return its text.
    pub fn into_string(self) -> String {
        self.text
    }

    /// Parse the document and return a temporary `roxmltree::Document`.
    pub fn parse_doc(&self) -> Result<roxmltree::Document<'_>, Error> {
        roxmltree::Document::parse_with_options(&self.text, crate::parsing_options())
            .map_err(|e| Error::XmlParse(e.to_string()))
    }

    /// Local name of the root element.
    pub fn root_name(&self) -> Result<String, Error> {
        let doc = self.parse_doc()?;
        Ok(doc.root_element().tag_name().name().to_owned())
    }

    /// Find the first element with the given namespace and local name,
    /// in document order starting at the root element itself.
    pub fn find_element(&self, ns: &str, local_name: &str) -> Result<Option<ElementRef>, Error> {
        let doc = self.parse_doc()?;
        let found = doc
            .root_element()
            .descendants()
            .find(|n| is_element_named(*n, ns, local_name))
            .map(|n| ElementRef {
                range: n.range(),
                local_name: local_name.to_owned(),
            });
        Ok(found)
    }

    /// Map an [`ElementRef`] back to a node of a parsed document.
    pub fn resolve<'a, 'input>(
        doc: &'a roxmltree::Document<'input>,
        target: &ElementRef,
    ) -> Option<roxmltree::Node<'a, 'input>> {
        doc.descendants().find(|n| {
            n.is_element() && n.range() == target.range && n.tag_name().name() == target.local_name
        })
    }

    /// Replace the target element with `replacement`.
    ///
    /// Everything outside the element's byte range is preserved exactly,
    /// both as text and as tree structure. If the result is not a
    /// well-formed document, or `replacement` would close or open elements
    /// outside the replaced node, nothing is changed.
    pub fn splice(&mut self, target: &ElementRef, replacement: &str) -> Result<(), Error> {
        self.replace_range(target.range(), replacement)?;
        tracing::debug!(
            element = target.local_name(),
            start = target.range.start,
            "spliced replacement into document"
        );
        Ok(())
    }

    /// Replace an arbitrary byte range of the document text.
    ///
    /// The candidate text is parsed before it is committed. Every element
    /// outside `range` must survive with the same extent, and every element
    /// enclosing `range` must still enclose exactly the new text; otherwise
    /// the replacement is not a balanced fragment and is refused.
    pub fn replace_range(&mut self, range: Range<usize>, replacement: &str) -> Result<(), Error> {
        if range.start > range.end
            || range.end > self.text.len()
            || !self.text.is_char_boundary(range.start)
            || !self.text.is_char_boundary(range.end)
        {
            return Err(Error::XmlStructure(format!(
                "replacement range {}..{} is outside the document",
                range.start, range.end
            )));
        }

        let mut candidate =
            String::with_capacity(self.text.len() - (range.end - range.start) + replacement.len());
        candidate.push_str(&self.text[..range.start]);
        candidate.push_str(replacement);
        candidate.push_str(&self.text[range.end..]);

        let expected = {
            let current = self.parse_doc()?;
            outer_elements_after_replace(&current, &range, replacement.len())
        };
        let actual = {
            let parsed = roxmltree::Document::parse_with_options(&candidate, crate::parsing_options())
                .map_err(|e| Error::XmlParse(e.to_string()))?;
            elements_outside(&parsed, range.start..range.start + replacement.len())
        };
        if actual != expected {
            return Err(Error::XmlStructure(
                "replacement is not a balanced fragment: it changes structure outside the replaced node"
                    .into(),
            ));
        }

        self.text = candidate;
        Ok(())
    }

    /// Build the ID → NodeId mapping for a parsed document.
    ///
    /// `Id`, `ID` and `id` are always registered; `extra_attrs` adds more.
    /// A prefixed name (`wsu:Id`) matches the local name in any namespace.
    pub fn build_id_map(
        doc: &roxmltree::Document<'_>,
        extra_attrs: &[String],
    ) -> HashMap<String, roxmltree::NodeId> {
        let default_attrs = ["Id", "ID", "id"];
        let mut map = HashMap::new();
        for node in doc.descendants().filter(|n| n.is_element()) {
            for attr_name in default_attrs
                .iter()
                .copied()
                .chain(extra_attrs.iter().map(String::as_str))
            {
                let value = match attr_name.split_once(':') {
                    Some((_, local)) => node
                        .attributes()
                        .find(|a| a.namespace().is_some() && a.name() == local)
                        .map(|a| a.value()),
                    None => node.attribute(attr_name),
                };
                if let Some(val) = value {
                    map.insert(val.to_owned(), node.id());
                }
            }
        }
        map
    }
}

impl std::str::FromStr for XmlDocument {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.to_owned())
    }
}

/// Find the first child element with the given namespace and local name.
pub fn find_child_element<'a, 'input>(
    parent: roxmltree::Node<'a, 'input>,
    ns: &str,
    local_name: &str,
) -> Option<roxmltree::Node<'a, 'input>> {
    parent
        .children()
        .find(|n| is_element_named(*n, ns, local_name))
}

fn is_element_named(node: roxmltree::Node<'_, '_>, ns: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == ns
}

/// Element extents of `doc` as they must appear once `range` is replaced
/// by `new_len` bytes, in document order. Elements inside `range` are gone.
fn outer_elements_after_replace(
    doc: &roxmltree::Document<'_>,
    range: &Range<usize>,
    new_len: usize,
) -> Vec<Range<usize>> {
    let shift = |pos: usize| pos - range.end + range.start + new_len;
    doc.descendants()
        .filter(|n| n.is_element())
        .filter_map(|n| {
            let r = n.range();
            if r.end <= range.start {
                Some(r)
            } else if r.start >= range.end {
                Some(shift(r.start)..shift(r.end))
            } else if r.start <= range.start && r.end >= range.end && r != *range {
                Some(r.start..shift(r.end))
            } else {
                None
            }
        })
        .collect()
}

/// Element extents of `doc` that are not wholly inside `region`, in
/// document order.
fn elements_outside(doc: &roxmltree::Document<'_>, region: Range<usize>) -> Vec<Range<usize>> {
    doc.descendants()
        .filter(|n| n.is_element())
        .map(|n| n.range())
        .filter(|r| !(r.start >= region.start && r.end <= region.end))
        .collect()
}

fn check_well_formed(text: &str) -> Result<(), Error> {
    roxmltree::Document::parse_with_options(text, crate::parsing_options())
        .map(|_| ())
        .map_err(|e| Error::XmlParse(e.to_string()))
}
