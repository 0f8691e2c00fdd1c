//! The generic element tree the archive passes through.
//!
//! Reading parses markup into `Element`s before any scene types get
//! involved; writing builds `Element`s and serializes them at the end.
//! Attribute order is preserved so written documents are deterministic.

use std::fmt::Write as _;

use crate::errors::ArchiveError;

/// One tagged element: attributes, child elements, text content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Element {
        Element {
            name: name.into(),
            ..Element::default()
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any previous value under the name.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == name) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Iterate child elements by tag. The iterator borrows only `self`,
    /// not `name`.
    pub fn children_named<'s>(&'s self, name: &str) -> impl Iterator<Item = &'s Element> + use<'s> {
        let name = name.to_string();
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children_named(name).next()
    }

    // ------------------------------------------------------------------
    // Typed attribute access (reader side)
    // ------------------------------------------------------------------

    pub fn required_attr(&self, name: &'static str) -> Result<&str, ArchiveError> {
        self.attr(name).ok_or(ArchiveError::MissingAttribute {
            tag: self.name.clone(),
            attr: name,
        })
    }

    fn bad_attr(&self, name: &str, value: &str) -> ArchiveError {
        ArchiveError::BadAttribute {
            tag: self.name.clone(),
            attr: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn f64_attr(&self, name: &str, default: f64) -> Result<f64, ArchiveError> {
        match self.attr(name) {
            None => Ok(default),
            Some(v) => v.trim().parse().map_err(|_| self.bad_attr(name, v)),
        }
    }

    pub fn usize_attr(&self, name: &str, default: usize) -> Result<usize, ArchiveError> {
        match self.attr(name) {
            None => Ok(default),
            Some(v) => v.trim().parse().map_err(|_| self.bad_attr(name, v)),
        }
    }

    pub fn bool_attr(&self, name: &str, default: bool) -> Result<bool, ArchiveError> {
        match self.attr(name) {
            None => Ok(default),
            Some("true") | Some("yes") | Some("1") => Ok(true),
            Some("false") | Some("no") | Some("0") => Ok(false),
            Some(v) => Err(self.bad_attr(name, v)),
        }
    }

    // ------------------------------------------------------------------
    // Serialization
    // ------------------------------------------------------------------

    /// Serialize this element (and subtree) as indented markup.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out, 0);
        out
    }

    fn write_into(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = write!(out, "{indent}<{}", self.name);
        for (k, v) in &self.attrs {
            let _ = write!(out, " {k}=\"{}\"", escape(v));
        }
        if self.children.is_empty() && self.text.is_empty() {
            out.push_str("/>\n");
            return;
        }
        out.push('>');
        if self.children.is_empty() {
            // Text-only content stays on one line so it round-trips
            // without picking up indentation.
            let _ = write!(out, "{}</{}>\n", escape_text(&self.text), self.name);
            return;
        }
        out.push('\n');
        if !self.text.is_empty() {
            let _ = writeln!(out, "{indent}  {}", escape_text(&self.text));
        }
        for child in &self.children {
            child.write_into(out, depth + 1);
        }
        let _ = writeln!(out, "{indent}</{}>", self.name);
    }
}

/// Escape markup metacharacters in attribute values and text runs.
pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a text run. Edge whitespace becomes numeric character
/// references so it survives the formatting trim on read.
pub(crate) fn escape_text(s: &str) -> String {
    let head = s.len() - s.trim_start().len();
    let tail = s.trim_end().len();
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        if i < head || i >= tail {
            let _ = write!(out, "&#{};", c as u32);
        } else {
            match c {
                '&' => out.push_str("&amp;"),
                '<' => out.push_str("&lt;"),
                '>' => out.push_str("&gt;"),
                '"' => out.push_str("&quot;"),
                _ => out.push(c),
            }
        }
    }
    out
}

/// Reverse of `escape`/`escape_text`; also accepts `&apos;` and
/// `&#xNN;` from other writers.
pub(crate) fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        if let Some((c, len)) = numeric_reference(rest) {
            out.push(c);
            rest = &rest[len..];
            continue;
        }
        let (replacement, len) = if rest.starts_with("&amp;") {
            ("&", 5)
        } else if rest.starts_with("&lt;") {
            ("<", 4)
        } else if rest.starts_with("&gt;") {
            (">", 4)
        } else if rest.starts_with("&quot;") {
            ("\"", 6)
        } else if rest.starts_with("&apos;") {
            ("'", 6)
        } else {
            ("&", 1)
        };
        out.push_str(replacement);
        rest = &rest[len..];
    }
    out.push_str(rest);
    out
}

/// Decode a `&#NN;` or `&#xNN;` reference at the start of `s`.
fn numeric_reference(s: &str) -> Option<(char, usize)> {
    let body = s.strip_prefix("&#")?;
    let end = body.find(';')?;
    let digits = &body[..end];
    let value = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    Some((char::from_u32(value)?, end + 3))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markup_shape() {
        let mut root = Element::new("document");
        root.set_attr("unit", "point");
        let mut page = Element::new("page");
        page.set_attr("width", "612");
        let mut label = Element::new("text");
        label.text = "a < b & c".to_string();
        page.push(label);
        root.push(page);

        insta::assert_snapshot!(root.to_markup(), @r#"
        <document unit="point">
          <page width="612">
            <text>a &lt; b &amp; c</text>
          </page>
        </document>
        "#);
    }

    #[test]
    fn set_attr_replaces() {
        let mut e = Element::new("rect");
        e.set_attr("x", "1");
        e.set_attr("x", "2");
        assert_eq!(e.attrs.len(), 1);
        assert_eq!(e.attr("x"), Some("2"));
    }

    #[test]
    fn lookup_outlives_the_name_borrow() {
        let mut root = Element::new("document");
        root.push(Element::new("page"));
        let found = {
            let name = String::from("page");
            root.child(&name)
        };
        assert_eq!(found.map(|e| e.name.as_str()), Some("page"));
    }

    #[test]
    fn escape_round_trips() {
        let s = "a<b>&\"quoted\" 'x'";
        assert_eq!(unescape(&escape(s)), s);
        assert_eq!(unescape("&apos;hi&apos;"), "'hi'");
        assert_eq!(unescape("a & b"), "a & b");
    }

    #[test]
    fn edge_whitespace_is_entity_encoded() {
        let encoded = escape_text("  a & b\t");
        assert_eq!(encoded, "&#32;&#32;a &amp; b&#9;");
        assert_eq!(unescape(encoded.trim()), "  a & b\t");
        assert_eq!(unescape("&#x41;&#66;"), "AB");
        // Malformed references pass through untouched.
        assert_eq!(unescape("&#zz; &#12"), "&#zz; &#12");
    }

    #[test]
    fn typed_attrs() {
        let mut e = Element::new("rect");
        e.set_attr("x", "3.5");
        e.set_attr("visible", "false");
        assert_eq!(e.f64_attr("x", 0.0).unwrap(), 3.5);
        assert_eq!(e.f64_attr("y", 7.0).unwrap(), 7.0);
        assert!(!e.bool_attr("visible", true).unwrap());
        assert!(matches!(
            e.required_attr("missing"),
            Err(ArchiveError::MissingAttribute { attr: "missing", .. })
        ));

        e.set_attr("x", "wide");
        assert!(matches!(
            e.f64_attr("x", 0.0),
            Err(ArchiveError::BadAttribute { .. })
        ));
    }
}
