/// Minimal XML item tree.
///
/// An xml value is a sequence of items; an element owns its children as a
/// nested sequence. Items are plain data, so copying an xml value is a
/// `clone()` of its items.
use std::fmt;

use indexmap::IndexMap;

#[derive(Debug, Clone, PartialEq)]
pub enum XmlItem {
    Element {
        name: String,
        attributes: IndexMap<String, String>,
        children: Vec<XmlItem>,
    },
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

impl XmlItem {
    pub fn element(name: &str, children: Vec<XmlItem>) -> XmlItem {
        XmlItem::Element {
            name: name.to_string(),
            attributes: IndexMap::new(),
            children,
        }
    }

    pub fn text(text: &str) -> XmlItem {
        XmlItem::Text(text.to_string())
    }

    /// Concatenated character data of this item and its descendants.
    pub fn text_content(&self) -> String {
        match self {
            XmlItem::Element { children, .. } => children.iter().map(|c| c.text_content()).collect(),
            XmlItem::Text(t) => t.clone(),
            XmlItem::Comment(_) | XmlItem::ProcessingInstruction { .. } => String::new(),
        }
    }
}

impl fmt::Display for XmlItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmlItem::Element {
                name,
                attributes,
                children,
            } => {
                write!(f, "<{}", name)?;
                for (k, v) in attributes {
                    write!(f, " {}=\"{}\"", k, escape(v, true))?;
                }
                if children.is_empty() {
                    return write!(f, "/>");
                }
                write!(f, ">")?;
                for child in children {
                    write!(f, "{}", child)?;
                }
                write!(f, "</{}>", name)
            }
            XmlItem::Text(t) => f.write_str(&escape(t, false)),
            XmlItem::Comment(c) => write!(f, "<!--{}-->", c),
            XmlItem::ProcessingInstruction { target, data } => write!(f, "<?{} {}?>", target, data),
        }
    }
}

pub fn sequence_to_string(items: &[XmlItem]) -> String {
    items.iter().map(|i| i.to_string()).collect()
}

fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
