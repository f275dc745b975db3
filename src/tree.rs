use std::fmt::{self, Display, Formatter};

/// A node in the generic configuration tree.
///
/// pfSense configuration documents are pure element/text trees: no
/// attributes, repeated siblings carry sequence semantics, and leaf values
/// are always text. The decode side builds one of these before any typing
/// is applied, so schema violations surface in one place instead of deep
/// inside validation logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Element tag name.
    pub tag: String,
    /// Child elements in document order.
    pub children: Vec<Element>,
    /// Optional text content.
    pub text: Option<String>,
}

impl Element {
    /// Create an empty element.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Create a leaf element holding only text.
    pub fn leaf(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            children: Vec::new(),
            text: Some(text.into()),
        }
    }

    /// Return the first child with the given tag.
    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// Return every child with the given tag, preserving document order.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Walk a nested child path and return the terminal node's text.
    pub fn text_at<'a>(&'a self, path: &[&str]) -> Option<&'a str> {
        let mut current = self;
        for segment in path {
            current = current.child(segment)?;
        }
        current.text.as_deref()
    }

    /// Append a child and return `self` for chained construction.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Append a text leaf child and return `self`.
    pub fn with_leaf(self, tag: impl Into<String>, text: impl Into<String>) -> Self {
        self.with_child(Element::leaf(tag, text))
    }

    /// Append a text leaf only when a value is present.
    pub fn with_optional_leaf(self, tag: impl Into<String>, text: Option<&str>) -> Self {
        match text {
            Some(value) => self.with_leaf(tag, value),
            None => self,
        }
    }
}

impl Display for Element {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.children.is_empty() && self.text.is_none() {
            return write!(f, "<{}/>", self.tag);
        }
        write!(f, "<{}>", self.tag)?;
        if let Some(text) = &self.text {
            write!(f, "{text}")?;
        }
        for child in &self.children {
            write!(f, "{child}")?;
        }
        write!(f, "</{}>", self.tag)
    }
}
