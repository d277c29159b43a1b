use std::path::Path;

use anyhow::{Context, Result};

use crate::coords::Vec2;

/// One element of a description document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DescNode {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<DescNode>,
}

static EMPTY: DescNode = DescNode {
    name: String::new(),
    attributes: Vec::new(),
    children: Vec::new(),
};

impl DescNode {
    /// Parses a document and returns its root element.
    pub fn parse(text: &str) -> Result<DescNode> {
        let doc = roxmltree::Document::parse(text).context("malformed description document")?;
        Ok(Self::from_xml(doc.root_element()))
    }

    /// Reads and parses a description file.
    pub fn load(path: impl AsRef<Path>) -> Result<DescNode> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read description {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("failed to parse description {}", path.display()))
    }

    fn from_xml(node: roxmltree::Node<'_, '_>) -> DescNode {
        DescNode {
            name: node.tag_name().name().to_string(),
            attributes: node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            children: node
                .children()
                .filter(|n| n.is_element())
                .map(Self::from_xml)
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True for the placeholder returned by [`DescNode::child`] on a miss.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.attributes.is_empty() && self.children.is_empty()
    }

    /// First child named `name`, or an empty node so that chained lookups
    /// fall through to attribute defaults.
    pub fn child(&self, name: &str) -> &DescNode {
        self.children.iter().find(|c| c.name == name).unwrap_or(&EMPTY)
    }

    pub fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a DescNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attr_str(&self, name: &str, default: &str) -> String {
        self.attr(name).unwrap_or(default).to_string()
    }

    /// A value is true when it starts with one of `1 t T y Y`.
    pub fn attr_bool(&self, name: &str, default: bool) -> bool {
        match self.attr(name) {
            Some(v) => matches!(v.chars().next(), Some('1' | 't' | 'T' | 'y' | 'Y')),
            None => default,
        }
    }

    pub fn attr_i32(&self, name: &str, default: i32) -> i32 {
        self.attr_parsed(name, default)
    }

    pub fn attr_u32(&self, name: &str, default: u32) -> u32 {
        self.attr_parsed(name, default)
    }

    pub fn attr_f32(&self, name: &str, default: f32) -> f32 {
        self.attr_parsed(name, default)
    }

    /// Reads an `"x,y"` pair. A wrong component count or a non-number is
    /// reported and yields `default`.
    pub fn attr_vec2(&self, name: &str, default: Vec2) -> Vec2 {
        let Some(raw) = self.attr(name) else {
            return default;
        };

        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        if let [x, y] = parts.as_slice() {
            if let (Ok(x), Ok(y)) = (x.parse::<f32>(), y.parse::<f32>()) {
                return Vec2::new(x, y);
            }
        }

        log::warn!(
            "<{}> attribute {name}=\"{raw}\" is not an \"x,y\" pair; using {default:?}",
            self.name
        );
        default
    }

    fn attr_parsed<T>(&self, name: &str, default: T) -> T
    where
        T: std::str::FromStr + std::fmt::Debug,
    {
        let Some(raw) = self.attr(name) else {
            return default;
        };
        match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                log::warn!(
                    "<{}> attribute {name}=\"{raw}\" is not a number; using {default:?}",
                    self.name
                );
                default
            }
        }
    }
}
