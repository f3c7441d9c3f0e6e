use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// One step of a [`NodePath`], contributed by the accessor that produced it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementSelector {
    /// The synthetic root of every path.
    Root,
    /// A named property of a record.
    Property(String),
    /// A position inside a list.
    Index(usize),
    /// A key inside a map.
    MapKey(String),
}

impl ElementSelector {
    /// Shorthand for [`ElementSelector::Property`].
    pub fn property(name: impl Into<String>) -> Self {
        Self::Property(name.into())
    }

    /// Shorthand for [`ElementSelector::MapKey`].
    pub fn key(key: impl Into<String>) -> Self {
        Self::MapKey(key.into())
    }

    /// The property name, if this selector addresses a record property.
    pub fn property_name(&self) -> Option<&str> {
        match self {
            Self::Property(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => Ok(()),
            Self::Property(name) => {
                f.write_str("/")?;
                write_escaped(f, name)
            }
            Self::Index(index) => write!(f, "[{index}]"),
            Self::MapKey(key) => {
                f.write_str("{")?;
                write_escaped(f, key)?;
                f.write_str("}")
            }
        }
    }
}

/// Escape sequences for characters that delimit selectors. An empty name or
/// key is written as `~e`.
const ESCAPES: [(char, char); 6] = [
    ('~', '0'),
    ('/', '1'),
    ('[', '2'),
    (']', '3'),
    ('{', '4'),
    ('}', '5'),
];

fn write_escaped(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if s.is_empty() {
        return f.write_str("~e");
    }
    for c in s.chars() {
        match ESCAPES.iter().find(|(raw, _)| *raw == c) {
            Some((_, code)) => write!(f, "~{code}")?,
            None => write!(f, "{c}")?,
        }
    }
    Ok(())
}

/// Decode the escape following a `~` into `out`.
fn unescape_into(chars: &mut impl Iterator<Item = char>, out: &mut String) -> Result<(), &'static str> {
    match chars.next() {
        Some('e') => Ok(()),
        Some(code) => match ESCAPES.iter().find(|(_, c)| *c == code) {
            Some((raw, _)) => {
                out.push(*raw);
                Ok(())
            }
            None => Err("unknown escape sequence"),
        },
        None => Err("unterminated escape sequence"),
    }
}

/// Location of a node inside an object graph.
///
/// A path is an ordered sequence of [`ElementSelector`]s that always begins
/// with [`ElementSelector::Root`]. Paths are immutable: every "mutation"
/// returns a new path.
///
/// # Rendering
///
/// - `/` for the root
/// - `/name` for record properties
/// - `[2]` for list items (`/items[2]`)
/// - `{key}` for map entries (`/labels{env}`)
///
/// Inside names and keys `~0`, `~1`, `~2`, `~3`, `~4` and `~5` stand for
/// `~`, `/`, `[`, `]`, `{` and `}`; `~e` stands for the empty string. So the
/// JSON key `app.kubernetes.io/name` is addressed as `/app.kubernetes.io~1name`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath {
    elements: Vec<ElementSelector>,
}

impl NodePath {
    /// The path of the root node.
    pub fn root() -> Self {
        Self {
            elements: vec![ElementSelector::Root],
        }
    }

    /// Build a path from the root and the given selectors.
    pub fn from_elements(elements: impl IntoIterator<Item = ElementSelector>) -> Self {
        let mut path = Self::root();
        path.elements.extend(
            elements
                .into_iter()
                .filter(|e| !matches!(e, ElementSelector::Root)),
        );
        path
    }

    /// A new path with `element` appended.
    ///
    /// Appending [`ElementSelector::Root`] is a no-op.
    pub fn with_child(&self, element: ElementSelector) -> Self {
        let mut elements = self.elements.clone();
        if element != ElementSelector::Root {
            elements.push(element);
        }
        Self { elements }
    }

    /// The path one level up, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let mut elements = self.elements.clone();
        elements.pop();
        Some(Self { elements })
    }

    /// The last selector of this path.
    pub fn last_element(&self) -> &ElementSelector {
        // Never empty: construction always starts with Root.
        self.elements.last().unwrap_or(&ElementSelector::Root)
    }

    /// All selectors, starting with the root.
    pub fn elements(&self) -> &[ElementSelector] {
        &self.elements
    }

    /// Number of selectors below the root.
    pub fn depth(&self) -> usize {
        self.elements.len() - 1
    }

    /// Returns `true` if this is the root path.
    pub fn is_root(&self) -> bool {
        self.elements.len() == 1
    }

    /// Element-wise equality.
    pub fn matches(&self, other: &NodePath) -> bool {
        self == other
    }

    /// Returns `true` if `prefix` is a (non-strict) prefix of this path.
    pub fn starts_with(&self, prefix: &NodePath) -> bool {
        self.elements.starts_with(&prefix.elements)
    }

    /// Returns `true` if the trailing selectors of this path equal `suffix`.
    ///
    /// The root selector of `suffix` is ignored, so `/b/c` is a suffix of
    /// `/a/b/c`.
    pub fn ends_with(&self, suffix: &NodePath) -> bool {
        self.elements[1..].ends_with(&suffix.elements[1..])
    }

    /// Returns `true` if this path is a strict ancestor of `other`.
    pub fn is_parent_of(&self, other: &NodePath) -> bool {
        other.elements.len() > self.elements.len() && other.starts_with(self)
    }

    /// Returns `true` if this path is a strict descendant of `other`.
    pub fn is_child_of(&self, other: &NodePath) -> bool {
        other.is_parent_of(self)
    }
}

impl Default for NodePath {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodePath({self})")
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        if !matches!(self.elements[1], ElementSelector::Property(_)) {
            f.write_str("/")?;
        }
        for element in &self.elements {
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

impl FromStr for NodePath {
    type Err = TypeError;

    /// Parse the rendering produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TypeError::InvalidPath {
            path: s.to_string(),
            reason: reason.to_string(),
        };

        if !s.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut path = Self::root();
        let mut chars = s[1..].chars().peekable();
        // `None` until the current property has at least one (possibly escaped) character.
        let mut name: Option<String> = None;

        while let Some(c) = chars.next() {
            match c {
                '/' => {
                    let Some(done) = name.take() else {
                        return Err(invalid("empty property name"));
                    };
                    path = path.with_child(ElementSelector::Property(done));
                }
                '[' | '{' => {
                    if let Some(done) = name.take() {
                        path = path.with_child(ElementSelector::Property(done));
                    }
                    let close = if c == '[' { ']' } else { '}' };
                    let mut inner = String::new();
                    loop {
                        match chars.next() {
                            Some(ch) if ch == close => break,
                            Some('~') => unescape_into(&mut chars, &mut inner).map_err(invalid)?,
                            Some(ch) => inner.push(ch),
                            None => return Err(invalid("unterminated selector")),
                        }
                    }
                    let element = if c == '[' {
                        let index = inner
                            .parse::<usize>()
                            .map_err(|_| invalid("list index must be a non-negative integer"))?;
                        ElementSelector::Index(index)
                    } else {
                        ElementSelector::MapKey(inner)
                    };
                    path = path.with_child(element);
                    if chars.peek() == Some(&'/') {
                        chars.next();
                        if chars.peek().is_none() {
                            return Err(invalid("trailing '/'"));
                        }
                    }
                }
                ']' | '}' => return Err(invalid("unbalanced selector")),
                '~' => unescape_into(&mut chars, name.get_or_insert_with(String::new))
                    .map_err(invalid)?,
                other => name.get_or_insert_with(String::new).push(other),
            }
        }

        if let Some(done) = name {
            path = path.with_child(ElementSelector::Property(done));
        } else if s.len() > 1 && s.ends_with('/') {
            return Err(invalid("trailing '/'"));
        }

        Ok(path)
    }
}

impl Serialize for NodePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
