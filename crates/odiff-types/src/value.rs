//! Dynamically-typed object graphs.
//!
//! A [`Value`] is either a scalar or a shared handle to a container
//! ([`Record`], list, or map). Cloning a handle aliases the same container,
//! which is what makes shared and cyclic graphs expressible:
//!
//! ```
//! use odiff_types::{Record, Value};
//!
//! let node = Value::record(Record::new("Node").with_field("name", "foo"));
//! node.set_field("child", node.clone());
//! assert!(node.field("child").same_object(&node));
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Shared handle to a record.
pub type RecordRef = Rc<RefCell<Record>>;
/// Shared handle to a list.
pub type ListRef = Rc<RefCell<Vec<Value>>>;
/// Shared handle to a string-keyed map.
pub type MapRef = Rc<RefCell<BTreeMap<String, Value>>>;

/// A named bag of properties, the graph analogue of a struct instance.
#[derive(Clone, Default)]
pub struct Record {
    type_name: String,
    fields: BTreeMap<String, Value>,
}

impl Record {
    /// Create an empty record of the given type.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field assignment.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// The record's type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Look up a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// All fields, sorted by name.
    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// Field names, sorted.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Opaque identity of a container, derived from its allocation address.
///
/// Two handles share an identity iff they alias the same container. The
/// identity is only meaningful while the container is alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentity(usize);

impl ObjectIdentity {
    fn of<T>(rc: &Rc<T>) -> Self {
        Self(Rc::as_ptr(rc) as *const () as usize)
    }
}

impl fmt::Display for ObjectIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{:x}", self.0)
    }
}

/// Runtime type of a value, used to select a comparison strategy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Null,
    Bool,
    Integer,
    Float,
    Text,
    Record(String),
    List,
    Map,
    /// The two sides of a comparison have incompatible types.
    Any,
}

impl ValueType {
    /// The type shared by both sides of a comparison.
    ///
    /// A null side defers to the other side; incompatible types collapse to
    /// [`ValueType::Any`].
    pub fn common(working: &ValueType, base: &ValueType) -> ValueType {
        match (working, base) {
            (ValueType::Null, other) | (other, ValueType::Null) => other.clone(),
            (a, b) if a == b => a.clone(),
            _ => ValueType::Any,
        }
    }

    /// Returns `true` for non-container types.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Self::Null | Self::Bool | Self::Integer | Self::Float | Self::Text
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool => f.write_str("bool"),
            Self::Integer => f.write_str("integer"),
            Self::Float => f.write_str("float"),
            Self::Text => f.write_str("text"),
            Self::Record(name) => write!(f, "record<{name}>"),
            Self::List => f.write_str("list"),
            Self::Map => f.write_str("map"),
            Self::Any => f.write_str("any"),
        }
    }
}

/// A node of an object graph.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Record(RecordRef),
    List(ListRef),
    Map(MapRef),
}

impl Value {
    /// Wrap a record in a new shared handle.
    pub fn record(record: Record) -> Self {
        Self::Record(Rc::new(RefCell::new(record)))
    }

    /// Wrap items in a new shared list.
    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Self::List(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// Wrap entries in a new shared map.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Self::Map(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Identity of the container behind this value, `None` for scalars.
    pub fn identity(&self) -> Option<ObjectIdentity> {
        match self {
            Self::Record(r) => Some(ObjectIdentity::of(r)),
            Self::List(l) => Some(ObjectIdentity::of(l)),
            Self::Map(m) => Some(ObjectIdentity::of(m)),
            _ => None,
        }
    }

    /// Returns `true` if both values are handles to the same container.
    pub fn same_object(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Runtime type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::Bool,
            Self::Integer(_) => ValueType::Integer,
            Self::Float(_) => ValueType::Float,
            Self::Text(_) => ValueType::Text,
            Self::Record(r) => ValueType::Record(r.borrow().type_name.clone()),
            Self::List(_) => ValueType::List,
            Self::Map(_) => ValueType::Map,
        }
    }

    /// Value of a record field; [`Value::Null`] if absent or not a record.
    pub fn field(&self, name: &str) -> Value {
        match self {
            Self::Record(r) => r.borrow().get(name).cloned().unwrap_or_default(),
            _ => Value::Null,
        }
    }

    /// Set a record field. Returns `false` if this value is not a record.
    pub fn set_field(&self, name: impl Into<String>, value: impl Into<Value>) -> bool {
        match self {
            Self::Record(r) => {
                r.borrow_mut().set(name, value);
                true
            }
            _ => false,
        }
    }

    /// List item at `index`; [`Value::Null`] if out of range or not a list.
    pub fn item(&self, index: usize) -> Value {
        match self {
            Self::List(l) => l.borrow().get(index).cloned().unwrap_or_default(),
            _ => Value::Null,
        }
    }

    /// Map entry for `key`; [`Value::Null`] if absent or not a map.
    pub fn entry(&self, key: &str) -> Value {
        match self {
            Self::Map(m) => m.borrow().get(key).cloned().unwrap_or_default(),
            _ => Value::Null,
        }
    }

    /// Sorted field names of a record (empty for other values).
    pub fn field_names(&self) -> BTreeSet<String> {
        match self {
            Self::Record(r) => r.borrow().fields.keys().cloned().collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Length of a list (zero for other values).
    pub fn len(&self) -> usize {
        match self {
            Self::List(l) => l.borrow().len(),
            Self::Map(m) => m.borrow().len(),
            Self::Record(r) => r.borrow().fields.len(),
            _ => 0,
        }
    }

    /// Returns `true` if [`Value::len`] is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted keys of a map (empty for other values).
    pub fn keys(&self) -> BTreeSet<String> {
        match self {
            Self::Map(m) => m.borrow().keys().cloned().collect(),
            _ => BTreeSet::new(),
        }
    }

    /// Structural equality that terminates on cyclic graphs.
    ///
    /// Containers are equal when they have the same type and pairwise-equal
    /// children. A pair of containers that is already being compared further
    /// up the recursion is assumed equal.
    pub fn deep_equals(&self, other: &Value) -> bool {
        let mut in_progress = HashSet::new();
        deep_equals_inner(self, other, &mut in_progress)
    }

    /// Short human-readable rendering used in logs and reports.
    pub fn summary(&self) -> String {
        match self {
            Self::Null => "null".into(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Text(s) => format!("{s:?}"),
            Self::Record(r) => {
                let r = r.borrow();
                format!("{} {{{} fields}}", r.type_name, r.fields.len())
            }
            Self::List(l) => format!("[{} items]", l.borrow().len()),
            Self::Map(m) => format!("{{{} entries}}", m.borrow().len()),
        }
    }
}

fn deep_equals_inner(
    a: &Value,
    b: &Value,
    in_progress: &mut HashSet<(ObjectIdentity, ObjectIdentity)>,
) -> bool {
    if let (Some(ida), Some(idb)) = (a.identity(), b.identity()) {
        if ida == idb || !in_progress.insert((ida, idb)) {
            return true;
        }
    }

    let equal = match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Integer(x), Value::Integer(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y || x.to_bits() == y.to_bits(),
        (Value::Text(x), Value::Text(y)) => x == y,
        (Value::Record(x), Value::Record(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.type_name == y.type_name
                && x.fields.len() == y.fields.len()
                && x.fields.iter().all(|(name, xv)| {
                    y.fields
                        .get(name)
                        .is_some_and(|yv| deep_equals_inner(xv, yv, in_progress))
                })
        }
        (Value::List(x), Value::List(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x
                    .iter()
                    .zip(y.iter())
                    .all(|(xv, yv)| deep_equals_inner(xv, yv, in_progress))
        }
        (Value::Map(x), Value::Map(y)) => {
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && x.iter().all(|(key, xv)| {
                    y.get(key)
                        .is_some_and(|yv| deep_equals_inner(xv, yv, in_progress))
                })
        }
        _ => false,
    };

    if let (Some(ida), Some(idb)) = (a.identity(), b.identity()) {
        in_progress.remove(&(ida, idb));
    }
    equal
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.deep_equals(other)
    }
}

// Containers print shallowly so cyclic graphs stay printable.
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Integer(i) => write!(f, "Integer({i})"),
            Self::Float(x) => write!(f, "Float({x})"),
            Self::Text(s) => write!(f, "Text({s:?})"),
            Self::Record(r) => {
                let r = r.borrow();
                f.debug_struct("Record")
                    .field("type", &r.type_name)
                    .field("fields", &r.fields.keys().collect::<Vec<_>>())
                    .finish()
            }
            Self::List(l) => write!(f, "List(len={})", l.borrow().len()),
            Self::Map(m) => f
                .debug_tuple("Map")
                .field(&m.borrow().keys().collect::<Vec<_>>())
                .finish(),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("type", &self.type_name)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::record(record)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or_default()
    }
}
