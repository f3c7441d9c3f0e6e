//! Bridge between JSON documents and [`Value`] graphs.
//!
//! JSON objects become records of type [`OBJECT_TYPE`], arrays become lists.
//! An object of the form `{"$ref": "/path"}` is replaced by an alias of the
//! container found at that path of the same document, so shared and cyclic
//! structures can be written down:
//!
//! ```
//! use odiff_types::json::from_json;
//!
//! let doc = serde_json::json!({ "name": "foo", "child": { "$ref": "/" } });
//! let value = from_json(&doc).unwrap();
//! assert!(value.field("child").same_object(&value));
//! ```

use std::collections::HashMap;

use serde_json::{Map as JsonMap, Number, Value as Json};

use crate::error::TypeError;
use crate::path::{ElementSelector, NodePath};
use crate::value::{ObjectIdentity, Record, Value};

/// Record type assigned to converted JSON objects.
pub const OBJECT_TYPE: &str = "object";

/// Key marking a reference object.
pub const REF_KEY: &str = "$ref";

enum Slot {
    Field(String),
    Index(usize),
}

struct PendingRef {
    container: Value,
    slot: Slot,
    target: NodePath,
    reference: String,
    at: NodePath,
}

/// Convert a JSON document into a value graph, resolving `$ref` aliases.
pub fn from_json(json: &Json) -> Result<Value, TypeError> {
    if reference_of(json).is_some() {
        return Err(TypeError::UnsupportedJson(
            "the document root cannot be a reference".into(),
        ));
    }

    let mut pending = Vec::new();
    let root = convert(json, &NodePath::root(), &mut pending)?;

    // Refs may point through other refs, so resolve until no progress.
    while !pending.is_empty() {
        let before = pending.len();
        let mut remaining = Vec::new();
        for r in pending {
            let target = resolve(&root, &r.target);
            if target.identity().is_some() {
                match &r.slot {
                    Slot::Field(name) => {
                        r.container.set_field(name.clone(), target);
                    }
                    Slot::Index(index) => {
                        if let Value::List(list) = &r.container {
                            list.borrow_mut()[*index] = target;
                        }
                    }
                }
            } else if !target.is_null() {
                return Err(TypeError::ReferenceToScalar(r.reference));
            } else {
                remaining.push(r);
            }
        }
        if remaining.len() == before {
            let first = &remaining[0];
            return Err(TypeError::UnresolvedReference {
                reference: first.reference.clone(),
                at: first.at.to_string(),
            });
        }
        pending = remaining;
    }

    Ok(root)
}

fn reference_of(json: &Json) -> Option<&str> {
    match json {
        Json::Object(map) if map.len() == 1 => map.get(REF_KEY).and_then(Json::as_str),
        _ => None,
    }
}

fn convert(json: &Json, at: &NodePath, pending: &mut Vec<PendingRef>) -> Result<Value, TypeError> {
    let value = match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => number_to_value(n)?,
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => {
            let list = Value::list(std::iter::repeat(Value::Null).take(items.len()));
            for (index, item) in items.iter().enumerate() {
                let item_path = at.with_child(ElementSelector::Index(index));
                if let Some(reference) = reference_of(item) {
                    pending.push(PendingRef {
                        container: list.clone(),
                        slot: Slot::Index(index),
                        target: reference.parse()?,
                        reference: reference.to_string(),
                        at: item_path,
                    });
                    continue;
                }
                let converted = convert(item, &item_path, pending)?;
                if let Value::List(l) = &list {
                    l.borrow_mut()[index] = converted;
                }
            }
            list
        }
        Json::Object(fields) => {
            let record = Value::record(Record::new(OBJECT_TYPE));
            for (name, field) in fields {
                let field_path = at.with_child(ElementSelector::property(name.clone()));
                if let Some(reference) = reference_of(field) {
                    pending.push(PendingRef {
                        container: record.clone(),
                        slot: Slot::Field(name.clone()),
                        target: reference.parse()?,
                        reference: reference.to_string(),
                        at: field_path,
                    });
                    continue;
                }
                let converted = convert(field, &field_path, pending)?;
                record.set_field(name.clone(), converted);
            }
            record
        }
    };
    Ok(value)
}

fn number_to_value(n: &Number) -> Result<Value, TypeError> {
    if let Some(i) = n.as_i64() {
        Ok(Value::Integer(i))
    } else if let Some(x) = n.as_f64() {
        Ok(Value::Float(x))
    } else {
        Err(TypeError::UnsupportedJson(n.to_string()))
    }
}

/// Follow `path` from `root`, yielding [`Value::Null`] for missing steps.
pub fn resolve(root: &Value, path: &NodePath) -> Value {
    let mut current = root.clone();
    for element in path.elements() {
        current = match element {
            ElementSelector::Root => current,
            ElementSelector::Property(name) => current.field(name),
            ElementSelector::Index(index) => current.item(*index),
            ElementSelector::MapKey(key) => current.entry(key),
        };
        if current.is_null() {
            break;
        }
    }
    current
}

/// Render a value graph as JSON.
///
/// A container that was already rendered is emitted as a `$ref` to the path
/// of its first occurrence, so aliasing and cycles survive a round trip
/// through [`from_json`]. Record type names are not preserved.
pub fn to_json(value: &Value) -> Json {
    let mut seen = HashMap::new();
    render(value, &NodePath::root(), &mut seen)
}

fn render(value: &Value, at: &NodePath, seen: &mut HashMap<ObjectIdentity, NodePath>) -> Json {
    if let Some(identity) = value.identity() {
        if let Some(first) = seen.get(&identity) {
            let mut map = JsonMap::new();
            map.insert(REF_KEY.to_string(), Json::String(first.to_string()));
            return Json::Object(map);
        }
        seen.insert(identity, at.clone());
    }

    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => Json::Number((*i).into()),
        Value::Float(x) => Number::from_f64(*x).map(Json::Number).unwrap_or(Json::Null),
        Value::Text(s) => Json::String(s.clone()),
        Value::Record(r) => {
            let r = r.borrow();
            let mut map = JsonMap::new();
            for (name, field) in r.fields() {
                let path = at.with_child(ElementSelector::property(name.clone()));
                map.insert(name.clone(), render(field, &path, seen));
            }
            Json::Object(map)
        }
        Value::List(l) => Json::Array(
            l.borrow()
                .iter()
                .enumerate()
                .map(|(i, item)| render(item, &at.with_child(ElementSelector::Index(i)), seen))
                .collect(),
        ),
        Value::Map(m) => {
            let mut map = JsonMap::new();
            for (key, entry) in m.borrow().iter() {
                let path = at.with_child(ElementSelector::key(key.clone()));
                map.insert(key.clone(), render(entry, &path, seen));
            }
            Json::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_convert() {
        let v = from_json(&json!({"a": 1, "b": 2.5, "c": "x", "d": true, "e": null})).unwrap();
        assert_eq!(v.field("a"), Value::Integer(1));
        assert_eq!(v.field("b"), Value::Float(2.5));
        assert_eq!(v.field("c"), Value::from("x"));
        assert_eq!(v.field("d"), Value::Bool(true));
        assert!(v.field("e").is_null());
        assert_eq!(v.value_type(), crate::ValueType::Record(OBJECT_TYPE.into()));
    }

    #[test]
    fn self_reference_creates_cycle() {
        let v = from_json(&json!({"name": "foo", "child": {"$ref": "/"}})).unwrap();
        assert!(v.field("child").same_object(&v));
    }

    #[test]
    fn reference_inside_array() {
        let v = from_json(&json!({
            "shared": {"id": 7},
            "items": [{"$ref": "/shared"}, {"$ref": "/shared"}]
        }))
        .unwrap();
        let shared = v.field("shared");
        let items = v.field("items");
        assert!(items.item(0).same_object(&shared));
        assert!(items.item(1).same_object(&shared));
    }

    #[test]
    fn chained_references_resolve() {
        let v = from_json(&json!({
            "a": {"$ref": "/b/inner"},
            "b": {"inner": {"$ref": "/c"}},
            "c": {"leaf": 1}
        }))
        .unwrap();
        assert!(v.field("a").same_object(&v.field("c")));
    }

    #[test]
    fn references_address_keys_with_delimiters() {
        let doc = json!({"a/b": {"v": 1}, "": {"w": 2}, "c": {"$ref": "/a~1b"}, "d": {"$ref": "/~e"}});
        let v = from_json(&doc).unwrap();
        assert!(v.field("c").same_object(&v.field("a/b")));
        assert!(v.field("d").same_object(&v.field("")));
        assert_eq!(to_json(&v), doc);
    }

    #[test]
    fn dangling_reference_is_an_error() {
        let err = from_json(&json!({"a": {"$ref": "/missing"}})).unwrap_err();
        assert!(matches!(err, TypeError::UnresolvedReference { .. }));
    }

    #[test]
    fn reference_to_scalar_is_an_error() {
        let err = from_json(&json!({"n": 1, "a": {"$ref": "/n"}})).unwrap_err();
        assert_eq!(err, TypeError::ReferenceToScalar("/n".into()));
    }

    #[test]
    fn root_reference_is_rejected() {
        assert!(from_json(&json!({"$ref": "/"})).is_err());
    }

    #[test]
    fn to_json_emits_refs_for_cycles() {
        let v = from_json(&json!({"name": "foo", "child": {"$ref": "/"}})).unwrap();
        let out = to_json(&v);
        assert_eq!(out, json!({"name": "foo", "child": {"$ref": "/"}}));
    }

    #[test]
    fn resolve_walks_mixed_paths() {
        let v = from_json(&json!({"items": [{"name": "x"}]})).unwrap();
        let path: NodePath = "/items[0]/name".parse().unwrap();
        assert_eq!(resolve(&v, &path), Value::from("x"));
        let missing: NodePath = "/items[4]/name".parse().unwrap();
        assert!(resolve(&v, &missing).is_null());
    }
}
