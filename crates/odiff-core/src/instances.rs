use odiff_types::{ElementSelector, Value, ValueType};

use crate::accessor::Accessor;

/// The working and base values at one location, plus their shared type.
///
/// The type is taken from whichever side is non-null; two non-null sides of
/// incompatible types yield [`ValueType::Any`].
#[derive(Clone, Debug)]
pub struct Instances {
    element: ElementSelector,
    working: Value,
    base: Value,
    value_type: ValueType,
}

impl Instances {
    /// Top-level pair, addressed by the root selector.
    pub fn of(working: Value, base: Value) -> Self {
        Self::new(ElementSelector::Root, working, base)
    }

    fn new(element: ElementSelector, working: Value, base: Value) -> Self {
        let value_type = ValueType::common(&working.value_type(), &base.value_type());
        Self {
            element,
            working,
            base,
            value_type,
        }
    }

    /// Apply `accessor` to both sides.
    pub fn access(&self, accessor: &dyn Accessor) -> Instances {
        Self::new(
            accessor.element(),
            accessor.get(&self.working),
            accessor.get(&self.base),
        )
    }

    /// The selector of the accessor that produced this pair.
    pub fn element(&self) -> &ElementSelector {
        &self.element
    }

    pub fn working(&self) -> &Value {
        &self.working
    }

    pub fn base(&self) -> &Value {
        &self.base
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// Both sides are null.
    pub fn are_null(&self) -> bool {
        self.working.is_null() && self.base.is_null()
    }

    /// Only the working side has a value.
    pub fn has_been_added(&self) -> bool {
        !self.working.is_null() && self.base.is_null()
    }

    /// Only the base side has a value.
    pub fn has_been_removed(&self) -> bool {
        self.working.is_null() && !self.base.is_null()
    }

    /// Both sides are the same container, or both are null.
    pub fn are_same(&self) -> bool {
        self.are_null() || self.working.same_object(&self.base)
    }

    /// Both sides are structurally equal.
    pub fn are_equal(&self) -> bool {
        self.working.deep_equals(&self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessor::PropertyAccessor;
    use odiff_types::Record;

    #[test]
    fn type_comes_from_non_null_side() {
        let added = Instances::of(Value::from("x"), Value::Null);
        assert_eq!(added.value_type(), &ValueType::Text);
        assert!(added.has_been_added());

        let removed = Instances::of(Value::Null, Value::from(1));
        assert_eq!(removed.value_type(), &ValueType::Integer);
        assert!(removed.has_been_removed());
    }

    #[test]
    fn both_null_pair() {
        let pair = Instances::of(Value::Null, Value::Null);
        assert!(pair.are_null());
        assert!(pair.are_same());
        assert_eq!(pair.value_type(), &ValueType::Null);
    }

    #[test]
    fn access_projects_both_sides() {
        let w = Value::record(Record::new("T").with_field("a", 1));
        let b = Value::record(Record::new("T").with_field("a", 2));
        let pair = Instances::of(w, b).access(&PropertyAccessor::new("a"));
        assert_eq!(pair.working(), &Value::from(1));
        assert_eq!(pair.base(), &Value::from(2));
        assert_eq!(pair.element(), &ElementSelector::property("a"));
        assert!(!pair.are_equal());
    }

    #[test]
    fn mismatched_types_collapse_to_any() {
        let pair = Instances::of(Value::from(1), Value::from("1"));
        assert_eq!(pair.value_type(), &ValueType::Any);
    }
}
