//! References
//!
//! A reference is the result of evaluating an identifier or a property
//! access: a resolved name that can later be read (GetValue) or written
//! (PutValue). Those two operations live on the interpreter because they
//! may run guest accessors.

use crate::environment::EnvId;
use crate::value::{CheapClone, JsString, JsValue, PropertyKey};

/// What a reference resolved against.
#[derive(Debug, Clone)]
pub enum ReferenceBase {
    /// A binding in an environment record.
    Environment(EnvId),
    /// A property of a value (possibly a primitive).
    Value(JsValue),
    /// Name lookup reached the end of the environment chain.
    Unresolvable,
}

/// A resolved name.
#[derive(Debug, Clone)]
pub struct Reference {
    pub base: ReferenceBase,
    pub name: PropertyKey,
    pub strict: bool,
    /// Receiver for `super.x` references.
    pub this_value: Option<JsValue>,
}

impl Reference {
    pub fn environment(env: EnvId, name: JsString, strict: bool) -> Self {
        Reference {
            base: ReferenceBase::Environment(env),
            name: PropertyKey::String(name),
            strict,
            this_value: None,
        }
    }

    pub fn unresolvable(name: JsString, strict: bool) -> Self {
        Reference {
            base: ReferenceBase::Unresolvable,
            name: PropertyKey::String(name),
            strict,
            this_value: None,
        }
    }

    pub fn property(base: JsValue, name: PropertyKey, strict: bool) -> Self {
        Reference {
            base: ReferenceBase::Value(base),
            name,
            strict,
            this_value: None,
        }
    }

    pub fn is_unresolvable(&self) -> bool {
        matches!(self.base, ReferenceBase::Unresolvable)
    }

    pub fn is_property_reference(&self) -> bool {
        matches!(self.base, ReferenceBase::Value(_))
    }

    pub fn is_super_reference(&self) -> bool {
        self.this_value.is_some()
    }

    /// GetThisValue: the receiver used for property reads and calls.
    pub fn this_value(&self) -> JsValue {
        if let Some(this) = &self.this_value {
            return this.cheap_clone();
        }
        match &self.base {
            ReferenceBase::Value(v) => v.cheap_clone(),
            _ => JsValue::Undefined,
        }
    }

    /// The referenced name as a string, for binding lookups and messages.
    pub fn name_string(&self) -> JsString {
        match &self.name {
            PropertyKey::String(s) => s.cheap_clone(),
            PropertyKey::Symbol(sym) => sym.descriptive_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_reference_this_value() {
        let r = Reference::property(JsValue::Number(1.0), PropertyKey::from("x"), false);
        assert!(r.is_property_reference());
        assert!(!r.is_super_reference());
        assert_eq!(r.this_value(), JsValue::Number(1.0));
    }

    #[test]
    fn test_super_reference_uses_receiver() {
        let mut r = Reference::property(JsValue::Null, PropertyKey::from("x"), true);
        r.this_value = Some(JsValue::Boolean(true));
        assert!(r.is_super_reference());
        assert_eq!(r.this_value(), JsValue::Boolean(true));
    }

    #[test]
    fn test_unresolvable() {
        let r = Reference::unresolvable(JsString::from("missing"), true);
        assert!(r.is_unresolvable());
        assert_eq!(r.name_string(), JsString::from("missing"));
        assert_eq!(r.this_value(), JsValue::Undefined);
    }
}
