//! Abstract operations
//!
//! The object internal methods ([[Get]], [[Set]], [[DefineOwnProperty]], ...)
//! including the exotic behavior of arrays, string wrappers and module
//! namespaces, type conversions, the operators and the iterator protocol.
//! Anything here may call back into guest code through accessors, so all
//! of it threads `&mut Interpreter`.

use std::cmp::Ordering;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};

use crate::ast::{BinaryOp, UnaryOp};
use crate::completion::Completion;
use crate::error::{JsError, JsResult};
use crate::object::{JsObject, ObjectKind, Property, PropertyDescriptor};
use crate::value::{
    CheapClone, JsString, JsValue, ObjectId, PropertyKey, number_to_string,
    string_to_number, to_int32, to_uint32,
};

use super::Interpreter;

/// A `next` method bound to its iterator, plus whether it is exhausted.
#[derive(Debug, Clone)]
pub struct IteratorRecord {
    pub(crate) iterator: JsValue,
    pub(crate) next_method: JsValue,
    pub(crate) done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IteratorHint {
    Sync,
    Async,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PreferredType {
    Default,
    Number,
    String,
}

/// A Number or a BigInt, the result of ToNumeric.
#[derive(Debug, Clone)]
pub(crate) enum Numeric {
    Number(f64),
    BigInt(Rc<BigInt>),
}

fn mixed_bigint_error() -> JsError {
    JsError::type_error("Cannot mix BigInt and other types, use explicit conversions")
}

/// The own properties of a String wrapper that live in its primitive value.
fn string_own_property(s: &JsString, key: &PropertyKey) -> Option<Property> {
    let name = key.as_string()?;
    if name.eq_str("length") {
        return Some(Property::data(JsValue::from(s.len() as u32), false, false, false));
    }
    let index = name.as_array_index()? as usize;
    let unit = s.unit_at(index)?;
    Some(Property::data(
        JsValue::String(JsString::from_units(vec![unit])),
        false,
        true,
        false,
    ))
}

fn is_length_key(key: &PropertyKey) -> bool {
    key.as_string().is_some_and(|s| s.eq_str("length"))
}

/// OrdinaryOwnPropertyKeys: array indices ascending, then strings, then
/// symbols, each in creation order.
fn ordered_keys<'a>(keys: impl Iterator<Item = &'a PropertyKey>) -> Vec<PropertyKey> {
    let mut indices = Vec::new();
    let mut strings = Vec::new();
    let mut symbols = Vec::new();
    for key in keys {
        match key {
            PropertyKey::String(s) => match s.as_array_index() {
                Some(index) => indices.push((index, key.cheap_clone())),
                None => strings.push(key.cheap_clone()),
            },
            PropertyKey::Symbol(_) => symbols.push(key.cheap_clone()),
        }
    }
    indices.sort_by_key(|(index, _)| *index);
    let mut out: Vec<PropertyKey> = indices.into_iter().map(|(_, key)| key).collect();
    out.extend(strings);
    out.extend(symbols);
    out
}

/// StringToBigInt; `None` when the text is not a valid integer literal.
pub(crate) fn string_to_bigint(s: &JsString) -> Option<BigInt> {
    let text = s.to_rust_string();
    let text = text.trim();
    if text.is_empty() {
        return Some(BigInt::zero());
    }
    let lowered = text.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lowered.strip_prefix(prefix) {
            return BigInt::parse_bytes(digits.as_bytes(), radix);
        }
    }
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = BigInt::parse_bytes(digits.as_bytes(), 10)?;
    Some(if negative { -value } else { value })
}

fn compare_bigint_number(b: &BigInt, n: f64) -> Option<Ordering> {
    if n.is_nan() {
        return None;
    }
    if n == f64::INFINITY {
        return Some(Ordering::Less);
    }
    if n == f64::NEG_INFINITY {
        return Some(Ordering::Greater);
    }
    let floor = n.floor();
    let whole = BigInt::from_f64(floor)?;
    match b.cmp(&whole) {
        Ordering::Equal if floor < n => Some(Ordering::Less),
        ordering => Some(ordering),
    }
}

fn number_power(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        return f64::NAN;
    }
    base.powf(exponent)
}

impl Interpreter {
    // ═══════════════════════════════════════════════════════════════════════
    // Object internal methods
    // ═══════════════════════════════════════════════════════════════════════

    /// [[GetOwnProperty]]
    pub(crate) fn get_own_property(
        &mut self,
        id: ObjectId,
        key: &PropertyKey,
    ) -> JsResult<Option<Property>> {
        match &self.heap.get(id).kind {
            ObjectKind::Array { length } if is_length_key(key) => {
                return Ok(Some(Property::data(JsValue::from(*length), true, false, false)));
            }
            ObjectKind::Primitive(JsValue::String(s)) => {
                if let Some(prop) = string_own_property(s, key) {
                    return Ok(Some(prop));
                }
            }
            ObjectKind::ModuleNamespace(module) => {
                let module = *module;
                if let PropertyKey::String(name) = key {
                    return self.namespace_get_own_property(module, name);
                }
            }
            _ => {}
        }
        Ok(self.heap.get(id).properties.get(key).cloned())
    }

    /// [[DefineOwnProperty]]
    pub(crate) fn define_own_property(
        &mut self,
        id: ObjectId,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> JsResult<bool> {
        match self.heap.get(id).kind {
            ObjectKind::ModuleNamespace(_) => return Ok(false),
            ObjectKind::Array { length } => {
                if is_length_key(&key) {
                    return self.array_set_length(id, desc);
                }
                if let Some(index) = key.as_array_index() {
                    if !self.validate_and_apply(id, key, desc) {
                        return Ok(false);
                    }
                    if index >= length
                        && let ObjectKind::Array { length } = &mut self.heap.get_mut(id).kind
                    {
                        *length = index + 1;
                    }
                    return Ok(true);
                }
            }
            _ => {}
        }
        Ok(self.validate_and_apply(id, key, desc))
    }

    /// ValidateAndApplyPropertyDescriptor on the stored property table.
    fn validate_and_apply(&mut self, id: ObjectId, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        let object = self.heap.get_mut(id);
        let Some(current) = object.properties.get(&key).cloned() else {
            if !object.extensible {
                return false;
            }
            let enumerable = desc.enumerable.unwrap_or(false);
            let configurable = desc.configurable.unwrap_or(false);
            let prop = if desc.is_accessor() {
                Property::Accessor {
                    get: desc.get.as_ref().and_then(JsValue::as_object),
                    set: desc.set.as_ref().and_then(JsValue::as_object),
                    enumerable,
                    configurable,
                }
            } else {
                Property::data(
                    desc.value.unwrap_or_default(),
                    desc.writable.unwrap_or(false),
                    enumerable,
                    configurable,
                )
            };
            object.properties.insert(key, prop);
            return true;
        };

        if !current.configurable() {
            if desc.configurable == Some(true) {
                return false;
            }
            if desc.enumerable.is_some_and(|e| e != current.enumerable()) {
                return false;
            }
            let current_is_accessor = matches!(current, Property::Accessor { .. });
            if !desc.is_generic() && desc.is_accessor() != current_is_accessor {
                return false;
            }
            match &current {
                Property::Accessor { get, set, .. } => {
                    let same = |slot: &Option<ObjectId>, new: &Option<JsValue>| match new {
                        Some(value) => value.as_object() == *slot,
                        None => true,
                    };
                    if !same(get, &desc.get) || !same(set, &desc.set) {
                        return false;
                    }
                }
                Property::Data {
                    value, writable, ..
                } => {
                    if !*writable {
                        if desc.writable == Some(true) {
                            return false;
                        }
                        if desc.value.as_ref().is_some_and(|v| !v.same_value(value)) {
                            return false;
                        }
                    }
                }
            }
        }

        let enumerable = desc.enumerable.unwrap_or(current.enumerable());
        let configurable = desc.configurable.unwrap_or(current.configurable());
        let updated = match current {
            Property::Data {
                value, writable, ..
            } if !desc.is_accessor() => Property::data(
                desc.value.unwrap_or(value),
                desc.writable.unwrap_or(writable),
                enumerable,
                configurable,
            ),
            Property::Accessor { get, set, .. } if !desc.is_data() => Property::Accessor {
                get: desc.get.map_or(get, |g| g.as_object()),
                set: desc.set.map_or(set, |s| s.as_object()),
                enumerable,
                configurable,
            },
            Property::Data { .. } => Property::Accessor {
                get: desc.get.as_ref().and_then(JsValue::as_object),
                set: desc.set.as_ref().and_then(JsValue::as_object),
                enumerable,
                configurable,
            },
            Property::Accessor { .. } => Property::data(
                desc.value.unwrap_or_default(),
                desc.writable.unwrap_or(false),
                enumerable,
                configurable,
            ),
        };
        object.properties.insert(key, updated);
        true
    }

    /// ArraySetLength
    fn array_set_length(&mut self, id: ObjectId, desc: PropertyDescriptor) -> JsResult<bool> {
        let Some(value) = desc.value else {
            return Ok(desc.configurable != Some(true) && desc.enumerable != Some(true));
        };
        let number = self.to_number(&value)?;
        let new_length = to_uint32(number);
        if f64::from(new_length) != number {
            return Err(JsError::range_error("Invalid array length"));
        }
        let old_length = self.array_length(id);
        if new_length < old_length {
            let doomed: Vec<PropertyKey> = self
                .heap
                .get(id)
                .properties
                .keys()
                .filter(|k| k.as_array_index().is_some_and(|i| i >= new_length))
                .cloned()
                .collect();
            let props = &mut self.heap.get_mut(id).properties;
            for key in doomed {
                props.shift_remove(&key);
            }
        }
        if let ObjectKind::Array { length } = &mut self.heap.get_mut(id).kind {
            *length = new_length;
        }
        Ok(true)
    }

    pub(crate) fn array_length(&self, id: ObjectId) -> u32 {
        match self.heap.get(id).kind {
            ObjectKind::Array { length } => length,
            _ => 0,
        }
    }

    /// [[HasProperty]]
    pub(crate) fn has_property(&mut self, id: ObjectId, key: &PropertyKey) -> JsResult<bool> {
        let mut current = id;
        loop {
            if self.get_own_property(current, key)?.is_some() {
                return Ok(true);
            }
            match self.heap.get(current).prototype {
                Some(proto) => current = proto,
                None => return Ok(false),
            }
        }
    }

    pub(crate) fn has_own_property(&mut self, id: ObjectId, key: &PropertyKey) -> JsResult<bool> {
        Ok(self.get_own_property(id, key)?.is_some())
    }

    /// [[Get]]
    pub(crate) fn get(&mut self, id: ObjectId, key: &PropertyKey, receiver: JsValue) -> JsResult<JsValue> {
        let mut current = id;
        loop {
            if let Some(prop) = self.get_own_property(current, key)? {
                return match prop {
                    Property::Data { value, .. } => Ok(value),
                    Property::Accessor { get: Some(getter), .. } => {
                        self.call(&JsValue::Object(getter), receiver, &[])
                    }
                    Property::Accessor { get: None, .. } => Ok(JsValue::Undefined),
                };
            }
            match self.heap.get(current).prototype {
                Some(proto) => current = proto,
                None => return Ok(JsValue::Undefined),
            }
        }
    }

    /// [[Set]] (OrdinarySet)
    pub(crate) fn set(
        &mut self,
        id: ObjectId,
        key: PropertyKey,
        value: JsValue,
        receiver: JsValue,
    ) -> JsResult<bool> {
        let mut current = id;
        let own = loop {
            if matches!(self.heap.get(current).kind, ObjectKind::ModuleNamespace(_)) {
                return Ok(false);
            }
            if let Some(prop) = self.get_own_property(current, &key)? {
                break prop;
            }
            match self.heap.get(current).prototype {
                Some(proto) => current = proto,
                None => break Property::plain(JsValue::Undefined),
            }
        };
        match own {
            Property::Data { writable, .. } => {
                if !writable {
                    return Ok(false);
                }
                let JsValue::Object(receiver) = receiver else {
                    return Ok(false);
                };
                match self.get_own_property(receiver, &key)? {
                    Some(Property::Accessor { .. }) => Ok(false),
                    Some(Property::Data { writable: false, .. }) => Ok(false),
                    Some(Property::Data { .. }) => self.define_own_property(
                        receiver,
                        key,
                        PropertyDescriptor {
                            value: Some(value),
                            ..PropertyDescriptor::default()
                        },
                    ),
                    None => self.create_data_property(receiver, key, value),
                }
            }
            Property::Accessor { set: Some(setter), .. } => {
                self.call(&JsValue::Object(setter), receiver, &[value])?;
                Ok(true)
            }
            Property::Accessor { set: None, .. } => Ok(false),
        }
    }

    /// [[Delete]]
    pub(crate) fn delete(&mut self, id: ObjectId, key: &PropertyKey) -> JsResult<bool> {
        match &self.heap.get(id).kind {
            ObjectKind::ModuleNamespace(module) => {
                let module = *module;
                return Ok(match key {
                    PropertyKey::String(name) => !self.namespace_exports(module).contains(name),
                    PropertyKey::Symbol(_) => self.heap.get(id).properties.get(key).is_none(),
                });
            }
            ObjectKind::Array { .. } if is_length_key(key) => return Ok(false),
            ObjectKind::Primitive(JsValue::String(s)) if string_own_property(s, key).is_some() => {
                return Ok(false);
            }
            _ => {}
        }
        let props = &mut self.heap.get_mut(id).properties;
        match props.get(key) {
            None => Ok(true),
            Some(prop) if prop.configurable() => {
                props.shift_remove(key);
                Ok(true)
            }
            Some(_) => Ok(false),
        }
    }

    /// [[OwnPropertyKeys]]
    pub(crate) fn own_property_keys(&mut self, id: ObjectId) -> Vec<PropertyKey> {
        let object = self.heap.get(id);
        match &object.kind {
            ObjectKind::ModuleNamespace(module) => {
                let module = *module;
                let mut keys: Vec<PropertyKey> = self
                    .namespace_exports(module)
                    .into_iter()
                    .map(PropertyKey::String)
                    .collect();
                let symbols = self.heap.get(id).properties.keys().filter(|k| matches!(k, PropertyKey::Symbol(_)));
                keys.extend(symbols.cloned());
                keys
            }
            ObjectKind::Array { .. } => {
                let mut keys = ordered_keys(object.properties.keys());
                let split = keys.iter().take_while(|k| k.as_array_index().is_some()).count();
                keys.insert(split, PropertyKey::from("length"));
                keys
            }
            ObjectKind::Primitive(JsValue::String(s)) => {
                let mut keys: Vec<PropertyKey> = (0..s.len()).map(PropertyKey::from).collect();
                keys.extend(ordered_keys(object.properties.keys()));
                keys.push(PropertyKey::from("length"));
                keys
            }
            _ => ordered_keys(object.properties.keys()),
        }
    }

    /// [[PreventExtensions]]
    pub(crate) fn prevent_extensions(&mut self, id: ObjectId) {
        self.heap.get_mut(id).extensible = false;
    }

    /// OrdinarySetPrototypeOf: false when the object is not extensible or
    /// the new chain would contain the object itself.
    pub(crate) fn set_prototype_of(&mut self, id: ObjectId, proto: Option<ObjectId>) -> bool {
        let object = self.heap.get(id);
        if object.prototype == proto {
            return true;
        }
        if !object.extensible {
            return false;
        }
        let mut current = proto;
        while let Some(p) = current {
            if p == id {
                return false;
            }
            current = self.heap.get(p).prototype;
        }
        self.heap.get_mut(id).prototype = proto;
        true
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Operations on objects
    // ═══════════════════════════════════════════════════════════════════════

    /// CreateDataProperty
    pub(crate) fn create_data_property(
        &mut self,
        id: ObjectId,
        key: PropertyKey,
        value: JsValue,
    ) -> JsResult<bool> {
        self.define_own_property(id, key, PropertyDescriptor::data(value, true, true, true))
    }

    /// CreateDataPropertyOrThrow
    pub(crate) fn create_data_property_or_throw(
        &mut self,
        id: ObjectId,
        key: PropertyKey,
        value: JsValue,
    ) -> JsResult<()> {
        let shown = key.to_string();
        if self.create_data_property(id, key, value)? {
            Ok(())
        } else {
            Err(JsError::type_error(format!("Cannot define property {shown}")))
        }
    }

    /// DefinePropertyOrThrow
    pub(crate) fn define_property_or_throw(
        &mut self,
        id: ObjectId,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> JsResult<()> {
        let shown = key.to_string();
        if self.define_own_property(id, key, desc)? {
            Ok(())
        } else {
            Err(JsError::type_error(format!("Cannot redefine property: {shown}")))
        }
    }

    /// Set(O, P, V, Throw)
    pub(crate) fn set_property(
        &mut self,
        id: ObjectId,
        key: PropertyKey,
        value: JsValue,
        throw: bool,
    ) -> JsResult<()> {
        let shown = key.to_string();
        let ok = self.set(id, key, value, JsValue::Object(id))?;
        if !ok && throw {
            return Err(JsError::type_error(format!(
                "Cannot assign to read only property '{shown}' of object"
            )));
        }
        Ok(())
    }

    /// GetV: property access on any value, boxing primitives.
    pub(crate) fn get_v(&mut self, value: &JsValue, key: &PropertyKey) -> JsResult<JsValue> {
        match value {
            JsValue::Object(id) => self.get(*id, key, value.cheap_clone()),
            JsValue::Undefined | JsValue::Null => Err(JsError::type_error(format!(
                "Cannot read properties of {} (reading '{key}')",
                if value.is_undefined() { "undefined" } else { "null" }
            ))),
            _ => {
                if let JsValue::String(s) = value
                    && let Some(Property::Data { value, .. }) = string_own_property(s, key)
                {
                    return Ok(value);
                }
                let proto = self.primitive_prototype(value)?;
                self.get(proto, key, value.cheap_clone())
            }
        }
    }

    /// Convenience for string-keyed reads.
    pub(crate) fn get_named(&mut self, value: &JsValue, name: &str) -> JsResult<JsValue> {
        let key = self.key(name);
        self.get_v(value, &key)
    }

    /// GetMethod: `None` when the property is undefined or null.
    pub(crate) fn get_method(&mut self, value: &JsValue, key: &PropertyKey) -> JsResult<Option<JsValue>> {
        let func = self.get_v(value, key)?;
        if func.is_null_or_undefined() {
            return Ok(None);
        }
        if !self.is_callable(&func) {
            return Err(JsError::type_error(format!("{key} is not a function")));
        }
        Ok(Some(func))
    }

    /// Invoke: call the method `name` of `value`.
    pub(crate) fn invoke(&mut self, value: &JsValue, name: &str, args: &[JsValue]) -> JsResult<JsValue> {
        let func = self.get_named(value, name)?;
        if !self.is_callable(&func) {
            return Err(JsError::type_error(format!("{name} is not a function")));
        }
        self.call(&func, value.cheap_clone(), args)
    }

    pub(crate) fn is_callable(&self, value: &JsValue) -> bool {
        match value {
            JsValue::Object(id) => self.heap.get(*id).is_callable(),
            _ => false,
        }
    }

    pub(crate) fn is_constructor(&self, value: &JsValue) -> bool {
        let JsValue::Object(id) = value else {
            return false;
        };
        match &self.heap.get(*id).kind {
            ObjectKind::Function(data) => data.node.is_constructor(),
            ObjectKind::Native(native) => native.constructor,
            ObjectKind::Bound(bound) => self.is_constructor(&JsValue::Object(bound.target)),
            _ => false,
        }
    }

    /// IsArray
    pub(crate) fn is_array(&self, value: &JsValue) -> bool {
        value.as_object().is_some_and(|id| self.heap.get(id).is_array())
    }

    /// LengthOfArrayLike
    pub(crate) fn length_of_array_like(&mut self, id: ObjectId) -> JsResult<u64> {
        if let ObjectKind::Array { length } = self.heap.get(id).kind {
            return Ok(u64::from(length));
        }
        let length = self.get_named(&JsValue::Object(id), "length")?;
        self.to_length(&length)
    }

    /// CreateListFromArrayLike
    pub(crate) fn list_from_array_like(&mut self, value: &JsValue) -> JsResult<Vec<JsValue>> {
        let JsValue::Object(id) = value else {
            return Err(JsError::type_error("CreateListFromArrayLike called on non-object"));
        };
        let length = self.length_of_array_like(*id)?;
        let mut out = Vec::with_capacity(length.min(1 << 16) as usize);
        for index in 0..length {
            let key = PropertyKey::from(index as usize);
            out.push(self.get(*id, &key, value.cheap_clone())?);
        }
        Ok(out)
    }

    /// The prototype used to look up properties of a primitive.
    pub(crate) fn primitive_prototype(&self, value: &JsValue) -> JsResult<ObjectId> {
        let intrinsics = self.intrinsics();
        match value {
            JsValue::Boolean(_) => Ok(intrinsics.boolean_prototype),
            JsValue::Number(_) => Ok(intrinsics.number_prototype),
            JsValue::String(_) => Ok(intrinsics.string_prototype),
            JsValue::Symbol(_) => Ok(intrinsics.symbol_prototype),
            JsValue::BigInt(_) => Ok(intrinsics.bigint_prototype),
            JsValue::Object(id) => Ok(*id),
            JsValue::Undefined | JsValue::Null => {
                Err(JsError::type_error("Cannot convert undefined or null to object"))
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Type conversions
    // ═══════════════════════════════════════════════════════════════════════

    /// ToObject
    pub(crate) fn to_object(&mut self, value: &JsValue) -> JsResult<ObjectId> {
        if let JsValue::Object(id) = value {
            return Ok(*id);
        }
        let proto = self.primitive_prototype(value)?;
        Ok(self.alloc(JsObject::new(
            Some(proto),
            ObjectKind::Primitive(value.cheap_clone()),
        )))
    }

    /// ToPrimitive
    pub(crate) fn to_primitive(&mut self, value: &JsValue, hint: PreferredType) -> JsResult<JsValue> {
        if !value.is_object() {
            return Ok(value.cheap_clone());
        }
        let key = PropertyKey::Symbol(self.symbols.to_primitive.cheap_clone());
        if let Some(exotic) = self.get_method(value, &key)? {
            let hint = match hint {
                PreferredType::Default => "default",
                PreferredType::Number => "number",
                PreferredType::String => "string",
            };
            let result = self.call(&exotic, value.cheap_clone(), &[JsValue::from(hint)])?;
            if result.is_object() {
                return Err(JsError::type_error("Cannot convert object to primitive value"));
            }
            return Ok(result);
        }
        let order = if hint == PreferredType::String {
            ["toString", "valueOf"]
        } else {
            ["valueOf", "toString"]
        };
        for name in order {
            let method = self.get_named(value, name)?;
            if self.is_callable(&method) {
                let result = self.call(&method, value.cheap_clone(), &[])?;
                if !result.is_object() {
                    return Ok(result);
                }
            }
        }
        Err(JsError::type_error("Cannot convert object to primitive value"))
    }

    /// ToNumber
    pub(crate) fn to_number(&mut self, value: &JsValue) -> JsResult<f64> {
        match value {
            JsValue::Undefined => Ok(f64::NAN),
            JsValue::Null => Ok(0.0),
            JsValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            JsValue::Number(n) => Ok(*n),
            JsValue::String(s) => Ok(string_to_number(s)),
            JsValue::Symbol(_) => Err(JsError::type_error("Cannot convert a Symbol value to a number")),
            JsValue::BigInt(_) => Err(JsError::type_error("Cannot convert a BigInt value to a number")),
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::Number)?;
                self.to_number(&prim)
            }
        }
    }

    /// ToNumeric
    pub(crate) fn to_numeric(&mut self, value: &JsValue) -> JsResult<Numeric> {
        let prim = self.to_primitive(value, PreferredType::Number)?;
        match prim {
            JsValue::BigInt(b) => Ok(Numeric::BigInt(b)),
            other => Ok(Numeric::Number(self.to_number(&other)?)),
        }
    }

    /// ToString
    pub(crate) fn to_string(&mut self, value: &JsValue) -> JsResult<JsString> {
        match value {
            JsValue::Undefined => Ok(self.intern("undefined")),
            JsValue::Null => Ok(self.intern("null")),
            JsValue::Boolean(b) => Ok(self.intern(if *b { "true" } else { "false" })),
            JsValue::Number(n) => Ok(JsString::from(number_to_string(*n))),
            JsValue::BigInt(b) => Ok(JsString::from(b.to_string())),
            JsValue::String(s) => Ok(s.cheap_clone()),
            JsValue::Symbol(_) => Err(JsError::type_error("Cannot convert a Symbol value to a string")),
            JsValue::Object(_) => {
                let prim = self.to_primitive(value, PreferredType::String)?;
                self.to_string(&prim)
            }
        }
    }

    /// ToPropertyKey
    pub(crate) fn to_property_key(&mut self, value: &JsValue) -> JsResult<PropertyKey> {
        match value {
            JsValue::String(s) => Ok(PropertyKey::String(s.cheap_clone())),
            JsValue::Symbol(sym) => Ok(PropertyKey::Symbol(sym.cheap_clone())),
            _ => {
                let prim = self.to_primitive(value, PreferredType::String)?;
                match prim {
                    JsValue::Symbol(sym) => Ok(PropertyKey::Symbol(sym)),
                    other => Ok(PropertyKey::String(self.to_string(&other)?)),
                }
            }
        }
    }

    /// ToIntegerOrInfinity
    pub(crate) fn to_integer_or_infinity(&mut self, value: &JsValue) -> JsResult<f64> {
        let n = self.to_number(value)?;
        if n.is_nan() || n == 0.0 {
            return Ok(0.0);
        }
        Ok(n.trunc())
    }

    /// ToLength
    pub(crate) fn to_length(&mut self, value: &JsValue) -> JsResult<u64> {
        let n = self.to_integer_or_infinity(value)?;
        if n <= 0.0 {
            return Ok(0);
        }
        Ok(n.min(9_007_199_254_740_991.0) as u64)
    }

    /// The result of the `typeof` operator.
    pub(crate) fn type_of(&self, value: &JsValue) -> &'static str {
        match value {
            JsValue::Undefined => "undefined",
            JsValue::Null => "object",
            JsValue::Boolean(_) => "boolean",
            JsValue::Number(_) => "number",
            JsValue::BigInt(_) => "bigint",
            JsValue::String(_) => "string",
            JsValue::Symbol(_) => "symbol",
            JsValue::Object(id) if self.heap.get(*id).is_callable() => "function",
            JsValue::Object(_) => "object",
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Operators
    // ═══════════════════════════════════════════════════════════════════════

    /// ApplyStringOrNumericBinaryOperator and the relational operators.
    pub(crate) fn apply_binary(&mut self, op: BinaryOp, left: JsValue, right: JsValue) -> JsResult<JsValue> {
        match op {
            BinaryOp::Add => self.add_values(&left, &right),
            BinaryOp::Sub
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Exp
            | BinaryOp::BitAnd
            | BinaryOp::BitOr
            | BinaryOp::BitXor
            | BinaryOp::LShift
            | BinaryOp::RShift
            | BinaryOp::URShift => {
                let l = self.to_numeric(&left)?;
                let r = self.to_numeric(&right)?;
                match (l, r) {
                    (Numeric::Number(a), Numeric::Number(b)) => Ok(JsValue::Number(number_op(op, a, b))),
                    (Numeric::BigInt(a), Numeric::BigInt(b)) => bigint_op(op, &a, &b),
                    _ => Err(mixed_bigint_error()),
                }
            }
            BinaryOp::Eq => Ok(JsValue::Boolean(self.loosely_equal(&left, &right)?)),
            BinaryOp::NotEq => Ok(JsValue::Boolean(!self.loosely_equal(&left, &right)?)),
            BinaryOp::StrictEq => Ok(JsValue::Boolean(left.strict_equals(&right))),
            BinaryOp::StrictNotEq => Ok(JsValue::Boolean(!left.strict_equals(&right))),
            BinaryOp::Lt => Ok(JsValue::Boolean(self.is_less_than(&left, &right, true)? == Some(true))),
            BinaryOp::Gt => Ok(JsValue::Boolean(self.is_less_than(&right, &left, false)? == Some(true))),
            BinaryOp::LtEq => Ok(JsValue::Boolean(self.is_less_than(&right, &left, false)? == Some(false))),
            BinaryOp::GtEq => Ok(JsValue::Boolean(self.is_less_than(&left, &right, true)? == Some(false))),
            BinaryOp::In => {
                let JsValue::Object(target) = right else {
                    let shown = self.describe_value(&left);
                    return Err(JsError::type_error(format!(
                        "Cannot use 'in' operator to search for '{shown}' in a non-object"
                    )));
                };
                let key = self.to_property_key(&left)?;
                Ok(JsValue::Boolean(self.has_property(target, &key)?))
            }
            BinaryOp::Instanceof => Ok(JsValue::Boolean(self.instance_of(&left, &right)?)),
        }
    }

    fn add_values(&mut self, left: &JsValue, right: &JsValue) -> JsResult<JsValue> {
        if let (JsValue::Number(a), JsValue::Number(b)) = (left, right) {
            return Ok(JsValue::Number(a + b));
        }
        let lprim = self.to_primitive(left, PreferredType::Default)?;
        let rprim = self.to_primitive(right, PreferredType::Default)?;
        if matches!(lprim, JsValue::String(_)) || matches!(rprim, JsValue::String(_)) {
            let l = self.to_string(&lprim)?;
            let r = self.to_string(&rprim)?;
            return Ok(JsValue::String(l.concat(&r)));
        }
        match (self.to_numeric(&lprim)?, self.to_numeric(&rprim)?) {
            (Numeric::Number(a), Numeric::Number(b)) => Ok(JsValue::Number(a + b)),
            (Numeric::BigInt(a), Numeric::BigInt(b)) => Ok(JsValue::from(&*a + &*b)),
            _ => Err(mixed_bigint_error()),
        }
    }

    /// The unary operators other than `typeof` and `delete`.
    pub(crate) fn apply_unary(&mut self, op: UnaryOp, value: JsValue) -> JsResult<JsValue> {
        match op {
            UnaryOp::Not => Ok(JsValue::Boolean(!value.to_boolean())),
            UnaryOp::Void => Ok(JsValue::Undefined),
            UnaryOp::Plus => Ok(JsValue::Number(self.to_number(&value)?)),
            UnaryOp::Minus => match self.to_numeric(&value)? {
                Numeric::Number(n) => Ok(JsValue::Number(-n)),
                Numeric::BigInt(b) => Ok(JsValue::from(-&*b)),
            },
            UnaryOp::BitNot => match self.to_numeric(&value)? {
                Numeric::Number(n) => Ok(JsValue::from(!to_int32(n))),
                Numeric::BigInt(b) => Ok(JsValue::from(-&*b - 1)),
            },
            UnaryOp::Typeof | UnaryOp::Delete => {
                Err(JsError::internal("reference operator applied to a value"))
            }
        }
    }

    /// IsLooselyEqual
    pub(crate) fn loosely_equal(&mut self, x: &JsValue, y: &JsValue) -> JsResult<bool> {
        match (x, y) {
            (JsValue::Undefined | JsValue::Null, JsValue::Undefined | JsValue::Null) => Ok(true),
            (JsValue::Number(_), JsValue::Number(_))
            | (JsValue::String(_), JsValue::String(_))
            | (JsValue::Boolean(_), JsValue::Boolean(_))
            | (JsValue::BigInt(_), JsValue::BigInt(_))
            | (JsValue::Symbol(_), JsValue::Symbol(_))
            | (JsValue::Object(_), JsValue::Object(_)) => Ok(x.strict_equals(y)),
            (JsValue::Number(n), JsValue::String(s)) | (JsValue::String(s), JsValue::Number(n)) => {
                Ok(*n == string_to_number(s))
            }
            (JsValue::BigInt(b), JsValue::String(s)) | (JsValue::String(s), JsValue::BigInt(b)) => {
                Ok(string_to_bigint(s).is_some_and(|parsed| parsed == **b))
            }
            (JsValue::Boolean(b), other) | (other, JsValue::Boolean(b)) => {
                let n = JsValue::Number(if *b { 1.0 } else { 0.0 });
                self.loosely_equal(&n, other)
            }
            (JsValue::Object(_), JsValue::Undefined | JsValue::Null)
            | (JsValue::Undefined | JsValue::Null, JsValue::Object(_)) => Ok(false),
            (JsValue::Object(_), other) | (other, JsValue::Object(_)) => {
                let obj = if x.is_object() { x } else { y };
                let prim = self.to_primitive(obj, PreferredType::Default)?;
                self.loosely_equal(&prim, other)
            }
            (JsValue::BigInt(b), JsValue::Number(n)) | (JsValue::Number(n), JsValue::BigInt(b)) => {
                Ok(compare_bigint_number(b, *n) == Some(Ordering::Equal))
            }
            _ => Ok(false),
        }
    }

    /// IsLessThan; `None` stands for undefined (a NaN was involved).
    fn is_less_than(&mut self, x: &JsValue, y: &JsValue, left_first: bool) -> JsResult<Option<bool>> {
        let (px, py) = if left_first {
            let px = self.to_primitive(x, PreferredType::Number)?;
            let py = self.to_primitive(y, PreferredType::Number)?;
            (px, py)
        } else {
            let py = self.to_primitive(y, PreferredType::Number)?;
            let px = self.to_primitive(x, PreferredType::Number)?;
            (px, py)
        };
        match (&px, &py) {
            (JsValue::String(a), JsValue::String(b)) => return Ok(Some(a < b)),
            (JsValue::BigInt(a), JsValue::String(b)) => {
                return Ok(string_to_bigint(b).map(|b| **a < b));
            }
            (JsValue::String(a), JsValue::BigInt(b)) => {
                return Ok(string_to_bigint(a).map(|a| a < **b));
            }
            _ => {}
        }
        let nx = self.to_numeric(&px)?;
        let ny = self.to_numeric(&py)?;
        Ok(match (nx, ny) {
            (Numeric::Number(a), Numeric::Number(b)) => a.partial_cmp(&b).map(|o| o == Ordering::Less),
            (Numeric::BigInt(a), Numeric::BigInt(b)) => Some(a < b),
            (Numeric::BigInt(a), Numeric::Number(b)) => {
                compare_bigint_number(&a, b).map(|o| o == Ordering::Less)
            }
            (Numeric::Number(a), Numeric::BigInt(b)) => {
                compare_bigint_number(&b, a).map(|o| o == Ordering::Greater)
            }
        })
    }

    /// InstanceofOperator
    pub(crate) fn instance_of(&mut self, value: &JsValue, target: &JsValue) -> JsResult<bool> {
        if !target.is_object() {
            return Err(JsError::type_error("Right-hand side of 'instanceof' is not an object"));
        }
        let key = PropertyKey::Symbol(self.symbols.has_instance.cheap_clone());
        if let Some(handler) = self.get_method(target, &key)? {
            let result = self.call(&handler, target.cheap_clone(), &[value.cheap_clone()])?;
            return Ok(result.to_boolean());
        }
        if !self.is_callable(target) {
            return Err(JsError::type_error("Right-hand side of 'instanceof' is not callable"));
        }
        self.ordinary_has_instance(target, value)
    }

    /// OrdinaryHasInstance
    pub(crate) fn ordinary_has_instance(&mut self, ctor: &JsValue, value: &JsValue) -> JsResult<bool> {
        let Some(ctor_id) = ctor.as_object() else {
            return Ok(false);
        };
        if !self.heap.get(ctor_id).is_callable() {
            return Ok(false);
        }
        if let ObjectKind::Bound(bound) = &self.heap.get(ctor_id).kind {
            let target = JsValue::Object(bound.target);
            return self.instance_of(value, &target);
        }
        let Some(mut current) = value.as_object() else {
            return Ok(false);
        };
        let proto = self.get_named(ctor, "prototype")?;
        let Some(proto) = proto.as_object() else {
            return Err(JsError::type_error(
                "Function has non-object prototype in instanceof check",
            ));
        };
        while let Some(next) = self.heap.get(current).prototype {
            if next == proto {
                return Ok(true);
            }
            current = next;
        }
        Ok(false)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Iterators
    // ═══════════════════════════════════════════════════════════════════════

    /// GetIterator
    pub(crate) fn get_iterator(&mut self, value: &JsValue, hint: IteratorHint) -> JsResult<IteratorRecord> {
        let iterator_key = PropertyKey::Symbol(self.symbols.iterator.cheap_clone());
        if hint == IteratorHint::Async {
            let key = PropertyKey::Symbol(self.symbols.async_iterator.cheap_clone());
            if let Some(method) = self.get_method(value, &key)? {
                return self.get_iterator_from_method(value, &method);
            }
            let Some(sync_method) = self.get_method(value, &iterator_key)? else {
                let shown = self.describe_value(value);
                return Err(JsError::type_error(format!("{shown} is not async iterable")));
            };
            let sync_record = self.get_iterator_from_method(value, &sync_method)?;
            return Ok(self.create_async_from_sync_iterator(sync_record));
        }
        let Some(method) = self.get_method(value, &iterator_key)? else {
            let shown = self.describe_value(value);
            return Err(JsError::type_error(format!("{shown} is not iterable")));
        };
        self.get_iterator_from_method(value, &method)
    }

    /// GetIteratorFromMethod
    pub(crate) fn get_iterator_from_method(&mut self, value: &JsValue, method: &JsValue) -> JsResult<IteratorRecord> {
        let iterator = self.call(method, value.cheap_clone(), &[])?;
        if !iterator.is_object() {
            return Err(JsError::type_error("Result of the Symbol.iterator method is not an object"));
        }
        let next_method = self.get_named(&iterator, "next")?;
        Ok(IteratorRecord {
            iterator,
            next_method,
            done: false,
        })
    }

    /// CreateAsyncFromSyncIterator
    pub(crate) fn create_async_from_sync_iterator(&mut self, sync: IteratorRecord) -> IteratorRecord {
        let proto = self.intrinsics().async_from_sync_iterator_prototype;
        let object = self.alloc(JsObject::new(
            Some(proto),
            ObjectKind::AsyncFromSyncIterator(Box::new(sync)),
        ));
        let next_method = self.lookup_data(object, &PropertyKey::from("next")).unwrap_or_default();
        IteratorRecord {
            iterator: JsValue::Object(object),
            next_method,
            done: false,
        }
    }

    /// IteratorNext
    pub(crate) fn iterator_next(&mut self, record: &IteratorRecord, value: Option<JsValue>) -> JsResult<JsValue> {
        let result = match value {
            Some(value) => self.call(&record.next_method, record.iterator.cheap_clone(), &[value])?,
            None => self.call(&record.next_method, record.iterator.cheap_clone(), &[])?,
        };
        if !result.is_object() {
            let shown = self.describe_value(&result);
            return Err(JsError::type_error(format!("Iterator result {shown} is not an object")));
        }
        Ok(result)
    }

    /// IteratorComplete
    pub(crate) fn iterator_complete(&mut self, result: &JsValue) -> JsResult<bool> {
        Ok(self.get_named(result, "done")?.to_boolean())
    }

    /// IteratorValue
    pub(crate) fn iterator_value(&mut self, result: &JsValue) -> JsResult<JsValue> {
        self.get_named(result, "value")
    }

    /// IteratorStepValue: the next value, or `None` once exhausted. Any
    /// failure marks the record done so it is not closed afterwards.
    pub(crate) fn iterator_step_value(&mut self, record: &mut IteratorRecord) -> JsResult<Option<JsValue>> {
        let step = self.iterator_next(record, None).and_then(|result| {
            if self.iterator_complete(&result)? {
                Ok(None)
            } else {
                self.iterator_value(&result).map(Some)
            }
        });
        match step {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => {
                record.done = true;
                Ok(None)
            }
            Err(err) => {
                record.done = true;
                Err(err)
            }
        }
    }

    /// IteratorClose: call `return` and decide which completion survives.
    pub(crate) fn iterator_close(&mut self, record: &IteratorRecord, completion: Completion) -> JsResult<Completion> {
        let key = self.key("return");
        let inner = self
            .get_method(&record.iterator, &key)
            .and_then(|method| match method {
                Some(method) => self.call(&method, record.iterator.cheap_clone(), &[]).map(Some),
                None => Ok(None),
            });
        if completion.is_throw() {
            return match inner {
                Err(err) if !err.is_catchable() => Err(err),
                _ => Ok(completion),
            };
        }
        match inner? {
            Some(result) if !result.is_object() => {
                Err(JsError::type_error("Iterator result is not an object"))
            }
            _ => Ok(completion),
        }
    }

    /// IteratorToList over a fresh iterator of `value` (spread).
    pub(crate) fn iterate_to_list(&mut self, value: &JsValue) -> JsResult<Vec<JsValue>> {
        let mut record = self.get_iterator(value, IteratorHint::Sync)?;
        let mut out = Vec::new();
        while let Some(item) = self.iterator_step_value(&mut record)? {
            out.push(item);
        }
        Ok(out)
    }
}

fn number_op(op: BinaryOp, a: f64, b: f64) -> f64 {
    match op {
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        BinaryOp::Exp => number_power(a, b),
        BinaryOp::BitAnd => f64::from(to_int32(a) & to_int32(b)),
        BinaryOp::BitOr => f64::from(to_int32(a) | to_int32(b)),
        BinaryOp::BitXor => f64::from(to_int32(a) ^ to_int32(b)),
        BinaryOp::LShift => f64::from(to_int32(a).wrapping_shl(to_uint32(b) & 31)),
        BinaryOp::RShift => f64::from(to_int32(a).wrapping_shr(to_uint32(b) & 31)),
        BinaryOp::URShift => f64::from(to_uint32(a).wrapping_shr(to_uint32(b) & 31)),
        _ => f64::NAN,
    }
}

fn bigint_op(op: BinaryOp, a: &BigInt, b: &BigInt) -> JsResult<JsValue> {
    let result = match op {
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Mod if b.is_zero() => {
            return Err(JsError::range_error("Division by zero"));
        }
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        BinaryOp::Exp => {
            if b.is_negative() {
                return Err(JsError::range_error("Exponent must be non-negative"));
            }
            let exponent = b
                .to_u32()
                .ok_or_else(|| JsError::range_error("Maximum BigInt size exceeded"))?;
            a.pow(exponent)
        }
        BinaryOp::BitAnd => a & b,
        BinaryOp::BitOr => a | b,
        BinaryOp::BitXor => a ^ b,
        BinaryOp::LShift | BinaryOp::RShift => {
            let amount = b
                .to_i64()
                .ok_or_else(|| JsError::range_error("Maximum BigInt size exceeded"))?;
            let left = if op == BinaryOp::LShift { amount } else { -amount };
            let shift = usize::try_from(left.unsigned_abs())
                .map_err(|_| JsError::range_error("Maximum BigInt size exceeded"))?;
            if left >= 0 { a << shift } else { a >> shift }
        }
        BinaryOp::URShift => {
            return Err(JsError::type_error(
                "BigInts have no unsigned right shift, use >> instead",
            ));
        }
        _ => return Err(JsError::internal("not a numeric operator")),
    };
    Ok(JsValue::from(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_bigint() {
        assert_eq!(string_to_bigint(&JsString::from(" 42 ")), Some(BigInt::from(42)));
        assert_eq!(string_to_bigint(&JsString::from("-7")), Some(BigInt::from(-7)));
        assert_eq!(string_to_bigint(&JsString::from("0x10")), Some(BigInt::from(16)));
        assert_eq!(string_to_bigint(&JsString::from("")), Some(BigInt::zero()));
        assert_eq!(string_to_bigint(&JsString::from("1.5")), None);
    }

    #[test]
    fn test_bigint_number_comparison() {
        let two = BigInt::from(2);
        assert_eq!(compare_bigint_number(&two, 2.0), Some(Ordering::Equal));
        assert_eq!(compare_bigint_number(&two, 2.5), Some(Ordering::Less));
        assert_eq!(compare_bigint_number(&two, 1.5), Some(Ordering::Greater));
        assert_eq!(compare_bigint_number(&two, f64::NAN), None);
        assert_eq!(compare_bigint_number(&two, f64::INFINITY), Some(Ordering::Less));
    }

    #[test]
    fn test_number_operators() {
        assert_eq!(number_op(BinaryOp::Mod, -5.0, 3.0), -2.0);
        assert_eq!(number_op(BinaryOp::URShift, -1.0, 0.0), 4_294_967_295.0);
        assert_eq!(number_op(BinaryOp::LShift, 1.0, 33.0), 2.0);
        assert!(number_power(1.0, f64::INFINITY).is_nan());
    }

    #[test]
    fn test_bigint_operators() {
        let a = BigInt::from(7);
        let b = BigInt::from(-2);
        assert_eq!(bigint_op(BinaryOp::Div, &a, &b).unwrap(), JsValue::from(BigInt::from(-3)));
        assert_eq!(bigint_op(BinaryOp::Mod, &a, &b).unwrap(), JsValue::from(BigInt::from(1)));
        assert!(bigint_op(BinaryOp::Div, &a, &BigInt::zero()).is_err());
        assert!(bigint_op(BinaryOp::URShift, &a, &b).is_err());
    }

    #[test]
    fn test_own_keys_order() {
        let keys = [
            PropertyKey::from("b"),
            PropertyKey::from("2"),
            PropertyKey::from("a"),
            PropertyKey::from("0"),
        ];
        let ordered: Vec<String> = ordered_keys(keys.iter()).iter().map(|k| k.to_string()).collect();
        assert_eq!(ordered, vec!["0", "2", "b", "a"]);
    }
}
