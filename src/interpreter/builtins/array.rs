//! Array built-in methods
//!
//! The prototype methods are generic: they work on any array-like `this`
//! through [[Get]], [[Set]] and `length`, so they also apply to arguments
//! objects and plain objects with a `length`.

use std::cmp::Ordering;

use crate::error::{JsError, JsResult};
use crate::interpreter::Interpreter;
use crate::object::{ArrayIteratorState, IterationKind, JsObject, NativeCall, ObjectKind, Property};
use crate::value::{CheapClone, JsString, JsValue, ObjectId, PropertyKey};

/// Initialize Array.prototype with the array methods
pub fn init_array_prototype(interp: &mut Interpreter) {
    let proto = interp.intrinsics().array_prototype;

    interp.register_method(proto, "push", array_push, 1);
    interp.register_method(proto, "pop", array_pop, 0);
    interp.register_method(proto, "shift", array_shift, 0);
    interp.register_method(proto, "unshift", array_unshift, 1);
    interp.register_method(proto, "join", array_join, 1);
    interp.register_method(proto, "toString", array_to_string, 0);
    interp.register_method(proto, "map", array_map, 1);
    interp.register_method(proto, "forEach", array_foreach, 1);
    interp.register_method(proto, "filter", array_filter, 1);
    interp.register_method(proto, "reduce", array_reduce, 1);
    interp.register_method(proto, "some", array_some, 1);
    interp.register_method(proto, "every", array_every, 1);
    interp.register_method(proto, "find", array_find, 1);
    interp.register_method(proto, "findIndex", array_find_index, 1);
    interp.register_method(proto, "indexOf", array_index_of, 1);
    interp.register_method(proto, "includes", array_includes, 1);
    interp.register_method(proto, "slice", array_slice, 2);
    interp.register_method(proto, "concat", array_concat, 1);
    interp.register_method(proto, "reverse", array_reverse, 0);
    interp.register_method(proto, "sort", array_sort, 1);
    interp.register_method(proto, "keys", array_keys, 0);
    interp.register_method(proto, "entries", array_entries, 0);
    interp.register_method(proto, "values", array_values, 0);

    // Array.prototype[@@iterator] is the same function object as values
    let values_key = interp.key("values");
    if let Some(values) = interp.lookup_data(proto, &values_key) {
        let iterator = interp.symbols.iterator.cheap_clone();
        interp.define_hidden(proto, PropertyKey::Symbol(iterator), values);
    }
}

/// Create the Array constructor
pub fn create_array_constructor(interp: &mut Interpreter) -> ObjectId {
    let proto = interp.intrinsics().array_prototype;
    let constructor = interp.create_native_constructor("Array", array_constructor_fn, 1, proto);

    interp.register_method(constructor, "isArray", array_is_array, 1);
    interp.register_method(constructor, "of", array_of, 0);
    interp.register_method(constructor, "from", array_from, 1);

    constructor
}

/// Initialize %ArrayIteratorPrototype%
pub fn init_array_iterator_prototype(interp: &mut Interpreter) {
    let proto = interp.intrinsics().array_iterator_prototype;
    interp.register_method(proto, "next", array_iterator_next, 0);

    let tag = interp.symbols.to_string_tag.cheap_clone();
    let value = JsValue::String(interp.intern("Array Iterator"));
    interp
        .heap
        .get_mut(proto)
        .properties
        .insert(PropertyKey::Symbol(tag), Property::data(value, false, false, true));
}

/// CreateArrayIterator
pub fn create_array_iterator(interp: &mut Interpreter, target: JsValue, kind: IterationKind) -> JsValue {
    let proto = interp.intrinsics().array_iterator_prototype;
    let iterator = interp.alloc(JsObject::new(
        Some(proto),
        ObjectKind::ArrayIterator(ArrayIteratorState {
            target: Some(target),
            index: 0,
            kind,
        }),
    ));
    JsValue::Object(iterator)
}

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_default()
}

fn get_index(interp: &mut Interpreter, obj: ObjectId, index: u64) -> JsResult<JsValue> {
    let key = index_key(index);
    interp.get(obj, &key, JsValue::Object(obj))
}

fn set_index(interp: &mut Interpreter, obj: ObjectId, index: u64, value: JsValue) -> JsResult<()> {
    let key = index_key(index);
    interp.set_property(obj, key, value, true)
}

fn has_index(interp: &mut Interpreter, obj: ObjectId, index: u64) -> JsResult<bool> {
    let key = index_key(index);
    interp.has_property(obj, &key)
}

fn delete_index(interp: &mut Interpreter, obj: ObjectId, index: u64) -> JsResult<()> {
    let key = index_key(index);
    if !interp.delete(obj, &key)? {
        return Err(JsError::type_error(format!("Cannot delete property '{index}'")));
    }
    Ok(())
}

fn index_key(index: u64) -> PropertyKey {
    PropertyKey::String(JsString::from(index.to_string()))
}

fn set_length(interp: &mut Interpreter, obj: ObjectId, length: u64) -> JsResult<()> {
    let key = interp.key("length");
    interp.set_property(obj, key, JsValue::Number(length as f64), true)
}

/// `this` as an object together with its length.
fn this_array_like(interp: &mut Interpreter, this: &JsValue) -> JsResult<(ObjectId, u64)> {
    let obj = interp.to_object(this)?;
    let len = interp.length_of_array_like(obj)?;
    Ok((obj, len))
}

fn callback_arg(interp: &mut Interpreter, args: &[JsValue], method: &str) -> JsResult<JsValue> {
    let callback = arg(args, 0);
    if !interp.is_callable(&callback) {
        let shown = interp.describe_value(&callback);
        return Err(JsError::type_error(format!(
            "Array.prototype.{method}: {shown} is not a function"
        )));
    }
    Ok(callback)
}

/// Resolve a relative start/end argument against `len`.
fn relative_index(interp: &mut Interpreter, value: &JsValue, len: u64, default: u64) -> JsResult<u64> {
    if value.is_undefined() {
        return Ok(default);
    }
    let relative = interp.to_integer_or_infinity(value)?;
    let len = len as f64;
    let index = if relative < 0.0 {
        (len + relative).max(0.0)
    } else {
        relative.min(len)
    };
    Ok(index as u64)
}

/// Visit every present element, calling `callback(value, index, O)`.
/// `visit` returns `Some` to stop early with a result.
fn for_each_present<T, F>(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    method: &str,
    mut visit: F,
) -> JsResult<Option<T>>
where
    F: FnMut(&mut Interpreter, u64, JsValue, JsValue) -> JsResult<Option<T>>,
{
    let (obj, len) = this_array_like(interp, this)?;
    let callback = callback_arg(interp, args, method)?;
    let this_arg = arg(args, 1);
    for index in 0..len {
        if !has_index(interp, obj, index)? {
            continue;
        }
        let value = get_index(interp, obj, index)?;
        let result = interp.call(
            &callback,
            this_arg.cheap_clone(),
            &[value.cheap_clone(), JsValue::Number(index as f64), JsValue::Object(obj)],
        )?;
        if let Some(done) = visit(interp, index, value, result)? {
            return Ok(Some(done));
        }
    }
    Ok(None)
}

// ═══════════════════════════════════════════════════════════════════════════
// Constructor
// ═══════════════════════════════════════════════════════════════════════════

pub fn array_constructor_fn(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    let new_target = call.new_target.unwrap_or(call.callee);
    let proto = interp.get_prototype_from_constructor(new_target, |i| i.array_prototype)?;
    let array = match args {
        [JsValue::Number(n)] => {
            let length = *n as u32;
            if f64::from(length) != *n {
                return Err(JsError::range_error("Invalid array length"));
            }
            let array = interp.create_array(Vec::new());
            if let ObjectKind::Array { length: len } = &mut interp.heap.get_mut(array).kind {
                *len = length;
            }
            array
        }
        _ => interp.create_array(args.to_vec()),
    };
    interp.heap.get_mut(array).prototype = Some(proto);
    Ok(JsValue::Object(array))
}

pub fn array_is_array(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    Ok(JsValue::Boolean(interp.is_array(&arg(args, 0))))
}

pub fn array_of(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    Ok(JsValue::Object(interp.create_array(args.to_vec())))
}

/// Array.from(items, mapFn, thisArg): iterables first, then array-likes.
pub fn array_from(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let items = arg(args, 0);
    let map_fn = arg(args, 1);
    let this_arg = arg(args, 2);
    if !map_fn.is_undefined() && !interp.is_callable(&map_fn) {
        return Err(JsError::type_error("Array.from: mapper is not a function"));
    }
    if items.is_null_or_undefined() {
        return Err(JsError::type_error("Array.from requires an array-like or iterable"));
    }

    let iterator_key = PropertyKey::Symbol(interp.symbols.iterator.cheap_clone());
    let values = if interp.get_method(&items, &iterator_key)?.is_some() {
        interp.iterate_to_list(&items)?
    } else {
        let obj = interp.to_object(&items)?;
        let len = interp.length_of_array_like(obj)?;
        let mut values = Vec::new();
        for index in 0..len {
            values.push(get_index(interp, obj, index)?);
        }
        values
    };

    let values = if map_fn.is_undefined() {
        values
    } else {
        let mut mapped = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            mapped.push(interp.call(
                &map_fn,
                this_arg.cheap_clone(),
                &[value, JsValue::Number(index as f64)],
            )?);
        }
        mapped
    };
    Ok(JsValue::Object(interp.create_array(values)))
}

// ═══════════════════════════════════════════════════════════════════════════
// Mutators
// ═══════════════════════════════════════════════════════════════════════════

pub fn array_push(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let (obj, mut len) = this_array_like(interp, &this)?;
    for value in args {
        set_index(interp, obj, len, value.cheap_clone())?;
        len += 1;
    }
    set_length(interp, obj, len)?;
    Ok(JsValue::Number(len as f64))
}

pub fn array_pop(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let (obj, len) = this_array_like(interp, &this)?;
    if len == 0 {
        set_length(interp, obj, 0)?;
        return Ok(JsValue::Undefined);
    }
    let last = len - 1;
    let value = get_index(interp, obj, last)?;
    delete_index(interp, obj, last)?;
    set_length(interp, obj, last)?;
    Ok(value)
}

pub fn array_shift(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let (obj, len) = this_array_like(interp, &this)?;
    if len == 0 {
        set_length(interp, obj, 0)?;
        return Ok(JsValue::Undefined);
    }
    let first = get_index(interp, obj, 0)?;
    for index in 1..len {
        if has_index(interp, obj, index)? {
            let value = get_index(interp, obj, index)?;
            set_index(interp, obj, index - 1, value)?;
        } else {
            delete_index(interp, obj, index - 1)?;
        }
    }
    delete_index(interp, obj, len - 1)?;
    set_length(interp, obj, len - 1)?;
    Ok(first)
}

pub fn array_unshift(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let (obj, len) = this_array_like(interp, &this)?;
    let count = args.len() as u64;
    if count > 0 {
        for index in (0..len).rev() {
            if has_index(interp, obj, index)? {
                let value = get_index(interp, obj, index)?;
                set_index(interp, obj, index + count, value)?;
            } else {
                delete_index(interp, obj, index + count)?;
            }
        }
        for (offset, value) in args.iter().enumerate() {
            set_index(interp, obj, offset as u64, value.cheap_clone())?;
        }
    }
    set_length(interp, obj, len + count)?;
    Ok(JsValue::Number((len + count) as f64))
}

pub fn array_reverse(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let (obj, len) = this_array_like(interp, &this)?;
    let mut lower = 0;
    while len > 1 && lower < len / 2 {
        let upper = len - 1 - lower;
        let lower_exists = has_index(interp, obj, lower)?;
        let upper_exists = has_index(interp, obj, upper)?;
        let lower_value = get_index(interp, obj, lower)?;
        let upper_value = get_index(interp, obj, upper)?;
        match (lower_exists, upper_exists) {
            (true, true) => {
                set_index(interp, obj, lower, upper_value)?;
                set_index(interp, obj, upper, lower_value)?;
            }
            (false, true) => {
                set_index(interp, obj, lower, upper_value)?;
                delete_index(interp, obj, upper)?;
            }
            (true, false) => {
                delete_index(interp, obj, lower)?;
                set_index(interp, obj, upper, lower_value)?;
            }
            (false, false) => {}
        }
        lower += 1;
    }
    Ok(JsValue::Object(obj))
}

/// Array.prototype.sort: stable merge sort, undefined last, holes removed.
pub fn array_sort(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let comparator = arg(args, 0);
    if !comparator.is_undefined() && !interp.is_callable(&comparator) {
        return Err(JsError::type_error("The comparison function must be either a function or undefined"));
    }
    let (obj, len) = this_array_like(interp, &this)?;
    let mut values = Vec::new();
    let mut undefined_count = 0;
    for index in 0..len {
        if !has_index(interp, obj, index)? {
            continue;
        }
        match get_index(interp, obj, index)? {
            JsValue::Undefined => undefined_count += 1,
            value => values.push(value),
        }
    }
    let sorted = merge_sort(interp, values, &comparator)?;

    let mut index = 0;
    for value in sorted {
        set_index(interp, obj, index, value)?;
        index += 1;
    }
    for _ in 0..undefined_count {
        set_index(interp, obj, index, JsValue::Undefined)?;
        index += 1;
    }
    while index < len {
        delete_index(interp, obj, index)?;
        index += 1;
    }
    Ok(JsValue::Object(obj))
}

fn compare_values(interp: &mut Interpreter, comparator: &JsValue, a: &JsValue, b: &JsValue) -> JsResult<Ordering> {
    if !comparator.is_undefined() {
        let result = interp.call(comparator, JsValue::Undefined, &[a.cheap_clone(), b.cheap_clone()])?;
        let n = interp.to_number(&result)?;
        return Ok(n.partial_cmp(&0.0).unwrap_or(Ordering::Equal));
    }
    let a = interp.to_string(a)?;
    let b = interp.to_string(b)?;
    Ok(a.cmp(&b))
}

fn merge_sort(interp: &mut Interpreter, values: Vec<JsValue>, comparator: &JsValue) -> JsResult<Vec<JsValue>> {
    if values.len() <= 1 {
        return Ok(values);
    }
    let mut left = values;
    let right = left.split_off(left.len() / 2);
    let left = merge_sort(interp, left, comparator)?;
    let right = merge_sort(interp, right, comparator)?;

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        if compare_values(interp, comparator, a, b)? == Ordering::Greater {
            merged.extend(right.next());
        } else {
            merged.extend(left.next());
        }
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

// ═══════════════════════════════════════════════════════════════════════════
// Accessors
// ═══════════════════════════════════════════════════════════════════════════

pub fn array_join(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let (obj, len) = this_array_like(interp, &this)?;
    let separator = match arg(args, 0) {
        JsValue::Undefined => JsString::from(","),
        sep => interp.to_string(&sep)?,
    };
    let mut units: Vec<u16> = Vec::new();
    for index in 0..len {
        if index > 0 {
            units.extend_from_slice(separator.as_units());
        }
        let element = get_index(interp, obj, index)?;
        if !element.is_null_or_undefined() {
            units.extend_from_slice(interp.to_string(&element)?.as_units());
        }
    }
    Ok(JsValue::String(JsString::from_units(units)))
}

pub fn array_to_string(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let obj = interp.to_object(&this)?;
    let join = interp.get_named(&JsValue::Object(obj), "join")?;
    if interp.is_callable(&join) {
        return interp.call(&join, JsValue::Object(obj), &[]);
    }
    let object_prototype = interp.intrinsics().object_prototype;
    let func = interp.get_named(&JsValue::Object(object_prototype), "toString")?;
    interp.call(&func, JsValue::Object(obj), &[])
}

pub fn array_index_of(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let (obj, len) = this_array_like(interp, &this)?;
    let search = arg(args, 0);
    let start = relative_index(interp, &arg(args, 1), len, 0)?;
    for index in start..len {
        if !has_index(interp, obj, index)? {
            continue;
        }
        if get_index(interp, obj, index)?.strict_equals(&search) {
            return Ok(JsValue::Number(index as f64));
        }
    }
    Ok(JsValue::Number(-1.0))
}

pub fn array_includes(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let (obj, len) = this_array_like(interp, &this)?;
    let search = arg(args, 0);
    let start = relative_index(interp, &arg(args, 1), len, 0)?;
    for index in start..len {
        if get_index(interp, obj, index)?.same_value_zero(&search) {
            return Ok(JsValue::Boolean(true));
        }
    }
    Ok(JsValue::Boolean(false))
}

pub fn array_slice(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let (obj, len) = this_array_like(interp, &this)?;
    let start = relative_index(interp, &arg(args, 0), len, 0)?;
    let end = relative_index(interp, &arg(args, 1), len, len)?;
    let result = interp.create_array(Vec::new());
    let mut to = 0u64;
    for index in start..end.max(start) {
        if has_index(interp, obj, index)? {
            let value = get_index(interp, obj, index)?;
            let key = index_key(to);
            interp.create_data_property_or_throw(result, key, value)?;
        }
        to += 1;
    }
    set_length(interp, result, to)?;
    Ok(JsValue::Object(result))
}

pub fn array_concat(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let obj = interp.to_object(&this)?;
    let result = interp.create_array(Vec::new());
    let mut to = 0u64;
    let items = std::iter::once(JsValue::Object(obj)).chain(args.iter().cloned());
    for item in items {
        match item {
            JsValue::Object(source) if interp.heap.get(source).is_array() => {
                let len = interp.length_of_array_like(source)?;
                for index in 0..len {
                    if has_index(interp, source, index)? {
                        let value = get_index(interp, source, index)?;
                        let key = index_key(to);
                        interp.create_data_property_or_throw(result, key, value)?;
                    }
                    to += 1;
                }
            }
            value => {
                let key = index_key(to);
                interp.create_data_property_or_throw(result, key, value)?;
                to += 1;
            }
        }
    }
    set_length(interp, result, to)?;
    Ok(JsValue::Object(result))
}

// ═══════════════════════════════════════════════════════════════════════════
// Iteration methods
// ═══════════════════════════════════════════════════════════════════════════

pub fn array_foreach(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    for_each_present::<(), _>(interp, &this, args, "forEach", |_, _, _, _| Ok(None))?;
    Ok(JsValue::Undefined)
}

pub fn array_map(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let result = interp.create_array(Vec::new());
    for_each_present::<(), _>(interp, &this, args, "map", |interp, index, _, mapped| {
        let key = index_key(index);
        interp.create_data_property_or_throw(result, key, mapped)?;
        Ok(None)
    })?;
    let (_, len) = this_array_like(interp, &this)?;
    set_length(interp, result, len)?;
    Ok(JsValue::Object(result))
}

pub fn array_filter(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let mut kept = Vec::new();
    for_each_present::<(), _>(interp, &this, args, "filter", |_, _, value, selected| {
        if selected.to_boolean() {
            kept.push(value);
        }
        Ok(None)
    })?;
    Ok(JsValue::Object(interp.create_array(kept)))
}

pub fn array_some(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let found = for_each_present(interp, &this, args, "some", |_, _, _, result| {
        Ok(result.to_boolean().then_some(()))
    })?;
    Ok(JsValue::Boolean(found.is_some()))
}

pub fn array_every(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let failed = for_each_present(interp, &this, args, "every", |_, _, _, result| {
        Ok((!result.to_boolean()).then_some(()))
    })?;
    Ok(JsValue::Boolean(failed.is_none()))
}

/// find and findIndex visit holes too, reading them as undefined.
fn find_element(
    interp: &mut Interpreter,
    this: &JsValue,
    args: &[JsValue],
    method: &str,
) -> JsResult<Option<(u64, JsValue)>> {
    let (obj, len) = this_array_like(interp, this)?;
    let predicate = callback_arg(interp, args, method)?;
    let this_arg = arg(args, 1);
    for index in 0..len {
        let value = get_index(interp, obj, index)?;
        let result = interp.call(
            &predicate,
            this_arg.cheap_clone(),
            &[value.cheap_clone(), JsValue::Number(index as f64), JsValue::Object(obj)],
        )?;
        if result.to_boolean() {
            return Ok(Some((index, value)));
        }
    }
    Ok(None)
}

pub fn array_find(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    Ok(find_element(interp, &this, args, "find")?
        .map(|(_, value)| value)
        .unwrap_or_default())
}

pub fn array_find_index(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let index = find_element(interp, &this, args, "findIndex")?.map_or(-1.0, |(index, _)| index as f64);
    Ok(JsValue::Number(index))
}

pub fn array_reduce(
    interp: &mut Interpreter,
    this: JsValue,
    args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let (obj, len) = this_array_like(interp, &this)?;
    let callback = callback_arg(interp, args, "reduce")?;
    let mut index = 0;
    let mut accumulator = match args.get(1) {
        Some(initial) => initial.cheap_clone(),
        None => loop {
            if index >= len {
                return Err(JsError::type_error("Reduce of empty array with no initial value"));
            }
            let present = has_index(interp, obj, index)?;
            index += 1;
            if present {
                break get_index(interp, obj, index - 1)?;
            }
        },
    };
    while index < len {
        if has_index(interp, obj, index)? {
            let value = get_index(interp, obj, index)?;
            accumulator = interp.call(
                &callback,
                JsValue::Undefined,
                &[accumulator, value, JsValue::Number(index as f64), JsValue::Object(obj)],
            )?;
        }
        index += 1;
    }
    Ok(accumulator)
}

// ═══════════════════════════════════════════════════════════════════════════
// Iterators
// ═══════════════════════════════════════════════════════════════════════════

fn iterator_for(interp: &mut Interpreter, this: &JsValue, kind: IterationKind) -> JsResult<JsValue> {
    let obj = interp.to_object(this)?;
    Ok(create_array_iterator(interp, JsValue::Object(obj), kind))
}

pub fn array_keys(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    iterator_for(interp, &this, IterationKind::Keys)
}

pub fn array_values(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    iterator_for(interp, &this, IterationKind::Values)
}

pub fn array_entries(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    iterator_for(interp, &this, IterationKind::Entries)
}

/// %ArrayIteratorPrototype%.next
pub fn array_iterator_next(
    interp: &mut Interpreter,
    this: JsValue,
    _args: &[JsValue],
    _call: NativeCall,
) -> JsResult<JsValue> {
    let Some(id) = this.as_object() else {
        return Err(JsError::type_error("next method called on incompatible receiver"));
    };
    let ObjectKind::ArrayIterator(state) = &interp.heap.get(id).kind else {
        return Err(JsError::type_error("next method called on incompatible receiver"));
    };
    let (target, index, kind) = (state.target.clone(), state.index, state.kind);
    let Some(JsValue::Object(target)) = target else {
        return Ok(interp.create_iter_result(JsValue::Undefined, true));
    };

    let len = interp.length_of_array_like(target)?;
    if u64::from(index) >= len {
        if let ObjectKind::ArrayIterator(state) = &mut interp.heap.get_mut(id).kind {
            state.target = None;
        }
        return Ok(interp.create_iter_result(JsValue::Undefined, true));
    }
    if let ObjectKind::ArrayIterator(state) = &mut interp.heap.get_mut(id).kind {
        state.index = index + 1;
    }

    let key_value = JsValue::Number(f64::from(index));
    let result = match kind {
        IterationKind::Keys => key_value,
        IterationKind::Values => get_index(interp, target, u64::from(index))?,
        IterationKind::Entries => {
            let value = get_index(interp, target, u64::from(index))?;
            JsValue::Object(interp.create_array(vec![key_value, value]))
        }
    };
    Ok(interp.create_iter_result(result, false))
}

#[cfg(test)]
mod tests {
    use crate::config::RuntimeConfig;
    use crate::interpreter::Interpreter;
    use crate::value::JsValue;

    fn run(source: &str) -> JsValue {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        interp.run_script(source).unwrap()
    }

    #[test]
    fn test_push_pop_and_length() {
        let source = "var a = [1]; a.push(2, 3); var p = a.pop(); a.length + ':' + p + ':' + a.join('-')";
        assert_eq!(run(source), JsValue::from("2:3:1-2"));
    }

    #[test]
    fn test_map_filter_reduce() {
        let source = "[1, 2, 3, 4].map(x => x * 10).filter(x => x > 10).reduce((a, b) => a + b)";
        assert_eq!(run(source), JsValue::Number(90.0));
    }

    #[test]
    fn test_reduce_of_empty_array_throws() {
        let source = "try { [].reduce((a, b) => a); 'no' } catch (e) { e instanceof TypeError }";
        assert_eq!(run(source), JsValue::Boolean(true));
    }

    #[test]
    fn test_index_of_uses_strict_equality() {
        assert_eq!(
            run("[NaN, '1', 1].indexOf(1) + ':' + [NaN].indexOf(NaN) + ':' + [NaN].includes(NaN)"),
            JsValue::from("2:-1:true")
        );
    }

    #[test]
    fn test_iterator_is_values() {
        let source = "Array.prototype[Symbol.iterator] === Array.prototype.values";
        assert_eq!(run(source), JsValue::Boolean(true));
    }

    #[test]
    fn test_entries_and_spread() {
        let source = "var out = []; for (const [i, v] of ['a', 'b'].entries()) out.push(i + v); [...out, ...'cd'].join()";
        assert_eq!(run(source), JsValue::from("0a,1b,c,d"));
    }

    #[test]
    fn test_sort_default_and_comparator() {
        let source = "[10, 9, 1, undefined, 2].sort().join() + '|' + [3, 1, 2].sort((a, b) => b - a).join()";
        assert_eq!(run(source), JsValue::from("1,10,2,9,|3,2,1"));
    }

    #[test]
    fn test_generic_methods_on_array_like() {
        let source = "var o = {length: 2, 0: 'x', 1: 'y'}; Array.prototype.join.call(o, '+') + Array.from(o).length";
        assert_eq!(run(source), JsValue::from("x+y2"));
    }

    #[test]
    fn test_constructor_with_length() {
        assert_eq!(run("new Array(3).length + Array(1, 2).length"), JsValue::Number(5.0));
    }
}
