//! Object model
//!
//! Objects live in an arena (`ObjectHeap`) and are addressed by `ObjectId`.
//! Every object has a prototype link, an extensible flag, an insertion-ordered
//! property table and an `ObjectKind` carrying the internal slots of exotic
//! objects (functions, arrays, promises, generators, ...).
//!
//! Only storage lives here. The abstract operations that may call back into
//! guest code ([[Get]] through accessors, [[Call]], ...) are methods on the
//! interpreter.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

use crate::ast::FunctionNode;
use crate::environment::EnvId;
use crate::error::JsResult;
use crate::interpreter::{Interpreter, IteratorRecord};
use crate::interpreter::coroutine::CoroutineId;
use crate::interpreter::module::ModuleId;
use crate::interpreter::promise::PromiseData;
use crate::realm::RealmId;
use crate::value::{CheapClone, JsValue, ObjectId, PropertyKey};

/// Signature of built-in functions.
pub type NativeFn = fn(&mut Interpreter, JsValue, &[JsValue], NativeCall) -> JsResult<JsValue>;

/// What a native function knows about how it was invoked.
#[derive(Debug, Clone, Copy)]
pub struct NativeCall {
    /// The function object being called.
    pub callee: ObjectId,
    /// `Some` when invoked through [[Construct]].
    pub new_target: Option<ObjectId>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Properties
// ═══════════════════════════════════════════════════════════════════════════

/// A stored property.
#[derive(Debug, Clone)]
pub enum Property {
    Data {
        value: JsValue,
        writable: bool,
        enumerable: bool,
        configurable: bool,
    },
    Accessor {
        get: Option<ObjectId>,
        set: Option<ObjectId>,
        enumerable: bool,
        configurable: bool,
    },
}

impl Property {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Property::Data {
            value,
            writable,
            enumerable,
            configurable,
        }
    }

    /// A plain writable, enumerable, configurable data property.
    pub fn plain(value: JsValue) -> Self {
        Property::data(value, true, true, true)
    }

    /// Writable and configurable but not enumerable, as built-in methods are.
    pub fn hidden(value: JsValue) -> Self {
        Property::data(value, true, false, true)
    }

    pub fn enumerable(&self) -> bool {
        match self {
            Property::Data { enumerable, .. } | Property::Accessor { enumerable, .. } => {
                *enumerable
            }
        }
    }

    pub fn configurable(&self) -> bool {
        match self {
            Property::Data { configurable, .. } | Property::Accessor { configurable, .. } => {
                *configurable
            }
        }
    }
}

/// A property descriptor as passed to [[DefineOwnProperty]]; absent fields
/// are `None`.
#[derive(Debug, Clone, Default)]
pub struct PropertyDescriptor {
    pub value: Option<JsValue>,
    pub writable: Option<bool>,
    pub get: Option<JsValue>,
    pub set: Option<JsValue>,
    pub enumerable: Option<bool>,
    pub configurable: Option<bool>,
}

impl PropertyDescriptor {
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        PropertyDescriptor {
            value: Some(value),
            writable: Some(writable),
            get: None,
            set: None,
            enumerable: Some(enumerable),
            configurable: Some(configurable),
        }
    }

    pub fn is_accessor(&self) -> bool {
        self.get.is_some() || self.set.is_some()
    }

    pub fn is_data(&self) -> bool {
        self.value.is_some() || self.writable.is_some()
    }

    pub fn is_generic(&self) -> bool {
        !self.is_accessor() && !self.is_data()
    }
}

impl From<Property> for PropertyDescriptor {
    fn from(prop: Property) -> Self {
        match prop {
            Property::Data {
                value,
                writable,
                enumerable,
                configurable,
            } => PropertyDescriptor::data(value, writable, enumerable, configurable),
            Property::Accessor {
                get,
                set,
                enumerable,
                configurable,
            } => PropertyDescriptor {
                value: None,
                writable: None,
                get: Some(get.map(JsValue::Object).unwrap_or_default()),
                set: Some(set.map(JsValue::Object).unwrap_or_default()),
                enumerable: Some(enumerable),
                configurable: Some(configurable),
            },
        }
    }
}

pub type PropertyMap = IndexMap<PropertyKey, Property, FxBuildHasher>;

// ═══════════════════════════════════════════════════════════════════════════
// Internal slots
// ═══════════════════════════════════════════════════════════════════════════

/// An ECMAScript function object: a closure over its defining environment.
#[derive(Debug, Clone)]
pub struct FunctionData {
    pub node: Rc<FunctionNode>,
    pub env: EnvId,
    /// [[HomeObject]] of methods, used by `super.x`.
    pub home_object: Option<ObjectId>,
    pub realm: RealmId,
    pub script_or_module: Option<ModuleId>,
}

/// Extra state some built-in functions close over.
#[derive(Debug, Clone, Default)]
pub enum NativeData {
    #[default]
    None,
    /// A promise resolve or reject function.
    Resolving {
        promise: ObjectId,
        already_resolved: Rc<Cell<bool>>,
    },
    /// GetCapabilitiesExecutor: records the resolve/reject pair it receives.
    CapabilityExecutor(Rc<RefCell<(JsValue, JsValue)>>),
    /// `then_finally` / `catch_finally` closures of `Promise.prototype.finally`.
    Finally { on_finally: JsValue },
    /// Returns the captured value.
    ValueThunk(JsValue),
    /// Throws the captured value.
    Thrower(JsValue),
    /// Wraps the settled value of an async-from-sync iterator step.
    AsyncFromSyncUnwrap { done: bool },
}

#[derive(Debug, Clone)]
pub struct NativeFunction {
    pub func: NativeFn,
    pub data: NativeData,
    pub realm: RealmId,
    pub constructor: bool,
}

#[derive(Debug, Clone)]
pub struct BoundFunction {
    pub target: ObjectId,
    pub this: JsValue,
    pub args: Vec<JsValue>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationKind {
    Keys,
    Values,
    Entries,
}

/// %ArrayIteratorPrototype% instances. `target` becomes `None` once exhausted.
#[derive(Debug, Clone)]
pub struct ArrayIteratorState {
    pub target: Option<JsValue>,
    pub index: u32,
    pub kind: IterationKind,
}

#[derive(Debug, Clone)]
pub enum ObjectKind {
    Ordinary,
    /// Elements are ordinary index-keyed properties; `length` is virtual.
    Array { length: u32 },
    Function(Box<FunctionData>),
    Native(Box<NativeFunction>),
    Bound(Box<BoundFunction>),
    Generator(CoroutineId),
    AsyncGenerator(CoroutineId),
    Promise(Box<PromiseData>),
    Error,
    /// Unmapped arguments object.
    Arguments,
    ArrayIterator(ArrayIteratorState),
    /// CreateAsyncFromSyncIterator
    AsyncFromSyncIterator(Box<IteratorRecord>),
    ModuleNamespace(ModuleId),
    /// Boolean, Number, String, Symbol and BigInt wrapper objects.
    Primitive(JsValue),
}

impl NativeData {
    pub fn capability_slots(&self) -> Option<&Rc<RefCell<(JsValue, JsValue)>>> {
        match self {
            NativeData::CapabilityExecutor(slots) => Some(slots),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Objects
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct JsObject {
    pub prototype: Option<ObjectId>,
    pub extensible: bool,
    pub properties: PropertyMap,
    pub kind: ObjectKind,
}

impl JsObject {
    pub fn new(prototype: Option<ObjectId>, kind: ObjectKind) -> Self {
        JsObject {
            prototype,
            extensible: true,
            properties: PropertyMap::default(),
            kind,
        }
    }

    pub fn ordinary(prototype: Option<ObjectId>) -> Self {
        JsObject::new(prototype, ObjectKind::Ordinary)
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self.kind,
            ObjectKind::Function(_) | ObjectKind::Native(_) | ObjectKind::Bound(_)
        )
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ObjectKind::Array { .. })
    }

    pub fn function_data(&self) -> Option<&FunctionData> {
        match &self.kind {
            ObjectKind::Function(data) => Some(data),
            _ => None,
        }
    }

    pub fn promise(&self) -> Option<&PromiseData> {
        match &self.kind {
            ObjectKind::Promise(data) => Some(data),
            _ => None,
        }
    }

    pub fn promise_mut(&mut self) -> Option<&mut PromiseData> {
        match &mut self.kind {
            ObjectKind::Promise(data) => Some(data),
            _ => None,
        }
    }

    /// The own data value stored under `key`, ignoring accessors.
    pub fn own_data(&self, key: &PropertyKey) -> Option<JsValue> {
        match self.properties.get(key) {
            Some(Property::Data { value, .. }) => Some(value.cheap_clone()),
            _ => None,
        }
    }
}

/// Arena of the objects an agent allocated. Slots of collected objects
/// are reset and reused.
#[derive(Debug, Default)]
pub struct ObjectHeap {
    objects: Vec<JsObject>,
    free: Vec<u32>,
    /// Allocations since the last sweep.
    allocations: usize,
}

impl ObjectHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, object: JsObject) -> ObjectId {
        self.allocations += 1;
        if let Some(index) = self.free.pop() {
            self.objects[index as usize] = object;
            return ObjectId(index);
        }
        let id = ObjectId(self.objects.len() as u32);
        self.objects.push(object);
        id
    }

    pub fn get(&self, id: ObjectId) -> &JsObject {
        &self.objects[id.index()]
    }

    pub fn get_mut(&mut self, id: ObjectId) -> &mut JsObject {
        &mut self.objects[id.index()]
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots, live or free.
    pub(crate) fn capacity(&self) -> usize {
        self.objects.len()
    }

    pub(crate) fn allocations(&self) -> usize {
        self.allocations
    }

    pub(crate) fn reset_allocations(&mut self) {
        self.allocations = 0;
    }

    /// Reset every slot not set in `marks` and make it available to
    /// `alloc`. Returns how many live objects were freed.
    pub(crate) fn sweep(&mut self, marks: &[bool]) -> usize {
        let before = self.len();
        self.free.clear();
        for (index, object) in self.objects.iter_mut().enumerate() {
            if !marks.get(index).copied().unwrap_or(false) {
                *object = JsObject::ordinary(None);
                self.free.push(index as u32);
            }
        }
        // Reuse low slots first.
        self.free.reverse();
        self.allocations = 0;
        before - self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_allocates_sequential_handles() {
        let mut heap = ObjectHeap::new();
        let a = heap.alloc(JsObject::ordinary(None));
        let b = heap.alloc(JsObject::ordinary(Some(a)));
        assert_ne!(a, b);
        assert_eq!(heap.get(b).prototype, Some(a));
        assert_eq!(heap.len(), 2);
    }

    #[test]
    fn test_sweep_frees_unmarked_slots_for_reuse() {
        let mut heap = ObjectHeap::new();
        let kept = heap.alloc(JsObject::ordinary(None));
        let dropped = heap.alloc(JsObject::ordinary(Some(kept)));
        assert_eq!(heap.sweep(&[true, false]), 1);
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.allocations(), 0);

        let reused = heap.alloc(JsObject::ordinary(None));
        assert_eq!(reused, dropped);
        assert_eq!(heap.get(reused).prototype, None);
        assert_eq!(heap.len(), 2);
        assert_eq!(heap.capacity(), 2);
    }

    #[test]
    fn test_property_table_keeps_insertion_order() {
        let mut obj = JsObject::ordinary(None);
        obj.properties
            .insert(PropertyKey::from("b"), Property::plain(JsValue::Number(1.0)));
        obj.properties
            .insert(PropertyKey::from("a"), Property::plain(JsValue::Number(2.0)));
        let keys: Vec<String> = obj.properties.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(obj.own_data(&PropertyKey::from("a")), Some(JsValue::Number(2.0)));
    }

    #[test]
    fn test_accessor_descriptor_conversion() {
        let prop = Property::Accessor {
            get: None,
            set: None,
            enumerable: false,
            configurable: true,
        };
        let desc = PropertyDescriptor::from(prop);
        assert!(desc.is_accessor());
        assert!(!desc.is_data());
        assert_eq!(desc.configurable, Some(true));
    }
}
