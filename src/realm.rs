//! Realms
//!
//! A realm is one global object, its global environment and the set of
//! intrinsic objects built-ins and guest code refer to. Function objects
//! remember the realm they were created in, so errors they raise use that
//! realm's constructors.

use crate::environment::EnvId;
use crate::error::ErrorKind;
use crate::value::ObjectId;

/// Handle to a realm owned by the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RealmId(pub(crate) u32);

impl RealmId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// The well-known intrinsic objects of a realm.
#[derive(Debug, Clone)]
pub struct Intrinsics {
    pub object_prototype: ObjectId,
    pub function_prototype: ObjectId,
    pub array_prototype: ObjectId,
    pub array_prototype_values: ObjectId,
    pub iterator_prototype: ObjectId,
    pub array_iterator_prototype: ObjectId,
    pub async_iterator_prototype: ObjectId,
    pub async_from_sync_iterator_prototype: ObjectId,
    pub generator_function_prototype: ObjectId,
    pub generator_prototype: ObjectId,
    pub async_function_prototype: ObjectId,
    pub async_generator_function_prototype: ObjectId,
    pub async_generator_prototype: ObjectId,
    pub promise_prototype: ObjectId,
    pub promise_constructor: ObjectId,
    pub symbol_prototype: ObjectId,
    pub string_prototype: ObjectId,
    pub number_prototype: ObjectId,
    pub boolean_prototype: ObjectId,
    pub bigint_prototype: ObjectId,
    pub error_prototype: ObjectId,
    pub type_error_prototype: ObjectId,
    pub reference_error_prototype: ObjectId,
    pub range_error_prototype: ObjectId,
    pub syntax_error_prototype: ObjectId,
    pub eval_error_prototype: ObjectId,
    pub eval: ObjectId,
}

impl Intrinsics {
    pub fn error_prototype_for(&self, kind: ErrorKind) -> ObjectId {
        match kind {
            ErrorKind::Error => self.error_prototype,
            ErrorKind::TypeError => self.type_error_prototype,
            ErrorKind::ReferenceError => self.reference_error_prototype,
            ErrorKind::RangeError => self.range_error_prototype,
            ErrorKind::SyntaxError => self.syntax_error_prototype,
            ErrorKind::EvalError => self.eval_error_prototype,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Realm {
    pub global_object: ObjectId,
    pub global_env: EnvId,
    pub intrinsics: Intrinsics,
}
