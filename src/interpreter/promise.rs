//! Promise machinery
//!
//! Promise records, resolving functions, capabilities and reactions. The
//! built-in `Promise` constructor and prototype methods live in
//! `builtins/promise.rs`; `await` and async generators reuse the same
//! reaction path through dedicated handler kinds, so a suspended coroutine
//! is resumed by an ordinary promise job.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use crate::error::{JsError, JsResult};
use crate::object::{JsObject, NativeCall, NativeData, ObjectKind};
use crate::value::{CheapClone, JsValue, ObjectId};

use super::coroutine::CoroutineId;
use super::jobs::{Job, JobKind};
use super::Interpreter;

/// [[PromiseState]] together with [[PromiseResult]].
#[derive(Debug, Clone)]
pub enum PromiseStatus {
    Pending,
    Fulfilled(JsValue),
    Rejected(JsValue),
}

/// Internal slots of a promise object.
#[derive(Debug, Clone)]
pub struct PromiseData {
    pub(crate) status: PromiseStatus,
    pub(crate) fulfill_reactions: Vec<PromiseReaction>,
    pub(crate) reject_reactions: Vec<PromiseReaction>,
    pub(crate) is_handled: bool,
}

impl PromiseData {
    fn pending() -> Self {
        PromiseData {
            status: PromiseStatus::Pending,
            fulfill_reactions: Vec::new(),
            reject_reactions: Vec::new(),
            is_handled: false,
        }
    }

    pub fn status(&self) -> &PromiseStatus {
        &self.status
    }
}

/// A rejected promise that had no handler when the job queue drained.
#[derive(Debug, Clone, PartialEq)]
pub struct UnhandledRejection {
    pub promise: ObjectId,
    pub reason: JsValue,
}

/// PromiseCapability Record
#[derive(Debug, Clone)]
pub struct PromiseCapability {
    pub(crate) promise: ObjectId,
    pub(crate) resolve: JsValue,
    pub(crate) reject: JsValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionKind {
    Fulfill,
    Reject,
}

/// What runs when a reaction job fires.
#[derive(Debug, Clone)]
pub enum ReactionHandler {
    Callable(JsValue),
    /// Pass the argument through (identity or thrower).
    Empty,
    /// Resume a coroutine suspended at `await`.
    Await(CoroutineId),
    /// Finish an async generator's pending `return` request.
    AsyncGenAwaitReturn(CoroutineId),
}

/// PromiseReaction Record
#[derive(Debug, Clone)]
pub struct PromiseReaction {
    pub(crate) capability: Option<PromiseCapability>,
    pub(crate) kind: ReactionKind,
    pub(crate) handler: ReactionHandler,
}

impl Interpreter {
    /// A pending promise with the given prototype.
    pub(crate) fn create_promise(&mut self, proto: ObjectId) -> ObjectId {
        self.alloc(JsObject::new(
            Some(proto),
            ObjectKind::Promise(Box::new(PromiseData::pending())),
        ))
    }

    fn promise_data(&self, promise: ObjectId) -> JsResult<&PromiseData> {
        self.heap
            .get(promise)
            .promise()
            .ok_or_else(|| JsError::internal("expected a promise object"))
    }

    fn promise_data_mut(&mut self, promise: ObjectId) -> JsResult<&mut PromiseData> {
        self.heap
            .get_mut(promise)
            .promise_mut()
            .ok_or_else(|| JsError::internal("expected a promise object"))
    }

    /// CreateResolvingFunctions
    pub(crate) fn create_resolving_functions(&mut self, promise: ObjectId) -> (JsValue, JsValue) {
        let already_resolved = Rc::new(Cell::new(false));
        let resolve = self.create_native_with_data(
            "",
            promise_resolve_function,
            1,
            NativeData::Resolving {
                promise,
                already_resolved: already_resolved.clone(),
            },
        );
        let reject = self.create_native_with_data(
            "",
            promise_reject_function,
            1,
            NativeData::Resolving {
                promise,
                already_resolved,
            },
        );
        (JsValue::Object(resolve), JsValue::Object(reject))
    }

    /// The body of a promise resolve function once it has not been used.
    pub(crate) fn resolve_promise(&mut self, promise: ObjectId, resolution: JsValue) -> JsResult<()> {
        if resolution.as_object() == Some(promise) {
            let error = self.create_error(
                crate::error::ErrorKind::TypeError,
                "Chaining cycle detected for promise",
            );
            return self.reject_promise(promise, JsValue::Object(error));
        }
        if !resolution.is_object() {
            return self.fulfill_promise(promise, resolution);
        }
        let then = match self.get_named(&resolution, "then") {
            Ok(then) => then,
            Err(err) if err.is_catchable() => {
                let reason = self.error_to_value(err);
                return self.reject_promise(promise, reason);
            }
            Err(err) => return Err(err),
        };
        if !self.is_callable(&then) {
            return self.fulfill_promise(promise, resolution);
        }
        self.enqueue_job(Job(JobKind::ResolveThenable {
            promise,
            thenable: resolution,
            then,
        }));
        Ok(())
    }

    /// FulfillPromise
    pub(crate) fn fulfill_promise(&mut self, promise: ObjectId, value: JsValue) -> JsResult<()> {
        let data = self.promise_data_mut(promise)?;
        if !matches!(data.status, PromiseStatus::Pending) {
            return Err(JsError::internal("settling a promise twice"));
        }
        let reactions = std::mem::take(&mut data.fulfill_reactions);
        data.reject_reactions.clear();
        data.status = PromiseStatus::Fulfilled(value.cheap_clone());
        self.trigger_reactions(reactions, value);
        Ok(())
    }

    /// RejectPromise
    pub(crate) fn reject_promise(&mut self, promise: ObjectId, reason: JsValue) -> JsResult<()> {
        let data = self.promise_data_mut(promise)?;
        if !matches!(data.status, PromiseStatus::Pending) {
            return Err(JsError::internal("settling a promise twice"));
        }
        let reactions = std::mem::take(&mut data.reject_reactions);
        data.fulfill_reactions.clear();
        data.status = PromiseStatus::Rejected(reason.cheap_clone());
        let handled = data.is_handled;
        if !handled {
            self.pending_rejections.push(promise);
        }
        self.trigger_reactions(reactions, reason);
        Ok(())
    }

    fn trigger_reactions(&mut self, reactions: Vec<PromiseReaction>, argument: JsValue) {
        for reaction in reactions {
            self.enqueue_job(Job(JobKind::PromiseReaction {
                reaction,
                argument: argument.cheap_clone(),
            }));
        }
    }

    /// NewPromiseCapability(%Promise%) without observable lookups.
    pub(crate) fn new_intrinsic_capability(&mut self) -> PromiseCapability {
        let proto = self.intrinsics().promise_prototype;
        let promise = self.create_promise(proto);
        let (resolve, reject) = self.create_resolving_functions(promise);
        PromiseCapability {
            promise,
            resolve,
            reject,
        }
    }

    /// NewPromiseCapability(C)
    pub(crate) fn new_promise_capability(&mut self, ctor: &JsValue) -> JsResult<PromiseCapability> {
        if ctor.as_object() == Some(self.intrinsics().promise_constructor) {
            return Ok(self.new_intrinsic_capability());
        }
        if !self.is_constructor(ctor) {
            let shown = self.describe_value(ctor);
            return Err(JsError::type_error(format!("{shown} is not a constructor")));
        }
        let slots = Rc::new(RefCell::new((JsValue::Undefined, JsValue::Undefined)));
        let executor = self.create_native_with_data(
            "",
            capability_executor,
            2,
            NativeData::CapabilityExecutor(slots.clone()),
        );
        let promise = self.construct(ctor, &[JsValue::Object(executor)], None)?;
        let (resolve, reject) = slots.borrow().clone();
        if !self.is_callable(&resolve) {
            return Err(JsError::type_error("Promise resolve function is not callable"));
        }
        if !self.is_callable(&reject) {
            return Err(JsError::type_error("Promise reject function is not callable"));
        }
        let Some(promise) = promise.as_object() else {
            return Err(JsError::type_error("Promise constructor returned a non-object"));
        };
        Ok(PromiseCapability {
            promise,
            resolve,
            reject,
        })
    }

    /// PerformPromiseThen
    pub(crate) fn perform_promise_then(
        &mut self,
        promise: ObjectId,
        on_fulfilled: ReactionHandler,
        on_rejected: ReactionHandler,
        capability: Option<PromiseCapability>,
    ) -> JsResult<()> {
        let fulfill = PromiseReaction {
            capability: capability.clone(),
            kind: ReactionKind::Fulfill,
            handler: on_fulfilled,
        };
        let reject = PromiseReaction {
            capability,
            kind: ReactionKind::Reject,
            handler: on_rejected,
        };
        let data = self.promise_data_mut(promise)?;
        let was_handled = data.is_handled;
        data.is_handled = true;
        match data.status.clone() {
            PromiseStatus::Pending => {
                data.fulfill_reactions.push(fulfill);
                data.reject_reactions.push(reject);
            }
            PromiseStatus::Fulfilled(value) => {
                self.enqueue_job(Job(JobKind::PromiseReaction {
                    reaction: fulfill,
                    argument: value,
                }));
            }
            PromiseStatus::Rejected(reason) => {
                if !was_handled {
                    self.pending_rejections.retain(|p| *p != promise);
                }
                self.enqueue_job(Job(JobKind::PromiseReaction {
                    reaction: reject,
                    argument: reason,
                }));
            }
        }
        Ok(())
    }

    /// PromiseResolve(C, x)
    pub(crate) fn promise_resolve(&mut self, ctor: ObjectId, value: JsValue) -> JsResult<ObjectId> {
        if let Some(id) = value.as_object()
            && self.heap.get(id).promise().is_some()
        {
            let constructor = self.get_named(&value, "constructor")?;
            if constructor.as_object() == Some(ctor) {
                return Ok(id);
            }
        }
        let capability = self.new_promise_capability(&JsValue::Object(ctor))?;
        self.call(&capability.resolve, JsValue::Undefined, &[value])?;
        Ok(capability.promise)
    }

    /// Report rejections that are still unhandled once the queue drained.
    /// Only the rejections of the latest drain are kept.
    pub(crate) fn report_unhandled_rejections(&mut self) {
        self.unhandled_rejections.clear();
        for promise in std::mem::take(&mut self.pending_rejections) {
            let Ok(data) = self.promise_data(promise) else {
                continue;
            };
            if data.is_handled {
                continue;
            }
            let PromiseStatus::Rejected(reason) = data.status.clone() else {
                continue;
            };
            let description = self.describe_value(&reason);
            debug!(reason = %description, "unhandled rejection");
            self.host.report_unhandled_rejection(promise, &reason, &description);
            self.unhandled_rejections.push(UnhandledRejection { promise, reason });
        }
    }
}

fn resolving_slots(interp: &Interpreter, callee: ObjectId) -> JsResult<(ObjectId, Rc<Cell<bool>>)> {
    match &interp.heap.get(callee).kind {
        ObjectKind::Native(native) => match &native.data {
            NativeData::Resolving {
                promise,
                already_resolved,
            } => Ok((*promise, already_resolved.clone())),
            _ => Err(JsError::internal("resolving function without promise")),
        },
        _ => Err(JsError::internal("resolving function is not native")),
    }
}

/// Promise resolve functions
fn promise_resolve_function(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    let (promise, already_resolved) = resolving_slots(interp, call.callee)?;
    if already_resolved.replace(true) {
        return Ok(JsValue::Undefined);
    }
    let resolution = args.first().cloned().unwrap_or_default();
    interp.resolve_promise(promise, resolution)?;
    Ok(JsValue::Undefined)
}

/// Promise reject functions
fn promise_reject_function(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    let (promise, already_resolved) = resolving_slots(interp, call.callee)?;
    if already_resolved.replace(true) {
        return Ok(JsValue::Undefined);
    }
    let reason = args.first().cloned().unwrap_or_default();
    interp.reject_promise(promise, reason)?;
    Ok(JsValue::Undefined)
}

/// GetCapabilitiesExecutor functions
fn capability_executor(
    interp: &mut Interpreter,
    _this: JsValue,
    args: &[JsValue],
    call: NativeCall,
) -> JsResult<JsValue> {
    let slots = match &interp.heap.get(call.callee).kind {
        ObjectKind::Native(native) => native.data.capability_slots().cloned(),
        _ => None,
    };
    let Some(slots) = slots else {
        return Err(JsError::internal("capability executor without slots"));
    };
    let mut slots = slots.borrow_mut();
    if !slots.0.is_undefined() {
        return Err(JsError::type_error("Promise executor has already been invoked with non-undefined arguments"));
    }
    if !slots.1.is_undefined() {
        return Err(JsError::type_error("Promise executor has already been invoked with non-undefined arguments"));
    }
    slots.0 = args.first().cloned().unwrap_or_default();
    slots.1 = args.get(1).cloned().unwrap_or_default();
    Ok(JsValue::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;

    #[test]
    fn test_fulfilled_promise_runs_reaction_as_job() {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        let capability = interp.new_intrinsic_capability();
        interp
            .call(&capability.resolve, JsValue::Undefined, &[JsValue::Number(7.0)])
            .unwrap();
        assert!(matches!(
            interp.heap.get(capability.promise).promise().map(PromiseData::status),
            Some(PromiseStatus::Fulfilled(_))
        ));
        assert!(interp.jobs.is_empty());

        let derived = interp.new_intrinsic_capability();
        interp
            .perform_promise_then(
                capability.promise,
                ReactionHandler::Empty,
                ReactionHandler::Empty,
                Some(derived.clone()),
            )
            .unwrap();
        assert_eq!(interp.jobs.len(), 1);
        interp.run_jobs().unwrap();
        match interp.heap.get(derived.promise).promise().map(PromiseData::status) {
            Some(PromiseStatus::Fulfilled(value)) => assert_eq!(*value, JsValue::Number(7.0)),
            other => panic!("unexpected status {other:?}"),
        }
    }

    #[test]
    fn test_unhandled_rejection_is_reported_once() {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        let capability = interp.new_intrinsic_capability();
        interp
            .call(&capability.reject, JsValue::Undefined, &[JsValue::from("boom")])
            .unwrap();
        // A second call is ignored.
        interp
            .call(&capability.reject, JsValue::Undefined, &[JsValue::from("again")])
            .unwrap();
        interp.run_jobs().unwrap();
        assert_eq!(
            interp.unhandled_rejections,
            vec![UnhandledRejection {
                promise: capability.promise,
                reason: JsValue::from("boom"),
            }]
        );
        // The next drain has nothing new to report.
        interp.run_jobs().unwrap();
        assert!(interp.unhandled_rejections.is_empty());
    }

    #[test]
    fn test_handled_rejection_is_not_reported() {
        let mut interp = Interpreter::new(RuntimeConfig::default());
        let capability = interp.new_intrinsic_capability();
        interp
            .call(&capability.reject, JsValue::Undefined, &[JsValue::from("boom")])
            .unwrap();
        interp
            .perform_promise_then(
                capability.promise,
                ReactionHandler::Empty,
                ReactionHandler::Empty,
                None,
            )
            .unwrap();
        interp.run_jobs().unwrap();
        assert!(interp.unhandled_rejections.is_empty());
    }
}
