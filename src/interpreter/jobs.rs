//! Jobs
//!
//! Deferred work queued by promise settlement and dynamic `import()`. The
//! agent drains its queue strictly after the running top-level unit has
//! finished, first in first out; jobs enqueued by a job go to the back of
//! the same queue.

use tracing::{debug, warn};

use crate::error::{JsError, JsResult};
use crate::value::{CheapClone, JsValue, ObjectId};

use super::promise::{PromiseCapability, PromiseReaction, ReactionHandler, ReactionKind};
use super::Interpreter;

/// A pending job. Opaque to hosts, which only decide when it runs.
#[derive(Debug, Clone)]
pub struct Job(pub(crate) JobKind);

#[derive(Debug, Clone)]
pub(crate) enum JobKind {
    /// NewPromiseReactionJob
    PromiseReaction {
        reaction: PromiseReaction,
        argument: JsValue,
    },
    /// NewPromiseResolveThenableJob
    ResolveThenable {
        promise: ObjectId,
        thenable: JsValue,
        then: JsValue,
    },
    /// Load, link and evaluate the module behind an `import()` call.
    DynamicImport {
        specifier: String,
        referrer: Option<String>,
        capability: PromiseCapability,
    },
}

impl Job {
    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self.0 {
            JobKind::PromiseReaction { .. } => "promise-reaction",
            JobKind::ResolveThenable { .. } => "resolve-thenable",
            JobKind::DynamicImport { .. } => "dynamic-import",
        }
    }
}

impl Interpreter {
    /// HostEnqueuePromiseJob
    pub(crate) fn enqueue_job(&mut self, job: Job) {
        debug!(job = job.label(), queued = self.jobs.len(), "enqueue job");
        self.host.enqueue_job(job, &mut self.jobs);
    }

    /// Run one job. Only fatal engine errors are returned; a guest error
    /// escaping a job has nowhere to go and is logged.
    pub(crate) fn run_job(&mut self, job: Job) -> JsResult<()> {
        let result = match job.0 {
            JobKind::PromiseReaction { reaction, argument } => self.run_reaction(reaction, argument),
            JobKind::ResolveThenable {
                promise,
                thenable,
                then,
            } => self.run_resolve_thenable(promise, thenable, then),
            JobKind::DynamicImport {
                specifier,
                referrer,
                capability,
            } => self.run_dynamic_import(&specifier, referrer.as_deref(), capability),
        };
        match result {
            Err(err) if err.is_catchable() => {
                let err = self.finalize_error(err);
                warn!(error = %err, "job failed");
                Ok(())
            }
            other => other,
        }
    }

    fn run_reaction(&mut self, reaction: PromiseReaction, argument: JsValue) -> JsResult<()> {
        let outcome = match reaction.handler {
            ReactionHandler::Empty => match reaction.kind {
                ReactionKind::Fulfill => Ok(argument),
                ReactionKind::Reject => Err(argument),
            },
            ReactionHandler::Callable(handler) => {
                match self.call(&handler, JsValue::Undefined, &[argument]) {
                    Ok(value) => Ok(value),
                    Err(err) if err.is_catchable() => Err(self.error_to_value(err)),
                    Err(err) => return Err(err),
                }
            }
            ReactionHandler::Await(coroutine) => {
                return self.resume_after_await(coroutine, reaction.kind, argument);
            }
            ReactionHandler::AsyncGenAwaitReturn(coroutine) => {
                return self.async_generator_return_settled(coroutine, reaction.kind, argument);
            }
        };
        let Some(capability) = reaction.capability else {
            return Ok(());
        };
        match outcome {
            Ok(value) => self.call(&capability.resolve, JsValue::Undefined, &[value])?,
            Err(reason) => self.call(&capability.reject, JsValue::Undefined, &[reason])?,
        };
        Ok(())
    }

    fn run_resolve_thenable(&mut self, promise: ObjectId, thenable: JsValue, then: JsValue) -> JsResult<()> {
        let (resolve, reject) = self.create_resolving_functions(promise);
        let mark = self.root_values(&[resolve.cheap_clone(), reject.cheap_clone()]);
        let result = match self.call(&then, thenable, &[resolve, reject.cheap_clone()]) {
            Ok(_) => Ok(()),
            Err(err) if err.is_catchable() => {
                let reason = self.error_to_value(err);
                self.call(&reject, JsValue::Undefined, &[reason]).map(drop)
            }
            Err(err) => Err(err),
        };
        self.unroot_values(mark);
        result
    }

    /// Reject `capability` with the guest value of `err`, or propagate a
    /// fatal error.
    pub(crate) fn reject_with(&mut self, capability: &PromiseCapability, err: JsError) -> JsResult<()> {
        if !err.is_catchable() {
            return Err(err);
        }
        let reason = self.error_to_value(err);
        self.call(&capability.reject, JsValue::Undefined, &[reason])?;
        Ok(())
    }
}
