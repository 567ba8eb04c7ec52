//! Host hooks
//!
//! The embedder decides how jobs are scheduled, how dynamic import
//! specifiers resolve, whether dynamic code may be compiled, and where
//! unhandled rejections and `print` output go. Every hook has a default.

use std::collections::VecDeque;

use tracing::warn;

use crate::interpreter::jobs::Job;
use crate::realm::RealmId;
use crate::value::{JsValue, ObjectId};

pub trait HostHooks {
    /// HostEnqueuePromiseJob. The default appends to the agent's FIFO queue.
    ///
    /// Only jobs in `queue` are garbage-collection roots. A host that keeps
    /// jobs elsewhere must set `gc_threshold` to 0 or put them back in the
    /// queue before guest code runs again.
    fn enqueue_job(&mut self, job: Job, queue: &mut VecDeque<Job>) {
        queue.push_back(job);
    }

    /// Map the specifier of an `import()` call to the specifier of a
    /// registered module. `referrer` is the importing module, if any.
    fn resolve_dynamic_import(
        &mut self,
        specifier: &str,
        referrer: Option<&str>,
    ) -> Result<String, String> {
        let _ = referrer;
        Ok(specifier.to_string())
    }

    /// Whether `eval` may compile source text in `realm`.
    fn may_compile_dynamic_code(&mut self, realm: RealmId) -> bool {
        let _ = realm;
        true
    }

    /// A promise was rejected and no handler was attached by the time the
    /// job queue drained. `description` renders `reason` without running
    /// guest code. Both handles stay alive until the next drain.
    fn report_unhandled_rejection(&mut self, promise: ObjectId, reason: &JsValue, description: &str) {
        let _ = reason;
        warn!(?promise, reason = description, "unhandled promise rejection");
    }

    /// Output of the global `print` function.
    fn print(&mut self, text: &str) {
        println!("{text}");
    }
}

/// Host with every hook at its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHost;

impl HostHooks for DefaultHost {}
