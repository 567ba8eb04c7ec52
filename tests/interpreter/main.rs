//! Integration tests for the engine, organized by feature
//!
//! Every test goes through the public `Runtime` facade: scripts run to
//! completion and the job queue is drained before the result is returned.

mod async_await;
mod basics;
mod class;
mod control_flow;
mod errors;
mod eval;
mod function;
mod gc;
mod generator;
mod host;
mod modules;
mod promise;
mod scoping;

use std::cell::RefCell;
use std::rc::Rc;

use jsrun::{HostHooks, JsError, JsValue, ObjectId, Runtime};
use tracing_subscriber::EnvFilter;

/// Route engine diagnostics to the test output. Filter with `RUST_LOG`,
/// e.g. `RUST_LOG=jsrun=debug cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Evaluate a script in a fresh runtime, panicking on error.
#[allow(clippy::expect_used)]
pub fn eval(source: &str) -> JsValue {
    eval_result(source).expect("eval failed")
}

/// Evaluate a script in a fresh runtime.
pub fn eval_result(source: &str) -> Result<JsValue, JsError> {
    init_tracing();
    let mut runtime = Runtime::new();
    runtime.eval(source)
}

/// Check that evaluation fails with an error whose message contains `error_contains`.
pub fn throws_error(source: &str, error_contains: &str) -> bool {
    match eval_result(source) {
        Err(e) => e.to_string().contains(error_contains),
        Ok(_) => false,
    }
}

/// Host that records `print` output and rejection reports.
#[derive(Clone, Default)]
pub struct RecordingHost {
    pub printed: Rc<RefCell<Vec<String>>>,
    pub rejections: Rc<RefCell<Vec<String>>>,
    pub rejected: Rc<RefCell<Vec<(ObjectId, JsValue)>>>,
}

impl HostHooks for RecordingHost {
    fn report_unhandled_rejection(&mut self, promise: ObjectId, reason: &JsValue, description: &str) {
        self.rejections.borrow_mut().push(description.to_string());
        self.rejected.borrow_mut().push((promise, reason.clone()));
    }

    fn print(&mut self, text: &str) {
        self.printed.borrow_mut().push(text.to_string());
    }
}

/// Run a script with a recording host and return everything it printed.
#[allow(clippy::expect_used)]
pub fn printed(source: &str) -> Vec<String> {
    init_tracing();
    let host = RecordingHost::default();
    let mut runtime = Runtime::new();
    runtime.set_host(host.clone());
    runtime.eval(source).expect("eval failed");
    host.printed.borrow().clone()
}
