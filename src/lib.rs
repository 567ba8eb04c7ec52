//! Embeddable JavaScript execution engine
//!
//! Scripts and modules are parsed into a typed tree and run on a frame
//! machine that can suspend generator and async bodies mid-statement.
//! Promise continuations go through a single FIFO job queue that the
//! host drains explicitly or that [`Runtime::eval`] drains after each run.
//!
//! # Example
//!
//! ```
//! use jsrun::{JsValue, Runtime};
//!
//! let mut runtime = Runtime::new();
//! let result = runtime.eval("1 + 2 * 3").unwrap();
//! assert_eq!(result, JsValue::Number(7.0));
//! ```

pub mod ast;
pub mod completion;
pub mod config;
pub mod context;
pub mod environment;
pub mod error;
pub mod host;
pub mod interpreter;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod realm;
pub mod reference;
pub mod string_dict;
pub mod value;

pub use config::RuntimeConfig;
pub use error::{ErrorKind, JsError, JsResult};
pub use host::{DefaultHost, HostHooks};
pub use interpreter::gc::CollectStats;
pub use interpreter::module::ModuleId;
pub use interpreter::promise::UnhandledRejection;
pub use interpreter::{Interpreter, RuntimeStats};
pub use value::{CheapClone, JsString, JsValue, ObjectId};

use tracing::warn;

use interpreter::builtins::{js_value_to_json, json_to_js_value};

/// The host-facing entry point: one agent with one realm.
pub struct Runtime {
    interpreter: Interpreter,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Runtime {
            interpreter: Interpreter::new(config),
        }
    }

    /// Replace the host hooks (job scheduling, dynamic import resolution,
    /// dynamic code policy, rejection reporting and `print` output).
    pub fn set_host(&mut self, host: impl HostHooks + 'static) {
        self.interpreter.set_host(Box::new(host));
    }

    pub fn config(&self) -> &RuntimeConfig {
        self.interpreter.config()
    }

    pub fn stats(&self) -> RuntimeStats {
        self.interpreter.stats()
    }

    /// Run a full garbage collection now.
    ///
    /// Values this runtime returned stay alive until
    /// [`Runtime::release_handles`]; anything else unreachable from the
    /// global object, the job queue or a registered module is freed.
    pub fn collect_garbage(&mut self) -> CollectStats {
        self.interpreter.collect_garbage()
    }

    /// Let the collector reclaim every value this runtime has returned so
    /// far. Handles obtained earlier must not be used afterwards.
    pub fn release_handles(&mut self) {
        self.interpreter.release_host_roots();
    }

    /// Direct access to the agent, for embedders that need the object model.
    pub fn interpreter(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }

    /// Run `source` as a global script, then drain the job queue.
    ///
    /// Returns the completion value of the script. A value thrown out of
    /// the script surfaces as [`JsError::Thrown`] with a readable
    /// description.
    pub fn eval(&mut self, source: &str) -> JsResult<JsValue> {
        let result = self.interpreter.run_script(source);
        self.settle(result)
    }

    /// Register module source text under `specifier`. Registration only
    /// parses; the module body runs when it is first evaluated or imported.
    pub fn register_module(&mut self, specifier: &str, source: &str) -> JsResult<ModuleId> {
        self.interpreter
            .register_module(specifier, source)
            .map_err(|err| self.interpreter.finalize_error(err))
    }

    /// Link and evaluate a registered module, then drain the job queue.
    /// Returns the module's namespace object.
    pub fn eval_module(&mut self, specifier: &str) -> JsResult<JsValue> {
        let id = self
            .interpreter
            .modules
            .lookup(specifier)
            .ok_or_else(|| JsError::module_error(format!("Cannot find module '{specifier}'")))?;
        let result = self
            .interpreter
            .evaluate_module(id)
            .map(|()| JsValue::Object(self.interpreter.get_namespace(id)));
        self.settle(result)
    }

    /// Run queued jobs until the queue is empty.
    pub fn run_jobs(&mut self) -> JsResult<()> {
        self.interpreter
            .run_jobs()
            .map_err(|err| self.interpreter.finalize_error(err))
    }

    /// Call a guest function, then drain the job queue.
    pub fn call(&mut self, func: &JsValue, this: JsValue, args: &[JsValue]) -> JsResult<JsValue> {
        let result = self.interpreter.call(func, this, args);
        self.settle(result)
    }

    /// Read a global binding: a property of the global object or a
    /// top-level `let`/`const`/`class` declaration.
    pub fn get_global(&mut self, name: &str) -> JsResult<JsValue> {
        let name = self.interpreter.intern(name);
        let global_env = self.interpreter.realm().global_env;
        let result = self.interpreter.get_binding_value(global_env, &name, true);
        self.hand_out(result)
    }

    /// Read a property of a guest value, running getters.
    pub fn get(&mut self, target: &JsValue, name: &str) -> JsResult<JsValue> {
        let result = self.interpreter.get_named(target, name);
        self.hand_out(result)
    }

    /// Convert a guest value to JSON the way `JSON.stringify` would.
    pub fn to_json(&mut self, value: &JsValue) -> JsResult<serde_json::Value> {
        self.interpreter
            .without_gc(|interp| js_value_to_json(interp, value))
            .map_err(|err| self.interpreter.finalize_error(err))
    }

    /// Build a guest value from JSON.
    pub fn from_json(&mut self, json: &serde_json::Value) -> JsValue {
        let value = json_to_js_value(&mut self.interpreter, json);
        self.interpreter.pin_for_host(&value);
        value
    }

    /// Rejected promises that had no handler when the job queue last
    /// drained, oldest first.
    pub fn unhandled_rejections(&self) -> &[UnhandledRejection] {
        &self.interpreter.unhandled_rejections
    }

    /// Drain the job queue after a run. Jobs queued before a script threw
    /// still run; the script's own error is what the caller sees.
    fn settle(&mut self, result: JsResult<JsValue>) -> JsResult<JsValue> {
        match self.hand_out(result) {
            Ok(value) => {
                self.run_jobs()?;
                Ok(value)
            }
            Err(err) => {
                if err.is_catchable()
                    && let Err(job_err) = self.run_jobs()
                {
                    warn!(error = %job_err, "job failed after an uncaught error");
                }
                Err(err)
            }
        }
    }

    /// Keep a value or thrown value alive for the host and give thrown
    /// errors their description.
    fn hand_out(&mut self, result: JsResult<JsValue>) -> JsResult<JsValue> {
        match result {
            Ok(value) => {
                self.interpreter.pin_for_host(&value);
                Ok(value)
            }
            Err(err) => {
                if let JsError::Thrown { value, .. } = &err {
                    self.interpreter.pin_for_host(value);
                }
                Err(self.interpreter.finalize_error(err))
            }
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_arithmetic() {
        let mut runtime = Runtime::new();
        assert_eq!(runtime.eval("1 + 2 * 3").unwrap(), JsValue::Number(7.0));
    }

    #[test]
    fn test_uncaught_error_has_description() {
        let mut runtime = Runtime::new();
        let err = runtime.eval("throw new TypeError('bad thing')").unwrap_err();
        assert_eq!(err.to_string(), "Uncaught TypeError: bad thing");
    }

    #[test]
    fn test_get_global_sees_lexical_declarations() {
        let mut runtime = Runtime::new();
        runtime.eval("let answer = 42; var other = 1;").unwrap();
        assert_eq!(runtime.get_global("answer").unwrap(), JsValue::Number(42.0));
        assert_eq!(runtime.get_global("other").unwrap(), JsValue::Number(1.0));
        assert!(matches!(
            runtime.get_global("missing"),
            Err(JsError::ReferenceError { .. })
        ));
    }

    #[test]
    fn test_call_guest_function() {
        let mut runtime = Runtime::new();
        runtime.eval("function add(a, b) { return a + b; }").unwrap();
        let add = runtime.get_global("add").unwrap();
        let result = runtime
            .call(&add, JsValue::Undefined, &[JsValue::Number(2.0), JsValue::Number(3.0)])
            .unwrap();
        assert_eq!(result, JsValue::Number(5.0));
    }

    #[test]
    fn test_jobs_drain_after_uncaught_error() {
        let mut runtime = Runtime::new();
        let err = runtime
            .eval("var done = false; Promise.resolve().then(() => { done = true; }); throw new Error('boom');")
            .unwrap_err();
        assert_eq!(err.to_string(), "Uncaught Error: boom");
        assert_eq!(runtime.get_global("done").unwrap(), JsValue::Boolean(true));
        assert!(runtime.stats().jobs_run > 0);
    }

    #[test]
    fn test_json_bridge() {
        let mut runtime = Runtime::new();
        let input = serde_json::json!({ "name": "x", "tags": [1, 2] });
        let value = runtime.from_json(&input);
        assert_eq!(runtime.to_json(&value).unwrap(), input);
    }

    #[test]
    fn test_eval_module_returns_namespace() {
        let mut runtime = Runtime::new();
        runtime.register_module("math", "export const two = 2;").unwrap();
        runtime
            .register_module("main", "import { two } from 'math'; export const four = two * 2;")
            .unwrap();
        let namespace = runtime.eval_module("main").unwrap();
        assert_eq!(runtime.get(&namespace, "four").unwrap(), JsValue::Number(4.0));
    }
}
