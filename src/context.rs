//! Execution contexts
//!
//! The context stack tracks which function, realm and environments are
//! active. The agent is never without a running context: when no guest
//! code runs, the host context of the first realm answers lookups of the
//! current realm.

use crate::environment::EnvId;
use crate::interpreter::coroutine::CoroutineId;
use crate::interpreter::module::ModuleId;
use crate::realm::RealmId;
use crate::value::ObjectId;

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The function whose code runs here; `None` for scripts, modules and eval.
    pub function: Option<ObjectId>,
    pub realm: RealmId,
    pub script_or_module: Option<ModuleId>,
    pub lexical_env: EnvId,
    pub variable_env: EnvId,
    /// Set when this context belongs to a generator or async body.
    pub coroutine: Option<CoroutineId>,
}

impl ExecutionContext {
    /// A context for top-level code of `realm` running in `env`.
    pub fn top_level(realm: RealmId, env: EnvId, script_or_module: Option<ModuleId>) -> Self {
        ExecutionContext {
            function: None,
            realm,
            script_or_module,
            lexical_env: env,
            variable_env: env,
            coroutine: None,
        }
    }
}

#[derive(Debug)]
pub struct ContextStack {
    host: ExecutionContext,
    stack: Vec<ExecutionContext>,
}

impl ContextStack {
    pub fn new(host: ExecutionContext) -> Self {
        ContextStack {
            host,
            stack: Vec::new(),
        }
    }

    /// The running execution context.
    pub fn running(&self) -> &ExecutionContext {
        self.stack.last().unwrap_or(&self.host)
    }

    pub fn running_mut(&mut self) -> &mut ExecutionContext {
        match self.stack.last_mut() {
            Some(ctx) => ctx,
            None => &mut self.host,
        }
    }

    pub fn push(&mut self, ctx: ExecutionContext) {
        self.stack.push(ctx);
    }

    pub fn pop(&mut self) -> Option<ExecutionContext> {
        self.stack.pop()
    }

    /// The host context followed by every pushed context, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionContext> {
        std::iter::once(&self.host).chain(&self.stack)
    }

    /// Number of guest contexts on the stack.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// No guest code is running.
    pub fn is_idle(&self) -> bool {
        self.stack.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{EnvironmentArena, EnvironmentKind};

    #[test]
    fn test_host_context_answers_when_idle() {
        let mut envs = EnvironmentArena::new();
        let global = envs.alloc(None, EnvironmentKind::Declarative);
        let inner = envs.new_declarative(global);
        let mut stack = ContextStack::new(ExecutionContext::top_level(RealmId(0), global, None));
        assert!(stack.is_idle());
        assert_eq!(stack.running().lexical_env, global);

        stack.push(ExecutionContext::top_level(RealmId(0), inner, None));
        assert_eq!(stack.depth(), 1);
        stack.running_mut().lexical_env = global;
        let popped = stack.pop().unwrap();
        assert_eq!(popped.lexical_env, global);
        assert!(stack.is_idle());
    }
}
