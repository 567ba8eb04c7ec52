//! Static semantics tracked while parsing
//!
//! One `FunctionContext` exists per function (or script) being parsed, with
//! a stack of `BlockContext`s for the blocks open inside it. Declarations are
//! registered as they are parsed, so redeclaration conflicts are found in a
//! single pass without re-walking the tree.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::ast::{BlockScope, FunctionForm, FunctionKind, FunctionNode, LexicalBinding, VarScope};
use crate::value::{CheapClone, JsString};

/// A label in scope, with whether it labels an iteration statement.
#[derive(Debug, Clone)]
pub(super) struct Label {
    pub name: JsString,
    pub iteration: bool,
}

/// Declarations of one block (or the top level of a function body).
#[derive(Debug, Default)]
pub(super) struct BlockContext {
    pub lexical: Vec<LexicalBinding>,
    pub functions: Vec<Rc<FunctionNode>>,
    declared: FxHashSet<JsString>,
    function_names: FxHashSet<JsString>,
    /// `var` names declared in this block or any block nested in it.
    vars: FxHashSet<JsString>,
    /// Bound names of the catch parameter when this is a catch body.
    catch_params: Vec<JsString>,
}

impl BlockContext {
    pub fn with_catch_params(catch_params: Vec<JsString>) -> Self {
        Self {
            catch_params,
            ..Self::default()
        }
    }

    pub fn into_scope(self) -> BlockScope {
        BlockScope {
            lexical: self.lexical,
            functions: self.functions,
        }
    }

    fn conflicts(&self, name: &JsString) -> bool {
        self.declared.contains(name) || self.vars.contains(name) || self.catch_params.contains(name)
    }
}

fn redeclaration(name: &JsString) -> String {
    format!("Identifier '{name}' has already been declared")
}

/// Everything the parser knows about the function currently being parsed.
#[derive(Debug)]
pub(super) struct FunctionContext {
    pub kind: FunctionKind,
    pub arrow: bool,
    pub strict: bool,
    /// A script, module or eval body, where `return` is not allowed.
    pub top_level: bool,
    pub allow_new_target: bool,
    pub allow_super_property: bool,
    pub allow_super_call: bool,
    pub uses_arguments: bool,
    /// The body starts with a "use strict" directive.
    pub has_use_strict: bool,
    /// Parsing the formal parameter list.
    pub in_params: bool,
    pub param_names: Vec<JsString>,
    pub labels: Vec<Label>,
    pub breakable_depth: u32,
    pub iteration_depth: u32,
    var_names: Vec<JsString>,
    var_set: FxHashSet<JsString>,
    functions: Vec<Rc<FunctionNode>>,
    top: BlockContext,
    blocks: Vec<BlockContext>,
}

impl Default for FunctionContext {
    fn default() -> Self {
        Self::top_level(false)
    }
}

impl FunctionContext {
    pub fn top_level(strict: bool) -> Self {
        Self {
            kind: FunctionKind::Normal,
            arrow: false,
            strict,
            top_level: true,
            allow_new_target: false,
            allow_super_property: false,
            allow_super_call: false,
            uses_arguments: false,
            has_use_strict: false,
            in_params: false,
            param_names: Vec::new(),
            labels: Vec::new(),
            breakable_depth: 0,
            iteration_depth: 0,
            var_names: Vec::new(),
            var_set: FxHashSet::default(),
            functions: Vec::new(),
            top: BlockContext::default(),
            blocks: Vec::new(),
        }
    }

    /// Context for a function nested in `parent`. Arrow functions inherit
    /// the parent's `new.target` and `super` permissions.
    pub fn function(parent: &FunctionContext, kind: FunctionKind, form: FunctionForm) -> Self {
        let arrow = form == FunctionForm::Arrow;
        let mut ctx = Self::top_level(parent.strict);
        ctx.kind = kind;
        ctx.arrow = arrow;
        ctx.top_level = false;
        if arrow {
            ctx.allow_new_target = parent.allow_new_target;
            ctx.allow_super_property = parent.allow_super_property;
            ctx.allow_super_call = parent.allow_super_call;
        } else {
            ctx.allow_new_target = true;
            ctx.allow_super_property = matches!(
                form,
                FunctionForm::Method
                    | FunctionForm::Getter
                    | FunctionForm::Setter
                    | FunctionForm::ClassConstructor { .. }
            );
            ctx.allow_super_call = form == FunctionForm::ClassConstructor { derived: true };
        }
        ctx
    }

    fn current_block(&mut self) -> &mut BlockContext {
        match self.blocks.last_mut() {
            Some(block) => block,
            None => &mut self.top,
        }
    }

    pub fn push_block(&mut self, block: BlockContext) {
        self.blocks.push(block);
    }

    pub fn pop_block(&mut self) -> BlockContext {
        self.blocks.pop().unwrap_or_default()
    }

    /// No block is open, so declarations land at the top level.
    pub fn at_top_block(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn find_label(&self, name: &JsString) -> Option<&Label> {
        self.labels.iter().rev().find(|label| &label.name == name)
    }

    /// Register a `var` name. Conflicts with a lexical declaration in any
    /// enclosing block of the same function.
    pub fn declare_var(&mut self, name: JsString) -> Result<(), String> {
        for block in self.blocks.iter_mut().rev().chain(std::iter::once(&mut self.top)) {
            if block.declared.contains(&name) {
                return Err(redeclaration(&name));
            }
            block.vars.insert(name.cheap_clone());
        }
        if self.var_set.insert(name.cheap_clone()) {
            self.var_names.push(name);
        }
        Ok(())
    }

    /// Register a let/const/class/import name in the innermost block.
    /// `emit` is false for names whose bindings are created elsewhere (imports).
    pub fn declare_lexical(&mut self, name: JsString, constant: bool, emit: bool) -> Result<(), String> {
        let shadows_param = self.blocks.is_empty() && self.param_names.contains(&name);
        let block = self.current_block();
        if shadows_param || block.conflicts(&name) {
            return Err(redeclaration(&name));
        }
        block.declared.insert(name.cheap_clone());
        if emit {
            block.lexical.push(LexicalBinding { name, constant });
        }
        Ok(())
    }

    /// Register a function declaration. At the top level of a body it is
    /// var-scoped; inside a block it is lexical.
    pub fn declare_function(&mut self, name: JsString, node: Rc<FunctionNode>) -> Result<(), String> {
        if self.blocks.is_empty() {
            if self.top.declared.contains(&name) {
                return Err(redeclaration(&name));
            }
            self.top.vars.insert(name);
            self.functions.push(node);
            return Ok(());
        }
        let strict = self.strict;
        let block = self.current_block();
        let sloppy_duplicate = !strict && block.function_names.contains(&name);
        if !sloppy_duplicate && block.conflicts(&name) {
            return Err(redeclaration(&name));
        }
        block.declared.insert(name.cheap_clone());
        block.function_names.insert(name);
        block.functions.push(node);
        Ok(())
    }

    /// Whether `name` is declared at the top level (any declaration form).
    pub fn declares_top_level(&self, name: &JsString) -> bool {
        self.top.declared.contains(name) || self.top.vars.contains(name)
    }

    pub fn into_var_scope(self) -> VarScope {
        VarScope {
            var_names: self.var_names,
            functions: self.functions,
            lexical: self.top.lexical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(name: &str) -> JsString {
        JsString::from(name)
    }

    #[test]
    fn test_var_conflicts_with_enclosing_lexical() {
        let mut ctx = FunctionContext::top_level(false);
        ctx.declare_lexical(s("x"), false, true).unwrap();
        ctx.push_block(BlockContext::default());
        assert!(ctx.declare_var(s("x")).is_err());
        assert!(ctx.declare_var(s("y")).is_ok());
        ctx.pop_block();
        // `y` was hoisted through the block, so a later `let y` conflicts
        assert!(ctx.declare_lexical(s("y"), false, true).is_err());
    }

    #[test]
    fn test_block_function_duplicates_depend_on_strictness() {
        let mut sloppy = FunctionContext::top_level(false);
        sloppy.push_block(BlockContext::default());
        let node = || {
            Rc::new(FunctionNode {
                id: Some(s("f")),
                name: s("f"),
                kind: FunctionKind::Normal,
                form: FunctionForm::Declaration,
                params: Rc::from(Vec::new()),
                body: crate::ast::FunctionBody::Block(Rc::from(Vec::new())),
                strict: false,
                scope: Rc::default(),
                param_names: Rc::from(Vec::new()),
                simple_params: true,
                has_param_expressions: false,
                has_duplicate_params: false,
                uses_arguments: false,
                length: 0,
                span: crate::lexer::Span::default(),
            })
        };
        sloppy.declare_function(s("f"), node()).unwrap();
        assert!(sloppy.declare_function(s("f"), node()).is_ok());

        let mut strict = FunctionContext::top_level(true);
        strict.push_block(BlockContext::default());
        strict.declare_function(s("f"), node()).unwrap();
        assert!(strict.declare_function(s("f"), node()).is_err());
    }

    #[test]
    fn test_lexical_conflicts_with_parameters_only_at_top() {
        let mut ctx = FunctionContext::top_level(false);
        ctx.param_names.push(s("a"));
        assert!(ctx.declare_lexical(s("a"), false, true).is_err());
        ctx.push_block(BlockContext::default());
        assert!(ctx.declare_lexical(s("a"), false, true).is_ok());
    }

    #[test]
    fn test_catch_parameter_conflicts() {
        let mut ctx = FunctionContext::top_level(false);
        ctx.push_block(BlockContext::with_catch_params(vec![s("e")]));
        assert!(ctx.declare_lexical(s("e"), false, true).is_err());
        // `var e` inside the catch body is allowed
        assert!(ctx.declare_var(s("e")).is_ok());
    }
}
