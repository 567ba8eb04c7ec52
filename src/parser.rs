//! Parser for JavaScript source code
//!
//! Recursive descent with precedence climbing for binary operators. Besides
//! the tree, the parser computes the static facts the runtime consumes
//! (declared names, strictness, parameter shape, label targets) and collects
//! early errors. Early errors are reported together as one batch after the
//! whole source text has been parsed; plain grammar errors stop parsing at
//! the first offending token.

mod scope;

use std::rc::Rc;

use rustc_hash::FxHashSet;
use tracing::debug;

use crate::ast::*;
use crate::error::{EarlyError, JsError, JsResult, SourceLocation};
use crate::lexer::{Lexer, LexerCheckpoint, Span, Token, TokenKind};
use crate::string_dict::StringDict;
use crate::value::{CheapClone, JsString, number_to_string};

use scope::{BlockContext, FunctionContext, Label};

/// The goal symbol a source text is parsed with.
#[derive(Debug, Clone, Copy)]
pub enum ParseGoal {
    Script { strict: bool },
    Module,
    Eval(EvalContext),
}

/// Where eval code runs, which decides what it may contain.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalContext {
    pub strict: bool,
    pub in_function: bool,
    pub in_method: bool,
    pub in_derived_constructor: bool,
}

/// Parse a classic script.
pub fn parse_script(source: &str, string_dict: &mut StringDict, strict: bool) -> JsResult<Program> {
    Parser::new(source, string_dict, ParseGoal::Script { strict }).parse_program()
}

/// Parse a module. Module code is always strict.
pub fn parse_module(source: &str, string_dict: &mut StringDict) -> JsResult<Program> {
    Parser::new(source, string_dict, ParseGoal::Module).parse_program()
}

/// Parse the argument of `eval`.
pub fn parse_eval(source: &str, string_dict: &mut StringDict, context: EvalContext) -> JsResult<Program> {
    Parser::new(source, string_dict, ParseGoal::Eval(context)).parse_program()
}

#[derive(Debug, Clone, Copy)]
enum Operator {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

/// Saved parser position for speculative parsing (arrow parameter lists).
struct ParserState {
    lexer: LexerCheckpoint,
    current: Token,
    previous: Token,
    errors: usize,
    cover_initializers: usize,
    depth: usize,
    no_in: bool,
}

struct FunctionHeader {
    id: Option<JsString>,
    name: JsString,
    kind: FunctionKind,
    form: FunctionForm,
    start: Span,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    previous: Token,
    goal: ParseGoal,
    /// The function being parsed; enclosing ones are in `outer`.
    ctx: FunctionContext,
    outer: Vec<FunctionContext>,
    errors: Vec<EarlyError>,
    /// `{ a = 1 }` in object literals; valid only if the literal becomes a pattern.
    cover_initializers: Vec<Span>,
    module: ModuleFacts,
    export_names: FxHashSet<JsString>,
    pending_exports: Vec<(JsString, Span)>,
    /// `in` is not a binary operator inside a for-statement head.
    no_in: bool,
    /// Labels that directly label the statement about to be parsed.
    pending_labels: Vec<JsString>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str, string_dict: &'a mut StringDict, goal: ParseGoal) -> Self {
        let mut lexer = Lexer::new(source, string_dict);
        let current = lexer.next_token();
        let ctx = match goal {
            ParseGoal::Script { strict } => FunctionContext::top_level(strict),
            ParseGoal::Module => FunctionContext::top_level(true),
            ParseGoal::Eval(eval) => {
                let mut ctx = FunctionContext::top_level(eval.strict);
                ctx.allow_new_target = eval.in_function;
                ctx.allow_super_property = eval.in_method;
                ctx.allow_super_call = eval.in_derived_constructor;
                ctx
            }
        };
        Self {
            lexer,
            previous: current.clone(),
            current,
            goal,
            ctx,
            outer: Vec::new(),
            errors: Vec::new(),
            cover_initializers: Vec::new(),
            module: ModuleFacts::default(),
            export_names: FxHashSet::default(),
            pending_exports: Vec::new(),
            no_in: false,
            pending_labels: Vec::new(),
        }
    }

    pub fn parse_program(mut self) -> JsResult<Program> {
        let body = self.parse_body(&TokenKind::Eof)?;
        if !self.is_at_end() {
            return Err(self.unexpected_token("end of input"));
        }

        for span in std::mem::take(&mut self.cover_initializers) {
            self.early_error("Invalid shorthand property initializer", span);
        }

        let source_type = match self.goal {
            ParseGoal::Script { .. } => SourceType::Script,
            ParseGoal::Module => SourceType::Module,
            ParseGoal::Eval(_) => SourceType::Eval,
        };
        if source_type == SourceType::Module {
            for (local, span) in std::mem::take(&mut self.pending_exports) {
                if !self.ctx.declares_top_level(&local) {
                    self.early_error(format!("Export '{local}' is not defined in module"), span);
                }
            }
        }

        if !self.errors.is_empty() {
            debug!(count = self.errors.len(), "early errors");
            return Err(JsError::EarlyErrors(self.errors));
        }

        let ctx = std::mem::take(&mut self.ctx);
        let strict = ctx.strict;
        Ok(Program {
            body: body.into(),
            source_type,
            strict,
            scope: Rc::new(ctx.into_var_scope()),
            module: (source_type == SourceType::Module).then(|| Rc::new(self.module)),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Token helpers
    // ═══════════════════════════════════════════════════════════════════════

    fn advance(&mut self) {
        let next = self.lexer.next_token();
        self.previous = std::mem::replace(&mut self.current, next);
    }

    fn peek(&mut self) -> Token {
        let checkpoint = self.lexer.checkpoint();
        let token = self.lexer.next_token();
        self.lexer.restore(checkpoint);
        token
    }

    fn peek_is(&mut self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current.kind == *kind
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn require_token(&mut self, kind: &TokenKind) -> JsResult<()> {
        if self.match_token(kind) {
            Ok(())
        } else {
            Err(self.unexpected_token(&describe_token(kind)))
        }
    }

    fn is_at_end(&self) -> bool {
        self.current.kind == TokenKind::Eof
    }

    /// Automatic semicolon insertion: a statement may end at `;`, before
    /// `}`, at the end of input or before a line break.
    fn expect_semicolon(&mut self) -> JsResult<()> {
        if self.match_token(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.is_at_end()
            || self.current.newline_before
        {
            Ok(())
        } else {
            Err(self.unexpected_token("';'"))
        }
    }

    fn is_identifier_token(&self, kind: &TokenKind) -> bool {
        match kind {
            TokenKind::Identifier(_)
            | TokenKind::Let
            | TokenKind::Static
            | TokenKind::From
            | TokenKind::As
            | TokenKind::Of
            | TokenKind::Async => true,
            TokenKind::Yield => !self.ctx.kind.is_generator() && !self.ctx.strict,
            TokenKind::Await => {
                !self.ctx.kind.is_async() && !matches!(self.goal, ParseGoal::Module)
            }
            _ => false,
        }
    }

    fn check_identifier(&self) -> bool {
        self.is_identifier_token(&self.current.kind)
    }

    fn check_contextual(&self, word: &str) -> bool {
        matches!(&self.current.kind, TokenKind::Identifier(name) if name.eq_str(word))
    }

    fn intern(&mut self, s: &str) -> JsString {
        self.lexer.string_dict().get_or_insert(s)
    }

    fn raw_text(&self, span: Span) -> &'a str {
        self.lexer.source().get(span.start..span.end).unwrap_or("")
    }

    fn with_in<T>(&mut self, f: impl FnOnce(&mut Self) -> JsResult<T>) -> JsResult<T> {
        let saved = std::mem::replace(&mut self.no_in, false);
        let result = f(self);
        self.no_in = saved;
        result
    }

    fn with_no_in<T>(&mut self, f: impl FnOnce(&mut Self) -> JsResult<T>) -> JsResult<T> {
        let saved = std::mem::replace(&mut self.no_in, true);
        let result = f(self);
        self.no_in = saved;
        result
    }

    fn save_state(&self) -> ParserState {
        ParserState {
            lexer: self.lexer.checkpoint(),
            current: self.current.clone(),
            previous: self.previous.clone(),
            errors: self.errors.len(),
            cover_initializers: self.cover_initializers.len(),
            depth: self.outer.len(),
            no_in: self.no_in,
        }
    }

    fn restore_state(&mut self, state: ParserState) {
        self.lexer.restore(state.lexer);
        self.current = state.current;
        self.previous = state.previous;
        self.errors.truncate(state.errors);
        self.cover_initializers.truncate(state.cover_initializers);
        while self.outer.len() > state.depth {
            self.pop_context();
        }
        self.no_in = state.no_in;
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Errors
    // ═══════════════════════════════════════════════════════════════════════

    fn error(&self, message: impl Into<String>) -> JsError {
        JsError::syntax_error(message, self.current.span.line, self.current.span.column)
    }

    fn unexpected_token(&self, expected: &str) -> JsError {
        if let TokenKind::Invalid(c) = self.current.kind {
            return self.error(format!("Invalid or unexpected token '{c}'"));
        }
        self.error(format!(
            "Unexpected token {}, expected {expected}",
            describe_token(&self.current.kind)
        ))
    }

    fn early_error(&mut self, message: impl Into<String>, span: Span) {
        self.errors.push(EarlyError {
            message: message.into(),
            location: SourceLocation {
                line: span.line,
                column: span.column,
            },
        });
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Scopes and declarations
    // ═══════════════════════════════════════════════════════════════════════

    fn push_context(&mut self, kind: FunctionKind, form: FunctionForm) {
        let ctx = FunctionContext::function(&self.ctx, kind, form);
        let parent = std::mem::replace(&mut self.ctx, ctx);
        self.outer.push(parent);
    }

    fn pop_context(&mut self) -> FunctionContext {
        match self.outer.pop() {
            Some(parent) => std::mem::replace(&mut self.ctx, parent),
            None => std::mem::take(&mut self.ctx),
        }
    }

    fn declare(&mut self, kind: VariableKind, name: JsString, span: Span) {
        let result = match kind {
            VariableKind::Var => self.ctx.declare_var(name),
            VariableKind::Let | VariableKind::Const => {
                if name.eq_str("let") {
                    Err("let is disallowed as a lexically bound name".to_string())
                } else {
                    self.ctx
                        .declare_lexical(name, kind == VariableKind::Const, true)
                }
            }
        };
        if let Err(message) = result {
            self.early_error(message, span);
        }
    }

    fn declare_pattern(&mut self, kind: VariableKind, pattern: &Pattern, span: Span) {
        let mut names = Vec::new();
        pattern.bound_names(&mut names);
        for name in names {
            self.declare(kind, name, span);
        }
    }

    fn declare_function(&mut self, name: JsString, node: Rc<FunctionNode>, span: Span) {
        if let Err(message) = self.ctx.declare_function(name, node) {
            self.early_error(message, span);
        }
    }

    /// `arguments` was referenced (or a direct eval appeared): every function
    /// up to the nearest non-arrow one needs an arguments object.
    fn mark_arguments_use(&mut self) {
        self.ctx.uses_arguments = true;
        if !self.ctx.arrow {
            return;
        }
        for ctx in self.outer.iter_mut().rev() {
            ctx.uses_arguments = true;
            if !ctx.arrow {
                break;
            }
        }
    }

    fn check_binding_name(&mut self, ident: &Identifier) {
        if !self.ctx.strict {
            return;
        }
        if is_eval_or_arguments(&ident.name) {
            self.early_error("Unexpected eval or arguments in strict mode", ident.span);
        } else if is_strict_reserved(&ident.name) {
            self.early_error("Unexpected strict mode reserved word", ident.span);
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Statements
    // ═══════════════════════════════════════════════════════════════════════

    /// A statement list with an optional directive prologue, up to `end`.
    fn parse_body(&mut self, end: &TokenKind) -> JsResult<Vec<Statement>> {
        let mut body = Vec::new();
        let mut in_prologue = true;
        while !self.check(end) && !self.is_at_end() {
            if in_prologue {
                if let TokenKind::String(_) = self.current.kind {
                    let directive = self.current.span;
                    let statement = self.parse_statement()?;
                    if matches!(&statement, Statement::Expression(Expression::Literal(Literal::String(_)))) {
                        let raw = self.raw_text(directive);
                        if raw == "\"use strict\"" || raw == "'use strict'" {
                            self.ctx.strict = true;
                            self.ctx.has_use_strict = true;
                        }
                    } else {
                        in_prologue = false;
                    }
                    body.push(statement);
                    continue;
                }
                in_prologue = false;
            }
            body.push(self.parse_statement()?);
        }
        Ok(body)
    }

    /// StatementListItem: declarations are allowed here.
    fn parse_statement(&mut self) -> JsResult<Statement> {
        match self.current.kind.clone() {
            TokenKind::Var => {
                self.advance();
                let decl = self.parse_variable_declaration(VariableKind::Var, false)?;
                self.expect_semicolon()?;
                Ok(Statement::VariableDeclaration(decl))
            }
            TokenKind::Const => {
                self.advance();
                let decl = self.parse_variable_declaration(VariableKind::Const, false)?;
                self.expect_semicolon()?;
                Ok(Statement::VariableDeclaration(decl))
            }
            TokenKind::Let if self.let_starts_declaration() => {
                self.advance();
                let decl = self.parse_variable_declaration(VariableKind::Let, false)?;
                self.expect_semicolon()?;
                Ok(Statement::VariableDeclaration(decl))
            }
            TokenKind::Function => self.parse_function_declaration(false, false),
            TokenKind::Async if self.async_function_follows() => {
                self.parse_function_declaration(true, false)
            }
            TokenKind::Class => self.parse_class_declaration(false),
            TokenKind::Import if !self.peek_is(&TokenKind::LParen) && !self.peek_is(&TokenKind::Dot) => {
                self.parse_import()
            }
            TokenKind::Export => self.parse_export(),
            _ => self.parse_nested_statement(),
        }
    }

    fn let_starts_declaration(&mut self) -> bool {
        let next = self.peek();
        matches!(next.kind, TokenKind::LBracket | TokenKind::LBrace)
            || self.is_identifier_token(&next.kind)
            || next.kind == TokenKind::Yield
            || next.kind == TokenKind::Await
    }

    fn async_function_follows(&mut self) -> bool {
        let next = self.peek();
        next.kind == TokenKind::Function && !next.newline_before
    }

    /// Statement position without declarations (bodies of if/loops/labels).
    fn parse_nested_statement(&mut self) -> JsResult<Statement> {
        match self.current.kind.clone() {
            TokenKind::LBrace => Ok(Statement::Block(Rc::new(self.parse_block_statement()?))),
            TokenKind::Var => {
                self.advance();
                let decl = self.parse_variable_declaration(VariableKind::Var, false)?;
                self.expect_semicolon()?;
                Ok(Statement::VariableDeclaration(decl))
            }
            TokenKind::Semicolon => {
                self.advance();
                Ok(Statement::Empty)
            }
            TokenKind::If => self.parse_if_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::Do => self.parse_do_while_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => self.parse_break_statement(),
            TokenKind::Continue => self.parse_continue_statement(),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::With => self.parse_with_statement(),
            TokenKind::Debugger => {
                self.advance();
                self.expect_semicolon()?;
                Ok(Statement::Debugger)
            }
            TokenKind::Function | TokenKind::Class | TokenKind::Const => Err(self.error(
                "Declarations cannot appear in a single-statement context",
            )),
            TokenKind::Let if self.peek_is(&TokenKind::LBracket) => Err(self.error(
                "Lexical declaration cannot appear in a single-statement context",
            )),
            _ if self.check_identifier() && self.peek_is(&TokenKind::Colon) => {
                self.parse_labeled_statement()
            }
            _ => {
                let expr = self.parse_expression()?;
                self.expect_semicolon()?;
                Ok(Statement::Expression(expr))
            }
        }
    }

    fn parse_block_statement(&mut self) -> JsResult<BlockStatement> {
        self.parse_block_with(BlockContext::default())
    }

    fn parse_block_with(&mut self, block: BlockContext) -> JsResult<BlockStatement> {
        self.require_token(&TokenKind::LBrace)?;
        self.ctx.push_block(block);
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        self.require_token(&TokenKind::RBrace)?;
        let scope = self.ctx.pop_block().into_scope();
        Ok(BlockStatement {
            body: body.into(),
            scope: Rc::new(scope),
        })
    }

    /// Declarators after `var`/`let`/`const`. In a for-statement head the
    /// initializer checks are deferred until it is known whether this is
    /// a for-in/of loop.
    fn parse_variable_declaration(
        &mut self,
        kind: VariableKind,
        in_for_head: bool,
    ) -> JsResult<Rc<VariableDeclaration>> {
        let mut declarations = Vec::new();
        loop {
            let span = self.current.span;
            let target = self.parse_binding_pattern()?;
            let init = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_named_initializer(&target)?)
            } else {
                None
            };
            if init.is_none() && !in_for_head {
                if kind == VariableKind::Const {
                    return Err(self.error("Missing initializer in const declaration"));
                }
                if target.as_identifier().is_none() {
                    return Err(self.error("Missing initializer in destructuring declaration"));
                }
            }
            self.declare_pattern(kind, &target, span);
            declarations.push(VariableDeclarator { target, init });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        Ok(Rc::new(VariableDeclaration {
            kind,
            declarations: declarations.into(),
        }))
    }

    fn parse_if_statement(&mut self) -> JsResult<Statement> {
        self.advance();
        self.require_token(&TokenKind::LParen)?;
        let test = self.with_in(Self::parse_expression)?;
        self.require_token(&TokenKind::RParen)?;
        let consequent = self.parse_nested_statement()?;
        let alternate = if self.match_token(&TokenKind::Else) {
            Some(self.parse_nested_statement()?)
        } else {
            None
        };
        Ok(Statement::If(Rc::new(IfStatement {
            test,
            consequent,
            alternate,
        })))
    }

    fn parse_loop_body(&mut self) -> JsResult<Statement> {
        self.ctx.breakable_depth += 1;
        self.ctx.iteration_depth += 1;
        let body = self.parse_nested_statement();
        self.ctx.breakable_depth -= 1;
        self.ctx.iteration_depth -= 1;
        body
    }

    fn parse_while_statement(&mut self) -> JsResult<Statement> {
        let labels: Rc<[JsString]> = std::mem::take(&mut self.pending_labels).into();
        self.advance();
        self.require_token(&TokenKind::LParen)?;
        let test = self.with_in(Self::parse_expression)?;
        self.require_token(&TokenKind::RParen)?;
        let body = self.parse_loop_body()?;
        Ok(Statement::While(Rc::new(WhileStatement { test, body, labels })))
    }

    fn parse_do_while_statement(&mut self) -> JsResult<Statement> {
        let labels: Rc<[JsString]> = std::mem::take(&mut self.pending_labels).into();
        self.advance();
        let body = self.parse_loop_body()?;
        self.require_token(&TokenKind::While)?;
        self.require_token(&TokenKind::LParen)?;
        let test = self.with_in(Self::parse_expression)?;
        self.require_token(&TokenKind::RParen)?;
        // A semicolon is always optional after do-while
        self.match_token(&TokenKind::Semicolon);
        Ok(Statement::DoWhile(Rc::new(WhileStatement { test, body, labels })))
    }

    fn parse_for_statement(&mut self) -> JsResult<Statement> {
        let labels: Rc<[JsString]> = std::mem::take(&mut self.pending_labels).into();
        self.advance();
        let is_await = if self.check(&TokenKind::Await) && self.ctx.kind.is_async() {
            self.advance();
            true
        } else {
            false
        };
        self.require_token(&TokenKind::LParen)?;

        // The head gets its own scope so `for (let i;;) { var i }` conflicts
        self.ctx.push_block(BlockContext::default());
        let result = self.parse_for_head(labels, is_await);
        self.ctx.pop_block();
        result
    }

    fn parse_for_head(&mut self, labels: Rc<[JsString]>, is_await: bool) -> JsResult<Statement> {
        if self.match_token(&TokenKind::Semicolon) {
            if is_await {
                return Err(self.error("for await requires an of clause"));
            }
            return self.parse_for_rest(None, labels);
        }

        let kind = match self.current.kind.clone() {
            TokenKind::Var => Some(VariableKind::Var),
            TokenKind::Const => Some(VariableKind::Const),
            TokenKind::Let if self.let_starts_declaration() => Some(VariableKind::Let),
            _ => None,
        };

        if let Some(kind) = kind {
            self.advance();
            let decl = self.with_no_in(|p| p.parse_variable_declaration(kind, true))?;
            let is_of = self.check(&TokenKind::Of);
            if is_of || self.check(&TokenKind::In) {
                let single = match &*decl.declarations {
                    [only] if only.init.is_none() => Some(only.target.cheap_clone()),
                    _ => None,
                };
                let Some(target) = single else {
                    return Err(self.error(
                        "for-in/of loop variable declaration may not have an initializer",
                    ));
                };
                return self.parse_for_in_of(ForHead::Declaration { kind, target }, is_of, labels, is_await);
            }
            if is_await {
                return Err(self.error("for await requires an of clause"));
            }
            for declarator in decl.declarations.iter() {
                if declarator.init.is_none()
                    && (kind == VariableKind::Const || declarator.target.as_identifier().is_none())
                {
                    return Err(self.error("Missing initializer in declaration"));
                }
            }
            self.require_token(&TokenKind::Semicolon)?;
            return self.parse_for_rest(Some(ForInit::Variable(decl)), labels);
        }

        let expr_start = self.current.span;
        let init = self.with_no_in(Self::parse_expression)?;
        let is_of = self.check(&TokenKind::Of);
        if is_of || self.check(&TokenKind::In) {
            let target = match &init {
                Expression::Object(_) | Expression::Array(_) => self.expression_to_pattern(&init, expr_start),
                _ => {
                    if !self.is_simple_assignment_target(&init, expr_start) {
                        self.early_error("Invalid left-hand side in for-loop", expr_start);
                    }
                    match &init {
                        Expression::Identifier(id) => Pattern::Identifier(id.clone()),
                        _ => Pattern::Expression(init.cheap_clone()),
                    }
                }
            };
            return self.parse_for_in_of(ForHead::Target(target), is_of, labels, is_await);
        }
        if is_await {
            return Err(self.error("for await requires an of clause"));
        }
        self.require_token(&TokenKind::Semicolon)?;
        self.parse_for_rest(Some(ForInit::Expression(init)), labels)
    }

    fn parse_for_in_of(
        &mut self,
        head: ForHead,
        is_of: bool,
        labels: Rc<[JsString]>,
        is_await: bool,
    ) -> JsResult<Statement> {
        if is_await && !is_of {
            return Err(self.error("for await requires an of clause"));
        }
        self.advance();
        let right = if is_of {
            self.with_in(Self::parse_assignment_expression)?
        } else {
            self.with_in(Self::parse_expression)?
        };
        self.require_token(&TokenKind::RParen)?;
        let body = self.parse_loop_body()?;
        let statement = Rc::new(ForInOfStatement {
            head,
            right,
            body,
            labels,
            is_await,
        });
        Ok(if is_of {
            Statement::ForOf(statement)
        } else {
            Statement::ForIn(statement)
        })
    }

    fn parse_for_rest(&mut self, init: Option<ForInit>, labels: Rc<[JsString]>) -> JsResult<Statement> {
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.with_in(Self::parse_expression)?)
        };
        self.require_token(&TokenKind::Semicolon)?;
        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.with_in(Self::parse_expression)?)
        };
        self.require_token(&TokenKind::RParen)?;
        let body = self.parse_loop_body()?;
        Ok(Statement::For(Rc::new(ForStatement {
            init,
            test,
            update,
            body,
            labels,
        })))
    }

    fn parse_switch_statement(&mut self) -> JsResult<Statement> {
        let labels: Rc<[JsString]> = std::mem::take(&mut self.pending_labels).into();
        self.advance();
        self.require_token(&TokenKind::LParen)?;
        let discriminant = self.with_in(Self::parse_expression)?;
        self.require_token(&TokenKind::RParen)?;
        self.require_token(&TokenKind::LBrace)?;

        self.ctx.push_block(BlockContext::default());
        self.ctx.breakable_depth += 1;
        let mut cases = Vec::new();
        let mut seen_default = false;
        while !self.match_token(&TokenKind::RBrace) {
            let case_span = self.current.span;
            let test = if self.match_token(&TokenKind::Case) {
                Some(self.with_in(Self::parse_expression)?)
            } else if self.match_token(&TokenKind::Default) {
                if seen_default {
                    self.early_error("More than one default clause in switch statement", case_span);
                }
                seen_default = true;
                None
            } else {
                return Err(self.unexpected_token("'case', 'default' or '}'"));
            };
            self.require_token(&TokenKind::Colon)?;
            let mut body = Vec::new();
            while !matches!(
                self.current.kind,
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                test,
                body: body.into(),
            });
        }
        self.ctx.breakable_depth -= 1;
        let scope = self.ctx.pop_block().into_scope();
        Ok(Statement::Switch(Rc::new(SwitchStatement {
            discriminant,
            cases: cases.into(),
            scope: Rc::new(scope),
            labels,
        })))
    }

    fn parse_labeled_statement(&mut self) -> JsResult<Statement> {
        let mut names = Vec::new();
        loop {
            let span = self.current.span;
            let label = self.parse_identifier()?.name;
            self.require_token(&TokenKind::Colon)?;
            if self.ctx.find_label(&label).is_some() || names.contains(&label) {
                self.early_error(format!("Label '{label}' has already been declared"), span);
            }
            names.push(label);
            if !(self.check_identifier() && self.peek_is(&TokenKind::Colon)) {
                break;
            }
        }

        if self.check(&TokenKind::Function) {
            return Err(self.error("Function declarations cannot be labeled"));
        }
        let iteration = matches!(self.current.kind, TokenKind::For | TokenKind::While | TokenKind::Do);
        let depth = self.ctx.labels.len();
        for name in &names {
            self.ctx.labels.push(Label {
                name: name.cheap_clone(),
                iteration,
            });
        }
        if iteration || self.check(&TokenKind::Switch) {
            self.pending_labels = names.clone();
        }
        let body = self.parse_nested_statement();
        self.ctx.labels.truncate(depth);
        self.pending_labels.clear();

        let mut body = body?;
        for label in names.into_iter().rev() {
            body = Statement::Labeled(Rc::new(LabeledStatement { label, body }));
        }
        Ok(body)
    }

    fn parse_break_statement(&mut self) -> JsResult<Statement> {
        let span = self.current.span;
        self.advance();
        let label = if !self.current.newline_before && self.check_identifier() {
            let label = self.parse_identifier()?.name;
            if self.ctx.find_label(&label).is_none() {
                self.early_error(format!("Undefined label '{label}'"), span);
            }
            Some(label)
        } else {
            if self.ctx.breakable_depth == 0 {
                self.early_error("Illegal break statement", span);
            }
            None
        };
        self.expect_semicolon()?;
        Ok(Statement::Break(label))
    }

    fn parse_continue_statement(&mut self) -> JsResult<Statement> {
        let span = self.current.span;
        self.advance();
        if self.ctx.iteration_depth == 0 {
            self.early_error("Illegal continue statement: no surrounding iteration statement", span);
        }
        let label = if !self.current.newline_before && self.check_identifier() {
            let label = self.parse_identifier()?.name;
            match self.ctx.find_label(&label) {
                None => self.early_error(format!("Undefined label '{label}'"), span),
                Some(target) if !target.iteration => self.early_error(
                    format!("Illegal continue statement: '{label}' does not denote an iteration statement"),
                    span,
                ),
                Some(_) => {}
            }
            Some(label)
        } else {
            None
        };
        self.expect_semicolon()?;
        Ok(Statement::Continue(label))
    }

    fn parse_return_statement(&mut self) -> JsResult<Statement> {
        let span = self.current.span;
        self.advance();
        if self.ctx.top_level {
            self.early_error("Illegal return statement", span);
        }
        let argument = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.is_at_end()
            || self.current.newline_before
        {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_semicolon()?;
        Ok(Statement::Return(argument))
    }

    fn parse_throw_statement(&mut self) -> JsResult<Statement> {
        self.advance();
        if self.current.newline_before {
            return Err(self.error("Illegal newline after throw"));
        }
        let argument = self.parse_expression()?;
        self.expect_semicolon()?;
        Ok(Statement::Throw(argument))
    }

    fn parse_try_statement(&mut self) -> JsResult<Statement> {
        self.advance();
        let block = Rc::new(self.parse_block_statement()?);

        let handler = if self.match_token(&TokenKind::Catch) {
            let (param, names) = if self.match_token(&TokenKind::LParen) {
                let span = self.current.span;
                let pattern = self.parse_binding_pattern()?;
                self.require_token(&TokenKind::RParen)?;
                let mut names = Vec::new();
                pattern.bound_names(&mut names);
                if has_duplicates(&names) {
                    self.early_error("Duplicate binding in catch parameter", span);
                }
                (Some(pattern), names)
            } else {
                (None, Vec::new())
            };
            let body = Rc::new(self.parse_block_with(BlockContext::with_catch_params(names))?);
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.match_token(&TokenKind::Finally) {
            Some(Rc::new(self.parse_block_statement()?))
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("Missing catch or finally after try"));
        }
        Ok(Statement::Try(Rc::new(TryStatement {
            block,
            handler,
            finalizer,
        })))
    }

    fn parse_with_statement(&mut self) -> JsResult<Statement> {
        let span = self.current.span;
        self.advance();
        if self.ctx.strict {
            self.early_error("Strict mode code may not include a with statement", span);
        }
        self.require_token(&TokenKind::LParen)?;
        let object = self.with_in(Self::parse_expression)?;
        self.require_token(&TokenKind::RParen)?;
        let body = self.parse_nested_statement()?;
        Ok(Statement::With(Rc::new(WithStatement { object, body })))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Functions
    // ═══════════════════════════════════════════════════════════════════════

    /// `function f() {}` and `async function f() {}`. With `default_export`,
    /// the name may be omitted and the binding is `*default*`.
    fn parse_function_declaration(&mut self, is_async: bool, default_export: bool) -> JsResult<Statement> {
        let start = self.current.span;
        if is_async {
            self.advance();
        }
        self.require_token(&TokenKind::Function)?;
        let generator = self.match_token(&TokenKind::Star);
        let id_span = self.current.span;
        let (id, name) = if default_export && !self.check_identifier() {
            (self.intern("*default*"), self.intern("default"))
        } else {
            let id = self.parse_binding_identifier()?;
            (id.cheap_clone(), id)
        };
        let node = self.parse_function_rest(FunctionHeader {
            id: Some(id.cheap_clone()),
            name,
            kind: FunctionKind::from_flags(is_async, generator),
            form: FunctionForm::Declaration,
            start,
        })?;
        self.declare_function(id, node.cheap_clone(), id_span);
        Ok(Statement::FunctionDeclaration(node))
    }

    fn parse_function_expression(&mut self, is_async: bool, start: Span) -> JsResult<Expression> {
        self.require_token(&TokenKind::Function)?;
        let generator = self.match_token(&TokenKind::Star);
        let id = if self.check_identifier() {
            Some(self.parse_binding_identifier()?)
        } else {
            None
        };
        let node = self.parse_function_rest(FunctionHeader {
            name: id.clone().unwrap_or_default(),
            id,
            kind: FunctionKind::from_flags(is_async, generator),
            form: FunctionForm::Expression,
            start,
        })?;
        Ok(Expression::Function(node))
    }

    /// Parameters and body of a non-arrow function, starting at `(`.
    fn parse_function_rest(&mut self, header: FunctionHeader) -> JsResult<Rc<FunctionNode>> {
        self.push_context(header.kind, header.form);
        self.require_token(&TokenKind::LParen)?;
        let params = self.with_in(Self::parse_function_params)?;
        match header.form {
            FunctionForm::Getter if !params.is_empty() => {
                self.early_error("Getter must not have any formal parameters", header.start);
            }
            FunctionForm::Setter if params.len() != 1 || params.iter().any(|p| p.rest) => {
                self.early_error("Setter must have exactly one formal parameter", header.start);
            }
            _ => {}
        }
        self.require_token(&TokenKind::LBrace)?;
        let body = self.with_in(|p| p.parse_body(&TokenKind::RBrace))?;
        self.require_token(&TokenKind::RBrace)?;
        let ctx = self.pop_context();
        Ok(self.finish_function(header, params, FunctionBody::Block(body.into()), ctx))
    }

    /// Formal parameters up to and including the closing `)`.
    fn parse_function_params(&mut self) -> JsResult<Vec<Param>> {
        self.ctx.in_params = true;
        let mut params = Vec::new();
        while !self.check(&TokenKind::RParen) {
            if self.match_token(&TokenKind::DotDotDot) {
                let pattern = self.parse_binding_pattern()?;
                pattern.bound_names(&mut self.ctx.param_names);
                params.push(Param {
                    pattern,
                    default: None,
                    rest: true,
                });
                if !self.check(&TokenKind::RParen) {
                    return Err(self.error("Rest parameter must be last formal parameter"));
                }
                break;
            }
            let pattern = self.parse_binding_pattern()?;
            let default = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_named_initializer(&pattern)?)
            } else {
                None
            };
            pattern.bound_names(&mut self.ctx.param_names);
            params.push(Param {
                pattern,
                default,
                rest: false,
            });
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        self.require_token(&TokenKind::RParen)?;
        self.ctx.in_params = false;
        Ok(params)
    }

    fn finish_function(
        &mut self,
        header: FunctionHeader,
        params: Vec<Param>,
        body: FunctionBody,
        ctx: FunctionContext,
    ) -> Rc<FunctionNode> {
        let simple_params = params
            .iter()
            .all(|p| p.default.is_none() && !p.rest && matches!(p.pattern, Pattern::Identifier(_)));
        let has_param_expressions = params
            .iter()
            .any(|p| p.default.is_some() || pattern_has_expressions(&p.pattern));
        let param_names = ctx.param_names.clone();
        let has_duplicate_params = has_duplicates(&param_names);

        if ctx.has_use_strict && !simple_params {
            self.early_error(
                "Illegal 'use strict' directive in function with non-simple parameter list",
                header.start,
            );
        }
        let strict_params = ctx.strict
            || !simple_params
            || !matches!(header.form, FunctionForm::Declaration | FunctionForm::Expression);
        if has_duplicate_params && strict_params {
            self.early_error("Duplicate parameter name not allowed in this context", header.start);
        }
        // Names checked before the directive made the function strict
        if ctx.has_use_strict {
            let late = param_names.iter().chain(header.id.iter());
            if late.clone().any(is_eval_or_arguments) {
                self.early_error("Unexpected eval or arguments in strict mode", header.start);
            } else if late.clone().any(is_strict_reserved) {
                self.early_error("Unexpected strict mode reserved word", header.start);
            }
        }

        let length = params
            .iter()
            .take_while(|p| p.default.is_none() && !p.rest)
            .count() as u32;
        let strict = ctx.strict;
        let uses_arguments = ctx.uses_arguments;
        Rc::new(FunctionNode {
            id: header.id,
            name: header.name,
            kind: header.kind,
            form: header.form,
            params: params.into(),
            body,
            strict,
            scope: Rc::new(ctx.into_var_scope()),
            param_names: param_names.into(),
            simple_params,
            has_param_expressions,
            has_duplicate_params,
            uses_arguments,
            length,
            span: header.start,
        })
    }

    /// Speculatively parse `(params) =>`. Returns `None` (with the parser
    /// rewound) when the parenthesized text is not an arrow parameter list.
    fn try_parse_arrow(&mut self, is_async: bool, start: Span) -> JsResult<Option<Expression>> {
        let state = self.save_state();
        self.push_context(FunctionKind::from_flags(is_async, false), FunctionForm::Arrow);
        let params = match self.parse_arrow_params() {
            Ok(params) => params,
            Err(_) => {
                self.restore_state(state);
                return Ok(None);
            }
        };
        if !self.check(&TokenKind::Arrow) || self.current.newline_before {
            self.restore_state(state);
            return Ok(None);
        }
        self.parse_arrow_function(params, is_async, start).map(Some)
    }

    fn parse_arrow_params(&mut self) -> JsResult<Vec<Param>> {
        self.require_token(&TokenKind::LParen)?;
        self.with_in(Self::parse_function_params)
    }

    /// `x => ...` where `x` was already parsed as an identifier.
    fn parse_single_param_arrow(&mut self, param: Identifier, is_async: bool, start: Span) -> JsResult<Expression> {
        self.push_context(FunctionKind::from_flags(is_async, false), FunctionForm::Arrow);
        self.check_binding_name(&param);
        self.ctx.param_names.push(param.name.cheap_clone());
        let params = vec![Param {
            pattern: Pattern::Identifier(param),
            default: None,
            rest: false,
        }];
        self.parse_arrow_function(params, is_async, start)
    }

    /// The `=> body` part; the arrow's context is already pushed.
    fn parse_arrow_function(&mut self, params: Vec<Param>, is_async: bool, start: Span) -> JsResult<Expression> {
        self.require_token(&TokenKind::Arrow)?;
        let body = if self.match_token(&TokenKind::LBrace) {
            let body = self.with_in(|p| p.parse_body(&TokenKind::RBrace))?;
            self.require_token(&TokenKind::RBrace)?;
            FunctionBody::Block(body.into())
        } else {
            FunctionBody::Expression(self.parse_assignment_expression()?)
        };
        let ctx = self.pop_context();
        let node = self.finish_function(
            FunctionHeader {
                id: None,
                name: JsString::empty(),
                kind: FunctionKind::from_flags(is_async, false),
                form: FunctionForm::Arrow,
                start,
            },
            params,
            body,
            ctx,
        );
        Ok(Expression::Function(node))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Classes
    // ═══════════════════════════════════════════════════════════════════════

    fn parse_class_declaration(&mut self, default_export: bool) -> JsResult<Statement> {
        let start = self.current.span;
        self.advance();
        let id_span = self.current.span;
        let (id, name) = if default_export && !self.check_identifier() {
            (self.intern("*default*"), self.intern("default"))
        } else {
            let id = self.parse_binding_identifier()?;
            (id.cheap_clone(), id)
        };
        if let Err(message) = self.ctx.declare_lexical(id.cheap_clone(), false, true) {
            self.early_error(message, id_span);
        }
        let class = self.parse_class_tail(Some(id), name, start)?;
        Ok(Statement::ClassDeclaration(class))
    }

    fn parse_class_expression(&mut self) -> JsResult<Expression> {
        let start = self.current.span;
        self.advance();
        let id = if self.check_identifier() {
            let saved = std::mem::replace(&mut self.ctx.strict, true);
            let id = self.parse_binding_identifier();
            self.ctx.strict = saved;
            Some(id?)
        } else {
            None
        };
        let name = id.clone().unwrap_or_default();
        Ok(Expression::Class(self.parse_class_tail(id, name, start)?))
    }

    /// Heritage and body. All parts of a class are strict code.
    fn parse_class_tail(&mut self, id: Option<JsString>, name: JsString, start: Span) -> JsResult<Rc<ClassNode>> {
        let saved = std::mem::replace(&mut self.ctx.strict, true);
        let result = self.parse_class_body(id, name, start);
        self.ctx.strict = saved;
        result
    }

    fn parse_class_body(&mut self, id: Option<JsString>, name: JsString, start: Span) -> JsResult<Rc<ClassNode>> {
        let heritage = if self.match_token(&TokenKind::Extends) {
            Some(self.parse_left_hand_side_expression()?)
        } else {
            None
        };
        let derived = heritage.is_some();
        self.require_token(&TokenKind::LBrace)?;

        let mut constructor = None;
        let mut members = Vec::new();
        while !self.match_token(&TokenKind::RBrace) {
            if self.match_token(&TokenKind::Semicolon) {
                continue;
            }
            let member_start = self.current.span;
            let is_static = self.check(&TokenKind::Static)
                && !matches!(
                    self.peek().kind,
                    TokenKind::LParen | TokenKind::Eq | TokenKind::Semicolon | TokenKind::RBrace
                );
            if is_static {
                self.advance();
            }
            let (method_kind, is_async, generator) = self.parse_method_prefix();
            let key = self.parse_property_name()?;
            if !self.check(&TokenKind::LParen) {
                return Err(self.error("Class fields are not supported"));
            }
            let static_name = static_property_name(&key);
            let is_constructor = !is_static && static_name.as_ref().is_some_and(|n| n.eq_str("constructor"));

            if is_constructor {
                if method_kind != MethodKind::Method || is_async || generator {
                    self.early_error("Class constructor may not be an accessor, generator or async method", member_start);
                }
                if constructor.is_some() {
                    self.early_error("A class may only have one constructor", member_start);
                }
                constructor = Some(self.parse_function_rest(FunctionHeader {
                    id: None,
                    name: name.cheap_clone(),
                    kind: FunctionKind::Normal,
                    form: FunctionForm::ClassConstructor { derived },
                    start,
                })?);
                continue;
            }
            if is_static && static_name.as_ref().is_some_and(|n| n.eq_str("prototype")) {
                self.early_error("Classes may not have a static property named 'prototype'", member_start);
            }
            let function = self.parse_method(&key, method_kind, is_async, generator, member_start)?;
            members.push(ClassMember {
                key,
                is_static,
                kind: method_kind,
                function,
            });
        }

        let constructor = match constructor {
            Some(constructor) => constructor,
            None => self.default_constructor(name.cheap_clone(), derived, start),
        };
        Ok(Rc::new(ClassNode {
            id,
            name,
            heritage,
            constructor,
            members: members.into(),
        }))
    }

    /// `constructor() {}` or `constructor(...args) { super(...args); }`
    fn default_constructor(&mut self, name: JsString, derived: bool, start: Span) -> Rc<FunctionNode> {
        let (params, body, param_names): (Vec<Param>, Vec<Statement>, Vec<JsString>) = if derived {
            let args = Identifier {
                name: self.intern("args"),
                span: start,
            };
            let call = Expression::SuperCall(Rc::from(vec![Argument::Spread(Expression::Identifier(
                args.clone(),
            ))]));
            (
                vec![Param {
                    pattern: Pattern::Identifier(args.clone()),
                    default: None,
                    rest: true,
                }],
                vec![Statement::Expression(call)],
                vec![args.name],
            )
        } else {
            (Vec::new(), Vec::new(), Vec::new())
        };
        Rc::new(FunctionNode {
            id: None,
            name,
            kind: FunctionKind::Normal,
            form: FunctionForm::ClassConstructor { derived },
            params: params.into(),
            body: FunctionBody::Block(body.into()),
            strict: true,
            scope: Rc::new(VarScope::default()),
            param_names: param_names.into(),
            simple_params: !derived,
            has_param_expressions: false,
            has_duplicate_params: false,
            uses_arguments: false,
            length: 0,
            span: start,
        })
    }

    /// `get`, `set`, `async` and `*` in front of a method name.
    fn parse_method_prefix(&mut self) -> (MethodKind, bool, bool) {
        let is_accessor_word = self.check_contextual("get") || self.check_contextual("set");
        if is_accessor_word || self.check(&TokenKind::Async) {
            let next = self.peek();
            let modifies = !matches!(
                next.kind,
                TokenKind::LParen
                    | TokenKind::Comma
                    | TokenKind::Colon
                    | TokenKind::RBrace
                    | TokenKind::Eq
                    | TokenKind::Semicolon
            );
            if modifies && is_accessor_word {
                let kind = if self.check_contextual("get") {
                    MethodKind::Getter
                } else {
                    MethodKind::Setter
                };
                self.advance();
                return (kind, false, false);
            }
            if modifies && !next.newline_before {
                self.advance();
                let generator = self.match_token(&TokenKind::Star);
                return (MethodKind::Method, true, generator);
            }
        }
        let generator = self.match_token(&TokenKind::Star);
        (MethodKind::Method, false, generator)
    }

    fn parse_method(
        &mut self,
        key: &PropertyName,
        method_kind: MethodKind,
        is_async: bool,
        generator: bool,
        start: Span,
    ) -> JsResult<Rc<FunctionNode>> {
        let form = match method_kind {
            MethodKind::Method => FunctionForm::Method,
            MethodKind::Getter => FunctionForm::Getter,
            MethodKind::Setter => FunctionForm::Setter,
        };
        self.parse_function_rest(FunctionHeader {
            id: None,
            name: static_property_name(key).unwrap_or_default(),
            kind: FunctionKind::from_flags(is_async, generator),
            form,
            start,
        })
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Modules
    // ═══════════════════════════════════════════════════════════════════════

    fn check_module_item(&self, what: &str) -> JsResult<()> {
        let at_top = self.outer.is_empty() && self.ctx.at_top_block() && self.ctx.labels.is_empty();
        if !matches!(self.goal, ParseGoal::Module) || !at_top {
            return Err(self.error(format!("Cannot use {what} statement outside a module")));
        }
        Ok(())
    }

    fn add_request(&mut self, specifier: &JsString) {
        if !self.module.requests.contains(specifier) {
            self.module.requests.push(specifier.cheap_clone());
        }
    }

    fn parse_module_specifier(&mut self) -> JsResult<JsString> {
        match self.current.kind.clone() {
            TokenKind::String(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected_token("module specifier")),
        }
    }

    fn parse_import(&mut self) -> JsResult<Statement> {
        self.check_module_item("import")?;
        self.advance();

        let mut bindings: Vec<(ImportName, Identifier)> = Vec::new();
        if !matches!(self.current.kind, TokenKind::String(_)) {
            if self.check_identifier() {
                let local = self.parse_identifier()?;
                bindings.push((ImportName::Named(self.intern("default")), local));
                if self.match_token(&TokenKind::Comma) {
                    self.parse_import_clause(&mut bindings)?;
                }
            } else {
                self.parse_import_clause(&mut bindings)?;
            }
            self.require_token(&TokenKind::From)?;
        }
        let source = self.parse_module_specifier()?;
        self.expect_semicolon()?;

        self.add_request(&source);
        for (import_name, local) in bindings {
            self.check_binding_name(&local);
            if let Err(message) = self.ctx.declare_lexical(local.name.cheap_clone(), true, false) {
                self.early_error(message, local.span);
            }
            self.module.imports.push(ImportEntry {
                module: source.cheap_clone(),
                import_name,
                local: local.name,
            });
        }
        Ok(Statement::Import(Rc::new(ImportDeclaration { source })))
    }

    /// `* as ns` or `{ a, b as c }`
    fn parse_import_clause(&mut self, bindings: &mut Vec<(ImportName, Identifier)>) -> JsResult<()> {
        if self.match_token(&TokenKind::Star) {
            self.require_token(&TokenKind::As)?;
            let local = self.parse_identifier()?;
            bindings.push((ImportName::Namespace, local));
            return Ok(());
        }
        self.require_token(&TokenKind::LBrace)?;
        while !self.match_token(&TokenKind::RBrace) {
            let span = self.current.span;
            let is_plain_identifier = self.check_identifier();
            let imported = self.parse_module_export_name()?;
            let local = if self.match_token(&TokenKind::As) {
                self.parse_identifier()?
            } else if is_plain_identifier {
                Identifier {
                    name: imported.cheap_clone(),
                    span,
                }
            } else {
                return Err(self.unexpected_token("'as'"));
            };
            bindings.push((ImportName::Named(imported), local));
            if !self.check(&TokenKind::RBrace) {
                self.require_token(&TokenKind::Comma)?;
            }
        }
        Ok(())
    }

    fn parse_module_export_name(&mut self) -> JsResult<JsString> {
        if let TokenKind::String(s) = self.current.kind.clone() {
            self.advance();
            return Ok(s);
        }
        self.parse_identifier_name()
    }

    fn add_export(&mut self, export_name: JsString, local: JsString, span: Span) {
        if !self.export_names.insert(export_name.cheap_clone()) {
            self.early_error(format!("Duplicate export of '{export_name}'"), span);
        }
        self.pending_exports.push((local.cheap_clone(), span));
        self.module.exports.push(ExportEntry { export_name, local });
    }

    fn parse_export(&mut self) -> JsResult<Statement> {
        self.check_module_item("export")?;
        let span = self.current.span;
        self.advance();

        if self.match_token(&TokenKind::Default) {
            let default_name = self.intern("default");
            let declaration = match self.current.kind.clone() {
                TokenKind::Function => Some(self.parse_function_declaration(false, true)?),
                TokenKind::Async if self.async_function_follows() => {
                    Some(self.parse_function_declaration(true, true)?)
                }
                TokenKind::Class => Some(self.parse_class_declaration(true)?),
                _ => None,
            };
            if let Some(statement) = declaration {
                let local = match &statement {
                    Statement::FunctionDeclaration(f) => f.id.clone().unwrap_or_default(),
                    Statement::ClassDeclaration(c) => c.id.clone().unwrap_or_default(),
                    _ => JsString::empty(),
                };
                self.add_export(default_name, local, span);
                return Ok(Statement::Export(Rc::new(ExportDeclaration::DefaultDeclaration(statement))));
            }
            let value = self.with_in(Self::parse_assignment_expression)?;
            let value = with_inferred_name(value, &default_name);
            self.expect_semicolon()?;
            let local = self.intern("*default*");
            if let Err(message) = self.ctx.declare_lexical(local.cheap_clone(), false, true) {
                self.early_error(message, span);
            }
            self.add_export(default_name, local, span);
            return Ok(Statement::Export(Rc::new(ExportDeclaration::DefaultExpression(value))));
        }

        if self.match_token(&TokenKind::LBrace) {
            let mut specifiers = Vec::new();
            while !self.match_token(&TokenKind::RBrace) {
                let spec_span = self.current.span;
                let local = self.parse_module_export_name()?;
                let exported = if self.match_token(&TokenKind::As) {
                    self.parse_module_export_name()?
                } else {
                    local.cheap_clone()
                };
                specifiers.push((exported, local, spec_span));
                if !self.check(&TokenKind::RBrace) {
                    self.require_token(&TokenKind::Comma)?;
                }
            }
            if self.check(&TokenKind::From) {
                return Err(self.error("Re-exporting bindings of another module is not supported"));
            }
            self.expect_semicolon()?;
            for (exported, local, spec_span) in specifiers {
                self.add_export(exported, local, spec_span);
            }
            return Ok(Statement::Export(Rc::new(ExportDeclaration::List)));
        }

        if self.check(&TokenKind::Star) {
            return Err(self.error("Star exports are not supported"));
        }

        let statement = match self.current.kind.clone() {
            TokenKind::Var | TokenKind::Let | TokenKind::Const | TokenKind::Function | TokenKind::Class => {
                self.parse_statement()?
            }
            TokenKind::Async if self.async_function_follows() => self.parse_statement()?,
            _ => return Err(self.unexpected_token("declaration")),
        };
        let mut names = Vec::new();
        match &statement {
            Statement::VariableDeclaration(decl) => {
                for declarator in decl.declarations.iter() {
                    declarator.target.bound_names(&mut names);
                }
            }
            Statement::FunctionDeclaration(f) => names.extend(f.id.clone()),
            Statement::ClassDeclaration(c) => names.extend(c.id.clone()),
            _ => {}
        }
        for name in names {
            self.add_export(name.cheap_clone(), name, span);
        }
        Ok(Statement::Export(Rc::new(ExportDeclaration::Declaration(statement))))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Patterns
    // ═══════════════════════════════════════════════════════════════════════

    fn parse_binding_pattern(&mut self) -> JsResult<Pattern> {
        match self.current.kind {
            TokenKind::LBracket => self.parse_array_pattern(),
            TokenKind::LBrace => self.parse_object_pattern(),
            _ => {
                let ident = self.parse_identifier()?;
                self.check_binding_name(&ident);
                Ok(Pattern::Identifier(ident))
            }
        }
    }

    fn parse_array_pattern(&mut self) -> JsResult<Pattern> {
        self.advance();
        let mut elements = Vec::new();
        let mut rest = None;
        while !self.check(&TokenKind::RBracket) {
            if self.match_token(&TokenKind::Comma) {
                elements.push(None);
                continue;
            }
            if self.match_token(&TokenKind::DotDotDot) {
                rest = Some(self.parse_binding_pattern()?);
                break;
            }
            let target = self.parse_binding_pattern()?;
            let default = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_named_initializer(&target)?)
            } else {
                None
            };
            elements.push(Some(PatternElement { target, default }));
            if !self.check(&TokenKind::RBracket) {
                self.require_token(&TokenKind::Comma)?;
            }
        }
        self.require_token(&TokenKind::RBracket)?;
        Ok(Pattern::Array(Rc::new(ArrayPattern { elements, rest })))
    }

    fn parse_object_pattern(&mut self) -> JsResult<Pattern> {
        self.advance();
        let mut properties = Vec::new();
        let mut rest = None;
        while !self.check(&TokenKind::RBrace) {
            if self.match_token(&TokenKind::DotDotDot) {
                let ident = self.parse_identifier()?;
                self.check_binding_name(&ident);
                rest = Some(Pattern::Identifier(ident));
                break;
            }
            let shorthand = self.check_identifier().then_some(self.current.span);
            let key = self.parse_property_name()?;
            let (value, default) = if self.match_token(&TokenKind::Colon) {
                let value = self.parse_binding_pattern()?;
                let default = if self.match_token(&TokenKind::Eq) {
                    Some(self.parse_named_initializer(&value)?)
                } else {
                    None
                };
                (value, default)
            } else {
                let (Some(span), PropertyName::Identifier(name)) = (shorthand, &key) else {
                    return Err(self.unexpected_token("':'"));
                };
                let ident = Identifier {
                    name: name.cheap_clone(),
                    span,
                };
                self.check_binding_name(&ident);
                let value = Pattern::Identifier(ident);
                let default = if self.match_token(&TokenKind::Eq) {
                    Some(self.parse_named_initializer(&value)?)
                } else {
                    None
                };
                (value, default)
            };
            properties.push(ObjectPatternProperty { key, value, default });
            if !self.check(&TokenKind::RBrace) {
                self.require_token(&TokenKind::Comma)?;
            }
        }
        self.require_token(&TokenKind::RBrace)?;
        Ok(Pattern::Object(Rc::new(ObjectPattern { properties, rest })))
    }

    /// An initializer; anonymous functions take the name of an identifier target.
    fn parse_named_initializer(&mut self, target: &Pattern) -> JsResult<Expression> {
        let value = self.parse_assignment_expression()?;
        Ok(match target {
            Pattern::Identifier(id) => with_inferred_name(value, &id.name),
            _ => value,
        })
    }

    /// Reinterpret an object or array literal as a destructuring target.
    fn expression_to_pattern(&mut self, expr: &Expression, start: Span) -> Pattern {
        let end = self.previous.span.end;
        self.cover_initializers
            .retain(|span| span.start < start.start || span.end > end);
        self.convert_to_pattern(expr, start)
    }

    fn convert_to_pattern(&mut self, expr: &Expression, span: Span) -> Pattern {
        match expr {
            Expression::Identifier(id) => {
                self.check_binding_name(id);
                Pattern::Identifier(id.clone())
            }
            Expression::Member(member) if !member.optional => Pattern::Expression(expr.cheap_clone()),
            Expression::SuperMember(_) => Pattern::Expression(expr.cheap_clone()),
            Expression::Array(elements) => {
                let mut out = Vec::new();
                let mut rest = None;
                for (index, element) in elements.iter().enumerate() {
                    match element {
                        ArrayElement::Hole => out.push(None),
                        ArrayElement::Expression(e) => out.push(Some(self.convert_to_element(e, span))),
                        ArrayElement::Spread(e) => {
                            if index + 1 != elements.len() {
                                self.early_error("Rest element must be last element", span);
                            }
                            rest = Some(self.convert_to_pattern(e, span));
                        }
                    }
                }
                Pattern::Array(Rc::new(ArrayPattern { elements: out, rest }))
            }
            Expression::Object(members) => {
                let mut properties = Vec::new();
                let mut rest = None;
                for (index, member) in members.iter().enumerate() {
                    match member {
                        ObjectMember::Property { key, value } => {
                            let element = self.convert_to_element(value, span);
                            properties.push(ObjectPatternProperty {
                                key: key.clone(),
                                value: element.target,
                                default: element.default,
                            });
                        }
                        ObjectMember::Spread(e) => {
                            if index + 1 != members.len() {
                                self.early_error("Rest element must be last element", span);
                            }
                            rest = Some(self.convert_to_pattern(e, span));
                        }
                        ObjectMember::Method { .. } => {
                            self.early_error("Invalid destructuring assignment target", span);
                        }
                    }
                }
                Pattern::Object(Rc::new(ObjectPattern { properties, rest }))
            }
            _ => {
                self.early_error("Invalid destructuring assignment target", span);
                Pattern::Expression(expr.cheap_clone())
            }
        }
    }

    fn convert_to_element(&mut self, expr: &Expression, span: Span) -> PatternElement {
        match expr {
            Expression::Assignment(assign) if assign.op == AssignmentOp::Assign => {
                let target = match &assign.target {
                    AssignmentTarget::Simple(e) => self.convert_to_pattern(e, span),
                    AssignmentTarget::Pattern(p) => p.cheap_clone(),
                };
                PatternElement {
                    target,
                    default: Some(assign.value.cheap_clone()),
                }
            }
            _ => PatternElement {
                target: self.convert_to_pattern(expr, span),
                default: None,
            },
        }
    }

    /// Identifier or property reference; records an early error for
    /// `eval`/`arguments` in strict code.
    fn is_simple_assignment_target(&mut self, expr: &Expression, span: Span) -> bool {
        match expr {
            Expression::Identifier(id) => {
                if self.ctx.strict && is_eval_or_arguments(&id.name) {
                    self.early_error("Unexpected eval or arguments in strict mode", span);
                }
                true
            }
            Expression::Member(member) => !member.optional,
            Expression::SuperMember(_) => true,
            _ => false,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Expressions
    // ═══════════════════════════════════════════════════════════════════════

    fn parse_expression(&mut self) -> JsResult<Expression> {
        self.parse_sequence_expression()
    }

    fn parse_sequence_expression(&mut self) -> JsResult<Expression> {
        let first = self.parse_assignment_expression()?;
        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut expressions = vec![first];
        while self.match_token(&TokenKind::Comma) {
            expressions.push(self.parse_assignment_expression()?);
        }
        Ok(Expression::Sequence(expressions.into()))
    }

    fn parse_assignment_expression(&mut self) -> JsResult<Expression> {
        if self.check(&TokenKind::Yield) && self.ctx.kind.is_generator() {
            return self.parse_yield_expression();
        }

        let start = self.current.span;
        let expr = self.parse_conditional_expression()?;

        let Some(op) = self.current_assignment_op() else {
            return Ok(expr);
        };
        self.advance();

        let target = match (&expr, op) {
            (Expression::Object(_) | Expression::Array(_), AssignmentOp::Assign) => {
                AssignmentTarget::Pattern(self.expression_to_pattern(&expr, start))
            }
            _ => {
                if !self.is_simple_assignment_target(&expr, start) {
                    self.early_error("Invalid left-hand side in assignment", start);
                }
                AssignmentTarget::Simple(expr)
            }
        };
        let value = self.parse_assignment_expression()?;
        let value = match (&target, op) {
            (AssignmentTarget::Simple(Expression::Identifier(id)), AssignmentOp::Assign | AssignmentOp::Logical(_)) => {
                with_inferred_name(value, &id.name)
            }
            _ => value,
        };
        Ok(Expression::Assignment(Rc::new(AssignmentExpression { op, target, value })))
    }

    fn parse_yield_expression(&mut self) -> JsResult<Expression> {
        let span = self.current.span;
        self.advance();
        if self.ctx.in_params {
            self.early_error("Yield expression not allowed in formal parameter", span);
        }
        let delegate = !self.current.newline_before && self.match_token(&TokenKind::Star);
        let has_argument = delegate
            || !(self.current.newline_before
                || matches!(
                    self.current.kind,
                    TokenKind::RParen
                        | TokenKind::RBracket
                        | TokenKind::RBrace
                        | TokenKind::Comma
                        | TokenKind::Semicolon
                        | TokenKind::Colon
                        | TokenKind::Eof
                )
                || (self.no_in && self.check(&TokenKind::In)));
        let argument = if has_argument {
            Some(self.parse_assignment_expression()?)
        } else {
            None
        };
        Ok(Expression::Yield(Rc::new(YieldExpression { argument, delegate })))
    }

    fn parse_conditional_expression(&mut self) -> JsResult<Expression> {
        let test = self.parse_binary_expression(0)?;
        if !self.match_token(&TokenKind::Question) {
            return Ok(test);
        }
        let consequent = self.with_in(Self::parse_assignment_expression)?;
        self.require_token(&TokenKind::Colon)?;
        let alternate = self.parse_assignment_expression()?;
        Ok(Expression::Conditional(Rc::new(ConditionalExpression {
            test,
            consequent,
            alternate,
        })))
    }

    /// Precedence climbing over binary and logical operators
    fn parse_binary_expression(&mut self, min_prec: u8) -> JsResult<Expression> {
        let starts_with_unary = self.current_unary_op().is_some();
        let mut left = self.parse_unary_expression()?;

        while let Some((op, prec)) = self.current_binary_op() {
            if prec < min_prec {
                break;
            }
            let is_exp = matches!(op, Operator::Binary(BinaryOp::Exp));
            if is_exp && starts_with_unary {
                return Err(self.error(
                    "Unary operator used immediately before exponentiation expression",
                ));
            }
            self.advance();
            // ** is right-associative
            let next_prec = if is_exp { prec } else { prec + 1 };
            let right = self.parse_binary_expression(next_prec)?;
            left = match op {
                Operator::Binary(op) => Expression::Binary(Rc::new(BinaryExpression { op, left, right })),
                Operator::Logical(op) => Expression::Logical(Rc::new(LogicalExpression { op, left, right })),
            };
        }
        Ok(left)
    }

    fn parse_unary_expression(&mut self) -> JsResult<Expression> {
        let start = self.current.span;

        if let Some(op) = self.current_unary_op() {
            self.advance();
            let argument = self.parse_unary_expression()?;
            if op == UnaryOp::Delete && self.ctx.strict && matches!(argument, Expression::Identifier(_)) {
                self.early_error("Delete of an unqualified identifier in strict mode", start);
            }
            return Ok(Expression::Unary(Rc::new(UnaryExpression { op, argument })));
        }

        if self.check(&TokenKind::Await) && self.ctx.kind.is_async() {
            self.advance();
            if self.ctx.in_params {
                self.early_error("Await expression not allowed in formal parameter", start);
            }
            let argument = self.parse_unary_expression()?;
            return Ok(Expression::Await(Rc::new(argument)));
        }

        let update = match self.current.kind {
            TokenKind::PlusPlus => Some(UpdateOp::Increment),
            TokenKind::MinusMinus => Some(UpdateOp::Decrement),
            _ => None,
        };
        if let Some(op) = update {
            self.advance();
            let argument_start = self.current.span;
            let argument = self.parse_unary_expression()?;
            if !self.is_simple_assignment_target(&argument, argument_start) {
                self.early_error("Invalid left-hand side expression in prefix operation", argument_start);
            }
            return Ok(Expression::Update(Rc::new(UpdateExpression {
                op,
                prefix: true,
                argument,
            })));
        }

        self.parse_postfix_expression()
    }

    fn parse_postfix_expression(&mut self) -> JsResult<Expression> {
        let start = self.current.span;
        let expr = self.parse_left_hand_side_expression()?;
        if self.current.newline_before {
            return Ok(expr);
        }
        let op = match self.current.kind {
            TokenKind::PlusPlus => UpdateOp::Increment,
            TokenKind::MinusMinus => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        self.advance();
        if !self.is_simple_assignment_target(&expr, start) {
            self.early_error("Invalid left-hand side expression in postfix operation", start);
        }
        Ok(Expression::Update(Rc::new(UpdateExpression {
            op,
            prefix: false,
            argument: expr,
        })))
    }

    /// Member accesses, calls and optional chains
    fn parse_left_hand_side_expression(&mut self) -> JsResult<Expression> {
        let mut expr = match self.current.kind {
            TokenKind::New => self.parse_new_expression()?,
            TokenKind::Super => self.parse_super_expression()?,
            TokenKind::Import => self.parse_import_call()?,
            _ => self.parse_primary_expression()?,
        };

        let mut in_chain = false;
        loop {
            match &self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.parse_identifier_name()?;
                    expr = member(expr, MemberProperty::Identifier(name), false);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let property = self.with_in(Self::parse_expression)?;
                    self.require_token(&TokenKind::RBracket)?;
                    expr = member(expr, MemberProperty::Computed(property), false);
                }
                TokenKind::LParen => {
                    if expr.is_identifier_named("eval") {
                        self.mark_arguments_use();
                    }
                    let arguments = self.parse_call_arguments()?;
                    expr = Expression::Call(Rc::new(CallExpression {
                        callee: expr,
                        arguments,
                        optional: false,
                    }));
                }
                TokenKind::QuestionDot => {
                    self.advance();
                    in_chain = true;
                    expr = match self.current.kind {
                        TokenKind::LParen => {
                            let arguments = self.parse_call_arguments()?;
                            Expression::Call(Rc::new(CallExpression {
                                callee: expr,
                                arguments,
                                optional: true,
                            }))
                        }
                        TokenKind::LBracket => {
                            self.advance();
                            let property = self.with_in(Self::parse_expression)?;
                            self.require_token(&TokenKind::RBracket)?;
                            member(expr, MemberProperty::Computed(property), true)
                        }
                        _ => {
                            let name = self.parse_identifier_name()?;
                            member(expr, MemberProperty::Identifier(name), true)
                        }
                    };
                }
                TokenKind::TemplateNoSub(_) | TokenKind::TemplateHead(_) => {
                    if in_chain {
                        return Err(self.error("Invalid tagged template on optional chain"));
                    }
                    return Err(self.error("Tagged templates are not supported"));
                }
                _ => break,
            }
        }

        if in_chain {
            expr = Expression::OptionalChain(Rc::new(expr));
        }
        Ok(expr)
    }

    /// `new X(args)`, `new X`, `new.target`
    fn parse_new_expression(&mut self) -> JsResult<Expression> {
        let start = self.current.span;
        self.advance();
        if self.match_token(&TokenKind::Dot) {
            if !self.check_contextual("target") {
                return Err(self.unexpected_token("'target'"));
            }
            self.advance();
            if !self.ctx.allow_new_target {
                self.early_error("new.target expression is not allowed here", start);
            }
            return Ok(Expression::NewTarget);
        }

        let mut callee = match self.current.kind {
            TokenKind::New => self.parse_new_expression()?,
            TokenKind::Super => self.parse_super_expression()?,
            _ => self.parse_primary_expression()?,
        };
        loop {
            match self.current.kind {
                TokenKind::Dot => {
                    self.advance();
                    let name = self.parse_identifier_name()?;
                    callee = member(callee, MemberProperty::Identifier(name), false);
                }
                TokenKind::LBracket => {
                    self.advance();
                    let property = self.with_in(Self::parse_expression)?;
                    self.require_token(&TokenKind::RBracket)?;
                    callee = member(callee, MemberProperty::Computed(property), false);
                }
                TokenKind::QuestionDot => {
                    return Err(self.error("Invalid optional chain from new expression"));
                }
                _ => break,
            }
        }
        let arguments = if self.check(&TokenKind::LParen) {
            self.parse_call_arguments()?
        } else {
            Rc::from(Vec::new())
        };
        Ok(Expression::New(Rc::new(CallExpression {
            callee,
            arguments,
            optional: false,
        })))
    }

    fn parse_super_expression(&mut self) -> JsResult<Expression> {
        let span = self.current.span;
        self.advance();
        match self.current.kind {
            TokenKind::LParen => {
                if !self.ctx.allow_super_call {
                    self.early_error("'super' keyword unexpected here", span);
                }
                let arguments = self.parse_call_arguments()?;
                Ok(Expression::SuperCall(arguments))
            }
            TokenKind::Dot => {
                if !self.ctx.allow_super_property {
                    self.early_error("'super' keyword unexpected here", span);
                }
                self.advance();
                let name = self.parse_identifier_name()?;
                Ok(Expression::SuperMember(Rc::new(MemberProperty::Identifier(name))))
            }
            TokenKind::LBracket => {
                if !self.ctx.allow_super_property {
                    self.early_error("'super' keyword unexpected here", span);
                }
                self.advance();
                let property = self.with_in(Self::parse_expression)?;
                self.require_token(&TokenKind::RBracket)?;
                Ok(Expression::SuperMember(Rc::new(MemberProperty::Computed(property))))
            }
            _ => Err(self.error("'super' keyword unexpected here")),
        }
    }

    fn parse_import_call(&mut self) -> JsResult<Expression> {
        self.advance();
        if !self.check(&TokenKind::LParen) {
            return Err(self.error("import.meta is not supported"));
        }
        self.advance();
        let specifier = self.with_in(Self::parse_assignment_expression)?;
        self.require_token(&TokenKind::RParen)?;
        Ok(Expression::ImportCall(Rc::new(specifier)))
    }

    fn parse_call_arguments(&mut self) -> JsResult<Rc<[Argument]>> {
        self.require_token(&TokenKind::LParen)?;
        let arguments = self.with_in(|p| {
            let mut arguments = Vec::new();
            while !p.check(&TokenKind::RParen) {
                if p.match_token(&TokenKind::DotDotDot) {
                    arguments.push(Argument::Spread(p.parse_assignment_expression()?));
                } else {
                    arguments.push(Argument::Expression(p.parse_assignment_expression()?));
                }
                if !p.check(&TokenKind::RParen) {
                    p.require_token(&TokenKind::Comma)?;
                }
            }
            Ok(arguments)
        })?;
        self.require_token(&TokenKind::RParen)?;
        Ok(arguments.into())
    }

    fn parse_primary_expression(&mut self) -> JsResult<Expression> {
        let start = self.current.span;
        match self.current.kind.clone() {
            TokenKind::This => {
                self.advance();
                Ok(Expression::This)
            }
            TokenKind::Number(n) => {
                self.advance();
                Ok(Expression::Literal(Literal::Number(n)))
            }
            TokenKind::String(s) => {
                self.advance();
                Ok(Expression::Literal(Literal::String(s)))
            }
            TokenKind::BigInt(b) => {
                self.advance();
                Ok(Expression::Literal(Literal::BigInt(b)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expression::Literal(Literal::Null))
            }
            TokenKind::TemplateNoSub(_) | TokenKind::TemplateHead(_) => self.parse_template_literal(),
            TokenKind::LParen => self.parse_parenthesized_or_arrow(),
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::Function => self.parse_function_expression(false, start),
            TokenKind::Async => self.parse_async_expression(),
            TokenKind::Class => self.parse_class_expression(),
            _ if self.check_identifier() => {
                let ident = self.parse_identifier_reference()?;
                if self.check(&TokenKind::Arrow) && !self.current.newline_before {
                    return self.parse_single_param_arrow(ident, false, start);
                }
                Ok(Expression::Identifier(ident))
            }
            _ => Err(self.unexpected_token("expression")),
        }
    }

    fn parse_parenthesized_or_arrow(&mut self) -> JsResult<Expression> {
        let start = self.current.span;
        if let Some(arrow) = self.try_parse_arrow(false, start)? {
            return Ok(arrow);
        }
        self.require_token(&TokenKind::LParen)?;
        let expr = self.with_in(Self::parse_expression)?;
        self.require_token(&TokenKind::RParen)?;
        Ok(expr)
    }

    /// `async function`, `async x => ...`, `async (x) => ...` or a plain
    /// identifier named `async`.
    fn parse_async_expression(&mut self) -> JsResult<Expression> {
        let start = self.current.span;
        let next = self.peek();
        if !next.newline_before {
            if next.kind == TokenKind::Function {
                self.advance();
                return self.parse_function_expression(true, start);
            }
            if next.kind == TokenKind::LParen {
                let state = self.save_state();
                self.advance();
                if let Some(arrow) = self.try_parse_arrow(true, start)? {
                    return Ok(arrow);
                }
                self.restore_state(state);
            } else if self.is_identifier_token(&next.kind) {
                let state = self.save_state();
                self.advance();
                let param = self.parse_identifier()?;
                if self.check(&TokenKind::Arrow) && !self.current.newline_before {
                    return self.parse_single_param_arrow(param, true, start);
                }
                self.restore_state(state);
            }
        }
        let ident = self.parse_identifier_reference()?;
        Ok(Expression::Identifier(ident))
    }

    fn parse_array_literal(&mut self) -> JsResult<Expression> {
        self.advance();
        let elements = self.with_in(|p| {
            let mut elements = Vec::new();
            while !p.check(&TokenKind::RBracket) {
                if p.match_token(&TokenKind::Comma) {
                    elements.push(ArrayElement::Hole);
                    continue;
                }
                if p.match_token(&TokenKind::DotDotDot) {
                    elements.push(ArrayElement::Spread(p.parse_assignment_expression()?));
                } else {
                    elements.push(ArrayElement::Expression(p.parse_assignment_expression()?));
                }
                if !p.check(&TokenKind::RBracket) {
                    p.require_token(&TokenKind::Comma)?;
                }
            }
            Ok(elements)
        })?;
        self.require_token(&TokenKind::RBracket)?;
        Ok(Expression::Array(elements.into()))
    }

    fn parse_object_literal(&mut self) -> JsResult<Expression> {
        self.advance();
        let members = self.with_in(|p| {
            let mut members = Vec::new();
            while !p.check(&TokenKind::RBrace) {
                members.push(p.parse_property()?);
                if !p.check(&TokenKind::RBrace) {
                    p.require_token(&TokenKind::Comma)?;
                }
            }
            Ok(members)
        })?;
        self.require_token(&TokenKind::RBrace)?;
        Ok(Expression::Object(members.into()))
    }

    fn parse_property(&mut self) -> JsResult<ObjectMember> {
        if self.match_token(&TokenKind::DotDotDot) {
            return Ok(ObjectMember::Spread(self.parse_assignment_expression()?));
        }

        let start = self.current.span;
        let (kind, is_async, generator) = self.parse_method_prefix();
        let shorthand = self.check_identifier().then_some(self.current.span);
        let key = self.parse_property_name()?;

        if self.check(&TokenKind::LParen) || kind != MethodKind::Method || is_async || generator {
            let function = self.parse_method(&key, kind, is_async, generator, start)?;
            return Ok(ObjectMember::Method { key, kind, function });
        }

        if self.match_token(&TokenKind::Colon) {
            let value = self.parse_assignment_expression()?;
            let value = match static_property_name(&key) {
                Some(name) => with_inferred_name(value, &name),
                None => value,
            };
            return Ok(ObjectMember::Property { key, value });
        }

        // Shorthand `{ a }` or cover-initialized `{ a = 1 }`
        let (Some(span), PropertyName::Identifier(name)) = (shorthand, &key) else {
            return Err(self.unexpected_token("':'"));
        };
        let ident = Identifier {
            name: name.cheap_clone(),
            span,
        };
        self.note_identifier_reference(&ident);
        if self.match_token(&TokenKind::Eq) {
            let default = self.parse_assignment_expression()?;
            let default = with_inferred_name(default, name);
            self.cover_initializers.push(Span::new(span.start, self.previous.span.end, span.line, span.column));
            let value = Expression::Assignment(Rc::new(AssignmentExpression {
                op: AssignmentOp::Assign,
                target: AssignmentTarget::Simple(Expression::Identifier(ident)),
                value: default,
            }));
            return Ok(ObjectMember::Property { key, value });
        }
        Ok(ObjectMember::Property {
            key,
            value: Expression::Identifier(ident),
        })
    }

    fn parse_property_name(&mut self) -> JsResult<PropertyName> {
        let name = match self.current.kind.clone() {
            TokenKind::Identifier(s) => PropertyName::Identifier(s),
            TokenKind::String(s) => PropertyName::String(s),
            TokenKind::Number(n) => PropertyName::Number(n),
            TokenKind::BigInt(b) => PropertyName::String(self.intern(&b.to_string())),
            TokenKind::LBracket => {
                self.advance();
                let key = self.with_in(Self::parse_assignment_expression)?;
                self.require_token(&TokenKind::RBracket)?;
                return Ok(PropertyName::Computed(key));
            }
            other => match other.keyword_text() {
                Some(text) => PropertyName::Identifier(self.intern(text)),
                None => return Err(self.unexpected_token("property name")),
            },
        };
        self.advance();
        Ok(name)
    }

    fn parse_template_literal(&mut self) -> JsResult<Expression> {
        let mut quasis = Vec::new();
        let mut expressions = Vec::new();
        match self.current.kind.clone() {
            TokenKind::TemplateNoSub(text) => {
                self.advance();
                quasis.push(text);
            }
            TokenKind::TemplateHead(text) => {
                self.advance();
                quasis.push(text);
                loop {
                    expressions.push(self.with_in(Self::parse_expression)?);
                    if !self.check(&TokenKind::RBrace) {
                        return Err(self.unexpected_token("'}'"));
                    }
                    self.current = self.lexer.rescan_template_continuation(self.current.span);
                    match self.current.kind.clone() {
                        TokenKind::TemplateMiddle(text) => {
                            quasis.push(text);
                            self.advance();
                        }
                        TokenKind::TemplateTail(text) => {
                            quasis.push(text);
                            self.advance();
                            break;
                        }
                        _ => return Err(self.error("Unterminated template literal")),
                    }
                }
            }
            _ => return Err(self.unexpected_token("template literal")),
        }
        Ok(Expression::Template(Rc::new(TemplateLiteral { quasis, expressions })))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Identifiers and operators
    // ═══════════════════════════════════════════════════════════════════════

    fn parse_identifier(&mut self) -> JsResult<Identifier> {
        if !self.check_identifier() {
            return Err(self.unexpected_token("identifier"));
        }
        let span = self.current.span;
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.cheap_clone(),
            other => {
                let text = other.keyword_text().unwrap_or_default();
                self.intern(text)
            }
        };
        self.advance();
        Ok(Identifier { name, span })
    }

    fn parse_binding_identifier(&mut self) -> JsResult<JsString> {
        let ident = self.parse_identifier()?;
        self.check_binding_name(&ident);
        Ok(ident.name)
    }

    /// An identifier in expression position.
    fn parse_identifier_reference(&mut self) -> JsResult<Identifier> {
        let ident = self.parse_identifier()?;
        self.note_identifier_reference(&ident);
        Ok(ident)
    }

    fn note_identifier_reference(&mut self, ident: &Identifier) {
        if ident.name.eq_str("arguments") {
            self.mark_arguments_use();
        }
        if self.ctx.strict && is_strict_reserved(&ident.name) {
            self.early_error("Unexpected strict mode reserved word", ident.span);
        }
    }

    /// IdentifierName: any identifier including reserved words.
    fn parse_identifier_name(&mut self) -> JsResult<JsString> {
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => name.cheap_clone(),
            other => match other.keyword_text() {
                Some(text) => self.intern(text),
                None => return Err(self.unexpected_token("identifier")),
            },
        };
        self.advance();
        Ok(name)
    }

    fn current_unary_op(&self) -> Option<UnaryOp> {
        Some(match self.current.kind {
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Typeof => UnaryOp::Typeof,
            TokenKind::Void => UnaryOp::Void,
            TokenKind::Delete => UnaryOp::Delete,
            _ => return None,
        })
    }

    fn current_binary_op(&self) -> Option<(Operator, u8)> {
        use Operator::{Binary, Logical};
        Some(match self.current.kind {
            TokenKind::QuestionQuestion => (Logical(LogicalOp::NullishCoalescing), 1),
            TokenKind::PipePipe => (Logical(LogicalOp::Or), 2),
            TokenKind::AmpAmp => (Logical(LogicalOp::And), 3),
            TokenKind::Pipe => (Binary(BinaryOp::BitOr), 4),
            TokenKind::Caret => (Binary(BinaryOp::BitXor), 5),
            TokenKind::Amp => (Binary(BinaryOp::BitAnd), 6),
            TokenKind::EqEq => (Binary(BinaryOp::Eq), 7),
            TokenKind::BangEq => (Binary(BinaryOp::NotEq), 7),
            TokenKind::EqEqEq => (Binary(BinaryOp::StrictEq), 7),
            TokenKind::BangEqEq => (Binary(BinaryOp::StrictNotEq), 7),
            TokenKind::Lt => (Binary(BinaryOp::Lt), 8),
            TokenKind::LtEq => (Binary(BinaryOp::LtEq), 8),
            TokenKind::Gt => (Binary(BinaryOp::Gt), 8),
            TokenKind::GtEq => (Binary(BinaryOp::GtEq), 8),
            TokenKind::Instanceof => (Binary(BinaryOp::Instanceof), 8),
            TokenKind::In if !self.no_in => (Binary(BinaryOp::In), 8),
            TokenKind::LtLt => (Binary(BinaryOp::LShift), 9),
            TokenKind::GtGt => (Binary(BinaryOp::RShift), 9),
            TokenKind::GtGtGt => (Binary(BinaryOp::URShift), 9),
            TokenKind::Plus => (Binary(BinaryOp::Add), 10),
            TokenKind::Minus => (Binary(BinaryOp::Sub), 10),
            TokenKind::Star => (Binary(BinaryOp::Mul), 11),
            TokenKind::Slash => (Binary(BinaryOp::Div), 11),
            TokenKind::Percent => (Binary(BinaryOp::Mod), 11),
            TokenKind::StarStar => (Binary(BinaryOp::Exp), 12),
            _ => return None,
        })
    }

    fn current_assignment_op(&self) -> Option<AssignmentOp> {
        use AssignmentOp::{Assign, Compound, Logical};
        Some(match self.current.kind {
            TokenKind::Eq => Assign,
            TokenKind::PlusEq => Compound(BinaryOp::Add),
            TokenKind::MinusEq => Compound(BinaryOp::Sub),
            TokenKind::StarEq => Compound(BinaryOp::Mul),
            TokenKind::SlashEq => Compound(BinaryOp::Div),
            TokenKind::PercentEq => Compound(BinaryOp::Mod),
            TokenKind::StarStarEq => Compound(BinaryOp::Exp),
            TokenKind::AmpEq => Compound(BinaryOp::BitAnd),
            TokenKind::PipeEq => Compound(BinaryOp::BitOr),
            TokenKind::CaretEq => Compound(BinaryOp::BitXor),
            TokenKind::LtLtEq => Compound(BinaryOp::LShift),
            TokenKind::GtGtEq => Compound(BinaryOp::RShift),
            TokenKind::GtGtGtEq => Compound(BinaryOp::URShift),
            TokenKind::AmpAmpEq => Logical(LogicalOp::And),
            TokenKind::PipePipeEq => Logical(LogicalOp::Or),
            TokenKind::QuestionQuestionEq => Logical(LogicalOp::NullishCoalescing),
            _ => return None,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn member(object: Expression, property: MemberProperty, optional: bool) -> Expression {
    Expression::Member(Rc::new(MemberExpression {
        object,
        property,
        optional,
    }))
}

fn describe_token(kind: &TokenKind) -> String {
    if let Some(text) = kind.keyword_text() {
        return format!("'{text}'");
    }
    match kind {
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::Identifier(name) => format!("'{name}'"),
        TokenKind::Number(n) => number_to_string(*n),
        TokenKind::String(_) => "string".to_string(),
        TokenKind::LParen => "'('".to_string(),
        TokenKind::RParen => "')'".to_string(),
        TokenKind::LBrace => "'{'".to_string(),
        TokenKind::RBrace => "'}'".to_string(),
        TokenKind::LBracket => "'['".to_string(),
        TokenKind::RBracket => "']'".to_string(),
        TokenKind::Semicolon => "';'".to_string(),
        TokenKind::Colon => "':'".to_string(),
        TokenKind::Comma => "','".to_string(),
        TokenKind::Arrow => "'=>'".to_string(),
        other => format!("{other:?}"),
    }
}

fn is_eval_or_arguments(name: &JsString) -> bool {
    name.eq_str("eval") || name.eq_str("arguments")
}

fn is_strict_reserved(name: &JsString) -> bool {
    const RESERVED: [&str; 9] = [
        "implements",
        "interface",
        "let",
        "package",
        "private",
        "protected",
        "public",
        "static",
        "yield",
    ];
    RESERVED.iter().any(|word| name.eq_str(word))
}

fn has_duplicates(names: &[JsString]) -> bool {
    let mut seen = FxHashSet::default();
    names.iter().any(|name| !seen.insert(name))
}

/// Whether evaluating the pattern can run code (defaults or computed keys).
fn pattern_has_expressions(pattern: &Pattern) -> bool {
    match pattern {
        Pattern::Identifier(_) | Pattern::Expression(_) => false,
        Pattern::Object(obj) => {
            obj.properties.iter().any(|p| {
                p.default.is_some()
                    || matches!(p.key, PropertyName::Computed(_))
                    || pattern_has_expressions(&p.value)
            }) || obj.rest.as_ref().is_some_and(pattern_has_expressions)
        }
        Pattern::Array(arr) => {
            arr.elements
                .iter()
                .flatten()
                .any(|e| e.default.is_some() || pattern_has_expressions(&e.target))
                || arr.rest.as_ref().is_some_and(pattern_has_expressions)
        }
    }
}

/// The key of a non-computed property name as a string.
fn static_property_name(key: &PropertyName) -> Option<JsString> {
    match key {
        PropertyName::Identifier(s) | PropertyName::String(s) => Some(s.cheap_clone()),
        PropertyName::Number(n) => Some(JsString::from(number_to_string(*n))),
        PropertyName::Computed(_) => None,
    }
}

/// NamedEvaluation for anonymous function and class definitions.
fn with_inferred_name(expr: Expression, name: &JsString) -> Expression {
    match &expr {
        Expression::Function(f) if f.id.is_none() && f.name.is_empty() => {
            let mut node = (**f).clone();
            node.name = name.cheap_clone();
            Expression::Function(Rc::new(node))
        }
        Expression::Class(c) if c.id.is_none() && c.name.is_empty() => {
            let mut node = (**c).clone();
            node.name = name.cheap_clone();
            let mut constructor = (*node.constructor).clone();
            constructor.name = name.cheap_clone();
            node.constructor = Rc::new(constructor);
            Expression::Class(Rc::new(node))
        }
        _ => expr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        let mut dict = StringDict::new();
        match parse_script(source, &mut dict, false) {
            Ok(program) => program,
            Err(e) => panic!("parse failed for {source:?}: {e}"),
        }
    }

    fn early_errors(source: &str) -> Vec<String> {
        let mut dict = StringDict::new();
        match parse_script(source, &mut dict, false) {
            Err(JsError::EarlyErrors(errors)) => errors.into_iter().map(|e| e.message).collect(),
            Err(other) => panic!("expected early errors, got {other}"),
            Ok(_) => panic!("expected early errors for {source:?}"),
        }
    }

    fn first_function(program: &Program) -> Rc<FunctionNode> {
        match program.body.first() {
            Some(Statement::FunctionDeclaration(f)) => f.cheap_clone(),
            other => panic!("expected function declaration, got {other:?}"),
        }
    }

    #[test]
    fn test_hoisting_facts() {
        let program = parse("var a; let b; const c = 1; function f() {} { var d; let e; }");
        let vars: Vec<String> = program.scope.var_names.iter().map(JsString::to_rust_string).collect();
        assert_eq!(vars, vec!["a", "d"]);
        let lexical: Vec<(String, bool)> = program
            .scope
            .lexical
            .iter()
            .map(|b| (b.name.to_rust_string(), b.constant))
            .collect();
        assert_eq!(lexical, vec![("b".to_string(), false), ("c".to_string(), true)]);
        assert_eq!(program.scope.functions.len(), 1);
    }

    #[test]
    fn test_use_strict_directive() {
        assert!(parse("'use strict'; x;").strict);
        assert!(!parse("'use\\x20strict'; x;").strict);
        assert!(!parse("x; 'use strict';").strict);
        let f = first_function(&parse("function f() { \"use strict\"; }"));
        assert!(f.strict);
    }

    #[test]
    fn test_function_parameter_facts() {
        let f = first_function(&parse("function f(a, b = 1, ...c) { return arguments; }"));
        assert!(!f.simple_params);
        assert!(f.has_param_expressions);
        assert!(f.uses_arguments);
        assert_eq!(f.length, 1);
        assert_eq!(f.param_names.len(), 3);

        let g = first_function(&parse("function g(a, b) { return () => arguments; }"));
        assert!(g.simple_params);
        assert!(g.uses_arguments);

        let h = first_function(&parse("function h(a) { return a; }"));
        assert!(!h.uses_arguments);
    }

    #[test]
    fn test_early_errors_are_batched() {
        let errors = early_errors("let a; let a; break; continue;");
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("has already been declared"));
        assert!(errors[1].contains("Illegal break"));
        assert!(errors[2].contains("Illegal continue"));
    }

    #[test]
    fn test_var_let_conflicts() {
        assert_eq!(early_errors("let x; { var x; }").len(), 1);
        assert_eq!(early_errors("function f(a) { let a; }").len(), 1);
        parse("function f(a) { var a; { let a; } }");
        parse("try {} catch (e) { var e; }");
        assert_eq!(early_errors("try {} catch (e) { let e; }").len(), 1);
    }

    #[test]
    fn test_labels_resolve_lexically() {
        parse("outer: for (;;) { for (;;) { continue outer; } }");
        parse("a: b: while (true) { continue a; }");
        parse("block: { break block; }");
        let errors = early_errors("block: { for (;;) { continue block; } }");
        assert!(errors[0].contains("does not denote an iteration statement"));
        // labels do not cross function boundaries
        let errors = early_errors("outer: for (;;) { (function () { break outer; }); }");
        assert!(errors[0].contains("Undefined label"));
    }

    #[test]
    fn test_loop_statements_carry_label_sets() {
        let program = parse("a: b: for (;;) {}");
        let Some(Statement::Labeled(a)) = program.body.first() else {
            panic!("expected labeled statement");
        };
        let Statement::Labeled(b) = &a.body else {
            panic!("expected nested label");
        };
        let Statement::For(for_stmt) = &b.body else {
            panic!("expected for statement");
        };
        assert_eq!(for_stmt.labels.len(), 2);
    }

    #[test]
    fn test_strict_mode_restrictions() {
        let mut dict = StringDict::new();
        let err = parse_script("x = 1; delete x; with (o) {}", &mut dict, true).unwrap_err();
        let JsError::EarlyErrors(errors) = err else {
            panic!("expected early errors");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(early_errors("'use strict'; var eval;").len(), 1);
        assert_eq!(early_errors("function f(a, a) { 'use strict'; }").len(), 1);
        assert_eq!(early_errors("function f(a = 1) { 'use strict'; }").len(), 1);
        parse("function f(a, a) {}");
    }

    #[test]
    fn test_invalid_assignment_targets() {
        assert_eq!(early_errors("1 = 2;").len(), 1);
        assert_eq!(early_errors("f() = 2;").len(), 1);
        assert_eq!(early_errors("++a.b();").len(), 1);
        parse("[a, b = 1, ...c] = d; ({ x, y: [z] = [] } = o);");
        assert_eq!(early_errors("({ a = 1 });").len(), 1);
    }

    #[test]
    fn test_arrow_functions() {
        let program = parse("let f = (a, b) => a + b; let g = x => x; let h = async (y) => await y; (a);");
        let Some(Statement::VariableDeclaration(decl)) = program.body.first() else {
            panic!("expected declaration");
        };
        let Some(Expression::Function(f)) = &decl.declarations[0].init else {
            panic!("expected arrow");
        };
        assert!(f.is_arrow());
        assert_eq!(f.name.to_rust_string(), "f");
        assert_eq!(f.param_names.len(), 2);
    }

    #[test]
    fn test_yield_and_await_contexts() {
        parse("function* g() { yield 1; yield* g(); var x = yield; }");
        parse("async function f() { await 1; for await (const x of y) {} }");
        parse("var yield = 1; var await = 2;");
        assert_eq!(early_errors("function* g(a = yield) {}").len(), 1);
    }

    #[test]
    fn test_class_constructor_synthesis() {
        let program = parse("class A {} class B extends A { m() { return super.m(); } }");
        let Some(Statement::ClassDeclaration(b)) = program.body.get(1) else {
            panic!("expected class");
        };
        assert_eq!(b.constructor.form, FunctionForm::ClassConstructor { derived: true });
        assert!(b.constructor.params[0].rest);
        assert_eq!(b.members.len(), 1);
        assert_eq!(early_errors("function f() { super.x; }").len(), 1);
        assert_eq!(early_errors("class A { m() { super(); } }").len(), 1);
    }

    #[test]
    fn test_module_facts() {
        let mut dict = StringDict::new();
        let program = parse_module(
            "import d, { a as b } from 'dep'; import * as ns from 'other'; \
             export const c = 1; export { b as e }; export default function () {}",
            &mut dict,
        )
        .unwrap();
        let facts = program.module.unwrap();
        assert_eq!(facts.requests.len(), 2);
        assert_eq!(facts.imports.len(), 3);
        let exports: Vec<(String, String)> = facts
            .exports
            .iter()
            .map(|e| (e.export_name.to_rust_string(), e.local.to_rust_string()))
            .collect();
        assert_eq!(
            exports,
            vec![
                ("c".to_string(), "c".to_string()),
                ("e".to_string(), "b".to_string()),
                ("default".to_string(), "*default*".to_string()),
            ]
        );
        assert!(program.strict);
    }

    #[test]
    fn test_module_export_must_be_declared() {
        let mut dict = StringDict::new();
        let err = parse_module("export { missing };", &mut dict).unwrap_err();
        assert!(matches!(err, JsError::EarlyErrors(_)));
    }

    #[test]
    fn test_asi_and_grammar_errors() {
        parse("let a = 1\nlet b = 2\na\n++b");
        let mut dict = StringDict::new();
        let err = parse_script("let a = 1 let b = 2", &mut dict, false).unwrap_err();
        assert!(matches!(err, JsError::SyntaxError { .. }));
    }

    #[test]
    fn test_optional_chain_boundary() {
        let program = parse("a?.b.c;");
        let Some(Statement::Expression(Expression::OptionalChain(inner))) = program.body.first() else {
            panic!("expected optional chain");
        };
        assert!(matches!(&**inner, Expression::Member(m) if !m.optional));
    }

    #[test]
    fn test_template_literal() {
        let program = parse("`a${1}b${2}c`;");
        let Some(Statement::Expression(Expression::Template(t))) = program.body.first() else {
            panic!("expected template");
        };
        assert_eq!(t.quasis.len(), 3);
        assert_eq!(t.expressions.len(), 2);
    }

    #[test]
    fn test_eval_goal_permissions() {
        let mut dict = StringDict::new();
        assert!(parse_eval("new.target", &mut dict, EvalContext::default()).is_err());
        let in_function = EvalContext {
            in_function: true,
            ..EvalContext::default()
        };
        assert!(parse_eval("new.target", &mut dict, in_function).is_ok());
        assert!(parse_eval("return 1", &mut dict, in_function).is_err());
    }
}
