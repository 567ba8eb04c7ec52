//! Abstract Syntax Tree types for JavaScript
//!
//! Nodes are immutable once parsed and shared through `Rc`, so the frame
//! machine can hold a statement or expression by value and clone it in O(1).
//! Statements, expressions and patterns implement `CheapClone`.
//!
//! Besides syntax, function and script nodes carry the static facts the
//! runtime needs at instantiation time: var-scoped names, lexical
//! declarations, hoistable functions and the shape of the parameter list.

use std::rc::Rc;

use num_bigint::BigInt;

use crate::lexer::Span;
use crate::value::{CheapClone, JsString};

/// A complete program (script, module or eval code)
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Rc<[Statement]>,
    pub source_type: SourceType,
    pub strict: bool,
    pub scope: Rc<VarScope>,
    /// Import and export bookkeeping; present for modules only.
    pub module: Option<Rc<ModuleFacts>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Script,
    Module,
    Eval,
}

/// Declarations hoisted to a function body, script or eval body.
#[derive(Debug, Clone, Default)]
pub struct VarScope {
    /// Names declared with `var` anywhere in the body, nested blocks included.
    pub var_names: Vec<JsString>,
    /// Top-level function declarations, in source order.
    pub functions: Vec<Rc<FunctionNode>>,
    /// Top-level let/const/class declarations.
    pub lexical: Vec<LexicalBinding>,
}

/// Declarations scoped to a block or a switch case block.
#[derive(Debug, Clone, Default)]
pub struct BlockScope {
    pub lexical: Vec<LexicalBinding>,
    /// Function declarations directly inside the block.
    pub functions: Vec<Rc<FunctionNode>>,
}

impl BlockScope {
    pub fn is_empty(&self) -> bool {
        self.lexical.is_empty() && self.functions.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LexicalBinding {
    pub name: JsString,
    pub constant: bool,
}

// ============ STATEMENTS ============

#[derive(Debug, Clone)]
pub enum Statement {
    VariableDeclaration(Rc<VariableDeclaration>),
    FunctionDeclaration(Rc<FunctionNode>),
    ClassDeclaration(Rc<ClassNode>),

    Expression(Expression),
    Block(Rc<BlockStatement>),
    Empty,
    If(Rc<IfStatement>),
    For(Rc<ForStatement>),
    ForIn(Rc<ForInOfStatement>),
    ForOf(Rc<ForInOfStatement>),
    While(Rc<WhileStatement>),
    DoWhile(Rc<WhileStatement>),
    Switch(Rc<SwitchStatement>),
    Labeled(Rc<LabeledStatement>),
    Break(Option<JsString>),
    Continue(Option<JsString>),
    Return(Option<Expression>),
    Throw(Expression),
    Try(Rc<TryStatement>),
    With(Rc<WithStatement>),
    Debugger,

    Import(Rc<ImportDeclaration>),
    Export(Rc<ExportDeclaration>),
}

impl CheapClone for Statement {}

#[derive(Debug, Clone)]
pub struct BlockStatement {
    pub body: Rc<[Statement]>,
    pub scope: Rc<BlockScope>,
}

#[derive(Debug, Clone)]
pub struct VariableDeclaration {
    pub kind: VariableKind,
    pub declarations: Rc<[VariableDeclarator]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Let,
    Const,
    Var,
}

impl VariableKind {
    pub fn is_lexical(self) -> bool {
        !matches!(self, VariableKind::Var)
    }
}

#[derive(Debug, Clone)]
pub struct VariableDeclarator {
    pub target: Pattern,
    pub init: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct IfStatement {
    pub test: Expression,
    pub consequent: Statement,
    pub alternate: Option<Statement>,
}

#[derive(Debug, Clone)]
pub enum ForInit {
    Variable(Rc<VariableDeclaration>),
    Expression(Expression),
}

#[derive(Debug, Clone)]
pub struct ForStatement {
    pub init: Option<ForInit>,
    pub test: Option<Expression>,
    pub update: Option<Expression>,
    pub body: Statement,
    /// Labels that directly label this statement.
    pub labels: Rc<[JsString]>,
}

/// The left-hand side of a for-in/for-of head.
#[derive(Debug, Clone)]
pub enum ForHead {
    /// `for (var x of ...)`, `for (let [a, b] of ...)`
    Declaration { kind: VariableKind, target: Pattern },
    /// `for (x of ...)`, `for ([a, b] of ...)`, `for (o.p in ...)`
    Target(Pattern),
}

#[derive(Debug, Clone)]
pub struct ForInOfStatement {
    pub head: ForHead,
    pub right: Expression,
    pub body: Statement,
    pub labels: Rc<[JsString]>,
    /// `for await (... of ...)`
    pub is_await: bool,
}

#[derive(Debug, Clone)]
pub struct WhileStatement {
    pub test: Expression,
    pub body: Statement,
    pub labels: Rc<[JsString]>,
}

#[derive(Debug, Clone)]
pub struct SwitchStatement {
    pub discriminant: Expression,
    pub cases: Rc<[SwitchCase]>,
    pub scope: Rc<BlockScope>,
    pub labels: Rc<[JsString]>,
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` for the default clause.
    pub test: Option<Expression>,
    pub body: Rc<[Statement]>,
}

#[derive(Debug, Clone)]
pub struct LabeledStatement {
    pub label: JsString,
    pub body: Statement,
}

#[derive(Debug, Clone)]
pub struct TryStatement {
    pub block: Rc<BlockStatement>,
    pub handler: Option<CatchClause>,
    pub finalizer: Option<Rc<BlockStatement>>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    pub param: Option<Pattern>,
    pub body: Rc<BlockStatement>,
}

#[derive(Debug, Clone)]
pub struct WithStatement {
    pub object: Expression,
    pub body: Statement,
}

// ============ MODULES ============

#[derive(Debug, Clone)]
pub struct ImportDeclaration {
    pub source: JsString,
}

#[derive(Debug, Clone)]
pub enum ExportDeclaration {
    /// `export var/let/const/function/class ...`
    Declaration(Statement),
    /// `export default function/class ...` (possibly anonymous)
    DefaultDeclaration(Statement),
    /// `export default <expr>;`
    DefaultExpression(Expression),
    /// `export { a, b as c };`
    List,
}

#[derive(Debug, Clone, Default)]
pub struct ModuleFacts {
    /// Requested module specifiers in source order, deduplicated.
    pub requests: Vec<JsString>,
    pub imports: Vec<ImportEntry>,
    pub exports: Vec<ExportEntry>,
}

#[derive(Debug, Clone)]
pub enum ImportName {
    Named(JsString),
    Namespace,
}

#[derive(Debug, Clone)]
pub struct ImportEntry {
    pub module: JsString,
    pub import_name: ImportName,
    pub local: JsString,
}

#[derive(Debug, Clone)]
pub struct ExportEntry {
    pub export_name: JsString,
    pub local: JsString,
}

// ============ FUNCTIONS AND CLASSES ============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Normal,
    Generator,
    Async,
    AsyncGenerator,
}

impl FunctionKind {
    pub fn from_flags(is_async: bool, is_generator: bool) -> Self {
        match (is_async, is_generator) {
            (false, false) => FunctionKind::Normal,
            (false, true) => FunctionKind::Generator,
            (true, false) => FunctionKind::Async,
            (true, true) => FunctionKind::AsyncGenerator,
        }
    }

    pub fn is_async(self) -> bool {
        matches!(self, FunctionKind::Async | FunctionKind::AsyncGenerator)
    }

    pub fn is_generator(self) -> bool {
        matches!(self, FunctionKind::Generator | FunctionKind::AsyncGenerator)
    }
}

/// How a function was defined, which decides its constructor behavior
/// and `this` handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionForm {
    Declaration,
    Expression,
    Arrow,
    Method,
    Getter,
    Setter,
    ClassConstructor { derived: bool },
}

#[derive(Debug, Clone)]
pub enum FunctionBody {
    Block(Rc<[Statement]>),
    /// Concise arrow body
    Expression(Expression),
}

#[derive(Debug, Clone)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expression>,
    pub rest: bool,
}

#[derive(Debug, Clone)]
pub struct FunctionNode {
    /// The binding identifier of declarations and named expressions.
    pub id: Option<JsString>,
    /// The value of the `name` property, including names inferred from
    /// the binding or property the function is assigned to.
    pub name: JsString,
    pub kind: FunctionKind,
    pub form: FunctionForm,
    pub params: Rc<[Param]>,
    pub body: FunctionBody,
    pub strict: bool,
    pub scope: Rc<VarScope>,
    pub param_names: Rc<[JsString]>,
    pub simple_params: bool,
    pub has_param_expressions: bool,
    pub has_duplicate_params: bool,
    /// The body or parameters mention `arguments` or contain a direct eval.
    pub uses_arguments: bool,
    /// ExpectedArgumentCount, the value of `length`.
    pub length: u32,
    pub span: Span,
}

impl FunctionNode {
    pub fn is_arrow(&self) -> bool {
        self.form == FunctionForm::Arrow
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == FunctionKind::Normal
            && matches!(
                self.form,
                FunctionForm::Declaration
                    | FunctionForm::Expression
                    | FunctionForm::ClassConstructor { .. }
            )
    }
}

#[derive(Debug, Clone)]
pub struct ClassNode {
    pub id: Option<JsString>,
    pub name: JsString,
    pub heritage: Option<Expression>,
    pub constructor: Rc<FunctionNode>,
    pub members: Rc<[ClassMember]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
}

#[derive(Debug, Clone)]
pub struct ClassMember {
    pub key: PropertyName,
    pub is_static: bool,
    pub kind: MethodKind,
    pub function: Rc<FunctionNode>,
}

// ============ EXPRESSIONS ============

#[derive(Debug, Clone)]
pub enum Expression {
    Literal(Literal),
    Template(Rc<TemplateLiteral>),
    Identifier(Identifier),
    This,
    NewTarget,
    Array(Rc<[ArrayElement]>),
    Object(Rc<[ObjectMember]>),
    Function(Rc<FunctionNode>),
    Class(Rc<ClassNode>),
    Unary(Rc<UnaryExpression>),
    Update(Rc<UpdateExpression>),
    Binary(Rc<BinaryExpression>),
    Logical(Rc<LogicalExpression>),
    Conditional(Rc<ConditionalExpression>),
    Assignment(Rc<AssignmentExpression>),
    Sequence(Rc<[Expression]>),
    Member(Rc<MemberExpression>),
    SuperMember(Rc<MemberProperty>),
    Call(Rc<CallExpression>),
    SuperCall(Rc<[Argument]>),
    New(Rc<CallExpression>),
    /// Boundary of an optional chain: a short-circuit inside ends here.
    OptionalChain(Rc<Expression>),
    Yield(Rc<YieldExpression>),
    Await(Rc<Expression>),
    ImportCall(Rc<Expression>),
}

impl CheapClone for Expression {}

impl Expression {
    /// IsAnonymousFunctionDefinition
    pub fn is_anonymous_function_definition(&self) -> bool {
        match self {
            Expression::Function(f) => f.id.is_none(),
            Expression::Class(c) => c.id.is_none(),
            _ => false,
        }
    }

    /// Whether this expression is the identifier `name`.
    pub fn is_identifier_named(&self, name: &str) -> bool {
        matches!(self, Expression::Identifier(id) if id.name.eq_str(name))
    }
}

#[derive(Debug, Clone)]
pub enum Literal {
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
    BigInt(Rc<BigInt>),
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: JsString,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TemplateLiteral {
    /// Cooked strings; one more than `expressions`.
    pub quasis: Vec<JsString>,
    pub expressions: Vec<Expression>,
}

#[derive(Debug, Clone)]
pub enum ArrayElement {
    Hole,
    Expression(Expression),
    Spread(Expression),
}

#[derive(Debug, Clone)]
pub enum PropertyName {
    Identifier(JsString),
    String(JsString),
    Number(f64),
    Computed(Expression),
}

#[derive(Debug, Clone)]
pub enum ObjectMember {
    Property { key: PropertyName, value: Expression },
    Method {
        key: PropertyName,
        kind: MethodKind,
        function: Rc<FunctionNode>,
    },
    Spread(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    Typeof,
    Void,
    Delete,
}

#[derive(Debug, Clone)]
pub struct UnaryExpression {
    pub op: UnaryOp,
    pub argument: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone)]
pub struct UpdateExpression {
    pub op: UpdateOp,
    pub prefix: bool,
    pub argument: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
    URShift,
    In,
    Instanceof,
}

#[derive(Debug, Clone)]
pub struct BinaryExpression {
    pub op: BinaryOp,
    pub left: Expression,
    pub right: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    NullishCoalescing,
}

#[derive(Debug, Clone)]
pub struct LogicalExpression {
    pub op: LogicalOp,
    pub left: Expression,
    pub right: Expression,
}

#[derive(Debug, Clone)]
pub struct ConditionalExpression {
    pub test: Expression,
    pub consequent: Expression,
    pub alternate: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOp {
    Assign,
    /// Compound assignment with the underlying binary operator.
    Compound(BinaryOp),
    /// `&&=`, `||=`, `??=`
    Logical(LogicalOp),
}

#[derive(Debug, Clone)]
pub enum AssignmentTarget {
    /// Identifier or member expression
    Simple(Expression),
    /// Destructuring assignment
    Pattern(Pattern),
}

#[derive(Debug, Clone)]
pub struct AssignmentExpression {
    pub op: AssignmentOp,
    pub target: AssignmentTarget,
    pub value: Expression,
}

#[derive(Debug, Clone)]
pub enum MemberProperty {
    Identifier(JsString),
    Computed(Expression),
}

#[derive(Debug, Clone)]
pub struct MemberExpression {
    pub object: Expression,
    pub property: MemberProperty,
    /// `a?.b`: short-circuits the enclosing chain when `a` is nullish.
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub enum Argument {
    Expression(Expression),
    Spread(Expression),
}

#[derive(Debug, Clone)]
pub struct CallExpression {
    pub callee: Expression,
    pub arguments: Rc<[Argument]>,
    pub optional: bool,
}

#[derive(Debug, Clone)]
pub struct YieldExpression {
    pub argument: Option<Expression>,
    pub delegate: bool,
}

// ============ PATTERNS ============

#[derive(Debug, Clone)]
pub enum Pattern {
    Identifier(Identifier),
    Object(Rc<ObjectPattern>),
    Array(Rc<ArrayPattern>),
    /// Member expression target, only valid in destructuring assignment.
    Expression(Expression),
}

impl CheapClone for Pattern {}

impl Pattern {
    /// BoundNames
    pub fn bound_names(&self, out: &mut Vec<JsString>) {
        match self {
            Pattern::Identifier(id) => out.push(id.name.cheap_clone()),
            Pattern::Object(obj) => {
                for prop in &obj.properties {
                    prop.value.bound_names(out);
                }
                if let Some(rest) = &obj.rest {
                    rest.bound_names(out);
                }
            }
            Pattern::Array(arr) => {
                for element in arr.elements.iter().flatten() {
                    element.target.bound_names(out);
                }
                if let Some(rest) = &arr.rest {
                    rest.bound_names(out);
                }
            }
            Pattern::Expression(_) => {}
        }
    }

    pub fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Pattern::Identifier(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ObjectPattern {
    pub properties: Vec<ObjectPatternProperty>,
    pub rest: Option<Pattern>,
}

#[derive(Debug, Clone)]
pub struct ObjectPatternProperty {
    pub key: PropertyName,
    pub value: Pattern,
    pub default: Option<Expression>,
}

#[derive(Debug, Clone)]
pub struct ArrayPattern {
    /// `None` entries are elisions.
    pub elements: Vec<Option<PatternElement>>,
    pub rest: Option<Pattern>,
}

#[derive(Debug, Clone)]
pub struct PatternElement {
    pub target: Pattern,
    pub default: Option<Expression>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Pattern {
        Pattern::Identifier(Identifier {
            name: JsString::from(name),
            span: Span::default(),
        })
    }

    #[test]
    fn test_bound_names_of_nested_patterns() {
        let pattern = Pattern::Object(Rc::new(ObjectPattern {
            properties: vec![ObjectPatternProperty {
                key: PropertyName::Identifier(JsString::from("a")),
                value: Pattern::Array(Rc::new(ArrayPattern {
                    elements: vec![
                        Some(PatternElement {
                            target: ident("b"),
                            default: None,
                        }),
                        None,
                    ],
                    rest: Some(ident("c")),
                })),
                default: None,
            }],
            rest: Some(ident("d")),
        }));
        let mut names = Vec::new();
        pattern.bound_names(&mut names);
        let names: Vec<String> = names.iter().map(JsString::to_rust_string).collect();
        assert_eq!(names, vec!["b", "c", "d"]);
    }

    #[test]
    fn test_function_kind_flags() {
        assert_eq!(FunctionKind::from_flags(true, true), FunctionKind::AsyncGenerator);
        assert!(FunctionKind::Async.is_async());
        assert!(!FunctionKind::Async.is_generator());
        assert!(FunctionKind::Generator.is_generator());
    }
}
