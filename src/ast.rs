//! The node model: a closed set of Python statement and expression kinds.
//!
//! Nodes exclusively own their children. The only attributes that change after
//! construction are the bodies, handlers, cases and else-branches of block nodes,
//! and those are only touched by [`crate::builder::Builder`] while a tree is built.

use crate::error::BuildError;
use crate::utils::{is_dotted_name, is_identifier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Root of a generated source file.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Module {
    pub body: Vec<Node>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes the tree into pretty-printed JSON.
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Reads a tree back from the JSON produced by [`Module::to_json`].
    ///
    /// # Errors
    /// Returns a `serde_json::Error` if the input is not a valid tree.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One entity of the tree. Statement kinds come first, expression kinds after.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    // == Statements ==
    Import(Import),
    ImportFrom(ImportFrom),
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    If(If),
    Try(Try),
    Match(Match),
    For(For),
    While(While),
    With(With),
    Return(Return),
    Assign(Assign),
    AugAssign(AugAssign),
    AnnAssign(AnnAssign),
    Raise(Raise),
    Assert(Assert),
    Expr(Expr),
    Pass,
    Break,
    Continue,
    Delete(Delete),
    Global(Global),
    Nonlocal(Nonlocal),
    Comment(Comment),

    // == Expressions ==
    Constant(Constant),
    Name(Name),
    Call(Call),
    Attribute(Attribute),
    Subscript(Subscript),
    Slice(Slice),
    BinOp(BinOp),
    BoolOp(BoolOp),
    UnaryOp(UnaryOp),
    Compare(Compare),
    List(Elements),
    Tuple(Elements),
    Set(Elements),
    Dict(Dict),
    Lambda(Lambda),
    IfExp(IfExp),
    Starred(Starred),
    Await(Await),
    Yield(Yield),
    ListComp(Comp),
    SetComp(Comp),
    GeneratorExp(Comp),
    DictComp(DictComp),
}

/// The tag of a [`Node`], used in diagnostics and chain bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Import,
    ImportFrom,
    FunctionDef,
    AsyncFunctionDef,
    ClassDef,
    If,
    Try,
    Match,
    For,
    AsyncFor,
    While,
    With,
    AsyncWith,
    Return,
    Assign,
    AugAssign,
    AnnAssign,
    Raise,
    Assert,
    Expr,
    Pass,
    Break,
    Continue,
    Delete,
    Global,
    Nonlocal,
    Comment,
    Alias,
    Arg,
    Constant,
    Name,
    Call,
    Attribute,
    Subscript,
    Slice,
    BinOp,
    BoolOp,
    UnaryOp,
    Compare,
    List,
    Tuple,
    Set,
    Dict,
    Lambda,
    IfExp,
    Starred,
    Await,
    Yield,
    ListComp,
    SetComp,
    GeneratorExp,
    DictComp,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Import => "import",
            NodeKind::ImportFrom => "import-from",
            NodeKind::FunctionDef => "function-def",
            NodeKind::AsyncFunctionDef => "async-function-def",
            NodeKind::ClassDef => "class-def",
            NodeKind::If => "if",
            NodeKind::Try => "try",
            NodeKind::Match => "match",
            NodeKind::For => "for",
            NodeKind::AsyncFor => "async-for",
            NodeKind::While => "while",
            NodeKind::With => "with",
            NodeKind::AsyncWith => "async-with",
            NodeKind::Return => "return",
            NodeKind::Assign => "assign",
            NodeKind::AugAssign => "aug-assign",
            NodeKind::AnnAssign => "ann-assign",
            NodeKind::Raise => "raise",
            NodeKind::Assert => "assert",
            NodeKind::Expr => "expression-statement",
            NodeKind::Pass => "pass",
            NodeKind::Break => "break",
            NodeKind::Continue => "continue",
            NodeKind::Delete => "delete",
            NodeKind::Global => "global",
            NodeKind::Nonlocal => "nonlocal",
            NodeKind::Comment => "comment",
            NodeKind::Alias => "alias",
            NodeKind::Arg => "arg",
            NodeKind::Constant => "constant",
            NodeKind::Name => "name",
            NodeKind::Call => "call",
            NodeKind::Attribute => "attribute",
            NodeKind::Subscript => "subscript",
            NodeKind::Slice => "slice",
            NodeKind::BinOp => "binary-op",
            NodeKind::BoolOp => "bool-op",
            NodeKind::UnaryOp => "unary-op",
            NodeKind::Compare => "compare",
            NodeKind::List => "list",
            NodeKind::Tuple => "tuple",
            NodeKind::Set => "set",
            NodeKind::Dict => "dict",
            NodeKind::Lambda => "lambda",
            NodeKind::IfExp => "if-exp",
            NodeKind::Starred => "starred",
            NodeKind::Await => "await",
            NodeKind::Yield => "yield",
            NodeKind::ListComp => "list-comp",
            NodeKind::SetComp => "set-comp",
            NodeKind::GeneratorExp => "generator-exp",
            NodeKind::DictComp => "dict-comp",
        }
    }

    /// Kinds that a later `elif_`/`else_`/`except_`/`finally_`/`case_` may extend.
    pub fn is_chainable(self) -> bool {
        matches!(
            self,
            NodeKind::If
                | NodeKind::Try
                | NodeKind::Match
                | NodeKind::For
                | NodeKind::AsyncFor
                | NodeKind::While
        )
    }

    pub fn is_definition(self) -> bool {
        matches!(
            self,
            NodeKind::FunctionDef | NodeKind::AsyncFunctionDef | NodeKind::ClassDef
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Statement records ---

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asname: Option<String>,
}

impl Alias {
    /// An imported name, optionally dotted (`os.path`).
    pub fn new(name: impl Into<String>) -> Result<Self, BuildError> {
        let name = name.into();
        if !is_dotted_name(&name) && name != "*" {
            return Err(invalid(NodeKind::Alias, format!("`{name}` is not an importable name")));
        }
        Ok(Alias { name, asname: None })
    }

    pub fn with_asname(mut self, asname: impl Into<String>) -> Result<Self, BuildError> {
        let asname = asname.into();
        if !is_identifier(&asname) {
            return Err(invalid(NodeKind::Alias, format!("`{asname}` is not an identifier")));
        }
        self.asname = Some(asname);
        Ok(self)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Import {
    pub names: Vec<Alias>,
}

impl Import {
    pub fn new(names: Vec<Alias>) -> Result<Self, BuildError> {
        if names.is_empty() {
            return Err(invalid(NodeKind::Import, "at least one name is required"));
        }
        Ok(Import { names })
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ImportFrom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub names: Vec<Alias>,
    /// Number of leading dots of a relative import.
    #[serde(default)]
    pub level: u32,
}

impl ImportFrom {
    pub fn new(module: Option<String>, names: Vec<Alias>, level: u32) -> Result<Self, BuildError> {
        let module = module.filter(|m| !m.is_empty());
        if names.is_empty() {
            return Err(invalid(NodeKind::ImportFrom, "at least one name is required"));
        }
        match &module {
            None if level == 0 => {
                return Err(invalid(
                    NodeKind::ImportFrom,
                    "an absolute import needs a module name",
                ))
            }
            Some(m) if !is_dotted_name(m) => {
                return Err(invalid(NodeKind::ImportFrom, format!("`{m}` is not a module name")))
            }
            _ => {}
        }
        Ok(ImportFrom {
            module,
            names,
            level,
        })
    }
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Arg {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Box<Node>>,
}

impl Arg {
    pub fn new(name: impl Into<String>) -> Result<Self, BuildError> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(invalid(NodeKind::Arg, format!("`{name}` is not an identifier")));
        }
        Ok(Arg {
            name,
            annotation: None,
            default: None,
        })
    }

    pub fn annotated(mut self, annotation: Node) -> Self {
        self.annotation = Some(Box::new(annotation));
        self
    }

    pub fn with_default(mut self, default: Node) -> Self {
        self.default = Some(Box::new(default));
        self
    }
}

/// Parameter list: `posonly, /, args, *vararg, kwonly, **kwarg`.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Arguments {
    pub posonlyargs: Vec<Arg>,
    pub args: Vec<Arg>,
    pub vararg: Option<Arg>,
    pub kwonlyargs: Vec<Arg>,
    pub kwarg: Option<Arg>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plain positional parameters without annotations or defaults.
    pub fn positional<I, S>(names: I) -> Result<Self, BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args = names
            .into_iter()
            .map(Arg::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Arguments {
            args,
            ..Self::default()
        })
    }

    pub fn is_empty(&self) -> bool {
        self.posonlyargs.is_empty()
            && self.args.is_empty()
            && self.vararg.is_none()
            && self.kwonlyargs.is_empty()
            && self.kwarg.is_none()
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound: Option<Box<Node>>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub args: Arguments,
    #[serde(default)]
    pub body: Vec<Node>,
    #[serde(default)]
    pub decorators: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<Box<Node>>,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
    #[serde(default)]
    pub is_async: bool,
}

impl FunctionDef {
    pub fn new(name: impl Into<String>, args: Arguments) -> Result<Self, BuildError> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(invalid(
                NodeKind::FunctionDef,
                format!("`{name}` is not an identifier"),
            ));
        }
        Ok(FunctionDef {
            name,
            args,
            body: Vec::new(),
            decorators: Vec::new(),
            returns: None,
            type_params: Vec::new(),
            is_async: false,
        })
    }

    pub fn asynchronous(mut self) -> Self {
        self.is_async = true;
        self
    }

    pub fn decorated(mut self, decorator: Node) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn returns(mut self, annotation: Node) -> Self {
        self.returns = Some(Box::new(annotation));
        self
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    #[serde(default)]
    pub bases: Vec<Node>,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
    #[serde(default)]
    pub body: Vec<Node>,
    #[serde(default)]
    pub decorators: Vec<Node>,
    #[serde(default)]
    pub type_params: Vec<TypeParam>,
}

impl ClassDef {
    pub fn new(name: impl Into<String>, bases: Vec<Node>) -> Result<Self, BuildError> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(invalid(
                NodeKind::ClassDef,
                format!("`{name}` is not an identifier"),
            ));
        }
        Ok(ClassDef {
            name,
            bases,
            keywords: Vec::new(),
            body: Vec::new(),
            decorators: Vec::new(),
            type_params: Vec::new(),
        })
    }

    pub fn decorated(mut self, decorator: Node) -> Self {
        self.decorators.push(decorator);
        self
    }

    pub fn keyword(mut self, keyword: Keyword) -> Self {
        self.keywords.push(keyword);
        self
    }
}

/// `elif` is modelled as an `else` branch holding exactly one nested `If`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct If {
    pub test: Box<Node>,
    #[serde(default)]
    pub body: Vec<Node>,
    #[serde(default)]
    pub orelse: Vec<Node>,
}

impl If {
    pub fn new(test: Node) -> Self {
        If {
            test: Box::new(test),
            body: Vec::new(),
            orelse: Vec::new(),
        }
    }

    /// The nested `If` when this node's else-branch is an `elif`.
    pub fn elif(&self) -> Option<&If> {
        match self.orelse.as_slice() {
            [Node::If(nested)] => Some(nested),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ExceptHandler {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Vec<Node>,
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Try {
    pub body: Vec<Node>,
    pub handlers: Vec<ExceptHandler>,
    pub orelse: Vec<Node>,
    pub finalbody: Vec<Node>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MatchCase {
    pub pattern: Box<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<Box<Node>>,
    #[serde(default)]
    pub body: Vec<Node>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Match {
    pub subject: Box<Node>,
    #[serde(default)]
    pub cases: Vec<MatchCase>,
}

impl Match {
    pub fn new(subject: Node) -> Self {
        Match {
            subject: Box::new(subject),
            cases: Vec::new(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct For {
    pub target: Box<Node>,
    pub iter: Box<Node>,
    #[serde(default)]
    pub body: Vec<Node>,
    #[serde(default)]
    pub orelse: Vec<Node>,
    #[serde(default)]
    pub is_async: bool,
}

impl For {
    pub fn new(target: Node, iter: Node) -> Self {
        For {
            target: Box::new(target),
            iter: Box::new(iter),
            body: Vec::new(),
            orelse: Vec::new(),
            is_async: false,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct While {
    pub test: Box<Node>,
    #[serde(default)]
    pub body: Vec<Node>,
    #[serde(default)]
    pub orelse: Vec<Node>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WithItem {
    pub context_expr: Box<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_vars: Option<Box<Node>>,
}

impl WithItem {
    pub fn new(context_expr: Node, optional_vars: Option<Node>) -> Self {
        WithItem {
            context_expr: Box::new(context_expr),
            optional_vars: optional_vars.map(Box::new),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct With {
    pub items: Vec<WithItem>,
    #[serde(default)]
    pub body: Vec<Node>,
    #[serde(default)]
    pub is_async: bool,
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Return {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Box<Node>>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Assign {
    pub targets: Vec<Node>,
    pub value: Box<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Assign {
    pub fn new(targets: Vec<Node>, value: Node) -> Result<Self, BuildError> {
        if targets.is_empty() {
            return Err(invalid(NodeKind::Assign, "at least one target is required"));
        }
        Ok(Assign {
            targets,
            value: Box::new(value),
            comment: None,
        })
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AugAssign {
    pub target: Box<Node>,
    pub op: BinOperator,
    pub value: Box<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AnnAssign {
    pub target: Box<Node>,
    pub annotation: Box<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Raise {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exc: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<Node>>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Assert {
    pub test: Box<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<Box<Node>>,
}

/// An expression evaluated for its side effects.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub value: Box<Node>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Delete {
    pub targets: Vec<Node>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Global {
    pub names: Vec<String>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Nonlocal {
    pub names: Vec<String>,
}

/// Comment text without the leading `#`. Multi-line text becomes several comment lines.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}

// --- Expression records ---

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum ConstantValue {
    None,
    Bool(bool),
    Int(i64),
    Float(#[serde(with = "float_repr")] f64),
    Str(String),
    Ellipsis,
}

/// JSON has no NaN or infinity, so those floats travel as the strings `"nan"`, `"inf"` and `"-inf"`.
mod float_repr {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_str("nan")
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "inf" } else { "-inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "nan" => Ok(f64::NAN),
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("`{other}` is not a float"))),
            },
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Constant {
    pub value: ConstantValue,
    /// String prefix such as `b`, `r` or `f`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Name {
    pub id: String,
}

/// `name=value`, or `**value` when `arg` is `None`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Keyword {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<String>,
    pub value: Box<Node>,
}

impl Keyword {
    pub fn new(arg: impl Into<String>, value: Node) -> Self {
        Keyword {
            arg: Some(arg.into()),
            value: Box::new(value),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Call {
    pub func: Box<Node>,
    #[serde(default)]
    pub args: Vec<Node>,
    #[serde(default)]
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub value: Box<Node>,
    pub attr: String,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Subscript {
    pub value: Box<Node>,
    pub slice: Box<Node>,
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Slice {
    pub lower: Option<Box<Node>>,
    pub upper: Option<Box<Node>>,
    pub step: Option<Box<Node>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinOperator {
    Add,
    Sub,
    Mult,
    MatMult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitOr,
    BitXor,
    BitAnd,
}

impl BinOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOperator::Add => "+",
            BinOperator::Sub => "-",
            BinOperator::Mult => "*",
            BinOperator::MatMult => "@",
            BinOperator::Div => "/",
            BinOperator::FloorDiv => "//",
            BinOperator::Mod => "%",
            BinOperator::Pow => "**",
            BinOperator::LShift => "<<",
            BinOperator::RShift => ">>",
            BinOperator::BitOr => "|",
            BinOperator::BitXor => "^",
            BinOperator::BitAnd => "&",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoolOperator {
    And,
    Or,
}

impl BoolOperator {
    pub fn keyword(self) -> &'static str {
        match self {
            BoolOperator::And => "and",
            BoolOperator::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    Not,
    Invert,
    UAdd,
    USub,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Not => "not ",
            UnaryOperator::Invert => "~",
            UnaryOperator::UAdd => "+",
            UnaryOperator::USub => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CmpOperator {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CmpOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            CmpOperator::Eq => "==",
            CmpOperator::NotEq => "!=",
            CmpOperator::Lt => "<",
            CmpOperator::LtE => "<=",
            CmpOperator::Gt => ">",
            CmpOperator::GtE => ">=",
            CmpOperator::Is => "is",
            CmpOperator::IsNot => "is not",
            CmpOperator::In => "in",
            CmpOperator::NotIn => "not in",
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BinOp {
    pub left: Box<Node>,
    pub op: BinOperator,
    pub right: Box<Node>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BoolOp {
    pub op: BoolOperator,
    pub values: Vec<Node>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnaryOp {
    pub op: UnaryOperator,
    pub operand: Box<Node>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Compare {
    pub left: Box<Node>,
    pub ops: Vec<CmpOperator>,
    pub comparators: Vec<Node>,
}

impl Compare {
    /// A comparison chain such as `a < b <= c`.
    pub fn chain(left: Node, rest: Vec<(CmpOperator, Node)>) -> Result<Self, BuildError> {
        if rest.is_empty() {
            return Err(invalid(NodeKind::Compare, "at least one comparator is required"));
        }
        let (ops, comparators) = rest.into_iter().unzip();
        Ok(Compare {
            left: Box::new(left),
            ops,
            comparators,
        })
    }
}

/// Elements of a list, tuple or set display.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Elements {
    #[serde(default)]
    pub elts: Vec<Node>,
}

/// One `key: value` entry, or `**value` when `key` is `None`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DictItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Box<Node>>,
    pub value: Box<Node>,
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Dict {
    #[serde(default)]
    pub items: Vec<DictItem>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Lambda {
    #[serde(default)]
    pub args: Arguments,
    pub body: Box<Node>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct IfExp {
    pub test: Box<Node>,
    pub body: Box<Node>,
    pub orelse: Box<Node>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Starred {
    pub value: Box<Node>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Await {
    pub value: Box<Node>,
}

#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Yield {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Box<Node>>,
}

/// A `for target in iter if cond` clause of a comprehension.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Comprehension {
    pub target: Box<Node>,
    pub iter: Box<Node>,
    #[serde(default)]
    pub ifs: Vec<Node>,
    #[serde(default)]
    pub is_async: bool,
}

impl Comprehension {
    pub fn new(target: Node, iter: Node) -> Self {
        Comprehension {
            target: Box::new(target),
            iter: Box::new(iter),
            ifs: Vec::new(),
            is_async: false,
        }
    }

    pub fn filtered(mut self, condition: Node) -> Self {
        self.ifs.push(condition);
        self
    }
}

/// Element expression plus clauses, shared by list/set comprehensions and generator expressions.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Comp {
    pub elt: Box<Node>,
    pub generators: Vec<Comprehension>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DictComp {
    pub key: Box<Node>,
    pub value: Box<Node>,
    pub generators: Vec<Comprehension>,
}

fn invalid(kind: NodeKind, reason: impl Into<String>) -> BuildError {
    BuildError::InvalidNode {
        kind,
        reason: reason.into(),
    }
}

// --- Node accessors and shorthand constructors ---

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Import(_) => NodeKind::Import,
            Node::ImportFrom(_) => NodeKind::ImportFrom,
            Node::FunctionDef(f) if f.is_async => NodeKind::AsyncFunctionDef,
            Node::FunctionDef(_) => NodeKind::FunctionDef,
            Node::ClassDef(_) => NodeKind::ClassDef,
            Node::If(_) => NodeKind::If,
            Node::Try(_) => NodeKind::Try,
            Node::Match(_) => NodeKind::Match,
            Node::For(f) if f.is_async => NodeKind::AsyncFor,
            Node::For(_) => NodeKind::For,
            Node::While(_) => NodeKind::While,
            Node::With(w) if w.is_async => NodeKind::AsyncWith,
            Node::With(_) => NodeKind::With,
            Node::Return(_) => NodeKind::Return,
            Node::Assign(_) => NodeKind::Assign,
            Node::AugAssign(_) => NodeKind::AugAssign,
            Node::AnnAssign(_) => NodeKind::AnnAssign,
            Node::Raise(_) => NodeKind::Raise,
            Node::Assert(_) => NodeKind::Assert,
            Node::Expr(_) => NodeKind::Expr,
            Node::Pass => NodeKind::Pass,
            Node::Break => NodeKind::Break,
            Node::Continue => NodeKind::Continue,
            Node::Delete(_) => NodeKind::Delete,
            Node::Global(_) => NodeKind::Global,
            Node::Nonlocal(_) => NodeKind::Nonlocal,
            Node::Comment(_) => NodeKind::Comment,
            Node::Constant(_) => NodeKind::Constant,
            Node::Name(_) => NodeKind::Name,
            Node::Call(_) => NodeKind::Call,
            Node::Attribute(_) => NodeKind::Attribute,
            Node::Subscript(_) => NodeKind::Subscript,
            Node::Slice(_) => NodeKind::Slice,
            Node::BinOp(_) => NodeKind::BinOp,
            Node::BoolOp(_) => NodeKind::BoolOp,
            Node::UnaryOp(_) => NodeKind::UnaryOp,
            Node::Compare(_) => NodeKind::Compare,
            Node::List(_) => NodeKind::List,
            Node::Tuple(_) => NodeKind::Tuple,
            Node::Set(_) => NodeKind::Set,
            Node::Dict(_) => NodeKind::Dict,
            Node::Lambda(_) => NodeKind::Lambda,
            Node::IfExp(_) => NodeKind::IfExp,
            Node::Starred(_) => NodeKind::Starred,
            Node::Await(_) => NodeKind::Await,
            Node::Yield(_) => NodeKind::Yield,
            Node::ListComp(_) => NodeKind::ListComp,
            Node::SetComp(_) => NodeKind::SetComp,
            Node::GeneratorExp(_) => NodeKind::GeneratorExp,
            Node::DictComp(_) => NodeKind::DictComp,
        }
    }

    /// The statement body a builder scope fills, for block nodes.
    pub fn body_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::FunctionDef(f) => Some(&mut f.body),
            Node::ClassDef(c) => Some(&mut c.body),
            Node::If(i) => Some(&mut i.body),
            Node::Try(t) => Some(&mut t.body),
            Node::For(f) => Some(&mut f.body),
            Node::While(w) => Some(&mut w.body),
            Node::With(w) => Some(&mut w.body),
            _ => None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(
            self,
            Node::FunctionDef(_)
                | Node::ClassDef(_)
                | Node::If(_)
                | Node::Try(_)
                | Node::For(_)
                | Node::While(_)
                | Node::With(_)
        )
    }

    pub fn name(id: impl Into<String>) -> Node {
        Node::Name(Name { id: id.into() })
    }

    pub fn none() -> Node {
        Node::constant(ConstantValue::None)
    }

    pub fn bool(value: bool) -> Node {
        Node::constant(ConstantValue::Bool(value))
    }

    pub fn int(value: i64) -> Node {
        Node::constant(ConstantValue::Int(value))
    }

    pub fn float(value: f64) -> Node {
        Node::constant(ConstantValue::Float(value))
    }

    pub fn str(value: impl Into<String>) -> Node {
        Node::constant(ConstantValue::Str(value.into()))
    }

    pub fn ellipsis() -> Node {
        Node::constant(ConstantValue::Ellipsis)
    }

    fn constant(value: ConstantValue) -> Node {
        Node::Constant(Constant {
            value,
            prefix: None,
        })
    }

    /// `value.attr`; the dotted path `a.b.c` can be built as `attribute(attribute(name("a"), "b"), "c")`.
    pub fn attribute(value: Node, attr: impl Into<String>) -> Node {
        Node::Attribute(Attribute {
            value: Box::new(value),
            attr: attr.into(),
        })
    }

    pub fn call(func: Node, args: Vec<Node>) -> Node {
        Node::call_with(func, args, Vec::new())
    }

    pub fn call_with(func: Node, args: Vec<Node>, keywords: Vec<Keyword>) -> Node {
        Node::Call(Call {
            func: Box::new(func),
            args,
            keywords,
        })
    }

    pub fn subscript(value: Node, slice: Node) -> Node {
        Node::Subscript(Subscript {
            value: Box::new(value),
            slice: Box::new(slice),
        })
    }

    pub fn binop(left: Node, op: BinOperator, right: Node) -> Node {
        Node::BinOp(BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    pub fn boolop(op: BoolOperator, values: Vec<Node>) -> Node {
        Node::BoolOp(BoolOp { op, values })
    }

    pub fn unary(op: UnaryOperator, operand: Node) -> Node {
        Node::UnaryOp(UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    pub fn compare(left: Node, op: CmpOperator, right: Node) -> Node {
        Node::Compare(Compare {
            left: Box::new(left),
            ops: vec![op],
            comparators: vec![right],
        })
    }

    pub fn list(elts: Vec<Node>) -> Node {
        Node::List(Elements { elts })
    }

    pub fn tuple(elts: Vec<Node>) -> Node {
        Node::Tuple(Elements { elts })
    }

    pub fn set(elts: Vec<Node>) -> Node {
        Node::Set(Elements { elts })
    }

    pub fn dict(entries: Vec<(Node, Node)>) -> Node {
        Node::Dict(Dict {
            items: entries
                .into_iter()
                .map(|(key, value)| DictItem {
                    key: Some(Box::new(key)),
                    value: Box::new(value),
                })
                .collect(),
        })
    }

    pub fn starred(value: Node) -> Node {
        Node::Starred(Starred {
            value: Box::new(value),
        })
    }

    pub fn await_(value: Node) -> Node {
        Node::Await(Await {
            value: Box::new(value),
        })
    }

    // == Statements ==

    pub fn expr(value: Node) -> Node {
        Node::Expr(Expr {
            value: Box::new(value),
        })
    }

    pub fn return_(value: Option<Node>) -> Node {
        Node::Return(Return {
            value: value.map(Box::new),
        })
    }

    /// `target = value` with a single target.
    pub fn assign(target: Node, value: Node) -> Node {
        Node::Assign(Assign {
            targets: vec![target],
            value: Box::new(value),
            comment: None,
        })
    }

    pub fn aug_assign(target: Node, op: BinOperator, value: Node) -> Node {
        Node::AugAssign(AugAssign {
            target: Box::new(target),
            op,
            value: Box::new(value),
            comment: None,
        })
    }

    pub fn ann_assign(target: Node, annotation: Node, value: Option<Node>) -> Node {
        Node::AnnAssign(AnnAssign {
            target: Box::new(target),
            annotation: Box::new(annotation),
            value: value.map(Box::new),
            comment: None,
        })
    }

    pub fn raise(exc: Option<Node>, cause: Option<Node>) -> Node {
        Node::Raise(Raise {
            exc: exc.map(Box::new),
            cause: cause.map(Box::new),
        })
    }

    pub fn assert(test: Node, msg: Option<Node>) -> Node {
        Node::Assert(Assert {
            test: Box::new(test),
            msg: msg.map(Box::new),
        })
    }

    pub fn comment(text: impl Into<String>) -> Node {
        Node::Comment(Comment { text: text.into() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_requires_a_name() {
        assert!(Alias::new("os.path").is_ok());
        assert!(matches!(
            Alias::new(""),
            Err(BuildError::InvalidNode {
                kind: NodeKind::Alias,
                ..
            })
        ));
        assert!(Alias::new("os").unwrap().with_asname("not valid").is_err());
    }

    #[test]
    fn test_import_from_shape() {
        let names = vec![Alias::new("x").unwrap()];
        assert!(ImportFrom::new(None, names.clone(), 1).is_ok());
        assert!(ImportFrom::new(None, names.clone(), 0).is_err());
        assert!(ImportFrom::new(Some("pkg".into()), Vec::new(), 0).is_err());
    }

    #[test]
    fn test_kind_reflects_async_flag() {
        let def = FunctionDef::new("run", Arguments::new()).unwrap();
        assert_eq!(Node::FunctionDef(def.clone()).kind(), NodeKind::FunctionDef);
        assert_eq!(
            Node::FunctionDef(def.asynchronous()).kind(),
            NodeKind::AsyncFunctionDef
        );
        assert_eq!(NodeKind::AsyncFunctionDef.to_string(), "async-function-def");
    }

    #[test]
    fn test_block_nodes_expose_body() {
        let mut node = Node::If(If::new(Node::name("x")));
        assert!(node.is_block());
        node.body_mut().unwrap().push(Node::Pass);
        assert_eq!(node.body_mut().unwrap().len(), 1);

        let mut expr = Node::name("x");
        assert!(expr.body_mut().is_none());
        assert!(!Node::Match(Match::new(Node::name("x"))).is_block());
    }

    #[test]
    fn test_compare_chain_needs_comparator() {
        assert!(Compare::chain(Node::name("a"), Vec::new()).is_err());
        let chain = Compare::chain(
            Node::name("a"),
            vec![(CmpOperator::Lt, Node::name("b")), (CmpOperator::LtE, Node::name("c"))],
        )
        .unwrap();
        assert_eq!(chain.ops, vec![CmpOperator::Lt, CmpOperator::LtE]);
    }

    #[test]
    fn test_non_finite_floats_survive_json() {
        let module = Module {
            body: vec![
                Node::expr(Node::float(f64::NAN)),
                Node::expr(Node::float(f64::INFINITY)),
                Node::expr(Node::float(f64::NEG_INFINITY)),
                Node::expr(Node::float(2.5)),
            ],
        };
        let json = module.to_json().unwrap();
        assert!(!json.contains("null"));
        let restored = Module::from_json(&json).unwrap();
        let floats: Vec<f64> = restored
            .body
            .iter()
            .map(|node| match node {
                Node::Expr(e) => match e.value.as_ref() {
                    Node::Constant(Constant {
                        value: ConstantValue::Float(f),
                        ..
                    }) => *f,
                    other => panic!("unexpected {other:?}"),
                },
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert!(floats[0].is_nan());
        assert_eq!(floats[1..], [f64::INFINITY, f64::NEG_INFINITY, 2.5]);
        assert!(Module::from_json(&json.replace("\"inf\"", "\"huge\"")).is_err());
    }

    #[test]
    fn test_json_tags_by_kind() {
        let module = Module {
            body: vec![Node::Pass, Node::expr(Node::name("x"))],
        };
        let json = module.to_json().unwrap();
        assert!(json.contains("\"kind\": \"pass\""));
        assert!(json.contains("\"kind\": \"expr\""));
        assert_eq!(Module::from_json(&json).unwrap(), module);
    }
}
