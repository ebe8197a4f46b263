//! The unparser: renders a finished tree into indented Python source.
//!
//! Statements are written line by line into a [`Sink`]; expressions are
//! rendered to strings with parentheses inserted only where a child binds
//! more loosely than its position requires.

use crate::ast::{
    Arg, Arguments, BinOperator, BoolOperator, Comprehension, ConstantValue, Node, NodeKind,
    TypeParam, UnaryOperator,
};
use crate::builder::Builder;
use crate::config::{GeneratorConfig, OutputMode};
use crate::error::{BuildError, ConfigError, GenerateError};
use crate::utils::{format_float, quote_bytes, quote_raw, quote_str};
use log::debug;
use std::fmt;
use std::io;

/// Where in the tree the generator expected a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Statement,
    Expression,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Position::Statement => "statement",
            Position::Expression => "expression",
        })
    }
}

/// Destination of generated text.
pub trait Sink {
    fn write_str(&mut self, text: &str) -> Result<(), GenerateError>;
}

impl Sink for String {
    fn write_str(&mut self, text: &str) -> Result<(), GenerateError> {
        self.push_str(text);
        Ok(())
    }
}

/// Adapts any `io::Write`; write failures surface as `GenerateError::SinkWrite`.
pub struct IoSink<W: io::Write>(pub W);

impl<W: io::Write> Sink for IoSink<W> {
    fn write_str(&mut self, text: &str) -> Result<(), GenerateError> {
        self.0.write_all(text.as_bytes())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Generator { config })
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Renders a finished builder into a string.
    ///
    /// # Errors
    /// `Build` if the builder still has open scopes or recorded a scope failure,
    /// `UnsupportedNode` if a node appears where it has no rendering rule.
    pub fn generate(&self, builder: &Builder) -> Result<String, GenerateError> {
        self.render(builder.tree()?)
    }

    /// Streams a finished builder into `sink` in one sequential pass.
    ///
    /// A failed pass leaves `sink` partially written.
    pub fn generate_to<W: io::Write>(&self, builder: &Builder, sink: W) -> Result<(), GenerateError> {
        self.render_to(builder.tree()?, sink)
    }

    /// Follows the configured [`OutputMode`]: returns the text, or writes it to `sink` and returns `None`.
    pub fn emit<W: io::Write>(
        &self,
        builder: &Builder,
        sink: W,
    ) -> Result<Option<String>, GenerateError> {
        match self.config.output_mode {
            OutputMode::ReturnValue => self.generate(builder).map(Some),
            OutputMode::WriteToSink => self.generate_to(builder, sink).map(|()| None),
        }
    }

    /// Renders a module body that was built or deserialized without a builder.
    pub fn render(&self, body: &[Node]) -> Result<String, GenerateError> {
        let mut out = String::new();
        self.write_module(&mut out, body)?;
        Ok(out)
    }

    pub fn render_to<W: io::Write>(&self, body: &[Node], sink: W) -> Result<(), GenerateError> {
        let mut sink = IoSink(sink);
        self.write_module(&mut sink, body)?;
        sink.0.flush()?;
        Ok(())
    }

    fn write_module(&self, sink: &mut dyn Sink, body: &[Node]) -> Result<(), GenerateError> {
        debug!("generating {} top-level statements", body.len());
        let mut emitter = Emitter {
            indent: &self.config.indent,
            sink,
            written: 0,
        };
        emitter.body(body, 0, BodyContext::Module)?;
        debug!("generated {} bytes", emitter.written);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyContext {
    Module,
    Class,
    Block,
}

/// Blank lines before `nodes[index]`. Comments stay attached to the statement they precede.
fn blank_lines_before(nodes: &[Node], index: usize, context: BodyContext) -> usize {
    if context == BodyContext::Block || matches!(nodes[index - 1], Node::Comment(_)) {
        return 0;
    }
    let prev_def = nodes[index - 1].kind().is_definition();
    let next_def = nodes[index..]
        .iter()
        .find(|n| !matches!(n, Node::Comment(_)))
        .is_some_and(|n| n.kind().is_definition());
    match (context, prev_def, next_def) {
        (_, false, false) => 0,
        (BodyContext::Module, true, true) => 2,
        _ => 1,
    }
}

struct Emitter<'a> {
    indent: &'a str,
    sink: &'a mut dyn Sink,
    written: usize,
}

impl Emitter<'_> {
    fn write(&mut self, text: &str) -> Result<(), GenerateError> {
        self.written += text.len();
        self.sink.write_str(text)
    }

    fn line(&mut self, level: usize, text: &str) -> Result<(), GenerateError> {
        for _ in 0..level {
            let indent = self.indent;
            self.write(indent)?;
        }
        self.write(text)?;
        self.write("\n")
    }

    fn body(&mut self, nodes: &[Node], level: usize, context: BodyContext) -> Result<(), GenerateError> {
        if nodes.is_empty() && context != BodyContext::Module {
            return self.line(level, "pass");
        }
        for (index, node) in nodes.iter().enumerate() {
            if index > 0 {
                for _ in 0..blank_lines_before(nodes, index, context) {
                    self.write("\n")?;
                }
            }
            self.stmt(node, level)?;
        }
        Ok(())
    }

    fn clause(&mut self, header: &str, body: &[Node], level: usize) -> Result<(), GenerateError> {
        self.line(level, header)?;
        self.body(body, level + 1, BodyContext::Block)
    }

    fn decorators(&mut self, decorators: &[Node], level: usize) -> Result<(), GenerateError> {
        for decorator in decorators {
            self.line(level, &format!("@{}", expr(decorator, prec::NAMED)?))?;
        }
        Ok(())
    }

    fn stmt(&mut self, node: &Node, level: usize) -> Result<(), GenerateError> {
        match node {
            Node::Import(i) => {
                let names: Vec<String> = i.names.iter().map(alias).collect();
                self.line(level, &format!("import {}", names.join(", ")))
            }
            Node::ImportFrom(i) => {
                let names: Vec<String> = i.names.iter().map(alias).collect();
                let dots = ".".repeat(i.level as usize);
                let module = i.module.as_deref().unwrap_or("");
                self.line(
                    level,
                    &format!("from {dots}{module} import {}", names.join(", ")),
                )
            }
            Node::FunctionDef(f) => {
                self.decorators(&f.decorators, level)?;
                let prefix = if f.is_async { "async def" } else { "def" };
                let mut header = format!(
                    "{prefix} {}{}({})",
                    f.name,
                    type_params(&f.type_params)?,
                    arguments(&f.args)?
                );
                if let Some(returns) = &f.returns {
                    header.push_str(" -> ");
                    header.push_str(&expr(returns, prec::TEST)?);
                }
                header.push(':');
                self.clause(&header, &f.body, level)
            }
            Node::ClassDef(c) => {
                self.decorators(&c.decorators, level)?;
                let mut parts = c
                    .bases
                    .iter()
                    .map(|base| expr(base, prec::TEST))
                    .collect::<Result<Vec<_>, _>>()?;
                for keyword in &c.keywords {
                    parts.push(keyword_arg(keyword.arg.as_deref(), &keyword.value)?);
                }
                let bases = if parts.is_empty() {
                    String::new()
                } else {
                    format!("({})", parts.join(", "))
                };
                let header = format!("class {}{}{bases}:", c.name, type_params(&c.type_params)?);
                self.line(level, &header)?;
                self.body(&c.body, level + 1, BodyContext::Class)
            }
            Node::If(i) => {
                self.clause(&format!("if {}:", expr(&i.test, prec::NAMED)?), &i.body, level)?;
                let mut current = i;
                loop {
                    if let Some(nested) = current.elif() {
                        let header = format!("elif {}:", expr(&nested.test, prec::NAMED)?);
                        self.clause(&header, &nested.body, level)?;
                        current = nested;
                    } else {
                        if !current.orelse.is_empty() {
                            self.clause("else:", &current.orelse, level)?;
                        }
                        return Ok(());
                    }
                }
            }
            Node::Try(t) => {
                self.clause("try:", &t.body, level)?;
                for handler in &t.handlers {
                    let header = match (&handler.type_, &handler.name) {
                        (Some(type_), Some(name)) => {
                            format!("except {} as {name}:", expr(type_, prec::TEST)?)
                        }
                        (Some(type_), None) => format!("except {}:", expr(type_, prec::TEST)?),
                        // A name without a type is not valid Python; catch everything under that name.
                        (None, Some(name)) => format!("except BaseException as {name}:"),
                        (None, None) => "except:".to_string(),
                    };
                    self.clause(&header, &handler.body, level)?;
                }
                if !t.orelse.is_empty() {
                    self.clause("else:", &t.orelse, level)?;
                }
                if !t.finalbody.is_empty() {
                    self.clause("finally:", &t.finalbody, level)?;
                }
                Ok(())
            }
            Node::Match(m) => {
                if m.cases.is_empty() {
                    return Err(GenerateError::Build(BuildError::InvalidNode {
                        kind: NodeKind::Match,
                        reason: "a match needs at least one case".to_string(),
                    }));
                }
                self.line(level, &format!("match {}:", bare(&m.subject, prec::NAMED)?))?;
                for case in &m.cases {
                    let mut header = format!("case {}", bare(&case.pattern, prec::TEST)?);
                    if let Some(guard) = &case.guard {
                        header.push_str(" if ");
                        header.push_str(&expr(guard, prec::NAMED)?);
                    }
                    header.push(':');
                    self.clause(&header, &case.body, level + 1)?;
                }
                Ok(())
            }
            Node::For(f) => {
                let prefix = if f.is_async { "async for" } else { "for" };
                let header = format!(
                    "{prefix} {} in {}:",
                    bare(&f.target, prec::BOR)?,
                    bare(&f.iter, prec::TEST)?
                );
                self.clause(&header, &f.body, level)?;
                if !f.orelse.is_empty() {
                    self.clause("else:", &f.orelse, level)?;
                }
                Ok(())
            }
            Node::While(w) => {
                self.clause(&format!("while {}:", expr(&w.test, prec::NAMED)?), &w.body, level)?;
                if !w.orelse.is_empty() {
                    self.clause("else:", &w.orelse, level)?;
                }
                Ok(())
            }
            Node::With(w) => {
                let items = w
                    .items
                    .iter()
                    .map(|item| -> Result<String, GenerateError> {
                        let context = expr(&item.context_expr, prec::TEST)?;
                        Ok(match &item.optional_vars {
                            Some(vars) => format!("{context} as {}", expr(vars, prec::BOR)?),
                            None => context,
                        })
                    })
                    .collect::<Result<Vec<_>, GenerateError>>()?;
                let prefix = if w.is_async { "async with" } else { "with" };
                self.clause(&format!("{prefix} {}:", items.join(", ")), &w.body, level)
            }
            Node::Return(r) => match &r.value {
                Some(value) => self.line(level, &format!("return {}", bare(value, prec::TEST)?)),
                None => self.line(level, "return"),
            },
            Node::Assign(a) => {
                let mut text = String::new();
                for target in &a.targets {
                    text.push_str(&bare(target, prec::BOR)?);
                    text.push_str(" = ");
                }
                text.push_str(&bare(&a.value, prec::YIELD)?);
                self.line(level, &with_comment(text, a.comment.as_deref()))
            }
            Node::AugAssign(a) => {
                let text = format!(
                    "{} {}= {}",
                    expr(&a.target, prec::BOR)?,
                    a.op.symbol(),
                    bare(&a.value, prec::YIELD)?
                );
                self.line(level, &with_comment(text, a.comment.as_deref()))
            }
            Node::AnnAssign(a) => {
                let mut text = format!(
                    "{}: {}",
                    expr(&a.target, prec::BOR)?,
                    expr(&a.annotation, prec::TEST)?
                );
                if let Some(value) = &a.value {
                    text.push_str(" = ");
                    text.push_str(&bare(value, prec::YIELD)?);
                }
                self.line(level, &with_comment(text, a.comment.as_deref()))
            }
            Node::Raise(r) => {
                let text = match (&r.exc, &r.cause) {
                    (Some(exc), Some(cause)) => format!(
                        "raise {} from {}",
                        expr(exc, prec::TEST)?,
                        expr(cause, prec::TEST)?
                    ),
                    (Some(exc), None) => format!("raise {}", expr(exc, prec::TEST)?),
                    (None, _) => "raise".to_string(),
                };
                self.line(level, &text)
            }
            Node::Assert(a) => {
                let mut text = format!("assert {}", expr(&a.test, prec::TEST)?);
                if let Some(msg) = &a.msg {
                    text.push_str(", ");
                    text.push_str(&expr(msg, prec::TEST)?);
                }
                self.line(level, &text)
            }
            Node::Expr(e) => self.line(level, &bare(&e.value, prec::YIELD)?),
            Node::Pass => self.line(level, "pass"),
            Node::Break => self.line(level, "break"),
            Node::Continue => self.line(level, "continue"),
            Node::Delete(d) => {
                let targets = d
                    .targets
                    .iter()
                    .map(|t| expr(t, prec::BOR))
                    .collect::<Result<Vec<_>, _>>()?;
                self.line(level, &format!("del {}", targets.join(", ")))
            }
            Node::Global(g) => self.line(level, &format!("global {}", g.names.join(", "))),
            Node::Nonlocal(n) => self.line(level, &format!("nonlocal {}", n.names.join(", "))),
            Node::Comment(c) => {
                for text in c.text.lines() {
                    if text.is_empty() {
                        self.line(level, "#")?;
                    } else {
                        self.line(level, &format!("# {text}"))?;
                    }
                }
                if c.text.is_empty() {
                    self.line(level, "#")?;
                }
                Ok(())
            }
            Node::Constant(_)
            | Node::Name(_)
            | Node::Call(_)
            | Node::Attribute(_)
            | Node::Subscript(_)
            | Node::Slice(_)
            | Node::BinOp(_)
            | Node::BoolOp(_)
            | Node::UnaryOp(_)
            | Node::Compare(_)
            | Node::List(_)
            | Node::Tuple(_)
            | Node::Set(_)
            | Node::Dict(_)
            | Node::Lambda(_)
            | Node::IfExp(_)
            | Node::Starred(_)
            | Node::Await(_)
            | Node::Yield(_)
            | Node::ListComp(_)
            | Node::SetComp(_)
            | Node::GeneratorExp(_)
            | Node::DictComp(_) => Err(GenerateError::UnsupportedNode {
                kind: node.kind(),
                position: Position::Statement,
            }),
        }
    }
}

/// Appends `  # comment`. Line breaks inside the comment become spaces so it stays on one line.
fn with_comment(mut text: String, comment: Option<&str>) -> String {
    if let Some(comment) = comment {
        let words: Vec<&str> = comment.split(['\r', '\n']).filter(|part| !part.is_empty()).collect();
        text.push_str("  # ");
        text.push_str(&words.join(" "));
    }
    text
}

fn alias(alias: &crate::ast::Alias) -> String {
    match &alias.asname {
        Some(asname) => format!("{} as {asname}", alias.name),
        None => alias.name.clone(),
    }
}

/// Binding strength of expression positions, loosest first.
mod prec {
    pub const YIELD: u8 = 1;
    pub const NAMED: u8 = 2;
    pub const TEST: u8 = 3;
    pub const IF_EXP: u8 = 4;
    pub const OR: u8 = 5;
    pub const AND: u8 = 6;
    pub const NOT: u8 = 7;
    pub const CMP: u8 = 8;
    pub const BOR: u8 = 9;
    pub const BXOR: u8 = 10;
    pub const BAND: u8 = 11;
    pub const SHIFT: u8 = 12;
    pub const ARITH: u8 = 13;
    pub const TERM: u8 = 14;
    pub const FACTOR: u8 = 15;
    pub const POWER: u8 = 16;
    pub const AWAIT: u8 = 17;
    pub const ATOM: u8 = 18;
}

fn binop_prec(op: BinOperator) -> u8 {
    match op {
        BinOperator::BitOr => prec::BOR,
        BinOperator::BitXor => prec::BXOR,
        BinOperator::BitAnd => prec::BAND,
        BinOperator::LShift | BinOperator::RShift => prec::SHIFT,
        BinOperator::Add | BinOperator::Sub => prec::ARITH,
        BinOperator::Mult
        | BinOperator::MatMult
        | BinOperator::Div
        | BinOperator::FloorDiv
        | BinOperator::Mod => prec::TERM,
        BinOperator::Pow => prec::POWER,
    }
}

/// Renders `node` for a position that binds at `min`, parenthesizing when the node binds more loosely.
fn expr(node: &Node, min: u8) -> Result<String, GenerateError> {
    let (text, strength) = expr_inner(node)?;
    if strength < min {
        Ok(format!("({text})"))
    } else {
        Ok(text)
    }
}

/// Like [`expr`], but a non-empty tuple is written without parentheses.
fn bare(node: &Node, min: u8) -> Result<String, GenerateError> {
    match node {
        Node::Tuple(t) if !t.elts.is_empty() => {
            let items = elements(&t.elts)?;
            if t.elts.len() == 1 {
                Ok(format!("{items},"))
            } else {
                Ok(items)
            }
        }
        _ => expr(node, min),
    }
}

fn elements(nodes: &[Node]) -> Result<String, GenerateError> {
    let items = nodes
        .iter()
        .map(|n| expr(n, prec::TEST))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items.join(", "))
}

fn keyword_arg(arg: Option<&str>, value: &Node) -> Result<String, GenerateError> {
    Ok(match arg {
        Some(arg) => format!("{arg}={}", expr(value, prec::TEST)?),
        None => format!("**{}", expr(value, prec::BOR)?),
    })
}

fn constant(value: &ConstantValue, prefix: Option<&str>) -> (String, u8) {
    match value {
        ConstantValue::None => ("None".to_string(), prec::ATOM),
        ConstantValue::Bool(true) => ("True".to_string(), prec::ATOM),
        ConstantValue::Bool(false) => ("False".to_string(), prec::ATOM),
        ConstantValue::Int(i) if *i < 0 => (i.to_string(), prec::FACTOR),
        ConstantValue::Int(i) => (i.to_string(), prec::ATOM),
        ConstantValue::Float(f) if f.is_sign_negative() && !f.is_nan() => {
            (format_float(*f), prec::FACTOR)
        }
        ConstantValue::Float(f) => (format_float(*f), prec::ATOM),
        ConstantValue::Str(s) => (string_literal(s, prefix.unwrap_or("")), prec::ATOM),
        ConstantValue::Ellipsis => ("...".to_string(), prec::ATOM),
    }
}

/// A raw prefix is dropped when the text has no raw spelling; the escaped literal carries the same value.
fn string_literal(text: &str, prefix: &str) -> String {
    let bytes = prefix.contains(['b', 'B']);
    if prefix.contains(['r', 'R']) && (!bytes || text.is_ascii()) {
        if let Some(quoted) = quote_raw(text) {
            return format!("{prefix}{quoted}");
        }
    }
    let prefix: String = prefix.chars().filter(|c| !matches!(*c, 'r' | 'R')).collect();
    let quoted = if bytes { quote_bytes(text) } else { quote_str(text) };
    format!("{prefix}{quoted}")
}

fn expr_inner(node: &Node) -> Result<(String, u8), GenerateError> {
    Ok(match node {
        Node::Constant(c) => constant(&c.value, c.prefix.as_deref()),
        Node::Name(n) => (n.id.clone(), prec::ATOM),
        Node::Call(c) => {
            let mut args = c
                .args
                .iter()
                .map(|a| expr(a, prec::TEST))
                .collect::<Result<Vec<_>, _>>()?;
            for keyword in &c.keywords {
                args.push(keyword_arg(keyword.arg.as_deref(), &keyword.value)?);
            }
            (
                format!("{}({})", expr(&c.func, prec::ATOM)?, args.join(", ")),
                prec::ATOM,
            )
        }
        Node::Attribute(a) => {
            // `1.real` would lex as a float literal.
            let value = match a.value.as_ref() {
                Node::Constant(c) if matches!(c.value, ConstantValue::Int(_)) => {
                    format!("({})", expr(&a.value, prec::ATOM)?)
                }
                value => expr(value, prec::ATOM)?,
            };
            (format!("{value}.{}", a.attr), prec::ATOM)
        }
        Node::Subscript(s) => (
            format!("{}[{}]", expr(&s.value, prec::ATOM)?, bare(&s.slice, prec::TEST)?),
            prec::ATOM,
        ),
        Node::Slice(s) => {
            let part = |bound: &Option<Box<Node>>| -> Result<String, GenerateError> {
                bound.as_ref().map_or(Ok(String::new()), |b| expr(b, prec::TEST))
            };
            let mut text = format!("{}:{}", part(&s.lower)?, part(&s.upper)?);
            if s.step.is_some() {
                text.push(':');
                text.push_str(&part(&s.step)?);
            }
            (text, prec::ATOM)
        }
        Node::BinOp(b) => {
            let strength = binop_prec(b.op);
            let (left_min, right_min) = if b.op == BinOperator::Pow {
                (strength + 1, strength)
            } else {
                (strength, strength + 1)
            };
            (
                format!(
                    "{} {} {}",
                    expr(&b.left, left_min)?,
                    b.op.symbol(),
                    expr(&b.right, right_min)?
                ),
                strength,
            )
        }
        Node::BoolOp(b) => {
            let strength = match b.op {
                BoolOperator::Or => prec::OR,
                BoolOperator::And => prec::AND,
            };
            let values = b
                .values
                .iter()
                .map(|v| expr(v, strength + 1))
                .collect::<Result<Vec<_>, _>>()?;
            let separator = format!(" {} ", b.op.keyword());
            (values.join(separator.as_str()), strength)
        }
        Node::UnaryOp(u) => {
            let strength = if u.op == UnaryOperator::Not {
                prec::NOT
            } else {
                prec::FACTOR
            };
            (
                format!("{}{}", u.op.symbol(), expr(&u.operand, strength)?),
                strength,
            )
        }
        Node::Compare(c) => {
            let mut text = expr(&c.left, prec::CMP + 1)?;
            for (op, comparator) in c.ops.iter().zip(&c.comparators) {
                text.push(' ');
                text.push_str(op.symbol());
                text.push(' ');
                text.push_str(&expr(comparator, prec::CMP + 1)?);
            }
            (text, prec::CMP)
        }
        Node::List(l) => (format!("[{}]", elements(&l.elts)?), prec::ATOM),
        Node::Tuple(t) => {
            let text = match t.elts.len() {
                0 => "()".to_string(),
                1 => format!("({},)", elements(&t.elts)?),
                _ => format!("({})", elements(&t.elts)?),
            };
            (text, prec::ATOM)
        }
        Node::Set(s) if s.elts.is_empty() => ("set()".to_string(), prec::ATOM),
        Node::Set(s) => (format!("{{{}}}", elements(&s.elts)?), prec::ATOM),
        Node::Dict(d) => {
            let items = d
                .items
                .iter()
                .map(|item| -> Result<String, GenerateError> {
                    match &item.key {
                    Some(key) => Ok(format!(
                        "{}: {}",
                        expr(key, prec::TEST)?,
                        expr(&item.value, prec::TEST)?
                    )),
                    None => Ok(format!("**{}", expr(&item.value, prec::BOR)?)),
                    }
                })
                .collect::<Result<Vec<_>, GenerateError>>()?;
            (format!("{{{}}}", items.join(", ")), prec::ATOM)
        }
        Node::Lambda(l) => {
            let args = arguments(&l.args)?;
            let body = expr(&l.body, prec::TEST)?;
            let text = if args.is_empty() {
                format!("lambda: {body}")
            } else {
                format!("lambda {args}: {body}")
            };
            (text, prec::TEST)
        }
        Node::IfExp(i) => (
            format!(
                "{} if {} else {}",
                expr(&i.body, prec::OR)?,
                expr(&i.test, prec::OR)?,
                expr(&i.orelse, prec::IF_EXP)?
            ),
            prec::IF_EXP,
        ),
        Node::Starred(s) => (format!("*{}", expr(&s.value, prec::BOR)?), prec::BOR),
        Node::Await(a) => (format!("await {}", expr(&a.value, prec::ATOM)?), prec::AWAIT),
        Node::Yield(y) => {
            let text = match &y.value {
                Some(value) => format!("yield {}", bare(value, prec::TEST)?),
                None => "yield".to_string(),
            };
            (text, prec::YIELD)
        }
        Node::ListComp(c) => (
            format!("[{}{}]", expr(&c.elt, prec::TEST)?, generators(&c.generators)?),
            prec::ATOM,
        ),
        Node::SetComp(c) => (
            format!("{{{}{}}}", expr(&c.elt, prec::TEST)?, generators(&c.generators)?),
            prec::ATOM,
        ),
        Node::GeneratorExp(c) => (
            format!("({}{})", expr(&c.elt, prec::TEST)?, generators(&c.generators)?),
            prec::ATOM,
        ),
        Node::DictComp(c) => (
            format!(
                "{{{}: {}{}}}",
                expr(&c.key, prec::TEST)?,
                expr(&c.value, prec::TEST)?,
                generators(&c.generators)?
            ),
            prec::ATOM,
        ),
        Node::Import(_)
        | Node::ImportFrom(_)
        | Node::FunctionDef(_)
        | Node::ClassDef(_)
        | Node::If(_)
        | Node::Try(_)
        | Node::Match(_)
        | Node::For(_)
        | Node::While(_)
        | Node::With(_)
        | Node::Return(_)
        | Node::Assign(_)
        | Node::AugAssign(_)
        | Node::AnnAssign(_)
        | Node::Raise(_)
        | Node::Assert(_)
        | Node::Expr(_)
        | Node::Pass
        | Node::Break
        | Node::Continue
        | Node::Delete(_)
        | Node::Global(_)
        | Node::Nonlocal(_)
        | Node::Comment(_) => {
            return Err(GenerateError::UnsupportedNode {
                kind: node.kind(),
                position: Position::Expression,
            })
        }
    })
}

/// ` for x in xs if x` clauses, each with a leading space.
fn generators(clauses: &[Comprehension]) -> Result<String, GenerateError> {
    let mut text = String::new();
    for clause in clauses {
        text.push_str(if clause.is_async { " async for " } else { " for " });
        text.push_str(&bare(&clause.target, prec::BOR)?);
        text.push_str(" in ");
        text.push_str(&expr(&clause.iter, prec::OR)?);
        for condition in &clause.ifs {
            text.push_str(" if ");
            text.push_str(&expr(condition, prec::OR)?);
        }
    }
    Ok(text)
}

fn arg(arg: &Arg) -> Result<String, GenerateError> {
    let mut text = arg.name.clone();
    if let Some(annotation) = &arg.annotation {
        text.push_str(": ");
        text.push_str(&expr(annotation, prec::TEST)?);
    }
    if let Some(default) = &arg.default {
        text.push_str(if arg.annotation.is_some() { " = " } else { "=" });
        text.push_str(&expr(default, prec::TEST)?);
    }
    Ok(text)
}

fn arguments(args: &Arguments) -> Result<String, GenerateError> {
    let mut parts = Vec::new();
    for a in &args.posonlyargs {
        parts.push(arg(a)?);
    }
    if !args.posonlyargs.is_empty() {
        parts.push("/".to_string());
    }
    for a in &args.args {
        parts.push(arg(a)?);
    }
    match &args.vararg {
        Some(vararg) => parts.push(format!("*{}", arg(vararg)?)),
        None if !args.kwonlyargs.is_empty() => parts.push("*".to_string()),
        None => {}
    }
    for a in &args.kwonlyargs {
        parts.push(arg(a)?);
    }
    if let Some(kwarg) = &args.kwarg {
        parts.push(format!("**{}", arg(kwarg)?));
    }
    Ok(parts.join(", "))
}

fn type_params(params: &[TypeParam]) -> Result<String, GenerateError> {
    if params.is_empty() {
        return Ok(String::new());
    }
    let rendered = params
        .iter()
        .map(|p| -> Result<String, GenerateError> {
            match &p.bound {
            Some(bound) => Ok(format!("{}: {}", p.name, expr(bound, prec::TEST)?)),
            None => Ok(p.name.clone()),
            }
        })
        .collect::<Result<Vec<_>, GenerateError>>()?;
    Ok(format!("[{}]", rendered.join(", ")))
}
