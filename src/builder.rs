//! The scope builder.
//!
//! A [`Builder`] owns the module body and a stack of frames. Each frame is the
//! body currently being filled plus a chain marker: the position of the most
//! recently closed `if`/`try`/`match`/loop in that body, which a later
//! `elif_`/`else_`/`except_`/`finally_`/`case_` extends in place.
//!
//! Block constructors return a [`Scope`] guard. Dropping the guard closes the
//! block, so a failure propagated with `?` out of a nested scope still leaves
//! the stack balanced.

use crate::ast::{
    Alias, Arguments, ClassDef, ExceptHandler, For, FunctionDef, If, Import, ImportFrom, Match,
    MatchCase, Module, Node, NodeKind, Try, While, With, WithItem,
};
use crate::error::BuildError;
use log::{debug, trace, warn};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// The ways a closed construct can be extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Elif,
    Else,
    Except,
    Finally,
    Case,
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExtensionKind::Elif => "elif",
            ExtensionKind::Else => "else",
            ExtensionKind::Except => "except",
            ExtensionKind::Finally => "finally",
            ExtensionKind::Case => "case",
        })
    }
}

/// Payload of a chain extension.
#[derive(Debug, Clone, PartialEq)]
pub enum Extension {
    Elif(Node),
    Else,
    Except {
        type_: Option<Node>,
        name: Option<String>,
    },
    Finally,
    Case {
        pattern: Node,
        guard: Option<Node>,
    },
}

impl Extension {
    pub fn kind(&self) -> ExtensionKind {
        match self {
            Extension::Elif(_) => ExtensionKind::Elif,
            Extension::Else => ExtensionKind::Else,
            Extension::Except { .. } => ExtensionKind::Except,
            Extension::Finally => ExtensionKind::Finally,
            Extension::Case { .. } => ExtensionKind::Case,
        }
    }
}

/// Index of the chainable node in its frame's body, and how many `elif`
/// links to follow down its else-branches to reach the construct to extend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChainMarker {
    index: usize,
    elif_depth: usize,
}

impl ChainMarker {
    fn for_node(index: usize, node: &Node) -> Self {
        let mut elif_depth = 0;
        if let Node::If(root) = node {
            let mut current = root;
            while let Some(nested) = current.elif() {
                elif_depth += 1;
                current = nested;
            }
        }
        ChainMarker { index, elif_depth }
    }
}

#[derive(Debug)]
enum Owner {
    Module,
    Block(Node),
    Clause(Extension),
}

#[derive(Debug)]
struct Frame {
    owner: Owner,
    body: Vec<Node>,
    chain: Option<ChainMarker>,
}

impl Frame {
    fn new(owner: Owner, body: Vec<Node>) -> Self {
        Frame {
            owner,
            body,
            chain: None,
        }
    }

    /// Appends in call order. A chainable node becomes the chain marker; anything else breaks the chain.
    fn push(&mut self, node: Node) {
        let index = self.body.len();
        self.chain = node
            .kind()
            .is_chainable()
            .then(|| ChainMarker::for_node(index, &node));
        self.body.push(node);
    }
}

fn chain_target(body: &[Node], marker: ChainMarker) -> Option<&Node> {
    let mut node = body.get(marker.index)?;
    for _ in 0..marker.elif_depth {
        node = match node {
            Node::If(i) => i.orelse.first()?,
            _ => return None,
        };
    }
    Some(node)
}

fn chain_target_mut(body: &mut [Node], marker: ChainMarker) -> Option<&mut Node> {
    let mut node = body.get_mut(marker.index)?;
    for _ in 0..marker.elif_depth {
        node = match node {
            Node::If(i) => i.orelse.first_mut()?,
            _ => return None,
        };
    }
    Some(node)
}

/// Checks whether `target` can take `extension` in its current state.
fn accepts(target: &Node, extension: ExtensionKind) -> Result<(), String> {
    let kind = target.kind();
    let rejected = || format!("a `{kind}` cannot be extended with `{extension}`");
    match (target, extension) {
        (Node::If(i), ExtensionKind::Elif | ExtensionKind::Else) => {
            if i.orelse.is_empty() {
                Ok(())
            } else {
                Err("this `if` already has an else branch".to_string())
            }
        }
        (Node::For(f), ExtensionKind::Else) if f.orelse.is_empty() => Ok(()),
        (Node::While(w), ExtensionKind::Else) if w.orelse.is_empty() => Ok(()),
        (Node::For(_) | Node::While(_), ExtensionKind::Else) => {
            Err(format!("this `{kind}` already has an else branch"))
        }
        (Node::Try(t), ExtensionKind::Except) => {
            if t.orelse.is_empty() && t.finalbody.is_empty() {
                Ok(())
            } else {
                Err("`except` must come before `else` and `finally`".to_string())
            }
        }
        (Node::Try(t), ExtensionKind::Else) => {
            if t.handlers.is_empty() {
                Err("a `try` needs an `except` before its `else`".to_string())
            } else if !t.orelse.is_empty() || !t.finalbody.is_empty() {
                Err("`else` must come once, before `finally`".to_string())
            } else {
                Ok(())
            }
        }
        (Node::Try(t), ExtensionKind::Finally) => {
            if t.finalbody.is_empty() {
                Ok(())
            } else {
                Err("this `try` already has a `finally`".to_string())
            }
        }
        (Node::Match(_), ExtensionKind::Case) => Ok(()),
        _ => Err(rejected()),
    }
}

/// Installs a finished clause body on its construct and returns the frame's next chain marker.
fn attach(
    target: &mut Node,
    extension: Extension,
    body: Vec<Node>,
    marker: ChainMarker,
) -> Result<Option<ChainMarker>, BuildError> {
    let kind = extension.kind();
    match (target, extension) {
        (Node::If(i), Extension::Elif(test)) => {
            i.orelse = vec![Node::If(If {
                test: Box::new(test),
                body,
                orelse: Vec::new(),
            })];
            Ok(Some(ChainMarker {
                elif_depth: marker.elif_depth + 1,
                ..marker
            }))
        }
        (Node::If(i), Extension::Else) => {
            i.orelse = body;
            Ok(None)
        }
        (Node::For(f), Extension::Else) => {
            f.orelse = body;
            Ok(None)
        }
        (Node::While(w), Extension::Else) => {
            w.orelse = body;
            Ok(None)
        }
        (Node::Try(t), Extension::Except { type_, name }) => {
            t.handlers.push(ExceptHandler {
                type_: type_.map(Box::new),
                name,
                body,
            });
            Ok(Some(marker))
        }
        (Node::Try(t), Extension::Else) => {
            t.orelse = body;
            Ok(Some(marker))
        }
        (Node::Try(t), Extension::Finally) => {
            t.finalbody = body;
            Ok(Some(marker))
        }
        (Node::Match(m), Extension::Case { pattern, guard }) => {
            m.cases.push(MatchCase {
                pattern: Box::new(pattern),
                guard: guard.map(Box::new),
                body,
            });
            Ok(Some(marker))
        }
        (target, _) => Err(BuildError::NoChainTarget {
            extension: kind,
            reason: format!("the `{}` it extended changed while the clause was open", target.kind()),
        }),
    }
}

/// Builds one module through nested scopes. See the module docs.
#[derive(Debug)]
pub struct Builder {
    frames: Vec<Frame>,
    failure: Option<BuildError>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            frames: vec![Frame::new(Owner::Module, Vec::new())],
            failure: None,
        }
    }

    /// Number of open blocks above the module body.
    pub fn depth(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    /// The first scope failure that a dropped [`Scope`] could not report.
    pub fn failure(&self) -> Option<&BuildError> {
        self.failure.as_ref()
    }

    fn top(&mut self) -> Result<&mut Frame, BuildError> {
        self.frames.last_mut().ok_or(BuildError::NoActiveScope)
    }

    fn record_failure(&mut self, err: BuildError) {
        warn!("scope failure recorded: {err}");
        if self.failure.is_none() {
            self.failure = Some(err);
        }
    }

    fn check_finished(&self) -> Result<(), BuildError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.frames.is_empty() {
            return Err(BuildError::NoActiveScope);
        }
        if self.depth() != 0 {
            return Err(BuildError::UnbalancedScope {
                depth: self.depth(),
                expected: 0,
            });
        }
        Ok(())
    }

    /// The module body, once every scope is closed.
    ///
    /// # Errors
    /// `UnbalancedScope` while blocks are open or after a recorded scope failure,
    /// `NoActiveScope` after [`Builder::finish`].
    pub fn tree(&self) -> Result<&[Node], BuildError> {
        self.check_finished()?;
        match self.frames.first() {
            Some(root) => Ok(&root.body),
            None => Err(BuildError::NoActiveScope),
        }
    }

    /// Takes the finished module out of the builder. Any later insertion fails with `NoActiveScope`.
    ///
    /// # Errors
    /// Same conditions as [`Builder::tree`].
    pub fn finish(&mut self) -> Result<Module, BuildError> {
        self.check_finished()?;
        let root = self.frames.pop().ok_or(BuildError::NoActiveScope)?;
        debug!("builder finished with {} top-level statements", root.body.len());
        Ok(Module { body: root.body })
    }

    // === Primitive operations ===

    /// Appends `node` to the body of the innermost open scope.
    pub fn add_node(&mut self, node: Node) -> Result<(), BuildError> {
        let frame = self.top()?;
        trace!("add {} at index {}", node.kind(), frame.body.len());
        frame.push(node);
        Ok(())
    }

    /// Opens a scope filling `node`'s body. The node takes its place in the
    /// enclosing body when the scope closes; nothing else can be inserted there meanwhile.
    pub fn open_block(&mut self, mut node: Node) -> Result<(), BuildError> {
        let kind = node.kind();
        if !node.is_block() {
            return Err(BuildError::NotABlock { kind });
        }
        let body = node.body_mut().map(std::mem::take).unwrap_or_default();
        self.top()?.chain = None;
        self.frames.push(Frame::new(Owner::Block(node), body));
        trace!("open {kind} (depth {})", self.depth());
        Ok(())
    }

    /// Closes the innermost scope. Empty bodies receive a `pass`.
    pub fn close_block(&mut self) -> Result<(), BuildError> {
        if self.frames.is_empty() {
            return Err(BuildError::NoActiveScope);
        }
        if self.frames.len() == 1 {
            return Err(BuildError::UnbalancedScope {
                depth: 0,
                expected: 1,
            });
        }
        let Some(Frame {
            owner, mut body, ..
        }) = self.frames.pop()
        else {
            return Err(BuildError::NoActiveScope);
        };
        if body.is_empty() {
            body.push(Node::Pass);
        }
        let parent = self.top()?;
        match owner {
            Owner::Block(mut node) => {
                trace!("close {}", node.kind());
                if let Some(slot) = node.body_mut() {
                    *slot = body;
                }
                parent.push(node);
            }
            Owner::Clause(extension) => {
                let kind = extension.kind();
                trace!("close {kind} clause");
                let missing = || BuildError::NoChainTarget {
                    extension: kind,
                    reason: "the construct it extended is gone".to_string(),
                };
                let marker = parent.chain.ok_or_else(missing)?;
                let target = chain_target_mut(&mut parent.body, marker).ok_or_else(missing)?;
                parent.chain = attach(target, extension, body, marker)?;
            }
            Owner::Module => {
                return Err(BuildError::UnbalancedScope {
                    depth: 0,
                    expected: 1,
                })
            }
        }
        Ok(())
    }

    /// Opens a clause that extends the construct under the current chain marker.
    pub fn extend_chain(&mut self, extension: Extension) -> Result<(), BuildError> {
        let kind = extension.kind();
        let frame = self.top()?;
        let no_target = |reason: String| BuildError::NoChainTarget {
            extension: kind,
            reason,
        };
        let marker = frame
            .chain
            .ok_or_else(|| no_target("nothing in this scope to extend".to_string()))?;
        let target = chain_target(&frame.body, marker)
            .ok_or_else(|| no_target("nothing in this scope to extend".to_string()))?;
        accepts(target, kind).map_err(no_target)?;
        debug!("extend {} with {kind}", target.kind());
        self.frames.push(Frame::new(Owner::Clause(extension), Vec::new()));
        Ok(())
    }

    /// Closes the scope opened at `depth` and anything leaked above it.
    fn close_scope(&mut self, depth: usize) -> Result<(), BuildError> {
        let current = self.depth();
        if current < depth {
            let err = BuildError::UnbalancedScope {
                depth: current,
                expected: depth,
            };
            self.record_failure(err.clone());
            return Err(err);
        }
        for _ in depth..current {
            self.close_block()?;
        }
        self.close_block()?;
        if current > depth {
            let err = BuildError::UnbalancedScope {
                depth: current,
                expected: depth,
            };
            self.record_failure(err.clone());
            return Err(err);
        }
        Ok(())
    }

    fn scope(&mut self) -> Scope<'_> {
        let depth = self.depth();
        Scope {
            builder: self,
            depth,
            closed: false,
        }
    }

    // === Scoped constructors ===

    /// Opens any block node, e.g. a decorated function built by hand.
    pub fn block(&mut self, node: Node) -> Result<Scope<'_>, BuildError> {
        self.open_block(node)?;
        Ok(self.scope())
    }

    fn clause(&mut self, extension: Extension) -> Result<Scope<'_>, BuildError> {
        self.extend_chain(extension)?;
        Ok(self.scope())
    }

    pub fn function(
        &mut self,
        name: impl Into<String>,
        args: Arguments,
    ) -> Result<Scope<'_>, BuildError> {
        let def = FunctionDef::new(name, args)?;
        self.block(Node::FunctionDef(def))
    }

    pub fn async_function(
        &mut self,
        name: impl Into<String>,
        args: Arguments,
    ) -> Result<Scope<'_>, BuildError> {
        let def = FunctionDef::new(name, args)?.asynchronous();
        self.block(Node::FunctionDef(def))
    }

    pub fn class_(
        &mut self,
        name: impl Into<String>,
        bases: Vec<Node>,
    ) -> Result<Scope<'_>, BuildError> {
        let def = ClassDef::new(name, bases)?;
        self.block(Node::ClassDef(def))
    }

    pub fn if_(&mut self, test: Node) -> Result<Scope<'_>, BuildError> {
        self.block(Node::If(If::new(test)))
    }

    pub fn elif_(&mut self, test: Node) -> Result<Scope<'_>, BuildError> {
        self.clause(Extension::Elif(test))
    }

    /// Else branch of the preceding `if`, `for`, `while` or `try`.
    pub fn else_(&mut self) -> Result<Scope<'_>, BuildError> {
        self.clause(Extension::Else)
    }

    /// Inserts a `match` statement; its cases follow through [`Builder::case_`].
    pub fn match_(&mut self, subject: Node) -> Result<(), BuildError> {
        self.add_node(Node::Match(Match::new(subject)))
    }

    pub fn case_(&mut self, pattern: Node, guard: Option<Node>) -> Result<Scope<'_>, BuildError> {
        self.clause(Extension::Case { pattern, guard })
    }

    pub fn for_(&mut self, target: Node, iter: Node) -> Result<Scope<'_>, BuildError> {
        self.block(Node::For(For::new(target, iter)))
    }

    pub fn async_for(&mut self, target: Node, iter: Node) -> Result<Scope<'_>, BuildError> {
        let mut node = For::new(target, iter);
        node.is_async = true;
        self.block(Node::For(node))
    }

    pub fn while_(&mut self, test: Node) -> Result<Scope<'_>, BuildError> {
        self.block(Node::While(While {
            test: Box::new(test),
            body: Vec::new(),
            orelse: Vec::new(),
        }))
    }

    pub fn try_(&mut self) -> Result<Scope<'_>, BuildError> {
        self.block(Node::Try(Try::default()))
    }

    /// `except type_ as name:`; both parts are optional.
    pub fn except_(
        &mut self,
        type_: Option<Node>,
        name: Option<&str>,
    ) -> Result<Scope<'_>, BuildError> {
        self.clause(Extension::Except {
            type_,
            name: name.map(str::to_string),
        })
    }

    pub fn finally_(&mut self) -> Result<Scope<'_>, BuildError> {
        self.clause(Extension::Finally)
    }

    pub fn with_(
        &mut self,
        context_expr: Node,
        optional_vars: Option<Node>,
    ) -> Result<Scope<'_>, BuildError> {
        self.with_items(vec![WithItem::new(context_expr, optional_vars)], false)
    }

    pub fn async_with(
        &mut self,
        context_expr: Node,
        optional_vars: Option<Node>,
    ) -> Result<Scope<'_>, BuildError> {
        self.with_items(vec![WithItem::new(context_expr, optional_vars)], true)
    }

    /// `with a as x, b as y:`
    pub fn with_items(
        &mut self,
        items: Vec<WithItem>,
        is_async: bool,
    ) -> Result<Scope<'_>, BuildError> {
        if items.is_empty() {
            return Err(BuildError::InvalidNode {
                kind: NodeKind::With,
                reason: "at least one context manager is required".to_string(),
            });
        }
        self.block(Node::With(With {
            items,
            body: Vec::new(),
            is_async,
        }))
    }

    // === Convenience insertions ===

    /// `import a, b.c`
    pub fn add_import<I, S>(&mut self, modules: I) -> Result<(), BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = modules
            .into_iter()
            .map(Alias::new)
            .collect::<Result<Vec<_>, _>>()?;
        self.add_node(Node::Import(Import::new(names)?))
    }

    /// `from .module import a, b`; `level` counts the leading dots, `module` may be empty for relative imports.
    pub fn import_from<I, S>(&mut self, module: &str, names: I, level: u32) -> Result<(), BuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names
            .into_iter()
            .map(Alias::new)
            .collect::<Result<Vec<_>, _>>()?;
        let node = ImportFrom::new(Some(module.to_string()), names, level)?;
        self.add_node(Node::ImportFrom(node))
    }

    pub fn add_comment(&mut self, text: impl Into<String>) -> Result<(), BuildError> {
        self.add_node(Node::comment(text))
    }
}

/// Guard for an open block or clause. Closing happens on [`Scope::close`] or on drop.
///
/// Dereferences to the [`Builder`], so nested blocks are opened through the guard.
#[derive(Debug)]
pub struct Scope<'b> {
    builder: &'b mut Builder,
    depth: usize,
    closed: bool,
}

impl Scope<'_> {
    /// Closes the scope and reports a failure instead of only recording it.
    pub fn close(mut self) -> Result<(), BuildError> {
        self.closed = true;
        self.builder.close_scope(self.depth)
    }
}

impl Deref for Scope<'_> {
    type Target = Builder;

    fn deref(&self) -> &Builder {
        self.builder
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut Builder {
        self.builder
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.builder.close_scope(self.depth) {
            self.builder.record_failure(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CmpOperator, Node};

    fn cond(name: &str) -> Node {
        Node::compare(Node::name(name), CmpOperator::Gt, Node::int(0))
    }

    #[test]
    fn test_add_node_preserves_order() {
        let mut b = Builder::new();
        for i in 0..5 {
            b.add_node(Node::expr(Node::int(i))).unwrap();
        }
        let body = b.tree().unwrap();
        let values: Vec<_> = body
            .iter()
            .map(|n| match n {
                Node::Expr(e) => (*e.value).clone(),
                _ => panic!("expected expression statement"),
            })
            .collect();
        assert_eq!(values, (0..5).map(Node::int).collect::<Vec<_>>());
    }

    #[test]
    fn test_raw_open_close_depth() {
        let mut b = Builder::new();
        assert_eq!(b.depth(), 0);
        b.open_block(Node::If(If::new(cond("a")))).unwrap();
        b.open_block(Node::While(While {
            test: Box::new(cond("b")),
            body: Vec::new(),
            orelse: Vec::new(),
        }))
        .unwrap();
        assert_eq!(b.depth(), 2);
        assert!(b.tree().is_err());
        b.close_block().unwrap();
        b.close_block().unwrap();
        assert_eq!(b.depth(), 0);
        assert_eq!(
            b.close_block(),
            Err(BuildError::UnbalancedScope {
                depth: 0,
                expected: 1
            })
        );
        assert_eq!(b.tree().unwrap().len(), 1);
    }

    #[test]
    fn test_open_block_rejects_non_block() {
        let mut b = Builder::new();
        assert_eq!(
            b.open_block(Node::Pass),
            Err(BuildError::NotABlock {
                kind: NodeKind::Pass
            })
        );
        assert_eq!(
            b.open_block(Node::Match(Match::new(Node::name("x")))),
            Err(BuildError::NotABlock {
                kind: NodeKind::Match
            })
        );
    }

    #[test]
    fn test_empty_scope_gets_pass() {
        let mut b = Builder::new();
        b.function("noop", Arguments::new()).unwrap().close().unwrap();
        match &b.tree().unwrap()[0] {
            Node::FunctionDef(f) => assert_eq!(f.body, vec![Node::Pass]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_elif_marker_moves_to_nested_if() {
        let mut b = Builder::new();
        b.if_(cond("a")).unwrap().close().unwrap();
        b.elif_(cond("b")).unwrap().close().unwrap();
        b.elif_(cond("c")).unwrap().close().unwrap();
        b.else_().unwrap().close().unwrap();

        let body = b.tree().unwrap();
        assert_eq!(body.len(), 1);
        let Node::If(outer) = &body[0] else {
            panic!("expected if")
        };
        let second = outer.elif().expect("first elif");
        let third = second.elif().expect("second elif");
        assert_eq!(*third.test, cond("c"));
        assert_eq!(third.orelse, vec![Node::Pass]);
    }

    #[test]
    fn test_unrelated_statement_breaks_chain() {
        let mut b = Builder::new();
        b.if_(cond("a")).unwrap().close().unwrap();
        b.add_node(Node::Pass).unwrap();
        let err = b.elif_(cond("b")).unwrap_err();
        assert!(matches!(
            err,
            BuildError::NoChainTarget {
                extension: ExtensionKind::Elif,
                ..
            }
        ));
        assert_eq!(b.depth(), 0);
    }

    #[test]
    fn test_new_if_is_a_sibling() {
        let mut b = Builder::new();
        b.if_(cond("a")).unwrap().close().unwrap();
        b.if_(cond("b")).unwrap().close().unwrap();
        assert_eq!(b.tree().unwrap().len(), 2);
    }

    #[test]
    fn test_chain_marker_is_per_frame() {
        let mut b = Builder::new();
        b.if_(cond("a")).unwrap().close().unwrap();
        {
            let mut f = b.function("f", Arguments::new()).unwrap();
            // The module-level `if` is not visible from inside the function.
            assert!(f.else_().is_err());
        }
        // The function definition broke the module-level chain.
        assert!(b.else_().is_err());
    }

    #[test]
    fn test_fully_built_if_can_be_extended() {
        let mut b = Builder::new();
        let mut inner = If::new(cond("b"));
        inner.body.push(Node::Pass);
        let mut outer = If::new(cond("a"));
        outer.body.push(Node::Pass);
        outer.orelse.push(Node::If(inner));
        b.add_node(Node::If(outer)).unwrap();
        b.else_().unwrap().close().unwrap();

        let Node::If(outer) = &b.tree().unwrap()[0] else {
            panic!("expected if")
        };
        assert_eq!(outer.elif().unwrap().orelse, vec![Node::Pass]);
    }

    #[test]
    fn test_try_ordering_rules() {
        let mut b = Builder::new();
        b.try_().unwrap().close().unwrap();
        assert!(b.else_().is_err(), "else before any except");
        b.except_(Some(Node::name("ValueError")), None).unwrap().close().unwrap();
        b.else_().unwrap().close().unwrap();
        assert!(b.except_(None, None).is_err(), "except after else");
        b.finally_().unwrap().close().unwrap();
        assert!(b.finally_().is_err(), "second finally");
    }

    #[test]
    fn test_loop_else() {
        let mut b = Builder::new();
        b.for_(Node::name("x"), Node::name("xs")).unwrap().close().unwrap();
        b.else_().unwrap().close().unwrap();
        assert!(b.else_().is_err());
        b.while_(cond("n")).unwrap().close().unwrap();
        assert!(b.elif_(cond("m")).is_err());
    }

    #[test]
    fn test_leaked_frame_is_closed_and_recorded() {
        let mut b = Builder::new();
        {
            let mut f = b.function("f", Arguments::new()).unwrap();
            f.open_block(Node::If(If::new(cond("x")))).unwrap();
        }
        assert_eq!(b.depth(), 0);
        assert_eq!(
            b.failure(),
            Some(&BuildError::UnbalancedScope {
                depth: 2,
                expected: 1
            })
        );
        assert!(b.finish().is_err());
    }

    #[test]
    fn test_scope_closed_on_error_path() {
        fn build(b: &mut Builder) -> Result<(), BuildError> {
            let mut class = b.class_("Broken", Vec::new())?;
            let mut method = class.function("m", Arguments::new())?;
            method.elif_(cond("x"))?;
            Ok(())
        }

        let mut b = Builder::new();
        assert!(matches!(
            build(&mut b),
            Err(BuildError::NoChainTarget { .. })
        ));
        assert_eq!(b.depth(), 0);
        assert!(b.failure().is_none());
        assert_eq!(b.tree().unwrap().len(), 1);
    }

    #[test]
    fn test_finish_then_add_fails() {
        let mut b = Builder::new();
        b.add_import(["os"]).unwrap();
        let module = b.finish().unwrap();
        assert_eq!(module.body.len(), 1);
        assert_eq!(b.add_node(Node::Pass), Err(BuildError::NoActiveScope));
        assert_eq!(b.tree(), Err(BuildError::NoActiveScope));
    }

    #[test]
    fn test_import_helpers_validate_names() {
        let mut b = Builder::new();
        assert!(b.add_import(["os", "not a module"]).is_err());
        assert!(b.add_import(Vec::<String>::new()).is_err());
        b.import_from("", ["sibling"], 1).unwrap();
        assert!(b.import_from("", ["x"], 0).is_err());
        assert_eq!(b.tree().unwrap().len(), 1);
    }
}
