use crate::ast::NodeKind;
use crate::builder::ExtensionKind;
use crate::generator::Position;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum PycraftError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Generate(#[from] GenerateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum BuildError {
    #[error("No active scope")]
    #[diagnostic(
        code(builder::no_active_scope),
        help("The builder was already finished. Start a new builder to emit more code.")
    )]
    NoActiveScope,

    #[error("Cannot attach `{extension}`: {reason}")]
    #[diagnostic(
        code(builder::no_chain_target),
        help("`elif_`/`else_`/`except_`/`finally_`/`case_` must directly follow the block they extend, in the same scope.")
    )]
    NoChainTarget {
        extension: ExtensionKind,
        reason: String,
    },

    #[error("Unbalanced scope: builder is at depth {depth}, expected {expected}")]
    #[diagnostic(
        code(builder::unbalanced_scope),
        help("Every opened block must be closed before its enclosing block, and no more often than it was opened.")
    )]
    UnbalancedScope { depth: usize, expected: usize },

    #[error("`{kind}` is not a block node")]
    #[diagnostic(
        code(builder::not_a_block),
        help("Only nodes with a statement body (def, class, if, try, for, while, with) can open a scope. Use `add_node` for everything else.")
    )]
    NotABlock { kind: NodeKind },

    #[error("Invalid {kind} node: {reason}")]
    #[diagnostic(code(builder::invalid_node))]
    InvalidNode { kind: NodeKind, reason: String },
}

#[derive(Error, Debug, Diagnostic)]
pub enum GenerateError {
    #[error("Unsupported node: `{kind}` cannot appear in {position} position")]
    #[diagnostic(
        code(generator::unsupported_node),
        help("Wrap expressions in an expression statement to use them as statements.")
    )]
    UnsupportedNode { kind: NodeKind, position: Position },

    #[error("Failed to write generated code")]
    #[diagnostic(
        code(generator::sink_write),
        help("The output may be partially written and should be discarded.")
    )]
    SinkWrite(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Build(#[from] BuildError),
}

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Invalid JSON configuration")]
    #[diagnostic(code(config::json))]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML configuration")]
    #[diagnostic(code(config::yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to read configuration file `{}`", path.display())]
    #[diagnostic(code(config::read))]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid indentation unit {indent:?}")]
    #[diagnostic(
        code(config::invalid_indent),
        help("The indentation unit must be a non-empty run of spaces or tabs.")
    )]
    InvalidIndent { indent: String },
}
