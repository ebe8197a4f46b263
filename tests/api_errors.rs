// Error paths of the public API: scope balance, invalid nodes, rendering positions
// and configuration loading.

use pycraft_core::ast::{Alias, Arguments, FunctionDef, Node, NodeKind};
use pycraft_core::generator::Position;
use pycraft_core::{
    generate, load_config, BuildError, Builder, ConfigError, GenerateError, GeneratorConfig,
    PycraftError,
};
use std::io::Write;

#[test]
fn test_generate_with_open_scope_is_unbalanced() {
    let mut b = Builder::new();
    b.open_block(Node::FunctionDef(FunctionDef::new("f", Arguments::new()).unwrap()))
        .unwrap();
    let result = generate(&b, &GeneratorConfig::default());
    match result {
        Err(PycraftError::Generate(GenerateError::Build(BuildError::UnbalancedScope {
            depth: 1,
            expected: 0,
        }))) => {}
        other => panic!("Expected unbalanced scope, got {other:?}"),
    }
    b.close_block().unwrap();
    assert!(generate(&b, &GeneratorConfig::default()).is_ok());
}

#[test]
fn test_close_without_open_block() {
    let mut b = Builder::new();
    assert!(matches!(
        b.close_block(),
        Err(BuildError::UnbalancedScope { .. })
    ));
}

#[test]
fn test_leaked_inner_block_is_recorded() {
    let mut b = Builder::new();
    {
        let mut outer = b.function("outer", Arguments::new()).unwrap();
        outer
            .open_block(Node::FunctionDef(FunctionDef::new("inner", Arguments::new()).unwrap()))
            .unwrap();
    }
    // The guard closed both frames but remembers the imbalance.
    assert_eq!(b.depth(), 0);
    assert!(matches!(
        b.failure(),
        Some(BuildError::UnbalancedScope { .. })
    ));
    assert!(generate(&b, &GeneratorConfig::default()).is_err());
}

#[test]
fn test_explicit_close_reports_leak() {
    let mut b = Builder::new();
    let mut outer = b.function("outer", Arguments::new()).unwrap();
    outer
        .open_block(Node::FunctionDef(FunctionDef::new("inner", Arguments::new()).unwrap()))
        .unwrap();
    let err = outer.close().unwrap_err();
    assert!(matches!(err, BuildError::UnbalancedScope { .. }));
}

#[test]
fn test_open_block_rejects_simple_statement() {
    let mut b = Builder::new();
    let err = b.block(Node::Pass).unwrap_err();
    assert!(matches!(err, BuildError::NotABlock { kind: NodeKind::Pass }));
    assert_eq!(b.depth(), 0);
}

#[test]
fn test_invalid_names_are_rejected() {
    assert!(matches!(
        FunctionDef::new("not valid", Arguments::new()),
        Err(BuildError::InvalidNode { .. })
    ));
    assert!(Alias::new("os..path").is_err());

    let mut b = Builder::new();
    assert!(b.add_import(Vec::<String>::new()).is_err());
    assert!(b.class_("1st", vec![]).is_err());
    assert_eq!(b.depth(), 0);
}

#[test]
fn test_unsupported_node_positions() {
    let mut b = Builder::new();
    b.add_node(Node::name("bare")).unwrap();
    match generate(&b, &GeneratorConfig::default()) {
        Err(PycraftError::Generate(GenerateError::UnsupportedNode {
            kind: NodeKind::Name,
            position: Position::Statement,
        })) => {}
        other => panic!("Expected unsupported node, got {other:?}"),
    }

    let mut b = Builder::new();
    b.add_node(Node::return_(Some(Node::Break))).unwrap();
    assert!(matches!(
        generate(&b, &GeneratorConfig::default()),
        Err(PycraftError::Generate(GenerateError::UnsupportedNode {
            position: Position::Expression,
            ..
        }))
    ));
}

#[test]
fn test_invalid_config_is_reported_before_generation() {
    let b = Builder::new();
    let config = GeneratorConfig {
        indent: "->".to_string(),
        ..GeneratorConfig::default()
    };
    assert!(matches!(
        generate(&b, &config),
        Err(PycraftError::Config(ConfigError::InvalidIndent { .. }))
    ));
}

#[test]
fn test_load_config_from_files() {
    let dir = tempfile::tempdir().unwrap();

    let json_path = dir.path().join("pycraft.json");
    let mut file = std::fs::File::create(&json_path).unwrap();
    file.write_all(br#"{ "indent": "\t", "output-mode": "write-to-sink" }"#)
        .unwrap();
    let config = load_config(&json_path).unwrap();
    assert_eq!(config.indent, "\t");

    let yaml_path = dir.path().join("pycraft.yaml");
    std::fs::write(&yaml_path, "indentation-unit: \"  \"\n").unwrap();
    assert_eq!(load_config(&yaml_path).unwrap().indent, "  ");

    let missing = dir.path().join("missing.yaml");
    assert!(matches!(
        load_config(&missing),
        Err(PycraftError::Config(ConfigError::Read { .. }))
    ));

    std::fs::write(&yaml_path, "indent: [1, 2").unwrap();
    assert!(matches!(
        load_config(&yaml_path),
        Err(PycraftError::Config(ConfigError::Yaml(_)))
    ));
}

#[test]
fn test_errors_render_as_diagnostics() {
    let mut b = Builder::new();
    let err = b.else_().unwrap_err();
    let report = miette::Report::new(err);
    assert!(report.to_string().contains("else"));
}
