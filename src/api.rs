use crate::ast::Module;
use crate::builder::Builder;
use crate::config::GeneratorConfig;
use crate::error::{ConfigError, PycraftError};
use crate::generator::Generator;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Renders a finished builder with the given configuration.
///
/// # Errors
/// Returns `PycraftError::Config` for an invalid configuration, `PycraftError::Generate`
/// if the builder is unbalanced or contains a node that cannot be rendered.
pub fn generate(builder: &Builder, config: &GeneratorConfig) -> Result<String, PycraftError> {
    let generator = Generator::new(config.clone())?;
    Ok(generator.generate(builder)?)
}

/// Streams a finished builder into `sink`. On error the sink may hold a partial document.
pub fn generate_to<W: Write>(
    builder: &Builder,
    config: &GeneratorConfig,
    sink: W,
) -> Result<(), PycraftError> {
    let generator = Generator::new(config.clone())?;
    Ok(generator.generate_to(builder, sink)?)
}

/// Renders a module that was deserialized or assembled by hand.
pub fn generate_module(module: &Module, config: &GeneratorConfig) -> Result<String, PycraftError> {
    let generator = Generator::new(config.clone())?;
    Ok(generator.render(&module.body)?)
}

/// Loads a generator configuration file. `.json` files are read as JSON, everything else as YAML.
///
/// # Errors
/// Returns `ConfigError::Read` if the file cannot be read, or the parse/validation error.
pub fn load_config(path: impl AsRef<Path>) -> Result<GeneratorConfig, PycraftError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config = if is_json {
        GeneratorConfig::from_json(&source)?
    } else {
        GeneratorConfig::from_yaml(&source)?
    };
    Ok(config)
}
