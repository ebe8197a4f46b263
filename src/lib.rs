pub mod api;
pub mod ast;
pub mod builder;
pub mod config;
pub mod error;
pub mod generator;
pub mod utils;

pub use api::{generate, generate_module, generate_to, load_config};
pub use ast::{Module, Node};
pub use builder::{Builder, Scope};
pub use config::{GeneratorConfig, OutputMode};
pub use error::{BuildError, ConfigError, GenerateError, PycraftError};
pub use generator::Generator;
