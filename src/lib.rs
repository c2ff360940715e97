pub mod error;
pub mod loader;
pub mod options;
pub mod serializer;
pub mod tpl;
pub mod value;

pub use error::{BlockKind, CompileError, Error, RenderError, TokenizeError};
pub use loader::TemplateSet;
pub use options::LoaderOptions;
pub use tpl::ast::{Node, Template};
pub use tpl::engine::{compile_template, remove_template, render, render_template};
pub use tpl::render_context::Context;
pub use utpl_macros::template_assets;
pub use value::Value;
