pub mod ast;
mod cache;
pub mod engine;
pub mod expr;
pub mod lexer;
pub mod parser;
mod render;
pub mod render_context;
pub mod token;
