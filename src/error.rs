use crate::tpl::token::Position;
use std::fmt;
use thiserror::Error;

/// 块类型：循环或条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Loop,
    Condition,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Loop => "for",
            BlockKind::Condition => "if",
        }
    }

    pub fn closer(&self) -> &'static str {
        match self {
            BlockKind::Loop => "endfor",
            BlockKind::Condition => "endif",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 标记类型，用于报告未闭合的标记
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Variable,
    Block,
    Comment,
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Variable => f.write_str("{{"),
            Marker::Block => f.write_str("{%"),
            Marker::Comment => f.write_str("{#"),
        }
    }
}

/// Errors raised while scanning template text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenizeError {
    #[error("unterminated `{marker}` marker at {pos}")]
    Unterminated { marker: Marker, pos: Position },
    #[error("unknown block keyword `{keyword}` at {pos}")]
    UnknownBlock { keyword: String, pos: Position },
    #[error("unexpected content `{content}` after `{keyword}` at {pos}")]
    UnexpectedContent {
        keyword: String,
        content: String,
        pos: Position,
    },
}

/// Errors raised while building the IR tree from tokens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("malformed loop header `{header}` at {pos}: {reason}")]
    MalformedLoopHeader {
        header: String,
        reason: String,
        pos: Position,
    },
    #[error("invalid expression `{source_text}` at {pos}: {message}")]
    InvalidExpression {
        source_text: String,
        message: String,
        pos: Position,
    },
    #[error("mismatched `{}` at {pos}: {}", .closer.closer(), open_description(.open))]
    MismatchedEnd {
        closer: BlockKind,
        open: Option<BlockKind>,
        pos: Position,
    },
    #[error("unclosed `{kind}` block opened at {pos} ({loops} loop(s), {conditions} condition(s) still open)")]
    Unclosed {
        kind: BlockKind,
        loops: usize,
        conditions: usize,
        pos: Position,
    },
    #[error("block at {pos} is nested deeper than {limit} levels")]
    TooDeep { limit: usize, pos: Position },
}

fn open_description(open: &Option<BlockKind>) -> String {
    match open {
        Some(kind) => format!("innermost open block is `{}`", kind),
        None => "no block is open".to_string(),
    }
}

/// Errors raised while rendering a compiled template.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("undefined variable `{name}`")]
    Undefined { name: String },
    #[error("loop target `{expr}` is not iterable (found {found})")]
    NotIterable { expr: String, found: &'static str },
    #[error("cannot apply `{op}` to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("cannot access `{key}` on {target}")]
    InvalidAccess { key: String, target: &'static str },
    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
}

/// Represents errors that can occur in the template engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Tokenize error: {0}")]
    Tokenize(#[from] TokenizeError),
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),
    #[error("Render error: {0}")]
    Render(#[from] RenderError),
    #[error("Value error: {0}")]
    Value(String),
    #[error("Load error: {0}")]
    Load(String),
    #[error("Template not found: {0}")]
    NotFound(String),
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Value(msg.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Load(format!("{:#}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatched_message() {
        let err = CompileError::MismatchedEnd {
            closer: BlockKind::Loop,
            open: Some(BlockKind::Condition),
            pos: Position::new(4, 1, 5),
        };
        assert_eq!(
            err.to_string(),
            "mismatched `endfor` at 1:5: innermost open block is `if`"
        );

        let err = CompileError::MismatchedEnd {
            closer: BlockKind::Condition,
            open: None,
            pos: Position::new(0, 1, 1),
        };
        assert_eq!(err.to_string(), "mismatched `endif` at 1:1: no block is open");
    }

    #[test]
    fn test_wrapped_error() {
        let err: Error = TokenizeError::Unterminated {
            marker: Marker::Variable,
            pos: Position::new(2, 1, 3),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Tokenize error: unterminated `{{` marker at 1:3"
        );
    }
}
