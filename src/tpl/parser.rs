use crate::error::{BlockKind, CompileError};
use crate::tpl::ast::{Expression, Node, Template};
use crate::tpl::expr::{is_identifier, is_keyword, parse_expression};
use crate::tpl::token::{Position, Token, TokenKind};

/// 块（for/if）允许的最大嵌套层数
pub const MAX_BLOCK_DEPTH: usize = 128;

enum TagFrame {
    Loop {
        binding: String,
        iterable: Expression,
    },
    Condition {
        test: Expression,
    },
}

impl TagFrame {
    fn kind(&self) -> BlockKind {
        match self {
            TagFrame::Loop { .. } => BlockKind::Loop,
            TagFrame::Condition { .. } => BlockKind::Condition,
        }
    }
}

struct OpenBlock {
    tag: TagFrame,
    pos: Position,
    body: Vec<Node>,
}

struct TreeBuilder {
    root: Vec<Node>,
    open: Vec<OpenBlock>,
}

impl TreeBuilder {
    fn current(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(block) => &mut block.body,
            None => &mut self.root,
        }
    }

    fn open(&mut self, tag: TagFrame, pos: Position) -> Result<(), CompileError> {
        if self.open.len() >= MAX_BLOCK_DEPTH {
            return Err(CompileError::TooDeep {
                limit: MAX_BLOCK_DEPTH,
                pos,
            });
        }
        self.open.push(OpenBlock {
            tag,
            pos,
            body: Vec::new(),
        });
        Ok(())
    }

    /// 关闭最内层的块，块类型必须与结束标记一致
    fn close(&mut self, closer: BlockKind, pos: Position) -> Result<(), CompileError> {
        let innermost = self.open.last().map(|b| b.tag.kind());
        if innermost != Some(closer) {
            return Err(CompileError::MismatchedEnd {
                closer,
                open: innermost,
                pos,
            });
        }
        let Some(OpenBlock { tag, body, .. }) = self.open.pop() else {
            return Err(CompileError::MismatchedEnd {
                closer,
                open: None,
                pos,
            });
        };
        let node = match tag {
            TagFrame::Loop { binding, iterable } => Node::Loop {
                binding,
                iterable,
                body,
            },
            TagFrame::Condition { test } => Node::Condition { test, body },
        };
        self.current().push(node);
        Ok(())
    }

    fn finish(self) -> Result<Template, CompileError> {
        if let Some(innermost) = self.open.last() {
            let loops = self
                .open
                .iter()
                .filter(|b| b.tag.kind() == BlockKind::Loop)
                .count();
            return Err(CompileError::Unclosed {
                kind: innermost.tag.kind(),
                loops,
                conditions: self.open.len() - loops,
                pos: innermost.pos,
            });
        }
        Ok(Template::new(self.root))
    }
}

/// 将 token 序列编译为模板树
///
/// 单遍扫描，用显式的块栈维护嵌套关系；遇到 `EndOfInput`
/// （或序列结束）时所有块都必须已关闭。
pub fn compile<I>(tokens: I) -> Result<Template, CompileError>
where
    I: IntoIterator<Item = Token>,
{
    let mut builder = TreeBuilder {
        root: Vec::new(),
        open: Vec::new(),
    };

    for Token { kind, pos } in tokens {
        match kind {
            TokenKind::Literal(text) => append_text(builder.current(), &text),
            TokenKind::Variable(source) => {
                let expr = compile_expression(&source, pos)?;
                builder.current().push(Node::Interpolate(expr));
            }
            TokenKind::Loop(header) => {
                let (binding, iterable) = parse_loop_header(&header, pos)?;
                builder.open(TagFrame::Loop { binding, iterable }, pos)?;
            }
            TokenKind::Condition(header) => {
                let test = compile_expression(&header, pos)?;
                builder.open(TagFrame::Condition { test }, pos)?;
            }
            TokenKind::EndLoop => builder.close(BlockKind::Loop, pos)?,
            TokenKind::EndCondition => builder.close(BlockKind::Condition, pos)?,
            TokenKind::EndOfInput => break,
        }
    }

    builder.finish()
}

fn append_text(nodes: &mut Vec<Node>, text: &str) {
    if let Some(Node::Emit(last_text)) = nodes.last_mut() {
        last_text.push_str(text);
    } else {
        nodes.push(Node::Emit(text.to_string()));
    }
}

fn compile_expression(source: &str, pos: Position) -> Result<Expression, CompileError> {
    match parse_expression(source) {
        Ok(tree) => Ok(Expression {
            source: source.to_string(),
            tree,
        }),
        Err(message) => Err(CompileError::InvalidExpression {
            source_text: source.to_string(),
            message,
            pos,
        }),
    }
}

/// 解析 `<name> in <iterable-expr>`，`in` 必须恰好出现一次
fn parse_loop_header(header: &str, pos: Position) -> Result<(String, Expression), CompileError> {
    let malformed = |reason: &str| CompileError::MalformedLoopHeader {
        header: header.to_string(),
        reason: reason.to_string(),
        pos,
    };

    let offsets = find_word(header, "in");
    let offset = match offsets.as_slice() {
        [] => return Err(malformed("missing `in`")),
        [offset] => *offset,
        _ => return Err(malformed("`in` must appear exactly once")),
    };

    let binding = header[..offset].trim();
    let iterable = header[offset + 2..].trim();
    if binding.is_empty() {
        return Err(malformed("missing loop variable"));
    }
    if !is_identifier(binding) {
        return Err(malformed("loop variable must be a single identifier"));
    }
    if is_keyword(binding) {
        return Err(malformed("loop variable cannot be a keyword"));
    }
    if iterable.is_empty() {
        return Err(malformed("missing iterable expression"));
    }

    Ok((binding.to_string(), compile_expression(iterable, pos)?))
}

/// 查找以空白分隔的完整单词 `word` 的所有起始偏移
fn find_word(s: &str, word: &str) -> Vec<usize> {
    let mut found = Vec::new();
    let mut start = None;
    for (i, c) in s.char_indices().chain(std::iter::once((s.len(), ' '))) {
        if c.is_whitespace() {
            if let Some(begin) = start.take() {
                if &s[begin..i] == word {
                    found.push(begin);
                }
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }
    found
}
