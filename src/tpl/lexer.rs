use crate::error::{Marker, TokenizeError};
use crate::tpl::token::{Position, Token, TokenKind};

/// 模板词法分析器
///
/// 扫描位置只会单调前进，不会回退。到达输入末尾后，
/// 后续的每次调用都返回 `EndOfInput`。
pub struct Tokenizer<'a> {
    text: &'a str,
    pos: usize,
    // 最近一次定位的结果，定位总是从这里向前推进
    mark: Position,
    finished: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            mark: Position::new(0, 1, 1),
            finished: false,
        }
    }

    pub fn next_token(&mut self) -> Result<Token, TokenizeError> {
        let text = self.text;
        loop {
            let start = self.pos;
            let remaining = &text[start..];

            match find_open(remaining) {
                None => {
                    let pos = self.locate(start);
                    if remaining.is_empty() {
                        return Ok(Token::new(TokenKind::EndOfInput, pos));
                    }
                    self.pos = text.len();
                    return Ok(Token::new(TokenKind::Literal(remaining.to_string()), pos));
                }
                Some((idx, _)) if idx > 0 => {
                    // 先返回已累积的文本，标记留到下一次调用处理
                    let pos = self.locate(start);
                    self.pos = start + idx;
                    return Ok(Token::new(
                        TokenKind::Literal(remaining[..idx].to_string()),
                        pos,
                    ));
                }
                Some((_, Marker::Variable)) => {
                    let (inner, end) = self.read_until(start, "}}", Marker::Variable)?;
                    let pos = self.locate(start);
                    self.pos = end;
                    return Ok(Token::new(
                        TokenKind::Variable(inner.trim().to_string()),
                        pos,
                    ));
                }
                Some((_, Marker::Comment)) => {
                    let (_, end) = self.read_until(start, "#}", Marker::Comment)?;
                    self.pos = end;
                }
                Some((_, Marker::Block)) => return self.read_block(start),
            }
        }
    }

    fn read_block(&mut self, start: usize) -> Result<Token, TokenizeError> {
        let (inner, end) = self.read_until(start, "%}", Marker::Block)?;
        let pos = self.locate(start);
        self.pos = end;

        let inner = inner.trim_start();
        let word_end = inner.find(char::is_whitespace).unwrap_or(inner.len());
        let (word, rest) = inner.split_at(word_end);

        let kind = match word {
            "for" => TokenKind::Loop(rest.trim().to_string()),
            "if" => TokenKind::Condition(rest.trim().to_string()),
            "endfor" | "endif" => {
                let content = rest.trim();
                if !content.is_empty() {
                    return Err(TokenizeError::UnexpectedContent {
                        keyword: word.to_string(),
                        content: content.to_string(),
                        pos,
                    });
                }
                if word == "endfor" {
                    TokenKind::EndLoop
                } else {
                    TokenKind::EndCondition
                }
            }
            _ => {
                return Err(TokenizeError::UnknownBlock {
                    keyword: word.to_string(),
                    pos,
                });
            }
        };
        Ok(Token::new(kind, pos))
    }

    /// 读取从 `start` 处开始的标记内容，直到遇到 `close`。
    /// 返回标记内部的文本以及闭合符之后的偏移。
    fn read_until(
        &mut self,
        start: usize,
        close: &str,
        marker: Marker,
    ) -> Result<(&'a str, usize), TokenizeError> {
        let text = self.text;
        let body_start = start + 2;
        match text[body_start..].find(close) {
            Some(i) => Ok((&text[body_start..body_start + i], body_start + i + close.len())),
            None => Err(TokenizeError::Unterminated {
                marker,
                pos: self.locate(start),
            }),
        }
    }

    fn locate(&mut self, offset: usize) -> Position {
        let mut pos = self.mark;
        for c in self.text[pos.offset..offset].chars() {
            if c == '\n' {
                pos.line += 1;
                pos.column = 1;
            } else {
                pos.column += 1;
            }
        }
        pos.offset = offset;
        self.mark = pos;
        pos
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token, TokenizeError>;

    /// 依次产出所有 token（包括 `EndOfInput`），遇到错误后停止
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) if !token.is_end() => {}
            _ => self.finished = true,
        }
        Some(result)
    }
}

/// 查找下一个开始标记 `{{`、`{%` 或 `{#`
fn find_open(s: &str) -> Option<(usize, Marker)> {
    let bytes = s.as_bytes();
    for (i, _) in s.match_indices('{') {
        let marker = match bytes.get(i + 1) {
            Some(b'{') => Marker::Variable,
            Some(b'%') => Marker::Block,
            Some(b'#') => Marker::Comment,
            _ => continue,
        };
        return Some((i, marker));
    }
    None
}

/// 将整段模板文本切分为 token 序列，末尾总是 `EndOfInput`
pub fn tokenize(text: &str) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(text).collect()
}
