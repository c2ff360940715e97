//! 模板表达式：标识符、属性/下标访问、字面量、比较与布尔运算。
//!
//! ```text
//! expr       := or
//! or         := and ( "or" and )*
//! and        := not ( "and" not )*
//! not        := "not" not | comparison
//! comparison := primary ( ("==" | "!=" | "<" | "<=" | ">" | ">=") primary )?
//! primary    := atom ( "." ident | "[" expr "]" )*
//! atom       := ident | int | float | string | "true" | "false" | "null" | "(" expr ")"
//! ```

use crate::value::Value;

/// 表达式树允许的最大嵌套层数
pub const MAX_EXPRESSION_DEPTH: usize = 128;

const KEYWORDS: [&str; 6] = ["and", "or", "not", "true", "false", "null"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Attribute(Box<Expr>, String), // foo.bar
    Index(Box<Expr>, Box<Expr>),  // foo[0], foo['bar']
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, CmpOp, Box<Expr>),
}

impl Expr {
    /// 表达式对应的变量路径（如 `user.name`），用于错误信息
    pub fn path(&self) -> Option<String> {
        match self {
            Expr::Var(name) => Some(name.clone()),
            Expr::Attribute(obj, attr) => obj.path().map(|p| format!("{}.{}", p, attr)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Cmp(CmpOp),
    And,
    Or,
    Not,
    True,
    False,
    Null,
}

pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// 保留字不能作为变量名
pub fn is_keyword(s: &str) -> bool {
    KEYWORDS.contains(&s)
}

fn lex(src: &str) -> Result<Vec<Tok>, String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let next = chars.get(i + 1).copied();
        match c {
            '.' => tokens.push(Tok::Dot),
            '[' => tokens.push(Tok::LBracket),
            ']' => tokens.push(Tok::RBracket),
            '(' => tokens.push(Tok::LParen),
            ')' => tokens.push(Tok::RParen),
            '=' | '!' | '<' | '>' => {
                let op = match (c, next) {
                    ('=', Some('=')) => CmpOp::Eq,
                    ('!', Some('=')) => CmpOp::Ne,
                    ('<', Some('=')) => CmpOp::Le,
                    ('>', Some('=')) => CmpOp::Ge,
                    ('<', _) => CmpOp::Lt,
                    ('>', _) => CmpOp::Gt,
                    _ => return Err(format!("unexpected character `{}`", c)),
                };
                if matches!(op, CmpOp::Eq | CmpOp::Ne | CmpOp::Le | CmpOp::Ge) {
                    i += 1;
                }
                tokens.push(Tok::Cmp(op));
            }
            '\'' | '"' => {
                let quote = c;
                let mut s = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err("unterminated string literal".to_string()),
                        Some(&ch) if ch == quote => break,
                        Some('\\') => {
                            i += 1;
                            match chars.get(i) {
                                Some('n') => s.push('\n'),
                                Some('t') => s.push('\t'),
                                Some(&other) => s.push(other),
                                None => return Err("unterminated string literal".to_string()),
                            }
                        }
                        Some(&ch) => s.push(ch),
                    }
                    i += 1;
                }
                tokens.push(Tok::Str(s));
            }
            c if c.is_ascii_digit() || (c == '-' && next.is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let is_float = chars.get(i) == Some(&'.')
                    && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit());
                if is_float {
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let tok = if is_float {
                    text.parse::<f64>().map(Tok::Float).map_err(|e| e.to_string())?
                } else {
                    text.parse::<i64>()
                        .map(Tok::Int)
                        .map_err(|e| format!("invalid integer `{}`: {}", text, e))?
                };
                tokens.push(tok);
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "and" => Tok::And,
                    "or" => Tok::Or,
                    "not" => Tok::Not,
                    "true" => Tok::True,
                    "false" => Tok::False,
                    "null" => Tok::Null,
                    _ => Tok::Ident(word),
                });
                continue;
            }
            _ => return Err(format!("unexpected character `{}`", c)),
        }
        i += 1;
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Tok>,
    cursor: usize,
    depth: usize,
}

impl Parser {
    /// 进入下一层嵌套；`(`、`[`、`not` 以及每个链式运算都会加深表达式树
    fn descend(&mut self) -> Result<(), String> {
        self.depth += 1;
        if self.depth > MAX_EXPRESSION_DEPTH {
            return Err(format!(
                "expression nested deeper than {} levels",
                MAX_EXPRESSION_DEPTH
            ));
        }
        Ok(())
    }

    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.cursor)
    }

    fn consume(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.cursor).cloned();
        if tok.is_some() {
            self.cursor += 1;
        }
        tok
    }

    fn expect(&mut self, expected: Tok) -> Result<(), String> {
        match self.consume() {
            Some(t) if t == expected => Ok(()),
            t => Err(format!("expected {:?}, got {:?}", expected, t)),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let depth = self.depth;
        let mut lhs = self.parse_and()?;
        while let Some(Tok::Or) = self.peek() {
            self.consume();
            self.descend()?;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let depth = self.depth;
        let mut lhs = self.parse_not()?;
        while let Some(Tok::And) = self.peek() {
            self.consume();
            self.descend()?;
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        self.depth = depth;
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        if let Some(Tok::Not) = self.peek() {
            self.consume();
            let depth = self.depth;
            self.descend()?;
            let inner = self.parse_not()?;
            self.depth = depth;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_primary()?;
        if let Some(Tok::Cmp(op)) = self.peek() {
            let op = *op;
            self.consume();
            let rhs = self.parse_primary()?;
            return Ok(Expr::Compare(Box::new(lhs), op, Box::new(rhs)));
        }
        Ok(lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        let depth = self.depth;
        let mut expr = match self.consume() {
            Some(Tok::Ident(name)) => Expr::Var(name),
            Some(Tok::Int(n)) => Expr::Literal(Value::Int(n)),
            Some(Tok::Float(n)) => Expr::Literal(Value::Float(n)),
            Some(Tok::Str(s)) => Expr::Literal(Value::Str(s)),
            Some(Tok::True) => Expr::Literal(Value::Bool(true)),
            Some(Tok::False) => Expr::Literal(Value::Bool(false)),
            Some(Tok::Null) => Expr::Literal(Value::Null),
            Some(Tok::LParen) => {
                self.descend()?;
                let e = self.parse_or()?;
                self.expect(Tok::RParen)?;
                e
            }
            None => return Err("unexpected end of expression".to_string()),
            Some(t) => return Err(format!("expected expression, got {:?}", t)),
        };

        loop {
            match self.peek() {
                Some(Tok::Dot) => {
                    self.consume();
                    self.descend()?;
                    match self.consume() {
                        Some(Tok::Ident(attr)) => {
                            expr = Expr::Attribute(Box::new(expr), attr);
                        }
                        t => return Err(format!("expected identifier after `.`, got {:?}", t)),
                    }
                }
                Some(Tok::LBracket) => {
                    self.consume();
                    self.descend()?;
                    let idx = self.parse_or()?;
                    self.expect(Tok::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(idx));
                }
                _ => break,
            }
        }

        self.depth = depth;
        Ok(expr)
    }
}

/// 将表达式文本解析为表达式树
pub fn parse_expression(src: &str) -> Result<Expr, String> {
    let tokens = lex(src)?;
    let mut parser = Parser {
        tokens,
        cursor: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(t) = parser.peek() {
        return Err(format!("unexpected trailing {:?}", t));
    }
    Ok(expr)
}
