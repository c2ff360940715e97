use crate::tpl::expr::Expr;

/// 编译后的表达式，保留原始文本用于错误信息
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub source: String,
    pub tree: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Emit(String),
    Interpolate(Expression),
    Loop {
        binding: String,
        iterable: Expression,
        body: Vec<Node>,
    },
    Condition {
        test: Expression,
        body: Vec<Node>,
    },
}

/// 编译完成的模板（中间表示树），不可变，可在多次渲染间复用
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    nodes: Vec<Node>,
}

impl Template {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// 树中节点总数（含嵌套）
    pub fn node_count(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .map(|n| match n {
                    Node::Loop { body, .. } | Node::Condition { body, .. } => 1 + count(body),
                    _ => 1,
                })
                .sum()
        }
        count(&self.nodes)
    }
}
