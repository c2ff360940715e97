use crate::error::Error;
use crate::serializer::to_value;
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// 渲染上下文：变量名到值的映射，每次渲染调用提供一次
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    vars: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从任意可序列化的结构体或映射构建上下文
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        match to_value(value)? {
            Value::Map(vars) => Ok(Self { vars }),
            Value::Null => Ok(Self::default()),
            other => Err(Error::Value(format!(
                "Context must be a struct or map, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(name.into(), value.into())
    }

    /// 链式插入
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// 渲染时的作用域链
///
/// 每次循环迭代都会新建一个子作用域，只绑定循环变量，
/// 其余名称沿父链查找直到根上下文。作用域从不被原地修改。
pub struct Scope<'a> {
    root: &'a Context,
    parent: Option<&'a Scope<'a>>,
    local: Option<(&'a str, &'a Value)>,
}

impl<'a> Scope<'a> {
    pub fn new(root: &'a Context) -> Self {
        Self {
            root,
            parent: None,
            local: None,
        }
    }

    /// 创建绑定 `name` 的子作用域
    pub fn child(&'a self, name: &'a str, value: &'a Value) -> Scope<'a> {
        Scope {
            root: self.root,
            parent: Some(self),
            local: Some((name, value)),
        }
    }

    /// 按名称查找，最内层绑定优先
    pub fn lookup(&self, key: &str) -> Option<&'a Value> {
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some((name, value)) = s.local {
                if name == key {
                    return Some(value);
                }
            }
            scope = s.parent;
        }
        self.root.get(key)
    }
}
