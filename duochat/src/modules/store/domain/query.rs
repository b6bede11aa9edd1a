use serde_json::Value;
use std::cmp::Ordering;

use super::document::Document;
use super::path::{CollectionPath, DocumentPath};

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// 数量限制
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    /// 排序后的前 N 条
    First(usize),
    /// 排序后的后 N 条（仍保持排序顺序）
    Last(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct OrderBy {
    field: String,
    direction: Direction,
}

/// 集合查询
///
/// 指定排序字段时，缺少该字段的文档不会出现在结果中
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    collection: CollectionPath,
    order_by: Option<OrderBy>,
    limit: Option<Limit>,
}

impl Query {
    pub fn new(collection: CollectionPath) -> Self {
        Self {
            collection,
            order_by: None,
            limit: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(Limit::First(n));
        self
    }

    pub fn limit_to_last(mut self, n: usize) -> Self {
        self.limit = Some(Limit::Last(n));
        self
    }

    /// 文档路径是否落在查询范围内
    pub fn matches(&self, path: &DocumentPath) -> bool {
        self.collection.contains(path)
    }

    /// 对候选文档执行查询
    pub fn apply<'a>(&self, documents: impl IntoIterator<Item = &'a Document>) -> Vec<Document> {
        let mut selected: Vec<&Document> = documents
            .into_iter()
            .filter(|doc| self.matches(doc.path()))
            .filter(|doc| match &self.order_by {
                Some(order) => doc.get(&order.field).is_some(),
                None => true,
            })
            .collect();

        selected.sort_by(|a, b| {
            let primary = match &self.order_by {
                Some(order) => {
                    let ordering = compare_values(a.get(&order.field), b.get(&order.field));
                    match order.direction {
                        Direction::Ascending => ordering,
                        Direction::Descending => ordering.reverse(),
                    }
                }
                None => Ordering::Equal,
            };
            primary.then_with(|| a.sequence().cmp(&b.sequence()))
        });

        let selected: Vec<&Document> = match self.limit {
            Some(Limit::First(n)) => selected.into_iter().take(n).collect(),
            Some(Limit::Last(n)) => {
                let skip = selected.len().saturating_sub(n);
                selected.into_iter().skip(skip).collect()
            }
            None => selected,
        };

        selected.into_iter().cloned().collect()
    }
}

/// 类型排序：null < bool < number < string < array < object
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => {
                match (x.as_i64(), y.as_i64()) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    _ => x
                        .as_f64()
                        .unwrap_or_default()
                        .partial_cmp(&y.as_f64().unwrap_or_default())
                        .unwrap_or(Ordering::Equal),
                }
            }
            (Value::String(x), Value::String(y)) => x.cmp(y),
            _ => type_rank(a).cmp(&type_rank(b)),
        },
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
