// Store Domain - 批量写入
//
// WriteBatch 中的所有操作要么全部生效，要么全部不生效

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

use super::document::Fields;
use super::path::DocumentPath;

/// 字段值或字段变换
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 直接写入的值
    Value(Value),
    /// 原子自增（字段缺失或非数字时视为 0）
    Increment(i64),
    /// 写入提交时的服务器时间（毫秒时间戳）
    ServerTimestamp,
    /// 删除字段
    Delete,
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}

/// 部分字段更新
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdates(BTreeMap<String, FieldValue>);

impl FieldUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), FieldValue::Value(value.into()));
        self
    }

    pub fn increment(mut self, field: impl Into<String>, by: i64) -> Self {
        self.0.insert(field.into(), FieldValue::Increment(by));
        self
    }

    pub fn server_timestamp(mut self, field: impl Into<String>) -> Self {
        self.0.insert(field.into(), FieldValue::ServerTimestamp);
        self
    }

    pub fn delete(mut self, field: impl Into<String>) -> Self {
        self.0.insert(field.into(), FieldValue::Delete);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// 将更新应用到字段上
    pub fn apply(&self, fields: &mut Fields, now: DateTime<Utc>) {
        for (name, value) in &self.0 {
            match value {
                FieldValue::Value(v) => {
                    fields.insert(name.clone(), v.clone());
                }
                FieldValue::Increment(by) => {
                    let current = fields.get(name).and_then(Value::as_i64).unwrap_or(0);
                    fields.insert(name.clone(), Value::from(current.saturating_add(*by)));
                }
                FieldValue::ServerTimestamp => {
                    fields.insert(name.clone(), Value::from(now.timestamp_millis()));
                }
                FieldValue::Delete => {
                    fields.remove(name);
                }
            }
        }
    }
}

impl From<Fields> for FieldUpdates {
    fn from(fields: Fields) -> Self {
        Self(
            fields
                .into_iter()
                .map(|(name, value)| (name, FieldValue::Value(value)))
                .collect(),
        )
    }
}

/// set 操作选项
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// true 时与已有字段合并，false 时整体覆盖
    pub merge: bool,
}

impl SetOptions {
    pub fn overwrite() -> Self {
        Self { merge: false }
    }

    pub fn merge() -> Self {
        Self { merge: true }
    }
}

/// 单个写操作
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// 创建文档，文档已存在时失败
    Create { path: DocumentPath, fields: Fields },
    /// 写入文档（可合并）
    Set {
        path: DocumentPath,
        fields: Fields,
        options: SetOptions,
    },
    /// 部分更新，文档不存在时失败
    Update {
        path: DocumentPath,
        updates: FieldUpdates,
    },
    /// 删除文档，文档不存在时为空操作
    Delete { path: DocumentPath },
}

impl WriteOp {
    pub fn path(&self) -> &DocumentPath {
        match self {
            WriteOp::Create { path, .. }
            | WriteOp::Set { path, .. }
            | WriteOp::Update { path, .. }
            | WriteOp::Delete { path } => path,
        }
    }
}

/// 原子批量写入
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, path: DocumentPath, fields: Fields) -> &mut Self {
        self.ops.push(WriteOp::Create { path, fields });
        self
    }

    pub fn set(&mut self, path: DocumentPath, fields: Fields, options: SetOptions) -> &mut Self {
        self.ops.push(WriteOp::Set {
            path,
            fields,
            options,
        });
        self
    }

    pub fn update(&mut self, path: DocumentPath, updates: FieldUpdates) -> &mut Self {
        self.ops.push(WriteOp::Update { path, updates });
        self
    }

    pub fn delete(&mut self, path: DocumentPath) -> &mut Self {
        self.ops.push(WriteOp::Delete { path });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}
