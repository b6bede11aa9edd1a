use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::path::DocumentPath;

/// 文档字段集合
pub type Fields = serde_json::Map<String, Value>;

/// 将实体编码为文档字段
///
/// 实体必须序列化为 JSON 对象
pub fn encode_fields<T: Serialize>(value: &T) -> Result<Fields, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(<serde_json::Error as serde::ser::Error>::custom(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// 存储中的文档
///
/// `sequence` 由存储在创建时分配，作为同一时间戳下的稳定排序依据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    path: DocumentPath,
    fields: Fields,
    sequence: u64,
    create_time: DateTime<Utc>,
    update_time: DateTime<Utc>,
}

impl Document {
    pub fn new(path: DocumentPath, fields: Fields, sequence: u64, now: DateTime<Utc>) -> Self {
        Self {
            path,
            fields,
            sequence,
            create_time: now,
            update_time: now,
        }
    }

    // Getters
    pub fn id(&self) -> &str {
        self.path.id()
    }

    pub fn path(&self) -> &DocumentPath {
        &self.path
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn create_time(&self) -> DateTime<Utc> {
        self.create_time
    }

    pub fn update_time(&self) -> DateTime<Utc> {
        self.update_time
    }

    /// 将字段解码为实体
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.fields.clone()))
    }

    // Mutations (仅存储适配器使用)
    pub(crate) fn replace_fields(&mut self, fields: Fields, now: DateTime<Utc>) {
        self.fields = fields;
        self.update_time = now;
    }

    pub(crate) fn merge_fields(&mut self, fields: Fields, now: DateTime<Utc>) {
        self.fields.extend(fields);
        self.update_time = now;
    }

    pub(crate) fn fields_mut(&mut self) -> &mut Fields {
        &mut self.fields
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.update_time = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Note {
        text: String,
        sender_id: String,
    }

    #[test]
    fn test_encode_and_decode_entity() {
        let note = Note {
            text: "hi".to_string(),
            sender_id: "u1".to_string(),
        };
        let fields = encode_fields(&note).unwrap();
        assert_eq!(fields.get("senderId"), Some(&json!("u1")));

        let path = DocumentPath::parse("notes/n1").unwrap();
        let doc = Document::new(path, fields, 1, Utc::now());
        assert_eq!(doc.id(), "n1");
        assert_eq!(doc.decode::<Note>().unwrap(), note);
    }

    #[test]
    fn test_encode_rejects_non_objects() {
        assert!(encode_fields(&42).is_err());
        assert!(encode_fields(&vec!["a"]).is_err());
    }
}
