// Store Domain - 文档路径
//
// 路径由 `/` 分隔的段组成，集合与文档交替出现：
// - 奇数段：集合路径，如 `chats/a_b/messages`
// - 偶数段：文档路径，如 `clientStatus/u1`

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 路径解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("invalid segment in path '{0}'")]
    InvalidSegment(String),

    #[error("'{0}' is not a collection path")]
    NotACollection(String),

    #[error("'{0}' is not a document path")]
    NotADocument(String),
}

fn split_segments(raw: &str) -> Result<Vec<String>, PathError> {
    let trimmed = raw.trim_matches('/');
    if trimmed.is_empty() {
        return Err(PathError::Empty);
    }

    trimmed
        .split('/')
        .map(|segment| {
            if is_valid_segment(segment) {
                Ok(segment.to_string())
            } else {
                Err(PathError::InvalidSegment(raw.to_string()))
            }
        })
        .collect()
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains('/')
        && segment.trim() == segment
}

/// 集合路径
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionPath(Vec<String>);

impl CollectionPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let segments = split_segments(raw)?;
        if segments.len() % 2 == 0 {
            return Err(PathError::NotACollection(raw.to_string()));
        }
        Ok(Self(segments))
    }

    /// 集合 ID（最后一段）
    pub fn id(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// 集合下的文档路径
    pub fn doc(&self, id: &str) -> Result<DocumentPath, PathError> {
        if !is_valid_segment(id) {
            return Err(PathError::InvalidSegment(format!("{}/{}", self, id)));
        }
        let mut segments = self.0.clone();
        segments.push(id.to_string());
        Ok(DocumentPath(segments))
    }

    /// 父文档（顶层集合没有父文档）
    pub fn parent(&self) -> Option<DocumentPath> {
        if self.0.len() < 3 {
            return None;
        }
        Some(DocumentPath(self.0[..self.0.len() - 1].to_vec()))
    }

    /// 文档是否是该集合的直接子文档
    pub fn contains(&self, document: &DocumentPath) -> bool {
        document.0.len() == self.0.len() + 1 && document.0.starts_with(&self.0)
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl TryFrom<String> for CollectionPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CollectionPath> for String {
    fn from(path: CollectionPath) -> Self {
        path.to_string()
    }
}

/// 文档路径
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentPath(Vec<String>);

impl DocumentPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let segments = split_segments(raw)?;
        if segments.len() % 2 != 0 {
            return Err(PathError::NotADocument(raw.to_string()));
        }
        Ok(Self(segments))
    }

    /// 文档 ID（最后一段）
    pub fn id(&self) -> &str {
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// 所属集合
    pub fn parent(&self) -> CollectionPath {
        CollectionPath(self.0[..self.0.len() - 1].to_vec())
    }

    /// 子集合路径
    pub fn collection(&self, name: &str) -> Result<CollectionPath, PathError> {
        if !is_valid_segment(name) {
            return Err(PathError::InvalidSegment(format!("{}/{}", self, name)));
        }
        let mut segments = self.0.clone();
        segments.push(name.to_string());
        Ok(CollectionPath(segments))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl TryFrom<String> for DocumentPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DocumentPath> for String {
    fn from(path: DocumentPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_and_document_parity() {
        assert!(CollectionPath::parse("chats/a_b/messages").is_ok());
        assert!(matches!(
            CollectionPath::parse("chats/a_b"),
            Err(PathError::NotACollection(_))
        ));
        assert!(DocumentPath::parse("clientStatus/u1").is_ok());
        assert!(matches!(
            DocumentPath::parse("clientStatus"),
            Err(PathError::NotADocument(_))
        ));
    }

    #[test]
    fn test_invalid_segments() {
        assert_eq!(CollectionPath::parse(""), Err(PathError::Empty));
        assert!(CollectionPath::parse("chats//messages").is_err());
        assert!(DocumentPath::parse("chats/..").is_err());

        let rooms = CollectionPath::parse("rooms").unwrap();
        assert!(rooms.doc("a/b").is_err());
    }

    #[test]
    fn test_navigation() {
        let messages = CollectionPath::parse("/chats/m_c/messages/").unwrap();
        assert_eq!(messages.to_string(), "chats/m_c/messages");
        assert_eq!(messages.id(), "messages");

        let doc = messages.doc("msg1").unwrap();
        assert_eq!(doc.id(), "msg1");
        assert_eq!(doc.parent(), messages);
        assert!(messages.contains(&doc));

        let chat = messages.parent().unwrap();
        assert_eq!(chat.to_string(), "chats/m_c");
        assert!(!messages.contains(&chat));
        assert!(CollectionPath::parse("chats").unwrap().parent().is_none());
    }
}
