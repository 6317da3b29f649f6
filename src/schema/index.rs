use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Index {
    pub name: String,
    /// Non-empty, order matters for prefix matching by callers (mirrors the
    /// teacher's `has_covering_index` convention).
    pub columns: Vec<String>,
    pub unique: bool,
}

impl Index {
    pub fn new(name: impl Into<String>, columns: Vec<String>, unique: bool) -> Self {
        Self {
            name: name.into(),
            columns,
            unique,
        }
    }
}
