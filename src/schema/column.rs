//! Column model, including the raw/logical type and default side-channels
//! used by the Differ to avoid false positives on dialect casing (§4.1).

use serde::{Deserialize, Serialize};

/// Raw dialect-specific type alongside the logical type used for comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeMetadata {
    /// Exactly as written/introspected, e.g. `"INT4"`, `"character varying(100)"`.
    pub raw: String,
    /// Normalized form used for comparisons, e.g. `"integer"`, `"varchar(100)"`.
    pub logical: String,
}

/// What kind of expression a column default is. Used by the Planner and
/// Safety Analyzer to decide reversibility without re-parsing the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultKind {
    Literal,
    Function,
    Sequence,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultMetadata {
    pub raw: String,
    pub kind: DefaultKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Column {
    pub name: String,
    /// Logical type string after normalization (see `type_metadata` for the
    /// raw/logical pair; this field mirrors `type_metadata.logical` when
    /// present, for callers that don't need the raw form).
    #[serde(rename = "type")]
    pub type_name: String,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    pub is_primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_metadata: Option<TypeMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_metadata: Option<DefaultMetadata>,
}

impl Column {
    /// The value the Differ compares: lowercased `type_metadata.logical` when
    /// present, else lowercased `type_name` (§4.1).
    pub fn logical_type(&self) -> String {
        match &self.type_metadata {
            Some(meta) => meta.logical.to_lowercase(),
            None => self.type_name.to_lowercase(),
        }
    }

    pub fn builder(name: impl Into<String>, type_name: impl Into<String>) -> ColumnBuilder {
        ColumnBuilder::new(name, type_name)
    }
}

/// Builder keeping `Column` construction honest about the
/// `is_primary_key ⇒ !nullable` invariant (§3) — this is the only
/// supported way to build a `Column` outside of the parser/introspector.
pub struct ColumnBuilder {
    name: String,
    type_name: String,
    nullable: bool,
    default: Option<String>,
    is_primary_key: bool,
    type_metadata: Option<TypeMetadata>,
    default_metadata: Option<DefaultMetadata>,
}

impl ColumnBuilder {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            nullable: true,
            default: None,
            is_primary_key: false,
            type_metadata: None,
            default_metadata: None,
        }
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self.nullable = false;
        self
    }

    pub fn default_expr(mut self, raw: impl Into<String>, kind: DefaultKind) -> Self {
        let raw = raw.into();
        self.default_metadata = Some(DefaultMetadata {
            raw: raw.clone(),
            kind,
        });
        self.default = Some(raw);
        self
    }

    pub fn type_metadata(mut self, raw: impl Into<String>, logical: impl Into<String>) -> Self {
        self.type_metadata = Some(TypeMetadata {
            raw: raw.into(),
            logical: logical.into(),
        });
        self
    }

    pub fn build(self) -> Column {
        Column {
            name: self.name,
            type_name: self.type_name,
            nullable: self.nullable && !self.is_primary_key,
            default: self.default,
            is_primary_key: self.is_primary_key,
            type_metadata: self.type_metadata,
            default_metadata: self.default_metadata,
        }
    }
}
