//! Client entities
//!
//! Entities are plain structs with a closed field enum. Patches address
//! fields through that enum, so there is no string-keyed reflection past the
//! JSON boundary in [`EntityPatch::from_map`].

use crate::shared::SharedError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::hash::Hash;

/// Closed set of patchable fields of one entity kind.
pub trait EntityField: Copy + Eq + Hash + Debug + 'static {
    const ALL: &'static [Self];

    /// Wire name of the field
    fn name(self) -> &'static str;

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|field| field.name() == name)
    }
}

/// A uid-addressed entity with a monotonic version.
pub trait Entity: Clone + Debug + 'static {
    type Field: EntityField;

    /// Kind name used in logs and errors
    const KIND: &'static str;

    /// Empty entity for `uid`, before any field is known.
    fn new(uid: &str) -> Self;

    fn uid(&self) -> &str;

    fn version(&self) -> u64;

    fn set_version(&mut self, version: u64);

    fn field(&self, field: Self::Field) -> Value;

    /// Set one field. Values of the wrong JSON type are rejected.
    fn set_field(&mut self, field: Self::Field, value: Value) -> Result<(), SharedError>;
}

fn decode<T: DeserializeOwned>(field: impl EntityField, value: Value) -> Result<T, SharedError> {
    serde_json::from_value(value).map_err(|e| SharedError::validation(field.name(), e.to_string()))
}

/// Partial update of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPatch<F> {
    pub uid: String,
    /// Version the sender observed after the change, if known
    pub version: Option<u64>,
    pub values: Vec<(F, Value)>,
}

impl<F: EntityField> EntityPatch<F> {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            version: None,
            values: Vec::new(),
        }
    }

    pub fn set(mut self, field: F, value: impl Into<Value>) -> Self {
        self.values.push((field, value.into()));
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn fields(&self) -> Vec<F> {
        self.values.iter().map(|(field, _)| *field).collect()
    }

    /// Build a patch from a broadcast payload carrying its own `uid`.
    pub fn from_map(map: &Map<String, Value>) -> Result<Self, SharedError> {
        let uid = map
            .get("uid")
            .and_then(Value::as_str)
            .ok_or_else(|| SharedError::validation("uid", "missing or not a string"))?;
        Ok(Self::for_uid(uid, map))
    }

    /// Build a patch for `uid` from a payload that may omit it.
    ///
    /// `uid` and `version` are read as metadata; keys that are not fields of
    /// the entity are ignored.
    pub fn for_uid(uid: impl Into<String>, map: &Map<String, Value>) -> Self {
        let mut patch = Self::new(uid);
        patch.version = map.get("version").and_then(Value::as_u64);

        for (key, value) in map {
            if key == "uid" || key == "version" {
                continue;
            }
            match F::from_name(key) {
                Some(field) => patch.values.push((field, value.clone())),
                None => tracing::trace!("[Client] Ignoring unknown key '{}' in patch", key),
            }
        }
        patch
    }

    /// Field values as a JSON object keyed by wire name.
    pub fn to_map(&self) -> Map<String, Value> {
        self.values
            .iter()
            .map(|(field, value)| (field.name().to_string(), value.clone()))
            .collect()
    }
}

/// Board card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub uid: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub column_uid: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub archived: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CardField {
    Title,
    Description,
    ColumnUid,
    Order,
    Archived,
}

impl EntityField for CardField {
    const ALL: &'static [Self] = &[
        CardField::Title,
        CardField::Description,
        CardField::ColumnUid,
        CardField::Order,
        CardField::Archived,
    ];

    fn name(self) -> &'static str {
        match self {
            CardField::Title => "title",
            CardField::Description => "description",
            CardField::ColumnUid => "column_uid",
            CardField::Order => "order",
            CardField::Archived => "archived",
        }
    }
}

impl Entity for Card {
    type Field = CardField;
    const KIND: &'static str = "card";

    fn new(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            ..Self::default()
        }
    }

    fn uid(&self) -> &str {
        &self.uid
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn field(&self, field: CardField) -> Value {
        match field {
            CardField::Title => Value::from(self.title.clone()),
            CardField::Description => Value::from(self.description.clone()),
            CardField::ColumnUid => self.column_uid.clone().map(Value::from).unwrap_or(Value::Null),
            CardField::Order => Value::from(self.order),
            CardField::Archived => Value::from(self.archived),
        }
    }

    fn set_field(&mut self, field: CardField, value: Value) -> Result<(), SharedError> {
        match field {
            CardField::Title => self.title = decode(field, value)?,
            CardField::Description => self.description = decode(field, value)?,
            CardField::ColumnUid => self.column_uid = decode(field, value)?,
            CardField::Order => self.order = decode(field, value)?,
            CardField::Archived => self.archived = decode(field, value)?,
        }
        Ok(())
    }
}

/// Board wiki page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wiki {
    pub uid: String,
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub is_public: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WikiField {
    Title,
    Content,
    IsPublic,
}

impl EntityField for WikiField {
    const ALL: &'static [Self] = &[WikiField::Title, WikiField::Content, WikiField::IsPublic];

    fn name(self) -> &'static str {
        match self {
            WikiField::Title => "title",
            WikiField::Content => "content",
            WikiField::IsPublic => "is_public",
        }
    }
}

impl Entity for Wiki {
    type Field = WikiField;
    const KIND: &'static str = "wiki";

    fn new(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            ..Self::default()
        }
    }

    fn uid(&self) -> &str {
        &self.uid
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    fn field(&self, field: WikiField) -> Value {
        match field {
            WikiField::Title => Value::from(self.title.clone()),
            WikiField::Content => Value::from(self.content.clone()),
            WikiField::IsPublic => Value::from(self.is_public),
        }
    }

    fn set_field(&mut self, field: WikiField, value: Value) -> Result<(), SharedError> {
        match field {
            WikiField::Title => self.title = decode(field, value)?,
            WikiField::Content => self.content = decode(field, value)?,
            WikiField::IsPublic => self.is_public = decode(field, value)?,
        }
        Ok(())
    }
}
