//! Publish instructions
//!
//! A [`PublishInstruction`] is the queue message business handlers enqueue
//! when an entity changes:
//!
//! ```json
//! {
//!   "data": { "uid": "c1", "title": "New", "description": "..." },
//!   "publish_models": [
//!     { "topic": "board-card", "topic_id": "c1",
//!       "event": "board:card:details-changed:{uid}",
//!       "data_keys": ["uid", "title"], "custom_data": { "by": "u1" } }
//!   ]
//! }
//! ```
//!
//! `publish_models` and `data_keys` accept a single value in place of a list.
//! Only allow-listed keys of `data` reach a target; `custom_data` is always
//! sent and wins on key collision.

use crate::shared::error::SharedError;
use crate::shared::event::TopicEvent;
use crate::shared::template::{format_event_name, EventParams};
use crate::shared::topic::{Topic, TopicId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Either one value or a list of values on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// Normalize to a list.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }

    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(value) => std::slice::from_ref(value),
            OneOrMany::Many(values) => values,
        }
    }
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

/// One publish target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishModel {
    pub topic: Topic,
    pub topic_id: TopicId,
    /// Event name, optionally a template resolved against the instruction data
    pub event: String,
    /// Allow-list of `data` keys to forward (none when absent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_keys: Option<OneOrMany<String>>,
    /// Extra fields always sent to this target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Map<String, Value>>,
}

impl PublishModel {
    pub fn new(topic: Topic, topic_id: impl Into<TopicId>, event: impl Into<String>) -> Self {
        let topic_id = topic_id.into();
        Self {
            topic,
            topic_id: TopicId::for_topic(topic, topic_id.as_str()),
            event: event.into(),
            data_keys: None,
            custom_data: None,
        }
    }

    /// Target for a typed topic event.
    pub fn for_event<E: TopicEvent>(topic_id: impl Into<TopicId>, event: &E) -> Self {
        Self::new(E::TOPIC, topic_id, event.event_name())
    }

    pub fn data_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_keys = Some(OneOrMany::Many(keys.into_iter().map(Into::into).collect()));
        self
    }

    pub fn custom_data(mut self, custom: Map<String, Value>) -> Self {
        self.custom_data = Some(custom);
        self
    }

    /// Allow-listed keys, empty when none were given.
    pub fn allowed_keys(&self) -> &[String] {
        self.data_keys.as_ref().map(OneOrMany::as_slice).unwrap_or(&[])
    }

    /// Outbound payload for this target: allow-listed `data` fields plus `custom_data`.
    pub fn outbound_payload(&self, data: &Map<String, Value>) -> Map<String, Value> {
        let mut payload = Map::new();
        for key in self.allowed_keys() {
            if let Some(value) = data.get(key) {
                payload.insert(key.clone(), value.clone());
            }
        }
        if let Some(custom) = &self.custom_data {
            for (key, value) in custom {
                payload.insert(key.clone(), value.clone());
            }
        }
        payload
    }

    /// Resolve the target's event template against the instruction data.
    ///
    /// Scalar `data` and `custom_data` values are usable as parameters;
    /// `custom_data` wins on collision.
    pub fn resolve_event(&self, data: &Map<String, Value>) -> String {
        if !self.event.contains('{') {
            return self.event.clone();
        }
        let mut params = scalar_params(data);
        if let Some(custom) = &self.custom_data {
            params.extend(scalar_params(custom));
        }
        format_event_name(&self.event, &params)
    }
}

fn scalar_params(map: &Map<String, Value>) -> EventParams {
    map.iter()
        .filter_map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key.clone(), rendered))
        })
        .collect()
}

/// Queue message describing one entity change and where to broadcast it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishInstruction {
    pub data: Map<String, Value>,
    pub publish_models: OneOrMany<PublishModel>,
}

/// Result of leniently parsing a raw queue message.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedInstruction {
    pub data: Map<String, Value>,
    pub targets: Vec<PublishModel>,
    /// Targets that were present but could not be parsed
    pub skipped: usize,
}

impl PublishInstruction {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data,
            publish_models: OneOrMany::Many(Vec::new()),
        }
    }

    /// Append a target.
    pub fn target(mut self, model: PublishModel) -> Self {
        let mut models = std::mem::take(&mut self.publish_models).into_vec();
        models.push(model);
        self.publish_models = OneOrMany::Many(models);
        self
    }

    pub fn targets(&self) -> &[PublishModel] {
        self.publish_models.as_slice()
    }

    pub fn to_value(&self) -> Result<Value, SharedError> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parse a raw queue message, tolerating malformed individual targets.
    ///
    /// Fails when `data` is missing or not an object, or when
    /// `publish_models` is missing or neither an object nor an array.
    pub fn parse_lenient(message: &Value) -> Result<ParsedInstruction, SharedError> {
        let data = message
            .get("data")
            .and_then(Value::as_object)
            .cloned()
            .ok_or_else(|| SharedError::validation("data", "missing or not an object"))?;

        let raw_models: Vec<&Value> = match message.get("publish_models") {
            Some(Value::Array(models)) => models.iter().collect(),
            Some(model @ Value::Object(_)) => vec![model],
            _ => {
                return Err(SharedError::validation(
                    "publish_models",
                    "missing or not an object/array",
                ))
            }
        };

        let mut targets = Vec::with_capacity(raw_models.len());
        let mut skipped = 0;
        for raw in raw_models {
            match serde_json::from_value::<PublishModel>(raw.clone()) {
                Ok(mut model) => {
                    model.topic_id = TopicId::for_topic(model.topic, model.topic_id.as_str());
                    targets.push(model);
                }
                Err(e) => {
                    tracing::warn!("[Fanout] Skipping malformed publish target: {}", e);
                    skipped += 1;
                }
            }
        }

        Ok(ParsedInstruction {
            data,
            targets,
            skipped,
        })
    }
}
