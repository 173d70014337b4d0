//! Compatibility rewriting of stored event tags.
//!
//! Event payloads are tagged with stable dotted strings, but tag sets still
//! evolve: a module gets split out, a fact gets a better name. Rewrites run
//! on the raw stored form before type-directed deserialization, so renamed
//! history stays readable without an offline migration.

use serde_json::Value;

use crate::error::StorageError;
use crate::store::StoredEventRecord;

/// One rewrite step applied to raw stored events at read time.
pub trait EventRewrite: Send + Sync {
    /// Whether this stage applies to the given event tag.
    fn applies(&self, event_type: &str) -> bool;

    /// Rewrites the tag and/or payload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Serialization`] if the payload cannot be
    /// brought to the current shape.
    fn rewrite(&self, event_type: String, payload: Value) -> Result<(String, Value), StorageError>;
}

/// An ordered sequence of rewrite stages.
///
/// Stages run in registration order; each stage sees the output of the
/// previous one. An empty chain passes records through untouched.
#[derive(Default)]
pub struct RewriteChain {
    stages: Vec<Box<dyn EventRewrite>>,
}

impl RewriteChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage to the chain.
    #[must_use]
    pub fn with_stage(mut self, stage: impl EventRewrite + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Whether the chain has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs every applicable stage over one stored record.
    ///
    /// # Errors
    ///
    /// Propagates the first stage failure untouched.
    pub fn apply(&self, record: StoredEventRecord) -> Result<StoredEventRecord, StorageError> {
        let StoredEventRecord {
            event_id,
            entity_type,
            user_id,
            aggregate_id,
            version,
            mut event_type,
            mut payload,
            occurred_at,
        } = record;

        for stage in &self.stages {
            if stage.applies(&event_type) {
                (event_type, payload) = stage.rewrite(event_type, payload)?;
            }
        }

        Ok(StoredEventRecord {
            event_id,
            entity_type,
            user_id,
            aggregate_id,
            version,
            event_type,
            payload,
            occurred_at,
        })
    }
}

/// Renames a deprecated event tag, updating both the record's tag column and
/// the `"type"` discriminator embedded in the payload.
pub struct TagRename {
    from: String,
    to: String,
}

impl TagRename {
    /// Creates a rename from a deprecated tag to its current name.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl EventRewrite for TagRename {
    fn applies(&self, event_type: &str) -> bool {
        event_type == self.from
    }

    fn rewrite(
        &self,
        _event_type: String,
        mut payload: Value,
    ) -> Result<(String, Value), StorageError> {
        if let Some(tag) = payload.get_mut("type") {
            *tag = Value::String(self.to.clone());
        }
        Ok((self.to.clone(), payload))
    }
}
