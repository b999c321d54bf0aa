//! UpdateInstructions - the only artifact a summon resolution produces.
//!
//! Actor updates are kept as flat dotted paths; embedded updates are grouped
//! by entity type and keyed by entity id (or label for synthesized effects).
//! Ordered maps keep the serialized form identical across runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RollData;
use crate::common::{expand_object, get_property, PropertyPath};
use crate::error::DomainError;
use crate::ItemId;

/// Embedded collection holding item updates.
pub const EMBEDDED_ITEM: &str = "Item";
/// Embedded collection holding synthesized active effects.
pub const EMBEDDED_ACTIVE_EFFECT: &str = "ActiveEffect";

/// Record of which summoning act produced a set of overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummonerStamp {
    /// Stable reference to the summoning item
    pub uuid: String,
    /// Roll data snapshot the overrides were computed from
    pub data: RollData,
}

impl SummonerStamp {
    pub fn new(uuid: impl Into<String>, data: RollData) -> Self {
        Self {
            uuid: uuid.into(),
            data,
        }
    }

    /// Flag path the stamp is stored under for a given flag scope.
    pub fn flag_path(scope: &str) -> Result<PropertyPath, DomainError> {
        PropertyPath::parse(&format!("flags.{}.summoner", scope))
    }

    /// Read a stamp back from a summoned actor document.
    pub fn read(document: &Value, scope: &str) -> Option<Self> {
        let path = Self::flag_path(scope).ok()?;
        let raw = get_property(document, path.as_str())?;
        serde_json::from_value(raw.clone()).ok()
    }
}

/// Property overrides for a summoned actor and its embedded documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateInstructions {
    /// Dotted property path to new value
    #[serde(default)]
    pub actor: BTreeMap<String, Value>,
    /// Entity type name to entity id/label to partial update object
    #[serde(default)]
    pub embedded: BTreeMap<String, BTreeMap<String, Value>>,
}

impl UpdateInstructions {
    /// Instructions that change nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.actor.is_empty() && self.embedded.is_empty()
    }

    /// Record an actor override.
    pub fn set_actor(&mut self, path: &PropertyPath, value: Value) {
        self.actor.insert(path.as_str().to_string(), value);
    }

    /// Record an embedded entity update.
    pub fn insert_embedded(
        &mut self,
        entity_type: &str,
        key: impl Into<String>,
        update: Value,
    ) {
        self.embedded
            .entry(entity_type.to_string())
            .or_default()
            .insert(key.into(), update);
    }

    /// All updates for one embedded entity type.
    pub fn embedded_of(&self, entity_type: &str) -> Option<&BTreeMap<String, Value>> {
        self.embedded.get(entity_type)
    }

    /// The update for one embedded item, if it changed.
    pub fn item_update(&self, id: &ItemId) -> Option<&Value> {
        self.embedded_of(EMBEDDED_ITEM)?.get(id.as_str())
    }

    /// Stamp the summoner reference under the given flag scope.
    pub fn stamp(&mut self, scope: &str, stamp: SummonerStamp) -> Result<(), DomainError> {
        let path = SummonerStamp::flag_path(scope)?;
        let value = serde_json::to_value(stamp)
            .map_err(|e| DomainError::validation(format!("Unserializable stamp: {}", e)))?;
        self.set_actor(&path, value);
        Ok(())
    }

    /// Read the summoner stamp back out of these instructions.
    pub fn summoner_stamp(&self, scope: &str) -> Option<SummonerStamp> {
        let path = SummonerStamp::flag_path(scope).ok()?;
        let raw = self.actor.get(path.as_str())?;
        serde_json::from_value(raw.clone()).ok()
    }

    /// Actor overrides expanded into a nested update document.
    pub fn actor_document(&self) -> Result<Value, DomainError> {
        expand_object(self.actor.iter().map(|(k, v)| (k.as_str(), v.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> PropertyPath {
        PropertyPath::parse(p).unwrap()
    }

    #[test]
    fn test_empty_instructions() {
        let updates = UpdateInstructions::empty();
        assert!(updates.is_empty());
        assert_eq!(
            serde_json::to_value(&updates).unwrap(),
            json!({"actor": {}, "embedded": {}})
        );
    }

    #[test]
    fn test_embedded_updates_are_grouped() {
        let id = ItemId::new();
        let mut updates = UpdateInstructions::empty();
        updates.insert_embedded(EMBEDDED_ITEM, id.to_string(), json!({"_id": id.to_string()}));
        updates.insert_embedded(EMBEDDED_ACTIVE_EFFECT, "Proficiency", json!({"label": "Proficiency"}));

        assert_eq!(updates.embedded.len(), 2);
        assert!(updates.item_update(&id).is_some());
        assert!(updates.item_update(&ItemId::new()).is_none());
        assert!(updates.embedded_of(EMBEDDED_ACTIVE_EFFECT).unwrap().contains_key("Proficiency"));
    }

    #[test]
    fn test_stamp_round_trip() {
        let mut updates = UpdateInstructions::empty();
        let stamp = SummonerStamp::new("Actor.abc.Item.def", RollData::from(json!({"attributes": {"prof": 3}})));
        updates.stamp("summoner", stamp.clone()).unwrap();

        assert!(updates.actor.contains_key("flags.summoner.summoner"));
        assert_eq!(updates.summoner_stamp("summoner"), Some(stamp));
        assert_eq!(updates.summoner_stamp("other"), None);
    }

    #[test]
    fn test_stamp_rejects_bad_scope() {
        let mut updates = UpdateInstructions::empty();
        let stamp = SummonerStamp::new("x", RollData::new());
        assert!(updates.stamp("bad scope", stamp).is_err());
        assert!(updates.is_empty());
    }

    #[test]
    fn test_actor_document_expands_paths() {
        let mut updates = UpdateInstructions::empty();
        updates.set_actor(&path("system.attributes.hp.max"), json!(15));
        updates.set_actor(&path("system.attributes.hp.value"), json!(15));
        updates
            .stamp("summoner", SummonerStamp::new("Item.x", RollData::new()))
            .unwrap();

        let document = updates.actor_document().unwrap();
        assert_eq!(document["system"]["attributes"]["hp"], json!({"max": 15, "value": 15}));
        assert_eq!(
            SummonerStamp::read(&document, "summoner").map(|s| s.uuid),
            Some("Item.x".to_string())
        );
    }
}
