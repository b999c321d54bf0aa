//! Actor template - the creature about to be summoned

use serde::{Deserialize, Serialize};

use super::ItemDescriptor;
use crate::value_objects::RollData;
use summoner_domain::{ActorId, ItemId};

/// Read-only template of the actor a summoning creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorTemplate {
    pub id: ActorId,
    pub name: String,
    /// The template's own computed attributes
    #[serde(default)]
    pub roll_data: RollData,
    /// Embedded items, in sheet order
    #[serde(default)]
    pub items: Vec<ItemDescriptor>,
}

impl ActorTemplate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(),
            name: name.into(),
            roll_data: RollData::new(),
            items: Vec::new(),
        }
    }

    pub fn with_roll_data(mut self, roll_data: RollData) -> Self {
        self.roll_data = roll_data;
        self
    }

    pub fn with_item(mut self, item: ItemDescriptor) -> Self {
        self.items.push(item);
        self
    }

    /// Look up an embedded item by id.
    pub fn item(&self, id: &ItemId) -> Option<&ItemDescriptor> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Items that attack or force a save.
    pub fn matchable_items(&self) -> impl Iterator<Item = &ItemDescriptor> {
        self.items.iter().filter(|item| item.is_matchable())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_and_lookup() {
        let bite = ItemDescriptor::new("Bite").with_attack(["@mod", "@prof"]);
        let bite_id = bite.id.clone();
        let template = ActorTemplate::new("Wolf")
            .with_roll_data(RollData::from(json!({"attributes": {"prof": 2}})))
            .with_item(bite)
            .with_item(ItemDescriptor::new("Keen Hearing"));

        assert_eq!(template.items.len(), 2);
        assert_eq!(template.item(&bite_id).map(|i| i.name.as_str()), Some("Bite"));
        assert_eq!(template.matchable_items().count(), 1);
        assert_eq!(template.roll_data.proficiency(), 2.0);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let template: ActorTemplate = serde_json::from_value(json!({
            "id": "kT3mZp9LqW2xYv7B",
            "name": "Spirit"
        }))
        .unwrap();
        assert_eq!(template.id, ActorId::from("kT3mZp9LqW2xYv7B"));
        assert!(template.items.is_empty());
        assert_eq!(template.roll_data, RollData::new());
    }
}
