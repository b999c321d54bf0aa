//! Shared fixtures for end-to-end summon tests.

use std::collections::HashMap;

use serde_json::{json, Value};
use summoner_domain::{RulesRegistry, UpdateInstructions};

use crate::infrastructure::ResolverSettings;
use crate::runner;
use crate::use_cases::summon::SummonResolver;

pub const DRUID_ITEM_ID: &str = "dQw4w9WgXcQ12345";
pub const SPIRIT_ID: &str = "Jx8rT2vNq5LmZ0aB";
pub const BITE_ID: &str = "mAuL3kq9ZtR7wP1e";
pub const FLYBY_ID: &str = "fLyBy8hG4sD2nK6c";
pub const HOWL_ID: &str = "hOwL5jV1xQ9bY3uT";

/// A level 9 druid casting Summon Beast: wis +4, prof +4, spell DC 16.
///
/// The spell names no ability; the host has already resolved its `@mod` to
/// the druid's spellcasting modifier.
pub fn summon_beast_request(config: Value) -> Value {
    json!({
        "summoningItem": {
            "id": DRUID_ITEM_ID,
            "name": "Summon Beast",
            "uuid": "Actor.druid.Item.summon-beast",
            "hasAttack": true,
            "attackParts": ["@mod", "@prof"],
            "data": {"level": 3}
        },
        "rollData": {
            "abilities": {
                "wis": {"value": 18, "mod": 4},
                "con": {"value": 14, "mod": 2}
            },
            "attributes": {"prof": 4, "spelldc": 16, "spellcasting": "wis"},
            "item": {"level": 3, "save": {"dc": null}},
            "details": {"level": 9},
            "mod": 4,
            "prof": 4
        },
        "template": {
            "id": SPIRIT_ID,
            "name": "Bestial Spirit",
            "rollData": {
                "abilities": {
                    "str": {"value": 18, "mod": 4},
                    "dex": {"value": 11, "mod": 0}
                },
                "attributes": {"prof": 2}
            },
            "items": [
                {
                    "id": BITE_ID,
                    "name": "Maul",
                    "hasAttack": true,
                    "attackParts": ["@mod", "@prof"],
                    "ability": "str"
                },
                {
                    "id": FLYBY_ID,
                    "name": "Flyby"
                },
                {
                    "id": HOWL_ID,
                    "name": "Frightful Howl",
                    "hasSave": true,
                    "ability": "wis"
                }
            ]
        },
        "config": config
    })
}

/// Settings built from `SUMMONER_*` style variables.
pub fn settings_from(vars: &[(&str, &str)]) -> ResolverSettings {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    ResolverSettings::from_lookup(|key| vars.get(key).cloned())
}

/// Run a request document through the same steps as the binary and return
/// the rendered JSON.
pub fn run_request(request: &Value, settings: ResolverSettings) -> anyhow::Result<Value> {
    let resolver = SummonResolver::from_registry(&RulesRegistry::new(), settings)?;
    let request = runner::parse_request(&request.to_string(), "test")?;
    runner::check_request(&request, resolver.settings().formula_failure_policy)?;
    let updates = resolver.resolve(&request)?;
    let rendered = runner::render(&updates, false)?;

    let read_back: UpdateInstructions = serde_json::from_str(&rendered)?;
    assert_eq!(read_back, updates, "rendered output should read back unchanged");

    Ok(serde_json::from_str(&rendered)?)
}
