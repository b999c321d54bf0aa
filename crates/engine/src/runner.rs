//! Command-line runner plumbing.
//!
//! Reads a [`SummonRequest`] document from a file or stdin, checks its
//! configuration and renders the resulting [`UpdateInstructions`] as JSON.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::Parser;
use summoner_domain::{DomainError, UpdateInstructions};

use crate::infrastructure::FormulaFailurePolicy;
use crate::use_cases::summon::SummonRequest;

/// Summoner Engine - resolve summon overrides from a JSON request
#[derive(Parser, Debug)]
#[command(name = "summoner-engine")]
#[command(about = "Compute the overrides a summoned creature receives from its summoner")]
pub struct Args {
    /// Request file (summoningItem, rollData, template, config); stdin when omitted
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    /// Pretty-print the output JSON
    #[arg(long)]
    pub pretty: bool,

    /// Fail when the request carries no summoning configuration
    #[arg(long)]
    pub require_config: bool,
}

/// Errors reading a request or writing the result.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Failed to read {source_name}: {source}")]
    Io {
        source_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid summon request from {source_name}: {source}")]
    InvalidRequest {
        source_name: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("Summoning configuration of '{item}' is invalid: {source}")]
    InvalidConfiguration {
        item: String,
        #[source]
        source: DomainError,
    },
    #[error("Failed to encode update instructions: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Read a request from `input`, or from stdin when `None`.
pub fn read_request(input: Option<&Path>) -> Result<SummonRequest, RunnerError> {
    match input {
        Some(path) => {
            let source_name = path.display().to_string();
            let raw = std::fs::read_to_string(path).map_err(|source| RunnerError::Io {
                source_name: source_name.clone(),
                source,
            })?;
            parse_request(&raw, &source_name)
        }
        None => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .map_err(|source| RunnerError::Io {
                    source_name: "stdin".to_string(),
                    source,
                })?;
            parse_request(&raw, "stdin")
        }
    }
}

/// Parse a request document.
pub fn parse_request(raw: &str, source_name: &str) -> Result<SummonRequest, RunnerError> {
    serde_json::from_str(raw).map_err(|source| RunnerError::InvalidRequest {
        source_name: source_name.to_string(),
        source,
    })
}

/// Check the request's configuration before it is resolved.
///
/// A malformed configuration fails under the strict policy. Otherwise it is
/// logged and resolution goes ahead, skipping whatever fields are broken.
pub fn check_request(
    request: &SummonRequest,
    policy: FormulaFailurePolicy,
) -> Result<(), RunnerError> {
    let Some(config) = &request.config else {
        return Ok(());
    };
    match config.validate() {
        Ok(()) => Ok(()),
        Err(source) if policy.is_strict() => Err(RunnerError::InvalidConfiguration {
            item: request.summoning_item.reference(),
            source,
        }),
        Err(e) => {
            tracing::warn!(
                item = %request.summoning_item.name,
                error = %e,
                "Summoning configuration has problems, affected fields will be skipped"
            );
            Ok(())
        }
    }
}

/// Encode instructions for stdout.
pub fn render(updates: &UpdateInstructions, pretty: bool) -> Result<String, RunnerError> {
    let encoded = if pretty {
        serde_json::to_string_pretty(updates)
    } else {
        serde_json::to_string(updates)
    };
    encoded.map_err(RunnerError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::io::Write;

    fn request_json() -> Value {
        json!({
            "summoningItem": {
                "id": "dQw4w9WgXcQ12345",
                "name": "Summon Undead",
                "uuid": "Actor.necro.Item.summon-undead"
            },
            "rollData": {"attributes": {"prof": 3, "spelldc": 15}},
            "template": {
                "id": "kT3mZp9LqW2xYv7B",
                "name": "Undead Spirit"
            },
            "config": {"hpFormula": "30"}
        })
    }

    #[test]
    fn test_read_request_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", request_json()).unwrap();

        let request = read_request(Some(file.path())).unwrap();
        assert_eq!(request.summoning_item.id.as_str(), "dQw4w9WgXcQ12345");
        assert_eq!(request.summoning_item.name, "Summon Undead");
        assert_eq!(request.template.name, "Undead Spirit");
        assert!(request.config.is_some());
    }

    #[test]
    fn test_read_request_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");

        let err = read_request(Some(&missing)).unwrap_err();
        assert!(matches!(err, RunnerError::Io { .. }));
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn test_parse_request_rejects_bad_document() {
        let err = parse_request("{\"rollData\": {}}", "stdin").unwrap_err();
        assert!(matches!(err, RunnerError::InvalidRequest { .. }));
        assert!(err.to_string().contains("stdin"));
    }

    #[test]
    fn test_check_request_follows_policy() {
        let mut raw = request_json();
        raw["config"] = json!({"hpFormula": "30", "acFormula": "12 +"});
        let request = parse_request(&raw.to_string(), "stdin").unwrap();

        assert!(check_request(&request, FormulaFailurePolicy::SkipField).is_ok());

        let err = check_request(&request, FormulaFailurePolicy::Strict).unwrap_err();
        match err {
            RunnerError::InvalidConfiguration { item, source } => {
                assert_eq!(item, "Actor.necro.Item.summon-undead");
                assert!(matches!(source, DomainError::Validation(_)));
            }
            other => panic!("Expected InvalidConfiguration, got {other:?}"),
        }
    }

    #[test]
    fn test_check_request_accepts_valid_or_missing_config() {
        let request = parse_request(&request_json().to_string(), "stdin").unwrap();
        assert!(check_request(&request, FormulaFailurePolicy::Strict).is_ok());

        let mut raw = request_json();
        raw["config"] = Value::Null;
        let request = parse_request(&raw.to_string(), "stdin").unwrap();
        assert!(check_request(&request, FormulaFailurePolicy::Strict).is_ok());
    }

    #[test]
    fn test_render_compact_and_pretty() {
        let mut updates = UpdateInstructions::empty();
        updates
            .actor
            .insert("system.attributes.hp.max".to_string(), json!(30));

        let compact = render(&updates, false).unwrap();
        assert_eq!(
            compact,
            r#"{"actor":{"system.attributes.hp.max":30},"embedded":{}}"#
        );

        let pretty = render(&updates, true).unwrap();
        assert!(pretty.contains('\n'));
        let back: Value = serde_json::from_str(&pretty).unwrap();
        assert_eq!(back["actor"]["system.attributes.hp.max"], json!(30));
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["summoner-engine", "--input", "req.json", "--pretty"]);
        assert_eq!(args.input, Some(PathBuf::from("req.json")));
        assert!(args.pretty);
        assert!(!args.require_config);
    }
}
