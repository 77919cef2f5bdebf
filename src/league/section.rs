use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use super::bot_config::BotConfig;
use super::validation::FieldError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    General,
    Matchmaking,
    MmrSystem,
    SeasonManagement,
    MatchRules,
    Notifications,
    Integrations,
    DataManagement,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::General,
        Section::Matchmaking,
        Section::MmrSystem,
        Section::SeasonManagement,
        Section::MatchRules,
        Section::Notifications,
        Section::Integrations,
        Section::DataManagement,
    ];

    /// Key used in the document, the REST path and the storage row.
    pub fn key(self) -> &'static str {
        match self {
            Section::General => "general",
            Section::Matchmaking => "matchmaking",
            Section::MmrSystem => "mmrSystem",
            Section::SeasonManagement => "seasonManagement",
            Section::MatchRules => "matchRules",
            Section::Notifications => "notifications",
            Section::Integrations => "integrations",
            Section::DataManagement => "dataManagement",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown config section `{0}`")]
pub struct UnknownSection(pub String);

impl FromStr for Section {
    type Err = UnknownSection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.key() == s)
            .ok_or_else(|| UnknownSection(s.to_string()))
    }
}

/// Applies a partial section payload to `config`.
///
/// Every key of the patch is type-checked on its own against the current
/// section, so a payload with several malformed fields reports all of them.
/// Range and cross-field rules are left to [`BotConfig::check_section`].
pub fn apply_patch(config: &BotConfig, section: Section, patch: &Value) -> Result<BotConfig, Vec<FieldError>> {
    let Some(fields) = patch.as_object() else {
        return Err(vec![FieldError::new(
            section.key(),
            "type",
            "section payload must be a JSON object",
        )]);
    };

    let current = current_fields(config, section)?;
    let mut errors = Vec::new();

    for (key, value) in fields {
        let mut candidate = current.clone();
        candidate.insert(key.clone(), value.clone());

        let mut probe = config.clone();
        if let Err(e) = probe.replace_section(section, Value::Object(candidate)) {
            errors.push(decode_error(section, key, &e));
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut merged = current;
    merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));

    let mut updated = config.clone();
    updated
        .replace_section(section, Value::Object(merged))
        .map_err(|e| vec![FieldError::new(section.key(), "type", e.to_string())])?;
    updated.normalize();
    Ok(updated)
}

fn current_fields(config: &BotConfig, section: Section) -> Result<Map<String, Value>, Vec<FieldError>> {
    match config.section_value(section) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(vec![FieldError::new(section.key(), "internal", "stored section is not an object")]),
        Err(e) => Err(vec![FieldError::new(section.key(), "internal", e.to_string())]),
    }
}

fn decode_error(section: Section, key: &str, error: &serde_json::Error) -> FieldError {
    let message = error.to_string();
    let code = if message.starts_with("unknown field") {
        "unknown_field"
    } else {
        "type"
    };
    FieldError::new(format!("{}.{}", section.key(), key), code, message)
}
