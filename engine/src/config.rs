//! Reading attack contexts from JSON or YAML text.

use std::fmt;
use std::path::Path;

use crate::error::EngineError;
use crate::profile::AttackContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextFormat {
    Json,
    Yaml,
}

impl ContextFormat {
    /// `.yaml`/`.yml` are YAML; anything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

impl fmt::Display for ContextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("JSON"),
            Self::Yaml => f.write_str("YAML"),
        }
    }
}

pub fn parse_context(text: &str, format: ContextFormat) -> Result<AttackContext, EngineError> {
    let parsed = match format {
        ContextFormat::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        ContextFormat::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|message| EngineError::Config { format, message })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::DefenseColor;
    use crate::profile::{AttackType, CoverCategory};

    #[test]
    fn yaml_fills_optional_fields() {
        let text = "
attacker:
  red: 3
  surge: hit
defender:
  die: white
  surge: blank
  cover: light
attack_type: ranged
";
        let ctx = parse_context(text, ContextFormat::Yaml).expect("parses");
        assert_eq!(ctx.attacker.red, 3);
        assert_eq!(ctx.attacker.aim, 0);
        assert_eq!(ctx.defender.die, DefenseColor::White);
        assert_eq!(ctx.defender.cover, CoverCategory::Light);
        assert_eq!(ctx.defender.miniatures, 1);
        assert_eq!(ctx.attack_type, AttackType::Ranged);
        assert!(ctx.defender.guardian.is_none());
    }

    #[test]
    fn missing_die_colour_is_rejected() {
        let text = r#"{
            "attacker": { "red": 1, "surge": "blank" },
            "defender": { "surge": "block" },
            "attack_type": "all"
        }"#;
        let err = parse_context(text, ContextFormat::Json).unwrap_err();
        assert!(matches!(err, EngineError::Config { format: ContextFormat::Json, .. }));
    }

    #[test]
    fn negative_counts_are_rejected() {
        let text = r#"{
            "attacker": { "red": -1, "surge": "blank" },
            "defender": { "die": "red", "surge": "block" },
            "attack_type": "all"
        }"#;
        assert!(parse_context(text, ContextFormat::Json).is_err());
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ContextFormat::from_path(Path::new("a.YML")), ContextFormat::Yaml);
        assert_eq!(ContextFormat::from_path(Path::new("a.json")), ContextFormat::Json);
        assert_eq!(ContextFormat::from_path(Path::new("a")), ContextFormat::Json);
    }
}
