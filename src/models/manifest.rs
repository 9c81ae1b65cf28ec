use serde::{Deserialize, Serialize};

/// The remote module catalog.
///
/// `version` is a dot-separated release string compared numerically by
/// component (see [`crate::version::ReleaseVersion`]). `modules` keeps
/// manifest order; the dispatcher iterates it in sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    #[serde(default)]
    pub modules: Vec<ModuleDescriptor>,
}

impl Manifest {
    /// Find a descriptor by id. First match wins when ids are duplicated.
    pub fn module(&self, id: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.id == id)
    }
}

/// One entry in the manifest.
///
/// `match` patterns use `*` as a greedy any-character wildcard anchored to
/// the full page URL; an empty list matches every page. `file` is the
/// remote payload path relative to the configured base URL, empty when the
/// module takes no payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub file: String,
    #[serde(default, rename = "match")]
    pub match_patterns: Vec<String>,
    #[serde(rename = "type", default)]
    pub module_type: ModuleType,
    #[serde(rename = "autoRun", default = "default_true")]
    pub auto_run: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// How a module is activated.
///
/// - `Screening`: runs automatically on every matching page.
/// - `Utility`: runs only when explicitly toggled on; the toggle state is
///   persisted across page loads.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    #[default]
    Screening,
    Utility,
}

impl ModuleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Screening => "screening",
            Self::Utility => "utility",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "screening" => Some(Self::Screening),
            "utility" => Some(Self::Utility),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_defaults_apply() {
        let json = r#"{"id": "m1"}"#;
        let m: ModuleDescriptor = serde_json::from_str(json).unwrap();
        assert!(m.enabled);
        assert!(m.auto_run);
        assert!(m.match_patterns.is_empty());
        assert_eq!(m.module_type, ModuleType::Screening);
    }

    #[test]
    fn descriptor_reads_wire_field_names() {
        let json = r#"{
            "id": "converter-tool",
            "name": "Converter",
            "type": "utility",
            "autoRun": false,
            "match": ["https://site.test/*"],
            "enabled": false
        }"#;
        let m: ModuleDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(m.module_type, ModuleType::Utility);
        assert!(!m.auto_run);
        assert!(!m.enabled);
        assert_eq!(m.match_patterns, vec!["https://site.test/*"]);
    }

    #[test]
    fn manifest_lookup_returns_first_duplicate() {
        let manifest = Manifest {
            version: "1.0.0".to_string(),
            modules: vec![
                ModuleDescriptor {
                    id: "dup".to_string(),
                    name: "first".to_string(),
                    ..blank()
                },
                ModuleDescriptor {
                    id: "dup".to_string(),
                    name: "second".to_string(),
                    ..blank()
                },
            ],
        };
        assert_eq!(manifest.module("dup").unwrap().name, "first");
    }

    fn blank() -> ModuleDescriptor {
        serde_json::from_str(r#"{"id": ""}"#).unwrap()
    }
}
