use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::editor::Session;
use crate::error::ConfigFileError;
use crate::types::{AutomationConfig, BrowserbaseConfig};

pub const DEFAULT_FILE: &str = "browserbase-config.json";

/// On-disk shape of a saved session. Either key may be missing on import.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_config: Option<AutomationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browserbase_config: Option<BrowserbaseConfig>,
}

/// Where an export lands when no path is given: the user's download directory
/// if there is one, otherwise the working directory.
pub fn default_export_path() -> PathBuf {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_FILE)
}

pub fn export(session: &Session) -> Result<String, ConfigFileError> {
    let file = ConfigFile {
        automation_config: Some(session.config.clone()),
        browserbase_config: Some(session.browserbase.clone()),
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

/// Apply whichever keys `text` carries. Nothing changes if it fails to parse
/// or repeats an action id.
pub fn import(session: &mut Session, text: &str) -> Result<(), ConfigFileError> {
    let file: ConfigFile = serde_json::from_str(text)?;
    if let Some(config) = &file.automation_config {
        let mut seen = HashSet::new();
        if let Some(dup) = config.actions.iter().find(|a| !seen.insert(a.id.as_str())) {
            return Err(ConfigFileError::DuplicateId(dup.id.clone()));
        }
    }
    if let Some(config) = file.automation_config {
        session.apply_template(config);
    }
    if let Some(credentials) = file.browserbase_config {
        session.browserbase = credentials;
    }
    Ok(())
}

pub fn save(session: &Session, path: &Path) -> Result<(), ConfigFileError> {
    let text = export(session)?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    file.write_all(text.as_bytes())?;
    info!(path = %path.display(), actions = session.actions().len(), "configuration saved");
    Ok(())
}

pub fn load(session: &mut Session, path: &Path) -> Result<(), ConfigFileError> {
    let text = std::fs::read_to_string(path)?;
    import(session, &text)?;
    info!(path = %path.display(), "configuration loaded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::types::ActionType;

    fn populated() -> Session {
        let mut s = Session::with_ids(Box::new(SequentialIds::new()));
        s.config.url = "https://example.com/login".into();
        s.browserbase.api_key = "key".into();
        s.browserbase.project_id = "proj".into();
        s.add(ActionType::FillInput);
        s.add(ActionType::Wait);
        s
    }

    #[test]
    fn export_then_import_round_trips() {
        let source = populated();
        let text = export(&source).unwrap();

        let mut target = Session::new();
        import(&mut target, &text).unwrap();
        assert_eq!(target.config, source.config);
        assert_eq!(target.browserbase, source.browserbase);

        let again: serde_json::Value = serde_json::from_str(&export(&target).unwrap()).unwrap();
        let first: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(again, first);
    }

    #[test]
    fn malformed_json_leaves_state_alone() {
        let mut s = populated();
        let before = s.config.clone();
        let err = import(&mut s, "{ not json").unwrap_err();
        assert!(matches!(err, ConfigFileError::Parse(_)));
        assert_eq!(s.config, before);
        assert_eq!(s.browserbase.api_key, "key");
    }

    #[test]
    fn repeated_action_ids_are_rejected() {
        let mut s = populated();
        let before = s.config.clone();
        let text = r#"{
            "automation_config": {
                "url": "https://x.io",
                "actions": [
                    { "id": "a", "action_type": "click_button" },
                    { "id": "a", "action_type": "hover" }
                ]
            },
            "browserbase_config": { "api_key": "other", "project_id": "p" }
        }"#;
        let err = import(&mut s, text).unwrap_err();
        assert!(matches!(err, ConfigFileError::DuplicateId(ref id) if id == "a"));
        assert_eq!(s.config, before);
        assert_eq!(s.browserbase.api_key, "key");
    }

    #[test]
    fn partial_file_only_touches_present_key() {
        let mut s = populated();
        let before = s.config.clone();
        import(
            &mut s,
            r#"{"browserbase_config":{"api_key":"new","project_id":"p2"}}"#,
        )
        .unwrap();
        assert_eq!(s.config, before);
        assert_eq!(s.browserbase.api_key, "new");
    }
}
