use std::path::Path;

use crate::settings::{get_config_path, save_settings_to, PlaygroundSettings};

use super::{CommandOutput, ExitStatus};

/// Print the effective settings, optionally persisting them
pub async fn show_config(
    settings: &PlaygroundSettings,
    config_path: Option<&Path>,
    save: bool,
) -> Result<CommandOutput, String> {
    let mut out = CommandOutput::default();

    if let Err(e) = settings.validate() {
        out.push_stderr(&format!("❌ {}", e));
        out.status = ExitStatus::Invalid;
        return Ok(out);
    }

    let rendered = serde_json::to_string_pretty(settings)
        .map_err(|e| format!("Failed to serialize settings: {}", e))?;
    out.push_stdout(&rendered);

    if save {
        let path = config_path.map(Path::to_path_buf).unwrap_or_else(get_config_path);
        save_settings_to(settings, &path)
            .await
            .map_err(|e| e.to_string())?;
        out.push_stderr(&format!("Settings saved to {}", path.display()));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::load_settings_from;

    #[tokio::test]
    async fn test_show_without_save() {
        let out = show_config(&PlaygroundSettings::default(), None, false)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out.stdout).unwrap();
        assert_eq!(value["run_timeout_ms"], 30_000);
        assert!(out.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_save_to_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut settings = PlaygroundSettings::default();
        settings.repl_timeout_ms = 2_500;

        let out = show_config(&settings, Some(path.as_path()), true).await.unwrap();
        assert!(out.stderr.starts_with("Settings saved to"));
        assert_eq!(load_settings_from(&path).await.repl_timeout_ms, 2_500);
    }

    #[tokio::test]
    async fn test_invalid_settings_are_rejected() {
        let mut settings = PlaygroundSettings::default();
        settings.preserved_bindings = vec!["not-valid".to_string()];
        let out = show_config(&settings, None, true).await.unwrap();
        assert_eq!(out.status, ExitStatus::Invalid);
    }
}
