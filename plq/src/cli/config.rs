use crate::config::{SettingsFile, display_settings};
use crate::output::Output;
use anyhow::Result;
use paperless_search::prelude::*;
use std::path::Path;

pub fn handle(args: &super::ConfigArgs, path: &Path, output: &Output) -> Result<()> {
    match &args.command {
        super::ConfigCommands::Show => {
            let file = SettingsFile::load(path)?;
            let settings = Settings::load(&file);
            output.emit_table(&display_settings(&settings, &file))
        }
        super::ConfigCommands::Set { key, value } => {
            let key = key.0;
            let mut file = SettingsFile::load(path)?;
            let mut settings = Settings::load(&file);
            let value = SettingValue::parse(key.kind(), value)?;
            settings.set(key, value)?;
            settings.validate()?;
            // store the normalized value
            file.write(key.into(), &settings.get(key));
            file.save(path)?;
            output.emit_table(&display_settings(&settings, &file))
        }
        super::ConfigCommands::Unset { key } => {
            let mut file = SettingsFile::load(path)?;
            if file.remove(key.0) {
                file.save(path)?;
            }
            let settings = Settings::load(&file);
            output.emit_table(&display_settings(&settings, &file))
        }
        super::ConfigCommands::Reset => {
            SettingsFile::reset(path)?;
            output.emit_text("Config reset")
        }
        super::ConfigCommands::Path => output.emit_text(&path.display().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{ConfigArgs, ConfigCommands, SettingKeyArg};
    use crate::output::OutputFormat;

    fn set(key: SettingKey, value: &str) -> ConfigArgs {
        ConfigArgs {
            command: ConfigCommands::Set {
                key: SettingKeyArg(key),
                value: value.to_string(),
            },
        }
    }

    #[test]
    fn test_set_unset_reset() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("settings.json");
        let output = Output::new(OutputFormat::Quiet, None);

        handle(&set(SettingKey::InstanceUrl, "http://paperless.lan:8000/"), &path, &output)?;
        handle(&set(SettingKey::FilterByBody, "yes"), &path, &output)?;
        handle(&set(SettingKey::QueryDelay, "0"), &path, &output)?;
        let settings = Settings::load(&SettingsFile::load(&path)?);
        assert_eq!(settings.instance_url, "http://paperless.lan:8000");
        assert!(settings.filters.body);
        assert_eq!(settings.query_delay, 0);

        // rejected values leave the file unchanged
        assert!(handle(&set(SettingKey::CacheLength, "0"), &path, &output).is_err());
        assert!(handle(&set(SettingKey::AutoCache, "maybe"), &path, &output).is_err());
        assert!(handle(&set(SettingKey::InstanceUrl, "paperless.lan"), &path, &output).is_err());
        assert_eq!(Settings::load(&SettingsFile::load(&path)?), settings);

        let unset = ConfigArgs {
            command: ConfigCommands::Unset {
                key: SettingKeyArg(SettingKey::FilterByBody),
            },
        };
        handle(&unset, &path, &output)?;
        assert!(!Settings::load(&SettingsFile::load(&path)?).filters.body);

        let reset = ConfigArgs {
            command: ConfigCommands::Reset,
        };
        handle(&reset, &path, &output)?;
        assert!(!path.exists());
        Ok(())
    }
}
