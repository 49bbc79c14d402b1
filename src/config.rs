use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

/// Shell configuration, loaded from `Lectern.toml`. A missing file is not
/// an error; every field has a default.
#[derive(Debug, Default, Deserialize)]
pub struct ShellConfig {
    /// alias -> existing root command, registered as redirects at startup
    #[serde(default)]
    pub command_aliases: HashMap<String, String>,
}

impl ShellConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(toml::from_str(&text)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no config at {}, using defaults", path.display());
                Ok(ShellConfig::default())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_parse_from_toml() {
        let config: ShellConfig = toml::from_str(
            r#"
            [command_aliases]
            tp = "teleport"
            "#,
        )
        .unwrap();
        assert_eq!(config.command_aliases["tp"], "teleport");
    }

    #[test]
    fn everything_is_optional() {
        let config: ShellConfig = toml::from_str("").unwrap();
        assert!(config.command_aliases.is_empty());
    }
}
