//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use seasapper_game::GameConfig;
use seasapper_room::RoomConfig;

use crate::ServerError;

/// Environment variable holding the listen address.
pub const ADDR_VAR: &str = "SEASAPPER_ADDR";

/// Environment variable holding the path of a JSON rules file.
pub const CONFIG_VAR: &str = "SEASAPPER_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to.
    pub addr: String,

    /// Settings for every room the server creates.
    pub room: RoomConfig,

    /// How often idle rooms are swept from the registry.
    pub sweep_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:3000".to_owned(),
            room: RoomConfig::default(),
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl ServerConfig {
    /// Reads `SEASAPPER_ADDR` and `SEASAPPER_CONFIG` from the process
    /// environment. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`Self::from_env`], with variables resolved by `lookup`.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ServerError> {
        let mut config = Self::default();
        if let Some(addr) = lookup(ADDR_VAR).filter(|a| !a.trim().is_empty()) {
            config.addr = addr.trim().to_owned();
        }
        if let Some(path) = lookup(CONFIG_VAR).filter(|p| !p.trim().is_empty()) {
            config.room.rules = load_rules(PathBuf::from(path.trim()))?;
        }
        Ok(config)
    }
}

/// Parses a [`GameConfig`] from a JSON file and checks it is playable.
/// Missing fields take their defaults.
pub fn load_rules(path: PathBuf) -> Result<GameConfig, ServerError> {
    let text = std::fs::read_to_string(&path).map_err(|source| {
        ServerError::ConfigRead {
            path: path.clone(),
            source,
        }
    })?;
    let rules: GameConfig = serde_json::from_str(&text)
        .map_err(|source| ServerError::ConfigParse { path: path.clone(), source })?;
    rules
        .validate()
        .map_err(|source| ServerError::ConfigInvalid { path: path.clone(), source })?;
    tracing::info!(path = %path.display(), "loaded rules file");
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use seasapper_game::ConfigError;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "seasapper-{}-{name}",
            std::process::id()
        ));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_default_config_values() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, "0.0.0.0:3000");
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert_eq!(config.room, RoomConfig::default());
    }

    #[test]
    fn test_from_lookup_nothing_set_uses_defaults() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_from_lookup_reads_addr() {
        let config = ServerConfig::from_lookup(|key| {
            (key == ADDR_VAR).then(|| " 127.0.0.1:4000 ".to_owned())
        })
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:4000");
    }

    #[test]
    fn test_from_lookup_partial_rules_file_merges_defaults() {
        let path = temp_file("rules.json", r#"{"mine_count": 5, "max_lives": 4}"#);
        let value = path.to_string_lossy().into_owned();
        let config = ServerConfig::from_lookup(|key| {
            (key == CONFIG_VAR).then(|| value.clone())
        })
        .unwrap();
        assert_eq!(config.room.rules.mine_count, 5);
        assert_eq!(config.room.rules.max_lives, 4);
        assert_eq!(config.room.rules.board_size, 10);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_from_lookup_bad_rules_file_rejected() {
        let path = temp_file("broken.json", "{ not json");
        let value = path.to_string_lossy().into_owned();
        let err = ServerConfig::from_lookup(|key| {
            (key == CONFIG_VAR).then(|| value.clone())
        })
        .unwrap_err();
        assert!(matches!(err, ServerError::ConfigParse { .. }));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_rules_zero_board_rejected() {
        let path = temp_file("zero-board.json", r#"{"board_size": 0}"#);
        let err = load_rules(path.clone()).unwrap_err();
        assert!(matches!(
            err,
            ServerError::ConfigInvalid { source: ConfigError::BoardSize { actual: 0, .. }, .. }
        ));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_rules_duplicate_ship_size_rejected() {
        let path = temp_file(
            "dup-size.json",
            r#"{"fleet": [{"size": 2, "count": 1}, {"size": 2, "count": 1}]}"#,
        );
        let err = load_rules(path.clone()).unwrap_err();
        assert!(matches!(
            err,
            ServerError::ConfigInvalid { source: ConfigError::DuplicateShipSize(2), .. }
        ));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_load_rules_missing_file_rejected() {
        let err = load_rules(PathBuf::from("/nonexistent/seasapper.json")).unwrap_err();
        assert!(matches!(err, ServerError::ConfigRead { .. }));
    }
}
