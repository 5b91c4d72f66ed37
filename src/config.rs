use std::{env, path::PathBuf};

/// How list pages learn about changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMode {
    /// Render from a single fetch; pages re-read after each action.
    Once,
    /// Pages additionally wait on a store subscription and reload on change.
    Live,
}

impl ListMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "once" | "one-shot" => Some(Self::Once),
            "live" | "subscribe" => Some(Self::Live),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub list_mode: ListMode,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(8080);
        let list_mode = env::var("APP_LIST_MODE")
            .ok()
            .and_then(|value| ListMode::parse(&value))
            .unwrap_or(ListMode::Once);

        Self {
            port,
            data_path: resolve_data_path(),
            list_mode,
        }
    }
}

pub fn resolve_data_path() -> PathBuf {
    if let Ok(path) = env::var("APP_DATA_PATH") {
        return PathBuf::from(path);
    }

    PathBuf::from("data/state.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_mode_accepts_aliases() {
        assert_eq!(ListMode::parse("live"), Some(ListMode::Live));
        assert_eq!(ListMode::parse(" Subscribe "), Some(ListMode::Live));
        assert_eq!(ListMode::parse("once"), Some(ListMode::Once));
        assert_eq!(ListMode::parse("sometimes"), None);
    }
}
