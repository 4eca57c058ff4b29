use std::{env, path::PathBuf};

pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// Where host script calls are POSTed. Without it the diagnostic sink is used.
    pub host_callback_url: Option<String>,
    /// Replacement page template.
    pub template_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            host_callback_url: None,
            template_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let present = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            port: present("PORT")
                .and_then(|value| value.trim().parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
            host_callback_url: present("HOST_CALLBACK_URL"),
            template_path: present("PROFILE_VIEW_TEMPLATE").map(PathBuf::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn reads_known_keys() {
        let vars = HashMap::from([
            ("PORT", "9191"),
            ("HOST_CALLBACK_URL", "http://127.0.0.1:7000/script"),
            ("PROFILE_VIEW_TEMPLATE", "/tmp/page.html"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|value| value.to_string()));
        assert_eq!(config.port, 9191);
        assert_eq!(
            config.host_callback_url.as_deref(),
            Some("http://127.0.0.1:7000/script")
        );
        assert_eq!(config.template_path, Some(PathBuf::from("/tmp/page.html")));
    }

    #[test]
    fn falls_back_on_missing_or_bad_values() {
        let vars = HashMap::from([("PORT", "eighty"), ("HOST_CALLBACK_URL", "  ")]);
        let config = Config::from_lookup(|key| vars.get(key).map(|value| value.to_string()));
        assert_eq!(config, Config::default());
    }
}
