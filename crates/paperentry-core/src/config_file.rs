use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub llm: Option<LlmConfig>,
    pub limits: Option<LimitsConfig>,
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_papers: Option<usize>,
    pub max_document_mb: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
}

/// Platform config directory path: `<config_dir>/paperentry/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("paperentry").join("config.toml"))
}

/// Load config by cascading CWD `.paperentry.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(".paperentry.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_llm = base.llm.unwrap_or_default();
    let over_llm = overlay.llm.unwrap_or_default();
    let base_limits = base.limits.unwrap_or_default();
    let over_limits = overlay.limits.unwrap_or_default();
    let base_server = base.server.unwrap_or_default();
    let over_server = overlay.server.unwrap_or_default();

    ConfigFile {
        llm: Some(LlmConfig {
            api_key: over_llm.api_key.or(base_llm.api_key),
            model: over_llm.model.or(base_llm.model),
            base_url: over_llm.base_url.or(base_llm.base_url),
            request_timeout_secs: over_llm
                .request_timeout_secs
                .or(base_llm.request_timeout_secs),
        }),
        limits: Some(LimitsConfig {
            max_papers: over_limits.max_papers.or(base_limits.max_papers),
            max_document_mb: over_limits.max_document_mb.or(base_limits.max_document_mb),
        }),
        server: Some(ServerConfig {
            bind: over_server.bind.or(base_server.bind),
        }),
    }
}

/// Overlay the values present in `file` onto `config`.
pub fn apply(mut config: Config, file: &ConfigFile) -> Config {
    if let Some(llm) = &file.llm {
        if let Some(key) = llm.api_key.as_ref().filter(|k| !k.is_empty()) {
            config.api_key = Some(key.clone());
        }
        if let Some(model) = &llm.model {
            config.model = model.clone();
        }
        if let Some(base_url) = &llm.base_url {
            config.base_url = base_url.clone();
        }
        if llm.request_timeout_secs.is_some() {
            config.request_timeout_secs = llm.request_timeout_secs;
        }
    }
    if let Some(limits) = &file.limits {
        // Zero limits would make every document fail; keep the current value.
        if let Some(n) = limits.max_papers.filter(|&n| n > 0) {
            config.max_papers = n;
        }
        if let Some(mb) = limits.max_document_mb.filter(|&mb| mb > 0) {
            config.max_document_mb = mb;
        }
    }
    if let Some(bind) = file.server.as_ref().and_then(|s| s.bind.clone()) {
        config.bind = bind;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_parses() {
        let toml_str = "[llm]\nmodel = \"gemini-2.5-pro\"\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        let llm = parsed.llm.unwrap();
        assert_eq!(llm.model.as_deref(), Some("gemini-2.5-pro"));
        assert!(llm.api_key.is_none());
        assert!(parsed.limits.is_none());
    }

    #[test]
    fn merge_overlay_wins() {
        let base: ConfigFile =
            toml::from_str("[llm]\nmodel = \"base\"\napi_key = \"k1\"\n[limits]\nmax_papers = 10\n")
                .unwrap();
        let overlay: ConfigFile = toml::from_str("[llm]\nmodel = \"overlay\"\n").unwrap();
        let merged = merge(base, overlay);
        let llm = merged.llm.unwrap();
        assert_eq!(llm.model.as_deref(), Some("overlay"));
        assert_eq!(llm.api_key.as_deref(), Some("k1"));
        assert_eq!(merged.limits.unwrap().max_papers, Some(10));
    }

    #[test]
    fn apply_overrides_defaults() {
        let file: ConfigFile = toml::from_str(
            "[llm]\nrequest_timeout_secs = 120\n[limits]\nmax_document_mb = 5\n[server]\nbind = \"127.0.0.1:8080\"\n",
        )
        .unwrap();
        let config = apply(Config::default(), &file);
        assert_eq!(config.request_timeout_secs, Some(120));
        assert_eq!(config.max_document_mb, 5);
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.model, crate::DEFAULT_MODEL);
    }

    #[test]
    fn empty_api_key_is_ignored() {
        let file: ConfigFile = toml::from_str("[llm]\napi_key = \"\"\n").unwrap();
        assert!(apply(Config::default(), &file).api_key.is_none());
    }

    #[test]
    fn zero_limits_are_ignored() {
        let file: ConfigFile =
            toml::from_str("[limits]\nmax_papers = 0\nmax_document_mb = 0\n").unwrap();
        let config = apply(Config::default(), &file);
        assert_eq!(config.max_papers, crate::DEFAULT_MAX_PAPERS);
        assert_eq!(config.max_document_mb, crate::DEFAULT_MAX_DOCUMENT_MB);
    }

    #[test]
    fn missing_file_is_none() {
        assert!(load_from_path(Path::new("/nonexistent/paperentry.toml")).is_none());
    }
}
