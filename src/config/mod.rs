mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./segforge.toml", "~/.config/segforge/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.assembly.framerate == 0 {
        anyhow::bail!("Assembly framerate cannot be 0");
    }

    if config.assembly.prefix_sample == 0 {
        anyhow::bail!("Assembly prefix_sample cannot be 0");
    }

    if config.http.user_agent.trim().is_empty() {
        tracing::warn!("Empty user agent; some servers reject such requests");
    }

    if let Some(ref ffmpeg) = config.tools.ffmpeg_path {
        if !ffmpeg.exists() {
            tracing::warn!("Configured ffmpeg path does not exist: {:?}", ffmpeg);
        }
    }

    if config.validation.decode_probe && !config.validation.enabled {
        tracing::warn!("decode_probe has no effect while validation is disabled");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.http.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.http.connect_timeout_secs, 30);
        assert_eq!(config.http.retries, 0);
        assert!(config.validation.enabled);
        assert!(!config.validation.decode_probe);
        assert_eq!(config.validation.probe_timeout_secs, 5);
        assert_eq!(config.assembly.framerate, 30);
        assert_eq!(config.assembly.min_output_bytes, 1024);
        assert!(config.tools.ffmpeg_path.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[http]\nreferer = \"https://site.example/\"\nretries = 2\n\n[assembly]\nframerate = 25\nstrict = true"
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.http.referer.as_deref(), Some("https://site.example/"));
        assert_eq!(config.http.retries, 2);
        assert_eq!(config.http.request_timeout_secs, 120);
        assert_eq!(config.assembly.framerate, 25);
        assert!(config.assembly.strict);
        assert_eq!(config.assembly.prefix_sample, 100);
        assert_eq!(config.validation.min_image_bytes, 512);
    }

    #[test]
    fn zero_framerate_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[assembly]\nframerate = 0").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("framerate"));
    }

    #[test]
    fn malformed_file_names_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[http\nretries = ").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config_or_default(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn options_mirror_assembly_section() {
        let assembly = AssemblyConfig {
            framerate: 24,
            strict: true,
            ..AssemblyConfig::default()
        };
        let options = assembly.to_options();
        assert_eq!(options.framerate, 24);
        assert!(options.strict);
        assert_eq!(options.min_output_bytes, 1024);
    }
}
