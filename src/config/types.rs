use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub assembly: AssemblyConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// User-Agent sent with every segment request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Referer header; defaults to the origin of the first segment URL
    #[serde(default)]
    pub referer: Option<String>,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout, body included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Extra attempts per segment after the first failure
    #[serde(default)]
    pub retries: u32,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    120
}

fn default_retry_delay() -> u64 {
    500
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            referer: None,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
            retries: 0,
            retry_delay_ms: default_retry_delay(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Run ffmpeg over every segment after the static checks
    #[serde(default)]
    pub decode_probe: bool,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    #[serde(default = "default_min_image_bytes")]
    pub min_image_bytes: u64,

    #[serde(default = "default_min_transport_bytes")]
    pub min_transport_bytes: u64,
}

fn default_true() -> bool {
    true
}

fn default_probe_timeout() -> u64 {
    5
}

fn default_min_image_bytes() -> u64 {
    512
}

fn default_min_transport_bytes() -> u64 {
    188
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            decode_probe: false,
            probe_timeout_secs: default_probe_timeout(),
            min_image_bytes: default_min_image_bytes(),
            min_transport_bytes: default_min_transport_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssemblyConfig {
    /// Frames per second for image segments
    #[serde(default = "default_framerate")]
    pub framerate: u32,

    #[serde(default = "default_min_output_bytes")]
    pub min_output_bytes: u64,

    /// Make the last-resort strategies require a clean exit too
    #[serde(default)]
    pub strict: bool,

    /// Segments used for trial runs before committing to a full set
    #[serde(default = "default_prefix_sample")]
    pub prefix_sample: usize,
}

fn default_framerate() -> u32 {
    30
}

fn default_min_output_bytes() -> u64 {
    1024
}

fn default_prefix_sample() -> usize {
    100
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            framerate: default_framerate(),
            min_output_bytes: default_min_output_bytes(),
            strict: false,
            prefix_sample: default_prefix_sample(),
        }
    }
}

impl AssemblyConfig {
    pub fn to_options(&self) -> segforge_av::assembly::AssemblyOptions {
        segforge_av::assembly::AssemblyOptions {
            framerate: self.framerate,
            min_output_bytes: self.min_output_bytes,
            strict: self.strict,
            prefix_sample: self.prefix_sample,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
}
