use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RelayConfig {
    pub ingest: IngestConfig,
    pub sink: SinkConfig,
    pub pose: PoseConfig,
    pub estimator: EstimatorConfig,
    pub pull: PullConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct IngestConfig {
    /// Run the video ingestion server
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// IP address to bind to
    #[serde(default = "default_loopback_ip")]
    pub ip: String,

    /// Port the game client connects to
    #[serde(default = "default_ingest_port")]
    pub port: u16,

    /// Bounded wait for each accept so shutdown is observed promptly
    #[serde(default = "default_accept_timeout_ms")]
    pub accept_timeout_ms: u64,

    /// Largest pixel body accepted for a single frame
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SinkConfig {
    /// v4l2loopback device the virtual camera writes to
    #[serde(default = "default_sink_device")]
    pub device: String,

    /// Output frame rate
    #[serde(default = "default_sink_fps")]
    pub fps: u32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PoseDeliveryMode {
    Udp,
    Http,
    None,
}

impl std::str::FromStr for PoseDeliveryMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(Self::Udp),
            "http" => Ok(Self::Http),
            "none" => Ok(Self::None),
            other => Err(format!("unknown pose transport '{}'", other)),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PoseConfig {
    /// Run the pose capture loop
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Push channel used for every payload
    #[serde(default = "default_pose_transport")]
    pub transport: PoseDeliveryMode,

    /// Delay between capture ticks
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    pub udp: UdpTargetConfig,
    pub http: HttpPushConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct UdpTargetConfig {
    #[serde(default = "default_loopback_ip")]
    pub ip: String,

    #[serde(default = "default_udp_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HttpPushConfig {
    /// Target URL, required when the transport is `http`
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_http_method")]
    pub method: HttpMethod,

    /// Query parameter carrying the JSON payload in GET mode
    #[serde(default = "default_http_param")]
    pub param: String,

    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EstimatorSource {
    Stdin,
    File,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EstimatorConfig {
    /// Where landmark results are read from
    #[serde(default = "default_estimator_source")]
    pub source: EstimatorSource,

    /// Landmark file, used when `source = "file"`
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PullConfig {
    /// Run the pose pull server
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_loopback_ip")]
    pub ip: String,

    #[serde(default = "default_pull_port")]
    pub port: u16,

    /// Route serving the latest pose snapshot
    #[serde(default = "default_pull_path")]
    pub path: String,
}

impl PullConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// The pose route must be a literal path the router can register as-is
    pub fn check_path(&self) -> Result<(), &'static str> {
        if !self.path.starts_with('/') {
            return Err("must start with '/'");
        }
        if self.path.contains(['*', ':', '{', '}']) {
            return Err("must not contain route pattern characters (* : { })");
        }
        if matches!(self.path.as_str(), "/health" | "/viewer") {
            return Err("collides with a built-in route");
        }
        Ok(())
    }
}

impl IngestConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_millis(self.accept_timeout_ms)
    }
}

impl PoseConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl UdpTargetConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl HttpPushConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl RelayConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("avatar-relay.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("ingest.enabled", default_enabled())?
            .set_default("ingest.ip", default_loopback_ip())?
            .set_default("ingest.port", default_ingest_port())?
            .set_default("ingest.accept_timeout_ms", default_accept_timeout_ms())?
            .set_default("ingest.max_frame_bytes", default_max_frame_bytes() as i64)?
            .set_default("sink.device", default_sink_device())?
            .set_default("sink.fps", default_sink_fps())?
            .set_default("pose.enabled", default_enabled())?
            .set_default("pose.transport", "udp")?
            .set_default("pose.tick_interval_ms", default_tick_interval_ms())?
            .set_default("pose.udp.ip", default_loopback_ip())?
            .set_default("pose.udp.port", default_udp_port())?
            .set_default("pose.http.url", "")?
            .set_default("pose.http.method", "get")?
            .set_default("pose.http.param", default_http_param())?
            .set_default("pose.http.timeout_ms", default_http_timeout_ms())?
            .set_default("estimator.source", "stdin")?
            .set_default("estimator.path", "")?
            .set_default("pull.enabled", default_enabled())?
            .set_default("pull.ip", default_loopback_ip())?
            .set_default("pull.port", default_pull_port())?
            .set_default("pull.path", default_pull_path())?
            .add_source(File::with_name(&path_str).required(false))
            // AVATAR_RELAY_POSE__TRANSPORT=http, AVATAR_RELAY_PULL__PORT=9000, ...
            .add_source(
                Environment::with_prefix("AVATAR_RELAY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: RelayConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.accept_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "Ingest accept_timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.ingest.max_frame_bytes == 0 {
            return Err(ConfigError::Message(
                "Ingest max_frame_bytes must be greater than 0".to_string(),
            ));
        }

        if self.sink.fps == 0 {
            return Err(ConfigError::Message(
                "Sink fps must be greater than 0".to_string(),
            ));
        }

        if self.pose.tick_interval_ms == 0 {
            return Err(ConfigError::Message(
                "Pose tick_interval_ms must be greater than 0".to_string(),
            ));
        }

        match self.pose.transport {
            PoseDeliveryMode::Udp if self.pose.udp.port == 0 => {
                return Err(ConfigError::Message(
                    "Pose UDP port must be greater than 0".to_string(),
                ));
            }
            PoseDeliveryMode::Http if self.pose.http.url.trim().is_empty() => {
                return Err(ConfigError::Message(
                    "Pose HTTP transport requires pose.http.url".to_string(),
                ));
            }
            PoseDeliveryMode::Http if self.pose.http.timeout_ms == 0 => {
                return Err(ConfigError::Message(
                    "Pose HTTP timeout_ms must be greater than 0".to_string(),
                ));
            }
            PoseDeliveryMode::Http
                if self.pose.http.method == HttpMethod::Get && self.pose.http.param.is_empty() =>
            {
                return Err(ConfigError::Message(
                    "Pose HTTP GET mode requires a query parameter name".to_string(),
                ));
            }
            _ => {}
        }

        if self.estimator.source == EstimatorSource::File && self.estimator.path.is_empty() {
            return Err(ConfigError::Message(
                "Estimator file source requires estimator.path".to_string(),
            ));
        }

        if let Err(details) = self.pull.check_path() {
            return Err(ConfigError::Message(format!(
                "Pull path '{}' {}",
                self.pull.path, details
            )));
        }

        Ok(())
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig {
                enabled: default_enabled(),
                ip: default_loopback_ip(),
                port: default_ingest_port(),
                accept_timeout_ms: default_accept_timeout_ms(),
                max_frame_bytes: default_max_frame_bytes(),
            },
            sink: SinkConfig {
                device: default_sink_device(),
                fps: default_sink_fps(),
            },
            pose: PoseConfig {
                enabled: default_enabled(),
                transport: default_pose_transport(),
                tick_interval_ms: default_tick_interval_ms(),
                udp: UdpTargetConfig {
                    ip: default_loopback_ip(),
                    port: default_udp_port(),
                },
                http: HttpPushConfig {
                    url: String::new(),
                    method: default_http_method(),
                    param: default_http_param(),
                    timeout_ms: default_http_timeout_ms(),
                },
            },
            estimator: EstimatorConfig {
                source: default_estimator_source(),
                path: String::new(),
            },
            pull: PullConfig {
                enabled: default_enabled(),
                ip: default_loopback_ip(),
                port: default_pull_port(),
                path: default_pull_path(),
            },
        }
    }
}

// Default value functions
fn default_enabled() -> bool {
    true
}
fn default_loopback_ip() -> String {
    "127.0.0.1".to_string()
}

fn default_ingest_port() -> u16 {
    5006
}
fn default_accept_timeout_ms() -> u64 {
    1000
}
fn default_max_frame_bytes() -> usize {
    crate::ingest::DEFAULT_MAX_FRAME_BYTES
}

fn default_sink_device() -> String {
    "/dev/video10".to_string()
}
fn default_sink_fps() -> u32 {
    30
}

fn default_pose_transport() -> PoseDeliveryMode {
    PoseDeliveryMode::Udp
}
fn default_tick_interval_ms() -> u64 {
    10
}
fn default_udp_port() -> u16 {
    5005
}
fn default_http_method() -> HttpMethod {
    HttpMethod::Get
}
fn default_http_param() -> String {
    "data".to_string()
}
fn default_http_timeout_ms() -> u64 {
    200
}

fn default_estimator_source() -> EstimatorSource {
    EstimatorSource::Stdin
}

fn default_pull_port() -> u16 {
    40094
}
fn default_pull_path() -> String {
    "/pose".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.ingest.address(), "127.0.0.1:5006");
        assert_eq!(config.pose.udp.address(), "127.0.0.1:5005");
        assert_eq!(config.pull.address(), "127.0.0.1:40094");
        assert_eq!(config.pull.path, "/pose");
        assert_eq!(config.pose.http.param, "data");
        assert_eq!(config.pose.http.timeout(), Duration::from_millis(200));
        assert_eq!(config.sink.fps, 30);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[pose]
transport = "http"

[pose.http]
url = "http://127.0.0.1:8000/pose"
method = "post"

[pull]
port = 41000
"#
        )
        .unwrap();

        let config = RelayConfig::load_from_file(file.path()).unwrap();

        assert_eq!(config.pose.transport, PoseDeliveryMode::Http);
        assert_eq!(config.pose.http.method, HttpMethod::Post);
        assert_eq!(config.pose.http.url, "http://127.0.0.1:8000/pose");
        assert_eq!(config.pull.port, 41000);
        // Untouched sections keep their defaults
        assert_eq!(config.ingest.port, 5006);
        assert_eq!(config.pose.udp.port, 5005);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = RelayConfig::load_from_file("/nonexistent/avatar-relay.toml").unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RelayConfig::default();

        config.pose.transport = PoseDeliveryMode::Http;
        assert!(config.validate().is_err());

        config.pose.http.url = "http://localhost:9000/pose".to_string();
        assert!(config.validate().is_ok());

        config.pull.path = "pose".to_string();
        assert!(config.validate().is_err());

        config.pull.path = "/health".to_string();
        assert!(config.validate().is_err());

        for pattern in ["/pose/*", "/po*se", "/:id", "/pose/{id}"] {
            config.pull.path = pattern.to_string();
            assert!(config.validate().is_err(), "path {}", pattern);
        }

        config.pull.path = "/api/v1/pose".to_string();
        assert!(config.validate().is_ok());

        config.pull.path = "/pose".to_string();
        config.sink.fps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_delivery_mode_from_str() {
        assert_eq!("UDP".parse::<PoseDeliveryMode>(), Ok(PoseDeliveryMode::Udp));
        assert_eq!("none".parse::<PoseDeliveryMode>(), Ok(PoseDeliveryMode::None));
        assert!("carrier-pigeon".parse::<PoseDeliveryMode>().is_err());
    }
}
