use crate::application::ProcessorConfig;
use crate::domain::services::SpikeConfig;
use crate::infrastructure::connection_pool::PoolConfig;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Semaphore;

/// How the built-in load generator reaches the service.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClientTransport {
    /// Real HTTP requests against `client_target_url`
    Http,
    /// Direct calls into the request processor
    InProcess,
}

impl ClientTransport {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "http" => Some(Self::Http),
            "in_process" | "in-process" | "inprocess" => Some(Self::InProcess),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // Service settings
    pub listen_addr: String,
    pub pool_capacity: usize,
    pub acquire_timeout_ms: u64,
    pub spike_interval_secs: u64,
    pub spike_duration_secs: u64,
    pub error_rate: f64,
    pub debug: bool,

    // Load generator settings
    pub client_enabled: bool,
    pub client_rps: u32,
    pub client_target_url: Option<String>,
    pub client_transport: ClientTransport,
    pub request_timeout_secs: u64,

    // Shutdown
    pub drain_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            pool_capacity: 1000,
            acquire_timeout_ms: 50,
            spike_interval_secs: 300,
            spike_duration_secs: 30,
            error_rate: 0.05,
            debug: false,
            client_enabled: true,
            client_rps: 500,
            client_target_url: None,
            client_transport: ClientTransport::Http,
            request_timeout_secs: 10,
            drain_timeout_secs: 5,
        }
    }
}

impl Config {
    /// Build a config from a variable lookup, falling back to defaults for
    /// anything missing or unparseable.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let parse_or = |key: &str, default: u64| -> u64 {
            lookup(key)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(default)
        };
        let flag_or = |key: &str, default: bool| -> bool {
            lookup(key)
                .map(|v| v == "1" || v.to_lowercase() == "true")
                .unwrap_or(default)
        };

        let listen_addr = lookup("LOADSIM_LISTEN_ADDR").unwrap_or(defaults.listen_addr);

        let pool_capacity = lookup("LOADSIM_POOL_CAPACITY")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.pool_capacity);

        let acquire_timeout_ms = parse_or("LOADSIM_ACQUIRE_TIMEOUT_MS", defaults.acquire_timeout_ms);
        let spike_interval_secs =
            parse_or("LOADSIM_SPIKE_INTERVAL_SECS", defaults.spike_interval_secs);
        let spike_duration_secs =
            parse_or("LOADSIM_SPIKE_DURATION_SECS", defaults.spike_duration_secs);

        let error_rate = lookup("LOADSIM_ERROR_RATE")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.error_rate);

        let debug = lookup("DEBUG").is_some();

        let client_enabled = flag_or("LOADSIM_CLIENT_ENABLED", defaults.client_enabled);

        let client_rps = lookup("LOADSIM_CLIENT_RPS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.client_rps);

        let client_target_url = lookup("LOADSIM_CLIENT_TARGET_URL").filter(|v| !v.is_empty());

        let client_transport = match lookup("LOADSIM_CLIENT_TRANSPORT") {
            Some(v) => match ClientTransport::from_str(&v) {
                Some(t) => t,
                None => anyhow::bail!("unknown LOADSIM_CLIENT_TRANSPORT: {}", v),
            },
            None => defaults.client_transport,
        };

        let request_timeout_secs =
            parse_or("LOADSIM_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs);
        let drain_timeout_secs = parse_or("LOADSIM_DRAIN_TIMEOUT_SECS", defaults.drain_timeout_secs);

        let cfg = Config {
            listen_addr,
            pool_capacity,
            acquire_timeout_ms,
            spike_interval_secs,
            spike_duration_secs,
            error_rate,
            debug,
            client_enabled,
            client_rps,
            client_target_url,
            client_transport,
            request_timeout_secs,
            drain_timeout_secs,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pool_capacity == 0 {
            anyhow::bail!("LOADSIM_POOL_CAPACITY must be greater than zero");
        }
        if self.pool_capacity > Semaphore::MAX_PERMITS {
            anyhow::bail!(
                "LOADSIM_POOL_CAPACITY must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                self.pool_capacity
            );
        }
        if !(0.0..=1.0).contains(&self.error_rate) {
            anyhow::bail!(
                "LOADSIM_ERROR_RATE must be between 0 and 1, got {}",
                self.error_rate
            );
        }
        Ok(())
    }

    /// Where the HTTP load generator sends requests.
    ///
    /// Defaults to loopback on the listen port.
    pub fn target_url(&self) -> String {
        if let Some(url) = &self.client_target_url {
            return url.clone();
        }
        let port = self
            .listen_addr
            .rsplit(':')
            .next()
            .filter(|p| p.parse::<u16>().is_ok())
            .unwrap_or("8080");
        format!("http://127.0.0.1:{}", port)
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            capacity: self.pool_capacity,
            acquire_timeout: Duration::from_millis(self.acquire_timeout_ms),
        }
    }

    pub fn spike_config(&self) -> SpikeConfig {
        SpikeConfig {
            selection_interval: Duration::from_secs(self.spike_interval_secs),
            spike_duration: Duration::from_secs(self.spike_duration_secs),
            ..Default::default()
        }
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            error_rate: self.error_rate,
            ..Default::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

pub fn load_config() -> anyhow::Result<Config> {
    Config::from_lookup(|key| std::env::var(key).ok())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
        assert_eq!(cfg.pool_capacity, 1000);
        assert_eq!(cfg.acquire_timeout_ms, 50);
        assert_eq!(cfg.spike_interval_secs, 300);
        assert_eq!(cfg.spike_duration_secs, 30);
        assert!(cfg.client_enabled);
        assert_eq!(cfg.client_rps, 500);
        assert_eq!(cfg.client_transport, ClientTransport::Http);
    }

    #[test]
    fn test_empty_lookup_gives_defaults() {
        let cfg = from_pairs(&[]).unwrap();
        let default = Config::default();
        assert_eq!(cfg.listen_addr, default.listen_addr);
        assert_eq!(cfg.pool_capacity, default.pool_capacity);
        assert_eq!(cfg.client_rps, default.client_rps);
        assert!(!cfg.debug);
    }

    #[test]
    fn test_load_config_reads_environment() {
        std::env::set_var("LOADSIM_SPIKE_DURATION_SECS", "12");
        let cfg = load_config().unwrap();
        assert_eq!(cfg.spike_duration_secs, 12);
        std::env::remove_var("LOADSIM_SPIKE_DURATION_SECS");
    }

    #[test]
    fn test_custom_values() {
        let cfg = from_pairs(&[
            ("LOADSIM_LISTEN_ADDR", "127.0.0.1:9000"),
            ("LOADSIM_POOL_CAPACITY", "16"),
            ("LOADSIM_ACQUIRE_TIMEOUT_MS", "75"),
            ("LOADSIM_SPIKE_INTERVAL_SECS", "60"),
            ("LOADSIM_SPIKE_DURATION_SECS", "5"),
            ("LOADSIM_ERROR_RATE", "0.5"),
            ("LOADSIM_CLIENT_RPS", "100"),
            ("LOADSIM_CLIENT_TRANSPORT", "in_process"),
            ("LOADSIM_REQUEST_TIMEOUT_SECS", "3"),
            ("LOADSIM_DRAIN_TIMEOUT_SECS", "1"),
            ("DEBUG", "1"),
        ])
        .unwrap();

        assert_eq!(cfg.listen_addr, "127.0.0.1:9000");
        assert_eq!(cfg.pool_capacity, 16);
        assert_eq!(cfg.acquire_timeout_ms, 75);
        assert_eq!(cfg.spike_interval_secs, 60);
        assert_eq!(cfg.spike_duration_secs, 5);
        assert!((cfg.error_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.client_rps, 100);
        assert_eq!(cfg.client_transport, ClientTransport::InProcess);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.drain_timeout(), Duration::from_secs(1));
        assert!(cfg.debug);
    }

    #[test]
    fn test_parse_error_uses_default() {
        let cfg = from_pairs(&[
            ("LOADSIM_POOL_CAPACITY", "lots"),
            ("LOADSIM_CLIENT_RPS", "-3"),
            ("LOADSIM_ACQUIRE_TIMEOUT_MS", "soon"),
        ])
        .unwrap();
        assert_eq!(cfg.pool_capacity, 1000);
        assert_eq!(cfg.client_rps, 500);
        assert_eq!(cfg.acquire_timeout_ms, 50);
    }

    #[test]
    fn test_client_enabled_flag() {
        assert!(!from_pairs(&[("LOADSIM_CLIENT_ENABLED", "false")]).unwrap().client_enabled);
        assert!(!from_pairs(&[("LOADSIM_CLIENT_ENABLED", "0")]).unwrap().client_enabled);
        assert!(from_pairs(&[("LOADSIM_CLIENT_ENABLED", "TRUE")]).unwrap().client_enabled);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = from_pairs(&[("LOADSIM_POOL_CAPACITY", "0")]).unwrap_err();
        assert!(err.to_string().contains("LOADSIM_POOL_CAPACITY"));
    }

    #[test]
    fn test_huge_capacity_rejected() {
        let huge = (usize::MAX >> 2).to_string();
        let err = from_pairs(&[("LOADSIM_POOL_CAPACITY", huge.as_str())]).unwrap_err();
        assert!(err.to_string().contains("at most"));

        let max = Semaphore::MAX_PERMITS.to_string();
        assert!(from_pairs(&[("LOADSIM_POOL_CAPACITY", max.as_str())]).is_ok());
    }

    #[test]
    fn test_error_rate_out_of_range_rejected() {
        assert!(from_pairs(&[("LOADSIM_ERROR_RATE", "1.5")]).is_err());
        assert!(from_pairs(&[("LOADSIM_ERROR_RATE", "-0.1")]).is_err());
        assert!(from_pairs(&[("LOADSIM_ERROR_RATE", "NaN")]).is_err());
        assert!(from_pairs(&[("LOADSIM_ERROR_RATE", "1")]).is_ok());
    }

    #[test]
    fn test_unknown_transport_rejected() {
        let err = from_pairs(&[("LOADSIM_CLIENT_TRANSPORT", "carrier-pigeon")]).unwrap_err();
        assert!(err.to_string().contains("carrier-pigeon"));
    }

    #[test]
    fn test_client_transport_from_str() {
        assert_eq!(ClientTransport::from_str("HTTP"), Some(ClientTransport::Http));
        assert_eq!(
            ClientTransport::from_str("in-process"),
            Some(ClientTransport::InProcess)
        );
        assert_eq!(ClientTransport::from_str("grpc"), None);
    }

    #[test]
    fn test_target_url_follows_listen_port() {
        let cfg = from_pairs(&[("LOADSIM_LISTEN_ADDR", "0.0.0.0:9123")]).unwrap();
        assert_eq!(cfg.target_url(), "http://127.0.0.1:9123");

        let cfg = from_pairs(&[("LOADSIM_CLIENT_TARGET_URL", "http://svc:80")]).unwrap();
        assert_eq!(cfg.target_url(), "http://svc:80");

        let cfg = from_pairs(&[("LOADSIM_CLIENT_TARGET_URL", "")]).unwrap();
        assert_eq!(cfg.target_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_component_configs() {
        let cfg = from_pairs(&[
            ("LOADSIM_POOL_CAPACITY", "8"),
            ("LOADSIM_ACQUIRE_TIMEOUT_MS", "20"),
            ("LOADSIM_SPIKE_INTERVAL_SECS", "10"),
            ("LOADSIM_SPIKE_DURATION_SECS", "2"),
            ("LOADSIM_ERROR_RATE", "0.25"),
        ])
        .unwrap();

        let pool = cfg.pool_config();
        assert_eq!(pool.capacity, 8);
        assert_eq!(pool.acquire_timeout, Duration::from_millis(20));

        let spike = cfg.spike_config();
        assert_eq!(spike.selection_interval, Duration::from_secs(10));
        assert_eq!(spike.spike_duration, Duration::from_secs(2));
        assert_eq!(spike.spike_delay_ms, 1500..2000);

        let processor = cfg.processor_config();
        assert!((processor.error_rate - 0.25).abs() < f64::EPSILON);
        assert_eq!(processor.processing_time_ms, 0..50);
    }

    #[test]
    fn test_config_debug() {
        let cfg = Config::default();
        let debug_str = format!("{:?}", cfg);
        assert!(debug_str.contains("listen_addr"));
        assert!(debug_str.contains("0.0.0.0:8080"));
    }
}
