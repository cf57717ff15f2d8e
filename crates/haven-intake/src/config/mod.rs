use std::env;
use std::fmt;
use std::fs::File;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::workflows::intake::domain::IntakeStage;
use crate::workflows::intake::eligibility::{AmiTableError, AreaMedianIncome, EligibilityConfig};
use crate::workflows::intake::workflow::WorkflowConfig;
use crate::workflows::psde::access::AccessPolicyConfig;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine: EngineConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Jurisdiction-tunable engine settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub eligibility: EligibilityConfig,
    pub workflow: WorkflowConfig,
    pub access: AccessPolicyConfig,
}

impl EngineConfig {
    /// Reads `INTAKE_AMI_TABLE`, `INTAKE_RRH_AMI_PERCENT` and `INTAKE_OPTIONAL_STAGES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut eligibility = EligibilityConfig::default();
        if let Ok(path) = env::var("INTAKE_AMI_TABLE") {
            let path = PathBuf::from(path);
            let file = File::open(&path).map_err(|source| ConfigError::AmiTableIo {
                path: path.clone(),
                source,
            })?;
            let table = AreaMedianIncome::from_csv_reader(file)
                .map_err(|source| ConfigError::AmiTable { path, source })?;
            eligibility = eligibility.with_area_median_income(table);
        }
        if let Ok(value) = env::var("INTAKE_RRH_AMI_PERCENT") {
            eligibility.rrh_ami_percent = value
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|percent| (1..=100).contains(percent))
                .ok_or(ConfigError::InvalidAmiPercent(value))?;
        }

        let mut workflow = WorkflowConfig::default();
        if let Ok(value) = env::var("INTAKE_OPTIONAL_STAGES") {
            workflow = workflow.with_optional_stages(parse_stage_list(&value)?);
        }

        Ok(Self {
            eligibility,
            workflow,
            access: AccessPolicyConfig::default(),
        })
    }
}

fn parse_stage_list(value: &str) -> Result<Vec<IntakeStage>, ConfigError> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<u8>()
                .ok()
                .and_then(IntakeStage::from_number)
                .ok_or_else(|| ConfigError::InvalidStage(item.to_string()))
        })
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidAmiPercent(String),
    InvalidStage(String),
    AmiTableIo {
        path: PathBuf,
        source: std::io::Error,
    },
    AmiTable {
        path: PathBuf,
        source: AmiTableError,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidAmiPercent(value) => write!(
                f,
                "INTAKE_RRH_AMI_PERCENT must be between 1 and 100, got '{value}'"
            ),
            ConfigError::InvalidStage(value) => write!(
                f,
                "INTAKE_OPTIONAL_STAGES entries must be stage numbers 1-10, got '{value}'"
            ),
            ConfigError::AmiTableIo { path, .. } => {
                write!(f, "unable to open AMI table {}", path.display())
            }
            ConfigError::AmiTable { path, .. } => {
                write!(f, "invalid AMI table {}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidAmiPercent(_)
            | ConfigError::InvalidStage(_) => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::AmiTableIo { source, .. } => Some(source),
            ConfigError::AmiTable { source, .. } => Some(source),
        }
    }
}
