use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use tutorlink_common::{DatabaseConfig, JwtConfig, ServerConfig};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub meet: MeetConfig,
    pub fees: FeeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_name: String,
    pub from_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetConfig {
    pub enabled: bool,
    pub api_base_url: String,
    pub api_key: String,
}

/// Platform fee rates applied when a payment record is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    pub commission_rate: Decimal,
    pub admission_rate: Decimal,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Self {
            server: ServerConfig {
                host: env_or("SERVER_HOST", "0.0.0.0"),
                port: env_parse("SERVER_PORT", 8000),
                cors_origins: env_or("CORS_ORIGINS", "http://localhost:3000")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect(),
            },
            database: DatabaseConfig {
                host: env_or("DATABASE_HOST", "localhost"),
                port: env_parse("DATABASE_PORT", 5432),
                username: env_or("DATABASE_USERNAME", "tutorlink_user"),
                password: env_or("DATABASE_PASSWORD", "tutorlink_password"),
                database: env_or("DATABASE_NAME", "tutorlink"),
                max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            },
            jwt: JwtConfig {
                secret: env_or("JWT_SECRET", "dev-secret-key-change-in-production"),
                expiration_hours: env_parse("JWT_EXPIRATION_HOURS", 24),
                issuer: env_or("JWT_ISSUER", "tutorlink"),
            },
            email: EmailConfig {
                enabled: env_parse("EMAIL_ENABLED", false),
                smtp_host: env_or("SMTP_HOST", "localhost"),
                smtp_port: env_parse("SMTP_PORT", 465),
                smtp_username: env_or("SMTP_USERNAME", ""),
                smtp_password: env_or("SMTP_PASSWORD", ""),
                from_name: env_or("MAIL_FROM_NAME", "TutorLink"),
                from_email: env_or("MAIL_FROM_ADDRESS", "noreply@tutorlink.dev"),
            },
            meet: MeetConfig {
                enabled: env_parse("MEET_ENABLED", false),
                api_base_url: env_or("MEET_API_BASE_URL", "http://localhost:9100"),
                api_key: env_or("MEET_API_KEY", ""),
            },
            fees: FeeConfig {
                commission_rate: Decimal::from_str(&env_or("COMMISSION_RATE", "0.15"))?,
                admission_rate: Decimal::from_str(&env_or("ADMISSION_RATE", "0.05"))?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_env() {
        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.fees.commission_rate, Decimal::from_str("0.15").unwrap());
        assert!(!config.meet.enabled);
    }
}
