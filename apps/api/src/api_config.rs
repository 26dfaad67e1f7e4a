use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use warden_core::{AppError, UserId};

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCommand {
    Serve,
    Migrate,
    Seed {
        reset: bool,
        administrator: Option<UserId>,
    },
}

impl ApiCommand {
    fn parse(mut arguments: impl Iterator<Item = String>) -> Result<Self, AppError> {
        let Some(command) = arguments.next() else {
            return Ok(Self::Serve);
        };

        match command.as_str() {
            "serve" => Ok(Self::Serve),
            "migrate" => Ok(Self::Migrate),
            "seed" => {
                let mut reset = false;
                let mut administrator = None;
                while let Some(flag) = arguments.next() {
                    match flag.as_str() {
                        "--reset" => reset = true,
                        "--admin" => {
                            let value = arguments.next().ok_or_else(|| {
                                AppError::Validation("--admin requires a user id".to_owned())
                            })?;
                            administrator = Some(UserId::from_str(value.as_str())?);
                        }
                        other => {
                            return Err(AppError::Validation(format!(
                                "unknown seed flag '{other}'"
                            )));
                        }
                    }
                }

                Ok(Self::Seed {
                    reset,
                    administrator,
                })
            }
            other => Err(AppError::Validation(format!(
                "unknown command '{other}', expected serve, migrate or seed"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub command: ApiCommand,
    pub database_url: String,
    pub database_max_connections: u32,
    pub api_host: String,
    pub api_port: u16,
    pub frontend_url: Option<String>,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let command = ApiCommand::parse(env::args().skip(1))?;
        let database_url = required_env("DATABASE_URL")?;
        let database_max_connections = parse_env("DATABASE_MAX_CONNECTIONS", 10_u32)?;
        if database_max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = parse_env("API_PORT", 3001_u16)?;
        let frontend_url = env::var("FRONTEND_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            command,
            database_url,
            database_max_connections,
            api_host,
            api_port,
            frontend_url,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env<T>(name: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        _ => Ok(default),
    }
}
