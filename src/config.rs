use serde::Deserialize;

/// Which document store backs the collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    fn parse(raw: &str) -> anyhow::Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND `{other}`"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeConfig {
    pub width: usize,        // digits after the `R-` prefix
    pub max_attempts: u32,   // collision retries before giving up
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub reset_length: usize,
    pub memory_kib: u32,
    pub iterations: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backend: StoreBackend,
    pub database_url: String,
    pub max_connections: u32,
    pub codes: CodeConfig,
    pub passwords: PasswordConfig,
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            width: 4,
            max_attempts: 32,
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            reset_length: 12,
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let backend = match std::env::var("STORE_BACKEND") {
            Ok(v) => StoreBackend::parse(&v)?,
            Err(_) => StoreBackend::Postgres,
        };
        let database_url = match backend {
            StoreBackend::Postgres => std::env::var("DATABASE_URL")?,
            StoreBackend::Memory => std::env::var("DATABASE_URL").unwrap_or_default(),
        };

        let code_defaults = CodeConfig::default();
        let codes = CodeConfig {
            width: env_or("REFERENCE_CODE_WIDTH", code_defaults.width),
            max_attempts: env_or("REFERENCE_CODE_MAX_ATTEMPTS", code_defaults.max_attempts),
        };

        let pw_defaults = PasswordConfig::default();
        let passwords = PasswordConfig {
            reset_length: env_or("PASSWORD_RESET_LENGTH", pw_defaults.reset_length),
            memory_kib: env_or("HASH_MEMORY_KIB", pw_defaults.memory_kib),
            iterations: env_or("HASH_ITERATIONS", pw_defaults.iterations),
        };

        Ok(Self {
            backend,
            database_url,
            max_connections: env_or("DB_MAX_CONNECTIONS", 10),
            codes,
            passwords,
        })
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
