use std::env;
use tracing::warn;

pub const DEFAULT_CANCELLATIONS_TABLE: &str = "appointment_cancellations";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub cancellations_table: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            cancellations_table: env::var("CANCELLATIONS_TABLE")
                .unwrap_or_else(|_| DEFAULT_CANCELLATIONS_TABLE.to_string()),
            port: match env::var("PORT") {
                Ok(raw) => raw.parse().unwrap_or_else(|_| {
                    warn!("PORT value '{}' is not a valid port, using {}", raw, DEFAULT_PORT);
                    DEFAULT_PORT
                }),
                Err(_) => DEFAULT_PORT,
            },
        };

        if !config.is_configured() {
            warn!("Document store not configured - cancellations will be kept in memory");
        }

        config
    }

    /// Builds a config pointing at the given store, with defaults for everything else.
    pub fn for_store(supabase_url: &str, supabase_anon_key: &str, supabase_jwt_secret: &str) -> Self {
        Self {
            supabase_url: supabase_url.to_string(),
            supabase_anon_key: supabase_anon_key.to_string(),
            supabase_jwt_secret: supabase_jwt_secret.to_string(),
            cancellations_table: DEFAULT_CANCELLATIONS_TABLE.to_string(),
            port: DEFAULT_PORT,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
    }

    pub fn cancellations_path(&self) -> String {
        format!("/rest/v1/{}", self.cancellations_table)
    }
}
