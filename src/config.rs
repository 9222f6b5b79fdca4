use std::env;

/// AppConfig
///
/// Holds the application's entire configuration state. The struct is immutable
/// once loaded and shared across all services through the application state.
#[derive(Clone)]
pub struct AppConfig {
    // API key for the Airtable base holding every table this service reads.
    pub airtable_api_key: String,
    // Identifier of the Airtable base (the `appXXXXXXXXXXXXXX` part of the API URL).
    pub airtable_base_id: String,
    // Secret key used to sign and validate access tokens.
    pub jwt_secret: String,
    // TCP port the HTTP server binds to.
    pub port: u16,
    // Runtime environment marker. Controls the logging format at startup.
    pub env: Env,
}

/// Env
///
/// Defines the runtime context, used to switch between development conveniences
/// (pretty logs, fallback secrets) and production settings (JSON logs, mandatory
/// secrets).
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Provides a safe, non-panicking AppConfig instance primarily used for test
    /// state setup.
    fn default() -> Self {
        Self {
            airtable_api_key: "keyTESTTESTTEST".to_string(),
            airtable_base_id: "appTESTTESTTEST".to_string(),
            jwt_secret: "vitrine-local-dev-secret".to_string(),
            port: 3000,
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// The canonical function for initializing the application configuration at
    /// startup. It reads all parameters from environment variables and fails fast.
    ///
    /// # Panics
    /// Panics if a critical environment variable required for the current runtime
    /// environment is not found. The Airtable credentials are mandatory in every
    /// environment; the signing secret only has a fallback outside production.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        // The record store is the only persistence layer, so its credentials are
        // required even in local development.
        let airtable_api_key =
            env::var("AIRTABLE_API_KEY").expect("FATAL: AIRTABLE_API_KEY must be set");
        let airtable_base_id =
            env::var("AIRTABLE_BASE_ID").expect("FATAL: AIRTABLE_BASE_ID must be set");

        let jwt_secret = match env {
            Env::Production => {
                env::var("JWT_SECRET").expect("FATAL: JWT_SECRET must be set in production")
            }
            _ => env::var("JWT_SECRET").unwrap_or_else(|_| "vitrine-local-dev-secret".to_string()),
        };

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            airtable_api_key,
            airtable_base_id,
            jwt_secret,
            port,
            env,
        }
    }
}
