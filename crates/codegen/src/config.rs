/// Generator endpoint configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development; override via
/// environment variables in production.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Model endpoint URL (default: `http://localhost:8741/v1/generate`).
    pub endpoint: String,
    /// Model identifier sent with each request (default: `scene-gen-1`).
    pub model: String,
    /// Optional bearer token for the endpoint.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds (default: `60`).
    pub request_timeout_secs: u64,
}

impl GeneratorConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                             |
    /// |--------------------------|-------------------------------------|
    /// | `GENERATOR_ENDPOINT`     | `http://localhost:8741/v1/generate` |
    /// | `GENERATOR_MODEL`        | `scene-gen-1`                       |
    /// | `GENERATOR_API_KEY`      | unset                               |
    /// | `GENERATOR_TIMEOUT_SECS` | `60`                                |
    pub fn from_env() -> Self {
        let endpoint = std::env::var("GENERATOR_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:8741/v1/generate".into());

        let model = std::env::var("GENERATOR_MODEL").unwrap_or_else(|_| "scene-gen-1".into());

        let api_key = std::env::var("GENERATOR_API_KEY").ok().filter(|s| !s.is_empty());

        let request_timeout_secs: u64 = std::env::var("GENERATOR_TIMEOUT_SECS")
            .unwrap_or_else(|_| "60".into())
            .parse()
            .expect("GENERATOR_TIMEOUT_SECS must be a valid u64");

        Self {
            endpoint,
            model,
            api_key,
            request_timeout_secs,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8741/v1/generate".into(),
            model: "scene-gen-1".into(),
            api_key: None,
            request_timeout_secs: 60,
        }
    }
}
