//! Startup configuration (C12, ambient stack). Read once from the process
//! environment into a typed struct; never re-read, never a global/singleton —
//! consumed into the `Deps` record the kernel is constructed with.

use crate::error::Error;

#[derive(Clone, Debug)]
pub struct Config {
    pub session_store_url: Option<String>,
    pub llm_api_key: String,
    pub backend_api_url: Option<String>,
    pub backend_service_token: Option<String>,
    pub object_store_url: Option<String>,
    pub credit_ledger_url: Option<String>,
    pub credit_ledger_token: Option<String>,
    pub gateway_bind: String,
    pub gateway_port: u16,
    pub gateway_auth_token: Option<String>,
    pub spending_threshold_usd: f64,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        let llm_api_key = env_var("ANTHROPIC_API_KEY")
            .or_else(|| env_var("LLM_API_KEY"))
            .ok_or_else(|| Error::ConfigError("ANTHROPIC_API_KEY (or LLM_API_KEY) not set".into()))?;

        let gateway_port = env_var("GATEWAY_PORT")
            .map(|p| {
                p.parse::<u16>()
                    .map_err(|_| Error::ConfigError(format!("GATEWAY_PORT is not a valid port: {p}")))
            })
            .transpose()?
            .unwrap_or(18789);

        let spending_threshold_usd = env_var("SPENDING_THRESHOLD_USD")
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|_| Error::ConfigError(format!("SPENDING_THRESHOLD_USD is not a number: {v}")))
            })
            .transpose()?
            .unwrap_or(50.0);

        Ok(Self {
            session_store_url: env_var("SESSION_STORE_URL"),
            llm_api_key,
            backend_api_url: env_var("BACKEND_API_URL"),
            backend_service_token: env_var("BACKEND_SERVICE_TOKEN"),
            object_store_url: env_var("OBJECT_STORE_URL"),
            credit_ledger_url: env_var("CREDIT_LEDGER_URL"),
            credit_ledger_token: env_var("CREDIT_LEDGER_TOKEN"),
            gateway_bind: env_var("GATEWAY_BIND").unwrap_or_else(|| "lan".to_string()),
            gateway_port,
            gateway_auth_token: env_var("GATEWAY_AUTH_TOKEN"),
            spending_threshold_usd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_fails_with_config_error() {
        // SAFETY in tests only: no other test in this process relies on these vars.
        std::env::remove_var("ANTHROPIC_API_KEY");
        std::env::remove_var("LLM_API_KEY");
        let result = Config::from_env();
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn spending_threshold_defaults_to_50() {
        std::env::set_var("ANTHROPIC_API_KEY", "test-key");
        std::env::remove_var("SPENDING_THRESHOLD_USD");
        let config = Config::from_env().unwrap();
        assert_eq!(config.spending_threshold_usd, 50.0);
        std::env::remove_var("ANTHROPIC_API_KEY");
    }
}
