use relay_core::{
    agent::{
        DEFAULT_AGENT_NAME, DEFAULT_INSTRUCTIONS, DEFAULT_LANGUAGE, DEFAULT_MODEL, DEFAULT_VOICE,
        RealtimeAgent, SessionConfig,
    },
    credential::{ApiKey, CredentialError},
};
use secrecy::SecretString;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use tracing::Level;

pub const DEFAULT_PORT: u16 = 5050;
pub const DEFAULT_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";
pub const DEFAULT_GREETING: &str = "Gracias por llamar. Conectando con el asistente.";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Checked per call; a bad key makes every call drop, not the process exit.
    pub openai_api_key: Option<SecretString>,
    pub realtime_url: String,
    pub realtime_model: String,
    pub agent_name: String,
    pub agent_language: String,
    pub agent_instructions: String,
    pub agent_voice: String,
    pub agent_speaks_first: bool,
    pub greeting: String,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::InvalidValue("PORT".to_string(), e.to_string()))?,
            Err(_) => DEFAULT_PORT,
        };
        let bind_address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

        let openai_api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .map(SecretString::from);

        let realtime_url =
            std::env::var("OPENAI_REALTIME_URL").unwrap_or_else(|_| DEFAULT_REALTIME_URL.to_string());
        if !realtime_url.starts_with("ws://") && !realtime_url.starts_with("wss://") {
            return Err(ConfigError::InvalidValue(
                "OPENAI_REALTIME_URL".to_string(),
                format!("'{}' is not a ws:// or wss:// URL", realtime_url),
            ));
        }
        let realtime_model =
            std::env::var("OPENAI_REALTIME_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let agent_name =
            std::env::var("AGENT_NAME").unwrap_or_else(|_| DEFAULT_AGENT_NAME.to_string());
        let agent_language =
            std::env::var("AGENT_LANGUAGE").unwrap_or_else(|_| DEFAULT_LANGUAGE.to_string());
        let agent_voice =
            std::env::var("AGENT_VOICE").unwrap_or_else(|_| DEFAULT_VOICE.to_string());

        let agent_instructions = match std::env::var("AGENT_INSTRUCTIONS_PATH") {
            Ok(path) => {
                let path = PathBuf::from(path);
                std::fs::read_to_string(&path).map_err(|e| {
                    ConfigError::InvalidValue(
                        "AGENT_INSTRUCTIONS_PATH".to_string(),
                        format!("cannot read '{}': {}", path.display(), e),
                    )
                })?
            }
            Err(_) => DEFAULT_INSTRUCTIONS.to_string(),
        };

        let agent_speaks_first = match std::env::var("AGENT_SPEAKS_FIRST") {
            Ok(raw) => parse_bool(&raw).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "AGENT_SPEAKS_FIRST".to_string(),
                    format!("'{}' is not a boolean", raw),
                )
            })?,
            Err(_) => false,
        };

        let greeting =
            std::env::var("CALL_GREETING").unwrap_or_else(|_| DEFAULT_GREETING.to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            openai_api_key,
            realtime_url,
            realtime_model,
            agent_name,
            agent_language,
            agent_instructions,
            agent_voice,
            agent_speaks_first,
            greeting,
            log_level,
        })
    }

    /// Validates the OpenAI key once, so a misconfiguration shows up at startup.
    pub fn check_api_key(&self) -> Result<(), CredentialError> {
        ApiKey::from_secret(self.openai_api_key.as_ref()).map(|_| ())
    }

    pub fn agent(&self) -> RealtimeAgent {
        RealtimeAgent::new(&self.agent_name, &self.agent_instructions)
            .with_language(&self.agent_language)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::telephony(&self.realtime_model, &self.agent_voice)
            .with_speak_first(self.agent_speaks_first)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_core::agent::AudioFormat;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("PORT");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("OPENAI_REALTIME_URL");
            env::remove_var("OPENAI_REALTIME_MODEL");
            env::remove_var("AGENT_NAME");
            env::remove_var("AGENT_LANGUAGE");
            env::remove_var("AGENT_INSTRUCTIONS_PATH");
            env::remove_var("AGENT_VOICE");
            env::remove_var("AGENT_SPEAKS_FIRST");
            env::remove_var("CALL_GREETING");
            env::remove_var("RUST_LOG");
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" 0 "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:5050");
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.realtime_url, DEFAULT_REALTIME_URL);
        assert_eq!(config.realtime_model, "gpt-4o-realtime-preview");
        assert_eq!(config.agent_name, "Angelina (Flame Stone)");
        assert_eq!(config.agent_language, "es");
        assert_eq!(config.agent_voice, "verse");
        assert!(!config.agent_speaks_first);
        assert_eq!(config.greeting, DEFAULT_GREETING);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.check_api_key(), Err(CredentialError::Missing));
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        let mut prompt = std::env::temp_dir();
        prompt.push(format!("relay-api-prompt-{}.md", std::process::id()));
        std::fs::File::create(&prompt)
            .and_then(|mut f| f.write_all(b"You are a test agent."))
            .unwrap();
        unsafe {
            env::set_var("PORT", "8080");
            env::set_var("OPENAI_API_KEY", "sk-custom");
            env::set_var("OPENAI_REALTIME_MODEL", "gpt-realtime");
            env::set_var("AGENT_NAME", "Tester");
            env::set_var("AGENT_LANGUAGE", "en");
            env::set_var("AGENT_INSTRUCTIONS_PATH", &prompt);
            env::set_var("AGENT_VOICE", "alloy");
            env::set_var("AGENT_SPEAKS_FIRST", "yes");
            env::set_var("CALL_GREETING", "Hello there.");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");
        std::fs::remove_file(&prompt).ok();

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:8080");
        assert_eq!(
            config.openai_api_key.as_ref().map(|k| k.expose_secret()),
            Some("sk-custom")
        );
        assert_eq!(config.check_api_key(), Ok(()));
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(config.greeting, "Hello there.");

        let agent = config.agent();
        assert_eq!(agent.name, "Tester");
        assert_eq!(agent.language_preference, "en");
        assert_eq!(agent.instructions, "You are a test agent.");

        let session = config.session_config();
        assert_eq!(session.model, "gpt-realtime");
        assert_eq!(session.voice, "alloy");
        assert_eq!(session.input_audio_format, AudioFormat::G711Ulaw);
        assert!(session.speak_first);
    }

    #[test]
    #[serial]
    fn test_config_malformed_key_is_not_fatal() {
        clear_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "not-a-key");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.check_api_key(), Err(CredentialError::Malformed));
    }

    #[test]
    #[serial]
    fn test_config_invalid_port() {
        clear_env_vars();
        unsafe {
            env::set_var("PORT", "not-a-port");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "PORT"),
            _ => panic!("Expected InvalidValue for PORT"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_realtime_url() {
        clear_env_vars();
        unsafe {
            env::set_var("OPENAI_REALTIME_URL", "https://api.openai.com/v1/realtime");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "OPENAI_REALTIME_URL"),
            _ => panic!("Expected InvalidValue for OPENAI_REALTIME_URL"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_instructions_file() {
        clear_env_vars();
        unsafe {
            env::set_var("AGENT_INSTRUCTIONS_PATH", "/definitely/not/here.md");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "AGENT_INSTRUCTIONS_PATH"),
            _ => panic!("Expected InvalidValue for AGENT_INSTRUCTIONS_PATH"),
        }
        clear_env_vars();
    }
}
