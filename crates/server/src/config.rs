use std::env;

use engine_pool::EngineConfig;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Level used when a request names none
    pub default_level: String,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let engine = EngineConfig::from_env();
        let default_level = env::var("DEFAULT_LEVEL")
            .ok()
            .filter(|level| engine.has_level(level))
            .or_else(|| engine.levels.first().cloned())
            .unwrap_or_default();

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            default_level,
            engine,
        }
    }

    /// Config around an explicit engine setup, first level as default.
    pub fn with_engine(engine: EngineConfig) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            default_level: engine.levels.first().cloned().unwrap_or_default(),
            engine,
        }
    }

    /// `requested` when given, else the default level.
    pub fn level_or_default<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.default_level.as_str())
    }
}
