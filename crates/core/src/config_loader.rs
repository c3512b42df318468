use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use std::path::Path;

/// Environment variables with this prefix override file settings.
/// Nested keys use a double underscore, e.g. `FORECAST_HISTORICAL__DAYS_BACK=90`.
pub const ENV_PREFIX: &str = "FORECAST_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering defaults, TOML, environment variables, and JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file exists but cannot be parsed.
    pub fn load() -> Result<AppConfig> {
        Self::extract(Self::base().merge(Toml::file("config/Config.toml")))
    }

    /// Loads configuration with a profile-specific TOML overlay.
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file exists but cannot be parsed.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        Self::extract(
            Self::base()
                .merge(Toml::file("config/Config.toml"))
                .merge(Toml::file(format!("config/Config.{profile}.toml"))),
        )
    }

    /// Loads configuration from an explicit TOML file instead of `config/Config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        Self::extract(Self::base().merge(Toml::file(path.as_ref())))
    }

    fn base() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
    }

    fn extract(figment: Figment) -> Result<AppConfig> {
        let config: AppConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .join(Json::file("config/Config.json"))
            .extract()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_yield_defaults() {
        figment::Jail::expect_with(|_jail| {
            let config = ConfigLoader::load().expect("defaults should load");
            assert_eq!(config.historical.max_markets, 50);
            Ok(())
        });
    }

    #[test]
    fn toml_then_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file(
                "config/Config.toml",
                r#"
                [historical]
                days_back = 60
                max_markets = 10
                "#,
            )?;
            jail.set_env("FORECAST_HISTORICAL__MAX_MARKETS", "25");

            let config = ConfigLoader::load().expect("config should load");
            assert_eq!(config.historical.days_back, 60);
            assert_eq!(config.historical.max_markets, 25);
            Ok(())
        });
    }

    #[test]
    fn profile_overlay_wins_over_base_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_dir("config")?;
            jail.create_file("config/Config.toml", "[resolver]\ncertainty_threshold = 0.9\n")?;
            jail.create_file(
                "config/Config.strict.toml",
                "[resolver]\ncertainty_threshold = 0.97\n",
            )?;

            let config = ConfigLoader::load_with_profile("strict").expect("config should load");
            assert!((config.resolver.certainty_threshold - 0.97).abs() < f64::EPSILON);
            Ok(())
        });
    }
}
