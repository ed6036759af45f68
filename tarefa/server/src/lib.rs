pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub struct Config {
        pub db_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
    }

    impl Config {
        /// Loads configuration from environment variables (`DB_URL`, `PORT`).
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;
            Self::from_settings(settings)
        }

        /// Deserializes configuration from already-built settings.
        pub fn from_settings(settings: config::Config) -> anyhow::Result<Self> {
            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }
    }

    fn default_port() -> u16 {
        8080
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn can_default_port_when_unset() {
            let settings = config::Config::builder()
                .set_override("db_url", "sqlite::memory:")
                .unwrap()
                .build()
                .unwrap();

            let config = Config::from_settings(settings).unwrap();

            assert_eq!(config.db_url, "sqlite::memory:");
            assert_eq!(config.port, 8080);
        }

        #[test]
        fn can_fail_without_database_url() {
            let settings = config::Config::builder().build().unwrap();
            assert!(Config::from_settings(settings).is_err());
        }
    }
}
pub mod entities;
pub mod task;
pub mod web;
