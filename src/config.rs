use serde::Deserialize;

/// tunables for a [`Bus`](crate::Bus)
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BusConfig {
    /// maximum number of channels open at once. opening past this fails with `Allocation`.
    /// unlimited if not set
    pub max_channels: Option<usize>,
}

impl BusConfig {
    pub fn from_toml(src: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(src, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod test {
    use super::BusConfig;

    #[test]
    fn empty_config_is_unlimited() {
        assert_eq!(BusConfig::from_toml("").unwrap(), BusConfig::default());
    }

    #[test]
    fn channel_limit() {
        let cfg = BusConfig::from_toml("max_channels = 3").unwrap();
        assert_eq!(cfg.max_channels, Some(3));
    }
}
