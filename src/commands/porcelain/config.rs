use crate::areas::repository::Repository;
use anyhow::Context;
use std::io::Write;

impl Repository {
    /// Get, set, or list configuration values.
    ///
    /// `config <key>` prints one value, `config <key> <value>` stores it,
    /// and no arguments lists everything as dotted keys.
    pub async fn config(&mut self, key: Option<&str>, value: Option<&str>) -> anyhow::Result<()> {
        let config = self.config_store();
        let mut config = config.lock().await;

        match (key, value) {
            (Some(key), Some(value)) => {
                config.set(key, value.to_string())?;
                config.save()?;
            }
            (Some(key), None) => {
                let value = config
                    .get(key)
                    .with_context(|| format!("config key not found: {key}"))?;
                writeln!(self.writer(), "{value}")?;
            }
            (None, _) => {
                for (key, value) in config.entries() {
                    writeln!(self.writer(), "{key}={value}")?;
                }
            }
        }

        Ok(())
    }
}
