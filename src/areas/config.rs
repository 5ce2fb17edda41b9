//! Repository configuration
//!
//! An INI-style file at `.grit/config`. Section headers are either plain
//! (`[core]`) or subsectioned (`[remote "origin"]`); keys address them as
//! dotted paths, so `remote.origin.url` names `url` under `[remote "origin"]`.
//!
//! ```text
//! [remote "origin"]
//!     url = https://example.com/repo.git
//! ```

use anyhow::Context;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug)]
pub struct Config {
    path: Box<Path>,
    /// section -> key -> value, sections ordered for stable rendering
    values: BTreeMap<String, BTreeMap<String, String>>,
}

impl Config {
    /// Load the config file, or start empty when none exists.
    pub fn load(path: Box<Path>) -> anyhow::Result<Self> {
        let mut values: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file at {:?}", path))?;

            let mut current_section = String::new();
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                if let Some(header) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                    current_section = match header.split_once(' ') {
                        Some((section, subsection)) => {
                            format!("{section}.{}", subsection.trim().trim_matches('"'))
                        }
                        None => header.to_string(),
                    };
                    values.entry(current_section.clone()).or_default();
                    continue;
                }

                if current_section.is_empty() {
                    anyhow::bail!("config entry before any section header: {line:?}");
                }
                let (key, value) = line
                    .split_once('=')
                    .with_context(|| format!("malformed config line: {line:?}"))?;
                values
                    .entry(current_section.clone())
                    .or_default()
                    .insert(key.trim().to_string(), value.trim().to_string());
            }
        }

        Ok(Config { path, values })
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let mut content = String::new();

        for (section, entries) in &self.values {
            match section.split_once('.') {
                Some((name, subsection)) => {
                    content.push_str(&format!("[{name} \"{subsection}\"]\n"));
                }
                None => content.push_str(&format!("[{section}]\n")),
            }
            for (key, value) in entries {
                content.push_str(&format!("\t{key} = {value}\n"));
            }
            content.push('\n');
        }

        std::fs::write(&self.path, content)
            .with_context(|| format!("failed to write config file at {:?}", self.path))
    }

    /// Look up a dotted key; the last segment is the key, the rest the
    /// section.
    pub fn get(&self, key: &str) -> Option<&str> {
        let (section, key) = key.rsplit_once('.')?;
        self.values
            .get(section)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: String) -> anyhow::Result<()> {
        let (section, key) = key
            .rsplit_once('.')
            .with_context(|| format!("config key needs a section: {key:?}"))?;

        self.values
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value);

        Ok(())
    }

    /// Every key-value pair as dotted keys, in section order.
    pub fn entries(&self) -> impl Iterator<Item = (String, &str)> {
        self.values.iter().flat_map(|(section, entries)| {
            entries
                .iter()
                .map(move |(key, value)| (format!("{section}.{key}"), value.as_str()))
        })
    }

    /// Configured URL of a named remote, if any.
    pub fn remote_url(&self, remote: &str) -> Option<&str> {
        self.get(&format!("remote.{remote}.url"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;

    fn config(temp: &TempDir) -> Config {
        Config::load(temp.path().join("config").into_boxed_path()).unwrap()
    }

    #[test]
    fn set_save_load_round_trip() {
        let temp = TempDir::new().unwrap();

        let mut config = config(&temp);
        config
            .set("remote.origin.url", "https://example.com/repo.git".to_string())
            .unwrap();
        config.set("user.name", "Ada".to_string()).unwrap();
        config.save().unwrap();

        let reloaded = Config::load(temp.path().join("config").into_boxed_path()).unwrap();
        assert_eq!(
            reloaded.get("remote.origin.url"),
            Some("https://example.com/repo.git")
        );
        assert_eq!(reloaded.get("user.name"), Some("Ada"));
        assert_eq!(
            reloaded.remote_url("origin"),
            Some("https://example.com/repo.git")
        );
    }

    #[test]
    fn subsections_render_with_quotes() {
        let temp = TempDir::new().unwrap();

        let mut config = config(&temp);
        config
            .set("remote.upstream.url", "https://example.com/up.git".to_string())
            .unwrap();
        config.save().unwrap();

        let rendered = std::fs::read_to_string(temp.path().join("config")).unwrap();
        assert!(rendered.contains("[remote \"upstream\"]"));
        assert!(rendered.contains("\turl = https://example.com/up.git"));
    }

    #[test]
    fn missing_file_loads_empty() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);

        assert_eq!(config.get("remote.origin.url"), None);
        assert_eq!(config.entries().count(), 0);
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("config"),
            "# a comment\n\n[core]\n\tbare = false\n",
        )
        .unwrap();

        let config = config(&temp);
        assert_eq!(config.get("core.bare"), Some("false"));
    }

    #[test]
    fn keys_without_sections_are_rejected() {
        let temp = TempDir::new().unwrap();
        let mut config = config(&temp);
        assert!(config.set("sectionless", "x".to_string()).is_err());
    }
}
