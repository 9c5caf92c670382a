//! Run configuration: defaults, an optional YAML file, then environment overrides.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{env, fs, path::PathBuf, time::Duration};

/// Environment variable naming an optional YAML config file.
pub const CONFIG_FILE_ENV: &str = "INVOICES_CONFIG";

/// What to do when two input files strip to the same record id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Fail the load.
    #[default]
    Reject,
    /// Keep every row; the id indexes all files that produced it.
    Keep,
}

impl DuplicatePolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Some(DuplicatePolicy::Reject),
            "keep" => Some(DuplicatePolicy::Keep),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory scanned for `*.csv` invoice files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Directory the reports are written to (created if absent)
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Size of the loader's worker pool, also the number of chunks
    #[serde(default = "default_n_workers")]
    pub n_workers: usize,

    /// Upper bound on how long the coordinator waits for all workers
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,

    #[serde(default)]
    pub duplicate_ids: DuplicatePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            output_dir: default_output_dir(),
            n_workers: default_n_workers(),
            load_timeout_secs: default_load_timeout_secs(),
            duplicate_ids: DuplicatePolicy::default(),
        }
    }
}

impl Config {
    /// Defaults, then the YAML file named by `INVOICES_CONFIG` if set, then
    /// `INVOICES_*` variables. The result is validated.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| env::var(key).ok())
    }

    /// `load` with variables read through `lookup` instead of the process environment.
    pub fn load_with<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(&PathBuf::from(path))?,
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&contents).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Override fields from variables returned by `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("INVOICES_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("INVOICES_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("INVOICES_WORKERS") {
            self.n_workers = v
                .trim()
                .parse()
                .with_context(|| format!("INVOICES_WORKERS={:?} is not a number", v))?;
        }
        if let Some(v) = lookup("INVOICES_LOAD_TIMEOUT_SECS") {
            self.load_timeout_secs = v
                .trim()
                .parse()
                .with_context(|| format!("INVOICES_LOAD_TIMEOUT_SECS={:?} is not a number", v))?;
        }
        if let Some(v) = lookup("INVOICES_DUPLICATE_IDS") {
            self.duplicate_ids = match DuplicatePolicy::from_str(&v) {
                Some(p) => p,
                None => bail!(
                    "INVOICES_DUPLICATE_IDS must be `reject` or `keep`, got {:?}",
                    v
                ),
            };
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_workers == 0 {
            bail!("n_workers must be > 0");
        }
        if self.load_timeout_secs == 0 {
            bail!("load_timeout_secs must be > 0");
        }
        Ok(())
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("inp")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_n_workers() -> usize {
    4
}

fn default_load_timeout_secs() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_documented_values() {
        let c = Config::default();
        assert_eq!(c.data_dir, PathBuf::from("inp"));
        assert_eq!(c.output_dir, PathBuf::from("output"));
        assert_eq!(c.n_workers, 4);
        assert_eq!(c.duplicate_ids, DuplicatePolicy::Reject);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn yaml_fills_missing_fields_with_defaults() -> Result<()> {
        let c = Config::from_yaml("n_workers: 8\nduplicate_ids: keep\n")?;
        assert_eq!(c.n_workers, 8);
        assert_eq!(c.duplicate_ids, DuplicatePolicy::Keep);
        assert_eq!(c.data_dir, PathBuf::from("inp"));
        assert_eq!(c.load_timeout(), Duration::from_secs(300));
        Ok(())
    }

    #[test]
    fn env_overrides_file_values() -> Result<()> {
        let vars: HashMap<&str, &str> = [
            ("INVOICES_DATA_DIR", "/data/in"),
            ("INVOICES_WORKERS", " 2 "),
            ("INVOICES_DUPLICATE_IDS", "KEEP"),
        ]
        .into_iter()
        .collect();
        let mut c = Config::from_yaml("n_workers: 8\n")?;
        c.apply_env(|k| vars.get(k).map(|v| v.to_string()))?;
        assert_eq!(c.data_dir, PathBuf::from("/data/in"));
        assert_eq!(c.n_workers, 2);
        assert_eq!(c.duplicate_ids, DuplicatePolicy::Keep);
        Ok(())
    }

    #[test]
    fn config_file_is_read_then_overridden() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("invoices.yaml");
        fs::write(
            &path,
            "data_dir: /srv/invoices\nn_workers: 6\nload_timeout_secs: 60\n",
        )?;
        let file = path.to_string_lossy().to_string();

        let c = Config::load_with(|k| match k {
            CONFIG_FILE_ENV => Some(file.clone()),
            "INVOICES_WORKERS" => Some("3".to_string()),
            _ => None,
        })?;
        assert_eq!(c.data_dir, PathBuf::from("/srv/invoices"));
        assert_eq!(c.output_dir, PathBuf::from("output"));
        assert_eq!(c.n_workers, 3);
        assert_eq!(c.load_timeout(), Duration::from_secs(60));
        Ok(())
    }

    #[test]
    fn missing_or_broken_config_file_fails() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("nope.yaml");
        let err = Config::from_file(&missing).unwrap_err();
        assert!(format!("{:#}", err).contains("reading config file"));

        let broken = dir.path().join("broken.yaml");
        fs::write(&broken, "n_workers: [not, a, number]\n")?;
        let file = broken.to_string_lossy().to_string();
        let lookup = |k: &str| (k == CONFIG_FILE_ENV).then(|| file.clone());
        let err = Config::load_with(lookup).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing"));

        // parses, but fails validation
        fs::write(&broken, "n_workers: 0\n")?;
        assert!(Config::load_with(lookup).is_err());
        Ok(())
    }

    #[test]
    fn rejects_bad_values() {
        let mut c = Config::default();
        assert!(c
            .apply_env(|k| (k == "INVOICES_WORKERS").then(|| "many".to_string()))
            .is_err());

        let mut c = Config::default();
        assert!(c
            .apply_env(|k| (k == "INVOICES_DUPLICATE_IDS").then(|| "merge".to_string()))
            .is_err());

        let c = Config {
            n_workers: 0,
            ..Config::default()
        };
        assert!(c.validate().is_err());
    }
}
