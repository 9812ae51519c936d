//! Saved customer profile: a JSON file under the platform config
//! directory, so repeat runs only need a task list.

use anyhow::Context;
use cartflow_core_types::Customer;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "cartflow";
const PROFILE_FILE: &str = "profile.json";

pub struct ProfileStore {
    path: PathBuf,
}

impl ProfileStore {
    /// Store at the platform default location, e.g.
    /// `~/.config/cartflow/profile.json` on Linux.
    pub fn new() -> anyhow::Result<Self> {
        let base = dirs::config_dir().context("no config directory on this platform")?;
        Ok(Self {
            path: base.join(APP_DIR).join(PROFILE_FILE),
        })
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when no profile has been saved yet.
    pub fn load(&self) -> anyhow::Result<Option<Customer>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let customer = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(Some(customer))
    }

    pub fn save(&self, customer: &Customer) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(customer)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cartflow_core_types::Contact;

    fn temp_store(name: &str) -> ProfileStore {
        let path = std::env::temp_dir()
            .join(format!("cartflow-profile-test-{}-{name}", std::process::id()))
            .join(PROFILE_FILE);
        ProfileStore::at(path)
    }

    #[test]
    fn round_trips_a_profile() {
        let store = temp_store("roundtrip");
        let customer = Customer {
            contact: Contact {
                email: "jo@example.com".into(),
                first_name: "Jo".into(),
                last_name: "Doe".into(),
                phone: None,
            },
            ..Customer::default()
        };
        store.save(&customer).expect("save");
        let loaded = store.load().expect("load").expect("present");
        assert_eq!(loaded, customer);
        std::fs::remove_file(store.path()).ok();
    }

    #[test]
    fn missing_profile_is_none() {
        let store = temp_store("missing");
        assert!(store.load().expect("load").is_none());
    }
}
