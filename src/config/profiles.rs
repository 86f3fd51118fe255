//! Profile Store
//!
//! Named parameter bundles resolved to concrete [`Profile`]s at startup.
//! Exactly one is active; switching is explicit and validated.

use std::collections::BTreeMap;

use super::loader::{Config, ConfigError};
use crate::strategy::Profile;

#[derive(Debug, Clone)]
pub struct ProfileStore {
    profiles: BTreeMap<String, Profile>,
    active: String,
}

impl ProfileStore {
    /// Validate every profile and require `active` to exist
    pub fn new(profiles: BTreeMap<String, Profile>, active: &str) -> Result<Self, ConfigError> {
        let mut resolved = BTreeMap::new();
        for (name, mut profile) in profiles {
            // The table key is the profile's name
            profile.name = name.clone();
            profile.validate()?;
            resolved.insert(name, profile);
        }
        let mut store = Self {
            profiles: resolved,
            active: String::new(),
        };
        store.activate(active)?;
        Ok(store)
    }

    /// Built-in presets with `default` active
    pub fn presets() -> Self {
        let profiles = Profile::presets()
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        Self {
            profiles,
            active: "default".to_string(),
        }
    }

    /// Configured profiles, or the presets when none are configured
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let profiles = if config.profiles.is_empty() {
            Profile::presets().into_iter().map(|p| (p.name.clone(), p)).collect()
        } else {
            config.profiles.clone()
        };
        Self::new(profiles, &config.engine.active_profile)
    }

    pub fn active(&self) -> &Profile {
        // `activate` guarantees presence
        &self.profiles[&self.active]
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    /// Make `name` the active profile
    pub fn activate(&mut self, name: &str) -> Result<&Profile, ConfigError> {
        if !self.profiles.contains_key(name) {
            return Err(ConfigError::UnknownProfile {
                name: name.to_string(),
                available: self.names().join(", "),
            });
        }
        self.active = name.to_string();
        Ok(self.active())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::ParamError;
    use rust_decimal_macros::dec;

    #[test]
    fn test_presets() {
        let store = ProfileStore::presets();
        assert_eq!(store.active_name(), "default");
        assert_eq!(store.names(), vec!["aggressive", "conservative", "default", "small_spreads"]);
        assert_eq!(store.get("conservative").unwrap().spread_std_devs, 2.0);
    }

    #[test]
    fn test_keys_become_names() {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "night".to_string(),
            Profile {
                name: String::new(),
                min_profit: dec!(15),
                ..Profile::default()
            },
        );
        let store = ProfileStore::new(profiles, "night").unwrap();
        assert_eq!(store.active().name, "night");
        assert_eq!(store.active().min_profit, dec!(15));
    }

    #[test]
    fn test_activate_unknown_profile() {
        let mut store = ProfileStore::presets();
        let err = store.activate("turbo").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProfile { ref name, .. } if name == "turbo"));
        assert_eq!(store.active_name(), "default");

        assert_eq!(store.activate("small_spreads").unwrap().min_samples_for_signal, 10);
    }

    #[test]
    fn test_invalid_profile_rejected() {
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "broken".to_string(),
            Profile {
                history_size: 5,
                ..Profile::default()
            },
        );
        assert!(matches!(
            ProfileStore::new(profiles, "broken"),
            Err(ConfigError::Param(ParamError::HistoryTooSmall { .. }))
        ));
    }
}
