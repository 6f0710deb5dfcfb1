use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde_json::Value;

use super::Effect;
use super::builtin::{self, ImageProvider};
use crate::error::ConfigError;
use crate::params::ParamDef;

/// Explicit effect id → implementation mapping.
///
/// Populated once at startup and read-only afterwards; builds hold `Arc`s to
/// the effects they resolved, so the registry itself is never borrowed across
/// an await.
pub struct EffectRegistry {
    effects: FxHashMap<String, Arc<dyn Effect>>,
    /// Ids in registration order, for menus and `--list`.
    order: Vec<String>,
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self {
            effects: FxHashMap::default(),
            order: Vec::new(),
        }
    }

    /// Registry holding every built-in effect. `images` backs `ChangeImage`.
    pub fn with_builtins(images: Arc<dyn ImageProvider>) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for effect in builtin::all(images) {
            registry.register_arc(effect)?;
        }
        log::debug!("Registered {} built-in effects", registry.len());
        Ok(registry)
    }

    pub fn register(&mut self, effect: impl Effect + 'static) -> Result<(), ConfigError> {
        self.register_arc(Arc::new(effect))
    }

    /// Fails on an id that is already taken.
    pub fn register_arc(&mut self, effect: Arc<dyn Effect>) -> Result<(), ConfigError> {
        let id = effect.id().to_string();
        if self.effects.contains_key(&id) {
            return Err(ConfigError::DuplicateEffect(id));
        }
        self.order.push(id.clone());
        self.effects.insert(id, effect);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn Effect>, ConfigError> {
        self.effects
            .get(id)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownEffect(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn display_name(&self, id: &str) -> Result<&'static str, ConfigError> {
        self.get(id).map(|e| e.display_name())
    }

    pub fn default_config(&self, id: &str) -> Result<Value, ConfigError> {
        self.get(id).map(|e| e.default_config())
    }

    pub fn params(&self, id: &str) -> Result<Vec<ParamDef>, ConfigError> {
        self.get(id).map(|e| e.params())
    }

    /// Effects whose id or display name contains `query`, case-insensitively.
    pub fn search(&self, query: &str) -> Vec<Arc<dyn Effect>> {
        let query = query.to_lowercase();
        self.order
            .iter()
            .filter_map(|id| self.effects.get(id))
            .filter(|e| {
                e.id().to_lowercase().contains(&query)
                    || e.display_name().to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::builtin::MemoryImageProvider;
    use crate::effect::{RegisterFuture, Registration};

    struct MockEffect {
        id: &'static str,
        display_name: &'static str,
    }

    impl Effect for MockEffect {
        fn id(&self) -> &'static str {
            self.id
        }

        fn display_name(&self) -> &'static str {
            self.display_name
        }

        fn params(&self) -> Vec<ParamDef> {
            vec![ParamDef::float("amount", "Amount", 0.5, 0.0, 1.0)]
        }

        fn register<'a>(&'a self, _reg: Registration<'a>) -> RegisterFuture<'a> {
            Box::pin(async { Ok(()) })
        }
    }

    fn mock(id: &'static str, display_name: &'static str) -> MockEffect {
        MockEffect { id, display_name }
    }

    #[test]
    fn register_and_get() {
        let mut registry = EffectRegistry::new();
        assert!(registry.is_empty());
        registry.register(mock("Blur", "Gaussian Blur")).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.get("Blur").is_ok());
        assert_eq!(registry.get("Blur").unwrap().display_name(), "Gaussian Blur");
        assert_eq!(registry.display_name("Blur").unwrap(), "Gaussian Blur");
    }

    #[test]
    fn unknown_id_is_a_config_error() {
        let registry = EffectRegistry::new();
        let err = registry.get("Nope").err().unwrap();
        assert_eq!(err.to_string(), "No such effect: Nope");
    }

    #[test]
    fn duplicate_ids_fail_fast() {
        let mut registry = EffectRegistry::new();
        registry.register(mock("Blur", "A")).unwrap();
        assert_eq!(
            registry.register(mock("Blur", "B")),
            Err(ConfigError::DuplicateEffect("Blur".into()))
        );
        assert_eq!(registry.display_name("Blur").unwrap(), "A");
    }

    #[test]
    fn ids_keep_registration_order() {
        let mut registry = EffectRegistry::new();
        for id in ["C", "A", "B"] {
            registry.register(mock(id, id)).unwrap();
        }
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["C", "A", "B"]);
    }

    #[test]
    fn search_matches_id_and_display_name() {
        let mut registry = EffectRegistry::new();
        registry.register(mock("Blur", "Gaussian Blur")).unwrap();
        registry.register(mock("Tint", "Color Tint")).unwrap();
        assert_eq!(registry.search("blur").len(), 1);
        assert_eq!(registry.search("gaussian").len(), 1);
        assert_eq!(registry.search("t").len(), 1);
        assert_eq!(registry.search("zzz").len(), 0);
    }

    #[test]
    fn default_config_comes_from_params() {
        let mut registry = EffectRegistry::new();
        registry.register(mock("Blur", "Blur")).unwrap();
        assert_eq!(
            registry.default_config("Blur").unwrap(),
            serde_json::json!({"amount": 0.5})
        );
    }

    #[test]
    fn builtins_are_all_registered() {
        let registry =
            EffectRegistry::with_builtins(Arc::new(MemoryImageProvider::default())).unwrap();
        for id in ["Wave", "HueDisplace", "Converge", "Colorize", "ChangeImage", "Dummy"] {
            assert!(registry.get(id).is_ok(), "missing {id}");
        }
    }
}
