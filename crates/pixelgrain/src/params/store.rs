use rustc_hash::FxHashMap;
use serde_json::{Map, Value};

use super::types::{ParamDef, ParamValue};

/// Headless model of an effect's configuration UI.
///
/// Owned by whoever edits the timeline (one per open editor), never cached on
/// the effect itself. `apply_config(&form.config())` is a no-op.
#[derive(Debug, Clone)]
pub struct ConfigForm {
    pub defs: Vec<ParamDef>,
    pub values: FxHashMap<String, ParamValue>,
    pub changed: bool,
}

impl ConfigForm {
    pub fn new(defs: &[ParamDef]) -> Self {
        let mut form = Self {
            defs: Vec::new(),
            values: FxHashMap::default(),
            changed: false,
        };
        form.load_from_defs(defs);
        form
    }

    pub fn load_from_defs(&mut self, defs: &[ParamDef]) {
        self.defs = defs.to_vec();
        self.values.clear();
        self.changed = false;
        for def in defs {
            self.values.insert(def.name().to_string(), def.default_value());
        }
    }

    pub fn set(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_string(), value);
        self.changed = true;
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn reset(&mut self, name: &str) {
        if let Some(def) = self.defs.iter().find(|d| d.name() == name) {
            self.values.insert(name.to_string(), def.default_value());
        }
    }

    pub fn reset_all(&mut self) {
        for def in &self.defs {
            self.values.insert(def.name().to_string(), def.default_value());
        }
    }

    /// Load field values from a config object. Missing, unknown or malformed
    /// fields fall back to their defaults.
    pub fn apply_config(&mut self, config: &Value) {
        for def in &self.defs {
            let value = config
                .get(def.name())
                .and_then(|v| def.parse(v))
                .unwrap_or_else(|| def.default_value());
            self.values.insert(def.name().to_string(), value);
        }
        self.changed = false;
    }

    /// Current values as a config object, one key per field.
    pub fn config(&self) -> Value {
        let mut map = Map::new();
        for def in &self.defs {
            let value = self
                .values
                .get(def.name())
                .cloned()
                .unwrap_or_else(|| def.default_value());
            map.insert(def.name().to_string(), value.to_json());
        }
        Value::Object(map)
    }
}
