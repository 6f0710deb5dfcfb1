use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One field of an effect's configuration form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ParamDef {
    Float {
        name: String,
        label: String,
        default: f32,
        min: f32,
        max: f32,
    },
    Bool {
        name: String,
        label: String,
        default: bool,
    },
    Color {
        name: String,
        label: String,
        default: [f32; 3],
    },
    Point2D {
        name: String,
        label: String,
        default: [f32; 2],
        min: [f32; 2],
        max: [f32; 2],
    },
    Choice {
        name: String,
        label: String,
        default: String,
        options: Vec<String>,
    },
}

impl ParamDef {
    pub fn float(name: &str, label: &str, default: f32, min: f32, max: f32) -> Self {
        ParamDef::Float {
            name: name.into(),
            label: label.into(),
            default,
            min,
            max,
        }
    }

    pub fn bool(name: &str, label: &str, default: bool) -> Self {
        ParamDef::Bool {
            name: name.into(),
            label: label.into(),
            default,
        }
    }

    pub fn color(name: &str, label: &str, default: [f32; 3]) -> Self {
        ParamDef::Color {
            name: name.into(),
            label: label.into(),
            default,
        }
    }

    pub fn point(name: &str, label: &str, default: [f32; 2], min: [f32; 2], max: [f32; 2]) -> Self {
        ParamDef::Point2D {
            name: name.into(),
            label: label.into(),
            default,
            min,
            max,
        }
    }

    pub fn choice(name: &str, label: &str, default: &str, options: &[&str]) -> Self {
        ParamDef::Choice {
            name: name.into(),
            label: label.into(),
            default: default.into(),
            options: options.iter().map(|o| (*o).to_string()).collect(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ParamDef::Float { name, .. }
            | ParamDef::Bool { name, .. }
            | ParamDef::Color { name, .. }
            | ParamDef::Point2D { name, .. }
            | ParamDef::Choice { name, .. } => name,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            ParamDef::Float { label, .. }
            | ParamDef::Bool { label, .. }
            | ParamDef::Color { label, .. }
            | ParamDef::Point2D { label, .. }
            | ParamDef::Choice { label, .. } => label,
        }
    }

    pub fn default_value(&self) -> ParamValue {
        match self {
            ParamDef::Float { default, .. } => ParamValue::Float(*default),
            ParamDef::Bool { default, .. } => ParamValue::Bool(*default),
            ParamDef::Color { default, .. } => ParamValue::Color(*default),
            ParamDef::Point2D { default, .. } => ParamValue::Point2D(*default),
            ParamDef::Choice { default, .. } => ParamValue::Choice(default.clone()),
        }
    }

    /// Read this field from a JSON config value. `None` if the value has the
    /// wrong shape (or names an unknown choice), in which case callers keep the default.
    pub fn parse(&self, value: &Value) -> Option<ParamValue> {
        match self {
            ParamDef::Float { min, max, .. } => {
                let v = value.as_f64()? as f32;
                Some(ParamValue::Float(v.clamp(*min, *max)))
            }
            ParamDef::Bool { .. } => value.as_bool().map(ParamValue::Bool),
            ParamDef::Color { .. } => {
                let c: [f32; 3] = serde_json::from_value(value.clone()).ok()?;
                Some(ParamValue::Color(c.map(|x| x.clamp(0.0, 1.0))))
            }
            ParamDef::Point2D { min, max, .. } => {
                let p: [f32; 2] = serde_json::from_value(value.clone()).ok()?;
                Some(ParamValue::Point2D([
                    p[0].clamp(min[0], max[0]),
                    p[1].clamp(min[1], max[1]),
                ]))
            }
            ParamDef::Choice { options, .. } => {
                let s = value.as_str()?;
                options
                    .iter()
                    .any(|o| o == s)
                    .then(|| ParamValue::Choice(s.to_string()))
            }
        }
    }

    pub fn random_value(&self, rng: &mut dyn RngCore) -> ParamValue {
        match self {
            ParamDef::Float { min, max, .. } => ParamValue::Float(rng.random_range(*min..=*max)),
            ParamDef::Bool { .. } => ParamValue::Bool(rng.random_bool(0.5)),
            ParamDef::Color { .. } => {
                ParamValue::Color([rng.random::<f32>(), rng.random::<f32>(), rng.random::<f32>()])
            }
            ParamDef::Point2D { min, max, .. } => ParamValue::Point2D([
                rng.random_range(min[0]..=max[0]),
                rng.random_range(min[1]..=max[1]),
            ]),
            ParamDef::Choice { options, default, .. } => {
                if options.is_empty() {
                    ParamValue::Choice(default.clone())
                } else {
                    ParamValue::Choice(options[rng.random_range(0..options.len())].clone())
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Float(f32),
    Bool(bool),
    Color([f32; 3]),
    Point2D([f32; 2]),
    Choice(String),
}

impl ParamValue {
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Float(v) => Value::from(*v),
            ParamValue::Bool(b) => Value::Bool(*b),
            ParamValue::Color(c) => c.iter().map(|x| Value::from(*x)).collect(),
            ParamValue::Point2D(p) => p.iter().map(|x| Value::from(*x)).collect(),
            ParamValue::Choice(s) => Value::String(s.clone()),
        }
    }
}
