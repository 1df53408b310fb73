use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FrogError, Result};

/// Prefix of the parameters the executor injects for each dependency.
pub const DEPENDENCY_PREFIX: &str = "dep_";

/// JSON type expected for a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Any,
}

impl ParamKind {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::Any => true,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Any => "any",
        }
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

/// Declared parameter set of a tool, checked at dispatch time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSchema {
    pub params: Vec<ParamSpec>,
    /// Accept keys that are not declared.
    #[serde(default)]
    pub allow_extra: bool,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schema that accepts any parameters.
    pub fn open() -> Self {
        Self {
            params: vec![],
            allow_extra: true,
        }
    }

    pub fn required(mut self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        });
        self
    }

    pub fn optional(mut self, name: &str, kind: ParamKind, description: &str) -> Self {
        self.params.push(ParamSpec {
            name: name.to_string(),
            kind,
            required: false,
            description: description.to_string(),
        });
        self
    }

    pub fn allow_extra(mut self) -> Self {
        self.allow_extra = true;
        self
    }

    /// Check a parameter map against this schema.
    ///
    /// Dependency results (`dep_*`) are always accepted.
    pub fn validate(&self, params: &Map<String, Value>) -> Result<()> {
        for spec in &self.params {
            match params.get(&spec.name) {
                Some(value) if !spec.kind.matches(value) => {
                    return Err(FrogError::ToolValidation(format!(
                        "'{}' must be of type {}",
                        spec.name,
                        spec.kind.as_str()
                    )));
                }
                None if spec.required => {
                    return Err(FrogError::ToolValidation(format!(
                        "missing required parameter '{}'",
                        spec.name
                    )));
                }
                _ => {}
            }
        }

        if !self.allow_extra {
            if let Some(unknown) = params.keys().find(|key| {
                !key.starts_with(DEPENDENCY_PREFIX) && !self.params.iter().any(|p| &p.name == *key)
            }) {
                return Err(FrogError::ToolValidation(format!(
                    "unknown parameter '{}'",
                    unknown
                )));
            }
        }

        Ok(())
    }

    /// Render as a JSON Schema object for tool listings.
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for spec in &self.params {
            let mut prop = Map::new();
            if spec.kind != ParamKind::Any {
                prop.insert("type".into(), Value::String(spec.kind.as_str().into()));
            }
            if !spec.description.is_empty() {
                prop.insert("description".into(), Value::String(spec.description.clone()));
            }
            properties.insert(spec.name.clone(), Value::Object(prop));
        }
        let required: Vec<Value> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| Value::String(p.name.clone()))
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": self.allow_extra,
        })
    }
}
