//! Schema generation for configuration files.
//!
//! Profile types are plain data records held in a [`ProfileTypeRegistry`].
//! [`build`] turns a registry into a JSON Schema document and [`parse`]
//! recovers the type definitions from one.

mod registry;
mod validate;

pub use registry::ProfileTypeRegistry;
pub use validate::validate;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::warn;

pub const JSON_SCHEMA_URI: &str = "https://json-schema.org/draft/2020-12/schema";
pub const SCHEMA_VERSION: &str = "1.0";
const PROFILE_NAME_PATTERN: &str = r"^\S*$";

/// JSON type of a profile property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
    Null,
}

impl JsonType {
    pub fn matches(self, value: &Value) -> bool {
        match self {
            JsonType::String => value.is_string(),
            JsonType::Number => value.is_number(),
            JsonType::Integer => value.is_i64() || value.is_u64(),
            JsonType::Boolean => value.is_boolean(),
            JsonType::Object => value.is_object(),
            JsonType::Array => value.is_array(),
            JsonType::Null => value.is_null(),
        }
    }

    /// Placeholder used in generated templates.
    pub fn empty_value(self) -> Value {
        match self {
            JsonType::String => json!(""),
            JsonType::Number | JsonType::Integer => json!(0),
            JsonType::Boolean => json!(false),
            JsonType::Object => json!({}),
            JsonType::Array => json!([]),
            JsonType::Null => Value::Null,
        }
    }
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JsonType::String => "string",
            JsonType::Number => "number",
            JsonType::Integer => "integer",
            JsonType::Boolean => "boolean",
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::Null => "null",
        };
        f.write_str(name)
    }
}

/// Declared `type` of a property: one JSON type or a union of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyType {
    One(JsonType),
    AnyOf(Vec<JsonType>),
}

impl Default for PropertyType {
    fn default() -> Self {
        PropertyType::One(JsonType::String)
    }
}

impl From<JsonType> for PropertyType {
    fn from(kind: JsonType) -> Self {
        PropertyType::One(kind)
    }
}

impl PropertyType {
    /// The type used for coercion and templates: the first non-null member.
    pub fn primary(&self) -> JsonType {
        match self {
            PropertyType::One(kind) => *kind,
            PropertyType::AnyOf(kinds) => kinds
                .iter()
                .copied()
                .find(|k| *k != JsonType::Null)
                .or_else(|| kinds.first().copied())
                .unwrap_or_default(),
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            PropertyType::One(kind) => kind.matches(value),
            PropertyType::AnyOf(kinds) => kinds.iter().any(|k| k.matches(value)),
        }
    }

    pub fn empty_value(&self) -> Value {
        self.primary().empty_value()
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyType::One(kind) => write!(f, "{kind}"),
            PropertyType::AnyOf(kinds) => {
                let names: Vec<String> = kinds.iter().map(ToString::to_string).collect();
                f.write_str(&names.join(" or "))
            }
        }
    }
}

/// One property of a profile type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDef {
    #[serde(rename = "type", default)]
    pub kind: PropertyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub include_in_template: bool,
    /// Attributes with no dedicated field, carried into the schema as is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PropertyDef {
    pub fn new(kind: JsonType) -> Self {
        Self {
            kind: kind.into(),
            ..Default::default()
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    pub fn in_template(mut self) -> Self {
        self.include_in_template = true;
        self
    }

    /// Whether `value` fits the declared type. Nodes kept undecoded accept anything.
    pub fn accepts(&self, value: &Value) -> bool {
        self.extra.contains_key("type") || self.kind.matches(value)
    }

    /// Lift a legacy `optionDefinition` block into the plain fields.
    pub(crate) fn normalize(&mut self) {
        let Some(Value::Object(option)) = self.extra.shift_remove("optionDefinition") else {
            return;
        };
        if self.description.is_none() {
            self.description = option
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        if self.default.is_none() {
            self.default = option.get("defaultValue").filter(|v| !v.is_null()).cloned();
        }
        if self.allowed.is_none() {
            self.allowed = option
                .get("allowableValues")
                .and_then(|a| a.get("values"))
                .and_then(Value::as_array)
                .cloned();
        }
    }

    /// Property node as it appears in the schema.
    fn to_schema(&self) -> Value {
        let mut node = Map::new();
        let kind = self.extra.get("type").cloned().unwrap_or_else(|| json!(self.kind));
        node.insert("type".to_string(), kind);
        if let Some(description) = &self.description {
            node.insert("description".to_string(), json!(description));
        }
        if let Some(default) = &self.default {
            node.insert("default".to_string(), default.clone());
        }
        if let Some(allowed) = &self.allowed {
            node.insert("enum".to_string(), Value::Array(allowed.clone()));
        }
        for (key, value) in &self.extra {
            node.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(node)
    }

    /// Decode a schema node. A node the typed fields cannot hold is kept
    /// whole in `extra` so rebuilding the schema reproduces it.
    fn from_schema(node: &Value, secure: bool) -> Self {
        let mut def = match serde_json::from_value::<PropertyDef>(node.clone()) {
            Ok(def) => def,
            Err(e) => {
                warn!(error = %e, "keeping undecodable property node as is");
                PropertyDef {
                    extra: node.as_object().cloned().unwrap_or_default(),
                    ..Default::default()
                }
            }
        };
        def.secure = secure;
        def
    }
}

/// Property layout of a profile type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", default = "object_type")]
    pub kind: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
}

fn object_type() -> String {
    "object".to_string()
}

impl Default for ProfileSchema {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            kind: object_type(),
            properties: BTreeMap::new(),
            required: Vec::new(),
        }
    }
}

/// A named profile type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileTypeDef {
    #[serde(rename = "type")]
    pub name: String,
    pub schema: ProfileSchema,
}

impl ProfileTypeDef {
    pub fn new(name: &str, title: &str) -> Self {
        Self {
            name: name.to_string(),
            schema: ProfileSchema {
                title: Some(title.to_string()),
                ..Default::default()
            },
        }
    }

    pub fn property(mut self, name: &str, def: PropertyDef) -> Self {
        self.schema.properties.insert(name.to_string(), def);
        self
    }

    pub fn secure_properties(&self) -> Vec<&str> {
        self.schema
            .properties
            .iter()
            .filter(|(_, p)| p.secure)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// The `then` branch for this type inside the profile `allOf`.
    fn to_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .schema
            .properties
            .iter()
            .map(|(name, def)| (name.clone(), def.to_schema()))
            .collect();

        let mut props_schema = Map::new();
        props_schema.insert("type".to_string(), json!(self.schema.kind));
        if let Some(title) = &self.schema.title {
            props_schema.insert("title".to_string(), json!(title));
        }
        if let Some(description) = &self.schema.description {
            props_schema.insert("description".to_string(), json!(description));
        }
        props_schema.insert("properties".to_string(), Value::Object(properties));
        if !self.schema.required.is_empty() {
            props_schema.insert("required".to_string(), json!(self.schema.required));
        }

        let mut then = Map::new();
        then.insert("properties".to_string(), Value::Object(props_schema));
        let secure = self.secure_properties();
        if !secure.is_empty() {
            then.insert("secure".to_string(), json!({"items": {"enum": secure}}));
        }
        json!({
            "if": {"properties": {"type": {"const": self.name}}},
            "then": {"properties": Value::Object(then)}
        })
    }

    fn from_schema(entry: &Value) -> Option<Self> {
        let name = entry
            .pointer("/if/properties/type/const")
            .and_then(Value::as_str)?;
        let then = entry.pointer("/then/properties")?;
        let props_schema = then.get("properties").cloned().unwrap_or_else(|| json!({}));

        // Older schemas used `prefixItems` for the secure list.
        let secure: Vec<&str> = then
            .get("secure")
            .and_then(|s| s.get("items").or_else(|| s.get("prefixItems")))
            .and_then(|i| i.get("enum"))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let properties = props_schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(k, v)| (k.clone(), PropertyDef::from_schema(v, secure.contains(&k.as_str()))))
                    .collect()
            })
            .unwrap_or_default();

        Some(Self {
            name: name.to_string(),
            schema: ProfileSchema {
                title: props_schema.get("title").and_then(Value::as_str).map(str::to_string),
                description: props_schema
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                kind: props_schema
                    .get("type")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(object_type),
                properties,
                required: props_schema
                    .get("required")
                    .and_then(Value::as_array)
                    .map(|r| r.iter().filter_map(Value::as_str).map(str::to_string).collect())
                    .unwrap_or_default(),
            },
        })
    }
}

/// Build the configuration schema for every registered type.
///
/// Output depends only on the set of types, never on registration order.
pub fn build(registry: &ProfileTypeRegistry) -> Value {
    let mut type_entries = Vec::new();
    let mut default_properties = Map::new();
    for def in registry.iter() {
        type_entries.push(def.to_schema());
        default_properties.insert(
            def.name.clone(),
            json!({"description": format!("Default {} profile", def.name), "type": "string"}),
        );
    }
    let type_names: Vec<&String> = default_properties.keys().collect();

    let mut all_of = vec![json!({
        "if": {"properties": {"type": false}},
        "then": {"properties": {"properties": {"title": "Missing profile type"}}}
    })];
    all_of.extend(type_entries);

    json!({
        "$schema": JSON_SCHEMA_URI,
        "$version": SCHEMA_VERSION,
        "type": "object",
        "description": "Team configuration",
        "properties": {
            "profiles": {
                "type": "object",
                "description": "Mapping of profile names to profile configurations",
                "patternProperties": {
                    PROFILE_NAME_PATTERN: {
                        "type": "object",
                        "description": "Profile configuration object",
                        "properties": {
                            "type": {
                                "description": "Profile type",
                                "type": "string",
                                "enum": type_names
                            },
                            "properties": {
                                "description": "Profile properties object",
                                "type": "object"
                            },
                            "profiles": {
                                "description": "Optional subprofile configurations",
                                "type": "object",
                                "$ref": "#/properties/profiles"
                            },
                            "secure": {
                                "description": "Secure property names",
                                "type": "array",
                                "items": {"type": "string"},
                                "uniqueItems": true
                            }
                        },
                        "allOf": all_of
                    }
                }
            },
            "defaults": {
                "type": "object",
                "description": "Mapping of profile types to default profile names",
                "properties": default_properties
            },
            "autoStore": {
                "type": "boolean",
                "description": "If true, values you enter when prompted are stored for future use"
            }
        }
    })
}

/// Recover profile type definitions from a built schema.
pub fn parse(schema: &Value) -> Vec<ProfileTypeDef> {
    let Some(patterns) = schema
        .pointer("/properties/profiles/patternProperties")
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };
    patterns
        .values()
        .next()
        .and_then(|p| p.get("allOf"))
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(ProfileTypeDef::from_schema).collect())
        .unwrap_or_default()
}

/// Starter document: one profile per type, each the default for its type.
pub fn template(registry: &ProfileTypeRegistry) -> Value {
    let mut profiles = Map::new();
    let mut defaults = Map::new();
    for def in registry.iter() {
        let mut properties = Map::new();
        let mut secure = Vec::new();
        for (name, prop) in def.schema.properties.iter().filter(|(_, p)| p.include_in_template) {
            if prop.secure {
                secure.push(json!(name));
            } else {
                let value = prop.default.clone().unwrap_or_else(|| prop.kind.empty_value());
                properties.insert(name.clone(), value);
            }
        }
        profiles.insert(
            def.name.clone(),
            json!({"type": def.name, "properties": properties, "secure": secure}),
        );
        defaults.insert(def.name.clone(), json!(def.name));
    }
    json!({"profiles": profiles, "defaults": defaults, "autoStore": true})
}

/// Declared JSON type of a profile property path in a config document.
pub fn find_property_type(path: &str, config: &Value, types: &[ProfileTypeDef]) -> Option<JsonType> {
    let (profile_path, prop) = path.split_once(".properties.")?;
    let kind = crate::config::dot_path::get(config, &format!("{profile_path}.type"))?.as_str()?;
    types
        .iter()
        .find(|t| t.name == kind)?
        .schema
        .properties
        .get(prop)
        .map(|p| p.kind.primary())
}
