use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Untyped argument mapping carried by a `tools/call` request.
///
/// The wire form is a JSON object. Tool handlers normally never see this type
/// directly: the registry validates it against the tool's parameter schema and
/// then deserializes it into the handler's typed parameter struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    /// Create an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build arguments from an arbitrary JSON value, which must be an object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(Error::InvalidParams(format!(
                "arguments must be an object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Insert or replace a value, returning `self` for chaining.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Raw JSON value for `name`.
    pub fn get_value(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Typed value for `name`; `None` when absent or of the wrong shape.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.0
            .get(name)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// String value for `name`.
    pub fn get_string(&self, name: &str) -> Option<String> {
        self.0.get(name).and_then(Value::as_str).map(str::to_string)
    }

    /// Whether an argument named `name` was supplied.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Insert or replace a value in place.
    pub(crate) fn insert(&mut self, name: &str, value: Value) {
        self.0.insert(name.to_string(), value);
    }

    /// Remove an argument, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.0.remove(name)
    }

    /// Drop every argument whose name is not in `known`.
    pub fn retain_known<'a>(&mut self, known: impl IntoIterator<Item = &'a str>) {
        let known: Vec<&str> = known.into_iter().collect();
        self.0.retain(|name, _| known.contains(&name.as_str()));
    }

    /// Deserialize the whole argument set into a typed struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.0.clone()))
            .map_err(|e| Error::InvalidParams(e.to_string()))
    }

    /// Number of arguments supplied.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no arguments were supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Arguments> for Value {
    fn from(arguments: Arguments) -> Self {
        Value::Object(arguments.0)
    }
}

/// Lower-case JSON type name of a value, as reported in validation failures.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_typed_access() {
        let args = Arguments::new().set("city", "Paris").set("days", 3);
        assert_eq!(args.get::<String>("city").as_deref(), Some("Paris"));
        assert_eq!(args.get::<u32>("days"), Some(3));
        assert_eq!(args.get::<u32>("city"), None);
        assert_eq!(args.get_string("missing"), None);
        assert_eq!(args.get_value("days"), Some(&json!(3)));
    }

    #[test]
    fn test_retain_known_drops_extras() {
        let mut args = Arguments::new().set("city", "Oslo").set("units", "metric");
        args.retain_known(["city"]);
        assert!(args.contains("city"));
        assert!(!args.contains("units"));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_deserialize_into_struct() {
        #[derive(Debug, serde::Deserialize, PartialEq)]
        struct Params {
            city: String,
        }

        let args = Arguments::new().set("city", "Lima");
        let params: Params = args.deserialize().unwrap();
        assert_eq!(
            params,
            Params {
                city: "Lima".into()
            }
        );

        let err = Arguments::new().deserialize::<Params>().unwrap_err();
        assert!(matches!(err, Error::InvalidParams(_)));
    }

    #[test]
    fn test_from_value_requires_object() {
        assert!(Arguments::from_value(json!({"a": 1})).is_ok());
        assert!(Arguments::from_value(Value::Null).unwrap().is_empty());
        assert!(matches!(
            Arguments::from_value(json!([1, 2])),
            Err(Error::InvalidParams(_))
        ));
    }

    #[test]
    fn test_json_type_names() {
        assert_eq!(json_type_name(&json!(1)), "integer");
        assert_eq!(json_type_name(&json!(1.5)), "number");
        assert_eq!(json_type_name(&json!("x")), "string");
        assert_eq!(json_type_name(&json!(null)), "null");
    }
}
