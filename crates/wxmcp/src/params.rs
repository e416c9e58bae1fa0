//! Declarative parameter schemas checked at dispatch time.

use std::fmt;

use serde_json::{Value, json};

use crate::{
    Arguments,
    arguments::json_type_name,
    error::{ToolError, ValidationReason},
    schema::ToolSchema,
};

/// Primitive JSON type a parameter must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// JSON string.
    String,
    /// Any JSON number.
    Number,
    /// Integral JSON number.
    Integer,
    /// JSON boolean.
    Boolean,
    /// JSON object.
    Object,
    /// JSON array.
    Array,
}

impl ParamType {
    /// JSON Schema type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Whether `value` has this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::String, Value::String(_)) => true,
            (Self::Number, Value::Number(_)) => true,
            (Self::Integer, Value::Number(n)) => {
                n.is_i64() || n.is_u64() || whole_float(value).is_some()
            }
            (Self::Boolean, Value::Bool(_)) => true,
            (Self::Object, Value::Object(_)) => true,
            (Self::Array, Value::Array(_)) => true,
            _ => false,
        }
    }
}

/// Integer form of a float with no fractional part, such as `3.0`.
///
/// `None` for non-floats, fractions and values outside the `i64`/`u64` range.
fn whole_float(value: &Value) -> Option<Value> {
    const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
    const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

    if !value.is_f64() {
        return None;
    }
    let f = value.as_f64()?;
    if f.fract() != 0.0 {
        None
    } else if (-I64_BOUND..I64_BOUND).contains(&f) {
        Some(Value::from(f as i64))
    } else if (0.0..U64_BOUND).contains(&f) {
        Some(Value::from(f as u64))
    } else {
        None
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named parameter of a tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    /// Parameter name as it appears in the arguments object.
    pub name: String,
    /// Expected primitive type.
    pub ty: ParamType,
    /// Whether the caller must supply it.
    pub required: bool,
    /// Human-readable description shown to the host.
    pub description: Option<String>,
}

/// Ordered list of parameters accepted by a tool.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSchema {
    params: Vec<ParamSpec>,
}

impl ParameterSchema {
    /// A schema with no parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required parameter.
    pub fn required(self, name: impl Into<String>, ty: ParamType, description: &str) -> Self {
        self.with_param(name, ty, true, description)
    }

    /// Add an optional parameter.
    pub fn optional(self, name: impl Into<String>, ty: ParamType, description: &str) -> Self {
        self.with_param(name, ty, false, description)
    }

    fn with_param(
        mut self,
        name: impl Into<String>,
        ty: ParamType,
        required: bool,
        description: &str,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            ty,
            required,
            description: (!description.is_empty()).then(|| description.to_string()),
        });
        self
    }

    /// Render as the JSON Schema advertised in `tools/list`.
    pub fn to_tool_schema(&self) -> ToolSchema {
        let mut schema = ToolSchema::empty();
        for param in &self.params {
            let mut property = json!({ "type": param.ty.as_str() });
            if let Some(description) = &param.description {
                property["description"] = Value::from(description.as_str());
            }
            schema = schema.with_property(param.name.clone(), property);
            if param.required {
                schema = schema.with_required(param.name.clone());
            }
        }
        schema
    }

    /// Check `arguments` against the declared parameters.
    ///
    /// Parameters are checked in declaration order and the first failure wins.
    /// Undeclared arguments are dropped and `null` counts as not supplied.
    /// Whole floats given for `Integer` parameters come back as integers.
    pub fn validate(&self, arguments: Option<Arguments>) -> Result<Arguments, ToolError> {
        let mut arguments = arguments.unwrap_or_default();
        arguments.retain_known(self.params.iter().map(|p| p.name.as_str()));

        for param in &self.params {
            match arguments.get_value(&param.name) {
                None | Some(Value::Null) => {
                    if param.required {
                        return Err(ToolError::validation(
                            &param.name,
                            ValidationReason::Missing,
                        ));
                    }
                    arguments.remove(&param.name);
                }
                Some(value) if !param.ty.accepts(value) => {
                    return Err(ToolError::validation(
                        &param.name,
                        ValidationReason::TypeMismatch {
                            expected: param.ty.as_str().to_string(),
                            actual: json_type_name(value).to_string(),
                        },
                    ));
                }
                Some(value) => {
                    if param.ty == ParamType::Integer
                        && let Some(integer) = whole_float(value)
                    {
                        arguments.insert(&param.name, integer);
                    }
                }
            }
        }
        Ok(arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolErrorKind;

    fn schema() -> ParameterSchema {
        ParameterSchema::new()
            .required("city", ParamType::String, "The city")
            .optional("days", ParamType::Integer, "")
    }

    fn validation_of(err: ToolError) -> (String, ValidationReason) {
        match err.kind {
            ToolErrorKind::Validation { parameter, reason } => (parameter, reason),
            other => panic!("expected validation failure, got {other}"),
        }
    }

    #[test]
    fn test_missing_required() {
        let (parameter, reason) = validation_of(schema().validate(None).unwrap_err());
        assert_eq!(parameter, "city");
        assert_eq!(reason, ValidationReason::Missing);

        let args = Arguments::new().set("city", Value::Null);
        let (_, reason) = validation_of(schema().validate(Some(args)).unwrap_err());
        assert_eq!(reason, ValidationReason::Missing);
    }

    #[test]
    fn test_type_mismatch() {
        let args = Arguments::new().set("city", 42);
        let (parameter, reason) = validation_of(schema().validate(Some(args)).unwrap_err());
        assert_eq!(parameter, "city");
        assert_eq!(
            reason,
            ValidationReason::TypeMismatch {
                expected: "string".into(),
                actual: "integer".into(),
            }
        );
    }

    #[test]
    fn test_first_failure_in_declaration_order() {
        let args = Arguments::new().set("days", "three");
        let (parameter, _) = validation_of(schema().validate(Some(args)).unwrap_err());
        assert_eq!(parameter, "city");
    }

    #[test]
    fn test_extras_dropped_and_null_optional_removed() {
        let args = Arguments::new()
            .set("city", "Paris")
            .set("days", Value::Null)
            .set("units", "metric");
        let validated = schema().validate(Some(args)).unwrap();
        assert_eq!(validated.get_string("city").as_deref(), Some("Paris"));
        assert!(!validated.contains("days"));
        assert!(!validated.contains("units"));
    }

    #[test]
    fn test_integer_rejects_fractions() {
        assert!(ParamType::Integer.accepts(&json!(3)));
        assert!(!ParamType::Integer.accepts(&json!(3.5)));
        assert!(ParamType::Integer.accepts(&json!(3.0)));
        assert!(!ParamType::Integer.accepts(&json!(1e300)));
        assert!(ParamType::Number.accepts(&json!(3.5)));
        assert!(ParamType::Number.accepts(&json!(3)));
    }

    #[test]
    fn test_whole_float_becomes_integer() {
        let args = Arguments::new().set("city", "Paris").set("days", 3.0);
        let validated = schema().validate(Some(args)).unwrap();
        assert_eq!(validated.get_value("days"), Some(&json!(3)));
        assert!(validated.get_value("days").unwrap().is_i64());
    }

    #[test]
    fn test_tool_schema_rendering() {
        let rendered = schema().to_tool_schema();
        assert_eq!(rendered.schema_type(), Some("object"));
        let props = rendered.properties().unwrap();
        assert_eq!(props["city"], json!({"type": "string", "description": "The city"}));
        assert_eq!(props["days"], json!({"type": "integer"}));
        assert_eq!(rendered.required(), Some(vec!["city"]));
    }
}
