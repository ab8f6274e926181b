//! Static parameter metadata and JSON-RPC argument normalization.
//!
//! Every registered method carries a [`ParameterDescriptor`] built once at
//! registration. [`normalize`] is a pure function over that descriptor: it
//! fills absent parameters from their declared defaults and turns decimal
//! strings into integers for integer-typed parameters. Identifiers such as
//! logical time or shard ids are often sent as strings because generic JSON
//! number handling loses precision above 2^53.

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::error::NormalizeError;

/// Primitive kind expected for a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    OptionalInteger,
    String,
    OptionalString,
    Boolean,
    Object,
    OptionalObject,
    Array,
    /// Accepts any JSON value (e.g. a method given by name or by id)
    Any,
}

impl ParamKind {
    /// Integer-valued kinds are subject to string-to-integer coercion
    pub fn is_integer(&self) -> bool {
        matches!(self, ParamKind::Integer | ParamKind::OptionalInteger)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, ParamKind::Boolean)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::Integer => "integer",
            ParamKind::OptionalInteger => "optional integer",
            ParamKind::String => "string",
            ParamKind::OptionalString => "optional string",
            ParamKind::Boolean => "boolean",
            ParamKind::Object => "object",
            ParamKind::OptionalObject => "optional object",
            ParamKind::Array => "array",
            ParamKind::Any => "any",
        }
    }
}

/// Either a declared default or the "required" marker
#[derive(Debug, Clone, PartialEq)]
pub enum ParamDefault {
    Required,
    Value(Value),
}

/// A single declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub default: ParamDefault,
}

impl ParamSpec {
    pub fn is_required(&self) -> bool {
        matches!(self.default, ParamDefault::Required)
    }
}

/// Ordered, immutable list of the parameters a method accepts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterDescriptor {
    params: Vec<ParamSpec>,
}

impl ParameterDescriptor {
    /// Create an empty descriptor (a method taking no parameters)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter that must be supplied by the caller
    pub fn required(mut self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.push(name.into(), kind, ParamDefault::Required);
        self
    }

    /// Add a parameter with a declared default
    pub fn optional(
        mut self,
        name: impl Into<String>,
        kind: ParamKind,
        default: impl Into<Value>,
    ) -> Self {
        self.push(name.into(), kind, ParamDefault::Value(default.into()));
        self
    }

    /// Add a parameter defaulting to null
    pub fn nullable(self, name: impl Into<String>, kind: ParamKind) -> Self {
        self.optional(name, kind, Value::Null)
    }

    // Redeclaring a name replaces the earlier declaration in place.
    fn push(&mut self, name: String, kind: ParamKind, default: ParamDefault) {
        let spec = ParamSpec {
            name,
            kind,
            default,
        };
        match self.params.iter_mut().find(|p| p.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.params.push(spec),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamSpec> {
        self.params.iter()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Typed argument struct of a business method.
///
/// The descriptor is what the JSON-RPC path normalizes against; the serde
/// defaults on the struct are what the REST binding relies on. Both must
/// declare the same defaults.
pub trait MethodParams: DeserializeOwned + Send + 'static {
    fn descriptor() -> ParameterDescriptor;
}

/// Argument struct for methods without parameters
#[derive(Debug, Clone, Copy, Default, serde::Deserialize)]
pub struct NoParams {}

impl MethodParams for NoParams {
    fn descriptor() -> ParameterDescriptor {
        ParameterDescriptor::new()
    }
}

/// Parse a decimal integer, keeping the full `u64` range for identifiers
/// such as logical time.
pub fn parse_integer(text: &str) -> Option<Number> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Some(Number::from(value));
    }
    text.parse::<u64>().ok().map(Number::from)
}

/// Fill defaults and coerce integer strings.
///
/// Supplied values of undeclared parameters are passed through untouched;
/// whether they are acceptable is decided when the arguments are bound to
/// the method's parameter struct.
pub fn normalize(
    supplied: &Map<String, Value>,
    descriptor: &ParameterDescriptor,
) -> Result<Map<String, Value>, NormalizeError> {
    let mut args = supplied.clone();

    for spec in descriptor.iter() {
        if !args.contains_key(&spec.name) {
            match &spec.default {
                ParamDefault::Required => {
                    return Err(NormalizeError::MissingRequiredParameter(spec.name.clone()));
                }
                ParamDefault::Value(default) => {
                    args.insert(spec.name.clone(), default.clone());
                }
            }
            continue;
        }

        if spec.kind.is_integer()
            && let Some(Value::String(text)) = args.get(&spec.name)
        {
            let number = parse_integer(text)
                .ok_or_else(|| NormalizeError::TypeCoercionError(spec.name.clone()))?;
            args.insert(spec.name.clone(), Value::Number(number));
        }
    }

    Ok(args)
}
