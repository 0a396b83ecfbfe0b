//! Tool call dispatch: resolve → validate → shape → execute.

use crate::error::{DwrToolsError, Result};
use crate::normalize::{normalize_params, normalize_value};
use crate::registry::{ToolDefinition, ToolKind, ToolRegistry};
use crate::result::ToolCallResult;
use crate::upstream::{UpstreamClient, UpstreamRequest};
use rmcp::model::{CallToolResult, JsonObject};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// One inbound tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: JsonObject,
}

impl ToolCallRequest {
    #[must_use]
    pub fn new(name: impl Into<String>, arguments: Option<JsonObject>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.unwrap_or_default(),
        }
    }

    /// Build a request from an arbitrary JSON value. Missing or `null` arguments mean "none".
    ///
    /// # Errors
    ///
    /// Returns [`DwrToolsError::InvalidArguments`] if `arguments` is not an object.
    pub fn from_value(name: impl Into<String>, arguments: Option<Value>) -> Result<Self> {
        let name = name.into();
        let arguments = normalize_value(arguments).ok_or_else(|| DwrToolsError::InvalidArguments {
            message: format!("Invalid params: arguments for '{name}' must be an object"),
            data: json!({ "type": "validation-errors", "violations": [] }),
        })?;
        Ok(Self { name, arguments })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TsDayArgs {
    abbrev: String,
    start_date: String,
    end_date: String,
}

#[derive(Deserialize)]
struct PassthroughArgs {
    endpoint: String,
    #[serde(default)]
    params: Option<JsonObject>,
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: ToolRegistry,
    upstream: UpstreamClient,
    validators: Arc<HashMap<ToolKind, jsonschema::Validator>>,
}

impl Dispatcher {
    /// # Errors
    ///
    /// Returns [`DwrToolsError::Config`] if a tool schema fails to compile.
    pub fn new(registry: ToolRegistry, upstream: UpstreamClient) -> Result<Self> {
        let mut validators = HashMap::new();
        for def in registry.list() {
            let schema = Value::Object(def.input_schema.as_ref().clone());
            let validator = jsonschema::validator_for(&schema).map_err(|e| {
                DwrToolsError::Config(format!("invalid schema for tool '{}': {e}", def.name))
            })?;
            validators.insert(def.kind, validator);
        }

        Ok(Self {
            registry,
            upstream,
            validators: Arc::new(validators),
        })
    }

    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Resolve, validate and shape a call without sending it.
    ///
    /// # Errors
    ///
    /// Returns [`DwrToolsError::UnknownTool`] or [`DwrToolsError::InvalidArguments`].
    pub fn prepare(&self, request: &ToolCallRequest) -> Result<UpstreamRequest> {
        let def = self
            .registry
            .get(&request.name)
            .ok_or_else(|| DwrToolsError::UnknownTool(request.name.clone()))?;

        let args = normalize_params(request.arguments.clone());
        self.validate(def, &args)?;
        shape(def.kind, args)
    }

    /// Run one tool call. Makes exactly one upstream request on success of `prepare`.
    ///
    /// # Errors
    ///
    /// Unknown tools, invalid arguments and non-upstream failures are errors. Upstream HTTP
    /// failures are returned as [`ToolCallResult::Failure`].
    pub async fn dispatch(&self, request: &ToolCallRequest) -> Result<ToolCallResult> {
        let upstream_request = self.prepare(request)?;
        debug!(
            tool = %request.name,
            endpoint = %upstream_request.endpoint_path,
            "dispatching tool call"
        );
        self.upstream.execute(&upstream_request).await
    }

    /// [`Dispatcher::dispatch`] followed by the MCP envelope.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::dispatch`].
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> Result<CallToolResult> {
        let request = ToolCallRequest::new(name, arguments);
        Ok(self.dispatch(&request).await?.into_call_tool_result())
    }

    fn validate(&self, def: &ToolDefinition, args: &JsonObject) -> Result<()> {
        let Some(validator) = self.validators.get(&def.kind) else {
            return Err(DwrToolsError::Runtime(format!(
                "no validator compiled for tool '{}'",
                def.name
            )));
        };
        validate_arguments(def, validator, args)
    }
}

fn shape(kind: ToolKind, args: JsonObject) -> Result<UpstreamRequest> {
    match kind {
        ToolKind::SurfaceWaterStations
        | ToolKind::WaterRightsNetAmount
        | ToolKind::WellPermits
        | ToolKind::ActiveAdminCalls => direct(kind, args),
        ToolKind::SurfaceWaterTsDay => {
            let a: TsDayArgs = parse_args(args)?;
            let mut params = JsonObject::new();
            params.insert("abbrev".to_string(), Value::String(a.abbrev));
            params.insert("min-measDate".to_string(), Value::String(a.start_date));
            params.insert("max-measDate".to_string(), Value::String(a.end_date));
            direct(kind, params)
        }
        ToolKind::QueryDwrApi => {
            let a: PassthroughArgs = parse_args(args)?;
            Ok(UpstreamRequest {
                endpoint_path: a.endpoint,
                query_params: normalize_params(a.params.unwrap_or_default()),
            })
        }
    }
}

fn direct(kind: ToolKind, query_params: JsonObject) -> Result<UpstreamRequest> {
    let endpoint = kind.endpoint().ok_or_else(|| {
        DwrToolsError::Runtime(format!("tool '{}' has no fixed endpoint", kind.name()))
    })?;
    Ok(UpstreamRequest {
        endpoint_path: endpoint.to_string(),
        query_params,
    })
}

fn parse_args<T: serde::de::DeserializeOwned>(args: JsonObject) -> Result<T> {
    serde_json::from_value(Value::Object(args)).map_err(|e| DwrToolsError::InvalidArguments {
        message: format!("Invalid params: {e}"),
        data: json!({ "type": "validation-errors", "violations": [] }),
    })
}

fn validate_arguments(
    def: &ToolDefinition,
    validator: &jsonschema::Validator,
    args: &JsonObject,
) -> Result<()> {
    let props = def
        .input_schema
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let required: Vec<&str> = def
        .input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let valid_params: Vec<&str> = props.keys().map(String::as_str).collect();

    let mut violations: Vec<Value> = Vec::new();

    for k in args.keys() {
        if props.contains_key(k) {
            continue;
        }
        violations.push(json!({
            "type": "invalid-parameter",
            "parameter": k,
            "suggestions": find_similar_strings(k, &valid_params),
            "validParameters": valid_params,
        }));
    }

    for r in &required {
        if !args.contains_key(*r) {
            violations.push(json!({
                "type": "missing-required-parameter",
                "parameter": r,
            }));
        }
    }

    let instance = Value::Object(args.clone());
    for e in validator.iter_errors(&instance) {
        // Reported above with a nicer shape.
        if matches!(
            e.kind(),
            jsonschema::error::ValidationErrorKind::Required { .. }
                | jsonschema::error::ValidationErrorKind::AdditionalProperties { .. }
        ) {
            continue;
        }
        violations.push(json!({
            "type": "constraint-violation",
            "message": e.to_string(),
            "instancePath": e.instance_path().to_string(),
        }));
    }

    if violations.is_empty() {
        return Ok(());
    }

    let message = if let Some(v) = violations
        .iter()
        .find(|v| v.get("type").and_then(Value::as_str) == Some("invalid-parameter"))
    {
        let p = v.get("parameter").and_then(Value::as_str).unwrap_or("?");
        let suggestion = v
            .get("suggestions")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
            .and_then(Value::as_str);
        if let Some(s) = suggestion {
            format!("Invalid params: unknown parameter '{p}' (did you mean '{s}'?)")
        } else {
            format!("Invalid params: unknown parameter '{p}'")
        }
    } else if let Some(v) = violations
        .iter()
        .find(|v| v.get("type").and_then(Value::as_str) == Some("missing-required-parameter"))
    {
        let p = v.get("parameter").and_then(Value::as_str).unwrap_or("?");
        format!("Invalid params: missing required parameter '{p}'")
    } else {
        format!(
            "Invalid params: validation failed with {} error(s)",
            violations.len()
        )
    };

    Err(DwrToolsError::InvalidArguments {
        message,
        data: json!({
            "type": "validation-errors",
            "tool": def.name,
            "violations": violations,
        }),
    })
}

fn find_similar_strings(unknown: &str, known: &[&str]) -> Vec<String> {
    let mut candidates: Vec<(f64, String)> = Vec::new();
    for k in known {
        let score = strsim::jaro(unknown, k);
        if score > 0.7 {
            candidates.push((score, (*k).to_string()));
        }
    }
    candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    candidates.into_iter().map(|(_, s)| s).collect()
}
