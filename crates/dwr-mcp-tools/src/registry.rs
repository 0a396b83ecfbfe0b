//! The fixed DWR tool catalog.
//!
//! Every per-tool behavior hangs off [`ToolKind`], so adding a tool is a compile error until its
//! name, endpoint, parameters and shaping are all defined.

use rmcp::model::{JsonObject, Tool, ToolAnnotations};
use serde_json::{Value, json};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    SurfaceWaterStations,
    SurfaceWaterTsDay,
    WaterRightsNetAmount,
    WellPermits,
    ActiveAdminCalls,
    QueryDwrApi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamType {
    String,
    Number,
    Object,
}

impl ParamType {
    fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Object => "object",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ParamSpec {
    name: &'static str,
    ty: ParamType,
    required: bool,
    description: &'static str,
}

const fn optional(name: &'static str, ty: ParamType, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        ty,
        required: false,
        description,
    }
}

const fn required(name: &'static str, ty: ParamType, description: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        ty,
        required: true,
        description,
    }
}

const SURFACE_WATER_STATIONS: &[ParamSpec] = &[
    optional(
        "stationName",
        ParamType::String,
        "Name of the station (supports wildcards like *AB*)",
    ),
    optional("division", ParamType::Number, "Water division number (1-7)"),
    optional("county", ParamType::String, "County name"),
    optional("waterDistrict", ParamType::Number, "Water district number"),
    optional(
        "pageSize",
        ParamType::Number,
        "Number of results to return (default 50)",
    ),
];

const SURFACE_WATER_TS_DAY: &[ParamSpec] = &[
    required(
        "abbrev",
        ParamType::String,
        "Station abbreviation (e.g., 'PLAPLACO')",
    ),
    required(
        "startDate",
        ParamType::String,
        "Start date (MM/DD/YYYY or YYYY-MM-DD)",
    ),
    required(
        "endDate",
        ParamType::String,
        "End date (MM/DD/YYYY or YYYY-MM-DD)",
    ),
];

const WATER_RIGHTS_NET_AMOUNT: &[ParamSpec] = &[
    optional("waterRightName", ParamType::String, "Name of the water right"),
    optional("division", ParamType::Number, "Water division number"),
    optional("pageSize", ParamType::Number, "Number of results to return"),
];

const WELL_PERMITS: &[ParamSpec] = &[
    optional("wellName", ParamType::String, "Name of the well"),
    optional("receipt", ParamType::String, "Receipt number"),
    optional("pageSize", ParamType::Number, "Number of results to return"),
];

const ACTIVE_ADMIN_CALLS: &[ParamSpec] = &[optional(
    "division",
    ParamType::Number,
    "Water division number",
)];

const QUERY_DWR_API: &[ParamSpec] = &[
    required(
        "endpoint",
        ParamType::String,
        "API endpoint path (e.g., 'surfacewater/surfacewaterstations')",
    ),
    optional("params", ParamType::Object, "Query parameters"),
];

impl ToolKind {
    /// All tools, in advertisement order.
    pub const ALL: [Self; 6] = [
        Self::SurfaceWaterStations,
        Self::SurfaceWaterTsDay,
        Self::WaterRightsNetAmount,
        Self::WellPermits,
        Self::ActiveAdminCalls,
        Self::QueryDwrApi,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::SurfaceWaterStations => "get_surface_water_stations",
            Self::SurfaceWaterTsDay => "get_surface_water_ts_day",
            Self::WaterRightsNetAmount => "get_water_rights_net_amount",
            Self::WellPermits => "get_well_permits",
            Self::ActiveAdminCalls => "get_active_admin_calls",
            Self::QueryDwrApi => "query_dwr_api",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::SurfaceWaterStations => "Search for surface water stations in Colorado",
            Self::SurfaceWaterTsDay => "Get daily time series data for a surface water station",
            Self::WaterRightsNetAmount => "Get net amounts for water rights",
            Self::WellPermits => "Search for well permits",
            Self::ActiveAdminCalls => "Get active administrative calls",
            Self::QueryDwrApi => "Generic tool to query any Colorado DWR REST API endpoint",
        }
    }

    /// Fixed upstream endpoint path. `None` for the passthrough tool, whose path comes from the
    /// caller.
    #[must_use]
    pub fn endpoint(self) -> Option<&'static str> {
        match self {
            Self::SurfaceWaterStations => Some("surfacewater/surfacewaterstations"),
            Self::SurfaceWaterTsDay => Some("surfacewater/surfacewatertsday"),
            Self::WaterRightsNetAmount => Some("waterrights/netamount"),
            Self::WellPermits => Some("wellpermits/wellpermit"),
            Self::ActiveAdminCalls => Some("administrativecalls/active"),
            Self::QueryDwrApi => None,
        }
    }

    fn params(self) -> &'static [ParamSpec] {
        match self {
            Self::SurfaceWaterStations => SURFACE_WATER_STATIONS,
            Self::SurfaceWaterTsDay => SURFACE_WATER_TS_DAY,
            Self::WaterRightsNetAmount => WATER_RIGHTS_NET_AMOUNT,
            Self::WellPermits => WELL_PERMITS,
            Self::ActiveAdminCalls => ACTIVE_ADMIN_CALLS,
            Self::QueryDwrApi => QUERY_DWR_API,
        }
    }

    /// JSON Schema for this tool's arguments.
    #[must_use]
    pub fn input_schema(self) -> Value {
        build_input_schema(self.params())
    }
}

fn build_input_schema(parameters: &[ParamSpec]) -> Value {
    let mut properties = json!({});
    let mut required: Vec<&str> = Vec::new();

    for param in parameters {
        let mut prop_schema = json!({
            "type": param.ty.as_str(),
            "description": param.description,
        });
        if param.ty == ParamType::Object {
            prop_schema["additionalProperties"] = json!(true);
        }

        properties[param.name] = prop_schema;

        if param.required {
            required.push(param.name);
        }
    }

    let mut schema = json!({
        "type": "object",
        "properties": properties,
        "additionalProperties": false,
    });

    if !required.is_empty() {
        schema["required"] = json!(required);
    }

    schema
}

/// An advertised tool.
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub kind: ToolKind,
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Arc<JsonObject>,
}

impl ToolDefinition {
    fn new(kind: ToolKind) -> Self {
        let input_schema = kind
            .input_schema()
            .as_object()
            .cloned()
            .unwrap_or_else(JsonObject::new);
        Self {
            kind,
            name: kind.name(),
            description: kind.description(),
            input_schema: Arc::new(input_schema),
        }
    }

    /// Look up the declared JSON type of a top-level argument.
    #[must_use]
    pub fn property_type(&self, name: &str) -> Option<&str> {
        self.input_schema
            .get("properties")
            .and_then(|p| p.get(name))
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
    }

    #[must_use]
    pub fn to_mcp_tool(&self) -> Tool {
        let mut tool = Tool::new(self.name, self.description, self.input_schema.clone());
        // Every DWR endpoint is a read-only GET.
        tool.annotations = Some(ToolAnnotations {
            title: None,
            read_only_hint: Some(true),
            destructive_hint: Some(false),
            idempotent_hint: Some(true),
            open_world_hint: Some(true),
        });
        tool
    }
}

/// Immutable, ordered tool catalog.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: Arc<[ToolDefinition]>,
}

impl ToolRegistry {
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            tools: ToolKind::ALL.into_iter().map(ToolDefinition::new).collect(),
        }
    }

    /// Definitions in insertion order.
    #[must_use]
    pub fn list(&self) -> &[ToolDefinition] {
        &self.tools
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    #[must_use]
    pub fn to_mcp_tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDefinition::to_mcp_tool).collect()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
