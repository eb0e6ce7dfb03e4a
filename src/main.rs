//
// Purpose:
//
// This Rust application implements an MCP (Model Context Protocol) server that acts as a
// bridge to a Microsoft Sentinel workspace. It exposes threat hunting operations (hunting
// queries, hunts, the relations linking them, and cleanup of everything this integration
// created) as tools that can be invoked by MCP clients (e.g., AI models, automation scripts).
//
// Structure:
// - `main()`: Entry point of the application. Initializes logging (tracing),
//   sets up the `SentinelToolsServer`, and starts the MCP server using stdio transport.
//
// - `SentinelToolsServer`: The core struct that implements the `rmcp::ServerHandler` trait
//   and the `#[tool(tool_box)]` attribute.
//   - It holds the `SentinelClient` used for every tool call.
//   - Its methods, decorated with `#[tool(...)]`, define the tools available to MCP clients.
//
// - Tool Parameter Structs (e.g., `CreateHuntParams`, `DeleteHuntParams`):
//   - These structs define the expected input parameters for each tool.
//   - They use `serde::Deserialize` for parsing input and `schemars::JsonSchema`
//     for generating a schema that MCP clients can use to understand how to call the tools.
//
// - `mcp_server_sentinel` library:
//   - `SentinelClient`: Handles communication with the Sentinel management API.
//   - `Reconciler`: Purges integration-owned resources, relations before hunts.
//
// Workflow:
// 1. Server starts and listens for MCP requests on stdio.
// 2. MCP client sends a `call_tool` request.
// 3. `SentinelToolsServer` dispatches to the appropriate tool method based on the tool name.
// 4. The tool method parses parameters and calls into the library.
// 5. The result (success with data or error) is packaged into a `CallToolResult`
//    and sent back to the MCP client.
//
// Configuration:
// The server requires `SUBSCRIPTION_ID`, `WORKSPACE_RESOURCE_GROUP`, `WORKSPACE_NAME` and
// `SENTINEL_ACCESS_TOKEN`. API versions and the management endpoint can be overridden
// (see `SentinelConfig::from_env`). Logging is controlled by `RUST_LOG`.

use clap::Parser;
use dotenv::dotenv;
use mcp_server_sentinel::sentinel::models::{Hunt, HuntSpec, QuerySpec, SavedSearch};
use mcp_server_sentinel::sentinel::provision::{
    create_hunt_with_query, create_query_from_file, HuntWithQuerySpec,
};
use mcp_server_sentinel::{
    Reconciler, SentinelApi, SentinelApiError, SentinelClient, SentinelConfig,
    StaticTokenProvider,
};
use rmcp::{
    model::{
        Annotated, CallToolResult, Content, Implementation, ListResourceTemplatesResult,
        PaginatedRequestParam, ProtocolVersion, RawResourceTemplate, ReadResourceRequestParam,
        ReadResourceResult, ResourceContents, ServerCapabilities, ServerInfo,
    },
    schemars,
    service::RequestContext,
    tool,
    transport::stdio,
    Error as McpError, RoleServer, ServerHandler, ServiceExt,
};
use std::env;
use std::future::Future;
use std::sync::Arc;

const RESOURCE_SCHEME: &str = "sentinel://";
const JSON_MIME_TYPE: &str = "application/json";

#[derive(Parser, Debug)]
#[command(name = "mcp-server-sentinel")]
#[command(about = "Microsoft Sentinel threat hunting MCP Server")]
struct Args {
    // Only stdio transport is supported
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct GetQueryParams {
    #[schemars(description = "The name (GUID) of the hunting query to retrieve")]
    query_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct GetHuntParams {
    #[schemars(description = "The name (GUID) of the hunt to retrieve")]
    hunt_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct CreateQueryParams {
    #[schemars(description = "Display name for the hunting query")]
    name: String,
    #[schemars(description = "KQL query text in one string")]
    query: String,
    #[schemars(description = "Description of the hunting query")]
    description: Option<String>,
    #[schemars(description = "External identifier stored in the 'extid' tag")]
    extid: Option<String>,
    #[schemars(description = "MITRE ATT&CK tactics, e.g. [\"InitialAccess\", \"Persistence\"]")]
    tactics: Option<Vec<String>>,
    #[schemars(description = "MITRE ATT&CK techniques, e.g. [\"T1078\", \"T1098\"]")]
    techniques: Option<Vec<String>>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct CreateQueryFromFileParams {
    #[schemars(
        description = "Path, on the server host, of a .kql file with '// Metadata:' and '// Query:' sections"
    )]
    path: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct CreateHuntParams {
    #[schemars(description = "Display name for the hunt")]
    name: String,
    #[schemars(description = "Description of the hunt")]
    description: Option<String>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct LinkQueryParams {
    #[schemars(description = "The name (GUID) of the hunt")]
    hunt_id: String,
    #[schemars(description = "The full resource ID of the hunting query to link")]
    query_resource_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct CreateQueryWithHuntParams {
    #[schemars(description = "Display name for the query")]
    query_name: String,
    #[schemars(description = "Description of the query")]
    query_description: Option<String>,
    #[schemars(description = "KQL query text in one string")]
    query_text: String,
    #[schemars(description = "Display name for the hunt")]
    hunt_name: String,
    #[schemars(description = "Description of the hunt")]
    hunt_description: Option<String>,
    #[schemars(description = "MITRE ATT&CK tactics (optional)")]
    tactics: Option<Vec<String>>,
    #[schemars(description = "MITRE ATT&CK techniques (optional)")]
    techniques: Option<Vec<String>>,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct DeleteHuntParams {
    #[schemars(description = "The name (GUID) of the hunt to delete")]
    hunt_id: String,
}

#[derive(Debug, serde::Deserialize, schemars::JsonSchema)]
struct RunQueryParams {
    #[schemars(description = "KQL query text to execute")]
    query: String,
    #[schemars(description = "ISO 8601 query timespan (optional, default: P1D)")]
    timespan: Option<String>,
}

fn format_query(query: &SavedSearch) -> String {
    let tags = query
        .properties
        .tags
        .iter()
        .map(|t| format!("{}={}", t.name, t.value))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Query ID: {}\nName: {}\nCategory: {}\nTags: {}\nResource ID: {}",
        query.name,
        query.display_name(),
        query.properties.category.as_deref().unwrap_or("None"),
        if tags.is_empty() { "None" } else { tags.as_str() },
        query.id
    )
}

fn format_hunt(hunt: &Hunt) -> String {
    format!(
        "Hunt ID: {}\nName: {}\nStatus: {}\nLabels: {}\nDescription: {}",
        hunt.name,
        hunt.display_name(),
        hunt.properties.status.as_deref().unwrap_or("Unknown"),
        if hunt.properties.labels.is_empty() {
            "None".to_string()
        } else {
            hunt.properties.labels.join(", ")
        },
        hunt.properties.description.as_deref().unwrap_or("")
    )
}

/// A resource addressed by `sentinel://<collection>/<id>`.
#[derive(Debug, PartialEq)]
enum ResourceRef<'a> {
    Query(&'a str),
    Hunt(&'a str),
}

fn parse_resource_uri(uri: &str) -> Option<ResourceRef<'_>> {
    let (collection, id) = uri.strip_prefix(RESOURCE_SCHEME)?.split_once('/')?;
    if id.is_empty() || id.contains('/') {
        return None;
    }
    match collection {
        "queries" => Some(ResourceRef::Query(id)),
        "hunts" => Some(ResourceRef::Hunt(id)),
        _ => None,
    }
}

fn resource_template(uri_template: &str, name: &str, description: &str) -> Annotated<RawResourceTemplate> {
    Annotated::new(
        RawResourceTemplate {
            uri_template: uri_template.to_string(),
            name: name.to_string(),
            description: Some(description.to_string()),
            mime_type: Some(JSON_MIME_TYPE.to_string()),
        },
        None,
    )
}

#[derive(Clone)]
struct SentinelToolsServer {
    sentinel_client: Arc<SentinelClient>,
}

#[tool(tool_box)]
impl SentinelToolsServer {
    fn new() -> Result<Self, anyhow::Error> {
        dotenv().ok();

        let config = SentinelConfig::from_env()?;

        let access_token = env::var("SENTINEL_ACCESS_TOKEN").map_err(|_| {
            anyhow::anyhow!("SENTINEL_ACCESS_TOKEN environment variable is required")
        })?;

        tracing::debug!(
            workspace = ?config.workspace_name,
            management_url = ?config.management_url,
            "Creating Sentinel client with access token"
        );

        let sentinel_client =
            SentinelClient::new(config, Arc::new(StaticTokenProvider::new(access_token)))?;

        Ok(Self {
            sentinel_client: Arc::new(sentinel_client),
        })
    }

    #[tool(
        name = "list_hunting_queries",
        description = "Retrieves the hunting queries (saved searches) of the Sentinel workspace, including their tags."
    )]
    async fn list_hunting_queries(&self) -> Result<CallToolResult, McpError> {
        tracing::info!("Retrieving Sentinel hunting queries");

        match self.sentinel_client.list_queries().await {
            Ok(queries) => {
                if queries.is_empty() {
                    tracing::info!("No hunting queries found. Returning standard message.");
                    return Ok(CallToolResult::success(vec![Content::text(
                        "No hunting queries found.",
                    )]));
                }

                let mcp_content_items: Vec<Content> = queries
                    .iter()
                    .map(|query| Content::text(format_query(query)))
                    .collect();

                tracing::info!(
                    "Successfully processed {} hunting queries into MCP content items",
                    mcp_content_items.len()
                );
                Ok(CallToolResult::success(mcp_content_items))
            }
            Err(e) => {
                let err_msg = format!("Error retrieving hunting queries from Sentinel: {}", e);
                tracing::error!("{}", err_msg);
                Ok(CallToolResult::error(vec![Content::text(err_msg)]))
            }
        }
    }

    #[tool(
        name = "get_hunting_query",
        description = "Retrieves a specific hunting query by its name (GUID). Returns the query details and KQL text."
    )]
    async fn get_hunting_query(
        &self,
        #[tool(aggr)] params: GetQueryParams,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(query_id = %params.query_id, "Retrieving Sentinel hunting query by ID");

        match self.sentinel_client.get_query(&params.query_id).await {
            Ok(query) => {
                let formatted_text = format!(
                    "{}\nDescription: {}\nQuery:\n{}",
                    format_query(&query),
                    query.properties.description.as_deref().unwrap_or(""),
                    query.properties.query.as_deref().unwrap_or("")
                );
                Ok(CallToolResult::success(vec![Content::text(formatted_text)]))
            }
            Err(e) => {
                let err_msg = format!(
                    "Error retrieving hunting query {} from Sentinel: {}",
                    params.query_id, e
                );
                tracing::error!("{}", err_msg);
                Ok(CallToolResult::error(vec![Content::text(err_msg)]))
            }
        }
    }

    #[tool(
        name = "list_hunts",
        description = "Retrieves the hunts of the Sentinel workspace. Returns ID, name, status and labels."
    )]
    async fn list_hunts(&self) -> Result<CallToolResult, McpError> {
        tracing::info!("Retrieving Sentinel hunts");

        match self.sentinel_client.list_hunts().await {
            Ok(hunts) => {
                if hunts.is_empty() {
                    tracing::info!("No hunts found. Returning standard message.");
                    return Ok(CallToolResult::success(vec![Content::text(
                        "No hunts found.",
                    )]));
                }

                let mcp_content_items: Vec<Content> = hunts
                    .iter()
                    .map(|hunt| Content::text(format_hunt(hunt)))
                    .collect();
                Ok(CallToolResult::success(mcp_content_items))
            }
            Err(e) => {
                let err_msg = format!("Error retrieving hunts from Sentinel: {}", e);
                tracing::error!("{}", err_msg);
                Ok(CallToolResult::error(vec![Content::text(err_msg)]))
            }
        }
    }

    #[tool(
        name = "get_hunt",
        description = "Retrieves a specific hunt by its name (GUID)."
    )]
    async fn get_hunt(&self, #[tool(aggr)] params: GetHuntParams) -> Result<CallToolResult, McpError> {
        tracing::info!(hunt_id = %params.hunt_id, "Retrieving Sentinel hunt by ID");

        match self.sentinel_client.get_hunt(&params.hunt_id).await {
            Ok(hunt) => Ok(CallToolResult::success(vec![Content::text(format_hunt(
                &hunt,
            ))])),
            Err(e) => {
                let err_msg = format!(
                    "Error retrieving hunt {} from Sentinel: {}",
                    params.hunt_id, e
                );
                tracing::error!("{}", err_msg);
                Ok(CallToolResult::error(vec![Content::text(err_msg)]))
            }
        }
    }

    #[tool(
        name = "create_hunting_query",
        description = "Creates a hunting query in Sentinel, tagged as created by this integration. Tactics and techniques are optional lists."
    )]
    async fn create_hunting_query(
        &self,
        #[tool(aggr)] params: CreateQueryParams,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(name = %params.name, "Creating Sentinel hunting query");

        let spec = QuerySpec {
            display_name: params.name,
            query: params.query,
            description: params.description.unwrap_or_default(),
            extid: params.extid,
            tactics: params.tactics.unwrap_or_default(),
            techniques: params.techniques.unwrap_or_default(),
        };

        match self.sentinel_client.create_query(&spec).await {
            Ok(query) => {
                let formatted_text =
                    format!("Successfully created hunting query.\n{}", format_query(&query));
                Ok(CallToolResult::success(vec![Content::text(formatted_text)]))
            }
            Err(e) => {
                let err_msg = format!("Error creating hunting query in Sentinel: {}", e);
                tracing::error!("{}", err_msg);
                Ok(CallToolResult::error(vec![Content::text(err_msg)]))
            }
        }
    }

    #[tool(
        name = "create_hunting_query_from_file",
        description = "Creates a tagged hunting query from a KQL file on the server host. The file's metadata header supplies name, description, extid, tactics and techniques."
    )]
    async fn create_hunting_query_from_file(
        &self,
        #[tool(aggr)] params: CreateQueryFromFileParams,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(path = %params.path, "Creating Sentinel hunting query from file");

        match create_query_from_file(self.sentinel_client.as_ref(), &params.path).await {
            Ok(query) => {
                let formatted_text =
                    format!("Successfully created hunting query.\n{}", format_query(&query));
                Ok(CallToolResult::success(vec![Content::text(formatted_text)]))
            }
            Err(e) => {
                let err_msg = format!(
                    "Error creating hunting query from {}: {}",
                    params.path, e
                );
                tracing::error!("{}", err_msg);
                Ok(CallToolResult::error(vec![Content::text(err_msg)]))
            }
        }
    }

    #[tool(
        name = "create_hunt",
        description = "Creates a new hunt in Microsoft Sentinel, labelled as created by this integration."
    )]
    async fn create_hunt(
        &self,
        #[tool(aggr)] params: CreateHuntParams,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(name = %params.name, "Creating Sentinel hunt");

        let spec = HuntSpec::new(params.name, params.description.unwrap_or_default());
        match self.sentinel_client.create_hunt(&spec).await {
            Ok(hunt) => {
                let formatted_text = format!("Successfully created hunt.\n{}", format_hunt(&hunt));
                Ok(CallToolResult::success(vec![Content::text(formatted_text)]))
            }
            Err(e) => {
                let err_msg = format!("Error creating hunt in Sentinel: {}", e);
                tracing::error!("{}", err_msg);
                Ok(CallToolResult::error(vec![Content::text(err_msg)]))
            }
        }
    }

    #[tool(
        name = "link_query_to_hunt",
        description = "Links an existing hunting query (by full resource ID) to an existing hunt."
    )]
    async fn link_query_to_hunt(
        &self,
        #[tool(aggr)] params: LinkQueryParams,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(hunt_id = %params.hunt_id, "Linking hunting query to hunt");

        match self
            .sentinel_client
            .create_relation(&params.hunt_id, &params.query_resource_id)
            .await
        {
            Ok(relation) => {
                let formatted_text = format!(
                    "Successfully linked query to hunt.\nRelation ID: {}\nHunt ID: {}\nQuery Resource ID: {}",
                    relation.name, params.hunt_id, params.query_resource_id
                );
                Ok(CallToolResult::success(vec![Content::text(formatted_text)]))
            }
            Err(e) => {
                let err_msg = format!(
                    "Error linking query to hunt {}: {}",
                    params.hunt_id, e
                );
                tracing::error!("{}", err_msg);
                Ok(CallToolResult::error(vec![Content::text(err_msg)]))
            }
        }
    }

    #[tool(
        name = "create_query_with_hunt",
        description = "Creates a hunt with one query associated, then links them together."
    )]
    async fn create_query_with_hunt(
        &self,
        #[tool(aggr)] params: CreateQueryWithHuntParams,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(
            query_name = %params.query_name,
            hunt_name = %params.hunt_name,
            "Creating Sentinel hunt with query"
        );

        let spec = HuntWithQuerySpec {
            query: QuerySpec {
                display_name: params.query_name,
                query: params.query_text,
                description: params.query_description.unwrap_or_default(),
                extid: None,
                tactics: params.tactics.unwrap_or_default(),
                techniques: params.techniques.unwrap_or_default(),
            },
            hunt: HuntSpec::new(params.hunt_name, params.hunt_description.unwrap_or_default()),
        };

        match create_hunt_with_query(self.sentinel_client.as_ref(), &spec).await {
            Ok(created) => {
                let formatted_text = format!(
                    "Query and hunt created and linked successfully.\nQuery ID: {}\nHunt ID: {}\nRelation ID: {}",
                    created.query.name, created.hunt.name, created.relation.name
                );
                Ok(CallToolResult::success(vec![Content::text(formatted_text)]))
            }
            Err(e) => {
                let err_msg = format!("Error creating hunt with query: {}", e);
                tracing::error!("{}", err_msg);
                Ok(CallToolResult::error(vec![Content::text(err_msg)]))
            }
        }
    }

    #[tool(
        name = "delete_hunt",
        description = "Deletes a hunt created by this integration. Its integration-owned relations are deleted first; linked queries are kept."
    )]
    async fn delete_hunt(
        &self,
        #[tool(aggr)] params: DeleteHuntParams,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(hunt_id = %params.hunt_id, "Deleting Sentinel hunt");

        let reconciler = Reconciler::new(self.sentinel_client.as_ref());
        match reconciler.remove_hunt(&params.hunt_id).await {
            Ok(removal) => {
                let formatted_text = format!(
                    "Successfully deleted hunt {} ({}).\nRelations deleted: {}/{}",
                    removal.hunt.name,
                    removal.hunt.display_name(),
                    removal.relations.deleted,
                    removal.relations.attempted
                );
                Ok(CallToolResult::success(vec![Content::text(formatted_text)]))
            }
            Err(e) => {
                let err_msg = format!("Error deleting hunt {}: {}", params.hunt_id, e);
                tracing::error!("{}", err_msg);
                Ok(CallToolResult::error(vec![Content::text(err_msg)]))
            }
        }
    }

    #[tool(
        name = "run_hunting_query",
        description = "Executes a KQL hunting query against the Sentinel workspace and returns the result tables."
    )]
    async fn run_hunting_query(
        &self,
        #[tool(aggr)] params: RunQueryParams,
    ) -> Result<CallToolResult, McpError> {
        tracing::info!(timespan = ?params.timespan, "Running Sentinel hunting query");

        match self
            .sentinel_client
            .run_query(&params.query, params.timespan.as_deref())
            .await
        {
            Ok(result) => {
                let text = serde_json::to_string_pretty(&result)
                    .unwrap_or_else(|_| result.to_string());
                Ok(CallToolResult::success(vec![Content::text(text)]))
            }
            Err(e) => {
                let err_msg = format!("Error running hunting query: {}", e);
                tracing::error!("{}", err_msg);
                Ok(CallToolResult::error(vec![Content::text(err_msg)]))
            }
        }
    }

    #[tool(
        name = "purge_sentinel",
        description = "Deletes every hunting query, hunt and relation created by this integration. Returns a JSON report with 'queryCleanup' and 'huntCleanup'."
    )]
    async fn purge_sentinel(&self) -> Result<CallToolResult, McpError> {
        tracing::info!("Purging Sentinel resources created by this integration");

        let report = Reconciler::new(self.sentinel_client.as_ref()).purge().await;
        if report.is_partial() {
            tracing::warn!(?report, "Purge completed with errors");
        } else {
            tracing::info!("Purge completed successfully");
        }

        match serde_json::to_string(&report) {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => {
                let err_msg = format!("Error serializing purge report: {}", e);
                tracing::error!("{}", err_msg);
                Ok(CallToolResult::error(vec![Content::text(err_msg)]))
            }
        }
    }
}

#[tool(tool_box)]
impl ServerHandler for SentinelToolsServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(
                "This server provides tools to manage threat hunting in a Microsoft Sentinel workspace.\n\
                Available tools:\n\
                - 'list_hunting_queries' / 'get_hunting_query': Inspect hunting queries.\n\
                - 'list_hunts' / 'get_hunt': Inspect hunts.\n\
                - 'create_hunting_query': Creates a tagged hunting query. Requires 'name' and 'query'.\n\
                - 'create_hunting_query_from_file': Creates a tagged hunting query from a KQL file. Requires 'path'.\n\
                - 'create_hunt': Creates a labelled hunt. Requires 'name'.\n\
                - 'link_query_to_hunt': Links a query (full resource ID) to a hunt.\n\
                - 'create_query_with_hunt': Creates a query and a hunt and links them. \
                Requires 'query_name', 'query_text' and 'hunt_name'.\n\
                - 'delete_hunt': Deletes an integration-created hunt after its relations.\n\
                - 'run_hunting_query': Runs KQL against the workspace. Optional 'timespan' (default P1D).\n\
                - 'purge_sentinel': Removes every query, hunt and relation created by this integration.\n\
                Resources: 'sentinel://queries/{id}' and 'sentinel://hunts/{id}' return the JSON of a query or hunt."
                    .to_string(),
            ),
        }
    }

    fn list_resource_templates(
        &self,
        _request: PaginatedRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListResourceTemplatesResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListResourceTemplatesResult {
            next_cursor: None,
            resource_templates: vec![
                resource_template(
                    "sentinel://queries/{id}",
                    "Sentinel Query",
                    "A specific hunting query in Microsoft Sentinel",
                ),
                resource_template(
                    "sentinel://hunts/{id}",
                    "Sentinel Hunt",
                    "A specific hunt in Microsoft Sentinel",
                ),
            ],
        }))
    }

    fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ReadResourceResult, McpError>> + Send + '_ {
        async move {
            tracing::info!(uri = %request.uri, "Reading Sentinel resource");

            let resource = parse_resource_uri(&request.uri).ok_or_else(|| {
                McpError::invalid_request(format!("Unknown resource URI: {}", request.uri), None)
            })?;

            let fetched = match resource {
                ResourceRef::Query(id) => self
                    .sentinel_client
                    .get_query(id)
                    .await
                    .map(|query| serde_json::to_string_pretty(&query)),
                ResourceRef::Hunt(id) => self
                    .sentinel_client
                    .get_hunt(id)
                    .await
                    .map(|hunt| serde_json::to_string_pretty(&hunt)),
            };

            let text = match fetched {
                Ok(Ok(text)) => text,
                Ok(Err(e)) => {
                    let err_msg = format!("Error serializing {}: {}", request.uri, e);
                    tracing::error!("{}", err_msg);
                    return Err(McpError::internal_error(err_msg, None));
                }
                Err(e @ (SentinelApiError::QueryNotFound(_) | SentinelApiError::HuntNotFound(_))) => {
                    return Err(McpError::resource_not_found(e.to_string(), None));
                }
                Err(e) => {
                    let err_msg = format!("Error reading {} from Sentinel: {}", request.uri, e);
                    tracing::error!("{}", err_msg);
                    return Err(McpError::internal_error(err_msg, None));
                }
            };

            Ok(ReadResourceResult {
                contents: vec![ResourceContents::TextResourceContents {
                    uri: request.uri.clone(),
                    mime_type: Some(JSON_MIME_TYPE.to_string()),
                    text,
                }],
            })
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::DEBUG.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Sentinel MCP Server...");

    let server = SentinelToolsServer::new()?;

    tracing::info!("Using stdio transport");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("serving error: {:?}", e);
    })?;

    service.waiting().await?;
    Ok(())
}
