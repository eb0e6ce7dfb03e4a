use axum::{
    extract::{OriginalUri, Path, Query, Request},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const ORIGIN_LABEL: &str = "Sentinel TH Integration";

const WORKSPACE_PREFIX: &str = "/subscriptions/:subscription/resourceGroups/:resource_group/providers/Microsoft.OperationalInsights/workspaces/:workspace";

type Params = HashMap<String, String>;

struct MockData {
    saved_searches: BTreeMap<String, Value>,
    hunts: BTreeMap<String, Value>,
    relations: BTreeMap<String, BTreeMap<String, Value>>,
}

fn workspace_id() -> String {
    "/subscriptions/mock-sub/resourceGroups/mock-rg/providers/Microsoft.OperationalInsights/workspaces/mock-ws".to_string()
}

fn seeded_query(name: &str, display_name: &str, tags: Value) -> Value {
    json!({
        "id": format!("{}/savedSearches/{}", workspace_id(), name),
        "name": name,
        "etag": "W/\"datetime'2024-01-01T00%3A00%3A00Z'\"",
        "properties": {
            "category": "Hunt Queries",
            "displayName": display_name,
            "query": "SigninLogs | take 10",
            "tags": tags,
        }
    })
}

fn seeded_hunt(name: &str, display_name: &str, labels: Value) -> Value {
    json!({
        "id": format!("{}/providers/Microsoft.SecurityInsights/hunts/{}", workspace_id(), name),
        "name": name,
        "properties": {
            "displayName": display_name,
            "description": "seeded hunt",
            "status": "New",
            "labels": labels,
        }
    })
}

fn seeded_relation(hunt: &str, name: &str, query: &str) -> Value {
    json!({
        "id": format!(
            "{}/providers/Microsoft.SecurityInsights/hunts/{}/relations/{}",
            workspace_id(), hunt, name
        ),
        "name": name,
        "properties": {
            "relatedResourceId": format!("{}/savedSearches/{}", workspace_id(), query),
            "relatedResourceType": "Microsoft.OperationalInsights/savedSearches",
            "labels": [ORIGIN_LABEL],
        }
    })
}

// Two owned queries, one manual query, one owned hunt with two owned
// relations and one manual hunt.
static MOCK_DATA: Lazy<Mutex<MockData>> = Lazy::new(|| {
    let mut saved_searches = BTreeMap::new();
    saved_searches.insert(
        "query-owned-1".to_string(),
        seeded_query(
            "query-owned-1",
            "Impossible travel",
            json!([{"name": "origin", "value": ORIGIN_LABEL}, {"name": "tactics", "value": "InitialAccess"}]),
        ),
    );
    saved_searches.insert(
        "query-owned-2".to_string(),
        seeded_query(
            "query-owned-2",
            "Rare process",
            json!([{"name": "origin", "value": ORIGIN_LABEL}]),
        ),
    );
    saved_searches.insert(
        "query-manual".to_string(),
        seeded_query(
            "query-manual",
            "Analyst query",
            json!([{"name": "origin", "value": "analyst"}]),
        ),
    );

    let mut hunts = BTreeMap::new();
    hunts.insert(
        "hunt-owned-1".to_string(),
        seeded_hunt("hunt-owned-1", "Travel hunt", json!([ORIGIN_LABEL])),
    );
    hunts.insert(
        "hunt-manual".to_string(),
        seeded_hunt("hunt-manual", "Analyst hunt", json!(["manual"])),
    );

    let mut owned_relations = BTreeMap::new();
    owned_relations.insert(
        "relation-1".to_string(),
        seeded_relation("hunt-owned-1", "relation-1", "query-owned-1"),
    );
    owned_relations.insert(
        "relation-2".to_string(),
        seeded_relation("hunt-owned-1", "relation-2", "query-owned-2"),
    );
    let mut relations = BTreeMap::new();
    relations.insert("hunt-owned-1".to_string(), owned_relations);

    Mutex::new(MockData {
        saved_searches,
        hunts,
        relations,
    })
});

fn arm_error(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({ "error": { "code": code, "message": message.into() } })),
    )
        .into_response()
}

fn list_response(items: Vec<Value>) -> Response {
    (StatusCode::OK, Json(json!({ "value": items }))).into_response()
}

fn param<'a>(params: &'a Params, key: &str) -> &'a str {
    params.get(key).map(String::as_str).unwrap_or_default()
}

async fn require_bearer(req: Request, next: Next) -> Response {
    let authorized = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| !token.trim().is_empty());
    if !authorized {
        warn!("Rejected request without bearer token: {}", req.uri());
        return arm_error(
            StatusCode::UNAUTHORIZED,
            "AuthenticationFailed",
            "Authentication failed. The 'Authorization' header is missing.",
        );
    }

    let has_api_version = req
        .uri()
        .query()
        .is_some_and(|q| q.split('&').any(|pair| pair.starts_with("api-version=")));
    if !has_api_version {
        return arm_error(
            StatusCode::BAD_REQUEST,
            "MissingApiVersionParameter",
            "The api-version query parameter (?api-version=) is required for all requests.",
        );
    }

    next.run(req).await
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn list_saved_searches() -> Response {
    info!("GET savedSearches");
    let data = MOCK_DATA.lock().unwrap();
    list_response(data.saved_searches.values().cloned().collect())
}

async fn get_saved_search(Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    info!("GET savedSearch {}", id);
    let data = MOCK_DATA.lock().unwrap();
    match data.saved_searches.get(id) {
        Some(query) => (StatusCode::OK, Json(query.clone())).into_response(),
        None => arm_error(
            StatusCode::NOT_FOUND,
            "ResourceNotFound",
            format!("Saved search '{}' was not found.", id),
        ),
    }
}

async fn put_saved_search(
    Path(params): Path<Params>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<Value>,
) -> Response {
    let id = param(&params, "id").to_string();
    info!("PUT savedSearch {} with payload: {}", id, payload);

    let Some(properties) = payload.get("properties").cloned() else {
        return arm_error(
            StatusCode::BAD_REQUEST,
            "InvalidRequestContent",
            "The request content is missing 'properties'.",
        );
    };

    let query = json!({
        "id": uri.path(),
        "name": id,
        "etag": format!("W/\"datetime'{}'\"", Utc::now().to_rfc3339()),
        "properties": properties,
    });
    MOCK_DATA
        .lock()
        .unwrap()
        .saved_searches
        .insert(id, query.clone());
    (StatusCode::OK, Json(query)).into_response()
}

async fn delete_saved_search(Path(params): Path<Params>) -> Response {
    let id = param(&params, "id");
    info!("DELETE savedSearch {}", id);
    match MOCK_DATA.lock().unwrap().saved_searches.remove(id) {
        Some(_) => StatusCode::OK.into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn list_hunts() -> Response {
    info!("GET hunts");
    let data = MOCK_DATA.lock().unwrap();
    list_response(data.hunts.values().cloned().collect())
}

async fn get_hunt(Path(params): Path<Params>) -> Response {
    let id = param(&params, "hunt_id");
    info!("GET hunt {}", id);
    let data = MOCK_DATA.lock().unwrap();
    match data.hunts.get(id) {
        Some(hunt) => (StatusCode::OK, Json(hunt.clone())).into_response(),
        None => arm_error(
            StatusCode::NOT_FOUND,
            "NotFound",
            format!("Hunt '{}' was not found.", id),
        ),
    }
}

async fn put_hunt(
    Path(params): Path<Params>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<Value>,
) -> Response {
    let id = param(&params, "hunt_id").to_string();
    info!("PUT hunt {} with payload: {}", id, payload);

    let Some(mut properties) = payload.get("properties").cloned() else {
        return arm_error(
            StatusCode::BAD_REQUEST,
            "InvalidRequestContent",
            "The request content is missing 'properties'.",
        );
    };
    if let Some(object) = properties.as_object_mut() {
        let now = Utc::now().to_rfc3339();
        object.insert("createdTimeUtc".to_string(), json!(now));
        object.insert("lastModifiedTimeUtc".to_string(), json!(now));
    }

    let hunt = json!({
        "id": uri.path(),
        "name": id,
        "properties": properties,
    });
    MOCK_DATA.lock().unwrap().hunts.insert(id, hunt.clone());
    (StatusCode::CREATED, Json(hunt)).into_response()
}

async fn delete_hunt(Path(params): Path<Params>) -> Response {
    let id = param(&params, "hunt_id");
    info!("DELETE hunt {}", id);
    let mut data = MOCK_DATA.lock().unwrap();

    let linked = data.relations.get(id).map(|r| r.len()).unwrap_or(0);
    if linked > 0 {
        warn!("Refusing to delete hunt {} with {} relations", id, linked);
        return arm_error(
            StatusCode::CONFLICT,
            "Conflict",
            format!("Hunt '{}' still has {} relations.", id, linked),
        );
    }

    data.relations.remove(id);
    match data.hunts.remove(id) {
        Some(_) => StatusCode::OK.into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn list_relations(Path(params): Path<Params>) -> Response {
    let hunt_id = param(&params, "hunt_id");
    info!("GET relations of hunt {}", hunt_id);
    let data = MOCK_DATA.lock().unwrap();
    if !data.hunts.contains_key(hunt_id) {
        return arm_error(
            StatusCode::NOT_FOUND,
            "NotFound",
            format!("Hunt '{}' was not found.", hunt_id),
        );
    }
    let relations = data
        .relations
        .get(hunt_id)
        .map(|r| r.values().cloned().collect())
        .unwrap_or_default();
    list_response(relations)
}

async fn put_relation(
    Path(params): Path<Params>,
    OriginalUri(uri): OriginalUri,
    Json(payload): Json<Value>,
) -> Response {
    let hunt_id = param(&params, "hunt_id").to_string();
    let id = param(&params, "relation_id").to_string();
    info!("PUT relation {} on hunt {} with payload: {}", id, hunt_id, payload);

    let mut data = MOCK_DATA.lock().unwrap();
    if !data.hunts.contains_key(&hunt_id) {
        return arm_error(
            StatusCode::NOT_FOUND,
            "NotFound",
            format!("Hunt '{}' was not found.", hunt_id),
        );
    }

    let relation = json!({
        "id": uri.path(),
        "name": id,
        "properties": payload.get("properties").cloned().unwrap_or_else(|| json!({})),
    });
    data.relations
        .entry(hunt_id)
        .or_default()
        .insert(id, relation.clone());
    (StatusCode::CREATED, Json(relation)).into_response()
}

async fn delete_relation(Path(params): Path<Params>) -> Response {
    let hunt_id = param(&params, "hunt_id");
    let id = param(&params, "relation_id");
    info!("DELETE relation {} on hunt {}", id, hunt_id);
    let removed = MOCK_DATA
        .lock()
        .unwrap()
        .relations
        .get_mut(hunt_id)
        .and_then(|r| r.remove(id));
    match removed {
        Some(_) => StatusCode::OK.into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn run_query(
    Query(query_params): Query<Params>,
    Json(payload): Json<Value>,
) -> Response {
    info!(
        "POST query with api-version {:?}, payload: {}",
        query_params.get("api-version"),
        payload
    );
    let Some(kql) = payload.get("query").and_then(Value::as_str) else {
        return arm_error(
            StatusCode::BAD_REQUEST,
            "BadArgumentError",
            "The request had some invalid properties",
        );
    };

    (
        StatusCode::OK,
        Json(json!({
            "tables": [{
                "name": "PrimaryResult",
                "columns": [
                    {"name": "TimeGenerated", "type": "datetime"},
                    {"name": "Query", "type": "string"}
                ],
                "rows": [[Utc::now().to_rfc3339(), kql]]
            }]
        })),
    )
        .into_response()
}

async fn catch_all(method: axum::http::Method, uri: axum::http::Uri) -> impl IntoResponse {
    warn!("Unhandled request: {} {}", method, uri);
    arm_error(
        StatusCode::NOT_FOUND,
        "InvalidResourceType",
        format!("No handler for: {} {}", method, uri.path()),
    )
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr) // Log to stderr for tests
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Starting Mock Sentinel Server...");

    let workspace = Router::new()
        .route("/savedSearches", get(list_saved_searches))
        .route(
            "/savedSearches/:id",
            get(get_saved_search)
                .put(put_saved_search)
                .delete(delete_saved_search),
        )
        .route("/providers/Microsoft.SecurityInsights/hunts", get(list_hunts))
        .route(
            "/providers/Microsoft.SecurityInsights/hunts/:hunt_id",
            get(get_hunt).put(put_hunt).delete(delete_hunt),
        )
        .route(
            "/providers/Microsoft.SecurityInsights/hunts/:hunt_id/relations",
            get(list_relations),
        )
        .route(
            "/providers/Microsoft.SecurityInsights/hunts/:hunt_id/relations/:relation_id",
            put(put_relation).delete(delete_relation),
        )
        .route("/query", post(run_query))
        .layer(middleware::from_fn(require_bearer));

    let app = Router::new()
        .route("/health", get(health_check))
        .nest(WORKSPACE_PREFIX, workspace)
        .fallback(catch_all)
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let port = addr.port();

    println!("MOCK_SERVER_PORT={}", port); // Critical for test harness
    info!("Mock server listening on 127.0.0.1:{}", port);

    axum::serve(listener, app).await.unwrap();
}
