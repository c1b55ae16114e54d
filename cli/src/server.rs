use std::convert::Infallible;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{FromRequestParts, Path, Request, State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use pantry_core::catalog::IngredientCatalog;
use pantry_core::models::{FilterOptions, Recipe, RecipeKey, SaveRecipe, User};
use pantry_core::service::RecipeService;
use pantry_core::store::Storage;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MiB

#[derive(Clone)]
struct AppState {
    catalog: Arc<IngredientCatalog>,
    storage: Arc<dyn Storage>,
}

impl AppState {
    fn service(&self, caller: &Caller) -> RecipeService {
        RecipeService::new(
            Arc::clone(&self.catalog),
            self.storage.scoped(caller.0.as_deref()),
        )
    }
}

/// The bearer credential of the incoming request, forwarded to backends that
/// act on behalf of the caller.
struct Caller(Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string);
        Ok(Self(token))
    }
}

// --- Request / Response types ---

#[derive(Deserialize)]
struct RegisterRequest {
    name: Option<String>,
}

#[derive(Deserialize)]
struct CoachRequest {
    caller: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct DeleteRequest {
    id: Option<i64>,
    title: Option<String>,
    user_id: Option<i64>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Forbidden(String),
    PayloadTooLarge(String),
    BadGateway(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            Self::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            Self::BadGateway(msg) => {
                tracing::error!("Upstream store error: {msg}");
                (
                    StatusCode::BAD_GATEWAY,
                    "Storage backend unavailable".to_string(),
                )
            }
            Self::Internal(err) => {
                tracing::error!("Internal server error: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

/// Malformed or wrongly typed bodies get the same `{"error": ...}` shape as
/// every other failure.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(rejection.body_text())
        } else {
            Self::BadRequest(rejection.body_text())
        }
    }
}

impl From<pantry_core::Error> for ApiError {
    fn from(err: pantry_core::Error) -> Self {
        use pantry_core::Error;
        match err {
            Error::Validation(msg) => Self::BadRequest(msg),
            Error::NotFound(_) => Self::NotFound(err.to_string()),
            Error::Conflict(msg) => Self::Conflict(msg),
            Error::Forbidden(msg) => Self::Forbidden(msg),
            Error::Upstream(msg) => Self::BadGateway(msg),
            other => Self::Internal(anyhow::Error::new(other)),
        }
    }
}

// --- Middleware ---

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    response
}

// --- Catalog / generation handlers ---

async fn get_ingredients(State(state): State<AppState>) -> Json<IngredientCatalog> {
    Json(state.catalog.as_ref().clone())
}

async fn generate_recipe(State(state): State<AppState>, caller: Caller) -> Json<Recipe> {
    Json(state.service(&caller).generate())
}

async fn generate_recipe_for_user(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<i64>,
) -> Result<Json<Recipe>, ApiError> {
    let draft = state.service(&caller).generate_for_user(user_id).await?;
    Ok(Json(draft))
}

// --- User handlers ---

async fn list_users(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.service(&caller).users().await?))
}

async fn get_user(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.service(&caller).user(id).await?))
}

async fn delete_user(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.service(&caller).delete_user(id).await?;
    Ok(Json(MessageResponse {
        message: format!("User {id} deleted"),
    }))
}

async fn register(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Json(req) = payload?;
    let name = req
        .name
        .ok_or_else(|| ApiError::BadRequest("name is required".to_string()))?;
    let user = state.service(&caller).register(&name).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn add_coach(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<CoachRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let Json(req) = payload?;
    let (Some(requested_by), Some(name)) = (req.caller, req.name) else {
        return Err(ApiError::BadRequest(
            "caller and name are required".to_string(),
        ));
    };
    let coach = state
        .service(&caller)
        .promote_to_coach(&requested_by, &name)
        .await?;
    Ok((StatusCode::CREATED, Json(coach)))
}

// --- Recipe handlers ---

async fn load_all_recipes(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    Ok(Json(state.service(&caller).all_recipes().await?))
}

async fn list_recipes(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    Ok(Json(state.service(&caller).recipes(user_id).await?))
}

async fn get_recipe(
    State(state): State<AppState>,
    caller: Caller,
    Path((user_id, recipe_id)): Path<(i64, i64)>,
) -> Result<Json<Recipe>, ApiError> {
    Ok(Json(state.service(&caller).recipe(user_id, recipe_id).await?))
}

async fn get_filters(
    State(state): State<AppState>,
    caller: Caller,
    Path(user_id): Path<i64>,
) -> Result<Json<FilterOptions>, ApiError> {
    Ok(Json(state.service(&caller).filter_options(user_id).await?))
}

async fn save_recipe(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<SaveRecipe>, JsonRejection>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let Json(req) = payload?;
    let saved = state.service(&caller).save(req).await?;
    Ok((StatusCode::CREATED, Json(saved)))
}

async fn delete_recipe(
    State(state): State<AppState>,
    caller: Caller,
    payload: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = payload?;
    let key = match (req.id, req.title) {
        (Some(id), _) => RecipeKey::Id(id),
        (None, Some(title)) => RecipeKey::Title {
            user_id: req.user_id,
            title,
        },
        (None, None) => {
            return Err(ApiError::BadRequest("id or title is required".to_string()));
        }
    };
    delete_by_key(&state, &caller, key).await
}

async fn delete_recipe_by_id(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, ApiError> {
    delete_by_key(&state, &caller, RecipeKey::Id(id)).await
}

async fn delete_by_key(
    state: &AppState,
    caller: &Caller,
    key: RecipeKey,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = format!("Deleted {key}");
    state.service(caller).delete(key).await?;
    Ok(Json(MessageResponse { message }))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ingredients", get(get_ingredients))
        .route("/generate", get(generate_recipe))
        .route("/generate/{user_id}", get(generate_recipe_for_user))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/register", post(register))
        .route("/coaches", post(add_coach))
        .route("/load", get(load_all_recipes))
        .route("/recipes/{user_id}", get(list_recipes))
        .route("/recipes/{user_id}/{recipe_id}", get(get_recipe))
        .route("/filters/{user_id}", get(get_filters))
        .route("/save", post(save_recipe))
        .route("/delete", post(delete_recipe))
        .route("/delete/{recipe_id}", delete(delete_recipe_by_id))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    catalog: Arc<IngredientCatalog>,
    storage: Arc<dyn Storage>,
    port: u16,
    bind: &str,
) -> anyhow::Result<()> {
    let app = build_router(AppState { catalog, storage });

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    tracing::info!("Listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;
    use pantry_core::models::Role;
    use pantry_core::store::{FileStore, SqliteStore};
    use tower::ServiceExt;

    const CATALOG: &str = r#"{
        "vegetables": ["Spinach", "Carrots", "Broccoli", "Peppers"],
        "proteins": ["Chicken", "Tofu", "Beef", "Beans"],
        "carbs": ["Rice", "Pasta", "Quinoa", "Potatoes"],
        "fats": ["Olive oil", "Butter", "Avocado", "Nuts"]
    }"#;

    fn test_state() -> AppState {
        AppState {
            catalog: Arc::new(IngredientCatalog::from_json(CATALOG).unwrap()),
            storage: Arc::new(SqliteStore::open_in_memory().unwrap()),
        }
    }

    fn test_app() -> Router {
        build_router(test_state())
    }

    async fn send(app: &Router, request: axum::http::Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    fn get_request(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::get(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> axum::http::Request<Body> {
        axum::http::Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(body).unwrap()))
            .unwrap()
    }

    async fn register_user(app: &Router, name: &str) -> i64 {
        let (status, json) = send(app, post_json("/register", &serde_json::json!({ "name": name }))).await;
        assert_eq!(status, StatusCode::CREATED);
        json["id"].as_i64().unwrap()
    }

    fn recipe_body(user_id: i64, title: &str, veg: &str) -> serde_json::Value {
        serde_json::json!({
            "user_id": user_id,
            "title": title,
            "ingredients": {
                "vegetables": veg,
                "proteins": "Tofu",
                "carbs": "Rice",
                "fats": "Olive oil"
            },
            "instructions": "Cook it all."
        })
    }

    #[tokio::test]
    async fn ingredients_returns_catalog() {
        let app = test_app();
        let (status, json) = send(&app, get_request("/ingredients")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["vegetables"][0], "Spinach");
        assert_eq!(json["fats"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn generate_draws_from_catalog() {
        let app = test_app();
        let catalog = IngredientCatalog::from_json(CATALOG).unwrap();
        let (status, json) = send(&app, get_request("/generate")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.get("id").is_none());
        for category in catalog.categories() {
            let value = json["ingredients"][category].as_str().unwrap();
            assert!(catalog.choices(category).unwrap().iter().any(|c| c == value));
        }
    }

    #[tokio::test]
    async fn generate_for_unknown_user_returns_404() {
        let app = test_app();
        let (status, json) = send(&app, get_request("/generate/99")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "user 99 not found");
    }

    #[tokio::test]
    async fn generate_for_user_sets_owner() {
        let app = test_app();
        let id = register_user(&app, "anna").await;
        let (status, json) = send(&app, get_request(&format!("/generate/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user_id"], id);
    }

    #[tokio::test]
    async fn register_duplicate_returns_409() {
        let app = test_app();
        register_user(&app, "anna").await;
        let (status, _) = send(&app, post_json("/register", &serde_json::json!({ "name": "anna" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_missing_name_returns_400() {
        let app = test_app();
        let (status, json) = send(&app, post_json("/register", &serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "name is required");
    }

    #[tokio::test]
    async fn users_list_and_get() {
        let app = test_app();
        let id = register_user(&app, "anna").await;
        register_user(&app, "ben").await;

        let (status, json) = send(&app, get_request("/users")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 2);

        let (status, json) = send(&app, get_request(&format!("/users/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "anna");
        assert_eq!(json["role"], "user");

        let (status, _) = send(&app, get_request("/users/1234")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn save_then_fetch_round_trip() {
        let app = test_app();
        let user_id = register_user(&app, "anna").await;
        let body = recipe_body(user_id, "Green bowl", "Spinach");

        let (status, saved) = send(&app, post_json("/save", &body)).await;
        assert_eq!(status, StatusCode::CREATED);
        let recipe_id = saved["id"].as_i64().unwrap();

        let (status, fetched) = send(&app, get_request(&format!("/recipes/{user_id}/{recipe_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["ingredients"], body["ingredients"]);

        let (_, listed) = send(&app, get_request(&format!("/recipes/{user_id}"))).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn save_missing_title_returns_400_and_writes_nothing() {
        let app = test_app();
        let user_id = register_user(&app, "anna").await;
        let mut body = recipe_body(user_id, "x", "Spinach");
        body.as_object_mut().unwrap().remove("title");

        let (status, json) = send(&app, post_json("/save", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("title"));

        let (_, listed) = send(&app, get_request("/load")).await;
        assert!(listed.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_recipe_returns_404() {
        let app = test_app();
        let user_id = register_user(&app, "anna").await;
        let (status, _) = send(&app, get_request(&format!("/recipes/{user_id}/77"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_nonexistent_returns_404() {
        let app = test_app();
        let (status, _) = send(
            &app,
            axum::http::Request::delete("/delete/4242")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, post_json("/delete", &serde_json::json!({ "title": "Nope", "user_id": 1 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, post_json("/delete", &serde_json::json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_existing_recipe() {
        let app = test_app();
        let user_id = register_user(&app, "anna").await;
        let (_, saved) = send(&app, post_json("/save", &recipe_body(user_id, "Bowl", "Spinach"))).await;
        let id = saved["id"].as_i64().unwrap();

        let (status, json) = send(
            &app,
            axum::http::Request::delete(format!("/delete/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], format!("Deleted recipe {id}"));
    }

    #[tokio::test]
    async fn filters_sorted_and_deduplicated() {
        let app = test_app();
        let user_id = register_user(&app, "anna").await;
        for (title, veg) in [("A", "Spinach"), ("B", "Carrots"), ("C", "Spinach")] {
            send(&app, post_json("/save", &recipe_body(user_id, title, veg))).await;
        }

        let (status, json) = send(&app, get_request(&format!("/filters/{user_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["vegetables"], serde_json::json!(["Carrots", "Spinach"]));
        assert_eq!(json["proteins"], serde_json::json!(["Tofu"]));
    }

    #[tokio::test]
    async fn coach_promotion_checks_role() {
        let state = test_state();
        let app = build_router(state.clone());
        register_user(&app, "anna").await;

        let (status, _) = send(
            &app,
            post_json("/coaches", &serde_json::json!({ "caller": "anna", "name": "carl" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            post_json("/coaches", &serde_json::json!({ "caller": "ghost", "name": "carl" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        state
            .storage
            .register_user("root", Role::Admin)
            .await
            .unwrap();
        let (status, json) = send(
            &app,
            post_json("/coaches", &serde_json::json!({ "caller": "root", "name": "carl" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["role"], "coach");
    }

    #[tokio::test]
    async fn file_backend_upserts_by_title() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(AppState {
            catalog: Arc::new(IngredientCatalog::from_json(CATALOG).unwrap()),
            storage: Arc::new(FileStore::open(dir.path()).unwrap()),
        });

        send(&app, post_json("/save", &serde_json::json!({ "title": "Bowl", "ingredients": { "vegetables": "Spinach" } }))).await;
        let (status, _) = send(&app, post_json("/save", &serde_json::json!({ "title": "Bowl", "ingredients": { "vegetables": "Carrots" } }))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, listed) = send(&app, get_request("/load")).await;
        let listed = listed.as_array().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0]["ingredients"]["vegetables"], "Carrots");

        let (status, _) = send(&app, post_json("/delete", &serde_json::json!({ "title": "Bowl" }))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_body_returns_json_400() {
        let app = test_app();
        let (status, json) = send(
            &app,
            post_json("/save", &serde_json::json!({ "user_id": "abc", "title": "x" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());

        let response = app
            .clone()
            .oneshot(
                axum::http::Request::post("/register")
                    .header("content-type", "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn delete_by_title_needs_owner_and_spares_others() {
        let app = test_app();
        let anna = register_user(&app, "anna").await;
        let ben = register_user(&app, "ben").await;
        send(&app, post_json("/save", &recipe_body(anna, "Bowl", "Spinach"))).await;
        send(&app, post_json("/save", &recipe_body(ben, "Bowl", "Carrots"))).await;

        let (status, json) =
            send(&app, post_json("/delete", &serde_json::json!({ "title": "Bowl" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("user_id"));

        let (status, _) = send(
            &app,
            post_json("/delete", &serde_json::json!({ "title": "Bowl", "user_id": anna })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, listed) = send(&app, get_request(&format!("/recipes/{anna}"))).await;
        assert!(listed.as_array().unwrap().is_empty());
        let (_, listed) = send(&app, get_request(&format!("/recipes/{ben}"))).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn security_headers_present() {
        let app = test_app();
        let response = app.oneshot(get_request("/ingredients")).await.unwrap();
        assert_eq!(
            response.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(response.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn body_size_limit_rejects_oversized() {
        let app = test_app();
        let big_body = vec![b' '; BODY_LIMIT + 1];
        let response = app
            .oneshot(
                axum::http::Request::post("/save")
                    .header("content-type", "application/json")
                    .body(Body::from(big_body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn internal_error_does_not_leak_details() {
        let error = ApiError::from(pantry_core::Error::Io(std::io::Error::other(
            "secret path /var/lib/pantry",
        )));
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Internal server error");
    }

    #[tokio::test]
    async fn upstream_error_maps_to_502() {
        let response =
            ApiError::from(pantry_core::Error::Upstream("connection refused".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
