//! Mock REST backend used by the client's integration tests.
//!
//! Serves a seeded product table twice: under `/no-auth` with no checks,
//! and at the root behind an auth gate accepting either Basic credentials
//! or a bearer token obtained from `POST /auth/login`. Auth failures
//! return 401 with a `{status, message}` body.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub cost: u64,
    pub quantity: u64,
    pub location_id: u64,
    pub family_id: u64,
}

/// PATCH payload; omitted fields remain unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchProduct {
    pub name: Option<String>,
    pub cost: Option<u64>,
    pub quantity: Option<u64>,
    pub location_id: Option<u64>,
    pub family_id: Option<u64>,
}

pub type Db = Arc<RwLock<BTreeMap<u64, Product>>>;
pub type Users = Arc<HashMap<String, String>>;

/// The four products every table starts with.
pub fn seed_products() -> BTreeMap<u64, Product> {
    let products = [
        Product {
            id: 1,
            name: "Hammer".to_string(),
            cost: 10,
            quantity: 1000,
            location_id: 1,
            family_id: 1,
        },
        Product {
            id: 2,
            name: "Screwdriver".to_string(),
            cost: 5,
            quantity: 500,
            location_id: 2,
            family_id: 1,
        },
        Product {
            id: 3,
            name: "Wrench".to_string(),
            cost: 8,
            quantity: 750,
            location_id: 1,
            family_id: 2,
        },
        Product {
            id: 4,
            name: "Drill".to_string(),
            cost: 120,
            quantity: 25,
            location_id: 3,
            family_id: 2,
        },
    ];
    products.into_iter().map(|p| (p.id, p)).collect()
}

pub fn default_users() -> HashMap<String, String> {
    HashMap::from([("alice".to_string(), "wonderland".to_string())])
}

pub fn app() -> Router {
    let users: Users = Arc::new(default_users());
    let open: Db = Arc::new(RwLock::new(seed_products()));
    let secure: Db = Arc::new(RwLock::new(seed_products()));

    let login = Router::new()
        .route("/auth/login", post(login))
        .route("/auth/session", get(session))
        .with_state(users.clone());
    let protected =
        crud_router(secure).layer(middleware::from_fn_with_state(users, require_auth));

    Router::new()
        .merge(login)
        .nest("/no-auth", crud_router(open))
        .merge(protected)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// The CRUD surface, mounted once openly and once behind the auth gate.
/// Each mount gets its own table so the namespaces cannot interfere.
fn crud_router(db: Db) -> Router {
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product)
                .put(replace_product)
                .patch(patch_product)
                .delete(delete_product),
        )
        .with_state(db)
}

async fn list_products(State(db): State<Db>) -> Json<Vec<Product>> {
    Json(db.read().await.values().cloned().collect())
}

async fn get_product(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<Product>, StatusCode> {
    db.read()
        .await
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn create_product(
    State(db): State<Db>,
    Json(product): Json<Product>,
) -> (StatusCode, Json<Product>) {
    db.write().await.insert(product.id, product.clone());
    (StatusCode::CREATED, Json(product))
}

async fn replace_product(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(mut product): Json<Product>,
) -> Result<Json<Product>, StatusCode> {
    let mut products = db.write().await;
    if !products.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    product.id = id;
    products.insert(id, product.clone());
    Ok(Json(product))
}

async fn patch_product(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(patch): Json<PatchProduct>,
) -> Result<Json<Product>, StatusCode> {
    let mut products = db.write().await;
    let product = products.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = patch.name {
        product.name = name;
    }
    if let Some(cost) = patch.cost {
        product.cost = cost;
    }
    if let Some(quantity) = patch.quantity {
        product.quantity = quantity;
    }
    if let Some(location_id) = patch.location_id {
        product.location_id = location_id;
    }
    if let Some(family_id) = patch.family_id {
        product.family_id = family_id;
    }
    Ok(Json(product.clone()))
}

/// DELETE answers 200 with an empty object, matching common json-server
/// style backends.
async fn delete_product(
    State(db): State<Db>,
    Path(id): Path<u64>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    db.write()
        .await
        .remove(&id)
        .map(|_| Json(json!({})))
        .ok_or(StatusCode::NOT_FOUND)
}

/// `POST /auth/login`: Basic credentials in, bearer token out. A session
/// cookie is set alongside the token so subsequent calls on the same
/// cookie jar stay logged in.
async fn login(State(users): State<Users>, headers: HeaderMap) -> Response {
    match basic_credentials(&headers) {
        Some((username, password)) if users.get(&username) == Some(&password) => {
            let mut response =
                Json(json!({"access_token": format!("tok-{username}")})).into_response();
            if let Ok(cookie) = HeaderValue::from_str(&format!("session=sess-{username}; Path=/"))
            {
                response.headers_mut().insert(header::SET_COOKIE, cookie);
            }
            response
        }
        _ => auth_failure("Incorrect username or password"),
    }
}

/// `GET /auth/session`: reports the user bound to the session cookie, or
/// 401 when no valid cookie accompanies the request.
async fn session(State(users): State<Users>, headers: HeaderMap) -> Response {
    let user = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(session_user);
    match user {
        Some(username) if users.contains_key(&username) => {
            Json(json!({"user": username})).into_response()
        }
        _ => auth_failure("No active session"),
    }
}

fn session_user(cookies: &str) -> Option<String> {
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == "session" {
            value.strip_prefix("sess-").map(str::to_string)
        } else {
            None
        }
    })
}

async fn require_auth(State(users): State<Users>, request: Request, next: Next) -> Response {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let Some(value) = header_value else {
        return auth_failure("Error in authorization format");
    };
    match value.split_once(' ') {
        Some(("Bearer", token)) => {
            let known = token
                .strip_prefix("tok-")
                .map(|user| users.contains_key(user))
                .unwrap_or(false);
            if known {
                next.run(request).await
            } else {
                auth_failure("Invalid access_token")
            }
        }
        Some(("Basic", _)) => match basic_credentials(request.headers()) {
            Some((username, password)) if users.get(&username) == Some(&password) => {
                next.run(request).await
            }
            _ => auth_failure("Incorrect username or password"),
        },
        _ => auth_failure("Error in authorization format"),
    }
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

fn auth_failure(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"status": 401, "message": message})),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_serializes_with_camel_case_keys() {
        let product = seed_products().remove(&1).unwrap();
        let value = serde_json::to_value(&product).unwrap();
        assert_eq!(value["locationId"], 1);
        assert_eq!(value["familyId"], 1);
        assert!(value.get("location_id").is_none());
    }

    #[test]
    fn seed_contains_four_products_with_known_locations() {
        let products = seed_products();
        assert_eq!(products.len(), 4);
        let mut locations: Vec<u64> = products.values().map(|p| p.location_id).collect();
        locations.sort_unstable();
        assert_eq!(locations, vec![1, 1, 2, 3]);
    }

    #[test]
    fn patch_payload_fields_are_optional() {
        let patch: PatchProduct = serde_json::from_str(r#"{"cost": 0}"#).unwrap();
        assert_eq!(patch.cost, Some(0));
        assert!(patch.name.is_none());
        assert!(patch.quantity.is_none());
    }

    #[test]
    fn basic_credentials_round_trip() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("alice:wonderland");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Basic {encoded}").parse().unwrap(),
        );
        assert_eq!(
            basic_credentials(&headers),
            Some(("alice".to_string(), "wonderland".to_string()))
        );
    }

    #[test]
    fn session_user_is_parsed_from_cookie_list() {
        assert_eq!(
            session_user("theme=dark; session=sess-alice"),
            Some("alice".to_string())
        );
        assert_eq!(session_user("theme=dark"), None);
        assert_eq!(session_user("session=garbage"), None);
    }

    #[test]
    fn malformed_basic_header_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic !!!".parse().unwrap());
        assert_eq!(basic_credentials(&headers), None);
    }
}
