use actix_web::http::Method;
use actix_web::{web, HttpMessage, HttpRequest, HttpResponse};
use mockapi::{ListQuery, MockApiError};
use serde_json::{json, Value};

use crate::AppState;

/// Configure the generic collection routes.
/// `{collection}` is resolved against the route table on every request.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .service(
            web::resource("/{collection}")
                .route(web::get().to(list_records))
                .route(web::post().to(create_record))
                .route(web::method(Method::OPTIONS).to(preflight)),
        )
        .service(
            web::resource("/{collection}/{id}")
                .route(web::get().to(get_record))
                .route(web::put().to(update_record))
                .route(web::delete().to(delete_record))
                .route(web::method(Method::OPTIONS).to(preflight)),
        );
}

// ── Helpers ─────────────────────────────────────────────────────────

fn error_body(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

pub fn error_response(e: &MockApiError) -> HttpResponse {
    match e {
        MockApiError::NotFound { .. } => HttpResponse::NotFound().json(error_body(e.to_string())),
        MockApiError::Validation(_) => HttpResponse::BadRequest().json(error_body(e.to_string())),
        MockApiError::Conflict(_) => HttpResponse::Conflict().json(error_body(e.to_string())),
        _ => {
            log::error!("Internal error: {e}");
            HttpResponse::InternalServerError().json(error_body("Internal server error"))
        }
    }
}

fn respond<T: serde::Serialize>(
    result: mockapi::Result<T>,
    ok: fn() -> actix_web::HttpResponseBuilder,
) -> HttpResponse {
    match result {
        Ok(value) => ok().json(value),
        Err(e) => error_response(&e),
    }
}

/// Parse a POST/PUT body. Requires a JSON content type and a JSON object.
fn parse_body(req: &HttpRequest, body: &[u8]) -> mockapi::Result<Value> {
    let content_type = req.content_type().to_ascii_lowercase();
    let is_json = content_type == "application/json"
        || (content_type.starts_with("application/") && content_type.ends_with("+json"));
    if !is_json {
        return Err(MockApiError::Validation(
            "Content-Type must be application/json".into(),
        ));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| MockApiError::Validation(format!("Invalid JSON: {e}")))?;
    if !value.is_object() {
        return Err(MockApiError::Validation(
            "Request body must be a JSON object".into(),
        ));
    }
    Ok(value)
}

// ── Handlers ────────────────────────────────────────────────────────

async fn index(state: web::Data<AppState>) -> HttpResponse {
    let routes = state.routes();
    let endpoints: Vec<String> = routes
        .endpoints()
        .into_iter()
        .map(|(method, path)| format!("{method} {path}"))
        .collect();
    HttpResponse::Ok().json(json!({
        "collections": routes.collections().collect::<Vec<_>>(),
        "endpoints": endpoints,
    }))
}

async fn list_records(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<Vec<(String, String)>>,
) -> HttpResponse {
    state.simulate_latency().await;
    let result = ListQuery::parse(query.into_inner())
        .and_then(|q| state.dispatch(&path, |routes, store| routes.list(store, &q)));
    respond(result, HttpResponse::Ok)
}

async fn get_record(state: web::Data<AppState>, path: web::Path<(String, String)>) -> HttpResponse {
    state.simulate_latency().await;
    let (collection, id) = path.into_inner();
    let result = state.dispatch(&collection, |routes, store| routes.get(store, &id));
    respond(result, HttpResponse::Ok)
}

async fn create_record(
    state: web::Data<AppState>,
    path: web::Path<String>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    state.simulate_latency().await;
    let result = state.dispatch(&path, |routes, store| {
        let data = parse_body(&req, &body)?;
        routes.create(store, data)
    });
    respond(result, HttpResponse::Created)
}

async fn update_record(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    state.simulate_latency().await;
    let (collection, id) = path.into_inner();
    let result = state.dispatch(&collection, |routes, store| {
        let data = parse_body(&req, &body)?;
        routes.update(store, &id, data)
    });
    respond(result, HttpResponse::Ok)
}

async fn delete_record(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    state.simulate_latency().await;
    let (collection, id) = path.into_inner();
    let result = state
        .dispatch(&collection, |routes, store| routes.delete(store, &id))
        .map(|()| json!({ "deleted": true }));
    respond(result, HttpResponse::Ok)
}

async fn preflight() -> HttpResponse {
    HttpResponse::NoContent().finish()
}

/// Anything no route matched. Preflights still succeed.
pub async fn fallback(req: HttpRequest) -> HttpResponse {
    if req.method() == Method::OPTIONS {
        return preflight().await;
    }
    HttpResponse::NotFound().json(error_body(format!("Not found: {}", req.path())))
}
