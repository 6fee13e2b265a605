//! HTTP surface for a mockapi store: generated CRUD routes per collection,
//! a fixed CORS policy and optional simulated latency.

pub mod cors;
pub mod handlers;
pub mod routes;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::error::InternalError;
use actix_web::{web, App, HttpResponse};
use mockapi::{ReloadOutcome, Store};
use routes::{CollectionRoutes, RouteTable};
use std::sync::{Arc, RwLock, RwLockReadGuard};
use std::time::Duration;

/// Server behaviour that is not derived from the data file.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Added before every collection response.
    pub delay: Duration,
}

/// Shared application state
pub struct AppState {
    store: Arc<Store>,
    routes: RwLock<RouteTable>,
    config: ServerConfig,
}

impl AppState {
    pub fn new(store: Arc<Store>, config: ServerConfig) -> Self {
        let routes = RouteTable::from_store(&store);
        AppState {
            store,
            routes: RwLock::new(routes),
            config,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn routes(&self) -> RwLockReadGuard<'_, RouteTable> {
        self.routes.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `op` against the handler set registered for `collection`.
    pub fn dispatch<T>(
        &self,
        collection: &str,
        op: impl FnOnce(&CollectionRoutes, &Store) -> mockapi::Result<T>,
    ) -> mockapi::Result<T> {
        let routes = self.routes();
        let handlers = routes.resolve(collection)?;
        op(handlers, &self.store)
    }

    /// Reload the backing file and regenerate routes from it.
    pub fn reload(&self) -> mockapi::Result<ReloadOutcome> {
        let outcome = self.store.reload()?;
        if outcome != ReloadOutcome::Unchanged {
            let table = RouteTable::from_store(&self.store);
            *self.routes.write().unwrap_or_else(|e| e.into_inner()) = table;
        }
        Ok(outcome)
    }

    pub(crate) async fn simulate_latency(&self) {
        if !self.config.delay.is_zero() {
            actix_web::rt::time::sleep(self.config.delay).await;
        }
    }
}

/// Build the actix application for `state`.
pub fn build_app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let query_config = web::QueryConfig::default().error_handler(|err, _req| {
        let response = HttpResponse::BadRequest().json(serde_json::json!({
            "error": format!("Invalid query string: {err}")
        }));
        InternalError::from_response(err, response).into()
    });

    App::new()
        .app_data(state)
        .app_data(query_config)
        .wrap(cors::cors_headers())
        .configure(handlers::configure)
        .default_service(web::to(handlers::fallback))
}
