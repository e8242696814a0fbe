//! HTTP surface.
//!
//! The router is built from the derived import actions: every action bound to
//! the generic import-request handler gets its own route, mounted in priority
//! order. Job and template routes are fixed:
//!
//! | Route | Operation |
//! |-------|-----------|
//! | `{derived import path}` | create an import job |
//! | `GET /imports/{id}` | job representation |
//! | `PUT /imports/{id}/retry` | reset and dispatch again |
//! | `GET /imports/{id}/original` | uploaded file |
//! | `GET /imports/{id}/result` | run report |
//! | `GET /metadatas/{name}/import-template-file.{ext}` | import template |

mod handlers;

use crate::models::{ActionConfig, ActionHandler, HttpMethod};
use crate::services::{ImportService, ServiceContainer, UploadCompletionBridge};
use crate::translation::Translator;
use crate::{Error, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::routing::{MethodFilter, MethodRouter, get, on, put};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

pub use handlers::{ImportQuery, OrganizationPath, TEMPLATE_FILE_PREFIX, error_response};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    /// Import operations.
    pub imports: ImportService,
    /// Translator for error messages.
    pub translator: Arc<dyn Translator>,
}

impl AppState {
    /// Creates the state from a service container.
    #[must_use]
    pub fn from_container(container: &ServiceContainer) -> Self {
        Self {
            imports: container.imports.clone(),
            translator: Arc::clone(&container.translator),
        }
    }
}

/// Builds the router for `actions` (already in priority order).
///
/// Actions bound to other handlers are left to whoever registers them. When
/// two actions claim the same path and method, the first one wins.
#[must_use]
pub fn router(state: AppState, actions: &[ActionConfig]) -> Router {
    let mut router = Router::new();
    let mut mounted: HashSet<(String, HttpMethod)> = HashSet::new();

    for action in actions {
        let (Some(ActionHandler::ImportRequest), Some(path), Some(target)) =
            (&action.handler, &action.path, &action.target_type)
        else {
            continue;
        };

        let methods: Vec<HttpMethod> = action
            .methods
            .iter()
            .copied()
            .filter(|method| mounted.insert((path.clone(), *method)))
            .collect();
        let Some(filter) = method_filter(&methods) else {
            tracing::warn!(
                path = %path,
                target = %target,
                "Import route already mounted, skipping"
            );
            continue;
        };

        tracing::debug!(path = %path, target = %target, "Mounting import route");
        router = router.route(path, import_route(path, filter, target));
    }

    router
        .route("/imports/{id}", get(handlers::show_job))
        .route("/imports/{id}/retry", put(handlers::retry_job))
        .route("/imports/{id}/original", get(handlers::download_original))
        .route("/imports/{id}/result", get(handlers::download_result))
        .route("/metadatas/{name}/{file}", get(handlers::download_template))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            header::HeaderValue::from_static("nosniff"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn method_filter(methods: &[HttpMethod]) -> Option<MethodFilter> {
    methods
        .iter()
        .map(|method| match method {
            HttpMethod::Get => MethodFilter::GET,
            HttpMethod::Post => MethodFilter::POST,
            HttpMethod::Put => MethodFilter::PUT,
            HttpMethod::Patch => MethodFilter::PATCH,
            HttpMethod::Delete => MethodFilter::DELETE,
        })
        .reduce(MethodFilter::or)
}

fn import_route(path: &str, filter: MethodFilter, target: &str) -> MethodRouter<AppState> {
    let target: Arc<str> = Arc::from(target);
    if path.contains("{organization}") {
        on(
            filter,
            move |State(state): State<AppState>,
                  Path(org): Path<OrganizationPath>,
                  Query(query): Query<ImportQuery>,
                  body: Bytes| {
                handlers::create_import(state, Arc::clone(&target), org.organization, query, body)
            },
        )
    } else {
        on(
            filter,
            move |State(state): State<AppState>, Query(query): Query<ImportQuery>, body: Bytes| {
                handlers::create_import(state, Arc::clone(&target), String::new(), query, body)
            },
        )
    }
}

/// Serves the HTTP surface until the process stops.
///
/// The upload completion bridge runs alongside the server.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(container: &ServiceContainer, port: u16) -> Result<()> {
    let uploads = UploadCompletionBridge::subscribe(&container.events);
    let bridge = container.bridge.clone();
    tokio::spawn(async move { bridge.run(uploads).await });

    let actions = container.deriver.derive_all(&container.registry);
    let app = router(AppState::from_container(container), &actions);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::operation("bind", e))?;
    tracing::info!(port, routes = actions.len(), "Serving import API");

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::operation("serve", e))
}
