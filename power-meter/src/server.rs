//! HTTP host for the measurement service.
//!
//! # Endpoints
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | `GET` | `/schema` | [`MeasurementSchema`] |
//! | `POST` | `/measure` | `200 {"powerDbm": ...}` or an [`AbortReport`] |
//!
//! An aborted measurement answers `400` when the request was invalid and
//! `500` otherwise. Measurements run on the blocking thread pool; requests
//! for the same sensor are serialized, different sensors run in parallel.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use hardware::scpi::Endpoint;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::error::{AbortReport, ABORT_CODE};
use crate::orchestrator::{MeasurementOrchestrator, SessionFactory};
use crate::request::MeasurementRequest;
use crate::schema::MeasurementSchema;

/// One mutex per instrument endpoint.
///
/// Resource names that address the same endpoint (`TCPIP0::h::INSTR` and
/// `h:5025`) share a lock. Entries nobody holds are dropped on the next
/// lookup, so the map only holds endpoints with measurements in flight.
#[derive(Debug, Clone, Default)]
pub struct ResourceLocks {
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl ResourceLocks {
    /// Lock guarding `resource_name`, or `None` if the name addresses no
    /// instrument.
    pub fn lock_for(&self, resource_name: &str) -> Option<Arc<Mutex<()>>> {
        let key = Endpoint::parse(resource_name).ok()?.key();

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Some(Arc::clone(locks.entry(key).or_default()))
    }

    /// Number of endpoints currently tracked.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared state of the HTTP host.
pub struct AppState<F: SessionFactory> {
    orchestrator: MeasurementOrchestrator<F>,
    schema: MeasurementSchema,
    locks: ResourceLocks,
}

impl<F: SessionFactory> AppState<F> {
    pub fn new(orchestrator: MeasurementOrchestrator<F>, schema: MeasurementSchema) -> Self {
        Self {
            orchestrator,
            schema,
            locks: ResourceLocks::default(),
        }
    }

    pub fn locks(&self) -> &ResourceLocks {
        &self.locks
    }
}

/// Build the router for the measurement service.
pub fn router<F>(state: AppState<F>) -> Router
where
    F: SessionFactory + Send + Sync + 'static,
{
    Router::new()
        .route("/schema", get(get_schema::<F>))
        .route("/measure", post(post_measure::<F>))
        .with_state(Arc::new(state))
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState<F>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()>
where
    F: SessionFactory + Send + Sync + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Measurement service listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn get_schema<F>(State(state): State<Arc<AppState<F>>>) -> Json<MeasurementSchema>
where
    F: SessionFactory + Send + Sync + 'static,
{
    Json(state.schema.clone())
}

async fn post_measure<F>(
    State(state): State<Arc<AppState<F>>>,
    body: Result<Json<MeasurementRequest>, JsonRejection>,
) -> Response
where
    F: SessionFactory + Send + Sync + 'static,
{
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => {
            return abort(
                StatusCode::BAD_REQUEST,
                format!("Invalid measurement request: {}", rejection.body_text()),
            )
        }
    };

    debug!("Measurement requested on {}", request.resource_name);

    if let Err(e) = request.validate() {
        return (StatusCode::BAD_REQUEST, Json(e.report())).into_response();
    }

    let task = tokio::task::spawn_blocking(move || {
        let lock = state.locks.lock_for(&request.resource_name);
        let _held = lock
            .as_ref()
            .map(|lock| lock.lock().unwrap_or_else(PoisonError::into_inner));
        state.orchestrator.measure(&request)
    });

    match task.await {
        Ok(Ok(result)) => (StatusCode::OK, Json(result)).into_response(),
        Ok(Err(e)) => {
            let status = if e.is_invalid_request() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(e.report())).into_response()
        }
        Err(e) => abort(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Measurement task failed: {e}"),
        ),
    }
}

fn abort(status: StatusCode, message: String) -> Response {
    (
        status,
        Json(AbortReport {
            code: ABORT_CODE,
            message,
        }),
    )
        .into_response()
}
