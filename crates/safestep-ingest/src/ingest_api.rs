use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use safestep_domain::device_service::DeviceService;
use safestep_domain::error::DomainError;

/// Wire body pushed by the trackers. Every field is optional at the
/// deserialization layer so missing data maps to a 400 with a useful
/// message instead of a framework rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LocationUpdateRequest {
    device_id: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
    bat: Option<f64>,
}

async fn update_location(
    State(service): State<Arc<DeviceService>>,
    body: Result<Json<LocationUpdateRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(json) => json,
        Err(rejection) => {
            warn!(reason = %rejection, "rejecting unreadable location update");
            return (StatusCode::BAD_REQUEST, "Bad Request - invalid JSON body").into_response();
        }
    };

    let (device_id, lat, lng) = match (request.device_id, request.lat, request.lng) {
        (Some(device_id), Some(lat), Some(lng)) => (device_id, lat, lng),
        _ => {
            warn!("rejecting location update with missing fields");
            return (
                StatusCode::BAD_REQUEST,
                "Bad Request - Missing required data (deviceId, lat, lng)",
            )
                .into_response();
        }
    };

    match service.record_location(&device_id, lat, lng, request.bat).await {
        Ok(()) => {
            debug!(device_id = %device_id, "location update accepted");
            (StatusCode::OK, "Location updated successfully").into_response()
        }
        Err(err @ (DomainError::InvalidCoordinate(_) | DomainError::InvalidDeviceId(_))) => {
            warn!(device_id = %device_id, reason = %err, "rejecting invalid location update");
            (StatusCode::BAD_REQUEST, format!("Bad Request - {err}")).into_response()
        }
        Err(err) => {
            // Includes unknown devices: the endpoint updates, it never
            // creates. Details go to the log, not the caller.
            error!(device_id = %device_id, reason = %err, "location update failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// Router for the ingestion surface. Non-POST methods on the route get a
/// 405 from axum's method routing.
pub fn build_router(service: Arc<DeviceService>) -> Router {
    Router::new()
        .route("/v1/location", post(update_location))
        .with_state(service)
}

/// Ingestion endpoint module: binds and serves until the token cancels.
pub struct IngestApi {
    service: Arc<DeviceService>,
    host: String,
    port: u16,
}

impl IngestApi {
    pub fn new(service: Arc<DeviceService>, host: impl Into<String>, port: u16) -> Self {
        Self {
            service,
            host: host.into(),
            port,
        }
    }

    pub async fn serve(self, ctx: CancellationToken) -> anyhow::Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr = %addr, "ingest endpoint listening");
        axum::serve(listener, build_router(self.service))
            .with_graceful_shutdown(async move { ctx.cancelled().await })
            .await?;
        info!("ingest endpoint stopped");
        Ok(())
    }
}
