// File: services/bookwerk_backend/src/main.rs
mod app_state;

use app_state::AppState;
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use bookwerk_booking::{routes as booking_routes, BookingEngine, EngineSettings};
use bookwerk_common::services::{BoxedError, CalendarService};
use bookwerk_common::BookwerkError;
use bookwerk_config::load_config;
use bookwerk_db::{
    DbClient, SqlBookingRepository, SqlCalendarConnectionRepository, SqlScopeProfileRepository,
};
use bookwerk_gcal::{GcalCalendarService, HttpGcalApi};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[axum::debug_handler]
async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    if state.db.is_healthy().await {
        (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "degraded" })),
        )
    }
}

/// Build the external calendar service when the runtime flag and config
/// section are both present.
fn build_calendar_service(
    config: &Arc<bookwerk_config::AppConfig>,
    db: &DbClient,
    settings: &EngineSettings,
) -> Option<Arc<dyn CalendarService<Error = BoxedError>>> {
    if !config.use_gcal {
        info!("External calendar disabled via runtime config");
        return None;
    }
    let Some(gcal_config) = config.gcal.clone() else {
        warn!("use_gcal is set but the gcal config section is missing");
        return None;
    };

    match HttpGcalApi::new(gcal_config) {
        Ok(api) => {
            let connections = SqlCalendarConnectionRepository::new(db.clone());
            let service = GcalCalendarService::new(connections, Arc::new(api), settings.time_zone);
            info!("External calendar service initialized");
            Some(Arc::new(service))
        }
        Err(e) => {
            error!(
                "Failed to initialize external calendar client: {}. Availability will use internal bookings only.",
                e
            );
            None
        }
    }
}

async fn run() -> Result<(), BookwerkError> {
    let config = Arc::new(
        load_config().map_err(|e| BookwerkError::ConfigError(e.to_string()))?,
    );

    let db = DbClient::new(&config)
        .await
        .map_err(|e| BookwerkError::DatabaseError(e.to_string()))?;
    bookwerk_db::init_all_schemas(&db)
        .await
        .map_err(|e| BookwerkError::DatabaseError(e.to_string()))?;

    let settings = EngineSettings::from_config(&config.booking_or_default());
    let calendar_service = build_calendar_service(&config, &db, &settings);

    let engine = Arc::new(BookingEngine::new(
        SqlBookingRepository::new(db.clone()),
        SqlScopeProfileRepository::new(db.clone()),
        calendar_service,
        settings,
    ));

    let app_state = AppState {
        config: config.clone(),
        db,
    };

    let api_router = Router::new()
        .route("/", get(|| async { "Welcome to the Bookwerk API!" }))
        .route("/health", get(health_handler))
        .with_state(app_state)
        .merge(booking_routes::routes(engine));

    #[allow(unused_mut)]
    let mut app = Router::new()
        .nest("/api", api_router)
        .layer(TraceLayer::new_for_http());

    // Conditionally add Swagger UI and JSON endpoint if openapi feature enabled
    #[cfg(feature = "openapi")]
    {
        use bookwerk_booking::doc::BookingApiDoc;
        use utoipa::OpenApi;
        use utoipa_swagger_ui::SwaggerUi;

        let openapi_doc = BookingApiDoc::openapi();
        info!("Adding Swagger UI at /api/docs");
        let swagger_ui =
            SwaggerUi::new("/api/docs").url("/api/docs/openapi.json", openapi_doc.clone());
        app = app.merge(swagger_ui);
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Starting server at http://{}", addr);
    info!("API endpoints available at http://{}/api", addr);

    axum::serve(listener, app.into_make_service())
        .await
        .map_err(BookwerkError::from)?;
    Ok(())
}

#[tokio::main]
async fn main() {
    bookwerk_common::logging::init();

    if let Err(e) = run().await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}
