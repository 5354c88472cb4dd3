//! HTTP front for the table service
//!
//! `GET /?sheet=<name>` reads a table, `POST /` applies a mutation. The same
//! handlers are mounted under `/exec`, and `/health` reports liveness.

use actix_web::http::StatusCode;
use actix_web::{middleware, web, App, HttpResponse, HttpServer};
use serde_json::json;

use crate::config::Config;
use crate::messages::{timestamp, ReadQuery};
use crate::service::{Reply, Service};
use crate::sheet::MemoryWorkbook;
use crate::storage::open_workbook;

/// Shared state handed to every worker
pub struct AppState {
    pub service: Service<MemoryWorkbook>,
}

impl AppState {
    pub fn new(service: Service<MemoryWorkbook>) -> Self {
        AppState { service }
    }
}

fn respond(reply: Reply) -> HttpResponse {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(reply.body)
}

fn task_failed(e: actix_web::error::BlockingError) -> HttpResponse {
    log::error!("request task failed: {}", e);
    HttpResponse::InternalServerError().json(json!({
        "success": false,
        "error": "Internal error",
        "code": "INTERNAL",
        "timestamp": timestamp(),
    }))
}

/// Reads and mutations both take the workbook lock, so they run on the blocking pool
async fn read_sheet(query: web::Query<ReadQuery>, state: web::Data<AppState>) -> HttpResponse {
    let sheet = query.into_inner().sheet;
    match web::block(move || state.service.read(sheet.as_deref())).await {
        Ok(reply) => respond(reply),
        Err(e) => task_failed(e),
    }
}

async fn mutate_sheet(body: web::Bytes, state: web::Data<AppState>) -> HttpResponse {
    match web::block(move || state.service.mutate_json(&body)).await {
        Ok(reply) => respond(reply),
        Err(e) => task_failed(e),
    }
}

/// Health check endpoint
async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "message": "SheetBridge server is running",
        "timestamp": timestamp(),
    }))
}

/// Register the API routes
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(read_sheet))
        .route("/", web::post().to(mutate_sheet))
        .route("/exec", web::get().to(read_sheet))
        .route("/exec", web::post().to(mutate_sheet))
        .route("/health", web::get().to(health_check));
}

/// Open the configured workbook and serve it until shutdown
pub async fn run_server(config: Config) -> std::io::Result<()> {
    let workbook = open_workbook(&config).map_err(|e| std::io::Error::other(e.to_string()))?;
    let state = web::Data::new(AppState::new(Service::new(workbook, config.catalog())));
    let host = config.server.host.clone();
    let port = config.server.port;

    println!("📒 SheetBridge Server");
    println!("====================================");
    println!("📡 API: http://{}:{}/", host, port);
    println!("📑 Tables: {}", config.tables.join(", "));
    match &config.server.data_file {
        Some(path) => println!("💾 Data file: {}", path.display()),
        None => println!("💾 Data file: none (in-memory)"),
    }
    println!("🏥 Health check: http://{}:{}/health", host, port);
    println!("====================================");
    println!();

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::Logger::default())
            .wrap(
                actix_cors::Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .configure(routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
