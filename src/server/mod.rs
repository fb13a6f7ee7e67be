//! Upload-and-view HTTP surface.
//!
//! `POST /upload_file` runs the full pipeline on an uploaded CSV and answers
//! with the rendered map; `POST /view_existing_files` re-serves a report
//! generated earlier from the same name parameters.

pub mod forms;
pub mod pages;

use crate::adapters::storage::LocalStorage;
use crate::config::{ReportConfig, ServerConfig};
use crate::core::render::MapRenderer;
use crate::core::{Geocoder, RunParameters, Storage};
use crate::utils::error::{EtlError, Result};
use crate::{BubbleMapPipeline, EtlEngine};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use forms::{parse_form, view_key_from_fields, UploadForm};

/// Everything a request handler needs; built once at startup.
pub struct AppState<G> {
    pub server: ServerConfig,
    pub storage: LocalStorage,
    pub renderer: MapRenderer,
    pub location_column: String,
    pub geocoder: G,
}

impl<G: Geocoder + Clone> AppState<G> {
    pub fn new(config: &ReportConfig, geocoder: G) -> Self {
        Self {
            server: config.server.clone(),
            storage: LocalStorage::new(&config.server.upload_dir),
            renderer: config.map.renderer(),
            location_column: config.input.location_column.clone(),
            geocoder,
        }
    }

    fn prefixes(&self) -> Vec<String> {
        self.renderer.centers().prefixes().map(str::to_string).collect()
    }
}

fn respond(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

fn text(status: StatusCode, body: impl Into<String>) -> Response<Full<Bytes>> {
    respond(status, "text/plain; charset=utf-8", body.into())
}

fn html(body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    respond(StatusCode::OK, "text/html; charset=utf-8", body)
}

fn error_response(e: &EtlError) -> Response<Full<Bytes>> {
    match e {
        EtlError::NotFoundError { .. } => text(StatusCode::NOT_FOUND, "File not found"),
        EtlError::CsvError(_) | EtlError::InputDecodeError { .. } => text(
            StatusCode::BAD_REQUEST,
            format!("Error decoding file: {}", e.user_friendly_message()),
        ),
        e if e.is_client_error() => text(StatusCode::BAD_REQUEST, e.user_friendly_message()),
        e => {
            error!(error = %e, "request_failed");
            text(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

async fn read_body<B>(body: B, limit: usize) -> std::result::Result<Bytes, Response<Full<Bytes>>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(text(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Upload exceeds {} bytes", limit),
        )),
        Err(e) => {
            warn!(error = %e, "request_body_error");
            Err(text(StatusCode::BAD_REQUEST, "Could not read request body"))
        }
    }
}

async fn upload_file<G: Geocoder + Clone>(
    state: &AppState<G>,
    query: &str,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    let fields = parse_form(query.as_bytes());
    let form = UploadForm::from_fields(&fields, &state.server.allowed_extensions)?;

    state.storage.write_file(&form.file_name, &body).await?;
    info!(file = %form.file_name, bytes = body.len(), "upload_saved");

    let params = RunParameters {
        input: form.file_name.clone(),
        output_csv: form.key.csv_name(),
        output_html: form.key.html_name(),
        prefix: form.key.prefix.clone(),
        month: form.key.month.clone(),
        year: form.key.year.clone(),
        min_count: form.min_count,
    };

    let pipeline = BubbleMapPipeline::new(state.storage.clone(), state.geocoder.clone(), params)
        .with_renderer(state.renderer.clone())
        .with_location_column(state.location_column.clone());
    let paths = EtlEngine::new(pipeline).run().await?;

    let report = state.storage.read_file(&paths.html).await?;
    Ok(html(report))
}

async fn view_existing_files<G>(state: &AppState<G>, body: Bytes) -> Result<Response<Full<Bytes>>> {
    let fields = parse_form(&body);
    let key = view_key_from_fields(&fields)?;

    let report = state.storage.read_file(&key.html_name()).await?;
    info!(report = %key.html_name(), "report_viewed");
    Ok(html(report))
}

/// Routes one request. Generic over the body so tests can drive it directly.
pub async fn handle_request<B, G>(
    req: Request<B>,
    state: Arc<AppState<G>>,
) -> std::result::Result<Response<Full<Bytes>>, Infallible>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    G: Geocoder + Clone,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().unwrap_or_default().to_string();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/") => html(pages::index_page(&state.prefixes(), &pages::selectable_years())),
        (&Method::GET, "/health") => text(StatusCode::OK, "ok"),
        (&Method::POST, "/upload_file") => {
            match read_body(req.into_body(), state.server.max_upload_bytes).await {
                Ok(body) => upload_file(&state, &query, body)
                    .await
                    .unwrap_or_else(|e| error_response(&e)),
                Err(response) => response,
            }
        }
        (&Method::POST, "/view_existing_files") => {
            match read_body(req.into_body(), state.server.max_upload_bytes).await {
                Ok(body) => view_existing_files(&state, body)
                    .await
                    .unwrap_or_else(|e| error_response(&e)),
                Err(response) => response,
            }
        }
        _ => text(StatusCode::NOT_FOUND, "Not Found"),
    };

    info!(method = %method, path = %path, status = response.status().as_u16(), "request");
    Ok(response)
}

/// Accepts connections until `shutdown` flips to `true`.
pub async fn serve<G>(
    listener: TcpListener,
    state: Arc<AppState<G>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    G: Geocoder + Clone + 'static,
{
    info!(addr = %listener.local_addr()?, upload_dir = %state.server.upload_dir, "report_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let state = state.clone();

                        tokio::spawn(async move {
                            let service = service_fn(move |req| {
                                let state = state.clone();
                                async move { handle_request(req, state).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, service)
                                .await
                            {
                                error!(error = %e, "report_server_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "report_server_accept_error");
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("report_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

/// Creates the upload directory before the first request arrives.
pub fn prepare_upload_dir(config: &ServerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.upload_dir).map_err(EtlError::IoError)
}
