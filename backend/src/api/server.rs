//! HTTP server for tablecrop.
//!
//! # API Endpoints
//!
//! | Method | Path        | Description                                  |
//! |--------|-------------|----------------------------------------------|
//! | GET    | `/health`   | Health check                                 |
//! | GET    | `/info`     | Service description and accepted options     |
//! | POST   | `/convert`  | Upload a file, receive the table as CSV      |
//! |        |             | (zip of CSVs with `all_sheets=true`)         |
//! | GET    | `/api/logs` | SSE stream for real-time logs                |

use axum::{
    extract::{DefaultBodyLimit, Multipart},
    http::{header, HeaderName, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use super::logs::{log_error, log_info, log_success, LOG_BROADCASTER};
use super::types::{ConvertOverrides, ConvertResponse, HealthResponse, InfoResponse};
use crate::error::{ConvertResult, ServerError, ServerResult};
use crate::extract::pipeline::{convert_bytes, ConvertOptions, ConvertOutput};
use crate::extract::sheets::{convert_all_sheets, output_stem, zip_sheets};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

const X_JOB_ID: HeaderName = HeaderName::from_static("x-job-id");
const X_PROCESSED_ROWS: HeaderName = HeaderName::from_static("x-processed-rows");

/// Build the application router.
pub fn router() -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION, X_JOB_ID, X_PROCESSED_ROWS]);

    Router::new()
        .route("/", get(info))
        .route("/health", get(health))
        .route("/info", get(info))
        .route("/convert", post(convert))
        .route("/api/logs", get(sse_logs))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
}

/// Start the HTTP server
pub async fn start_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    log_success(format!("tablecrop server running on http://localhost:{}", port));
    log_info("   POST /convert  - Upload a file, receive CSV");
    log_info("   GET  /info     - Service description");
    log_info("   GET  /api/logs - SSE log stream");
    log_info("   GET  /health   - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router()).await?;

    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn info() -> Json<InfoResponse> {
    Json(InfoResponse::describe())
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Parts of a `POST /convert` request.
struct ConvertUpload {
    file_name: Option<String>,
    bytes: Vec<u8>,
    options: ConvertOptions,
    all_sheets: bool,
}

async fn read_upload(mut multipart: Multipart) -> ServerResult<ConvertUpload> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut config: Option<ConvertOptions> = None;
    let mut overrides = ConvertOverrides::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                file_data = Some(data.to_vec());
            }
            "config" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                if !text.trim().is_empty() {
                    let parsed = serde_json::from_str(&text)
                        .map_err(|e| ServerError::BadRequest(format!("Invalid config: {}", e)))?;
                    config = Some(parsed);
                }
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Read error: {}", e)))?;
                overrides.set(&name, value);
            }
        }
    }

    let bytes = file_data.ok_or_else(|| ServerError::BadRequest("No file provided".to_string()))?;
    let options = overrides.apply(config.unwrap_or_default())?;
    let all_sheets = overrides.all_sheets()?;

    Ok(ConvertUpload {
        file_name,
        bytes,
        options,
        all_sheets,
    })
}

async fn convert(multipart: Multipart) -> ServerResult<Response> {
    let upload = read_upload(multipart).await?;
    let job_id = Uuid::new_v4().to_string();

    log_info(format!(
        "New upload: {} ({} bytes), job {}",
        upload.file_name.as_deref().unwrap_or("unnamed"),
        upload.bytes.len(),
        job_id
    ));

    let download = tokio::task::spawn_blocking(move || prepare_download(upload))
        .await
        .map_err(|e| ServerError::Internal(format!("Conversion task failed: {}", e)))??;

    let headers = [
        (header::CONTENT_TYPE, download.content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download.file_name),
        ),
        (X_JOB_ID, job_id),
        (X_PROCESSED_ROWS, download.rows.to_string()),
    ];
    Ok((headers, download.body).into_response())
}

/// Response body of a conversion.
struct Download {
    file_name: String,
    content_type: &'static str,
    body: Vec<u8>,
    rows: usize,
}

impl Download {
    /// `<stem>_table.csv`
    fn table(stem: &str, output: ConvertOutput) -> Self {
        Self {
            file_name: format!("{}_table.csv", stem),
            content_type: "text/csv; charset=utf-8",
            rows: output.summary.rows_written,
            body: output.csv,
        }
    }
}

/// Run the conversion. With `all_sheets`, several converted sheets are
/// returned as `<stem>_sheets.zip`; a single one stays plain CSV.
fn prepare_download(upload: ConvertUpload) -> ConvertResult<Download> {
    let ConvertUpload {
        file_name,
        bytes,
        options,
        all_sheets,
    } = upload;
    let stem = output_stem(file_name.as_deref());

    if !all_sheets {
        let output = convert_bytes(file_name.as_deref(), &bytes, &options)?;
        return Ok(Download::table(&stem, output));
    }

    let mut conversions = convert_all_sheets(file_name.as_deref(), &bytes, &options)?;
    if conversions.len() == 1 {
        let conversion = conversions.remove(0);
        return Ok(Download::table(&stem, conversion.output));
    }

    log_info(format!("Packaging {} sheets", conversions.len()));
    Ok(Download {
        file_name: format!("{}_sheets.zip", stem),
        content_type: "application/zip",
        rows: conversions.iter().map(|c| c.output.summary.rows_written).sum(),
        body: zip_sheets(&conversions, &stem)?,
    })
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::Convert(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, "Conversion failed"),
            ServerError::Convert(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Conversion failed"),
            ServerError::BadRequest(_) => (StatusCode::BAD_REQUEST, "Invalid request"),
            ServerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };
        let error = match &self {
            ServerError::Convert(e) => e.to_string(),
            ServerError::BadRequest(e) | ServerError::Internal(e) => e.clone(),
        };
        log_error(format!("{}: {}", message, error));
        (status, Json(ConvertResponse::failure(message, error))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConvertError, ExtractError, GridError};
    use crate::parser::fixtures::xlsx;

    fn upload(file_name: &str, bytes: Vec<u8>, all_sheets: bool) -> ConvertUpload {
        ConvertUpload {
            file_name: Some(file_name.to_string()),
            bytes,
            options: ConvertOptions::default(),
            all_sheets,
        }
    }

    fn two_sheet_book() -> Vec<u8> {
        xlsx(&[
            ("Cars", vec![vec!["Make", "Model"], vec!["Ford", "Focus"]]),
            ("Vans", vec![vec!["Make", "Model"], vec!["Ford", "Transit"], vec!["Fiat", "Ducato"]]),
        ])
    }

    #[test]
    fn test_single_table_download() {
        let download = prepare_download(upload("data/export 2024.csv", b"a,b\n1,2\n".to_vec(), false)).unwrap();

        assert_eq!(download.file_name, "export 2024_table.csv");
        assert_eq!(download.content_type, "text/csv; charset=utf-8");
        assert_eq!(download.rows, 2);
        assert_eq!(download.body, b"a,b\n1,2\n");
    }

    #[test]
    fn test_all_sheets_download_is_a_zip() {
        let download = prepare_download(upload("fleet.xlsx", two_sheet_book(), true)).unwrap();

        assert_eq!(download.file_name, "fleet_sheets.zip");
        assert_eq!(download.content_type, "application/zip");
        assert_eq!(download.rows, 5);

        let zip = zip::ZipArchive::new(std::io::Cursor::new(download.body)).unwrap();
        let mut names: Vec<&str> = zip.file_names().collect();
        names.sort();
        assert_eq!(names, ["fleet_sheet_1_Cars.csv", "fleet_sheet_2_Vans.csv"]);
    }

    #[test]
    fn test_all_sheets_with_one_sheet_stays_csv() {
        let download = prepare_download(upload("list.csv", b"a,b\n".to_vec(), true)).unwrap();
        assert_eq!(download.file_name, "list_table.csv");
        assert_eq!(download.content_type, "text/csv; charset=utf-8");
    }

    #[test]
    fn test_unnamed_upload() {
        let mut upload = upload("", b"a\n".to_vec(), false);
        upload.file_name = None;
        assert_eq!(prepare_download(upload).unwrap().file_name, "converted_table.csv");
    }

    #[test]
    fn test_client_errors_map_to_bad_request() {
        let missing = ServerError::Convert(ConvertError::Extract(ExtractError::MissingHeaders));
        assert_eq!(missing.into_response().status(), StatusCode::BAD_REQUEST);

        let unsupported = ServerError::Convert(ConvertError::Grid(GridError::UnsupportedFormat("pptx".into())));
        assert_eq!(unsupported.into_response().status(), StatusCode::BAD_REQUEST);

        let no_file = ServerError::BadRequest("No file provided".into());
        assert_eq!(no_file.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_other_errors_map_to_internal() {
        let io = ServerError::Convert(ConvertError::Io(std::io::Error::other("disk full")));
        assert_eq!(io.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        let internal = ServerError::Internal("panic".into());
        assert_eq!(internal.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
