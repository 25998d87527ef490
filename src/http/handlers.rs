//! Request dispatch and route handlers.
//!
//! # Responsibilities
//! - Gate methods (GET/POST only) before any routing happens
//! - Run the handler the route table picks
//! - Turn every handler outcome into exactly one response, or into a
//!   connection error when the socket is no longer usable
//!
//! Returns the route label and the status that was sent, or `None` when nothing
//! was sent.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::http::pages;
use crate::http::reader::read_body_to;
use crate::http::request::Request;
use crate::http::response::{Response, ICON};
use crate::http::server::{AppContext, ConnectionError};
use crate::http::status::StatusLine;
use crate::routing::Route;
use crate::storage::{self, decode_form_path};
use crate::transfer::{download, DownloadOutcome, UploadEngine};

/// Handle one parsed request.
pub async fn dispatch<S>(
    stream: &mut S,
    request: Request,
    ctx: &AppContext,
) -> Result<(&'static str, Option<StatusLine>), ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let idle = ctx.config().timeouts.idle();

    if !request.method.is_allowed() {
        tracing::info!(method = %request.method, path = %request.path, "Method not allowed");
        let response = Response::html(StatusLine::Forbidden, pages::FORBIDDEN);
        response.send(stream, idle).await?;
        return Ok(("forbidden", Some(response.status())));
    }

    let route = ctx.routes().resolve(&request.method, &request.path);
    tracing::debug!(route = route.name(), "Dispatching");

    let response = match route {
        Route::Index => Response::html(StatusLine::Ok, pages::index()),
        Route::Favicon => favicon(ctx).await?,
        Route::Signup => Response::html(StatusLine::Ok, pages::signup()),
        Route::Register => register(stream, request, ctx).await?,
        Route::Signin => Response::html(StatusLine::Ok, pages::not_available("Sign in")),
        Route::Logout => Response::html(StatusLine::Ok, pages::not_available("Log out")),
        Route::List => list(ctx).await,
        Route::Download => {
            let status = download_file(stream, request, ctx).await?;
            return Ok((route.name(), status));
        }
        Route::Upload => upload(stream, request, ctx).await?,
        Route::NotFound => {
            tracing::info!(method = %request.method, path = %request.path, "No route matched");
            Response::html(StatusLine::NotFound, pages::not_found(&request.path))
        }
    };

    response.send(stream, idle).await?;
    Ok((route.name(), Some(response.status())))
}

/// Complete a url-encoded form body up to Content-Length, capped at `max_form_bytes`.
async fn read_form<S>(
    stream: &mut S,
    request: &mut Request,
    ctx: &AppContext,
) -> Result<(), ConnectionError>
where
    S: AsyncRead + Unpin,
{
    let limit = ctx.config().limits.max_form_bytes;
    let declared = request
        .content_length()
        .map_or(request.body.len(), |len| usize::try_from(len).unwrap_or(usize::MAX));
    if declared > limit {
        tracing::debug!(declared, limit, "Form body truncated");
    }

    let target = declared.min(limit);
    read_body_to(stream, &mut request.body, target, ctx.config().timeouts.idle()).await?;
    request.body.truncate(target);
    Ok(())
}

async fn favicon(ctx: &AppContext) -> Result<Response, ConnectionError> {
    match storage::read(ctx.storage().favicon_path()).await? {
        Some(icon) => Ok(Response::binary(StatusLine::Ok, ICON, icon)),
        None => {
            tracing::debug!(path = ?ctx.storage().favicon_path(), "Favicon missing");
            Ok(Response::html(StatusLine::NotFound, pages::not_found("/favicon.ico")))
        }
    }
}

/// Registration is not implemented: any non-empty form "succeeds".
async fn register<S>(
    stream: &mut S,
    mut request: Request,
    ctx: &AppContext,
) -> Result<Response, ConnectionError>
where
    S: AsyncRead + Unpin,
{
    read_form(stream, &mut request, ctx).await?;
    if request.form().is_empty() {
        tracing::warn!("Register called without form data");
        return Ok(Response::html(StatusLine::Ok, pages::register_failed()));
    }
    Ok(Response::html(StatusLine::Ok, pages::register_succeeded(ctx.public_url())))
}

async fn list(ctx: &AppContext) -> Response {
    let entries = match ctx.storage().list_user_entries().await {
        Ok(entries) => entries,
        Err(err) => {
            tracing::error!(error = %err, "Listing user directory failed");
            Vec::new()
        }
    };
    Response::html(StatusLine::Ok, pages::listing(&entries))
}

async fn download_file<S>(
    stream: &mut S,
    mut request: Request,
    ctx: &AppContext,
) -> Result<Option<StatusLine>, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let idle = ctx.config().timeouts.idle();
    read_form(stream, &mut request, ctx).await?;

    let requested = request.form().get("FilePath").map(|value| decode_form_path(value));
    let path = match requested.as_deref().map(|name| ctx.storage().user_path(name)) {
        Some(Ok(path)) => path,
        Some(Err(err)) => {
            tracing::info!(error = %err, "Download path rejected");
            return not_found_download(stream, idle).await;
        }
        None => {
            tracing::info!("Download without FilePath");
            return not_found_download(stream, idle).await;
        }
    };

    match download(stream, &path, ctx.config().limits.chunk_size, idle).await? {
        DownloadOutcome::Sent { bytes } => {
            tracing::info!(path = ?path, bytes, "Download completed");
            Ok(Some(StatusLine::Ok))
        }
        DownloadOutcome::Empty => Ok(None),
        DownloadOutcome::NotFound => {
            tracing::info!(path = ?path, "Download file not found");
            not_found_download(stream, idle).await
        }
    }
}

async fn not_found_download<S>(
    stream: &mut S,
    idle: Option<std::time::Duration>,
) -> Result<Option<StatusLine>, ConnectionError>
where
    S: AsyncWrite + Unpin,
{
    let response = Response::html(StatusLine::NotFound, pages::download_not_found());
    response.send(stream, idle).await?;
    Ok(Some(response.status()))
}

async fn upload<S>(
    stream: &mut S,
    request: Request,
    ctx: &AppContext,
) -> Result<Response, ConnectionError>
where
    S: AsyncRead + Unpin,
{
    let engine = UploadEngine::new(
        ctx.storage(),
        &ctx.config().limits,
        ctx.config().timeouts.idle(),
    );
    match engine.receive(stream, request).await {
        Ok(report) => {
            tracing::info!(
                filename = %report.filename,
                written = report.written,
                resumed_from = report.resumed_from,
                file_size = report.file_size,
                "Upload completed"
            );
            Ok(Response::html(StatusLine::Ok, pages::upload_completed(&ctx.list_url())))
        }
        Err(err) if err.is_transport() => Err(ConnectionError::Upload(err)),
        Err(err) => {
            tracing::info!(reason = %err, "Upload rejected");
            Ok(Response::html(StatusLine::Conflict, pages::upload_rejected(&err.to_string())))
        }
    }
}
