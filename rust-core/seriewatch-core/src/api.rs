//! # Series Routes
//!
//! Binds the [`SeriesService`] operations to HTTP routes. Routes are tried in
//! registration order, so `GET /series/:plataformaId` is checked before
//! `GET /series`.

use crate::error::Result;
use crate::json::to_json;
use crate::router::Method;
use crate::series::SeriesService;
use crate::server::{sync_handler, ApiResponse, Server};
use std::sync::Arc;

const ADDED: &str = "Série adicionada com sucesso";
const UPDATED: &str = "Status da série atualizado com sucesso";
const REMOVED: &str = "Série removida com sucesso";

/// Register the five series routes on `server`
///
/// # Errors
///
/// Returns `Error::InvalidRoutePattern` if a route pattern fails to compile.
pub fn register_routes(server: &mut Server, service: Arc<SeriesService>) -> Result<()> {
    let svc = service.clone();
    server.add_route(
        Method::Post,
        "/series/add",
        sync_handler(move |req, _| {
            svc.add_series(req.json())?;
            Ok(ApiResponse::text(ADDED).with_status(201))
        }),
    )?;

    let svc = service.clone();
    server.add_route(
        Method::Put,
        "/series/update",
        sync_handler(move |req, _| {
            svc.update_status(req.json())?;
            Ok(ApiResponse::text(UPDATED))
        }),
    )?;

    let svc = service.clone();
    server.add_route(
        Method::Delete,
        "/series/delete",
        sync_handler(move |req, _| {
            svc.delete_series(req.json())?;
            Ok(ApiResponse::text(REMOVED))
        }),
    )?;

    let svc = service.clone();
    server.add_route(
        Method::Get,
        "/series/:plataformaId",
        sync_handler(move |_, matched| {
            let series = svc.series_for_platform(matched.param("plataformaId"))?;
            Ok(ApiResponse::json(to_json(&series)?))
        }),
    )?;

    server.add_route(
        Method::Get,
        "/series",
        sync_handler(move |_, _| {
            let listings = service.all_series()?;
            Ok(ApiResponse::json(to_json(&listings)?))
        }),
    )?;

    Ok(())
}
