//! # Series Handlers
//!
//! The five series operations on top of the record store. Each operation
//! takes the already-parsed request body or path parameter and returns a
//! domain result; turning that into an HTTP response happens in [`crate::api`].
//!
//! Every operation holds the store lock for its whole read-modify-write, so
//! two concurrent "add" calls for the same new platform cannot both create it.

use crate::error::{Error, Result};
use crate::model::{
    Platform, PlatformPatch, Series, SeriesListing, DEFAULT_STATUS, PLATFORMS_TABLE,
};
use crate::store::{Database, Flush};
use crate::validation::{FieldReader, ValidationErrors};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

const INVALID_DATA: &str = "Dados inválidos";
const MISSING_IDS: &str = "IDs de plataforma ou série não especificados";
const MISSING_PLATFORM: &str = "Plataforma não especificada";
const UPDATE_NOT_FOUND: &str = "Série ou plataforma não encontrada";
const DELETE_NOT_FOUND: &str = "Plataforma ou série não encontrada";
const PLATFORM_EMPTY: &str = "Nenhuma série encontrada para a plataforma especificada";
const NOTHING_FOUND: &str = "Nenhuma série encontrada";

/// Shared handle to the platform store
pub type SharedDatabase = Arc<RwLock<Database<Platform>>>;

/// Series operations over a shared store
#[derive(Debug, Clone)]
pub struct SeriesService {
    db: SharedDatabase,
}

impl SeriesService {
    /// Wrap a store
    #[must_use]
    pub fn new(db: Database<Platform>) -> Self {
        Self {
            db: Arc::new(RwLock::new(db)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Database<Platform>> {
        self.db.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Database<Platform>> {
        self.db.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a full write of the store; await the handle to confirm it
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the store cannot be serialized.
    pub fn flush(&self) -> Result<Flush> {
        self.read().flush()
    }

    /// Add a series to a platform, creating the platform on first use
    ///
    /// Body fields: `plataformaNome`, `nome_da_serie`, optional `assistiu`.
    /// The platform is found with the store's substring search on `nome`, so
    /// the first platform whose name contains the given one is used.
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` when a required field is missing.
    pub fn add_series(&self, body: Option<&Value>) -> Result<Series> {
        let mut reader = FieldReader::new(body);
        let platform_name = reader.required("plataformaNome");
        let title = reader.required("nome_da_serie");
        let status = reader.optional("assistiu");
        reader
            .finish()
            .map_err(|errors| Error::invalid_input(INVALID_DATA, errors))?;
        let (Some(platform_name), Some(title)) = (platform_name, title) else {
            return Err(Error::invalid_input(INVALID_DATA, ValidationErrors::new()));
        };
        let platform_name = &*platform_name;

        let mut db = self.write();

        let existing = db
            .select(PLATFORMS_TABLE, Some(&[("nome", platform_name)]))
            .first()
            .map(|p| (*p).clone());
        let mut platform = match existing {
            Some(platform) => platform,
            None => {
                info!(platform = platform_name, "Creating platform");
                db.insert(PLATFORMS_TABLE, Platform::new(platform_name))
            }
        };

        let series = Series::new(title, status.as_deref().unwrap_or(DEFAULT_STATUS));
        platform.series.push(series.clone());

        let id = platform.id.clone();
        db.update(PLATFORMS_TABLE, &id, PlatformPatch::from(platform));

        debug!(platform_id = %id, series_id = %series.id, "Series added");
        Ok(series)
    }

    /// Overwrite the watch status of one series
    ///
    /// Body fields: `plataformaId`, `serieId`, `assistiu`. Only the first
    /// platform with the given id is searched.
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` when a field is missing, `Error::NotFound` when
    /// the platform or the series does not exist.
    pub fn update_status(&self, body: Option<&Value>) -> Result<()> {
        let mut reader = FieldReader::new(body);
        let platform_id = reader.required("plataformaId");
        let series_id = reader.required("serieId");
        let status = reader.required("assistiu");
        reader
            .finish()
            .map_err(|errors| Error::invalid_input(INVALID_DATA, errors))?;
        let (Some(platform_id), Some(series_id), Some(status)) = (platform_id, series_id, status)
        else {
            return Err(Error::invalid_input(INVALID_DATA, ValidationErrors::new()));
        };
        let (platform_id, series_id, status) = (&*platform_id, &*series_id, &*status);

        let mut db = self.write();

        let mut platform =
            find_platform(&db, platform_id).ok_or_else(|| Error::not_found(UPDATE_NOT_FOUND))?;
        let series = platform
            .series_mut(series_id)
            .ok_or_else(|| Error::not_found(UPDATE_NOT_FOUND))?;
        series.status = status.to_string();

        db.update(PLATFORMS_TABLE, platform_id, PlatformPatch::from(platform));
        debug!(platform_id, series_id, status, "Series status updated");
        Ok(())
    }

    /// Remove one series from its platform
    ///
    /// Body fields: `plataformaId`, `serieId`.
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` when a field is missing, `Error::NotFound` when
    /// the platform or the series does not exist.
    pub fn delete_series(&self, body: Option<&Value>) -> Result<()> {
        let mut reader = FieldReader::new(body);
        let platform_id = reader.required("plataformaId");
        let series_id = reader.required("serieId");
        reader
            .finish()
            .map_err(|errors| Error::invalid_input(MISSING_IDS, errors))?;
        let (Some(platform_id), Some(series_id)) = (platform_id, series_id) else {
            return Err(Error::invalid_input(MISSING_IDS, ValidationErrors::new()));
        };
        let (platform_id, series_id) = (&*platform_id, &*series_id);

        let mut db = self.write();

        let mut platform =
            find_platform(&db, platform_id).ok_or_else(|| Error::not_found(DELETE_NOT_FOUND))?;
        let index = platform
            .series
            .iter()
            .position(|s| s.id == series_id)
            .ok_or_else(|| Error::not_found(DELETE_NOT_FOUND))?;
        platform.series.remove(index);

        db.update(PLATFORMS_TABLE, platform_id, PlatformPatch::from(platform));
        debug!(platform_id, series_id, "Series removed");
        Ok(())
    }

    /// Series of one platform
    ///
    /// The platform is looked up with the store's substring search on `id`.
    /// A missing platform and a platform without series are both reported
    /// as not found.
    ///
    /// # Errors
    ///
    /// `Error::InvalidInput` when no id is given, `Error::NotFound` when
    /// there is nothing to list.
    pub fn series_for_platform(&self, platform_id: Option<&str>) -> Result<Vec<Series>> {
        let platform_id = platform_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                let mut errors = ValidationErrors::new();
                errors.add_required("plataformaId");
                Error::invalid_input(MISSING_PLATFORM, errors)
            })?;

        let db = self.read();
        let series = db
            .select(PLATFORMS_TABLE, Some(&[("id", platform_id)]))
            .first()
            .filter(|p| !p.series.is_empty())
            .map(|p| p.series.clone());
        series.ok_or_else(|| Error::not_found(PLATFORM_EMPTY))
    }

    /// Every series of every platform, tagged with its platform
    ///
    /// # Errors
    ///
    /// `Error::NotFound` when no platform has any series.
    pub fn all_series(&self) -> Result<Vec<SeriesListing>> {
        let db = self.read();
        let listings: Vec<SeriesListing> = db
            .select(PLATFORMS_TABLE, None)
            .into_iter()
            .flat_map(|platform| {
                platform.series.iter().map(|series| SeriesListing {
                    platform_id: platform.id.clone(),
                    platform_name: platform.name.clone(),
                    series: series.clone(),
                })
            })
            .collect();

        if listings.is_empty() {
            Err(Error::not_found(NOTHING_FOUND))
        } else {
            Ok(listings)
        }
    }
}

fn find_platform(db: &Database<Platform>, id: &str) -> Option<Platform> {
    db.select(PLATFORMS_TABLE, None)
        .into_iter()
        .find(|p| p.id == id)
        .cloned()
}
