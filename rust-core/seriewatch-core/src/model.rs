//! # Domain Model
//!
//! Platforms and the series they own, as stored in the `plataformas` table.
//! JSON field names are the ones clients and the store file use.

use crate::store::{Database, Record};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Table holding every [`Platform`]
pub const PLATFORMS_TABLE: &str = "plataformas";

/// Watch status given to a series when the client does not send one
pub const DEFAULT_STATUS: &str = "Não";

/// Read any scalar as text; stored files may hold `true` or numbers where
/// clients sent them
fn scalar_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

/// A watchable show entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    /// Identifier, unique within its platform
    #[serde(deserialize_with = "scalar_text")]
    pub id: String,
    /// Show title
    #[serde(rename = "nome_da_serie", deserialize_with = "scalar_text")]
    pub title: String,
    /// Free-form watch status ("Não" until changed)
    #[serde(rename = "assistiu", deserialize_with = "scalar_text")]
    pub status: String,
    /// Fields this service does not use, kept as stored
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Series {
    /// New series with a fresh identifier
    pub fn new(title: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            status: status.into(),
            extra: Map::new(),
        }
    }
}

/// A streaming service and the series tracked on it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Identifier, unique within the table
    #[serde(deserialize_with = "scalar_text")]
    pub id: String,
    /// Display name, e.g. "Netflix"
    #[serde(rename = "nome", deserialize_with = "scalar_text")]
    pub name: String,
    /// Owned series, in insertion order
    #[serde(default)]
    pub series: Vec<Series>,
    /// Fields this service does not use, kept as stored
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Platform {
    /// New platform with a fresh identifier and no series
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            series: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Series with the given id
    pub fn series_mut(&mut self, id: &str) -> Option<&mut Series> {
        self.series.iter_mut().find(|s| s.id == id)
    }
}

/// Fields of a [`Platform`] to overwrite; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformPatch {
    /// New name
    pub name: Option<String>,
    /// Replacement series list
    pub series: Option<Vec<Series>>,
}

impl From<Platform> for PlatformPatch {
    /// Rewrite every mutable field with the platform's values
    fn from(platform: Platform) -> Self {
        Self {
            name: Some(platform.name),
            series: Some(platform.series),
        }
    }
}

impl Record for Platform {
    type Patch = PlatformPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Option<String> {
        match name {
            "id" => Some(self.id.clone()),
            "nome" => Some(self.name.clone()),
            _ => None,
        }
    }

    fn merge(&mut self, patch: PlatformPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(series) = patch.series {
            self.series = series;
        }
    }
}

/// A series together with the platform it belongs to, as listed by
/// `GET /series`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesListing {
    /// Parent platform id
    #[serde(rename = "plataformaId")]
    pub platform_id: String,
    /// Parent platform name
    #[serde(rename = "plataformaNome")]
    pub platform_name: String,
    /// The series itself
    #[serde(flatten)]
    pub series: Series,
}

impl Database<Platform> {
    /// Set the status of a series found by platform name and series title
    ///
    /// Both names must match exactly. Returns `false` if either lookup fails.
    pub fn update_serie_status(&mut self, platform_name: &str, title: &str, status: &str) -> bool {
        let Some(platform_id) = self
            .select(PLATFORMS_TABLE, None)
            .into_iter()
            .find(|p| p.name == platform_name)
            .map(|p| p.id.clone())
        else {
            tracing::warn!(platform = platform_name, "Platform not found");
            return false;
        };

        let Some(series) = self
            .find_mut(PLATFORMS_TABLE, &platform_id)
            .and_then(|p| p.series.iter_mut().find(|s| s.title == title))
        else {
            tracing::warn!(platform = platform_name, title, "Series not found on platform");
            return false;
        };

        series.status = status.to_string();
        self.schedule_persist();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_json_shape() {
        let platform = Platform {
            id: "p1".to_string(),
            name: "Netflix".to_string(),
            series: vec![Series {
                id: "s1".to_string(),
                title: "Dark".to_string(),
                status: DEFAULT_STATUS.to_string(),
                extra: Map::new(),
            }],
            extra: Map::new(),
        };
        let value = serde_json::to_value(&platform).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "p1",
                "nome": "Netflix",
                "series": [{"id": "s1", "nome_da_serie": "Dark", "assistiu": "Não"}]
            })
        );
    }

    #[test]
    fn test_listing_flattens_series() {
        let listing = SeriesListing {
            platform_id: "p1".to_string(),
            platform_name: "Netflix".to_string(),
            series: Series {
                id: "s1".to_string(),
                title: "Dark".to_string(),
                status: "Sim".to_string(),
                extra: Map::new(),
            },
        };
        let value = serde_json::to_value(&listing).unwrap();
        assert_eq!(value["plataformaNome"], "Netflix");
        assert_eq!(value["nome_da_serie"], "Dark");
        assert_eq!(value["assistiu"], "Sim");
        assert_eq!(value["id"], "s1");
    }

    #[test]
    fn test_new_ids_are_distinct() {
        assert_ne!(Platform::new("Netflix").id, Platform::new("Netflix").id);
        assert_ne!(Series::new("Dark", "Não").id, Series::new("Dark", "Não").id);
    }

    #[test]
    fn test_patch_from_platform_replaces_series() {
        let mut stored = Platform::new("Netflix");
        let mut edited = stored.clone();
        edited.series.push(Series::new("Dark", DEFAULT_STATUS));

        stored.merge(edited.clone().into());
        assert_eq!(stored, edited);
    }

    #[test]
    fn test_default_patch_changes_nothing() {
        let mut platform = Platform::new("Netflix");
        let before = platform.clone();
        platform.merge(PlatformPatch::default());
        assert_eq!(platform, before);
    }

    #[test]
    fn test_search_fields() {
        let platform = Platform::new("Prime Video");
        assert_eq!(platform.field("nome").as_deref(), Some("Prime Video"));
        assert_eq!(platform.field("id").as_deref(), Some(platform.id.as_str()));
        assert_eq!(platform.field("series"), None);
    }

    #[test]
    fn test_update_serie_status_by_names() {
        let mut db = Database::in_memory();
        let mut platform = Platform::new("Netflix");
        platform.series.push(Series::new("Dark", DEFAULT_STATUS));
        db.insert(PLATFORMS_TABLE, platform);

        assert!(db.update_serie_status("Netflix", "Dark", "Sim"));
        assert_eq!(db.select(PLATFORMS_TABLE, None)[0].series[0].status, "Sim");

        assert!(!db.update_serie_status("Netflix", "Ozark", "Sim"));
        assert!(!db.update_serie_status("Netfl", "Dark", "Sim"));
        assert!(!db.update_serie_status("Hulu", "Dark", "Sim"));
    }

    #[tokio::test]
    async fn test_open_keeps_loose_values_and_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        std::fs::write(
            &path,
            r#"{"plataformas":[{"id":"p1","nome":"Netflix","pais":"BR","series":[
                {"id":"s1","nome_da_serie":"Dark","assistiu":true,"nota":9},
                {"id":"s2","nome_da_serie":1984,"assistiu":"Não"}
            ]}]}"#,
        )
        .unwrap();

        let db: Database<Platform> = Database::open(&path).await;
        let platforms = db.select(PLATFORMS_TABLE, None);
        assert_eq!(platforms.len(), 1);
        let series = &platforms[0].series;
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].status, "true");
        assert_eq!(series[1].title, "1984");
        assert!(!dir.path().join("db.json.bak").exists());

        db.persist().await.unwrap();
        let saved: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved["plataformas"][0]["pais"], "BR");
        assert_eq!(saved["plataformas"][0]["series"][0]["nota"], 9);
        assert_eq!(saved["plataformas"][0]["series"][1]["nome_da_serie"], "1984");
    }
}
