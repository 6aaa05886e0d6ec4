use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

use crate::helpers::thing_helpers::opt_thing_to_id;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenreRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

/// Join row linking a song to one of its genres.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GenreSongRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub genre: Thing,
    pub song: Thing,
    pub created_at: Datetime,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenreSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenreView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

impl From<GenreRecord> for GenreView {
    fn from(genre: GenreRecord) -> Self {
        Self {
            id: opt_thing_to_id(&genre.id),
            name: genre.name,
            description: genre.description,
            created_at: genre.created_at,
            updated_at: genre.updated_at,
        }
    }
}

impl From<&GenreRecord> for GenreSummary {
    fn from(genre: &GenreRecord) -> Self {
        Self {
            id: opt_thing_to_id(&genre.id),
            name: genre.name.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateGenreRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateGenreRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}
