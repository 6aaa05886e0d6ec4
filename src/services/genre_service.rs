use std::collections::HashMap;

use chrono::Utc;
use surrealdb::sql::Thing;
use surrealdb::{engine::any::Any, Surreal};

use crate::error::{Error, Result};
use crate::helpers::thing_helpers::{create_genre_thing, opt_thing_to_id, thing_to_id};
use crate::models::genre::{
    CreateGenreRequest, GenreRecord, GenreSongRecord, GenreSummary, GenreView, UpdateGenreRequest,
};
use crate::models::song::{SongRecord, SongView};
use crate::services::song_service::SongService;
use crate::validators::text_validator::ensure_text;

const MAX_GENRE_NAME_LEN: usize = 50;
const MAX_GENRE_DESCRIPTION_LEN: usize = 500;

pub struct GenreService;

impl GenreService {
    pub async fn create_genre(db: &Surreal<Any>, req: CreateGenreRequest) -> Result<GenreView> {
        let name = ensure_text("name", &req.name, MAX_GENRE_NAME_LEN)?;
        if let Some(description) = &req.description {
            ensure_text("description", description, MAX_GENRE_DESCRIPTION_LEN)?;
        }
        Self::ensure_name_available(db, &name, None).await?;

        let now = Utc::now();
        let created: Option<GenreRecord> = db
            .create("genre")
            .content(GenreRecord {
                id: None,
                name,
                description: req.description,
                created_at: now.into(),
                updated_at: now.into(),
            })
            .await?;

        created
            .map(GenreView::from)
            .ok_or_else(|| Error::DbError("Could not create genre".into()))
    }

    pub async fn find_all(db: &Surreal<Any>) -> Result<Vec<GenreView>> {
        let genres: Vec<GenreRecord> = db
            .query("SELECT * FROM genre ORDER BY name ASC")
            .await?
            .take(0)?;
        Ok(genres.into_iter().map(GenreView::from).collect())
    }

    pub async fn get_genre(db: &Surreal<Any>, genre_id: &str) -> Result<GenreRecord> {
        let genre: Option<GenreRecord> = db
            .query("SELECT * FROM $genre")
            .bind(("genre", create_genre_thing(genre_id)))
            .await?
            .take(0)?;
        genre.ok_or_else(|| Error::GenreNotFound {
            id: genre_id.to_string(),
        })
    }

    pub async fn update_genre(
        db: &Surreal<Any>,
        genre_id: &str,
        req: UpdateGenreRequest,
    ) -> Result<GenreView> {
        let mut genre = Self::get_genre(db, genre_id).await?;

        if let Some(name) = req.name {
            let name = ensure_text("name", &name, MAX_GENRE_NAME_LEN)?;
            Self::ensure_name_available(db, &name, genre.id.as_ref()).await?;
            genre.name = name;
        }
        if let Some(description) = req.description {
            ensure_text("description", &description, MAX_GENRE_DESCRIPTION_LEN)?;
            genre.description = Some(description);
        }

        let updated: Option<GenreRecord> = db
            .query(
                "UPDATE $genre SET name = $name, description = $description, updated_at = time::now() RETURN AFTER",
            )
            .bind(("genre", create_genre_thing(genre_id)))
            .bind(("name", genre.name))
            .bind(("description", genre.description))
            .await?
            .take(0)?;

        updated.map(GenreView::from).ok_or_else(|| Error::GenreNotFound {
            id: genre_id.to_string(),
        })
    }

    /// Deletes the genre together with its song links.
    pub async fn delete_genre(db: &Surreal<Any>, genre_id: &str) -> Result<()> {
        Self::get_genre(db, genre_id).await?;
        db.query("DELETE genre_song WHERE genre = $genre")
            .query("DELETE $genre")
            .bind(("genre", create_genre_thing(genre_id)))
            .await?
            .check()?;
        Ok(())
    }

    /// Public, unflagged songs tagged with the genre.
    pub async fn songs_of_genre(db: &Surreal<Any>, genre_id: &str) -> Result<Vec<SongView>> {
        Self::get_genre(db, genre_id).await?;
        let songs: Vec<SongRecord> = db
            .query(
                "SELECT * OMIT lyrics_embedding FROM song \
                 WHERE id IN (SELECT VALUE song FROM genre_song WHERE genre = $genre) \
                 AND visibility = 'PUBLIC' AND is_flagged = false \
                 ORDER BY upload_date DESC",
            )
            .bind(("genre", create_genre_thing(genre_id)))
            .await?
            .take(0)?;
        SongService::populate(db, songs).await
    }

    /// Genres of each song, keyed by bare song id.
    pub async fn genres_for_songs(
        db: &Surreal<Any>,
        songs: Vec<Thing>,
    ) -> Result<HashMap<String, Vec<GenreSummary>>> {
        if songs.is_empty() {
            return Ok(HashMap::new());
        }

        let links: Vec<GenreSongRecord> = db
            .query("SELECT * FROM genre_song WHERE song IN $songs ORDER BY created_at ASC")
            .bind(("songs", songs))
            .await?
            .take(0)?;
        if links.is_empty() {
            return Ok(HashMap::new());
        }

        let mut genre_ids: Vec<Thing> = links.iter().map(|l| l.genre.clone()).collect();
        genre_ids.sort_by_key(|t| t.to_string());
        genre_ids.dedup();

        let genres: Vec<GenreRecord> = db
            .query("SELECT * FROM genre WHERE id IN $ids")
            .bind(("ids", genre_ids))
            .await?
            .take(0)?;
        let by_id: HashMap<String, GenreSummary> = genres
            .iter()
            .map(|g| (opt_thing_to_id(&g.id), GenreSummary::from(g)))
            .collect();

        let mut result: HashMap<String, Vec<GenreSummary>> = HashMap::new();
        for link in links {
            if let Some(genre) = by_id.get(&thing_to_id(&link.genre)) {
                result
                    .entry(thing_to_id(&link.song))
                    .or_default()
                    .push(genre.clone());
            }
        }
        Ok(result)
    }

    /// Replaces the genre links of a song. Unknown genre ids are rejected
    /// before anything is written.
    pub async fn set_song_genres(
        db: &Surreal<Any>,
        song: &Thing,
        genre_ids: &[String],
    ) -> Result<()> {
        let mut genres = Vec::with_capacity(genre_ids.len());
        for genre_id in genre_ids {
            let genre = Self::get_genre(db, genre_id).await?;
            if let Some(id) = genre.id {
                if !genres.contains(&id) {
                    genres.push(id);
                }
            }
        }

        db.query("DELETE genre_song WHERE song = $song")
            .bind(("song", song.clone()))
            .await?
            .check()?;

        for genre in genres {
            let _: Option<GenreSongRecord> = db
                .create("genre_song")
                .content(GenreSongRecord {
                    id: None,
                    genre,
                    song: song.clone(),
                    created_at: Utc::now().into(),
                })
                .await?;
        }
        Ok(())
    }

    async fn ensure_name_available(
        db: &Surreal<Any>,
        name: &str,
        except: Option<&Thing>,
    ) -> Result<()> {
        let existing: Vec<GenreRecord> = db
            .query("SELECT * FROM genre WHERE string::lowercase(name) = string::lowercase($name)")
            .bind(("name", name.to_string()))
            .await?
            .take(0)?;

        if existing.iter().any(|g| g.id.as_ref() != except) {
            return Err(Error::Conflict {
                message: format!("Genre '{name}' already exists"),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::db_helpers::setup_test_db;
    use crate::helpers::song_helpers::insert_test_song;
    use crate::helpers::thing_helpers::create_song_thing;
    use crate::helpers::user_helpers::insert_test_user;
    use crate::models::song::Visibility;

    async fn genre(db: &Surreal<Any>, name: &str) -> String {
        GenreService::create_genre(
            db,
            CreateGenreRequest {
                name: name.to_string(),
                description: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_genre_crud_and_unique_name() {
        let db = setup_test_db().await;
        let rock = genre(&db, "Rock").await;

        let dup = GenreService::create_genre(
            &db,
            CreateGenreRequest {
                name: "rock".to_string(),
                description: None,
            },
        )
        .await;
        assert!(matches!(dup, Err(Error::Conflict { .. })));

        let updated = GenreService::update_genre(
            &db,
            &rock,
            UpdateGenreRequest {
                name: Some("Rock".to_string()),
                description: Some("Guitars".to_string()),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.description.as_deref(), Some("Guitars"));

        GenreService::delete_genre(&db, &rock).await.unwrap();
        assert!(GenreService::find_all(&db).await.unwrap().is_empty());
        assert!(matches!(
            GenreService::get_genre(&db, &rock).await,
            Err(Error::GenreNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_song_genre_links() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "tagger").await;
        let song = insert_test_song(&db, &owner, "Tagged", Visibility::Public).await;
        let hidden = insert_test_song(&db, &owner, "Hidden", Visibility::Private).await;
        let jazz = genre(&db, "Jazz").await;
        let blues = genre(&db, "Blues").await;

        let song_thing = create_song_thing(&song);
        GenreService::set_song_genres(&db, &song_thing, &[jazz.clone(), blues.clone(), jazz.clone()])
            .await
            .unwrap();
        GenreService::set_song_genres(&db, &create_song_thing(&hidden), &[jazz.clone()])
            .await
            .unwrap();

        let map = GenreService::genres_for_songs(&db, vec![song_thing.clone()]).await.unwrap();
        assert_eq!(map[&song].len(), 2);

        let jazz_songs = GenreService::songs_of_genre(&db, &jazz).await.unwrap();
        assert_eq!(jazz_songs.len(), 1);
        assert_eq!(jazz_songs[0].title, "Tagged");

        let unknown =
            GenreService::set_song_genres(&db, &song_thing, &["missing".to_string()]).await;
        assert!(matches!(unknown, Err(Error::GenreNotFound { .. })));
        let map = GenreService::genres_for_songs(&db, vec![song_thing]).await.unwrap();
        assert_eq!(map[&song].len(), 2);
    }
}
