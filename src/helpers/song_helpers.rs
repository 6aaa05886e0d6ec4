use crate::error::{Error, Result};
use crate::helpers::thing_helpers::create_song_thing;
use crate::models::song::SongRecord;
use surrealdb::{engine::any::Any, Surreal};

/// Song without its embedding vector.
pub async fn get_song(db: &Surreal<Any>, song_id: &str) -> Result<SongRecord> {
    let song: Option<SongRecord> = db
        .query("SELECT * OMIT lyrics_embedding FROM $song")
        .bind(("song", create_song_thing(song_id)))
        .await?
        .take(0)?;
    song.ok_or_else(|| Error::SongNotFound {
        id: song_id.to_string(),
    })
}

pub async fn song_exists(db: &Surreal<Any>, song_id: &str) -> Result<bool> {
    match get_song(db, song_id).await {
        Ok(_) => Ok(true),
        Err(Error::SongNotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
pub async fn insert_test_song(
    db: &Surreal<Any>,
    user_id: &str,
    title: &str,
    visibility: crate::models::song::Visibility,
) -> String {
    use crate::helpers::thing_helpers::{create_user_thing, opt_thing_to_id};
    use chrono::Utc;

    let now: surrealdb::sql::Datetime = Utc::now().into();
    let created: Option<SongRecord> = db
        .create("song")
        .content(SongRecord {
            id: None,
            title: title.to_string(),
            artist: None,
            duration: 180.0,
            upload_date: now.clone(),
            play_count: 0,
            like_count: 0,
            comment_count: 0,
            lyrics: None,
            lyrics_embedding: None,
            audio_url: Some(format!("http://localhost:8080/files/music/{title}.mp3")),
            thumbnail: None,
            cover: None,
            visibility,
            user: create_user_thing(user_id),
            is_flagged: false,
            created_at: now.clone(),
            updated_at: now,
        })
        .await
        .unwrap();
    opt_thing_to_id(&created.unwrap().id)
}
