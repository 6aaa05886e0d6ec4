use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;

use crate::config::DbConfig;
use crate::error::Result;
use crate::models::database_helpers::CountResult;

/// Embedding width of the lyrics vectors (Cohere embed-english-v3.0).
pub const EMBEDDING_DIMENSION: usize = 1024;

const SCHEMA: &str = r#"
    DEFINE INDEX IF NOT EXISTS user_email_unique ON TABLE user FIELDS email UNIQUE;
    DEFINE INDEX IF NOT EXISTS user_username_unique ON TABLE user FIELDS username UNIQUE;
    DEFINE INDEX IF NOT EXISTS genre_name_unique ON TABLE genre FIELDS name UNIQUE;
    DEFINE INDEX IF NOT EXISTS song_user_idx ON TABLE song FIELDS user;
    DEFINE INDEX IF NOT EXISTS song_like_pair_idx ON TABLE song_like FIELDS user, song;
    DEFINE INDEX IF NOT EXISTS comment_song_idx ON TABLE comment FIELDS song;
    DEFINE INDEX IF NOT EXISTS follower_pair_idx ON TABLE follower FIELDS follower, following;
    DEFINE INDEX IF NOT EXISTS follow_playlist_unique ON TABLE follow_playlist FIELDS user, playlist UNIQUE;
    DEFINE INDEX IF NOT EXISTS flag_report_unique ON TABLE flag_report FIELDS song, reported_by UNIQUE;
    DEFINE INDEX IF NOT EXISTS payment_order_code_unique ON TABLE payment_order FIELDS order_code UNIQUE;
    DEFINE INDEX IF NOT EXISTS playback_session_pair_idx ON TABLE playback_session FIELDS user_id, track_id;
    DEFINE INDEX IF NOT EXISTS lyrics_vector_index ON TABLE song FIELDS lyrics_embedding HNSW DIMENSION 1024 DIST COSINE;
"#;

pub async fn connect(config: &DbConfig) -> Result<Surreal<Any>> {
    tracing::info!("Connecting to database at: {}", config.url);

    let db = any::connect(&config.url).await?;
    db.use_ns(&config.namespace).use_db(&config.database).await?;
    db.signin(Root {
        username: &config.user,
        password: &config.password,
    })
    .await?;

    init_schema(&db).await?;
    tracing::info!("Database connected successfully!");
    Ok(db)
}

pub async fn init_schema(db: &Surreal<Any>) -> Result<()> {
    db.query(SCHEMA).await?.check()?;
    Ok(())
}

/// Reads a `SELECT count() AS total ... GROUP ALL` statement result.
pub fn take_count(response: &mut surrealdb::Response, index: usize) -> Result<u64> {
    let row: Option<CountResult> = response.take(index)?;
    Ok(row.map(|r| r.total).unwrap_or(0))
}

#[cfg(test)]
pub async fn setup_test_db() -> Surreal<Any> {
    let db = any::connect("mem://").await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    init_schema(&db).await.unwrap();
    db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let db = setup_test_db().await;
        init_schema(&db).await.unwrap();
    }

    #[tokio::test]
    async fn test_take_count() {
        let db = setup_test_db().await;
        db.query("CREATE genre SET name = 'rock', created_at = time::now(), updated_at = time::now()")
            .query("CREATE genre SET name = 'jazz', created_at = time::now(), updated_at = time::now()")
            .await
            .unwrap();

        let mut res = db
            .query("SELECT count() AS total FROM genre GROUP ALL")
            .query("SELECT count() AS total FROM song GROUP ALL")
            .await
            .unwrap();
        assert_eq!(take_count(&mut res, 0).unwrap(), 2);
        assert_eq!(take_count(&mut res, 1).unwrap(), 0);
    }
}
