use chrono::Utc;
use serde::Serialize;
use surrealdb::sql::Datetime;
use surrealdb::{engine::any::Any, Surreal};

use crate::error::{Error, Result};
use crate::helpers::db_helpers::take_count;
use crate::helpers::song_helpers::get_song;
use crate::helpers::thing_helpers::{
    create_genre_thing, create_song_thing, create_user_thing, opt_thing_to_id, thing_to_id,
};
use crate::helpers::user_helpers::fetch_user_summaries;
use crate::middlewares::mw_auth::Ctx;
use crate::models::pagination::offset;
use crate::models::song::{
    AdminSongView, CreateSongRequest, SongRecord, SongSearchQuery, SongSearchResponse, SongView,
    UpdateSongRequest, Visibility,
};
use crate::services::genre_service::GenreService;
use crate::services::lyrics_service::LyricsService;
use crate::services::storage_service::StorageService;
use crate::services::subscription_service::SubscriptionService;
use crate::services::vector_service::VectorService;
use crate::validators::text_validator::{ensure_optional_max_len, ensure_text};

pub const MAX_TITLE_LEN: usize = 200;
const MAX_ARTIST_LEN: usize = 200;
const MAX_LYRICS_LEN: usize = 20_000;
const FEED_LIMIT: u32 = 50;
const DEFAULT_SEARCH_LIMIT: u32 = 20;
const MAX_SEARCH_LIMIT: u32 = 100;

/// Partial update merged into a song record.
#[derive(Serialize, Default)]
struct SongPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lyrics: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    visibility: Option<Visibility>,
    updated_at: Option<Datetime>,
}

pub struct SongService;

impl SongService {
    /// Creates a song for `user_id` after the plan's song-count check.
    /// Lyrics are embedded on the way in when the embedding service is up.
    pub async fn create_song(
        db: &Surreal<Any>,
        vectors: &VectorService,
        user_id: &str,
        req: CreateSongRequest,
    ) -> Result<SongView> {
        let title = ensure_text("title", &req.title, MAX_TITLE_LEN)?;
        ensure_optional_max_len("artist", req.artist.as_deref(), MAX_ARTIST_LEN)?;
        ensure_optional_max_len("lyrics", req.lyrics.as_deref(), MAX_LYRICS_LEN)?;
        if req.duration.is_some_and(|d| !d.is_finite() || d < 0.0) {
            return Err(Error::InvalidInput {
                reason: "duration must be a non-negative number".to_string(),
            });
        }

        SubscriptionService::ensure_can_upload_song(db, user_id).await?;
        for genre_id in &req.genres {
            GenreService::get_genre(db, genre_id).await?;
        }

        let lyrics_embedding = LyricsService::embed_lyrics(vectors, req.lyrics.as_deref()).await;
        let now = Utc::now();

        let created: Option<SongRecord> = db
            .create("song")
            .content(SongRecord {
                id: None,
                title,
                artist: req.artist.filter(|a| !a.trim().is_empty()),
                duration: req.duration.unwrap_or(0.0),
                upload_date: now.into(),
                play_count: 0,
                like_count: 0,
                comment_count: 0,
                lyrics: req.lyrics,
                lyrics_embedding,
                audio_url: req.audio_url,
                thumbnail: req.thumbnail,
                cover: req.cover,
                visibility: req.visibility.unwrap_or_default(),
                user: create_user_thing(user_id),
                is_flagged: false,
                created_at: now.into(),
                updated_at: now.into(),
            })
            .await?;

        let mut song = created.ok_or_else(|| Error::DbError("Could not create song".into()))?;
        song.lyrics_embedding = None;

        if let Some(song_thing) = &song.id {
            GenreService::set_song_genres(db, song_thing, &req.genres).await?;
        }

        tracing::info!("User {} uploaded song {}", user_id, opt_thing_to_id(&song.id));
        Self::populate_one(db, song).await
    }

    /// Public, unflagged songs, newest first.
    pub async fn find_all_public(db: &Surreal<Any>) -> Result<Vec<SongView>> {
        let songs: Vec<SongRecord> = db
            .query(
                "SELECT * OMIT lyrics_embedding FROM song \
                 WHERE visibility = 'PUBLIC' AND is_flagged = false ORDER BY created_at DESC",
            )
            .await?
            .take(0)?;
        Self::populate(db, songs).await
    }

    /// Every song with signed media and flattened genre names.
    pub async fn find_all_for_admin(
        db: &Surreal<Any>,
        storage: &StorageService,
    ) -> Result<Vec<AdminSongView>> {
        let songs: Vec<SongRecord> = db
            .query("SELECT * OMIT lyrics_embedding FROM song ORDER BY created_at DESC")
            .await?
            .take(0)?;
        let mut views = Self::populate(db, songs).await?;
        sign_all_media(storage, &mut views);

        Ok(views
            .into_iter()
            .map(|song| {
                let genre_names: Vec<String> = song.genres.iter().map(|g| g.name.clone()).collect();
                AdminSongView {
                    genre: genre_names.first().cloned(),
                    genre_names,
                    song,
                }
            })
            .collect())
    }

    /// Songs uploaded by `owner_id`. Other viewers only see public, unflagged ones.
    pub async fn find_user_songs(
        db: &Surreal<Any>,
        owner_id: &str,
        viewer_id: Option<&str>,
    ) -> Result<Vec<SongView>> {
        let is_owner = viewer_id == Some(owner_id);
        let query = if is_owner {
            "SELECT * OMIT lyrics_embedding FROM song WHERE user = $user ORDER BY created_at DESC"
        } else {
            "SELECT * OMIT lyrics_embedding FROM song WHERE user = $user \
             AND visibility = 'PUBLIC' AND is_flagged = false ORDER BY created_at DESC"
        };

        let songs: Vec<SongRecord> = db
            .query(query)
            .bind(("user", create_user_thing(owner_id)))
            .await?
            .take(0)?;
        Self::populate(db, songs).await
    }

    /// Latest public songs of the users `user_id` follows.
    pub async fn get_feed(db: &Surreal<Any>, user_id: &str) -> Result<Vec<SongView>> {
        let songs: Vec<SongRecord> = db
            .query("LET $following = (SELECT VALUE following FROM follower WHERE follower = $user)")
            .query(
                "SELECT * OMIT lyrics_embedding FROM song \
                 WHERE user IN $following AND visibility = 'PUBLIC' AND is_flagged = false \
                 ORDER BY upload_date DESC LIMIT $limit",
            )
            .bind(("user", create_user_thing(user_id)))
            .bind(("limit", FEED_LIMIT))
            .await?
            .take(1)?;
        Self::populate(db, songs).await
    }

    /// A single song; flagged songs are hidden.
    pub async fn find_one(db: &Surreal<Any>, song_id: &str) -> Result<SongView> {
        let song = get_song(db, song_id).await?;
        if song.is_flagged {
            return Err(Error::SongNotFound {
                id: song_id.to_string(),
            });
        }
        Self::populate_one(db, song).await
    }

    pub async fn update_song(
        db: &Surreal<Any>,
        vectors: &VectorService,
        ctx: &Ctx,
        song_id: &str,
        req: UpdateSongRequest,
    ) -> Result<SongView> {
        let song = get_song(db, song_id).await?;
        ensure_can_manage(ctx, &song)?;

        let mut patch = SongPatch {
            updated_at: Some(Utc::now().into()),
            ..Default::default()
        };
        if let Some(title) = req.title {
            patch.title = Some(ensure_text("title", &title, MAX_TITLE_LEN)?);
        }
        if let Some(artist) = req.artist {
            ensure_optional_max_len("artist", Some(&artist), MAX_ARTIST_LEN)?;
            patch.artist = Some(artist);
        }
        if let Some(duration) = req.duration {
            if !duration.is_finite() || duration < 0.0 {
                return Err(Error::InvalidInput {
                    reason: "duration must be a non-negative number".to_string(),
                });
            }
            patch.duration = Some(duration);
        }
        // Outer `Some` when the lyrics changed; the inner vector may be absent.
        let mut new_embedding = None;
        if let Some(lyrics) = req.lyrics {
            ensure_optional_max_len("lyrics", Some(&lyrics), MAX_LYRICS_LEN)?;
            if song.lyrics.as_deref() != Some(lyrics.as_str()) {
                new_embedding = Some(LyricsService::embed_lyrics(vectors, Some(&lyrics)).await);
            }
            patch.lyrics = Some(lyrics);
        }
        patch.thumbnail = req.thumbnail;
        patch.cover = req.cover;
        patch.visibility = req.visibility;

        let song_thing = create_song_thing(song_id);
        db.query("UPDATE $song MERGE $patch RETURN NONE")
            .bind(("song", song_thing.clone()))
            .bind(("patch", patch))
            .await?
            .check()?;
        if let Some(embedding) = new_embedding {
            db.query("UPDATE $song SET lyrics_embedding = $embedding RETURN NONE")
                .bind(("song", song_thing.clone()))
                .bind(("embedding", embedding))
                .await?
                .check()?;
        }

        if let Some(genres) = req.genres {
            GenreService::set_song_genres(db, &song_thing, &genres).await?;
        }

        Self::populate_one(db, get_song(db, song_id).await?).await
    }

    /// Replaces the lyrics and refreshes their embedding.
    pub async fn update_lyrics(
        db: &Surreal<Any>,
        vectors: &VectorService,
        ctx: &Ctx,
        song_id: &str,
        lyrics: String,
    ) -> Result<SongView> {
        ensure_optional_max_len("lyrics", Some(&lyrics), MAX_LYRICS_LEN)?;
        let song = get_song(db, song_id).await?;
        ensure_can_manage(ctx, &song)?;

        let embedding = LyricsService::embed_lyrics(vectors, Some(&lyrics)).await;
        db.query(
            "UPDATE $song SET lyrics = $lyrics, lyrics_embedding = $embedding, \
             updated_at = time::now() RETURN NONE",
        )
        .bind(("song", create_song_thing(song_id)))
        .bind(("lyrics", lyrics))
        .bind(("embedding", embedding))
        .await?
        .check()?;

        Self::populate_one(db, get_song(db, song_id).await?).await
    }

    /// Deletes the song, its stored media and every record pointing at it.
    pub async fn delete_song(
        db: &Surreal<Any>,
        storage: &StorageService,
        ctx: &Ctx,
        song_id: &str,
    ) -> Result<()> {
        let song = get_song(db, song_id).await?;
        ensure_can_manage(ctx, &song)?;

        for url in [&song.audio_url, &song.cover, &song.thumbnail].into_iter().flatten() {
            if let Err(e) = storage.delete(url).await {
                tracing::warn!("Could not delete stored file {}: {:?}", url, e);
            }
        }

        db.query("DELETE song_like WHERE song = $song")
            .query("DELETE comment WHERE song = $song")
            .query("DELETE genre_song WHERE song = $song")
            .query("DELETE flag_report WHERE song = $song")
            .query("UPDATE playlist SET songs -= $song, updated_at = time::now() WHERE songs CONTAINS $song")
            .query("DELETE $song")
            .bind(("song", create_song_thing(song_id)))
            .await?
            .check()?;

        tracing::info!("Song {} deleted by {}", song_id, ctx.user_id);
        Ok(())
    }

    pub async fn increment_plays(db: &Surreal<Any>, song_id: &str) -> Result<SongView> {
        get_song(db, song_id).await?;
        db.query("UPDATE $song SET play_count += 1 RETURN NONE")
            .bind(("song", create_song_thing(song_id)))
            .await?
            .check()?;
        Self::populate_one(db, get_song(db, song_id).await?).await
    }

    pub async fn get_audio_url(
        db: &Surreal<Any>,
        storage: &StorageService,
        song_id: &str,
    ) -> Result<String> {
        let song = get_song(db, song_id).await?;
        let url = song.audio_url.ok_or_else(|| Error::ResourceNotFound {
            message: "Audio file not found".to_string(),
        })?;
        storage.signed_url(&url)
    }

    pub async fn set_flag(db: &Surreal<Any>, song_id: &str, is_flagged: bool) -> Result<SongView> {
        get_song(db, song_id).await?;
        db.query("UPDATE $song SET is_flagged = $flagged, updated_at = time::now() RETURN NONE")
            .bind(("song", create_song_thing(song_id)))
            .bind(("flagged", is_flagged))
            .await?
            .check()?;
        tracing::info!("Song {} flagged: {}", song_id, is_flagged);
        Self::populate_one(db, get_song(db, song_id).await?).await
    }

    /// Filtered, sorted and paged search over song metadata. Private songs
    /// are searchable by admins, and by everyone else within their own uploads.
    pub async fn search(
        db: &Surreal<Any>,
        viewer: Option<&Ctx>,
        q: SongSearchQuery,
    ) -> Result<SongSearchResponse> {
        let visibility = q.visibility.unwrap_or_default();
        let owner = match (visibility, viewer) {
            (Visibility::Public, _) => None,
            (_, Some(ctx)) if ctx.is_admin() => None,
            (_, Some(ctx)) => Some(create_user_thing(&ctx.user_id)),
            (_, None) => {
                return Err(Error::Forbidden {
                    reason: "Sign in to search private songs".to_string(),
                })
            }
        };

        let page = q.page.unwrap_or(1).max(1);
        let limit = q
            .limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT);

        let needle = q
            .search
            .or(q.query)
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let artist = q
            .artist
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());
        let genre = q.genre.filter(|g| !g.trim().is_empty());
        let min_duration = q.min_duration.filter(|d| *d > 0.0);
        let max_duration = q.max_duration.filter(|d| *d > 0.0);

        let mut conditions = vec!["visibility = $visibility", "is_flagged = false"];
        if owner.is_some() {
            conditions.push("user = $owner");
        }
        if needle.is_some() {
            conditions.push(
                "(string::lowercase(title) CONTAINS $needle OR string::lowercase(artist ?? '') CONTAINS $needle)",
            );
        }
        if artist.is_some() {
            conditions.push("string::lowercase(artist ?? '') CONTAINS $artist");
        }
        if min_duration.is_some() {
            conditions.push("duration >= $min_duration");
        }
        if max_duration.is_some() {
            conditions.push("duration <= $max_duration");
        }
        if genre.is_some() {
            conditions.push("id IN (SELECT VALUE song FROM genre_song WHERE genre = $genre)");
        }
        let where_clause = conditions.join(" AND ");

        let field = sort_field(q.sort_by.as_deref().or(q.sort.as_deref()));
        let direction = sort_direction(q.sort_order.as_deref().or(q.order.as_deref()));

        let mut res = db
            .query(format!(
                "SELECT count() AS total FROM song WHERE {where_clause} GROUP ALL"
            ))
            .query(format!(
                "SELECT * OMIT lyrics_embedding FROM song WHERE {where_clause} \
                 ORDER BY {field} {direction} LIMIT $limit START $start"
            ))
            .bind(("visibility", visibility))
            .bind(("owner", owner))
            .bind(("needle", needle.unwrap_or_default()))
            .bind(("artist", artist.unwrap_or_default()))
            .bind(("min_duration", min_duration.unwrap_or_default()))
            .bind(("max_duration", max_duration.unwrap_or_default()))
            .bind(("genre", create_genre_thing(&genre.unwrap_or_default())))
            .bind(("limit", limit))
            .bind(("start", offset(page, limit)))
            .await?;

        let total = take_count(&mut res, 0)?;
        let songs: Vec<SongRecord> = res.take(1)?;

        Ok(SongSearchResponse {
            data: Self::populate(db, songs).await?,
            total,
            page,
            limit,
        })
    }

    /// Attaches uploader summaries and genres.
    pub async fn populate(db: &Surreal<Any>, songs: Vec<SongRecord>) -> Result<Vec<SongView>> {
        let users =
            fetch_user_summaries(db, songs.iter().map(|s| s.user.clone()).collect()).await?;
        let mut genres =
            GenreService::genres_for_songs(db, songs.iter().filter_map(|s| s.id.clone()).collect())
                .await?;

        Ok(songs
            .into_iter()
            .map(|song| {
                let user = users.get(&thing_to_id(&song.user)).cloned();
                let song_genres = genres.remove(&opt_thing_to_id(&song.id)).unwrap_or_default();
                SongView::from_record(song, user, song_genres)
            })
            .collect())
    }

    pub async fn populate_one(db: &Surreal<Any>, song: SongRecord) -> Result<SongView> {
        let id = opt_thing_to_id(&song.id);
        Self::populate(db, vec![song])
            .await?
            .pop()
            .ok_or(Error::SongNotFound { id })
    }
}

fn ensure_can_manage(ctx: &Ctx, song: &SongRecord) -> Result<()> {
    if !ctx.can_manage(&thing_to_id(&song.user)) {
        return Err(Error::Forbidden {
            reason: "You can only modify your own songs".to_string(),
        });
    }
    Ok(())
}

/// Maps the public sort keys onto record fields; anything else sorts by creation.
fn sort_field(key: Option<&str>) -> &'static str {
    match key {
        Some("title") => "title",
        Some("playCount") => "play_count",
        Some("likes") => "like_count",
        Some("duration") => "duration",
        _ => "created_at",
    }
}

fn sort_direction(order: Option<&str>) -> &'static str {
    match order {
        Some(o) if o.eq_ignore_ascii_case("asc") => "ASC",
        _ => "DESC",
    }
}

/// Cover and thumbnail swapped for signed links.
pub fn sign_covers(storage: &StorageService, songs: &mut [SongView]) {
    for song in songs {
        song.cover = storage.signed_or_original(song.cover.take());
        song.thumbnail = storage.signed_or_original(song.thumbnail.take());
    }
}

pub fn sign_all_media(storage: &StorageService, songs: &mut [SongView]) {
    sign_covers(storage, songs);
    for song in songs {
        song.audio_url = storage.signed_or_original(song.audio_url.take());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::db_helpers::setup_test_db;
    use crate::helpers::song_helpers::insert_test_song;
    use crate::helpers::user_helpers::insert_test_user;
    use crate::models::genre::CreateGenreRequest;
    use crate::models::user::Role;

    fn ctx(user_id: &str, role: Role) -> Ctx {
        Ctx {
            user_id: user_id.to_string(),
            email: format!("{user_id}@example.com"),
            role,
            username: user_id.to_string(),
        }
    }

    fn no_vectors() -> VectorService {
        VectorService::new(reqwest::Client::new(), None)
    }

    fn create_req(title: &str) -> CreateSongRequest {
        CreateSongRequest {
            title: title.to_string(),
            duration: Some(215.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_sort_mapping() {
        assert_eq!(sort_field(Some("uploadDate")), "created_at");
        assert_eq!(sort_field(Some("playCount")), "play_count");
        assert_eq!(sort_field(Some("likes")), "like_count");
        assert_eq!(sort_field(Some("drop table")), "created_at");
        assert_eq!(sort_direction(Some("ASC")), "ASC");
        assert_eq!(sort_direction(None), "DESC");
    }

    #[tokio::test]
    async fn test_create_song_with_genres_and_artist_fallback() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "maker").await;
        let pop = GenreService::create_genre(
            &db,
            CreateGenreRequest {
                name: "Pop".to_string(),
                description: None,
            },
        )
        .await
        .unwrap();

        let mut req = create_req("First");
        req.genres = vec![pop.id.clone()];
        let song = SongService::create_song(&db, &no_vectors(), &owner, req).await.unwrap();

        assert_eq!(song.artist, "maker");
        assert_eq!(song.genres.len(), 1);
        assert_eq!(song.genres[0].name, "Pop");
        assert_eq!(song.visibility, Visibility::Public);

        let mut bad = create_req("Second");
        bad.genres = vec!["nope".to_string()];
        assert!(matches!(
            SongService::create_song(&db, &no_vectors(), &owner, bad).await,
            Err(Error::GenreNotFound { .. })
        ));
        assert_eq!(SongService::find_user_songs(&db, &owner, Some(&owner)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_free_plan_song_limit() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "prolific").await;
        for i in 0..10 {
            insert_test_song(&db, &owner, &format!("Song {i}"), Visibility::Public).await;
        }

        let res = SongService::create_song(&db, &no_vectors(), &owner, create_req("Eleventh")).await;
        match res {
            Err(Error::LimitExceeded { reason }) => assert_eq!(
                reason,
                "You've reached your song limit of 10. Upgrade to Premium for more uploads."
            ),
            other => panic!("expected limit error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_visibility_rules() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "owner").await;
        let other = insert_test_user(&db, "other").await;
        insert_test_song(&db, &owner, "Open", Visibility::Public).await;
        insert_test_song(&db, &owner, "Secret", Visibility::Private).await;
        let flagged = insert_test_song(&db, &owner, "Flagged", Visibility::Public).await;
        SongService::set_flag(&db, &flagged, true).await.unwrap();

        assert_eq!(SongService::find_all_public(&db).await.unwrap().len(), 1);
        assert_eq!(SongService::find_user_songs(&db, &owner, Some(&owner)).await.unwrap().len(), 3);
        assert_eq!(SongService::find_user_songs(&db, &owner, Some(&other)).await.unwrap().len(), 1);
        assert_eq!(SongService::find_user_songs(&db, &owner, None).await.unwrap().len(), 1);
        assert!(matches!(
            SongService::find_one(&db, &flagged).await,
            Err(Error::SongNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_feed_lists_followed_users_only() {
        let db = setup_test_db().await;
        let me = insert_test_user(&db, "listener").await;
        let followed = insert_test_user(&db, "followed").await;
        let stranger = insert_test_user(&db, "stranger").await;
        insert_test_song(&db, &followed, "From followed", Visibility::Public).await;
        insert_test_song(&db, &followed, "Private one", Visibility::Private).await;
        insert_test_song(&db, &stranger, "From stranger", Visibility::Public).await;

        db.query("CREATE follower SET follower = $me, following = $them, created_at = time::now()")
            .bind(("me", create_user_thing(&me)))
            .bind(("them", create_user_thing(&followed)))
            .await
            .unwrap();

        let feed = SongService::get_feed(&db, &me).await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].title, "From followed");
    }

    #[tokio::test]
    async fn test_update_requires_owner_or_admin() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "writer").await;
        let song = insert_test_song(&db, &owner, "Draft", Visibility::Private).await;

        let update = UpdateSongRequest {
            title: Some("Final".to_string()),
            visibility: Some(Visibility::Public),
            ..Default::default()
        };
        let denied =
            SongService::update_song(&db, &no_vectors(), &ctx("intruder", Role::User), &song, update.clone())
                .await;
        assert!(matches!(denied, Err(Error::Forbidden { .. })));

        let updated = SongService::update_song(&db, &no_vectors(), &ctx(&owner, Role::User), &song, update)
            .await
            .unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.visibility, Visibility::Public);

        let by_admin = SongService::update_lyrics(
            &db,
            &no_vectors(),
            &ctx("root", Role::Admin),
            &song,
            "la la la".to_string(),
        )
        .await
        .unwrap();
        assert_eq!(by_admin.lyrics.as_deref(), Some("la la la"));
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "cleaner").await;
        let fan = insert_test_user(&db, "fan").await;
        let song = insert_test_song(&db, &owner, "Doomed", Visibility::Public).await;
        let song_thing = create_song_thing(&song);

        db.query("CREATE song_like SET user = $fan, song = $song, created_at = time::now()")
            .query("CREATE comment SET user = $fan, song = $song, content = 'nice', created_at = time::now(), updated_at = time::now()")
            .query("CREATE playlist SET name = 'Mix', user = $fan, songs = [$song], visibility = 'PUBLIC', is_featured = false, created_at = time::now(), updated_at = time::now()")
            .bind(("fan", create_user_thing(&fan)))
            .bind(("song", song_thing.clone()))
            .await
            .unwrap();

        let root = std::env::temp_dir().join(format!("songs-{}", uuid::Uuid::new_v4()));
        let storage = crate::services::storage_service::test_storage(&root);
        SongService::delete_song(&db, &storage, &ctx(&owner, Role::User), &song)
            .await
            .unwrap();

        let mut res = db
            .query("SELECT count() AS total FROM song_like GROUP ALL")
            .query("SELECT count() AS total FROM comment GROUP ALL")
            .query("SELECT count() AS total FROM playlist WHERE songs CONTAINS $song GROUP ALL")
            .bind(("song", song_thing))
            .await
            .unwrap();
        assert_eq!(take_count(&mut res, 0).unwrap(), 0);
        assert_eq!(take_count(&mut res, 1).unwrap(), 0);
        assert_eq!(take_count(&mut res, 2).unwrap(), 0);
        assert!(matches!(get_song(&db, &song).await, Err(Error::SongNotFound { .. })));
    }

    #[tokio::test]
    async fn test_increment_plays() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "dj").await;
        let song = insert_test_song(&db, &owner, "Loop", Visibility::Public).await;

        SongService::increment_plays(&db, &song).await.unwrap();
        let view = SongService::increment_plays(&db, &song).await.unwrap();
        assert_eq!(view.play_count, 2);
    }

    #[tokio::test]
    async fn test_search_filters_and_paging() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "searcher").await;
        for title in ["Blue Moon", "Blue Sky", "Red Sun"] {
            insert_test_song(&db, &owner, title, Visibility::Public).await;
        }
        insert_test_song(&db, &owner, "Blue Secret", Visibility::Private).await;

        let res = SongService::search(
            &db,
            None,
            SongSearchQuery {
                query: Some("blue".to_string()),
                sort_by: Some("title".to_string()),
                sort_order: Some("asc".to_string()),
                limit: Some(1),
                page: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(res.total, 2);
        assert_eq!(res.page, 2);
        assert_eq!(res.limit, 1);
        assert_eq!(res.data.len(), 1);
        assert_eq!(res.data[0].title, "Blue Sky");

        let private = SongService::search(
            &db,
            Some(&ctx(&owner, Role::User)),
            SongSearchQuery {
                visibility: Some(Visibility::Private),
                limit: Some(1000),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(private.total, 1);
        assert_eq!(private.limit, 100);

        let long = SongService::search(
            &db,
            None,
            SongSearchQuery {
                min_duration: Some(200.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(long.total, 0);
    }
    #[tokio::test]
    async fn test_private_search_is_scoped_to_caller() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "hider").await;
        let other = insert_test_user(&db, "snoop").await;
        insert_test_song(&db, &owner, "My Secret Demo", Visibility::Private).await;
        insert_test_song(&db, &other, "Snoop Draft", Visibility::Private).await;
        insert_test_song(&db, &owner, "Out Loud", Visibility::Public).await;

        let private_query = || SongSearchQuery {
            visibility: Some(Visibility::Private),
            ..Default::default()
        };

        let anonymous = SongService::search(&db, None, private_query()).await;
        assert!(matches!(anonymous, Err(Error::Forbidden { .. })));

        let snoop = SongService::search(&db, Some(&ctx(&other, Role::User)), private_query())
            .await
            .unwrap();
        assert_eq!(snoop.total, 1);
        assert_eq!(snoop.data[0].title, "Snoop Draft");

        let admin = SongService::search(&db, Some(&ctx("root", Role::Admin)), private_query())
            .await
            .unwrap();
        assert_eq!(admin.total, 2);

        let public = SongService::search(&db, None, SongSearchQuery::default()).await.unwrap();
        assert_eq!(public.total, 1);
        assert_eq!(public.data[0].title, "Out Loud");
    }

    #[tokio::test]
    async fn test_changed_lyrics_drop_stale_embedding() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "poet").await;
        let song = insert_test_song(&db, &owner, "Verse", Visibility::Public).await;
        db.query("UPDATE $song SET lyrics = 'old words', lyrics_embedding = $embedding")
            .bind(("song", create_song_thing(&song)))
            .bind(("embedding", vec![0.5f32; 1024]))
            .await
            .unwrap()
            .check()
            .unwrap();

        let update = UpdateSongRequest {
            lyrics: Some("completely different new lyrics".to_string()),
            ..Default::default()
        };
        let view = SongService::update_song(&db, &no_vectors(), &ctx(&owner, Role::User), &song, update)
            .await
            .unwrap();
        assert_eq!(view.lyrics.as_deref(), Some("completely different new lyrics"));

        #[derive(serde::Deserialize)]
        struct EmbeddingRow {
            lyrics_embedding: Option<Vec<f32>>,
        }
        let row: Option<EmbeddingRow> = db
            .query("SELECT lyrics_embedding FROM $song")
            .bind(("song", create_song_thing(&song)))
            .await
            .unwrap()
            .take(0)
            .unwrap();
        assert!(row.unwrap().lyrics_embedding.is_none());
    }

    #[tokio::test]
    async fn test_duration_must_be_finite() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "timer").await;

        let mut req = create_req("Endless");
        req.duration = Some(f64::NAN);
        assert!(matches!(
            SongService::create_song(&db, &no_vectors(), &owner, req).await,
            Err(Error::InvalidInput { .. })
        ));

        let song = insert_test_song(&db, &owner, "Bounded", Visibility::Public).await;
        let update = UpdateSongRequest {
            duration: Some(f64::INFINITY),
            ..Default::default()
        };
        assert!(matches!(
            SongService::update_song(&db, &no_vectors(), &ctx(&owner, Role::User), &song, update)
                .await,
            Err(Error::InvalidInput { .. })
        ));
    }
}
