use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    helpers::upload_helpers::{ensure_content_type, UploadForm},
    middlewares::mw_auth::{AdminCtx, Ctx},
    models::{
        database_helpers::ApiResponse,
        flag_report::{
            CreateFlagReportRequest, FlagReportPage, FlagReportQuery, FlagReportView,
            FlaggedSongPage, ReviewFlagReportRequest,
        },
        pagination::PageQuery,
        song::{
            parse_id_list, AdminSongView, AudioUrlResponse, BackfillReport, CreateSongRequest,
            FlagSongRequest, LyricsSearchQuery, LyricsSearchResponse, SignedUrlRequest,
            SignedUrlResponse, SongSearchQuery, SongSearchResponse, SongView, UpdateLyricsRequest,
            UpdateSongRequest, UploadResponse,
        },
    },
    services::{
        lyrics_service::LyricsService,
        report_service::ReportService,
        song_service::{sign_covers, SongService, MAX_TITLE_LEN},
        storage_service::{StorageFolder, StorageService},
        subscription_service::SubscriptionService,
    },
    validators::text_validator::{ensure_text, parse_visibility},
    AppState, Result,
};

pub struct SongController;

impl SongController {
    pub async fn create_song(
        State(state): State<AppState>,
        ctx: Ctx,
        Json(payload): Json<CreateSongRequest>,
    ) -> Result<(StatusCode, Json<ApiResponse<SongView>>)> {
        let song =
            SongService::create_song(&state.db, &state.vectors, &ctx.user_id, payload).await?;
        Ok((StatusCode::CREATED, Json(ApiResponse::ok(song))))
    }

    pub async fn list_public(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<Vec<SongView>>>> {
        let mut songs = SongService::find_all_public(&state.db).await?;
        sign_covers(&state.storage, &mut songs);
        Ok(Json(ApiResponse::ok(songs)))
    }

    pub async fn list_all_for_admin(
        State(state): State<AppState>,
        _admin: AdminCtx,
    ) -> Result<Json<ApiResponse<Vec<AdminSongView>>>> {
        let songs = SongService::find_all_for_admin(&state.db, &state.storage).await?;
        Ok(Json(ApiResponse::ok(songs)))
    }

    pub async fn my_songs(
        State(state): State<AppState>,
        ctx: Ctx,
    ) -> Result<Json<ApiResponse<Vec<SongView>>>> {
        let mut songs =
            SongService::find_user_songs(&state.db, &ctx.user_id, Some(&ctx.user_id)).await?;
        sign_covers(&state.storage, &mut songs);
        Ok(Json(ApiResponse::ok(songs)))
    }

    pub async fn feed(
        State(state): State<AppState>,
        ctx: Ctx,
    ) -> Result<Json<ApiResponse<Vec<SongView>>>> {
        let mut songs = SongService::get_feed(&state.db, &ctx.user_id).await?;
        sign_covers(&state.storage, &mut songs);
        Ok(Json(ApiResponse::ok(songs)))
    }

    pub async fn user_songs(
        State(state): State<AppState>,
        ctx: Option<Ctx>,
        Path(user_id): Path<String>,
    ) -> Result<Json<ApiResponse<Vec<SongView>>>> {
        let viewer = ctx.as_ref().map(|c| c.user_id.as_str());
        let mut songs = SongService::find_user_songs(&state.db, &user_id, viewer).await?;
        sign_covers(&state.storage, &mut songs);
        Ok(Json(ApiResponse::ok(songs)))
    }

    pub async fn search(
        State(state): State<AppState>,
        ctx: Option<Ctx>,
        Query(query): Query<SongSearchQuery>,
    ) -> Result<Json<ApiResponse<SongSearchResponse>>> {
        let mut res = SongService::search(&state.db, ctx.as_ref(), query).await?;
        sign_covers(&state.storage, &mut res.data);
        Ok(Json(ApiResponse::ok(res)))
    }

    pub async fn search_lyrics(
        State(state): State<AppState>,
        Query(query): Query<LyricsSearchQuery>,
    ) -> Result<Json<ApiResponse<LyricsSearchResponse>>> {
        let mut res = LyricsService::search(
            &state.db,
            &state.vectors,
            &query.q,
            query.limit,
            query.threshold,
        )
        .await?;
        for found in res.results.iter_mut() {
            found.song.cover = state.storage.signed_or_original(found.song.cover.take());
        }
        Ok(Json(ApiResponse::ok(res)))
    }

    pub async fn backfill_embeddings(
        State(state): State<AppState>,
        _admin: AdminCtx,
    ) -> Result<Json<ApiResponse<BackfillReport>>> {
        let report = LyricsService::backfill_embeddings(&state.db, &state.vectors).await?;
        Ok(Json(ApiResponse::ok(report)))
    }

    pub async fn get_song(
        State(state): State<AppState>,
        Path(song_id): Path<String>,
    ) -> Result<Json<ApiResponse<SongView>>> {
        let mut song = SongService::find_one(&state.db, &song_id).await?;
        song.cover = state.storage.signed_or_original(song.cover.take());
        Ok(Json(ApiResponse::ok(song)))
    }

    pub async fn increment_plays(
        State(state): State<AppState>,
        Path(song_id): Path<String>,
    ) -> Result<Json<ApiResponse<SongView>>> {
        let song = SongService::increment_plays(&state.db, &song_id).await?;
        Ok(Json(ApiResponse::ok(song)))
    }

    /// Multipart field `file`, stored as audio.
    pub async fn upload(
        State(state): State<AppState>,
        ctx: Ctx,
        multipart: Multipart,
    ) -> Result<Json<ApiResponse<UploadResponse>>> {
        let mut form = UploadForm::read(multipart).await?;
        let file = form.require_file("file")?;
        SubscriptionService::ensure_file_size_allowed(&state.db, &ctx.user_id, file.size()).await?;

        let url = state
            .storage
            .upload(&file.bytes, &file.file_name, StorageFolder::Music)
            .await?;
        Ok(Json(ApiResponse::ok(UploadResponse { url })))
    }

    /// Multipart `audio` + `cover` files with the song fields alongside.
    pub async fn upload_with_data(
        State(state): State<AppState>,
        ctx: Ctx,
        multipart: Multipart,
    ) -> Result<(StatusCode, Json<ApiResponse<SongView>>)> {
        let mut form = UploadForm::read(multipart).await?;
        let title = ensure_text("title", &form.text("title").unwrap_or_default(), MAX_TITLE_LEN)?;
        let visibility = form.text("visibility").map(|v| parse_visibility(&v)).transpose()?;
        let duration = form.number("duration")?;

        SubscriptionService::ensure_can_upload_song(&state.db, &ctx.user_id).await?;

        let audio = form.take_file("audio");
        if let Some(audio) = &audio {
            ensure_content_type(audio, "audio/")?;
            SubscriptionService::ensure_file_size_allowed(&state.db, &ctx.user_id, audio.size())
                .await?;
        }
        let cover = form.take_file("cover");
        if let Some(cover) = &cover {
            ensure_content_type(cover, "image/")?;
        }

        let mut stored = Vec::new();
        if let Some(cover) = &cover {
            stored.push(
                state
                    .storage
                    .upload(&cover.bytes, &cover.file_name, StorageFolder::Covers)
                    .await?,
            );
        }
        let cover_url = cover.as_ref().and_then(|_| stored.last().cloned());
        let audio_url = match &audio {
            Some(audio) => {
                let uploaded = state
                    .storage
                    .upload(&audio.bytes, &audio.file_name, StorageFolder::Music)
                    .await;
                match uploaded {
                    Ok(url) => {
                        stored.push(url.clone());
                        Some(url)
                    }
                    Err(err) => {
                        discard(&state.storage, &stored).await;
                        return Err(err);
                    }
                }
            }
            None => None,
        };

        let req = CreateSongRequest {
            title,
            artist: form.text("artist"),
            duration,
            lyrics: form.text("lyrics"),
            audio_url,
            thumbnail: form.text("thumbnail"),
            cover: cover_url,
            visibility,
            genres: form.text("genres").map(|g| parse_id_list(&g)).unwrap_or_default(),
        };

        match SongService::create_song(&state.db, &state.vectors, &ctx.user_id, req).await {
            Ok(song) => Ok((StatusCode::CREATED, Json(ApiResponse::ok(song)))),
            Err(err) => {
                discard(&state.storage, &stored).await;
                Err(err)
            }
        }
    }

    pub async fn signed_url(
        State(state): State<AppState>,
        _ctx: Ctx,
        Json(payload): Json<SignedUrlRequest>,
    ) -> Result<Json<ApiResponse<SignedUrlResponse>>> {
        let signed_url = state.storage.signed_url(&payload.url)?;
        Ok(Json(ApiResponse::ok(SignedUrlResponse { signed_url })))
    }

    pub async fn update_song(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(song_id): Path<String>,
        Json(payload): Json<UpdateSongRequest>,
    ) -> Result<Json<ApiResponse<SongView>>> {
        let song =
            SongService::update_song(&state.db, &state.vectors, &ctx, &song_id, payload).await?;
        Ok(Json(ApiResponse::with_message("Song updated successfully", song)))
    }

    pub async fn update_lyrics(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(song_id): Path<String>,
        Json(payload): Json<UpdateLyricsRequest>,
    ) -> Result<Json<ApiResponse<SongView>>> {
        let song =
            SongService::update_lyrics(&state.db, &state.vectors, &ctx, &song_id, payload.lyrics)
                .await?;
        Ok(Json(ApiResponse::with_message("Lyrics updated successfully", song)))
    }

    pub async fn flag_song(
        State(state): State<AppState>,
        _admin: AdminCtx,
        Path(song_id): Path<String>,
        Json(payload): Json<FlagSongRequest>,
    ) -> Result<Json<ApiResponse<SongView>>> {
        let song = SongService::set_flag(&state.db, &song_id, payload.is_flagged).await?;
        Ok(Json(ApiResponse::ok(song)))
    }

    pub async fn delete_song(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(song_id): Path<String>,
    ) -> Result<Json<ApiResponse<()>>> {
        SongService::delete_song(&state.db, &state.storage, &ctx, &song_id).await?;
        Ok(Json(ApiResponse::with_message("Song deleted successfully", ())))
    }

    pub async fn audio_url(
        State(state): State<AppState>,
        Path(song_id): Path<String>,
    ) -> Result<Json<ApiResponse<AudioUrlResponse>>> {
        let audio_url = SongService::get_audio_url(&state.db, &state.storage, &song_id).await?;
        Ok(Json(ApiResponse::ok(AudioUrlResponse { audio_url })))
    }

    pub async fn report_song(
        State(state): State<AppState>,
        ctx: Ctx,
        Path(song_id): Path<String>,
        Json(payload): Json<CreateFlagReportRequest>,
    ) -> Result<(StatusCode, Json<ApiResponse<FlagReportView>>)> {
        let report =
            ReportService::report_song(&state.db, &ctx.user_id, &song_id, payload).await?;
        Ok((
            StatusCode::CREATED,
            Json(ApiResponse::with_message("Song reported successfully", report)),
        ))
    }

    pub async fn flag_reports(
        State(state): State<AppState>,
        _admin: AdminCtx,
        Query(query): Query<FlagReportQuery>,
    ) -> Result<Json<ApiResponse<FlagReportPage>>> {
        let page = ReportService::get_flag_reports(&state.db, query).await?;
        Ok(Json(ApiResponse::ok(page)))
    }

    pub async fn review_flag_report(
        State(state): State<AppState>,
        AdminCtx(admin): AdminCtx,
        Path(report_id): Path<String>,
        Json(payload): Json<ReviewFlagReportRequest>,
    ) -> Result<Json<ApiResponse<FlagReportView>>> {
        let report =
            ReportService::review_flag_report(&state.db, &admin.user_id, &report_id, payload)
                .await?;
        Ok(Json(ApiResponse::with_message("Report reviewed", report)))
    }

    pub async fn flagged_songs(
        State(state): State<AppState>,
        _admin: AdminCtx,
        Query(query): Query<PageQuery>,
    ) -> Result<Json<ApiResponse<FlaggedSongPage>>> {
        let mut page = ReportService::get_flagged_songs(&state.db, query).await?;
        sign_covers(&state.storage, &mut page.songs);
        Ok(Json(ApiResponse::ok(page)))
    }
}

/// Best-effort cleanup of objects stored for a request that failed later on.
async fn discard(storage: &StorageService, urls: &[String]) {
    for url in urls {
        if let Err(err) = storage.delete(url).await {
            tracing::warn!("Could not remove orphaned upload {}: {:?}", url, err);
        }
    }
}
