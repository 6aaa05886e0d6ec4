use std::collections::HashMap;

use chrono::Utc;
use surrealdb::sql::Thing;
use surrealdb::{engine::any::Any, Surreal};

use crate::error::{Error, Result};
use crate::helpers::db_helpers::take_count;
use crate::helpers::song_helpers::get_song;
use crate::helpers::thing_helpers::{
    create_song_thing, create_thing, create_user_thing, thing_to_id,
};
use crate::helpers::user_helpers::fetch_user_summaries;
use crate::models::flag_report::{
    CreateFlagReportRequest, FlagReportPage, FlagReportQuery, FlagReportRecord, FlagReportView,
    FlaggedSongPage, ReportStatus, ReviewFlagReportRequest,
};
use crate::models::pagination::{offset, PageQuery, PaginationInfo};
use crate::models::song::{SongRecord, SongView};
use crate::services::song_service::SongService;
use crate::validators::text_validator::ensure_optional_max_len;

const MAX_REPORT_TEXT_LEN: usize = 500;
const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

pub struct ReportService;

impl ReportService {
    /// One report per user and song.
    pub async fn report_song(
        db: &Surreal<Any>,
        user_id: &str,
        song_id: &str,
        req: CreateFlagReportRequest,
    ) -> Result<FlagReportView> {
        ensure_optional_max_len("description", req.description.as_deref(), MAX_REPORT_TEXT_LEN)?;
        get_song(db, song_id).await?;

        let song = create_song_thing(song_id);
        let reporter = create_user_thing(user_id);

        let mut res = db
            .query(
                "SELECT count() AS total FROM flag_report \
                 WHERE song = $song AND reported_by = $reporter GROUP ALL",
            )
            .bind(("song", song.clone()))
            .bind(("reporter", reporter.clone()))
            .await?;
        if take_count(&mut res, 0)? > 0 {
            return Err(Error::Conflict {
                message: "You have already reported this song".to_string(),
            });
        }

        let now = Utc::now();
        let created: Option<FlagReportRecord> = db
            .create("flag_report")
            .content(FlagReportRecord {
                id: None,
                song,
                reported_by: reporter,
                reason: req.reason,
                description: req.description,
                status: ReportStatus::Pending,
                reviewed_by: None,
                reviewed_at: None,
                review_notes: None,
                created_at: now.into(),
                updated_at: now.into(),
            })
            .await?;

        let report = created.ok_or_else(|| Error::DbError("Could not create report".into()))?;
        tracing::info!(
            "User {} reported song {} for {}",
            user_id,
            song_id,
            report.reason.as_ref()
        );
        Ok(FlagReportView::from_record(report))
    }

    /// Reports newest first, optionally filtered by status.
    pub async fn get_flag_reports(
        db: &Surreal<Any>,
        query: FlagReportQuery,
    ) -> Result<FlagReportPage> {
        let (page, limit) = PageQuery {
            page: query.page,
            limit: query.limit,
        }
        .resolve(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);

        let filter = if query.status.is_some() {
            "WHERE status = $status"
        } else {
            ""
        };

        let mut res = db
            .query(format!(
                "SELECT count() AS total FROM flag_report {filter} GROUP ALL"
            ))
            .query(format!(
                "SELECT * FROM flag_report {filter} ORDER BY created_at DESC LIMIT $limit START $start"
            ))
            .bind(("status", query.status))
            .bind(("limit", limit))
            .bind(("start", offset(page, limit)))
            .await?;

        let total = take_count(&mut res, 0)?;
        let records: Vec<FlagReportRecord> = res.take(1)?;

        Ok(FlagReportPage {
            reports: Self::populate(db, records).await?,
            pagination: PaginationInfo::new(page, limit, total),
        })
    }

    /// Closes a report; `flag_song` also hides the reported song.
    pub async fn review_flag_report(
        db: &Surreal<Any>,
        reviewer_id: &str,
        report_id: &str,
        req: ReviewFlagReportRequest,
    ) -> Result<FlagReportView> {
        if req.status == ReportStatus::Pending {
            return Err(Error::InvalidInput {
                reason: "Review status must be REVIEWED or DISMISSED".to_string(),
            });
        }
        ensure_optional_max_len("reviewNotes", req.review_notes.as_deref(), MAX_REPORT_TEXT_LEN)?;

        let report_thing = create_thing("flag_report", report_id);
        let updated: Option<FlagReportRecord> = db
            .query(
                "UPDATE $report SET status = $status, reviewed_by = $reviewer, \
                 reviewed_at = time::now(), review_notes = $notes, updated_at = time::now() \
                 RETURN AFTER",
            )
            .bind(("report", report_thing))
            .bind(("status", req.status))
            .bind(("reviewer", create_user_thing(reviewer_id)))
            .bind(("notes", req.review_notes))
            .await?
            .take(0)?;

        let report = updated.ok_or_else(|| Error::ResourceNotFound {
            message: "Flag report not found".to_string(),
        })?;

        if req.flag_song {
            SongService::set_flag(db, &thing_to_id(&report.song), true).await?;
        }

        tracing::info!(
            "Report {} marked {} by {}",
            report_id,
            req.status.as_ref(),
            reviewer_id
        );
        Self::populate(db, vec![report])
            .await?
            .pop()
            .ok_or_else(|| Error::ResourceNotFound {
                message: "Flag report not found".to_string(),
            })
    }

    /// Flagged songs, most recently changed first.
    pub async fn get_flagged_songs(db: &Surreal<Any>, query: PageQuery) -> Result<FlaggedSongPage> {
        let (page, limit) = query.resolve(DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);

        let mut res = db
            .query("SELECT count() AS total FROM song WHERE is_flagged = true GROUP ALL")
            .query(
                "SELECT * OMIT lyrics_embedding FROM song WHERE is_flagged = true \
                 ORDER BY updated_at DESC LIMIT $limit START $start",
            )
            .bind(("limit", limit))
            .bind(("start", offset(page, limit)))
            .await?;

        let total = take_count(&mut res, 0)?;
        let songs: Vec<SongRecord> = res.take(1)?;

        Ok(FlaggedSongPage {
            songs: SongService::populate(db, songs).await?,
            pagination: PaginationInfo::new(page, limit, total),
        })
    }

    async fn populate(
        db: &Surreal<Any>,
        records: Vec<FlagReportRecord>,
    ) -> Result<Vec<FlagReportView>> {
        let mut people: Vec<Thing> = records.iter().map(|r| r.reported_by.clone()).collect();
        people.extend(records.iter().filter_map(|r| r.reviewed_by.clone()));
        let users = fetch_user_summaries(db, people).await?;

        let song_ids: Vec<Thing> = records.iter().map(|r| r.song.clone()).collect();
        let songs: Vec<SongRecord> = if song_ids.is_empty() {
            Vec::new()
        } else {
            db.query("SELECT * OMIT lyrics_embedding FROM song WHERE id IN $ids")
                .bind(("ids", song_ids))
                .await?
                .take(0)?
        };
        let songs: HashMap<String, SongView> = SongService::populate(db, songs)
            .await?
            .into_iter()
            .map(|s| (s.id.clone(), s))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| {
                let song = songs.get(&thing_to_id(&record.song)).cloned();
                let reported_by = users.get(&thing_to_id(&record.reported_by)).cloned();
                let reviewed_by = record
                    .reviewed_by
                    .as_ref()
                    .and_then(|r| users.get(&thing_to_id(r)).cloned());

                let mut view = FlagReportView::from_record(record);
                view.song = song;
                view.reported_by = reported_by;
                view.reviewed_by = reviewed_by;
                view
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::db_helpers::setup_test_db;
    use crate::helpers::song_helpers::insert_test_song;
    use crate::helpers::user_helpers::insert_test_user;
    use crate::models::flag_report::FlagReason;
    use crate::models::song::Visibility;

    fn report(reason: FlagReason) -> CreateFlagReportRequest {
        CreateFlagReportRequest {
            reason,
            description: Some("not ok".to_string()),
        }
    }

    #[tokio::test]
    async fn test_report_once_per_user() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "uploader").await;
        let reporter = insert_test_user(&db, "reporter").await;
        let song = insert_test_song(&db, &owner, "Loud", Visibility::Public).await;

        let created = ReportService::report_song(&db, &reporter, &song, report(FlagReason::Spam))
            .await
            .unwrap();
        assert_eq!(created.status, ReportStatus::Pending);

        let again =
            ReportService::report_song(&db, &reporter, &song, report(FlagReason::Other)).await;
        match again {
            Err(Error::Conflict { message }) => {
                assert_eq!(message, "You have already reported this song")
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        let missing =
            ReportService::report_song(&db, &reporter, "ghost", report(FlagReason::Spam)).await;
        assert!(matches!(missing, Err(Error::SongNotFound { .. })));

        let too_long = CreateFlagReportRequest {
            reason: FlagReason::Other,
            description: Some("x".repeat(501)),
        };
        assert!(matches!(
            ReportService::report_song(&db, &owner, &song, too_long).await,
            Err(Error::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_review_flags_song_and_filters() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "artist").await;
        let reporter = insert_test_user(&db, "critic").await;
        let admin = insert_test_user(&db, "moderator").await;
        let song = insert_test_song(&db, &owner, "Offensive", Visibility::Public).await;

        let created =
            ReportService::report_song(&db, &reporter, &song, report(FlagReason::Harassment))
                .await
                .unwrap();

        let pending = ReportService::get_flag_reports(
            &db,
            FlagReportQuery {
                status: Some(ReportStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(pending.pagination.total_items, 1);
        assert_eq!(pending.reports[0].reported_by.as_ref().unwrap().username, "critic");
        assert_eq!(pending.reports[0].song.as_ref().unwrap().title, "Offensive");

        let reviewed = ReportService::review_flag_report(
            &db,
            &admin,
            &created.id,
            ReviewFlagReportRequest {
                status: ReportStatus::Reviewed,
                review_notes: Some("confirmed".to_string()),
                flag_song: true,
            },
        )
        .await
        .unwrap();
        assert_eq!(reviewed.status, ReportStatus::Reviewed);
        assert_eq!(reviewed.reviewed_by.as_ref().unwrap().username, "moderator");

        let flagged = ReportService::get_flagged_songs(&db, PageQuery::default()).await.unwrap();
        assert_eq!(flagged.songs.len(), 1);
        assert!(flagged.songs[0].is_flagged);

        let pending = ReportService::get_flag_reports(
            &db,
            FlagReportQuery {
                status: Some(ReportStatus::Pending),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(pending.pagination.total_items, 0);

        let bad = ReportService::review_flag_report(
            &db,
            &admin,
            &created.id,
            ReviewFlagReportRequest {
                status: ReportStatus::Pending,
                review_notes: None,
                flag_song: false,
            },
        )
        .await;
        assert!(matches!(bad, Err(Error::InvalidInput { .. })));
    }
}
