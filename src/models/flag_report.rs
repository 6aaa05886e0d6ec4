use serde::{Deserialize, Serialize};
use surrealdb::sql::{Datetime, Thing};

use crate::helpers::thing_helpers::{opt_thing_to_id, thing_to_id};
use crate::models::pagination::PaginationInfo;
use crate::models::song::SongView;
use crate::models::user::UserSummary;

#[derive(strum_macros::AsRefStr, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FlagReason {
    InappropriateContent,
    CopyrightInfringement,
    Spam,
    Harassment,
    Other,
}

#[derive(strum_macros::AsRefStr, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Dismissed,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FlagReportRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,
    pub song: Thing,
    pub reported_by: Thing,
    pub reason: FlagReason,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub reviewed_by: Option<Thing>,
    pub reviewed_at: Option<Datetime>,
    pub review_notes: Option<String>,
    pub created_at: Datetime,
    pub updated_at: Datetime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagReportView {
    pub id: String,
    pub song_id: String,
    pub reported_by_id: String,
    pub reason: FlagReason,
    pub description: Option<String>,
    pub status: ReportStatus,
    pub reviewed_by_id: Option<String>,
    pub reviewed_at: Option<Datetime>,
    pub review_notes: Option<String>,
    pub song: Option<SongView>,
    pub reported_by: Option<UserSummary>,
    pub reviewed_by: Option<UserSummary>,
    pub created_at: Datetime,
}

impl FlagReportView {
    pub fn from_record(report: FlagReportRecord) -> Self {
        Self {
            id: opt_thing_to_id(&report.id),
            song_id: thing_to_id(&report.song),
            reported_by_id: thing_to_id(&report.reported_by),
            reason: report.reason,
            description: report.description,
            status: report.status,
            reviewed_by_id: report.reviewed_by.as_ref().map(thing_to_id),
            reviewed_at: report.reviewed_at,
            review_notes: report.review_notes,
            song: None,
            reported_by: None,
            reviewed_by: None,
            created_at: report.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateFlagReportRequest {
    pub reason: FlagReason,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFlagReportRequest {
    pub status: ReportStatus,
    pub review_notes: Option<String>,
    #[serde(default)]
    pub flag_song: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct FlagReportQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<ReportStatus>,
}

#[derive(Debug, Serialize)]
pub struct FlagReportPage {
    pub reports: Vec<FlagReportView>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Serialize)]
pub struct FlaggedSongPage {
    pub songs: Vec<SongView>,
    pub pagination: PaginationInfo,
}
