use std::collections::HashMap;

use serde::Deserialize;
use surrealdb::sql::Thing;
use surrealdb::{engine::any::Any, Surreal};

use crate::error::Result;
use crate::helpers::db_helpers::EMBEDDING_DIMENSION;
use crate::helpers::thing_helpers::{opt_thing_to_id, thing_to_id};
use crate::models::song::{
    BackfillReport, LyricsMatch, LyricsSearchMethod, LyricsSearchResponse, SongRecord,
};
use crate::services::song_service::SongService;
use crate::services::vector_service::{cosine_similarity, VectorService};

pub const DEFAULT_LYRICS_LIMIT: usize = 10;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.7;
const MAX_LYRICS_LIMIT: usize = 50;
/// HNSW search breadth for the KNN operator.
const KNN_EF: usize = 64;

#[derive(Debug, Deserialize)]
struct ScoredId {
    id: Thing,
    score: f32,
}

pub struct LyricsService;

impl LyricsService {
    /// Semantic lyrics search. Tries the vector index, then a full cosine
    /// scan, then plain text matching; the response names the tier used.
    pub async fn search(
        db: &Surreal<Any>,
        vectors: &VectorService,
        query: &str,
        limit: Option<usize>,
        threshold: Option<f32>,
    ) -> Result<LyricsSearchResponse> {
        let limit = limit.unwrap_or(DEFAULT_LYRICS_LIMIT).clamp(1, MAX_LYRICS_LIMIT);
        let threshold = threshold.unwrap_or(DEFAULT_SIMILARITY_THRESHOLD).clamp(-1.0, 1.0);
        let query = query.trim().to_string();

        let embedding = if vectors.is_available() {
            vectors
                .generate_embedding(&query)
                .await
                .filter(|e| e.len() == EMBEDDING_DIMENSION)
        } else {
            None
        };

        if let Some(embedding) = embedding {
            match Self::vector_index_search(db, &embedding, limit, threshold).await {
                Ok(results) => {
                    return Self::respond(db, query, LyricsSearchMethod::VectorIndex, results).await
                }
                Err(e) => tracing::warn!("Vector index search failed, scanning instead: {:?}", e),
            }

            match Self::cosine_scan(db, &embedding, limit, threshold).await {
                Ok(results) => {
                    return Self::respond(db, query, LyricsSearchMethod::CosineScan, results).await
                }
                Err(e) => tracing::warn!("Cosine scan failed, falling back to text search: {:?}", e),
            }
        }

        let results = Self::text_search(db, &query, limit)
            .await?
            .into_iter()
            .map(|song| (song, None))
            .collect();
        Self::respond(db, query, LyricsSearchMethod::TextMatch, results).await
    }

    async fn respond(
        db: &Surreal<Any>,
        query: String,
        search_method: LyricsSearchMethod,
        scored: Vec<(SongRecord, Option<f32>)>,
    ) -> Result<LyricsSearchResponse> {
        tracing::debug!(
            "Lyrics search '{}' answered by {} with {} results",
            query,
            search_method.as_ref(),
            scored.len()
        );

        let (songs, scores): (Vec<SongRecord>, Vec<Option<f32>>) = scored.into_iter().unzip();
        let views = SongService::populate(db, songs).await?;
        let results = views
            .into_iter()
            .zip(scores)
            .map(|(song, score)| LyricsMatch { song, score })
            .collect();

        Ok(LyricsSearchResponse {
            query,
            search_method,
            results,
        })
    }

    /// KNN over the HNSW index. Visibility is filtered afterwards since
    /// the index operator only ranks by distance.
    async fn vector_index_search(
        db: &Surreal<Any>,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<(SongRecord, Option<f32>)>> {
        let candidates = limit * 4;
        let hits: Vec<ScoredId> = db
            .query(format!(
                "SELECT id, vector::similarity::cosine(lyrics_embedding, $embedding) AS score \
                 FROM song WHERE lyrics_embedding <|{candidates},{KNN_EF}|> $embedding \
                 ORDER BY score DESC"
            ))
            .bind(("embedding", embedding.to_vec()))
            .await?
            .take(0)?;

        let hits: Vec<ScoredId> = hits.into_iter().filter(|h| h.score >= threshold).collect();
        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Thing> = hits.iter().map(|h| h.id.clone()).collect();
        let songs: Vec<SongRecord> = db
            .query(
                "SELECT * OMIT lyrics_embedding FROM song \
                 WHERE id IN $ids AND visibility = 'PUBLIC' AND is_flagged = false",
            )
            .bind(("ids", ids))
            .await?
            .take(0)?;
        let mut by_id: HashMap<String, SongRecord> = songs
            .into_iter()
            .map(|s| (opt_thing_to_id(&s.id), s))
            .collect();

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                by_id
                    .remove(&thing_to_id(&hit.id))
                    .map(|song| (song, Some(hit.score)))
            })
            .take(limit)
            .collect())
    }

    /// Linear scan over every embedded public song.
    async fn cosine_scan(
        db: &Surreal<Any>,
        embedding: &[f32],
        limit: usize,
        threshold: f32,
    ) -> Result<Vec<(SongRecord, Option<f32>)>> {
        let songs: Vec<SongRecord> = db
            .query(
                "SELECT * FROM song WHERE lyrics_embedding != NONE \
                 AND visibility = 'PUBLIC' AND is_flagged = false",
            )
            .await?
            .take(0)?;

        let mut scored = Vec::new();
        for mut song in songs {
            let Some(song_embedding) = song.lyrics_embedding.take() else {
                continue;
            };
            match cosine_similarity(embedding, &song_embedding) {
                Ok(score) if score >= threshold => scored.push((song, score)),
                Ok(_) => {}
                Err(e) => tracing::debug!(
                    "Skipping song {} in cosine scan: {:?}",
                    opt_thing_to_id(&song.id),
                    e
                ),
            }
        }

        Ok(rank(scored, limit)
            .into_iter()
            .map(|(song, score)| (song, Some(score)))
            .collect())
    }

    /// Case-insensitive substring match over lyrics and title.
    async fn text_search(db: &Surreal<Any>, query: &str, limit: usize) -> Result<Vec<SongRecord>> {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let songs: Vec<SongRecord> = db
            .query(
                "SELECT * OMIT lyrics_embedding FROM song \
                 WHERE visibility = 'PUBLIC' AND is_flagged = false \
                 AND (string::lowercase(lyrics ?? '') CONTAINS $needle \
                 OR string::lowercase(title) CONTAINS $needle) \
                 ORDER BY play_count DESC LIMIT $limit",
            )
            .bind(("needle", needle))
            .bind(("limit", limit))
            .await?
            .take(0)?;
        Ok(songs)
    }

    /// Document embedding for a song's lyrics, if they can be embedded.
    pub async fn embed_lyrics(vectors: &VectorService, lyrics: Option<&str>) -> Option<Vec<f32>> {
        let lyrics = lyrics.map(str::trim).filter(|l| !l.is_empty())?;
        if !vectors.is_available() {
            return None;
        }

        vectors
            .generate_document_embedding(lyrics)
            .await
            .filter(|e| {
                let fits = e.len() == EMBEDDING_DIMENSION;
                if !fits {
                    tracing::warn!("Discarding embedding with {} dimensions", e.len());
                }
                fits
            })
    }

    /// Embeds every song that has lyrics but no vector yet.
    pub async fn backfill_embeddings(
        db: &Surreal<Any>,
        vectors: &VectorService,
    ) -> Result<BackfillReport> {
        #[derive(Deserialize)]
        struct PendingLyrics {
            id: Thing,
            lyrics: String,
        }

        let pending: Vec<PendingLyrics> = db
            .query(
                "SELECT id, lyrics FROM song \
                 WHERE lyrics != NONE AND lyrics != '' AND lyrics_embedding = NONE",
            )
            .await?
            .take(0)?;

        let mut report = BackfillReport {
            processed: pending.len(),
            embedded: 0,
            skipped: 0,
        };
        if !vectors.is_available() {
            report.skipped = pending.len();
            return Ok(report);
        }

        for song in &pending {
            match Self::embed_lyrics(vectors, Some(&song.lyrics)).await {
                Some(embedding) => {
                    db.query("UPDATE $song SET lyrics_embedding = $embedding RETURN NONE")
                        .bind(("song", song.id.clone()))
                        .bind(("embedding", embedding))
                        .await?
                        .check()?;
                    report.embedded += 1;
                }
                None => report.skipped += 1,
            }
        }

        tracing::info!(
            "Embedding backfill: {} processed, {} embedded, {} skipped",
            report.processed,
            report.embedded,
            report.skipped
        );
        Ok(report)
    }
}

/// Highest scores first, at most `limit` entries.
fn rank<T>(mut scored: Vec<(T, f32)>, limit: usize) -> Vec<(T, f32)> {
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::db_helpers::setup_test_db;
    use crate::helpers::song_helpers::insert_test_song;
    use crate::helpers::thing_helpers::create_song_thing;
    use crate::helpers::user_helpers::insert_test_user;
    use crate::models::song::Visibility;

    fn axis(index: usize, weight: f32) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIMENSION];
        v[index] = 1.0;
        v[(index + 1) % EMBEDDING_DIMENSION] = weight;
        v
    }

    async fn song_with(
        db: &Surreal<Any>,
        owner: &str,
        title: &str,
        lyrics: &str,
        embedding: Option<Vec<f32>>,
        visibility: Visibility,
    ) -> String {
        let id = insert_test_song(db, owner, title, visibility).await;
        db.query("UPDATE $song SET lyrics = $lyrics, lyrics_embedding = $embedding")
            .bind(("song", create_song_thing(&id)))
            .bind(("lyrics", lyrics.to_string()))
            .bind(("embedding", embedding))
            .await
            .unwrap();
        id
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let ranked = rank(vec![("a", 0.71), ("b", 0.95), ("c", 0.8)], 2);
        assert_eq!(ranked, vec![("b", 0.95), ("c", 0.8)]);
    }

    #[tokio::test]
    async fn test_cosine_scan_threshold_and_visibility() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "poet").await;
        song_with(&db, &owner, "Close", "ocean waves", Some(axis(0, 0.1)), Visibility::Public).await;
        song_with(&db, &owner, "Closer", "ocean tide", Some(axis(0, 0.0)), Visibility::Public).await;
        song_with(&db, &owner, "Far", "desert sand", Some(axis(5, 0.0)), Visibility::Public).await;
        song_with(&db, &owner, "Hidden", "ocean deep", Some(axis(0, 0.0)), Visibility::Private).await;

        let results = LyricsService::cosine_scan(&db, &axis(0, 0.0), 10, 0.7).await.unwrap();
        let titles: Vec<&str> = results.iter().map(|(s, _)| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Closer", "Close"]);
        assert!(results.iter().all(|(s, _)| s.lyrics_embedding.is_none()));
        assert!(results[0].1.unwrap() > 0.99);
    }

    #[tokio::test]
    async fn test_vector_index_threshold_visibility_and_limit() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "indexer").await;
        song_with(&db, &owner, "Hidden", "ocean deep", Some(axis(0, 0.0)), Visibility::Private).await;
        song_with(&db, &owner, "Near", "ocean waves", Some(axis(0, 0.05)), Visibility::Public).await;
        song_with(&db, &owner, "Nearby", "ocean tide", Some(axis(0, 0.3)), Visibility::Public).await;
        song_with(&db, &owner, "Far", "desert sand", Some(axis(5, 0.0)), Visibility::Public).await;

        let query = axis(0, 0.0);
        let results = LyricsService::vector_index_search(&db, &query, 10, 0.7).await.unwrap();
        let titles: Vec<&str> = results.iter().map(|(s, _)| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Near", "Nearby"]);
        assert!(results.iter().all(|(_, score)| score.unwrap() >= 0.7));

        let top = LyricsService::vector_index_search(&db, &query, 1, 0.7).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].0.title, "Near");

        let strict = LyricsService::vector_index_search(&db, &query, 10, 0.99).await.unwrap();
        let titles: Vec<&str> = strict.iter().map(|(s, _)| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Near"]);
    }

    #[tokio::test]
    async fn test_text_fallback_without_embedding_service() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "writer").await;
        song_with(&db, &owner, "Rain", "Falling RAIN on my window", None, Visibility::Public).await;
        song_with(&db, &owner, "Sun", "bright and warm", None, Visibility::Public).await;
        song_with(&db, &owner, "Storm", "rain again", None, Visibility::Private).await;

        let vectors = VectorService::new(reqwest::Client::new(), None);
        let res = LyricsService::search(&db, &vectors, "  rain ", None, None).await.unwrap();

        assert_eq!(res.search_method, LyricsSearchMethod::TextMatch);
        assert_eq!(res.query, "rain");
        assert_eq!(res.results.len(), 1);
        assert_eq!(res.results[0].song.title, "Rain");
        assert!(res.results[0].score.is_none());
    }

    #[tokio::test]
    async fn test_backfill_without_service_skips_everything() {
        let db = setup_test_db().await;
        let owner = insert_test_user(&db, "archivist").await;
        song_with(&db, &owner, "Old", "old lyrics here", None, Visibility::Public).await;
        insert_test_song(&db, &owner, "Instrumental", Visibility::Public).await;

        let vectors = VectorService::new(reqwest::Client::new(), None);
        let report = LyricsService::backfill_embeddings(&db, &vectors).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.embedded, 0);
        assert_eq!(report.skipped, 1);
        assert!(LyricsService::embed_lyrics(&vectors, Some("words")).await.is_none());
    }
}
