use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::{error::Error, models::system::SignedFileQuery, AppState, Result};

pub struct FileController;

impl FileController {
    /// Serves `/files/{folder}/{name}` for links carrying a valid, unexpired signature.
    pub async fn serve(
        State(state): State<AppState>,
        Path(key): Path<String>,
        Query(query): Query<SignedFileQuery>,
        req: Request,
    ) -> Result<Response> {
        let (Some(expires), Some(signature)) = (query.expires, query.signature) else {
            return Err(Error::Forbidden {
                reason: "Missing link signature".to_string(),
            });
        };
        if !state.storage.verify(&key, expires, &signature) {
            return Err(Error::Forbidden {
                reason: "Invalid or expired link".to_string(),
            });
        }

        let path = state
            .storage
            .local_path(&key)
            .ok_or_else(|| Error::ResourceNotFound {
                message: "File not found".to_string(),
            })?;
        if !tokio::fs::try_exists(&path).await? {
            return Err(Error::ResourceNotFound {
                message: "File not found".to_string(),
            });
        }

        let res = match ServeFile::new(path).oneshot(req).await {
            Ok(res) => res,
            Err(never) => match never {},
        };
        Ok(res.map(Body::new).into_response())
    }
}
