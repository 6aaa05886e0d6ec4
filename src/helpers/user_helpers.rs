use std::collections::HashMap;

use surrealdb::{engine::any::Any, sql::Thing, Surreal};

use crate::error::{Error, Result};
use crate::helpers::thing_helpers::{create_user_thing, opt_thing_to_id};
use crate::models::user::{UserRecord, UserSummary};

pub async fn get_user(db: &Surreal<Any>, user_id: &str) -> Result<UserRecord> {
    let user: Option<UserRecord> = db
        .query("SELECT * FROM $user")
        .bind(("user", create_user_thing(user_id)))
        .await?
        .take(0)?;
    user.ok_or_else(|| Error::UserNotFound {
        id: user_id.to_string(),
    })
}

pub async fn user_exists(db: &Surreal<Any>, user_id: &str) -> Result<bool> {
    match get_user(db, user_id).await {
        Ok(_) => Ok(true),
        Err(Error::UserNotFound { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Loads the users referenced by `ids`, keyed by bare id.
pub async fn fetch_user_summaries(
    db: &Surreal<Any>,
    mut ids: Vec<Thing>,
) -> Result<HashMap<String, UserSummary>> {
    ids.sort_by_key(|t| t.to_string());
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let users: Vec<UserRecord> = db
        .query("SELECT * FROM user WHERE id IN $ids")
        .bind(("ids", ids))
        .await?
        .take(0)?;

    Ok(users
        .iter()
        .map(|u| (opt_thing_to_id(&u.id), UserSummary::from(u)))
        .collect())
}

#[cfg(test)]
pub async fn insert_test_user(db: &Surreal<Any>, username: &str) -> String {
    use crate::models::user::{Role, UserStatus};
    use chrono::Utc;

    let now: surrealdb::sql::Datetime = Utc::now().into();
    let created: Option<UserRecord> = db
        .create("user")
        .content(UserRecord {
            id: None,
            email: format!("{username}@example.com"),
            username: username.to_string(),
            password: "hashed".to_string(),
            name: None,
            phone: None,
            address: None,
            bio: None,
            profile_picture: None,
            account_type: "LOCAL".to_string(),
            role: Role::User,
            status: UserStatus::Active,
            is_active: true,
            code_id: None,
            code_expired: None,
            created_at: now.clone(),
            updated_at: now,
        })
        .await
        .unwrap();
    opt_thing_to_id(&created.unwrap().id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::db_helpers::setup_test_db;

    #[tokio::test]
    async fn test_get_user_and_summaries() {
        let db = setup_test_db().await;
        let ana = insert_test_user(&db, "ana").await;
        let bo = insert_test_user(&db, "bo").await;

        assert_eq!(get_user(&db, &ana).await.unwrap().username, "ana");
        assert!(user_exists(&db, &bo).await.unwrap());
        assert!(!user_exists(&db, "missing").await.unwrap());

        let map = fetch_user_summaries(
            &db,
            vec![create_user_thing(&ana), create_user_thing(&bo), create_user_thing(&ana)],
        )
        .await
        .unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map[&bo].username, "bo");
    }
}
