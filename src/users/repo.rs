use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    extract::BaseUrl,
    store::{filter, Collection, DocumentStore, Filter, Sort},
    timestamp::{self, fixed_utc},
    AppError, AppResult,
};

pub const COLLECTION: &str = "users";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "publicID")]
    pub public_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(with = "fixed_utc")]
    pub created: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    #[serde(with = "fixed_utc")]
    pub created: OffsetDateTime,
    pub url: String,
}

impl User {
    pub fn path(&self) -> String {
        format!("/users/{}", self.public_id)
    }

    pub fn into_view(self, base: &BaseUrl) -> UserView {
        UserView {
            url: base.join(&self.path()),
            id: self.public_id,
            name: self.name,
            created: self.created,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    users: Collection,
}

impl UserRepository {
    pub async fn new(store: &DocumentStore) -> AppResult<Self> {
        let users = store.collection(COLLECTION)?;
        users.ensure_unique_index("publicID").await?;
        Ok(Self { users })
    }

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let users = self
            .users
            .find_as(&Filter::new(), Some(&Sort::descending("created")))
            .await?;
        Ok(users)
    }

    pub async fn count_users(&self) -> AppResult<u64> {
        Ok(self.users.count(&Filter::new()).await?)
    }

    pub async fn get_user(&self, public_id: &str) -> AppResult<User> {
        self.users
            .find_as::<User>(&filter([("publicID", public_id)]), None)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AppError::not_found(format!("user {public_id}")))
    }

    pub async fn create_user(&self, name: &str) -> AppResult<User> {
        let user = User {
            public_id: Uuid::now_v7().to_string(),
            name: name.to_owned(),
            created: timestamp::now(),
        };
        self.users.insert_as(&user).await?;

        tracing::info!(user = %user.public_id, name = %user.name, "created user");
        Ok(user)
    }

    pub async fn delete_user(&self, public_id: &str) -> AppResult<()> {
        let removed = self.users.remove(&filter([("publicID", public_id)])).await?;
        tracing::info!(user = public_id, removed, "deleted user");
        Ok(())
    }
}
