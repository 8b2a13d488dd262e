use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One uploaded image. The blob itself lives in the blob store under `path`.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Original upload filename.
    pub name: String,

    /// Blob location relative to the storage root.
    pub path: String,

    /// SHA-256 content hash. Unique: the catalog holds one row per content.
    #[sea_orm(unique)]
    pub hash: String,

    pub size: i64,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
