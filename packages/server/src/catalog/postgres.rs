use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr,
};

use super::{CatalogError, ImageCatalog, ImageRecord, NewImage};
use crate::entity::image;

/// Catalog backed by the `images` table.
#[derive(Clone)]
pub struct SeaOrmCatalog {
    db: DatabaseConnection,
}

impl SeaOrmCatalog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ImageCatalog for SeaOrmCatalog {
    async fn count_by_hash(&self, hash: &str) -> Result<u64, CatalogError> {
        Ok(image::Entity::find()
            .filter(image::Column::Hash.eq(hash))
            .count(&self.db)
            .await?)
    }

    async fn insert(&self, new_image: NewImage) -> Result<i32, CatalogError> {
        let hash = new_image.hash.clone();
        let model = image::ActiveModel {
            name: Set(new_image.name),
            path: Set(new_image.path),
            hash: Set(new_image.hash),
            size: Set(new_image.size),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let result = image::Entity::insert(model)
            .on_conflict(
                OnConflict::column(image::Column::Hash)
                    .do_nothing()
                    .to_owned(),
            )
            .exec(&self.db)
            .await;

        match result {
            Ok(res) => Ok(res.last_insert_id),
            Err(DbErr::RecordNotInserted) => Err(CatalogError::Duplicate(hash)),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(CatalogError::Duplicate(hash))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_all(&self) -> Result<Vec<ImageRecord>, CatalogError> {
        let rows = image::Entity::find()
            .order_by_asc(image::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(ImageRecord::from).collect())
    }

    async fn list_page(&self, offset: u64, limit: u64) -> Result<Vec<ImageRecord>, CatalogError> {
        let rows = image::Entity::find()
            .order_by_asc(image::Column::Id)
            .offset(Some(offset))
            .limit(Some(limit))
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().map(ImageRecord::from).collect())
    }

    async fn count(&self) -> Result<u64, CatalogError> {
        Ok(image::Entity::find().count(&self.db).await?)
    }

    async fn get(&self, id: i32) -> Result<ImageRecord, CatalogError> {
        image::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(ImageRecord::from)
            .ok_or(CatalogError::NotFound(id))
    }

    async fn delete(&self, id: i32) -> Result<bool, CatalogError> {
        let res = image::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(res.rows_affected > 0)
    }

    async fn all_paths(&self) -> Result<Vec<String>, CatalogError> {
        Ok(image::Entity::find()
            .select_only()
            .column(image::Column::Path)
            .into_tuple::<String>()
            .all(&self.db)
            .await?)
    }
}
