//! Category repository.

use std::sync::Arc;

use catalog_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
    sea_query::{Expr, Func},
};

use crate::entities::{Category, category};

/// Category repository for database operations.
#[derive(Clone)]
pub struct CategoryRepository {
    db: Arc<DatabaseConnection>,
}

impl CategoryRepository {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a category by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<category::Model>> {
        Category::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a category by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<category::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category with ID {id} not found")))
    }

    /// Find a category by its secondary unique ID.
    pub async fn find_by_unique_id(&self, unique_id: &str) -> AppResult<Option<category::Model>> {
        Category::find()
            .filter(category::Column::UniqueId.eq(unique_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a category by exact name.
    pub async fn find_by_name(&self, name: &str) -> AppResult<Option<category::Model>> {
        Category::find()
            .filter(category::Column::Name.eq(name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find all categories paginated, newest first.
    pub async fn find_all(&self, limit: u64, offset: u64) -> AppResult<Vec<category::Model>> {
        Category::find()
            .order_by_desc(category::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find every category, ordered by name.
    ///
    /// Used by the bulk upload row processor, which resolves category names
    /// against one snapshot of this list per job.
    pub async fn find_all_unpaged(&self) -> AppResult<Vec<category::Model>> {
        Category::find()
            .order_by_asc(category::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Search categories by name, case-insensitive substring match.
    pub async fn search(
        &self,
        query: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<category::Model>> {
        Category::find()
            .filter(
                Expr::expr(Func::lower(Expr::col((
                    category::Entity,
                    category::Column::Name,
                ))))
                .like(format!("%{}%", query.to_lowercase())),
            )
            .order_by_asc(category::Column::Name)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count categories matching a name search.
    pub async fn count_search(&self, query: &str) -> AppResult<u64> {
        Category::find()
            .filter(
                Expr::expr(Func::lower(Expr::col((
                    category::Entity,
                    category::Column::Name,
                ))))
                .like(format!("%{}%", query.to_lowercase())),
            )
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count all categories.
    pub async fn count(&self) -> AppResult<u64> {
        Category::find()
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new category.
    pub async fn create(
        &self,
        id: String,
        name: String,
        unique_id: String,
    ) -> AppResult<category::Model> {
        let now = Utc::now().fixed_offset();

        let model = category::ActiveModel {
            id: Set(id),
            name: Set(name),
            unique_id: Set(unique_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a category name.
    pub async fn update(&self, id: &str, name: Option<String>) -> AppResult<category::Model> {
        let category = self.get_by_id(id).await?;
        let mut active: category::ActiveModel = category.into();

        if let Some(name) = name {
            active.name = Set(name);
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a category.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Category::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|_| ())
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
