//! Category service.

use catalog_common::{AppError, AppResult, IdGenerator, Paginated, Pagination};
use catalog_db::{entities::category, repositories::CategoryRepository};
use serde::Deserialize;
use validator::Validate;

/// Category service for business logic.
#[derive(Clone)]
pub struct CategoryService {
    category_repo: CategoryRepository,
    id_gen: IdGenerator,
}

/// Input for creating a new category.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryInput {
    #[validate(length(min = 2, max = 100))]
    pub name: String,
}

/// Input for updating a category.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryInput {
    #[validate(length(min = 2, max = 100))]
    pub name: Option<String>,
}

impl CategoryService {
    /// Create a new category service.
    #[must_use]
    pub const fn new(category_repo: CategoryRepository) -> Self {
        Self {
            category_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new category with a generated secondary unique ID.
    pub async fn create(&self, input: CreateCategoryInput) -> AppResult<category::Model> {
        input.validate()?;

        if self
            .category_repo
            .find_by_name(&input.name)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Category with this name already exists".to_string(),
            ));
        }

        let category = self
            .category_repo
            .create(self.id_gen.generate(), input.name, self.id_gen.generate())
            .await?;

        tracing::info!(category_id = %category.id, "created category");

        Ok(category)
    }

    /// List categories, newest first.
    pub async fn list(&self, pagination: Pagination) -> AppResult<Paginated<category::Model>> {
        let pagination = pagination.normalized();

        let categories = self
            .category_repo
            .find_all(pagination.limit, pagination.offset())
            .await?;
        let total = self.category_repo.count().await?;

        Ok(Paginated::new(categories, total, &pagination))
    }

    /// List every category, ordered by name.
    pub async fn list_all(&self) -> AppResult<Vec<category::Model>> {
        self.category_repo.find_all_unpaged().await
    }

    /// Search categories by name, case-insensitive substring match.
    pub async fn search(
        &self,
        query: &str,
        pagination: Pagination,
    ) -> AppResult<Paginated<category::Model>> {
        let pagination = pagination.normalized();

        let categories = self
            .category_repo
            .search(query, pagination.limit, pagination.offset())
            .await?;
        let total = self.category_repo.count_search(query).await?;

        Ok(Paginated::new(categories, total, &pagination))
    }

    /// Get a category by ID.
    pub async fn get(&self, id: &str) -> AppResult<category::Model> {
        self.category_repo.get_by_id(id).await
    }

    /// Get a category by its secondary unique ID.
    pub async fn get_by_unique_id(&self, unique_id: &str) -> AppResult<category::Model> {
        self.category_repo
            .find_by_unique_id(unique_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Category with uniqueId {unique_id} not found"))
            })
    }

    /// Update a category.
    pub async fn update(&self, id: &str, input: UpdateCategoryInput) -> AppResult<category::Model> {
        input.validate()?;

        let category = self.category_repo.get_by_id(id).await?;

        if let Some(name) = &input.name
            && name != &category.name
            && self.category_repo.find_by_name(name).await?.is_some()
        {
            return Err(AppError::Conflict(
                "Category name is already taken".to_string(),
            ));
        }

        self.category_repo.update(id, input.name).await
    }

    /// Delete a category, returning a confirmation message.
    ///
    /// Products in the category are removed by the cascading foreign key.
    pub async fn delete(&self, id: &str) -> AppResult<String> {
        self.category_repo.get_by_id(id).await?;
        self.category_repo.delete(id).await?;

        tracing::info!(category_id = %id, "deleted category");

        Ok(format!("Category with ID {id} has been successfully deleted"))
    }
}
