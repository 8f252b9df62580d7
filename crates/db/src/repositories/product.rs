//! Product repository.

use std::sync::Arc;

use catalog_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, JoinType, Order,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    sea_query::{Expr, Func},
};

use crate::entities::{Category, Product, category, product};

/// Fields for a product row to insert.
#[derive(Debug, Clone)]
pub struct NewProduct {
    /// Primary key.
    pub id: String,
    /// Product name.
    pub name: String,
    /// Image URL or path.
    pub image: Option<String>,
    /// Unit price.
    pub price: f64,
    /// Secondary unique identifier.
    pub unique_id: String,
    /// Owning category ID.
    pub category_id: String,
}

/// Filters for the paginated product listing.
#[derive(Debug, Clone, Default)]
pub struct ProductListQuery {
    /// Case-insensitive substring match on product name.
    pub search: Option<String>,
    /// Exact category ID match.
    pub category_id: Option<String>,
    /// Case-insensitive substring match on category name.
    pub category_name: Option<String>,
    /// Price ordering; defaults to newest first when absent.
    pub sort_by_price: Option<Order>,
    /// Page size.
    pub limit: u64,
    /// Rows to skip.
    pub offset: u64,
}

/// Filters for report exports. All bounds are optional and combined with AND.
#[derive(Debug, Clone, Default)]
pub struct ReportFilterQuery {
    /// Exact category ID match.
    pub category_id: Option<String>,
    /// Case-insensitive substring match on category name.
    pub category_name: Option<String>,
    /// Minimum price, inclusive.
    pub min_price: Option<f64>,
    /// Maximum price, inclusive.
    pub max_price: Option<f64>,
    /// Earliest creation time, inclusive.
    pub start_date: Option<chrono::DateTime<chrono::FixedOffset>>,
    /// Latest creation time, inclusive.
    pub end_date: Option<chrono::DateTime<chrono::FixedOffset>>,
}

/// Product repository for database operations.
#[derive(Clone)]
pub struct ProductRepository {
    db: Arc<DatabaseConnection>,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a product by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<product::Model>> {
        Product::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a product by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<product::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product with ID {id} not found")))
    }

    /// Find a product with its category by ID.
    pub async fn find_with_category(
        &self,
        id: &str,
    ) -> AppResult<Option<(product::Model, Option<category::Model>)>> {
        Product::find_by_id(id)
            .find_also_related(Category)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a product with its category by ID, returning an error if not found.
    pub async fn get_with_category(
        &self,
        id: &str,
    ) -> AppResult<(product::Model, Option<category::Model>)> {
        self.find_with_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product with ID {id} not found")))
    }

    /// Find a product with its category by secondary unique ID.
    pub async fn find_by_unique_id(
        &self,
        unique_id: &str,
    ) -> AppResult<Option<(product::Model, Option<category::Model>)>> {
        Product::find()
            .filter(product::Column::UniqueId.eq(unique_id))
            .find_also_related(Category)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find products matching the listing filters, with their categories.
    pub async fn find_filtered(
        &self,
        query: &ProductListQuery,
    ) -> AppResult<Vec<(product::Model, Option<category::Model>)>> {
        let mut select = Product::find()
            .find_also_related(Category)
            .filter(Self::list_condition(query));

        select = match &query.sort_by_price {
            Some(order) => select.order_by(product::Column::Price, order.clone()),
            None => select.order_by_desc(product::Column::CreatedAt),
        };

        select
            .offset(query.offset)
            .limit(query.limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count products matching the listing filters.
    pub async fn count_filtered(&self, query: &ProductListQuery) -> AppResult<u64> {
        Product::find()
            .join(JoinType::LeftJoin, product::Relation::Category.def())
            .filter(Self::list_condition(query))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find every product matching the report filters, newest first.
    pub async fn find_for_report(
        &self,
        filters: &ReportFilterQuery,
    ) -> AppResult<Vec<(product::Model, Option<category::Model>)>> {
        Product::find()
            .find_also_related(Category)
            .filter(Self::report_condition(filters))
            .order_by_desc(product::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new product.
    pub async fn create(&self, new: NewProduct) -> AppResult<product::Model> {
        let now = Utc::now().fixed_offset();

        let model = product::ActiveModel {
            id: Set(new.id),
            name: Set(new.name),
            image: Set(new.image),
            price: Set(new.price),
            unique_id: Set(new.unique_id),
            category_id: Set(new.category_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a batch of products in one statement.
    ///
    /// An empty batch is a no-op.
    pub async fn insert_batch(&self, products: Vec<NewProduct>) -> AppResult<()> {
        if products.is_empty() {
            return Ok(());
        }

        let now = Utc::now().fixed_offset();
        let models = products.into_iter().map(|new| product::ActiveModel {
            id: Set(new.id),
            name: Set(new.name),
            image: Set(new.image),
            price: Set(new.price),
            unique_id: Set(new.unique_id),
            category_id: Set(new.category_id),
            created_at: Set(now),
            updated_at: Set(now),
        });

        Product::insert_many(models)
            .exec(self.db.as_ref())
            .await
            .map(|_| ())
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a product. Only provided fields are changed.
    pub async fn update(
        &self,
        id: &str,
        name: Option<String>,
        image: Option<String>,
        price: Option<f64>,
        category_id: Option<String>,
    ) -> AppResult<product::Model> {
        let product = self.get_by_id(id).await?;
        let mut active: product::ActiveModel = product.into();

        if let Some(name) = name {
            active.name = Set(name);
        }
        if let Some(image) = image {
            active.image = Set(Some(image));
        }
        if let Some(price) = price {
            active.price = Set(price);
        }
        if let Some(category_id) = category_id {
            active.category_id = Set(category_id);
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        active
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a product.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        Product::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map(|_| ())
            .map_err(|e| AppError::Database(e.to_string()))
    }

    fn list_condition(query: &ProductListQuery) -> Condition {
        let mut condition = Condition::all();

        if let Some(search) = &query.search {
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col((
                    product::Entity,
                    product::Column::Name,
                ))))
                .like(format!("%{}%", search.to_lowercase())),
            );
        }
        if let Some(category_id) = &query.category_id {
            condition = condition.add(product::Column::CategoryId.eq(category_id));
        }
        if let Some(category_name) = &query.category_name {
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col((
                    category::Entity,
                    category::Column::Name,
                ))))
                .like(format!("%{}%", category_name.to_lowercase())),
            );
        }

        condition
    }

    fn report_condition(filters: &ReportFilterQuery) -> Condition {
        let mut condition = Condition::all();

        if let Some(category_id) = &filters.category_id {
            condition = condition.add(product::Column::CategoryId.eq(category_id));
        }
        if let Some(category_name) = &filters.category_name {
            condition = condition.add(
                Expr::expr(Func::lower(Expr::col((
                    category::Entity,
                    category::Column::Name,
                ))))
                .like(format!("%{}%", category_name.to_lowercase())),
            );
        }

        condition = match (filters.min_price, filters.max_price) {
            (Some(min), Some(max)) => condition.add(product::Column::Price.between(min, max)),
            (Some(min), None) => condition.add(product::Column::Price.gte(min)),
            (None, Some(max)) => condition.add(product::Column::Price.lte(max)),
            (None, None) => condition,
        };

        condition = match (filters.start_date, filters.end_date) {
            (Some(start), Some(end)) => {
                condition.add(product::Column::CreatedAt.between(start, end))
            }
            (Some(start), None) => condition.add(product::Column::CreatedAt.gte(start)),
            (None, Some(end)) => condition.add(product::Column::CreatedAt.lte(end)),
            (None, None) => condition,
        };

        condition
    }
}
