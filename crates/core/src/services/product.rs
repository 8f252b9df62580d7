//! Product service.

use catalog_common::{AppError, AppResult, IdGenerator, Paginated, Pagination, is_v4_uuid};
use catalog_db::{
    entities::{category, product},
    repositories::{CategoryRepository, NewProduct, ProductListQuery, ProductRepository},
};
use chrono::{DateTime, FixedOffset};
use sea_orm::Order;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Product service for business logic.
#[derive(Clone)]
pub struct ProductService {
    product_repo: ProductRepository,
    category_repo: CategoryRepository,
    id_gen: IdGenerator,
}

/// Input for creating a new product.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    #[validate(range(min = 0.0))]
    pub price: f64,

    #[validate(length(min = 1))]
    pub category_id: String,

    #[validate(length(max = 1024))]
    pub image: Option<String>,
}

/// Input for updating a product. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[validate(range(min = 0.0))]
    pub price: Option<f64>,

    #[validate(length(min = 1))]
    pub category_id: Option<String>,

    #[validate(length(max = 1024))]
    pub image: Option<String>,
}

/// Query parameters for the product listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ListProductsQuery {
    /// Case-insensitive substring match on product name.
    pub search: Option<String>,
    /// Exact category ID match.
    pub category_id: Option<String>,
    /// Case-insensitive substring match on category name.
    pub category_name: Option<String>,
    /// `asc` or `desc`; newest first when absent.
    pub sort_by_price: Option<String>,
    pub page: u64,
    pub limit: u64,
}

impl Default for ListProductsQuery {
    fn default() -> Self {
        let pagination = Pagination::default();
        Self {
            search: None,
            category_id: None,
            category_name: None,
            sort_by_price: None,
            page: pagination.page,
            limit: pagination.limit,
        }
    }
}

impl ListProductsQuery {
    const fn pagination(&self) -> Pagination {
        Pagination {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// A product as exposed by the API, with its category embedded.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub image: Option<String>,
    pub price: f64,
    pub unique_id: String,
    pub category_id: String,
    pub category: Option<category::Model>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<(product::Model, Option<category::Model>)> for ProductView {
    fn from((product, category): (product::Model, Option<category::Model>)) -> Self {
        Self {
            id: product.id,
            name: product.name,
            image: product.image,
            price: product.price,
            unique_id: product.unique_id,
            category_id: product.category_id,
            category,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

impl ProductService {
    /// Create a new product service.
    #[must_use]
    pub const fn new(product_repo: ProductRepository, category_repo: CategoryRepository) -> Self {
        Self {
            product_repo,
            category_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a new product in an existing category.
    pub async fn create(&self, input: CreateProductInput) -> AppResult<ProductView> {
        input.validate()?;
        check_category_id(&input.category_id)?;

        let category = self.category_repo.get_by_id(&input.category_id).await?;

        let product = self
            .product_repo
            .create(NewProduct {
                id: self.id_gen.generate(),
                name: input.name,
                image: input.image,
                price: input.price,
                unique_id: self.id_gen.generate(),
                category_id: input.category_id,
            })
            .await?;

        tracing::info!(product_id = %product.id, "created product");

        Ok((product, Some(category)).into())
    }

    /// List products matching the filters, paginated.
    pub async fn list(&self, query: ListProductsQuery) -> AppResult<Paginated<ProductView>> {
        if let Some(category_id) = &query.category_id {
            check_category_id(category_id)?;
        }
        let pagination = query.pagination().normalized();

        let list_query = ProductListQuery {
            search: query.search,
            category_id: query.category_id,
            category_name: query.category_name,
            sort_by_price: sort_order(query.sort_by_price.as_deref())?,
            limit: pagination.limit,
            offset: pagination.offset(),
        };

        let products = self.product_repo.find_filtered(&list_query).await?;
        let total = self.product_repo.count_filtered(&list_query).await?;

        Ok(Paginated::new(products, total, &pagination).map(ProductView::from))
    }

    /// List products in one category, verifying the category exists.
    pub async fn list_by_category(
        &self,
        category_id: &str,
        query: ListProductsQuery,
    ) -> AppResult<Paginated<ProductView>> {
        self.category_repo.get_by_id(category_id).await?;

        self.list(ListProductsQuery {
            category_id: Some(category_id.to_string()),
            ..query
        })
        .await
    }

    /// Get a product by ID.
    pub async fn get(&self, id: &str) -> AppResult<ProductView> {
        self.product_repo
            .get_with_category(id)
            .await
            .map(ProductView::from)
    }

    /// Get a product by its secondary unique ID.
    pub async fn get_by_unique_id(&self, unique_id: &str) -> AppResult<ProductView> {
        self.product_repo
            .find_by_unique_id(unique_id)
            .await?
            .map(ProductView::from)
            .ok_or_else(|| {
                AppError::NotFound(format!("Product with uniqueId {unique_id} not found"))
            })
    }

    /// Update a product, re-verifying the category when it changes.
    pub async fn update(&self, id: &str, input: UpdateProductInput) -> AppResult<ProductView> {
        input.validate()?;

        self.product_repo.get_by_id(id).await?;

        if let Some(category_id) = &input.category_id {
            check_category_id(category_id)?;
            self.category_repo.get_by_id(category_id).await?;
        }

        self.product_repo
            .update(id, input.name, input.image, input.price, input.category_id)
            .await?;

        self.product_repo
            .get_with_category(id)
            .await
            .map(ProductView::from)
    }

    /// Delete a product, returning a confirmation message.
    pub async fn delete(&self, id: &str) -> AppResult<String> {
        self.product_repo.get_by_id(id).await?;
        self.product_repo.delete(id).await?;

        tracing::info!(product_id = %id, "deleted product");

        Ok(format!("Product with ID {id} has been successfully deleted"))
    }
}

/// Category IDs arriving in request bodies and query strings must be v4
/// UUIDs; path parameters are not gated and miss with a 404 instead.
fn check_category_id(id: &str) -> AppResult<()> {
    if is_v4_uuid(id) {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid category ID".to_string()))
    }
}

/// Map a raw `sort_by_price` parameter to a sort order.
fn sort_order(raw: Option<&str>) -> AppResult<Option<Order>> {
    match raw.map(str::to_lowercase).as_deref() {
        None => Ok(None),
        Some("asc") => Ok(Some(Order::Asc)),
        Some("desc") => Ok(Some(Order::Desc)),
        Some(_) => Err(AppError::BadRequest(
            "sort_by_price must be either asc or desc".to_string(),
        )),
    }
}
