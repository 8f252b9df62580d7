//! Product endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    routing::{get, patch, post},
};
use catalog_common::{AppError, AppResult, Paginated, generate_storage_key};
use catalog_core::{CreateProductInput, ListProductsQuery, ProductView, UpdateProductInput};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, MessageResponse},
};

/// Product fields sent as multipart text parts. Everything arrives as text;
/// typed fields are coerced while reading.
#[derive(Debug, Default)]
struct ProductForm {
    name: Option<String>,
    price: Option<f64>,
    category_id: Option<String>,
    image: Option<String>,
}

/// An image part carried alongside the form fields.
struct ImagePart {
    file_name: String,
    data: Vec<u8>,
}

/// Read product fields and the optional image from a multipart form.
async fn read_product_form(
    multipart: &mut Multipart,
) -> AppResult<(ProductForm, Option<ImagePart>)> {
    let mut form = ProductForm::default();
    let mut image: Option<ImagePart> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image" if field.file_name().is_some() => {
                let file_name = field
                    .file_name()
                    .map(std::string::ToString::to_string)
                    .unwrap_or_default();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
                    .to_vec();
                if !data.is_empty() {
                    image = Some(ImagePart { file_name, data });
                }
            }
            "name" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !text.is_empty() {
                    form.name = Some(text);
                }
            }
            "price" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !text.is_empty() {
                    form.price = Some(text.trim().parse().map_err(|_| {
                        AppError::Validation("Price must be a valid number".to_string())
                    })?);
                }
            }
            "category_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !text.is_empty() {
                    form.category_id = Some(text);
                }
            }
            "image" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                if !text.is_empty() {
                    form.image = Some(text);
                }
            }
            _ => {}
        }
    }

    Ok((form, image))
}

/// Persist an uploaded image and return its public URL.
async fn store_image(state: &AppState, image: ImagePart) -> AppResult<String> {
    let key = generate_storage_key("products", &image.file_name);
    let stored = state.storage.write(&key, &image.data).await?;
    Ok(stored.url)
}

/// Create a product.
async fn create(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> AppResult<ApiResponse<ProductView>> {
    let product = state.product_service.create(input).await?;
    Ok(ApiResponse::created(product))
}

/// Create a product from a multipart form with an optional image file.
async fn create_with_image(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<ProductView>> {
    let (form, image) = read_product_form(&mut multipart).await?;

    let mut input = CreateProductInput {
        name: form
            .name
            .ok_or_else(|| AppError::Validation("Product name is required".to_string()))?,
        price: form
            .price
            .ok_or_else(|| AppError::Validation("Price is required".to_string()))?,
        category_id: form
            .category_id
            .ok_or_else(|| AppError::Validation("Category ID is required".to_string()))?,
        image: form.image,
    };
    if let Some(image) = image {
        input.image = Some(store_image(&state, image).await?);
    }

    let product = state.product_service.create(input).await?;
    Ok(ApiResponse::created(product))
}

/// List products with optional search, category, and price sorting.
async fn list(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<ApiResponse<Paginated<ProductView>>> {
    let page = state.product_service.list(query).await?;
    Ok(ApiResponse::ok(page))
}

/// List products belonging to one category.
async fn list_by_category(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(category_id): Path<String>,
    Query(query): Query<ListProductsQuery>,
) -> AppResult<ApiResponse<Paginated<ProductView>>> {
    let page = state
        .product_service
        .list_by_category(&category_id, query)
        .await?;
    Ok(ApiResponse::ok(page))
}

/// Get one product by id.
async fn show(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ProductView>> {
    let product = state.product_service.get(&id).await?;
    Ok(ApiResponse::ok(product))
}

/// Get one product by its secondary unique id.
async fn show_by_unique_id(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(unique_id): Path<String>,
) -> AppResult<ApiResponse<ProductView>> {
    let product = state.product_service.get_by_unique_id(&unique_id).await?;
    Ok(ApiResponse::ok(product))
}

/// Update a product.
async fn update(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<ApiResponse<ProductView>> {
    let product = state.product_service.update(&id, input).await?;
    Ok(ApiResponse::ok(product))
}

/// Update a product from a multipart form, replacing its image when a file
/// part is present.
async fn update_with_image(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<ProductView>> {
    let (form, image) = read_product_form(&mut multipart).await?;

    let mut input = UpdateProductInput {
        name: form.name,
        price: form.price,
        category_id: form.category_id,
        image: form.image,
    };
    if let Some(image) = image {
        input.image = Some(store_image(&state, image).await?);
    }

    let product = state.product_service.update(&id, input).await?;
    Ok(ApiResponse::ok(product))
}

/// Delete a product.
async fn delete(
    AuthUser(_user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<MessageResponse>> {
    let message = state.product_service.delete(&id).await?;
    Ok(ApiResponse::ok(MessageResponse::new(message)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/upload", post(create_with_image))
        .route("/unique/{unique_id}", get(show_by_unique_id))
        .route("/category/{category_id}", get(list_by_category))
        .route("/{id}", get(show).patch(update).delete(delete))
        .route("/{id}/upload", patch(update_with_image))
}
