//! Per-viewer movie reviews. One review per account and movie, enforced
//! by a unique index and written as an upsert.

use axum::{
    extract::{Extension, Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{error, Instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::auth::{require_auth, types::AuthErrorBody, TokenSigner};
use super::movies::movie_exists;
use super::{clamp_page, clamp_per_page};

const RATING_MIN: i32 = 1;
const RATING_MAX: i32 = 10;
const BODY_MAX_LENGTH: usize = 4000;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ReviewRequest {
    /// Rating from 1 to 10.
    pub rating: i32,
    pub body: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Review {
    pub id: Uuid,
    pub movie_id: Uuid,
    pub rating: i32,
    pub body: Option<String>,
    pub reviewer: String,
    pub created_at_unix: i64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ReviewList {
    pub items: Vec<Review>,
    pub page: i64,
    pub per_page: i64,
}

#[derive(IntoParams, Deserialize, Debug)]
pub struct ReviewListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[utoipa::path(
    put,
    path = "/v1/movies/{id}/review",
    request_body = ReviewRequest,
    params(("id" = Uuid, Path, description = "Movie id")),
    responses(
        (status = 204, description = "Review stored"),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Authentication failure", body = AuthErrorBody),
        (status = 404, description = "Unknown movie", body = String)
    ),
    tag = "catalog"
)]
pub async fn upsert_review(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    signer: Extension<Arc<TokenSigner>>,
    Path(movie_id): Path<Uuid>,
    payload: Option<Json<ReviewRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &signer).await {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let request: ReviewRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    if !(RATING_MIN..=RATING_MAX).contains(&request.rating) {
        return (
            StatusCode::BAD_REQUEST,
            format!("Rating must be between {RATING_MIN} and {RATING_MAX}"),
        )
            .into_response();
    }

    let body = request
        .body
        .as_deref()
        .map(str::trim)
        .filter(|body| !body.is_empty());
    if body.is_some_and(|body| body.chars().count() > BODY_MAX_LENGTH) {
        return (StatusCode::BAD_REQUEST, "Review body too long".to_string()).into_response();
    }

    match movie_exists(&pool, movie_id).await {
        Ok(true) => {}
        Ok(false) => {
            return (StatusCode::NOT_FOUND, "Movie not found".to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to check movie: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store review".to_string(),
            )
                .into_response();
        }
    }

    let query = r"
        INSERT INTO reviews (account_id, movie_id, rating, body)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (account_id, movie_id)
        DO UPDATE SET rating = EXCLUDED.rating,
                      body = EXCLUDED.body,
                      updated_at = NOW()
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    match sqlx::query(query)
        .bind(principal.account_id)
        .bind(movie_id)
        .bind(request.rating)
        .bind(body)
        .execute(&pool.0)
        .instrument(span)
        .await
    {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to store review: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to store review".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/movies/{id}/reviews",
    params(("id" = Uuid, Path, description = "Movie id"), ReviewListQuery),
    responses(
        (status = 200, description = "Reviews for a movie, newest first", body = ReviewList),
        (status = 404, description = "Unknown movie", body = String)
    ),
    tag = "catalog"
)]
pub async fn list_reviews(
    pool: Extension<PgPool>,
    Path(movie_id): Path<Uuid>,
    Query(params): Query<ReviewListQuery>,
) -> impl IntoResponse {
    match movie_exists(&pool, movie_id).await {
        Ok(true) => {}
        Ok(false) => {
            return (StatusCode::NOT_FOUND, "Movie not found".to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to check movie: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list reviews".to_string(),
            )
                .into_response();
        }
    }

    let page = clamp_page(params.page);
    let per_page = clamp_per_page(params.per_page);
    let offset = (page - 1) * per_page;

    let query = r"
        SELECT reviews.id, reviews.movie_id, reviews.rating, reviews.body,
               accounts.name AS reviewer,
               EXTRACT(EPOCH FROM reviews.created_at)::BIGINT AS created_at_unix
        FROM reviews
        JOIN accounts ON accounts.id = reviews.account_id
        WHERE reviews.movie_id = $1
        ORDER BY reviews.created_at DESC
        LIMIT $2 OFFSET $3
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    match sqlx::query(query)
        .bind(movie_id)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&pool.0)
        .instrument(span)
        .await
    {
        Ok(rows) => {
            let items = rows
                .iter()
                .map(|row| Review {
                    id: row.get("id"),
                    movie_id: row.get("movie_id"),
                    rating: row.get("rating"),
                    body: row.get("body"),
                    reviewer: row.get("reviewer"),
                    created_at_unix: row.get("created_at_unix"),
                })
                .collect();
            (
                StatusCode::OK,
                Json(ReviewList {
                    items,
                    page,
                    per_page,
                }),
            )
                .into_response()
        }
        Err(err) => {
            error!("Failed to list reviews: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list reviews".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/v1/movies/{id}/review",
    params(("id" = Uuid, Path, description = "Movie id")),
    responses(
        (status = 204, description = "Review removed (or never existed)"),
        (status = 401, description = "Authentication failure", body = AuthErrorBody)
    ),
    tag = "catalog"
)]
pub async fn delete_review(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    signer: Extension<Arc<TokenSigner>>,
    Path(movie_id): Path<Uuid>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &signer).await {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    // Idempotent; deleting a review that is not there is still a 204.
    let query = "DELETE FROM reviews WHERE account_id = $1 AND movie_id = $2";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "DELETE",
        db.statement = query
    );
    match sqlx::query(query)
        .bind(principal.account_id)
        .bind(movie_id)
        .execute(&pool.0)
        .instrument(span)
        .await
    {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to delete review: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete review".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds_match_policy() {
        assert_eq!(RATING_MIN, 1);
        assert_eq!(RATING_MAX, 10);
        assert!(!(RATING_MIN..=RATING_MAX).contains(&0));
        assert!(!(RATING_MIN..=RATING_MAX).contains(&11));
    }
}
