//! Per-viewer favorite movies. Add and remove are idempotent.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::{error, Instrument};
use uuid::Uuid;

use super::auth::{require_auth, types::AuthErrorBody, TokenSigner};
use super::movies::{movie_exists, Movie};

#[utoipa::path(
    put,
    path = "/v1/me/favorites/{movie_id}",
    params(("movie_id" = Uuid, Path, description = "Movie id")),
    responses(
        (status = 204, description = "Movie favorited"),
        (status = 401, description = "Authentication failure", body = AuthErrorBody),
        (status = 404, description = "Unknown movie", body = String)
    ),
    tag = "account"
)]
pub async fn add_favorite(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    signer: Extension<Arc<TokenSigner>>,
    Path(movie_id): Path<Uuid>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &signer).await {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    match movie_exists(&pool, movie_id).await {
        Ok(true) => {}
        Ok(false) => {
            return (StatusCode::NOT_FOUND, "Movie not found".to_string()).into_response()
        }
        Err(err) => {
            error!("Failed to check movie: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to favorite movie".to_string(),
            )
                .into_response();
        }
    }

    let query = r"
        INSERT INTO favorites (account_id, movie_id)
        VALUES ($1, $2)
        ON CONFLICT (account_id, movie_id) DO NOTHING
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
        .execute(&pool.0)
        .instrument(span)
        .await
    {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            error!("Failed to favorite movie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to favorite movie".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path = "/v1/me/favorites/{movie_id}",
    params(("movie_id" = Uuid, Path, description = "Movie id")),
    responses(
        (status = 204, description = "Favorite removed (or never existed)"),
        (status = 401, description = "Authentication failure", body = AuthErrorBody)
    ),
    tag = "account"
)]
pub async fn remove_favorite(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    signer: Extension<Arc<TokenSigner>>,
    Path(movie_id): Path<Uuid>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &signer).await {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let query = "DELETE FROM favorites WHERE account_id = $1 AND movie_id = $2";
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
            error!("Failed to remove favorite: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to remove favorite".to_string(),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/me/favorites",
    responses(
        (status = 200, description = "The caller's favorite movies, newest first", body = [Movie]),
        (status = 401, description = "Authentication failure", body = AuthErrorBody)
    ),
    tag = "account"
)]
pub async fn list_favorites(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    signer: Extension<Arc<TokenSigner>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &signer).await {
        Ok(principal) => principal,
        Err(response) => return response,
    };

    let query = r"
        SELECT movies.id, movies.title, movies.year, movies.genres,
               movies.synopsis, movies.runtime_minutes
        FROM favorites
        JOIN movies ON movies.id = favorites.movie_id
        WHERE favorites.account_id = $1
        ORDER BY favorites.created_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    match sqlx::query(query)
        .bind(principal.account_id)
        .fetch_all(&pool.0)
        .instrument(span)
        .await
    {
        Ok(rows) => {
            let movies: Vec<Movie> = rows
                .iter()
                .map(|row| Movie {
                    id: row.get("id"),
                    title: row.get("title"),
                    year: row.get("year"),
                    genres: row.get("genres"),
                    synopsis: row.get("synopsis"),
                    runtime_minutes: row.get("runtime_minutes"),
                })
                .collect();
            (StatusCode::OK, Json(movies)).into_response()
        }
        Err(err) => {
            error!("Failed to list favorites: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list favorites".to_string(),
            )
                .into_response()
        }
    }
}
