//! Movie catalog endpoints. Public, read-only; catalog writes happen out
//! of band (seed data or an ingest job).

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{error, Instrument};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::{clamp_page, clamp_per_page};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub year: i32,
    pub genres: Vec<String>,
    pub synopsis: String,
    pub runtime_minutes: Option<i32>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MovieList {
    pub items: Vec<Movie>,
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
}

#[derive(IntoParams, Deserialize, Debug)]
pub struct MovieListQuery {
    /// 1-based page number.
    pub page: Option<i64>,
    /// Page size, 1 to 100.
    pub per_page: Option<i64>,
    /// Exact genre match.
    pub genre: Option<String>,
    /// Exact release year.
    pub year: Option<i32>,
    /// Case-insensitive title substring.
    pub search: Option<String>,
}

fn movie_from_row(row: &sqlx::postgres::PgRow) -> Movie {
    Movie {
        id: row.get("id"),
        title: row.get("title"),
        year: row.get("year"),
        genres: row.get("genres"),
        synopsis: row.get("synopsis"),
        runtime_minutes: row.get("runtime_minutes"),
    }
}

#[utoipa::path(
    get,
    path = "/v1/movies",
    params(MovieListQuery),
    responses(
        (status = 200, description = "Page of the movie catalog", body = MovieList)
    ),
    tag = "catalog"
)]
pub async fn list_movies(
    pool: Extension<PgPool>,
    Query(params): Query<MovieListQuery>,
) -> impl IntoResponse {
    let page = clamp_page(params.page);
    let per_page = clamp_per_page(params.per_page);
    let offset = (page - 1) * per_page;

    let genre = params
        .genre
        .as_deref()
        .map(str::trim)
        .filter(|genre| !genre.is_empty());
    let search = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|search| !search.is_empty());

    let query = r"
        SELECT id, title, year, genres, synopsis, runtime_minutes
        FROM movies
        WHERE ($1::TEXT IS NULL OR genres @> ARRAY[$1])
          AND ($2::INT IS NULL OR year = $2)
          AND ($3::TEXT IS NULL OR title ILIKE '%' || $3 || '%')
        ORDER BY year DESC, title ASC
        LIMIT $4 OFFSET $5
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(genre)
        .bind(params.year)
        .bind(search)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&pool.0)
        .instrument(span)
        .await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(err) => {
            error!("Failed to list movies: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list movies".to_string(),
            )
                .into_response();
        }
    };

    let query = r"
        SELECT COUNT(*) AS total
        FROM movies
        WHERE ($1::TEXT IS NULL OR genres @> ARRAY[$1])
          AND ($2::INT IS NULL OR year = $2)
          AND ($3::TEXT IS NULL OR title ILIKE '%' || $3 || '%')
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let total = sqlx::query(query)
        .bind(genre)
        .bind(params.year)
        .bind(search)
        .fetch_one(&pool.0)
        .instrument(span)
        .await;

    let total: i64 = match total {
        Ok(row) => row.get("total"),
        Err(err) => {
            error!("Failed to count movies: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list movies".to_string(),
            )
                .into_response();
        }
    };

    let items = rows.iter().map(movie_from_row).collect();
    (
        StatusCode::OK,
        Json(MovieList {
            items,
            page,
            per_page,
            total,
        }),
    )
        .into_response()
}

#[utoipa::path(
    get,
    path = "/v1/movies/{id}",
    params(("id" = Uuid, Path, description = "Movie id")),
    responses(
        (status = 200, description = "Movie detail", body = Movie),
        (status = 404, description = "Unknown movie", body = String)
    ),
    tag = "catalog"
)]
pub async fn get_movie(pool: Extension<PgPool>, Path(id): Path<Uuid>) -> impl IntoResponse {
    let query = r"
        SELECT id, title, year, genres, synopsis, runtime_minutes
        FROM movies
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    match sqlx::query(query)
        .bind(id)
        .fetch_optional(&pool.0)
        .instrument(span)
        .await
    {
        Ok(Some(row)) => (StatusCode::OK, Json(movie_from_row(&row))).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Movie not found".to_string()).into_response(),
        Err(err) => {
            error!("Failed to load movie: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load movie".to_string(),
            )
                .into_response()
        }
    }
}

/// True when the movie id exists; used before writing dependent rows.
pub(super) async fn movie_exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let query = "SELECT 1 FROM movies WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(id)
        .fetch_optional(pool)
        .instrument(span)
        .await?;
    Ok(row.is_some())
}
