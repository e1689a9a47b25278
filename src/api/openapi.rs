//! OpenAPI document for the HTTP surface.
//!
//! Handlers register here via their `#[utoipa::path]` annotations; the
//! document is served by Swagger UI and at `/api-docs/openapi.json`.
//! Routes like `/` stay intentionally undocumented.

use utoipa::OpenApi;

use super::handlers::{auth, favorites, health, me, movies, reviews};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::register::register,
        auth::login::login,
        auth::reset::forgot_password,
        auth::reset::reset_password,
        movies::list_movies,
        movies::get_movie,
        reviews::list_reviews,
        reviews::upsert_review,
        reviews::delete_review,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        me::me,
        me::remove,
    ),
    components(schemas(
        health::Health,
        auth::types::RegisterRequest,
        auth::types::LoginRequest,
        auth::types::LoginResponse,
        auth::types::Profile,
        auth::types::ForgotPasswordRequest,
        auth::types::ResetPasswordRequest,
        auth::types::DeleteAccountRequest,
        auth::types::AuthErrorBody,
        movies::Movie,
        movies::MovieList,
        reviews::Review,
        reviews::ReviewList,
        reviews::ReviewRequest,
    )),
    tags(
        (name = "auth", description = "Registration, login, and password reset"),
        (name = "catalog", description = "Movie catalog and reviews"),
        (name = "account", description = "Profile and favorites of the authenticated viewer"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = ApiDoc::openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "auth"));
        assert!(tags.iter().any(|tag| tag.name == "catalog"));

        let paths = &spec.paths.paths;
        assert!(paths.contains_key("/v1/auth/login"));
        assert!(paths.contains_key("/v1/auth/forgot-password"));
        assert!(paths.contains_key("/v1/movies/{id}"));
        assert!(paths.contains_key("/v1/movies/{id}/review"));
        assert!(paths.contains_key("/v1/me/favorites/{movie_id}"));
        assert!(paths.contains_key("/v1/me"));
    }
}
