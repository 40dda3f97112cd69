use std::sync::Arc;

use axum::{
    extract::{rejection::PathRejection, FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use biblio_authz::{Authority, CurrentUser};
use biblio_http::AppError;
use maud::Markup;

use super::{
    catalog::{Catalog, OwnedChange},
    models::NewBookForm,
    views,
};

#[derive(Clone)]
pub struct BooksState {
    pub catalog: Catalog,
    pub authority: Arc<Authority>,
}

impl FromRef<BooksState> for Arc<Authority> {
    fn from_ref(state: &BooksState) -> Self {
        state.authority.clone()
    }
}

pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/add-book", get(add_book_form).post(add_book))
        .route("/mark-read/{book_id}", get(mark_read))
        .route("/delete-book/{book_id}", get(delete_book))
        .with_state(state)
}

async fn index(
    CurrentUser(user): CurrentUser,
    State(state): State<BooksState>,
) -> Result<Markup, AppError> {
    let books = state.catalog.list(&user.fs_uniquifier).await?;
    Ok(views::index_page(&user.email, &books))
}

async fn add_book_form(CurrentUser(user): CurrentUser) -> Markup {
    views::add_book_page(&user.email, "", "", &[])
}

async fn add_book(
    CurrentUser(user): CurrentUser,
    State(state): State<BooksState>,
    Form(form): Form<NewBookForm>,
) -> Result<Response, AppError> {
    let new_book = match form.validate() {
        Ok(book) => book,
        Err(errors) => {
            let page = views::add_book_page(&user.email, &form.title, &form.author, &errors);
            return Ok((StatusCode::BAD_REQUEST, page).into_response());
        }
    };

    let book = state.catalog.add(&user.fs_uniquifier, &new_book).await?;
    tracing::info!(book_id = book.id, user_id = user.id, "book added");
    Ok(Redirect::to("/").into_response())
}

// Paths that don't carry an integer id don't name a book.
fn book_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::not_found("book not found"))
}

async fn mark_read(
    CurrentUser(user): CurrentUser,
    State(state): State<BooksState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Redirect, AppError> {
    let id = book_id(path)?;
    match state.catalog.toggle_read(&user.fs_uniquifier, id).await? {
        OwnedChange::Applied => tracing::info!(book_id = id, user_id = user.id, "read state toggled"),
        OwnedChange::NotOwner => {
            tracing::warn!(book_id = id, user_id = user.id, "ignoring toggle of a book owned by another user")
        }
    }
    Ok(Redirect::to("/"))
}

async fn delete_book(
    CurrentUser(user): CurrentUser,
    State(state): State<BooksState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Redirect, AppError> {
    let id = book_id(path)?;
    match state.catalog.delete(&user.fs_uniquifier, id).await? {
        OwnedChange::Applied => tracing::info!(book_id = id, user_id = user.id, "book deleted"),
        OwnedChange::NotOwner => {
            tracing::warn!(book_id = id, user_id = user.id, "ignoring delete of a book owned by another user")
        }
    }
    Ok(Redirect::to("/"))
}
