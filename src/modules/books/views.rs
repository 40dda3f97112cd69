use biblio_http::page::{error_list, layout};
use maud::{html, Markup};

use super::models::{Book, MAX_FIELD_LENGTH};

pub fn index_page(viewer: &str, books: &[Book]) -> Markup {
    layout(
        "My books",
        Some(viewer),
        html! {
            @if books.is_empty() {
                p.empty { "No books yet. " a href="/add-book" { "Add your first one." } }
            } @else {
                table {
                    thead {
                        tr {
                            th { "Title" }
                            th { "Author" }
                            th { "Status" }
                            th { "Actions" }
                        }
                    }
                    tbody {
                        @for book in books {
                            tr.read[book.read] id={ "book-" (book.id) } {
                                td.title { (book.title) }
                                td.author { (book.author) }
                                td.status { @if book.read { "Read" } @else { "Unread" } }
                                td.actions {
                                    a href={ "/mark-read/" (book.id) } {
                                        @if book.read { "Mark unread" } @else { "Mark read" }
                                    }
                                    " · "
                                    a href={ "/delete-book/" (book.id) } { "Delete" }
                                }
                            }
                        }
                    }
                }
            }
            p { a href="/add-book" { "Add book" } }
        },
    )
}

pub fn add_book_page(viewer: &str, title: &str, author: &str, errors: &[String]) -> Markup {
    layout(
        "Add book",
        Some(viewer),
        html! {
            (error_list(errors))
            form method="post" action="/add-book" {
                label {
                    "Title "
                    input type="text" name="title" value=(title) required maxlength=(MAX_FIELD_LENGTH);
                }
                label {
                    "Author "
                    input type="text" name="author" value=(author) required maxlength=(MAX_FIELD_LENGTH);
                }
                button type="submit" { "Add" }
            }
        },
    )
}
