use super::test_util::prepare_db_and_test;
use crate::domain::todo::driven_ports::TodoWriter;
use crate::domain::todo::driving_ports::TodoPort;
use crate::domain::todo::{MutationOutcome, NewTodo, Ownership, Priority, RowScope, TodoService, UpdateTodo};
use crate::domain::user::UserIdentity;
use crate::identity::JwtTokenVerifier;
use crate::identity::test_util::{TEST_SECRET, issue_token};
use crate::persistence::ExternalConnectivity;
use crate::persistence::db_todo_driven_ports::{DbTodoReader, DbTodoWriter};
use crate::{SharedData, build_router, dto};
use axum::body::{self, Body};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use axum::http::{Method, Request, StatusCode};
use chrono::{Duration, Utc};
use speculoos::prelude::*;
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceExt;

fn new_todo(title: &str, priority: Priority) -> NewTodo {
    NewTodo {
        title: title.to_owned(),
        priority,
    }
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn created_todo_is_listed_for_its_owner_only() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let todo_service = TodoService::new(Ownership::MultiUser);
        let alice = UserIdentity::new("alice");
        let bob = UserIdentity::new("bob");

        let created = todo_service
            .create_todo(
                Some(&alice),
                &new_todo("  Buy milk ", Priority::Medium),
                &mut ext_cxn,
                &DbTodoWriter,
            )
            .await;
        assert_that!(created)
            .is_ok()
            .matches(|outcome| matches!(outcome, MutationOutcome::Created { .. }));

        let alices_todos = todo_service
            .list_todos(Some(&alice), &mut ext_cxn, &DbTodoReader)
            .await
            .expect("Listing alice's todos failed");
        assert_eq!(1, alices_todos.len());
        assert_eq!("Buy milk", alices_todos[0].title);
        assert_eq!(Priority::Medium, alices_todos[0].priority);
        assert_that!(alices_todos[0].owner_user_id)
            .is_some()
            .is_equal_to("alice".to_owned());

        let bobs_todos = todo_service
            .list_todos(Some(&bob), &mut ext_cxn, &DbTodoReader)
            .await
            .expect("Listing bob's todos failed");
        assert!(bobs_todos.is_empty());
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn soft_delete_hides_the_todo_but_keeps_the_row() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db.clone());
        let todo_service = TodoService::new(Ownership::MultiUser);
        let alice = UserIdentity::new("alice");

        let Ok(MutationOutcome::Created { id }) = todo_service
            .create_todo(
                Some(&alice),
                &new_todo("Buy milk", Priority::Low),
                &mut ext_cxn,
                &DbTodoWriter,
            )
            .await
        else {
            panic!("Todo should have been created");
        };

        let deleted = todo_service
            .delete_todo(Some(&alice), Some(id), &mut ext_cxn, &DbTodoWriter)
            .await;
        assert_that!(deleted)
            .is_ok()
            .is_equal_to(MutationOutcome::Applied { affected_rows: 1 });

        let listed = todo_service
            .list_todos(Some(&alice), &mut ext_cxn, &DbTodoReader)
            .await
            .expect("Listing failed");
        assert!(listed.is_empty());

        let still_there: (bool,) = sqlx::query_as("SELECT deleted FROM todos WHERE id = $1")
            .bind(id)
            .fetch_one(&db)
            .await
            .expect("Soft-deleted row should still exist");
        assert!(still_there.0);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn other_users_cannot_change_or_delete_a_todo() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let todo_service = TodoService::new(Ownership::MultiUser);
        let alice = UserIdentity::new("alice");
        let mallory = UserIdentity::new("mallory");

        let Ok(MutationOutcome::Created { id }) = todo_service
            .create_todo(
                Some(&alice),
                &new_todo("Buy milk", Priority::Low),
                &mut ext_cxn,
                &DbTodoWriter,
            )
            .await
        else {
            panic!("Todo should have been created");
        };

        let hijack = UpdateTodo {
            title: "Hacked".to_owned(),
            priority: Priority::High,
        };
        let updated = todo_service
            .update_todo(Some(&mallory), Some(id), &hijack, &mut ext_cxn, &DbTodoWriter)
            .await;
        assert_that!(updated)
            .is_ok()
            .is_equal_to(MutationOutcome::Applied { affected_rows: 0 });
        let deleted = todo_service
            .delete_todo(Some(&mallory), Some(id), &mut ext_cxn, &DbTodoWriter)
            .await;
        assert_that!(deleted)
            .is_ok()
            .is_equal_to(MutationOutcome::Applied { affected_rows: 0 });

        let alices_todos = todo_service
            .list_todos(Some(&alice), &mut ext_cxn, &DbTodoReader)
            .await
            .expect("Listing failed");
        assert_eq!(1, alices_todos.len());
        assert_eq!("Buy milk", alices_todos[0].title);
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn updated_at_never_moves_backwards() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let created_at = Utc::now();

        let id = DbTodoWriter
            .insert_todo(
                Some("alice"),
                &new_todo("Buy milk", Priority::Low),
                created_at,
                &mut ext_cxn,
            )
            .await
            .expect("Insert failed");
        let affected_rows = DbTodoWriter
            .update_todo(
                RowScope::OwnedBy("alice"),
                id,
                &UpdateTodo {
                    title: "Buy oat milk".to_owned(),
                    priority: Priority::Low,
                },
                created_at - Duration::hours(1),
                &mut ext_cxn,
            )
            .await
            .expect("Update failed");
        assert_eq!(1, affected_rows);

        let todos = TodoService::new(Ownership::MultiUser)
            .list_todos(Some(&UserIdentity::new("alice")), &mut ext_cxn, &DbTodoReader)
            .await
            .expect("Listing failed");
        assert_eq!("Buy oat milk", todos[0].title);
        // Postgres keeps microseconds, chrono keeps nanoseconds
        assert!(todos[0].updated_at >= created_at - Duration::microseconds(1));
    });
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn single_user_mode_shares_one_list() {
    prepare_db_and_test(|db| async move {
        let mut ext_cxn = ExternalConnectivity::new(db);
        let todo_service = TodoService::new(Ownership::SingleUser);

        let created = todo_service
            .create_todo(None, &new_todo("Water plants", Priority::High), &mut ext_cxn, &DbTodoWriter)
            .await;
        assert_that!(created).is_ok();

        let todos = todo_service
            .list_todos(Some(&UserIdentity::new("whoever")), &mut ext_cxn, &DbTodoReader)
            .await
            .expect("Listing failed");
        assert_eq!(1, todos.len());
        assert_that!(todos[0].owner_user_id).is_none();
    });
}

async fn page_text(router: &axum::Router, token: &str) -> String {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/todos")
                .header(COOKIE, format!("sb-access-token={token}"))
                .body(Body::empty())
                .expect("Could not build request"),
        )
        .await
        .expect("Router should always respond");
    assert_eq!(StatusCode::OK, response.status());

    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not read page body");
    String::from_utf8(bytes.to_vec()).expect("Page was not UTF-8")
}

fn router_for(db: PgPool) -> axum::Router {
    build_router(Arc::new(SharedData::new(
        ExternalConnectivity::new(db),
        TodoService::new(Ownership::MultiUser),
        Some(JwtTokenVerifier::new(TEST_SECRET)),
    )))
}

#[test]
#[cfg_attr(not(feature = "integration_test"), ignore)]
fn api_writes_show_up_on_the_rendered_page() {
    prepare_db_and_test(|db| async move {
        let router = router_for(db);
        let token = issue_token(TEST_SECRET, "alice");

        // Render once so there's a cached copy that the API write has to invalidate
        assert!(page_text(&router, &token).await.contains("No todos found."));

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/todos")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .header(CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title": "Buy milk", "priority": 2}"#))
                    .expect("Could not build request"),
            )
            .await
            .expect("Router should always respond");
        assert_eq!(StatusCode::CREATED, response.status());
        let receipt: dto::MutationReceipt =
            crate::api::test_util::deserialize_body(response.into_body()).await;
        let created_id = receipt.created_id.expect("Created todo should have an id");

        assert!(page_text(&router, &token).await.contains(r#"value="Buy milk""#));

        let response = router
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/todos/delete")
                    .header(COOKIE, format!("sb-access-token={token}"))
                    .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(format!("id={created_id}")))
                    .expect("Could not build request"),
            )
            .await
            .expect("Router should always respond");
        assert_eq!(StatusCode::SEE_OTHER, response.status());

        assert!(page_text(&router, &token).await.contains("No todos found."));
    });
}
