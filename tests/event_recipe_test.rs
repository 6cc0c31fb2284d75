use std::sync::Arc;

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method, Request, StatusCode,
    },
    Router,
};
use chrono::NaiveDate;
use eventplate::api;
use eventplate::models::event::NewEvent;
use eventplate::models::recipe::AddRecipe;
use eventplate::repositories::{EventRepository, RecipeRepository, StoreError};
use eventplate::services::StaticIdentityProvider;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower::ServiceExt;

const ALICE: &str = "token-alice";
const BOB: &str = "token-bob";

fn app(pool: PgPool) -> Router {
    let identity = StaticIdentityProvider::new([(ALICE, "alice"), (BOB, "bob")]);
    api::build_router(pool, Arc::new(identity))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }

    let body = match body {
        Some(value) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, value)
}

async fn send_raw(app: &Router, uri: &str, token: &str, body: &'static str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {}", token))
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn insert_event_with_id(pool: &PgPool, id: i64, user_id: &str) {
    sqlx::query("INSERT INTO events (id, user_id, title, date) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(user_id)
        .bind("Sunday lunch")
        .bind(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
        .execute(pool)
        .await
        .unwrap();
}

async fn create_event(app: &Router, token: &str, title: &str, date: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/events",
        Some(token),
        Some(json!({"title": title, "date": date})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

fn corba() -> Value {
    json!({"idMeal": "52977", "strMeal": "Corba"})
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_attach_same_recipe_twice_conflicts(pool: PgPool) {
    insert_event_with_id(&pool, 10, "alice").await;
    let app = app(pool.clone());

    let (status, body) = send(&app, Method::POST, "/events/10/recipes", Some(ALICE), Some(corba())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["recipes"].as_array().unwrap().len(), 1);
    assert_eq!(body["recipes"][0]["idMeal"], "52977");

    let (status, body) = send(&app, Method::POST, "/events/10/recipes", Some(ALICE), Some(corba())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());

    let recipes = RecipeRepository::new(&pool).list_for_event(10).await.unwrap();
    assert_eq!(recipes.len(), 1);
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_unique_constraint_backs_conflict(pool: PgPool) {
    insert_event_with_id(&pool, 10, "alice").await;

    let body: AddRecipe = serde_json::from_value(corba()).unwrap();
    let recipe = body.into_new_recipe(10, "alice").unwrap();

    let repo = RecipeRepository::new(&pool);
    repo.insert(&recipe).await.unwrap();

    let second = repo.insert(&recipe).await;
    assert!(matches!(second, Err(StoreError::Conflict { event_id: 10, .. })));
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_custom_recipes_do_not_collide(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, ALICE, "Potluck", "2025-08-02").await;
    let uri = format!("/events/{}/recipes", event_id);

    for title in ["Aunt May's pie", "Uncle Ben's rice"] {
        let (status, _) = send(
            &app,
            Method::POST,
            &uri,
            Some(ALICE),
            Some(json!({"title": title, "isCustom": true, "ingredients": "Love"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, body) = send(&app, Method::GET, &format!("/events/{}", event_id), Some(ALICE), None).await;
    let recipes = body["recipes"].as_array().unwrap();
    assert_eq!(recipes.len(), 2);
    assert_eq!(recipes[0]["isCustom"], true);
    assert_eq!(recipes[0]["ingredients"], "Love");
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_delete_event_removes_recipes(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, ALICE, "Dinner party", "2025-09-12").await;
    let uri = format!("/events/{}/recipes", event_id);

    send(&app, Method::POST, &uri, Some(ALICE), Some(corba())).await;
    let (_, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(ALICE),
        Some(json!({"idMeal": 52978, "strMeal": "Kumpir"})),
    )
    .await;

    let recipe_ids: Vec<i64> = body["recipes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(recipe_ids.len(), 2);

    let (status, _) = send(&app, Method::DELETE, &format!("/events/{}", event_id), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (remaining,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM event_recipes WHERE id = ANY($1)")
            .bind(&recipe_ids)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(remaining, 0);

    let (status, _) = send(&app, Method::GET, &format!("/events/{}", event_id), Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_add_recipe_to_foreign_event_is_not_found(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, BOB, "Bob's barbecue", "2025-07-19").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/events/{}/recipes", event_id),
        Some(ALICE),
        Some(corba()),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Event not found");

    let recipes = RecipeRepository::new(&pool).list_for_event(event_id).await.unwrap();
    assert!(recipes.is_empty());
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_add_recipe_validation(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, ALICE, "Brunch", "2025-05-04").await;
    let uri = format!("/events/{}/recipes", event_id);

    let (status, _) = send(&app, Method::POST, &uri, Some(ALICE), Some(json!({"strMeal": "Corba"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, &uri, Some(ALICE), Some(json!({"idMeal": "52977"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let recipes = RecipeRepository::new(&pool).list_for_event(event_id).await.unwrap();
    assert!(recipes.is_empty());
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_imported_payload_round_trips_through_sidecar(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, ALICE, "Italian night", "2025-10-10").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/events/{}/recipes", event_id),
        Some(ALICE),
        Some(json!({
            "idMeal": "52982",
            "strMeal": "Spaghetti alla Carbonara",
            "meal_data": {
                "idMeal": "52982",
                "strMeal": "Spaghetti alla Carbonara",
                "strCategory": "Pasta",
                "strArea": "Italian",
                "strTags": "Pasta,Speciality",
                "strIngredient1": "Spaghetti",
                "strMeasure1": "320g",
                "strIngredient2": "Egg Yolks",
                "strMeasure2": "6",
                "strIngredient3": "",
                "strMeasure3": "",
            }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let recipe = &body["recipes"][0];
    assert_eq!(recipe["strCategory"], "Pasta");
    assert_eq!(recipe["strArea"], "Italian");
    assert_eq!(recipe["strTags"], "Pasta,Speciality");
    assert_eq!(recipe["ingredients"], "320g Spaghetti, 6 Egg Yolks");
    assert_eq!(recipe["strIngredient2"], "Egg Yolks");
    assert!(recipe.get("strIngredient3").is_none());
    assert_eq!(recipe["isCustom"], false);
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_list_events_aggregates_recipes(pool: PgPool) {
    let app = app(pool.clone());
    let later = create_event(&app, ALICE, "Harvest feast", "2025-11-20").await;
    let earlier = create_event(&app, ALICE, "Spring picnic", "2025-04-12").await;
    create_event(&app, BOB, "Not yours", "2025-01-01").await;

    send(
        &app,
        Method::POST,
        &format!("/events/{}/recipes", later),
        Some(ALICE),
        Some(corba()),
    )
    .await;

    let (status, body) = send(&app, Method::GET, "/events", Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);

    let events = body.as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["id"].as_i64(), Some(earlier));
    assert_eq!(events[0]["name"], "Spring picnic");
    assert_eq!(events[0]["recipes"], json!([]));
    assert_eq!(events[1]["id"].as_i64(), Some(later));
    assert_eq!(events[1]["title"], events[1]["name"]);
    assert_eq!(events[1]["recipes"][0]["strMeal"], "Corba");
    assert_eq!(events[1]["recipes"][0]["strCategory"], "Unknown");
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_remove_recipe_by_external_id(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, ALICE, "Lunch", "2025-03-03").await;
    send(
        &app,
        Method::POST,
        &format!("/events/{}/recipes", event_id),
        Some(ALICE),
        Some(corba()),
    )
    .await;

    let uri = format!("/events/{}/recipes/52977", event_id);

    let (status, _) = send(&app, Method::DELETE, &uri, Some(BOB), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, Method::DELETE, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipes"], json!([]));

    let (status, _) = send(&app, Method::DELETE, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_update_event_is_owner_scoped(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, ALICE, "Tea", "2025-02-14").await;
    let uri = format!("/events/{}", event_id);

    let (status, _) = send(&app, Method::PUT, &uri, Some(BOB), Some(json!({"title": "Mine now"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(
        &app,
        Method::PUT,
        &uri,
        Some(ALICE),
        Some(json!({"name": "Afternoon tea", "location": "Garden"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Afternoon tea");
    assert_eq!(body["location"], "Garden");
    assert_eq!(body["date"], "2025-02-14");

    let (status, _) = send(&app, Method::PUT, &uri, Some(ALICE), Some(json!({"title": " "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_requests_require_valid_token(pool: PgPool) {
    let app = app(pool);

    let (status, _) = send(&app, Method::GET, "/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/events", Some("forged"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_repository_create_and_find_owned(pool: PgPool) {
    let repo = EventRepository::new(&pool);
    let event = repo
        .create(
            "alice",
            &NewEvent {
                title: "Thanksgiving".to_string(),
                date: NaiveDate::from_ymd_opt(2025, 11, 27).unwrap(),
                description: Some("Family".to_string()),
                location: None,
                image_url: None,
            },
        )
        .await
        .unwrap();

    let found = repo.find_owned(event.id, "alice").await.unwrap().unwrap();
    assert_eq!(found, event);

    assert!(repo.find_owned(event.id, "bob").await.unwrap().is_none());
    assert!(!repo.delete(event.id, "bob").await.unwrap());
    assert!(repo.delete(event.id, "alice").await.unwrap());
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_custom_recipe_removed_by_row_id(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, ALICE, "Stew night", "2025-12-05").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/events/{}/recipes", event_id),
        Some(ALICE),
        Some(json!({"title": "Stew", "isCustom": true})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["recipes"][0]["idMeal"], Value::Null);
    let recipe_id = body["recipes"][0]["id"].as_i64().unwrap();

    let uri = format!("/events/{}/recipes/{}", event_id, recipe_id);
    let (status, body) = send(&app, Method::DELETE, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recipes"], json!([]));

    let recipes = RecipeRepository::new(&pool).list_for_event(event_id).await.unwrap();
    assert!(recipes.is_empty());
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_row_id_does_not_remove_imported_recipe(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, ALICE, "Lunch", "2025-03-03").await;
    let (_, body) = send(
        &app,
        Method::POST,
        &format!("/events/{}/recipes", event_id),
        Some(ALICE),
        Some(corba()),
    )
    .await;
    let recipe_id = body["recipes"][0]["id"].as_i64().unwrap();

    let uri = format!("/events/{}/recipes/{}", event_id, recipe_id);
    let (status, _) = send(&app, Method::DELETE, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let recipes = RecipeRepository::new(&pool).list_for_event(event_id).await.unwrap();
    assert_eq!(recipes.len(), 1);
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_catalog_entry_with_extra_title_accepted(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, ALICE, "Soup day", "2025-01-20").await;

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/events/{}/recipes", event_id),
        Some(ALICE),
        Some(json!({"idMeal": "52977", "strMeal": "Corba", "title": "Corba", "meal_id": "52977"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["recipes"][0]["strMeal"], "Corba");
    assert_eq!(body["recipes"][0]["idMeal"], "52977");
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_bad_bodies_return_json_validation_errors(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, ALICE, "Brunch", "2025-05-04").await;
    let uri = format!("/events/{}/recipes", event_id);

    let (status, body) = send_raw(&app, &uri, ALICE, "{\"idMeal\": ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send_raw(&app, &uri, ALICE, r#"{"idMeal": "1", "strMeal": 42}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send_raw(&app, "/events", ALICE, r#"{"title": "x", "date": "not-a-date"}"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let recipes = RecipeRepository::new(&pool).list_for_event(event_id).await.unwrap();
    assert!(recipes.is_empty());
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_list_recipes_for_event(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, ALICE, "Supper", "2025-02-02").await;
    let uri = format!("/events/{}/recipes", event_id);
    send(&app, Method::POST, &uri, Some(ALICE), Some(corba())).await;

    let (status, body) = send(&app, Method::GET, &uri, Some(ALICE), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["strMeal"], "Corba");
    assert_eq!(body[0]["idMeal"], "52977");

    let (status, _) = send(&app, Method::GET, &uri, Some(BOB), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_update_event_null_clears_field(pool: PgPool) {
    let app = app(pool.clone());
    let event_id = create_event(&app, ALICE, "Tea", "2025-02-14").await;
    let uri = format!("/events/{}", event_id);

    send(&app, Method::PUT, &uri, Some(ALICE), Some(json!({"location": "Garden", "description": "Scones"}))).await;

    let (status, body) = send(&app, Method::PUT, &uri, Some(ALICE), Some(json!({"location": null}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["location"], Value::Null);
    assert_eq!(body["description"], "Scones");
}

#[sqlx::test(migrations = "src/db/migrations")]
async fn test_health_check(pool: PgPool) {
    let app = app(pool);

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
