mod common;

use blog_api::models::Blog;
use common::{ADMIN_ID, ALICE_ID, MemoryRepository, test_app};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

async fn spawn_app() -> TestApp {
    let router = test_app(Arc::new(MemoryRepository::seeded()));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = spawn_app().await;
    let response = reqwest::get(format!("{}/api-docs/openapi.json", app.address))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let doc: serde_json::Value = response.json().await.unwrap();
    assert!(doc["paths"].get("/blogs/{blog_id}/comments/{comment_id}").is_some());
}

#[tokio::test]
async fn test_blog_lifecycle_over_http() {
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Create
    let response = client
        .post(format!("{}/blogs", app.address))
        .header("x-user-id", ADMIN_ID.to_string())
        .json(&serde_json::json!({
            "title": "Hello", "author": "Ada", "image": "/img/hello.png", "description": "First post"
        }))
        .send()
        .await
        .expect("post fail");
    assert_eq!(response.status(), 200);
    let blog: Blog = response.json().await.unwrap();

    // Comment as a signed-in user
    let response = client
        .post(format!("{}/blogs/{}/comments", app.address, blog.id))
        .header("x-user-id", ALICE_ID.to_string())
        .json(&serde_json::json!({ "name": "Alice", "email": "alice@example.com", "text": "Nice", "rating": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let updated: Blog = response.json().await.unwrap();
    assert_eq!(updated.comments.len(), 1);
    assert_eq!(updated.comments[0].rating, Some(5.0));
    assert_eq!(updated.comments[0].author.as_ref().unwrap().id, ALICE_ID);

    // Cross-origin preflight is answered by the CORS layer.
    let response = client
        .request(reqwest::Method::OPTIONS, format!("{}/blogs/{}", app.address, blog.id))
        .header("Origin", "http://localhost:3000")
        .header("Access-Control-Request-Method", "DELETE")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("access-control-allow-origin"));

    // Delete
    let response = client
        .delete(format!("{}/blogs/{}", app.address, blog.id))
        .header("x-user-id", ADMIN_ID.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let remaining: Vec<Blog> = client
        .get(format!("{}/blogs", app.address))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(remaining.is_empty());
}
