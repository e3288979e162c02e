//! End-to-end tests against the real router on an ephemeral port, backed by
//! an in-memory SQLite database seeded with the demo fixtures.

use bookshelf_app::{bootstrap, fixtures, App};
use bookshelf_authz::Role;
use bookshelf_kernel::settings::{DatabaseSettings, ExternalSettings, Settings};
use reqwest::{header, StatusCode};
use serde_json::{json, Value};
use tokio::sync::oneshot;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SF_DOC_PATH: &str = "/repos/symfony/symfony-docs";

struct TestApp {
    base: String,
    client: reqwest::Client,
    app: App,
    upstream: MockServer,
    _shutdown: oneshot::Sender<()>,
}

impl TestApp {
    async fn spawn() -> Self {
        let upstream = MockServer::start().await;
        let settings = Settings {
            database: DatabaseSettings::in_memory(),
            external: ExternalSettings {
                sf_doc_url: format!("{}{SF_DOC_PATH}", upstream.uri()),
                ..Default::default()
            },
            ..Default::default()
        };

        let app = bootstrap(settings).await.expect("bootstrap");
        fixtures::load(&app.state.db, Some(7))
            .await
            .expect("load fixtures");

        let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
            .await
            .expect("bind");
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let router = app.router();

        tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = rx.await;
                })
                .await;
        });

        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            app,
            upstream,
            _shutdown: tx,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn token(&self, role: Role) -> String {
        let email = match role {
            Role::Admin => fixtures::ADMIN_EMAIL,
            Role::User => fixtures::USER_EMAIL,
        };
        self.app.state.jwt.issue(email, &[role]).unwrap()
    }

    async fn get_json(&self, path: &str) -> Value {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "GET {path}");
        response.json().await.unwrap()
    }

    async fn send_as(
        &self,
        role: Option<Role>,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> reqwest::Response {
        let mut request = self.client.request(method, self.url(path));
        if let Some(role) = role {
            request = request.bearer_auth(self.token(role));
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.unwrap()
    }

    async fn book_count(&self) -> i64 {
        self.app.state.books().count().await.unwrap()
    }

    async fn rename_book_behind_the_api(&self, id: i64, title: &str) {
        sqlx::query("UPDATE book SET title = ? WHERE id = ?")
            .bind(title)
            .bind(id)
            .execute(&self.app.state.db)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn book_listing_is_served_from_cache_until_a_write() {
    let t = TestApp::spawn().await;

    let first = t.get_json("/api/books?page=1&limit=3").await;
    assert_eq!(first.as_array().unwrap().len(), 3);
    assert_eq!(first[0]["title"], "Livre 0");

    t.rename_book_behind_the_api(1, "Renamed").await;
    assert_eq!(t.get_json("/api/books?page=1&limit=3").await, first);
    // Other parameters are a different cache entry
    assert_eq!(t.get_json("/api/books?page=1&limit=2").await[0]["title"], "Renamed");

    let response = t
        .send_as(
            Some(Role::Admin),
            reqwest::Method::POST,
            "/api/authors",
            Some(json!({"firstName": "Ada", "lastName": "Lovelace"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    assert_eq!(t.get_json("/api/books?page=1&limit=3").await[0]["title"], "Renamed");
}

#[tokio::test]
async fn author_writes_are_visible_in_the_next_listing() {
    let t = TestApp::spawn().await;

    let last_page = t.get_json("/api/authors?page=4&limit=3").await;
    assert_eq!(last_page.as_array().unwrap().len(), 1);
    assert_eq!(last_page[0]["firstName"], "Prénom 9");

    let created = t
        .send_as(
            Some(Role::Admin),
            reqwest::Method::POST,
            "/api/authors",
            Some(json!({"firstName": "Ada", "lastName": "Lovelace"})),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    assert!(created.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .ends_with("/api/authors/11"));
    let created: Value = created.json().await.unwrap();
    assert_eq!(created["_links"]["self"]["href"], "/api/authors/11");
    assert_eq!(created["books"], json!([]));

    let last_page = t.get_json("/api/authors?page=4&limit=3").await;
    assert_eq!(last_page.as_array().unwrap().len(), 2);

    let updated = t
        .send_as(
            Some(Role::Admin),
            reqwest::Method::PUT,
            "/api/authors/11",
            Some(json!({"firstName": "Grace", "lastName": "Hopper"})),
        )
        .await;
    assert_eq!(updated.status(), StatusCode::NO_CONTENT);
    assert_eq!(t.get_json("/api/authors?page=4&limit=3").await[1]["lastName"], "Hopper");

    let deleted = t
        .send_as(Some(Role::Admin), reqwest::Method::DELETE, "/api/authors/11", None)
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        t.get_json("/api/authors?page=4&limit=3").await.as_array().unwrap().len(),
        1
    );
}

#[tokio::test]
async fn author_view_lists_books_without_back_reference() {
    let t = TestApp::spawn().await;

    let authors = t.get_json("/api/authors?page=1&limit=10").await;
    let books: usize = authors
        .as_array()
        .unwrap()
        .iter()
        .map(|author| author["books"].as_array().unwrap().len())
        .sum();
    assert_eq!(books, 20);

    let with_books = authors
        .as_array()
        .unwrap()
        .iter()
        .find(|author| !author["books"].as_array().unwrap().is_empty())
        .unwrap();
    let book = &with_books["books"][0];
    assert!(book["title"].as_str().unwrap().starts_with("Livre "));
    assert!(book.get("author").is_none());
}

#[tokio::test]
async fn create_book_attaches_the_referenced_author() {
    let t = TestApp::spawn().await;

    let response = t
        .send_as(
            Some(Role::Admin),
            reqwest::Method::POST,
            "/api/books",
            Some(json!({"title": "Livre X", "coverText": "...", "idAuthor": 3})),
        )
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();
    assert!(location.ends_with("/api/books/21"), "{location}");

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], 21);
    assert_eq!(body["author"]["id"], 3);
    assert_eq!(body["author"]["firstName"], "Prénom 2");
    assert_eq!(body["_links"]["self"]["href"], "/api/books/21");

    let as_text = t
        .send_as(
            Some(Role::Admin),
            reqwest::Method::POST,
            "/api/books",
            Some(json!({"title": "Livre Y", "idAuthor": "3"})),
        )
        .await;
    assert_eq!(as_text.status(), StatusCode::CREATED);
    let body: Value = as_text.json().await.unwrap();
    assert_eq!(body["author"]["id"], 3);
}

#[tokio::test]
async fn create_book_with_unknown_author_has_no_author() {
    let t = TestApp::spawn().await;

    for body in [
        json!({"title": "Orphan", "idAuthor": 999}),
        json!({"title": "Orphan", "idAuthor": "not-an-id"}),
        json!({"title": "Orphan"}),
    ] {
        let response = t
            .send_as(Some(Role::Admin), reqwest::Method::POST, "/api/books", Some(body))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: Value = response.json().await.unwrap();
        assert!(created.get("author").is_none(), "{created}");
    }
}

#[tokio::test]
async fn writes_require_the_admin_role() {
    let t = TestApp::spawn().await;
    let listing = t.get_json("/api/books?page=1&limit=3").await;
    let book = json!({"title": "Livre X"});

    let anonymous = t
        .send_as(None, reqwest::Method::POST, "/api/books", Some(book.clone()))
        .await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let user = t
        .send_as(Some(Role::User), reqwest::Method::POST, "/api/books", Some(book.clone()))
        .await;
    assert_eq!(user.status(), StatusCode::FORBIDDEN);
    let error: Value = user.json().await.unwrap();
    assert_eq!(error["error"]["code"], "forbidden");

    for (method, path) in [
        (reqwest::Method::PUT, "/api/books/1"),
        (reqwest::Method::DELETE, "/api/books/1"),
        (reqwest::Method::PUT, "/api/authors/1"),
        (reqwest::Method::DELETE, "/api/authors/1"),
    ] {
        let response = t
            .send_as(
                Some(Role::User),
                method.clone(),
                path,
                Some(json!({"title": "x", "firstName": "x", "lastName": "x"})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method} {path}");
    }

    let bogus = t
        .client
        .post(t.url("/api/authors"))
        .bearer_auth("not-a-jwt")
        .json(&json!({"firstName": "A", "lastName": "B"}))
        .send()
        .await
        .unwrap();
    assert_eq!(bogus.status(), StatusCode::UNAUTHORIZED);

    assert_eq!(t.book_count().await, 20);
    assert_eq!(t.get_json("/api/books?page=1&limit=3").await, listing);
    assert!(t.app.state.cache.contains_key("getAllBooks-1-3").await);
}

#[tokio::test]
async fn invalid_titles_are_rejected_with_details() {
    let t = TestApp::spawn().await;

    for title in [String::new(), "x".repeat(256), "   ".to_string()] {
        let response = t
            .send_as(
                Some(Role::Admin),
                reqwest::Method::POST,
                "/api/books",
                Some(json!({"title": title, "idAuthor": 1})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let error: Value = response.json().await.unwrap();
        assert_eq!(error["error"]["code"], "validation_error");
        let details = error["error"]["details"].as_array().unwrap();
        assert!(!details.is_empty());
        assert_eq!(details[0]["propertyPath"], "title");
    }

    let update = t
        .send_as(
            Some(Role::Admin),
            reqwest::Method::PUT,
            "/api/books/1",
            Some(json!({"title": ""})),
        )
        .await;
    assert_eq!(update.status(), StatusCode::BAD_REQUEST);

    assert_eq!(t.book_count().await, 20);
    assert_eq!(t.get_json("/api/books/1").await["title"], "Livre 0");
}

#[tokio::test]
async fn malformed_bodies_and_pagination_are_bad_requests() {
    let t = TestApp::spawn().await;

    let response = t
        .client
        .post(t.url("/api/authors"))
        .bearer_auth(t.token(Role::Admin))
        .header(header::CONTENT_TYPE, "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    for query in ["page=0", "limit=0", "page=abc"] {
        let response = t
            .client
            .get(t.url(&format!("/api/books?{query}")))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{query}");
        let error: Value = response.json().await.unwrap();
        assert_eq!(error["error"]["code"], "bad_request", "{query}");
    }

    for path in ["/api/books/abc", "/api/authors/abc"] {
        let response = t.client.get(t.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{path}");
        let error: Value = response.json().await.unwrap();
        assert_eq!(error["error"]["code"], "bad_request", "{path}");
    }

    let clamped = t.get_json("/api/books?limit=1000").await;
    assert_eq!(clamped.as_array().unwrap().len(), 20);
    assert!(t.app.state.cache.contains_key("getAllBooks-1-100").await);
}

#[tokio::test]
async fn update_book_rewrites_title_cover_and_author() {
    let t = TestApp::spawn().await;

    let response = t
        .send_as(
            Some(Role::Admin),
            reqwest::Method::PUT,
            "/api/books/2",
            Some(json!({"title": "Livre Y", "coverText": "nouveau texte", "idAuthor": 5})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let book = t.get_json("/api/books/2").await;
    assert_eq!(book["title"], "Livre Y");
    assert_eq!(book["coverText"], "nouveau texte");
    assert_eq!(book["author"]["id"], 5);

    let missing = t
        .send_as(
            Some(Role::Admin),
            reqwest::Method::PUT,
            "/api/books/999",
            Some(json!({"title": "Livre Z"})),
        )
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn clear_cache_forces_a_recompute() {
    let t = TestApp::spawn().await;

    let first = t.get_json("/api/books").await;
    assert_eq!(first.as_array().unwrap().len(), 3);
    t.rename_book_behind_the_api(1, "Renamed").await;
    assert_eq!(t.get_json("/api/books").await, first);

    assert_eq!(t.get_json("/api/books/clearCache").await, json!("cache cleared"));

    assert_eq!(t.get_json("/api/books").await[0]["title"], "Renamed");
}

#[tokio::test]
async fn comment_is_exposed_from_version_two() {
    let t = TestApp::spawn().await;

    let created = t
        .send_as(
            Some(Role::Admin),
            reqwest::Method::POST,
            "/api/books",
            Some(json!({"title": "Annoté", "comment": "à relire", "idAuthor": 1})),
        )
        .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created: Value = created.json().await.unwrap();
    assert!(created.get("comment").is_none());
    let path = created["_links"]["self"]["href"].as_str().unwrap().to_string();

    let fetch = |accept: &'static str| {
        t.client
            .get(t.url(&path))
            .header(header::ACCEPT, accept)
            .send()
    };

    let v2: Value = fetch("application/json; version=2.0").await.unwrap().json().await.unwrap();
    assert_eq!(v2["comment"], "à relire");

    let v1: Value = fetch("application/json").await.unwrap().json().await.unwrap();
    assert!(v1.get("comment").is_none());

    let garbled: Value = fetch("application/json; version=banana")
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(garbled.get("comment").is_none());
}

#[tokio::test]
async fn deleting_an_author_detaches_their_books() {
    let t = TestApp::spawn().await;

    let created = t
        .send_as(
            Some(Role::Admin),
            reqwest::Method::POST,
            "/api/books",
            Some(json!({"title": "Livre X", "idAuthor": 1})),
        )
        .await;
    let created: Value = created.json().await.unwrap();
    assert_eq!(created["author"]["id"], 1);

    let deleted = t
        .send_as(Some(Role::Admin), reqwest::Method::DELETE, "/api/authors/1", None)
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    assert_eq!(t.app.state.authors().count().await.unwrap(), 9);
    assert_eq!(t.book_count().await, 21);
    let book = t.get_json("/api/books/21").await;
    assert!(book.get("author").is_none());

    let gone = t.client.get(t.url("/api/authors/1")).send().await.unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    let error: Value = gone.json().await.unwrap();
    assert_eq!(error["error"]["code"], "not_found");
    assert!(error["error"]["trace_id"].is_string());

    let again = t
        .send_as(Some(Role::Admin), reqwest::Method::DELETE, "/api/authors/1", None)
        .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_book_removes_it() {
    let t = TestApp::spawn().await;

    let deleted = t
        .send_as(Some(Role::Admin), reqwest::Method::DELETE, "/api/books/1", None)
        .await;
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    assert_eq!(t.book_count().await, 19);

    let gone = t.client.get(t.url("/api/books/1")).send().await.unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
    assert_eq!(t.get_json("/api/books").await[0]["id"], 2);
}

#[tokio::test]
async fn external_passthrough_relays_the_upstream_document() {
    let t = TestApp::spawn().await;
    let document = json!({"full_name": "symfony/symfony-docs", "stargazers_count": 2300});

    Mock::given(method("GET"))
        .and(path(SF_DOC_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(&document))
        .expect(1)
        .mount(&t.upstream)
        .await;

    let response = t
        .client
        .get(t.url("/api/external/getSfDoc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, document);
}

#[tokio::test]
async fn external_passthrough_fails_on_upstream_errors() {
    let t = TestApp::spawn().await;

    Mock::given(method("GET"))
        .and(path(SF_DOC_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&t.upstream)
        .await;

    let response = t
        .client
        .get(t.url("/api/external/getSfDoc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let error: Value = response.json().await.unwrap();
    assert_eq!(error["error"]["code"], "internal_error");
}

#[tokio::test]
async fn fixture_accounts_can_log_in() {
    let t = TestApp::spawn().await;

    let login = t
        .client
        .post(t.url("/api/users/login"))
        .json(&json!({"username": fixtures::ADMIN_EMAIL, "password": fixtures::FIXTURE_PASSWORD}))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let token = login.json::<Value>().await.unwrap()["token"]
        .as_str()
        .unwrap()
        .to_string();

    let claims = t.app.state.jwt.verify(&token).unwrap();
    assert_eq!(claims.sub, fixtures::ADMIN_EMAIL);
    assert!(claims.has_role(Role::Admin));

    let deleted = t
        .client
        .delete(t.url("/api/books/3"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    for (username, password) in [
        (fixtures::ADMIN_EMAIL, "wrong"),
        ("nobody@bookapi.com", fixtures::FIXTURE_PASSWORD),
    ] {
        let rejected = t
            .client
            .post(t.url("/api/users/login"))
            .json(&json!({"username": username, "password": password}))
            .send()
            .await
            .unwrap();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED, "{username}");
    }
}

#[tokio::test]
async fn plain_user_token_cannot_write() {
    let t = TestApp::spawn().await;

    let login = t
        .client
        .post(t.url("/api/users/login"))
        .json(&json!({"username": fixtures::USER_EMAIL, "password": fixtures::FIXTURE_PASSWORD}))
        .send()
        .await
        .unwrap();
    let token = login.json::<Value>().await.unwrap()["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = t
        .client
        .delete(t.url("/api/books/3"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(t.book_count().await, 20);
}

#[tokio::test]
async fn health_and_openapi_are_served() {
    let t = TestApp::spawn().await;

    let health = t.client.get(t.url("/healthz")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert!(health.headers().contains_key("x-request-id"));

    let doc = t.get_json("/docs/openapi.json").await;
    for path in [
        "/api/authors",
        "/api/authors/{id}",
        "/api/books",
        "/api/books/clearCache",
        "/api/books/{id}",
        "/api/external/getSfDoc",
        "/api/users/login",
    ] {
        assert!(doc["paths"][path].is_object(), "missing {path}");
    }
    assert!(doc["components"]["securitySchemes"]["bearerAuth"].is_object());
}
