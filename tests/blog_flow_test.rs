use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

use blogicum::auth::{password, session, users};
use blogicum::blog::{self, comments, posts, taxonomy};
use blogicum::config::Config;
use blogicum::db::models::Post;
use blogicum::state::AppState;
use blogicum::{db, routes};

const PASSWORD: &str = "correct-horse-42";
const BOUNDARY: &str = "blogicum-test-boundary";

struct TestApp {
    _dir: TempDir,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.database.path = Some(dir.path().join("test.db"));
        config.storage.path = Some(dir.path().join("media"));
        config.auth.bcrypt_cost = 4;

        let pool = db::create_pool(&config.db_path()).expect("Failed to create test database");
        db::run_migrations(&pool).expect("Failed to run migrations");

        TestApp {
            _dir: dir,
            state: AppState::new(pool, config),
        }
    }

    fn router(&self) -> Router {
        routes::app(self.state.clone())
    }

    async fn send(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.unwrap()
    }

    /// Create a user and a live session; returns the id and a Cookie header value.
    fn user(&self, username: &str) -> (i64, String) {
        let conn = self.state.db.get().unwrap();
        let profile = users::ProfileInput {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: String::new(),
            last_name: String::new(),
        };
        let hash = password::hash_password(PASSWORD, 4).unwrap();
        let id = users::insert(&conn, &profile, &hash).unwrap();
        let token = session::create_session(&conn, id, 1).unwrap();
        (id, format!("blogicum_session={}", token))
    }

    fn category(&self, slug: &str, is_published: bool) -> i64 {
        let conn = self.state.db.get().unwrap();
        taxonomy::insert_category(&conn, slug, slug, "", is_published).unwrap()
    }

    fn post(&self, author: i64, title: &str, category: i64, is_published: bool, age: Duration) -> i64 {
        let conn = self.state.db.get().unwrap();
        let input = posts::PostInput {
            title: title.to_string(),
            text: format!("Body of {}", title),
            pub_date: blog::now() - age,
            category_id: category,
            location_id: None,
            is_published,
            image: None,
        };
        posts::insert(&conn, author, &input).unwrap()
    }

    fn post_by_title(&self, title: &str) -> Option<Post> {
        let conn = self.state.db.get().unwrap();
        let id: Option<i64> = conn
            .query_row("SELECT id FROM posts WHERE title = ?1", [title], |row| row.get(0))
            .ok();
        id.and_then(|id| posts::find(&conn, id).unwrap())
    }

    /// Number of files in the post image directory.
    fn stored_images(&self) -> usize {
        std::fs::read_dir(self.state.config.uploads_path().join("posts_images"))
            .map(|dir| dir.count())
            .unwrap_or(0)
    }

    fn comment_count(&self, post_id: i64) -> i64 {
        let conn = self.state.db.get().unwrap();
        comments::count_for_post(&conn, post_id).unwrap()
    }
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn post_multipart(
    uri: &str,
    cookie: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, data)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

/// A real 2x2 PNG.
fn tiny_png() -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(image::RgbImage::new(2, 2))
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
}

/// A feed with one post in every visibility state, all written by alice.
struct Fixture {
    app: TestApp,
    alice: (i64, String),
    bob: (i64, String),
    travel: i64,
    public: i64,
    draft: i64,
}

fn fixture() -> Fixture {
    let app = TestApp::new();
    let alice = app.user("alice");
    let bob = app.user("bob");
    let travel = app.category("travel", true);
    let secret = app.category("secret", false);

    let public = app.post(alice.0, "Visible story", travel, true, Duration::days(1));
    let draft = app.post(alice.0, "Draft story", travel, false, Duration::days(1));
    app.post(alice.0, "Scheduled story", travel, true, Duration::days(-3));
    app.post(alice.0, "Secret story", secret, true, Duration::days(1));
    app.post(bob.0, "Bob draft", travel, false, Duration::days(1));

    Fixture {
        app,
        alice,
        bob,
        travel,
        public,
        draft,
    }
}

// --- Visibility ---

#[tokio::test]
async fn anonymous_feed_lists_only_public_posts() {
    let f = fixture();
    let response = f.app.send(get("/", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_text(response).await;
    assert!(body.contains("Visible story"));
    assert!(!body.contains("Draft story"));
    assert!(!body.contains("Scheduled story"));
    assert!(!body.contains("Secret story"));
    assert!(!body.contains("Bob draft"));
}

#[tokio::test]
async fn signed_in_feed_adds_own_posts_only() {
    let f = fixture();
    let body = body_text(f.app.send(get("/", Some(f.alice.1.as_str()))).await).await;
    assert!(body.contains("Visible story"));
    assert!(body.contains("Draft story"));
    assert!(body.contains("Scheduled story"));
    assert!(body.contains("Secret story"));
    assert!(!body.contains("Bob draft"));

    let body = body_text(f.app.send(get("/", Some(f.bob.1.as_str()))).await).await;
    assert!(body.contains("Visible story"));
    assert!(body.contains("Bob draft"));
    assert!(!body.contains("Draft story"));
}

#[tokio::test]
async fn hidden_post_detail_redirects_everyone_but_the_author() {
    let f = fixture();
    let uri = format!("/posts/{}/", f.draft);

    let response = f.app.send(get(&uri, None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = f.app.send(get(&uri, Some(f.bob.1.as_str()))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = f.app.send(get(&uri, Some(f.alice.1.as_str()))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Draft story"));
}

#[tokio::test]
async fn missing_posts_and_routes_are_not_found() {
    let f = fixture();
    assert_eq!(f.app.send(get("/posts/9999/", None)).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(f.app.send(get("/posts/abc/", None)).await.status(), StatusCode::NOT_FOUND);

    let response = f.app.send(get("/no/such/page/", None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Page not found"));
}

#[tokio::test]
async fn category_page_requires_published_category() {
    let f = fixture();
    assert_eq!(
        f.app.send(get("/category/secret/", None)).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        f.app.send(get("/category/nowhere/", None)).await.status(),
        StatusCode::NOT_FOUND
    );

    let body = body_text(f.app.send(get("/category/travel/", None)).await).await;
    assert!(body.contains("Visible story"));
    assert!(!body.contains("Draft story"));
    assert!(!body.contains("Secret story"));

    let body = body_text(f.app.send(get("/category/travel/", Some(f.alice.1.as_str()))).await).await;
    assert!(body.contains("Draft story"));
    assert!(!body.contains("Secret story"));
}

#[tokio::test]
async fn profile_shows_everything_to_its_owner_only() {
    let f = fixture();

    let body = body_text(f.app.send(get("/profile/alice/", Some(f.alice.1.as_str()))).await).await;
    assert!(body.contains("Draft story"));
    assert!(body.contains("Secret story"));
    assert!(body.contains("Edit profile"));

    let body = body_text(f.app.send(get("/profile/alice/", Some(f.bob.1.as_str()))).await).await;
    assert!(body.contains("Visible story"));
    assert!(!body.contains("Draft story"));
    assert!(!body.contains("Edit profile"));

    assert_eq!(
        f.app.send(get("/profile/nobody/", None)).await.status(),
        StatusCode::NOT_FOUND
    );
}

// --- Pagination ---

#[tokio::test]
async fn page_past_the_end_shows_last_page() {
    let app = TestApp::new();
    let (author, _) = app.user("writer");
    let category = app.category("news", true);
    for i in 1..=12 {
        app.post(author, &format!("Story number {:02}", i), category, true, Duration::hours(i));
    }

    let response = app.send(get("/?page=99", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Page 2 of 2"));
    // oldest two posts land on the last page
    assert!(body.contains("Story number 12"));
    assert!(body.contains("Story number 11"));
    assert!(!body.contains("Story number 01"));

    let body = body_text(app.send(get("/?page=abc", None)).await).await;
    assert!(body.contains("Page 1 of 2"));
    assert!(body.contains("Story number 01"));

    let body = body_text(app.send(get("/?page=-3", None)).await).await;
    assert!(body.contains("Page 1 of 2"));
}

// --- Comments ---

#[tokio::test]
async fn signed_in_comment_adds_exactly_one() {
    let f = fixture();
    let uri = format!("/posts/{}/comment/", f.public);

    let response = f.app.send(post_form(&uri, Some(f.bob.1.as_str()), "text=Lovely+read")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), format!("/posts/{}/", f.public));
    assert_eq!(f.app.comment_count(f.public), 1);

    // the detail URL accepts submissions too
    let detail = format!("/posts/{}/", f.public);
    let response = f.app.send(post_form(&detail, Some(f.alice.1.as_str()), "text=Thanks")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(f.app.comment_count(f.public), 2);

    let body = body_text(f.app.send(get(&detail, None)).await).await;
    assert!(body.contains("Lovely read"));
    assert!(body.contains("Comments (2)"));
}

#[tokio::test]
async fn anonymous_and_blank_comments_are_not_saved() {
    let f = fixture();
    let uri = format!("/posts/{}/comment/", f.public);

    let response = f.app.send(post_form(&uri, None, "text=Drive-by")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(f.app.comment_count(f.public), 0);

    let response = f.app.send(post_form(&uri, Some(f.bob.1.as_str()), "text=++")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("This field is required."));
    assert_eq!(f.app.comment_count(f.public), 0);
}

#[tokio::test]
async fn anonymous_comment_without_a_body_is_ignored() {
    let f = fixture();
    let request = Request::builder()
        .method("POST")
        .uri(format!("/posts/{}/comment/", f.public))
        .body(Body::empty())
        .unwrap();

    let response = f.app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Visible story"));
    assert_eq!(f.app.comment_count(f.public), 0);
}

#[tokio::test]
async fn cross_site_posts_are_forbidden() {
    let f = fixture();
    let uri = format!("/posts/{}/comment/", f.public);
    let from = |origin: &str| {
        Request::builder()
            .method("POST")
            .uri(&uri)
            .header(header::HOST, "blog.example")
            .header(header::ORIGIN, origin)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::COOKIE, f.bob.1.as_str())
            .body(Body::from("text=Hello"))
            .unwrap()
    };

    let response = f.app.send(from("https://evil.example")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_text(response).await.contains("403: Access denied"));
    assert_eq!(f.app.comment_count(f.public), 0);

    let response = f.app.send(from("https://blog.example")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(f.app.comment_count(f.public), 1);
}

#[tokio::test]
async fn comments_on_hidden_posts_are_refused() {
    let f = fixture();
    let uri = format!("/posts/{}/comment/", f.draft);

    let response = f.app.send(post_form(&uri, Some(f.bob.1.as_str()), "text=Sneaky")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    assert_eq!(f.app.comment_count(f.draft), 0);
}

#[tokio::test]
async fn only_the_comment_author_may_edit_or_delete() {
    let f = fixture();
    let comment_id = {
        let conn = f.app.state.db.get().unwrap();
        comments::insert(&conn, f.public, f.bob.0, "Original words").unwrap()
    };
    let edit_uri = format!("/posts/{}/edit_comment/{}/", f.public, comment_id);
    let delete_uri = format!("/posts/{}/delete_comment/{}/", f.public, comment_id);
    let detail = format!("/posts/{}/", f.public);

    let response = f.app.send(get(&edit_uri, Some(f.alice.1.as_str()))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);

    let response = f.app.send(post_form(&delete_uri, Some(f.alice.1.as_str()), "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(f.app.comment_count(f.public), 1);

    let response = f
        .app
        .send(post_form(&edit_uri, Some(f.bob.1.as_str()), "text=Better+words"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);
    assert!(body_text(f.app.send(get(&detail, None)).await).await.contains("Better words"));

    let wrong_post = format!("/posts/{}/edit_comment/{}/", f.draft, comment_id);
    assert_eq!(
        f.app.send(get(&wrong_post, Some(f.bob.1.as_str()))).await.status(),
        StatusCode::NOT_FOUND
    );

    let response = f.app.send(post_form(&delete_uri, Some(f.bob.1.as_str()), "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(f.app.comment_count(f.public), 0);
}

// --- Post authoring ---

#[tokio::test]
async fn anonymous_authoring_goes_to_login() {
    let f = fixture();
    let response = f.app.send(get("/posts/create/", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=%2Fposts%2Fcreate%2F");

    let response = f
        .app
        .send(get(&format!("/posts/{}/edit/", f.public), None))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(location(&response).starts_with("/auth/login/?next="));
}

#[tokio::test]
async fn non_author_edit_and_delete_are_redirected() {
    let f = fixture();
    let detail = format!("/posts/{}/", f.public);

    let response = f.app.send(get(&format!("{}edit/", detail), Some(f.bob.1.as_str()))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);

    let response = f.app.send(get(&format!("{}delete/", detail), Some(f.bob.1.as_str()))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);

    let response = f
        .app
        .send(post_form(&format!("{}delete/", detail), Some(f.bob.1.as_str()), ""))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);

    let travel = f.travel.to_string();
    let fields = [
        ("title", "Hijacked"),
        ("text", "Nope"),
        ("pub_date", "2024-01-01T10:00"),
        ("category", travel.as_str()),
    ];
    let response = f
        .app
        .send(post_multipart(&format!("{}edit/", detail), &f.bob.1, &fields, None))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);

    let conn = f.app.state.db.get().unwrap();
    let post = posts::find(&conn, f.public).unwrap().unwrap();
    assert_eq!(post.title, "Visible story");
}

fn post_fields(title: &str, category: &str) -> Vec<(&'static str, String)> {
    vec![
        ("title", title.to_string()),
        ("text", "Boats and gulls.".to_string()),
        ("pub_date", "2024-03-01T06:30".to_string()),
        ("category", category.to_string()),
        ("location", String::new()),
        ("is_published", "on".to_string()),
    ]
}

fn as_fields<'a>(fields: &'a [(&'static str, String)]) -> Vec<(&'a str, &'a str)> {
    fields.iter().map(|(name, value)| (*name, value.as_str())).collect()
}

#[tokio::test]
async fn author_creates_post_with_image() {
    let f = fixture();
    let fields = post_fields("Harbour at dawn", &f.travel.to_string());
    let png = tiny_png();

    // the stored name follows the contents, not the client's file name
    let response = f
        .app
        .send(post_multipart(
            "/posts/create/",
            &f.alice.1,
            &as_fields(&fields),
            Some(("dawn.jpg", &png[..])),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/alice/");

    let post = f.app.post_by_title("Harbour at dawn").expect("post created");
    assert!(post.is_published);
    assert_eq!(post.author_id, f.alice.0);
    let image = post.image.expect("image path stored");
    assert!(image.starts_with("posts_images/"));
    assert!(image.ends_with(".png"));

    let response = f.app.send(get(&format!("/media/{}", image), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");

    let body = body_text(f.app.send(get("/", None)).await).await;
    assert!(body.contains("Harbour at dawn"));
}

#[tokio::test]
async fn uploads_that_are_not_raster_images_are_refused() {
    let f = fixture();
    let fields = post_fields("Scripted", &f.travel.to_string());
    let svg = br#"<svg xmlns="http://www.w3.org/2000/svg"><script>alert(document.domain)</script></svg>"#;
    let text = b"plain text wearing a png name";

    for (file_name, data) in [("evil.svg", &svg[..]), ("fake.png", &text[..])] {
        let response = f
            .app
            .send(post_multipart(
                "/posts/create/",
                &f.alice.1,
                &as_fields(&fields),
                Some((file_name, data)),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK, "{}", file_name);
        assert!(body_text(response).await.contains("Upload a valid image."));
    }

    assert!(f.app.post_by_title("Scripted").is_none());
    assert_eq!(f.app.stored_images(), 0);
}

#[tokio::test]
async fn upload_is_discarded_when_the_post_is_not_saved() {
    let f = fixture();
    {
        let conn = f.app.state.db.get().unwrap();
        conn.execute_batch(
            "CREATE TRIGGER refuse_posts BEFORE INSERT ON posts
             BEGIN SELECT RAISE(ABORT, 'refused'); END;",
        )
        .unwrap();
    }
    let fields = post_fields("Never saved", &f.travel.to_string());
    let png = tiny_png();

    let response = f
        .app
        .send(post_multipart(
            "/posts/create/",
            &f.alice.1,
            &as_fields(&fields),
            Some(("dawn.png", &png[..])),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(f.app.post_by_title("Never saved").is_none());
    assert_eq!(f.app.stored_images(), 0);
}

#[tokio::test]
async fn replacing_an_image_removes_the_old_file() {
    let f = fixture();
    let travel = f.travel.to_string();
    let fields = post_fields("Two pictures", &travel);
    let png = tiny_png();

    f.app
        .send(post_multipart(
            "/posts/create/",
            &f.alice.1,
            &as_fields(&fields),
            Some(("first.png", &png[..])),
        ))
        .await;
    let post = f.app.post_by_title("Two pictures").expect("post created");
    let first = post.image.clone().expect("first image stored");

    let response = f
        .app
        .send(post_multipart(
            &format!("{}edit/", post.url()),
            &f.alice.1,
            &as_fields(&fields),
            Some(("second.png", &png[..])),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let second = f.app.post_by_title("Two pictures").unwrap().image.unwrap();
    assert_ne!(first, second);
    assert_eq!(f.app.stored_images(), 1);
    let response = f.app.send(get(&format!("/media/{}", first), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_edit_keeps_the_old_image() {
    let f = fixture();
    let travel = f.travel.to_string();
    let fields = post_fields("Kept picture", &travel);
    let png = tiny_png();

    f.app
        .send(post_multipart(
            "/posts/create/",
            &f.alice.1,
            &as_fields(&fields),
            Some(("first.png", &png[..])),
        ))
        .await;
    let post = f.app.post_by_title("Kept picture").expect("post created");
    let first = post.image.clone().expect("first image stored");
    {
        let conn = f.app.state.db.get().unwrap();
        conn.execute_batch(
            "CREATE TRIGGER freeze_posts BEFORE UPDATE ON posts
             BEGIN SELECT RAISE(ABORT, 'frozen'); END;",
        )
        .unwrap();
    }

    let response = f
        .app
        .send(post_multipart(
            &format!("{}edit/", post.url()),
            &f.alice.1,
            &as_fields(&fields),
            Some(("second.png", &png[..])),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    assert_eq!(f.app.post_by_title("Kept picture").unwrap().image, Some(first.clone()));
    assert_eq!(f.app.stored_images(), 1);
    let response = f.app.send(get(&format!("/media/{}", first), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_post_form_is_shown_again() {
    let f = fixture();
    let fields = [("title", "No category"), ("text", "Text"), ("pub_date", "2024-03-01T06:30")];

    let response = f
        .app
        .send(post_multipart("/posts/create/", &f.alice.1, &fields, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("This field is required."));
    assert!(body.contains("No category"));
}

#[tokio::test]
async fn author_edits_and_deletes_post() {
    let f = fixture();
    let detail = format!("/posts/{}/", f.public);
    let travel = f.travel.to_string();
    let fields = [
        ("title", "Visible story revised"),
        ("text", "New text"),
        ("pub_date", "2024-02-02T12:00"),
        ("category", travel.as_str()),
    ];

    let response = f
        .app
        .send(post_multipart(&format!("{}edit/", detail), &f.alice.1, &fields, None))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), detail);
    {
        let conn = f.app.state.db.get().unwrap();
        let post = posts::find(&conn, f.public).unwrap().unwrap();
        assert_eq!(post.title, "Visible story revised");
        // unchecked box unpublishes
        assert!(!post.is_published);
    }

    let response = f.app.send(get(&format!("{}delete/", detail), Some(f.alice.1.as_str()))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = f
        .app
        .send(post_form(&format!("{}delete/", detail), Some(f.alice.1.as_str()), ""))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/alice/");

    let conn = f.app.state.db.get().unwrap();
    assert!(posts::find(&conn, f.public).unwrap().is_none());
}

// --- Accounts ---

#[tokio::test]
async fn register_then_log_in() {
    let app = TestApp::new();

    let response = app
        .send(post_form(
            "/auth/registration/",
            None,
            "username=carol&email=carol%40example.com&first_name=Carol&last_name=&password1=sturdy-pass-42&password2=sturdy-pass-42",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/");

    let response = app
        .send(post_form(
            "/auth/login/",
            None,
            "username=carol&password=wrong-password&next=",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("Please enter a correct username and password"));

    let response = app
        .send(post_form(
            "/auth/login/",
            None,
            "username=carol&password=sturdy-pass-42&next=%2Fposts%2Fcreate%2F",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/posts/create/");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("blogicum_session="));
    assert!(cookie.contains("HttpOnly"));

    let session = cookie.split(';').next().unwrap().to_string();
    let response = app.send(get("/posts/create/", Some(session.as_str()))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn registration_errors_rerender_the_form() {
    let app = TestApp::new();
    app.user("dave");

    let response = app
        .send(post_form(
            "/auth/registration/",
            None,
            "username=dave&email=bad&password1=12345678&password2=12345678",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("A user with that username already exists."));
    assert!(body.contains("Enter a valid email address."));
    assert!(body.contains("This password is entirely numeric."));
}

#[tokio::test]
async fn logout_ends_the_session() {
    let f = fixture();

    let response = f.app.send(get("/auth/logout/", Some(f.alice.1.as_str()))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    let response = f.app.send(get("/posts/create/", Some(f.alice.1.as_str()))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn password_change_signs_out_other_sessions() {
    let f = fixture();
    let other_session = {
        let conn = f.app.state.db.get().unwrap();
        format!(
            "blogicum_session={}",
            session::create_session(&conn, f.alice.0, 1).unwrap()
        )
    };

    let response = f
        .app
        .send(post_form(
            "/auth/password_change/",
            Some(f.alice.1.as_str()),
            "old_password=correct-horse-42&new_password1=fresh-secret-77&new_password2=fresh-secret-77",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/alice/");

    let response = f.app.send(get("/posts/create/", Some(f.alice.1.as_str()))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = f.app.send(get("/posts/create/", Some(other_session.as_str()))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let conn = f.app.state.db.get().unwrap();
    let user = users::find_by_id(&conn, f.alice.0).unwrap().unwrap();
    assert!(password::verify_password("fresh-secret-77", &user.password_hash));
}

#[tokio::test]
async fn profile_edit_renames_user() {
    let f = fixture();

    let response = f
        .app
        .send(post_form(
            "/profile/edit/",
            Some(f.alice.1.as_str()),
            "username=bob&email=&first_name=&last_name=",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response)
        .await
        .contains("A user with that username already exists."));

    let response = f
        .app
        .send(post_form(
            "/profile/edit/",
            Some(f.alice.1.as_str()),
            "username=alicia&email=alicia%40example.com&first_name=Alicia&last_name=Smith",
        ))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/profile/alicia/");

    let body = body_text(f.app.send(get("/profile/alicia/", None)).await).await;
    assert!(body.contains("Alicia Smith"));
}

#[tokio::test]
async fn static_pages_render() {
    let app = TestApp::new();
    assert_eq!(app.send(get("/pages/about/", None)).await.status(), StatusCode::OK);
    assert_eq!(app.send(get("/pages/rules/", None)).await.status(), StatusCode::OK);

    let response = app.send(get("/assets/css/style.css", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");

    assert_eq!(
        app.send(get("/media/../test.db", None)).await.status(),
        StatusCode::NOT_FOUND
    );
}
