//! Integration tests for the request client using wiremock.

use std::time::Duration;

use async_trait::async_trait;
use http::Method;
use indexmap::IndexMap;
use pagekit::hooks::TokenError;
use pagekit::{
    Client, ClientConfig, CredentialStore, Endpoint, ErrorFormatter, FilePart, FormField,
    MemoryCredentialStore, Payload, REFRESH_EVENT, RequestConfig, RequestErrorKind, StaticCookies,
    TokenProvider, UploadConfig,
};
use pagekit_core::{DEFAULT_TABLE, ManualClock};
use pagekit_test::create_log_collector;
use pagekit_test::mock_backend::MockBackend;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tracing::Level;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const NOW: i64 = 1_700_000_000_000;

fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .config(ClientConfig::default().with_origin(server.uri()))
        .build()
}

fn object(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}

async fn received(server: &MockServer) -> Vec<Request> {
    server.received_requests().await.unwrap()
}

struct FixedToken(&'static str);

#[async_trait]
impl TokenProvider for FixedToken {
    async fn acquire_token(&self) -> Result<String, TokenError> {
        Ok(self.0.to_string())
    }
}

struct BrokenToken;

#[async_trait]
impl TokenProvider for BrokenToken {
    async fn acquire_token(&self) -> Result<String, TokenError> {
        Err("identity provider unreachable".into())
    }
}

#[tokio::test]
async fn test_cached_response_skips_network() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/countries/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = MockBackend::request_db(&[]);
    let client = Client::builder()
        .config(ClientConfig::default().with_origin(mock_server.uri()))
        .request_db(backend.clone())
        .clock(ManualClock::new(NOW))
        .build();
    let config = RequestConfig::get(Endpoint::new("/api/countries/").with_exp(60));

    let first = client.execute(config.clone(), None).await.unwrap();
    let second = client.execute(config, None).await.unwrap();

    assert_eq!(first, Payload::Json(json!([{"id": 1}])));
    assert_eq!(second, first);
    let url = format!("{}/api/countries/", mock_server.uri());
    let entry = backend.entry(DEFAULT_TABLE, &url).unwrap();
    assert_eq!(entry.expire, NOW + 60_000);
    assert_eq!(backend.counters.read_hit_count(), 1);
}

#[tokio::test]
async fn test_expired_entry_goes_back_to_network() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let clock = ManualClock::new(NOW);
    let client = Client::builder()
        .config(ClientConfig::default().with_origin(mock_server.uri()))
        .request_db(MockBackend::request_db(&[]))
        .clock(clock.clone())
        .build();
    let config = RequestConfig::get(Endpoint::new("/api/status/").with_exp(60));

    client.execute(config.clone(), None).await.unwrap();
    clock.advance(59_999);
    client.execute(config.clone(), None).await.unwrap();
    clock.advance(1);
    client.execute(config, None).await.unwrap();
}

#[tokio::test]
async fn test_uncacheable_requests_always_hit_network() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(3)
        .mount(&mock_server)
        .await;

    // No expiration, and a table the database does not declare.
    let client = Client::builder()
        .config(ClientConfig::default().with_origin(mock_server.uri()))
        .request_db(MockBackend::request_db(&[]))
        .build();

    let no_exp = RequestConfig::get(Endpoint::new("/api/a/"));
    client.execute(no_exp.clone(), None).await.unwrap();
    client.execute(no_exp, None).await.unwrap();
    let unknown_table =
        RequestConfig::get(Endpoint::new("/api/b/").with_exp(60).with_cache_table("sections"));
    client.execute(unknown_table, None).await.unwrap();
}

#[tokio::test]
async fn test_disabled_cache_is_never_read() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let backend = MockBackend::request_db(&[]);
    let mut config = ClientConfig::default().with_origin(mock_server.uri());
    config.cache_disabled = true;
    let client = Client::builder()
        .config(config)
        .request_db(backend.clone())
        .build();
    let request = RequestConfig::get(Endpoint::new("/api/a/").with_exp(60));

    client.execute(request.clone(), None).await.unwrap();
    client.execute(request, None).await.unwrap();
    assert_eq!(backend.counters.read_count(), 0);
    assert_eq!(backend.counters.write_count(), 0);
}

#[tokio::test]
async fn test_failing_backend_falls_back_to_network() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"v": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = MockBackend::request_db(&[]);
    backend.set_failing(true);
    let client = Client::builder()
        .config(ClientConfig::default().with_origin(mock_server.uri()))
        .request_db(backend)
        .build();

    let collector = create_log_collector();
    let _guard = tracing::dispatcher::set_default(collector.dispatch());

    let data = client
        .execute(RequestConfig::get(Endpoint::new("/api/a/").with_exp(60)), None)
        .await
        .unwrap();

    assert_eq!(data, Payload::Json(json!({"v": 1})));
    collector.assert_logged(Level::WARN, "Failed to get data from cache");
    collector.assert_logged(Level::WARN, "Data not cached");
}

#[tokio::test]
async fn test_network_errors_are_not_cached() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})))
        .mount(&mock_server)
        .await;

    let backend = MockBackend::request_db(&[]);
    let client = Client::builder()
        .config(ClientConfig::default().with_origin(mock_server.uri()))
        .request_db(backend.clone())
        .build();

    let error = client
        .execute(RequestConfig::get(Endpoint::new("/api/a/").with_exp(60)), None)
        .await
        .unwrap_err();

    assert_eq!(error.kind, RequestErrorKind::Status);
    assert_eq!(error.status, 500);
    assert_eq!(backend.counters.write_count(), 0);
}

#[tokio::test]
async fn test_template_and_params_build_url() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/interventions/7/"))
        .and(query_param("page", "2"))
        .and(query_param("sections", "1,3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let config = RequestConfig::get(Endpoint::from_template("/api/interventions/<%=ID%>/"))
        .template_data(object(json!({"id": 7})))
        .params(object(json!({"page": 2, "sections": [1, 3]})));

    let data = client.execute(config, None).await.unwrap();
    assert_eq!(data, Payload::Json(json!({"id": 7})));
}

#[tokio::test]
async fn test_empty_template_is_a_configuration_error() {
    let mock_server = MockServer::start().await;
    let client = client_for(&mock_server);

    let error = client
        .execute(RequestConfig::get(Endpoint::from_template("")), None)
        .await
        .unwrap_err();

    assert_eq!(error.kind, RequestErrorKind::Configuration);
    assert!(received(&mock_server).await.is_empty());
}

#[tokio::test]
async fn test_named_endpoint_resolution() {
    let config = ClientConfig::default()
        .with_origin("https://example.org/")
        .with_endpoint("intervention", Endpoint::from_template("/api/interventions/<%=id%>/"));
    let client = Client::builder().config(config).build();

    let endpoint = client
        .endpoint("intervention", Some(&object(json!({"id": 3}))))
        .unwrap();
    assert_eq!(endpoint.url, "https://example.org/api/interventions/3/");
    assert!(client.endpoint("missing", None).is_err());
}

#[tokio::test]
async fn test_csrf_token_only_on_unsafe_methods() {
    let mock_server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .config(ClientConfig::default().with_origin(mock_server.uri()))
        .cookies(StaticCookies("sessionid=s1; csrftoken=c5rf".into()))
        .build();
    let endpoint = Endpoint::new("/api/items/");

    client.execute(RequestConfig::get(endpoint.clone()), None).await.unwrap();
    client
        .execute(
            RequestConfig::new(endpoint.clone()).method(Method::POST).body(json!({"a": 1})),
            None,
        )
        .await
        .unwrap();
    client
        .execute(
            RequestConfig::new(endpoint).method(Method::DELETE).csrf_check(false),
            None,
        )
        .await
        .unwrap();

    let requests = received(&mock_server).await;
    assert_eq!(requests.len(), 3);
    assert!(requests[0].headers.get("x-csrftoken").is_none());
    assert_eq!(requests[1].headers["x-csrftoken"], "c5rf");
    assert_eq!(requests[1].headers["content-type"], "application/json");
    assert!(requests[2].headers.get("x-csrftoken").is_none());
}

#[tokio::test]
async fn test_language_header_only_for_same_origin() {
    let own_server = MockServer::start().await;
    let other_server = MockServer::start().await;
    for server in [&own_server, &other_server] {
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(server)
            .await;
    }

    let client = Client::builder()
        .config(
            ClientConfig::default()
                .with_origin(own_server.uri())
                .with_language("fr"),
        )
        .build();

    client
        .execute(RequestConfig::get(Endpoint::new("/api/own/")), None)
        .await
        .unwrap();
    client
        .execute(
            RequestConfig::get(Endpoint::new(format!("{}/api/other/", other_server.uri()))),
            None,
        )
        .await
        .unwrap();

    assert_eq!(received(&own_server).await[0].headers["language"], "fr");
    assert!(received(&other_server).await[0].headers.get("language").is_none());
}

#[tokio::test]
async fn test_authorization_from_credential_store() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "JWT stored"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let credentials = MemoryCredentialStore::new();
    credentials.set("jwt", "stored".into());
    let client = Client::builder()
        .config(ClientConfig::default().with_origin(mock_server.uri()))
        .credentials(credentials)
        .build();

    client
        .execute(
            RequestConfig::get(Endpoint::new("/api/me/").with_token_key("jwt")),
            None,
        )
        .await
        .unwrap();
    client
        .execute(RequestConfig::get(Endpoint::new("/api/public/")), None)
        .await
        .unwrap_err();
}

#[tokio::test]
async fn test_token_provider_replaces_stored_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "JWT fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let credentials = MemoryCredentialStore::new();
    credentials.set("jwt", "stored".into());
    let client = Client::builder()
        .config(ClientConfig::default().with_origin(mock_server.uri()))
        .credentials(credentials)
        .token_provider(FixedToken("fresh"))
        .build();

    client
        .execute(
            RequestConfig::get(Endpoint::new("/api/me/").with_token_key("jwt")),
            None,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failing_token_provider_uses_stored_token() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "JWT stored"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let credentials = MemoryCredentialStore::new();
    credentials.set("jwt", "stored".into());
    let client = Client::builder()
        .config(ClientConfig::default().with_origin(mock_server.uri()))
        .credentials(credentials)
        .token_provider(BrokenToken)
        .build();

    let collector = create_log_collector();
    let _guard = tracing::dispatcher::set_default(collector.dispatch());

    client
        .execute(
            RequestConfig::get(Endpoint::new("/api/me/").with_token_key("jwt")),
            None,
        )
        .await
        .unwrap();
    collector.assert_logged(Level::WARN, "Failed to acquire token");
}

#[tokio::test]
async fn test_abort_request_by_key() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let pending = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .execute(RequestConfig::get(Endpoint::new("/api/slow/")), Some("slow"))
                .await
        }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(client.active_requests().contains("slow"));

    let collector = create_log_collector();
    let _guard = tracing::dispatcher::set_default(collector.dispatch());

    client.abort_request_by_key("slow");
    let error = pending.await.unwrap().unwrap_err();
    assert_eq!(error.kind, RequestErrorKind::Aborted);
    assert_eq!(error.status, 0);
    assert!(client.active_requests().is_empty());

    client.abort_request_by_key("slow");
    client.abort_request_by_key("");
    assert_eq!(collector.at_level(Level::WARN).len(), 2);
    collector.assert_logged(Level::WARN, "No active request found");
}

#[tokio::test]
async fn test_completed_request_is_unregistered() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    client
        .execute(RequestConfig::get(Endpoint::new("/api/fast/")), Some("fast"))
        .await
        .unwrap();

    assert!(client.active_requests().is_empty());
}

#[tokio::test]
async fn test_abort_active_requests() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let spawn = |key: &'static str| {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .execute(RequestConfig::get(Endpoint::new("/api/slow/")), Some(key))
                .await
        })
    };
    let first = spawn("first");
    let second = spawn("second");
    let third = spawn("third");
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.abort_active_requests(Some(&["first", "unknown"]));
    assert!(first.await.unwrap().unwrap_err().is_aborted());
    assert_eq!(client.active_requests().len(), 2);

    client.abort_active_requests(None);
    assert!(second.await.unwrap().unwrap_err().is_aborted());
    assert!(third.await.unwrap().unwrap_err().is_aborted());
}

#[tokio::test]
async fn test_multipart_fields_are_flattened() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let fields = IndexMap::from([
        ("tags".to_string(), FormField::from(json!(["a", "b"]))),
        ("user".to_string(), FormField::from(json!({"name": "x"}))),
        ("offices".to_string(), FormField::from(json!([]))),
        (
            "attachment".to_string(),
            FormField::File(FilePart::new("notes.txt", "hello")),
        ),
    ]);
    let config = RequestConfig::new(Endpoint::new("/api/forms/"))
        .method(Method::POST)
        .multipart(fields, true);

    client.execute(config, None).await.unwrap();

    let request = &received(&mock_server).await[0];
    let content_type = request.headers["content-type"].to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    let body = String::from_utf8_lossy(&request.body);
    for name in ["tags[0]", "tags[1]", "user[_obj][name]", "offices"] {
        assert!(body.contains(&format!("name=\"{name}\"")), "missing field {name}");
    }
    assert!(body.contains("filename=\"notes.txt\""));
}

#[tokio::test]
async fn test_upload_field_layout() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload/"))
        .and(header("x-csrftoken", "c5rf"))
        .and(header("authorization", "JWT t0k"))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id": 5}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let credentials = MemoryCredentialStore::new();
    credentials.set("jwt", "t0k".into());
    let client = Client::builder()
        .config(ClientConfig::default().with_origin(mock_server.uri()))
        .cookies(StaticCookies("csrftoken=c5rf".into()))
        .credentials(credentials)
        .build();
    let config = UploadConfig::new("/api/upload/")
        .extra_field("kind", json!("report"))
        .token_key("jwt");

    let data = client
        .upload(&config, FilePart::new("report.pdf", "%PDF"))
        .await
        .unwrap();

    assert_eq!(data, Payload::Json(json!({"id": 5})));
    let request = &received(&mock_server).await[0];
    let body = String::from_utf8_lossy(&request.body);
    let file_at = body.find("name=\"file\"; filename=\"report.pdf\"").unwrap();
    let kind_at = body.find("name=\"kind\"").unwrap();
    assert!(file_at < kind_at);
}

#[tokio::test]
async fn test_upload_custom_field_and_text_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200).set_body_string("stored"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let config = UploadConfig::new("/api/upload/")
        .file_field("attachment")
        .method("put");

    let data = client
        .upload(&config, FilePart::new("a.txt", "a"))
        .await
        .unwrap();

    assert_eq!(data, Payload::Text("stored".into()));
    let body = String::from_utf8_lossy(&received(&mock_server).await[0].body).into_owned();
    assert!(body.contains("name=\"attachment\"; filename=\"a.txt\""));
}

#[tokio::test]
async fn test_refresh_storage() {
    let request_db = MockBackend::request_db(&[]);
    let shared_db = MockBackend::shared_db();
    let credentials = MemoryCredentialStore::new();
    credentials.set("jwt", "t0k".into());
    let client = Client::builder()
        .request_db(request_db.clone())
        .shared_db(shared_db.clone())
        .credentials(credentials.clone())
        .build();
    let mut events = client.events().subscribe();

    client.refresh_storage().await;

    assert_eq!(request_db.counters.clear_count(), 1);
    assert_eq!(shared_db.counters.clear_count(), 1);
    assert_eq!(credentials.get("jwt"), None);
    assert_eq!(events.recv().await.unwrap().name, REFRESH_EVENT);
}

#[tokio::test]
async fn test_server_errors_are_formatted() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "first_name": ["This field is required."],
            "non_field": "Invalid"
        })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let error = client
        .execute(
            RequestConfig::new(Endpoint::new("/api/people/"))
                .method(Method::POST)
                .body(json!({})),
            None,
        )
        .await
        .unwrap_err();

    assert_eq!(
        ErrorFormatter::new().format(&error, None),
        "Field First Name: This field is required.\nField Non Field - Invalid"
    );
}

#[tokio::test]
async fn test_csv_download_returns_raw_bytes() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports/export/"))
        .and(header("accept", "text/csv"))
        .and(header("content-type", "text"))
        .respond_with(ResponseTemplate::new(200).set_body_string("id,name\n1,Clinic\n"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let data = client
        .execute(
            RequestConfig::get(Endpoint::new("/api/reports/export/")).download_csv(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(data, Payload::Binary("id,name\n1,Clinic\n".into()));
}
