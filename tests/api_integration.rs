//! Integration tests for the Redmine client against a mock server.

use redmine_client::api::ApiError;
use redmine_client::{IssueDraft, IssueFilter, NewMembership, Project, RedmineClient};
use reqwest::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";

fn client_for(server: &MockServer) -> RedmineClient {
    RedmineClient::with_credentials(&server.uri(), API_KEY).expect("Failed to create client")
}

fn issue_json(id: u32) -> serde_json::Value {
    json!({
        "id": id,
        "subject": format!("Issue {}", id),
        "tracker": {"id": 1, "name": "Bug"},
        "status": {"id": 1, "name": "New"}
    })
}

#[tokio::test]
async fn test_get_issue_keeps_unknown_attributes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues/1.json"))
        .and(query_param("key", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issue": {"id": 1, "subject": "S", "extra_field": "x"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let issue = client_for(&server).issue(1).await.unwrap();

    assert_eq!(issue.fields.id, 1);
    assert_eq!(issue.subject(), "S");
    assert_eq!(
        serde_json::Value::Object(issue.extra),
        json!({"extra_field": "x"})
    );
}

#[tokio::test]
async fn test_get_issue_with_include() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues/7.json"))
        .and(query_param("include", "journals"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issue": {
                "id": 7,
                "journals": [{"id": 3, "notes": "hi", "details": []}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let args = redmine_client::Query::new().with("include", "journals");
    let issue = client_for(&server).issue_with_args(7, args).await.unwrap();

    assert_eq!(issue.fields.journals.len(), 1);
    assert_eq!(issue.fields.journals[0].notes.as_deref(), Some("hi"));
}

#[tokio::test]
async fn test_missing_issue_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues/404.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server).issue(404).await.unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_malformed_response_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues/2.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"issue\": {"))
        .mount(&server)
        .await;

    let err = client_for(&server).issue(2).await.unwrap_err();

    assert!(matches!(err, ApiError::Parse(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_create_issue_validation_error_message() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/issues.json"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({
            "issue": {"project_id": 1, "tracker_id": 2, "subject": ""}
        })))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({"errors": ["Subject can't be blank"]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let draft = IssueDraft::new(1, 2, "");
    let err = client_for(&server).create_issue(&draft).await.unwrap_err();

    assert_eq!(err.to_string(), "Subject can't be blank");
    assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
}

#[tokio::test]
async fn test_create_issue_returns_created_issue() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/issues.json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"issue": issue_json(12)})))
        .expect(1)
        .mount(&server)
        .await;

    let issue = client_for(&server)
        .create_issue(&IssueDraft::new(1, 1, "Issue 12"))
        .await
        .unwrap();

    assert_eq!(issue.title(), "Bug #12: Issue 12");
}

#[tokio::test]
async fn test_create_with_unexpected_success_status_fails() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/issues.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"issue": issue_json(1)})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create_issue(&IssueDraft::new(1, 1, "x"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::Service {
            status: StatusCode::OK,
            ..
        }
    ));
}

#[tokio::test]
async fn test_list_issues_drains_all_pages() {
    let server = MockServer::start().await;

    for (offset, ids) in [(0, vec![1, 2]), (2, vec![3, 4]), (4, vec![5])] {
        let issues: Vec<_> = ids.into_iter().map(issue_json).collect();
        Mock::given(method("GET"))
            .and(path("/issues.json"))
            .and(query_param("project_id", "web"))
            .and(query_param("limit", "2"))
            .and(query_param("offset", offset.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "issues": issues,
                "total_count": 5,
                "offset": offset,
                "limit": 2
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let issues = client_for(&server)
        .with_page_limit(Some(2))
        .issues_of("web")
        .await
        .unwrap();

    let ids: Vec<u32> = issues.iter().map(|i| i.fields.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn test_failed_page_aborts_listing() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues.json"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [issue_json(1), issue_json(2)],
            "total_count": 4,
            "offset": 0,
            "limit": 2
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/issues.json"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).issues().await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
}

#[tokio::test]
async fn test_issues_by_filter_and_saved_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/issues.json"))
        .and(query_param("status_id", "*"))
        .and(query_param("cf_5", "yes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [issue_json(8)],
            "total_count": 1,
            "offset": 0,
            "limit": 25
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/issues.json"))
        .and(query_param("query_id", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issues": [],
            "total_count": 0,
            "offset": 0,
            "limit": 25
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);

    let mut filter = IssueFilter {
        status_id: Some("*".to_string()),
        ..Default::default()
    };
    filter
        .extra_filters
        .insert("cf_5".to_string(), "yes".to_string());
    let filtered = client.issues_by_filter(&filter).await.unwrap();
    assert_eq!(filtered.len(), 1);

    assert!(client.issues_by_query(3).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_save_issue_writes_back_extras_and_resets_parent() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/issues/9.json"))
        .and(body_partial_json(json!({
            "issue": {
                "id": 9,
                "subject": "S",
                "parent_issue_id": "",
                "plugin_field": "keep"
            }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut issue = redmine_client::Issue::from_json(
        br#"{"id":9,"subject":"S","parent":{"id":4},"plugin_field":"keep"}"#,
    )
    .unwrap();
    issue.fields.parent = None;

    client_for(&server).save_issue(&issue).await.unwrap();
}

#[tokio::test]
async fn test_update_and_delete_issue() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/issues/3.json"))
        .and(body_json(json!({"issue": {"status_id": 5, "notes": "Closing"}})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/issues/3.json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let draft = IssueDraft {
        status_id: Some(5),
        notes: Some("Closing".to_string()),
        ..Default::default()
    };
    client.update_issue(3, &draft).await.unwrap();
    client.delete_issue(3).await.unwrap();
}

#[tokio::test]
async fn test_delete_missing_issue_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/issues/77.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client_for(&server).delete_issue(77).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_impersonation_header() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/issues/5.json"))
        .and(header("X-Redmine-Switch-User", "jsmith"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .acting_as("jsmith")
        .delete_issue(5)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_projects() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/web.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "project": {"id": 3, "name": "Web", "identifier": "web"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/projects.json"))
        .and(query_param("status", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "projects": [
                {"id": 3, "name": "Web", "identifier": "web"},
                {"id": 4, "name": "Api", "identifier": "api"}
            ],
            "total_count": 2,
            "offset": 0,
            "limit": 25
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/projects.json"))
        .and(body_json(json!({"project": {"name": "New", "identifier": "new"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "project": {"id": 5, "name": "New", "identifier": "new"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/projects/new.json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);

    assert_eq!(client.project("web").await.unwrap().id, 3);

    let filters = [("status".to_string(), "1".to_string())].into_iter().collect();
    let projects = client.projects_by_filter(&filters).await.unwrap();
    assert_eq!(projects.len(), 2);

    let created = client.create_project(&Project::new("New", "new")).await.unwrap();
    assert_eq!(created.id, 5);

    client.delete_project("new").await.unwrap();
}

#[tokio::test]
async fn test_memberships() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/projects/web/memberships.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "memberships": [{
                "id": 1,
                "project": {"id": 3, "name": "Web"},
                "user": {"id": 7, "name": "Ann"},
                "roles": [{"id": 4, "name": "Developer"}]
            }],
            "total_count": 1,
            "offset": 0,
            "limit": 25
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/projects/web/memberships.json"))
        .and(body_json(json!({"membership": {"user_id": 8, "role_ids": [3]}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "membership": {
                "id": 2,
                "project": {"id": 3, "name": "Web"},
                "user": {"id": 8, "name": "Bo"},
                "roles": [{"id": 3, "name": "Manager"}]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/memberships/2.json"))
        .and(body_json(json!({"membership": {"role_ids": [3, 4]}})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/memberships/99.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);

    let members = client.memberships("web").await.unwrap();
    assert_eq!(members[0].member_name(), "Ann");

    let created = client
        .create_membership(
            "web",
            &NewMembership {
                user_id: 8,
                role_ids: vec![3],
            },
        )
        .await
        .unwrap();
    assert_eq!(created.id, 2);

    client.update_membership(2, &[3, 4]).await.unwrap();

    assert!(client.membership(99).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_upload_file_returns_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/uploads.json"))
        .and(query_param("filename", "notes.txt"))
        .and(header("Content-Type", "application/octet-stream"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "upload": {"id": 7, "token": "7.ed32257a"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let file = dir.path().join("notes.txt");
    std::fs::write(&file, b"hello").unwrap();

    let upload = client_for(&server).upload_file(&file).await.unwrap();

    assert_eq!(upload.token, "7.ed32257a");
    assert_eq!(upload.filename, "notes.txt");
}

#[tokio::test]
async fn test_upload_missing_file_is_io_error() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    let err = client_for(&server)
        .upload_file(dir.path().join("absent.bin"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Io(_)));
}

#[tokio::test]
async fn test_delete_answered_with_ok_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/issues/3.json"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).delete_issue(3).await.unwrap_err();
    match err {
        ApiError::Service { status, message } => {
            assert_eq!(status, StatusCode::OK);
            assert!(message.contains("issue #3"), "message was {}", message);
        }
        other => panic!("Expected Service error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_update_project() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/projects/3.json"))
        .and(body_partial_json(json!({
            "project": {"name": "Web site", "identifier": "web", "is_public": false}
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut project = Project::new("Web site", "web");
    project.id = 3;
    project.is_public = Some(false);

    client_for(&server).update_project(&project).await.unwrap();
}

#[tokio::test]
async fn test_update_project_validation_error() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/projects/3.json"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "errors": ["Name cannot be blank", "Identifier is too long"]
        })))
        .mount(&server)
        .await;

    let mut project = Project::new("", "web");
    project.id = 3;

    let err = client_for(&server).update_project(&project).await.unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::UNPROCESSABLE_ENTITY));
    assert_eq!(err.to_string(), "Name cannot be blank\nIdentifier is too long");
}

#[tokio::test]
async fn test_delete_membership() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/memberships/2.json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/memberships/9.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.delete_membership(2).await.unwrap();
    assert!(client.delete_membership(9).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_refused_connection_is_transport_error() {
    // Grab a free port, then close it so nothing is listening.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        RedmineClient::with_credentials(&format!("http://{}", addr), API_KEY).unwrap();
    let err = client.issue(1).await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)), "got {:?}", err);
    assert!(!err.is_not_found());
}
