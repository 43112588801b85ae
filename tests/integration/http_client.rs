//! HTTP behavior of the remote client against a mock server

use grafana_provisioner::{
    CascadeDelete, ProvisioningError,
    model::{DashboardDocument, DashboardWrapper, ToDocument},
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::*;

#[tokio::test]
async fn test_requests_carry_bearer_token_and_json_content_type() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/folders"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "uid": "infra-uid", "title": "Infrastructure" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let folders = http_client(&server.uri(), 0).find_folders().await.unwrap();

    assert_eq!(folders[0].uid, "infra-uid");
}

#[tokio::test]
async fn test_retries_on_503_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/datasources"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/datasources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "uid": "zbx", "name": "Zabbix", "type": "alexanderzobnin-zabbix-datasource" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let datasources = http_client(&server.uri(), 3)
        .find_zabbix_datasources()
        .await
        .unwrap();

    assert_eq!(datasources.len(), 1);
}

#[tokio::test]
async fn test_retry_budget_is_bounded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/provisioning/policies"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(3)
        .mount(&server)
        .await;

    let err = http_client(&server.uri(), 2)
        .get_notification_policies()
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisioningError::Rejected { status: 503, .. }));
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/dashboards/db"))
        .respond_with(ResponseTemplate::new(412).set_body_json(json!({ "status": "version-mismatch" })))
        .expect(1)
        .mount(&server)
        .await;

    let wrapper = DashboardWrapper::new(DashboardDocument::new("CPU").unwrap(), "f1").unwrap();
    let err = http_client(&server.uri(), 3)
        .save_dashboard(&wrapper)
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisioningError::Rejected { status: 412, .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_timed_out_rule_post_is_not_resent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/provisioning/alert-rules"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/provisioning/alert-rules/cpu01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "uid": "cpu01" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = http_client_with_timeout(&server.uri(), 3, Duration::from_millis(300));
    let uid = client.add_alert_rule(&fixed_rule("cpu01")).await.unwrap();

    assert_eq!(uid, "cpu01");
}

#[tokio::test]
async fn test_timed_out_rule_post_without_rule_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/provisioning/alert-rules"))
        .respond_with(ResponseTemplate::new(201).set_delay(Duration::from_secs(2)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/provisioning/alert-rules/cpu01"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = http_client_with_timeout(&server.uri(), 3, Duration::from_millis(300));
    let err = client.add_alert_rule(&fixed_rule("cpu01")).await.unwrap_err();

    assert!(matches!(err, ProvisioningError::Transient { attempts: 1, .. }));
}

#[tokio::test]
async fn test_rule_post_is_not_retried_on_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/provisioning/alert-rules"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let err = http_client(&server.uri(), 3)
        .add_alert_rule(&fixed_rule("cpu01"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisioningError::Rejected { status: 502, .. }));
}

#[tokio::test]
async fn test_rule_post_is_retried_when_refused() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/provisioning/alert-rules"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/provisioning/alert-rules"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let uid = http_client(&server.uri(), 3)
        .add_alert_rule(&fixed_rule("cpu01"))
        .await
        .unwrap();

    assert_eq!(uid, "cpu01");
}

#[tokio::test]
async fn test_save_dashboard_posts_wrapper_document() {
    let server = MockServer::start().await;
    let dashboard = DashboardDocument::new("CPU").unwrap().with_uid("abc123").unwrap();
    let wrapper = DashboardWrapper::new(dashboard, "f1").unwrap().with_message("update");

    Mock::given(method("POST"))
        .and(path("/api/dashboards/db"))
        .and(body_json(wrapper.to_document()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7, "uid": "abc123", "url": "/d/abc123/cpu", "status": "success", "version": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let saved = http_client(&server.uri(), 0).save_dashboard(&wrapper).await.unwrap();

    assert_eq!(saved.id, Some(7));
    assert_eq!(saved.version, Some(3));
}

#[tokio::test]
async fn test_deleting_absent_resources_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/provisioning/alert-rules/r1"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/dashboards/uid/abc123"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Dashboard not found" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = http_client(&server.uri(), 0);
    client.delete_alert_rule("r1").await.unwrap();
    client.delete_dashboard("abc123").await.unwrap();
}

#[tokio::test]
async fn test_cascade_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/provisioning/policies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_dashboard_tree()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/provisioning/policies"))
        .and(body_json(json!({
            "receiver": "grafana-default-email",
            "group_by": ["grafana_folder", "alertname"],
            "routes": [route_json("ops", "r2", "other")]
        })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/provisioning/alert-rules/r1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/dashboards/uid/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "title": "Hosts" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = http_client(&server.uri(), 0);
    let mut cascade = CascadeDelete::new("abc123");
    cascade.run(&client, |_| {}).await.unwrap();

    assert!(cascade.is_done());
}
