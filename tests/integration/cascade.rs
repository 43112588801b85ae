//! Cascade delete scenarios against the in-memory remote

use grafana_provisioner::{
    CascadeDelete, CascadeState, GrafanaClient, ProvisioningError, Provisioner,
    remote::{Method, paths},
};
use pretty_assertions::assert_eq;
use serde_json::Value;

use crate::helpers::*;

#[tokio::test]
async fn test_cascade_removes_only_the_dashboards_resources_in_order() {
    let client = GrafanaClient::new(seeded_cascade_api());

    CascadeDelete::new("abc123").run(&client, |_| {}).await.unwrap();

    let api = client.api();
    assert_eq!(
        writes(api),
        vec![
            "PUT api/v1/provisioning/policies".to_string(),
            "DELETE api/v1/provisioning/alert-rules/r1".to_string(),
            "DELETE api/dashboards/uid/abc123".to_string(),
        ]
    );

    let put = api
        .calls()
        .into_iter()
        .find(|call| call.method == Method::Put)
        .unwrap();
    let tree: Value = serde_json::from_str(put.body.as_deref().unwrap()).unwrap();
    assert_eq!(tree["routes"], serde_json::json!([route_json("ops", "r2", "other")]));
    assert_eq!(tree["group_by"], serde_json::json!(["grafana_folder", "alertname"]));

    assert_eq!(api.alert_rule_uids(), vec!["r2".to_string()]);
    assert!(api.dashboard("abc123").is_none());
    assert!(api.dashboard("other").is_some());
}

#[tokio::test]
async fn test_second_cascade_is_a_no_op() {
    let client = GrafanaClient::new(seeded_cascade_api());
    CascadeDelete::new("abc123").run(&client, |_| {}).await.unwrap();
    let calls_after_first = client.api().calls().len();

    CascadeDelete::new("abc123").run(&client, |_| {}).await.unwrap();

    let second: Vec<String> = client.api().calls()[calls_after_first..]
        .iter()
        .map(describe)
        .collect();
    assert_eq!(
        second,
        vec![
            "GET api/v1/provisioning/policies".to_string(),
            "DELETE api/dashboards/uid/abc123".to_string(),
        ]
    );
    assert_eq!(client.api().alert_rule_uids(), vec!["r2".to_string()]);
}

#[tokio::test]
async fn test_cascade_of_unknown_dashboard_succeeds() {
    let provisioner = Provisioner::new(GrafanaClient::new(seeded_cascade_api()));

    provisioner.delete_dashboard_cascade("missing").await.unwrap();

    let api = provisioner.client().api();
    assert_eq!(writes(api), vec!["DELETE api/dashboards/uid/missing".to_string()]);
    assert_eq!(api.policy_tree(), two_dashboard_tree());
}

#[tokio::test]
async fn test_resume_from_journal_after_rule_failure() {
    let dir = tempfile::tempdir().unwrap();
    let journal = dir.path().join("abc123.json");
    let client = GrafanaClient::new(seeded_cascade_api());
    client
        .api()
        .fail_on(Method::Delete, &format!("{}/r1", paths::ALERT_RULES), 502);

    let mut cascade = CascadeDelete::new("abc123");
    let err = cascade
        .run(&client, |progress| progress.save(&journal).unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ProvisioningError::PartialCascade { .. }));
    assert!(client.api().dashboard("abc123").is_some());

    let mut resumed = CascadeDelete::load(&journal).unwrap().unwrap();
    assert_eq!(
        resumed.state(),
        &CascadeState::RulesPending {
            remaining: vec!["r1".to_string()]
        }
    );

    client.api().clear_failures();
    let calls_before_resume = client.api().calls().len();
    resumed.run(&client, |_| {}).await.unwrap();

    let resumed_calls: Vec<String> = client.api().calls()[calls_before_resume..]
        .iter()
        .map(describe)
        .collect();
    assert_eq!(
        resumed_calls,
        vec![
            "DELETE api/v1/provisioning/alert-rules/r1".to_string(),
            "DELETE api/dashboards/uid/abc123".to_string(),
        ]
    );
    assert!(resumed.is_done());
}

#[tokio::test]
async fn test_failed_policy_write_deletes_nothing() {
    let client = GrafanaClient::new(seeded_cascade_api());
    client.api().fail_on(Method::Put, paths::POLICIES, 500);

    let mut cascade = CascadeDelete::new("abc123");
    let err = cascade.run(&client, |_| {}).await.unwrap_err();

    assert!(matches!(err, ProvisioningError::Rejected { status: 500, .. }));
    assert_eq!(cascade.state(), &CascadeState::RoutesPending);
    assert_eq!(client.api().alert_rule_uids().len(), 2);
    assert!(client.api().dashboard("abc123").is_some());
}
