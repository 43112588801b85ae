//! Provisioning a plan against the in-memory remote

use grafana_provisioner::{
    GrafanaClient, ProvisioningError, Provisioner,
    remote::{MemoryApi, Method, paths},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use crate::helpers::*;

fn provisioner(api: MemoryApi) -> Provisioner<MemoryApi> {
    Provisioner::new(GrafanaClient::new(api))
}

#[tokio::test]
async fn test_provision_publishes_dashboard_rules_and_routes() {
    let provisioner = provisioner(seeded_provisioning_api());

    let report = provisioner.provision(&plan()).await.unwrap();

    assert_eq!(report.dashboard_uid, "abc123");
    assert_eq!(report.dashboard_url, "/d/abc123/linux-hosts");
    assert_eq!(report.rule_uids.len(), 2);
    assert_eq!(report.route_count, 2);

    let api = provisioner.client().api();
    let dashboard = api.dashboard("abc123").unwrap();
    assert_eq!(dashboard["title"], "Linux Hosts");
    let stat = &dashboard["panels"][0]["panels"][0];
    assert_eq!(stat["id"], 2);
    let kinds: Vec<&str> = stat["fieldConfig"]["defaults"]["mappings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["value", "range", "special"]);

    let first_rule = api.alert_rule(&report.rule_uids[0]).unwrap();
    assert_eq!(first_rule["folderUID"], "infra-uid");
    assert_eq!(first_rule["data"][0]["datasourceUid"], "zbx");
    assert_eq!(first_rule["labels"]["dashboard_uid"], "abc123");
    assert_eq!(first_rule["annotations"]["__panelId__"], "2");
    assert!(
        first_rule["title"]
            .as_str()
            .unwrap()
            .starts_with(&format!("[{}] ", report.rule_uids[0]))
    );

    let second_rule = api.alert_rule(&report.rule_uids[1]).unwrap();
    assert_eq!(second_rule["data"][0]["datasourceUid"], "prom");
    assert_eq!(second_rule["for"], "10m");

    let tree = api.policy_tree();
    assert_eq!(
        tree["routes"],
        json!([
            route_json("ops", &report.rule_uids[0], "abc123"),
            route_json("grafana-default-email", &report.rule_uids[1], "abc123"),
        ])
    );
}

#[tokio::test]
async fn test_provision_writes_in_order() {
    let provisioner = provisioner(seeded_provisioning_api());
    provisioner.provision(&plan()).await.unwrap();

    assert_eq!(
        writes(provisioner.client().api()),
        vec![
            "POST api/dashboards/db".to_string(),
            "POST api/v1/provisioning/alert-rules".to_string(),
            "PUT api/v1/provisioning/policies".to_string(),
            "POST api/v1/provisioning/alert-rules".to_string(),
            "PUT api/v1/provisioning/policies".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_unknown_folder_title_writes_nothing() {
    let api = MemoryApi::new().with_folder("x", "Somewhere else");
    let provisioner = provisioner(api);

    let err = provisioner.provision(&plan()).await.unwrap_err();

    assert!(err.to_string().contains("Infrastructure"));
    assert!(writes(provisioner.client().api()).is_empty());
}

#[tokio::test]
async fn test_missing_zabbix_datasource_writes_nothing() {
    let api = MemoryApi::new().with_folder("infra-uid", "Infrastructure");
    let provisioner = provisioner(api);

    let err = provisioner.provision(&plan()).await.unwrap_err();

    assert!(matches!(err, ProvisioningError::Rejected { status: 404, .. }));
    assert!(writes(provisioner.client().api()).is_empty());
}

#[tokio::test]
async fn test_rule_rejection_aborts_before_routes() {
    let provisioner = provisioner(seeded_provisioning_api());
    provisioner
        .client()
        .api()
        .fail_on(Method::Post, paths::ALERT_RULES, 400);

    let err = provisioner.provision(&plan()).await.unwrap_err();

    assert!(matches!(err, ProvisioningError::Rejected { status: 400, .. }));
    let api = provisioner.client().api();
    assert!(api.dashboard("abc123").is_some());
    assert_eq!(api.policy_tree()["routes"], json!([]));
}

#[tokio::test]
async fn test_missing_root_receiver_writes_nothing() {
    let api = seeded_provisioning_api().with_policy_tree(json!({ "routes": [] }));
    let provisioner = provisioner(api);

    let err = provisioner.provision(&plan()).await.unwrap_err();

    assert!(matches!(err, ProvisioningError::Rejected { status: 404, .. }));
    assert!(err.to_string().contains("CPU load missing"));
    assert!(writes(provisioner.client().api()).is_empty());
}

#[tokio::test]
async fn test_failed_route_link_removes_the_rule() {
    let provisioner = provisioner(seeded_provisioning_api());
    let api = provisioner.client().api();
    api.fail_on(Method::Put, paths::POLICIES, 500);

    let err = provisioner.provision(&plan()).await.unwrap_err();

    assert!(matches!(err, ProvisioningError::Rejected { status: 500, .. }));
    assert!(api.dashboard("abc123").is_some());
    assert!(api.alert_rule_uids().is_empty());

    let written = writes(api);
    assert_eq!(written.len(), 4);
    assert_eq!(written[2], "PUT api/v1/provisioning/policies");
    assert!(written[3].starts_with("DELETE api/v1/provisioning/alert-rules/"));
}

#[tokio::test]
async fn test_later_rejection_keeps_earlier_rules_reachable() {
    let api = seeded_provisioning_api().with_alert_rule("dup", json!({ "uid": "dup" }));
    let provisioner = provisioner(api);
    let mut plan = plan();
    plan.alerts[1].uid = Some("dup".to_string());

    let err = provisioner.provision(&plan).await.unwrap_err();
    assert!(matches!(err, ProvisioningError::Rejected { status: 409, .. }));

    provisioner.delete_dashboard_cascade("abc123").await.unwrap();

    let api = provisioner.client().api();
    assert_eq!(api.alert_rule_uids(), vec!["dup".to_string()]);
    assert_eq!(api.policy_tree()["routes"], json!([]));
}

#[tokio::test]
async fn test_republishing_sends_identical_dashboard_body() {
    let provisioner = provisioner(seeded_provisioning_api());
    let plan = plan();

    provisioner.provision(&plan).await.unwrap();
    provisioner.provision(&plan).await.unwrap();

    let bodies: Vec<String> = provisioner
        .client()
        .api()
        .calls()
        .into_iter()
        .filter(|call| call.path == paths::DASHBOARDS_DB)
        .filter_map(|call| call.body)
        .collect();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0], bodies[1]);

    let body: Value = serde_json::from_str(&bodies[0]).unwrap();
    assert_eq!(body["overwrite"], true);
    assert_eq!(body["folderUid"], "infra-uid");
}

#[tokio::test]
async fn test_provision_then_cascade_leaves_remote_clean() {
    let provisioner = provisioner(seeded_provisioning_api());
    let report = provisioner.provision(&plan()).await.unwrap();

    provisioner
        .delete_dashboard_cascade(&report.dashboard_uid)
        .await
        .unwrap();

    let api = provisioner.client().api();
    assert!(api.dashboard("abc123").is_none());
    assert!(api.alert_rule_uids().is_empty());
    assert_eq!(api.policy_tree()["routes"], json!([]));
}
