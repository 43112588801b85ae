//! Helper functions for integration tests

use std::time::Duration;

use grafana_provisioner::{
    GrafanaClient,
    model::datasource::ZABBIX_DATASOURCE_TYPE,
    model::{AlertCondition, AlertRule, Evaluator, Operator, PrometheusTarget, Reducer, Target},
    plan::ProvisioningPlan,
    remote::{HttpApi, MemoryApi, Method, RecordedCall, backoff::BackoffConfig},
};
use serde_json::{Value, json};

pub const API_KEY: &str = "test-key";

pub fn route_json(receiver: &str, rule_uid: &str, dashboard_uid: &str) -> Value {
    json!({
        "receiver": receiver,
        "object_matchers": [["rule_uid", "=", rule_uid], ["dashboard_uid", "=", dashboard_uid]]
    })
}

/// Policy tree with one route on `abc123` (rule `r1`) and one on `other` (rule `r2`)
pub fn two_dashboard_tree() -> Value {
    json!({
        "receiver": "grafana-default-email",
        "group_by": ["grafana_folder", "alertname"],
        "routes": [route_json("ops", "r1", "abc123"), route_json("ops", "r2", "other")]
    })
}

pub fn seeded_cascade_api() -> MemoryApi {
    MemoryApi::new()
        .with_dashboard("abc123", json!({ "uid": "abc123", "title": "Hosts" }))
        .with_dashboard("other", json!({ "uid": "other", "title": "Other" }))
        .with_alert_rule("r1", json!({ "uid": "r1" }))
        .with_alert_rule("r2", json!({ "uid": "r2" }))
        .with_policy_tree(two_dashboard_tree())
}

pub fn seeded_provisioning_api() -> MemoryApi {
    MemoryApi::new()
        .with_folder("infra-uid", "Infrastructure")
        .with_datasource(json!({ "uid": "prom", "name": "Prometheus", "type": "prometheus" }))
        .with_datasource(json!({ "uid": "zbx", "name": "Zabbix", "type": ZABBIX_DATASOURCE_TYPE }))
}

pub fn plan_json() -> Value {
    json!({
        "folder_title": "Infrastructure",
        "message": "provisioned by tests",
        "dashboard": {
            "title": "Linux Hosts",
            "uid": "abc123",
            "tags": ["zabbix", "linux"],
            "panels": [
                {
                    "type": "row",
                    "title": "CPU",
                    "panels": [
                        {
                            "type": "stat",
                            "title": "CPU load",
                            "targets": [ { "zabbix": { "group": "Linux", "host": "web01", "item": "CPU load" } } ],
                            "mappings": [
                                { "type": "value", "value": "0", "text": "idle" },
                                { "type": "range", "from": 1, "to": 90, "text": "ok" },
                                { "type": "special", "match": "null", "text": "n/a" }
                            ]
                        }
                    ]
                }
            ]
        },
        "alerts": [
            {
                "title": "CPU load too high",
                "target": { "zabbix": { "group": "Linux", "host": "web01", "item": "CPU load" } },
                "conditions": [ { "evaluator": { "type": "gt", "params": [90] }, "reducer": "max" } ],
                "message": "web01 is overloaded",
                "panel_id": "2",
                "receiver": "ops"
            },
            {
                "title": "CPU load missing",
                "datasource_uid": "prom",
                "target": { "prometheus": { "expression": "node_load1" } },
                "conditions": [ { "evaluator": { "type": "no_value" } } ],
                "for": "10m"
            }
        ]
    })
}

pub fn plan() -> ProvisioningPlan {
    serde_json::from_value(plan_json()).unwrap()
}

/// Mutating calls only, rendered as `METHOD path`
pub fn writes(api: &MemoryApi) -> Vec<String> {
    api.calls()
        .iter()
        .filter(|call| call.method != Method::Get)
        .map(describe)
        .collect()
}

pub fn describe(call: &RecordedCall) -> String {
    format!("{} {}", call.method, call.path)
}

pub fn http_client(uri: &str, max_retries: usize) -> GrafanaClient<HttpApi> {
    http_client_with_timeout(uri, max_retries, Duration::from_secs(5))
}

pub fn http_client_with_timeout(uri: &str, max_retries: usize, timeout: Duration) -> GrafanaClient<HttpApi> {
    let api = HttpApi::new(uri, API_KEY, timeout, BackoffConfig::immediate(max_retries)).unwrap();
    GrafanaClient::new(api)
}

/// Prometheus rule with a fixed uid
pub fn fixed_rule(uid: &str) -> AlertRule {
    let target = Target::from(PrometheusTarget::new("node_load1"));
    let condition =
        AlertCondition::new(&target, Evaluator::greater_than(4.0), Operator::And, Reducer::Avg).unwrap();
    AlertRule::builder("Load high", "infra-uid", "prom", target)
        .uid(uid)
        .condition(condition)
        .build()
        .unwrap()
}
