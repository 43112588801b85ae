//! Read-only records listed by the remote: datasources, folders, contact points

use serde::Deserialize;

/// Plugin type of the Grafana-Zabbix datasource
pub const ZABBIX_DATASOURCE_TYPE: &str = "alexanderzobnin-zabbix-datasource";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Datasource {
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub url: String,
}

impl Datasource {
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Folder {
    pub uid: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContactPoint {
    #[serde(default)]
    pub uid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_datasource_from_listing() {
        let datasource: Datasource = serde_json::from_value(json!({
            "id": 3,
            "uid": "zbx01",
            "orgId": 1,
            "name": "Zabbix",
            "type": "alexanderzobnin-zabbix-datasource",
            "url": "https://zabbix.local/api_jsonrpc.php",
            "access": "proxy"
        }))
        .unwrap();

        assert!(datasource.is_kind(ZABBIX_DATASOURCE_TYPE));
        assert_eq!(datasource.uid, "zbx01");
    }

    #[test]
    fn test_datasource_without_url() {
        let datasource: Datasource = serde_json::from_value(json!({
            "uid": "x", "name": "TestData", "type": "testdata"
        }))
        .unwrap();

        assert!(datasource.url.is_empty());
        assert!(!datasource.is_kind(ZABBIX_DATASOURCE_TYPE));
    }
}
