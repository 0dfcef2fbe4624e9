//! HTTP adapter for the Ranger public v1 REST API.
//!
//! | call        | request                                             |
//! |-------------|-----------------------------------------------------|
//! | search      | `GET /service/public/api/policy?policyName=&repositoryType=` |
//! | create      | `POST /service/public/api/policy`                   |
//! | update      | `PUT /service/public/api/policy/{id}`               |
//! | delete      | `DELETE /service/public/api/policy/{id}`            |
//! | groups      | `GET /service/xusers/groups[?name=]`                |
//!
//! All requests use basic auth and the agent timeout from the connection
//! config. No retries.
//!
//! `search` returns only hdfs and hive policies. Policies from other
//! repository types (hbase, kafka, ...) have no [`ResourceKind`] and are
//! dropped with a debug log, so an unfiltered search can list fewer rows
//! than Ranger holds.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use base64::Engine as _;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use ranger_sync_core::{Group, PolicyId, PolicyQuery, RangerConnection, RemotePolicy, ResourceKind};

use crate::client::{PermMap, PolicyClient, PolicyPayload};
use crate::error::ClientError;

const POLICY_PATH: &str = "/service/public/api/policy";
const GROUPS_PATH: &str = "/service/xusers/groups";

/// Blocking Ranger client built from an immutable [`RangerConnection`].
pub struct RangerRestClient {
    agent: ureq::Agent,
    base_url: String,
    authorization: String,
}

impl RangerRestClient {
    pub fn new(connection: &RangerConnection) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(connection.timeout_secs))
            .build();
        let credentials = format!("{}:{}", connection.username, connection.password);
        Self {
            agent,
            base_url: connection.base_url(),
            authorization: format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(credentials)
            ),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &self.authorization)
            .set("Accept", "application/json")
    }

    fn read_json<T: DeserializeOwned>(url: &str, response: ureq::Response) -> Result<T, ClientError> {
        response.into_json::<T>().map_err(|e| ClientError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

impl PolicyClient for RangerRestClient {
    fn search(&self, query: &PolicyQuery) -> Result<Vec<RemotePolicy>, ClientError> {
        let url = self.url(POLICY_PATH);
        let mut request = self.request("GET", &url);
        for (key, value) in query_params(query) {
            request = request.query(key, &value);
        }
        let response = request.call().map_err(|e| map_error(&url, e))?;
        let list: PolicyList = Self::read_json(&url, response)?;
        Ok(list
            .policies
            .into_iter()
            .filter_map(|policy| {
                let converted = policy.into_remote();
                if converted.is_none() {
                    tracing::debug!(url = %url, "skipping policy of unmanaged repository type");
                }
                converted
            })
            .collect())
    }

    fn create(&self, payload: &PolicyPayload) -> Result<(), ClientError> {
        let url = self.url(POLICY_PATH);
        self.request("POST", &url)
            .send_json(payload)
            .map_err(|e| map_error(&url, e))?;
        Ok(())
    }

    fn update(&self, payload: &PolicyPayload, policy_id: PolicyId) -> Result<(), ClientError> {
        let url = self.url(&format!("{POLICY_PATH}/{policy_id}"));
        self.request("PUT", &url)
            .send_json(payload)
            .map_err(|e| map_error(&url, e))?;
        Ok(())
    }

    fn delete(&self, policy_id: PolicyId) -> Result<(), ClientError> {
        let url = self.url(&format!("{POLICY_PATH}/{policy_id}"));
        self.request("DELETE", &url)
            .call()
            .map_err(|e| map_error(&url, e))?;
        Ok(())
    }

    fn get_group(&self, name: &str) -> Result<Option<Group>, ClientError> {
        let url = self.url(GROUPS_PATH);
        let response = self
            .request("GET", &url)
            .query("name", name)
            .call()
            .map_err(|e| map_error(&url, e))?;
        let list: GroupList = Self::read_json(&url, response)?;
        // The name filter is a substring match on the server side.
        Ok(list
            .groups
            .into_iter()
            .find(|g| g.name == name)
            .map(Into::into))
    }

    fn list_groups(&self) -> Result<Vec<Group>, ClientError> {
        let url = self.url(GROUPS_PATH);
        let response = self
            .request("GET", &url)
            .call()
            .map_err(|e| map_error(&url, e))?;
        let list: GroupList = Self::read_json(&url, response)?;
        Ok(list.groups.into_iter().map(Into::into).collect())
    }
}

/// Wire query parameters for a typed search.
pub fn query_params(query: &PolicyQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(name) = &query.policy_name {
        params.push(("policyName", name.clone()));
    }
    if let Some(kind) = query.resource_kind {
        params.push(("repositoryType", kind.as_str().to_string()));
    }
    params
}

fn map_error(url: &str, err: ureq::Error) -> ClientError {
    match err {
        ureq::Error::Status(status, response) => ClientError::Status {
            status,
            url: url.to_string(),
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => ClientError::Transport {
            url: url.to_string(),
            message: transport.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PolicyList {
    #[serde(rename = "vXPolicies", default)]
    policies: Vec<WirePolicy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePolicy {
    id: u64,
    policy_name: String,
    repository_type: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    is_enabled: bool,
    #[serde(default)]
    is_recursive: bool,
    #[serde(default)]
    is_audit_enabled: bool,
    #[serde(default)]
    perm_map_list: Vec<PermMap>,
}

impl WirePolicy {
    /// `None` for repository types other than hdfs / hive.
    fn into_remote(self) -> Option<RemotePolicy> {
        let resource_kind: ResourceKind = self.repository_type.parse().ok()?;
        let mut group_permissions: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for map in self.perm_map_list {
            for group in map.group_list {
                group_permissions
                    .entry(group)
                    .or_default()
                    .extend(map.perm_list.iter().cloned());
            }
        }
        Some(RemotePolicy {
            policy_id: PolicyId(self.id),
            policy_name: self.policy_name,
            resource_kind,
            description: self.description.unwrap_or_default(),
            enabled: self.is_enabled,
            recursive: self.is_recursive,
            audit_enabled: self.is_audit_enabled,
            group_permissions,
        })
    }
}

#[derive(Debug, Deserialize)]
struct GroupList {
    #[serde(rename = "vXGroups", default)]
    groups: Vec<WireGroup>,
}

#[derive(Debug, Deserialize)]
struct WireGroup {
    id: u64,
    name: String,
    #[serde(default)]
    description: Option<String>,
}

impl From<WireGroup> for Group {
    fn from(g: WireGroup) -> Self {
        Group {
            id: g.id,
            name: g.name,
            description: g.description,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// Captured request: request line, headers (lower-cased names), body.
    struct Captured {
        request_line: String,
        headers: Vec<(String, String)>,
        body: String,
    }

    impl Captured {
        fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
        }
    }

    /// Serve exactly one canned response on a random local port.
    fn serve_once(status_line: &str, body: &str) -> (RangerConnection, mpsc::Receiver<Captured>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut request_line = String::new();
            reader.read_line(&mut request_line).expect("request line");
            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("header");
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((k, v)) = line.split_once(':') {
                    headers.push((k.trim().to_ascii_lowercase(), v.trim().to_string()));
                }
            }
            let length = headers
                .iter()
                .find(|(k, _)| k == "content-length")
                .and_then(|(_, v)| v.parse::<usize>().ok())
                .unwrap_or(0);
            let mut body = vec![0u8; length];
            reader.read_exact(&mut body).expect("body");
            let mut stream = stream;
            stream.write_all(response.as_bytes()).expect("write");
            stream.flush().expect("flush");
            let _ = tx.send(Captured {
                request_line: request_line.trim_end().to_string(),
                headers,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        });

        let mut connection =
            RangerConnection::new("127.0.0.1", port, "admin", "secret", "cl1_hadoop", "cl1_hive");
        connection.timeout_secs = 5;
        (connection, rx)
    }

    #[test]
    fn query_params_use_wire_names() {
        let params = query_params(&PolicyQuery::for_policy("nifi_a_b_hive", ResourceKind::Table));
        assert_eq!(
            params,
            vec![
                ("policyName", "nifi_a_b_hive".to_string()),
                ("repositoryType", "hive".to_string())
            ]
        );
        assert!(query_params(&PolicyQuery::default()).is_empty());
    }

    #[test]
    fn search_sends_criteria_and_decodes_policies() {
        let body = r#"{"startIndex":0,"resultSize":2,"vXPolicies":[
            {"id":42,"policyName":"nifi_sales_orders_hdfs","repositoryType":"hdfs",
             "isEnabled":true,"isRecursive":true,"isAuditEnabled":true,
             "permMapList":[{"groupList":["analysts"],"permList":["read"]}]},
            {"id":7,"policyName":"other","repositoryType":"hbase"}]}"#;
        let (connection, rx) = serve_once("200 OK", body);
        let client = RangerRestClient::new(&connection);

        let policies = client
            .search(&PolicyQuery::for_policy("nifi_sales_orders_hdfs", ResourceKind::Path))
            .expect("search");

        assert_eq!(policies.len(), 1, "hbase policy is not a managed kind");
        assert_eq!(policies[0].policy_id, PolicyId(42));
        assert_eq!(policies[0].resource_kind, ResourceKind::Path);
        assert!(policies[0].group_permissions["analysts"].contains("read"));

        let captured = rx.recv().expect("captured request");
        assert!(captured.request_line.starts_with("GET /service/public/api/policy?"));
        assert!(captured.request_line.contains("policyName=nifi_sales_orders_hdfs"));
        assert!(captured.request_line.contains("repositoryType=hdfs"));
        assert_eq!(captured.header("authorization"), Some("Basic YWRtaW46c2VjcmV0"));
    }

    #[test]
    fn create_posts_json_payload() {
        let (connection, rx) = serve_once("200 OK", "{}");
        let client = RangerRestClient::new(&connection);
        let groups = vec!["analysts".to_string()];
        let payload = PolicyPayload {
            policy_name: "nifi_sales_orders_hive".to_string(),
            repository_name: "cl1_hive".to_string(),
            repository_type: ResourceKind::Table,
            description: "d".to_string(),
            is_enabled: true,
            is_audit_enabled: true,
            is_recursive: None,
            resource_name: None,
            databases: Some("sales".to_string()),
            tables: Some("orders".to_string()),
            columns: Some("*".to_string()),
            udfs: Some(String::new()),
            perm_map_list: PolicyPayload::grant_to(&groups, &["select"]),
        };

        client.create(&payload).expect("create");

        let captured = rx.recv().expect("captured request");
        assert!(captured.request_line.starts_with("POST /service/public/api/policy "));
        let sent: serde_json::Value = serde_json::from_str(&captured.body).expect("json body");
        assert_eq!(sent["repositoryType"], "hive");
        assert_eq!(sent["columns"], "*");
        assert_eq!(sent["permMapList"][0]["permList"][0], "select");
    }

    #[test]
    fn error_status_maps_to_status_error() {
        let (connection, _rx) = serve_once("404 Not Found", r#"{"msgDesc":"no such policy"}"#);
        let client = RangerRestClient::new(&connection);

        let err = client.delete(PolicyId(42)).unwrap_err();
        match err {
            ClientError::Status { status, url, body } => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/service/public/api/policy/42"));
                assert!(body.contains("no such policy"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[test]
    fn unreachable_host_maps_to_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        drop(listener);
        let mut connection =
            RangerConnection::new("127.0.0.1", port, "admin", "secret", "cl1_hadoop", "cl1_hive");
        connection.timeout_secs = 2;
        let client = RangerRestClient::new(&connection);

        let err = client.list_groups().unwrap_err();
        assert!(matches!(err, ClientError::Transport { .. }), "got {err:?}");
    }

    #[test]
    fn get_group_picks_exact_name() {
        let body = r#"{"vXGroups":[{"id":1,"name":"analysts-eu"},{"id":2,"name":"analysts","description":"BI"}]}"#;
        let (connection, rx) = serve_once("200 OK", body);
        let client = RangerRestClient::new(&connection);

        let group = client.get_group("analysts").expect("get").expect("found");
        assert_eq!(group.id, 2);
        assert_eq!(group.description.as_deref(), Some("BI"));

        let captured = rx.recv().expect("captured request");
        assert!(captured.request_line.contains("name=analysts"));
    }
}
