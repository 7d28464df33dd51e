use serde::{Deserialize, Serialize};
use serde_json::json;

use super::client::ApiClient;
use super::error::ApiError;

/// A backend row naming a presentation group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub relative_path: String,
    #[serde(default)]
    pub canonical_path: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub path_status: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPage {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub items: Vec<Record>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub q: Option<String>,
    pub tag: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListParams {
    fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        if let Some(q) = non_empty(&self.q) {
            query.push(("q", q));
        }
        if let Some(tag) = non_empty(&self.tag) {
            query.push(("tag", tag));
        }
        if let Some(sort) = non_empty(&self.sort) {
            query.push(("sort", sort));
        }
        if let Some(limit) = self.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            query.push(("offset", offset.to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordInput {
    pub name: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

impl RecordInput {
    fn to_body(&self) -> serde_json::Value {
        let blank_as_null = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
        json!({
            "name": self.name,
            "title": blank_as_null(&self.title),
            "description": blank_as_null(&self.description),
            "tags": self.tags,
        })
    }
}

pub struct PptsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> PptsApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub fn list(&self, params: &ListParams) -> Result<RecordPage, ApiError> {
        self.client.get("/ppts", &params.to_query())
    }

    pub fn get(&self, id: i64) -> Result<Record, ApiError> {
        self.client.get(&format!("/ppts/{id}"), &[])
    }

    pub fn create(&self, input: &RecordInput) -> Result<Record, ApiError> {
        self.client.post("/ppts", Some(input.to_body()))
    }

    pub fn update(&self, id: i64, input: &RecordInput) -> Result<Record, ApiError> {
        self.client.patch(&format!("/ppts/{id}"), input.to_body())
    }

    pub fn delete(&self, id: i64) -> Result<(), ApiError> {
        let _: serde_json::Value = self.client.delete(&format!("/ppts/{id}"))?;
        Ok(())
    }

    /// Looks for a record whose name is exactly `name`.
    pub fn find_by_name(&self, name: &str) -> Result<Option<Record>, ApiError> {
        let page = self.list(&ListParams {
            q: Some(name.to_string()),
            limit: Some(1),
            ..ListParams::default()
        })?;
        Ok(page.items.into_iter().find(|r| r.name == name))
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::http::testing::FakeTransport;
    use crate::session::SessionContext;

    pub const RECORD_JSON: &str = r#"{"id":5,"name":"q3-review","title":null,"groupName":"q3-review",
        "description":"numbers","relativePath":"q3-review","canonicalPath":"/srv/q3-review",
        "tags":["finance"],"pathStatus":"ok","createdAt":"2024-01-01T00:00:00Z","updatedAt":null}"#;

    fn client(transport: &Rc<FakeTransport>) -> ApiClient {
        ApiClient::new(
            transport.clone(),
            "http://api.test/api/v1",
            Rc::new(SessionContext::in_memory()),
        )
    }

    #[test]
    fn test_list_sends_only_set_params() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(200, &format!(r#"{{"total":1,"limit":20,"offset":0,"items":[{RECORD_JSON}]}}"#));
        let api = client(&transport);

        let page = PptsApi::new(&api)
            .list(&ListParams {
                q: Some("q3".into()),
                tag: Some(String::new()),
                sort: Some("created_at_desc".into()),
                ..ListParams::default()
            })
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].tags, vec!["finance"]);
        assert_eq!(page.items[0].title, None);

        let query = transport.requests.borrow()[0].query.clone();
        assert_eq!(
            query,
            vec![
                ("q".to_string(), "q3".to_string()),
                ("sort".to_string(), "created_at_desc".to_string()),
            ]
        );
    }

    #[test]
    fn test_create_sends_nulls_for_blank_fields() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(201, RECORD_JSON);
        let api = client(&transport);

        let record = PptsApi::new(&api)
            .create(&RecordInput {
                name: "q3-review".into(),
                title: Some(String::new()),
                description: Some("numbers".into()),
                tags: vec![],
            })
            .unwrap();
        assert_eq!(record.id, 5);

        let body = transport.requests.borrow()[0].body.clone().unwrap();
        assert!(body["title"].is_null());
        assert_eq!(body["description"], "numbers");
        assert_eq!(body["tags"], serde_json::json!([]));
    }

    #[test]
    fn test_find_by_name_requires_exact_match() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(200, &format!(r#"{{"items":[{RECORD_JSON}]}}"#));
        transport.respond(200, &format!(r#"{{"items":[{RECORD_JSON}]}}"#));
        let api = client(&transport);
        let ppts = PptsApi::new(&api);

        assert!(ppts.find_by_name("q3-review").unwrap().is_some());
        assert!(ppts.find_by_name("q3").unwrap().is_none());
        let query = transport.requests.borrow()[0].query.clone();
        assert!(query.contains(&("limit".to_string(), "1".to_string())));
    }

    #[test]
    fn test_delete_and_update_paths() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(204, "").respond(200, RECORD_JSON);
        let api = client(&transport);
        let ppts = PptsApi::new(&api);

        ppts.delete(5).unwrap();
        ppts.update(5, &RecordInput::default()).unwrap();
        let requests = transport.requests.borrow();
        assert!(requests[0].url.ends_with("/ppts/5"));
        assert_eq!(requests[1].method, crate::http::Method::Patch);
    }
}
