//! Authoring endpoints. Bodies are read leniently: anything that is not a
//! JSON object is treated as `{}` and missing fields take their defaults.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use serde_json::{Map, Value, json};

use super::DevState;
use super::error::DevApiError;
use super::files::PresentationFiles;

type Reply = Result<Json<Value>, DevApiError>;

struct Body(Map<String, Value>);

impl Body {
    fn parse(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(Value::Object(map)) => Body(map),
            _ => Body(Map::new()),
        }
    }

    /// String field; numbers and booleans are stringified, null is empty.
    fn text(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// Integer field, accepting numeric strings.
    fn int(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn value(&self, key: &str) -> Value {
        self.0.get(key).cloned().unwrap_or(Value::Null)
    }
}

/// Runs a file operation off the async workers.
async fn blocking<T, F>(state: DevState, op: F) -> Result<T, DevApiError>
where
    T: Send + 'static,
    F: FnOnce(&PresentationFiles) -> Result<T, super::files::FileOpsError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || op(&state.files))
        .await
        .map_err(|e| DevApiError::Internal(e.to_string()))?
        .map_err(DevApiError::from)
}

pub async fn create_slide(State(state): State<DevState>, body: Bytes) -> Reply {
    let body = Body::parse(&body);
    let (group, file) = (body.text("group"), body.text("file"));
    let (template, title) = (body.text("template"), body.text("title"));
    let slide = blocking(state, move |files| {
        files.create_slide(&group, &file, &template, &title)
    })
    .await?;
    Ok(Json(json!({ "ok": true, "slide": slide })))
}

pub async fn duplicate_slide(State(state): State<DevState>, body: Bytes) -> Reply {
    let body = Body::parse(&body);
    let (group, source_file) = (body.text("group"), body.text("sourceFile"));
    let source_title = body.text("sourceTitle");
    let slide = blocking(state, move |files| {
        files.duplicate_slide(&group, &source_file, &source_title)
    })
    .await?;
    Ok(Json(json!({ "ok": true, "slide": slide })))
}

pub async fn reorder_slides(State(state): State<DevState>, body: Bytes) -> Reply {
    let body = Body::parse(&body);
    let (Some(from), Some(to)) = (body.int("from"), body.int("to")) else {
        return Err(DevApiError::BadRequest("Invalid indices".into()));
    };
    let group = body.text("group");
    blocking(state, move |files| files.reorder_slides(&group, from, to)).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn delete_slide(State(state): State<DevState>, body: Bytes) -> Reply {
    let body = Body::parse(&body);
    let (group, id, file) = (body.text("group"), body.text("id"), body.text("file"));
    blocking(state, move |files| files.delete_slide(&group, &id, &file)).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn create_presentation(State(state): State<DevState>, body: Bytes) -> Reply {
    let body = Body::parse(&body);
    let (group, title) = (body.text("group"), body.text("title"));
    let description = body.text("description");
    let created = blocking(state, move |files| {
        files.create_presentation(&group, &title, &description)
    })
    .await?;
    Ok(Json(json!({
        "ok": true,
        "group": created.paths.group,
        "paths": {
            "slidesDir": created.paths.slides_dir,
            "configPath": created.paths.config_path,
        },
        "config": created.config,
    })))
}

pub async fn save_config(State(state): State<DevState>, body: Bytes) -> Reply {
    let body = Body::parse(&body);
    let (group, config) = (body.text("group"), body.value("config"));
    blocking(state, move |files| files.save_config(&group, config)).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn save_slide(State(state): State<DevState>, body: Bytes) -> Reply {
    let body = Body::parse(&body);
    let (group, file) = (body.text("group"), body.text("file"));
    let html = match body.value("html") {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    };
    blocking(state, move |files| files.save_slide_html(&group, &file, &html)).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_is_lenient() {
        assert!(Body::parse(b"{not json").0.is_empty());
        assert!(Body::parse(b"[1,2]").0.is_empty());
        assert!(Body::parse(b"").0.is_empty());

        let body = Body::parse(br#"{"group":"  demo ","from":"2","to":1.0,"n":null,"flag":true}"#);
        assert_eq!(body.text("group"), "demo");
        assert_eq!(body.text("n"), "");
        assert_eq!(body.text("flag"), "true");
        assert_eq!(body.int("from"), Some(2));
        assert_eq!(body.int("to"), Some(1));
        assert_eq!(body.int("missing"), None);
        assert_eq!(Body::parse(br#"{"from":1.5}"#).int("from"), None);
    }
}
