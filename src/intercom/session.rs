//! IntercomSession - authenticated HTTP session against the Intercom REST API

use super::resource::{Method, Resource};
use crate::record::{IntercomObject, RawResult};
use crate::{ApiSession, ConnectorError, ConnectorResult, CredentialResolver, IntercomSettings};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Session against the Intercom API for one invocation
///
/// Holds the resolved token and one HTTP client reused for every page of the call.
pub struct IntercomSession {
    client: Client,
    base_url: Url,
    token: String,
    per_page: u32,
}

impl IntercomSession {
    /// Resolve `conn_id` and build a session from its `personal_access_token`
    ///
    /// # Errors
    ///
    /// `ConnectorError::Authentication` when the connection is unknown or has no token
    pub async fn connect(
        resolver: &dyn CredentialResolver,
        conn_id: &str,
        settings: &IntercomSettings,
    ) -> ConnectorResult<Self> {
        let connection = resolver.resolve(conn_id).await?;
        let token = connection.personal_access_token()?;
        let session = Self::new(token, settings)?;
        info!("Intercom session established for connection '{}'", conn_id);
        Ok(session)
    }

    /// Build a session from a token
    pub fn new(token: impl Into<String>, settings: &IntercomSettings) -> ConnectorResult<Self> {
        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            ConnectorError::config(format!("invalid Intercom base_url '{}': {}", settings.base_url, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!("intercom-s3-connector/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ConnectorError::authentication_with_source("Failed to build Intercom HTTP client", e)
            })?;

        Ok(Self {
            client,
            base_url,
            token: token.into(),
            per_page: settings.per_page,
        })
    }

    /// Every page of a list endpoint, in API order
    async fn list(
        &self,
        resource: Resource,
        args: &Map<String, Value>,
    ) -> ConnectorResult<Vec<IntercomObject>> {
        let mut args = args.clone();
        args.entry("per_page")
            .or_insert_with(|| Value::from(self.per_page));

        let mut url = self.endpoint(&[resource.path()], &args)?;
        let mut visited = HashSet::new();
        let mut objects = Vec::new();

        loop {
            visited.insert(url.clone());
            let body = self.get_json(url.clone(), false).await?;
            let (items, next) = parse_page(body, resource.path())?;
            debug!("{} page {}: {} objects", resource, visited.len(), items.len());
            objects.extend(items);

            let Some(next) = next else { break };
            let next = self.follow(&next)?;
            // Pages already fetched end the walk, however long the cycle.
            if visited.contains(&next) {
                warn!("{} pagination links back to {}, stopping", resource, next);
                break;
            }
            url = next;
        }

        Ok(objects)
    }

    /// One object, by `id` or by the lookup arguments
    async fn find(
        &self,
        resource: Resource,
        args: &Map<String, Value>,
    ) -> ConnectorResult<IntercomObject> {
        let mut args = args.clone();
        let url = match args.remove("id") {
            Some(id) => {
                let id = query_value("id", &id)?.ok_or_else(|| {
                    ConnectorError::config("find: 'id' cannot be null")
                })?;
                self.endpoint(&[resource.path(), &id], &args)?
            }
            None if args.is_empty() => {
                return Err(ConnectorError::config(format!(
                    "find on '{}' needs an 'id' or lookup arguments",
                    resource
                )))
            }
            None => self.endpoint(&[resource.path()], &args)?,
        };

        IntercomObject::try_from(self.get_json(url, true).await?)
    }

    /// Every object through the scroll API
    async fn scroll(
        &self,
        resource: Resource,
        args: &Map<String, Value>,
    ) -> ConnectorResult<Vec<IntercomObject>> {
        let mut args = args.clone();
        let mut objects = Vec::new();

        loop {
            let url = self.endpoint(&[resource.path(), "scroll"], &args)?;
            let body = self.get_json(url, false).await?;
            let scroll_param = body
                .get("scroll_param")
                .and_then(Value::as_str)
                .map(String::from);
            let (items, _) = parse_page(body, resource.path())?;

            if items.is_empty() {
                break;
            }
            debug!("{} scroll: {} objects", resource, items.len());
            objects.extend(items);

            match scroll_param {
                Some(param) => {
                    args.insert("scroll_param".to_string(), Value::String(param));
                }
                None => break,
            }
        }

        Ok(objects)
    }

    /// GET a URL and decode the JSON body, mapping HTTP failures to error kinds
    async fn get_json(&self, url: Url, not_found_is_lookup: bool) -> ConnectorResult<Value> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url.clone())
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ConnectorError::fetch_with_source(format!("GET {} failed", url.path()), e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, url.path(), &body, not_found_is_lookup));
        }

        resp.json().await.map_err(|e| {
            ConnectorError::fetch_with_source(format!("Failed to decode response from {}", url.path()), e)
        })
    }

    fn endpoint(&self, segments: &[&str], args: &Map<String, Value>) -> ConnectorResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ConnectorError::config("Intercom base_url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);

        {
            let mut query = url.query_pairs_mut();
            for (key, value) in args {
                if let Some(value) = query_value(key, value)? {
                    query.append_pair(key, &value);
                }
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        Ok(url)
    }

    /// Resolve a `pages.next` link, refusing to send the token to another host
    fn follow(&self, next: &str) -> ConnectorResult<Url> {
        let url = self
            .base_url
            .join(next)
            .map_err(|e| ConnectorError::fetch(format!("invalid next page link '{}': {}", next, e), None))?;

        if url.origin() != self.base_url.origin() {
            return Err(ConnectorError::fetch(
                format!("next page link points outside {}", self.base_url),
                None,
            ));
        }
        Ok(url)
    }
}

#[async_trait]
impl ApiSession for IntercomSession {
    async fn invoke(
        &self,
        resource: &str,
        method: &str,
        args: &Map<String, Value>,
    ) -> ConnectorResult<RawResult<IntercomObject>> {
        let (resource, method) = Method::resolve(resource, method)?;
        info!("Invoking {}.{} ({} argument(s))", resource, method, args.len());

        match method {
            Method::All | Method::FindAll => self.list(resource, args).await.map(RawResult::Collection),
            Method::Scroll => self.scroll(resource, args).await.map(RawResult::Collection),
            Method::Find => self.find(resource, args).await.map(RawResult::Single),
        }
    }
}

/// Render a query argument; `null` drops the argument
fn query_value(key: &str, value: &Value) -> ConnectorResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Array(_) | Value::Object(_) => Err(ConnectorError::config(format!(
            "query argument '{}' must be a scalar",
            key
        ))),
    }
}

/// Split one list response into its objects and the `pages.next` link
fn parse_page(body: Value, key: &str) -> ConnectorResult<(Vec<IntercomObject>, Option<String>)> {
    let mut body = match body {
        Value::Object(map) => map,
        _ => {
            return Err(ConnectorError::fetch(
                format!("expected a JSON object listing '{}'", key),
                None,
            ))
        }
    };

    let next = body
        .get("pages")
        .and_then(|pages| pages.get("next"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(String::from);

    let items = match body.remove(key) {
        Some(Value::Array(items)) => items,
        _ => {
            return Err(ConnectorError::fetch(
                format!("response has no '{}' list", key),
                None,
            ))
        }
    };

    let objects = items
        .into_iter()
        .map(IntercomObject::try_from)
        .collect::<ConnectorResult<Vec<_>>>()?;

    Ok((objects, next))
}

fn status_error(status: StatusCode, path: &str, body: &str, not_found_is_lookup: bool) -> ConnectorError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ConnectorError::authentication(format!(
            "Intercom rejected the token on {}: {} - {}",
            path, status, body
        )),
        StatusCode::NOT_FOUND if not_found_is_lookup => {
            ConnectorError::lookup(format!("no Intercom object at {}", path))
        }
        _ => ConnectorError::fetch(
            format!("Intercom API error on {}: {} - {}", path, status, body),
            Some(status.as_u16()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ObjectKind;
    use serde_json::json;

    fn session() -> IntercomSession {
        IntercomSession::new("tok", &IntercomSettings::default()).unwrap()
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_endpoint_building() {
        let s = session();
        assert_eq!(
            s.endpoint(&["users"], &Map::new()).unwrap().as_str(),
            "https://api.intercom.io/users"
        );
        assert_eq!(
            s.endpoint(&["users", "abc 1"], &args(json!({"per_page": 50, "tag_id": "7"})))
                .unwrap()
                .as_str(),
            "https://api.intercom.io/users/abc%201?per_page=50&tag_id=7"
        );
        assert!(s.endpoint(&["users"], &args(json!({"bad": [1]}))).is_err());
    }

    #[test]
    fn test_follow_rejects_foreign_hosts() {
        let s = session();
        assert!(s.follow("https://api.intercom.io/users?page=2").is_ok());
        assert!(s.follow("https://evil.example/users?page=2").is_err());
    }

    #[test]
    fn test_parse_page() {
        let body = json!({
            "type": "user.list",
            "pages": {"type": "pages", "next": "https://api.intercom.io/users?page=2", "page": 1},
            "users": [{"type": "user", "id": "a"}, {"type": "user", "id": "b"}]
        });
        let (items, next) = parse_page(body, "users").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind(), &ObjectKind::User);
        assert_eq!(next.as_deref(), Some("https://api.intercom.io/users?page=2"));

        let last = json!({"type": "tag.list", "tags": []});
        let (items, next) = parse_page(last, "tags").unwrap();
        assert!(items.is_empty());
        assert!(next.is_none());

        assert!(parse_page(json!({"type": "user.list"}), "users").is_err());
    }

    #[test]
    fn test_status_mapping() {
        assert!(status_error(StatusCode::UNAUTHORIZED, "/users", "", false).is_authentication());
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND, "/users/x", "", true),
            ConnectorError::Lookup(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "/users", "slow down", false),
            ConnectorError::Fetch { status: Some(429), .. }
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        let settings = IntercomSettings {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            IntercomSession::new("tok", &settings),
            Err(ConnectorError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_invoke_unknown_resource_is_lookup() {
        let err = session().invoke("widgets", "all", &Map::new()).await.unwrap_err();
        assert!(matches!(err, ConnectorError::Lookup(_)));
    }

    #[tokio::test]
    async fn test_connect_without_token() {
        use crate::{Connection, StaticCredentialResolver};

        let resolver = StaticCredentialResolver::new().with_connection(Connection::new("intercom", Map::new()));
        let err = IntercomSession::connect(&resolver, "intercom", &IntercomSettings::default())
            .await
            .err()
            .unwrap();
        assert!(err.is_authentication());
    }
}
