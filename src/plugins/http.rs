//! Blocking HTTP client functions
//!
//! Responses are maps: `{:status 200 :body "..." :headers {...}}`.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};

use crate::error::{Error, Result};
use crate::plugins::json::to_json;
use crate::plugins::{expect_range, Plugin};
use crate::registry::{Arity, FunctionRegistry};
use crate::runtime::Value;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `http-get` and `http-post`
pub struct HttpPlugin;

impl Plugin for HttpPlugin {
    fn name(&self) -> &str {
        "http"
    }

    fn description(&self) -> &str {
        "Blocking HTTP GET and POST"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["json".to_string()]
    }

    fn register_functions(&self, registry: &FunctionRegistry) -> Result<()> {
        registry.define(
            "http-get",
            "http",
            Arity::Variadic,
            "(http-get url headers?) - response map",
            |ev, args, env| {
                expect_range("http-get", args, 1, 2)?;
                let values = ev.eval_all(args, env)?;
                let request = client()?.get(values[0].as_str()?);
                send(with_headers(request, values.get(1))?)
            },
        )?;
        registry.define(
            "http-post",
            "http",
            Arity::Variadic,
            "(http-post url body headers?) - maps and vectors are sent as JSON",
            |ev, args, env| {
                expect_range("http-post", args, 2, 3)?;
                let values = ev.eval_all(args, env)?;
                let mut request = client()?.post(values[0].as_str()?);
                request = match &values[1] {
                    Value::String(body) => request.body(body.clone()),
                    other => request.json(&to_json(other)?),
                };
                send(with_headers(request, values.get(2))?)
            },
        )?;
        Ok(())
    }
}

fn client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| Error::Http(e.to_string()))
}

fn with_headers(mut request: RequestBuilder, headers: Option<&Value>) -> Result<RequestBuilder> {
    match headers {
        None | Some(Value::Nil) => Ok(request),
        Some(value) => {
            for (name, val) in value.as_map()? {
                request = request.header(name.as_str(), val.to_display_string());
            }
            Ok(request)
        }
    }
}

fn send(request: RequestBuilder) -> Result<Value> {
    let response = request.send().map_err(|e| Error::Http(e.to_string()))?;
    tracing::debug!(status = response.status().as_u16(), url = %response.url(), "http response");
    response_value(response)
}

fn response_value(response: Response) -> Result<Value> {
    let status = response.status().as_u16();
    let headers: BTreeMap<String, Value> = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::string(String::from_utf8_lossy(value.as_bytes())),
            )
        })
        .collect();
    let body = response.text().map_err(|e| Error::Http(e.to_string()))?;

    let mut entries = BTreeMap::new();
    entries.insert("status".to_string(), Value::Number(status as f64));
    entries.insert("headers".to_string(), Value::map(headers));
    entries.insert("body".to_string(), Value::String(body));
    Ok(Value::map(entries))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::eval_lisp;

    #[test]
    fn test_argument_validation() {
        assert!(matches!(eval_lisp("(http-get)"), Err(Error::Arity { .. })));
        assert!(matches!(
            eval_lisp("(http-get 42)"),
            Err(Error::TypeError { .. })
        ));
        assert!(matches!(
            eval_lisp(r#"(http-get "http://127.0.0.1:1/" [1])"#),
            Err(Error::TypeError { .. })
        ));
    }

    #[test]
    fn test_connection_failure_is_http_error() {
        // Port 1 is reserved and refuses connections
        assert!(matches!(
            eval_lisp(r#"(http-get "http://127.0.0.1:1/")"#),
            Err(Error::Http(_))
        ));
    }
}
