//! Configuration documents and loading.
//!
//! A run is described by a main document and an optional OpenAPI document:
//!
//! ```yaml
//! # main
//! host: http://localhost:8080
//! env:
//!   TOKEN: secret
//! scenarios:
//!   get-user:
//!     params: { id: "1" }
//!     response:
//!       status: 200
//!       body:
//!         json:
//!           name: { value: Alice }
//!
//! # openapi
//! paths:
//!   /users/{id}:
//!     get:
//!       v-functional-test:
//!         scenarios: [get-user]
//! ```
//!
//! Both documents may declare `scenarios` and `paths`. The OpenAPI document
//! wins on collisions. Every scenario is checked and normalized once, here.

use crate::env::{EnvMap, resolve_string};
use crate::error::ConfigError;
use crate::model::{JNode, JsonType, Route, Scenario, ShapeMap};
use crate::normalize::{NormalizeWarning, normalize_scenario};
use crate::path::{child_path, index_path};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Operation keys recognised inside a path item.
const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// A path item: method (or other OpenAPI key) to operation.
pub type PathItem = BTreeMap<String, serde_yaml::Value>;

/// The main configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MainDocument {
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub env: EnvMap,

    #[serde(default)]
    pub scenarios: BTreeMap<String, Scenario>,

    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
}

impl MainDocument {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        parse_document(content, "config")
    }
}

/// The OpenAPI document, reduced to the keys volley reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenApiDocument {
    #[serde(default)]
    pub scenarios: BTreeMap<String, Scenario>,

    #[serde(default)]
    pub paths: BTreeMap<String, PathItem>,
}

impl OpenApiDocument {
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        parse_document(content, "openapi")
    }
}

fn parse_document<T>(content: &str, document: &str) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    // an empty file is an empty document
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_yaml::from_str(content).map_err(|source| ConfigError::Parse {
        document: document.to_string(),
        source,
    })
}

#[derive(Debug, Default, Deserialize)]
struct Operation {
    #[serde(rename = "v-functional-test", default)]
    functional_test: Option<FunctionalTest>,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionalTest {
    #[serde(default)]
    scenarios: Vec<String>,
}

/// A loaded, checked and normalized configuration. Read-only after loading.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub host: String,
    /// Ordered by template, then method.
    pub routes: Vec<Route>,
    pub scenarios: BTreeMap<String, Scenario>,
    /// Paths added to each scenario's `contains` by normalization.
    pub implied: BTreeMap<String, Vec<String>>,
    pub warnings: Vec<NormalizeWarning>,
}

impl Config {
    /// Parses and merges the documents' raw text.
    pub fn parse(main: &str, openapi: Option<&str>) -> Result<Self, ConfigError> {
        let main = MainDocument::parse(main)?;
        let openapi = openapi.map(OpenApiDocument::parse).transpose()?;
        Self::from_documents(main, openapi)
    }

    /// Merges the documents, checks every scenario and normalizes it.
    pub fn from_documents(
        main: MainDocument,
        openapi: Option<OpenApiDocument>,
    ) -> Result<Self, ConfigError> {
        let MainDocument {
            host,
            env,
            mut scenarios,
            paths,
        } = main;

        let mut operations = collect_operations(&paths, "config")?;

        if let Some(openapi) = openapi {
            for (name, scenario) in openapi.scenarios {
                if scenarios.insert(name.clone(), scenario).is_some() {
                    debug!("OpenAPI scenario {} overrides config scenario", name);
                }
            }
            operations.extend(collect_operations(&openapi.paths, "openapi")?);
        }

        let routes = operations
            .into_iter()
            .map(|((template, method), scenarios)| Route {
                method,
                template,
                scenarios,
            })
            .collect::<Vec<_>>();

        let mut normalized = BTreeMap::new();
        let mut implied = BTreeMap::new();
        let mut warnings = Vec::new();

        for (name, scenario) in &scenarios {
            check_scenario(name, scenario)?;

            let (scenario_out, scenario_warnings) = normalize_scenario(name, scenario, &env);
            for warning in &scenario_warnings {
                warn!("{}", warning);
            }

            let explicit = scenario.response.body.contains.len();
            implied.insert(
                name.clone(),
                scenario_out.response.body.contains[explicit..].to_vec(),
            );
            warnings.extend(scenario_warnings);
            normalized.insert(name.clone(), scenario_out);
        }

        debug!(
            "Loaded {} routes and {} scenarios",
            routes.len(),
            normalized.len()
        );

        Ok(Self {
            host: resolve_string(&host, &env),
            routes,
            scenarios: normalized,
            implied,
            warnings,
        })
    }

    pub fn scenario(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.get(name)
    }
}

/// Extracts `(template, METHOD) -> scenarios` from a `paths` section.
///
/// Keys that are not HTTP methods (`parameters`, `summary`, ...) and
/// operations without a `v-functional-test` block are ignored.
fn collect_operations(
    paths: &BTreeMap<String, PathItem>,
    document: &str,
) -> Result<BTreeMap<(String, String), Vec<String>>, ConfigError> {
    let mut operations = BTreeMap::new();

    for (template, item) in paths {
        for (key, value) in item {
            let method = key.to_ascii_lowercase();
            if !HTTP_METHODS.contains(&method.as_str()) {
                continue;
            }
            if value.is_null() {
                continue;
            }

            let operation: Operation =
                serde_yaml::from_value(value.clone()).map_err(|source| ConfigError::Parse {
                    document: format!("{document} ({} {})", method.to_ascii_uppercase(), template),
                    source,
                })?;

            match operation.functional_test {
                Some(test) => {
                    operations.insert(
                        (template.clone(), method.to_ascii_uppercase()),
                        test.scenarios,
                    );
                }
                None => debug!("No functional test for {} {}", method, template),
            }
        }
    }

    Ok(operations)
}

/// Load-time checks the validator relies on.
fn check_scenario(name: &str, scenario: &Scenario) -> Result<(), ConfigError> {
    if scenario.request.json.is_some() && scenario.request.text.is_some() {
        return Err(ConfigError::ConflictingRequestBody(name.to_string()));
    }
    match &scenario.response.body.json {
        Some(shape) => check_shape(name, "", shape),
        None => Ok(()),
    }
}

fn check_shape(scenario: &str, prefix: &str, shape: &ShapeMap) -> Result<(), ConfigError> {
    for (key, node) in shape {
        let path = child_path(prefix, key);
        check_node(scenario, &path, node)?;
        check_shape(scenario, &path, &node.object)?;
        for (index, element) in node.list.iter().enumerate() {
            check_shape(scenario, &index_path(&path, index), element)?;
        }
    }
    Ok(())
}

fn check_node(scenario: &str, path: &str, node: &JNode) -> Result<(), ConfigError> {
    if !node.object.is_empty() && !node.list.is_empty() {
        return Err(ConfigError::ConflictingShape {
            scenario: scenario.to_string(),
            path: path.to_string(),
        });
    }

    if let Some(name) = &node.type_name
        && name.parse::<JsonType>().is_err()
    {
        return Err(ConfigError::UnknownType {
            scenario: scenario.to_string(),
            path: path.to_string(),
            name: name.clone(),
        });
    }

    if let (Some(min), Some(max)) = (node.min, node.max)
        && min > max
    {
        return Err(ConfigError::InvalidBounds {
            scenario: scenario.to_string(),
            path: path.to_string(),
            min,
            max,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExpectedValue;

    const MAIN: &str = r#"
host: http://localhost:8080
env:
  USER_NAME: Alice
scenarios:
  get-user:
    params:
      id: "1"
    response:
      status: 200
      body:
        contains: [id]
        json:
          name:
            value: $USER_NAME
          address:
            object:
              city:
                type: string
  delete-user:
    params:
      id: "1"
    response:
      status: 204
"#;

    const OPENAPI: &str = r#"
openapi: 3.0.0
info:
  title: Users
paths:
  /users/{id}:
    parameters:
      - name: id
        in: path
    get:
      summary: Fetch a user
      v-functional-test:
        scenarios: [get-user]
    delete:
      v-functional-test:
        scenarios: [delete-user]
  /health:
    get:
      summary: no functional test here
"#;

    #[test]
    fn test_every_method_of_a_path_is_a_route() {
        let config = Config::parse(MAIN, Some(OPENAPI)).unwrap();

        assert_eq!(config.host, "http://localhost:8080");
        assert_eq!(
            config.routes,
            vec![
                Route {
                    method: "DELETE".to_string(),
                    template: "/users/{id}".to_string(),
                    scenarios: vec!["delete-user".to_string()],
                },
                Route {
                    method: "GET".to_string(),
                    template: "/users/{id}".to_string(),
                    scenarios: vec!["get-user".to_string()],
                },
            ]
        );
    }

    #[test]
    fn test_scenarios_are_normalized_on_load() {
        let config = Config::parse(MAIN, Some(OPENAPI)).unwrap();
        let scenario = config.scenario("get-user").unwrap();

        assert_eq!(
            scenario.response.body.contains,
            vec!["id", "address.city", "name"]
        );
        assert_eq!(config.implied["get-user"], vec!["address.city", "name"]);
        assert!(config.implied["delete-user"].is_empty());

        let json = scenario.response.body.json.as_ref().unwrap();
        assert_eq!(
            json["name"].value,
            Some(ExpectedValue::String("Alice".to_string()))
        );
    }

    #[test]
    fn test_openapi_scenarios_override_main() {
        let openapi = r#"
scenarios:
  get-user:
    response:
      status: 404
paths:
  /users/{id}:
    get:
      v-functional-test:
        scenarios: [get-user]
"#;
        let config = Config::parse(MAIN, Some(openapi)).unwrap();
        assert_eq!(config.scenario("get-user").unwrap().response.status, Some(404));
        assert_eq!(config.scenario("delete-user").unwrap().response.status, Some(204));
    }

    #[test]
    fn test_main_paths_without_openapi() {
        let main = r#"
host: http://api.test
scenarios:
  ping:
    response:
      status: 200
paths:
  /ping:
    GET:
      v-functional-test:
        scenarios: [ping]
"#;
        let config = Config::parse(main, None).unwrap();
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].method, "GET");
        assert_eq!(config.routes[0].template, "/ping");
    }

    #[test]
    fn test_openapi_route_replaces_main_route() {
        let main = r#"
scenarios:
  a: {}
  b: {}
paths:
  /x:
    get:
      v-functional-test:
        scenarios: [a]
"#;
        let openapi = r#"
paths:
  /x:
    get:
      v-functional-test:
        scenarios: [b]
"#;
        let config = Config::parse(main, Some(openapi)).unwrap();
        assert_eq!(config.routes.len(), 1);
        assert_eq!(config.routes[0].scenarios, vec!["b"]);
    }

    #[test]
    fn test_object_and_list_together_rejected() {
        let main = r#"
scenarios:
  broken:
    response:
      body:
        json:
          data:
            object:
              id: { type: number }
            list:
              - id: { type: number }
"#;
        let err = Config::parse(main, None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ConflictingShape { ref scenario, ref path } if scenario == "broken" && path == "data"
        ));
    }

    #[test]
    fn test_unknown_type_rejected_with_nested_path() {
        let main = r#"
scenarios:
  s:
    response:
      body:
        json:
          items:
            list:
              - when: { type: date }
"#;
        let err = Config::parse(main, None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::UnknownType { ref path, ref name, .. } if path == "items[0].when" && name == "date"
        ));
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let main = r#"
scenarios:
  s:
    response:
      body:
        json:
          code: { type: string, min: 5, max: 2 }
"#;
        assert!(matches!(
            Config::parse(main, None),
            Err(ConfigError::InvalidBounds { min: 5, max: 2, .. })
        ));
    }

    #[test]
    fn test_request_with_json_and_text_rejected() {
        let main = r#"
scenarios:
  s:
    request:
      json: { a: 1 }
      text: hello
"#;
        assert!(matches!(
            Config::parse(main, None),
            Err(ConfigError::ConflictingRequestBody(ref name)) if name == "s"
        ));
    }

    #[test]
    fn test_embedded_value_warnings_collected() {
        let main = r#"
scenarios:
  s:
    response:
      body:
        json:
          profile:
            value: { nested: true }
"#;
        let config = Config::parse(main, None).unwrap();
        assert_eq!(config.warnings.len(), 1);
        assert_eq!(config.warnings[0].field, "profile");
    }

    #[test]
    fn test_parse_errors_name_the_document() {
        let err = Config::parse("host: [unclosed", None).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse config"));

        let err = Config::parse("host: x", Some("paths: 3")).unwrap_err();
        assert!(err.to_string().starts_with("failed to parse openapi"));
    }

    #[test]
    fn test_empty_documents_are_allowed() {
        let config = Config::parse("", Some("  \n")).unwrap();
        assert!(config.routes.is_empty());
        assert!(config.scenarios.is_empty());
    }

    #[test]
    fn test_json_documents_parse() {
        let main = r#"{"host": "http://h", "scenarios": {"s": {"response": {"status": 200}}}}"#;
        let config = Config::parse(main, None).unwrap();
        assert_eq!(config.host, "http://h");
        assert_eq!(config.scenario("s").unwrap().response.status, Some(200));
    }
}
