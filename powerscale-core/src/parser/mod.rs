//! Parser - Parse .psf configuration files
//!
//! Convert the configuration language to resources using pest

use pest::Parser;
use pest::iterators::{Pair, Pairs};
use pest_derive::Parser;
use std::collections::HashMap;
use std::env;
use std::path::Path;

use crate::resource::{Attributes, Resource, ResourceId, Value};

#[derive(Parser)]
#[grammar = "parser/powerscale.pest"]
struct ConfigParser;

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),

    #[error("Invalid expression at line {line}: {message}")]
    InvalidExpression { line: usize, message: String },

    #[error("Undefined variable: {0}")]
    UndefinedVariable(String),

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("Invalid resource type: {0}")]
    InvalidResourceType(String),

    #[error("Duplicate resource: {0}")]
    DuplicateResource(String),

    #[error("Duplicate binding: {0}")]
    DuplicateBinding(String),

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
}

/// Provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub attributes: HashMap<String, Value>,
}

/// Backend configuration for state storage
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Backend type (e.g., "local")
    pub backend_type: String,
    /// Backend-specific attributes
    pub attributes: HashMap<String, Value>,
}

/// Parse result
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub providers: Vec<ProviderConfig>,
    pub resources: Vec<Resource>,
    pub variables: HashMap<String, Value>,
    /// Backend configuration for state storage
    pub backend: Option<BackendConfig>,
}

impl ParsedFile {
    /// Configuration block of a provider
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Look up a resource by type and name
    pub fn resource(&self, resource_type: &str, name: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.id.resource_type == resource_type && r.id.name == name)
    }
}

/// Parse context (variable scope)
struct ParseContext {
    variables: HashMap<String, Value>,
    /// Resource bindings (binding_name -> resource id)
    resource_bindings: HashMap<String, ResourceId>,
}

impl ParseContext {
    fn new() -> Self {
        Self {
            variables: HashMap::new(),
            resource_bindings: HashMap::new(),
        }
    }

    fn is_bound(&self, name: &str) -> bool {
        self.variables.contains_key(name) || self.resource_bindings.contains_key(name)
    }
}

/// Next meaningful child, skipping keyword tokens
fn next_pair<'a>(inner: &mut Pairs<'a, Rule>) -> Result<Pair<'a, Rule>, ParseError> {
    inner
        .find(|p| {
            !matches!(
                p.as_rule(),
                Rule::kw_provider | Rule::kw_backend | Rule::kw_let | Rule::kw_read
            )
        })
        .ok_or_else(|| ParseError::InvalidExpression {
            line: 0,
            message: "unexpected end of input".to_string(),
        })
}

fn line_of(pair: &Pair<Rule>) -> usize {
    pair.as_span().start_pos().line_col().0
}

/// Parse a configuration file from disk
pub fn parse_file(path: &Path) -> Result<ParsedFile, ParseError> {
    let content = std::fs::read_to_string(path).map_err(|e| ParseError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    parse(&content)
}

/// Parse configuration text
pub fn parse(input: &str) -> Result<ParsedFile, ParseError> {
    let pairs = ConfigParser::parse(Rule::file, input).map_err(Box::new)?;

    let mut ctx = ParseContext::new();
    let mut parsed = ParsedFile::default();

    for pair in pairs {
        if pair.as_rule() != Rule::file {
            continue;
        }
        for inner in pair.into_inner() {
            if inner.as_rule() != Rule::statement {
                continue;
            }
            for stmt in inner.into_inner() {
                match stmt.as_rule() {
                    Rule::provider_block => {
                        let (name, attributes) = parse_named_block(stmt, &ctx)?;
                        parsed.providers.push(ProviderConfig { name, attributes });
                    }
                    Rule::backend_block => {
                        let (backend_type, attributes) = parse_named_block(stmt, &ctx)?;
                        parsed.backend = Some(BackendConfig {
                            backend_type,
                            attributes,
                        });
                    }
                    Rule::let_binding => {
                        if let Some(resource) = parse_let_binding(stmt, &mut ctx)? {
                            push_resource(&mut parsed.resources, resource)?;
                        }
                    }
                    Rule::anonymous_resource => {
                        let resource = parse_anonymous_resource(stmt, &ctx)?;
                        push_resource(&mut parsed.resources, resource)?;
                    }
                    _ => {}
                }
            }
        }
    }

    parsed.variables = ctx.variables;
    Ok(parsed)
}

fn push_resource(resources: &mut Vec<Resource>, resource: Resource) -> Result<(), ParseError> {
    if resources.iter().any(|r| r.id == resource.id) {
        return Err(ParseError::DuplicateResource(resource.id.to_string()));
    }
    resources.push(resource);
    Ok(())
}

fn parse_named_block(
    pair: Pair<Rule>,
    ctx: &ParseContext,
) -> Result<(String, HashMap<String, Value>), ParseError> {
    let mut inner = pair.into_inner();
    let name = next_pair(&mut inner)?.as_str().to_string();

    let mut attributes = HashMap::new();
    for attr_pair in inner {
        if attr_pair.as_rule() == Rule::attribute {
            let (key, value) = parse_attribute(attr_pair, ctx)?;
            attributes.insert(key, value);
        }
    }

    Ok((name, attributes))
}

fn parse_let_binding(
    pair: Pair<Rule>,
    ctx: &mut ParseContext,
) -> Result<Option<Resource>, ParseError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let name = next_pair(&mut inner)?.as_str().to_string();
    let value_pair = next_pair(&mut inner)?;

    if ctx.is_bound(&name) {
        return Err(ParseError::DuplicateBinding(name));
    }

    match value_pair.as_rule() {
        Rule::resource_expr => {
            let resource = parse_resource_expr(value_pair, ctx, &name, false)?;
            ctx.resource_bindings.insert(name, resource.id.clone());
            Ok(Some(resource))
        }
        Rule::read_expr => {
            let mut read_inner = value_pair.into_inner();
            let expr = next_pair(&mut read_inner)?;
            let resource = parse_resource_expr(expr, ctx, &name, true)?;
            ctx.resource_bindings.insert(name, resource.id.clone());
            Ok(Some(resource))
        }
        Rule::expression => {
            let value = parse_expression(value_pair, ctx)?;
            ctx.variables.insert(name, value);
            Ok(None)
        }
        other => Err(ParseError::InvalidExpression {
            line,
            message: format!("unexpected {:?} in let binding", other),
        }),
    }
}

/// Split `powerscale.smb_share` into provider and resource type
fn split_resource_type(namespaced_type: &str) -> Result<(String, String), ParseError> {
    match namespaced_type.split_once('.') {
        Some((provider, resource_type)) if !resource_type.contains('.') => {
            Ok((provider.to_string(), resource_type.to_string()))
        }
        _ => Err(ParseError::InvalidResourceType(namespaced_type.to_string())),
    }
}

fn parse_resource_expr(
    pair: Pair<Rule>,
    ctx: &ParseContext,
    binding_name: &str,
    read_only: bool,
) -> Result<Resource, ParseError> {
    let mut inner = pair.into_inner();
    let namespaced_type = next_pair(&mut inner)?.as_str().to_string();
    let (provider, resource_type) = split_resource_type(&namespaced_type)?;

    let mut attributes = parse_block_contents(inner, ctx)?;
    attributes.insert("_provider".to_string(), Value::String(provider));
    attributes.insert(
        "_binding".to_string(),
        Value::String(binding_name.to_string()),
    );

    Ok(Resource {
        id: ResourceId::new(resource_type, binding_name),
        attributes,
        read_only,
    })
}

fn parse_anonymous_resource(pair: Pair<Rule>, ctx: &ParseContext) -> Result<Resource, ParseError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let namespaced_type = next_pair(&mut inner)?.as_str().to_string();
    let (provider, resource_type) = split_resource_type(&namespaced_type)?;

    let mut attributes = parse_block_contents(inner, ctx)?;

    // Anonymous resources are addressed by their name attribute
    let resource_name = match attributes.get("name") {
        Some(Value::String(s)) => s.clone(),
        _ => {
            return Err(ParseError::InvalidExpression {
                line,
                message: "Anonymous resource must have a 'name' attribute".to_string(),
            });
        }
    };

    attributes.insert("_provider".to_string(), Value::String(provider));

    Ok(Resource {
        id: ResourceId::new(resource_type, resource_name),
        attributes,
        read_only: false,
    })
}

/// Parse block contents (attributes and nested blocks)
/// Nested blocks with the same name are collected into a list
fn parse_block_contents(pairs: Pairs<Rule>, ctx: &ParseContext) -> Result<Attributes, ParseError> {
    let mut attributes: Attributes = HashMap::new();
    let mut nested_blocks: Vec<(String, Vec<Value>)> = Vec::new();

    for content_pair in pairs {
        if content_pair.as_rule() != Rule::block_content {
            continue;
        }
        let mut content_inner = content_pair.into_inner();
        let inner = next_pair(&mut content_inner)?;
        match inner.as_rule() {
            Rule::attribute => {
                let (key, value) = parse_attribute(inner, ctx)?;
                attributes.insert(key, value);
            }
            Rule::nested_block => {
                let mut block_inner = inner.into_inner();
                let block_name = next_pair(&mut block_inner)?.as_str().to_string();
                let block_attrs = parse_block_contents(block_inner, ctx)?;

                match nested_blocks.iter_mut().find(|(name, _)| *name == block_name) {
                    Some((_, blocks)) => blocks.push(Value::Map(block_attrs)),
                    None => nested_blocks.push((block_name, vec![Value::Map(block_attrs)])),
                }
            }
            _ => {}
        }
    }

    // Convert nested blocks to list attributes
    for (name, blocks) in nested_blocks {
        attributes.insert(name, Value::List(blocks));
    }

    Ok(attributes)
}

fn parse_attribute(pair: Pair<Rule>, ctx: &ParseContext) -> Result<(String, Value), ParseError> {
    let mut inner = pair.into_inner();
    let key = next_pair(&mut inner)?.as_str().to_string();
    let value = parse_expression(next_pair(&mut inner)?, ctx)?;
    Ok((key, value))
}

fn parse_expression(pair: Pair<Rule>, ctx: &ParseContext) -> Result<Value, ParseError> {
    let line = line_of(&pair);
    let inner = if pair.as_rule() == Rule::expression {
        next_pair(&mut pair.into_inner())?
    } else {
        pair
    };

    match inner.as_rule() {
        Rule::env_var => {
            let mut env_inner = inner.into_inner();
            let var_name = parse_string(next_pair(&mut env_inner)?.as_str());
            match env::var(&var_name) {
                Ok(val) => Ok(Value::String(val)),
                Err(_) => Err(ParseError::EnvVarNotSet(var_name)),
            }
        }
        Rule::list => {
            let items: Result<Vec<Value>, ParseError> = inner
                .into_inner()
                .map(|item| parse_expression(item, ctx))
                .collect();
            Ok(Value::List(items?))
        }
        Rule::map => {
            let mut map = HashMap::new();
            for entry in inner.into_inner() {
                if entry.as_rule() == Rule::map_entry {
                    let mut entry_inner = entry.into_inner();
                    let key_pair = next_pair(&mut entry_inner)?;
                    let key = if key_pair.as_rule() == Rule::string {
                        parse_string(key_pair.as_str())
                    } else {
                        key_pair.as_str().to_string()
                    };
                    let value = parse_expression(next_pair(&mut entry_inner)?, ctx)?;
                    map.insert(key, value);
                }
            }
            Ok(Value::Map(map))
        }
        Rule::namespaced_id => {
            // binding.attribute refers to another resource
            let full_str = inner.as_str();
            match full_str.split_once('.') {
                Some((binding, attr)) if !attr.contains('.') => {
                    if ctx.variables.contains_key(binding) {
                        Err(ParseError::InvalidExpression {
                            line,
                            message: format!(
                                "'{}' is not a resource, cannot access attribute '{}'",
                                binding, attr
                            ),
                        })
                    } else {
                        Ok(Value::ResourceRef(binding.to_string(), attr.to_string()))
                    }
                }
                _ => Err(ParseError::InvalidExpression {
                    line,
                    message: format!("Invalid reference '{}': expected binding.attribute", full_str),
                }),
            }
        }
        Rule::boolean => Ok(Value::Bool(inner.as_str() == "true")),
        Rule::number => inner
            .as_str()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| ParseError::InvalidExpression {
                line,
                message: format!("Invalid number '{}': {}", inner.as_str(), e),
            }),
        Rule::string => Ok(Value::String(parse_string(inner.as_str()))),
        Rule::variable_ref => {
            let name = inner.as_str().trim();
            match ctx.variables.get(name) {
                Some(val) => Ok(val.clone()),
                None => Err(ParseError::UndefinedVariable(name.to_string())),
            }
        }
        other => Err(ParseError::InvalidExpression {
            line,
            message: format!("unexpected {:?}", other),
        }),
    }
}

fn parse_string(s: &str) -> String {
    // Remove quotes
    let inner = &s[1..s.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_provider_block() {
        let input = r#"
            provider powerscale {
                endpoint = "https://10.0.0.1:8080"
                insecure = true
                timeout  = 2000
            }
        "#;

        let result = parse(input).unwrap();
        assert_eq!(result.providers.len(), 1);
        let provider = result.provider("powerscale").unwrap();
        assert_eq!(
            provider.attributes.get("endpoint"),
            Some(&Value::String("https://10.0.0.1:8080".to_string()))
        );
        assert_eq!(provider.attributes.get("insecure"), Some(&Value::Bool(true)));
        assert_eq!(provider.attributes.get("timeout"), Some(&Value::Int(2000)));
    }

    #[test]
    fn parse_let_bound_resource() {
        let input = r#"
            let home = powerscale.smb_share {
                name = "home"
                path = "/ifs/home"
                browsable = true
            }
        "#;

        let result = parse(input).unwrap();
        assert_eq!(result.resources.len(), 1);
        let share = &result.resources[0];
        assert_eq!(share.id, ResourceId::new("smb_share", "home"));
        assert_eq!(share.binding(), Some("home"));
        assert_eq!(
            share.attributes.get("_provider"),
            Some(&Value::String("powerscale".to_string()))
        );
        assert!(!share.is_data_source());
    }

    #[test]
    fn parse_variable_and_resource() {
        let input = r#"
            # variables
            let base = "/ifs/data"
            let soft = 1000

            let q = powerscale.quota {
                path = base
                type = "directory"
                thresholds {
                    soft = soft
                }
            }
        "#;

        let result = parse(input).unwrap();
        let quota = &result.resources[0];
        assert_eq!(
            quota.attributes.get("path"),
            Some(&Value::String("/ifs/data".to_string()))
        );
        let thresholds = quota.attributes.get("thresholds").unwrap();
        let Value::List(blocks) = thresholds else {
            panic!("expected list of blocks");
        };
        assert_eq!(blocks.len(), 1);
        assert_eq!(
            blocks[0].as_map().unwrap().get("soft"),
            Some(&Value::Int(1000))
        );
    }

    #[test]
    fn parse_data_source() {
        let input = r#"
            let cluster = read powerscale.cluster {}
        "#;
        let result = parse(input).unwrap();
        assert!(result.resources[0].is_data_source());
        assert_eq!(result.resources[0].id.resource_type, "cluster");
    }

    #[test]
    fn parse_env_var() {
        // SAFETY: This test runs in isolation
        unsafe {
            std::env::set_var("POWERSCALE_TEST_PARSER_ENDPOINT", "https://cluster:8080");
        }
        let input = r#"
            provider powerscale {
                endpoint = env("POWERSCALE_TEST_PARSER_ENDPOINT")
            }
        "#;
        let result = parse(input).unwrap();
        assert_eq!(
            result.providers[0].attributes.get("endpoint"),
            Some(&Value::String("https://cluster:8080".to_string()))
        );

        let missing = parse(r#"let x = env("POWERSCALE_TEST_PARSER_UNSET")"#);
        assert!(matches!(missing, Err(ParseError::EnvVarNotSet(_))));
    }

    #[test]
    fn parse_anonymous_resource() {
        let input = r#"
            powerscale.ntp_server {
                name = "pool.ntp.org"
            }
        "#;
        let result = parse(input).unwrap();
        assert_eq!(
            result.resources[0].id,
            ResourceId::new("ntp_server", "pool.ntp.org")
        );
        assert_eq!(result.resources[0].binding(), None);
    }

    #[test]
    fn parse_anonymous_resource_without_name_fails() {
        let input = r#"
            powerscale.ntp_server {
                key = "abc"
            }
        "#;
        assert!(parse(input).is_err());
    }

    #[test]
    fn parse_resource_reference() {
        let input = r#"
            let hr = powerscale.access_zone {
                name = "hr"
                path = "/ifs/hr"
            }

            let docs = powerscale.smb_share {
                name = "docs"
                zone = hr.name
                path = "/ifs/hr/docs"
            }
        "#;
        let result = parse(input).unwrap();
        let docs = result.resource("smb_share", "docs").unwrap();
        assert_eq!(
            docs.attributes.get("zone"),
            Some(&Value::ResourceRef("hr".to_string(), "name".to_string()))
        );
    }

    #[test]
    fn attribute_access_on_variable_fails() {
        let input = r#"
            let path = "/ifs"
            let s = powerscale.smb_share {
                path = path.name
            }
        "#;
        assert!(parse(input).is_err());
    }

    #[test]
    fn duplicate_binding_fails() {
        let input = r#"
            let a = "x"
            let a = "y"
        "#;
        assert!(matches!(parse(input), Err(ParseError::DuplicateBinding(_))));
    }

    #[test]
    fn parse_repeated_nested_blocks() {
        let input = r#"
            let share = powerscale.smb_share {
                name = "eng"
                path = "/ifs/eng"

                permissions {
                    permission      = "full"
                    permission_type = "allow"
                    trustee {
                        id = "SID:S-1-1-0"
                    }
                }

                permissions {
                    permission      = "read"
                    permission_type = "allow"
                    trustee {
                        name = "Everyone"
                        type = "wellknown"
                    }
                }
            }
        "#;

        let result = parse(input).unwrap();
        let share = &result.resources[0];
        let Some(Value::List(perms)) = share.attributes.get("permissions") else {
            panic!("expected permissions list");
        };
        assert_eq!(perms.len(), 2);
        let first = perms[0].as_map().unwrap();
        assert_eq!(first.get("permission"), Some(&Value::from("full")));
        let Some(Value::List(trustee)) = first.get("trustee") else {
            panic!("expected nested trustee block");
        };
        assert_eq!(
            trustee[0].as_map().unwrap().get("id"),
            Some(&Value::from("SID:S-1-1-0"))
        );
    }

    #[test]
    fn parse_list_and_map_syntax() {
        let input = r#"
            let gn = powerscale.groupnet {
                name        = "gn1"
                dns_servers = ["10.0.0.2", "10.0.0.3",]
                labels      = { team = "storage", "cost-center" = "42" }
            }
        "#;
        let result = parse(input).unwrap();
        let gn = &result.resources[0];
        assert_eq!(
            gn.attributes.get("dns_servers"),
            Some(&Value::List(vec![
                Value::from("10.0.0.2"),
                Value::from("10.0.0.3")
            ]))
        );
        let labels = gn.attributes.get("labels").unwrap().as_map().unwrap();
        assert_eq!(labels.get("cost-center"), Some(&Value::from("42")));
    }

    #[test]
    fn parse_backend_block() {
        let input = r#"
            backend local {
                path = "state/cluster.json"
            }
        "#;
        let result = parse(input).unwrap();
        let backend = result.backend.unwrap();
        assert_eq!(backend.backend_type, "local");
        assert_eq!(
            backend.attributes.get("path"),
            Some(&Value::from("state/cluster.json"))
        );
    }

    #[test]
    fn keywords_need_a_boundary() {
        // "readme" is a variable, not the read keyword
        let input = r#"
            let readme = "x"
            let letter = readme
        "#;
        let result = parse(input).unwrap();
        assert_eq!(result.variables.get("letter"), Some(&Value::from("x")));
    }

    #[test]
    fn string_escapes() {
        assert_eq!(parse_string(r#""a\"b\\c\n""#), "a\"b\\c\n");
    }

    #[test]
    fn duplicate_resource_fails() {
        let input = r#"
            powerscale.ntp_server { name = "a" }
            powerscale.ntp_server { name = "a" }
        "#;
        assert!(matches!(parse(input), Err(ParseError::DuplicateResource(_))));
    }
}
