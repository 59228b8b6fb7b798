//! Loading and preparing a configuration

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

use powerscale_core::diagnostics::{Diagnostic, Diagnostics};
use powerscale_core::graph;
use powerscale_core::parser::{self, ParsedFile};
use powerscale_core::resource::Resource;
use powerscale_core::schema::ResourceSchema;
use powerscale_provider::{PowerScaleProvider, config, schemas};
use powerscale_state::{StateBackend, create_backend};

pub const PROVIDER_NAME: &str = "powerscale";

/// A parsed configuration with its resources in dependency order
pub struct Workspace {
    pub parsed: ParsedFile,
    pub schemas: HashMap<String, ResourceSchema>,
    pub resources: Vec<Resource>,
}

impl Workspace {
    pub fn load(file: &Path) -> Result<Self> {
        let parsed = parser::parse_file(file)
            .with_context(|| format!("Failed to load {}", file.display()))?;
        Self::from_parsed(parsed)
    }

    pub fn from_parsed(parsed: ParsedFile) -> Result<Self> {
        let resources = graph::sort_by_dependencies(&parsed.resources)
            .context("Invalid resource references")?;
        Ok(Self {
            parsed,
            schemas: schema_map(),
            resources,
        })
    }

    /// Normalize nested blocks, fill defaults and validate every resource
    pub fn prepare(&mut self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        for provider in &self.parsed.providers {
            if provider.name != PROVIDER_NAME {
                diagnostics.push(Diagnostic::error("Unsupported provider").with_detail(format!(
                    "provider '{}' is not supported, only '{}'",
                    provider.name, PROVIDER_NAME
                )));
            }
        }

        for resource in &mut self.resources {
            let Some(schema) = self.schemas.get(&resource.id.resource_type) else {
                diagnostics.push(
                    Diagnostic::error("Unknown resource type")
                        .with_detail(format!(
                            "{}.{} is not a supported resource type",
                            PROVIDER_NAME, resource.id.resource_type
                        ))
                        .for_resource(resource.id.clone()),
                );
                continue;
            };

            if resource.is_data_source() != schema.data_source {
                let detail = if schema.data_source {
                    format!("{} is a data source; declare it with `read`", resource.id.resource_type)
                } else {
                    format!("{} cannot be declared with `read`", resource.id.resource_type)
                };
                diagnostics.push(
                    Diagnostic::error("Invalid data source")
                        .with_detail(detail)
                        .for_resource(resource.id.clone()),
                );
                continue;
            }

            schema.normalize(&mut resource.attributes);
            schema.apply_defaults(&mut resource.attributes);
            if let Err(errors) = schema.validate(&resource.attributes) {
                for error in &errors {
                    diagnostics.push(Diagnostic::from_type_error(&resource.id, error));
                }
            }
        }

        diagnostics
    }

    /// Connect to the cluster named by the provider block and environment
    pub fn provider(&self) -> std::result::Result<PowerScaleProvider, Diagnostics> {
        let client_config = config::client_config(self.parsed.provider(PROVIDER_NAME))?;
        PowerScaleProvider::new(&client_config).map_err(|e| {
            let mut diagnostics = Diagnostics::new();
            diagnostics.push(Diagnostic::from(&e));
            diagnostics
        })
    }

    pub fn backend(&self) -> Result<Box<dyn StateBackend>> {
        create_backend(self.parsed.backend.as_ref()).context("Invalid backend configuration")
    }
}

/// Schemas of every resource type, keyed by type
pub fn schema_map() -> HashMap<String, ResourceSchema> {
    schemas()
        .into_iter()
        .map(|schema| (schema.resource_type.clone(), schema))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use powerscale_core::resource::Value;

    fn workspace(text: &str) -> Workspace {
        Workspace::from_parsed(parser::parse(text).unwrap()).unwrap()
    }

    #[test]
    fn resources_come_in_dependency_order() {
        let ws = workspace(
            r#"
            let share = powerscale.smb_share {
                name = "home"
                path = "/ifs/hr/home"
                zone = zone.name
            }
            let zone = powerscale.access_zone {
                name = "hr"
                path = "/ifs/hr"
            }
            "#,
        );
        let order: Vec<&str> = ws.resources.iter().map(|r| r.id.name.as_str()).collect();
        assert_eq!(order, vec!["zone", "share"]);
    }

    #[test]
    fn prepare_reports_schema_errors() {
        let mut ws = workspace(
            r#"
            powerscale.access_zone {
                name = "hr"
                colour = "blue"
            }
            powerscale.snapshot {
                name = "daily"
            }
            "#,
        );
        let diagnostics = ws.prepare();
        // missing path, unknown attribute, unknown type
        assert_eq!(diagnostics.error_count(), 3);
    }

    #[test]
    fn data_sources_need_read() {
        let mut ws = workspace(
            r#"
            let c = powerscale.cluster {}
            "#,
        );
        assert!(ws.prepare().has_errors());

        let mut ws = workspace(
            r#"
            let c = read powerscale.cluster {}
            "#,
        );
        assert!(!ws.prepare().has_errors());
    }

    #[test]
    fn prepare_fills_defaults() {
        let mut ws = workspace(
            r#"
            let home = powerscale.quota {
                path = "/ifs/home"
                type = "directory"
            }
            "#,
        );
        let diagnostics = ws.prepare();
        assert!(!diagnostics.has_errors(), "{}", diagnostics);
        assert_eq!(
            ws.resources[0].attributes.get("include_snapshots"),
            Some(&Value::Bool(false))
        );
    }

    #[test]
    fn other_providers_are_rejected() {
        let mut ws = workspace(
            r#"
            provider aws {
                region = "us-east-1"
            }
            "#,
        );
        assert!(ws.prepare().has_errors());
    }
}
