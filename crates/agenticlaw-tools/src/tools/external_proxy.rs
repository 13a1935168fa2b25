//! Tools that proxy to the ads backend over HTTP. Mutating tools
//! (`create_campaign`, `update_campaign`, ...) require confirmation and
//! sit in the evaluator's high-risk set; the three read-only reporting
//! tools are auto-approved.

use crate::proxy_client::ProxyClient;
use crate::registry::{Tool, ToolResult};
use agenticlaw_core::{KernelError, ParamSpec, ParamType, ToolCategory, ToolDescriptor};
use serde_json::Value;

fn param(name: &str, param_type: ParamType, required: bool, description: &str) -> ParamSpec {
    ParamSpec {
        name: name.to_string(),
        param_type,
        required,
        default: None,
        r#enum: None,
        description: description.to_string(),
    }
}

/// A single backend-proxied tool: a descriptor plus the HTTP shape needed
/// to call it. One struct instead of nine near-identical ones, since the
/// only thing that varies per tool is the descriptor and the request shape.
pub struct ExternalProxyTool {
    descriptor: ToolDescriptor,
    client: ProxyClient,
    shape: RequestShape,
}

enum RequestShape {
    Get { path: &'static str, query_params: &'static [&'static str] },
    Post { path: &'static str },
    Patch { path_with_id: &'static str, id_param: &'static str },
    Delete { path_with_id: &'static str, id_param: &'static str },
}

impl ExternalProxyTool {
    fn fill_path(template: &str, id_param: &str, args: &Value) -> Result<String, String> {
        let id = args
            .get(id_param)
            .and_then(Value::as_str)
            .ok_or_else(|| format!("missing required parameter: {id_param}"))?;
        Ok(template.replace(&format!("{{{id_param}}}"), id))
    }

    pub fn create_campaign(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "create_campaign".into(),
                description: "Create a new ad campaign".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![
                    param("name", ParamType::String, true, "Campaign name"),
                    param("daily_budget", ParamType::Number, true, "Daily budget in USD"),
                    param("objective", ParamType::String, true, "Campaign objective"),
                    param("ad_account_id", ParamType::String, true, "Ad account to create the campaign under"),
                ],
                returns: "created campaign object".into(),
                credit_cost: None,
                requires_confirmation: true,
                tags: vec!["mutation".into(), "high_risk".into()],
            },
            client,
            shape: RequestShape::Post { path: "/campaigns" },
        }
    }

    pub fn update_campaign(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "update_campaign".into(),
                description: "Update fields on an existing campaign".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![
                    param("campaign_id", ParamType::String, true, "Campaign to update"),
                    param("name", ParamType::String, false, "New campaign name"),
                    param("daily_budget", ParamType::Number, false, "New daily budget in USD"),
                ],
                returns: "updated campaign object".into(),
                credit_cost: None,
                requires_confirmation: true,
                tags: vec!["mutation".into(), "high_risk".into()],
            },
            client,
            shape: RequestShape::Patch { path_with_id: "/campaigns/{campaign_id}", id_param: "campaign_id" },
        }
    }

    pub fn pause_campaign(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "pause_campaign".into(),
                description: "Pause a running campaign".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![param("campaign_id", ParamType::String, true, "Campaign to pause")],
                returns: "updated campaign object".into(),
                credit_cost: None,
                requires_confirmation: true,
                tags: vec!["mutation".into(), "high_risk".into()],
            },
            client,
            shape: RequestShape::Post { path: "/campaigns/pause" },
        }
    }

    pub fn delete_campaign(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "delete_campaign".into(),
                description: "Permanently delete a campaign".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![param("campaign_id", ParamType::String, true, "Campaign to delete")],
                returns: "deletion confirmation".into(),
                credit_cost: None,
                requires_confirmation: true,
                tags: vec!["mutation".into(), "high_risk".into(), "destructive".into()],
            },
            client,
            shape: RequestShape::Delete { path_with_id: "/campaigns/{campaign_id}", id_param: "campaign_id" },
        }
    }

    pub fn update_budget(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "update_budget".into(),
                description: "Change a campaign's daily or lifetime budget".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![
                    param("campaign_id", ParamType::String, true, "Campaign to update"),
                    param("budget", ParamType::Number, true, "New budget in USD"),
                ],
                returns: "updated campaign object".into(),
                credit_cost: None,
                requires_confirmation: true,
                tags: vec!["mutation".into(), "high_risk".into(), "spending".into()],
            },
            client,
            shape: RequestShape::Post { path: "/campaigns/budget" },
        }
    }

    pub fn disconnect_account(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "disconnect_account".into(),
                description: "Disconnect a connected ad account".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![param("account_id", ParamType::String, true, "Account to disconnect")],
                returns: "disconnection confirmation".into(),
                credit_cost: None,
                requires_confirmation: true,
                tags: vec!["mutation".into(), "high_risk".into(), "destructive".into()],
            },
            client,
            shape: RequestShape::Delete { path_with_id: "/accounts/{account_id}", id_param: "account_id" },
        }
    }

    pub fn save_creative(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "save_creative".into(),
                description: "Save a generated creative asset".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![
                    param("name", ParamType::String, true, "Creative name"),
                    param("content", ParamType::Object, true, "Creative payload"),
                ],
                returns: "saved creative object".into(),
                credit_cost: None,
                requires_confirmation: false,
                tags: vec!["mutation".into()],
            },
            client,
            shape: RequestShape::Post { path: "/creatives" },
        }
    }

    pub fn list_creatives(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "list_creatives".into(),
                description: "List saved creative assets".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![param("campaign_id", ParamType::String, false, "Filter by campaign")],
                returns: "list of creative objects".into(),
                credit_cost: None,
                requires_confirmation: false,
                tags: vec!["read_only".into()],
            },
            client,
            shape: RequestShape::Get { path: "/creatives", query_params: &["campaign_id"] },
        }
    }

    pub fn publish_landing_page(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "publish_landing_page".into(),
                description: "Publish a landing page".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![
                    param("slug", ParamType::String, true, "URL slug"),
                    param("content", ParamType::Object, true, "Page content"),
                ],
                returns: "published page object".into(),
                credit_cost: None,
                requires_confirmation: true,
                tags: vec!["mutation".into(), "high_risk".into()],
            },
            client,
            shape: RequestShape::Post { path: "/landing-pages" },
        }
    }

    pub fn upload_object(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "upload_object".into(),
                description: "Upload a binary object reference to object storage".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![
                    param("key", ParamType::String, true, "Object key"),
                    param("content_type", ParamType::String, true, "MIME type"),
                    param("data_base64", ParamType::String, true, "Base64-encoded object body"),
                ],
                returns: "stored object reference".into(),
                credit_cost: None,
                requires_confirmation: false,
                tags: vec!["mutation".into()],
            },
            client,
            shape: RequestShape::Post { path: "/objects" },
        }
    }

    pub fn get_account_balance(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "get_account_balance".into(),
                description: "Get the current ad account balance".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![param("account_id", ParamType::String, true, "Account to query")],
                returns: "balance object".into(),
                credit_cost: None,
                requires_confirmation: false,
                tags: vec!["read_only".into()],
            },
            client,
            shape: RequestShape::Get { path: "/accounts/balance", query_params: &["account_id"] },
        }
    }

    pub fn get_campaign_reports(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "get_campaign_reports".into(),
                description: "Get performance reports for a campaign".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![
                    param("campaign_id", ParamType::String, true, "Campaign to report on"),
                    param("date_range", ParamType::String, false, "Date range, e.g. last_7_days"),
                ],
                returns: "report object".into(),
                credit_cost: None,
                requires_confirmation: false,
                tags: vec!["read_only".into()],
            },
            client,
            shape: RequestShape::Get {
                path: "/campaigns/reports",
                query_params: &["campaign_id", "date_range"],
            },
        }
    }

    pub fn get_performance_summary(client: ProxyClient) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "get_performance_summary".into(),
                description: "Get an account-wide performance summary".into(),
                category: ToolCategory::ExternalProxy,
                parameters: vec![
                    param("account_id", ParamType::String, true, "Account to summarize"),
                    param("date_range", ParamType::String, false, "Date range, e.g. last_30_days"),
                ],
                returns: "summary object".into(),
                credit_cost: None,
                requires_confirmation: false,
                tags: vec!["read_only".into()],
            },
            client,
            shape: RequestShape::Get {
                path: "/performance/summary",
                query_params: &["account_id", "date_range"],
            },
        }
    }
}

#[async_trait::async_trait]
impl Tool for ExternalProxyTool {
    fn descriptor(&self) -> &ToolDescriptor { &self.descriptor }

    async fn execute(&self, args: Value) -> ToolResult {
        let result = match &self.shape {
            RequestShape::Get { path, query_params } => {
                let query: Vec<(&str, String)> = query_params
                    .iter()
                    .filter_map(|p| args.get(*p).and_then(Value::as_str).map(|v| (*p, v.to_string())))
                    .collect();
                self.client.get(path, &query).await
            }
            RequestShape::Post { path } => self.client.post(path, &args).await,
            RequestShape::Patch { path_with_id, id_param } => {
                match Self::fill_path(path_with_id, id_param, &args) {
                    Ok(path) => self.client.patch(&path, &args).await,
                    Err(e) => return ToolResult::error(e),
                }
            }
            RequestShape::Delete { path_with_id, id_param } => {
                match Self::fill_path(path_with_id, id_param, &args) {
                    Ok(path) => self.client.delete(&path).await,
                    Err(e) => return ToolResult::error(e),
                }
            }
        };

        match result {
            Ok(value) => ToolResult::json(value),
            Err(err) => ToolResult::error(describe(&err)),
        }
    }
}

fn describe(err: &KernelError) -> String {
    err.to_string()
}
