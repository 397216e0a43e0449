//! 诊断命令行
//!
//! 产品本身没有命令行界面，这里只提供运维排查入口：
//! - login：调用登录接口并打印会话摘要
//! - navigate：按给定租户状态打印路由守卫判定
//! - get：以当前会话执行一次组合层 GET 并打印 JSON 或错误类别

use crate::services::AppServices;
use api_contract::{ApiError, ApiModule};
use clap::{Args, Parser, Subcommand};
use domain::TenantContext;
use erp_config::ClientConfig;
use erp_routing::NavigationDecision;
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "erp-shell")]
#[command(version, about = "ERP client diagnostics", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub session: SessionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// 预置的会话状态。
#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// Access token sent as Bearer
    #[arg(long, global = true, env = "ERP_ACCESS_TOKEN")]
    pub token: Option<String>,

    /// Tenant id
    #[arg(long, global = true, env = "ERP_TENANT_ID")]
    pub tenant: Option<String>,

    /// Selected company id
    #[arg(long, global = true)]
    pub company: Option<String>,

    /// Enabled feature flag (repeatable)
    #[arg(long = "feature", global = true)]
    pub features: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in against the backend and print the session summary
    Login {
        #[arg(long)]
        username: String,
        #[arg(long, env = "ERP_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Print the guard decision for a path
    Navigate {
        /// Target path, e.g. /hr/payroll
        path: String,
    },
    /// Perform a GET through the request layer
    Get {
        /// Module segment (gl, ap, ar, cash, tax, hr, reports, super-admin, auth, tenant)
        #[arg(value_parser = parse_module)]
        module: ApiModule,
        /// Path under the module
        path: String,
    },
}

fn parse_module(value: &str) -> Result<ApiModule, String> {
    ApiModule::from_segment(value).ok_or_else(|| {
        let known: Vec<&str> = ApiModule::ALL.iter().map(ApiModule::segment).collect();
        format!("unknown module '{}', expected one of: {}", value, known.join(", "))
    })
}

impl Cli {
    pub async fn run(self, config: ClientConfig) -> Result<(), Box<dyn std::error::Error>> {
        let services = AppServices::start(config)?;

        let outcome = match self.command {
            Commands::Login { username, password } => {
                run_login(&services, &username, &password, self.session.company.as_deref()).await
            }
            Commands::Navigate { path } => {
                self.session.apply(&services);
                print_navigation(&services, &path);
                Ok(())
            }
            Commands::Get { module, path } => {
                self.session.apply(&services);
                run_get(&services, module, &path).await
            }
        };
        services.shutdown();
        outcome.map_err(Into::into)
    }
}

impl SessionArgs {
    fn apply(&self, services: &AppServices) {
        if let Some(token) = &self.token {
            services.session.set_tokens(token.clone(), None, None);
        }
        services.session.set_tenant(TenantContext::new(
            self.tenant.clone().unwrap_or_default(),
            self.company.clone(),
            self.features.iter().cloned(),
        ));
    }
}

fn print_navigation(services: &AppServices, path: &str) {
    let outcome = services.navigate(path);
    match &outcome.decision {
        NavigationDecision::Allow => println!("allow {} ({:?})", path, outcome.state),
        NavigationDecision::Redirect { to, reason } => {
            println!("redirect {} -> {} ({:?})", path, to, reason)
        }
    }
}

async fn run_login(
    services: &AppServices,
    username: &str,
    password: &str,
    company_id: Option<&str>,
) -> Result<(), ApiError> {
    let response = services.sign_in(username, password, company_id).await?;
    let tenant = services.session.tenant_context();
    println!("tenant {}", tenant.tenant_id);
    println!(
        "company {}",
        tenant.current_company_id.as_deref().unwrap_or("(not selected)")
    );
    for company in &response.companies {
        println!("  available {} {}", company.company_id, company.name);
    }
    let features: Vec<&str> = tenant.enabled_features.iter().map(String::as_str).collect();
    println!("features {}", features.join(","));
    Ok(())
}

async fn run_get(services: &AppServices, module: ApiModule, path: &str) -> Result<(), ApiError> {
    let key = format!("{}:{}", module.segment(), path);
    let call = services.api_call::<Value>(&key);
    match services.get_cached(&call, module, path).await {
        Ok(value) => {
            let rendered = serde_json::to_string_pretty(&value)
                .map_err(|err| ApiError::decode(err.to_string()))?;
            println!("{}", rendered);
            Ok(())
        }
        Err(err) => {
            eprintln!("{}: {}", err.kind, err.message);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_navigate_with_tenant_state() {
        let cli = Cli::try_parse_from([
            "erp-shell",
            "navigate",
            "/hr/payroll",
            "--company",
            "c-1",
            "--feature",
            "budgets",
            "--feature",
            "payroll",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Navigate { ref path } if path == "/hr/payroll"));
        assert_eq!(cli.session.company.as_deref(), Some("c-1"));
        assert_eq!(cli.session.features, vec!["budgets", "payroll"]);
    }

    #[test]
    fn parse_get_module_segment() {
        let cli = Cli::try_parse_from(["erp-shell", "--token", "t-1", "get", "super-admin", "tenants"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Get { module: ApiModule::SuperAdmin, ref path } if path == "tenants"
        ));
        assert_eq!(cli.session.token.as_deref(), Some("t-1"));
    }

    #[test]
    fn parse_rejects_unknown_module() {
        let err = Cli::try_parse_from(["erp-shell", "get", "inventory", "items"]).unwrap_err();
        assert!(err.to_string().contains("unknown module"));
    }

    #[test]
    fn parse_login_with_company() {
        let cli = Cli::try_parse_from([
            "erp-shell",
            "login",
            "--username",
            "alice",
            "--password",
            "secret",
            "--company",
            "c-2",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Login { ref username, ref password } if username == "alice" && password == "secret"
        ));
        assert_eq!(cli.session.company.as_deref(), Some("c-2"));
    }

    #[test]
    fn parse_requires_subcommand() {
        assert!(Cli::try_parse_from(["erp-shell"]).is_err());
    }
}
