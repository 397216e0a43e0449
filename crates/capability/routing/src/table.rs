//! 路由表：路径 → 路由定义（含所需功能）。

/// 路由定义。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    /// 精确路径，或以 `/*` 结尾的前缀路径。
    pub path: String,
    pub name: String,
    pub required_feature: Option<String>,
}

impl RouteDefinition {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            required_feature: None,
        }
    }

    pub fn requires(mut self, feature: impl Into<String>) -> Self {
        self.required_feature = Some(feature.into());
        self
    }

    fn prefix(&self) -> Option<&str> {
        self.path.strip_suffix("/*")
    }
}

/// 路由表。精确匹配优先，其次取最长前缀。
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<RouteDefinition>,
}

impl RouteTable {
    pub fn new(routes: Vec<RouteDefinition>) -> Self {
        Self { routes }
    }

    pub fn insert(&mut self, route: RouteDefinition) {
        self.routes.push(route);
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn resolve(&self, path: &str) -> Option<&RouteDefinition> {
        let path = if path.len() > 1 {
            path.trim_end_matches('/')
        } else {
            path
        };
        if let Some(route) = self.routes.iter().find(|route| route.path == path) {
            return Some(route);
        }
        self.routes
            .iter()
            .filter_map(|route| route.prefix().map(|prefix| (prefix, route)))
            .filter(|(prefix, _)| {
                path == *prefix
                    || path
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, route)| route)
    }

    /// ERP 套件的默认模块路由。
    pub fn erp_defaults() -> Self {
        Self::new(vec![
            RouteDefinition::new("/", "dashboard"),
            RouteDefinition::new("/gl/*", "general-ledger"),
            RouteDefinition::new("/gl/budgets/*", "budgets").requires("budgets"),
            RouteDefinition::new("/ap/*", "accounts-payable"),
            RouteDefinition::new("/ar/*", "accounts-receivable"),
            RouteDefinition::new("/cash/*", "cash-management"),
            RouteDefinition::new("/tax/*", "tax").requires("tax"),
            RouteDefinition::new("/hr/*", "human-resources"),
            RouteDefinition::new("/hr/payroll/*", "payroll").requires("payroll"),
            RouteDefinition::new("/reports/*", "reporting"),
            RouteDefinition::new("/consolidation/*", "consolidation").requires("consolidation"),
            RouteDefinition::new("/super-admin/*", "super-admin").requires("super_admin"),
        ])
    }
}
