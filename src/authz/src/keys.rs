//! Key derivation for evaluator subjects and binding records

/// Separator between tenant and the rest of a composite key
pub const TENANT_SEPARATOR: &str = "##";

pub fn user_prefix(tenant_id: &str) -> String {
    format!("{}##user##", tenant_id)
}

/// Evaluator subject key of a user
pub fn user_key(tenant_id: &str, name: &str) -> String {
    format!("{}{}", user_prefix(tenant_id), name)
}

/// Evaluator subject key of a group
pub fn group_key(tenant_id: &str, group_id: &str) -> String {
    format!("{}##group##{}", tenant_id, group_id)
}

/// Deterministic binding record key; one record per (project, policy) pair
pub fn project_policy_name(project_id: &str, policy_id: &str) -> String {
    format!("{}-{}", project_id, policy_id)
}

pub fn combine_tenant_and_name(tenant_id: &str, name: &str) -> String {
    format!("{}{}{}", tenant_id, TENANT_SEPARATOR, name)
}

/// Split `tenant##name`; strings without a separator have no tenant
pub fn parse_tenant_and_name(s: &str) -> (&str, &str) {
    let mut parts = s.split(TENANT_SEPARATOR);
    match (parts.next(), parts.next()) {
        (Some(tenant), Some(name)) => (tenant, name),
        _ => ("", s),
    }
}
