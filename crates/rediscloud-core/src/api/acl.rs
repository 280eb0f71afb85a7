//! Account-level ACL: Redis rules, roles and users
//!
//! Roles bind rules to databases; users reference a role by name.

use redis_cloud::acl::{
    AclRedisRuleCreateRequest, AclRedisRuleUpdateRequest, AclRoleCreateRequest,
    AclRoleDatabaseSpec, AclRoleRedisRuleSpec, AclRoleUpdateRequest, AclUserCreateRequest,
    AclUserUpdateRequest,
};
use serde::{Deserialize, Serialize};

use super::tasks::TaskStateUpdate;
use super::{api_id, list_field};
use crate::client::CloudClient;
use crate::error::{CoreError, InFamily, ResourceFamily, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclRule {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub acl: Option<String>,
    #[serde(default)]
    pub is_default: Option<bool>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclRole {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub redis_rules: Vec<RoleRule>,
    #[serde(default)]
    pub status: Option<String>,
}

/// A rule as bound inside a role
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<i64>,
    pub rule_name: String,
    #[serde(default)]
    pub databases: Vec<RoleDatabase>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDatabase {
    pub subscription_id: i64,
    pub database_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclUser {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Handler for `/acl`
#[derive(Debug, Clone)]
pub struct AclHandler {
    client: CloudClient,
}

impl AclHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    // Rules

    pub async fn list_rules(&self) -> Result<Vec<AclRule>> {
        let value = self
            .client
            .get_raw(ResourceFamily::AclRule, "/acl/redisRules")
            .await?;
        list_field(&value, "accountRedisAclRules")
    }

    /// The API has no single-rule GET; look the rule up in the list
    pub async fn get_rule(&self, rule_id: i64) -> Result<AclRule> {
        self.list_rules()
            .await?
            .into_iter()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| {
                CoreError::not_found(
                    ResourceFamily::AclRule,
                    format!("ACL rule {} not found", rule_id),
                )
            })
    }

    pub async fn create_rule(&self, name: &str, rule: &str) -> Result<TaskStateUpdate> {
        let request = AclRedisRuleCreateRequest {
            name: name.to_string(),
            redis_rule: rule.to_string(),
            command_type: None,
        };
        let task = self
            .client
            .cloud()
            .acl()
            .create_redis_rule(&request)
            .await
            .in_family(ResourceFamily::AclRule)?;
        TaskStateUpdate::from_task(&task)
    }

    pub async fn update_rule(&self, rule_id: i64, name: &str, rule: &str) -> Result<TaskStateUpdate> {
        let request = AclRedisRuleUpdateRequest {
            redis_rule_id: None,
            name: name.to_string(),
            redis_rule: rule.to_string(),
            command_type: None,
        };
        let task = self
            .client
            .cloud()
            .acl()
            .update_redis_rule(api_id(rule_id)?, &request)
            .await
            .in_family(ResourceFamily::AclRule)?;
        TaskStateUpdate::from_task(&task)
    }

    pub async fn delete_rule(&self, rule_id: i64) -> Result<TaskStateUpdate> {
        let task = self
            .client
            .cloud()
            .acl()
            .delete_redis_rule(api_id(rule_id)?)
            .await
            .in_family(ResourceFamily::AclRule)?;
        TaskStateUpdate::from_task(&task)
    }

    // Roles

    pub async fn list_roles(&self) -> Result<Vec<AclRole>> {
        let value = self.client.get_raw(ResourceFamily::AclRole, "/acl/roles").await?;
        list_field(&value, "accountRoles")
    }

    pub async fn get_role(&self, role_id: i64) -> Result<AclRole> {
        self.list_roles()
            .await?
            .into_iter()
            .find(|r| r.id == role_id)
            .ok_or_else(|| {
                CoreError::not_found(
                    ResourceFamily::AclRole,
                    format!("ACL role {} not found", role_id),
                )
            })
    }

    pub async fn create_role(&self, name: &str, rules: &[RoleRule]) -> Result<TaskStateUpdate> {
        let request = AclRoleCreateRequest {
            name: name.to_string(),
            redis_rules: role_rule_specs(rules)?,
            command_type: None,
        };
        let task = self
            .client
            .cloud()
            .acl()
            .create_role(&request)
            .await
            .in_family(ResourceFamily::AclRole)?;
        TaskStateUpdate::from_task(&task)
    }

    pub async fn update_role(
        &self,
        role_id: i64,
        name: &str,
        rules: &[RoleRule],
    ) -> Result<TaskStateUpdate> {
        let request = AclRoleUpdateRequest {
            name: Some(name.to_string()),
            redis_rules: Some(role_rule_specs(rules)?),
            role_id: None,
            command_type: None,
        };
        let task = self
            .client
            .cloud()
            .acl()
            .update_role(api_id(role_id)?, &request)
            .await
            .in_family(ResourceFamily::AclRole)?;
        TaskStateUpdate::from_task(&task)
    }

    pub async fn delete_role(&self, role_id: i64) -> Result<TaskStateUpdate> {
        let task = self
            .client
            .cloud()
            .acl()
            .delete_acl_role(api_id(role_id)?)
            .await
            .in_family(ResourceFamily::AclRole)?;
        TaskStateUpdate::from_task(&task)
    }

    // Users

    pub async fn list_users(&self) -> Result<Vec<AclUser>> {
        let value = self.client.get_raw(ResourceFamily::AclUser, "/acl/users").await?;
        list_field(&value, "accountACLUsers")
    }

    pub async fn get_user(&self, user_id: i64) -> Result<AclUser> {
        self.client
            .get(ResourceFamily::AclUser, &format!("/acl/users/{}", user_id))
            .await
    }

    pub async fn create_user(&self, name: &str, role: &str, password: &str) -> Result<TaskStateUpdate> {
        let request = AclUserCreateRequest {
            name: name.to_string(),
            role: role.to_string(),
            password: password.to_string(),
            command_type: None,
        };
        let task = self
            .client
            .cloud()
            .acl()
            .create_user(&request)
            .await
            .in_family(ResourceFamily::AclUser)?;
        TaskStateUpdate::from_task(&task)
    }

    /// Only the role can change; name and password are fixed at create
    pub async fn update_user(&self, user_id: i64, role: &str) -> Result<TaskStateUpdate> {
        let request = AclUserUpdateRequest {
            user_id: None,
            role: Some(role.to_string()),
            password: None,
            command_type: None,
        };
        let task = self
            .client
            .cloud()
            .acl()
            .update_acl_user(api_id(user_id)?, &request)
            .await
            .in_family(ResourceFamily::AclUser)?;
        TaskStateUpdate::from_task(&task)
    }

    pub async fn delete_user(&self, user_id: i64) -> Result<TaskStateUpdate> {
        let task = self
            .client
            .cloud()
            .acl()
            .delete_user(api_id(user_id)?)
            .await
            .in_family(ResourceFamily::AclUser)?;
        TaskStateUpdate::from_task(&task)
    }
}

fn role_rule_specs(rules: &[RoleRule]) -> Result<Vec<AclRoleRedisRuleSpec>> {
    rules
        .iter()
        .map(|rule| {
            let databases = rule
                .databases
                .iter()
                .map(|db| {
                    Ok(AclRoleDatabaseSpec {
                        subscription_id: api_id(db.subscription_id)?,
                        database_id: api_id(db.database_id)?,
                        regions: (!db.regions.is_empty()).then(|| db.regions.clone()),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(AclRoleRedisRuleSpec {
                rule_name: rule.rule_name.clone(),
                databases,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_rule_serializes_bindings() {
        let rule = RoleRule {
            rule_id: None,
            rule_name: "read-only".to_string(),
            databases: vec![RoleDatabase {
                subscription_id: 10,
                database_id: 20,
                database_name: None,
                regions: vec![],
            }],
        };
        assert_eq!(
            serde_json::to_value(&rule).unwrap(),
            json!({"ruleName": "read-only", "databases": [{"subscriptionId": 10, "databaseId": 20}]})
        );
    }

    #[test]
    fn test_role_rules_become_request_specs() {
        let rules = vec![RoleRule {
            rule_id: Some(3),
            rule_name: "full-access".to_string(),
            databases: vec![RoleDatabase {
                subscription_id: 10,
                database_id: 20,
                database_name: Some("cache".to_string()),
                regions: vec!["us-east-1".to_string()],
            }],
        }];
        let specs = role_rule_specs(&rules).unwrap();
        assert_eq!(
            serde_json::to_value(&specs).unwrap(),
            json!([{"ruleName": "full-access", "databases": [
                {"subscriptionId": 10, "databaseId": 20, "regions": ["us-east-1"]}
            ]}])
        );
    }

    #[test]
    fn test_out_of_range_database_id_is_rejected() {
        let rules = vec![RoleRule {
            rule_id: None,
            rule_name: "r".to_string(),
            databases: vec![RoleDatabase {
                subscription_id: 10,
                database_id: i64::from(i32::MAX) + 1,
                database_name: None,
                regions: vec![],
            }],
        }];
        assert!(matches!(role_rule_specs(&rules), Err(CoreError::Id(_))));
    }
}
