//! ACL lookups by name

use async_trait::async_trait;
use rediscloud_core::OperationContext;

use super::{exactly_one, matches_str};
use crate::error::Result;
use crate::host::{AttrType, Attribute, Block, DataSource, ResourceData, Schema};
use crate::resources::role_state;
use crate::state::ProviderState;

fn by_name() -> Block {
    Block::new().attr("name", Attribute::string().required())
}

/// `rediscloud_acl_rule`
pub struct AclRuleDataSource;

#[async_trait]
impl DataSource for AclRuleDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_acl_rule"
    }

    fn schema(&self) -> Schema {
        Schema::data_source(by_name().attr("rule", Attribute::string().computed()))
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let matches = state
            .acl()
            .list_rules()
            .await?
            .into_iter()
            .filter(|r| matches_str(data, "name", r.name.as_deref()))
            .collect();
        let rule = exactly_one("ACL rule", data, &["name"], matches)?;
        data.set_id(rule.id.to_string());
        data.set_opt("rule", rule.acl);
        Ok(())
    }
}

/// `rediscloud_acl_role`
pub struct AclRoleDataSource;

#[async_trait]
impl DataSource for AclRoleDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_acl_role"
    }

    fn schema(&self) -> Schema {
        let database = Block::new()
            .attr("subscription", Attribute::int().computed())
            .attr("database", Attribute::int().computed())
            .attr("regions", Attribute::set(AttrType::String).computed());
        let rule = Block::new()
            .attr("name", Attribute::string().computed())
            .attr("database", Attribute::set_block(database).computed());
        Schema::data_source(by_name().attr("rule", Attribute::set_block(rule).computed()))
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let matches = state
            .acl()
            .list_roles()
            .await?
            .into_iter()
            .filter(|r| matches_str(data, "name", r.name.as_deref()))
            .collect();
        let role = exactly_one("ACL role", data, &["name"], matches)?;
        data.set_id(role.id.to_string());
        data.set("rule", role_state(&role));
        Ok(())
    }
}

/// `rediscloud_acl_user`
pub struct AclUserDataSource;

#[async_trait]
impl DataSource for AclUserDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_acl_user"
    }

    fn schema(&self) -> Schema {
        Schema::data_source(by_name().attr("role", Attribute::string().computed()))
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let matches = state
            .acl()
            .list_users()
            .await?
            .into_iter()
            .filter(|u| matches_str(data, "name", u.name.as_deref()))
            .collect();
        let user = exactly_one("ACL user", data, &["name"], matches)?;
        data.set_id(user.id.to_string());
        data.set_opt("role", user.role);
        Ok(())
    }
}
