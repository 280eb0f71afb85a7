//! Account ACL: `rediscloud_acl_rule`, `rediscloud_acl_role`, `rediscloud_acl_user`

use std::collections::BTreeSet;

use async_trait::async_trait;
use rediscloud_core::api::AclRole;
use rediscloud_core::api::acl::{RoleDatabase, RoleRule};
use rediscloud_core::cloud::AclKind;
use rediscloud_core::{OperationContext, ResourceFamily, SubscriptionGuard, cloud};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::common::{found, own_id};
use crate::error::{ProviderError, Result};
use crate::host::{
    AttrType, Attribute, Block, Operation, Resource, ResourceData, Schema, Timeouts,
    import_passthrough,
};
use crate::state::ProviderState;

const ACL_TIMEOUTS: Timeouts = Timeouts::uniform(5);

pub struct AclRuleResource;

#[async_trait]
impl Resource for AclRuleResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_acl_rule"
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::AclRule
    }

    fn schema(&self) -> Schema {
        let block = Block::new()
            .attr("name", Attribute::string().required())
            .attr(
                "rule",
                Attribute::string()
                    .required()
                    .description("Redis ACL rule, for example '+@read ~cache:*'"),
            );
        Schema::resource(block, Some(ACL_TIMEOUTS))
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let client = state.client();
        let timeout = data.timeout(Operation::Create);
        let name = data.get_string("name").unwrap_or_default();
        let rule = data.get_string("rule").unwrap_or_default();

        let task = state.acl().create_rule(&name, &rule).await?;
        let id = cloud::complete_task(ctx, client, task, timeout)
            .await?
            .resource_id()?;
        data.set_id(id.to_string());
        cloud::wait_for_acl_active(ctx, client, AclKind::Rule, id, timeout).await?;
        info!(rule_id = id, name = %name, "ACL rule created");
        self.read(ctx, state, data).await
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "ACL rule")?;
        let Some(rule) = found(data, self.family(), state.acl().get_rule(id).await)? else {
            return Ok(());
        };
        data.set_opt("name", rule.name);
        data.set_opt("rule", rule.acl);
        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "ACL rule")?;
        let client = state.client();
        let timeout = data.timeout(Operation::Update);
        let name = data.get_string("name").unwrap_or_default();
        let rule = data.get_string("rule").unwrap_or_default();

        let task = state.acl().update_rule(id, &name, &rule).await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        cloud::wait_for_acl_active(ctx, client, AclKind::Rule, id, timeout).await?;
        self.read(ctx, state, data).await
    }

    async fn delete(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "ACL rule")?;
        let client = state.client();
        let timeout = data.timeout(Operation::Delete);

        let task = state.acl().delete_rule(id).await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        cloud::wait_for_acl_deleted(ctx, client, AclKind::Rule, id, timeout).await?;
        Ok(())
    }

    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        import_passthrough(data)
    }
}

pub struct AclRoleResource;

fn role_rules(data: &ResourceData) -> Result<Vec<RoleRule>> {
    data.get_list("rule")
        .into_iter()
        .map(|rule| {
            let rule = ResourceData::new(rule);
            let databases = rule
                .get_list("database")
                .into_iter()
                .map(|db| {
                    let db = ResourceData::new(db);
                    Ok(RoleDatabase {
                        subscription_id: db
                            .get_i64("subscription")
                            .ok_or_else(|| ProviderError::validation_at("rule", "database binding needs a subscription"))?,
                        database_id: db
                            .get_i64("database")
                            .ok_or_else(|| ProviderError::validation_at("rule", "database binding needs a database"))?,
                        database_name: None,
                        regions: db.get_strings("regions"),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(RoleRule {
                rule_id: None,
                rule_name: rule.get_string("name").unwrap_or_default(),
                databases,
            })
        })
        .collect()
}

pub(crate) fn role_state(role: &AclRole) -> Value {
    role.redis_rules
        .iter()
        .map(|rule| {
            json!({
                "name": rule.rule_name,
                "database": rule.databases.iter().map(|db| json!({
                    "subscription": db.subscription_id,
                    "database": db.database_id,
                    "regions": db.regions,
                })).collect::<Vec<_>>(),
            })
        })
        .collect()
}

/// Lock every subscription a role binds into, in ascending order so two
/// roles never wait on each other
async fn lock_bound_subscriptions(
    ctx: &OperationContext,
    state: &ProviderState,
    rules: &[RoleRule],
) -> Result<Vec<SubscriptionGuard>> {
    let subscriptions: BTreeSet<i64> = rules
        .iter()
        .flat_map(|r| r.databases.iter().map(|db| db.subscription_id))
        .collect();
    let mut guards = Vec::with_capacity(subscriptions.len());
    for id in subscriptions {
        debug!(subscription_id = id, "Locking subscription for ACL role");
        guards.push(state.lock_subscription(ctx, id).await?);
    }
    Ok(guards)
}

#[async_trait]
impl Resource for AclRoleResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_acl_role"
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::AclRole
    }

    fn schema(&self) -> Schema {
        let database = Block::new()
            .attr("subscription", Attribute::int().required())
            .attr("database", Attribute::int().required())
            .attr("regions", Attribute::set(AttrType::String).optional());
        let rule = Block::new()
            .attr("name", Attribute::string().required())
            .attr("database", Attribute::set_block(database).required().min_items(1));
        let block = Block::new()
            .attr("name", Attribute::string().required())
            .attr("rule", Attribute::set_block(rule).required().min_items(1));
        Schema::resource(block, Some(ACL_TIMEOUTS))
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let client = state.client();
        let timeout = data.timeout(Operation::Create);
        let name = data.get_string("name").unwrap_or_default();
        let rules = role_rules(data)?;
        {
            let _guards = lock_bound_subscriptions(ctx, state, &rules).await?;
            let task = state.acl().create_role(&name, &rules).await?;
            let id = cloud::complete_task(ctx, client, task, timeout)
                .await?
                .resource_id()?;
            data.set_id(id.to_string());
            cloud::wait_for_acl_active(ctx, client, AclKind::Role, id, timeout).await?;
            info!(role_id = id, name = %name, "ACL role created");
        }
        self.read(ctx, state, data).await
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "ACL role")?;
        let Some(role) = found(data, self.family(), state.acl().get_role(id).await)? else {
            return Ok(());
        };
        data.set_opt("name", role.name.clone());
        data.set("rule", role_state(&role));
        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "ACL role")?;
        let client = state.client();
        let timeout = data.timeout(Operation::Update);
        let name = data.get_string("name").unwrap_or_default();
        let rules = role_rules(data)?;
        {
            let _guards = lock_bound_subscriptions(ctx, state, &rules).await?;
            let task = state.acl().update_role(id, &name, &rules).await?;
            cloud::complete_task(ctx, client, task, timeout).await?;
            cloud::wait_for_acl_active(ctx, client, AclKind::Role, id, timeout).await?;
        }
        self.read(ctx, state, data).await
    }

    async fn delete(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "ACL role")?;
        let client = state.client();
        let timeout = data.timeout(Operation::Delete);
        let rules = role_rules(data)?;

        let _guards = lock_bound_subscriptions(ctx, state, &rules).await?;
        let task = state.acl().delete_role(id).await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        cloud::wait_for_acl_deleted(ctx, client, AclKind::Role, id, timeout).await?;
        Ok(())
    }

    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        import_passthrough(data)
    }
}

pub struct AclUserResource;

#[async_trait]
impl Resource for AclUserResource {
    fn type_name(&self) -> &'static str {
        "rediscloud_acl_user"
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::AclUser
    }

    fn schema(&self) -> Schema {
        let block = Block::new()
            .attr("name", Attribute::string().required().force_new())
            .attr("role", Attribute::string().required())
            .attr("password", Attribute::string().required().sensitive().force_new());
        Schema::resource(block, Some(ACL_TIMEOUTS))
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let client = state.client();
        let timeout = data.timeout(Operation::Create);
        let name = data.get_string("name").unwrap_or_default();
        let role = data.get_string("role").unwrap_or_default();
        let password = data.get_string("password").unwrap_or_default();

        let task = state.acl().create_user(&name, &role, &password).await?;
        let id = cloud::complete_task(ctx, client, task, timeout)
            .await?
            .resource_id()?;
        data.set_id(id.to_string());
        cloud::wait_for_acl_active(ctx, client, AclKind::User, id, timeout).await?;
        info!(user_id = id, name = %name, "ACL user created");
        self.read(ctx, state, data).await
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "ACL user")?;
        let Some(user) = found(data, self.family(), state.acl().get_user(id).await)? else {
            return Ok(());
        };
        data.set_opt("name", user.name);
        data.set_opt("role", user.role);
        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "ACL user")?;
        let client = state.client();
        let timeout = data.timeout(Operation::Update);
        if data.has_change("role") {
            let role = data.get_string("role").unwrap_or_default();
            let task = state.acl().update_user(id, &role).await?;
            cloud::complete_task(ctx, client, task, timeout).await?;
            cloud::wait_for_acl_active(ctx, client, AclKind::User, id, timeout).await?;
        }
        self.read(ctx, state, data).await
    }

    async fn delete(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "ACL user")?;
        cloud::delete_acl_user_and_wait(ctx, state.client(), id, data.timeout(Operation::Delete)).await?;
        info!(user_id = id, "ACL user deleted");
        Ok(())
    }

    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        import_passthrough(data)
    }
}
