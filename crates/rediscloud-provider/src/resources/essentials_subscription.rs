//! `rediscloud_essentials_subscription`: a fixed-plan subscription

use async_trait::async_trait;
use rediscloud_core::api::FixedSubscription;
use rediscloud_core::api::fixed::FixedSubscriptionRequest;
use rediscloud_core::{OperationContext, ResourceFamily, cloud};
use tracing::info;

use super::common::{found, int_attr, own_id};
use super::subscription::{payment_attributes, payment_method_id};
use crate::error::Result;
use crate::host::{
    Attribute, Block, Operation, Resource, ResourceData, Schema, Timeouts, Validation,
    import_passthrough,
};
use crate::state::ProviderState;

pub const TYPE_NAME: &str = "rediscloud_essentials_subscription";

pub struct EssentialsSubscriptionResource;

fn request(data: &ResourceData) -> Result<FixedSubscriptionRequest> {
    Ok(FixedSubscriptionRequest {
        name: data.get_string("name").unwrap_or_default(),
        plan_id: int_attr(data, "plan_id", "Plan")?,
        payment_method: data.get_string("payment_method"),
        payment_method_id: payment_method_id(data)?,
    })
}

fn set_state(data: &mut ResourceData, sub: &FixedSubscription) {
    data.set_opt("name", sub.name.clone());
    data.set_opt("plan_id", sub.plan_id.map(|id| id.to_string()));
    data.set_opt("payment_method_id", sub.payment_method_id.map(|id| id.to_string()));
    data.set_opt("status", sub.status.clone());
    data.set_opt("creation_date", sub.creation_date.clone());
}

#[async_trait]
impl Resource for EssentialsSubscriptionResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::FixedSubscription
    }

    fn schema(&self) -> Schema {
        let block = payment_attributes(Block::new())
            .attr("name", Attribute::string().required())
            .attr(
                "plan_id",
                Attribute::string()
                    .required()
                    .validate(Validation::Pattern(r"^\d+$", "plan_id must be numeric"))
                    .description("ID of an Essentials plan, see the rediscloud_essentials_plan data source"),
            )
            .attr("status", Attribute::string().computed())
            .attr("creation_date", Attribute::string().computed());
        Schema::resource(block, Some(Timeouts::uniform(10)))
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let request = request(data)?;
        let client = state.client();
        let timeout = data.timeout(Operation::Create);

        let task = state.fixed_subscriptions().create(&request).await?;
        let id = cloud::complete_task(ctx, client, task, timeout)
            .await?
            .resource_id()?;
        data.set_id(id.to_string());
        info!(subscription_id = id, plan_id = request.plan_id, "Essentials subscription created");

        cloud::wait_for_fixed_subscription_active(ctx, client, id, timeout).await?;
        self.read(ctx, state, data).await
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "Subscription")?;
        let Some(sub) = found(data, self.family(), state.fixed_subscriptions().get(id).await)? else {
            return Ok(());
        };
        set_state(data, &sub);
        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "Subscription")?;
        let client = state.client();
        let timeout = data.timeout(Operation::Update);
        let request = request(data)?;
        {
            let _guard = state.lock_subscription(ctx, id).await?;
            cloud::wait_for_fixed_subscription_active(ctx, client, id, timeout).await?;
            let task = state.fixed_subscriptions().update(id, &request).await?;
            cloud::complete_task(ctx, client, task, timeout).await?;
            cloud::wait_for_fixed_subscription_active(ctx, client, id, timeout).await?;
        }
        self.read(ctx, state, data).await
    }

    async fn delete(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "Subscription")?;
        let client = state.client();
        let timeout = data.timeout(Operation::Delete);

        let _guard = state.lock_subscription(ctx, id).await?;
        cloud::wait_for_fixed_subscription_active(ctx, client, id, timeout).await?;
        let task = state.fixed_subscriptions().delete(id).await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        cloud::wait_for_fixed_subscription_deleted(ctx, client, id, timeout).await?;
        Ok(())
    }

    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        import_passthrough(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_parses_plan_and_payment_ids() {
        let data = ResourceData::new(json!({
            "name": "cache",
            "plan_id": "34858",
            "payment_method": "credit-card",
            "payment_method_id": "4242"
        }));
        let request = request(&data).unwrap();
        assert_eq!(request.plan_id, 34858);
        assert_eq!(request.payment_method_id, Some(4242));

        let free = ResourceData::new(json!({"name": "free", "plan_id": "1"}));
        assert_eq!(super::request(&free).unwrap().payment_method_id, None);
    }

    #[test]
    fn test_non_numeric_plan_is_rejected() {
        let data = ResourceData::new(json!({"name": "cache", "plan_id": "small"}));
        assert!(request(&data).is_err());
    }
}
