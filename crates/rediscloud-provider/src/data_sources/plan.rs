//! `rediscloud_essentials_plan`

use async_trait::async_trait;
use rediscloud_core::OperationContext;
use rediscloud_core::api::FixedPlan;

use super::{exactly_one, matches_str};
use crate::error::Result;
use crate::host::{Attribute, Block, DataSource, ResourceData, Schema, Validation};
use crate::state::ProviderState;

const FILTERS: &[&str] = &["id", "name", "size", "cloud_provider", "region", "support_data_persistence"];

pub struct EssentialsPlanDataSource;

fn matches(data: &ResourceData, plan: &FixedPlan) -> bool {
    data.get_i64("id").is_none_or(|id| id == plan.id)
        && matches_str(data, "name", plan.name.as_deref())
        && matches_str(data, "region", plan.region.as_deref())
        && matches_str(data, "size_measurement_unit", plan.size_measurement_unit.as_deref())
        && data.get_f64("size").is_none_or(|size| plan.size == Some(size))
        && data
            .get_bool("support_data_persistence")
            .is_none_or(|wanted| plan.support_data_persistence == Some(wanted))
        && data
            .get_bool("support_replication")
            .is_none_or(|wanted| plan.support_replication == Some(wanted))
}

#[async_trait]
impl DataSource for EssentialsPlanDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_essentials_plan"
    }

    fn schema(&self) -> Schema {
        let block = Block::new()
            .attr("id", Attribute::int().optional().computed())
            .attr("name", Attribute::string().optional().computed())
            .attr("size", Attribute::float().optional().computed())
            .attr("size_measurement_unit", Attribute::string().optional().computed())
            .attr(
                "cloud_provider",
                Attribute::string()
                    .optional()
                    .validate(Validation::OneOf(&["AWS", "GCP", "Azure"])),
            )
            .attr("region", Attribute::string().optional().computed())
            .attr("support_data_persistence", Attribute::bool().optional().computed())
            .attr("support_replication", Attribute::bool().optional().computed())
            .attr("region_id", Attribute::int().computed())
            .attr("price", Attribute::float().computed())
            .attr("price_currency", Attribute::string().computed())
            .attr("price_period", Attribute::string().computed())
            .attr("maximum_databases", Attribute::int().computed())
            .attr("maximum_throughput", Attribute::int().computed())
            .attr("maximum_bandwidth_in_gb", Attribute::float().computed())
            .attr("availability", Attribute::string().computed())
            .attr("connections", Attribute::string().computed())
            .attr("cidr_allow_rules", Attribute::int().computed())
            .attr("support_instant_and_daily_backups", Attribute::bool().computed())
            .attr("support_clustering", Attribute::bool().computed())
            .attr("customer_support", Attribute::string().computed());
        Schema::data_source(block)
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let provider = data.get_string("cloud_provider");
        let candidates = state.fixed_subscriptions().list_plans(provider.as_deref()).await?;
        let matching: Vec<FixedPlan> = candidates.into_iter().filter(|p| matches(data, p)).collect();
        let plan = exactly_one("Essentials plan", data, FILTERS, matching)?;

        data.set_id(plan.id.to_string());
        data.set("id", plan.id);
        data.set_opt("name", plan.name);
        data.set_opt("size", plan.size);
        data.set_opt("size_measurement_unit", plan.size_measurement_unit);
        data.set_opt("cloud_provider", plan.provider);
        data.set_opt("region", plan.region);
        data.set_opt("region_id", plan.region_id);
        data.set_opt("price", plan.price);
        data.set_opt("price_currency", plan.price_currency);
        data.set_opt("price_period", plan.price_period);
        data.set_opt("maximum_databases", plan.maximum_databases);
        data.set_opt("maximum_throughput", plan.maximum_throughput);
        data.set_opt("maximum_bandwidth_in_gb", plan.maximum_bandwidth_gb);
        data.set_opt("availability", plan.availability);
        data.set_opt("connections", plan.connections);
        data.set_opt("cidr_allow_rules", plan.cidr_allow_rules);
        data.set_opt("support_data_persistence", plan.support_data_persistence);
        data.set_opt("support_instant_and_daily_backups", plan.support_instant_and_daily_backups);
        data.set_opt("support_replication", plan.support_replication);
        data.set_opt("support_clustering", plan.support_clustering);
        data.set_opt("customer_support", plan.customer_support);
        Ok(())
    }
}
