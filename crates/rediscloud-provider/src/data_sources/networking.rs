//! Transit gateways and PSC endpoints visible to a subscription
//!
//! Both take an optional `region_id`; when set the lookup is scoped to that
//! Active-Active region instead of the whole Pro subscription.

use async_trait::async_trait;
use rediscloud_core::OperationContext;
use rediscloud_core::api::psc::PscScope;
use rediscloud_core::api::transit_gateway::TgwScope;
use serde_json::json;

use super::{exactly_one, matches_str};
use crate::error::{ProviderError, Result};
use crate::host::{AttrType, Attribute, Block, DataSource, ResourceData, Schema};
use crate::state::ProviderState;

fn required_id(data: &ResourceData, key: &str) -> Result<i64> {
    data.get_i64(key)
        .ok_or_else(|| ProviderError::validation_at(key, format!("{} must be a number", key)))
}

fn placement(data: &ResourceData) -> Result<(i64, Option<i64>)> {
    Ok((required_id(data, "subscription_id")?, data.get_i64("region_id")))
}

/// `rediscloud_transit_gateway`
pub struct TransitGatewayDataSource;

#[async_trait]
impl DataSource for TransitGatewayDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_transit_gateway"
    }

    fn schema(&self) -> Schema {
        let block = Block::new()
            .attr("subscription_id", Attribute::string().required())
            .attr("region_id", Attribute::int().optional())
            .attr("tgw_id", Attribute::int().optional().computed())
            .attr("aws_tgw_uid", Attribute::string().optional().computed())
            .attr("attachment_uid", Attribute::string().computed())
            .attr("status", Attribute::string().computed())
            .attr("attachment_status", Attribute::string().computed())
            .attr("aws_account_id", Attribute::string().computed())
            .attr("cidrs", Attribute::list(AttrType::String).computed());
        Schema::data_source(block)
    }

    async fn read(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let scope = match placement(data)? {
            (sub, None) => TgwScope::Subscription(sub),
            (subscription_id, Some(region_id)) => TgwScope::Region {
                subscription_id,
                region_id,
            },
        };
        let wanted_id = data.get_i64("tgw_id");
        let matches = state
            .transit_gateways()
            .list(ctx, scope)
            .await?
            .into_iter()
            .filter(|t| wanted_id.is_none_or(|id| id == t.id))
            .filter(|t| matches_str(data, "aws_tgw_uid", t.aws_tgw_uid.as_deref()))
            .collect();
        let tgw = exactly_one(
            "transit gateway",
            data,
            &["subscription_id", "region_id", "tgw_id", "aws_tgw_uid"],
            matches,
        )?;

        data.set_id(tgw.id.to_string());
        data.set("tgw_id", tgw.id);
        data.set("cidrs", tgw.cidr_addresses());
        data.set_opt("aws_tgw_uid", tgw.aws_tgw_uid);
        data.set_opt("attachment_uid", tgw.attachment_uid);
        data.set_opt("status", tgw.status);
        data.set_opt("attachment_status", tgw.attachment_status);
        data.set_opt("aws_account_id", tgw.aws_account_id);
        Ok(())
    }
}

/// `rediscloud_private_service_connect_endpoints`
pub struct PscEndpointsDataSource;

#[async_trait]
impl DataSource for PscEndpointsDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_private_service_connect_endpoints"
    }

    fn schema(&self) -> Schema {
        let attachment = Block::new()
            .attr("name", Attribute::string().computed())
            .attr("dns_record", Attribute::string().computed())
            .attr("ip_address_name", Attribute::string().computed())
            .attr("forwarding_rule_name", Attribute::string().computed());
        let endpoint = Block::new()
            .attr("private_service_connect_endpoint_id", Attribute::int().computed())
            .attr("gcp_project_id", Attribute::string().computed())
            .attr("gcp_vpc_name", Attribute::string().computed())
            .attr("gcp_vpc_subnet_name", Attribute::string().computed())
            .attr("endpoint_connection_name", Attribute::string().computed())
            .attr("status", Attribute::string().computed())
            .attr("service_attachments", Attribute::list_block(attachment).computed());
        let block = Block::new()
            .attr("subscription_id", Attribute::string().required())
            .attr("region_id", Attribute::int().optional())
            .attr("private_service_connect_service_id", Attribute::int().required())
            .attr("endpoints", Attribute::list_block(endpoint).computed());
        Schema::data_source(block)
    }

    async fn read(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let service = required_id(data, "private_service_connect_service_id")?;
        let (scope, id) = match placement(data)? {
            (sub, None) => (PscScope::Subscription(sub), format!("{}/{}", sub, service)),
            (subscription_id, Some(region_id)) => (
                PscScope::Region {
                    subscription_id,
                    region_id,
                },
                format!("{}/{}/{}", subscription_id, region_id, service),
            ),
        };
        let endpoints = state.psc().list_endpoints(ctx, scope, service).await?;

        data.set_id(id);
        data.set(
            "endpoints",
            endpoints
                .into_iter()
                .map(|e| {
                    json!({
                        "private_service_connect_endpoint_id": e.id,
                        "gcp_project_id": e.gcp_project_id,
                        "gcp_vpc_name": e.gcp_vpc_name,
                        "gcp_vpc_subnet_name": e.gcp_vpc_subnet_name,
                        "endpoint_connection_name": e.endpoint_connection_name,
                        "status": e.status,
                        "service_attachments": e.service_attachments.iter().map(|a| json!({
                            "name": a.name,
                            "dns_record": a.dns_record,
                            "ip_address_name": a.ip_address_name,
                            "forwarding_rule_name": a.forwarding_rule_name,
                        })).collect::<Vec<_>>(),
                    })
                })
                .collect::<Vec<_>>(),
        );
        Ok(())
    }
}
