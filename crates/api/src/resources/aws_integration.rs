use std::collections::BTreeMap;

use anyhow::Result;
use cfnmkr_core::{tags, IdCodec, IdKind, Outputs, Tag};
use cfnmkr_mackerel::AwsIntegrationService;
use cfnmkr_proxy::{default, Drain, Proxy};
use serde_json::json;

use super::{outputs, Ctx, Outcome, Resource};
use crate::ResourceError;

pub(crate) struct AwsIntegration;

/// External id AWS presents when assuming the integration role.
pub(crate) struct AwsIntegrationExternalId;

fn integration(ids: &IdCodec, props: &Proxy<'_>) -> Result<cfnmkr_mackerel::AwsIntegration> {
    let mut d = Drain::new();
    let param = cfnmkr_mackerel::AwsIntegration {
        id: None,
        name: d.string(&props.m("Name")),
        memo: d.string(&default(props.m("Memo"), "")),
        key: d.optional_string(&props.m("Key")),
        secret_key: d.optional_string(&props.m("SecretKey")),
        role_arn: d.optional_string(&props.m("RoleArn")),
        external_id: d.optional_string(&props.m("ExternalID")),
        region: d.string(&props.m("Region")),
        included_tags: tag_list(&mut d, &default(props.m("IncludedTags"), json!([]))),
        excluded_tags: tag_list(&mut d, &default(props.m("ExcludedTags"), json!([]))),
        services: services(ids, &mut d, &props.m("Services")),
    };
    d.combine_errors()?;
    Ok(param)
}

fn tag_list(d: &mut Drain, p: &Proxy<'_>) -> String {
    let list: Vec<Tag> = d.proxy_array(p.proxy_set()).iter().map(|t| Tag::new(d.string(&t.m("Name")), d.string(&t.m("Value")))).collect();
    tags::encode(&list)
}

fn services(ids: &IdCodec, d: &mut Drain, p: &Proxy<'_>) -> BTreeMap<String, AwsIntegrationService> {
    let mut out = BTreeMap::new();
    for s in d.proxy_array(p.proxy_set()) {
        let service_id = d.string(&s.m("ServiceId"));
        let role = d.optional_string(&s.m("Role")).and_then(|id| d.check(ids.parse_role_fullname(&id)));
        let service = AwsIntegrationService {
            enable: d.bool(&s.m("Enable")),
            role,
            excluded_metrics: d.string_array(&default(s.m("ExcludedMetrics"), json!([])).proxy_set()),
            retire_automatically: d.bool(&default(s.m("RetireAutomatically"), false)),
        };
        out.insert(service_id, service);
    }
    out
}

#[async_trait::async_trait]
impl Resource for AwsIntegration {
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let param = integration(&ids, &ctx.properties())?;
        let created = ctx.api.create_aws_integration(ctx.inv, &param).await?;
        let integration_id = created.id.ok_or(ResourceError::MissingId("aws integration"))?;
        Ok((ids.build(IdKind::AwsIntegration, &[&integration_id]), Outputs::new()))
    }

    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let param = integration(&ids, &ctx.properties())?;
        let integration_id = ids.parse_aws_integration(ctx.physical_id())?;
        ctx.api.update_aws_integration(ctx.inv, &integration_id, &param).await?;
        Ok(ctx.echo())
    }

    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let Some(integration_id) = ctx.owned(ids.parse_aws_integration(ctx.physical_id())) else { return Ok(ctx.echo()) };
        ctx.ignore_missing(ctx.api.delete_aws_integration(ctx.inv, &integration_id).await)?;
        Ok(ctx.echo())
    }
}

#[async_trait::async_trait]
impl Resource for AwsIntegrationExternalId {
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let external_id = ctx.api.create_aws_integration_external_id(ctx.inv).await?;
        Ok((ids.build(IdKind::AwsIntegrationExternalId, &[&external_id]), outputs([("Id", external_id.into())])))
    }

    // Every property is immutable, so any change goes through create and mints
    // a fresh external id. Only an unchanged update lands here and keeps it.
    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let external_id = ids.parse_aws_integration_external_id(ctx.physical_id())?;
        Ok(ctx.keep(outputs([("Id", external_id.into())])))
    }

    // There is no remote delete; the id only has to be ours.
    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        ctx.owned(ids.parse_aws_integration_external_id(ctx.physical_id()));
        Ok(ctx.echo())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn build(props: Value) -> Result<cfnmkr_mackerel::AwsIntegration> { integration(&IdCodec::new("org"), &Proxy::new(&props)) }

    #[test]
    fn tags_are_encoded() {
        let p = build(json!({
            "Name": "aws", "Region": "ap-northeast-1", "RoleArn": "arn:aws:iam::123:role/mackerel",
            "IncludedTags": [{"Name": "env", "Value": "prod"}, {"Name": "team:name", "Value": "a, b"}],
            "ExcludedTags": [{"Name": "say", "Value": "it's \"ok\""}],
            "Services": []
        }))
        .unwrap();
        assert_eq!(p.included_tags, "env:prod,\"team:name\":\"a, b\"");
        assert_eq!(p.excluded_tags, "say:it's \"ok\"");
        assert_eq!(p.role_arn.as_deref(), Some("arn:aws:iam::123:role/mackerel"));
        assert_eq!(p.key, None);
    }

    #[test]
    fn services_are_keyed_by_service_id() {
        let p = build(json!({
            "Name": "aws", "Region": "us-east-1",
            "Services": [
                {"ServiceId": "EC2", "Enable": true, "Role": "mkr:org:role:web:app", "ExcludedMetrics": ["ec2.cpu.used"]},
                {"ServiceId": "RDS", "Enable": false, "RetireAutomatically": true}
            ]
        }))
        .unwrap();
        let ec2 = &p.services["EC2"];
        assert!(ec2.enable);
        assert_eq!(ec2.role.as_deref(), Some("web:app"));
        assert_eq!(ec2.excluded_metrics, vec!["ec2.cpu.used".to_string()]);
        let rds = &p.services["RDS"];
        assert!(!rds.enable);
        assert!(rds.retire_automatically);
        assert_eq!(rds.role, None);
    }

    #[test]
    fn enable_is_required() {
        let err = build(json!({
            "Name": "aws", "Region": "us-east-1",
            "Services": [{"ServiceId": "EC2"}, {"ServiceId": "RDS", "Enable": false}]
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "not found: .Services[0].Enable");
    }

    #[test]
    fn services_are_required() {
        let err = build(json!({"Name": "aws", "Region": "us-east-1"})).unwrap_err();
        assert_eq!(err.to_string(), "not found: .Services");
    }
}
