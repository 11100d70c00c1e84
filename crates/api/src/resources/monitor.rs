use anyhow::Result;
use cfnmkr_core::{IdCodec, IdKind};
use cfnmkr_mackerel::monitor::{
    AnomalyDetectionMonitor, ConnectivityMonitor, ExpressionMonitor, ExternalMonitor, HeaderField, HostMetricMonitor, ServiceMetricMonitor,
};
use cfnmkr_proxy::{default, Drain, Proxy};
use serde_json::{json, Value};

use super::{id_ref, outputs, scopes, Ctx, Outcome, Resource};
use crate::ResourceError;

pub(crate) struct Monitor;

type Mon = cfnmkr_mackerel::Monitor;

/// Build the monitor payload selected by the `Type` property.
fn monitor(ids: &IdCodec, props: &Proxy<'_>) -> Result<Mon> {
    let typ = props.m("Type").string()?;
    let mut d = Drain::new();
    let name = d.string(&props.m("Name"));
    let memo = d.string(&default(props.m("Memo"), ""));
    let notification_interval = d.uint64(&default(props.m("NotificationInterval"), 0));

    let m = match typ.as_str() {
        "connectivity" => Mon::Connectivity(ConnectivityMonitor {
            name,
            memo,
            notification_interval,
            scopes: scopes(ids, &mut d, &default(props.m("Scopes"), json!([]))),
            exclude_scopes: scopes(ids, &mut d, &default(props.m("ExcludeScopes"), json!([]))),
            ..Default::default()
        }),
        "host" => Mon::Host(HostMetricMonitor {
            name,
            memo,
            notification_interval,
            metric: d.string(&props.m("Metric")),
            operator: d.string(&props.m("Operator")),
            warning: d.optional_float64(&props.m("Warning")),
            critical: d.optional_float64(&props.m("Critical")),
            duration: d.uint64(&default(props.m("Duration"), 1)),
            max_check_attempts: d.uint64(&default(props.m("MaxCheckAttempts"), 1)),
            scopes: scopes(ids, &mut d, &default(props.m("Scopes"), json!([]))),
            exclude_scopes: scopes(ids, &mut d, &default(props.m("ExcludeScopes"), json!([]))),
            ..Default::default()
        }),
        "service" => Mon::Service(ServiceMetricMonitor {
            name,
            memo,
            notification_interval,
            service: id_ref(&mut d, &props.m("Service"), |id| ids.parse_service(id)),
            metric: d.string(&props.m("Metric")),
            operator: d.string(&props.m("Operator")),
            warning: d.optional_float64(&props.m("Warning")),
            critical: d.optional_float64(&props.m("Critical")),
            duration: d.uint64(&default(props.m("Duration"), 1)),
            max_check_attempts: d.uint64(&default(props.m("MaxCheckAttempts"), 1)),
            missing_duration_warning: d.optional_uint64(&props.m("MissingDurationWarning")),
            missing_duration_critical: d.optional_uint64(&props.m("MissingDurationCritical")),
            ..Default::default()
        }),
        "external" => {
            let service = d.optional_string(&props.m("Service")).and_then(|id| d.check(ids.parse_service(&id)));
            let headers = d
                .proxy_array(default(props.m("Headers"), json!([])).proxy_set())
                .iter()
                .map(|h| HeaderField { name: d.string(&h.m("Name")), value: d.string(&h.m("Value")) })
                .collect();
            Mon::External(ExternalMonitor {
                name,
                memo,
                notification_interval,
                service,
                headers,
                url: d.string(&props.m("Url")),
                method: d.string(&default(props.m("Method"), "GET")),
                request_body: d.string(&default(props.m("RequestBody"), "")),
                response_time_warning: d.optional_float64(&props.m("ResponseTimeWarning")),
                response_time_critical: d.optional_float64(&props.m("ResponseTimeCritical")),
                response_time_duration: d.optional_uint64(&default(props.m("ResponseTimeDuration"), 1)),
                contains_string: d.string(&default(props.m("ContainsString"), "")),
                max_check_attempts: d.uint64(&default(props.m("MaxCheckAttempts"), 1)),
                certification_expiration_warning: d.optional_uint64(&props.m("CertificationExpirationWarning")),
                certification_expiration_critical: d.optional_uint64(&props.m("CertificationExpirationCritical")),
                skip_certificate_verification: d.bool(&default(props.m("SkipCertificateVerification"), false)),
                ..Default::default()
            })
        }
        "expression" => Mon::Expression(ExpressionMonitor {
            name,
            memo,
            notification_interval,
            expression: d.string(&props.m("Expression")),
            operator: d.string(&props.m("Operator")),
            warning: d.optional_float64(&props.m("Warning")),
            critical: d.optional_float64(&props.m("Critical")),
            ..Default::default()
        }),
        "anomalyDetection" | "anomaly-detection" => Mon::AnomalyDetection(AnomalyDetectionMonitor {
            name,
            memo,
            notification_interval,
            scopes: scopes(ids, &mut d, &props.m("Scopes")),
            warning_sensitivity: d.optional_string(&props.m("WarningSensitivity")),
            critical_sensitivity: d.optional_string(&props.m("CriticalSensitivity")),
            max_check_attempts: d.uint64(&default(props.m("MaxCheckAttempts"), 3)),
            training_period_from: d.optional_uint64(&props.m("TrainingPeriodFrom")),
            ..Default::default()
        }),
        other => return Err(ResourceError::UnknownType { what: "monitor", value: other.to_string() }.into()),
    };
    d.combine_errors()?;
    Ok(m)
}

fn monitor_outputs(m: &Mon) -> Result<(String, cfnmkr_core::Outputs)> {
    let id = m.id().ok_or(ResourceError::MissingId("monitor"))?.to_string();
    let out = outputs([("MonitorId", Value::from(id.as_str())), ("Type", m.type_name().into()), ("Name", m.name().into())]);
    Ok((id, out))
}

#[async_trait::async_trait]
impl Resource for Monitor {
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let m = monitor(&ids, &ctx.properties())?;
        let created = ctx.api.create_monitor(ctx.inv, &m).await?;
        let (monitor_id, out) = monitor_outputs(&created)?;
        Ok((ids.build(IdKind::Monitor, &[&monitor_id]), out))
    }

    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let monitor_id = ids.parse_monitor(ctx.physical_id())?;
        let m = monitor(&ids, &ctx.properties())?;
        let updated = ctx.api.update_monitor(ctx.inv, &monitor_id, &m).await?;
        let (_, out) = monitor_outputs(&updated)?;
        Ok(ctx.keep(out))
    }

    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let Some(monitor_id) = ctx.owned(ids.parse_monitor(ctx.physical_id())) else { return Ok(ctx.echo()) };
        ctx.ignore_missing(ctx.api.delete_monitor(ctx.inv, &monitor_id).await)?;
        Ok(ctx.echo())
    }
}
