use anyhow::Result;
use cfnmkr_core::{IdCodec, IdKind, Outputs};
use cfnmkr_mackerel::dashboard::{Graph, GraphRange, Layout, Metric, Widget};
use cfnmkr_proxy::{default, Drain, ErrorCode, Proxy};

use super::{id_ref, Ctx, Outcome, Resource};
use crate::ResourceError;

pub(crate) struct Dashboard;

fn dashboard(ids: &IdCodec, props: &Proxy<'_>) -> Result<cfnmkr_mackerel::Dashboard> {
    let mut d = Drain::new();
    let widgets = d.proxy_array(props.m("Widgets").proxy_set()).iter().filter_map(|w| widget(ids, &mut d, w)).collect();
    let dash = cfnmkr_mackerel::Dashboard {
        title: d.string(&props.m("Title")),
        memo: d.string(&default(props.m("Memo"), "")),
        url_path: d.string(&props.m("UrlPath")),
        widgets,
        ..Default::default()
    };
    d.combine_errors()?;
    Ok(dash)
}

fn widget(ids: &IdCodec, d: &mut Drain, w: &Proxy<'_>) -> Option<Widget> {
    let typ = d.check(w.m("Type").string())?;
    let title = d.string(&default(w.m("Title"), ""));
    match typ.as_str() {
        "graph" => Some(Widget::Graph { title, graph: graph(ids, d, &w.m("Graph")), range: range(d, &w.m("Range")), layout: layout(d, &w.m("Layout")) }),
        "value" => Some(Widget::Value { title, metric: metric(ids, d, &w.m("Metric")), layout: layout(d, &w.m("Layout")) }),
        "markdown" => Some(Widget::Markdown { title, markdown: d.string(&default(w.m("Markdown"), "")), layout: layout(d, &w.m("Layout")) }),
        "alertStatus" => Some(Widget::AlertStatus {
            title,
            role_fullname: id_ref(d, &w.m("Role"), |id| ids.parse_role_fullname(id)),
            layout: layout(d, &w.m("Layout")),
        }),
        other => {
            d.put(ResourceError::UnknownType { what: "widget", value: other.to_string() });
            None
        }
    }
}

fn graph(ids: &IdCodec, d: &mut Drain, g: &Proxy<'_>) -> Graph {
    let Some(typ) = d.check(g.m("Type").string()) else { return Graph::Unknown };
    match typ.as_str() {
        "host" => Graph::Host { host_id: id_ref(d, &g.m("Host"), |id| ids.parse_host(id)), name: d.string(&g.m("Name")) },
        "role" => Graph::Role {
            role_fullname: id_ref(d, &g.m("Role"), |id| ids.parse_role_fullname(id)),
            name: d.string(&g.m("Name")),
            is_stacked: d.bool(&default(g.m("IsStacked"), false)),
        },
        "service" => Graph::Service { service_name: id_ref(d, &g.m("Service"), |id| ids.parse_service(id)), name: d.string(&g.m("Name")) },
        "expression" => Graph::Expression { expression: d.string(&g.m("Expression")) },
        other => {
            d.put(ResourceError::UnknownType { what: "graph", value: other.to_string() });
            Graph::Unknown
        }
    }
}

fn metric(ids: &IdCodec, d: &mut Drain, m: &Proxy<'_>) -> Metric {
    let Some(typ) = d.check(m.m("Type").string()) else { return Metric::Unknown };
    match typ.as_str() {
        "host" => Metric::Host { host_id: id_ref(d, &m.m("Host"), |id| ids.parse_host(id)), name: d.string(&m.m("Name")) },
        "service" => Metric::Service { service_name: id_ref(d, &m.m("Service"), |id| ids.parse_service(id)), name: d.string(&m.m("Name")) },
        "expression" => Metric::Expression { expression: d.string(&m.m("Expression")) },
        other => {
            d.put(ResourceError::UnknownType { what: "metric", value: other.to_string() });
            Metric::Unknown
        }
    }
}

fn range(d: &mut Drain, r: &Proxy<'_>) -> Option<GraphRange> {
    if r.is_error(ErrorCode::NotFound) {
        return None;
    }
    let typ = d.check(r.m("Type").string())?;
    match typ.as_str() {
        "relative" => Some(GraphRange::Relative { period: d.int64(&r.m("Period")), offset: d.int64(&r.m("Offset")) }),
        "absolute" => Some(GraphRange::Absolute { start: d.int64(&r.m("Start")), end: d.int64(&r.m("End")) }),
        other => {
            d.put(ResourceError::UnknownType { what: "graph range", value: other.to_string() });
            None
        }
    }
}

fn layout(d: &mut Drain, l: &Proxy<'_>) -> Layout {
    Layout { x: d.uint64(&l.m("X")), y: d.uint64(&l.m("Y")), width: d.uint64(&l.m("Width")), height: d.uint64(&l.m("Height")) }
}

#[async_trait::async_trait]
impl Resource for Dashboard {
    async fn create(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let dash = dashboard(&ids, &ctx.properties())?;
        let created = ctx.api.create_dashboard(ctx.inv, &dash).await?;
        let id = created.id.ok_or(ResourceError::MissingId("dashboard"))?;
        Ok((ids.build(IdKind::Dashboard, &[&id]), Outputs::new()))
    }

    async fn update_in_place(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let dash = dashboard(&ids, &ctx.properties())?;
        let dashboard_id = ids.parse_dashboard(ctx.physical_id())?;
        ctx.api.update_dashboard(ctx.inv, &dashboard_id, &dash).await?;
        Ok(ctx.echo())
    }

    async fn delete(&self, ctx: &Ctx<'_>) -> Result<Outcome> {
        let ids = ctx.ids().await?;
        let Some(dashboard_id) = ctx.owned(ids.parse_dashboard(ctx.physical_id())) else { return Ok(ctx.echo()) };
        ctx.ignore_missing(ctx.api.delete_dashboard(ctx.inv, &dashboard_id).await)?;
        Ok(ctx.echo())
    }
}
