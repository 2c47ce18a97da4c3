//! Prometheus query tools

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use super::args::{Arguments, extract_options};
use super::error::CallResult;
use super::pipeline::Pipeline;
use super::registry::{ParamKind, ParamSpec, RegisteredTool, ToolDescriptor, ToolHandler};
use crate::backend::{
    ExemplarQuery, InstantQuery, METRIC_NAME_LABEL, PrometheusApi, Range, RangeQuery, SeriesQuery,
};

const QUERY: ParamSpec = ParamSpec::required(
    "query",
    ParamKind::String,
    "Prometheus expression query string",
);
const START: ParamSpec =
    ParamSpec::required("start", ParamKind::String, "Start timestamp (RFC-3339)");
const END: ParamSpec = ParamSpec::required("end", ParamKind::String, "End timestamp (RFC-3339)");
const TIMEOUT: ParamSpec = ParamSpec::optional("timeout", ParamKind::String, "Evaluation timeout");
const LIMIT: ParamSpec = ParamSpec::optional(
    "limit",
    ParamKind::Number,
    "Maximum number of returned series",
);

/// The Prometheus query tools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryTool {
    /// `alertmanagers`
    AlertManagers,
    /// `alerts`
    Alerts,
    /// `exemplars`
    Exemplars,
    /// `metrics`
    Metrics,
    /// `query`
    Query,
    /// `query_range`
    QueryRange,
    /// `rules`
    Rules,
    /// `series`
    Series,
    /// `status_tsdb`
    StatusTsdb,
    /// `targets`
    Targets,
}

impl QueryTool {
    /// Every query tool, in advertised order
    pub const ALL: [Self; 10] = [
        Self::AlertManagers,
        Self::Alerts,
        Self::Exemplars,
        Self::Metrics,
        Self::Query,
        Self::QueryRange,
        Self::Rules,
        Self::Series,
        Self::StatusTsdb,
        Self::Targets,
    ];

    /// Advertised tool name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AlertManagers => "alertmanagers",
            Self::Alerts => "alerts",
            Self::Exemplars => "exemplars",
            Self::Metrics => "metrics",
            Self::Query => "query",
            Self::QueryRange => "query_range",
            Self::Rules => "rules",
            Self::Series => "series",
            Self::StatusTsdb => "status_tsdb",
            Self::Targets => "targets",
        }
    }

    /// Advertised descriptor
    #[must_use]
    pub fn descriptor(self) -> ToolDescriptor {
        let name = self.name();
        match self {
            Self::AlertManagers => ToolDescriptor::new(name, "Prometheus Alertmanagers"),
            Self::Alerts => ToolDescriptor::new(name, "Prometheus Alerts"),
            Self::Exemplars => ToolDescriptor::new(name, "Prometheus Exemplars")
                .param(QUERY)
                .param(START)
                .param(END),
            Self::Metrics => ToolDescriptor::new(name, "Prometheus Metrics"),
            Self::Query => ToolDescriptor::new(name, "Prometheus Query")
                .param(QUERY)
                .param(ParamSpec::optional(
                    "time",
                    ParamKind::String,
                    "Evaluation timestamp (RFC-3339)",
                ))
                .param(TIMEOUT)
                .param(LIMIT),
            Self::QueryRange => ToolDescriptor::new(name, "Prometheus Query Range")
                .param(QUERY)
                .param(START)
                .param(END)
                .param(ParamSpec::required(
                    "step",
                    ParamKind::String,
                    "Query resolution step width in duration format",
                ))
                .param(TIMEOUT)
                .param(LIMIT),
            Self::Rules => ToolDescriptor::new(name, "Prometheus Rules"),
            Self::Series => ToolDescriptor::new(name, "Prometheus Series")
                .param(ParamSpec::required(
                    "match[]",
                    ParamKind::StringArray,
                    "Repeated series selector argument that selects the series",
                ))
                .param(START)
                .param(END)
                .param(LIMIT),
            Self::StatusTsdb => ToolDescriptor::new(name, "Prometheus Status: TSDB"),
            Self::Targets => ToolDescriptor::new(name, "Prometheus Targets"),
        }
    }
}

/// Tools backed by the Prometheus HTTP API
#[derive(Clone)]
pub struct PrometheusTools {
    api: Arc<dyn PrometheusApi>,
    pipeline: Pipeline,
}

impl PrometheusTools {
    /// Create the tool set
    pub fn new(api: Arc<dyn PrometheusApi>, pipeline: Pipeline) -> Self {
        Self { api, pipeline }
    }

    /// Descriptors of every query tool, in advertised order
    #[must_use]
    pub fn descriptors() -> Vec<ToolDescriptor> {
        QueryTool::ALL.into_iter().map(QueryTool::descriptor).collect()
    }

    /// Bind every query tool to its handler
    pub fn registry(self: &Arc<Self>) -> Vec<RegisteredTool> {
        QueryTool::ALL
            .into_iter()
            .map(|tool| RegisteredTool::new(tool.descriptor(), self.handler(tool)))
            .collect()
    }

    fn handler(self: &Arc<Self>, tool: QueryTool) -> ToolHandler {
        let tools = Arc::clone(self);
        Arc::new(move |ctx: CancellationToken, args: Arguments| {
            let tools = Arc::clone(&tools);
            async move { tools.invoke(tool, &ctx, &args).await }.boxed()
        })
    }

    /// Run `tool` with `args`
    pub async fn invoke(
        &self,
        tool: QueryTool,
        ctx: &CancellationToken,
        args: &Arguments,
    ) -> CallResult {
        match tool {
            QueryTool::AlertManagers => self.alertmanagers(ctx, args).await,
            QueryTool::Alerts => self.alerts(ctx, args).await,
            QueryTool::Exemplars => self.exemplars(ctx, args).await,
            QueryTool::Metrics => self.metrics(ctx, args).await,
            QueryTool::Query => self.query(ctx, args).await,
            QueryTool::QueryRange => self.query_range(ctx, args).await,
            QueryTool::Rules => self.rules(ctx, args).await,
            QueryTool::Series => self.series(ctx, args).await,
            QueryTool::StatusTsdb => self.status_tsdb(ctx, args).await,
            QueryTool::Targets => self.targets(ctx, args).await,
        }
    }

    async fn no_params<F, Fut>(
        &self,
        tool: &str,
        ctx: &CancellationToken,
        args: &Arguments,
        call: F,
    ) -> CallResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = crate::Result<crate::backend::ApiResponse>>,
    {
        self.pipeline
            .run(tool, ctx, args, |_| Ok(()), |_| Ok(()), |(), ()| call())
            .await
    }

    /// List active and dropped Alertmanagers
    pub async fn alertmanagers(&self, ctx: &CancellationToken, args: &Arguments) -> CallResult {
        self.no_params(QueryTool::AlertManagers.name(), ctx, args, || self.api.alert_managers())
            .await
    }

    /// List active alerts
    pub async fn alerts(&self, ctx: &CancellationToken, args: &Arguments) -> CallResult {
        self.no_params(QueryTool::Alerts.name(), ctx, args, || self.api.alerts()).await
    }

    /// Exemplars for `query` between `start` and `end`
    pub async fn exemplars(&self, ctx: &CancellationToken, args: &Arguments) -> CallResult {
        self.pipeline
            .run(
                QueryTool::Exemplars.name(),
                ctx,
                args,
                |args| {
                    Ok(ExemplarQuery {
                        query: args.required_str("query")?,
                        start: args.required_timestamp("start")?,
                        end: args.required_timestamp("end")?,
                    })
                },
                |_| Ok(()),
                |query, ()| self.api.query_exemplars(query),
            )
            .await
    }

    /// Every metric name known to Prometheus
    pub async fn metrics(&self, ctx: &CancellationToken, args: &Arguments) -> CallResult {
        self.no_params(QueryTool::Metrics.name(), ctx, args, || {
            self.api.label_values(METRIC_NAME_LABEL)
        })
        .await
    }

    /// Instant query
    pub async fn query(&self, ctx: &CancellationToken, args: &Arguments) -> CallResult {
        self.pipeline
            .run(
                QueryTool::Query.name(),
                ctx,
                args,
                |args| args.required_str("query"),
                |args| Ok((args.optional_timestamp("time")?, extract_options(args)?)),
                |query, (time, options)| {
                    self.api.query(InstantQuery {
                        query,
                        time,
                        options,
                    })
                },
            )
            .await
    }

    /// Range query
    pub async fn query_range(&self, ctx: &CancellationToken, args: &Arguments) -> CallResult {
        self.pipeline
            .run(
                QueryTool::QueryRange.name(),
                ctx,
                args,
                |args| {
                    let query = args.required_str("query")?;
                    let range = Range {
                        start: args.required_timestamp("start")?,
                        end: args.required_timestamp("end")?,
                        step: args.required_duration("step")?,
                    };
                    Ok((query, range))
                },
                extract_options,
                |(query, range), options| {
                    self.api.query_range(RangeQuery {
                        query,
                        range,
                        options,
                    })
                },
            )
            .await
    }

    /// Alerting and recording rule groups
    pub async fn rules(&self, ctx: &CancellationToken, args: &Arguments) -> CallResult {
        self.no_params(QueryTool::Rules.name(), ctx, args, || self.api.rules()).await
    }

    /// Series matching the `match[]` selectors
    pub async fn series(&self, ctx: &CancellationToken, args: &Arguments) -> CallResult {
        self.pipeline
            .run(
                QueryTool::Series.name(),
                ctx,
                args,
                |args| {
                    Ok((
                        args.required_string_array("match[]")?,
                        args.required_timestamp("start")?,
                        args.required_timestamp("end")?,
                    ))
                },
                extract_options,
                |(matchers, start, end), options| {
                    self.api.series(SeriesQuery {
                        matchers,
                        start,
                        end,
                        options,
                    })
                },
            )
            .await
    }

    /// TSDB cardinality statistics
    pub async fn status_tsdb(&self, ctx: &CancellationToken, args: &Arguments) -> CallResult {
        self.no_params(QueryTool::StatusTsdb.name(), ctx, args, || self.api.tsdb()).await
    }

    /// Active and dropped scrape targets
    pub async fn targets(&self, ctx: &CancellationToken, args: &Arguments) -> CallResult {
        self.no_params(QueryTool::Targets.name(), ctx, args, || self.api.targets()).await
    }
}

impl std::fmt::Debug for PrometheusTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusTools")
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
