use serde::Deserialize;
use tracing::Subscriber;
use tracing_subscriber::{fmt, registry::LookupSpan, Layer};

/// Basic tracing configuration
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Pretty print
    Pretty,
    /// JSON
    Json,
    /// Compact
    Compact,
    /// Default style
    #[serde(other)]
    #[default]
    Full,
}

/// Build the stdout layer for the configured style.
pub(crate) fn layer<S>(style: Style) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match style {
        Style::Pretty => fmt::layer().pretty().boxed(),
        Style::Json => fmt::layer().json().boxed(),
        Style::Compact => fmt::layer().compact().boxed(),
        Style::Full => fmt::layer().boxed(),
    }
}
