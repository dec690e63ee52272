//! Diagnostic output.
//!
//! Events are written to stderr as single lines starting with [`LOG_TAG`],
//! and only while `ANYLINUX_LIB_DEBUG=1`. The variable is checked on every
//! event so the host can toggle it at run time.

use std::fmt;

use anylinux_env::{ProcessEnv, debug_enabled};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::dynamic_filter_fn;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::{FmtContext, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

/// Prefix of every diagnostic line.
pub const LOG_TAG: &str = " [anylinux.so] >> ";

/// `<tag><message> <fields>`; no timestamp, level or target.
pub struct TaggedFormat;

impl<S, N> FormatEvent<S, N> for TaggedFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(writer, "{LOG_TAG}")?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Build the tagged, debug-gated layer writing to `make_writer`.
pub fn tagged_layer<S, W>(make_writer: W) -> impl Layer<S> + Send + Sync
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .with_writer(make_writer)
        .with_ansi(false)
        .event_format(TaggedFormat)
        // Per-event filter: a callsite's interest is never cached, so the
        // flag can be flipped in either direction while the host runs.
        .with_filter(dynamic_filter_fn(|_, _| debug_enabled(&ProcessEnv)))
}

/// Install the stderr subscriber for this library.
pub fn init() {
    // An error only means a dispatcher is already installed.
    let _ = tracing_subscriber::registry()
        .with(tagged_layer(std::io::stderr))
        .try_init();
}
