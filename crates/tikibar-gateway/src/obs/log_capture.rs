//! `tracing` layer that copies log events into the current request's toolbar.

use std::fmt::Write;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::toolbar::current_toolbar;

/// Install next to the usual fmt layer:
///
/// ```ignore
/// tracing_subscriber::registry()
///     .with(fmt::layer())
///     .with(LogCaptureLayer::default())
///     .init();
/// ```
///
/// Events from the toolbar's own crates are skipped so that recording a log
/// line can never re-enter the toolbar while it is being written.
#[derive(Debug, Clone, Default)]
pub struct LogCaptureLayer;

impl<S> Layer<S> for LogCaptureLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if is_own_target(meta.target()) {
            return;
        }

        let toolbar = current_toolbar();
        if !toolbar.is_active() {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        toolbar.try_add_logline(meta.level().as_str(), visitor.finish());
    }
}

fn is_own_target(target: &str) -> bool {
    ["tikibar_core", "tikibar_gateway"]
        .iter()
        .any(|own| target == *own || target.starts_with(&format!("{own}::")))
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
