//! Public logging API.
//!
//! A [`Logger`] offers three call shapes for each of INFO, WARN, ERROR and
//! FATAL:
//!
//! - positional, `info(&[&a, &b])`: values joined by single spaces
//! - templated, `infof("took {} ms", &[&ms])`: positional substitution
//! - structured, `infow("login", KeyValues::new().with("user", "ann"))`
//!
//! Every call captures its call site, builds a [`LogEvent`] and routes it
//! synchronously. The `fatal*` calls also flush all sinks and hand back a
//! [`Fatal`] signal; ending the process is left to the caller.

use std::fmt::{self, Display, Write as _};
use std::sync::Arc;

use crate::gate::Mode;
use crate::router::{Delivery, Router};
use crate::types::{Caller, KeyValues, LogEvent, Severity};

/// Exit status used by [`Fatal::exit`].
pub const FATAL_EXIT_CODE: u8 = 1;

/// Written in place of a template placeholder that has no argument.
pub const MISSING_ARGUMENT: &str = "%!(MISSING)";

/// Signal returned by the `fatal*` calls once the record has been flushed.
#[must_use = "a fatal record was logged; call `exit` or handle the signal explicitly"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fatal {
    delivery: Delivery,
    unsynced: usize,
}

impl Fatal {
    /// Returns how the fatal record was delivered.
    pub const fn delivery(&self) -> Delivery {
        self.delivery
    }

    /// Returns the number of sinks that could not be flushed.
    pub const fn unsynced(&self) -> usize {
        self.unsynced
    }

    /// Terminates the process with [`FATAL_EXIT_CODE`].
    pub fn exit(self) -> ! {
        std::process::exit(i32::from(FATAL_EXIT_CODE))
    }
}

impl Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fatal record delivered to {} sink(s), {} failed",
            self.delivery.delivered, self.delivery.failed
        )
    }
}

/// Cheaply clonable handle to an immutable router.
#[derive(Debug, Clone)]
pub struct Logger {
    router: Arc<Router>,
    mode: Mode,
}

macro_rules! level_methods {
    ($severity:expr, $plain:ident, $templated:ident, $structured:ident, $name:literal) => {
        #[doc = concat!("Logs at ", $name, " with positional arguments joined by spaces.")]
        #[track_caller]
        pub fn $plain(&self, args: &[&dyn Display]) -> Delivery {
            self.emit($severity, Caller::here(), join_args(args), KeyValues::new())
        }

        #[doc = concat!("Logs at ", $name, " with a template and positional arguments.")]
        #[track_caller]
        pub fn $templated(&self, template: &str, args: &[&dyn Display]) -> Delivery {
            self.emit($severity, Caller::here(), render_template(template, args), KeyValues::new())
        }

        #[doc = concat!("Logs at ", $name, " with structured fields.")]
        #[track_caller]
        pub fn $structured(&self, message: &str, fields: KeyValues) -> Delivery {
            self.emit($severity, Caller::here(), message.to_string(), fields)
        }
    };
}

impl Logger {
    /// Wraps a router built for `mode`.
    #[must_use]
    pub fn new(router: Router, mode: Mode) -> Self {
        Self {
            router: Arc::new(router),
            mode,
        }
    }

    /// Returns the routing mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Returns the underlying router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Returns true if some sink accepts `severity`.
    ///
    /// Lets callers skip building expensive messages that would be dropped.
    #[must_use]
    pub fn enabled(&self, severity: Severity) -> bool {
        self.router.accepts(severity)
    }

    level_methods!(Severity::Info, info, infof, infow, "INFO");
    level_methods!(Severity::Warn, warn, warnf, warnw, "WARN");
    level_methods!(Severity::Error, error, errorf, errorw, "ERROR");

    /// Logs at FATAL with positional arguments, then flushes every sink.
    #[track_caller]
    pub fn fatal(&self, args: &[&dyn Display]) -> Fatal {
        self.emit_fatal(Caller::here(), join_args(args), KeyValues::new())
    }

    /// Logs at FATAL with a template, then flushes every sink.
    #[track_caller]
    pub fn fatalf(&self, template: &str, args: &[&dyn Display]) -> Fatal {
        self.emit_fatal(Caller::here(), render_template(template, args), KeyValues::new())
    }

    /// Logs at FATAL with structured fields, then flushes every sink.
    #[track_caller]
    pub fn fatalw(&self, message: &str, fields: KeyValues) -> Fatal {
        self.emit_fatal(Caller::here(), message.to_string(), fields)
    }

    /// Logs a pre-rendered message at any severity.
    ///
    /// A `FATAL` record is flushed before returning, but no [`Fatal`] signal
    /// is produced; use the `fatal*` calls when the caller should terminate.
    #[track_caller]
    pub fn log(&self, severity: Severity, message: &str, fields: KeyValues) -> Delivery {
        let delivery = self.emit(severity, Caller::here(), message.to_string(), fields);
        if severity == Severity::Fatal {
            self.router.sync();
        }
        delivery
    }

    /// Flushes every sink, returning the number that failed.
    pub fn sync(&self) -> usize {
        self.router.sync()
    }

    fn emit(&self, severity: Severity, caller: Caller, message: String, fields: KeyValues) -> Delivery {
        if !self.router.accepts(severity) {
            return Delivery::default();
        }
        let event = LogEvent::new(severity, caller, message).with_fields(fields);
        self.router.route(&event)
    }

    fn emit_fatal(&self, caller: Caller, message: String, fields: KeyValues) -> Fatal {
        let delivery = self.emit(Severity::Fatal, caller, message, fields);
        let unsynced = self.router.sync();
        Fatal { delivery, unsynced }
    }
}

/// Joins positional arguments with single spaces.
///
/// Every adjacent pair is separated, strings included, so `["user", "ann", 42]`
/// renders as `user ann 42` rather than `userann42`. Arguments are only known
/// as `Display`, so the separator cannot depend on their types.
#[must_use]
pub fn join_args(args: &[&dyn Display]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{arg}");
    }
    out
}

/// Substitutes `args` into `template` in order.
///
/// Placeholders are `{}` and the verbs `%v`, `%s`, `%d`; `%q` writes the
/// argument as a quoted string. `{{`, `}}` and `%%` are escapes. A
/// placeholder without an argument becomes [`MISSING_ARGUMENT`]; unused
/// arguments are appended as `%!(EXTRA a, b)`.
#[must_use]
pub fn render_template(template: &str, args: &[&dyn Display]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args_iter = args.iter();
    let mut chars = template.chars().peekable();

    let mut substitute = |out: &mut String, quoted: bool| match args_iter.next() {
        Some(arg) if quoted => {
            let _ = write!(out, "{:?}", arg.to_string());
        }
        Some(arg) => {
            let _ = write!(out, "{arg}");
        }
        None => out.push_str(MISSING_ARGUMENT),
    };

    while let Some(c) = chars.next() {
        match (c, chars.peek().copied()) {
            ('{', Some('{')) | ('}', Some('}')) | ('%', Some('%')) => {
                chars.next();
                out.push(c);
            }
            ('{', Some('}')) => {
                chars.next();
                substitute(&mut out, false);
            }
            ('%', Some('v' | 's' | 'd')) => {
                chars.next();
                substitute(&mut out, false);
            }
            ('%', Some('q')) => {
                chars.next();
                substitute(&mut out, true);
            }
            _ => out.push(c),
        }
    }

    let extra: Vec<String> = args_iter.map(ToString::to_string).collect();
    if !extra.is_empty() {
        let _ = write!(out, "%!(EXTRA {})", extra.join(", "));
    }
    out
}
