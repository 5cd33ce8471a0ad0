//! Binary entry point for the annoscope CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Which @Action applies to this method, through overrides and interfaces?
//! annoscope --manifest app.json method 'web.Orders#execute()' --kind web.Action
//!
//! # Type-level lookup with package and superclass fallback
//! annoscope --manifest app.json type web.Orders --kind web.Secured
//!
//! # Methods carrying any of the given kinds across the ancestry
//! annoscope --manifest app.json annotated-methods web.Orders --kind web.Action
//!
//! # Accessor name inference (no manifest needed)
//! annoscope property-name setItem --params 1
//! ```
//!
//! Every command writes one JSON document to stdout, including failures.
//! Logs go to stderr.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use annoscope::cli::{
    load_resolver, run_annotated_declared_methods, run_annotated_fields, run_annotated_methods,
    run_interfaces, run_property_name, run_resolve_element, run_resolve_method, run_resolve_type,
};
use annoscope::error::{AnnoError, OutputErrorCode};
use annoscope::output::{emit_response, ErrorResponse};
use annoscope::resolver::AnnotationResolver;

// ============================================================================
// CLI Structure
// ============================================================================

/// Annotation resolution over type hierarchies.
#[derive(Parser, Debug)]
#[command(
    name = "annoscope",
    version,
    about = "Resolve annotations through type hierarchies"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Hierarchy manifest (JSON) to resolve against.
    #[arg(long, global = true, env = "ANNOSCOPE_MANIFEST")]
    manifest: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log line format on stderr.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve an annotation on a method, following overridden and implemented methods.
    Method {
        /// Method reference, e.g. `web.Orders#execute()`.
        method: String,
        /// Annotation type name.
        #[arg(long)]
        kind: String,
    },
    /// Resolve an annotation on a type, falling back to its package and superclasses.
    Type {
        /// Type name.
        name: String,
        /// Annotation type name.
        #[arg(long)]
        kind: String,
    },
    /// Resolve an annotation directly on any element (one meta-annotation level).
    Element {
        /// Element reference: `Type`, `Type#method(..)`, `Type#field` or `package:name`.
        element: String,
        /// Annotation type name.
        #[arg(long)]
        kind: String,
    },
    /// List methods carrying any of the given kinds across the type's ancestry.
    AnnotatedMethods {
        /// Type name.
        name: String,
        /// Annotation type names; omit to match any annotation.
        #[arg(long = "kind")]
        kinds: Vec<String>,
    },
    /// List fields declared with an annotation along the superclass chain.
    Fields {
        name: String,
        #[arg(long)]
        kind: String,
    },
    /// List methods declared with an annotation along the superclass chain.
    Methods {
        name: String,
        #[arg(long)]
        kind: String,
    },
    /// List interfaces implemented along the superclass chain.
    Interfaces { name: String },
    /// Infer the property name of an accessor method.
    PropertyName {
        /// Method name, e.g. `setItem`.
        method: String,
        /// Number of parameters the method takes.
        #[arg(long, default_value_t = 0)]
        params: usize,
    },
}

// ============================================================================
// Main
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON like every other response
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), AnnoError> {
    let global = cli.global;
    match cli.command {
        Command::Method { method, kind } => {
            let resolver = open_resolver(&global)?;
            emit(&run_resolve_method(&resolver, &method, &kind)?)
        }
        Command::Type { name, kind } => {
            let resolver = open_resolver(&global)?;
            emit(&run_resolve_type(&resolver, &name, &kind)?)
        }
        Command::Element { element, kind } => {
            let resolver = open_resolver(&global)?;
            emit(&run_resolve_element(&resolver, &element, &kind)?)
        }
        Command::AnnotatedMethods { name, kinds } => {
            let resolver = open_resolver(&global)?;
            emit(&run_annotated_methods(&resolver, &name, &kinds)?)
        }
        Command::Fields { name, kind } => {
            let resolver = open_resolver(&global)?;
            emit(&run_annotated_fields(&resolver, &name, &kind)?)
        }
        Command::Methods { name, kind } => {
            let resolver = open_resolver(&global)?;
            emit(&run_annotated_declared_methods(&resolver, &name, &kind)?)
        }
        Command::Interfaces { name } => {
            let resolver = open_resolver(&global)?;
            emit(&run_interfaces(&resolver, &name)?)
        }
        Command::PropertyName { method, params } => emit(&run_property_name(&method, params)),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn open_resolver(global: &GlobalArgs) -> Result<AnnotationResolver, AnnoError> {
    let manifest = global
        .manifest
        .as_deref()
        .ok_or_else(|| AnnoError::InvalidArguments {
            message: "--manifest is required for this command".to_string(),
        })?;
    load_resolver(manifest)
}

fn emit<T: Serialize>(response: &T) -> Result<(), AnnoError> {
    emit_response(response, &mut io::stdout()).map_err(|e| AnnoError::InternalError {
        message: e.to_string(),
    })?;
    let _ = io::stdout().flush();
    Ok(())
}
