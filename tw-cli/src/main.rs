//! toolwire binary: inspect tool-call translation offline.

mod commands;
mod config;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tw_core::{ToolChoicePolicy, VendorId};

use crate::config::ToolwireConfig;

#[derive(Debug, Parser)]
#[command(
    name = "toolwire",
    version,
    about = "Translate LLM tool declarations and tool calls between vendors"
)]
struct Cli {
    /// Config file (default: ~/.toolwire/config.toml).
    #[arg(long, global = true, env = "TOOLWIRE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List registered vendors.
    Vendors,
    /// Encode the configured tools into a vendor request fragment.
    Encode {
        #[arg(long)]
        vendor: Option<String>,
        #[arg(long, value_enum, default_value_t = ChoiceArg::Auto, conflicts_with = "force")]
        choice: ChoiceArg,
        /// Name of a tool the model must call.
        #[arg(long, value_name = "TOOL")]
        force: Option<String>,
    },
    /// Decode vendor tool calls from a file, or `-` for stdin.
    Decode {
        #[arg(long)]
        vendor: Option<String>,
        /// Input is a complete response body rather than the call array.
        #[arg(long)]
        body: bool,
        input: PathBuf,
    },
    /// Validate the configured tools for one vendor, or all of them.
    Validate {
        #[arg(long)]
        vendor: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ChoiceArg {
    Auto,
    None,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Vendors => "vendors",
            Command::Encode { .. } => "encode",
            Command::Decode { .. } => "decode",
            Command::Validate { .. } => "validate",
        }
    }
}

fn choice_policy(choice: ChoiceArg, force: Option<String>) -> ToolChoicePolicy {
    match (force, choice) {
        (Some(tool), _) => ToolChoicePolicy::Forced(tool),
        (None, ChoiceArg::Auto) => ToolChoicePolicy::Auto,
        (None, ChoiceArg::None) => ToolChoicePolicy::None,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();
    install_panic_hook(cli.command.name());

    let cfg = ToolwireConfig::load(cli.config).await?;
    let adapter = cfg.build_adapter()?;
    let pick_vendor = |v: Option<String>| {
        v.map(VendorId::new)
            .unwrap_or_else(|| cfg.default_vendor())
    };

    let output = match cli.command {
        Command::Vendors => commands::vendors(&adapter)?,
        Command::Encode {
            vendor,
            choice,
            force,
        } => {
            let vendor = pick_vendor(vendor);
            let choice = choice_policy(choice, force);
            commands::encode(&cfg, &adapter, &vendor, &choice)?
        }
        Command::Decode {
            vendor,
            body,
            input,
        } => {
            let vendor = pick_vendor(vendor);
            let text = read_input(&input).await?;
            commands::decode(&adapter, &vendor, &text, body)?
        }
        Command::Validate { vendor } => {
            let vendor = vendor.map(VendorId::new);
            commands::validate(&cfg, &adapter, vendor.as_ref())?
        }
    };

    println!("{output}");
    Ok(())
}

async fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .map_err(|e| anyhow::anyhow!("read stdin: {e}"))?;
        return Ok(text);
    }
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| anyhow::anyhow!("read input {}: {e}", path.display()))
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(v) => v,
        Err(_) => EnvFilter::new("info,toolwire=debug,tw_cli=debug,tw_core=debug"),
    };
    let log_format = std::env::var("TOOLWIRE_LOG_FORMAT")
        .unwrap_or_else(|_| "json".to_string())
        .to_ascii_lowercase();

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(true)
                .init();
        }
        "pretty" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_span_events(FmtSpan::CLOSE)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .pretty()
                .init();
        }
        "compact" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact()
                .init();
        }
        other => {
            return Err(anyhow::anyhow!(
                "unsupported TOOLWIRE_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
            ));
        }
    }

    tracing::debug!(
        log_format = %log_format,
        env_filter = ?std::env::var("RUST_LOG").ok(),
        "tracing initialized"
    );
    Ok(())
}

/// Reports panics as one structured event before the default hook prints them.
fn install_panic_hook(command: &'static str) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info.location().map_or_else(
            || "unknown".to_string(),
            |l| format!("{}:{}:{}", l.file(), l.line(), l.column()),
        );
        tracing::error!(
            command,
            location = %location,
            message = panic_message(info.payload()),
            "toolwire panicked"
        );
        previous(info);
    }));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string payload>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_decode_with_global_config() {
        let cli = Cli::try_parse_from([
            "toolwire",
            "decode",
            "--vendor",
            "mistral",
            "--body",
            "response.json",
            "--config",
            "/tmp/toolwire.toml",
        ])
        .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/toolwire.toml")));
        match cli.command {
            Command::Decode {
                vendor,
                body,
                input,
            } => {
                assert_eq!(vendor.as_deref(), Some("mistral"));
                assert!(body);
                assert_eq!(input, PathBuf::from("response.json"));
            }
            other => panic!("expected decode, got {other:?}"),
        }
    }

    #[test]
    fn panic_messages_read_str_and_string_payloads() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(format!("bad {}", 7));
        assert_eq!(panic_message(payload.as_ref()), "bad 7");
        let payload: Box<dyn std::any::Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "<non-string payload>");
    }

    fn parse_encode(args: &[&str]) -> ToolChoicePolicy {
        let cli = Cli::try_parse_from(args).expect("parse");
        match cli.command {
            Command::Encode { choice, force, .. } => choice_policy(choice, force),
            other => panic!("expected encode, got {other:?}"),
        }
    }

    #[test]
    fn encode_choice_defaults_to_auto() {
        assert_eq!(parse_encode(&["toolwire", "encode"]), ToolChoicePolicy::Auto);
        assert_eq!(
            parse_encode(&["toolwire", "encode", "--choice", "none"]),
            ToolChoicePolicy::None
        );
    }

    #[test]
    fn force_accepts_tools_named_like_policies() {
        assert_eq!(
            parse_encode(&["toolwire", "encode", "--force", "none"]),
            ToolChoicePolicy::Forced("none".to_string())
        );
        assert_eq!(
            parse_encode(&["toolwire", "encode", "--force", "auto"]),
            ToolChoicePolicy::Forced("auto".to_string())
        );
    }

    #[test]
    fn choice_and_force_conflict() {
        let args = ["toolwire", "encode", "--choice", "none", "--force", "lookup"];
        let err = Cli::try_parse_from(args).expect_err("conflicting flags");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn choice_rejects_tool_names() {
        assert!(Cli::try_parse_from(["toolwire", "encode", "--choice", "lookup"]).is_err());
    }
}
