//! Subcommand handlers. Each returns the text to print on stdout.

use crate::config::ToolwireConfig;
use serde_json::Value;
use tw_core::{ToolCallAdapter, ToolChoicePolicy, VendorId, VendorToolResponseFragment};

pub fn vendors(adapter: &ToolCallAdapter) -> anyhow::Result<String> {
    let mut lines = Vec::new();
    for id in adapter.vendors() {
        let profile = adapter.profile(id)?;
        let strictness = if profile.strict_descriptions {
            "strict"
        } else {
            "loose"
        };
        lines.push(format!("{id}\t{strictness}"));
    }
    Ok(lines.join("\n"))
}

#[tracing::instrument(level = "info", skip_all, fields(vendor = %vendor))]
pub fn encode(
    cfg: &ToolwireConfig,
    adapter: &ToolCallAdapter,
    vendor: &VendorId,
    choice: &ToolChoicePolicy,
) -> anyhow::Result<String> {
    let fragment = adapter
        .encode_request(&cfg.tools, choice, vendor)
        .map_err(|e| anyhow::anyhow!("encode for {vendor}: {e}"))?;
    tracing::info!(tool_count = cfg.tools.len(), "tools encoded");
    Ok(serde_json::to_string_pretty(&fragment)?)
}

/// `input` is either the call array or, with `body`, a complete response body.
#[tracing::instrument(level = "info", skip_all, fields(vendor = %vendor, body = body))]
pub fn decode(
    adapter: &ToolCallAdapter,
    vendor: &VendorId,
    input: &str,
    body: bool,
) -> anyhow::Result<String> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| anyhow::anyhow!("input is not valid JSON: {e}"))?;
    let raw = if body {
        adapter.extract_response_fragment(&value, vendor)?
    } else {
        VendorToolResponseFragment::from_value(value)?
    };
    let invocations = adapter
        .decode_response(&raw, vendor)
        .map_err(|e| anyhow::anyhow!("decode for {vendor}: {e}"))?;
    tracing::info!(invocation_count = invocations.len(), "tool calls decoded");
    Ok(serde_json::to_string_pretty(&invocations)?)
}

/// Checks every configured tool against one vendor, or all registered
/// vendors when `vendor` is `None`. Fails if any check fails.
#[tracing::instrument(level = "info", skip_all)]
pub fn validate(
    cfg: &ToolwireConfig,
    adapter: &ToolCallAdapter,
    vendor: Option<&VendorId>,
) -> anyhow::Result<String> {
    let targets: Vec<&VendorId> = match vendor {
        Some(v) => {
            adapter.profile(v)?;
            vec![v]
        }
        None => adapter.vendors(),
    };

    let mut lines = Vec::new();
    let mut failures = 0usize;
    for target in targets {
        for tool in &cfg.tools {
            match adapter.validate_spec(tool, target) {
                Ok(()) => lines.push(format!("ok\t{target}\t{}", tool.name)),
                Err(e) => {
                    failures += 1;
                    tracing::warn!(vendor = %target, tool = %tool.name, error = %e, "tool rejected");
                    lines.push(format!("fail\t{target}\t{}\t{e}", tool.name));
                }
            }
        }
    }

    let report = lines.join("\n");
    if failures > 0 {
        return Err(anyhow::anyhow!("{failures} tool check(s) failed\n{report}"));
    }
    Ok(report)
}
