use crate::error::{AdapterError, Result};
use crate::request;
use crate::response;
use crate::types::{
    ToolChoicePolicy, ToolInvocation, ToolOutcome, ToolSpec, VendorToolRequestFragment,
    VendorToolResponseFragment,
};
use crate::vendor::{VendorId, VendorProfile};
use serde_json::Value;
use std::collections::HashMap;

/// Translates between canonical tool types and vendor wire JSON.
///
/// Holds only the vendor table, which is read-only after setup, so one
/// adapter can be shared across threads.
#[derive(Debug, Clone)]
pub struct ToolCallAdapter {
    vendors: HashMap<VendorId, VendorProfile>,
}

impl Default for ToolCallAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCallAdapter {
    /// Adapter with every built-in vendor registered.
    pub fn new() -> Self {
        let mut adapter = Self::empty();
        for profile in VendorProfile::builtin() {
            adapter.register(profile);
        }
        adapter
    }

    pub fn empty() -> Self {
        Self {
            vendors: HashMap::new(),
        }
    }

    /// Returns the profile previously registered under the same id, if any.
    pub fn register(&mut self, profile: VendorProfile) -> Option<VendorProfile> {
        self.vendors.insert(profile.id.clone(), profile)
    }

    /// Register `id` with the wire shape of the already registered `base`.
    pub fn alias(&mut self, id: VendorId, base: &VendorId) -> Result<&VendorProfile> {
        let profile = self.profile(base)?.aliased(id.clone());
        self.vendors.insert(id.clone(), profile);
        self.profile(&id)
    }

    pub fn profile(&self, vendor: &VendorId) -> Result<&VendorProfile> {
        self.vendors
            .get(vendor)
            .ok_or_else(|| AdapterError::UnsupportedVendor(vendor.to_string()))
    }

    pub fn vendors(&self) -> Vec<&VendorId> {
        let mut ids: Vec<_> = self.vendors.keys().collect();
        ids.sort();
        ids
    }

    #[tracing::instrument(level = "debug", skip_all, fields(vendor = %vendor))]
    pub fn encode_request(
        &self,
        tools: &[ToolSpec],
        choice: &ToolChoicePolicy,
        vendor: &VendorId,
    ) -> Result<VendorToolRequestFragment> {
        let profile = self.profile(vendor)?;
        let fragment = request::encode_request(tools, choice, profile)?;
        tracing::debug!(tool_count = tools.len(), ?choice, "encoded tool request");
        Ok(fragment)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(vendor = %vendor))]
    pub fn decode_request(
        &self,
        fragment: &VendorToolRequestFragment,
        vendor: &VendorId,
    ) -> Result<(Vec<ToolSpec>, ToolChoicePolicy)> {
        let profile = self.profile(vendor)?;
        request::decode_request(fragment, profile)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(vendor = %vendor))]
    pub fn decode_response(
        &self,
        raw: &VendorToolResponseFragment,
        vendor: &VendorId,
    ) -> Result<Vec<ToolInvocation>> {
        let profile = self.profile(vendor)?;
        let invocations = response::decode_response(raw, profile)?;
        tracing::debug!(
            entry_count = raw.len(),
            invocation_count = invocations.len(),
            "decoded tool response"
        );
        Ok(invocations)
    }

    /// Locate the call array inside a complete response body.
    pub fn extract_response_fragment(
        &self,
        body: &Value,
        vendor: &VendorId,
    ) -> Result<VendorToolResponseFragment> {
        let profile = self.profile(vendor)?;
        response::extract_response_fragment(body, profile)
    }

    /// [`Self::extract_response_fragment`] followed by [`Self::decode_response`].
    pub fn decode_response_body(
        &self,
        body: &Value,
        vendor: &VendorId,
    ) -> Result<Vec<ToolInvocation>> {
        let raw = self.extract_response_fragment(body, vendor)?;
        self.decode_response(&raw, vendor)
    }

    /// Render invocations as the vendor's call array, for replaying an
    /// assistant turn in conversation history.
    pub fn encode_invocations(
        &self,
        invocations: &[ToolInvocation],
        vendor: &VendorId,
    ) -> Result<Value> {
        let profile = self.profile(vendor)?;
        response::encode_invocations(invocations, profile)
    }

    /// Render tool results as the vendor's follow-up messages.
    pub fn encode_tool_results(
        &self,
        outcomes: &[ToolOutcome],
        vendor: &VendorId,
    ) -> Result<Value> {
        let profile = self.profile(vendor)?;
        response::encode_tool_results(outcomes, profile)
    }

    pub fn validate_spec(&self, tool: &ToolSpec, vendor: &VendorId) -> Result<()> {
        let profile = self.profile(vendor)?;
        request::validate_spec(tool, profile)
    }

    /// Check a tool name against every registered vendor.
    pub fn validate_tool_name(&self, name: &str) -> Result<()> {
        for profile in self.vendors.values() {
            request::check_tool_name(name, profile.max_tool_name_len)?;
        }
        Ok(())
    }
}

/// Check a tool name against the naming rules of every built-in vendor.
pub fn validate_tool_name_all_providers(name: &str) -> Result<()> {
    let max_len = VendorProfile::builtin()
        .iter()
        .map(|p| p.max_tool_name_len)
        .min()
        .unwrap_or(64);
    request::check_tool_name(name, max_len)
}
