//! Provider data structure passed to resources and data sources

use crate::api::Client;
use crate::mutex_kv::MutexKv;
use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

#[derive(Clone)]
pub struct WavefrontProviderData {
    pub client: Client,
    pub mutex_kv: Arc<MutexKv>,
}

impl WavefrontProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            mutex_kv: Arc::new(MutexKv::new()),
        }
    }

    /// Extracts the provider data handed to a resource or data source.
    ///
    /// Absent data is not an error: Terraform validates configuration before
    /// the provider is configured.
    pub fn from_any(
        data: Option<Arc<dyn Any + Send + Sync>>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Self> {
        let data = data?;
        match data.downcast_ref::<WavefrontProviderData>() {
            Some(provider_data) => Some(provider_data.clone()),
            None => {
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract WavefrontProviderData from provider data",
                ));
                None
            }
        }
    }
}
