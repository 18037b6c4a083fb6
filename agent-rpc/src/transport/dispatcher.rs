use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tracing::tracing::{debug, warn};

use prople_agent_core::agent::messaging::types::DispatcherBuilder;
use prople_agent_core::agent::types::AgentError;

use crate::common::types::CommonError;
use crate::config::Transport;

/// `HttpDispatcher` posts packed wire payloads to a remote agent endpoint
///
/// Any response outside of the 2xx range counts as a failed transmission
#[derive(Clone)]
pub struct HttpDispatcher {
    client: Client,
    content_type: String,
}

impl HttpDispatcher {
    pub fn new(transport: &Transport) -> Result<Self, CommonError> {
        let client = Client::builder()
            .timeout(transport.get_timeout())
            .build()
            .map_err(|err| CommonError::TransportError(err.to_string()))?;

        Ok(Self {
            client,
            content_type: transport.get_content_type(),
        })
    }
}

#[async_trait]
impl DispatcherBuilder for HttpDispatcher {
    async fn dispatch(&self, uri: String, payload: Vec<u8>) -> Result<(), AgentError> {
        let url = Url::parse(&uri)
            .map_err(|err| AgentError::InvalidMessage(format!("endpoint {}: {}", uri, err)))?;

        debug!(uri = %uri, size = payload.len(), "dispatching message");

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, self.content_type.as_str())
            .body(payload)
            .send()
            .await
            .map_err(|err| {
                warn!(uri = %uri, error = %err, "dispatch failed");
                AgentError::MessageTransmissionFailure(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(uri = %uri, status = %status, "dispatch rejected");
            return Err(AgentError::MessageTransmissionFailure(format!(
                "{} responded with {}",
                uri, status
            )));
        }

        Ok(())
    }
}
