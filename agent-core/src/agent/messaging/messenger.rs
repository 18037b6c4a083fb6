use rst_common::with_tracing::tracing::{info, warn};

use crate::agent::services::crypto::CryptoBuilder;
use crate::agent::types::AgentError;

use super::envelope::EnvelopeCodec;
use super::types::{AgentEndpoint, AgentMessage, DispatcherBuilder};

/// `Messenger` packs an outbound protocol message and dispatches it to a declared endpoint
///
/// Any failure, while packing or while dispatching, is reported as
/// [`AgentError::MessageTransmissionFailure`] so the caller is able to run its compensating action
#[derive(Clone)]
pub struct Messenger<TCrypto, TDispatcher>
where
    TCrypto: CryptoBuilder,
    TDispatcher: DispatcherBuilder,
{
    codec: EnvelopeCodec<TCrypto>,
    dispatcher: TDispatcher,
}

impl<TCrypto, TDispatcher> Messenger<TCrypto, TDispatcher>
where
    TCrypto: CryptoBuilder,
    TDispatcher: DispatcherBuilder,
{
    pub fn new(crypto: TCrypto, dispatcher: TDispatcher) -> Self {
        Self {
            codec: EnvelopeCodec::new(crypto),
            dispatcher,
        }
    }

    pub fn codec(&self) -> EnvelopeCodec<TCrypto> {
        self.codec.clone()
    }

    pub async fn send<T: AgentMessage>(
        &self,
        message: &T,
        sender_key: Option<String>,
        recipient_key: String,
        endpoint: &AgentEndpoint,
    ) -> Result<(), AgentError> {
        let payload = self
            .codec
            .pack(message, sender_key, recipient_key, endpoint.get_verkey())
            .await
            .map_err(|err| err.into_transmission_failure())?;

        self.dispatcher
            .dispatch(endpoint.get_uri(), payload)
            .await
            .map_err(|err| {
                warn!(uri = %endpoint.get_uri(), error = %err, "dispatch failed");
                err.into_transmission_failure()
            })?;

        info!(kind = ?T::KIND, uri = %endpoint.get_uri(), "message dispatched");
        Ok(())
    }
}
