use std::sync::Arc;

use rst_common::with_http_tokio::axum::body::Bytes;
use rst_common::with_http_tokio::axum::extract::State;
use rst_common::with_http_tokio::axum::http::StatusCode;
use rst_common::with_tracing::tracing::{debug, warn};

use prople_agent_core::agent::inbound::InboundAPI;
use prople_agent_core::agent::types::AgentError;

/// `InboundState` is the shared state of the inbound route
#[derive(Clone)]
pub struct InboundState {
    inbound: Arc<dyn InboundAPI>,
}

impl InboundState {
    pub fn new(inbound: Arc<dyn InboundAPI>) -> Self {
        Self { inbound }
    }
}

/// `status_for` maps a failed inbound message to the answer given to the sending agent
pub fn status_for(err: &AgentError) -> StatusCode {
    match err {
        AgentError::InvalidMessage(_) => StatusCode::BAD_REQUEST,
        AgentError::RecordNotFound(_) => StatusCode::NOT_FOUND,
        AgentError::RecordInInvalidState(_) | AgentError::AmbiguousCorrelation(_) => {
            StatusCode::CONFLICT
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn receive(State(state): State<InboundState>, body: Bytes) -> StatusCode {
    debug!(size = body.len(), "inbound payload");

    match state.inbound.receive(body.to_vec()).await {
        Ok(_) => StatusCode::ACCEPTED,
        Err(err) => {
            let status = status_for(&err);
            warn!(code = ?err.code(), status = %status, "inbound payload refused");
            status
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mockall::mock;
    use rst_common::standard::async_trait::async_trait;
    use rst_common::with_tokio::tokio;
    use table_test::table_test;

    use prople_agent_core::agent::connection::ConnectionRecord;
    use prople_agent_core::agent::inbound::InboundOutcome;
    use prople_agent_core::agent::store::types::Tags;

    mock!(
        FakeInbound{}

        #[async_trait]
        impl InboundAPI for FakeInbound {
            async fn receive(&self, payload: Vec<u8>) -> Result<InboundOutcome, AgentError>;
        }
    );

    #[test]
    fn test_status_for() {
        let table = vec![
            (
                AgentError::InvalidMessage("bad".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AgentError::RecordNotFound("missing".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                AgentError::RecordInInvalidState("replayed".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                AgentError::AmbiguousCorrelation("twice".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                AgentError::CryptoError("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AgentError::StoreError("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (validator, input, expected) in table_test!(table) {
            let actual = status_for(&input);

            validator
                .given(&format!("{:?}", input))
                .when("status_for")
                .then(&format!("{}", expected))
                .assert_eq(expected, actual);
        }
    }

    #[tokio::test]
    async fn test_receive_accepted() {
        let mut inbound = MockFakeInbound::new();
        inbound
            .expect_receive()
            .withf(|payload| payload == b"sealed")
            .times(1)
            .returning(|_| {
                Ok(InboundOutcome::Connection(ConnectionRecord::new(
                    None,
                    Tags::new(),
                )))
            });

        let state = InboundState::new(Arc::new(inbound));
        let status = receive(State(state), Bytes::from_static(b"sealed")).await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_receive_replayed() {
        let mut inbound = MockFakeInbound::new();
        inbound
            .expect_receive()
            .times(1)
            .returning(|_| Err(AgentError::RecordInInvalidState("already accepted".to_string())));

        let state = InboundState::new(Arc::new(inbound));
        let status = receive(State(state), Bytes::from_static(b"sealed")).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }
}
