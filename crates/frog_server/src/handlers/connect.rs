use super::RequestHandler;
use crate::{error::HandlerError, world::WorldEvent};
use frog_systems::EventRouter;
use frog_types::{ConnectRequest, ConnectResult, Request, RequestKind};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// Authenticates an account and issues a fresh session token.
///
/// Any non-empty account name is accepted.
pub struct ConnectHandler {
    events: EventRouter<WorldEvent>,
}

impl ConnectHandler {
    pub fn new(events: EventRouter<WorldEvent>) -> Self {
        Self { events }
    }
}

impl RequestHandler for ConnectHandler {
    fn name(&self) -> &'static str {
        "connect"
    }

    fn kind(&self) -> RequestKind {
        RequestKind::Connect
    }

    fn handle(&self, request: &Request) -> Result<Value, HandlerError> {
        let ConnectRequest { account, .. } = request.args_as()?;
        let account = account.trim();
        if account.is_empty() {
            return Err(HandlerError::Rejected("account name must not be empty".to_string()));
        }

        let token = Uuid::new_v4().to_string();
        info!("👤 Account '{}' connected", account);
        self.events.route(WorldEvent::PlayerConnected {
            account: account.to_string(),
        });

        Ok(serde_json::to_value(ConnectResult::accepted(token))?)
    }
}
