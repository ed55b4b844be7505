//! Per-connection request handling, independent of the transport

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::common::errors::{Result, TrackerError};
use crate::common::events::{ClientRequest, ServerEvent};
use crate::common::traits::{ListenerId, PriceSource};
use crate::common::types::{NewAlertRule, TokenSnapshot};
use crate::monitor::{
    AlertEvaluator, PriceCache, SharedListener, SniperAnalysis, SubscriptionRegistry,
};

const TOKEN_PATH_PREFIXES: [&str; 2] = ["/ws/token/", "/ws/chat/"];

/// What a connection subscribed to when it opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Every event
    Monitor,
    /// Every event plus the token's scoped events and chat
    Token(String),
}

impl Route {
    /// Route for a request path; unknown paths fall back to [`Route::Monitor`]
    pub fn from_path(path: &str) -> Self {
        let path = path.split('?').next().unwrap_or_default();
        TOKEN_PATH_PREFIXES
            .iter()
            .find_map(|prefix| path.strip_prefix(prefix))
            .map(|rest| rest.trim_end_matches('/'))
            .filter(|address| !address.is_empty() && !address.contains('/'))
            .map_or(Route::Monitor, |address| Route::Token(address.to_string()))
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Route::Monitor => None,
            Route::Token(address) => Some(address),
        }
    }
}

/// Shared state every session needs
#[derive(Clone)]
pub struct SessionContext {
    pub registry: Arc<SubscriptionRegistry>,
    pub cache: Arc<PriceCache>,
    pub evaluator: AlertEvaluator,
    /// Consulted by `analyze` when the token has no cached snapshot
    pub source: Arc<dyn PriceSource>,
    pub fetch_timeout: Duration,
}

/// One connected client
///
/// Registered on [`Session::open`], unregistered on [`Session::close`] or drop.
pub struct Session {
    listener: SharedListener,
    route: Route,
    context: SessionContext,
}

impl Session {
    pub fn open(listener: SharedListener, route: Route, context: SessionContext) -> Self {
        context.registry.add_global(listener.clone());
        if let Route::Token(address) = &route {
            context.registry.add_scoped(listener.clone(), address);
        }
        info!(listener = %listener.id(), route = ?route, "Client connected");

        Self {
            listener,
            route,
            context,
        }
    }

    pub fn id(&self) -> ListenerId {
        self.listener.id()
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Handle one inbound text frame and queue the replies
    pub async fn handle_text(&self, text: &str) {
        for reply in self.respond(text).await {
            let message = match reply.to_json() {
                Ok(message) => message,
                Err(e) => {
                    warn!(listener = %self.id(), "Failed to serialize reply: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.listener.send(&message) {
                debug!(listener = %self.id(), "Reply not delivered: {}", e);
                self.context.registry.remove(self.id());
                break;
            }
        }
    }

    /// Replies owed to this client for one inbound frame
    pub async fn respond(&self, text: &str) -> Vec<ServerEvent> {
        let request = match ClientRequest::parse(text) {
            Ok(request) => request,
            Err(e) => {
                debug!(listener = %self.id(), "Malformed request: {}", e);
                return vec![error_event(format!("malformed request: {}", e))];
            }
        };

        match request {
            ClientRequest::Subscribe { token } => self.subscribe(token),
            ClientRequest::CreateAlert {
                token_address,
                kind,
                threshold,
                message,
            } => {
                let rule = NewAlertRule {
                    token_address,
                    kind,
                    threshold,
                    message,
                };
                match self.context.evaluator.create_rule(rule).await {
                    Ok(rule) => {
                        self.context.registry.tracked().track(&rule.token_address);
                        vec![ServerEvent::AlertCreated(rule)]
                    }
                    Err(e) => vec![error_event(e.to_string())],
                }
            }
            ClientRequest::Chat { message } => self.chat(message),
            ClientRequest::Analyze { token } => match self.analyze(token.trim()).await {
                Ok(analysis) => vec![ServerEvent::Analysis(analysis)],
                Err(e) => vec![error_event(e.to_string())],
            },
        }
    }

    /// Analyze the cached snapshot, fetching one if the token is not cached
    async fn analyze(&self, token: &str) -> Result<SniperAnalysis> {
        if token.is_empty() {
            return Err(TrackerError::Validation("analyze requires a token".to_string()));
        }
        let snapshot = match self.context.cache.get(token) {
            Some(snapshot) => snapshot,
            None => self.fetch_fresh(token).await?,
        };
        Ok(SniperAnalysis::from_snapshot(&snapshot))
    }

    async fn fetch_fresh(&self, token: &str) -> Result<TokenSnapshot> {
        let fetched = timeout(
            self.context.fetch_timeout,
            self.context.source.fetch_snapshot(token),
        )
        .await??;
        fetched.ok_or_else(|| TrackerError::TokenUnavailable(token.to_string()))
    }

    fn subscribe(&self, token: String) -> Vec<ServerEvent> {
        let token = token.trim().to_string();
        if token.is_empty() {
            return vec![error_event("subscribe requires a token")];
        }

        self.context.registry.tracked().track(&token);
        let mut replies = vec![ServerEvent::Subscribed {
            token: token.clone(),
        }];
        if let Some(snapshot) = self.context.cache.get(&token) {
            replies.push(ServerEvent::PriceUpdate(snapshot));
        }
        replies
    }

    fn chat(&self, message: String) -> Vec<ServerEvent> {
        let Some(token) = self.route.token() else {
            return vec![error_event("chat is only available on token connections")];
        };

        let event = ServerEvent::ChatMessage {
            token: token.to_string(),
            message,
        };
        let report = self.context.registry.broadcast_scoped(token, &event);
        debug!(token = %token, delivered = report.delivered, "Chat relayed");
        Vec::new()
    }

    /// Unregister from every scope
    pub fn close(&self) {
        if self.context.registry.remove(self.id()) {
            info!(listener = %self.id(), "Client disconnected");
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

fn error_event(message: impl Into<String>) -> ServerEvent {
    ServerEvent::Error {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::channels::{create_outbound_channel, ChannelListener};
    use crate::common::traits::MockPriceSource;
    use crate::monitor::{RiskLevel, TrackedTokens};
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    fn context_with(source: MockPriceSource) -> SessionContext {
        SessionContext {
            registry: Arc::new(SubscriptionRegistry::new(Arc::new(TrackedTokens::new()))),
            cache: Arc::new(PriceCache::new()),
            evaluator: AlertEvaluator::new(Arc::new(MemoryStore::new())),
            source: Arc::new(source),
            fetch_timeout: Duration::from_millis(200),
        }
    }

    fn context() -> SessionContext {
        context_with(MockPriceSource::new())
    }

    fn open(route: Route, context: &SessionContext) -> (Session, mpsc::Receiver<String>) {
        let (tx, rx) = create_outbound_channel();
        let session = Session::open(Arc::new(ChannelListener::new(tx)), route, context.clone());
        (session, rx)
    }

    fn next_event(rx: &mut mpsc::Receiver<String>) -> ServerEvent {
        serde_json::from_str(&rx.try_recv().unwrap()).unwrap()
    }

    #[test]
    fn test_route_from_path() {
        assert_eq!(Route::from_path("/ws/monitor"), Route::Monitor);
        assert_eq!(Route::from_path("/"), Route::Monitor);
        assert_eq!(Route::from_path("/ws/token/"), Route::Monitor);
        assert_eq!(Route::from_path("/ws/token/a/b"), Route::Monitor);
        assert_eq!(
            Route::from_path("/ws/token/mint_1?x=1"),
            Route::Token("mint_1".to_string())
        );
        assert_eq!(
            Route::from_path("/ws/chat/mint_2/"),
            Route::Token("mint_2".to_string())
        );
    }

    #[test]
    fn test_token_route_registers_both_scopes() {
        let ctx = context();
        let (session, _rx) = open(Route::Token("mint_1".to_string()), &ctx);

        assert_eq!(ctx.registry.global_count(), 1);
        assert_eq!(ctx.registry.scoped_count("mint_1"), 1);
        assert!(ctx.registry.tracked().contains("mint_1"));

        drop(session);
        assert_eq!(ctx.registry.global_count(), 0);
        assert_eq!(ctx.registry.scoped_count("mint_1"), 0);
    }

    #[tokio::test]
    async fn test_subscribe_acks_then_sends_cached_price() {
        let ctx = context();
        let mut cached = TokenSnapshot::empty("mint_1");
        cached.price = dec!(0.25);
        ctx.cache.insert(cached.clone());
        let (session, mut rx) = open(Route::Monitor, &ctx);

        session
            .handle_text(r#"{"action":"subscribe","token":"mint_1"}"#)
            .await;

        assert_eq!(
            next_event(&mut rx),
            ServerEvent::Subscribed {
                token: "mint_1".to_string()
            }
        );
        assert_eq!(next_event(&mut rx), ServerEvent::PriceUpdate(cached));
        assert!(ctx.registry.tracked().contains("mint_1"));
        // Monitor connections stay global-only
        assert_eq!(ctx.registry.scoped_count("mint_1"), 0);
    }

    #[tokio::test]
    async fn test_create_alert_persists_and_tracks() {
        let ctx = context();
        let (session, _rx) = open(Route::Monitor, &ctx);

        let replies = session
            .respond(
                r#"{"action":"create_alert","token_address":"mint_3","kind":"price_below","threshold":"0.01","message":"dip"}"#,
            )
            .await;

        match &replies[..] {
            [ServerEvent::AlertCreated(rule)] => {
                assert_eq!(rule.token_address, "mint_3");
                assert_eq!(rule.threshold, dec!(0.01));
                assert!(!rule.triggered);
            }
            other => panic!("unexpected replies: {:?}", other),
        }
        assert!(ctx.registry.tracked().contains("mint_3"));
    }

    #[tokio::test]
    async fn test_invalid_requests_get_error_events() {
        let ctx = context();
        let (session, _rx) = open(Route::Monitor, &ctx);

        for payload in [
            "not json",
            r#"{"action":"subscribe","token":"  "}"#,
            r#"{"action":"create_alert","token_address":"m","kind":"price_above","threshold":"-1"}"#,
            r#"{"action":"chat","message":"hi"}"#,
        ] {
            let replies = session.respond(payload).await;
            assert!(
                matches!(&replies[..], [ServerEvent::Error { .. }]),
                "payload {} gave {:?}",
                payload,
                replies
            );
        }
        assert!(ctx.registry.is_registered(session.id()));
    }

    #[tokio::test]
    async fn test_chat_relayed_to_token_listeners_only() {
        let ctx = context();
        let (alice, mut alice_rx) = open(Route::Token("mint_1".to_string()), &ctx);
        let (_bob, mut bob_rx) = open(Route::Token("mint_1".to_string()), &ctx);
        let (_carol, mut carol_rx) = open(Route::Token("mint_2".to_string()), &ctx);

        alice.handle_text(r#"{"action":"chat","message":"gm"}"#).await;

        let expected = ServerEvent::ChatMessage {
            token: "mint_1".to_string(),
            message: "gm".to_string(),
        };
        assert_eq!(next_event(&mut alice_rx), expected);
        assert_eq!(next_event(&mut bob_rx), expected);
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_reply_unregisters_listener() {
        let ctx = context();
        let (session, rx) = open(Route::Token("mint_1".to_string()), &ctx);
        drop(rx);

        session
            .handle_text(r#"{"action":"subscribe","token":"mint_1"}"#)
            .await;

        assert!(!ctx.registry.is_registered(session.id()));
        assert_eq!(ctx.registry.scoped_count("mint_1"), 0);
    }

    #[tokio::test]
    async fn test_analyze_uses_cached_snapshot() {
        let mut source = MockPriceSource::new();
        source.expect_fetch_snapshot().never();
        let ctx = context_with(source);
        ctx.cache.insert(TokenSnapshot {
            volume_24h: dec!(600000),
            change_24h: dec!(-120),
            market_cap: dec!(40000),
            ..TokenSnapshot::empty("mint_1")
        });
        let (session, mut rx) = open(Route::Monitor, &ctx);

        session
            .handle_text(r#"{"action":"analyze","token":"mint_1"}"#)
            .await;

        match next_event(&mut rx) {
            ServerEvent::Analysis(analysis) => {
                assert_eq!(analysis.token, "mint_1");
                assert_eq!(analysis.risk_level, RiskLevel::High);
                assert!(analysis.volume_spike);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_analyze_fetches_uncached_token() {
        let mut source = MockPriceSource::new();
        source
            .expect_fetch_snapshot()
            .times(1)
            .returning(|address| {
                Ok(Some(TokenSnapshot {
                    market_cap: dec!(5000000),
                    ..TokenSnapshot::empty(address)
                }))
            });
        let ctx = context_with(source);
        let (session, _rx) = open(Route::Monitor, &ctx);

        let replies = session.respond(r#"{"action":"analyze","token":"mint_7"}"#).await;
        match &replies[..] {
            [ServerEvent::Analysis(analysis)] => {
                assert_eq!(analysis.token, "mint_7");
                assert_eq!(analysis.risk_level, RiskLevel::Low);
            }
            other => panic!("unexpected replies: {:?}", other),
        }
        // Analysis does not start tracking
        assert!(!ctx.registry.tracked().contains("mint_7"));
    }

    #[tokio::test]
    async fn test_analyze_unknown_token_is_error() {
        let mut source = MockPriceSource::new();
        source.expect_fetch_snapshot().returning(|_| Ok(None));
        let ctx = context_with(source);
        let (session, _rx) = open(Route::Monitor, &ctx);

        let replies = session.respond(r#"{"action":"analyze","token":"nope"}"#).await;
        match &replies[..] {
            [ServerEvent::Error { message }] => {
                assert_eq!(message, &TrackerError::TokenUnavailable("nope".to_string()).to_string());
            }
            other => panic!("unexpected replies: {:?}", other),
        }
        assert!(ctx.registry.is_registered(session.id()));
    }
}
