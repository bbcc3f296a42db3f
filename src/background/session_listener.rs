use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::backend::IdentityProvider;
use crate::session::{SessionState, Sessions};

/// Copies identity-provider state changes into [`Sessions`].
///
/// Subscribes when spawned and stops on [`SessionListener::shutdown`].
pub struct SessionListener {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SessionListener {
    pub fn spawn(identity: Arc<dyn IdentityProvider>, sessions: Sessions) -> Self {
        // Subscribe before returning so no event after this point is missed.
        let mut events = BroadcastStream::new(identity.subscribe());
        let (stop, mut stopped) = oneshot::channel();

        let task = tokio::spawn(async move {
            info!("session listener started");
            loop {
                tokio::select! {
                    _ = &mut stopped => break,
                    event = events.next() => match event {
                        Some(Ok(event)) => {
                            debug!(session = %event.session, signed_in = event.user.is_some(), "identity changed");
                            sessions.publish(event.session, SessionState::from(event.user));
                        }
                        Some(Err(BroadcastStreamRecvError::Lagged(missed))) => {
                            warn!(missed, "identity events lagged, resyncing sessions");
                            for id in sessions.ids() {
                                sessions.publish(id, SessionState::from(identity.current_user(id)));
                            }
                        }
                        None => break,
                    },
                }
            }
            info!("session listener stopped");
        });

        Self {
            stop: Some(stop),
            task,
        }
    }

    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(e) = (&mut self.task).await {
            warn!(error = %e, "session listener ended abnormally");
        }
    }
}
