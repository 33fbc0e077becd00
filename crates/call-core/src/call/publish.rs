//! Publish flow and call start/end

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures::future::join_all;

use crate::container::ContainerRequest;
use crate::error::{CallError, CallResult};
use crate::events::CallEvent;
use crate::sdk::PublisherRef;
use crate::types::StreamKind;

use super::{CallCoordinator, CallStarted, FailedSubscription};

/// Releases the `start_call` claim on every exit path
struct StartingGuard<'a>(&'a AtomicBool);

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl CallCoordinator {
    /// Create the local camera publisher and publish it to the session
    ///
    /// # Errors
    ///
    /// SDK failures are returned and also emitted as [`CallEvent::Error`],
    /// with the network error code turned into a connectivity hint.
    pub async fn publish(&self) -> CallResult<PublisherRef> {
        match self.publish_camera().await {
            Ok(publisher) => {
                tracing::info!(publisher_id = %publisher.id(), "Successfully published camera");
                Ok(publisher)
            }
            Err(e) => {
                self.report_error(&e);
                Err(e)
            }
        }
    }

    async fn publish_camera(&self) -> CallResult<PublisherRef> {
        let container = self
            .containers
            .resolve(ContainerRequest::publisher(StreamKind::Camera));
        let publisher = self
            .sdk_call(
                "init publisher",
                self.session.init_publisher(&container, &self.settings.call_properties),
            )
            .await?;

        self.state.add_publisher(publisher.clone());
        if let Err(e) = self.sdk_call("publish", self.session.publish(&publisher)).await {
            self.state.remove_publisher(publisher.kind(), &publisher.id());
            return Err(e);
        }
        Ok(publisher)
    }

    /// Join the call: publish the local camera and subscribe to every known
    /// remote stream
    ///
    /// Initial subscriptions run concurrently; `startCall` is emitted once
    /// all of them have settled. Individual subscription failures do not
    /// fail the call and are listed in [`CallStarted::failed_subscriptions`].
    ///
    /// # Errors
    ///
    /// * `CallError::ConnectionLimitExceeded` - too many camera streams are
    ///   already present; nothing is published
    /// * `CallError::InvalidState` - the call is already running, or
    ///   another `start_call` is still in progress
    /// * any publish error
    pub async fn start_call(&self) -> CallResult<CallStarted> {
        if self
            .starting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CallError::invalid_state("call start already in progress"));
        }
        let _starting = StartingGuard(&self.starting);
        if self.is_active() {
            return Err(CallError::invalid_state("call already started"));
        }

        if let Some(limit) = self.settings.connection_limit {
            let current = self.state.stream_count(StreamKind::Camera);
            if current >= limit {
                let err = CallError::ConnectionLimitExceeded { limit, current };
                self.report_error(&err);
                return Err(err);
            }
        }

        let publisher = self.publish().await?;
        let publisher_id = publisher.id();

        let streams = self.state.streams();
        let results = join_all(streams.iter().map(|stream| self.subscribe_known(stream))).await;

        let failed_subscriptions: Vec<FailedSubscription> = streams
            .iter()
            .zip(results)
            .filter_map(|(stream, result)| match result {
                Ok(_) => None,
                Err(error) => {
                    tracing::warn!(stream_id = %stream.id, "Failed to subscribe to existing stream: {}", error);
                    Some(FailedSubscription {
                        stream_id: stream.id.clone(),
                        error,
                    })
                }
            })
            .collect();
        if !failed_subscriptions.is_empty() {
            tracing::warn!(
                "Failed to subscribe to {} of {} existing streams",
                failed_subscriptions.len(),
                streams.len()
            );
        }

        let state = self.state.snapshot();
        self.events.emit(CallEvent::StartCall {
            publisher_id: publisher_id.clone(),
            state: state.clone(),
        });
        self.active.store(true, Ordering::SeqCst);
        tracing::info!(
            publisher_id = %publisher_id,
            subscribers = state.meta.subscribers.total,
            "Call started"
        );

        Ok(CallStarted {
            publisher_id,
            state,
            failed_subscriptions,
            started_at: Utc::now(),
        })
    }

    /// Leave the call: unpublish every publisher, tear down every
    /// subscriber and clear both registries
    pub async fn end_call(&self) {
        for kind in StreamKind::ALL {
            for publisher in self.state.publishers(kind) {
                if let Err(e) = self.sdk_call("unpublish", self.session.unpublish(&publisher)).await {
                    tracing::warn!(publisher_id = %publisher.id(), "SDK unpublish failed: {}", e);
                }
            }
            for subscriber in self.state.subscribers(kind) {
                if let Err(e) = self
                    .sdk_call("unsubscribe", self.session.unsubscribe(&subscriber))
                    .await
                {
                    tracing::warn!(subscriber_id = %subscriber.id(), "SDK unsubscribe failed: {}", e);
                }
            }
        }

        self.state.remove_all_publishers();
        self.state.remove_all_subscribers();
        self.active.store(false, Ordering::SeqCst);

        self.events.emit(CallEvent::EndCall {
            state: self.state.snapshot(),
        });
        tracing::info!("Call ended");
    }
}
