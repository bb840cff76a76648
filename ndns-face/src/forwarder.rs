use std::sync::{Arc, Mutex};

use ndns_types::Name;

use crate::{BoxFuture, Data, Face, FaceError, Interest, InterestHandler};

struct Registration {
    prefix: Name,
    handler: Arc<dyn InterestHandler>,
}

/// A very basic in-memory forwarder: every interest sent by any face is
/// routed to the longest matching registered prefix, across every face
/// attached to this forwarder. Grounded in the original codebase's test
/// `DummyForwarder`, which does the same broadcast-and-match dance to
/// avoid needing a real NFD in tests.
#[derive(Default)]
pub struct InMemoryForwarder {
    registrations: Mutex<Vec<Registration>>,
}

impl InMemoryForwarder {
    pub fn new() -> Arc<Self> {
        Arc::new(InMemoryForwarder {
            registrations: Mutex::new(Vec::new()),
        })
    }

    /// Creates a new face attached to this forwarder.
    pub fn face(self: &Arc<Self>) -> InMemoryFace {
        InMemoryFace {
            forwarder: Arc::clone(self),
        }
    }

    fn longest_prefix_match(&self, name: &Name) -> Option<Arc<dyn InterestHandler>> {
        let registrations = self.registrations.lock().unwrap();
        registrations
            .iter()
            .filter(|reg| name.is_prefixed_by(&reg.prefix))
            .max_by_key(|reg| reg.prefix.len())
            .map(|reg| Arc::clone(&reg.handler))
    }
}

/// A face attached to an `InMemoryForwarder`.
#[derive(Clone)]
pub struct InMemoryFace {
    forwarder: Arc<InMemoryForwarder>,
}

impl Face for InMemoryFace {
    fn send_interest(&self, interest: Interest) -> BoxFuture<'_, Result<Data, FaceError>> {
        let forwarder = Arc::clone(&self.forwarder);
        Box::pin(async move {
            // A forwarding hint, when present, is tried first: it names the
            // zones a prior LINK delegation said could route this
            // interest, and only the direct name is tried as a fallback.
            let candidates = interest
                .forwarding_hint
                .clone()
                .unwrap_or_default()
                .into_iter()
                .chain(std::iter::once(interest.name.clone()));

            for candidate in candidates {
                if let Some(handler) = forwarder.longest_prefix_match(&candidate) {
                    let mut sub_interest = interest.clone();
                    sub_interest.name = candidate;
                    if let Some(data) = handler.handle_interest(sub_interest).await {
                        return Ok(data);
                    }
                    return Err(FaceError::Nacked);
                }
            }

            Err(FaceError::NoRoute)
        })
    }

    fn register_prefix(&self, prefix: Name, handler: Arc<dyn InterestHandler>) {
        self.forwarder
            .registrations
            .lock()
            .unwrap()
            .push(Registration { prefix, handler });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoHandler {
        calls: Arc<AtomicUsize>,
    }

    impl InterestHandler for EchoHandler {
        fn handle_interest(&self, interest: Interest) -> BoxFuture<'static, Option<Data>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                Some(Data {
                    name: interest.name,
                    content: b"hello".to_vec(),
                    key_locator: Name::root(),
                    signature: vec![],
                })
            })
        }
    }

    #[tokio::test]
    async fn routes_to_longest_matching_prefix() {
        let forwarder = InMemoryForwarder::new();
        let server_face = forwarder.face();
        let client_face = forwarder.face();

        let calls = Arc::new(AtomicUsize::new(0));
        server_face.register_prefix(
            Name::from_labels(&["net", "example"]),
            Arc::new(EchoHandler {
                calls: Arc::clone(&calls),
            }),
        );

        let name = Name::from_labels(&["net", "example"]).append_label("NDNS");
        let data = client_face
            .send_interest(Interest::new(name.clone()))
            .await
            .unwrap();

        assert_eq!(name, data.name);
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn returns_no_route_when_unregistered() {
        let forwarder = InMemoryForwarder::new();
        let client_face = forwarder.face();

        let result = client_face
            .send_interest(Interest::new(Name::from_labels(&["net", "example"])))
            .await;

        assert_eq!(Err(FaceError::NoRoute), result);
    }

    #[tokio::test]
    async fn forwarding_hint_is_tried_before_the_direct_name() {
        let forwarder = InMemoryForwarder::new();
        let hinted_face = forwarder.face();
        let client_face = forwarder.face();

        let calls = Arc::new(AtomicUsize::new(0));
        hinted_face.register_prefix(
            Name::from_labels(&["hub"]),
            Arc::new(EchoHandler {
                calls: Arc::clone(&calls),
            }),
        );

        let interest = Interest::new(Name::from_labels(&["net", "example"]).append_label("NDNS"))
            .with_forwarding_hint(vec![Name::from_labels(&["hub"])]);
        let result = client_face.send_interest(interest).await;

        assert!(result.is_ok());
        assert_eq!(1, calls.load(Ordering::SeqCst));
    }
}
