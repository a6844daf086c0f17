use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::event::{Event, Notification, Route};

/// What the core asks of the hosting UI besides HTTP and rendering: toasts,
/// navigation and a wall clock for cache-busting photo URLs.
pub struct Host<E> {
    context: CapabilityContext<HostOperation, E>,
}

impl<Ev> Capability<Ev> for Host<Ev> {
    type Operation = HostOperation;
    type MappedSelf<MappedEv> = Host<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Host::new(self.context.map_event(f))
    }
}

impl<E> Host<E>
where
    E: Send + 'static,
{
    pub fn new(context: CapabilityContext<HostOperation, E>) -> Self {
        Self { context }
    }

    pub fn notify(&self, notification: Notification) {
        self.tell(HostOperation::Notify(notification));
    }

    pub fn navigate(&self, route: Route) {
        self.tell(HostOperation::Navigate(route));
    }

    /// The contact list must be re-read by whoever shows it.
    pub fn directory_changed(&self) {
        self.tell(HostOperation::DirectoryChanged);
    }

    /// Asks the shell for milliseconds since the Unix epoch.
    pub fn now<F>(&self, make_event: F)
    where
        F: FnOnce(u64) -> E + Send + 'static,
    {
        let context = self.context.clone();
        self.context.spawn(async move {
            let millis = match context.request_from_shell(HostOperation::Now).await {
                HostOutput::Now { millis } => millis,
                HostOutput::Done => 0,
            };
            context.update_app(make_event(millis));
        });
    }

    fn tell(&self, operation: HostOperation) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(operation).await;
        });
    }
}

pub type HostCapability = Host<Event>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum HostOperation {
    Notify(Notification),
    Navigate(Route),
    DirectoryChanged,
    Now,
}

impl Operation for HostOperation {
    type Output = HostOutput;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum HostOutput {
    Done,
    Now { millis: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppError;

    #[test]
    fn test_operations_cross_the_bridge_as_json() {
        let op = HostOperation::Notify(Notification::error(&AppError::transport("Network Error")));
        let json = serde_json::to_string(&op).unwrap();
        assert!(json.contains("Network Error"));
        let back: HostOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, op);

        let out: HostOutput = serde_json::from_str(r#"{"Now":{"millis":1700000000000}}"#).unwrap();
        assert_eq!(out, HostOutput::Now { millis: 1_700_000_000_000 });
    }
}
