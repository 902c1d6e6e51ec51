use tokio::sync::mpsc::error::SendError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::Span;

pub mod menu_bar;
pub mod reactor;

/// Sends events to an async actor, carrying the caller's span along.
pub struct Sender<Event>(UnboundedSender<(Span, Event)>);
pub type Receiver<Event> = UnboundedReceiver<(Span, Event)>;

pub fn channel<Event>() -> (Sender<Event>, Receiver<Event>) {
    let (tx, rx) = unbounded_channel();
    (Sender(tx), rx)
}

impl<Event> Sender<Event> {
    pub fn send(&self, event: Event) {
        // Most of the time we can ignore send errors, they just indicate the
        // actor is shutting down.
        _ = self.try_send(event)
    }

    pub fn try_send(&self, event: Event) -> Result<(), SendError<(Span, Event)>> {
        self.0.send((Span::current(), event))
    }
}

impl<Event> Clone for Sender<Event> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}

/// Sends events to an actor running on its own thread.
pub struct ThreadSender<Event>(crossbeam_channel::Sender<(Span, Event)>);
pub type ThreadReceiver<Event> = crossbeam_channel::Receiver<(Span, Event)>;

pub fn thread_channel<Event>() -> (ThreadSender<Event>, ThreadReceiver<Event>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ThreadSender(tx), rx)
}

impl<Event> ThreadSender<Event> {
    pub fn send(&self, event: Event) { _ = self.try_send(event) }

    pub fn try_send(
        &self,
        event: Event,
    ) -> Result<(), crossbeam_channel::SendError<(Span, Event)>> {
        self.0.send((Span::current(), event))
    }
}

impl<Event> Clone for ThreadSender<Event> {
    fn clone(&self) -> Self { Self(self.0.clone()) }
}
