use std::io::Write;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::{instrument, warn};

use crate::actor;
use crate::model::published::{Listener, ListenerId, Published};
use crate::ui::menu_bar::{MenuIcon, StatusSnapshot};

const DEBOUNCE_MS: u64 = 150;

#[derive(Debug, Clone)]
pub enum Event {
    Update(Arc<StatusSnapshot>),
}

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

/// Forwards published status snapshots to the menu actor.
pub fn listener(tx: Sender) -> Listener<StatusSnapshot> {
    Arc::new(move |snapshot: &Arc<StatusSnapshot>| tx.send(Event::Update(snapshot.clone())))
}

/// A listener registration that is removed again when dropped.
pub struct Subscription {
    source: Weak<Published<StatusSnapshot>>,
    id: ListenerId,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(source) = self.source.upgrade() {
            source.unsubscribe(self.id);
        }
    }
}

pub struct Menu<W> {
    rx: Receiver,
    icon: MenuIcon<W>,
    subscription: Option<Subscription>,
}

impl<W: Write> Menu<W> {
    pub fn new(rx: Receiver, out: W) -> Self {
        Self { rx, icon: MenuIcon::new(out), subscription: None }
    }

    /// Subscribes a new menu to `status`. The listener is removed when the
    /// menu is dropped or [`Menu::unsubscribe`] is called.
    pub fn subscribed(status: &Arc<Published<StatusSnapshot>>, out: W) -> Self {
        let (tx, rx) = actor::channel();
        let id = status.subscribe(listener(tx.clone()));
        // Show whatever is current right away.
        tx.send(Event::Update(status.load()));
        let mut menu = Self::new(rx, out);
        menu.subscription = Some(Subscription { source: Arc::downgrade(status), id });
        menu
    }

    /// Stops receiving new snapshots. Updates already queued are still shown.
    pub fn unsubscribe(&mut self) { self.subscription = None; }

    /// Runs until every sender is gone. Bursts of updates collapse into the
    /// last one.
    pub async fn run(mut self) -> W {
        let mut pending: Option<Event> = None;

        loop {
            if pending.is_none() {
                match self.rx.recv().await {
                    Some((span, event)) => {
                        let _guard = span.enter();
                        pending = Some(event);
                    }
                    None => break,
                }
            } else {
                tokio::select! {
                    maybe_msg = self.rx.recv() => {
                        match maybe_msg {
                            Some((span, event)) => {
                                let _guard = span.enter();
                                pending = Some(event);
                            }
                            None => {
                                if let Some(ev) = pending.take() {
                                    self.handle_event(ev);
                                }
                                break;
                            }
                        }
                    }
                    _ = tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS)) => {
                        if let Some(ev) = pending.take() {
                            self.handle_event(ev);
                        }
                    }
                }
            }
        }
        self.icon.into_inner()
    }

    #[instrument(name = "menu_bar::handle_event", skip(self))]
    fn handle_event(&mut self, event: Event) {
        let Event::Update(snapshot) = event;
        if let Err(err) = self.icon.update(&snapshot) {
            warn!(%err, "could not update status item");
        }
    }
}
