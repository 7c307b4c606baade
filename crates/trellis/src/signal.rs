//! Signals: widget notifications delivered to application callbacks.
//!
//! A widget owns its signals and emits them from inside its hooks. Slots receive the
//! [`Gui`] and the emitted value. Delivery goes through [`Gui::defer`]: when no widget
//! hook is on the stack the slots run at once, otherwise they run as soon as the
//! outermost hook returns. Slots can therefore freely reach the emitting widget through
//! [`Gui::widget_mut`] or [`Gui::with_widget`].
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use trellis::{Gui, GuiConfig, Signal};
//! use trellis_render::HeadlessRenderer;
//!
//! let mut gui = Gui::new(Box::new(HeadlessRenderer::new(64, 64)), GuiConfig::default());
//! let changed = Signal::<i32>::new();
//! let seen = Rc::new(Cell::new(0));
//! let sink = Rc::clone(&seen);
//! changed.connect(move |_gui, value| sink.set(*value));
//!
//! changed.emit(&mut gui, 7);
//! assert_eq!(seen.get(), 7);
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use trellis_core::logging::targets;

use crate::gui::Gui;

new_key_type! {
    /// Identifies one slot connected to a [`Signal`].
    pub struct ConnectionId;
}

type Slot<Args> = Rc<RefCell<dyn FnMut(&mut Gui, &Args)>>;

/// A list of callbacks invoked with a value of type `Args`.
pub struct Signal<Args> {
    connections: Rc<RefCell<SlotMap<ConnectionId, Slot<Args>>>>,
    blocked: Cell<bool>,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            connections: Rc::new(RefCell::new(SlotMap::with_key())),
            blocked: Cell::new(false),
        }
    }

    /// Connect a slot. Returns the id used to disconnect it.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: FnMut(&mut Gui, &Args) + 'static,
    {
        let slot: Slot<Args> = Rc::new(RefCell::new(slot));
        self.connections.borrow_mut().insert(slot)
    }

    /// Returns `true` if the connection existed.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.borrow_mut().remove(id).is_some()
    }

    pub fn disconnect_all(&self) {
        self.connections.borrow_mut().clear();
    }

    pub fn connection_count(&self) -> usize {
        self.connections.borrow().len()
    }

    /// While blocked, [`emit`](Self::emit) does nothing.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.set(blocked);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.get()
    }

    /// Deliver `args` to every slot connected at the time of the call.
    ///
    /// A slot that panics is logged and skipped; the remaining slots still run. A slot
    /// that emits the same signal again does not receive the nested emission.
    pub fn emit(&self, gui: &mut Gui, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::EVENT, "signal blocked, skipping emit");
            return;
        }
        let slots: Vec<Slot<Args>> = self.connections.borrow().values().cloned().collect();
        if slots.is_empty() {
            return;
        }
        gui.defer(move |gui| {
            for slot in slots {
                let Ok(mut slot) = slot.try_borrow_mut() else {
                    tracing::debug!(target: targets::EVENT, "recursive signal emission skipped");
                    continue;
                };
                trellis_core::guarded("signal_slot", || (&mut *slot)(gui, &args));
            }
        });
    }
}

impl<Args> fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connections.borrow().len())
            .field("blocked", &self.blocked.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use trellis_render::HeadlessRenderer;

    use super::*;
    use crate::gui::GuiConfig;

    fn gui() -> Gui {
        Gui::new(Box::new(HeadlessRenderer::new(64, 64)), GuiConfig::default())
    }

    #[test]
    fn test_signal_emit_and_disconnect() {
        let mut gui = gui();
        let signal = Signal::<i32>::new();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        let id = signal.connect(move |_gui, value| sink.borrow_mut().push(*value));

        signal.emit(&mut gui, 1);
        assert!(signal.disconnect(id));
        signal.emit(&mut gui, 2);

        assert_eq!(*received.borrow(), vec![1]);
        assert_eq!(signal.connection_count(), 0);
    }

    #[test]
    fn test_signal_blocked() {
        let mut gui = gui();
        let signal = Signal::<i32>::new();
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        signal.connect(move |_gui, value| sink.borrow_mut().push(*value));

        signal.emit(&mut gui, 1);
        signal.set_blocked(true);
        signal.emit(&mut gui, 2);
        signal.set_blocked(false);
        signal.emit(&mut gui, 3);

        assert_eq!(*received.borrow(), vec![1, 3]);
    }

    #[test]
    fn test_panicking_slot_does_not_stop_others() {
        let mut gui = gui();
        let signal = Signal::<()>::new();
        let hits = Rc::new(RefCell::new(0));
        signal.connect(|_gui, _| panic!("slot failure"));
        let sink = Rc::clone(&hits);
        signal.connect(move |_gui, _| *sink.borrow_mut() += 1);

        signal.emit(&mut gui, ());
        assert_eq!(*hits.borrow(), 1);
    }
}
