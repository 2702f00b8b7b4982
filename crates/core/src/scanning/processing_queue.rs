use std::fmt;

use serde::Serialize;

/// Submission sequence number. Monotonic across every `submit` call of one
/// scanner, so sorting by ticket recovers submission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueState {
    Pending,
    Processing,
    Error,
    Cancelled,
}

impl QueueState {
    pub fn is_terminal(self) -> bool {
        matches!(self, QueueState::Error | QueueState::Cancelled)
    }
}

/// Pipeline bookkeeping for one accepted file. Successful items leave the
/// queue; failed and cancelled ones stay visible until cleared.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueueItem {
    pub ticket: Ticket,
    pub display_name: String,
    pub state: QueueState,
    pub error: Option<String>,
}

/// Ordered queue of in-flight items plus progress counters.
#[derive(Debug, Default)]
pub struct ProcessingQueue {
    items: Vec<QueueItem>,
    next_ticket: u64,
    accepted: usize,
    finished: usize,
}

impl ProcessingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, display_name: impl Into<String>) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.accepted += 1;
        self.items.push(QueueItem {
            ticket,
            display_name: display_name.into(),
            state: QueueState::Pending,
            error: None,
        });
        ticket
    }

    /// `pending → processing`. Returns false if the item is gone or no
    /// longer pending (e.g. cancelled while waiting).
    pub fn start(&mut self, ticket: Ticket) -> bool {
        match self.find_mut(ticket) {
            Some(item) if item.state == QueueState::Pending => {
                item.state = QueueState::Processing;
                true
            }
            _ => false,
        }
    }

    /// Success: the item leaves the queue.
    pub fn complete(&mut self, ticket: Ticket) -> bool {
        let Some(pos) = self.position(ticket) else {
            return false;
        };
        if self.items[pos].state.is_terminal() {
            return false;
        }
        self.items.remove(pos);
        self.finished += 1;
        true
    }

    pub fn fail(&mut self, ticket: Ticket, error: impl Into<String>) -> bool {
        self.finish(ticket, QueueState::Error, Some(error.into()))
    }

    pub fn cancel(&mut self, ticket: Ticket) -> bool {
        self.finish(ticket, QueueState::Cancelled, None)
    }

    fn finish(&mut self, ticket: Ticket, state: QueueState, error: Option<String>) -> bool {
        let Some(item) = self.find_mut(ticket) else {
            return false;
        };
        if item.state.is_terminal() {
            return false;
        }
        item.state = state;
        item.error = error;
        self.finished += 1;
        true
    }

    pub fn item(&self, ticket: Ticket) -> Option<&QueueItem> {
        self.items.iter().find(|i| i.ticket == ticket)
    }

    pub fn state(&self, ticket: Ticket) -> Option<QueueState> {
        self.item(ticket).map(|i| i.state)
    }

    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.items.clone()
    }

    pub fn tickets_in(&self, state: QueueState) -> Vec<Ticket> {
        self.items
            .iter()
            .filter(|i| i.state == state)
            .map(|i| i.ticket)
            .collect()
    }

    /// Drops failed and cancelled items. Returns how many were removed.
    pub fn clear_finished(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|i| !i.state.is_terminal());
        before - self.items.len()
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn finished(&self) -> usize {
        self.finished
    }

    /// True once every accepted item reached a terminal outcome.
    pub fn is_idle(&self) -> bool {
        self.finished == self.accepted
    }

    fn position(&self, ticket: Ticket) -> Option<usize> {
        self.items.iter().position(|i| i.ticket == ticket)
    }

    fn find_mut(&mut self, ticket: Ticket) -> Option<&mut QueueItem> {
        self.items.iter_mut().find(|i| i.ticket == ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(queue: &ProcessingQueue) -> Vec<String> {
        queue
            .snapshot()
            .into_iter()
            .map(|i| i.display_name)
            .collect()
    }

    #[test]
    fn test_tickets_are_monotonic() {
        let mut queue = ProcessingQueue::new();
        let a = queue.enqueue("a.jpg");
        let b = queue.enqueue("b.jpg");
        assert!(a < b);
        assert_eq!(b.value(), a.value() + 1);
    }

    #[test]
    fn test_items_keep_submission_order() {
        let mut queue = ProcessingQueue::new();
        queue.enqueue("a.jpg");
        queue.enqueue("b.jpg");
        queue.enqueue("c.jpg");
        assert_eq!(names(&queue), vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_complete_removes_item() {
        let mut queue = ProcessingQueue::new();
        let a = queue.enqueue("a.jpg");
        queue.enqueue("b.jpg");

        assert!(queue.start(a));
        assert!(queue.complete(a));

        assert_eq!(names(&queue), vec!["b.jpg"]);
        assert_eq!(queue.state(a), None);
        assert_eq!(queue.finished(), 1);
    }

    #[test]
    fn test_fail_keeps_item_with_message() {
        let mut queue = ProcessingQueue::new();
        let a = queue.enqueue("a.jpg");
        queue.start(a);

        assert!(queue.fail(a, "unreadable"));

        let item = &queue.snapshot()[0];
        assert_eq!(item.state, QueueState::Error);
        assert_eq!(item.error.as_deref(), Some("unreadable"));
        assert!(queue.is_idle());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut queue = ProcessingQueue::new();
        let a = queue.enqueue("a.jpg");
        queue.start(a);
        queue.fail(a, "boom");

        assert!(!queue.start(a));
        assert!(!queue.cancel(a));
        assert!(!queue.complete(a));
        assert_eq!(queue.state(a), Some(QueueState::Error));
        assert_eq!(queue.finished(), 1);
    }

    #[test]
    fn test_cancelled_pending_item_cannot_start() {
        let mut queue = ProcessingQueue::new();
        let a = queue.enqueue("a.jpg");

        assert!(queue.cancel(a));

        assert!(!queue.start(a));
        assert_eq!(queue.state(a), Some(QueueState::Cancelled));
    }

    #[test]
    fn test_idle_tracks_outstanding_items() {
        let mut queue = ProcessingQueue::new();
        assert!(queue.is_idle());
        let a = queue.enqueue("a.jpg");
        let b = queue.enqueue("b.jpg");
        assert!(!queue.is_idle());

        queue.start(a);
        queue.complete(a);
        assert!(!queue.is_idle());

        queue.cancel(b);
        assert!(queue.is_idle());
        assert_eq!(queue.accepted(), 2);
    }

    #[test]
    fn test_clear_finished_keeps_live_items() {
        let mut queue = ProcessingQueue::new();
        let a = queue.enqueue("a.jpg");
        let b = queue.enqueue("b.jpg");
        queue.enqueue("c.jpg");
        queue.start(a);
        queue.fail(a, "bad");
        queue.cancel(b);

        assert_eq!(queue.clear_finished(), 2);
        assert_eq!(names(&queue), vec!["c.jpg"]);
    }

    #[test]
    fn test_resubmission_gets_new_ticket() {
        let mut queue = ProcessingQueue::new();
        let first = queue.enqueue("a.jpg");
        queue.start(first);
        queue.fail(first, "bad");

        let second = queue.enqueue("a.jpg");

        assert_ne!(first, second);
        assert_eq!(queue.state(first), Some(QueueState::Error));
        assert_eq!(queue.state(second), Some(QueueState::Pending));
    }

    #[test]
    fn test_tickets_in_state() {
        let mut queue = ProcessingQueue::new();
        let a = queue.enqueue("a.jpg");
        let b = queue.enqueue("b.jpg");
        queue.start(a);
        assert_eq!(queue.tickets_in(QueueState::Pending), vec![b]);
        assert_eq!(queue.tickets_in(QueueState::Processing), vec![a]);
    }
}
