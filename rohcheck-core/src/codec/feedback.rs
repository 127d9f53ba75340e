//! Feedback transport between a compressor and the decompressor wired to it

use bytes::Bytes;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Queues {
    /// Elements the compressor must piggyback on its next packet
    outbound: VecDeque<Bytes>,
    /// Elements addressed to the compressor itself
    inbound: VecDeque<Bytes>,
}

/// Feedback queues attached to one compressor
///
/// The compressor owns one handle; exactly one decompressor from the other
/// pipeline holds the second. That decompressor sends its own feedback
/// through the compressor (`send`) and hands over feedback it finds on
/// incoming packets (`deliver`).
#[derive(Debug, Clone, Default)]
pub struct FeedbackChannel {
    queues: Rc<RefCell<Queues>>,
}

impl FeedbackChannel {
    /// Create an empty channel
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an element for the compressor to piggyback
    pub fn send(&self, element: Bytes) {
        self.queues.borrow_mut().outbound.push_back(element);
    }

    /// Hand an element to the compressor
    pub fn deliver(&self, element: Bytes) {
        self.queues.borrow_mut().inbound.push_back(element);
    }

    /// Drain the elements to piggyback
    pub fn take_outbound(&self) -> Vec<Bytes> {
        self.queues.borrow_mut().outbound.drain(..).collect()
    }

    /// Drain the elements addressed to the compressor
    pub fn take_inbound(&self) -> Vec<Bytes> {
        self.queues.borrow_mut().inbound.drain(..).collect()
    }

    /// Number of elements waiting in either direction
    pub fn pending(&self) -> usize {
        let queues = self.queues.borrow();
        queues.outbound.len() + queues.inbound.len()
    }
}
