//! The MPSC submission stack: any thread pushes a freshly-submitted packet;
//! only the reactor thread drains it, per §4.2.

use crate::packet::{Packet, link_load};
use crate::stack::AtomicStack;

pub(crate) struct SubmissionStack {
    inner: AtomicStack,
}

impl SubmissionStack {
    pub(crate) const fn new() -> Self {
        Self {
            inner: AtomicStack::new(),
        }
    }

    /// Push a freshly-submitted packet. Safe from any thread.
    pub(crate) fn push(&self, packet: *mut Packet) {
        self.inner.push(packet);
    }

    /// Drain every packet currently queued, in submission order.
    ///
    /// The stack is LIFO, so a raw pop-loop would observe the most recently
    /// submitted packet first; reversing the drained chain here restores
    /// per-producer submission order for any single producer's run of
    /// pushes, which is as much ordering as the specification promises
    /// (§5: "no guaranteed ordering between their completions... order
    /// within one producer's pushes is preserved only if that producer
    /// pushes sequentially").
    pub(crate) fn drain(&self) -> Vec<*mut Packet> {
        let mut packets = Vec::new();
        let mut cur = self.inner.drain_all();
        while let Some(p) = cur {
            let next = link_load(p);
            packets.push(p);
            cur = if next.is_null() { None } else { Some(next) };
        }
        packets.reverse();
        packets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;

    #[test]
    fn drain_restores_submission_order() {
        let stack = SubmissionStack::new();
        let mut packets: Vec<Box<Packet>> = (0..3).map(|_| Box::new(Packet::empty())).collect();
        let ptrs: Vec<*mut Packet> = packets.iter_mut().map(|p| p.as_mut() as *mut _).collect();

        for &p in &ptrs {
            stack.push(p);
        }

        assert_eq!(stack.drain(), ptrs);
        assert!(stack.drain().is_empty());
    }
}
