//! The pending queue: a FIFO of batch roots awaiting the single inflight
//! slot, per §4.3. Touched only by the reactor thread; no synchronization.

use crate::packet::Packet;

pub(crate) struct PendingQueue {
    head: *mut Packet,
    tail: *mut Packet,
    len: usize,
}

// Only ever touched from the reactor thread, but the Context that owns it
// is moved to that thread at spawn time.
unsafe impl Send for PendingQueue {}

impl PendingQueue {
    pub(crate) fn new() -> Self {
        Self {
            head: std::ptr::null_mut(),
            tail: std::ptr::null_mut(),
            len: 0,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Push a new batch root at the tail.
    pub(crate) fn push_back(&mut self, root: *mut Packet) {
        unsafe {
            (*root).pending_next = std::ptr::null_mut();
        }
        if self.tail.is_null() {
            self.head = root;
            self.tail = root;
        } else {
            unsafe {
                (*self.tail).pending_next = root;
            }
            self.tail = root;
        }
        self.len += 1;
    }

    /// Pop the head root, if any.
    pub(crate) fn pop_front(&mut self) -> Option<*mut Packet> {
        if self.head.is_null() {
            return None;
        }
        let root = self.head;
        let next = unsafe { (*root).pending_next };
        self.head = next;
        if self.head.is_null() {
            self.tail = std::ptr::null_mut();
        }
        unsafe {
            (*root).pending_next = std::ptr::null_mut();
        }
        self.len -= 1;
        Some(root)
    }

    /// Scan from head to tail for the first root matching `predicate`.
    /// Mandatory head-to-tail order preserves FIFO fairness: older roots
    /// fill first (§4.4).
    pub(crate) fn find_mut(&mut self, mut predicate: impl FnMut(*mut Packet) -> bool) -> Option<*mut Packet> {
        let mut cur = self.head;
        while !cur.is_null() {
            if predicate(cur) {
                return Some(cur);
            }
            cur = unsafe { (*cur).pending_next };
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::Packet;

    #[test]
    fn fifo_order_preserved() {
        let mut q = PendingQueue::new();
        let mut packets: Vec<Box<Packet>> = (0..3).map(|_| Box::new(Packet::empty())).collect();
        let ptrs: Vec<*mut Packet> = packets.iter_mut().map(|p| p.as_mut() as *mut _).collect();

        for &p in &ptrs {
            q.push_back(p);
        }
        assert_eq!(q.len(), 3);
        assert_eq!(q.pop_front(), Some(ptrs[0]));
        assert_eq!(q.pop_front(), Some(ptrs[1]));
        assert_eq!(q.pop_front(), Some(ptrs[2]));
        assert_eq!(q.pop_front(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn find_mut_scans_head_to_tail() {
        let mut q = PendingQueue::new();
        let mut packets: Vec<Box<Packet>> = (0..3).map(|_| Box::new(Packet::empty())).collect();
        let ptrs: Vec<*mut Packet> = packets.iter_mut().map(|p| p.as_mut() as *mut _).collect();
        for &p in &ptrs {
            q.push_back(p);
        }

        let mut seen = Vec::new();
        let found = q.find_mut(|p| {
            seen.push(p);
            p == ptrs[2]
        });
        assert_eq!(found, Some(ptrs[2]));
        assert_eq!(seen, ptrs);
    }
}
