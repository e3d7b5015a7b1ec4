use super::Controller;
use crate::error::{OvertimeError, Result};
use bytes::Bytes;
use parking_lot::{Condvar, Mutex};
use std::cell::Cell;
use std::sync::Arc;

struct Mailbox {
    /// One slot per rank for the gather in progress
    gathered: Vec<Option<Bytes>>,
    arrived: usize,
    message: Option<Bytes>,
    /// Number of broadcasts published so far
    generation: u64,
    pending_readers: usize,
}

struct Shared {
    size: usize,
    mailbox: Mutex<Mailbox>,
    changed: Condvar,
}

/// A rank of an in-process group, one per thread.
///
/// # Examples
///
/// ```rust
/// use overtime::distributed::{Controller, GroupController, ROOT};
/// use bytes::Bytes;
/// use std::thread;
///
/// let handles: Vec<_> = GroupController::group(3)
///     .into_iter()
///     .map(|controller| {
///         thread::spawn(move || {
///             let rank = controller.rank() as u8;
///             controller.gather(Bytes::from(vec![rank]), ROOT).unwrap()
///         })
///     })
///     .collect();
///
/// let gathered: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
/// assert_eq!(gathered[0].as_ref().unwrap().len(), 3);
/// assert!(gathered[1].is_none());
/// ```
pub struct GroupController {
    rank: usize,
    shared: Arc<Shared>,
    /// Broadcasts this rank has taken part in
    seen: Cell<u64>,
}

impl GroupController {
    /// Controllers for ranks `0..size`.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn group(size: usize) -> Vec<GroupController> {
        assert!(size > 0, "A process group needs at least one rank");
        let shared = Arc::new(Shared {
            size,
            mailbox: Mutex::new(Mailbox {
                gathered: vec![None; size],
                arrived: 0,
                message: None,
                generation: 0,
                pending_readers: 0,
            }),
            changed: Condvar::new(),
        });
        (0..size)
            .map(|rank| GroupController {
                rank,
                shared: Arc::clone(&shared),
                seen: Cell::new(0),
            })
            .collect()
    }

    fn check_root(&self, root: usize) -> Result<()> {
        if root >= self.shared.size {
            return Err(OvertimeError::Collective(format!(
                "Root rank {} outside a group of {}",
                root, self.shared.size
            )));
        }
        Ok(())
    }
}

impl Controller for GroupController {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn gather(&self, payload: Bytes, root: usize) -> Result<Option<Vec<Bytes>>> {
        self.check_root(root)?;
        let mut mailbox = self.shared.mailbox.lock();

        // The previous gather must be collected before this rank refills its slot.
        while mailbox.gathered[self.rank].is_some() {
            self.shared.changed.wait(&mut mailbox);
        }
        mailbox.gathered[self.rank] = Some(payload);
        mailbox.arrived += 1;
        self.shared.changed.notify_all();

        if self.rank != root {
            return Ok(None);
        }

        while mailbox.arrived < self.shared.size {
            self.shared.changed.wait(&mut mailbox);
        }
        mailbox.arrived = 0;
        let payloads = mailbox
            .gathered
            .iter_mut()
            .map(|slot| slot.take().unwrap_or_default())
            .collect();
        self.shared.changed.notify_all();
        Ok(Some(payloads))
    }

    fn broadcast(&self, payload: Option<Bytes>, root: usize) -> Result<Bytes> {
        self.check_root(root)?;
        let mut mailbox = self.shared.mailbox.lock();

        if self.rank == root {
            let payload = payload.ok_or_else(|| {
                OvertimeError::Collective("Root rank broadcast without a payload".to_string())
            })?;
            while mailbox.pending_readers > 0 {
                self.shared.changed.wait(&mut mailbox);
            }
            mailbox.generation += 1;
            mailbox.message = Some(payload.clone());
            mailbox.pending_readers = self.shared.size - 1;
            self.seen.set(mailbox.generation);
            self.shared.changed.notify_all();
            return Ok(payload);
        }

        let wanted = self.seen.get() + 1;
        while mailbox.generation < wanted {
            self.shared.changed.wait(&mut mailbox);
        }
        let message = mailbox.message.clone().unwrap_or_default();
        self.seen.set(wanted);
        mailbox.pending_readers -= 1;
        if mailbox.pending_readers == 0 {
            mailbox.message = None;
        }
        self.shared.changed.notify_all();
        Ok(message)
    }
}
