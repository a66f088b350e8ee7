//! Handle Pool
//!
//! A fixed set of expensive-to-build kernel contexts ("handles"), each behind
//! its own guard. A bounded permit queue acts as a counting semaphore: a
//! caller first takes a permit (blocking while every handle is busy), then
//! scans the slots with `try_lock` and keeps the first one it gets.
//!
//! A lease releases its slot guard before returning its permit, so the number
//! of locked slots never exceeds the number of permits out; a permit holder's
//! scan therefore always succeeds.

use std::ops::{Deref, DerefMut};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};
use tracing::warn;

use crate::cancel::CancellationToken;
use crate::error::{ExtractionError, ExtractionResult};

/// Pool of reusable handles of type `H`
pub struct HandlePool<H> {
    slots: Vec<Mutex<H>>,
    permit_sender: Sender<()>,
    permit_receiver: Receiver<()>,
}

impl<H: Send> HandlePool<H> {
    /// Build `size` handles (at least one), stopping at the first factory error
    pub fn build<E>(
        size: usize,
        mut factory: impl FnMut(usize) -> Result<H, E>,
    ) -> Result<Self, E> {
        let size = size.max(1);
        let slots = (0..size)
            .map(|slot| factory(slot).map(Mutex::new))
            .collect::<Result<Vec<_>, E>>()?;

        let (permit_sender, permit_receiver) = bounded(size);
        for _ in 0..size {
            // Capacity equals the permit count, so this never blocks
            let _ = permit_sender.send(());
        }

        Ok(Self {
            slots,
            permit_sender,
            permit_receiver,
        })
    }

    /// Number of handles
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Handles not currently leased
    pub fn available(&self) -> usize {
        self.permit_receiver.len()
    }

    /// Lease a handle, blocking until one is free or `cancel` fires
    pub fn acquire(&self, cancel: &CancellationToken) -> ExtractionResult<HandleLease<'_, H>> {
        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }

        select! {
            recv(self.permit_receiver) -> _permit => {}
            recv(cancel.receiver()) -> _ => {
                warn!("Handle acquisition cancelled");
                return Err(ExtractionError::Cancelled);
            }
        }

        Ok(self.claim_slot())
    }

    /// Lease a handle only if one is free right now
    pub fn try_acquire(&self) -> Option<HandleLease<'_, H>> {
        self.permit_receiver.try_recv().ok()?;
        Some(self.claim_slot())
    }

    fn claim_slot(&self) -> HandleLease<'_, H> {
        for (slot, mutex) in self.slots.iter().enumerate() {
            if let Some(guard) = mutex.try_lock() {
                return HandleLease {
                    guard: Some(guard),
                    permits: &self.permit_sender,
                    slot,
                };
            }
        }
        // Locked slots never outnumber permits out, see module docs
        unreachable!("permit held but every handle slot is locked")
    }
}

/// Exclusive access to one pooled handle; returned to the pool on drop
pub struct HandleLease<'a, H> {
    guard: Option<MutexGuard<'a, H>>,
    permits: &'a Sender<()>,
    slot: usize,
}

impl<H> HandleLease<'_, H> {
    /// Index of the leased slot
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl<H> Deref for HandleLease<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.guard.as_deref().unwrap_or_else(|| unreachable!("lease used after release"))
    }
}

impl<H> DerefMut for HandleLease<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.guard.as_deref_mut().unwrap_or_else(|| unreachable!("lease used after release"))
    }
}

impl<H> Drop for HandleLease<'_, H> {
    fn drop(&mut self) {
        // Unlock first, then hand the permit back
        self.guard.take();
        let _ = self.permits.send(());
    }
}
