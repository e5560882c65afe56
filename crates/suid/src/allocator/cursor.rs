use crate::{
    id::{Block, IDSIZE, Suid},
    replenish::Urgency,
};

/// Position within the active block.
///
/// Idle when `active` is `None`. Never persisted: a restart always begins idle
/// and activates the oldest pooled block on first use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Cursor {
    active: Option<Block>,
    issued: u32,
}

impl Cursor {
    pub(crate) const fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub(crate) const fn active(&self) -> Option<Block> {
        self.active
    }

    pub(crate) const fn issued(&self) -> u32 {
        self.issued
    }

    pub(crate) const fn activate(&mut self, block: Block) {
        self.active = Some(block);
        self.issued = 0;
    }

    /// Issues the next identifier of the active block. Retires the block once
    /// all [`IDSIZE`] identifiers are out.
    pub(crate) fn issue(&mut self) -> Option<Suid> {
        let block = self.active?;
        let id = block.nth(self.issued);
        self.issued += 1;
        if self.issued == IDSIZE {
            *self = Self::default();
        }
        Some(id)
    }

    pub(crate) const fn urgency(&self, pooled: usize) -> Urgency {
        Urgency {
            pooled,
            issued: match self.active {
                Some(_) => Some(self.issued),
                None => None,
            },
        }
    }
}
