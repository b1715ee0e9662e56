//! RAII frame for one record being populated.
//!
//! Entering a frame bumps the depth counter for its tuple; dropping it
//! (including on an early `?` return) brings the counter back down, so
//! sibling branches of a graph never see each other's depth.

use std::ops::{Deref, DerefMut};

use mapr_ir::TypeTuple;

use super::Executor;

pub(super) struct Frame<'g, 'm, 'c> {
    exec: &'g mut Executor<'m, 'c>,
    tuple: TypeTuple,
}

impl Drop for Frame<'_, '_, '_> {
    fn drop(&mut self) {
        self.exec.active.pop();
        self.exec.cx.leave(self.tuple);
    }
}

impl<'m, 'c> Deref for Frame<'_, 'm, 'c> {
    type Target = Executor<'m, 'c>;

    fn deref(&self) -> &Self::Target {
        self.exec
    }
}

impl DerefMut for Frame<'_, '_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.exec
    }
}

impl<'m, 'c> Executor<'m, 'c> {
    pub(super) fn enter(&mut self, tuple: TypeTuple) -> Frame<'_, 'm, 'c> {
        self.cx.enter(tuple);
        self.active.push(tuple);
        Frame { exec: self, tuple }
    }
}
