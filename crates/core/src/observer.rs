/// Receives events emitted by a solver.
///
/// Observers see every event in order but cannot influence the run: the
/// solver proceeds to its horizon or its first failure regardless of what an
/// observer does. Typical uses are progress reporting and live inspection.
///
/// Closures taking `&E` implement this trait, and `()` is the no-op observer.
pub trait Observer<E> {
    /// Called once per event.
    fn observe(&mut self, event: &E);
}

impl<E> Observer<E> for () {
    fn observe(&mut self, _event: &E) {}
}

impl<E, F> Observer<E> for F
where
    F: FnMut(&E),
{
    fn observe(&mut self, event: &E) {
        self(event);
    }
}
