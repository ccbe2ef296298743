/// Anything with resettable internal state: controllers, the simulation
/// engine, ingestion filters. Resetting clears accumulated state but never
/// configuration.
pub trait Model {
    fn reset(&mut self);
}
