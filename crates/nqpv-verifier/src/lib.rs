//! The WLP backward transformer and Löwner-order decider: the static
//! verification core of the proof system, built on the data model in
//! `nqpv-core`.

pub mod order;
pub mod wlp;

pub use order::{sqsubseteq, DensityWitness, OrderOutcome};
pub use wlp::{verify_signature, wlp, WlpContext};
