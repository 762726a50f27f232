// Nutrition targets: pure, synchronous arithmetic with no I/O.
// Profile → daily targets (targets.rs) → per-slot targets (distribution.rs).

pub mod distribution;
pub mod targets;
