//! The standard phases.
//!
//! | # | name | gating |
//! |---|---|---|
//! | 1 | entities | yes |
//! | 2 | sources | yes |
//! | 2.5 | scaffold | no |
//! | 3 | canonicalize | yes |
//! | 4 | invariants | yes |
//! | 5 | render | yes |
//! | 6 | write | yes |
//! | 7 | audit | no |

mod audit;
mod canonicalize;
mod entities;
mod invariants;
mod render;
mod scaffold;
mod sources;
mod write;

pub use audit::AuditPhase;
pub use canonicalize::CanonicalizePhase;
pub use entities::EntitiesPhase;
pub use invariants::InvariantsPhase;
pub use render::RenderPhase;
pub use scaffold::ScaffoldPhase;
pub use sources::SourcesPhase;
pub use write::WritePhase;

use crate::phase::{Phase, PhaseNumber};

pub const ENTITIES: PhaseNumber = PhaseNumber::whole(1);
pub const SOURCES: PhaseNumber = PhaseNumber::whole(2);
pub const SCAFFOLD: PhaseNumber = PhaseNumber::from_tenths(25);
pub const CANONICALIZE: PhaseNumber = PhaseNumber::whole(3);
pub const INVARIANTS: PhaseNumber = PhaseNumber::whole(4);
pub const RENDER: PhaseNumber = PhaseNumber::whole(5);
pub const WRITE: PhaseNumber = PhaseNumber::whole(6);
pub const AUDIT: PhaseNumber = PhaseNumber::whole(7);

/// The standard phase list, in execution order.
pub fn standard_phases() -> Vec<Box<dyn Phase>> {
    vec![
        Box::new(EntitiesPhase),
        Box::new(SourcesPhase),
        Box::new(ScaffoldPhase),
        Box::new(CanonicalizePhase),
        Box::new(InvariantsPhase),
        Box::new(RenderPhase),
        Box::new(WritePhase),
        Box::new(AuditPhase),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_phases_ascending_and_classified() {
        let phases = standard_phases();
        let numbers: Vec<_> = phases.iter().map(|p| p.number()).collect();
        let mut sorted = numbers.clone();
        sorted.sort();
        assert_eq!(numbers, sorted);

        let non_gating: Vec<_> = phases
            .iter()
            .filter(|p| !p.gating())
            .map(|p| p.name())
            .collect();
        assert_eq!(non_gating, vec!["scaffold", "audit"]);
    }
}
