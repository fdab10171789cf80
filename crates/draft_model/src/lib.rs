//! Draft model: roster hrdinů, matice matchupů, kanonizace jmen a typy draftu.
//!
//! Sdílí ho scraper (extrakce picků), scorer i historický export, aby se
//! alias logika nepsala dvakrát.

pub mod canon;
pub mod data;
pub mod draft;
pub mod roster;
pub mod signed;

pub use canon::canonicalize;
pub use data::{HeroData, HeroDataError};
pub use draft::{Draft, IncompletePicks, Pick, TeamDraft, TEAM_SIZE};
pub use roster::{Hero, HeroRoster, MatchupTable, ResolutionFailure};
pub use signed::{Sign, SignedValue, SignedValueError};
