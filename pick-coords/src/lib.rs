//! Particle picks between the two coordinate conventions of a cryo-EM
//! pipeline: fractions of the micrograph size in the job platform's
//! records, pixels in the STAR files that picking tools read and write.

pub mod annotations;
pub mod coords;
pub mod error;
pub mod ingest;
pub mod join;
pub mod micrographs;
pub mod pick_table_io;
pub mod records;
pub mod stack;
pub mod star_picks;
pub mod translate;

pub use coords::{fractional_to_pixel, pixel_to_fractional, MicrographShape};
pub use error::PickError;
pub use join::join_picks_to_micrograph;
pub use records::{Micrograph, ParticlePick, PickTable};
pub use translate::{PowerPolicy, ScorePolicy};
