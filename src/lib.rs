mod model;
mod replace;
mod search;

pub use model::atom::Atom;
pub use model::cell::{nearest_image, wrap, SingularCellError, UnitCell};
pub use model::crystal::Crystal;
pub use model::graph::{BondEdge, BondGraph};
pub use model::species::{ParseSpeciesError, Species, MASK_SENTINEL};

pub use search::{substructure_search, Location, Search};

pub use replace::{replace, substructure_replace, ReplaceConfig};

pub use replace::Error as ReplaceError;
