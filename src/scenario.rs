pub mod catalogue;
pub mod model;

pub use catalogue::Catalogue;
pub use model::{ChoiceOption, Interaction, InteractionKind, Quality, Scenario, Stage};
