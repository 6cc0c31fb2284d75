pub mod event;
pub mod recipe;

pub use event::{EventRecord, EventView, EventWithRecipes};
pub use recipe::{RecipeRecord, RecipeView};
