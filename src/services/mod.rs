pub mod difficulty;
pub mod flashcards;
pub mod intervals;
pub mod item_generator;
pub mod translator;
pub mod tuning;
pub mod word_selector;

pub use difficulty::{DifficultyTuner, Outcome};
pub use flashcards::FlashcardService;
pub use item_generator::{ClozeSentence, Item, ItemError, ItemGenerator};
pub use word_selector::WordSelector;
