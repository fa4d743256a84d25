pub mod cards_llm;
pub mod db;

pub use cards_llm::OpenAiCardsAdapter;
pub use db::DbAdapter;
