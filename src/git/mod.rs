pub mod history;
pub mod repo;

pub use history::HistoryReader;
pub use repo::GitRepo;
