pub mod repository_list;

pub use repository_list::{RepositoryListActor, RepositoryListMessage, RepositoryListStats};
