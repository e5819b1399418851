pub mod candidate;
pub mod user;

pub use candidate::Entity as Candidate;
pub use user::Entity as User;
