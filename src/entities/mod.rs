//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod article;
pub mod booking;
pub mod member;
pub mod report;
pub mod user;

// Re-export specific types to avoid conflicts
pub use article::{Column as ArticleColumn, Entity as Article, Model as ArticleModel};
pub use booking::{Column as BookingColumn, Entity as Booking, Model as BookingModel};
pub use member::{Column as MemberColumn, Entity as Member, Model as MemberModel};
pub use report::{Column as ReportColumn, Entity as Report, Model as ReportModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
