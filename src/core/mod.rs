/// Article lifecycle and stock management
pub mod article;
/// The booking core: purchases, cancellations, manual adjustments
pub mod booking;
/// Member lifecycle, search and the purchase hotlist
pub mod member;
/// Read-only reporting and the admin SQL console
pub mod report;
