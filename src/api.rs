pub mod elering;
pub mod homewizard;
