pub mod configuration;
pub mod device;
pub mod feed;
pub mod price;
pub mod reconciler;
pub mod refresh;
pub mod retry;
pub mod schedule;
pub mod shutdown;
pub mod status;
pub mod threshold;
pub mod window;
