pub mod config;
pub mod display;
pub mod error;
pub mod image;
pub mod normalize;
pub mod poller;
pub mod weather;

#[cfg(test)]
mod test_log;
