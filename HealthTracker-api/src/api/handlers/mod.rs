pub mod devices;
pub mod health_data;
pub mod status;
pub mod users;

// Tests module
#[cfg(test)]
mod tests;
