pub mod contract;
pub mod reservation;
