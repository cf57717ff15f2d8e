pub mod codes;
pub mod intake;
pub mod psde;
pub mod repository;
