pub mod safety;
pub mod intake;
pub mod processor; // audio → transcript → intake record
