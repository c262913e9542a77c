pub mod agent;
pub mod doctor;
pub mod init;
pub mod serve;
