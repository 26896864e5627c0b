pub mod ask;
pub mod chat;
pub mod doctor;

mod output;
mod runtime;
