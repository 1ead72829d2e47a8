//! Terminal front end for the conversion service

pub mod convert;
pub mod currencies;
pub mod setup;
pub mod ui;
