//! Subscription billing back-office: catalog, per-user pricing, currency
//! rates, payment history and profit reporting.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
