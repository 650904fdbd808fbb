//! Greenproof HTTP server library (router and handlers).

pub mod gateway;
